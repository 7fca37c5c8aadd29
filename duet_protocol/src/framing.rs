// Length-delimited message framing over TCP.
//
// Wire format: a 4-byte big-endian length prefix followed by a JSON payload.
// `write_frame` / `read_frame` move raw bytes and stay format-agnostic;
// `write_json` / `read_json` layer serde_json on top and are what the client
// and the tests use. The server reads with `read_client_frame`, which keeps
// an undecodable move apart from garbage.
//
// `MAX_MESSAGE_SIZE` (64 KiB) bounds allocation from malformed length
// prefixes. The largest real message is a `boardState` FEN, well under 100
// bytes.

use std::io::{Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ProtocolError;
use crate::message::ClientFrame;

/// Maximum allowed frame payload size (64 KiB).
pub const MAX_MESSAGE_SIZE: u32 = 64 * 1024;

/// Write a length-delimited frame: 4-byte big-endian length, then payload.
/// Flushes, so a buffered writer never holds a frame back.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), ProtocolError> {
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_MESSAGE_SIZE)
        .ok_or(ProtocolError::TooLarge {
            len: payload.len(),
            max: MAX_MESSAGE_SIZE,
        })?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Read a length-delimited frame.
///
/// Returns `Io(UnexpectedEof)` if the stream closes before or during a frame,
/// and `TooLarge` if the prefix exceeds `MAX_MESSAGE_SIZE`.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::TooLarge {
            len: len as usize,
            max: MAX_MESSAGE_SIZE,
        });
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Serialize `msg` to JSON and write it as one frame.
pub fn write_json<W: Write, T: Serialize>(writer: &mut W, msg: &T) -> Result<(), ProtocolError> {
    let json = serde_json::to_vec(msg)?;
    write_frame(writer, &json)
}

/// Read one frame and deserialize it from JSON.
pub fn read_json<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T, ProtocolError> {
    let bytes = read_frame(reader)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Read one frame from a client and decode it with `ClientFrame::decode`.
pub fn read_client_frame<R: Read>(reader: &mut R) -> Result<ClientFrame, ProtocolError> {
    let bytes = read_frame(reader)?;
    ClientFrame::decode(&bytes)
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor};

    use super::*;

    #[test]
    fn frame_roundtrip() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"hello, room!").unwrap();
        assert_eq!(&buf[..4], &[0, 0, 0, 12]);

        let mut cursor = Cursor::new(&buf);
        assert_eq!(read_frame(&mut cursor).unwrap(), b"hello, room!");
    }

    #[test]
    fn empty_frame() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"").unwrap();

        let mut cursor = Cursor::new(&buf);
        assert!(read_frame(&mut cursor).unwrap().is_empty());
    }

    #[test]
    fn rejects_oversized_write() {
        let big = vec![0u8; MAX_MESSAGE_SIZE as usize + 1];
        let mut buf = Vec::new();
        let err = write_frame(&mut buf, &big).unwrap_err();
        assert!(matches!(err, ProtocolError::TooLarge { .. }));
        assert!(buf.is_empty(), "nothing written for a refused frame");
    }

    #[test]
    fn rejects_oversized_read() {
        let fake_len = (MAX_MESSAGE_SIZE + 1).to_be_bytes();
        let mut cursor = Cursor::new(fake_len.to_vec());
        let err = read_frame(&mut cursor).unwrap_err();
        assert!(matches!(err, ProtocolError::TooLarge { .. }));
    }

    #[test]
    fn truncated_prefix_is_eof() {
        let mut cursor = Cursor::new(vec![0u8, 1]);
        match read_frame(&mut cursor).unwrap_err() {
            ProtocolError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[test]
    fn frames_stay_in_order() {
        let mut buf = Vec::new();
        for msg in ["first", "second", "third"] {
            write_json(&mut buf, &msg).unwrap();
        }

        let mut cursor = Cursor::new(&buf);
        for expected in ["first", "second", "third"] {
            let got: String = read_json(&mut cursor).unwrap();
            assert_eq!(got, expected);
        }
    }

    #[test]
    fn bad_json_is_not_a_disconnect() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"{not json").unwrap();

        let mut cursor = Cursor::new(&buf);
        let err = read_json::<_, String>(&mut cursor).unwrap_err();
        assert!(matches!(err, ProtocolError::Json(_)));
        assert!(!err.is_disconnect());
    }
}
