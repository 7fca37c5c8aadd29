// Room configuration.
//
// `RoomConfig` is what `start_room` needs: where to listen and how many
// connections to hold at once. It can come from a TOML file where every key is
// optional; missing keys take the defaults below. The binary layers CLI flags
// and `DUET_*` environment variables on top (see `main.rs`).
//
// Example file:
//
//   bind = "0.0.0.0"
//   port = 7979
//   max_connections = 32

use std::path::Path;

use serde::Deserialize;

use crate::error::RoomError;

pub const DEFAULT_PORT: u16 = 7979;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RoomConfig {
    /// Address to bind the listener to.
    pub bind: String,
    /// Listen port. 0 lets the OS pick one (tests use this).
    pub port: u16,
    /// Connections beyond this are sent `rejected` and closed.
    pub max_connections: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: DEFAULT_PORT,
            max_connections: 64,
        }
    }
}

impl RoomConfig {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn from_file(path: &Path) -> Result<Self, RoomError> {
        let text = std::fs::read_to_string(path).map_err(|source| RoomError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| RoomError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `bind:port` as passed to `TcpListener::bind`.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(RoomConfig::from_toml("").unwrap(), RoomConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = RoomConfig::from_toml("port = 9000\n").unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.bind, "127.0.0.1");
        assert_eq!(config.max_connections, 64);
        assert_eq!(config.listen_addr(), "127.0.0.1:9000");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(RoomConfig::from_toml("ticks_per_turn = 50\n").is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind = \"0.0.0.0\"").unwrap();
        writeln!(file, "max_connections = 3").unwrap();

        let config = RoomConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config,
            RoomConfig {
                bind: "0.0.0.0".into(),
                port: DEFAULT_PORT,
                max_connections: 3,
            }
        );
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = RoomConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, RoomError::ConfigRead { .. }));
        assert!(err.to_string().contains("absent.toml"), "{err}");
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();
        let err = RoomConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, RoomError::ConfigParse { .. }));
    }
}
