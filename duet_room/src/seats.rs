// Seat registry: the two-slot white/black seat map.
//
// Owns the rules for claiming and vacating seats and nothing else. Claims are
// deterministic (white before black) and total: a connection that finds both
// seats taken simply gets no seat and becomes a spectator. Release looks the
// connection up by value; with two slots a scan is all that is needed.
//
// Invariant: a `ConnectionId` appears in at most one seat. `claim` returns the
// existing seat for a connection that already holds one instead of seating it
// twice.

use duet_protocol::types::{Color, ConnectionId};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeatRegistry {
    white: Option<ConnectionId>,
    black: Option<ConnectionId>,
}

impl SeatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seat `id` in the first vacant seat (white, then black). Returns the
    /// seat it holds afterwards, or `None` if both seats were taken.
    pub fn claim(&mut self, id: ConnectionId) -> Option<Color> {
        if let Some(seat) = self.seat_of(id) {
            return Some(seat);
        }
        let seat = Color::ALL.into_iter().find(|c| self.is_vacant(*c))?;
        *self.slot_mut(seat) = Some(id);
        Some(seat)
    }

    /// Vacate whichever seat `id` holds. Returns the vacated seat; no-op for
    /// a connection without a seat.
    pub fn release(&mut self, id: ConnectionId) -> Option<Color> {
        let seat = self.seat_of(id)?;
        *self.slot_mut(seat) = None;
        Some(seat)
    }

    pub fn occupant(&self, seat: Color) -> Option<ConnectionId> {
        match seat {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    pub fn is_vacant(&self, seat: Color) -> bool {
        self.occupant(seat).is_none()
    }

    /// The seat held by `id`, if any.
    pub fn seat_of(&self, id: ConnectionId) -> Option<Color> {
        Color::ALL
            .into_iter()
            .find(|c| self.occupant(*c) == Some(id))
    }

    /// Number of occupied seats (0, 1 or 2).
    pub fn occupied_count(&self) -> usize {
        Color::ALL
            .into_iter()
            .filter(|c| !self.is_vacant(*c))
            .count()
    }

    fn slot_mut(&mut self, seat: Color) -> &mut Option<ConnectionId> {
        match seat {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ConnectionId = ConnectionId(1);
    const B: ConnectionId = ConnectionId(2);
    const C: ConnectionId = ConnectionId(3);

    #[test]
    fn claims_white_then_black_then_nothing() {
        let mut seats = SeatRegistry::new();
        assert_eq!(seats.claim(A), Some(Color::White));
        assert_eq!(seats.claim(B), Some(Color::Black));
        assert_eq!(seats.claim(C), None);

        assert_eq!(seats.occupant(Color::White), Some(A));
        assert_eq!(seats.occupant(Color::Black), Some(B));
        assert_eq!(seats.seat_of(C), None);
        assert_eq!(seats.occupied_count(), 2);
    }

    #[test]
    fn vacated_white_is_refilled_before_anything_else() {
        let mut seats = SeatRegistry::new();
        seats.claim(A);
        seats.claim(B);

        assert_eq!(seats.release(A), Some(Color::White));
        assert!(seats.is_vacant(Color::White));

        assert_eq!(seats.claim(C), Some(Color::White));
        assert_eq!(seats.occupant(Color::Black), Some(B));
    }

    #[test]
    fn lone_black_after_white_leaves() {
        let mut seats = SeatRegistry::new();
        seats.claim(A);
        seats.claim(B);
        seats.release(A);

        assert_eq!(seats.occupied_count(), 1);
        assert_eq!(seats.seat_of(B), Some(Color::Black));
    }

    #[test]
    fn release_of_non_occupant_is_noop() {
        let mut seats = SeatRegistry::new();
        seats.claim(A);
        let before = seats.clone();

        assert_eq!(seats.release(C), None);
        assert_eq!(seats, before);
    }

    #[test]
    fn double_claim_keeps_single_seat() {
        let mut seats = SeatRegistry::new();
        assert_eq!(seats.claim(A), Some(Color::White));
        assert_eq!(seats.claim(A), Some(Color::White));
        assert!(seats.is_vacant(Color::Black));
    }
}
