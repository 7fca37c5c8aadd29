// Rules engine adapter.
//
// `RulesEngine` is the fixed capability set the coordinator relies on: read
// the side to move, snapshot the position as FEN, apply a candidate move,
// report a terminal outcome, reset. `ShakmatyRules` implements it on top of
// `shakmaty::Chess`.
//
// The adapter owns the repetition history. A FEN snapshot alone cannot tell a
// threefold repetition, so every position reached since the last reset is
// counted by its Zobrist hash.
//
// Input handling:
// - unparseable squares or promotion letters are `RulesError::Malformed`;
// - well-formed but illegal moves are `RulesError::Illegal`;
// - a promotion letter on a move that does not promote is ignored, and a pawn
//   reaching the last rank without a letter promotes to a queen.
// Neither error touches the position.

use std::collections::HashMap;

use duet_protocol::message::MoveRequest;
use duet_protocol::types::{Color, GameOver, GameOverReason};
use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::zobrist::Zobrist64;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Position, Rank, Role, Square};
use thiserror::Error;

/// Halfmove clock value at which the fifty-move rule ends the game.
const FIFTY_MOVE_HALFMOVES: u32 = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RulesError {
    /// The request could not be parsed into a move at all.
    #[error("malformed move: {0}")]
    Malformed(String),

    /// The move parsed but is not legal in the current position.
    #[error("illegal move")]
    Illegal,

    /// A FEN could not be loaded as a legal starting point.
    #[error("invalid position: {0}")]
    InvalidPosition(String),
}

pub trait RulesEngine {
    /// Colour whose turn it is.
    fn side_to_move(&self) -> Color;

    /// Current position as FEN.
    fn fen(&self) -> String;

    /// Validate and play `request`. On error the position is unchanged.
    fn apply(&mut self, request: &MoveRequest) -> Result<(), RulesError>;

    /// `Some` once the current position ends the game.
    fn outcome(&self) -> Option<GameOver>;

    /// Back to the standard starting position with an empty history.
    fn reset(&mut self);
}

#[derive(Clone, Debug)]
pub struct ShakmatyRules {
    position: Chess,
    seen: HashMap<u64, u32>,
}

impl Default for ShakmatyRules {
    fn default() -> Self {
        Self::new()
    }
}

impl ShakmatyRules {
    pub fn new() -> Self {
        Self::with_position(Chess::default())
    }

    /// Start from an arbitrary position, e.g. for analysis or tests.
    pub fn from_fen(fen: &str) -> Result<Self, RulesError> {
        let fen: Fen = fen
            .parse()
            .map_err(|e: shakmaty::fen::ParseFenError| RulesError::InvalidPosition(e.to_string()))?;
        let position: Chess = fen
            .into_position(CastlingMode::Standard)
            .map_err(|e| RulesError::InvalidPosition(e.to_string()))?;
        Ok(Self::with_position(position))
    }

    fn with_position(position: Chess) -> Self {
        let mut rules = Self {
            position,
            seen: HashMap::new(),
        };
        rules.record_current();
        rules
    }

    fn current_hash(&self) -> u64 {
        self.position
            .zobrist_hash::<Zobrist64>(EnPassantMode::Legal)
            .0
    }

    fn record_current(&mut self) {
        *self.seen.entry(self.current_hash()).or_insert(0) += 1;
    }

    /// How often the current position has occurred since the last reset.
    pub fn repetitions(&self) -> u32 {
        self.seen.get(&self.current_hash()).copied().unwrap_or(0)
    }

    fn parse_square(text: &str) -> Result<Square, RulesError> {
        text.parse()
            .map_err(|_| RulesError::Malformed(format!("bad square {text:?}")))
    }

    fn parse_promotion(text: &str) -> Result<Role, RulesError> {
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Role::from_char(ch)
                .ok_or_else(|| RulesError::Malformed(format!("bad promotion piece {text:?}"))),
            _ => Err(RulesError::Malformed(format!(
                "bad promotion piece {text:?}"
            ))),
        }
    }
}

impl RulesEngine for ShakmatyRules {
    fn side_to_move(&self) -> Color {
        to_protocol_color(self.position.turn())
    }

    fn fen(&self) -> String {
        Fen::from_position(&self.position, EnPassantMode::Legal).to_string()
    }

    fn apply(&mut self, request: &MoveRequest) -> Result<(), RulesError> {
        let from = Self::parse_square(&request.from)?;
        let to = Self::parse_square(&request.to)?;
        let requested = request
            .promotion
            .as_deref()
            .map(Self::parse_promotion)
            .transpose()?;

        let promotes = self.position.board().role_at(from) == Some(Role::Pawn)
            && matches!(to.rank(), Rank::First | Rank::Eighth);
        let promotion = if promotes {
            Some(requested.unwrap_or(Role::Queen))
        } else {
            None
        };

        let m = UciMove::Normal {
            from,
            to,
            promotion,
        }
        .to_move(&self.position)
        .map_err(|_| RulesError::Illegal)?;

        self.position.play_unchecked(m);
        self.record_current();
        Ok(())
    }

    fn outcome(&self) -> Option<GameOver> {
        let pos = &self.position;
        let (reason, winner) = if pos.is_checkmate() {
            // The side to move is the one mated.
            (
                GameOverReason::Checkmate,
                Some(to_protocol_color(!pos.turn())),
            )
        } else if pos.is_stalemate() {
            (GameOverReason::Stalemate, None)
        } else if self.repetitions() >= 3 {
            (GameOverReason::Threefold, None)
        } else if pos.is_insufficient_material() {
            (GameOverReason::InsufficientMaterial, None)
        } else if pos.halfmoves() >= FIFTY_MOVE_HALFMOVES {
            (GameOverReason::Draw, None)
        } else {
            return None;
        };
        Some(GameOver { reason, winner })
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

fn to_protocol_color(color: shakmaty::Color) -> Color {
    match color {
        shakmaty::Color::White => Color::White,
        shakmaty::Color::Black => Color::Black,
    }
}
