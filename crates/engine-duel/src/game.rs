//! Single-game execution between two engine handles.
//!
//! A [`GameSession`] borrows the two [`EngineHandle`]s for the duration of
//! one game, alternates queries between them against a [`shakmaty::Chess`]
//! position, and produces an immutable [`GameRecord`] once a terminal state
//! is reached. Ownership of the handles (and the single `quit()` call) stays
//! with the tournament controller.

use std::time::Duration;

use serde::{Serialize, Serializer};
use shakmaty::uci::UciMove;
use shakmaty::{Chess, Color, Position};
use thiserror::Error;

use crate::engine::{EngineError, EngineHandle};
use crate::report;

/// Hard cap on plies before a game is adjudicated a draw.
pub const MAX_PLIES: usize = 500;

/// A progress line is emitted every this many plies.
const PROGRESS_INTERVAL: usize = 10;

/// Errors that abort the current game.
///
/// Both variants name the participant at fault; neither is retried, since
/// fairness across a long match requires identical treatment of every
/// dropped move.
#[derive(Error, Debug)]
pub enum GameError {
    /// The engine misbehaved at the process or protocol level.
    #[error("engine '{label}' failed: {source}")]
    Engine {
        label: String,
        #[source]
        source: EngineError,
    },
    /// The engine answered with a move the rules reject.
    #[error("engine '{label}' played illegal move '{mv}' at ply {ply}")]
    IllegalMove { label: String, mv: String, ply: u32 },
}

/// Why a game ended. Serialized in the upper-case form the result file uses.
///
/// Repetition is not tracked as its own terminal state: positions can only
/// repeat while no capture or pawn move happens, so any repetition-bound
/// game runs the halfmove clock up and ends as `FiftyMoveRule` (or, failing
/// that, `MoveLimit`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Termination {
    Checkmate,
    Stalemate,
    InsufficientMaterial,
    FiftyMoveRule,
    MoveLimit,
}

/// The outcome of one finished game.
///
/// Created once by the session and immutable afterwards; owned by the
/// tournament's results list. `winner` is `None` for a draw and serializes
/// as the string `"Draw"`.
#[derive(Debug, Clone, Serialize)]
pub struct GameRecord {
    pub game_number: u32,
    pub white: String,
    pub black: String,
    #[serde(serialize_with = "serialize_winner")]
    pub winner: Option<String>,
    pub moves: u32,
    pub termination: Termination,
}

impl GameRecord {
    /// The winning participant's label, or `"Draw"`.
    pub fn winner_label(&self) -> &str {
        self.winner.as_deref().unwrap_or("Draw")
    }
}

fn serialize_winner<S: Serializer>(
    winner: &Option<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(winner.as_deref().unwrap_or("Draw"))
}

/// Drives exactly one game between a white and a black engine handle.
pub struct GameSession<'a> {
    white: &'a mut EngineHandle,
    black: &'a mut EngineHandle,
    white_label: &'a str,
    black_label: &'a str,
    limit: Duration,
}

impl<'a> GameSession<'a> {
    pub fn new(
        white: &'a mut EngineHandle,
        black: &'a mut EngineHandle,
        white_label: &'a str,
        black_label: &'a str,
        limit: Duration,
    ) -> Self {
        Self {
            white,
            black,
            white_label,
            black_label,
            limit,
        }
    }

    /// Plays the game to completion and returns its record.
    ///
    /// Queries strictly alternate starting with white; each query carries
    /// the full move history, so an engine never sees a position with an
    /// un-applied move. Games that outlast the fifty-move clock or the
    /// [`MAX_PLIES`] cap are adjudicated as draws.
    ///
    /// # Errors
    ///
    /// Any [`EngineError`] from a query, or an illegal reply, aborts this
    /// game only and is surfaced unmodified to the controller.
    pub fn play(mut self, game_number: u32) -> Result<GameRecord, GameError> {
        let mut pos = Chess::default();
        let mut moves: Vec<String> = Vec::new();

        let (winner, termination) = loop {
            if pos.is_game_over() {
                break self.classify_terminal(&pos);
            }
            if pos.halfmoves() >= 100 {
                break (None, Termination::FiftyMoveRule);
            }
            if moves.len() >= MAX_PLIES {
                break (None, Termination::MoveLimit);
            }

            let side = pos.turn();
            let (handle, label) = if side == Color::White {
                (&mut *self.white, self.white_label)
            } else {
                (&mut *self.black, self.black_label)
            };

            let reply = handle.best_move(&moves, self.limit).map_err(|source| {
                GameError::Engine {
                    label: label.to_string(),
                    source,
                }
            })?;

            let mv = reply
                .parse::<UciMove>()
                .ok()
                .and_then(|uci| uci.to_move(&pos).ok())
                .ok_or_else(|| GameError::IllegalMove {
                    label: label.to_string(),
                    mv: reply.clone(),
                    ply: moves.len() as u32 + 1,
                })?;

            pos = pos.play(mv).map_err(|_| GameError::IllegalMove {
                label: label.to_string(),
                mv: reply.clone(),
                ply: moves.len() as u32 + 1,
            })?;
            moves.push(reply);

            if moves.len() % PROGRESS_INTERVAL == 0 {
                report::move_progress(moves.len());
            }
        };

        let winner = winner.map(|color| {
            match color {
                Color::White => self.white_label,
                Color::Black => self.black_label,
            }
            .to_string()
        });

        Ok(GameRecord {
            game_number,
            white: self.white_label.to_string(),
            black: self.black_label.to_string(),
            winner,
            moves: moves.len() as u32,
            termination,
        })
    }

    fn classify_terminal(&self, pos: &Chess) -> (Option<Color>, Termination) {
        if pos.is_checkmate() {
            // The side to move is the side that got mated.
            (Some(!pos.turn()), Termination::Checkmate)
        } else if pos.is_stalemate() {
            (None, Termination::Stalemate)
        } else {
            (None, Termination::InsufficientMaterial)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(winner: Option<&str>) -> GameRecord {
        GameRecord {
            game_number: 7,
            white: "Engine A".to_string(),
            black: "Engine B".to_string(),
            winner: winner.map(String::from),
            moves: 42,
            termination: Termination::Checkmate,
        }
    }

    #[test]
    fn test_winner_label_defaults_to_draw() {
        assert_eq!(record(Some("Engine A")).winner_label(), "Engine A");
        assert_eq!(record(None).winner_label(), "Draw");
    }

    #[test]
    fn test_game_record_serializes_winner_as_label_or_draw() {
        let json = serde_json::to_string(&record(Some("Engine B"))).unwrap();
        assert!(json.contains("\"winner\":\"Engine B\""));
        assert!(json.contains("\"game_number\":7"));

        let json = serde_json::to_string(&record(None)).unwrap();
        assert!(json.contains("\"winner\":\"Draw\""));
    }

    #[test]
    fn test_termination_serializes_upper_case() {
        let cases = [
            (Termination::Checkmate, "\"CHECKMATE\""),
            (Termination::Stalemate, "\"STALEMATE\""),
            (Termination::InsufficientMaterial, "\"INSUFFICIENT_MATERIAL\""),
            (Termination::FiftyMoveRule, "\"FIFTY_MOVE_RULE\""),
            (Termination::MoveLimit, "\"MOVE_LIMIT\""),
        ];
        for (termination, expected) in cases {
            assert_eq!(serde_json::to_string(&termination).unwrap(), expected);
        }
    }

    #[test]
    fn test_game_error_display_names_the_participant() {
        let err = GameError::IllegalMove {
            label: "Engine B".to_string(),
            mv: "e2e5".to_string(),
            ply: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("Engine B"));
        assert!(msg.contains("e2e5"));
    }
}
