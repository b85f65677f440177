//! Tournament scheduling, color alternation, and result aggregation.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::engine::{EngineError, EngineHandle};
use crate::game::{GameError, GameRecord, GameSession};
use crate::report;

/// One competing engine: display label, executable, extra argv.
#[derive(Debug, Clone)]
pub struct Participant {
    pub label: String,
    pub path: PathBuf,
    pub args: Vec<String>,
}

impl Participant {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
            args: Vec::new(),
        }
    }
}

/// What to do when a game fails mid-tournament.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FailurePolicy {
    /// Stop the tournament; a faulty engine invalidates further comparison.
    #[default]
    Abort,
    /// Record the game as excluded and continue with the next one.
    Skip,
}

/// Errors that end a tournament run.
#[derive(Error, Debug)]
pub enum TournamentError {
    /// An engine could not be started; no games were played.
    #[error("failed to start engine '{label}': {source}")]
    Launch {
        label: String,
        #[source]
        source: EngineError,
    },
    /// A game failed under [`FailurePolicy::Abort`]. Carries the results
    /// of the games completed before the failure.
    #[error("game {game_number} failed: {source}")]
    Aborted {
        game_number: u32,
        #[source]
        source: GameError,
        results: TournamentResults,
    },
}

/// Aggregate outcome of a tournament run.
///
/// Mutated only through [`record_game`](Self::record_game) and
/// [`record_skipped`](Self::record_skipped), which keep the invariant
/// `sum(wins) + draws == games.len()`.
#[derive(Debug, Serialize)]
pub struct TournamentResults {
    pub wins: BTreeMap<String, u32>,
    pub draws: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<u32>,
    pub games: Vec<GameRecord>,
}

impl TournamentResults {
    /// An empty result set with both participants seeded at zero wins.
    pub fn new(label_a: &str, label_b: &str) -> Self {
        let mut wins = BTreeMap::new();
        wins.insert(label_a.to_string(), 0);
        wins.insert(label_b.to_string(), 0);
        Self {
            wins,
            draws: 0,
            skipped: Vec::new(),
            games: Vec::new(),
        }
    }

    /// Appends a finished game and bumps the matching counter.
    pub fn record_game(&mut self, record: GameRecord) {
        match &record.winner {
            Some(label) => *self.wins.entry(label.clone()).or_insert(0) += 1,
            None => self.draws += 1,
        }
        self.games.push(record);
    }

    /// Marks a game as excluded from the aggregate (skip policy).
    pub fn record_skipped(&mut self, game_number: u32) {
        self.skipped.push(game_number);
    }

    /// Tournament points for a label: one per win, half per draw.
    pub fn score(&self, label: &str) -> f64 {
        let wins = self.wins.get(label).copied().unwrap_or(0);
        wins as f64 + 0.5 * self.draws as f64
    }

    pub fn wins_for(&self, label: &str) -> u32 {
        self.wins.get(label).copied().unwrap_or(0)
    }

    pub fn total_recorded(&self) -> usize {
        self.games.len()
    }
}

/// Schedules and runs the configured number of games between two
/// participants.
///
/// One process per participant is launched at the start and reused across
/// all games; each handle is quit exactly once, on every exit path. Games
/// run strictly sequentially with alternating colors.
pub struct Tournament {
    first: Participant,
    second: Participant,
    games: u32,
    limit: Duration,
    policy: FailurePolicy,
}

impl Tournament {
    pub fn new(
        first: Participant,
        second: Participant,
        games: u32,
        limit: Duration,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            first,
            second,
            games,
            limit,
            policy,
        }
    }

    /// Color assignment rule: the first participant takes white in
    /// odd-numbered games. Strict alternation keeps the color split even
    /// and removes first-move bias from the aggregate.
    pub fn first_is_white(game_number: u32) -> bool {
        game_number % 2 == 1
    }

    /// Runs the full tournament and returns the aggregated results.
    ///
    /// # Errors
    ///
    /// [`TournamentError::Launch`] if either engine fails to start (before
    /// any games), or [`TournamentError::Aborted`] when a game fails under
    /// the abort policy; the latter carries the partial results.
    pub fn run(&self) -> Result<TournamentResults, TournamentError> {
        let mut first = self.launch(&self.first)?;
        let mut second = self.launch(&self.second)?;
        tracing::info!(
            first = %first.name(),
            second = %second.name(),
            games = self.games,
            "engines ready"
        );

        let mut results = TournamentResults::new(&self.first.label, &self.second.label);
        let outcome = self.run_games(&mut first, &mut second, &mut results);

        first.quit();
        second.quit();

        match outcome {
            Ok(()) => Ok(results),
            Err((game_number, source)) => Err(TournamentError::Aborted {
                game_number,
                source,
                results,
            }),
        }
    }

    fn launch(&self, participant: &Participant) -> Result<EngineHandle, TournamentError> {
        EngineHandle::launch_with_args(&participant.path, &participant.args).map_err(
            |source| TournamentError::Launch {
                label: participant.label.clone(),
                source,
            },
        )
    }

    fn run_games(
        &self,
        first: &mut EngineHandle,
        second: &mut EngineHandle,
        results: &mut TournamentResults,
    ) -> Result<(), (u32, GameError)> {
        for game_number in 1..=self.games {
            let (white, black, white_label, black_label) =
                if Self::first_is_white(game_number) {
                    (&mut *first, &mut *second, &self.first.label, &self.second.label)
                } else {
                    (&mut *second, &mut *first, &self.second.label, &self.first.label)
                };

            report::game_start(game_number, self.games, white_label, black_label);

            let session =
                GameSession::new(white, black, white_label, black_label, self.limit);
            match session.play(game_number) {
                Ok(record) => {
                    results.record_game(record);
                    report::game_result(results, &self.first.label, &self.second.label);
                }
                Err(err) => match self.policy {
                    FailurePolicy::Abort => return Err((game_number, err)),
                    FailurePolicy::Skip => {
                        tracing::warn!(game_number, error = %err, "skipping failed game");
                        results.record_skipped(game_number);
                    }
                },
            }
        }
        Ok(())
    }
}
