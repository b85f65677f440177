//! Console reporting and JSON persistence of tournament results.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use serde::Serialize;

use crate::tournament::TournamentResults;

/// Prints the pre-tournament header.
pub fn banner(label_a: &str, label_b: &str, games: u32, limit: Duration) {
    let rule = "=".repeat(60);
    println!("{rule}");
    println!("{} vs {}", label_a, label_b);
    println!("{rule}");
    println!("Games: {}", games);
    println!("Time control: {:.3} seconds per move", limit.as_secs_f64());
    println!("{rule}");
    println!();
}

/// Prints the matchup line for one game.
pub fn game_start(game_number: u32, games: u32, white: &str, black: &str) {
    println!(
        "Game {}/{}: {} (White) vs {} (Black)",
        game_number, games, white, black
    );
}

/// In-place ply counter, overwritten as the game progresses.
pub fn move_progress(ply: usize) {
    print!("  ply {}...\r", ply);
    let _ = std::io::stdout().flush();
}

/// Prints the most recent game's outcome and the running score.
pub fn game_result(results: &TournamentResults, label_a: &str, label_b: &str) {
    if let Some(record) = results.games.last() {
        println!(
            "  Result: {} ({} plies, {:?})",
            record.winner_label(),
            record.moves,
            record.termination
        );
    }
    println!(
        "  Score - {}: {} | {}: {} | Draws: {}",
        label_a,
        results.wins_for(label_a),
        label_b,
        results.wins_for(label_b),
        results.draws
    );
    println!();
}

/// Prints the final (or partial, after an abort) standings.
pub fn final_summary(
    results: &TournamentResults,
    label_a: &str,
    label_b: &str,
    elapsed: Duration,
    partial: bool,
) {
    let rule = "=".repeat(60);
    println!();
    println!("{rule}");
    println!("{}", if partial { "PARTIAL RESULTS" } else { "FINAL RESULTS" });
    println!("{rule}");
    println!("{} wins: {}", label_a, results.wins_for(label_a));
    println!("{} wins: {}", label_b, results.wins_for(label_b));
    println!("Draws: {}", results.draws);
    if !results.skipped.is_empty() {
        println!("Skipped games: {:?}", results.skipped);
    }
    println!("Games played: {}", results.total_recorded());
    println!();

    let score_a = results.score(label_a);
    let score_b = results.score(label_b);
    println!("Points (win = 1, draw = 0.5):");
    println!("  {}: {:.1}", label_a, score_a);
    println!("  {}: {:.1}", label_b, score_b);
    println!();

    if score_a > score_b {
        println!("Winner: {} (+{:.1})", label_a, score_a - score_b);
    } else if score_b > score_a {
        println!("Winner: {} (+{:.1})", label_b, score_b - score_a);
    } else {
        println!("Result: tied");
    }

    println!();
    println!("Duration: {:.2} minutes", elapsed.as_secs_f64() / 60.0);
    println!("{rule}");
}

#[derive(Serialize)]
struct ResultsJson<'a> {
    #[serde(flatten)]
    results: &'a TournamentResults,
    /// ISO 8601 timestamp when the file was written.
    created_at: String,
}

/// Writes the full results to `tournament_results_<timestamp>.json` in
/// `dir` and returns the path.
pub fn save_results(dir: &Path, results: &TournamentResults) -> std::io::Result<PathBuf> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("tournament_results_{}.json", timestamp));

    let json = ResultsJson {
        results,
        created_at: Local::now().to_rfc3339(),
    };
    let file = std::fs::File::create(&path)?;
    serde_json::to_writer_pretty(file, &json)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{GameRecord, Termination};

    #[test]
    fn test_save_results_writes_parseable_record() {
        let dir = tempfile::tempdir().unwrap();

        let mut results = TournamentResults::new("Engine A", "Engine B");
        results.record_game(GameRecord {
            game_number: 1,
            white: "Engine A".to_string(),
            black: "Engine B".to_string(),
            winner: Some("Engine B".to_string()),
            moves: 4,
            termination: Termination::Checkmate,
        });

        let path = save_results(dir.path(), &results).unwrap();
        assert!(path
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("tournament_results_"));

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["wins"]["Engine B"], 1);
        assert_eq!(parsed["draws"], 0);
        assert_eq!(parsed["games"][0]["winner"], "Engine B");
        assert_eq!(parsed["games"][0]["termination"], "CHECKMATE");
        assert!(parsed["created_at"].is_string());
    }
}
