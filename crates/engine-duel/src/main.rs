mod config;
mod engine;
mod game;
mod report;
mod tournament;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;

use config::DuelConfig;
use tournament::{FailurePolicy, Participant, Tournament, TournamentError};

const DEFAULT_GAMES: u32 = 100;
const DEFAULT_MOVETIME: f64 = 0.5;

#[derive(Parser)]
#[command(name = "engine-duel")]
#[command(about = "Head-to-head tournament runner for UCI chess engines")]
struct Cli {
    /// First engine: executable path or a name from duel.toml
    engine_a: String,
    /// Second engine: executable path or a name from duel.toml
    engine_b: String,
    /// Number of games to play
    #[arg(short, long)]
    games: Option<u32>,
    /// Seconds per move
    #[arg(short = 't', long)]
    movetime: Option<f64>,
    /// Display label for the first engine
    #[arg(long)]
    label_a: Option<String>,
    /// Display label for the second engine
    #[arg(long)]
    label_b: Option<String>,
    /// What to do when a game fails mid-tournament
    #[arg(long, value_enum, default_value = "abort")]
    on_failure: FailurePolicy,
}

/// Resolves a CLI engine argument: configured name first, then a raw path.
fn resolve_participant(
    config: &DuelConfig,
    arg: &str,
    label_override: Option<String>,
    fallback_label: &str,
) -> Result<Participant, String> {
    let (path, label, args) = match config.engine(arg) {
        Some(entry) => (
            entry.path.clone(),
            entry.label.clone().unwrap_or_else(|| arg.to_string()),
            entry.args.clone(),
        ),
        None => (
            PathBuf::from(arg),
            fallback_label.to_string(),
            Vec::new(),
        ),
    };

    if !path.is_file() {
        return Err(format!("engine not found at {}", path.display()));
    }

    Ok(Participant {
        label: label_override.unwrap_or(label),
        path,
        args,
    })
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config = DuelConfig::load().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(2);
    });

    let first = resolve_participant(&config, &cli.engine_a, cli.label_a, "Engine A")
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        });
    let second = resolve_participant(&config, &cli.engine_b, cli.label_b, "Engine B")
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        });

    let games = cli.games.or(config.defaults.games).unwrap_or(DEFAULT_GAMES);
    let movetime = cli
        .movetime
        .or(config.defaults.movetime)
        .unwrap_or(DEFAULT_MOVETIME);
    if games == 0 || movetime <= 0.0 {
        eprintln!("Error: games and movetime must be positive");
        std::process::exit(2);
    }
    let limit = Duration::from_secs_f64(movetime);

    report::banner(&first.label, &second.label, games, limit);
    let label_a = first.label.clone();
    let label_b = second.label.clone();

    let start = Instant::now();
    let duel = Tournament::new(first, second, games, limit, cli.on_failure);

    match duel.run() {
        Ok(results) => {
            report::final_summary(&results, &label_a, &label_b, start.elapsed(), false);
            match report::save_results(std::path::Path::new("."), &results) {
                Ok(path) => println!("\nDetailed results saved to: {}", path.display()),
                Err(e) => eprintln!("Warning: failed to save results: {}", e),
            }
        }
        Err(TournamentError::Launch { label, source }) => {
            eprintln!("Error: could not start {}: {}", label, source);
            std::process::exit(1);
        }
        Err(TournamentError::Aborted {
            game_number,
            source,
            results,
        }) => {
            eprintln!("Error: game {} failed: {}", game_number, source);
            report::final_summary(&results, &label_a, &label_b, start.elapsed(), true);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses_paths_with_defaults() {
        let cli = Cli::try_parse_from(["engine-duel", "./sf17", "./sf18"]).unwrap();
        assert_eq!(cli.engine_a, "./sf17");
        assert_eq!(cli.engine_b, "./sf18");
        assert!(cli.games.is_none());
        assert!(cli.movetime.is_none());
        assert_eq!(cli.on_failure, FailurePolicy::Abort);
    }

    #[test]
    fn test_cli_parses_overrides() {
        let cli = Cli::try_parse_from([
            "engine-duel",
            "./a",
            "./b",
            "-g",
            "4",
            "-t",
            "0.01",
            "--on-failure",
            "skip",
            "--label-a",
            "Alpha",
        ])
        .unwrap();
        assert_eq!(cli.games, Some(4));
        assert_eq!(cli.movetime, Some(0.01));
        assert_eq!(cli.on_failure, FailurePolicy::Skip);
        assert_eq!(cli.label_a.as_deref(), Some("Alpha"));
    }

    #[test]
    fn test_cli_requires_both_engines() {
        assert!(Cli::try_parse_from(["engine-duel", "./only-one"]).is_err());
        assert!(Cli::try_parse_from(["engine-duel"]).is_err());
    }

    #[test]
    fn test_resolve_participant_rejects_missing_path() {
        let config = DuelConfig::default();
        let err = resolve_participant(&config, "/nonexistent/engine", None, "Engine A")
            .unwrap_err();
        assert!(err.contains("not found"));
    }

    #[test]
    fn test_resolve_participant_uses_config_entry() {
        let exe = tempfile::NamedTempFile::new().unwrap();
        let toml = format!(
            r#"
            [engines.mybot]
            path = "{}"
            label = "My Bot"
            args = ["slow"]
            "#,
            exe.path().display()
        );
        let config: DuelConfig = toml::from_str(&toml).unwrap();

        let participant =
            resolve_participant(&config, "mybot", None, "Engine A").unwrap();
        assert_eq!(participant.label, "My Bot");
        assert_eq!(participant.path, exe.path());
        assert_eq!(participant.args, vec!["slow".to_string()]);
    }

    #[test]
    fn test_cli_help_mentions_games_and_movetime() {
        let mut cmd = Cli::command();
        let help = cmd.render_help().to_string();
        assert!(help.contains("--games"));
        assert!(help.contains("--movetime"));
    }
}
