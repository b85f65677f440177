//! Scriptable UCI stub engine used by the integration tests.
//!
//! The first command-line argument selects a behavior:
//!
//! - `first` (default): always plays the lexicographically first legal move
//! - `script`: plays the fool's mate line (f2f3 e7e5 g2g4 d8h4), so the
//!   black side mates on ply 4; falls back to `first` past the script
//! - `slow`: sleeps well past any sane move budget before answering
//! - `illegal`: always answers `bestmove e2e5`
//! - `crash`: exits as soon as it is asked for a move
//! - `noisy`: emits chatter, including a line starting with `bestmove`
//!   without a word boundary, before the real reply

use std::io::{self, BufRead};
use std::time::Duration;

use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Position};

const SCRIPT: [&str; 4] = ["f2f3", "e7e5", "g2g4", "d8h4"];

fn first_legal_move(pos: &Chess) -> String {
    let mut moves: Vec<String> = pos
        .legal_moves()
        .iter()
        .map(|m| m.to_uci(CastlingMode::Standard).to_string())
        .collect();
    moves.sort();
    moves.into_iter().next().unwrap_or_else(|| "0000".to_string())
}

fn main() {
    let mode = std::env::args().nth(1).unwrap_or_else(|| "first".to_string());

    let mut pos = Chess::default();
    let mut ply: usize = 0;

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        let cmd = line.trim();

        if cmd == "uci" {
            println!("id name stub-{}", mode);
            println!("uciok");
        } else if cmd == "isready" {
            println!("readyok");
        } else if let Some(rest) = cmd.strip_prefix("position startpos") {
            pos = Chess::default();
            ply = 0;
            if let Some(list) = rest.trim().strip_prefix("moves ") {
                for token in list.split_whitespace() {
                    let mv = token
                        .parse::<UciMove>()
                        .ok()
                        .and_then(|uci| uci.to_move(&pos).ok());
                    match mv {
                        Some(mv) => match pos.clone().play(mv) {
                            Ok(next) => {
                                pos = next;
                                ply += 1;
                            }
                            Err(_) => break,
                        },
                        None => break,
                    }
                }
            }
        } else if cmd.starts_with("go") {
            match mode.as_str() {
                "crash" => std::process::exit(3),
                "slow" => {
                    std::thread::sleep(Duration::from_secs(3));
                    println!("bestmove {}", first_legal_move(&pos));
                }
                "illegal" => println!("bestmove e2e5"),
                "noisy" => {
                    println!("info string thinking hard");
                    println!("bestmovenotamove");
                    println!("bestmove {}", first_legal_move(&pos));
                }
                "script" if ply < SCRIPT.len() => {
                    println!("bestmove {}", SCRIPT[ply]);
                }
                _ => println!("bestmove {}", first_legal_move(&pos)),
            }
        } else if cmd == "quit" {
            break;
        }
        // Unknown commands are ignored, like any tolerant UCI engine.
    }
}
