//! Process handle for a UCI chess engine.
//!
//! This module spawns a UCI-compatible engine as a subprocess and owns its
//! lifecycle: the protocol handshake, per-move queries with a bounded wait,
//! and graceful termination. Engine stdout is drained by a dedicated reader
//! thread feeding a channel, so every read the handle performs carries a
//! deadline and can never block indefinitely.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use engine_duel::engine::EngineHandle;
//!
//! let mut engine = EngineHandle::launch("/usr/bin/stockfish")?;
//! let mv = engine.best_move(&[], Duration::from_millis(500))?;
//! println!("{} plays {}", engine.name(), mv);
//! engine.quit();
//! # Ok::<(), engine_duel::engine::EngineError>(())
//! ```

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};
use thiserror::Error;

/// How long a freshly spawned engine gets to complete the UCI handshake.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Slack added on top of the per-move budget before a query is failed.
///
/// Engines routinely overshoot `movetime` by a few milliseconds of I/O and
/// scheduling latency; only replies later than `limit + REPLY_GRACE` count
/// as a timeout.
const REPLY_GRACE: Duration = Duration::from_millis(250);

/// How long a resynchronization after a timed-out search may take: the
/// interrupted search has been told to `stop` and must still deliver its
/// (discarded) `bestmove` plus a `readyok` within this window.
const RESYNC_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors raised while launching or querying an engine process.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The executable is missing or the process could not be spawned.
    #[error("failed to launch engine {path}: {source}")]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The engine did not complete the UCI handshake in time.
    #[error("engine did not answer the UCI handshake within {0:?}")]
    HandshakeTimeout(Duration),
    /// No `bestmove` arrived within the move budget plus grace.
    #[error("engine exceeded the {limit:?} move budget")]
    Timeout { limit: Duration },
    /// The engine sent a malformed or empty response.
    #[error("malformed engine response: {0:?}")]
    Protocol(String),
    /// The engine process exited while a query was outstanding.
    #[error("engine process exited unexpectedly")]
    Crashed,
    /// I/O failure on the engine's pipes.
    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A handle to one running UCI engine process.
///
/// The handle has exclusive ownership of the process's stdin and stdout;
/// no other component reads or writes those pipes. At most one query is
/// outstanding at any time.
///
/// # Lifecycle
///
/// 1. [`EngineHandle::launch`] spawns the process and performs the
///    `uci`/`isready` handshake.
/// 2. [`EngineHandle::best_move`] runs one bounded-wait query per move.
/// 3. [`EngineHandle::quit`] shuts the process down; it is idempotent and
///    also invoked by [`Drop`], so the process is released on every exit
///    path.
pub struct EngineHandle {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<String>,
    name: String,
    running: bool,
    /// A timed-out search still owes its `bestmove`; the next query must
    /// resynchronize before trusting the channel again.
    pending_reply: bool,
}

impl EngineHandle {
    /// Launches an engine process and completes the UCI handshake.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Launch`] if the path does not exist or the
    /// process cannot be spawned, and [`EngineError::HandshakeTimeout`] if
    /// the engine fails to answer `uci`/`isready` within the startup
    /// timeout.
    pub fn launch<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        Self::launch_with_args(path, &[])
    }

    /// Like [`launch`](Self::launch), passing extra arguments on the
    /// engine's command line.
    pub fn launch_with_args<P: AsRef<Path>>(
        path: P,
        args: &[String],
    ) -> Result<Self, EngineError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(EngineError::Launch {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no such file",
                ),
            });
        }

        let mut child = Command::new(path)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| EngineError::Launch {
                path: path.to_path_buf(),
                source,
            })?;

        let stdin = child.stdin.take().expect("stdin was piped");
        let stdout = child.stdout.take().expect("stdout was piped");

        // Reader thread: drains stdout into a channel so queries can wait
        // with a deadline. Exits on EOF or when the handle is dropped.
        let (tx, lines) = mpsc::channel::<String>();
        std::thread::spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines() {
                match line {
                    Ok(l) => {
                        if tx.send(l).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        let mut handle = Self {
            child,
            stdin,
            lines,
            name: String::new(),
            running: true,
            pending_reply: false,
        };
        handle.handshake()?;
        Ok(handle)
    }

    /// The name the engine reported via `id name` during the handshake.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn handshake(&mut self) -> Result<(), EngineError> {
        let deadline = Instant::now() + STARTUP_TIMEOUT;

        self.send("uci")?;
        loop {
            let line = self.recv_until(deadline)?;
            if let Some(name) = line.strip_prefix("id name ") {
                self.name = name.to_string();
            }
            if line == "uciok" {
                break;
            }
        }

        self.send("isready")?;
        loop {
            if self.recv_until(deadline)? == "readyok" {
                break;
            }
        }

        tracing::debug!(name = %self.name, "engine handshake complete");
        Ok(())
    }

    /// Asks the engine for its move in the position reached by `moves`
    /// from the starting position.
    ///
    /// Sends `position startpos moves ...` followed by `go movetime`, then
    /// blocks until `bestmove` arrives or `limit` plus a small grace margin
    /// elapses.
    ///
    /// # Errors
    ///
    /// * [`EngineError::Timeout`] if no reply arrives within the budget.
    /// * [`EngineError::Protocol`] if the `bestmove` line carried no move.
    /// * [`EngineError::Crashed`] if the process exited mid-query.
    pub fn best_move(
        &mut self,
        moves: &[String],
        limit: Duration,
    ) -> Result<String, EngineError> {
        if self.pending_reply {
            self.resync()?;
        }

        if moves.is_empty() {
            self.send("position startpos")?;
        } else {
            self.send(&format!("position startpos moves {}", moves.join(" ")))?;
        }
        self.send(&format!("go movetime {}", limit.as_millis()))?;

        let deadline = Instant::now() + limit + REPLY_GRACE;
        loop {
            let line = match self.recv_move_line(deadline, limit) {
                Ok(line) => line,
                Err(err @ EngineError::Timeout { .. }) => {
                    // The overdue search would otherwise leave its reply in
                    // the channel for the next query to misread.
                    self.pending_reply = true;
                    let _ = self.send("stop");
                    return Err(err);
                }
                Err(err) => return Err(err),
            };
            if let Some(rest) = line.strip_prefix("bestmove ") {
                let mv = rest.split_whitespace().next().unwrap_or("");
                if mv.is_empty() || mv == "(none)" || mv == "0000" {
                    return Err(EngineError::Protocol(line));
                }
                return Ok(mv.to_string());
            }
            if line == "bestmove" {
                return Err(EngineError::Protocol(line));
            }
            // `info` lines and anything else the engine chatters are skipped.
        }
    }

    /// Re-synchronizes a handle whose previous query timed out: swallows
    /// the stopped search's late `bestmove`, then round-trips `isready`
    /// so the channel is empty before the next query is issued.
    fn resync(&mut self) -> Result<(), EngineError> {
        let deadline = Instant::now() + RESYNC_TIMEOUT;
        loop {
            let line = self.recv_move_line(deadline, RESYNC_TIMEOUT)?;
            if line.split_whitespace().next() == Some("bestmove") {
                break;
            }
        }
        self.send("isready")?;
        loop {
            if self.recv_move_line(deadline, RESYNC_TIMEOUT)? == "readyok" {
                break;
            }
        }
        self.pending_reply = false;
        Ok(())
    }

    /// Requests graceful termination of the engine process.
    ///
    /// Sends `quit`, waits briefly for the process to exit, and kills it if
    /// it does not. Calling `quit` on an already-stopped handle is a no-op;
    /// [`Drop`] calls it as well, so every exit path releases the process.
    pub fn quit(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;

        let _ = writeln!(self.stdin, "quit");
        let _ = self.stdin.flush();

        let deadline = Instant::now() + Duration::from_millis(500);
        while Instant::now() < deadline {
            if let Ok(Some(_)) = self.child.try_wait() {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        let _ = self.child.kill();
        let _ = self.child.wait();
    }

    fn send(&mut self, cmd: &str) -> Result<(), EngineError> {
        let write = writeln!(self.stdin, "{}", cmd).and_then(|_| self.stdin.flush());
        write.map_err(|e| {
            // A broken pipe here means the process is gone, not an I/O fault.
            if matches!(self.child.try_wait(), Ok(Some(_))) {
                EngineError::Crashed
            } else {
                EngineError::Io(e)
            }
        })
    }

    fn recv_until(&mut self, deadline: Instant) -> Result<String, EngineError> {
        let now = Instant::now();
        if now >= deadline {
            return Err(EngineError::HandshakeTimeout(STARTUP_TIMEOUT));
        }
        match self.lines.recv_timeout(deadline - now) {
            Ok(line) => Ok(line.trim().to_string()),
            Err(RecvTimeoutError::Timeout) => {
                Err(EngineError::HandshakeTimeout(STARTUP_TIMEOUT))
            }
            Err(RecvTimeoutError::Disconnected) => Err(EngineError::Crashed),
        }
    }

    fn recv_move_line(
        &mut self,
        deadline: Instant,
        limit: Duration,
    ) -> Result<String, EngineError> {
        let now = Instant::now();
        if now >= deadline {
            return Err(EngineError::Timeout { limit });
        }
        match self.lines.recv_timeout(deadline - now) {
            Ok(line) => Ok(line.trim().to_string()),
            Err(RecvTimeoutError::Timeout) => Err(EngineError::Timeout { limit }),
            Err(RecvTimeoutError::Disconnected) => Err(EngineError::Crashed),
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.quit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_nonexistent_executable_returns_launch_error() {
        let result = EngineHandle::launch("/nonexistent/path/to/engine");
        match result {
            Err(EngineError::Launch { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/path/to/engine"));
            }
            _ => panic!("expected Launch error"),
        }
    }

    #[test]
    fn test_engine_error_display() {
        let timeout = EngineError::Timeout {
            limit: Duration::from_millis(500),
        };
        assert!(timeout.to_string().contains("move budget"));

        let protocol = EngineError::Protocol("bestmove".to_string());
        assert!(protocol.to_string().contains("malformed"));

        let crashed = EngineError::Crashed;
        assert_eq!(
            crashed.to_string(),
            "engine process exited unexpectedly"
        );
    }

    #[test]
    fn test_engine_error_from_io_error() {
        let io_error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: EngineError = io_error.into();
        match err {
            EngineError::Io(e) => {
                assert_eq!(e.kind(), std::io::ErrorKind::PermissionDenied);
            }
            _ => panic!("expected Io variant"),
        }
    }
}
