//! Line-based control commands read from stdin
//!
//! A reader thread parses each line and forwards it over a channel so the
//! main thread can keep pumping the engine between commands.

use std::io::BufRead;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{Receiver, Sender};

/// A parsed control command
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    /// Start a venue; genre and volume fall back to its roster entry
    Start {
        venue: String,
        genre: Option<String>,
        volume: Option<f32>,
    },
    Stop { venue: String },
    Volume { venue: String, volume: f32 },
    Status,
    StopAll,
    Quit,
}

impl ControlCommand {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let venue = || {
            args.first()
                .map(|v| v.to_string())
                .ok_or_else(|| format!("'{}' needs a venue id", verb))
        };
        let volume = |word: &str| {
            word.parse::<f32>()
                .map_err(|_| format!("'{}' is not a volume (0-100)", word))
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "start" | "play" => ControlCommand::Start {
                venue: venue()?,
                genre: args.get(1).map(|g| g.to_string()),
                volume: args.get(2).copied().map(volume).transpose()?,
            },
            "stop" => ControlCommand::Stop { venue: venue()? },
            "volume" | "vol" => ControlCommand::Volume {
                venue: venue()?,
                volume: volume(args.get(1).copied().ok_or("'volume' needs a level (0-100)")?)?,
            },
            "status" | "ls" => ControlCommand::Status,
            "stop-all" | "stopall" => ControlCommand::StopAll,
            "quit" | "exit" | "q" => ControlCommand::Quit,
            other => return Err(format!("Unknown command '{}'", other)),
        };
        Ok(Some(command))
    }
}

pub const HELP: &str = "commands: start <venue> [genre] [volume] | stop <venue> | \
volume <venue> <0-100> | status | stop-all | quit";

/// Spawn the stdin reader
///
/// EOF is delivered as [`ControlCommand::Quit`]. Lines that fail to parse are
/// reported on stderr and skipped.
pub fn spawn_stdin_reader() -> std::io::Result<(Receiver<ControlCommand>, JoinHandle<()>)> {
    let (tx, rx) = crossbeam::channel::unbounded();
    let handle = thread::Builder::new()
        .name("stdin-control".into())
        .spawn(move || read_commands(std::io::stdin().lock(), &tx))?;
    Ok((rx, handle))
}

fn read_commands(input: impl BufRead, tx: &Sender<ControlCommand>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::warn!("stdin read failed: {}", e);
                break;
            }
        };
        match ControlCommand::parse(&line) {
            Ok(Some(command)) => {
                let quit = command == ControlCommand::Quit;
                if tx.send(command).is_err() || quit {
                    return;
                }
            }
            Ok(None) => {}
            Err(e) => eprintln!("{}\n{}", e, HELP),
        }
    }
    let _ = tx.send(ControlCommand::Quit);
}
