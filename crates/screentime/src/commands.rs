use anyhow::{bail, Result};
use screentime_core::TimeRange;
use std::io::{self, BufRead};
use std::sync::mpsc::Sender;
use std::thread;

use crate::ShellEvent;

/// Presentation commands, the console equivalent of the tray menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Show(Option<TimeRange>),
    Hide,
    Pause,
    Resume,
    TogglePause,
    Clear,
    Save,
    Status,
    Help,
    Quit,
}

impl Command {
    /// Blank lines parse to `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();

        let command = match verb.to_ascii_lowercase().as_str() {
            "show" | "report" => match arg {
                Some(code) => match TimeRange::from_code(code) {
                    Some(range) => Self::Show(Some(range)),
                    None => bail!("unknown range: {code}"),
                },
                None => Self::Show(None),
            },
            "hide" => Self::Hide,
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "toggle" => Self::TogglePause,
            "clear" => Self::Clear,
            "save" => Self::Save,
            "status" => Self::Status,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "kill" => Self::Quit,
            _ => bail!("unknown command: {verb}"),
        };
        Ok(Some(command))
    }
}

/// Forwards parsed stdin lines to the shell loop until stdin closes.
pub fn spawn_input_reader(tx: Sender<ShellEvent>) {
    let spawned = thread::Builder::new()
        .name("screentime-input".to_owned())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        log::warn!("stdin read failed: {err}");
                        break;
                    }
                };
                match Command::parse(&line) {
                    Ok(Some(command)) => {
                        if tx.send(ShellEvent::Command(command)).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(err) => log::warn!("{err} (type `help` for commands)"),
                }
            }
            log::debug!("stdin closed");
        });

    if let Err(err) = spawned {
        log::error!("failed to spawn input reader: {err}");
    }
}
