//! Trainer: interactive front end over the codec and playback runtime.
//!
//! Holds the last translation and the dictionary toggle, and turns typed
//! lines into actions. The CLI shell and the tests both drive it; it never
//! touches playback state except through `PlaybackController`.

use crate::codec;
use crate::error::PlaybackError;
use crate::message::MorseMessage;
use crate::runtime::PlaybackController;
use crate::session::{PlaybackState, SessionId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shown before anything has been translated.
pub const PLACEHOLDER: &str = "... --- ...";

const HELP: &[&str] = &[
    "Type text and press Enter to translate it.",
    ":play          play the last translation",
    ":stop          stop playback",
    ":decode MORSE  translate Morse back to text",
    ":dict          show or hide the dictionary",
    ":status        show playback status",
    ":help          show this help",
    ":quit          exit",
];

/// Result of one shell line.
#[derive(Debug, Default, PartialEq)]
pub struct ShellOutput {
    pub lines: Vec<String>,
    pub quit: bool,
}

impl ShellOutput {
    fn line(s: impl Into<String>) -> Self {
        ShellOutput {
            lines: vec![s.into()],
            quit: false,
        }
    }
}

pub struct Trainer {
    controller: PlaybackController,
    current_morse: String,
    dictionary_visible: bool,
    completed: Arc<AtomicUsize>,
}

impl Trainer {
    pub fn new(controller: PlaybackController) -> Self {
        Trainer {
            controller,
            current_morse: String::new(),
            dictionary_visible: false,
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Translate `text` and keep the result as the playable message.
    pub fn translate(&mut self, text: &str) -> &str {
        self.current_morse = codec::encode(text);
        &self.current_morse
    }

    pub fn current_morse(&self) -> &str {
        &self.current_morse
    }

    /// What the output panel shows.
    pub fn display(&self) -> &str {
        if self.current_morse.is_empty() {
            PLACEHOLDER
        } else {
            &self.current_morse
        }
    }

    pub fn can_play(&self) -> bool {
        !self.current_morse.is_empty() && !self.controller.is_playing()
    }

    /// Play the current translation. Returns `Ok(None)` when there is
    /// nothing to play.
    pub fn play(&self) -> Result<Option<SessionId>, PlaybackError> {
        if self.current_morse.is_empty() {
            return Ok(None);
        }
        let completed = self.completed.clone();
        let id = self
            .controller
            .play(MorseMessage::parse(&self.current_morse), move || {
                completed.fetch_add(1, Ordering::SeqCst);
            })?;
        Ok(Some(id))
    }

    pub fn stop(&self) {
        self.controller.stop();
    }

    pub fn is_playing(&self) -> bool {
        self.controller.is_playing()
    }

    pub fn state(&self) -> PlaybackState {
        self.controller.state()
    }

    /// Number of playbacks that ran to the end.
    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Show or hide the dictionary. Returns the new visibility.
    pub fn toggle_dictionary(&mut self) -> bool {
        self.dictionary_visible = !self.dictionary_visible;
        self.dictionary_visible
    }

    pub fn dictionary_visible(&self) -> bool {
        self.dictionary_visible
    }

    /// Handle one line of shell input.
    pub fn handle_line(&mut self, line: &str) -> ShellOutput {
        let line = line.trim();
        let Some(command) = line.strip_prefix(':') else {
            self.translate(line);
            return ShellOutput::line(self.display().to_string());
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };

        match name {
            "play" => match self.play() {
                Ok(Some(id)) => {
                    ShellOutput::line(format!("Playing {} (session {})", self.current_morse, id))
                }
                Ok(None) => ShellOutput::line("Nothing to play. Type some text first."),
                Err(e) => ShellOutput::line(format!("Error: {}", e)),
            },
            "stop" => {
                self.stop();
                ShellOutput::line("Stopped.")
            }
            "decode" => ShellOutput::line(codec::decode(arg)),
            "dict" => {
                if self.toggle_dictionary() {
                    ShellOutput {
                        lines: dictionary_lines(),
                        quit: false,
                    }
                } else {
                    ShellOutput::line("Dictionary hidden.")
                }
            }
            "status" => {
                let status = self.controller.status();
                let session = status
                    .session
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string());
                ShellOutput::line(format!(
                    "State: {:?} | Session: {} | Completed: {}",
                    status.state,
                    session,
                    self.completed_count()
                ))
            }
            "help" => ShellOutput {
                lines: HELP.iter().map(|s| s.to_string()).collect(),
                quit: false,
            },
            "quit" | "exit" => {
                self.stop();
                ShellOutput {
                    lines: Vec::new(),
                    quit: true,
                }
            }
            other => ShellOutput::line(format!("Unknown command ':{}'. Try :help", other)),
        }
    }
}

/// The dictionary as `CHAR  CODE` rows.
pub fn dictionary_lines() -> Vec<String> {
    codec::dictionary()
        .iter()
        .map(|(ch, code)| format!("{:<3}{}", ch, code))
        .collect()
}
