//! Line input and styled output for the interactive session.

use std::io::{self, Write};

use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// One read from the operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    Line(String),
    /// Ctrl-C at the prompt.
    Interrupted,
    /// Ctrl-D or closed stdin.
    Eof,
}

/// How a line of output should be presented.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Banner,
    Info,
    Warn,
    Error,
    /// An assistant reply.
    Guide,
    /// A transcribed utterance echoed back to the operator.
    Heard,
}

/// Where the session reads prompts from and writes results to.
pub trait Terminal {
    /// Shows `prompt` and reads one line.
    fn read_line(&mut self, prompt: &str) -> Result<Input>;

    fn show(&mut self, tone: Tone, text: &str);

    /// Transient status that the next [`Terminal::show`] replaces.
    fn progress(&mut self, text: &str);
}

/// Interactive terminal backed by rustyline.
pub struct ConsoleTerminal {
    editor: DefaultEditor,
    progress_shown: bool,
}

impl ConsoleTerminal {
    /// # Errors
    /// Returns an error if the line editor cannot attach to the terminal.
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
            progress_shown: false,
        })
    }

    fn clear_progress(&mut self) {
        if self.progress_shown {
            print!("\r\x1b[2K");
            self.progress_shown = false;
        }
    }
}

impl Terminal for ConsoleTerminal {
    fn read_line(&mut self, prompt: &str) -> Result<Input> {
        self.clear_progress();
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Input::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(Input::Interrupted),
            Err(ReadlineError::Eof) => Ok(Input::Eof),
            Err(err) => Err(err.into()),
        }
    }

    fn show(&mut self, tone: Tone, text: &str) {
        self.clear_progress();
        match tone {
            Tone::Banner => println!("{}", text.bright_magenta().bold()),
            Tone::Info => println!("{}", text.bright_black()),
            Tone::Warn => println!("{}", text.yellow()),
            Tone::Error => println!("{}", text.red()),
            Tone::Guide => println!("{} {}", "Guide:".bright_blue().bold(), text),
            Tone::Heard => println!("{} {}", "You:".green(), text),
        }
    }

    fn progress(&mut self, text: &str) {
        self.clear_progress();
        print!("{}", text.cyan());
        let _ = io::stdout().flush();
        self.progress_shown = true;
    }
}
