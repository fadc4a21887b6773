//! Text-to-speech functionality module.

use std::process::Command;

use anyhow::{Context, Result};

/// Plays one chunk of text aloud, blocking until playback ends.
pub trait Synthesizer: Send + Sync {
    fn say(&self, text: &str) -> Result<()>;
}

/// Speaks through a local command such as macOS `say` or `espeak`.
#[derive(Clone, Debug)]
pub struct CommandSynthesizer {
    program: String,
    rate: u32,
}

impl CommandSynthesizer {
    pub fn new(program: impl Into<String>, rate: u32) -> Self {
        Self {
            program: program.into(),
            rate,
        }
    }

    /// `say` on macOS, `espeak` everywhere else.
    pub fn platform_default(rate: u32) -> Self {
        let program = if cfg!(target_os = "macos") { "say" } else { "espeak" };
        Self::new(program, rate)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command_args(&self, text: &str) -> Vec<String> {
        let mut args = Vec::with_capacity(4);
        if let Some(flag) = rate_flag(&self.program) {
            args.push(flag.to_string());
            args.push(self.rate.to_string());
            // Replies often hold "- " bullets; keep them out of option parsing.
            args.push("--".to_string());
        }
        args.push(text.to_string());
        args
    }
}

impl Synthesizer for CommandSynthesizer {
    /// Runs the speech command for `text`.
    ///
    /// # Errors
    /// Returns an error if `text` is blank, the command fails to spawn, or it
    /// exits unsuccessfully.
    fn say(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            anyhow::bail!("Cannot speak empty text");
        }
        let output = Command::new(&self.program)
            .args(self.command_args(text))
            .output()
            .with_context(|| format!("Failed to run {}", self.program))?;
        if !output.status.success() {
            anyhow::bail!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

/// Words-per-minute flag for the speech programs we know about.
fn rate_flag(program: &str) -> Option<&'static str> {
    let name = program.rsplit('/').next().unwrap_or(program);
    match name {
        "say" => Some("-r"),
        "espeak" | "espeak-ng" => Some("-s"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn say_uses_rate_flag() {
        let synth = CommandSynthesizer::new("say", 145);
        assert_eq!(synth.command_args("Hello"), vec!["-r", "145", "--", "Hello"]);
    }

    #[test]
    fn espeak_uses_speed_flag_even_with_path() {
        let synth = CommandSynthesizer::new("/usr/bin/espeak-ng", 160);
        assert_eq!(synth.command_args("Hi"), vec!["-s", "160", "--", "Hi"]);
    }

    #[test]
    fn bulleted_chunk_is_passed_after_end_of_options() {
        let synth = CommandSynthesizer::new("espeak", 145);
        let args = synth.command_args("- The Pearl Mosque.");
        assert_eq!(args, vec!["-s", "145", "--", "- The Pearl Mosque."]);
        let marker = args.iter().position(|arg| arg == "--").unwrap();
        let text = args.iter().position(|arg| arg.starts_with("- ")).unwrap();
        assert!(marker < text);
    }

    #[test]
    fn unknown_program_gets_text_only() {
        let synth = CommandSynthesizer::new("piper-say", 145);
        assert_eq!(synth.command_args("Hi"), vec!["Hi"]);
    }

    #[test]
    fn rejects_empty_text() {
        let synth = CommandSynthesizer::new("say", 145);
        assert!(synth.say("   ").is_err());
    }

    #[test]
    fn missing_program_is_an_error() {
        let synth = CommandSynthesizer::new("guidi-no-such-tts-binary", 145);
        assert!(synth.say("hello").is_err());
    }
}
