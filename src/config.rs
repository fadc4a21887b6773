//! Runtime configuration loaded from `config.json` and the environment.

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Path to the JSON configuration file that holds runtime defaults.
pub const CONFIG_PATH: &str = "config.json";

/// Gemini's OpenAI-compatible surface.
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Groq hosts Whisper behind the OpenAI transcription API.
const DEFAULT_TRANSCRIPTION_BASE: &str = "https://api.groq.com/openai/v1";

const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-large-v3-turbo";

const DEFAULT_TRANSCRIPTION_KEY_ENV: &str = "GROQ_API_KEY";

/// Seconds to wait for speech to begin before giving up on a listen.
const DEFAULT_LISTEN_TIMEOUT_SECS: u64 = 4;

/// Speaking rate in words per minute.
const DEFAULT_SPEECH_RATE: u32 = 145;

/// Strongly typed representation of `config.json`.
///
/// # Details
/// Every field has a default so a partial file (or none at all) is valid.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the OpenAI-compatible chat endpoint, without `/chat/completions`.
    pub api_base: String,
    pub model: String,
    /// Name of the environment variable holding the chat API key.
    pub api_key_env: String,
    pub listen_timeout_secs: u64,
    /// Thread previous turns back into each request.
    pub remember_history: bool,
    pub speech_rate: u32,
    /// Local text-to-speech program; the platform default is used when unset.
    pub tts_command: Option<String>,
    pub transcription: TranscriptionConfig,
}

/// Settings for the remote speech-recognition endpoint.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub api_base: String,
    pub model: String,
    pub api_key_env: String,
    pub language: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            listen_timeout_secs: DEFAULT_LISTEN_TIMEOUT_SECS,
            remember_history: false,
            speech_rate: DEFAULT_SPEECH_RATE,
            tts_command: None,
            transcription: TranscriptionConfig::default(),
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_TRANSCRIPTION_BASE.to_string(),
            model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            api_key_env: DEFAULT_TRANSCRIPTION_KEY_ENV.to_string(),
            language: Some("en".to_string()),
        }
    }
}

impl AppConfig {
    pub fn listen_timeout(&self) -> Duration {
        Duration::from_secs(self.listen_timeout_secs)
    }

    /// Applies `GUIDI_*` overrides from the given variable lookup.
    ///
    /// Unparseable boolean values are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("GUIDI_MODEL") {
            self.model = model;
        }
        if let Some(base) = lookup("GUIDI_API_BASE") {
            self.api_base = base;
        }
        if let Some(command) = lookup("GUIDI_TTS_COMMAND") {
            self.tts_command = Some(command);
        }
        if let Some(raw) = lookup("GUIDI_REMEMBER_HISTORY") {
            match parse_flag(&raw) {
                Some(flag) => self.remember_history = flag,
                None => tracing::warn!(value = %raw, "ignoring invalid GUIDI_REMEMBER_HISTORY"),
            }
        }
    }
}

/// Loads `config.json` from the working directory and applies environment overrides.
///
/// # Details
/// A missing or invalid file is reported and replaced by defaults so the
/// assistant can always start.
pub fn load_config() -> AppConfig {
    let mut config = load_config_from(Path::new(CONFIG_PATH));
    config.apply_overrides(|key| env::var(key).ok());
    config
}

/// Reads a config file, falling back to defaults on any failure.
pub fn load_config_from(path: &Path) -> AppConfig {
    match fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "config parse error, using defaults");
                AppConfig::default()
            }
        },
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "no config file, using defaults");
            AppConfig::default()
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults_target_gemini() {
        let config = AppConfig::default();
        assert_eq!(config.model, "gemini-3-flash-preview");
        assert_eq!(config.api_key_env, "GEMINI_API_KEY");
        assert_eq!(config.listen_timeout(), Duration::from_secs(4));
        assert!(!config.remember_history);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "remember_history": true, "transcription": {{ "model": "whisper-1" }} }}"#)
            .expect("write");

        let config = load_config_from(file.path());
        assert!(config.remember_history);
        assert_eq!(config.transcription.model, "whisper-1");
        assert_eq!(config.transcription.api_key_env, "GROQ_API_KEY");
        assert_eq!(config.model, "gemini-3-flash-preview");
    }

    #[test]
    fn invalid_or_missing_file_falls_back() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "not json").expect("write");
        assert_eq!(load_config_from(file.path()), AppConfig::default());
        assert_eq!(
            load_config_from(Path::new("missing/config.json")),
            AppConfig::default()
        );
    }

    #[test]
    fn env_overrides_win() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("GUIDI_MODEL", "gemini-2.5-pro"),
            ("GUIDI_REMEMBER_HISTORY", "yes"),
            ("GUIDI_TTS_COMMAND", "espeak-ng"),
        ]);
        let mut config = AppConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.model, "gemini-2.5-pro");
        assert!(config.remember_history);
        assert_eq!(config.tts_command.as_deref(), Some("espeak-ng"));
    }

    #[test]
    fn invalid_flag_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(|key| (key == "GUIDI_REMEMBER_HISTORY").then(|| "maybe".to_string()));
        assert!(!config.remember_history);
    }
}
