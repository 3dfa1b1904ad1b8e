//! Speech settings domain types and validation.
//!
//! [`SpeechSettings`] is an explicit configuration value handed to the
//! controller and its engine at construction time and replaced wholesale on
//! change. There is no process-wide settings singleton.

use serde::{Deserialize, Serialize};

/// Default maximum characters per engine utterance.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 3500;

/// Default silence between the title and the body, in milliseconds.
pub const DEFAULT_TITLE_PAUSE_MS: u64 = 1000;

/// Default number of characters searched backwards for a resume boundary.
pub const DEFAULT_RESUME_LOOKBACK_CHARS: usize = 100;

/// Default language preference: Vietnamese first, US English as fallback.
pub const DEFAULT_LANGUAGES: [&str; 2] = ["vi-VN", "en-US"];

/// Accepted range for rate and pitch multipliers.
const MULTIPLIER_RANGE: std::ops::RangeInclusive<f32> = 0.5..=2.0;

/// Speech playback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    /// Speech rate multiplier (1.0 = engine normal).
    pub rate: f32,

    /// Pitch multiplier (1.0 = engine normal).
    pub pitch: f32,

    /// Preferred voice name. Unknown names fall back to the engine default.
    pub voice: Option<String>,

    /// Locale preference list; the first one the engine supports is used.
    pub languages: Vec<String>,

    /// Maximum characters per utterance.
    pub max_chunk_chars: usize,

    /// Silence inserted between title and body.
    pub title_pause_ms: u64,

    /// How far back resume searches for a sentence or word boundary.
    pub resume_lookback_chars: usize,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            voice: None,
            languages: DEFAULT_LANGUAGES.iter().map(|s| (*s).to_owned()).collect(),
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
            title_pause_ms: DEFAULT_TITLE_PAUSE_MS,
            resume_lookback_chars: DEFAULT_RESUME_LOOKBACK_CHARS,
        }
    }
}

impl SpeechSettings {
    /// Silence between title and body.
    #[must_use]
    pub const fn title_pause(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.title_pause_ms)
    }

    /// Merge a partial update, only touching fields that are `Some`.
    pub fn merge(&mut self, update: &SpeechSettingsUpdate) {
        if let Some(rate) = update.rate {
            self.rate = rate;
        }
        if let Some(pitch) = update.pitch {
            self.pitch = pitch;
        }
        if let Some(ref voice) = update.voice {
            self.voice.clone_from(voice);
        }
        if let Some(ref languages) = update.languages {
            self.languages.clone_from(languages);
        }
        if let Some(max) = update.max_chunk_chars {
            self.max_chunk_chars = max;
        }
        if let Some(ms) = update.title_pause_ms {
            self.title_pause_ms = ms;
        }
        if let Some(chars) = update.resume_lookback_chars {
            self.resume_lookback_chars = chars;
        }
    }
}

/// One field of [`SpeechSettings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingField {
    Rate,
    Pitch,
    Voice,
    Languages,
    MaxChunkChars,
    TitlePauseMs,
    ResumeLookbackChars,
}

impl SettingField {
    /// The field's name as it appears in the settings file.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rate => "rate",
            Self::Pitch => "pitch",
            Self::Voice => "voice",
            Self::Languages => "languages",
            Self::MaxChunkChars => "max_chunk_chars",
            Self::TitlePauseMs => "title_pause_ms",
            Self::ResumeLookbackChars => "resume_lookback_chars",
        }
    }

    /// Whether a running session picks the change up on its next utterance.
    ///
    /// Synthesis parameters are pushed to the engine live. Chunking, the
    /// title pause and the language list are fixed when a session starts.
    #[must_use]
    pub const fn applies_to_next_utterance(self) -> bool {
        matches!(self, Self::Rate | Self::Pitch | Self::Voice)
    }
}

impl SpeechSettings {
    /// Fields whose values differ between `self` and `other`, in declaration
    /// order. Multipliers are compared bit for bit.
    #[must_use]
    pub fn changed_fields(&self, other: &Self) -> Vec<SettingField> {
        let checks = [
            (SettingField::Rate, self.rate.to_bits() != other.rate.to_bits()),
            (SettingField::Pitch, self.pitch.to_bits() != other.pitch.to_bits()),
            (SettingField::Voice, self.voice != other.voice),
            (SettingField::Languages, self.languages != other.languages),
            (SettingField::MaxChunkChars, self.max_chunk_chars != other.max_chunk_chars),
            (SettingField::TitlePauseMs, self.title_pause_ms != other.title_pause_ms),
            (
                SettingField::ResumeLookbackChars,
                self.resume_lookback_chars != other.resume_lookback_chars,
            ),
        ];
        checks
            .into_iter()
            .filter_map(|(field, changed)| changed.then_some(field))
            .collect()
    }
}

/// Partial settings update.
///
/// `voice` is `Option<Option<String>>`:
/// - `None` = don't change
/// - `Some(None)` = clear (use the engine default voice)
/// - `Some(Some(name))` = select `name`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeechSettingsUpdate {
    pub rate: Option<f32>,
    pub pitch: Option<f32>,
    pub voice: Option<Option<String>>,
    pub languages: Option<Vec<String>>,
    pub max_chunk_chars: Option<usize>,
    pub title_pause_ms: Option<u64>,
    pub resume_lookback_chars: Option<usize>,
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("Speech rate must be between 0.5 and 2.0, got {0}")]
    InvalidRate(f32),

    #[error("Pitch must be between 0.5 and 2.0, got {0}")]
    InvalidPitch(f32),

    #[error("Maximum chunk length must be at least 1 character")]
    InvalidChunkLength,

    #[error("Voice name cannot be blank")]
    BlankVoice,
}

/// Validate settings values.
pub fn validate_settings(settings: &SpeechSettings) -> Result<(), SettingsError> {
    if !MULTIPLIER_RANGE.contains(&settings.rate) {
        return Err(SettingsError::InvalidRate(settings.rate));
    }

    if !MULTIPLIER_RANGE.contains(&settings.pitch) {
        return Err(SettingsError::InvalidPitch(settings.pitch));
    }

    if settings.max_chunk_chars == 0 {
        return Err(SettingsError::InvalidChunkLength);
    }

    if settings
        .voice
        .as_ref()
        .is_some_and(|v| v.trim().is_empty())
    {
        return Err(SettingsError::BlankVoice);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = SpeechSettings::default();
        assert!((settings.rate - 1.0).abs() < f32::EPSILON);
        assert!((settings.pitch - 1.0).abs() < f32::EPSILON);
        assert_eq!(settings.voice, None);
        assert_eq!(settings.languages, vec!["vi-VN", "en-US"]);
        assert_eq!(settings.max_chunk_chars, 3500);
        assert_eq!(settings.title_pause(), std::time::Duration::from_secs(1));
        assert_eq!(settings.resume_lookback_chars, 100);
    }

    #[test]
    fn test_changed_fields() {
        let base = SpeechSettings::default();
        assert!(base.changed_fields(&base.clone()).is_empty());

        let other = SpeechSettings {
            pitch: 1.5,
            voice: Some("en-voice".to_owned()),
            title_pause_ms: 250,
            ..Default::default()
        };
        let changed = base.changed_fields(&other);
        assert_eq!(
            changed,
            vec![
                SettingField::Pitch,
                SettingField::Voice,
                SettingField::TitlePauseMs
            ]
        );
        assert!(changed[0].applies_to_next_utterance());
        assert!(!changed[2].applies_to_next_utterance());
        assert_eq!(SettingField::MaxChunkChars.name(), "max_chunk_chars");
    }

    #[test]
    fn test_validate_settings_valid() {
        assert!(validate_settings(&SpeechSettings::default()).is_ok());
    }

    #[test]
    fn test_validate_rate_out_of_range() {
        let settings = SpeechSettings {
            rate: 3.0,
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidRate(_))
        ));
    }

    #[test]
    fn test_validate_pitch_out_of_range() {
        let settings = SpeechSettings {
            pitch: 0.1,
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidPitch(_))
        ));
    }

    #[test]
    fn test_validate_zero_chunk_length() {
        let settings = SpeechSettings {
            max_chunk_chars: 0,
            ..Default::default()
        };
        assert_eq!(
            validate_settings(&settings),
            Err(SettingsError::InvalidChunkLength)
        );
    }

    #[test]
    fn test_validate_blank_voice() {
        let settings = SpeechSettings {
            voice: Some("  ".to_owned()),
            ..Default::default()
        };
        assert_eq!(validate_settings(&settings), Err(SettingsError::BlankVoice));
    }

    #[test]
    fn test_merge_settings() {
        let mut settings = SpeechSettings {
            voice: Some("vi-vn-x-gft-local".to_owned()),
            ..Default::default()
        };
        let update = SpeechSettingsUpdate {
            rate: Some(1.5),
            voice: Some(None), // Back to engine default
            ..Default::default()
        };
        settings.merge(&update);

        assert!((settings.rate - 1.5).abs() < f32::EPSILON);
        assert_eq!(settings.voice, None);
        assert_eq!(settings.max_chunk_chars, DEFAULT_MAX_CHUNK_CHARS); // Unchanged
    }

    #[test]
    fn test_missing_fields_deserialize_to_defaults() {
        let settings: SpeechSettings = serde_json::from_str(r#"{ "rate": 1.25 }"#).unwrap();
        assert!((settings.rate - 1.25).abs() < f32::EPSILON);
        assert_eq!(settings.max_chunk_chars, DEFAULT_MAX_CHUNK_CHARS);
        assert_eq!(settings.languages.len(), 2);
    }
}
