use std::path::{Path, PathBuf};

use super::config::VoiceConfig;

/// One word, say-as expansion or raw phoneme token, as a list of phoneme symbols.
pub type PhonemeGroup = Vec<String>;

/// Error type returned by the voice model, loader and downloader.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("Voice not found: {0}")]
    VoiceNotFound(String),
    #[error("Invalid voice config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid voice registry: {0}")]
    Registry(#[source] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to download voice '{voice_key}': {source}")]
    Transfer {
        voice_key: String,
        #[source]
        source: BoxError,
    },
    #[error("Failed to load voice from {}: {source}", model_dir.display())]
    Load {
        model_dir: PathBuf,
        #[source]
        source: BoxError,
    },
    #[error("Phonemization failed: {0}")]
    Phonemes(#[source] BoxError),
    #[error("Synthesis failed: {0}")]
    Synthesis(#[source] BoxError),
}

/// Per-request overrides passed to [`VoiceModel::ids_to_audio`].
///
/// Every field has already been resolved against the voice's own config.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceParams {
    /// Speaker id for multi-speaker voices. `None` = model default.
    pub speaker: Option<u32>,
    pub length_scale: f32,
    pub noise_scale: f32,
    pub noise_w: f32,
}

/// A loaded neural voice.
///
/// Implementations wrap the phonemizer and the acoustic model bound to one
/// on-disk voice directory. They are expensive to build and are owned by the
/// session's voice cache once loaded.
pub trait VoiceModel {
    /// Split free text into sentences of phoneme groups.
    ///
    /// `text_language` of `None` means the voice's own language.
    fn text_to_phonemes(
        &self,
        text: &str,
        text_language: Option<&str>,
    ) -> std::result::Result<Vec<Vec<PhonemeGroup>>, BoxError>;

    /// Phonemize a single word, optionally disambiguated by its role (e.g. `"gruut:VB"`).
    fn word_to_phonemes(
        &self,
        word: &str,
        role: Option<&str>,
        text_language: Option<&str>,
    ) -> std::result::Result<PhonemeGroup, BoxError>;

    /// Expand and phonemize a say-as span (numbers, dates, characters, ...).
    fn say_as_to_phonemes(
        &self,
        text: &str,
        interpret_as: &str,
        format: Option<&str>,
        text_language: Option<&str>,
    ) -> std::result::Result<Vec<PhonemeGroup>, BoxError>;

    /// Map phoneme groups to the model's input ids.
    fn phonemes_to_ids(&self, phonemes: &[PhonemeGroup])
        -> std::result::Result<Vec<i64>, BoxError>;

    /// Run the model and return 16-bit mono samples at the voice's sample rate.
    fn ids_to_audio(
        &mut self,
        ids: &[i64],
        params: &InferenceParams,
    ) -> std::result::Result<Vec<i16>, BoxError>;
}

/// Builds a [`VoiceModel`] from a voice directory.
pub trait VoiceLoader {
    fn load(
        &self,
        model_dir: &Path,
        config: &VoiceConfig,
    ) -> std::result::Result<Box<dyn VoiceModel>, BoxError>;
}
