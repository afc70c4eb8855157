use std::path::Path;

use serde::{Deserialize, Serialize};

use super::model::{Result, SessionError};

/// File name of a voice's model config inside its directory.
pub const CONFIG_FILE: &str = "config.json";

/// File name of a voice's speaker list inside its directory.
pub const SPEAKERS_FILE: &str = "speakers.txt";

/// The parts of a voice's `config.json` the session relies on.
///
/// Any other keys in the file are ignored; missing sections take the
/// defaults below.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub audio: AudioConfig,
    pub inference: InferenceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate of the model's output in Hertz
    pub sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { sample_rate: 22050 }
    }
}

/// Scale parameters used when a request does not override them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub length_scale: f32,
    pub noise_scale: f32,
    pub noise_w: f32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            length_scale: 1.0,
            noise_scale: 0.667,
            noise_w: 0.8,
        }
    }
}

impl VoiceConfig {
    /// Load a voice config from a `config.json` file.
    ///
    /// A file that exists but does not parse is an error; it is never skipped.
    pub fn load(config_path: &Path) -> Result<Self> {
        log::debug!("Loading config from {}", config_path.display());
        let content = std::fs::read_to_string(config_path)?;
        serde_json::from_str(&content).map_err(|source| SessionError::Config {
            path: config_path.to_path_buf(),
            source,
        })
    }
}

/// Read the speaker names of a voice directory, one per non-blank line.
///
/// Returns `None` when the voice has no `speakers.txt`.
pub fn load_speakers(voice_dir: &Path) -> Result<Option<Vec<String>>> {
    let speakers_path = voice_dir.join(SPEAKERS_FILE);
    if !speakers_path.is_file() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&speakers_path)?;
    let speakers = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    Ok(Some(speakers))
}
