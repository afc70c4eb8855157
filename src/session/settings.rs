use std::fmt;
use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use super::model::{Result, SessionError};

/// Voice used when none has been set.
pub const DEFAULT_VOICE: &str = "en_UK/apope_low";

/// Language used when none has been set.
pub const DEFAULT_LANGUAGE: &str = "en_US";

/// Sample rate of generated silence when none has been set.
pub const DEFAULT_SAMPLE_RATE: u32 = 22050;

/// Where voices not found locally are fetched from.
///
/// May contain `{key}` (`<lang>/<name>`), `{lang}` and `{name}`.
pub const DEFAULT_VOICES_URL_FORMAT: &str =
    "https://huggingface.co/mycroftai/mimic3-voices/resolve/main/voices/{lang}/{name}";

/// Path of the voices tree below a data directory.
pub const VOICES_SUBDIR: &str = "mimic3/voices";

/// Speaker of a multi-speaker voice, by index or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Speaker {
    Id(u32),
    Name(String),
}

impl From<&str> for Speaker {
    /// Always a name, even when it is all digits; see `VoiceHandle::speaker_id`.
    fn from(value: &str) -> Self {
        Speaker::Name(value.to_string())
    }
}

impl From<u32> for Speaker {
    fn from(value: u32) -> Self {
        Speaker::Id(value)
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::Id(id) => write!(f, "{id}"),
            Speaker::Name(name) => f.write_str(name),
        }
    }
}

/// Synthesis settings.
///
/// A copy of the live settings is stored with every queued phoneme run, and
/// two runs are synthesized together only if their copies are equal field by
/// field. `None` scale fields defer to the voice's own config.
///
/// ```rust
/// use tts_session::session::{SettingsBuilder, Speaker};
///
/// let settings = SettingsBuilder::default()
///     .voice("en_US/vctk_low")
///     .speaker(Speaker::Name("p239".into()))
///     .length_scale(1.2f32)
///     .build()?;
/// assert_eq!(settings.sample_rate, 22050);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default, setter(into, strip_option))]
#[serde(default)]
pub struct Settings {
    /// Voice key, `<lang>/<name>` or an unambiguous suffix of it
    pub voice: Option<String>,
    /// Default language (e.g. `"en_US"`)
    pub language: Option<String>,
    /// Language of spoken text (voice language if `None`)
    pub text_language: Option<String>,
    pub speaker: Option<Speaker>,
    pub length_scale: Option<f32>,
    pub noise_scale: Option<f32>,
    pub noise_w: Option<f32>,
    /// Sample rate of silence from breaks, in Hertz
    pub sample_rate: u32,
    /// Directories searched for `<lang>/<voice>/` before the default ones
    pub voices_directories: Option<Vec<PathBuf>>,
    pub voices_url_format: Option<String>,
    /// Directory that downloaded voices are written to
    pub voices_download_dir: PathBuf,
    /// Never download voices that are not found locally
    pub no_download: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            voice: None,
            language: None,
            text_language: None,
            speaker: None,
            length_scale: None,
            noise_scale: None,
            noise_w: None,
            sample_rate: DEFAULT_SAMPLE_RATE,
            voices_directories: None,
            voices_url_format: Some(DEFAULT_VOICES_URL_FORMAT.to_string()),
            voices_download_dir: default_voices_download_dir(),
            no_download: false,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file. Missing keys take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|source| SessionError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Active voice key.
    pub fn voice(&self) -> &str {
        self.voice.as_deref().unwrap_or(DEFAULT_VOICE)
    }

    /// Set the voice from `"<voice>"` or `"<voice>#<speaker>"`.
    ///
    /// Switching to a different voice clears the speaker, since speakers
    /// belong to one voice. An empty suffix (`"<voice>#"`) also clears it.
    /// An empty value selects [`DEFAULT_VOICE`].
    pub fn set_voice(&mut self, value: &str) {
        let value = if value.is_empty() { DEFAULT_VOICE } else { value };
        let (voice, speaker) = match value.split_once('#') {
            Some((voice, speaker)) => (voice, Some(speaker)),
            None => (value, None),
        };

        if self.voice.as_deref() != Some(voice) {
            self.speaker = None;
        }
        self.voice = Some(voice.to_string());

        match speaker {
            Some("") => self.speaker = None,
            Some(speaker) => self.speaker = Some(Speaker::from(speaker)),
            None => {}
        }
    }

    /// Active language.
    pub fn language(&self) -> &str {
        self.language.as_deref().unwrap_or(DEFAULT_LANGUAGE)
    }

    /// Template for the URL of a voice directory.
    pub fn voices_url_format(&self) -> &str {
        self.voices_url_format
            .as_deref()
            .unwrap_or(DEFAULT_VOICES_URL_FORMAT)
    }
}

/// `<user data dir>/mimic3/voices`, or a relative `mimic3/voices` if the
/// platform has no data directory.
pub fn default_voices_download_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(VOICES_SUBDIR))
        .unwrap_or_else(|| PathBuf::from(VOICES_SUBDIR))
}

/// Directories searched for voices after the configured ones.
///
/// On Linux this is typically:
/// - `$HOME/.local/share/mimic3/voices`
/// - `/usr/local/share/mimic3/voices`
/// - `/usr/share/mimic3/voices`
pub fn default_voices_directories() -> Vec<PathBuf> {
    let mut data_dirs: Vec<PathBuf> = dirs::data_dir().into_iter().collect();

    let system_dirs = std::env::var("XDG_DATA_DIRS")
        .ok()
        .filter(|dirs| !dirs.is_empty())
        .unwrap_or_else(|| "/usr/local/share:/usr/share".to_string());
    data_dirs.extend(
        system_dirs
            .split(':')
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from),
    );

    data_dirs
        .into_iter()
        .map(|dir| dir.join(VOICES_SUBDIR))
        .collect()
}
