use std::path::{Path, PathBuf};

use super::model::BoxError;

/// Substitute `{key}`, `{lang}` and `{name}` into a voice URL template.
pub fn format_voice_url(url_format: &str, voice_key: &str) -> String {
    let (lang, name) = voice_key.split_once('/').unwrap_or(("", voice_key));
    url_format
        .replace("{key}", voice_key)
        .replace("{lang}", lang)
        .replace("{name}", name)
}

/// Directory a voice is downloaded to: `<voices_dir>/<lang>/<name>`.
pub fn voice_download_dir(voices_dir: &Path, voice_key: &str) -> PathBuf {
    voice_key
        .split('/')
        .filter(|part| !part.is_empty())
        .fold(voices_dir.to_path_buf(), |dir, part| dir.join(part))
}

/// A request to fetch one voice's files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// `<lang>/<name>`
    pub voice_key: String,
    /// URL of the voice directory; each file is fetched relative to it
    pub url_base: String,
    pub files: Vec<String>,
    /// Root of the downloaded voices tree
    pub voices_dir: PathBuf,
    /// Where the files are expected to land
    pub voice_dir: PathBuf,
}

impl DownloadRequest {
    pub fn new(voice_key: &str, url_format: &str, files: Vec<String>, voices_dir: &Path) -> Self {
        Self {
            voice_key: voice_key.to_string(),
            url_base: format_voice_url(url_format, voice_key),
            files,
            voices_dir: voices_dir.to_path_buf(),
            voice_dir: voice_download_dir(voices_dir, voice_key),
        }
    }
}

/// Transfers voice files to disk.
///
/// Called at most once per resolution and never retried by the session;
/// any retry policy belongs to the implementation.
pub trait VoiceDownloader {
    /// Fetch `request.files` into `request.voice_dir`, blocking until done.
    fn download(&self, request: &DownloadRequest) -> Result<(), BoxError>;
}
