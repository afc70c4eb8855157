use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::AudioResult;

use super::catalog::{file_name, VoiceCatalog};
use super::config::{load_speakers, VoiceConfig, CONFIG_FILE};
use super::download::{DownloadRequest, VoiceDownloader};
use super::model::{
    InferenceParams, PhonemeGroup, Result, SessionError, VoiceLoader, VoiceModel,
};
use super::registry::Registry;
use super::settings::{Settings, Speaker};

/// A voice loaded from disk, with its config and speaker names.
pub struct VoiceHandle {
    key: String,
    model_dir: PathBuf,
    config: VoiceConfig,
    speakers: Option<Vec<String>>,
    model: Box<dyn VoiceModel>,
}

impl VoiceHandle {
    /// Load the voice in `model_dir` through `loader`.
    pub fn load(model_dir: &Path, loader: &dyn VoiceLoader) -> Result<Self> {
        let config = VoiceConfig::load(&model_dir.join(CONFIG_FILE))?;
        let speakers = load_speakers(model_dir)?;
        let model = loader
            .load(model_dir, &config)
            .map_err(|source| SessionError::Load {
                model_dir: model_dir.to_path_buf(),
                source,
            })?;

        log::info!("Loaded voice from {}", model_dir.display());

        Ok(Self {
            key: canonical_key(model_dir),
            model_dir: model_dir.to_path_buf(),
            config,
            speakers,
            model,
        })
    }

    /// Canonical `<lang>/<name>` key.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    pub fn speakers(&self) -> Option<&[String]> {
        self.speakers.as_deref()
    }

    pub fn model(&self) -> &dyn VoiceModel {
        self.model.as_ref()
    }

    /// Map a speaker to the model's speaker id.
    ///
    /// Names are looked up in `speakers.txt` first, so numeric names such as
    /// `"6097"` resolve to their line. A name missing from the list is used as
    /// an id if it is all digits; otherwise the model's default speaker is used.
    pub fn speaker_id(&self, speaker: Option<&Speaker>) -> Option<u32> {
        let name = match speaker? {
            Speaker::Id(id) => return Some(*id),
            Speaker::Name(name) => name,
        };

        let listed = self
            .speakers
            .as_ref()
            .and_then(|speakers| speakers.iter().position(|s| s == name))
            .and_then(|idx| u32::try_from(idx).ok());
        if listed.is_some() {
            return listed;
        }

        let id = name.parse().ok();
        if id.is_none() {
            log::warn!("Speaker '{name}' not found in voice {}, using default", self.key);
        }
        id
    }

    /// Synthesize one run of phonemes under `settings`.
    ///
    /// Unset scale fields take the voice's own defaults. The clip uses the
    /// voice's sample rate.
    pub fn synthesize(
        &mut self,
        phonemes: &[PhonemeGroup],
        settings: &Settings,
    ) -> Result<AudioResult> {
        let ids = self
            .model
            .phonemes_to_ids(phonemes)
            .map_err(SessionError::Phonemes)?;

        log::debug!("phonemes={phonemes:?}, ids={ids:?}");

        let inference = &self.config.inference;
        let params = InferenceParams {
            speaker: self.speaker_id(settings.speaker.as_ref()),
            length_scale: settings.length_scale.unwrap_or(inference.length_scale),
            noise_scale: settings.noise_scale.unwrap_or(inference.noise_scale),
            noise_w: settings.noise_w.unwrap_or(inference.noise_w),
        };

        let samples = self
            .model
            .ids_to_audio(&ids, &params)
            .map_err(SessionError::Synthesis)?;
        if samples.is_empty() {
            log::warn!("No audio produced for {} phoneme groups", phonemes.len());
        }

        Ok(AudioResult::from_samples(self.config.audio.sample_rate, &samples))
    }
}

/// `<lang>/<name>` from the last two components of a voice directory.
pub fn canonical_key(model_dir: &Path) -> String {
    let language = model_dir.parent().map(file_name).unwrap_or_default();
    format!("{language}/{}", file_name(model_dir))
}

/// Everything needed to find a voice that is not cached yet.
pub struct VoiceSource<'a> {
    pub catalog: VoiceCatalog<'a>,
    pub registry: &'a Registry,
    pub loader: &'a dyn VoiceLoader,
    /// `None` disables downloads
    pub downloader: Option<&'a dyn VoiceDownloader>,
    pub url_format: &'a str,
    pub download_dir: &'a Path,
}

impl VoiceSource<'_> {
    /// Find a local directory for `voice_key`, downloading it if allowed.
    ///
    /// The first catalog voice whose key ends with `voice_key` and that is (or
    /// can be made) available locally wins.
    fn locate(&self, voice_key: &str) -> Result<Option<PathBuf>> {
        for voice in self.catalog.voices() {
            let voice = voice?;
            if !voice.key.ends_with(voice_key) {
                continue;
            }

            if let Some(dir) = voice.location.local_dir() {
                return Ok(Some(dir.to_path_buf()));
            }

            let Some(downloader) = self.downloader else {
                log::debug!("Voice {} is not downloaded and downloads are off", voice.key);
                continue;
            };
            let Some(entry) = self.registry.get(&voice.key) else {
                continue;
            };

            let request = DownloadRequest::new(
                &voice.key,
                self.url_format,
                entry.files.clone(),
                self.download_dir,
            );
            log::info!("Downloading voice {} from {}", voice.key, request.url_base);
            downloader
                .download(&request)
                .map_err(|source| SessionError::Transfer {
                    voice_key: voice.key.clone(),
                    source,
                })?;

            if request.voice_dir.is_dir() {
                return Ok(Some(request.voice_dir));
            }
            log::warn!(
                "Download of {} did not create {}",
                voice.key,
                request.voice_dir.display()
            );
        }

        Ok(None)
    }
}

/// Loaded voices, addressable by canonical key and by any alias.
///
/// Each voice is loaded at most once; aliases are extra keys pointing at the
/// same slot.
#[derive(Default)]
pub struct VoiceCache {
    handles: Vec<VoiceHandle>,
    keys: HashMap<String, usize>,
}

impl VoiceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot of a cached key, without any I/O.
    pub fn get(&self, voice_key: &str) -> Option<usize> {
        self.keys.get(voice_key).copied()
    }

    pub fn handle(&self, slot: usize) -> &VoiceHandle {
        &self.handles[slot]
    }

    pub fn handle_mut(&mut self, slot: usize) -> &mut VoiceHandle {
        &mut self.handles[slot]
    }

    /// Cache `handle` under its canonical key and `voice_key`.
    pub fn insert(&mut self, voice_key: &str, handle: VoiceHandle) -> usize {
        let slot = self.handles.len();
        self.keys.insert(handle.key().to_string(), slot);
        self.keys.insert(voice_key.to_string(), slot);
        self.handles.push(handle);
        slot
    }

    /// Resolve `voice_key` to a loaded voice, loading or downloading it if needed.
    pub fn resolve(&mut self, voice_key: &str, source: &VoiceSource<'_>) -> Result<usize> {
        if let Some(slot) = self.get(voice_key) {
            return Ok(slot);
        }

        let model_dir = source
            .locate(voice_key)?
            .ok_or_else(|| SessionError::VoiceNotFound(voice_key.to_string()))?;

        let key = canonical_key(&model_dir);
        if let Some(slot) = self.get(&key) {
            log::debug!("Voice {voice_key} is an alias of {key}");
            self.keys.insert(voice_key.to_string(), slot);
            return Ok(slot);
        }

        let handle = VoiceHandle::load(&model_dir, source.loader)?;
        Ok(self.insert(voice_key, handle))
    }

    /// All cached keys, canonical and aliases, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Number of distinct loaded voices.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
