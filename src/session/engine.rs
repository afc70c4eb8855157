use std::path::PathBuf;
use std::sync::Arc;

use crate::{AudioResult, SpeechResult, TextToSpeechSystem};

use super::buffer::{coalesce, DirectiveBuffer};
use super::catalog::{VoiceCatalog, Voices};
use super::download::VoiceDownloader;
use super::model::{PhonemeGroup, Result, SessionError, VoiceLoader};
use super::registry::Registry;
use super::settings::{default_voices_directories, Settings, Speaker};
use super::tokens::{split_phonemes, Token};
use super::voices::{VoiceCache, VoiceHandle, VoiceSource};

/// A speech session.
///
/// Holds the live [`Settings`], the directives queued for the current
/// utterance and every voice loaded so far. One session serves one caller at
/// a time; use a session per thread.
///
/// # Quick Start
///
/// ```rust,no_run
/// use tts_session::session::{Session, Settings, VoiceLoader};
/// use tts_session::TextToSpeechSystem;
///
/// fn speak(loader: Box<dyn VoiceLoader>) -> Result<(), Box<dyn std::error::Error>> {
///     let mut session = Session::new(Settings::default(), loader);
///     session.set_voice("en_US/vctk_low#p239");
///     session.speak_text("Hello, world!", None)?;
///     session.add_break(500);
///     session.set_mark("after-pause");
///
///     for result in session.end_utterance()? {
///         println!("{result:?}");
///     }
///     Ok(())
/// }
/// ```
pub struct Session {
    settings: Settings,
    buffer: DirectiveBuffer,
    voices: VoiceCache,
    loader: Box<dyn VoiceLoader>,
    downloader: Option<Box<dyn VoiceDownloader>>,
    registry: Option<Arc<Registry>>,
    default_voices_directories: Vec<PathBuf>,
}

impl Session {
    /// Create a session that loads voices through `loader`.
    ///
    /// Voices are searched in the configured directories, then in the
    /// platform data directories. Nothing is downloaded until a downloader is
    /// installed with [`with_downloader`](Self::with_downloader).
    pub fn new(settings: Settings, loader: Box<dyn VoiceLoader>) -> Self {
        Self {
            settings,
            buffer: DirectiveBuffer::new(),
            voices: VoiceCache::new(),
            loader,
            downloader: None,
            registry: None,
            default_voices_directories: default_voices_directories(),
        }
    }

    /// Fetch voices that are in the registry but not on disk.
    pub fn with_downloader(mut self, downloader: Box<dyn VoiceDownloader>) -> Self {
        self.downloader = Some(downloader);
        self
    }

    /// Replace the built-in registry of downloadable voices.
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    /// Replace the directories searched after `Settings::voices_directories`.
    pub fn with_default_voices_directories(mut self, dirs: Vec<PathBuf>) -> Self {
        self.default_voices_directories = dirs;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Live settings. Changes apply to directives queued afterwards.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Directives queued for the current utterance.
    pub fn pending(&self) -> &DirectiveBuffer {
        &self.buffer
    }

    /// Keys of every loaded voice, including aliases.
    pub fn loaded_voices(&self) -> Vec<&str> {
        self.voices.keys()
    }

    /// Lazily list every voice visible to this session.
    ///
    /// Each call starts a fresh walk of the filesystem. Fails only if the
    /// built-in registry cannot be parsed; per-voice errors come from the
    /// iterator.
    pub fn voices(&self) -> Result<Voices<'_>> {
        let registry = self.registry()?;
        Ok(voice_catalog(&self.settings, &self.default_voices_directories, registry).voices())
    }

    /// Load a voice now instead of at first use.
    pub fn preload_voice(&mut self, voice_key: &str) -> Result<&VoiceHandle> {
        let slot = self.resolve_voice(voice_key)?;
        Ok(self.voices.handle(slot))
    }

    fn registry(&self) -> Result<&Registry> {
        match &self.registry {
            Some(registry) => Ok(registry.as_ref()),
            None => Registry::builtin(),
        }
    }

    fn resolve_voice(&mut self, voice_key: &str) -> Result<usize> {
        if let Some(slot) = self.voices.get(voice_key) {
            return Ok(slot);
        }

        let registry = match &self.registry {
            Some(registry) => registry.as_ref(),
            None => Registry::builtin()?,
        };
        let downloader = if self.settings.no_download {
            None
        } else {
            self.downloader.as_deref()
        };
        let source = VoiceSource {
            catalog: voice_catalog(&self.settings, &self.default_voices_directories, registry),
            registry,
            loader: self.loader.as_ref(),
            downloader,
            url_format: self.settings.voices_url_format(),
            download_dir: &self.settings.voices_download_dir,
        };

        self.voices.resolve(voice_key, &source)
    }

    /// Synthesize one coalesced run under the settings it was queued with.
    fn speak_phonemes(
        &mut self,
        phonemes: &[PhonemeGroup],
        settings: &Settings,
    ) -> Result<AudioResult> {
        let voice_key = settings.voice.as_deref().unwrap_or(self.settings.voice()).to_string();
        let slot = self.resolve_voice(&voice_key)?;
        self.voices.handle_mut(slot).synthesize(phonemes, settings)
    }

    fn text_language<'a>(&'a self, text_language: Option<&'a str>) -> Option<&'a str> {
        text_language.or(self.settings.text_language.as_deref())
    }
}

/// Configured search directories first, then the defaults.
fn voice_catalog<'a>(
    settings: &'a Settings,
    default_dirs: &[PathBuf],
    registry: &'a Registry,
) -> VoiceCatalog<'a> {
    let mut search_dirs = settings.voices_directories.clone().unwrap_or_default();
    search_dirs.extend(default_dirs.iter().cloned());
    VoiceCatalog::new(search_dirs, registry, settings.voices_url_format())
}

impl TextToSpeechSystem for Session {
    type Error = SessionError;

    fn voice(&self) -> &str {
        self.settings.voice()
    }

    fn set_voice(&mut self, voice: &str) {
        self.settings.set_voice(voice);
    }

    fn speaker(&self) -> Option<&Speaker> {
        self.settings.speaker.as_ref()
    }

    fn set_speaker(&mut self, speaker: Option<Speaker>) {
        self.settings.speaker = speaker;
    }

    fn language(&self) -> &str {
        self.settings.language()
    }

    fn set_language(&mut self, language: &str) {
        self.settings.language = Some(language.to_string());
    }

    fn begin_utterance(&mut self) {
        log::debug!("Beginning utterance ({} directives pending)", self.buffer.len());
    }

    fn speak_text(&mut self, text: &str, text_language: Option<&str>) -> Result<()> {
        let voice_key = self.settings.voice().to_string();
        let slot = self.resolve_voice(&voice_key)?;
        let text_language = self.text_language(text_language);

        let sentences = self
            .voices
            .handle(slot)
            .model()
            .text_to_phonemes(text, text_language)
            .map_err(SessionError::Phonemes)?;

        for sentence in sentences {
            self.buffer.push_phonemes(&self.settings, sentence);
        }
        Ok(())
    }

    fn speak_tokens(&mut self, tokens: &[Token], text_language: Option<&str>) -> Result<()> {
        let voice_key = self.settings.voice().to_string();
        let slot = self.resolve_voice(&voice_key)?;
        let text_language = self.text_language(text_language);
        let model = self.voices.handle(slot).model();

        let mut token_phonemes: Vec<PhonemeGroup> = Vec::new();
        for token in tokens {
            match token {
                Token::Word { text, role } => {
                    let word = model
                        .word_to_phonemes(text, role.as_deref(), text_language)
                        .map_err(SessionError::Phonemes)?;
                    token_phonemes.push(word);
                }
                Token::Phonemes { text } => token_phonemes.push(split_phonemes(text)),
                Token::SayAs {
                    text,
                    interpret_as,
                    format,
                } => {
                    let expanded = model
                        .say_as_to_phonemes(text, interpret_as, format.as_deref(), text_language)
                        .map_err(SessionError::Phonemes)?;
                    token_phonemes.extend(expanded);
                }
            }
        }

        if !token_phonemes.is_empty() {
            self.buffer.push_phonemes(&self.settings, token_phonemes);
        }
        Ok(())
    }

    fn add_break(&mut self, time_ms: u32) {
        let sample_rate = self.settings.sample_rate;
        let num_samples = (f64::from(time_ms) / 1000.0 * f64::from(sample_rate)).round() as usize;
        self.buffer.push_audio(AudioResult::silence(sample_rate, num_samples));
    }

    fn set_mark(&mut self, name: &str) {
        self.buffer.push_mark(name);
    }

    fn end_utterance_with(&mut self, emit: &mut dyn FnMut(SpeechResult)) -> Result<()> {
        let entries = self.buffer.take();
        log::debug!("Ending utterance with {} directives", entries.len());

        coalesce(
            entries,
            |phonemes, settings| self.speak_phonemes(phonemes, settings),
            emit,
        )
    }
}
