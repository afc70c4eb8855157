//! Queue of directives for the current utterance.
//!
//! Phoneme runs are not synthesized when they are queued. At the end of the
//! utterance, adjacent runs recorded under equal settings are merged and sent
//! to the voice model in a single call. Audio and marks are never merged and
//! split any run around them.

use crate::{AudioResult, SpeechResult};

use super::model::{PhonemeGroup, Result};
use super::settings::Settings;

/// Phonemes waiting to be synthesized.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPhonemes {
    /// Copy of the settings at the time the phonemes were queued
    pub settings: Settings,
    /// One group per word, say-as expansion or raw phoneme token
    pub phonemes: Vec<PhonemeGroup>,
    /// Never merge this run with the one before it
    pub is_utterance: bool,
}

/// An entry of the [`DirectiveBuffer`].
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Phonemes(PendingPhonemes),
    /// A finished result, passed through in place
    Result(SpeechResult),
}

/// Ordered, append-only list of directives.
#[derive(Debug, Default)]
pub struct DirectiveBuffer {
    entries: Vec<Directive>,
}

impl DirectiveBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue phonemes under a copy of `settings`.
    pub fn push_phonemes(&mut self, settings: &Settings, phonemes: Vec<PhonemeGroup>) {
        self.entries.push(Directive::Phonemes(PendingPhonemes {
            settings: settings.clone(),
            phonemes,
            is_utterance: false,
        }));
    }

    pub fn push_audio(&mut self, audio: AudioResult) {
        self.entries.push(Directive::Result(SpeechResult::Audio(audio)));
    }

    pub fn push_mark(&mut self, name: &str) {
        self.entries.push(Directive::Result(SpeechResult::Mark {
            name: name.to_string(),
        }));
    }

    pub fn push(&mut self, directive: Directive) {
        self.entries.push(directive);
    }

    pub fn entries(&self) -> &[Directive] {
        &self.entries
    }

    /// Remove and return every entry, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<Directive> {
        std::mem::take(&mut self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Turn queued directives into results, in order.
///
/// `synthesize` is called once per maximal run of phonemes that share equal
/// settings and are not separated by a result or an utterance boundary. It
/// receives the merged phoneme groups and the settings of that run. Each
/// result goes to `emit` as soon as it exists, so results produced before an
/// error are kept by the caller.
pub fn coalesce<S, E>(entries: Vec<Directive>, mut synthesize: S, mut emit: E) -> Result<()>
where
    S: FnMut(&[PhonemeGroup], &Settings) -> Result<AudioResult>,
    E: FnMut(SpeechResult),
{
    let mut last_settings: Option<Settings> = None;
    let mut run: Vec<PhonemeGroup> = Vec::new();

    for entry in entries {
        match entry {
            Directive::Phonemes(pending) => {
                let boundary =
                    pending.is_utterance || last_settings.as_ref() != Some(&pending.settings);
                if boundary {
                    if let Some(settings) = last_settings.as_ref().filter(|_| !run.is_empty()) {
                        emit(SpeechResult::Audio(synthesize(&run, settings)?));
                        run.clear();
                    }
                }

                run.extend(pending.phonemes);
                last_settings = Some(pending.settings);
            }
            Directive::Result(result) => {
                if let Some(settings) = last_settings.as_ref().filter(|_| !run.is_empty()) {
                    emit(SpeechResult::Audio(synthesize(&run, settings)?));
                    run.clear();
                }

                emit(result);
            }
        }
    }

    if let Some(settings) = last_settings.as_ref().filter(|_| !run.is_empty()) {
        emit(SpeechResult::Audio(synthesize(&run, settings)?));
    }

    Ok(())
}
