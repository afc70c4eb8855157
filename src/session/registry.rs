use std::collections::BTreeMap;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use super::model::{Result, SessionError};

const BUILTIN_REGISTRY_JSON: &str = include_str!("registry.json");

static BUILTIN_REGISTRY: OnceCell<Registry> = OnceCell::new();

/// Default scale parameters of a voice, as advertised before it is downloaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceProperties {
    pub length_scale: f32,
    pub noise_scale: f32,
    pub noise_w: f32,
}

impl Default for VoiceProperties {
    fn default() -> Self {
        Self {
            length_scale: 1.0,
            noise_scale: 0.667,
            noise_w: 0.8,
        }
    }
}

/// A downloadable voice.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryEntry {
    /// Files to fetch into the voice directory, relative to its URL
    pub files: Vec<String>,
    pub speakers: Option<Vec<String>>,
    pub properties: VoiceProperties,
}

/// Known downloadable voices, keyed by `<lang>/<name>`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    voices: BTreeMap<String, RegistryEntry>,
}

impl Registry {
    /// Parse a registry from a JSON object of `key -> entry`.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(SessionError::Registry)
    }

    /// The registry compiled into the crate.
    pub fn builtin() -> Result<&'static Registry> {
        BUILTIN_REGISTRY.get_or_try_init(|| Registry::from_json(BUILTIN_REGISTRY_JSON))
    }

    pub fn get(&self, voice_key: &str) -> Option<&RegistryEntry> {
        self.voices.get(voice_key)
    }

    pub fn insert(&mut self, voice_key: impl Into<String>, entry: RegistryEntry) {
        self.voices.insert(voice_key.into(), entry);
    }

    /// All keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.voices.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}

impl FromIterator<(String, RegistryEntry)> for Registry {
    fn from_iter<I: IntoIterator<Item = (String, RegistryEntry)>>(iter: I) -> Self {
        Self {
            voices: iter.into_iter().collect(),
        }
    }
}
