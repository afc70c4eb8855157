use std::collections::{btree_set, BTreeSet, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::config::{load_speakers, VoiceConfig, CONFIG_FILE};
use super::download::format_voice_url;
use super::model::Result;
use super::registry::{Registry, VoiceProperties};

/// Where a voice can be loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum VoiceLocation {
    /// An absolute path to a `<lang>/<name>` voice directory
    Local(PathBuf),
    /// The URL of a voice that has not been downloaded yet
    Remote(String),
}

impl VoiceLocation {
    /// The directory, if it exists on disk right now.
    pub fn local_dir(&self) -> Option<&Path> {
        match self {
            VoiceLocation::Local(path) if path.is_dir() => Some(path),
            _ => None,
        }
    }
}

/// A voice known to the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceDescriptor {
    /// `<lang>/<name>`
    pub key: String,
    pub name: String,
    pub language: String,
    pub speakers: Option<Vec<String>>,
    pub location: VoiceLocation,
    pub properties: VoiceProperties,
}

impl VoiceDescriptor {
    /// Build a descriptor from a voice directory, reading its config and speakers.
    fn from_directory(language: &str, voice_dir: &Path) -> Result<Self> {
        log::debug!("Voice found in {}", voice_dir.display());

        let config = VoiceConfig::load(&voice_dir.join(CONFIG_FILE))?;
        let speakers = load_speakers(voice_dir)?;
        let name = file_name(voice_dir);

        Ok(Self {
            key: format!("{language}/{name}"),
            name,
            language: language.to_string(),
            speakers,
            location: VoiceLocation::Local(absolute(voice_dir)?),
            properties: VoiceProperties {
                length_scale: config.inference.length_scale,
                noise_scale: config.inference.noise_scale,
                noise_w: config.inference.noise_w,
            },
        })
    }
}

/// The set of voices visible to a session: local voice trees plus the registry.
pub struct VoiceCatalog<'a> {
    search_dirs: Vec<PathBuf>,
    registry: &'a Registry,
    url_format: &'a str,
}

impl<'a> VoiceCatalog<'a> {
    /// `search_dirs` are searched in order, each as `<dir>/<lang>/<voice>/`.
    pub fn new(search_dirs: Vec<PathBuf>, registry: &'a Registry, url_format: &'a str) -> Self {
        Self {
            search_dirs,
            registry,
            url_format,
        }
    }

    /// Enumerate voices.
    ///
    /// Local voices come first, in search order. Registry voices that were not
    /// found locally follow, sorted by key. Nothing is cached: every call
    /// re-reads the filesystem, so a voice downloaded in between shows up as
    /// local on the next call.
    ///
    /// A key is yielded once; a voice directory that repeats an earlier
    /// `<lang>/<name>` (the download directory is usually also a search
    /// directory) is skipped. An unreadable or malformed `config.json` ends
    /// the iteration with an error.
    pub fn voices(&self) -> Voices<'a> {
        Voices {
            registry: self.registry,
            url_format: self.url_format,
            roots: self.search_dirs.clone().into_iter(),
            pending: VecDeque::new(),
            seen: HashSet::new(),
            not_found_locally: self.registry.keys().map(str::to_string).collect(),
            downloadable: None,
            failed: false,
        }
    }
}

/// Iterator returned by [`VoiceCatalog::voices`].
pub struct Voices<'a> {
    registry: &'a Registry,
    url_format: &'a str,
    roots: std::vec::IntoIter<PathBuf>,
    /// `(language, voice directory)` pairs of the current root
    pending: VecDeque<(String, PathBuf)>,
    /// Local keys yielded so far
    seen: HashSet<String>,
    not_found_locally: BTreeSet<String>,
    downloadable: Option<btree_set::IntoIter<String>>,
    failed: bool,
}

impl Voices<'_> {
    fn registry_descriptor(&self, key: &str) -> VoiceDescriptor {
        let (language, name) = key.split_once('/').unwrap_or(("", key));
        let entry = self.registry.get(key).cloned().unwrap_or_default();

        VoiceDescriptor {
            key: key.to_string(),
            name: name.to_string(),
            language: language.to_string(),
            speakers: Some(entry.speakers.unwrap_or_default()),
            location: VoiceLocation::Remote(format_voice_url(self.url_format, key)),
            properties: entry.properties,
        }
    }
}

impl Iterator for Voices<'_> {
    type Item = Result<VoiceDescriptor>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        if self.downloadable.is_none() {
            loop {
                if let Some((language, voice_dir)) = self.pending.pop_front() {
                    let key = format!("{language}/{}", file_name(&voice_dir));
                    if !self.seen.insert(key) {
                        log::debug!("Skipping duplicate voice in {}", voice_dir.display());
                        continue;
                    }

                    return match VoiceDescriptor::from_directory(&language, &voice_dir) {
                        Ok(voice) => {
                            self.not_found_locally.remove(&voice.key);
                            Some(Ok(voice))
                        }
                        Err(e) => {
                            self.failed = true;
                            Some(Err(e))
                        }
                    };
                }

                let Some(root) = self.roots.next() else {
                    break;
                };
                match scan_voices_dir(&root) {
                    Ok(found) => self.pending.extend(found),
                    Err(e) => {
                        self.failed = true;
                        return Some(Err(e));
                    }
                }
            }

            self.downloadable = Some(std::mem::take(&mut self.not_found_locally).into_iter());
        }

        let key = self.downloadable.as_mut()?.next()?;
        Some(Ok(self.registry_descriptor(&key)))
    }
}

/// List `<root>/<lang>/<voice>/` directories that contain a config file.
///
/// Hidden directories are skipped at every level. Entries are sorted so that
/// enumeration order does not depend on the filesystem.
fn scan_voices_dir(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !root.is_dir() || is_hidden(root) {
        log::debug!("Skipping voice directory {}", root.display());
        return Ok(Vec::new());
    }

    log::debug!("Searching {} for voices", root.display());

    let mut found = Vec::new();
    for lang_dir in sorted_subdirs(root)? {
        let language = file_name(&lang_dir);
        for voice_dir in sorted_subdirs(&lang_dir)? {
            if voice_dir.join(CONFIG_FILE).is_file() {
                found.push((language.clone(), voice_dir));
            }
        }
    }

    Ok(found)
}

fn sorted_subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut subdirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() && !is_hidden(&path) {
            subdirs.push(path);
        }
    }
    subdirs.sort();
    Ok(subdirs)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
