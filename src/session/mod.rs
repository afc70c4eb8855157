//! Speech session: directive buffering, coalescing and voice resolution.
//!
//! A [`Session`] queues what the caller wants spoken and only talks to the
//! voice model at the end of an utterance. Phoneme runs queued under equal
//! [`Settings`] are merged into a single synthesis call; breaks and marks are
//! passed through in place.
//!
//! # Voice Directory Layout
//!
//! ```text
//! voices/
//! └── en_US/                  # language
//!     └── vctk_low/           # voice name
//!         ├── config.json     # required, sample rate and scale defaults
//!         ├── speakers.txt    # optional, one speaker name per line
//!         └── generator.onnx  # whatever the VoiceLoader needs
//! ```
//!
//! Search order:
//! 1. `Settings::voices_directories`, in order
//! 2. `$HOME/.local/share/mimic3/voices`
//! 3. `$XDG_DATA_DIRS/mimic3/voices` (`/usr/local/share`, `/usr/share`)
//! 4. voices in the [`Registry`] that were not found locally, downloaded into
//!    `Settings::voices_download_dir` when a [`VoiceDownloader`] is installed
//!
//! # Voice Keys
//!
//! Voices are addressed as `<lang>/<name>` (`en_US/ljspeech_low`) or by any
//! suffix of that key (`ljspeech_low`). The first matching voice in search
//! order wins. A `#` suffix picks a speaker of a multi-speaker voice:
//!
//! | Value | Voice | Speaker |
//! |---|---|---|
//! | `en_US/vctk_low` | `en_US/vctk_low` | voice default |
//! | `vctk_low#p239` | `en_US/vctk_low` | `p239` (by name) |
//! | `hifi-tts_low#6097` | `en_US/hifi-tts_low` | `6097` (by name) |
//! | `en_US/vctk_low#3` | `en_US/vctk_low` | `3`, or id 3 if no speaker is named `3` |
//!
//! Suffix matching is plain string matching, so a very short key such as `"w"`
//! matches any voice whose name ends in `w`.
//!
//! # Examples
//!
//! ```rust,no_run
//! use tts_session::session::{Session, Settings, SettingsBuilder, VoiceLoader};
//! use tts_session::{TextToSpeechSystem, Token};
//! use std::path::PathBuf;
//!
//! fn run(loader: Box<dyn VoiceLoader>) -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = SettingsBuilder::default()
//!         .voices_directories(vec![PathBuf::from("voices")])
//!         .no_download(true)
//!         .build()?;
//!     let mut session = Session::new(settings, loader);
//!
//!     session.set_voice("ljspeech_low");
//!     session.speak_text("Turn left.", None)?;
//!     session.set_mark("turn");
//!     session.speak_tokens(&[Token::say_as("250", "cardinal"), Token::word("meters")], None)?;
//!
//!     for (i, result) in session.end_utterance()?.iter().enumerate() {
//!         if let Some(audio) = result.as_audio() {
//!             audio.write_wav(&PathBuf::from(format!("part-{i}.wav")))?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod buffer;
pub mod catalog;
pub mod config;
pub mod download;
pub mod engine;
pub mod model;
pub mod registry;
pub mod settings;
pub mod tokens;
pub mod voices;

pub use buffer::{coalesce, Directive, DirectiveBuffer, PendingPhonemes};
pub use catalog::{VoiceCatalog, VoiceDescriptor, VoiceLocation, Voices};
pub use config::VoiceConfig;
pub use download::{DownloadRequest, VoiceDownloader};
pub use engine::Session;
pub use model::{BoxError, InferenceParams, PhonemeGroup, SessionError, VoiceLoader, VoiceModel};
pub use registry::{Registry, RegistryEntry, VoiceProperties};
pub use settings::{Settings, SettingsBuilder, Speaker};
pub use tokens::Token;
pub use voices::{VoiceCache, VoiceHandle};
