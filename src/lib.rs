//! # tts-session
//!
//! A Rust library that turns an interleaved stream of speech directives into
//! ordered audio clips and marks, ready for streaming playback.
//!
//! ## Features
//!
//! - **Directive buffering**: text, tokens, breaks and marks are queued until the
//!   end of an utterance
//! - **Coalescing**: adjacent phoneme runs spoken under identical settings become a
//!   single synthesis call
//! - **Voice resolution**: voices are looked up by full `<lang>/<name>` key or by
//!   short name, loaded once, cached under every alias, and downloaded on demand
//!
//! The phoneme-to-waveform model, grapheme-to-phoneme linguistics and the HTTP
//! transfer of voice files are provided by the caller through the
//! [`VoiceLoader`](session::VoiceLoader), [`VoiceModel`](session::VoiceModel) and
//! [`VoiceDownloader`](session::VoiceDownloader) traits.
//!
//! ## Quick Start
//!
//! ```ignore
//! use tts_session::{session::{Session, Settings}, TextToSpeechSystem};
//!
//! let mut session = Session::new(Settings::default(), Box::new(MyLoader));
//! session.set_voice("en_US/ljspeech_low");
//! session.speak_text("Hello, world!", None)?;
//! session.add_break(250);
//! session.set_mark("done");
//!
//! for result in session.end_utterance()? {
//!     println!("{result:?}");
//! }
//! # Ok::<(), tts_session::session::SessionError>(())
//! ```

pub mod session;

use std::path::Path;

pub use session::{Speaker, Token};

/// Bytes per sample of every produced clip (16-bit signed PCM).
pub const SAMPLE_WIDTH_BYTES: u16 = 2;

/// Channel count of every produced clip.
pub const NUM_CHANNELS: u16 = 1;

/// A finished clip of 16-bit signed little-endian mono audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioResult {
    /// Sample rate of the audio in Hertz
    pub sample_rate: u32,
    /// Raw little-endian PCM bytes
    pub audio_bytes: Vec<u8>,
    /// Always [`SAMPLE_WIDTH_BYTES`]
    pub sample_width: u16,
    /// Always [`NUM_CHANNELS`]
    pub channels: u16,
}

impl AudioResult {
    /// Encode signed 16-bit samples as a mono clip.
    pub fn from_samples(sample_rate: u32, samples: &[i16]) -> Self {
        let mut audio_bytes = Vec::with_capacity(samples.len() * 2);
        for sample in samples {
            audio_bytes.extend_from_slice(&sample.to_le_bytes());
        }
        Self {
            sample_rate,
            audio_bytes,
            sample_width: SAMPLE_WIDTH_BYTES,
            channels: NUM_CHANNELS,
        }
    }

    /// A zero-filled clip of `num_samples` samples.
    pub fn silence(sample_rate: u32, num_samples: usize) -> Self {
        Self {
            sample_rate,
            audio_bytes: vec![0; num_samples * SAMPLE_WIDTH_BYTES as usize],
            sample_width: SAMPLE_WIDTH_BYTES,
            channels: NUM_CHANNELS,
        }
    }

    /// Number of samples in the clip.
    pub fn num_samples(&self) -> usize {
        self.audio_bytes.len() / SAMPLE_WIDTH_BYTES as usize
    }

    /// Decode the clip back into signed samples.
    pub fn samples(&self) -> impl Iterator<Item = i16> + '_ {
        self.audio_bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.num_samples() as f64 / self.sample_rate as f64
    }

    /// Write the audio to a 16-bit PCM WAV file.
    pub fn write_wav(&self, path: &Path) -> Result<(), hound::Error> {
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for sample in self.samples() {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }
}

/// One entry of the ordered output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechResult {
    /// Synthesized speech or silence
    Audio(AudioResult),
    /// A named position in the stream
    Mark { name: String },
}

impl SpeechResult {
    pub fn as_audio(&self) -> Option<&AudioResult> {
        match self {
            SpeechResult::Audio(audio) => Some(audio),
            SpeechResult::Mark { .. } => None,
        }
    }
}

/// Common interface for a speech session.
///
/// Directives are queued by `speak_*`, [`add_break`](Self::add_break) and
/// [`set_mark`](Self::set_mark), and turned into results when the utterance ends.
pub trait TextToSpeechSystem {
    /// Error raised while resolving voices or synthesizing audio.
    type Error;

    /// Active voice key.
    fn voice(&self) -> &str;

    /// Set the active voice. A `#` suffix selects a speaker (`"<voice>#<speaker>"`).
    fn set_voice(&mut self, voice: &str);

    /// Active speaker, if any.
    fn speaker(&self) -> Option<&Speaker>;

    fn set_speaker(&mut self, speaker: Option<Speaker>);

    /// Active language.
    fn language(&self) -> &str;

    fn set_language(&mut self, language: &str);

    /// Mark the start of a new utterance.
    fn begin_utterance(&mut self);

    /// Queue free text to be spoken.
    fn speak_text(&mut self, text: &str, text_language: Option<&str>) -> Result<(), Self::Error>;

    /// Queue pre-tokenized words, phonemes and say-as spans.
    fn speak_tokens(
        &mut self,
        tokens: &[Token],
        text_language: Option<&str>,
    ) -> Result<(), Self::Error>;

    /// Queue a pause of `time_ms` milliseconds.
    fn add_break(&mut self, time_ms: u32);

    /// Queue a named mark.
    fn set_mark(&mut self, name: &str);

    /// Finish the utterance, passing each result to `emit` as soon as it exists.
    ///
    /// Results emitted before a failure are not taken back. The queue is empty
    /// afterwards whether or not this succeeds.
    fn end_utterance_with(
        &mut self,
        emit: &mut dyn FnMut(SpeechResult),
    ) -> Result<(), Self::Error>;

    /// Finish the utterance and collect every result in order.
    ///
    /// Default implementation calls `end_utterance_with()` with a collecting sink.
    fn end_utterance(&mut self) -> Result<Vec<SpeechResult>, Self::Error> {
        let mut results = Vec::new();
        self.end_utterance_with(&mut |result| results.push(result))?;
        Ok(results)
    }
}
