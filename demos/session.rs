use std::f32::consts::PI;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tts_session::session::{
    BoxError, InferenceParams, PhonemeGroup, Registry, Session, SettingsBuilder, VoiceConfig,
    VoiceLoader, VoiceModel,
};
use tts_session::{SpeechResult, TextToSpeechSystem, Token};

/// Plays one short tone per phoneme instead of speech.
struct ToneVoice {
    sample_rate: u32,
}

impl VoiceModel for ToneVoice {
    fn text_to_phonemes(
        &self,
        text: &str,
        _text_language: Option<&str>,
    ) -> Result<Vec<Vec<PhonemeGroup>>, BoxError> {
        Ok(text
            .split(['.', '!', '?'])
            .map(|sentence| {
                sentence
                    .split_whitespace()
                    .map(|word| word.chars().map(|c| c.to_string()).collect())
                    .collect::<Vec<PhonemeGroup>>()
            })
            .filter(|sentence| !sentence.is_empty())
            .collect())
    }

    fn word_to_phonemes(
        &self,
        word: &str,
        _role: Option<&str>,
        _text_language: Option<&str>,
    ) -> Result<PhonemeGroup, BoxError> {
        Ok(word.chars().map(|c| c.to_string()).collect())
    }

    fn say_as_to_phonemes(
        &self,
        text: &str,
        _interpret_as: &str,
        _format: Option<&str>,
        _text_language: Option<&str>,
    ) -> Result<Vec<PhonemeGroup>, BoxError> {
        Ok(text.chars().map(|c| vec![c.to_string()]).collect())
    }

    fn phonemes_to_ids(&self, phonemes: &[PhonemeGroup]) -> Result<Vec<i64>, BoxError> {
        Ok(phonemes
            .iter()
            .flatten()
            .filter_map(|p| p.chars().next())
            .map(|c| c as i64)
            .collect())
    }

    fn ids_to_audio(
        &mut self,
        ids: &[i64],
        params: &InferenceParams,
    ) -> Result<Vec<i16>, BoxError> {
        let tone_len = (0.08 * params.length_scale * self.sample_rate as f32) as usize;
        let mut samples = Vec::with_capacity(ids.len() * tone_len);
        for &id in ids {
            let freq = 200.0 + (id % 48) as f32 * 15.0;
            for i in 0..tone_len {
                let t = i as f32 / self.sample_rate as f32;
                samples.push(((2.0 * PI * freq * t).sin() * 8000.0) as i16);
            }
        }
        Ok(samples)
    }
}

struct ToneLoader;

impl VoiceLoader for ToneLoader {
    fn load(
        &self,
        _model_dir: &Path,
        config: &VoiceConfig,
    ) -> Result<Box<dyn VoiceModel>, BoxError> {
        Ok(Box::new(ToneVoice {
            sample_rate: config.audio.sample_rate,
        }))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Hidden directories are not searched, so avoid the default ".tmp" prefix.
    let voices_dir = tempfile::Builder::new().prefix("voices").tempdir()?;
    let voice_dir = voices_dir.path().join("en_US").join("tones_low");
    std::fs::create_dir_all(&voice_dir)?;
    std::fs::write(
        voice_dir.join("config.json"),
        r#"{"audio": {"sample_rate": 22050}, "inference": {"length_scale": 1.0}}"#,
    )?;

    let settings = SettingsBuilder::default()
        .voices_directories(vec![voices_dir.path().to_path_buf()])
        .no_download(true)
        .build()?;
    let mut session = Session::new(settings, Box::new(ToneLoader))
        .with_registry(Registry::default())
        .with_default_voices_directories(Vec::new());

    for voice in session.voices()? {
        let voice = voice?;
        println!("Available voice: {} ({:?})", voice.key, voice.location);
    }

    let load_start = Instant::now();
    session.set_voice("tones_low");
    session.preload_voice("tones_low")?;
    println!("Voice loaded in {:.2?}", load_start.elapsed());

    session.begin_utterance();
    session.speak_text("Hello there. This is a test.", None)?;
    session.set_mark("numbers");
    session.settings_mut().length_scale = Some(0.5);
    session.speak_tokens(&[Token::say_as("123", "characters")], None)?;
    session.add_break(300);
    session.speak_tokens(&[Token::phonemes("bʏə")], None)?;

    let synth_start = Instant::now();
    let results = session.end_utterance()?;
    println!("Synthesized {} results in {:.2?}", results.len(), synth_start.elapsed());

    for (i, result) in results.iter().enumerate() {
        match result {
            SpeechResult::Audio(audio) => {
                let path = PathBuf::from(format!("output-{i}.wav"));
                audio.write_wav(&path)?;
                println!(
                    "{}: {:.2}s at {}Hz",
                    path.display(),
                    audio.duration_secs(),
                    audio.sample_rate
                );
            }
            SpeechResult::Mark { name } => println!("mark: {name}"),
        }
    }

    Ok(())
}
