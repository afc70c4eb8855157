//! Session tests
//!
//! Drive a full session against a fake voice model and a temporary voice
//! tree, checking how directives are grouped into synthesis calls.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tempfile::TempDir;
use tts_session::session::{
    BoxError, DownloadRequest, InferenceParams, PhonemeGroup, Registry, RegistryEntry, Session,
    SessionError, SettingsBuilder, VoiceConfig, VoiceDescriptor, VoiceDownloader, VoiceLoader,
    VoiceModel,
};
use tts_session::{Speaker, SpeechResult, TextToSpeechSystem, Token};

/// Everything the fake model saw.
#[derive(Default)]
struct Log {
    loads: Vec<PathBuf>,
    text_languages: Vec<Option<String>>,
    synth_calls: Vec<InferenceParams>,
}

/// Sentences split on '.', words on whitespace, one phoneme per letter.
struct FakeVoice {
    log: Rc<RefCell<Log>>,
}

impl VoiceModel for FakeVoice {
    fn text_to_phonemes(
        &self,
        text: &str,
        text_language: Option<&str>,
    ) -> Result<Vec<Vec<PhonemeGroup>>, BoxError> {
        self.log
            .borrow_mut()
            .text_languages
            .push(text_language.map(str::to_string));
        Ok(text
            .split('.')
            .map(|sentence| sentence.split_whitespace().map(letters).collect::<Vec<_>>())
            .filter(|sentence| !sentence.is_empty())
            .collect())
    }

    fn word_to_phonemes(
        &self,
        word: &str,
        role: Option<&str>,
        _text_language: Option<&str>,
    ) -> Result<PhonemeGroup, BoxError> {
        let mut phonemes = letters(word);
        if let Some(role) = role {
            phonemes.push(format!("<{role}>"));
        }
        Ok(phonemes)
    }

    fn say_as_to_phonemes(
        &self,
        text: &str,
        interpret_as: &str,
        _format: Option<&str>,
        _text_language: Option<&str>,
    ) -> Result<Vec<PhonemeGroup>, BoxError> {
        if interpret_as == "characters" {
            return Ok(text.chars().map(|c| vec![c.to_string()]).collect());
        }
        Ok(vec![letters(text)])
    }

    fn phonemes_to_ids(&self, phonemes: &[PhonemeGroup]) -> Result<Vec<i64>, BoxError> {
        Ok(phonemes.iter().flatten().map(|p| p.len() as i64).collect())
    }

    fn ids_to_audio(
        &mut self,
        ids: &[i64],
        params: &InferenceParams,
    ) -> Result<Vec<i16>, BoxError> {
        if ids.is_empty() {
            return Err("nothing to say".into());
        }
        self.log.borrow_mut().synth_calls.push(params.clone());
        Ok(vec![100; ids.len()])
    }
}

struct FakeLoader {
    log: Rc<RefCell<Log>>,
}

impl VoiceLoader for FakeLoader {
    fn load(
        &self,
        model_dir: &Path,
        _config: &VoiceConfig,
    ) -> Result<Box<dyn VoiceModel>, BoxError> {
        self.log.borrow_mut().loads.push(model_dir.to_path_buf());
        Ok(Box::new(FakeVoice {
            log: Rc::clone(&self.log),
        }))
    }
}

/// Writes a voice with a config only, recording every request.
struct FakeDownloader {
    requests: Rc<RefCell<Vec<DownloadRequest>>>,
}

impl VoiceDownloader for FakeDownloader {
    fn download(&self, request: &DownloadRequest) -> Result<(), BoxError> {
        self.requests.borrow_mut().push(request.clone());
        std::fs::create_dir_all(&request.voice_dir)?;
        std::fs::write(request.voice_dir.join("config.json"), "{}")?;
        Ok(())
    }
}

fn letters(word: &str) -> PhonemeGroup {
    word.chars().map(|c| c.to_string()).collect()
}

fn write_voice(root: &Path, key: &str, sample_rate: u32, speakers: Option<&str>) {
    let dir = root.join(key);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.json"),
        format!(
            r#"{{"audio": {{"sample_rate": {sample_rate}}},
                "inference": {{"length_scale": 1.0, "noise_scale": 0.667, "noise_w": 0.8}}}}"#
        ),
    )
    .unwrap();
    if let Some(speakers) = speakers {
        std::fs::write(dir.join("speakers.txt"), speakers).unwrap();
    }
}

/// A temp dir with a visible name; hidden search roots are skipped.
fn voices_root() -> TempDir {
    tempfile::Builder::new().prefix("voices").tempdir().unwrap()
}

fn voice_keys(session: &Session) -> Vec<String> {
    session.voices().unwrap().map(|v| v.unwrap().key).collect()
}

/// A session over a temp voice tree with two voices and an empty registry.
fn session() -> (Session, Rc<RefCell<Log>>, TempDir) {
    let voices = voices_root();
    write_voice(voices.path(), "en_US/ljspeech_low", 22050, None);
    write_voice(voices.path(), "en_US/vctk_low", 24000, Some("p239\np236\np264\n"));

    let settings = SettingsBuilder::default()
        .voice("en_US/ljspeech_low")
        .sample_rate(16000u32)
        .voices_directories(vec![voices.path().to_path_buf()])
        .voices_download_dir(voices.path().join("downloads"))
        .build()
        .unwrap();

    let log = Rc::new(RefCell::new(Log::default()));
    let session = Session::new(
        settings,
        Box::new(FakeLoader {
            log: Rc::clone(&log),
        }),
    )
    .with_registry(Registry::default())
    .with_default_voices_directories(Vec::new());

    (session, log, voices)
}

fn audio_sample_counts(results: &[SpeechResult]) -> Vec<usize> {
    results
        .iter()
        .filter_map(|r| r.as_audio().map(|a| a.num_samples()))
        .collect()
}

#[test]
fn test_same_settings_speak_calls_share_one_synthesis() {
    let (mut session, log, _voices) = session();

    session.begin_utterance();
    session.speak_text("Hello there.", None).unwrap();
    session.speak_text("General Kenobi.", None).unwrap();
    session.speak_tokens(&[Token::word("again")], None).unwrap();
    assert_eq!(session.pending().len(), 3);

    let results = session.end_utterance().unwrap();

    assert_eq!(log.borrow().synth_calls.len(), 1);
    assert_eq!(audio_sample_counts(&results), vec![10 + 13 + 5]);
    assert!(session.pending().is_empty());
}

#[test]
fn test_mark_between_runs_forces_two_synthesis_calls() {
    let (mut session, log, _voices) = session();

    session.speak_text("one", None).unwrap();
    session.set_mark("middle");
    session.speak_text("three", None).unwrap();

    let results = session.end_utterance().unwrap();

    assert_eq!(log.borrow().synth_calls.len(), 2);
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_audio().unwrap().num_samples(), 3);
    assert_eq!(
        results[1],
        SpeechResult::Mark {
            name: "middle".to_string()
        }
    );
    assert_eq!(results[2].as_audio().unwrap().num_samples(), 5);
}

#[test]
fn test_settings_change_splits_runs_and_is_applied() {
    let (mut session, log, _voices) = session();

    session.speak_text("slow", None).unwrap();
    session.settings_mut().length_scale = Some(1.5);
    session.speak_text("slower", None).unwrap();

    let results = session.end_utterance().unwrap();
    assert_eq!(audio_sample_counts(&results), vec![4, 6]);

    let log = log.borrow();
    assert_eq!(log.synth_calls.len(), 2);
    assert_eq!(log.synth_calls[0].length_scale, 1.0);
    assert_eq!(log.synth_calls[1].length_scale, 1.5);
    assert_eq!(log.synth_calls[1].noise_scale, 0.667);
}

#[test]
fn test_break_is_silence_at_configured_rate() {
    let (mut session, log, _voices) = session();

    session.add_break(500);
    let results = session.end_utterance().unwrap();

    assert_eq!(results.len(), 1);
    let audio = results[0].as_audio().unwrap();
    assert_eq!(audio.sample_rate, 16000);
    assert_eq!(audio.num_samples(), 8000);
    assert_eq!(audio.audio_bytes.len(), 16000);
    assert_eq!(audio.sample_width, 2);
    assert_eq!(audio.channels, 1);
    assert!(audio.samples().all(|s| s == 0));

    assert!(log.borrow().loads.is_empty());
}

#[test]
fn test_break_rounds_to_nearest_sample() {
    let (mut session, _log, _voices) = session();
    session.settings_mut().sample_rate = 22050;

    session.add_break(1);
    let results = session.end_utterance().unwrap();
    assert_eq!(audio_sample_counts(&results), vec![22]);
}

#[test]
fn test_speech_uses_voice_sample_rate() {
    let (mut session, _log, _voices) = session();

    session.set_voice("vctk_low");
    session.speak_text("hi", None).unwrap();
    session.add_break(10);

    let results = session.end_utterance().unwrap();
    assert_eq!(results[0].as_audio().unwrap().sample_rate, 24000);
    assert_eq!(results[1].as_audio().unwrap().sample_rate, 16000);
}

#[test]
fn test_voice_short_name_is_an_alias() {
    let (mut session, log, _voices) = session();

    let full = session.preload_voice("en_US/ljspeech_low").unwrap().key().to_string();
    let short = session.preload_voice("ljspeech_low").unwrap().key().to_string();

    assert_eq!(full, short);
    assert_eq!(log.borrow().loads.len(), 1);
    assert_eq!(
        session.loaded_voices(),
        vec!["en_US/ljspeech_low", "ljspeech_low"]
    );
}

#[test]
fn test_unknown_voice_is_not_found() {
    let (mut session, _log, _voices) = session();

    session.set_voice("xx_XX/nobody");
    match session.speak_text("hello", None) {
        Err(SessionError::VoiceNotFound(key)) => assert_eq!(key, "xx_XX/nobody"),
        other => panic!("expected VoiceNotFound, got {other:?}"),
    }
}

#[test]
fn test_speaker_suffix_reaches_the_model() {
    let (mut session, log, _voices) = session();

    session.set_voice("en_US/vctk_low#p236");
    assert_eq!(session.speaker(), Some(&Speaker::Name("p236".into())));
    session.speak_text("hi", None).unwrap();

    session.set_voice("en_US/ljspeech_low");
    assert_eq!(session.speaker(), None);
    session.speak_text("hi", None).unwrap();

    session.end_utterance().unwrap();

    let log = log.borrow();
    assert_eq!(log.synth_calls.len(), 2);
    assert_eq!(log.synth_calls[0].speaker, Some(1));
    assert_eq!(log.synth_calls[1].speaker, None);
}

#[test]
fn test_tokens_become_one_run() {
    let (mut session, log, _voices) = session();

    session
        .speak_tokens(
            &[
                Token::Word {
                    text: "read".into(),
                    role: Some("gruut:VBD".into()),
                },
                Token::phonemes("h ə l oʊ"),
                Token::phonemes("aːb"),
                Token::say_as("abc", "characters"),
            ],
            None,
        )
        .unwrap();
    session.speak_tokens(&[], None).unwrap();
    assert_eq!(session.pending().len(), 1);

    let results = session.end_utterance().unwrap();
    // read + <role>, 4 spaced phonemes, 2 graphemes, 3 characters
    assert_eq!(audio_sample_counts(&results), vec![5 + 4 + 2 + 3]);
    assert_eq!(log.borrow().synth_calls.len(), 1);
}

#[test]
fn test_text_language_falls_back_to_settings() {
    let (mut session, log, _voices) = session();

    session.speak_text("one", Some("de_DE")).unwrap();
    session.speak_text("two", None).unwrap();
    session.settings_mut().text_language = Some("fr_FR".into());
    session.speak_text("three", None).unwrap();

    assert_eq!(
        log.borrow().text_languages,
        vec![Some("de_DE".into()), None, Some("fr_FR".into())]
    );
}

#[test]
fn test_failed_flush_clears_queue_and_keeps_earlier_results() {
    let (mut session, _log, _voices) = session();

    session.speak_text("fine", None).unwrap();
    session.set_mark("before");
    // An empty phoneme group maps to no ids, which the fake model rejects.
    session.speak_tokens(&[Token::phonemes("   ")], None).unwrap();
    session.set_mark("after");

    let mut emitted = Vec::new();
    let outcome = session.end_utterance_with(&mut |result| emitted.push(result));

    assert!(matches!(outcome, Err(SessionError::Synthesis(_))));
    assert_eq!(emitted.len(), 2);
    assert!(session.pending().is_empty());
    assert!(session.end_utterance().unwrap().is_empty());
}

#[test]
fn test_voice_listing_sees_new_voices() {
    let (session, _log, voices) = session();

    assert_eq!(voice_keys(&session), vec!["en_US/ljspeech_low", "en_US/vctk_low"]);
    let first: Vec<VoiceDescriptor> = session.voices().unwrap().map(|v| v.unwrap()).collect();
    let second: Vec<VoiceDescriptor> = session.voices().unwrap().map(|v| v.unwrap()).collect();
    assert_eq!(first, second);

    write_voice(voices.path(), "de_DE/thorsten_low", 22050, None);
    assert_eq!(
        voice_keys(&session),
        vec!["de_DE/thorsten_low", "en_US/ljspeech_low", "en_US/vctk_low"]
    );
}

#[test]
fn test_numeric_speaker_name_resolves_through_speaker_list() {
    let (mut session, log, voices) = session();
    write_voice(voices.path(), "en_US/hifi-tts_low", 22050, Some("92\n6097\n9017\n"));

    session.set_voice("en_US/hifi-tts_low#6097");
    assert_eq!(session.speaker(), Some(&Speaker::Name("6097".into())));
    session.speak_text("hi", None).unwrap();
    session.end_utterance().unwrap();

    assert_eq!(log.borrow().synth_calls[0].speaker, Some(1));
}

/// A session whose only voice is in the registry, with a recording downloader.
fn downloading_session(
    no_download: bool,
) -> (Session, Rc<RefCell<Vec<DownloadRequest>>>, Rc<RefCell<Log>>, TempDir) {
    let root = voices_root();
    let downloads = root.path().join("downloads");

    let settings = SettingsBuilder::default()
        .voice("thorsten_low")
        .voices_directories(vec![root.path().join("local")])
        .voices_download_dir(downloads.clone())
        .voices_url_format("https://voices.example/{lang}/{name}")
        .no_download(no_download)
        .build()
        .unwrap();
    let registry: Registry = [(
        "de_DE/thorsten_low".to_string(),
        RegistryEntry {
            files: vec!["config.json".into(), "generator.onnx".into()],
            ..Default::default()
        },
    )]
    .into_iter()
    .collect();

    let log = Rc::new(RefCell::new(Log::default()));
    let requests = Rc::new(RefCell::new(Vec::new()));
    let session = Session::new(
        settings,
        Box::new(FakeLoader {
            log: Rc::clone(&log),
        }),
    )
    .with_registry(registry)
    .with_default_voices_directories(vec![downloads])
    .with_downloader(Box::new(FakeDownloader {
        requests: Rc::clone(&requests),
    }));

    (session, requests, log, root)
}

#[test]
fn test_missing_voice_is_downloaded_then_loaded() {
    let (mut session, requests, log, root) = downloading_session(false);
    assert_eq!(voice_keys(&session), vec!["de_DE/thorsten_low"]);

    session.speak_text("hallo", None).unwrap();
    session.speak_text("welt", None).unwrap();

    {
        let requests = requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].voice_key, "de_DE/thorsten_low");
        assert_eq!(requests[0].url_base, "https://voices.example/de_DE/thorsten_low");
        assert_eq!(requests[0].files, vec!["config.json", "generator.onnx"]);
        assert_eq!(
            requests[0].voice_dir,
            root.path().join("downloads/de_DE/thorsten_low")
        );
    }
    assert_eq!(log.borrow().loads, vec![root.path().join("downloads/de_DE/thorsten_low")]);
    assert_eq!(session.loaded_voices(), vec!["de_DE/thorsten_low", "thorsten_low"]);

    // The download dir is also searched, so the voice is now listed once, locally.
    let listed: Vec<VoiceDescriptor> = session.voices().unwrap().map(|v| v.unwrap()).collect();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].location.local_dir().is_some());
}

#[test]
fn test_no_download_setting_overrides_installed_downloader() {
    let (mut session, requests, log, _root) = downloading_session(true);

    match session.speak_text("hallo", None) {
        Err(SessionError::VoiceNotFound(key)) => assert_eq!(key, "thorsten_low"),
        other => panic!("expected VoiceNotFound, got {other:?}"),
    }
    assert!(requests.borrow().is_empty());
    assert!(log.borrow().loads.is_empty());
    assert!(session.loaded_voices().is_empty());
}
