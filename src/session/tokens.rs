use super::model::PhonemeGroup;

/// A pre-tokenized piece of an utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A word, optionally with a role used to pick a pronunciation
    Word { text: String, role: Option<String> },
    /// Phonemes given directly, either space-separated or as one IPA string
    Phonemes { text: String },
    /// Text to be expanded before phonemization (`"cardinal"`, `"date"`, ...)
    SayAs {
        text: String,
        interpret_as: String,
        format: Option<String>,
    },
}

impl Token {
    pub fn word(text: impl Into<String>) -> Self {
        Token::Word {
            text: text.into(),
            role: None,
        }
    }

    pub fn phonemes(text: impl Into<String>) -> Self {
        Token::Phonemes { text: text.into() }
    }

    pub fn say_as(text: impl Into<String>, interpret_as: impl Into<String>) -> Self {
        Token::SayAs {
            text: text.into(),
            interpret_as: interpret_as.into(),
            format: None,
        }
    }
}

/// Split the text of a [`Token::Phonemes`] into phoneme symbols.
///
/// Space-separated input is taken as already split. Otherwise the string is
/// cut into IPA graphemes.
pub fn split_phonemes(text: &str) -> PhonemeGroup {
    let text = text.trim();
    if text.contains(' ') {
        text.split_whitespace().map(str::to_string).collect()
    } else {
        ipa_graphemes(text)
    }
}

/// Cut an IPA string into graphemes.
///
/// A grapheme is a base symbol followed by any combining diacritics and
/// suffix modifiers (length, aspiration, palatalization, ...). A tie bar
/// joins the next base symbol to the current grapheme (`t͡ʃ`).
pub fn ipa_graphemes(ipa: &str) -> PhonemeGroup {
    let mut graphemes: PhonemeGroup = Vec::new();
    let mut joined = false;

    for ch in ipa.chars() {
        if ch.is_whitespace() {
            joined = false;
            continue;
        }

        let attaches = joined || is_combining(ch) || is_suffix_modifier(ch);
        match graphemes.last_mut() {
            Some(current) if attaches => current.push(ch),
            _ => graphemes.push(ch.to_string()),
        }

        joined = is_tie(ch);
    }

    graphemes
}

fn is_tie(ch: char) -> bool {
    matches!(ch, '\u{0361}' | '\u{035C}' | '\u{203F}')
}

fn is_combining(ch: char) -> bool {
    matches!(ch,
        '\u{0300}'..='\u{036F}'
        | '\u{1AB0}'..='\u{1AFF}'
        | '\u{1DC0}'..='\u{1DFF}'
        | '\u{20D0}'..='\u{20FF}'
        | '\u{FE20}'..='\u{FE2F}')
}

fn is_suffix_modifier(ch: char) -> bool {
    matches!(
        ch,
        'ː' | 'ˑ' | 'ʰ' | 'ʱ' | 'ʲ' | 'ʷ' | 'ˠ' | 'ˤ' | 'ⁿ' | 'ˡ' | '˞' | 'ʼ'
    )
}
