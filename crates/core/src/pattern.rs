use regex::Regex;
use thiserror::Error;

/// Trigger for a dispatcher binding or a conversation response option.
///
/// Keyword patterns match case-insensitively anywhere in the text, which is
/// the observable contract callers rely on for ordering-sensitive bindings.
#[derive(Clone, Debug)]
pub enum Pattern {
    Keywords(Vec<String>),
    Regex(Regex),
}

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid pattern regex: {0}")]
    InvalidRegex(#[from] regex::Error),
}

impl Pattern {
    pub fn keyword(word: impl Into<String>) -> Self {
        Self::Keywords(vec![word.into()])
    }

    pub fn keywords<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Keywords(words.into_iter().map(Into::into).collect())
    }

    pub fn regex(pattern: &str) -> Result<Self, PatternError> {
        Ok(Self::Regex(Regex::new(pattern)?))
    }

    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::Keywords(words) => {
                let haystack = text.to_lowercase();
                words.iter().any(|word| haystack.contains(&word.to_lowercase()))
            }
            Self::Regex(regex) => regex.is_match(text),
        }
    }
}

/// Stock response patterns for yes/no style questions.
pub mod utterances {
    use regex::Regex;

    use super::Pattern;

    pub fn yes() -> Pattern {
        Pattern::Regex(
            Regex::new(r"(?i)^\s*(yes|yea|yup|yep|ya|yah|yeah|sure|ok|o\.k\.|okay)\b")
                .expect("affirmative utterance regex is valid"),
        )
    }

    pub fn no() -> Pattern {
        Pattern::Regex(
            Regex::new(r"(?i)^\s*(no|nah|nope)\b").expect("negative utterance regex is valid"),
        )
    }
}
