//! Reduction of free-text mood reports to a [`MoodCategory`].

use crate::models::MoodCategory;

/// Strategy for turning a mood report into a category.
pub trait MoodClassifier {
    fn classify(&self, text: &str) -> MoodCategory;

    /// Whether the text contains language that warrants escalation on its own.
    fn signals_crisis(&self, _text: &str) -> bool {
        false
    }
}

impl<F> MoodClassifier for F
where
    F: Fn(&str) -> MoodCategory,
{
    fn classify(&self, text: &str) -> MoodCategory {
        self(text)
    }
}

const CRISIS_TERMS: &[&str] = &[
    "hopeless",
    "give up",
    "giving up",
    "suicide",
    "suicidal",
    "worthless",
    "can't continue",
    "cannot continue",
];

const NEGATIVE_TERMS: &[&str] = &[
    "stressed",
    "anxious",
    "overwhelmed",
    "sad",
    "tired",
    "failing",
    "worried",
    "lonely",
    "depressed",
    "struggling",
    "trouble",
    "angry",
    "bad",
    "unwell",
    "unhappy",
];

const POSITIVE_TERMS: &[&str] = &[
    "good",
    "great",
    "happy",
    "fine",
    "confident",
    "excited",
    "motivated",
    "calm",
    "well",
];

/// Flip the polarity of the term that immediately follows.
const NEGATORS: &[&str] = &["not", "no", "never", "isn't", "don't", "doesn't", "wasn't"];

/// Lowercase word tokens; typographic apostrophes become `'` so contractions
/// match the term lists.
fn tokenize(text: &str) -> Vec<String> {
    let normalized: String = text
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{02BC}' | '`' => '\'',
            other => other,
        })
        .collect::<String>()
        .to_lowercase();

    normalized
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|token| token.trim_matches('\''))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn contains_phrase(tokens: &[String], phrase: &str) -> bool {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    !words.is_empty()
        && tokens
            .windows(words.len())
            .any(|window| window.iter().zip(&words).all(|(token, word)| token == word))
}

/// Keyword heuristic: crisis phrases force `Bad`; otherwise the balance of
/// negative and positive words decides, with neutral text landing on `Okay`.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordMoodClassifier;

impl KeywordMoodClassifier {
    fn has_crisis(tokens: &[String]) -> bool {
        CRISIS_TERMS
            .iter()
            .any(|phrase| contains_phrase(tokens, phrase))
    }

    /// (negative, positive) word counts after negation.
    fn polarity(tokens: &[String]) -> (usize, usize) {
        let mut negative = 0;
        let mut positive = 0;
        for (index, token) in tokens.iter().enumerate() {
            let negated = index > 0 && NEGATORS.contains(&tokens[index - 1].as_str());
            let is_negative = NEGATIVE_TERMS.contains(&token.as_str());
            let is_positive = POSITIVE_TERMS.contains(&token.as_str());
            match (is_negative, is_positive, negated) {
                (true, _, false) | (_, true, true) => negative += 1,
                (true, _, true) | (_, true, false) => positive += 1,
                _ => {}
            }
        }
        (negative, positive)
    }
}

impl MoodClassifier for KeywordMoodClassifier {
    fn classify(&self, text: &str) -> MoodCategory {
        let tokens = tokenize(text);
        if Self::has_crisis(&tokens) {
            return MoodCategory::Bad;
        }

        let (negative, positive) = Self::polarity(&tokens);
        match negative.cmp(&positive) {
            std::cmp::Ordering::Greater if negative >= 2 => MoodCategory::Bad,
            std::cmp::Ordering::Greater => MoodCategory::Okay,
            std::cmp::Ordering::Less => MoodCategory::Good,
            std::cmp::Ordering::Equal => MoodCategory::Okay,
        }
    }

    fn signals_crisis(&self, text: &str) -> bool {
        Self::has_crisis(&tokenize(text))
    }
}
