//! Text-derived measures over a lower-cased transcript.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalConfig {
    pub mattr_window: usize,
    pub ngram_orders: Vec<usize>,
}

impl Default for LexicalConfig {
    fn default() -> Self {
        Self {
            mattr_window: 8,
            ngram_orders: vec![2, 3, 4],
        }
    }
}

/// Lower-cased word tokens with surrounding punctuation removed.
/// Apostrophes inside words are kept.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|raw| {
            raw.chars()
                .filter(|c| c.is_alphanumeric() || *c == '\'')
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .map(|token| token.trim_matches('\'').to_string())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Vowel-group syllable estimate, at least 1 for any word.
pub fn count_syllables(word: &str) -> usize {
    let letters: String = word
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase())
        .collect();
    let mut count = 0;
    let mut in_group = false;
    for c in letters.chars() {
        let vowel = matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
        if vowel && !in_group {
            count += 1;
        }
        in_group = vowel;
    }
    if letters.ends_with('e') && !letters.ends_with("le") && count > 1 {
        count -= 1;
    }
    count.max(1)
}

pub fn average_word_length(words: &[String]) -> Result<f64> {
    if words.is_empty() {
        return Err(AnalysisError::Undefined("average word length"));
    }
    let chars: usize = words.iter().map(|word| word.chars().count()).sum();
    Ok(chars as f64 / words.len() as f64)
}

pub fn average_syllables_per_word(words: &[String]) -> Result<f64> {
    if words.is_empty() {
        return Err(AnalysisError::Undefined("syllables per word"));
    }
    let syllables: usize = words.iter().map(|word| count_syllables(word)).sum();
    Ok(syllables as f64 / words.len() as f64)
}

/// Moving-average type-token ratio over windows of `window` words.
pub fn mattr(words: &[String], window: usize) -> Result<f64> {
    if window == 0 || words.len() < window {
        return Err(AnalysisError::Undefined("mattr"));
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for word in &words[..window] {
        *counts.entry(word.as_str()).or_default() += 1;
    }
    let mut ratios = vec![counts.len() as f64 / window as f64];
    for idx in window..words.len() {
        let outgoing = words[idx - window].as_str();
        if let Some(count) = counts.get_mut(outgoing) {
            *count -= 1;
            if *count == 0 {
                counts.remove(outgoing);
            }
        }
        *counts.entry(words[idx].as_str()).or_default() += 1;
        ratios.push(counts.len() as f64 / window as f64);
    }
    Ok(ratios.iter().sum::<f64>() / ratios.len() as f64)
}

/// Repeated n-grams, summed over `orders`: total minus distinct per order.
pub fn phrase_patterns(words: &[String], orders: &[usize]) -> usize {
    orders
        .iter()
        .filter(|&&n| n > 0 && words.len() >= n)
        .map(|&n| {
            let grams: Vec<&[String]> = words.windows(n).collect();
            let distinct: HashSet<&[String]> = grams.iter().copied().collect();
            grams.len() - distinct.len()
        })
        .sum()
}

/// Mean words per sentence, splitting on `.`, `!` and `?`.
pub fn sentence_length(text: &str) -> Result<f64> {
    let lengths: Vec<usize> = text
        .split(['.', '!', '?'])
        .map(|sentence| tokenize(sentence).len())
        .filter(|&count| count > 0)
        .collect();
    if lengths.is_empty() {
        return Err(AnalysisError::Undefined("sentence length"));
    }
    Ok(lengths.iter().sum::<usize>() as f64 / lengths.len() as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordClass {
    Open,
    Closed,
}

/// Part-of-speech classifier used for content richness.
pub trait PosTagger: Send + Sync {
    /// `None` for tokens that belong to neither class (numbers, symbols).
    fn classify(&self, token: &str) -> Option<WordClass>;
}

static FUNCTION_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    include_str!("../../assets/function_words.txt")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect()
});

/// Closed class from a fixed function-word lexicon, open class for every
/// other alphabetic token.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconTagger;

impl PosTagger for LexiconTagger {
    fn classify(&self, token: &str) -> Option<WordClass> {
        if FUNCTION_WORDS.contains(token) {
            Some(WordClass::Closed)
        } else if token.chars().any(char::is_alphabetic) {
            Some(WordClass::Open)
        } else {
            None
        }
    }
}

/// Open-class over closed-class token ratio; zero without closed-class tokens.
pub fn content_richness(words: &[String], tagger: &dyn PosTagger) -> f64 {
    let (mut open, mut closed) = (0usize, 0usize);
    for word in words {
        match tagger.classify(word) {
            Some(WordClass::Open) => open += 1,
            Some(WordClass::Closed) => closed += 1,
            None => {}
        }
    }
    if closed == 0 {
        0.0
    } else {
        open as f64 / closed as f64
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LexicalMetrics {
    pub avg_word_length: Option<f64>,
    pub avg_syllables_per_word: Option<f64>,
    pub content_richness: Option<f64>,
    pub mattr: Option<f64>,
    pub phrase_patterns: Option<f64>,
    pub sentence_length: Option<f64>,
}

/// Every lexical measure for one transcript; undefined measures are `None`.
pub fn lexical_metrics(transcript: &str, config: &LexicalConfig, tagger: &dyn PosTagger) -> LexicalMetrics {
    let words = tokenize(transcript);
    LexicalMetrics {
        avg_word_length: average_word_length(&words).ok(),
        avg_syllables_per_word: average_syllables_per_word(&words).ok(),
        content_richness: (!words.is_empty()).then(|| content_richness(&words, tagger)),
        mattr: mattr(&words, config.mattr_window).ok(),
        phrase_patterns: Some(phrase_patterns(&words, &config.ngram_orders) as f64),
        sentence_length: sentence_length(transcript).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn words(text: &str) -> Vec<String> {
        tokenize(text)
    }

    #[test]
    fn syllable_heuristic() {
        assert_eq!(count_syllables("the"), 1);
        assert_eq!(count_syllables("silence"), 2);
        assert_eq!(count_syllables("table"), 2);
        assert_eq!(count_syllables("rhythm"), 1);
        assert_eq!(count_syllables("Banana!"), 3);
        assert_eq!(count_syllables("123"), 1);
    }

    #[test]
    fn tokenizer_strips_punctuation() {
        assert_eq!(words("Don't STOP, now!"), vec!["don't", "stop", "now"]);
        assert!(words(" -- ").is_empty());
    }

    #[test]
    fn mattr_of_distinct_words_is_one() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        assert_relative_eq!(mattr(&words(text), 8).unwrap(), 1.0);
        assert_relative_eq!(mattr(&words(text), 10).unwrap(), 1.0);
    }

    #[test]
    fn mattr_needs_a_full_window() {
        assert!(mattr(&words("one two three"), 8).is_err());
    }

    #[test]
    fn mattr_tracks_repeats_incrementally() {
        // windows of 2: (a b) (b a) (a a) -> 1, 1, 0.5
        assert_relative_eq!(mattr(&words("a b a a"), 2).unwrap(), 2.5 / 3.0);
    }

    #[test]
    fn repeated_phrases_are_counted_per_order() {
        let text = "i went home and i went home";
        // bigrams: 6 total, 4 distinct; trigrams: 5 total, 4 distinct; 4-grams: 4 total, 4 distinct
        assert_eq!(phrase_patterns(&words(text), &[2, 3, 4]), 3);
    }

    #[test]
    fn sentence_length_averages_non_empty_sentences() {
        assert_relative_eq!(sentence_length("One two three. Four five!  ?").unwrap(), 2.5);
        assert!(sentence_length("...").is_err());
    }

    #[test]
    fn content_richness_ratio() {
        let tokens = words("the cat sat on the mat");
        // closed: the, on, the; open: cat, sat, mat
        assert_relative_eq!(content_richness(&tokens, &LexiconTagger), 1.0);
        assert_eq!(content_richness(&words("cats sleep"), &LexiconTagger), 0.0);
    }

    #[test]
    fn empty_transcript_leaves_measures_undefined() {
        let metrics = lexical_metrics("", &LexicalConfig::default(), &LexiconTagger);
        assert!(metrics.avg_word_length.is_none());
        assert!(metrics.mattr.is_none());
        assert_eq!(metrics.phrase_patterns, Some(0.0));
    }
}
