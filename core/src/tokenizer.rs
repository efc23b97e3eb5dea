use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(r"[a-z0-9]+").expect("valid regex");
}

/// English function words dropped before stemming.
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "if", "in", "on", "at", "to",
    "for", "of", "with", "by", "from", "is", "it", "its", "be", "was",
    "are", "were", "been", "has", "have", "had", "do", "does", "did",
    "will", "would", "could", "should", "may", "might", "shall", "can",
    "not", "no", "nor", "so", "yet", "both", "either", "neither", "as",
    "up", "out", "about", "into", "than", "then", "that", "this", "these",
    "those", "which", "who", "whom", "what", "when", "where", "why", "how",
    "all", "each", "every", "any", "some", "such", "more", "most", "also",
    "over", "under", "again", "further", "once", "here", "there", "just",
    "too", "very", "own", "same", "other", "only", "even", "after",
    "before", "during", "while", "because", "although", "though", "since",
    "until", "unless", "between", "through", "i", "me", "my", "we", "our",
    "you", "your", "he", "him", "his", "she", "her", "they", "them",
    "their", "us", "s", "t",
];

/// Suffix-stripping rules, tried in order; the first suffix that matches
/// and leaves a long-enough stem wins. Longer suffixes come first.
const SUFFIX_RULES: &[(&str, &str)] = &[
    ("ational", "ate"),
    ("tional", "tion"),
    ("enci", "ence"),
    ("anci", "ance"),
    ("izer", "ize"),
    ("ising", "ise"),
    ("izing", "ize"),
    ("nesses", "ness"),
    ("ness", ""),
    ("ments", "ment"),
    ("ment", ""),
    ("ings", "ing"),
    ("ing", ""),
    ("edly", ""),
    ("ingly", ""),
    ("ies", "y"),
    ("ied", "y"),
    ("sses", "ss"),
    ("tions", "te"),
    ("tion", "te"),
    ("ers", "er"),
    ("ly", ""),
    ("ed", ""),
    ("er", ""),
    ("es", ""),
    ("s", ""),
];

/// Never shrink a token below this many characters when stemming.
const MIN_STEM_LEN: usize = 3;

/// Bump whenever `STOP_WORDS` or `SUFFIX_RULES` change: the tables decide
/// what terms an index contains, so a persisted index is only comparable
/// to queries tokenized with the same table version.
pub const RULES_VERSION: u32 = 1;

/// Converts raw text into the ordered term sequence the index and the
/// ranker operate on. Deterministic for a fixed rule table.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    stop_words: HashSet<String>,
    suffix_rules: Vec<(String, String)>,
    min_stem_len: usize,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::with_rules(
            STOP_WORDS.iter().map(|w| (*w).to_string()).collect(),
            SUFFIX_RULES
                .iter()
                .map(|(s, r)| ((*s).to_string(), (*r).to_string()))
                .collect(),
            MIN_STEM_LEN,
        )
    }
}

impl Tokenizer {
    /// Build a tokenizer with custom tables. The built-in tables are the
    /// `Default`; swapping them changes every term an index produces.
    pub fn with_rules(
        stop_words: HashSet<String>,
        suffix_rules: Vec<(String, String)>,
        min_stem_len: usize,
    ) -> Self {
        Self { stop_words, suffix_rules, min_stem_len }
    }

    /// Tokenize into cleaned, stemmed terms, preserving appearance order.
    ///
    /// Pipeline: NFKC fold, lowercase, collapse anything outside `[a-z0-9]`
    /// to a separator, drop single-character tokens and stop words, then
    /// suffix-strip.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let normalized = text.nfkc().collect::<String>().to_lowercase();
        let mut tokens = Vec::new();
        for mat in TOKEN_RE.find_iter(&normalized) {
            let word = mat.as_str();
            if word.len() < 2 || self.stop_words.contains(word) {
                continue;
            }
            tokens.push(self.stem(word));
        }
        tokens
    }

    fn stem(&self, word: &str) -> String {
        if word.len() <= self.min_stem_len {
            return word.to_string();
        }
        for (suffix, replacement) in &self.suffix_rules {
            if let Some(base) = word.strip_suffix(suffix.as_str()) {
                let stem = format!("{base}{replacement}");
                if stem.len() >= self.min_stem_len {
                    return stem;
                }
                // Stem would be too short; fall through to the next rule.
            }
        }
        word.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = Tokenizer::default();
        assert_eq!(t.tokenize("Running, pages!"), vec!["runn", "pag"]);
    }

    #[test]
    fn guard_falls_through_to_shorter_suffix() {
        let t = Tokenizer::default();
        // "ies" -> "dy" is below the minimum stem length, "es" -> "di"
        // still is, "s" -> "die" finally passes.
        assert_eq!(t.tokenize("dies"), vec!["die"]);
    }
}
