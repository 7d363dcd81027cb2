//! Text normalisation and fuzzy similarity.
//!
//! Used by duplicate detection, the idempotency key and keyword rules, so
//! that every component agrees on what "the same description" means.

use std::collections::{HashMap, HashSet};

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "i", "im", "my", "me", "we", "our", "is", "am", "are", "was", "be", "been",
    "to", "of", "in", "on", "at", "for", "and", "or", "it", "its", "this", "that", "with", "from",
    "has", "have", "had", "do", "does", "so", "just", "please", "hi", "hello",
];

/// Lower-cases, drops apostrophes, turns every other non-alphanumeric
/// character into a space and collapses runs of whitespace.
///
/// `"My laptop WON'T connect!"` becomes `"my laptop wont connect"`.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars() {
        if ch == '\'' || ch == '\u{2019}' {
            continue;
        }
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    out
}

/// Normalised tokens with stop words removed.
pub fn content_tokens(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|token| !token.is_empty() && !STOP_WORDS.contains(token))
        .map(str::to_string)
        .collect()
}

/// Jaccard overlap of the content-token sets.
pub fn token_jaccard(a: &str, b: &str) -> f64 {
    let left: HashSet<String> = content_tokens(a).into_iter().collect();
    let right: HashSet<String> = content_tokens(b).into_iter().collect();
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let inter = left.intersection(&right).count() as f64;
    let union = left.union(&right).count() as f64;
    if union > 0.0 { inter / union } else { 0.0 }
}

/// Sørensen–Dice coefficient over character bigrams of the normalised text.
pub fn bigram_dice(a: &str, b: &str) -> f64 {
    let left = bigrams(&normalize(a));
    let right = bigrams(&normalize(b));
    let left_total: usize = left.values().sum();
    let right_total: usize = right.values().sum();
    if left_total == 0 || right_total == 0 {
        return 0.0;
    }
    let shared: usize = left
        .iter()
        .map(|(gram, count)| right.get(gram).map_or(0, |other| (*count).min(*other)))
        .sum();
    (2 * shared) as f64 / (left_total + right_total) as f64
}

fn bigrams(normalized: &str) -> HashMap<(char, char), usize> {
    let chars: Vec<char> = normalized.chars().collect();
    let mut grams = HashMap::new();
    for pair in chars.windows(2) {
        *grams.entry((pair[0], pair[1])).or_insert(0) += 1;
    }
    grams
}

/// Similarity of two free-text descriptions in `[0, 1]`.
///
/// Identical normalised texts score exactly 1.0; if either side is empty
/// the score is 0.0. Otherwise the mean of token overlap and bigram
/// similarity.
pub fn similarity(a: &str, b: &str) -> f64 {
    let left = normalize(a);
    let right = normalize(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    if left == right {
        return 1.0;
    }
    let score = (token_jaccard(&left, &right) + bigram_dice(&left, &right)) / 2.0;
    score.clamp(0.0, 1.0)
}

/// True when `phrase` occurs in `normalized` on word boundaries.
///
/// Both sides must already be normalised.
pub fn contains_phrase(normalized: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    format!(" {} ", normalized).contains(&format!(" {} ", phrase))
}

/// True when any phrase in `phrases` occurs in `normalized`.
pub fn contains_any(normalized: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| contains_phrase(normalized, p))
}

const NUMBER_PREFIXES: &[&str] = &["inc", "req", "chg", "prb"];

/// Ticket numbers such as `INC0012345` or `REQ0010002` mentioned in the
/// text, upper-cased.
pub fn ticket_numbers(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|token| {
            token.len() > 3
                && NUMBER_PREFIXES.iter().any(|prefix| token.starts_with(prefix))
                && token[3..].chars().all(|c| c.is_ascii_digit())
        })
        .map(str::to_uppercase)
        .collect()
}
