// Text-derived features: counts and ratios over the post body, hashtag
// field and username.
//
// All functions here are total. Empty input gives 0 for every ratio.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex_lite::Regex;

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid URL regex"));

/// Emoji blocks counted by `emoji_count`: emoticons, misc symbols and
/// pictographs, transport and map symbols, regional indicators.
const EMOJI_RANGES: [(u32, u32); 4] = [
    (0x1F600, 0x1F64F),
    (0x1F300, 0x1F5FF),
    (0x1F680, 0x1F6FF),
    (0x1F1E0, 0x1F1FF),
];

/// Length in Unicode scalar values, not bytes.
pub fn char_length(text: &str) -> usize {
    text.chars().count()
}

/// Number of whitespace-separated tokens in the hashtag field.
pub fn hashtag_count(hashtags: &str) -> usize {
    hashtags.split_whitespace().count()
}

pub fn count_char(text: &str, needle: char) -> usize {
    text.chars().filter(|&c| c == needle).count()
}

pub fn uppercase_ratio(text: &str) -> f64 {
    let total = char_length(text);
    if total == 0 {
        return 0.0;
    }
    let upper = text.chars().filter(|c| c.is_uppercase()).count();
    upper as f64 / total as f64
}

/// Distinct tokens over total tokens (whitespace split, case-sensitive).
pub fn unique_word_ratio(text: &str) -> f64 {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return 0.0;
    }
    let distinct: HashSet<&str> = tokens.iter().copied().collect();
    distinct.len() as f64 / tokens.len() as f64
}

/// Number of `http://` or `https://` prefixed tokens.
pub fn url_count(text: &str) -> usize {
    URL_PATTERN.find_iter(text).count()
}

pub fn emoji_count(text: &str) -> usize {
    text.chars()
        .filter(|&c| {
            let cp = c as u32;
            EMOJI_RANGES
                .iter()
                .any(|&(lo, hi)| (lo..=hi).contains(&cp))
        })
        .count()
}

/// Fraction of ASCII digits in a username.
pub fn digit_ratio(username: &str) -> f64 {
    let total = char_length(username);
    if total == 0 {
        return 0.0;
    }
    let digits = username.chars().filter(|c| c.is_ascii_digit()).count();
    digits as f64 / total as f64
}
