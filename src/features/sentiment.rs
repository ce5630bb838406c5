// Sentiment scorer trait: the swap-ready abstraction for the Sentiment
// feature.
//
// Extraction must be total and deterministic, so scorers are synchronous
// and infallible: they map text to a polarity in [-1, 1] and return 0 when
// they have nothing to say. The scorer's name is recorded in the training
// metadata so a service can tell when it is scoring with a different one.

/// Maps free text to a sentiment polarity in [-1, 1].
pub trait SentimentScorer: Send + Sync {
    fn polarity(&self, text: &str) -> f64;

    /// Stable identifier recorded alongside trained models.
    fn name(&self) -> &'static str;
}

/// Always 0. Useful when sentiment should be switched off without changing
/// the feature layout.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeutralScorer;

impl SentimentScorer for NeutralScorer {
    fn polarity(&self, _text: &str) -> f64 {
        0.0
    }

    fn name(&self) -> &'static str {
        "neutral"
    }
}

/// Lexicon-based polarity: the mean polarity of the opinion words found,
/// where an intensifier right before a word scales it and a negation within
/// the previous three tokens flips and halves it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexiconScorer;

const LEXICON: &[(&str, f64)] = &[
    ("amazing", 0.6),
    ("awesome", 1.0),
    ("beautiful", 0.85),
    ("best", 1.0),
    ("better", 0.5),
    ("brilliant", 0.9),
    ("cool", 0.35),
    ("excellent", 1.0),
    ("fantastic", 0.4),
    ("fun", 0.3),
    ("glad", 0.5),
    ("good", 0.7),
    ("great", 0.8),
    ("happy", 0.8),
    ("interesting", 0.5),
    ("like", 0.2),
    ("love", 0.5),
    ("lovely", 0.5),
    ("nice", 0.6),
    ("perfect", 1.0),
    ("positive", 0.23),
    ("thanks", 0.2),
    ("win", 0.8),
    ("wonderful", 1.0),
    ("wow", 0.1),
    ("angry", -0.5),
    ("annoying", -0.8),
    ("awful", -1.0),
    ("bad", -0.7),
    ("boring", -1.0),
    ("crazy", -0.6),
    ("disappointing", -0.6),
    ("dumb", -0.375),
    ("evil", -1.0),
    ("fake", -0.5),
    ("hate", -0.8),
    ("horrible", -1.0),
    ("lose", -0.4),
    ("negative", -0.3),
    ("poor", -0.4),
    ("sad", -0.5),
    ("scam", -0.6),
    ("stupid", -0.8),
    ("terrible", -1.0),
    ("ugly", -0.7),
    ("wrong", -0.5),
    ("worse", -0.4),
    ("worst", -1.0),
];

const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.3),
    ("really", 1.3),
    ("extremely", 1.5),
    ("so", 1.2),
    ("super", 1.4),
    ("totally", 1.3),
    ("slightly", 0.6),
];

const NEGATIONS: &[&str] = &["not", "no", "never", "nothing", "don't", "isn't", "can't", "won't"];

const NEGATION_WINDOW: usize = 3;

fn lookup(table: &[(&str, f64)], word: &str) -> Option<f64> {
    table.iter().find(|(w, _)| *w == word).map(|(_, p)| *p)
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

impl SentimentScorer for LexiconScorer {
    fn polarity(&self, text: &str) -> f64 {
        let tokens = tokenize(text);
        let mut scores = Vec::new();

        for (i, token) in tokens.iter().enumerate() {
            let Some(mut polarity) = lookup(LEXICON, token) else {
                continue;
            };
            if let Some(prev) = i.checked_sub(1).map(|p| tokens[p].as_str()) {
                if let Some(factor) = lookup(INTENSIFIERS, prev) {
                    polarity *= factor;
                }
            }
            let window = &tokens[i.saturating_sub(NEGATION_WINDOW)..i];
            if window
                .iter()
                .any(|t| NEGATIONS.contains(&t.as_str()) || t.ends_with("n't"))
            {
                polarity *= -0.5;
            }
            scores.push(polarity.clamp(-1.0, 1.0));
        }

        if scores.is_empty() {
            return 0.0;
        }
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        mean.clamp(-1.0, 1.0)
    }

    fn name(&self) -> &'static str {
        "lexicon-v1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_neutral() {
        assert_eq!(LexiconScorer.polarity(""), 0.0);
        assert_eq!(LexiconScorer.polarity("the cat sat"), 0.0);
    }

    #[test]
    fn positive_and_negative_words() {
        assert!(LexiconScorer.polarity("what a great day") > 0.0);
        assert!(LexiconScorer.polarity("this is terrible") < 0.0);
    }

    #[test]
    fn negation_flips_and_softens() {
        let plain = LexiconScorer.polarity("good");
        let negated = LexiconScorer.polarity("not good");
        assert!((negated + plain * 0.5).abs() < 1e-12);
    }

    #[test]
    fn intensifier_is_clamped() {
        let p = LexiconScorer.polarity("extremely excellent");
        assert!((p - 1.0).abs() < 1e-12);
    }

    #[test]
    fn polarity_stays_in_range() {
        for text in ["WORST WORST scam", "best best awesome!!!", "not not not bad"] {
            let p = LexiconScorer.polarity(text);
            assert!((-1.0..=1.0).contains(&p), "{text}: {p}");
        }
    }

    #[test]
    fn neutral_scorer_is_zero() {
        assert_eq!(NeutralScorer.polarity("I love this"), 0.0);
    }
}
