// crates/geo_algo/src/normalize.rs
//
// Free-text state/district canonicalization.
//
// Contract:
// - Total: `None` and "" both give "" (never fails).
// - Output alphabet is [a-z ] with single interior spaces, no leading/trailing space.
// - Idempotent: normalize(normalize(x)) == normalize(x).
// - An empty result means the row must be rejected upstream of resolution.

use std::collections::BTreeSet;

use geo_core::variables::DEFAULT_NOISE_WORDS;

/// Lowercase, replace every non `a-z` char with a separator, collapse runs of
/// whitespace, trim.
pub fn canonical_letters(text: &str) -> String {
    let lowered = text.to_lowercase();
    let spaced: String = lowered
        .chars()
        .map(|c| if c.is_ascii_lowercase() { c } else { ' ' })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Raw-feed normalizer with a configurable administrative noise-word list.
#[derive(Clone, Debug)]
pub struct Normalizer {
    noise: BTreeSet<String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_NOISE_WORDS)
    }
}

impl Normalizer {
    /// Noise words go through the same canonicalization; blank entries are ignored.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let noise = words
            .into_iter()
            .map(|w| canonical_letters(w.as_ref()))
            .filter(|w| !w.is_empty() && !w.contains(' '))
            .collect();
        Self { noise }
    }

    pub fn noise_words(&self) -> impl Iterator<Item = &str> {
        self.noise.iter().map(String::as_str)
    }

    pub fn normalize(&self, text: Option<&str>) -> String {
        match text {
            Some(t) => self.normalize_str(t),
            None => String::new(),
        }
    }

    /// A noise token is dropped when a separator sits on both sides of it in
    /// the collapsed text. The input is trimmed first, so a bare leading or
    /// trailing noise word stays, while one set off by punctuation or digits
    /// (`"Ananthapur Dist."`, `"Bengaluru (Urban)"`) goes.
    pub fn normalize_str(&self, text: &str) -> String {
        let spaced: String = text
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_lowercase() { c } else { ' ' })
            .collect();
        let open_start = spaced.starts_with(' ');
        let open_end = spaced.ends_with(' ');
        let mut tokens: Vec<&str> = spaced.split_whitespace().collect();

        // Removing a token leaves a separator behind, so the edge flags hold
        // across passes; loop until stable.
        loop {
            let before = tokens.len();
            let last = before.saturating_sub(1);
            tokens = tokens
                .iter()
                .enumerate()
                .filter(|(i, t)| {
                    let surrounded = (*i > 0 || open_start) && (*i < last || open_end);
                    !(surrounded && self.noise.contains(**t))
                })
                .map(|(_, t)| *t)
                .collect();
            if tokens.len() == before {
                break;
            }
        }
        tokens.join(" ")
    }
}

/// Master-side state names: drops the `(state)` marker and the word `state`.
pub fn normalize_master_state(text: Option<&str>) -> String {
    let Some(t) = text else { return String::new() };
    let lowered = t.to_lowercase().replace("(state)", " ");
    canonical_letters(&lowered)
        .split(' ')
        .filter(|tok| !tok.is_empty() && *tok != "state")
        .collect::<Vec<_>>()
        .join(" ")
}

/// Master-side district names: letters-only canonicalization, no noise elision.
pub fn normalize_master_district(text: Option<&str>) -> String {
    text.map(canonical_letters).unwrap_or_default()
}
