//! Accept header parsing and content negotiation.
//!
//! Acceptable types are kept as an ordered list of `(pattern, quality)`
//! pairs: [`ContentNegotiation::is_acceptable`] returns the quality of the
//! *first* pattern that matches, so the order of the list matters.

use regex::Regex;

/// Ordered `(pattern, quality)` pairs, most preferred first
pub type AcceptableTypes = Vec<(String, f64)>;

/// A parsed Accept header
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcceptHeader {
    items: AcceptableTypes,
}

impl AcceptHeader {
    /// Parse a header value.
    ///
    /// Items are sorted by quality, highest first, keeping the header order
    /// between equal qualities. Media type parameters other than `q` are
    /// dropped. A type listed twice keeps its first position and its last quality.
    pub fn parse(header: &str) -> Self {
        let mut parsed: Vec<(String, f64, usize)> = Vec::new();

        for (index, raw) in header.split(',').enumerate() {
            let mut parts = raw.split(';').map(str::trim);
            let value = match parts.next() {
                Some(value) if !value.is_empty() => value.to_string(),
                _ => continue,
            };

            let quality = parts
                .filter_map(|param| param.split_once('='))
                .find(|(key, _)| key.trim().eq_ignore_ascii_case("q"))
                .and_then(|(_, q)| q.trim().parse::<f64>().ok())
                .map(|q| q.clamp(0.0, 1.0))
                .unwrap_or(1.0);

            match parsed.iter_mut().find(|(existing, _, _)| *existing == value) {
                Some(entry) => entry.1 = quality,
                None => parsed.push((value, quality, index)),
            }
        }

        parsed.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.2.cmp(&b.2)));

        Self {
            items: parsed.into_iter().map(|(value, quality, _)| (value, quality)).collect(),
        }
    }

    pub fn items(&self) -> &[(String, f64)] {
        &self.items
    }

    pub fn into_acceptable_types(self) -> AcceptableTypes {
        self.items
    }
}

/// Picks representations out of what the client accepts
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentNegotiation;

impl ContentNegotiation {
    pub fn new() -> Self {
        Self
    }

    /// Quality of the first acceptable pattern matching `mime_type`.
    ///
    /// `*` in a pattern matches any sequence; the match is anchored at the
    /// start only. `None` means not acceptable at all.
    pub fn is_acceptable(&self, mime_type: &str, acceptable: &[(String, f64)]) -> Option<f64> {
        acceptable
            .iter()
            .find(|(pattern, _)| Self::pattern_matches(pattern, mime_type))
            .map(|(_, quality)| *quality)
    }

    /// The candidate with the strictly highest quality; earlier candidates win ties.
    /// Candidates accepted with quality 0 are never chosen.
    pub fn best_match<S: AsRef<str>>(&self, candidates: &[S], acceptable: &[(String, f64)]) -> Option<String> {
        let mut best = None;
        let mut max_quality = 0.0;

        for candidate in candidates {
            let candidate = candidate.as_ref();
            if let Some(quality) = self.is_acceptable(candidate, acceptable) {
                if quality > max_quality {
                    max_quality = quality;
                    best = Some(candidate.to_string());
                }
            }
        }

        best
    }

    fn pattern_matches(pattern: &str, mime_type: &str) -> bool {
        let expression = format!(
            "^{}",
            pattern.split('*').map(regex::escape).collect::<Vec<_>>().join(".*")
        );

        // Escaped patterns always compile
        Regex::new(&expression).is_ok_and(|regex| regex.is_match(mime_type))
    }
}
