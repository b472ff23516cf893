//! Tolerance evaluation for inspection measurements
//!
//! Drawings specify tolerances as short signed strings next to a nominal
//! value: `+0.1` widens the upper limit, `-0.05` widens the lower limit and a
//! bare `0.2` widens both. A measurement conforms when it falls inside the
//! resulting closed interval.
//!
//! Unparseable tokens never produce an error here; they simply add no
//! allowance. Callers that must insist on a tolerance check for it upstream.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single parsed tolerance token
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToleranceToken {
    /// `+m`: allowance above nominal
    Upper(f64),
    /// `-m`: allowance below nominal
    Lower(f64),
    /// `m`: allowance on whichever sides are not already set
    Symmetric(f64),
    /// Empty or unparseable
    Invalid,
}

impl ToleranceToken {
    /// Parse a token. Never fails; bad input becomes [`ToleranceToken::Invalid`].
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        if let Some(rest) = token.strip_prefix('+') {
            parse_magnitude(rest).map_or(ToleranceToken::Invalid, ToleranceToken::Upper)
        } else if let Some(rest) = token.strip_prefix('-') {
            parse_magnitude(rest).map_or(ToleranceToken::Invalid, ToleranceToken::Lower)
        } else {
            parse_magnitude(token).map_or(ToleranceToken::Invalid, ToleranceToken::Symmetric)
        }
    }

    /// Whether the token carries an allowance
    pub fn is_valid(&self) -> bool {
        !matches!(self, ToleranceToken::Invalid)
    }
}

fn parse_magnitude(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.starts_with(['+', '-']) {
        return None;
    }
    s.parse::<f64>()
        .ok()
        .filter(|m| m.is_finite() && *m >= 0.0)
}

impl From<&str> for ToleranceToken {
    fn from(token: &str) -> Self {
        ToleranceToken::parse(token)
    }
}

/// Outcome of checking a measurement against its tolerance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// Within tolerance
    #[serde(rename = "Conforme", alias = "conforme")]
    Conforme,
    /// Out of tolerance
    #[serde(rename = "Não Conforme", alias = "nao_conforme")]
    NaoConforme,
}

impl Verdict {
    pub fn is_conforming(&self) -> bool {
        matches!(self, Verdict::Conforme)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Conforme => write!(f, "Conforme"),
            Verdict::NaoConforme => write!(f, "Não Conforme"),
        }
    }
}

/// Closed acceptance interval `[lower, upper]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceRange {
    pub lower: f64,
    pub upper: f64,
}

impl ToleranceRange {
    /// Both bounds inclusive, no epsilon
    pub fn contains(&self, measured: f64) -> bool {
        !(measured < self.lower || measured > self.upper)
    }

    pub fn classify(&self, measured: f64) -> Verdict {
        if self.contains(measured) {
            Verdict::Conforme
        } else {
            Verdict::NaoConforme
        }
    }

    /// Total width of the band
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

impl fmt::Display for ToleranceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

/// A nominal value with up to two tolerance tokens
#[derive(Debug, Clone, PartialEq)]
pub struct ToleranceSpec {
    pub nominal: f64,
    pub tokens: Vec<ToleranceToken>,
}

impl ToleranceSpec {
    pub fn new(nominal: f64) -> Self {
        Self {
            nominal,
            tokens: Vec::new(),
        }
    }

    /// Build from the raw strings found on a drawing or form
    pub fn from_strings(nominal: f64, tolerance_a: Option<&str>, tolerance_b: Option<&str>) -> Self {
        Self {
            nominal,
            tokens: [tolerance_a, tolerance_b]
                .into_iter()
                .flatten()
                .map(ToleranceToken::parse)
                .collect(),
        }
    }

    pub fn with_token(mut self, token: impl Into<ToleranceToken>) -> Self {
        self.tokens.push(token.into());
        self
    }

    /// Resolve the tokens, in order, into an acceptance interval.
    ///
    /// Signed tokens always set their own side. An unsigned token fills only
    /// the sides no earlier token has set, so `"0.5"` followed by `"0.3"`
    /// keeps `±0.5`.
    pub fn range(&self) -> ToleranceRange {
        let mut lower = self.nominal;
        let mut upper = self.nominal;
        let mut lower_set = false;
        let mut upper_set = false;

        for token in &self.tokens {
            match *token {
                ToleranceToken::Upper(m) => {
                    upper = self.nominal + m;
                    upper_set = true;
                }
                ToleranceToken::Lower(m) => {
                    lower = self.nominal - m;
                    lower_set = true;
                }
                ToleranceToken::Symmetric(m) => {
                    if !upper_set {
                        upper = self.nominal + m;
                        upper_set = true;
                    }
                    if !lower_set {
                        lower = self.nominal - m;
                        lower_set = true;
                    }
                }
                ToleranceToken::Invalid => {}
            }
        }

        ToleranceRange { lower, upper }
    }

    pub fn classify(&self, measured: f64) -> Verdict {
        self.range().classify(measured)
    }
}

/// Classify `measured` against `nominal` and up to two tolerance tokens
pub fn evaluate_tolerance(
    nominal: f64,
    measured: f64,
    tolerance_a: Option<&str>,
    tolerance_b: Option<&str>,
) -> Verdict {
    ToleranceSpec::from_strings(nominal, tolerance_a, tolerance_b).classify(measured)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(nominal: f64, a: Option<&str>, b: Option<&str>) -> ToleranceRange {
        ToleranceSpec::from_strings(nominal, a, b).range()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected);
    }

    #[test]
    fn test_token_parsing() {
        assert_eq!(ToleranceToken::parse("+0.1"), ToleranceToken::Upper(0.1));
        assert_eq!(ToleranceToken::parse("-0.05"), ToleranceToken::Lower(0.05));
        assert_eq!(ToleranceToken::parse("0.2"), ToleranceToken::Symmetric(0.2));
        assert_eq!(ToleranceToken::parse(" +0.3 "), ToleranceToken::Upper(0.3));
        assert_eq!(ToleranceToken::parse(""), ToleranceToken::Invalid);
        assert_eq!(ToleranceToken::parse("+"), ToleranceToken::Invalid);
        assert_eq!(ToleranceToken::parse("abc"), ToleranceToken::Invalid);
        assert_eq!(ToleranceToken::parse("+-0.1"), ToleranceToken::Invalid);
        assert_eq!(ToleranceToken::parse("-+0.1"), ToleranceToken::Invalid);
        assert_eq!(ToleranceToken::parse("++0.1"), ToleranceToken::Invalid);
        assert_eq!(ToleranceToken::parse("+-0"), ToleranceToken::Invalid);
        assert_eq!(ToleranceToken::parse("+inf"), ToleranceToken::Invalid);
        assert_eq!(ToleranceToken::parse("NaN"), ToleranceToken::Invalid);
    }

    #[test]
    fn test_asymmetric_tokens_inside() {
        let r = range(100.0, Some("+0.1"), Some("-0.05"));
        assert_close(r.lower, 99.95);
        assert_close(r.upper, 100.1);
        assert_eq!(
            evaluate_tolerance(100.0, 100.05, Some("+0.1"), Some("-0.05")),
            Verdict::Conforme
        );
    }

    #[test]
    fn test_asymmetric_tokens_below_lower() {
        assert_eq!(
            evaluate_tolerance(100.0, 99.80, Some("+0.1"), Some("-0.05")),
            Verdict::NaoConforme
        );
    }

    #[test]
    fn test_no_tokens_collapses_to_nominal() {
        let r = range(50.0, None, None);
        assert_eq!((r.lower, r.upper), (50.0, 50.0));
        assert_eq!(evaluate_tolerance(50.0, 50.0, None, None), Verdict::Conforme);
        assert_eq!(evaluate_tolerance(50.0, 50.01, None, None), Verdict::NaoConforme);
    }

    #[test]
    fn test_invalid_tokens_collapse_to_nominal() {
        let r = range(50.0, Some("abc"), Some(""));
        assert_eq!((r.lower, r.upper), (50.0, 50.0));
    }

    #[test]
    fn test_single_unsigned_token_is_symmetric() {
        let r = range(10.0, Some("0.5"), None);
        assert_eq!((r.lower, r.upper), (9.5, 10.5));
        assert_eq!(evaluate_tolerance(10.0, 10.5, Some("0.5"), None), Verdict::Conforme);
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let cases: [(f64, Option<&str>, Option<&str>); 6] = [
            (100.0, Some("+0.1"), Some("-0.05")),
            (10.0, Some("0.5"), None),
            (50.0, None, None),
            (0.0, Some("-1.25"), None),
            (7.3, Some("+0.02"), Some("0.4")),
            (-20.0, Some("0.001"), Some("0.5")),
        ];

        for (nominal, a, b) in cases {
            let r = range(nominal, a, b);
            assert_eq!(evaluate_tolerance(nominal, r.lower, a, b), Verdict::Conforme);
            assert_eq!(evaluate_tolerance(nominal, r.upper, a, b), Verdict::Conforme);
        }
    }

    #[test]
    fn test_unsigned_after_signed_fills_opposite_side() {
        let r = range(20.0, Some("+0.2"), Some("0.1"));
        assert_close(r.upper, 20.2);
        assert_close(r.lower, 19.9);

        let r = range(20.0, Some("-0.3"), Some("0.1"));
        assert_close(r.lower, 19.7);
        assert_close(r.upper, 20.1);
    }

    #[test]
    fn test_second_unsigned_token_is_ignored() {
        let r = range(10.0, Some("0.5"), Some("0.3"));
        assert_eq!((r.lower, r.upper), (9.5, 10.5));
    }

    #[test]
    fn test_signed_after_unsigned_overrides_its_side() {
        let r = range(10.0, Some("0.5"), Some("+0.25"));
        assert_eq!((r.lower, r.upper), (9.5, 10.25));
    }

    #[test]
    fn test_range_always_brackets_nominal() {
        let tokens = ["+0.1", "-0.2", "0.3", "", "x", "+0", "-0"];
        for a in tokens {
            for b in tokens {
                let r = range(5.0, Some(a), Some(b));
                assert!(r.lower <= 5.0 && 5.0 <= r.upper, "{} {} -> {}", a, b, r);
            }
        }
    }

    #[test]
    fn test_one_sided_upper_only() {
        // Lower bound stays at nominal
        assert_eq!(evaluate_tolerance(3.0, 2.99, Some("+0.5"), None), Verdict::NaoConforme);
        assert_eq!(evaluate_tolerance(3.0, 3.4, Some("+0.5"), None), Verdict::Conforme);
    }

    #[test]
    fn test_verdict_serde_names() {
        assert_eq!(serde_json::to_string(&Verdict::Conforme).unwrap(), "\"Conforme\"");
        assert_eq!(
            serde_json::to_string(&Verdict::NaoConforme).unwrap(),
            "\"Não Conforme\""
        );
        let parsed: Verdict = serde_json::from_str("\"Não Conforme\"").unwrap();
        assert_eq!(parsed, Verdict::NaoConforme);
        assert_eq!(Verdict::NaoConforme.to_string(), "Não Conforme");
    }

    #[test]
    fn test_builder_tokens() {
        let spec = ToleranceSpec::new(12.0).with_token("+0.1").with_token("-0.1");
        assert_eq!(spec.tokens.len(), 2);
        assert!(spec.tokens.iter().all(|t| t.is_valid()));
        assert_eq!(spec.classify(12.05), Verdict::Conforme);
        assert_eq!(spec.classify(11.95), Verdict::Conforme);
        assert_eq!(spec.classify(12.11), Verdict::NaoConforme);
    }
}
