//! Regex fact extraction
//!
//! Each fact is an [`Extractor`]: an ordered list of rules tried in
//! sequence, first match wins. A miss is an explicit
//! [`Extraction::NoMatch`], which callers turn into a display fallback
//! such as `"N/A"`.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Outcome of running an extractor over a message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Found(String),
    NoMatch,
}

impl Extraction {
    pub fn is_found(&self) -> bool {
        matches!(self, Extraction::Found(_))
    }

    pub fn found(self) -> Option<String> {
        match self {
            Extraction::Found(value) => Some(value),
            Extraction::NoMatch => None,
        }
    }

    /// The extracted value, or `fallback` on a miss
    pub fn or_fallback(self, fallback: &str) -> String {
        self.found().unwrap_or_else(|| fallback.to_string())
    }

    /// The extracted value, or `"N/A"` on a miss
    pub fn or_not_available(self) -> String {
        self.or_fallback(NOT_AVAILABLE)
    }
}

/// Display value for a fact that is absent from the text
pub const NOT_AVAILABLE: &str = "N/A";

/// One pattern plus how to render its match.
pub struct Rule {
    pattern: Regex,
    render: fn(&Captures<'_>) -> String,
}

impl Rule {
    /// Panics on an invalid pattern; rules are built from literals.
    pub fn new(pattern: &str, render: fn(&Captures<'_>) -> String) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("valid extraction rule"),
            render,
        }
    }

    /// Rule that yields the whole match
    pub fn whole(pattern: &str) -> Self {
        Self::new(pattern, |caps| caps[0].trim().to_string())
    }

    fn apply(&self, text: &str) -> Option<String> {
        self.pattern.captures(text).map(|caps| (self.render)(&caps))
    }
}

/// Ordered rule list for one fact.
pub struct Extractor {
    name: &'static str,
    rules: Vec<Rule>,
}

impl Extractor {
    pub fn new(name: &'static str, rules: Vec<Rule>) -> Self {
        Self { name, rules }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn extract(&self, text: &str) -> Extraction {
        match self.rules.iter().find_map(|rule| rule.apply(text)) {
            Some(value) => {
                tracing::trace!(fact = self.name, value = %value, "Extracted fact");
                Extraction::Found(value)
            }
            None => Extraction::NoMatch,
        }
    }
}

fn mg_per_dl(caps: &Captures<'_>) -> String {
    format!("{} mg/dL", &caps[1])
}

/// First lab value with a unit, falling back to any bare number.
pub static KEY_DATA_POINT: LazyLock<Extractor> = LazyLock::new(|| {
    Extractor::new(
        "key_data_point",
        vec![
            Rule::new(r"(?i)(\d+(?:\.\d+)?)\s*mg/dl\b", mg_per_dl),
            Rule::whole(r"\d+(?:\.\d+)?"),
        ],
    )
});

/// ApoB lab value stated near the word "apob".
pub static APOB: LazyLock<Extractor> = LazyLock::new(|| {
    Extractor::new(
        "apob",
        vec![
            Rule::new(r"(?i)\bapob\b\D{0,30}?(\d+(?:\.\d+)?)\s*mg/dl\b", mg_per_dl),
            Rule::new(
                r"(?i)(\d+(?:\.\d+)?)\s*mg/dl\s+(?:of\s+|for\s+)?apob\b",
                mg_per_dl,
            ),
        ],
    )
});

/// Signed HRV percentage change.
pub static HRV_TREND: LazyLock<Extractor> = LazyLock::new(|| {
    Extractor::new(
        "hrv_trend",
        vec![
            Rule::new(r"(?i)\bhrv\b\D{0,40}?([+-]\d+(?:\.\d+)?)\s*%", |caps| {
                format!("{}%", &caps[1])
            }),
            Rule::new(r"(?i)\bhrv\s+recovered\s+(\d+(?:\.\d+)?)%\s+faster", |caps| {
                format!("+{}%", &caps[1])
            }),
        ],
    )
});

/// Training emphasis, most specific keyword first.
pub static EXERCISE_FOCUS: LazyLock<Extractor> = LazyLock::new(|| {
    Extractor::new(
        "exercise_focus",
        vec![
            Rule::new(r"(?i)strength\s*(?:&|and)\s*hiit", |_| {
                "Strength & HIIT".to_string()
            }),
            Rule::new(r"(?i)\b(?:strength|resistance)\b", |_| {
                "Strength Training".to_string()
            }),
            Rule::new(r"(?i)\bmobility\b", |_| "Mobility".to_string()),
        ],
    )
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_data_point_prefers_lab_value() {
        assert_eq!(
            KEY_DATA_POINT.extract("Dose 10, ApoB at 102.5 mg/dL"),
            Extraction::Found("102.5 mg/dL".to_string())
        );
        assert_eq!(
            KEY_DATA_POINT.extract("Start 5 sessions a week"),
            Extraction::Found("5".to_string())
        );
        assert_eq!(
            KEY_DATA_POINT.extract("Start statins"),
            Extraction::NoMatch
        );
    }

    #[test]
    fn test_apob_patterns() {
        assert_eq!(
            APOB.extract("Your ApoB came back at 115 mg/dL.").found(),
            Some("115 mg/dL".to_string())
        );
        assert_eq!(
            APOB.extract("We measured 98 mg/dL of apob").found(),
            Some("98 mg/dL".to_string())
        );
        assert!(!APOB.extract("LDL is 130 mg/dL").is_found());
    }

    #[test]
    fn test_hrv_trend_patterns() {
        assert_eq!(
            HRV_TREND.extract("HRV is trending +10% this month").found(),
            Some("+10%".to_string())
        );
        assert_eq!(
            HRV_TREND.extract("Your hrv dropped -7.5 % after the flight").found(),
            Some("-7.5%".to_string())
        );
        assert_eq!(
            HRV_TREND.extract("Good news: HRV recovered 15% faster").found(),
            Some("+15%".to_string())
        );
        assert!(!HRV_TREND.extract("HRV looks stable").is_found());
    }

    #[test]
    fn test_exercise_focus_order() {
        assert_eq!(
            EXERCISE_FOCUS.extract("Moving to Strength & HIIT blocks").found(),
            Some("Strength & HIIT".to_string())
        );
        assert_eq!(
            EXERCISE_FOCUS.extract("more resistance bands and mobility").found(),
            Some("Strength Training".to_string())
        );
        assert_eq!(
            EXERCISE_FOCUS.extract("daily mobility flow").found(),
            Some("Mobility".to_string())
        );
        assert_eq!(EXERCISE_FOCUS.extract("rest day"), Extraction::NoMatch);
    }

    #[test]
    fn test_extraction_fallbacks() {
        assert_eq!(Extraction::NoMatch.or_not_available(), "N/A");
        assert_eq!(Extraction::NoMatch.or_fallback("none"), "none");
        assert_eq!(Extraction::Found("x".to_string()).or_fallback("none"), "x");
    }
}
