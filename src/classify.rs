//! Provenance classification: is a review about the business itself or a
//! competitor?
//!
//! An explicit source column value wins when it is recognized; otherwise the
//! originating file name decides. Files matching neither keyword set fall
//! back to [`DEFAULT_SOURCE`].

use serde::{Deserialize, Serialize};

/// Review provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Source {
    Own,
    Competitor,
}

impl Source {
    /// Wire label used in prompts and source columns.
    pub fn as_label(&self) -> &'static str {
        match self {
            Source::Own => "MY_SHOP",
            Source::Competitor => "COMPETITOR",
        }
    }
}

/// Applied when neither the source column nor the file name matches anything.
/// Competitor rather than Own: an unknown competitor name silently tagged as
/// the business's own reviews would poison the Strengths/Weaknesses quadrants.
pub const DEFAULT_SOURCE: Source = Source::Competitor;

/// Explicit column values mapped to Own.
const OWN_VALUES: &[&str] = &[
    "MY_SHOP", "MY SHOP", "CỦA MÌNH", "CUA MINH", "SHOP", "STORE", "BRAND",
];

/// Explicit column values mapped to Competitor.
const COMPETITOR_VALUES: &[&str] = &[
    "COMPETITOR", "COMPETITORS", "ĐỐI THỦ", "DOI THU", "COMPETITION", "RIVAL",
];

/// File-name fragments indicating the business's own data.
const OWN_FILE_KEYWORDS: &[&str] = &[
    "my_shop", "myshop", "của mình", "cua minh", "my store", "mystore",
    "our shop", "ourshop", "our store", "ourstore", "my_", "my-",
    "own_", "own ", "self", "internal", "nội bộ", "noi bo",
];

/// File-name fragments indicating competitor data: generic terms, coffee
/// chains, and delivery platforms common in the target market.
const COMPETITOR_FILE_KEYWORDS: &[&str] = &[
    "competitor", "competitors", "đối thủ", "doi thu", "rival", "competition",
    "starbucks", "phuc long", "phuclong", "katinat", "highlands", "highland",
    "trung nguyen", "trungnguyen", "coffee house", "cong ca phe", "congcaphe",
    "passio", "gong cha", "gongcha",
    "shopee", "lazada", "grab", "baemin", "gojek",
    "market", "others",
];

/// Map an explicit source-column value, case-insensitive. `None` for
/// unrecognized values, which then fall back to filename inference.
pub fn from_explicit(value: &str) -> Option<Source> {
    let v = value.trim().to_uppercase();
    if OWN_VALUES.contains(&v.as_str()) {
        Some(Source::Own)
    } else if COMPETITOR_VALUES.contains(&v.as_str()) {
        Some(Source::Competitor)
    } else {
        None
    }
}

/// Infer provenance from a file name. Own keywords are tested first: they
/// are the more specific set, while the competitor set includes broad brand
/// and platform names.
pub fn from_filename(filename: &str) -> Option<Source> {
    let name = filename.trim().to_lowercase();
    if OWN_FILE_KEYWORDS.iter().any(|k| name.contains(k)) {
        Some(Source::Own)
    } else if COMPETITOR_FILE_KEYWORDS.iter().any(|k| name.contains(k)) {
        Some(Source::Competitor)
    } else {
        None
    }
}

/// Resolve the provenance of one row. Never leaves a row unclassified.
pub fn classify(explicit: Option<&str>, filename: &str) -> Source {
    if let Some(value) = explicit {
        if let Some(source) = from_explicit(value) {
            return source;
        }
    }
    from_filename(filename).unwrap_or(DEFAULT_SOURCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_values_case_insensitive() {
        for v in ["MY_SHOP", "my_shop", "Của Mình", "cua minh"] {
            assert_eq!(from_explicit(v), Some(Source::Own), "{}", v);
        }
        for v in ["COMPETITOR", "competitor", "Đối Thủ", "RIVAL"] {
            assert_eq!(from_explicit(v), Some(Source::Competitor), "{}", v);
        }
        assert_eq!(from_explicit("whatever"), None);
    }

    #[test]
    fn test_filename_inference() {
        assert_eq!(from_filename("my_shop_reviews.csv"), Some(Source::Own));
        assert_eq!(from_filename("Starbucks Q3.xlsx"), Some(Source::Competitor));
        assert_eq!(from_filename("phuc long.csv"), Some(Source::Competitor));
        assert_eq!(from_filename("data.csv"), None);
    }

    #[test]
    fn test_own_keywords_win_over_competitor_keywords() {
        // "my_shop vs starbucks" contains fragments from both sets
        assert_eq!(
            from_filename("my_shop vs starbucks.csv"),
            Some(Source::Own)
        );
    }

    #[test]
    fn test_default_policy_is_competitor() {
        assert_eq!(classify(None, "unknown_cafe.csv"), DEFAULT_SOURCE);
        assert_eq!(DEFAULT_SOURCE, Source::Competitor);
    }

    #[test]
    fn test_unrecognized_explicit_falls_back_to_filename() {
        assert_eq!(classify(Some("???"), "my_shop.csv"), Source::Own);
        assert_eq!(classify(Some("branch 3"), "data.csv"), Source::Competitor);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let a = classify(None, "highlands_jan.csv");
        let b = classify(None, "highlands_jan.csv");
        assert_eq!(a, b);
    }
}
