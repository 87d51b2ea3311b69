//! Merging raw tables into one canonical review set.
//!
//! One bad file never aborts the batch: its error is recorded as a
//! [`FileIssue`] and the remaining files are still processed.

use crate::classify::{self, Source};
use crate::columns::{self, ColumnMap};
use crate::table::RawTable;
use std::collections::HashSet;

/// Reviews shorter than this (after trimming) are dropped as noise.
const MIN_REVIEW_CHARS: usize = 4;

/// One customer comment. Immutable after ingestion.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Review {
    pub text: String,
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu_item: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// Per-file ingestion statistics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FileStats {
    pub file: String,
    pub rows_read: usize,
    pub reviews_kept: usize,
    pub own: usize,
    pub competitor: usize,
}

/// A file that could not contribute to the merged set.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FileIssue {
    pub file: String,
    pub error: String,
}

/// Ordered collection of classified reviews plus ingestion statistics.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ReviewSet {
    pub reviews: Vec<Review>,
    pub file_stats: Vec<FileStats>,
}

impl ReviewSet {
    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    pub fn count_source(&self, source: Source) -> usize {
        self.reviews.iter().filter(|r| r.source == source).count()
    }

    /// Split into (own, competitor) preserving insertion order.
    pub fn partition_by_source(self) -> (Vec<Review>, Vec<Review>) {
        self.reviews.into_iter().partition(|r| r.source == Source::Own)
    }
}

/// A parsed upload awaiting normalization.
#[derive(Debug)]
pub struct ParsedFile {
    pub name: String,
    pub tables: Vec<RawTable>,
}

/// Merge parsed files into one ReviewSet. Rows with empty text are dropped,
/// duplicates (same text + source) keep the first occurrence, and numeric
/// fields that fail to parse become absent.
pub fn build_review_set(files: Vec<ParsedFile>) -> (ReviewSet, Vec<FileIssue>) {
    let mut set = ReviewSet::default();
    let mut issues = Vec::new();
    let mut seen: HashSet<(String, Source)> = HashSet::new();

    for file in files {
        let mut rows_read = 0usize;
        let mut kept = Vec::new();
        let mut file_failed = false;

        for table in &file.tables {
            rows_read += table.rows.len();
            match columns::detect_columns(&file.name, table) {
                Ok(map) => kept.extend(extract_reviews(&file.name, table, &map)),
                Err(e) => {
                    issues.push(FileIssue {
                        file: file.name.clone(),
                        error: e.to_string(),
                    });
                    file_failed = true;
                    break;
                }
            }
        }

        if file_failed {
            tracing::warn!("Excluding file '{}' from merged set", file.name);
            continue;
        }

        let mut stats = FileStats {
            file: file.name.clone(),
            rows_read,
            reviews_kept: 0,
            own: 0,
            competitor: 0,
        };

        for review in kept {
            if !seen.insert((review.text.clone(), review.source)) {
                continue;
            }
            stats.reviews_kept += 1;
            match review.source {
                Source::Own => stats.own += 1,
                Source::Competitor => stats.competitor += 1,
            }
            set.reviews.push(review);
        }

        tracing::info!(
            "Ingested '{}': {} rows read, {} reviews kept ({} own / {} competitor)",
            stats.file,
            stats.rows_read,
            stats.reviews_kept,
            stats.own,
            stats.competitor
        );
        set.file_stats.push(stats);
    }

    (set, issues)
}

fn extract_reviews(file: &str, table: &RawTable, map: &ColumnMap) -> Vec<Review> {
    let mut reviews = Vec::with_capacity(table.rows.len());

    for row in &table.rows {
        let cell = |idx: usize| row.get(idx).map(|v| v.trim()).unwrap_or("");

        let mut text = cell(map.review).to_string();
        for &extra in &map.extra_review {
            let part = cell(extra);
            if !part.is_empty() && !part.eq_ignore_ascii_case("nan") {
                text.push(' ');
                text.push_str(part);
            }
        }
        let text = text.trim().to_string();
        if text.chars().count() < MIN_REVIEW_CHARS || text.eq_ignore_ascii_case("nan") {
            continue;
        }

        let explicit = map.source.map(cell).filter(|v| !v.is_empty());
        let source = classify::classify(explicit, file);

        reviews.push(Review {
            text,
            source,
            price: map.price.and_then(|i| parse_number(cell(i))),
            rating: map.rating.and_then(|i| parse_number(cell(i))),
            date: map.date.map(cell).filter(|v| !v.is_empty()).map(String::from),
            menu_item: map.menu.map(cell).filter(|v| !v.is_empty()).map(String::from),
            author: map.user.map(cell).filter(|v| !v.is_empty()).map(String::from),
        });
    }

    reviews
}

/// Best-effort numeric parse tolerating currency symbols and both decimal
/// conventions ("45.000đ", "1,234.56", "4,5").
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = if cleaned.contains('.') && cleaned.contains(',') {
        // Mixed separators: commas are thousands marks
        cleaned.replace(',', "")
    } else if let Some(pos) = cleaned.rfind(',') {
        let frac_digits = cleaned.len() - pos - 1;
        if frac_digits <= 2 && cleaned.matches(',').count() == 1 {
            cleaned.replace(',', ".")
        } else {
            cleaned.replace(',', "")
        }
    } else {
        cleaned
    };

    normalized.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, headers: &[&str], rows: &[&[&str]]) -> ParsedFile {
        ParsedFile {
            name: name.to_string(),
            tables: vec![RawTable {
                name: name.to_string(),
                headers: headers.iter().map(|s| s.to_string()).collect(),
                rows: rows
                    .iter()
                    .map(|r| r.iter().map(|s| s.to_string()).collect())
                    .collect(),
            }],
        }
    }

    #[test]
    fn test_empty_text_dropped() {
        let f = file(
            "my_shop.csv",
            &["review"],
            &[&["Cà phê ngon lắm"], &["   "], &["nan"], &["ok"]],
        );
        let (set, issues) = build_review_set(vec![f]);
        assert!(issues.is_empty());
        assert_eq!(set.len(), 1);
        assert!(set.reviews.iter().all(|r| !r.text.trim().is_empty()));
    }

    #[test]
    fn test_min_length_counts_characters_not_bytes() {
        // "ồn" is two characters but four bytes
        let f = file(
            "my_shop.csv",
            &["review"],
            &[&["ồn"], &["quá ồn ào"]],
        );
        let (set, _) = build_review_set(vec![f]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.reviews[0].text, "quá ồn ào");
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let f = file(
            "my_shop.csv",
            &["review", "rating"],
            &[&["Phục vụ tốt", "5"], &["Phục vụ tốt", "1"]],
        );
        let (set, _) = build_review_set(vec![f]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.reviews[0].rating, Some(5.0));
    }

    #[test]
    fn test_merge_order_independent_up_to_order() {
        let a = || file("my_shop.csv", &["review"], &[&["quán sạch sẽ"]]);
        let b = || file("starbucks.csv", &["review"], &[&["view đẹp"]]);

        let (ab, _) = build_review_set(vec![a(), b()]);
        let (ba, _) = build_review_set(vec![b(), a()]);

        let mut texts_ab: Vec<_> = ab.reviews.iter().map(|r| r.text.clone()).collect();
        let mut texts_ba: Vec<_> = ba.reviews.iter().map(|r| r.text.clone()).collect();
        texts_ab.sort();
        texts_ba.sort();
        assert_eq!(texts_ab, texts_ba);
    }

    #[test]
    fn test_bad_file_isolated() {
        let good = file("my_shop.csv", &["review"], &[&["tuyệt vời"]]);
        let bad = file("numbers.csv", &["id", "qty"], &[&["1", "2"]]);
        let (set, issues) = build_review_set(vec![bad, good]);
        assert_eq!(set.len(), 1);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].file, "numbers.csv");
    }

    #[test]
    fn test_explicit_source_overrides_filename() {
        let f = file(
            "starbucks.csv",
            &["review", "source"],
            &[&["đồ uống ổn", "MY_SHOP"], &["không gian đẹp", ""]],
        );
        let (set, _) = build_review_set(vec![f]);
        assert_eq!(set.reviews[0].source, Source::Own);
        // blank explicit value falls back to the file name
        assert_eq!(set.reviews[1].source, Source::Competitor);
    }

    #[test]
    fn test_file_stats() {
        let f = file(
            "my_shop.csv",
            &["review", "source"],
            &[&["ngon", "MY_SHOP"], &["dở", "COMPETITOR"], &["", ""]],
        );
        let (set, _) = build_review_set(vec![f]);
        let stats = &set.file_stats[0];
        assert_eq!(stats.rows_read, 3);
        assert_eq!(stats.reviews_kept, 2);
        assert_eq!(stats.own, 1);
        assert_eq!(stats.competitor, 1);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("45000"), Some(45000.0));
        assert_eq!(parse_number("45.000đ"), Some(45.0)); // dot kept as decimal
        assert_eq!(parse_number("1,234.56"), Some(1234.56));
        assert_eq!(parse_number("4,5"), Some(4.5));
        assert_eq!(parse_number("45,000"), Some(45000.0));
        assert_eq!(parse_number("free"), None);
        assert_eq!(parse_number(""), None);
    }
}
