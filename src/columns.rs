//! Column detection over raw tables.
//!
//! Input files are arbitrary spreadsheets, so the review-text column, the
//! optional source column, and auxiliary columns (price, rating, menu item,
//! date, author) are all found heuristically: name-keyword matching first,
//! content statistics as a fallback.

use crate::error::PipelineError;
use crate::table::RawTable;

/// Column-name keywords that indicate review text (English + Vietnamese).
const REVIEW_NAME_KEYWORDS: &[&str] = &[
    "review", "comment", "content", "text", "feedback", "description", "note",
    "remark", "opinion", "thought", "experience", "detail", "message", "response",
    "đánh giá", "nhận xét", "nội dung", "mô tả", "bình luận", "phản hồi",
    "ý kiến", "cảm nhận", "trải nghiệm", "chi tiết", "ghi chú",
];

/// The subset of review keywords treated as unambiguous when several
/// candidate columns exist.
const STRONG_REVIEW_KEYWORDS: &[&str] =
    &["review", "comment", "feedback", "đánh giá", "nhận xét"];

/// Column names that disqualify a column from being the source column even
/// when a source keyword appears in them ("Link Source", "review_text"...).
const SOURCE_EXCLUDED_KEYWORDS: &[&str] = &[
    "link", "url", "review", "text", "address", "name", "description", "content",
];

/// Columns skipped entirely when scanning values for source labels.
const VALUE_SCAN_EXCLUDED_KEYWORDS: &[&str] = &[
    "review", "text", "desc", "content", "comment", "address", "name", "link",
    "url", "item", "menu", "price", "rating", "date", "user", "customer",
];

/// Explicit provenance labels recognized inside a source column.
pub const SOURCE_VALUE_VOCAB: &[&str] = &[
    "MY_SHOP", "MY SHOP", "CỦA MÌNH", "CUA MINH",
    "COMPETITOR", "COMPETITORS", "ĐỐI THỦ", "DOI THU",
];

const ID_LIKE_KEYWORDS: &[&str] = &["id", "code", "number", "num", "no", "stt", "index"];

const PRICE_KEYWORDS: &[&str] =
    &["price", "giá", "cost", "chi phí", "amount", "số tiền", "money"];
const RATING_KEYWORDS: &[&str] =
    &["rating", "điểm", "score", "star", "sao", "rate"];
const MENU_KEYWORDS: &[&str] = &[
    "menu", "product", "sản phẩm", "item", "món", "dish", "drink", "đồ uống",
    "food", "thức ăn",
];
const DATE_KEYWORDS: &[&str] =
    &["date", "ngày", "time", "thời gian", "created", "updated", "timestamp"];
const USER_KEYWORDS: &[&str] =
    &["user", "customer", "khách hàng", "name", "tên", "author", "người đánh giá"];

/// Minimum content-statistics score for a column to qualify as review text.
const MIN_TEXT_SCORE: f64 = 30.0;
/// At most this many text columns are concatenated when no name matches.
const MAX_MERGED_TEXT_COLUMNS: usize = 3;

/// Positional column mapping resolved for one table.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    /// Primary review-text column.
    pub review: usize,
    /// Additional text columns merged into the review text.
    pub extra_review: Vec<usize>,
    pub source: Option<usize>,
    pub price: Option<usize>,
    pub rating: Option<usize>,
    pub menu: Option<usize>,
    pub date: Option<usize>,
    pub user: Option<usize>,
}

/// Detect all relevant columns of a table. Fails only when no column
/// qualifies as review text; a missing source column is not an error.
pub fn detect_columns(file: &str, table: &RawTable) -> Result<ColumnMap, PipelineError> {
    let names: Vec<String> = table
        .headers
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let (review, extra_review) =
        detect_review_columns(table, &names).ok_or_else(|| PipelineError::ColumnNotFound {
            file: file.to_string(),
            columns: table.headers.clone(),
        })?;

    let source = detect_source_column(table, &names, review);

    let mut map = ColumnMap {
        review,
        extra_review,
        source,
        ..Default::default()
    };

    let mut claimed: Vec<usize> = vec![review];
    claimed.extend(&map.extra_review);
    claimed.extend(map.source);

    map.price = find_aux(&names, PRICE_KEYWORDS, &mut claimed);
    map.rating = find_aux(&names, RATING_KEYWORDS, &mut claimed);
    map.menu = find_aux(&names, MENU_KEYWORDS, &mut claimed);
    map.date = find_aux(&names, DATE_KEYWORDS, &mut claimed);
    map.user = find_aux(&names, USER_KEYWORDS, &mut claimed);

    tracing::debug!(
        "Detected columns in '{}': review='{}', source={:?}",
        file,
        table.headers[map.review],
        map.source.map(|i| table.headers[i].as_str())
    );

    Ok(map)
}

/// Phase 1: name-keyword match. Phase 2: content-statistics scoring.
/// Returns the primary column plus any extra text columns to concatenate.
fn detect_review_columns(table: &RawTable, names: &[String]) -> Option<(usize, Vec<usize>)> {
    let mut candidates: Vec<usize> = names
        .iter()
        .enumerate()
        .filter(|(_, n)| REVIEW_NAME_KEYWORDS.iter().any(|k| n.contains(k)))
        .map(|(i, _)| i)
        .collect();

    if candidates.is_empty() {
        // Fall back to scoring every column's content
        let mut scored: Vec<(usize, f64)> = names
            .iter()
            .enumerate()
            .filter_map(|(i, name)| {
                let score = text_score(table, i, name);
                (score > MIN_TEXT_SCORE).then_some((i, score))
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        candidates = scored
            .into_iter()
            .take(MAX_MERGED_TEXT_COLUMNS)
            .map(|(i, _)| i)
            .collect();
    }

    let primary = candidates
        .iter()
        .copied()
        .find(|&i| STRONG_REVIEW_KEYWORDS.iter().any(|k| names[i].contains(k)))
        .unwrap_or(*candidates.first()?);

    let extra = candidates.into_iter().filter(|&i| i != primary).collect();
    Some((primary, extra))
}

/// Score a column as likely free-text review content: mean length, mean word
/// count, value diversity, and a penalty-free bonus for non-ID-like names.
fn text_score(table: &RawTable, idx: usize, name: &str) -> f64 {
    let values: Vec<&str> = table
        .column_values(idx)
        .filter(|v| !v.trim().is_empty())
        .collect();
    if values.is_empty() {
        return 0.0;
    }

    let n = values.len() as f64;
    let avg_len = values.iter().map(|v| v.chars().count()).sum::<usize>() as f64 / n;
    let avg_words =
        values.iter().map(|v| v.split_whitespace().count()).sum::<usize>() as f64 / n;
    let unique = values
        .iter()
        .collect::<std::collections::HashSet<_>>()
        .len() as f64;
    let unique_ratio = unique / table.rows.len().max(1) as f64;

    let mut score = 0.0;
    if avg_len > 20.0 {
        score += avg_len / 10.0;
    }
    if avg_words > 3.0 {
        score += avg_words * 2.0;
    }
    if unique_ratio > 0.5 {
        score += unique_ratio * 100.0;
    }
    if !ID_LIKE_KEYWORDS.iter().any(|k| name.contains(k)) {
        score += 50.0;
    }
    score
}

/// Phase 1: exact/near name match. Phase 2: scan column values for known
/// provenance labels. `None` means "classify from the file name instead".
fn detect_source_column(table: &RawTable, names: &[String], review: usize) -> Option<usize> {
    for (i, name) in names.iter().enumerate() {
        if SOURCE_EXCLUDED_KEYWORDS.iter().any(|k| name.contains(k)) && name != "source" {
            continue;
        }
        if name == "source" || name == "nguồn" {
            return Some(i);
        }
        if (name == "shop_type" || name == "store_type") && column_has_source_values(table, i) {
            return Some(i);
        }
    }

    // Value scan over the remaining columns
    for (i, name) in names.iter().enumerate() {
        if i == review {
            continue;
        }
        if VALUE_SCAN_EXCLUDED_KEYWORDS.iter().any(|k| name.contains(k)) {
            continue;
        }
        if column_has_source_values(table, i) {
            return Some(i);
        }
    }

    None
}

fn column_has_source_values(table: &RawTable, idx: usize) -> bool {
    table
        .column_values(idx)
        .take(20)
        .any(|v| SOURCE_VALUE_VOCAB.contains(&v.trim().to_uppercase().as_str()))
}

fn find_aux(names: &[String], keywords: &[&str], claimed: &mut Vec<usize>) -> Option<usize> {
    let idx = names.iter().enumerate().find_map(|(i, name)| {
        (!claimed.contains(&i) && keywords.iter().any(|k| name.contains(k))).then_some(i)
    })?;
    claimed.push(idx);
    Some(idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            name: "t".into(),
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_detect_by_keyword() {
        let t = table(
            &["ID", "Review", "Source"],
            &[&["1", "Cà phê ngon", "MY_SHOP"], &["2", "Chậm", "MY_SHOP"]],
        );
        let map = detect_columns("a.csv", &t).unwrap();
        assert_eq!(map.review, 1);
        assert_eq!(map.source, Some(2));
    }

    #[test]
    fn test_detect_vietnamese_headers() {
        let t = table(
            &["Đánh giá khách hàng", "Nguồn"],
            &[&["Phục vụ rất nhanh", "CỦA MÌNH"]],
        );
        let map = detect_columns("a.csv", &t).unwrap();
        assert_eq!(map.review, 0);
        assert_eq!(map.source, Some(1));
    }

    #[test]
    fn test_fallback_to_longest_text_column() {
        let t = table(
            &["code", "val"],
            &[
                &["A1", "The espresso was rich and perfectly balanced today"],
                &["A2", "Staff were friendly but the queue moved very slowly"],
                &["A3", "Lovely terrace seating with a view over the street"],
            ],
        );
        let map = detect_columns("a.csv", &t).unwrap();
        assert_eq!(map.review, 1);
        assert!(map.source.is_none());
    }

    #[test]
    fn test_no_review_column_is_error() {
        let t = table(&["id", "qty"], &[&["1", "2"], &["2", "3"]]);
        let err = detect_columns("bad.csv", &t).unwrap_err();
        assert!(matches!(err, PipelineError::ColumnNotFound { .. }));
    }

    #[test]
    fn test_link_source_not_mistaken_for_source() {
        let t = table(
            &["review", "link source"],
            &[&["good", "http://a"], &["bad", "http://b"]],
        );
        let map = detect_columns("a.csv", &t).unwrap();
        assert_eq!(map.source, None);
    }

    #[test]
    fn test_source_found_by_value_scan() {
        let t = table(
            &["review", "shop"],
            &[&["ngon", "MY_SHOP"], &["dở", "COMPETITOR"]],
        );
        let map = detect_columns("a.csv", &t).unwrap();
        assert_eq!(map.source, Some(1));
    }

    #[test]
    fn test_aux_columns() {
        let t = table(
            &["review", "source", "price", "rating", "menu item", "date", "customer"],
            &[&["ok", "MY_SHOP", "45000", "4", "latte", "2024-01-01", "An"]],
        );
        let map = detect_columns("a.csv", &t).unwrap();
        assert_eq!(map.price, Some(2));
        assert_eq!(map.rating, Some(3));
        assert_eq!(map.menu, Some(4));
        assert_eq!(map.date, Some(5));
        assert_eq!(map.user, Some(6));
    }
}
