//! Prompt construction for the SWOT analysis call.
//!
//! Reviews are serialized one per line in a compact pipe-delimited form to
//! keep token usage down, followed by the exact JSON schema the model must
//! return.

use crate::classify::Source;
use crate::normalize::Review;
use std::fmt::Write;

/// What the model is asked to analyze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// One document from mixed OWN + COMPETITOR reviews; the model applies
    /// the provenance × sentiment quadrant rules itself.
    Combined,
    /// Full SWOT of the business from OWN reviews only.
    Own,
    /// Full SWOT of a competitor from COMPETITOR reviews only.
    Competitor,
}

const ROLE: &str = "You are a data analyst and F&B business strategist with 20 years of \
experience. You read raw customer reviews, infer sentiment, cluster them by topic, and \
build a SWOT model.";

const OUTPUT_SCHEMA: &str = r#"{
  "SWOT_Analysis": {
    "Strengths": [
      {"topic": "short topic name", "description": "detailed insight grounded in the data", "impact": "High/Medium/Low"}
    ],
    "Weaknesses": [
      {"topic": "short topic name", "description": "detailed description of the problem", "root_cause": "likely root cause", "impact": "High/Medium/Low"}
    ],
    "Opportunities": [
      {"topic": "short topic name", "description": "market opportunity or competitor gap", "action_idea": "short action suggestion"}
    ],
    "Threats": [
      {"topic": "short topic name", "description": "risk coming from competitors", "risk_level": "High/Medium/Low"}
    ]
  },
  "Executive_Summary": "A short paragraph of roughly 50 words summarizing the overall situation."
}"#;

/// Build the full prompt for one batch of reviews.
pub fn build_prompt(reviews: &[Review], mode: AnalysisMode) -> String {
    let mut p = String::with_capacity(reviews.len() * 80 + 2048);

    p.push_str("# ROLE\n");
    p.push_str(ROLE);
    p.push_str("\n\n# TASK\n");
    match mode {
        AnalysisMode::Combined => {
            p.push_str(
                "Each review is tagged with its provenance. Determine the sentiment of each \
review yourself, cluster reviews sharing the same aspect and sentiment, and map the \
clusters into quadrants using these rules:\n\
- MY_SHOP + positive -> Strengths\n\
- MY_SHOP + negative -> Weaknesses\n\
- COMPETITOR + negative -> Opportunities\n\
- COMPETITOR + positive -> Threats\n",
            );
        }
        AnalysisMode::Own => {
            p.push_str(
                "All reviews below are about the business itself (MY_SHOP). Produce a full, \
independent SWOT breakdown of the business based solely on these reviews.\n",
            );
        }
        AnalysisMode::Competitor => {
            p.push_str(
                "All reviews below are about competitors (COMPETITOR). Produce a full, \
independent SWOT breakdown of the competitive landscape based solely on these reviews.\n",
            );
        }
    }
    p.push_str(
        "Use every available field: if prices are present analyze pricing, if ratings are \
present correlate them with the text, if menu items are present analyze per product. \
Prefer recurring issues over one-off remarks.\n",
    );

    write_stats(&mut p, reviews);
    write_reviews(&mut p, reviews);

    p.push_str("\n# OUTPUT FORMAT\nReturn a single JSON object with exactly this structure:\n\n");
    p.push_str(OUTPUT_SCHEMA);
    p.push_str(
        "\n\nIMPORTANT: Return ONLY valid JSON. No markdown fences, no commentary, no text \
before or after the object.",
    );

    p
}

fn write_stats(p: &mut String, reviews: &[Review]) {
    let own = reviews.iter().filter(|r| r.source == Source::Own).count();
    let competitor = reviews.len() - own;

    p.push_str("\n# QUICK STATS\n");
    let _ = writeln!(p, "- Total reviews: {}", reviews.len());
    let _ = writeln!(p, "- MY_SHOP: {} reviews", own);
    let _ = writeln!(p, "- COMPETITOR: {} reviews", competitor);

    let mut extras = Vec::new();
    if reviews.iter().any(|r| r.price.is_some()) {
        extras.push("price");
    }
    if reviews.iter().any(|r| r.rating.is_some()) {
        extras.push("rating");
    }
    if reviews.iter().any(|r| r.menu_item.is_some()) {
        extras.push("menu item");
    }
    if !extras.is_empty() {
        let _ = writeln!(p, "- Extra fields present: {}", extras.join(", "));
    }
}

fn write_reviews(p: &mut String, reviews: &[Review]) {
    p.push_str("\n# REVIEWS (format: SOURCE|CONTENT|PRICE|RATING|MENU|DATE)\n\n");
    for r in reviews {
        let opt_num = |v: Option<f64>| v.map(|n| n.to_string()).unwrap_or_default();
        fn opt_str(v: &Option<String>) -> &str {
            v.as_deref().unwrap_or("")
        }
        let _ = writeln!(
            p,
            "{}|{}|{}|{}|{}|{}",
            r.source.as_label(),
            r.text.replace(['\n', '\r'], " "),
            opt_num(r.price),
            opt_num(r.rating),
            opt_str(&r.menu_item),
            opt_str(&r.date),
        );
    }
}
