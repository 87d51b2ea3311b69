//! SWOT result types.
//!
//! The wire shape matches the JSON contract given to the LLM:
//! `{"SWOT_Analysis": {"Strengths": [...], ...}, "Executive_Summary": "..."}`.
//! Every quadrant key is always present, even when empty.

use serde::{Deserialize, Serialize};

/// Impact / risk level attached to a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    /// Lenient parse for LLM-produced values ("high", "HIGH", "Med"...).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "low" => Some(Level::Low),
            "medium" | "med" => Some(Level::Medium),
            "high" => Some(Level::High),
            _ => None,
        }
    }
}

/// One finding within a quadrant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwotItem {
    pub topic: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<Level>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_cause: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_idea: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<Level>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_score: Option<f64>,
}

impl SwotItem {
    pub fn new(topic: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            description: description.into(),
            impact: None,
            root_cause: None,
            action_idea: None,
            risk_level: None,
            priority_score: None,
        }
    }

    /// Impact for S/W items, risk level for threats. Whichever is set.
    pub fn effective_level(&self) -> Option<Level> {
        self.impact.or(self.risk_level)
    }
}

/// One of the four SWOT categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    Strengths,
    Weaknesses,
    Opportunities,
    Threats,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::Strengths,
        Quadrant::Weaknesses,
        Quadrant::Opportunities,
        Quadrant::Threats,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Quadrant::Strengths => "Strengths",
            Quadrant::Weaknesses => "Weaknesses",
            Quadrant::Opportunities => "Opportunities",
            Quadrant::Threats => "Threats",
        }
    }
}

/// The four quadrants of a SWOT analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwotAnalysis {
    #[serde(rename = "Strengths", default)]
    pub strengths: Vec<SwotItem>,
    #[serde(rename = "Weaknesses", default)]
    pub weaknesses: Vec<SwotItem>,
    #[serde(rename = "Opportunities", default)]
    pub opportunities: Vec<SwotItem>,
    #[serde(rename = "Threats", default)]
    pub threats: Vec<SwotItem>,
}

impl SwotAnalysis {
    pub fn quadrant(&self, q: Quadrant) -> &Vec<SwotItem> {
        match q {
            Quadrant::Strengths => &self.strengths,
            Quadrant::Weaknesses => &self.weaknesses,
            Quadrant::Opportunities => &self.opportunities,
            Quadrant::Threats => &self.threats,
        }
    }

    pub fn quadrant_mut(&mut self, q: Quadrant) -> &mut Vec<SwotItem> {
        match q {
            Quadrant::Strengths => &mut self.strengths,
            Quadrant::Weaknesses => &mut self.weaknesses,
            Quadrant::Opportunities => &mut self.opportunities,
            Quadrant::Threats => &mut self.threats,
        }
    }
}

/// Result of one analysis pass. Immutable once returned to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwotDocument {
    #[serde(rename = "SWOT_Analysis", default)]
    pub analysis: SwotAnalysis,
    #[serde(rename = "Executive_Summary", default)]
    pub executive_summary: String,
}

impl SwotDocument {
    pub fn item_count(&self) -> usize {
        Quadrant::ALL
            .iter()
            .map(|q| self.analysis.quadrant(*q).len())
            .sum()
    }

    /// Collapse items with the same normalized topic within each quadrant,
    /// keeping the first occurrence but preferring the higher impact/risk
    /// level when duplicates disagree.
    pub fn dedupe_topics(&mut self) {
        for q in Quadrant::ALL {
            let items = std::mem::take(self.analysis.quadrant_mut(q));
            let mut kept: Vec<SwotItem> = Vec::with_capacity(items.len());
            for item in items {
                let topic = item.topic.trim().to_lowercase();
                if topic.is_empty() {
                    kept.push(item);
                    continue;
                }
                match kept
                    .iter_mut()
                    .find(|k| k.topic.trim().to_lowercase() == topic)
                {
                    Some(existing) => {
                        if item.effective_level() > existing.effective_level() {
                            *existing = item;
                        }
                    }
                    None => kept.push(item),
                }
            }
            *self.analysis.quadrant_mut(q) = kept;
        }
    }
}

/// Outcome of one side of a split-mode analysis. A failure on one side
/// never discards the other side's document.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SideResult {
    Ok {
        document: SwotDocument,
        validation: crate::response::ValidationReport,
    },
    Failed {
        error: String,
    },
    /// No reviews existed for this side after normalization.
    Empty,
}

impl SideResult {
    pub fn document(&self) -> Option<&SwotDocument> {
        match self {
            SideResult::Ok { document, .. } => Some(document),
            _ => None,
        }
    }
}

/// Pair of independently produced SWOT documents, one per provenance.
#[derive(Debug, Clone, Serialize)]
pub struct DualSwotResult {
    pub own: SideResult,
    pub competitor: SideResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse() {
        assert_eq!(Level::parse("High"), Some(Level::High));
        assert_eq!(Level::parse(" medium "), Some(Level::Medium));
        assert_eq!(Level::parse("LOW"), Some(Level::Low));
        assert_eq!(Level::parse("severe"), None);
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::High > Level::Medium);
        assert!(Level::Medium > Level::Low);
    }

    #[test]
    fn test_document_serializes_all_quadrants() {
        let doc = SwotDocument::default();
        let json = serde_json::to_value(&doc).unwrap();
        let swot = &json["SWOT_Analysis"];
        for q in Quadrant::ALL {
            assert!(swot[q.as_str()].is_array(), "missing {}", q.as_str());
        }
        assert_eq!(json["Executive_Summary"], "");
    }

    #[test]
    fn test_dedupe_keeps_higher_impact() {
        let mut doc = SwotDocument::default();
        let mut low = SwotItem::new("Service", "slow at peak hours");
        low.impact = Some(Level::Low);
        let mut high = SwotItem::new("service", "understaffed");
        high.impact = Some(Level::High);
        doc.analysis.weaknesses = vec![low, high, SwotItem::new("Price", "expensive")];

        doc.dedupe_topics();

        assert_eq!(doc.analysis.weaknesses.len(), 2);
        assert_eq!(doc.analysis.weaknesses[0].impact, Some(Level::High));
        assert_eq!(doc.analysis.weaknesses[0].description, "understaffed");
    }
}
