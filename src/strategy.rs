//! Post-analysis enrichment: priority scores per finding and a risk
//! assessment matrix for threats.

use crate::swot::{Level, Quadrant, SwotDocument, SwotItem};

/// Weights for the priority formula. Impact dominates.
#[derive(Debug, Clone, Copy)]
pub struct Weights {
    pub impact: f64,
    pub feasibility: f64,
    pub urgency: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            impact: 0.4,
            feasibility: 0.3,
            urgency: 0.3,
        }
    }
}

/// Map a level onto a 0-10 scale; unknown levels count as Medium.
fn level_score(level: Option<Level>) -> f64 {
    match level {
        Some(Level::High) => 9.0,
        Some(Level::Low) => 2.0,
        Some(Level::Medium) | None => 5.0,
    }
}

/// Weighted impact/feasibility/urgency score, clamped to 0-10 with one
/// decimal. Feasibility and urgency are estimated per quadrant: strengths
/// are cheap to leverage, weaknesses are urgent to fix, threats derive
/// urgency from their risk level.
pub fn priority_score(item: &SwotItem, quadrant: Quadrant, weights: &Weights) -> f64 {
    let impact = level_score(item.effective_level());

    let (feasibility, urgency) = match quadrant {
        Quadrant::Strengths => (8.0, 6.0),
        Quadrant::Weaknesses => (5.0, 7.0),
        Quadrant::Opportunities => (5.0, 6.0),
        Quadrant::Threats => (5.0, (5.0 + level_score(item.risk_level)) / 2.0),
    };

    let score =
        impact * weights.impact + feasibility * weights.feasibility + urgency * weights.urgency;
    (score.clamp(0.0, 10.0) * 10.0).round() / 10.0
}

/// Attach a priority score to every item of the document.
pub fn attach_priority_scores(doc: &mut SwotDocument) {
    let weights = Weights::default();
    for q in Quadrant::ALL {
        for item in doc.analysis.quadrant_mut(q).iter_mut() {
            if item.priority_score.is_none() {
                item.priority_score = Some(priority_score(item, q, &weights));
            }
        }
    }
}

/// One assessed threat.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RiskAssessment {
    pub topic: String,
    pub probability_score: f64,
    pub severity_score: f64,
    pub composite_risk_score: f64,
    pub risk_category: &'static str,
}

/// Rank threats by composite risk (probability × severity, scaled to 0-8.1).
/// Probability is unknown from review text alone and assumed Medium;
/// severity comes from the item's risk level.
pub fn assess_risks(threats: &[SwotItem]) -> Vec<RiskAssessment> {
    let mut assessed: Vec<RiskAssessment> = threats
        .iter()
        .map(|t| {
            let probability = level_score(Some(Level::Medium));
            let severity = level_score(t.risk_level);
            let composite = ((probability * severity / 10.0) * 100.0).round() / 100.0;
            RiskAssessment {
                topic: t.topic.clone(),
                probability_score: probability,
                severity_score: severity,
                composite_risk_score: composite,
                risk_category: risk_category(composite),
            }
        })
        .collect();

    assessed.sort_by(|a, b| {
        b.composite_risk_score
            .partial_cmp(&a.composite_risk_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    assessed
}

fn risk_category(score: f64) -> &'static str {
    if score >= 6.0 {
        "Critical"
    } else if score >= 4.0 {
        "High"
    } else if score >= 2.0 {
        "Medium"
    } else {
        "Low"
    }
}
