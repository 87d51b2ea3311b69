//! Analysis pipeline orchestration.
//!
//! raw tables -> column detection -> source classification -> normalization
//! -> sampling -> prompt -> LLM -> response parsing -> enrichment.
//!
//! Combined mode issues one LLM call over the mixed set. Split mode issues
//! two independent calls (own / competitor) concurrently; a failure on one
//! side still returns the other side's document.

use crate::config::AnalysisConfig;
use crate::error::PipelineError;
use crate::gemini::CompletionBackend;
use crate::normalize::{self, FileIssue, FileStats, ParsedFile, Review, ReviewSet};
use crate::prompt::{self, AnalysisMode};
use crate::response::{self, ValidationReport};
use crate::sampling;
use crate::strategy::{self, RiskAssessment};
use crate::swot::{DualSwotResult, SideResult, SwotDocument};
use crate::table;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Result of a combined-mode run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CombinedAnalysis {
    pub id: String,
    pub document: SwotDocument,
    pub risk_assessment: Vec<RiskAssessment>,
    pub sampled: bool,
    pub validation: ValidationReport,
    pub file_stats: Vec<FileStats>,
}

/// Result of a split-mode run. Sides fail independently.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SplitAnalysis {
    pub id: String,
    pub result: DualSwotResult,
    pub sampled: bool,
    pub file_stats: Vec<FileStats>,
}

/// Pipeline entry point, generic over the LLM backend.
pub struct Analyzer {
    backend: Arc<dyn CompletionBackend>,
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(backend: Arc<dyn CompletionBackend>, config: AnalysisConfig) -> Self {
        Self { backend, config }
    }

    /// Parse and merge uploaded files. Per-file failures are isolated and
    /// reported as issues; they never abort the batch.
    pub fn ingest(&self, files: Vec<(String, Vec<u8>)>) -> (ReviewSet, Vec<FileIssue>) {
        let mut parsed = Vec::new();
        let mut issues = Vec::new();

        for (name, data) in files {
            match table::parse_file(&name, &data) {
                Ok(tables) => parsed.push(ParsedFile { name, tables }),
                Err(e) => {
                    error!("Failed to parse '{}': {:#}", name, e);
                    issues.push(FileIssue {
                        file: name,
                        error: format!("{:#}", e),
                    });
                }
            }
        }

        let (set, mut normalize_issues) = normalize::build_review_set(parsed);
        issues.append(&mut normalize_issues);
        (set, issues)
    }

    /// One document from the mixed review set.
    pub async fn analyze_combined(
        &self,
        set: ReviewSet,
    ) -> Result<CombinedAnalysis, PipelineError> {
        if set.is_empty() {
            return Err(PipelineError::EmptyInput);
        }

        let (set, sampled) = sampling::sample_reviews(set, self.config.sample_threshold);
        info!(
            "Combined analysis over {} reviews (sampled: {})",
            set.len(),
            sampled
        );

        let (document, validation) = self
            .run_analysis(&set.reviews, AnalysisMode::Combined)
            .await?;
        let risk_assessment = strategy::assess_risks(&document.analysis.threats);

        Ok(CombinedAnalysis {
            id: new_id(),
            document,
            risk_assessment,
            sampled,
            validation,
            file_stats: set.file_stats,
        })
    }

    /// Two independent documents, one per provenance.
    pub async fn analyze_split(&self, set: ReviewSet) -> Result<SplitAnalysis, PipelineError> {
        if set.is_empty() {
            return Err(PipelineError::EmptyInput);
        }

        let (set, sampled) = sampling::sample_reviews(set, self.config.sample_threshold);
        let file_stats = set.file_stats.clone();
        let (own, competitor) = set.partition_by_source();
        info!(
            "Split analysis: {} own / {} competitor reviews (sampled: {})",
            own.len(),
            competitor.len(),
            sampled
        );

        let (own_result, competitor_result) = tokio::join!(
            self.run_side(own, AnalysisMode::Own),
            self.run_side(competitor, AnalysisMode::Competitor),
        );

        Ok(SplitAnalysis {
            id: new_id(),
            result: DualSwotResult {
                own: own_result,
                competitor: competitor_result,
            },
            sampled,
            file_stats,
        })
    }

    /// One side of a split run. Errors are folded into the SideResult so the
    /// other side's outcome survives.
    async fn run_side(&self, reviews: Vec<Review>, mode: AnalysisMode) -> SideResult {
        if reviews.is_empty() {
            return SideResult::Empty;
        }
        match self.run_analysis(&reviews, mode).await {
            Ok((document, validation)) => SideResult::Ok {
                document,
                validation,
            },
            Err(e) => {
                error!("Side analysis ({:?}) failed: {}", mode, e);
                SideResult::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Prompt, call, parse, enrich.
    async fn run_analysis(
        &self,
        reviews: &[Review],
        mode: AnalysisMode,
    ) -> Result<(SwotDocument, ValidationReport), PipelineError> {
        let prompt = prompt::build_prompt(reviews, mode);
        let raw = self.backend.complete(&prompt).await?;
        let (mut document, validation) = response::parse_response(&raw)?;

        document.dedupe_topics();
        strategy::attach_priority_scores(&mut document);

        info!(
            "Analysis ({:?}) produced {} items, summary {} chars",
            mode,
            document.item_count(),
            document.executive_summary.len()
        );
        Ok((document, validation))
    }
}

fn new_id() -> String {
    format!("swot_{}", Uuid::new_v4().simple())
}
