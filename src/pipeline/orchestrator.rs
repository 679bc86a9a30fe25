//! Per-record annotation: normalize, extract, validate, simplify, grade, persist.
//!
//! Records are processed strictly in input order, one at a time. Collaborator failures
//! (errors, contract violations, timeouts) degrade a single record to its fallback and
//! never abort the batch; only a sink write failure does.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::collaborators::{TermExtractor, TextSimplifier};
use crate::config::Config;
use crate::error::{AnnotatorError, Result};
use crate::pipeline::difficulty::aggregate_difficulty;
use crate::pipeline::normalize::format_latex_math;
use crate::pipeline::validator::validate_terms;
use crate::schemas::{AnnotationRecord, Difficulty, QuestionRecord, TermMapping};
use crate::store::AnnotationSink;

const DEFAULT_CALL_TIMEOUT_MS: u64 = 120_000;

#[derive(Debug, Clone, Copy)]
pub struct AnnotatorOptions {
    pub extract_timeout: Duration,
    pub simplify_timeout: Duration,
}

impl Default for AnnotatorOptions {
    fn default() -> Self {
        Self {
            extract_timeout: Duration::from_millis(DEFAULT_CALL_TIMEOUT_MS),
            simplify_timeout: Duration::from_millis(DEFAULT_CALL_TIMEOUT_MS),
        }
    }
}

impl AnnotatorOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            extract_timeout: Duration::from_millis(config.extraction.timeout_ms),
            simplify_timeout: Duration::from_millis(config.simplification.timeout_ms),
        }
    }
}

/// How a single record made it through the pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordOutcome {
    /// Extraction failed; terms were treated as empty
    pub extraction_failed: bool,
    /// Simplification failed; the raw passage was used
    pub simplification_failed: bool,
    pub candidates: usize,
    pub validated: usize,
}

/// Counters for one batch run
#[derive(Debug, Default, Clone, Serialize)]
pub struct AnnotationStats {
    pub total: usize,
    pub persisted: usize,
    pub extraction_failures: usize,
    pub simplification_failures: usize,
    pub terms_proposed: usize,
    pub terms_rejected: usize,
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
    pub cancelled: bool,
}

impl AnnotationStats {
    fn record(&mut self, outcome: &RecordOutcome, difficulty: Difficulty) {
        self.persisted += 1;
        self.extraction_failures += outcome.extraction_failed as usize;
        self.simplification_failures += outcome.simplification_failed as usize;
        self.terms_proposed += outcome.candidates;
        self.terms_rejected += outcome.candidates - outcome.validated;
        match difficulty {
            Difficulty::Easy => self.easy += 1,
            Difficulty::Medium => self.medium += 1,
            Difficulty::Hard => self.hard += 1,
        }
    }
}

/// Sequences the collaborators over a batch of question records
pub struct Annotator {
    extractor: Arc<dyn TermExtractor>,
    simplifier: Arc<dyn TextSimplifier>,
    options: AnnotatorOptions,
}

impl Annotator {
    pub fn new(extractor: Arc<dyn TermExtractor>, simplifier: Arc<dyn TextSimplifier>) -> Self {
        Self {
            extractor,
            simplifier,
            options: AnnotatorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: AnnotatorOptions) -> Self {
        self.options = options;
        self
    }

    /// Annotate every record in order, appending each result to `sink` as soon as it is
    /// ready. Stops before the next record once `cancel` fires, leaving the sink holding a
    /// prefix of the input. A sink failure aborts with `SinkWrite`.
    pub async fn annotate<S>(
        &self,
        records: &[QuestionRecord],
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<AnnotationStats>
    where
        S: AnnotationSink + ?Sized,
    {
        let total = records.len();
        let mut stats = AnnotationStats {
            total,
            ..Default::default()
        };

        for (index, record) in records.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(
                    "Cancelled before record {}/{}; {} record(s) persisted",
                    index + 1,
                    total,
                    stats.persisted
                );
                stats.cancelled = true;
                break;
            }

            info!(
                index = index + 1,
                total,
                post_id = record.post_id,
                "Processing record"
            );

            let (annotation, outcome) = self.annotate_record(record).await;

            if let Err(e) = sink.append(&annotation) {
                let _ = sink.flush();
                return Err(AnnotatorError::SinkWrite {
                    index,
                    post_id: record.post_id,
                    persisted: stats.persisted,
                    message: e.to_string(),
                });
            }
            stats.record(&outcome, annotation.difficulty);
        }

        sink.flush().map_err(|e| AnnotatorError::SinkWrite {
            index: stats.persisted,
            post_id: records
                .get(stats.persisted.saturating_sub(1))
                .map(|r| r.post_id)
                .unwrap_or(crate::schemas::MISSING_POST_ID),
            persisted: stats.persisted,
            message: e.to_string(),
        })?;

        Ok(stats)
    }

    /// Run one record through the pipeline. Infallible: collaborator failures fall back
    /// to empty terms and to the raw passage respectively.
    pub async fn annotate_record(&self, record: &QuestionRecord) -> (AnnotationRecord, RecordOutcome) {
        let mut outcome = RecordOutcome::default();
        let raw_passage = format_latex_math(&record.body);

        let candidates = match self.extract(&raw_passage).await {
            Ok(terms) => terms,
            Err(e) => {
                warn!("Error getting terms for post_id {}: {}", record.post_id, e);
                outcome.extraction_failed = true;
                TermMapping::new()
            }
        };
        outcome.candidates = candidates.len();

        let terms = validate_terms(candidates, &raw_passage);
        outcome.validated = terms.len();
        if outcome.validated < outcome.candidates {
            debug!(
                "post_id {}: dropped {} term(s) not found in passage",
                record.post_id,
                outcome.candidates - outcome.validated
            );
        }

        let simplified_passage = match self.simplify(&raw_passage, &terms).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Error simplifying post_id {}: {}", record.post_id, e);
                outcome.simplification_failed = true;
                raw_passage.clone()
            }
        };

        let difficulty = aggregate_difficulty(&terms);

        let annotation = AnnotationRecord {
            post_id: record.post_id,
            title: record.title.clone(),
            latex_title: record.latex_title.clone(),
            tags: record.tags.clone(),
            raw_passage,
            terms,
            simplified_passage,
            difficulty,
        };
        (annotation, outcome)
    }

    async fn extract(&self, passage: &str) -> Result<TermMapping> {
        let timeout = self.options.extract_timeout;
        tokio::time::timeout(timeout, self.extractor.extract(passage))
            .await
            .map_err(|_| AnnotatorError::Timeout {
                operation: "term extraction".to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })?
    }

    async fn simplify(&self, passage: &str, terms: &TermMapping) -> Result<String> {
        let timeout = self.options.simplify_timeout;
        tokio::time::timeout(timeout, self.simplifier.simplify(passage, terms))
            .await
            .map_err(|_| AnnotatorError::Timeout {
                operation: "text simplification".to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })?
    }
}
