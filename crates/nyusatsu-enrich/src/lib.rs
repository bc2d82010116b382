//! Enrichment pipeline: backfill award facts from result documents.
//!
//! Operates on persisted tenders that reference a result document and have
//! no terminal enrichment outcome yet. Batches are bounded and strictly
//! sequential with a fixed delay between LLM calls; that is external-quota
//! discipline, not a performance knob. Re-running is always safe: the
//! backlog shrinks as records reach a terminal state.

pub mod extract;
pub mod llm;

use std::time::Duration;

use nyusatsu_core::Tender;
use nyusatsu_storage::{
    EnrichmentUpdate, FetchError, HttpFetcher, StoreError, TenderStore,
};
use thiserror::Error;
use tracing::{info, warn};

pub use llm::{
    ExtractedFields, ExtractionClient, FieldExtractor, LlmConfig, LlmError,
};

pub const CRATE_NAME: &str = "nyusatsu-enrich";

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Llm(#[from] LlmError),
}

#[derive(Debug, Clone)]
pub struct EnrichConfig {
    pub batch_size: usize,
    pub inter_record_delay: Duration,
    /// Below this many extracted characters a document is treated as
    /// carrying no extractable facts, terminally.
    pub min_text_chars: usize,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            batch_size: 20,
            inter_record_delay: Duration::from_secs(4),
            min_text_chars: 50,
        }
    }
}

impl EnrichConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            batch_size: std::env::var("NYUSATSU_ENRICH_BATCH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.batch_size),
            inter_record_delay: std::env::var("NYUSATSU_ENRICH_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.inter_record_delay),
            min_text_chars: defaults.min_text_chars,
        }
    }
}

/// Terminal-or-not result for one record this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Fields extracted and backfilled; record is terminal.
    Populated,
    /// Document carried no usable text; record is terminal with no fields.
    ConfirmedEmpty,
    /// LLM trouble this pass; record stays in the backlog.
    Deferred,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichRunSummary {
    pub attempted: usize,
    pub populated: usize,
    pub confirmed_empty: usize,
    pub deferred: usize,
}

pub struct EnrichmentPipeline {
    store: TenderStore,
    http: HttpFetcher,
    extractor: Box<dyn FieldExtractor>,
    config: EnrichConfig,
}

impl EnrichmentPipeline {
    pub fn new(
        store: TenderStore,
        http: HttpFetcher,
        extractor: Box<dyn FieldExtractor>,
        config: EnrichConfig,
    ) -> Self {
        Self {
            store,
            http,
            extractor,
            config,
        }
    }

    /// Process one bounded batch of the unenriched backlog.
    pub async fn run_batch(&self) -> Result<EnrichRunSummary, StoreError> {
        let backlog = self.store.unenriched_backlog(self.config.batch_size).await?;
        info!(backlog = backlog.len(), "enrichment batch start");

        let mut summary = EnrichRunSummary::default();
        for (index, tender) in backlog.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.inter_record_delay).await;
            }
            summary.attempted += 1;
            match self.enrich_one(tender).await {
                Ok(Outcome::Populated) => summary.populated += 1,
                Ok(Outcome::ConfirmedEmpty) => summary.confirmed_empty += 1,
                Ok(Outcome::Deferred) => summary.deferred += 1,
                Err(EnrichError::Store(err)) => return Err(err),
                Err(err) => {
                    warn!(id = %tender.id, error = %err, "record left for a future pass");
                    summary.deferred += 1;
                }
            }
        }

        info!(
            attempted = summary.attempted,
            populated = summary.populated,
            confirmed_empty = summary.confirmed_empty,
            deferred = summary.deferred,
            "enrichment batch complete"
        );
        Ok(summary)
    }

    async fn enrich_one(&self, tender: &Tender) -> Result<Outcome, EnrichError> {
        let Some(url) = tender.pdf_url.as_deref() else {
            return Ok(Outcome::Deferred);
        };
        let doc = self.http.fetch_bytes(&tender.municipality, url).await?;
        self.process_document(tender, &doc.body, url).await
    }

    /// Everything after the download; separated so document handling is
    /// testable without a live portal.
    pub async fn process_document(
        &self,
        tender: &Tender,
        bytes: &[u8],
        name_hint: &str,
    ) -> Result<Outcome, EnrichError> {
        let text = extract::document_text(bytes, name_hint);

        if text.chars().count() < self.config.min_text_chars {
            self.store
                .apply_enrichment(&tender.id, EnrichmentUpdate::default())
                .await?;
            info!(id = %tender.id, chars = text.chars().count(), "confirmed empty");
            return Ok(Outcome::ConfirmedEmpty);
        }

        let fields = match self.extractor.extract(&tender.title, &text).await {
            Ok(fields) => fields,
            Err(err) => {
                warn!(id = %tender.id, error = %err, "no enrichment this pass");
                return Ok(Outcome::Deferred);
            }
        };

        self.store
            .apply_enrichment(&tender.id, fields.into_update())
            .await?;
        Ok(Outcome::Populated)
    }
}
