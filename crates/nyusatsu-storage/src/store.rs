//! Reconciliation store: one JSON-array file of canonical tenders.
//!
//! The store is the single writer of the canonical dataset. Each aggregation
//! pass hands its normalized output to `merge_batch`, which applies the
//! backfill-only / status-monotonic merge rules and rewrites the file in one
//! atomic step. Enrichment results go through the same read-modify-write
//! path so a concurrently-discovered field is never clobbered.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use nyusatsu_core::Tender;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("reading store file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("store file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("writing store file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("serializing store: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Counts reported by one merge pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub inserted: usize,
    pub merged: usize,
    pub total: usize,
}

/// Structured fields produced by the enrichment stage for one record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentUpdate {
    pub winning_contractor: Option<String>,
    pub design_firm: Option<String>,
    pub estimated_price: Option<String>,
    pub construction_period: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TenderStore {
    path: PathBuf,
}

impl TenderStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the full dataset. A missing file is an empty dataset (first
    /// run); an unparseable file aborts the run.
    pub async fn load(&self) -> Result<Vec<Tender>, StoreError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source: err,
                })
            }
        };
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Merge one pass's normalized output into the persisted dataset.
    pub async fn merge_batch(&self, incoming: Vec<Tender>) -> Result<MergeOutcome, StoreError> {
        let mut records = self.load().await?;
        let mut index: HashMap<String, usize> = records
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();

        let mut outcome = MergeOutcome::default();
        for tender in incoming {
            match index.get(&tender.id) {
                Some(&i) => {
                    merge_into(&mut records[i], tender);
                    outcome.merged += 1;
                }
                None => {
                    index.insert(tender.id.clone(), records.len());
                    records.push(tender);
                    outcome.inserted += 1;
                }
            }
        }

        outcome.total = records.len();
        self.persist(&mut records).await?;
        info!(
            inserted = outcome.inserted,
            merged = outcome.merged,
            total = outcome.total,
            "merge pass persisted"
        );
        Ok(outcome)
    }

    /// Backfill enrichment fields on one record and mark it terminal.
    ///
    /// Goes through the current persisted state rather than a caller-held
    /// copy; returns `false` when the id is no longer present.
    pub async fn apply_enrichment(
        &self,
        id: &str,
        update: EnrichmentUpdate,
    ) -> Result<bool, StoreError> {
        let mut records = self.load().await?;
        let Some(record) = records.iter_mut().find(|t| t.id == id) else {
            return Ok(false);
        };

        backfill(&mut record.winning_contractor, update.winning_contractor);
        backfill(&mut record.design_firm, update.design_firm);
        backfill(&mut record.estimated_price, update.estimated_price);
        backfill(&mut record.construction_period, update.construction_period);
        backfill(&mut record.description, update.description);
        record.is_enriched = true;

        self.persist(&mut records).await?;
        Ok(true)
    }

    /// Records still awaiting enrichment: a result document is referenced
    /// and no terminal enrichment outcome has been recorded yet.
    pub async fn unenriched_backlog(&self, limit: usize) -> Result<Vec<Tender>, StoreError> {
        let records = self.load().await?;
        Ok(records
            .into_iter()
            .filter(|t| !t.is_enriched && t.pdf_url.is_some())
            .take(limit)
            .collect())
    }

    /// Sort newest-first and rewrite the file through a temp-file rename so
    /// readers never observe a partial write.
    async fn persist(&self, records: &mut [Tender]) -> Result<(), StoreError> {
        records.sort_by(|a, b| {
            b.announcement_date
                .cmp(&a.announcement_date)
                .then_with(|| a.id.cmp(&b.id))
        });

        let bytes = serde_json::to_vec_pretty(&*records)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|source| StoreError::Write {
                    path: self.path.clone(),
                    source,
                })?;
            }
        }

        let temp_name = format!(".{}.tmp", Uuid::new_v4());
        let temp_path = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.join(temp_name),
            _ => PathBuf::from(temp_name),
        };

        let write = async {
            let mut file = fs::OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&temp_path)
                .await?;
            file.write_all(&bytes).await?;
            file.flush().await?;
            drop(file);
            fs::rename(&temp_path, &self.path).await
        };

        if let Err(source) = write.await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StoreError::Write {
                path: self.path.clone(),
                source,
            });
        }
        Ok(())
    }
}

/// Merge an incoming observation of a known record into the persisted one.
fn merge_into(existing: &mut Tender, incoming: Tender) {
    if existing.title != incoming.title {
        // Distinct titles under one id is the documented collision risk;
        // keep the existing title and make the event observable.
        debug!(id = %existing.id, existing = %existing.title, incoming = %incoming.title,
            "merge saw differing titles for one id");
    }

    if incoming.status.is_more_final_than(existing.status) {
        existing.status = incoming.status;
    }

    if existing.bidding_date.is_none() {
        existing.bidding_date = incoming.bidding_date;
    }
    if existing.pdf_url.is_none() {
        existing.pdf_url = incoming.pdf_url;
    }

    backfill(&mut existing.winning_contractor, incoming.winning_contractor);
    backfill(&mut existing.design_firm, incoming.design_firm);
    backfill(&mut existing.estimated_price, incoming.estimated_price);
    backfill(&mut existing.construction_period, incoming.construction_period);
    backfill(&mut existing.description, incoming.description);

    existing.is_enriched = existing.is_enriched || incoming.is_enriched;
}

fn backfill(slot: &mut Option<String>, incoming: Option<String>) {
    if slot.is_none() {
        if let Some(value) = incoming {
            *slot = Some(value);
        }
    }
}
