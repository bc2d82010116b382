//! Aggregation pass orchestration.
//!
//! One pass: resolve enabled sources from the registry, scrape stateful
//! portals sequentially and stateless ones concurrently, normalize the raw
//! rows, and merge the batch into the canonical store. Every target fails
//! alone: a broken portal is a zero-record target and a log line, never an
//! aborted pass.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use nyusatsu_adapters::{adapter_for_source, SourceAdapter};
use nyusatsu_core::{RawTender, Tender};
use nyusatsu_storage::{HttpClientConfig, HttpFetcher, MergeOutcome, TenderStore};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

pub const CRATE_NAME: &str = "nyusatsu-sync";

#[derive(Debug, Clone, Deserialize)]
pub struct SourceRegistry {
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub source_id: String,
    pub display_name: String,
    pub enabled: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub store_path: PathBuf,
    pub sources_path: PathBuf,
    pub user_agent: String,
    pub http_timeout_secs: u64,
}

impl SyncConfig {
    pub fn from_env() -> Self {
        Self {
            store_path: std::env::var("NYUSATSU_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data/tenders.json")),
            sources_path: std::env::var("NYUSATSU_SOURCES_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./sources.yaml")),
            user_agent: std::env::var("NYUSATSU_USER_AGENT")
                .unwrap_or_else(|_| "nyusatsu-bot/0.1".to_string()),
            http_timeout_secs: std::env::var("NYUSATSU_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        }
    }
}

/// Per-target outcome of one pass.
#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    pub source_id: String,
    pub records: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncRunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub enabled_sources: usize,
    pub scraped_rows: usize,
    pub inserted: usize,
    pub merged: usize,
    pub total_records: usize,
    pub targets: Vec<TargetReport>,
    pub municipality_tally: BTreeMap<String, usize>,
}

pub struct SyncPipeline {
    config: SyncConfig,
    store: TenderStore,
    http: Arc<HttpFetcher>,
}

impl SyncPipeline {
    pub fn new(config: SyncConfig) -> Result<Self> {
        let store = TenderStore::new(config.store_path.clone());
        let http = HttpFetcher::new(HttpClientConfig {
            timeout: Duration::from_secs(config.http_timeout_secs),
            user_agent: Some(config.user_agent.clone()),
            ..Default::default()
        })?;
        Ok(Self {
            config,
            store,
            http: Arc::new(http),
        })
    }

    pub async fn run_once(&self) -> Result<SyncRunSummary> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        info!(%run_id, "aggregation pass start");

        let registry = self.load_source_registry().await?;
        let mut adapters = Vec::new();
        for source in registry.sources.iter().filter(|s| s.enabled) {
            match adapter_for_source(&source.source_id) {
                Some(adapter) => adapters.push(adapter),
                None => warn!(source = %source.source_id, "no adapter registered; skipping"),
            }
        }
        let enabled_sources = adapters.len();

        let (raw_rows, targets) = scrape_all(adapters, Arc::clone(&self.http)).await;
        let scraped_rows = raw_rows.len();

        let today = Utc::now().date_naive();
        let batch = normalize_all(&raw_rows, today);

        // A corrupt store is the one condition that aborts the run.
        let outcome: MergeOutcome = self
            .store
            .merge_batch(batch)
            .await
            .context("merging pass output into the canonical store")?;

        let tally = municipality_tally(&self.store.load().await?);
        for (municipality, count) in &tally {
            info!(municipality = %municipality, count, "tally");
        }

        let finished_at = Utc::now();
        Ok(SyncRunSummary {
            run_id,
            started_at,
            finished_at,
            enabled_sources,
            scraped_rows,
            inserted: outcome.inserted,
            merged: outcome.merged,
            total_records: outcome.total,
            targets,
            municipality_tally: tally,
        })
    }

    async fn load_source_registry(&self) -> Result<SourceRegistry> {
        let path = &self.config.sources_path;
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }
}

/// Scrape every target: stateful portals one at a time (their session is the
/// shared state), stateless ones concurrently with an independent result
/// channel per target.
pub async fn scrape_all(
    adapters: Vec<Box<dyn SourceAdapter>>,
    http: Arc<HttpFetcher>,
) -> (Vec<RawTender>, Vec<TargetReport>) {
    let (stateful, stateless): (Vec<_>, Vec<_>) =
        adapters.into_iter().partition(|a| a.is_stateful());

    let mut rows = Vec::new();
    let mut targets = Vec::new();

    let mut handles = Vec::new();
    for adapter in stateless {
        let http = Arc::clone(&http);
        handles.push(tokio::spawn(async move {
            let source_id = adapter.source_id();
            let result = adapter.scrape(&http).await;
            (source_id, result)
        }));
    }

    for adapter in stateful {
        let source_id = adapter.source_id();
        match adapter.scrape(&http).await {
            Ok(mut scraped) => {
                info!(source = source_id, records = scraped.len(), "target scraped");
                targets.push(TargetReport {
                    source_id: source_id.to_string(),
                    records: scraped.len(),
                    error: None,
                });
                rows.append(&mut scraped);
            }
            Err(err) => {
                warn!(source = source_id, error = %err, "target failed; zero records");
                targets.push(TargetReport {
                    source_id: source_id.to_string(),
                    records: 0,
                    error: Some(err.to_string()),
                });
            }
        }
    }

    for handle in handles {
        match handle.await {
            Ok((source_id, Ok(mut scraped))) => {
                info!(source = source_id, records = scraped.len(), "target scraped");
                targets.push(TargetReport {
                    source_id: source_id.to_string(),
                    records: scraped.len(),
                    error: None,
                });
                rows.append(&mut scraped);
            }
            Ok((source_id, Err(err))) => {
                warn!(source = source_id, error = %err, "target failed; zero records");
                targets.push(TargetReport {
                    source_id: source_id.to_string(),
                    records: 0,
                    error: Some(err.to_string()),
                });
            }
            Err(join_err) => {
                warn!(error = %join_err, "scrape task aborted");
                targets.push(TargetReport {
                    source_id: "<aborted>".to_string(),
                    records: 0,
                    error: Some(join_err.to_string()),
                });
            }
        }
    }

    (rows, targets)
}

pub fn normalize_all(raw_rows: &[RawTender], today: NaiveDate) -> Vec<Tender> {
    raw_rows
        .iter()
        .filter_map(|raw| nyusatsu_adapters::normalize::normalize(raw, today))
        .collect()
}

pub fn municipality_tally(records: &[Tender]) -> BTreeMap<String, usize> {
    let mut tally = BTreeMap::new();
    for record in records {
        *tally.entry(record.municipality.clone()).or_default() += 1;
    }
    tally
}

pub async fn run_sync_once_from_env() -> Result<SyncRunSummary> {
    let pipeline = SyncPipeline::new(SyncConfig::from_env())?;
    pipeline.run_once().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nyusatsu_adapters::AdapterError;

    struct StubAdapter {
        source_id: &'static str,
        municipality: &'static str,
        stateful: bool,
        rows: usize,
        fail: bool,
    }

    #[async_trait]
    impl SourceAdapter for StubAdapter {
        fn source_id(&self) -> &'static str {
            self.source_id
        }

        fn municipality(&self) -> &'static str {
            self.municipality
        }

        fn is_stateful(&self) -> bool {
            self.stateful
        }

        async fn scrape(&self, _http: &HttpFetcher) -> Result<Vec<RawTender>, AdapterError> {
            if self.fail {
                return Err(AdapterError::Parse("result table missing".to_string()));
            }
            Ok((0..self.rows)
                .map(|i| RawTender {
                    source_id: self.source_id.to_string(),
                    municipality: self.municipality.to_string(),
                    title: format!("庁舎改修工事 その{i}"),
                    contract_no: Some(format!("{}-{i}", self.source_id)),
                    announcement_date: NaiveDate::from_ymd_opt(2025, 3, 10),
                    bidding_date: None,
                    status_text: Some("公告中".into()),
                    category_hint: None,
                    description: None,
                    link: "https://example.jp/".into(),
                    pdf_url: None,
                })
                .collect())
        }
    }

    fn http() -> Arc<HttpFetcher> {
        Arc::new(HttpFetcher::new(HttpClientConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn one_broken_target_does_not_abort_the_others() {
        let adapters: Vec<Box<dyn SourceAdapter>> = vec![
            Box::new(StubAdapter {
                source_id: "works",
                municipality: "青森県",
                stateful: false,
                rows: 2,
                fail: false,
            }),
            Box::new(StubAdapter {
                source_id: "broken",
                municipality: "八戸市",
                stateful: false,
                rows: 0,
                fail: true,
            }),
            Box::new(StubAdapter {
                source_id: "slow-portal",
                municipality: "弘前市",
                stateful: true,
                rows: 1,
                fail: false,
            }),
        ];

        let (rows, targets) = scrape_all(adapters, http()).await;
        assert_eq!(rows.len(), 3);
        assert_eq!(targets.len(), 3);

        let broken = targets.iter().find(|t| t.source_id == "broken").unwrap();
        assert_eq!(broken.records, 0);
        assert!(broken.error.as_deref().unwrap().contains("result table"));

        let works = targets.iter().find(|t| t.source_id == "works").unwrap();
        assert_eq!(works.records, 2);
        assert!(works.error.is_none());
    }

    #[tokio::test]
    async fn normalized_batch_merges_and_tallies() {
        let dir = tempfile::tempdir().unwrap();
        let store = TenderStore::new(dir.path().join("tenders.json"));

        let adapters: Vec<Box<dyn SourceAdapter>> = vec![Box::new(StubAdapter {
            source_id: "works",
            municipality: "青森県",
            stateful: false,
            rows: 2,
            fail: false,
        })];
        let (rows, _) = scrape_all(adapters, http()).await;
        let batch = normalize_all(&rows, NaiveDate::from_ymd_opt(2025, 3, 12).unwrap());
        assert_eq!(batch.len(), 2);

        let outcome = store.merge_batch(batch).await.unwrap();
        assert_eq!(outcome.inserted, 2);

        let tally = municipality_tally(&store.load().await.unwrap());
        assert_eq!(tally.get("青森県"), Some(&2));
    }

    #[test]
    fn registry_yaml_parses() {
        let yaml = r#"
sources:
  - source_id: aomori-pref
    display_name: 青森県 入札情報サービス
    enabled: true
  - source_id: morioka-city
    display_name: 盛岡市 RSS
    enabled: false
    notes: feed intermittently 404s
"#;
        let registry: SourceRegistry = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(registry.sources.len(), 2);
        assert!(registry.sources[0].enabled);
        assert_eq!(
            registry.sources[1].notes.as_deref(),
            Some("feed intermittently 404s")
        );
    }
}
