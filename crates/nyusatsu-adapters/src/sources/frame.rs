//! Stateful frame-portal adapter family.

use async_trait::async_trait;
use nyusatsu_core::{jdate, RawTender};
use nyusatsu_storage::HttpFetcher;
use tracing::{info, warn};

use crate::nav::{
    DetailPage, HttpSessionDriver, NavigationEngine, PortalProfile, ResultRow, RetryPolicy,
    SearchTarget,
};
use crate::{classify, AdapterError, SourceAdapter};

/// One work-category search inside the portal session.
#[derive(Debug, Clone)]
pub struct CategoryTarget {
    pub label: &'static str,
    pub target: SearchTarget,
}

/// Column positions inside the portal's result table.
#[derive(Debug, Clone, Copy)]
pub struct FrameColumns {
    pub date: usize,
    pub contract_no: Option<usize>,
    pub title: usize,
    pub status: Option<usize>,
}

/// Outcome of one session walk, including the resumable category cursor.
#[derive(Debug)]
pub struct FrameScrape {
    pub rows: Vec<RawTender>,
    /// Index of the first category not yet attempted; equals the target
    /// count when the walk finished.
    pub next_cursor: usize,
    pub skipped_targets: usize,
}

/// Adapter for portals that require a stateful frameset session.
///
/// Owns exactly one navigation session per scrape. Category targets fail
/// independently: a frame or form that never resolves skips that category
/// and the session moves on to the next one.
pub struct FramePortalAdapter {
    source_id: &'static str,
    municipality: &'static str,
    profile: PortalProfile,
    targets: Vec<CategoryTarget>,
    columns: FrameColumns,
}

impl FramePortalAdapter {
    pub fn new(
        source_id: &'static str,
        municipality: &'static str,
        profile: PortalProfile,
        targets: Vec<CategoryTarget>,
        columns: FrameColumns,
    ) -> Self {
        Self {
            source_id,
            municipality,
            profile,
            targets,
            columns,
        }
    }

    /// Walk categories starting at `cursor`. The caller threads the returned
    /// cursor into the next invocation to resume a long portal walk instead
    /// of keeping progress in a side file.
    pub async fn scrape_categories(&self, cursor: usize) -> Result<FrameScrape, AdapterError> {
        let driver = HttpSessionDriver::new(self.profile.clone())?;
        let mut engine =
            NavigationEngine::new(driver, self.profile.frame_plan(), RetryPolicy::default());

        // Entry failure is portal-wide, not per-category.
        engine.open().await?;

        let mut rows = Vec::new();
        let mut skipped_targets = 0usize;
        let mut next_cursor = cursor;

        for category in self.targets.iter().skip(cursor) {
            next_cursor += 1;
            match self.walk_category(&mut engine, category).await {
                Ok(mut category_rows) => {
                    info!(
                        source = self.source_id,
                        category = category.label,
                        rows = category_rows.len(),
                        "category walk complete"
                    );
                    rows.append(&mut category_rows);
                }
                Err(err) => {
                    warn!(
                        source = self.source_id,
                        category = category.label,
                        error = %err,
                        "category skipped"
                    );
                    skipped_targets += 1;
                }
            }
            if engine.reset_to_menu().is_err() {
                // Session is wedged; stop here so the cursor stays honest.
                break;
            }
        }

        if let Err(err) = engine.close().await {
            warn!(source = self.source_id, error = %err, "session close failed");
        }

        Ok(FrameScrape {
            rows,
            next_cursor,
            skipped_targets,
        })
    }

    async fn walk_category(
        &self,
        engine: &mut NavigationEngine<HttpSessionDriver>,
        category: &CategoryTarget,
    ) -> Result<Vec<RawTender>, AdapterError> {
        engine.configure_search(&category.target).await?;
        engine.run_search(&category.target).await?;
        let result_rows = engine.collect_rows().await?;

        let mut out = Vec::new();
        for row in result_rows {
            let Some(raw) = self.row_to_raw(&row, category.label) else {
                continue;
            };
            if !classify::accept_parts(&raw.title, raw.category_hint.as_deref(), None) {
                continue;
            }

            // Only rows we keep are worth a detail popup round-trip.
            let detail = match engine.fetch_detail(&row).await {
                Ok(detail) => detail,
                Err(err) => {
                    warn!(source = self.source_id, error = %err, "detail fetch failed");
                    None
                }
            };
            out.push(self.attach_detail(raw, detail));
        }
        Ok(out)
    }

    fn row_to_raw(&self, row: &ResultRow, category_label: &'static str) -> Option<RawTender> {
        let cell = |i: usize| row.cells.get(i).map(String::as_str).unwrap_or("");
        let title = cell(self.columns.title).trim().to_string();
        if title.is_empty() {
            return None;
        }
        Some(RawTender {
            source_id: self.source_id.to_string(),
            municipality: self.municipality.to_string(),
            title,
            contract_no: self
                .columns
                .contract_no
                .and_then(|i| non_empty(cell(i))),
            announcement_date: jdate::parse_date(cell(self.columns.date)),
            bidding_date: None,
            status_text: self.columns.status.and_then(|i| non_empty(cell(i))),
            category_hint: Some(category_label.to_string()),
            description: None,
            link: row
                .detail_ref
                .clone()
                .unwrap_or_else(|| self.profile.entry_url.clone()),
            pdf_url: None,
        })
    }

    fn attach_detail(&self, mut raw: RawTender, detail: Option<DetailPage>) -> RawTender {
        if let Some(detail) = detail {
            raw.pdf_url = detail.download_url;
            if raw.bidding_date.is_none() {
                raw.bidding_date = bidding_date_from_detail(&detail.html);
            }
        }
        raw
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// The detail popup renders labeled rows; the bid-opening date sits next to
/// a 開札 label when present.
fn bidding_date_from_detail(html: &str) -> Option<chrono::NaiveDate> {
    let doc = scraper::Html::parse_document(html);
    let row_sel = scraper::Selector::parse("tr").ok()?;
    let cell_sel = scraper::Selector::parse("th, td").ok()?;
    for tr in doc.select(&row_sel) {
        let cells: Vec<String> = tr
            .select(&cell_sel)
            .map(|c| c.text().collect::<String>())
            .collect();
        let labeled = cells.iter().any(|c| c.contains("開札"));
        if !labeled {
            continue;
        }
        for cell in &cells {
            if let Some(date) = jdate::parse_date(cell) {
                return Some(date);
            }
        }
    }
    None
}

#[async_trait]
impl SourceAdapter for FramePortalAdapter {
    fn source_id(&self) -> &'static str {
        self.source_id
    }

    fn municipality(&self) -> &'static str {
        self.municipality
    }

    fn is_stateful(&self) -> bool {
        true
    }

    async fn scrape(&self, _http: &HttpFetcher) -> Result<Vec<RawTender>, AdapterError> {
        let scrape = self.scrape_categories(0).await?;
        Ok(scrape.rows)
    }
}
