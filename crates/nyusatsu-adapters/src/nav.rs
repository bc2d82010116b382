//! Navigation engine for stateful legacy frame portals.
//!
//! The oldest procurement portals expose no direct URLs: a session walks
//! load → menu → search → paginate → detail through a frameset, and every
//! step depends on server-side session state. The engine models that walk as
//! an explicit state machine over a [`SessionDriver`], so each transition's
//! precondition and retry policy is testable with a scripted fake driver.
//!
//! Transitions retry a fixed number of times with a fixed settle delay;
//! these UIs give no reliable load-completion signal, so the delay stands in
//! for one. A frame or search form that never appears fails only the current
//! target; callers skip it and move on.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{absolutize, decode_body, element_text};

/// Upper bound on result pages walked for a single search target.
const MAX_PAGES: usize = 50;

#[derive(Debug, Error)]
pub enum NavError {
    #[error("frame {frame:?} not found after {attempts} attempts")]
    FrameNotFound { frame: String, attempts: usize },
    #[error("search form not found for screen {screen:?}")]
    SearchFormNotFound { screen: String },
    #[error("navigation step out of order: expected {expected}, session is {actual:?}")]
    OutOfOrder {
        expected: &'static str,
        actual: NavState,
    },
    #[error("session driver error: {0}")]
    Driver(#[source] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Entry,
    MenuResolved,
    SearchConfigured,
    ResultsLoaded,
    Paginating,
    DetailOpen,
    Closed,
}

/// One search to run inside the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTarget {
    /// Portal screen identifier reached from the menu frame.
    pub screen_id: String,
    /// Work-category code submitted with the search form.
    pub category_code: String,
    /// Additional form fields (fiscal year, period, …).
    pub filters: Vec<(String, String)>,
}

/// One row scraped from the result frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub cells: Vec<String>,
    pub detail_ref: Option<String>,
}

/// A detail popup opened for one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailPage {
    pub html: String,
    pub download_url: Option<String>,
}

/// Driver for one live portal session. The engine owns the sequencing;
/// the driver owns the transport.
#[async_trait]
pub trait SessionDriver: Send {
    async fn load_entry(&mut self) -> anyhow::Result<()>;
    async fn frame_exists(&mut self, name: &str) -> anyhow::Result<bool>;
    /// Follow the menu link for `screen_id`; `false` when no such link.
    async fn open_menu(&mut self, screen_id: &str) -> anyhow::Result<bool>;
    /// Fill and submit the search form; `false` when no form is present.
    async fn submit_search(&mut self, target: &SearchTarget) -> anyhow::Result<bool>;
    async fn result_rows(&mut self) -> anyhow::Result<Vec<ResultRow>>;
    /// In-session page jump; `false` when the page does not exist.
    async fn jump_to_page(&mut self, page: usize) -> anyhow::Result<bool>;
    async fn open_detail(&mut self, detail_ref: &str) -> anyhow::Result<Option<DetailPage>>;
    async fn close_detail(&mut self) -> anyhow::Result<()>;
    async fn close(&mut self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub settle_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            settle_delay: Duration::from_millis(700),
        }
    }
}

/// Frame names the engine checks as transition preconditions.
#[derive(Debug, Clone)]
pub struct FramePlan {
    pub menu_frame: String,
    pub result_frame: String,
}

pub struct NavigationEngine<D: SessionDriver> {
    driver: D,
    retry: RetryPolicy,
    frames: FramePlan,
    state: NavState,
}

impl<D: SessionDriver> NavigationEngine<D> {
    pub fn new(driver: D, frames: FramePlan, retry: RetryPolicy) -> Self {
        Self {
            driver,
            retry,
            frames,
            state: NavState::Entry,
        }
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    /// Entry → MenuResolved. Precondition for everything else: the portal's
    /// menu frame must materialize.
    pub async fn open(&mut self) -> Result<(), NavError> {
        self.expect(NavState::Entry, "open from Entry")?;
        self.driver.load_entry().await.map_err(NavError::Driver)?;
        let menu_frame = self.frames.menu_frame.clone();
        self.await_frame(&menu_frame).await?;
        self.state = NavState::MenuResolved;
        Ok(())
    }

    /// MenuResolved → SearchConfigured: resolve the menu entry that leads to
    /// the search screen for this target.
    pub async fn configure_search(&mut self, target: &SearchTarget) -> Result<(), NavError> {
        self.expect(NavState::MenuResolved, "configure_search from MenuResolved")?;
        for attempt in 1..=self.retry.attempts {
            let found = self
                .driver
                .open_menu(&target.screen_id)
                .await
                .map_err(NavError::Driver)?;
            if found {
                self.state = NavState::SearchConfigured;
                return Ok(());
            }
            debug!(screen = %target.screen_id, attempt, "menu entry not present yet");
            tokio::time::sleep(self.retry.settle_delay).await;
        }
        Err(NavError::SearchFormNotFound {
            screen: target.screen_id.clone(),
        })
    }

    /// SearchConfigured → ResultsLoaded: submit the search, then require the
    /// result frame.
    pub async fn run_search(&mut self, target: &SearchTarget) -> Result<(), NavError> {
        self.expect(NavState::SearchConfigured, "run_search from SearchConfigured")?;
        let submitted = self
            .driver
            .submit_search(target)
            .await
            .map_err(NavError::Driver)?;
        if !submitted {
            return Err(NavError::SearchFormNotFound {
                screen: target.screen_id.clone(),
            });
        }
        let result_frame = self.frames.result_frame.clone();
        self.await_frame(&result_frame).await?;
        self.state = NavState::ResultsLoaded;
        Ok(())
    }

    /// Walk every result page of the current search and collect its rows.
    pub async fn collect_rows(&mut self) -> Result<Vec<ResultRow>, NavError> {
        self.expect(NavState::ResultsLoaded, "collect_rows from ResultsLoaded")?;
        let mut rows = self.driver.result_rows().await.map_err(NavError::Driver)?;

        for page in 2..=MAX_PAGES {
            self.state = NavState::Paginating;
            let advanced = self
                .driver
                .jump_to_page(page)
                .await
                .map_err(NavError::Driver)?;
            if !advanced {
                break;
            }
            tokio::time::sleep(self.retry.settle_delay).await;
            let page_rows = self.driver.result_rows().await.map_err(NavError::Driver)?;
            if page_rows.is_empty() {
                break;
            }
            rows.extend(page_rows);
        }

        self.state = NavState::ResultsLoaded;
        Ok(rows)
    }

    /// ResultsLoaded → DetailOpen → ResultsLoaded. A row without a detail
    /// reference, or a popup that never materializes, yields `None`.
    pub async fn fetch_detail(&mut self, row: &ResultRow) -> Result<Option<DetailPage>, NavError> {
        self.expect(NavState::ResultsLoaded, "fetch_detail from ResultsLoaded")?;
        let Some(detail_ref) = row.detail_ref.as_deref() else {
            return Ok(None);
        };

        self.state = NavState::DetailOpen;
        let detail = self
            .driver
            .open_detail(detail_ref)
            .await
            .map_err(NavError::Driver);
        let close = self.driver.close_detail().await.map_err(NavError::Driver);
        self.state = NavState::ResultsLoaded;

        let detail = detail?;
        close?;
        Ok(detail)
    }

    /// Full flow for one target: rows plus each row's detail popup.
    pub async fn navigate(
        &mut self,
        target: &SearchTarget,
    ) -> Result<Vec<(ResultRow, Option<DetailPage>)>, NavError> {
        if self.state == NavState::Entry {
            self.open().await?;
        }
        self.configure_search(target).await?;
        self.run_search(target).await?;
        let rows = self.collect_rows().await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let detail = match self.fetch_detail(&row).await {
                Ok(detail) => detail,
                Err(err) => {
                    warn!(error = %err, "detail fetch failed; keeping the bare row");
                    None
                }
            };
            out.push((row, detail));
        }
        Ok(out)
    }

    /// Return to the menu for the next target within the same session.
    pub fn reset_to_menu(&mut self) -> Result<(), NavError> {
        match self.state {
            NavState::MenuResolved | NavState::SearchConfigured | NavState::ResultsLoaded => {
                self.state = NavState::MenuResolved;
                Ok(())
            }
            actual => Err(NavError::OutOfOrder {
                expected: "reset_to_menu after a completed search",
                actual,
            }),
        }
    }

    pub async fn close(&mut self) -> Result<(), NavError> {
        self.driver.close().await.map_err(NavError::Driver)?;
        self.state = NavState::Closed;
        Ok(())
    }

    fn expect(&self, state: NavState, expected: &'static str) -> Result<(), NavError> {
        if self.state == state {
            Ok(())
        } else {
            Err(NavError::OutOfOrder {
                expected,
                actual: self.state,
            })
        }
    }

    async fn await_frame(&mut self, name: &str) -> Result<(), NavError> {
        for attempt in 1..=self.retry.attempts {
            let exists = self
                .driver
                .frame_exists(name)
                .await
                .map_err(NavError::Driver)?;
            if exists {
                return Ok(());
            }
            debug!(frame = name, attempt, "frame not resolved yet");
            tokio::time::sleep(self.retry.settle_delay).await;
        }
        Err(NavError::FrameNotFound {
            frame: name.to_string(),
            attempts: self.retry.attempts,
        })
    }
}

/// Static description of one frame portal for the HTTP driver.
#[derive(Debug, Clone)]
pub struct PortalProfile {
    pub entry_url: String,
    pub menu_frame: String,
    pub result_frame: String,
    /// Selector for result rows inside the result document.
    pub row_selector: String,
}

impl PortalProfile {
    pub fn frame_plan(&self) -> FramePlan {
        FramePlan {
            menu_frame: self.menu_frame.clone(),
            result_frame: self.result_frame.clone(),
        }
    }
}

/// [`SessionDriver`] over plain HTTP.
///
/// The portals these sessions target are ordinary framesets: every frame is
/// a document at a URL, menu entries are links, searches are form posts and
/// page jumps re-post the search with a page number. Cookies carry the
/// server-side session.
pub struct HttpSessionDriver {
    profile: PortalProfile,
    client: reqwest::Client,
    frames: HashMap<String, String>,
    result_doc: Option<String>,
    last_search: Option<(String, Vec<(String, String)>)>,
    detail_open: bool,
}

impl HttpSessionDriver {
    pub fn new(profile: PortalProfile) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            profile,
            client,
            frames: HashMap::new(),
            result_doc: None,
            last_search: None,
            detail_open: false,
        })
    }

    async fn get_text(&self, url: &str) -> anyhow::Result<String> {
        let resp = self.client.get(url).send().await?.error_for_status()?;
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let body = resp.bytes().await?;
        Ok(decode_body(&body, content_type.as_deref()))
    }

    async fn post_form(
        &self,
        action: &str,
        params: &[(String, String)],
    ) -> anyhow::Result<String> {
        let resp = self
            .client
            .post(action)
            .form(params)
            .send()
            .await?
            .error_for_status()?;
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let body = resp.bytes().await?;
        Ok(decode_body(&body, content_type.as_deref()))
    }

    fn frame_url(&self, name: &str) -> Option<&String> {
        self.frames.get(name)
    }
}

/// Pull the first form's action and hidden fields out of a search screen.
fn read_search_form(html: &str, page_url: &str) -> Option<(String, Vec<(String, String)>)> {
    let doc = Html::parse_document(html);
    let form_sel = Selector::parse("form").unwrap();
    let form = doc.select(&form_sel).next()?;

    let action = form
        .value()
        .attr("action")
        .map(|a| absolutize(page_url, a))
        .unwrap_or_else(|| page_url.to_string());

    let hidden_sel = Selector::parse(r#"input[type="hidden"]"#).unwrap();
    let hidden: Vec<(String, String)> = form
        .select(&hidden_sel)
        .filter_map(|input| {
            let name = input.value().attr("name")?;
            let value = input.value().attr("value").unwrap_or("");
            Some((name.to_string(), value.to_string()))
        })
        .collect();
    Some((action, hidden))
}

#[async_trait]
impl SessionDriver for HttpSessionDriver {
    async fn load_entry(&mut self) -> anyhow::Result<()> {
        let html = self.get_text(&self.profile.entry_url).await?;
        let doc = Html::parse_document(&html);
        let frame_sel = Selector::parse("frame[name], iframe[name]").unwrap();
        self.frames.clear();
        for el in doc.select(&frame_sel) {
            let (Some(name), Some(src)) = (el.value().attr("name"), el.value().attr("src")) else {
                continue;
            };
            self.frames.insert(
                name.to_string(),
                absolutize(&self.profile.entry_url, src),
            );
        }
        Ok(())
    }

    async fn frame_exists(&mut self, name: &str) -> anyhow::Result<bool> {
        // The result frame only counts once a search has filled it.
        if name == self.profile.result_frame {
            return Ok(self.result_doc.is_some() || self.frames.contains_key(name));
        }
        Ok(self.frames.contains_key(name))
    }

    async fn open_menu(&mut self, screen_id: &str) -> anyhow::Result<bool> {
        let Some(menu_url) = self.frame_url(&self.profile.menu_frame).cloned() else {
            return Ok(false);
        };
        let html = self.get_text(&menu_url).await?;
        // Parsed documents stay inside sync blocks; they must not live
        // across an await.
        let href = {
            let doc = Html::parse_document(&html);
            let link_sel = Selector::parse("a[href]").unwrap();
            doc.select(&link_sel)
                .filter_map(|a| a.value().attr("href"))
                .find(|href| href.contains(screen_id))
                .map(ToString::to_string)
        };
        let Some(href) = href else {
            return Ok(false);
        };

        let search_url = absolutize(&menu_url, &href);
        let search_html = self.get_text(&search_url).await?;

        // Pre-read the search form so submit_search only has to fill it.
        self.last_search = read_search_form(&search_html, &search_url);
        Ok(true)
    }

    async fn submit_search(&mut self, target: &SearchTarget) -> anyhow::Result<bool> {
        let Some((action, hidden)) = self.last_search.clone() else {
            return Ok(false);
        };
        let mut params = hidden;
        params.push(("koshuCode".to_string(), target.category_code.clone()));
        params.extend(target.filters.iter().cloned());
        params.push(("pageNo".to_string(), "1".to_string()));

        let html = self.post_form(&action, &params).await?;
        self.result_doc = Some(html);
        self.last_search = Some((action, params));
        Ok(true)
    }

    async fn result_rows(&mut self) -> anyhow::Result<Vec<ResultRow>> {
        let Some(html) = self.result_doc.as_deref() else {
            return Ok(Vec::new());
        };
        let doc = Html::parse_document(html);
        let row_sel = Selector::parse(&self.profile.row_selector)
            .map_err(|e| anyhow::anyhow!("row selector: {e}"))?;
        let cell_sel = Selector::parse("td").unwrap();
        let link_sel = Selector::parse("a[href]").unwrap();

        let base = self
            .last_search
            .as_ref()
            .map(|(action, _)| action.clone())
            .unwrap_or_else(|| self.profile.entry_url.clone());

        let mut rows = Vec::new();
        for tr in doc.select(&row_sel) {
            let cells: Vec<String> = tr
                .select(&cell_sel)
                .map(|td| td.text().collect::<String>().trim().to_string())
                .collect();
            if cells.is_empty() {
                continue;
            }
            let detail_ref = tr
                .select(&link_sel)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(|href| absolutize(&base, href));
            rows.push(ResultRow { cells, detail_ref });
        }
        Ok(rows)
    }

    async fn jump_to_page(&mut self, page: usize) -> anyhow::Result<bool> {
        let Some(html) = self.result_doc.as_deref() else {
            return Ok(false);
        };
        // The pager renders plain numbered links; a missing number means the
        // page does not exist.
        let wanted = page.to_string();
        let present = {
            let doc = Html::parse_document(html);
            let link_sel = Selector::parse("a[href]").unwrap();
            doc.select(&link_sel)
                .filter_map(element_text)
                .any(|text| text == wanted)
        };
        if !present {
            return Ok(false);
        }

        let Some((action, params)) = self.last_search.clone() else {
            return Ok(false);
        };
        let mut params: Vec<(String, String)> = params
            .into_iter()
            .filter(|(k, _)| k != "pageNo")
            .collect();
        params.push(("pageNo".to_string(), wanted));
        let html = self.post_form(&action, &params).await?;
        self.result_doc = Some(html);
        Ok(true)
    }

    async fn open_detail(&mut self, detail_ref: &str) -> anyhow::Result<Option<DetailPage>> {
        if self.detail_open {
            anyhow::bail!("previous detail popup was not closed");
        }
        let html = self.get_text(detail_ref).await?;
        self.detail_open = true;
        let doc = Html::parse_document(&html);
        let link_sel = Selector::parse("a[href]").unwrap();
        let download_url = doc
            .select(&link_sel)
            .filter_map(|a| a.value().attr("href"))
            .find(|href| {
                let lower = href.to_ascii_lowercase();
                lower.ends_with(".pdf") || lower.ends_with(".zip") || lower.contains("download")
            })
            .map(|href| absolutize(detail_ref, href));
        Ok(Some(DetailPage { html, download_url }))
    }

    async fn close_detail(&mut self) -> anyhow::Result<()> {
        self.detail_open = false;
        Ok(())
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        self.frames.clear();
        self.result_doc = None;
        self.last_search = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Scripted driver: frame appearance and page contents are queued up
    /// front, calls are recorded for assertion.
    #[derive(Default)]
    struct FakeDriver {
        menu_frame_appears_after: usize,
        frame_checks: usize,
        has_menu_entry: bool,
        has_search_form: bool,
        pages: VecDeque<Vec<ResultRow>>,
        details: HashMap<String, DetailPage>,
        closed: bool,
        detail_closes: usize,
    }

    fn row(title: &str, detail: Option<&str>) -> ResultRow {
        ResultRow {
            cells: vec!["令和7年3月10日".into(), title.into(), "公告中".into()],
            detail_ref: detail.map(ToString::to_string),
        }
    }

    #[async_trait]
    impl SessionDriver for FakeDriver {
        async fn load_entry(&mut self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn frame_exists(&mut self, _name: &str) -> anyhow::Result<bool> {
            self.frame_checks += 1;
            Ok(self.frame_checks > self.menu_frame_appears_after)
        }

        async fn open_menu(&mut self, _screen_id: &str) -> anyhow::Result<bool> {
            Ok(self.has_menu_entry)
        }

        async fn submit_search(&mut self, _target: &SearchTarget) -> anyhow::Result<bool> {
            Ok(self.has_search_form)
        }

        async fn result_rows(&mut self) -> anyhow::Result<Vec<ResultRow>> {
            Ok(self.pages.front().cloned().unwrap_or_default())
        }

        async fn jump_to_page(&mut self, _page: usize) -> anyhow::Result<bool> {
            self.pages.pop_front();
            Ok(self.pages.front().is_some())
        }

        async fn open_detail(&mut self, detail_ref: &str) -> anyhow::Result<Option<DetailPage>> {
            Ok(self.details.get(detail_ref).cloned())
        }

        async fn close_detail(&mut self) -> anyhow::Result<()> {
            self.detail_closes += 1;
            Ok(())
        }

        async fn close(&mut self) -> anyhow::Result<()> {
            self.closed = true;
            Ok(())
        }
    }

    fn engine(driver: FakeDriver) -> NavigationEngine<FakeDriver> {
        NavigationEngine::new(
            driver,
            FramePlan {
                menu_frame: "menu".into(),
                result_frame: "main".into(),
            },
            RetryPolicy {
                attempts: 3,
                settle_delay: Duration::ZERO,
            },
        )
    }

    fn target() -> SearchTarget {
        SearchTarget {
            screen_id: "PPI_SR001".into(),
            category_code: "0101".into(),
            filters: vec![("nendo".into(), "2025".into())],
        }
    }

    #[tokio::test]
    async fn walks_all_pages_and_details() {
        let mut driver = FakeDriver {
            has_menu_entry: true,
            has_search_form: true,
            ..Default::default()
        };
        driver.pages = VecDeque::from(vec![
            vec![row("庁舎改修工事", Some("detail-1")), row("体育館設計業務", None)],
            vec![row("公民館耐震補強工事", Some("detail-3"))],
        ]);
        driver.details.insert(
            "detail-1".into(),
            DetailPage {
                html: "<html></html>".into(),
                download_url: Some("https://ppi.example.jp/doc/1.pdf".into()),
            },
        );

        let mut engine = engine(driver);
        let collected = engine.navigate(&target()).await.unwrap();

        assert_eq!(collected.len(), 3);
        assert_eq!(
            collected[0].1.as_ref().unwrap().download_url.as_deref(),
            Some("https://ppi.example.jp/doc/1.pdf")
        );
        assert!(collected[1].1.is_none());
        assert_eq!(engine.state(), NavState::ResultsLoaded);

        engine.close().await.unwrap();
        assert_eq!(engine.state(), NavState::Closed);
        assert!(engine.driver.closed);
    }

    #[tokio::test]
    async fn missing_frame_fails_after_bounded_retries() {
        let driver = FakeDriver {
            menu_frame_appears_after: 99,
            ..Default::default()
        };
        let mut engine = engine(driver);
        let err = engine.open().await.unwrap_err();
        match err {
            NavError::FrameNotFound { frame, attempts } => {
                assert_eq!(frame, "menu");
                assert_eq!(attempts, 3);
            }
            other => panic!("expected FrameNotFound, got {other:?}"),
        }
        assert_eq!(engine.driver.frame_checks, 3);
    }

    #[tokio::test]
    async fn frame_appearing_late_still_resolves() {
        let driver = FakeDriver {
            menu_frame_appears_after: 2,
            ..Default::default()
        };
        let mut engine = engine(driver);
        engine.open().await.unwrap();
        assert_eq!(engine.state(), NavState::MenuResolved);
    }

    #[tokio::test]
    async fn missing_search_form_is_target_scoped() {
        let driver = FakeDriver {
            has_menu_entry: true,
            has_search_form: false,
            ..Default::default()
        };
        let mut engine = engine(driver);
        engine.open().await.unwrap();
        engine.configure_search(&target()).await.unwrap();
        let err = engine.run_search(&target()).await.unwrap_err();
        assert!(matches!(err, NavError::SearchFormNotFound { .. }));
    }

    #[tokio::test]
    async fn out_of_order_steps_are_rejected() {
        let mut engine = engine(FakeDriver::default());
        let err = engine.collect_rows().await.unwrap_err();
        assert!(matches!(err, NavError::OutOfOrder { .. }));
    }

    #[test]
    fn search_form_hidden_fields_are_captured() {
        let html = r#"<html><body><form action="search.do">
            <input type="hidden" name="screenId" value="PPI_SR001"/>
            <input type="hidden" name="token" value="abc"/>
            <input type="text" name="keyword"/>
        </form></body></html>"#;
        let (action, hidden) =
            read_search_form(html, "https://ppi.example.jp/menu/top.do").unwrap();
        assert_eq!(action, "https://ppi.example.jp/menu/search.do");
        assert_eq!(
            hidden,
            vec![
                ("screenId".to_string(), "PPI_SR001".to_string()),
                ("token".to_string(), "abc".to_string()),
            ]
        );
        assert!(read_search_form("<p>フォームなし</p>", "https://x.example.jp/").is_none());
    }

    #[tokio::test]
    async fn detail_popup_is_closed_even_when_found() {
        let mut driver = FakeDriver {
            has_menu_entry: true,
            has_search_form: true,
            ..Default::default()
        };
        driver.pages = VecDeque::from(vec![vec![row("庁舎改修工事", Some("detail-1"))]]);
        let mut engine = engine(driver);
        engine.navigate(&target()).await.unwrap();
        assert_eq!(engine.driver.detail_closes, 1);
    }
}
