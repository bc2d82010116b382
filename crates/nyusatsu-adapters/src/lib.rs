//! Source adapter contracts + per-portal adapter implementations.
//!
//! Each regional portal gets an adapter built from one of four families
//! (stateful frame portal, static paginated table, syndication feed,
//! hierarchical JSON API). Adapters emit portal-shaped [`RawTender`] rows
//! after applying the relevance classifier; normalization into canonical
//! [`nyusatsu_core::Tender`] records happens in the sync pass.

pub mod classify;
pub mod nav;
pub mod normalize;
pub mod sources;

use async_trait::async_trait;
use nyusatsu_core::RawTender;
use nyusatsu_storage::{FetchError, HttpFetcher};
use scraper::ElementRef;
use thiserror::Error;

pub use nav::NavError;
pub use sources::{
    adapter_for_source, all_adapters, feed::FeedPortalAdapter, frame::FramePortalAdapter,
    table::TablePortalAdapter, tree::TreePortalAdapter,
};

pub const CRATE_NAME: &str = "nyusatsu-adapters";

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Nav(#[from] NavError),
    #[error("parse error: {0}")]
    Parse(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// One portal, one adapter. Stateful adapters own exactly one navigation
/// session per `scrape` call; stateless ones go through the shared fetcher.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source_id(&self) -> &'static str;
    fn municipality(&self) -> &'static str;

    /// Whether `scrape` drives a stateful portal session. Stateful adapters
    /// must run sequentially; everything else may run concurrently.
    fn is_stateful(&self) -> bool {
        false
    }

    async fn scrape(&self, http: &HttpFetcher) -> Result<Vec<RawTender>, AdapterError>;
}

/// Decode a fetched body, honoring the Shift_JIS legacy portals still serve.
///
/// Checks the Content-Type charset first, then the document's own meta tag,
/// and falls back to lossy UTF-8.
pub fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    let declared_sjis = content_type
        .map(|ct| {
            let ct = ct.to_ascii_lowercase();
            ct.contains("shift_jis") || ct.contains("shift-jis") || ct.contains("sjis")
        })
        .unwrap_or(false);

    let sniffed_sjis = || {
        let head = &body[..body.len().min(1024)];
        let head = String::from_utf8_lossy(head).to_ascii_lowercase();
        head.contains("charset=shift_jis") || head.contains("charset=shift-jis")
    };

    if declared_sjis || sniffed_sjis() {
        let (text, _, _) = encoding_rs::SHIFT_JIS.decode(body);
        text.into_owned()
    } else {
        String::from_utf8_lossy(body).into_owned()
    }
}

pub(crate) fn text_or_none(value: String) -> Option<String> {
    let trimmed = value.trim().to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

pub(crate) fn element_text(el: ElementRef<'_>) -> Option<String> {
    text_or_none(el.text().collect::<String>())
}

/// Join a possibly-relative portal link against the portal base.
pub(crate) fn absolutize(base: &str, href: &str) -> String {
    match url::Url::parse(base).and_then(|b| b.join(href)) {
        Ok(joined) => joined.to_string(),
        Err(_) => href.to_string(),
    }
}
