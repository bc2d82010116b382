//! Syndication-feed adapter family.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use nyusatsu_core::{jdate, RawTender};
use nyusatsu_storage::HttpFetcher;
use rss::Channel;
use scraper::{Html, Selector};

use crate::{absolutize, classify, AdapterError, SourceAdapter};

/// Adapter for municipalities that announce procurement through an RSS feed.
///
/// Feed items carry no status column and no contract number; the title and
/// an HTML description are all there is. Status stays unknown until another
/// source or a later pass reports more.
pub struct FeedPortalAdapter {
    source_id: &'static str,
    municipality: &'static str,
    feed_url: &'static str,
}

impl FeedPortalAdapter {
    pub fn new(
        source_id: &'static str,
        municipality: &'static str,
        feed_url: &'static str,
    ) -> Self {
        Self {
            source_id,
            municipality,
            feed_url,
        }
    }

    pub fn parse_feed(&self, bytes: &[u8]) -> Result<Vec<RawTender>, AdapterError> {
        let channel =
            Channel::read_from(bytes).map_err(|e| AdapterError::Parse(e.to_string()))?;

        let mut out = Vec::new();
        for item in channel.items() {
            let Some(title) = item.title().map(str::trim).filter(|t| !t.is_empty()) else {
                continue;
            };
            let link = item.link().unwrap_or(self.feed_url).to_string();

            let (description, pdf_url) = item
                .description()
                .map(|html| parse_description(html, &link))
                .unwrap_or((None, None));

            if !classify::accept_parts(title, None, description.as_deref()) {
                continue;
            }

            out.push(RawTender {
                source_id: self.source_id.to_string(),
                municipality: self.municipality.to_string(),
                title: title.to_string(),
                contract_no: None,
                announcement_date: item.pub_date().and_then(parse_pub_date),
                bidding_date: None,
                status_text: None,
                category_hint: None,
                description,
                link,
                pdf_url,
            });
        }
        Ok(out)
    }
}

/// Feed descriptions are small HTML fragments; pull the plain text and the
/// first PDF link out of them.
fn parse_description(html: &str, base: &str) -> (Option<String>, Option<String>) {
    let fragment = Html::parse_fragment(html);
    let link_sel = Selector::parse("a[href]").unwrap();

    let text = fragment
        .root_element()
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let text = if text.is_empty() { None } else { Some(text) };

    let pdf = fragment
        .select(&link_sel)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| href.to_ascii_lowercase().ends_with(".pdf"))
        .map(|href| absolutize(base, href));

    (text, pdf)
}

fn parse_pub_date(raw: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc2822(raw)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| jdate::parse_date(raw))
}

#[async_trait]
impl SourceAdapter for FeedPortalAdapter {
    fn source_id(&self) -> &'static str {
        self.source_id
    }

    fn municipality(&self) -> &'static str {
        self.municipality
    }

    async fn scrape(&self, http: &HttpFetcher) -> Result<Vec<RawTender>, AdapterError> {
        let resp = http.fetch_bytes(self.source_id, self.feed_url).await?;
        self.parse_feed(&resp.body)
    }
}
