//! Hierarchical JSON-API adapter family.

use async_trait::async_trait;
use nyusatsu_core::{jdate, RawTender};
use nyusatsu_storage::HttpFetcher;
use serde_json::Value as JsonValue;

use crate::{absolutize, classify, AdapterError, SourceAdapter};

/// Adapter for portals that expose a year → month → entry JSON index.
///
/// The whole dataset arrives as one tree; traversal is pure, so the only
/// network step is the index fetch.
pub struct TreePortalAdapter {
    source_id: &'static str,
    municipality: &'static str,
    index_url: &'static str,
}

impl TreePortalAdapter {
    pub fn new(
        source_id: &'static str,
        municipality: &'static str,
        index_url: &'static str,
    ) -> Self {
        Self {
            source_id,
            municipality,
            index_url,
        }
    }

    pub fn parse_index(&self, root: &JsonValue) -> Vec<RawTender> {
        let mut out = Vec::new();
        for year in json_array(root, &["fiscalYears"]) {
            for month in json_array(year, &["months"]) {
                for entry in json_array(month, &["tenders"]) {
                    if let Some(raw) = self.entry_to_raw(entry) {
                        out.push(raw);
                    }
                }
            }
        }
        out
    }

    fn entry_to_raw(&self, entry: &JsonValue) -> Option<RawTender> {
        let title = json_str(entry, &["title"])?.trim();
        if title.is_empty() {
            return None;
        }
        let category_hint = json_str(entry, &["category"]).map(ToString::to_string);
        let description = json_str(entry, &["summary"]).map(ToString::to_string);

        if !classify::accept_parts(title, category_hint.as_deref(), description.as_deref()) {
            return None;
        }

        Some(RawTender {
            source_id: self.source_id.to_string(),
            municipality: self.municipality.to_string(),
            title: title.to_string(),
            contract_no: json_str(entry, &["noticeNo"]).map(ToString::to_string),
            announcement_date: json_str(entry, &["publishedOn"]).and_then(jdate::parse_date),
            bidding_date: json_str(entry, &["bidOn"]).and_then(jdate::parse_date),
            status_text: json_str(entry, &["status"]).map(ToString::to_string),
            category_hint,
            description,
            link: json_str(entry, &["detailUrl"])
                .map(|href| absolutize(self.index_url, href))
                .unwrap_or_else(|| self.index_url.to_string()),
            pdf_url: json_str(entry, &["resultPdf"])
                .map(|href| absolutize(self.index_url, href)),
        })
    }
}

fn json_str<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a str> {
    let mut cur = value;
    for segment in path {
        cur = cur.get(*segment)?;
    }
    cur.as_str()
}

fn json_array<'a>(value: &'a JsonValue, path: &[&str]) -> impl Iterator<Item = &'a JsonValue> {
    let mut cur = Some(value);
    for segment in path {
        cur = cur.and_then(|v| v.get(*segment));
    }
    cur.and_then(|v| v.as_array())
        .map(|a| a.iter())
        .unwrap_or_default()
}

#[async_trait]
impl SourceAdapter for TreePortalAdapter {
    fn source_id(&self) -> &'static str {
        self.source_id
    }

    fn municipality(&self) -> &'static str {
        self.municipality
    }

    async fn scrape(&self, http: &HttpFetcher) -> Result<Vec<RawTender>, AdapterError> {
        let resp = http.fetch_bytes(self.source_id, self.index_url).await?;
        let root: JsonValue = serde_json::from_slice(&resp.body)
            .map_err(|e| AdapterError::Parse(format!("index JSON: {e}")))?;
        Ok(self.parse_index(&root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn adapter() -> TreePortalAdapter {
        crate::sources::akita_pref_adapter()
    }

    #[test]
    fn traverses_years_months_and_entries() {
        let root = json!({
            "fiscalYears": [{
                "year": "2025",
                "months": [{
                    "month": "03",
                    "tenders": [
                        {
                            "title": "県立美術館空調設備改修工事",
                            "noticeNo": "R7-0045",
                            "publishedOn": "2025-03-10",
                            "bidOn": "2025-04-01",
                            "status": "落札者決定",
                            "category": "建築一式工事",
                            "detailUrl": "/tenders/r7-0045.html",
                            "resultPdf": "/tenders/r7-0045/result.zip"
                        },
                        {
                            "title": "国道改良工事に伴う橋梁補修",
                            "publishedOn": "2025-03-09"
                        }
                    ]
                }]
            }]
        });

        let rows = adapter().parse_index(&root);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.contract_no.as_deref(), Some("R7-0045"));
        assert_eq!(
            row.announcement_date,
            chrono::NaiveDate::from_ymd_opt(2025, 3, 10)
        );
        assert_eq!(
            row.bidding_date,
            chrono::NaiveDate::from_ymd_opt(2025, 4, 1)
        );
        assert_eq!(
            row.link,
            "https://bid.pref.akita.example.jp/tenders/r7-0045.html"
        );
        assert_eq!(
            row.pdf_url.as_deref(),
            Some("https://bid.pref.akita.example.jp/tenders/r7-0045/result.zip")
        );
        assert_eq!(row.status_text.as_deref(), Some("落札者決定"));
    }

    #[test]
    fn missing_branches_yield_nothing() {
        assert!(adapter().parse_index(&json!({})).is_empty());
        assert!(adapter()
            .parse_index(&json!({"fiscalYears": [{"months": []}]}))
            .is_empty());
    }

    #[test]
    fn era_dates_in_the_api_still_parse() {
        let root = json!({
            "fiscalYears": [{"months": [{"tenders": [{
                "title": "合同庁舎増築工事",
                "publishedOn": "令和7年3月10日"
            }]}]}]
        });
        let rows = adapter().parse_index(&root);
        assert_eq!(
            rows[0].announcement_date,
            chrono::NaiveDate::from_ymd_opt(2025, 3, 10)
        );
    }
}
