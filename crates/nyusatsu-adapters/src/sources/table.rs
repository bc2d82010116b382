//! Static paginated-table adapter family.

use async_trait::async_trait;
use nyusatsu_core::{jdate, RawTender};
use nyusatsu_storage::HttpFetcher;
use scraper::{Html, Selector};
use tracing::debug;

use crate::{absolutize, classify, decode_body, AdapterError, SourceAdapter};

/// Pages walked before giving up on a portal that never runs dry.
const MAX_PAGES: usize = 20;

/// Column positions and row selector for one portal's announcement table.
#[derive(Debug, Clone)]
pub struct TableLayout {
    pub row_selector: String,
    pub date_col: usize,
    pub title_col: usize,
    pub contract_col: Option<usize>,
    pub status_col: Option<usize>,
}

/// Adapter for portals that publish a plain paginated HTML table.
///
/// Stateless: each page is an independent GET with a page number in the URL,
/// so the shared fetcher's retry and concurrency discipline applies.
pub struct TablePortalAdapter {
    source_id: &'static str,
    municipality: &'static str,
    /// Listing URL with a `{page}` placeholder.
    page_url_template: &'static str,
    layout: TableLayout,
}

impl TablePortalAdapter {
    pub fn new(
        source_id: &'static str,
        municipality: &'static str,
        page_url_template: &'static str,
        layout: TableLayout,
    ) -> Self {
        Self {
            source_id,
            municipality,
            page_url_template,
            layout,
        }
    }

    fn page_url(&self, page: usize) -> String {
        self.page_url_template.replace("{page}", &page.to_string())
    }

    /// Parse one listing page. Structural surprises (missing table, renamed
    /// columns) surface as zero rows, not a panic.
    pub fn parse_page(&self, html: &str, page_url: &str) -> Result<Vec<RawTender>, AdapterError> {
        let doc = Html::parse_document(html);
        let row_sel = Selector::parse(&self.layout.row_selector)
            .map_err(|e| AdapterError::Parse(e.to_string()))?;
        let cell_sel = Selector::parse("td").unwrap();
        let link_sel = Selector::parse("a[href]").unwrap();

        let mut out = Vec::new();
        for tr in doc.select(&row_sel) {
            let cells: Vec<_> = tr.select(&cell_sel).collect();
            let needed = self
                .layout
                .date_col
                .max(self.layout.title_col)
                .max(self.layout.contract_col.unwrap_or(0))
                .max(self.layout.status_col.unwrap_or(0));
            if cells.len() <= needed {
                // Header rows and spacer rows fall out here.
                continue;
            }

            let cell_text = |i: usize| -> String {
                cells[i].text().collect::<String>().trim().to_string()
            };

            let title = cell_text(self.layout.title_col);
            if title.is_empty() {
                continue;
            }

            let link = cells[self.layout.title_col]
                .select(&link_sel)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(|href| absolutize(page_url, href))
                .unwrap_or_else(|| page_url.to_string());

            let pdf_url = tr
                .select(&link_sel)
                .filter_map(|a| a.value().attr("href"))
                .find(|href| href.to_ascii_lowercase().ends_with(".pdf"))
                .map(|href| absolutize(page_url, href));

            let status_text = self
                .layout
                .status_col
                .map(cell_text)
                .filter(|s| !s.is_empty());

            if !classify::accept_parts(&title, status_text.as_deref(), None) {
                continue;
            }

            out.push(RawTender {
                source_id: self.source_id.to_string(),
                municipality: self.municipality.to_string(),
                title,
                contract_no: self
                    .layout
                    .contract_col
                    .map(cell_text)
                    .filter(|s| !s.is_empty()),
                announcement_date: jdate::parse_date(&cell_text(self.layout.date_col)),
                bidding_date: None,
                status_text,
                category_hint: None,
                description: None,
                link,
                pdf_url,
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for TablePortalAdapter {
    fn source_id(&self) -> &'static str {
        self.source_id
    }

    fn municipality(&self) -> &'static str {
        self.municipality
    }

    async fn scrape(&self, http: &HttpFetcher) -> Result<Vec<RawTender>, AdapterError> {
        let mut out = Vec::new();
        for page in 1..=MAX_PAGES {
            let url = self.page_url(page);
            let resp = http.fetch_bytes(self.source_id, &url).await?;
            let html = decode_body(&resp.body, resp.content_type.as_deref());
            let rows = self.parse_page(&html, &url)?;
            if rows.is_empty() {
                debug!(source = self.source_id, page, "empty page, stopping pagination");
                break;
            }
            out.extend(rows);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <table class="datatable"><tbody>
          <tr><th>公告日</th><th>件名</th><th>方式</th><th>状況</th></tr>
          <tr>
            <td>令和7年3月10日</td>
            <td><a href="/nyusatsu/104.html">市民会館空調設備改修工事</a></td>
            <td>一般競争入札</td>
            <td>公告中</td>
            <td><a href="/nyusatsu/docs/104.pdf">公告文</a></td>
          </tr>
          <tr>
            <td>令和7年3月8日</td>
            <td><a href="/nyusatsu/103.html">市道3号線舗装補修工事</a></td>
            <td>一般競争入札</td>
            <td>公告中</td>
          </tr>
          <tr>
            <td>令和7年3月5日</td>
            <td><a href="/nyusatsu/102.html">学校給食センター実施設計業務</a></td>
            <td>指名競争入札</td>
            <td>落札者決定</td>
          </tr>
        </tbody></table>
        </body></html>"#;

    fn adapter() -> TablePortalAdapter {
        crate::sources::hachinohe_city_adapter()
    }

    #[test]
    fn parses_rows_and_drops_civil_engineering() {
        let rows = adapter()
            .parse_page(PAGE, "https://www.city.hachinohe.example.jp/nyusatsu/list.html?page=1")
            .unwrap();
        // The 舗装 row is out of scope.
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, "市民会館空調設備改修工事");
        assert_eq!(
            rows[0].link,
            "https://www.city.hachinohe.example.jp/nyusatsu/104.html"
        );
        assert_eq!(
            rows[0].pdf_url.as_deref(),
            Some("https://www.city.hachinohe.example.jp/nyusatsu/docs/104.pdf")
        );
        assert_eq!(
            rows[0].announcement_date,
            chrono::NaiveDate::from_ymd_opt(2025, 3, 10)
        );
        assert_eq!(rows[1].title, "学校給食センター実施設計業務");
        assert_eq!(rows[1].status_text.as_deref(), Some("落札者決定"));
    }

    #[test]
    fn header_only_table_yields_no_rows() {
        let html = r#"<table class="datatable"><tbody>
            <tr><th>公告日</th><th>件名</th></tr>
        </tbody></table>"#;
        let rows = adapter().parse_page(html, "https://example.jp/").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn unexpected_layout_yields_no_rows() {
        let html = "<div>臨時メンテナンス中です</div>";
        let rows = adapter().parse_page(html, "https://example.jp/").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn page_url_substitutes_page_number() {
        assert_eq!(
            adapter().page_url(3),
            "https://www.city.hachinohe.example.jp/nyusatsu/list.html?page=3"
        );
    }
}
