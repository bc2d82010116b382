//! Raw portal rows through normalization into canonical records.

use chrono::NaiveDate;
use nyusatsu_adapters::normalize::normalize;
use nyusatsu_adapters::sources::{hachinohe_city_adapter, morioka_city_adapter};
use nyusatsu_core::{Category, TenderStatus};

const LISTING: &str = r#"
<table class="datatable"><tbody>
  <tr><th>公告日</th><th>件名</th><th>方式</th><th>状況</th></tr>
  <tr>
    <td>令和7年3月10日</td>
    <td><a href="/nyusatsu/104.html">市民会館空調設備改修工事</a></td>
    <td>一般競争入札</td>
    <td>落札者決定</td>
    <td><a href="/nyusatsu/docs/104.pdf">結果</a></td>
  </tr>
</tbody></table>"#;

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
  <title>入札情報</title>
  <link>https://example.jp/</link>
  <description>新着</description>
  <item>
    <title>庁舎耐震診断業務委託の公告</title>
    <link>https://example.jp/2025/0310.html</link>
    <pubDate>Mon, 10 Mar 2025 09:00:00 +0900</pubDate>
  </item>
</channel></rss>"#;

#[test]
fn table_row_becomes_an_awarded_construction_tender() {
    let adapter = hachinohe_city_adapter();
    let raw = adapter
        .parse_page(LISTING, "https://www.city.hachinohe.example.jp/nyusatsu/list.html?page=1")
        .unwrap();
    assert_eq!(raw.len(), 1);

    let today = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
    let tender = normalize(&raw[0], today).unwrap();

    assert_eq!(tender.municipality, "八戸市");
    assert_eq!(tender.category, Category::Construction);
    assert_eq!(tender.status, TenderStatus::Awarded);
    assert_eq!(
        tender.announcement_date,
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    );
    assert!(tender.pdf_url.as_deref().unwrap().ends_with("104.pdf"));
    assert!(!tender.is_enriched);

    // Scraping the unchanged listing again yields the same id.
    let again = adapter
        .parse_page(LISTING, "https://www.city.hachinohe.example.jp/nyusatsu/list.html?page=1")
        .unwrap();
    assert_eq!(normalize(&again[0], today).unwrap().id, tender.id);
}

#[test]
fn feed_item_becomes_a_design_consulting_tender() {
    let raw = morioka_city_adapter().parse_feed(FEED.as_bytes()).unwrap();
    assert_eq!(raw.len(), 1);

    let today = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
    let tender = normalize(&raw[0], today).unwrap();

    assert_eq!(tender.municipality, "盛岡市");
    assert_eq!(tender.category, Category::DesignConsulting);
    // Feeds carry no status column; unknown until another source reports.
    assert_eq!(tender.status, TenderStatus::Unknown);
    assert!(tender.id.starts_with("morioka-city-"));
}
