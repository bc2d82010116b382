//! Per-portal adapters, grouped by family.
//!
//! A new municipality is one constructor function: pick the family its
//! portal belongs to and fill in the portal-specific shape (frames and
//! screen codes, table layout, feed URL, or API index).

pub mod feed;
pub mod frame;
pub mod table;
pub mod tree;

use crate::nav::{PortalProfile, SearchTarget};
use crate::SourceAdapter;
use feed::FeedPortalAdapter;
use frame::{CategoryTarget, FrameColumns, FramePortalAdapter};
use table::{TableLayout, TablePortalAdapter};
use tree::TreePortalAdapter;

/// 青森県 入札情報サービス: legacy frameset portal, one search per work
/// category, award results behind per-row detail popups.
pub fn aomori_pref_adapter() -> FramePortalAdapter {
    FramePortalAdapter::new(
        "aomori-pref",
        "青森県",
        PortalProfile {
            entry_url: "https://ppi.pref.aomori.example.jp/gyomu/index.jsp".into(),
            menu_frame: "menu".into(),
            result_frame: "main".into(),
            row_selector: "table.SearchResult tr".into(),
        },
        vec![
            CategoryTarget {
                label: "建築工事",
                target: SearchTarget {
                    screen_id: "PPI_SR001".into(),
                    category_code: "0101".into(),
                    filters: vec![("nendo".into(), "current".into())],
                },
            },
            CategoryTarget {
                label: "建築コンサル",
                target: SearchTarget {
                    screen_id: "PPI_SR002".into(),
                    category_code: "0205".into(),
                    filters: vec![("nendo".into(), "current".into())],
                },
            },
        ],
        FrameColumns {
            date: 0,
            contract_no: Some(1),
            title: 2,
            status: Some(4),
        },
    )
}

/// 八戸市: static paginated announcement table.
pub fn hachinohe_city_adapter() -> TablePortalAdapter {
    TablePortalAdapter::new(
        "hachinohe-city",
        "八戸市",
        "https://www.city.hachinohe.example.jp/nyusatsu/list.html?page={page}",
        TableLayout {
            row_selector: "table.datatable tbody tr".into(),
            date_col: 0,
            title_col: 1,
            contract_col: None,
            status_col: Some(3),
        },
    )
}

/// 弘前市: same family as 八戸市 with its own column layout.
pub fn hirosaki_city_adapter() -> TablePortalAdapter {
    TablePortalAdapter::new(
        "hirosaki-city",
        "弘前市",
        "https://www.city.hirosaki.example.jp/keiyaku/kokoku/index.html?p={page}",
        TableLayout {
            row_selector: "div.contract-list table tr".into(),
            date_col: 1,
            title_col: 0,
            contract_col: Some(2),
            status_col: None,
        },
    )
}

/// 盛岡市: procurement notices via the city's RSS feed.
pub fn morioka_city_adapter() -> FeedPortalAdapter {
    FeedPortalAdapter::new(
        "morioka-city",
        "盛岡市",
        "https://www.city.morioka.example.jp/feeds/nyusatsu.rss",
    )
}

/// 秋田県: year/month/entry JSON API.
pub fn akita_pref_adapter() -> TreePortalAdapter {
    TreePortalAdapter::new(
        "akita-pref",
        "秋田県",
        "https://bid.pref.akita.example.jp/api/tenders/index.json",
    )
}

pub fn adapter_for_source(source_id: &str) -> Option<Box<dyn SourceAdapter>> {
    match source_id {
        "aomori-pref" => Some(Box::new(aomori_pref_adapter())),
        "hachinohe-city" => Some(Box::new(hachinohe_city_adapter())),
        "hirosaki-city" => Some(Box::new(hirosaki_city_adapter())),
        "morioka-city" => Some(Box::new(morioka_city_adapter())),
        "akita-pref" => Some(Box::new(akita_pref_adapter())),
        _ => None,
    }
}

pub fn all_adapters() -> Vec<Box<dyn SourceAdapter>> {
    vec![
        Box::new(aomori_pref_adapter()),
        Box::new(hachinohe_city_adapter()),
        Box::new(hirosaki_city_adapter()),
        Box::new(morioka_city_adapter()),
        Box::new(akita_pref_adapter()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_knows_every_adapter() {
        for adapter in all_adapters() {
            let looked_up = adapter_for_source(adapter.source_id());
            assert!(looked_up.is_some(), "missing {}", adapter.source_id());
        }
        assert!(adapter_for_source("nowhere-town").is_none());
    }

    #[test]
    fn only_the_frame_portal_is_stateful() {
        let stateful: Vec<_> = all_adapters()
            .into_iter()
            .filter(|a| a.is_stateful())
            .map(|a| a.source_id())
            .collect();
        assert_eq!(stateful, vec!["aomori-pref"]);
    }
}
