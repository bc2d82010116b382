//! Raw row → canonical tender normalization.

use chrono::NaiveDate;
use nyusatsu_core::{derive_id, Category, RawTender, Tender, TenderStatus};
use tracing::debug;

/// Title terms that mark design / survey / supervision work.
const DESIGN_TERMS: &[&str] = &["設計", "測量", "調査", "監理", "コンサル", "診断"];

/// Title terms that mark construction work.
const CONSTRUCTION_TERMS: &[&str] = &["工事", "改修", "新築", "増築", "解体", "建築", "営繕"];

/// Days before the bidding date at which an open tender becomes closing-soon.
const CLOSING_SOON_WINDOW_DAYS: i64 = 3;

/// Shape a portal row into a canonical record.
///
/// Rows without a parseable announcement date are dropped; everything else
/// about the row may be partial.
pub fn normalize(raw: &RawTender, today: NaiveDate) -> Option<Tender> {
    let Some(announcement_date) = raw.announcement_date else {
        debug!(source = %raw.source_id, title = %raw.title, "dropping row without announcement date");
        return None;
    };

    let id = derive_id(&raw.source_id, raw.contract_no.as_deref(), &raw.title);
    let category = infer_category(&raw.title, raw.category_hint.as_deref());
    let status = resolve_status(raw.status_text.as_deref(), raw.bidding_date, today);

    Some(Tender {
        id,
        municipality: raw.municipality.clone(),
        title: raw.title.clone(),
        category,
        announcement_date,
        bidding_date: raw.bidding_date,
        link: raw.link.clone(),
        pdf_url: raw.pdf_url.clone(),
        status,
        winning_contractor: None,
        design_firm: None,
        estimated_price: None,
        construction_period: None,
        description: raw.description.clone(),
        is_enriched: false,
    })
}

/// Category from the explicit portal hint when present, else title heuristics.
pub fn infer_category(title: &str, hint: Option<&str>) -> Category {
    if let Some(hint) = hint {
        if hint.contains("委託") || hint.contains("設計") || hint.contains("コンサル") {
            return Category::DesignConsulting;
        }
        if hint.contains("工事") || hint.contains("建設") {
            return Category::Construction;
        }
    }
    if DESIGN_TERMS.iter().any(|t| title.contains(t)) {
        return Category::DesignConsulting;
    }
    if CONSTRUCTION_TERMS.iter().any(|t| title.contains(t)) {
        return Category::Construction;
    }
    Category::Other
}

/// Map portal status text onto the canonical lifecycle, deriving
/// closing-soon from an imminent bidding date when the source says "open".
pub fn resolve_status(
    status_text: Option<&str>,
    bidding_date: Option<NaiveDate>,
    today: NaiveDate,
) -> TenderStatus {
    let status = match status_text {
        Some(text) if text.contains("落札") || text.contains("契約") => TenderStatus::Awarded,
        Some(text) if text.contains("開札") || text.contains("締切") || text.contains("終了") => {
            TenderStatus::Closed
        }
        Some(text) if text.contains("公告") || text.contains("受付") || text.contains("公開") => {
            TenderStatus::Open
        }
        _ => TenderStatus::Unknown,
    };

    if status == TenderStatus::Open {
        if let Some(bid) = bidding_date {
            let days_left = (bid - today).num_days();
            if (0..=CLOSING_SOON_WINDOW_DAYS).contains(&days_left) {
                return TenderStatus::ClosingSoon;
            }
        }
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(title: &str) -> RawTender {
        RawTender {
            source_id: "aomori-pref".into(),
            municipality: "青森県".into(),
            title: title.to_string(),
            contract_no: Some("2025-104".into()),
            announcement_date: NaiveDate::from_ymd_opt(2025, 3, 10),
            bidding_date: None,
            status_text: Some("公告中".into()),
            category_hint: None,
            description: None,
            link: "https://example.jp/t/104".into(),
            pdf_url: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()
    }

    #[test]
    fn same_row_normalizes_to_same_id() {
        let a = normalize(&raw("庁舎改修工事"), today()).unwrap();
        let b = normalize(&raw("庁舎改修工事"), today()).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.id, "aomori-pref-2025-104");
    }

    #[test]
    fn rows_without_announcement_date_are_dropped() {
        let mut r = raw("庁舎改修工事");
        r.announcement_date = None;
        assert!(normalize(&r, today()).is_none());
    }

    #[test]
    fn design_terms_win_over_construction_terms() {
        assert_eq!(
            infer_category("体育館新築工事基本設計業務", None),
            Category::DesignConsulting
        );
        assert_eq!(infer_category("庁舎改修工事", None), Category::Construction);
        assert_eq!(infer_category("複合機賃貸借", None), Category::Other);
    }

    #[test]
    fn explicit_hint_beats_title_heuristics() {
        assert_eq!(
            infer_category("その他業務", Some("建設工事")),
            Category::Construction
        );
        assert_eq!(
            infer_category("その他業務", Some("測量・建設コンサルタント等")),
            Category::DesignConsulting
        );
    }

    #[test]
    fn status_text_mapping() {
        assert_eq!(
            resolve_status(Some("落札者決定"), None, today()),
            TenderStatus::Awarded
        );
        assert_eq!(
            resolve_status(Some("受付終了"), None, today()),
            TenderStatus::Closed
        );
        assert_eq!(
            resolve_status(Some("公告中"), None, today()),
            TenderStatus::Open
        );
        assert_eq!(resolve_status(None, None, today()), TenderStatus::Unknown);
    }

    #[test]
    fn imminent_bidding_date_becomes_closing_soon() {
        let bid = NaiveDate::from_ymd_opt(2025, 3, 14);
        assert_eq!(
            resolve_status(Some("公告中"), bid, today()),
            TenderStatus::ClosingSoon
        );
        let far = NaiveDate::from_ymd_opt(2025, 4, 14);
        assert_eq!(
            resolve_status(Some("公告中"), far, today()),
            TenderStatus::Open
        );
        // Already past: the source text stands.
        let past = NaiveDate::from_ymd_opt(2025, 3, 1);
        assert_eq!(
            resolve_status(Some("公告中"), past, today()),
            TenderStatus::Open
        );
    }
}
