//! Core domain model for the nyusatsu tender aggregation pipeline.

pub mod jdate;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const CRATE_NAME: &str = "nyusatsu-core";

/// Work category a tender falls into after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "construction")]
    Construction,
    #[serde(rename = "design-consulting")]
    DesignConsulting,
    #[serde(rename = "other")]
    Other,
}

/// Lifecycle status of a tender, ordered by finality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TenderStatus {
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "closing-soon")]
    ClosingSoon,
    #[serde(rename = "closed")]
    Closed,
    #[serde(rename = "awarded")]
    Awarded,
}

impl TenderStatus {
    /// Rank under the finality order. A merge may only move status upward.
    pub fn finality(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Open => 1,
            Self::ClosingSoon => 2,
            Self::Closed => 3,
            Self::Awarded => 4,
        }
    }

    pub fn is_more_final_than(self, other: Self) -> bool {
        self.finality() > other.finality()
    }
}

impl Default for TenderStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Canonical persisted tender record.
///
/// Serialized as camelCase into the canonical store file; downstream viewers
/// consume that file read-only, so field names are part of the contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tender {
    pub id: String,
    pub municipality: String,
    pub title: String,
    pub category: Category,
    pub announcement_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bidding_date: Option<NaiveDate>,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub status: TenderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winning_contractor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_firm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub construction_period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_enriched: bool,
}

/// Portal-shaped row emitted by a source adapter before normalization.
///
/// Adapters resolve era-calendar date text into `NaiveDate` themselves (the
/// raw text shape is per-portal); everything else stays as scraped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTender {
    pub source_id: String,
    pub municipality: String,
    pub title: String,
    pub contract_no: Option<String>,
    pub announcement_date: Option<NaiveDate>,
    pub bidding_date: Option<NaiveDate>,
    pub status_text: Option<String>,
    pub category_hint: Option<String>,
    pub description: Option<String>,
    pub link: String,
    pub pdf_url: Option<String>,
}

/// Derive the stable record id for a raw row.
///
/// Prefers the source-native contract number; falls back to a content hash of
/// (source, title) so repeated scrapes of an unchanged listing agree.
pub fn derive_id(source_id: &str, contract_no: Option<&str>, title: &str) -> String {
    if let Some(no) = contract_no {
        let slug: String = no
            .trim()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect();
        let slug = slug.trim_matches('-');
        if !slug.is_empty() {
            return format!("{source_id}-{slug}");
        }
    }
    let mut hasher = Sha256::new();
    hasher.update(source_id.as_bytes());
    hasher.update(b":");
    hasher.update(title.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{source_id}-{}", &digest[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finality_order_matches_lifecycle() {
        assert!(TenderStatus::Open.is_more_final_than(TenderStatus::Unknown));
        assert!(TenderStatus::ClosingSoon.is_more_final_than(TenderStatus::Open));
        assert!(TenderStatus::Closed.is_more_final_than(TenderStatus::ClosingSoon));
        assert!(TenderStatus::Awarded.is_more_final_than(TenderStatus::Closed));
        assert!(!TenderStatus::Open.is_more_final_than(TenderStatus::Awarded));
        assert!(!TenderStatus::Open.is_more_final_than(TenderStatus::Open));
    }

    #[test]
    fn derive_id_prefers_contract_number() {
        let id = derive_id("aomori-pref", Some("第2025-104号"), "庁舎改修工事");
        assert_eq!(id, "aomori-pref-第2025-104号");
    }

    #[test]
    fn derive_id_hash_is_stable_without_contract_number() {
        let a = derive_id("aomori-pref", None, "庁舎改修工事");
        let b = derive_id("aomori-pref", None, "庁舎改修工事");
        assert_eq!(a, b);
        assert!(a.starts_with("aomori-pref-"));
        assert_eq!(a.len(), "aomori-pref-".len() + 16);
    }

    #[test]
    fn derive_id_blank_contract_number_falls_back_to_hash() {
        let id = derive_id("hachinohe-city", Some("  "), "体育館設計業務");
        let hashed = derive_id("hachinohe-city", None, "体育館設計業務");
        assert_eq!(id, hashed);
    }

    #[test]
    fn tender_serializes_camel_case_with_iso_dates() {
        let tender = Tender {
            id: "aomori-pref-1".into(),
            municipality: "青森県".into(),
            title: "庁舎改修工事".into(),
            category: Category::Construction,
            announcement_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            bidding_date: None,
            link: "https://example.jp/t/1".into(),
            pdf_url: None,
            status: TenderStatus::Open,
            winning_contractor: None,
            design_firm: None,
            estimated_price: None,
            construction_period: None,
            description: None,
            is_enriched: false,
        };
        let json = serde_json::to_value(&tender).unwrap();
        assert_eq!(json["announcementDate"], "2025-03-10");
        assert_eq!(json["status"], "open");
        assert_eq!(json["isEnriched"], false);
        assert!(json.get("biddingDate").is_none());
    }
}
