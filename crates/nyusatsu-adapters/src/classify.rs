//! Relevance classifier for tender titles.
//!
//! The portals mix building work with civil-engineering work in one listing;
//! only the former is in scope. A row is rejected only when an excluded
//! keyword matches and no relevant keyword does. A relevant match always
//! wins, so a building line item inside a road-maintenance title survives.

/// Building construction / design terms that keep a row.
const RELEVANT_KEYWORDS: &[&str] = &[
    "建築",
    "設計",
    "新築",
    "増築",
    "改築",
    "改修",
    "営繕",
    "耐震",
    "内装",
    "外壁",
    "屋上防水",
    "空調",
    "冷暖房",
    "電気設備",
    "機械設備",
    "給排水",
    "昇降機",
    "エレベーター",
];

/// Civil-engineering terms that drop a row when nothing relevant matches.
const EXCLUDED_KEYWORDS: &[&str] = &[
    "道路",
    "舗装",
    "橋梁",
    "橋りょう",
    "河川",
    "砂防",
    "治山",
    "護岸",
    "下水道",
    "水道管",
    "配水管",
    "送水管",
    "農道",
    "林道",
    "法面",
    "側溝",
    "用地測量",
    "地籍調査",
];

/// Accept or reject a row from its concatenated free text
/// (title + category hint + description, whichever are available).
pub fn accept(text: &str) -> bool {
    let excluded = EXCLUDED_KEYWORDS.iter().any(|kw| text.contains(kw));
    if !excluded {
        return true;
    }
    RELEVANT_KEYWORDS.iter().any(|kw| text.contains(kw))
}

/// Convenience for the adapter emit path.
pub fn accept_parts(title: &str, category_hint: Option<&str>, description: Option<&str>) -> bool {
    let mut text = title.to_string();
    if let Some(hint) = category_hint {
        text.push(' ');
        text.push_str(hint);
    }
    if let Some(desc) = description {
        text.push(' ');
        text.push_str(desc);
    }
    accept(&text)
}
