//! Product record extraction.
//!
//! Every field is read from a few well-known paths first; brand, category and
//! sub-categories fall back to a breadth-first search of the whole product
//! node. Extraction never fails: a missing field becomes an empty string or
//! `None`.

pub mod lookup;
pub mod pricing;


use crate::config::SiteConfig;
use crate::results::ProductRecord;
use lookup::{deep_fill_strings, deep_find_first, non_blank, number_at, product_id, truthy_text};
use serde_json::Value;

/// Name fields of a brand object, in order of preference
const BRAND_NAME_KEYS: [&str; 5] = ["title_fa", "title_en", "title", "name_fa", "name"];

/// Keys the brand may hide under anywhere in the node
const BRAND_KEYS: [&str; 5] = ["brand", "brand_title", "brand_name", "brand_fa", "brand_en"];

/// Keys the category may hide under anywhere in the node
const CATEGORY_KEYS: [&str; 4] = ["category", "category_title", "cat_title_fa", "cat_name"];

/// Sub-category levels 2 to 5
pub const SUB_CATEGORY_KEYS: [&str; 4] = [
    "item_category2",
    "item_category3",
    "item_category4",
    "item_category5",
];

/// Flatten one raw product node
pub fn extract(node: &Value, site: &SiteConfig) -> ProductRecord {
    let id = product_id(node).unwrap_or_default();

    ProductRecord {
        url: product_url(&id, &site.site_root),
        id,
        title: title(node),
        brand: brand(node),
        category: category(node),
        sub_categories: sub_categories(node),
        rating_average: number_at(node, "rating.rate"),
        rating_count: number_at(node, "rating.count"),
        selling_price: pricing::selling_price(node),
        rrp_price: pricing::rrp_price(node),
        is_promotion: pricing::is_promotion(node),
        discount_percent: pricing::discount_percent(node),
    }
}

/// Canonical product page for an identifier
pub fn product_url(id: &str, site_root: &str) -> String {
    let id = id.trim();
    if id.is_empty() {
        return String::new();
    }
    format!("{}/product/dkp-{}", site_root.trim_end_matches('/'), id)
}

pub fn title(node: &Value) -> String {
    ["title_fa", "title"]
        .iter()
        .filter_map(|key| node.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

pub fn brand(node: &Value) -> String {
    match node.get("brand") {
        Some(Value::String(s)) if !s.trim().is_empty() => return s.trim().to_string(),
        Some(obj @ Value::Object(_)) => {
            if let Some(name) = preferred_name(obj) {
                return name;
            }
        }
        _ => {}
    }

    match deep_find_first(node, &BRAND_KEYS) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(obj @ Value::Object(_)) => preferred_name(obj).unwrap_or_default(),
        _ => String::new(),
    }
}

fn preferred_name(obj: &Value) -> Option<String> {
    BRAND_NAME_KEYS
        .iter()
        .find_map(|key| obj.get(*key).and_then(non_blank))
        .map(str::to_string)
}

pub fn category(node: &Value) -> String {
    let direct = node.get("category");
    if let Some(text) = direct.and_then(non_blank) {
        return text.to_string();
    }

    let mut code = None;
    let mut name = None;
    if let Some(obj @ Value::Object(_)) = direct {
        code = obj.get("code").and_then(truthy_text);
        name = category_name(obj);
    }
    if code.is_none() || name.is_none() {
        if let Some(first @ Value::Object(_)) = node.get("categories").and_then(|c| c.get(0)) {
            code = code.or_else(|| first.get("code").and_then(truthy_text));
            name = name.or_else(|| category_name(first));
        }
    }
    if code.is_some() || name.is_some() {
        return format!(
            "[{},{}]",
            code.unwrap_or_default(),
            name.as_deref().map(str::trim).unwrap_or_default()
        );
    }

    deep_find_first(node, &CATEGORY_KEYS)
        .and_then(non_blank)
        .map(str::to_string)
        .unwrap_or_default()
}

fn category_name(obj: &Value) -> Option<String> {
    ["title_fa", "title"]
        .iter()
        .find_map(|key| obj.get(*key).and_then(truthy_text))
}

pub fn sub_categories(node: &Value) -> [String; 4] {
    let mut slots: [String; 4] = Default::default();
    if !node.is_object() {
        return slots;
    }

    for (slot, key) in slots.iter_mut().zip(SUB_CATEGORY_KEYS) {
        if let Some(text) = node.get(key).and_then(Value::as_str) {
            *slot = text.to_string();
        }
    }
    if slots.iter().any(String::is_empty) {
        deep_fill_strings(node, &SUB_CATEGORY_KEYS, &mut slots);
    }
    slots
}
