use super::lookup::{at, number_at, present};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Badge titles that mark a promotion; the Latin marker ignores case
static PROMOTION_BADGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("شگفت|تخفیف|(?i:incredible)").expect("promotion badge pattern should be valid")
});

const SELLING_PRICE_PATHS: [&str; 4] = [
    "price.selling_price",
    "default_variant.price.selling_price",
    "variants.0.price.selling_price",
    "summary.price.selling_price",
];

const RRP_PRICE_PATHS: [&str; 4] = [
    "price.rrp_price",
    "default_variant.price.rrp_price",
    "summary.price.rrp_price",
    "price_history.min_last_30d",
];

const DISCOUNT_PATHS: [&str; 3] = [
    "price.discount_percent",
    "default_variant.price.discount_percent",
    "summary.price.discount_percent",
];

// `price.original_price` is consulted only after `price.rrp_price`, and the
// variant pair only after both.
const ORIGINAL_PRICE_PATHS: [&str; 5] = [
    "price.rrp_price",
    "price.original_price",
    "default_variant.price.rrp_price",
    "default_variant.price.original_price",
    "summary.price.rrp_price",
];

const PROMOTION_FLAG_PATHS: [&str; 4] = [
    "is_incredible",
    "is_promotion",
    "price.is_promotion",
    "default_variant.price.is_promotion",
];

/// Current selling price
pub fn selling_price(node: &Value) -> Option<f64> {
    first_number(node, &SELLING_PRICE_PATHS).or_else(|| number_at(node, "min_price"))
}

/// Recommended or original price
pub fn rrp_price(node: &Value) -> Option<f64> {
    first_number(node, &RRP_PRICE_PATHS)
}

/// Whether the product is on promotion
pub fn is_promotion(node: &Value) -> bool {
    if PROMOTION_FLAG_PATHS
        .iter()
        .any(|path| at(node, path) == Some(&Value::Bool(true)))
    {
        return true;
    }

    match at(node, "badges") {
        Some(Value::Array(badges)) => badges.iter().any(|badge| {
            badge
                .get("title")
                .and_then(Value::as_str)
                .is_some_and(|title| PROMOTION_BADGE.is_match(title))
        }),
        _ => false,
    }
}

/// Discount in percent, as reported or derived from the two prices
pub fn discount_percent(node: &Value) -> Option<f64> {
    if let Some(reported) = DISCOUNT_PATHS
        .iter()
        .filter_map(|path| number_at(node, path))
        .find(|value| *value > 0.0)
    {
        return Some(reported);
    }

    let selling = selling_price(node)?;
    let original = ORIGINAL_PRICE_PATHS
        .iter()
        .filter_map(|path| number_at(node, path))
        .find(|value| *value > selling)?;

    Some(round_to_tenth((original - selling) / original * 100.0))
}

fn first_number(node: &Value, paths: &[&str]) -> Option<f64> {
    // The first present value decides, even when it is not numeric.
    paths
        .iter()
        .find_map(|path| present(node, path))
        .and_then(super::lookup::as_number)
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
