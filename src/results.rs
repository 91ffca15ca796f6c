use serde::{Deserialize, Serialize};

/// Column headers of the exported table, in output order
pub const COLUMNS: [&str; 15] = [
    "id",
    "title_fa",
    "brand",
    "category",
    "item_category2",
    "item_category3",
    "item_category4",
    "item_category5",
    "uri",
    "rating.rate",
    "rating.count",
    "selling_price",
    "rrp_price",
    "is_promotion",
    "discount_percent",
];

/// One flattened product row
///
/// Every field is always present; missing source data shows up as an empty
/// string or `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Product identifier as text
    pub id: String,

    /// Display title
    pub title: String,

    pub brand: String,

    /// Plain category text or a `[code,name]` pair
    pub category: String,

    /// `item_category2` .. `item_category5`
    pub sub_categories: [String; 4],

    /// Canonical product page link
    pub url: String,

    pub rating_average: Option<f64>,

    pub rating_count: Option<f64>,

    pub selling_price: Option<f64>,

    /// Recommended or original price
    pub rrp_price: Option<f64>,

    pub is_promotion: bool,

    pub discount_percent: Option<f64>,
}

impl ProductRecord {
    /// Render the record as cells matching [`COLUMNS`]
    pub fn to_row(&self) -> Vec<String> {
        let [c2, c3, c4, c5] = &self.sub_categories;
        vec![
            self.id.clone(),
            self.title.clone(),
            self.brand.clone(),
            self.category.clone(),
            c2.clone(),
            c3.clone(),
            c4.clone(),
            c5.clone(),
            self.url.clone(),
            format_number(self.rating_average),
            format_number(self.rating_count),
            format_number(self.selling_price),
            format_number(self.rrp_price),
            if self.is_promotion { "True" } else { "False" }.to_string(),
            format_decimal(self.discount_percent),
        ]
    }
}

/// Integral values print without a fraction, others as-is; `None` is empty
pub fn format_number(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{:.0}", v),
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

/// One decimal place; `None` is empty
pub fn format_decimal(value: Option<f64>) -> String {
    value.map(|v| format!("{:.1}", v)).unwrap_or_default()
}
