use std::fmt;
use url::Url;

/// Name of the query parameter that selects the result page
pub const PAGE_PARAM: &str = "page";

/// Value of one query parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    /// Parameter that appears once
    Single(String),
    /// Parameter that appears several times, in order
    Multi(Vec<String>),
}

impl QueryValue {
    /// First value of the parameter
    pub fn first(&self) -> Option<&str> {
        match self {
            QueryValue::Single(v) => Some(v.as_str()),
            QueryValue::Multi(values) => values.first().map(String::as_str),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            QueryValue::Single(existing) => {
                let first = std::mem::take(existing);
                *self = QueryValue::Multi(vec![first, value]);
            }
            QueryValue::Multi(values) => values.push(value),
        }
    }
}

/// A backend search target: scheme, host and path plus ordered query parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: String,
    query: Vec<(String, QueryValue)>,
}

impl Endpoint {
    /// Create an endpoint without query parameters
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            query: Vec::new(),
        }
    }

    /// Append a query parameter; a repeated key turns into a multi-value
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.query.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => existing.push(value),
            None => self.query.push((key, QueryValue::Single(value))),
        }
        self
    }

    /// Scheme, host and path without the query string
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Query parameters in their original order
    pub fn params(&self) -> &[(String, QueryValue)] {
        &self.query
    }

    /// Look up a query parameter
    pub fn param(&self, key: &str) -> Option<&QueryValue> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Page number carried by the endpoint, if it parses
    pub fn page(&self) -> Option<u32> {
        self.param(PAGE_PARAM)
            .and_then(QueryValue::first)
            .and_then(|v| v.trim().parse().ok())
    }

    /// Same endpoint pointing at page `page`; every other parameter is kept as is
    pub fn with_page(&self, page: u32) -> Endpoint {
        let mut next = self.clone();
        let value = QueryValue::Single(page.to_string());
        match next.query.iter_mut().find(|(k, _)| k == PAGE_PARAM) {
            Some((_, existing)) => *existing = value,
            None => next.query.push((PAGE_PARAM.to_string(), value)),
        }
        next
    }

    /// Parse a fully rendered URL back into an endpoint
    pub fn parse(input: &str) -> Result<Endpoint, url::ParseError> {
        let mut url = Url::parse(input)?;
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.set_query(None);
        url.set_fragment(None);

        let mut endpoint = Endpoint::new(url.to_string());
        for (key, value) in pairs {
            endpoint = endpoint.with_param(key, value);
        }
        Ok(endpoint)
    }

    /// Search term or slug-like tail of the path, used to name output files
    pub fn label(&self) -> String {
        if let Some(term) = self.param("q").and_then(QueryValue::first) {
            return term.to_string();
        }
        self.base
            .trim_end_matches('/')
            .rsplit('/')
            .find(|segment| !segment.is_empty() && *segment != "search")
            .unwrap_or("listing")
            .to_string()
    }

    fn render_query(&self) -> String {
        let mut pairs = Vec::new();
        for (key, value) in &self.query {
            let key = urlencoding::encode(key);
            match value {
                QueryValue::Single(v) => pairs.push(format!("{}={}", key, urlencoding::encode(v))),
                QueryValue::Multi(values) => {
                    for v in values {
                        pairs.push(format!("{}={}", key, urlencoding::encode(v)));
                    }
                }
            }
        }
        pairs.join("&")
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.query.is_empty() {
            write!(f, "{}", self.base)
        } else {
            write!(f, "{}?{}", self.base, self.render_query())
        }
    }
}
