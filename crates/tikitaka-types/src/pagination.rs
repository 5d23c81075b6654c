use serde::Serialize;

/// Upper bound applied to every `limit` query parameter.
pub const MAX_PAGE_SIZE: i64 = 50;

/// Resolved `page` / `limit` pair for a paginated listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    /// Lenient parse of raw query values: missing, malformed or
    /// non-positive values fall back to page 1 / `default_limit`, and the
    /// limit is clamped to [`MAX_PAGE_SIZE`].
    pub fn from_query(page: Option<&str>, limit: Option<&str>, default_limit: i64) -> Self {
        let page = parse_positive(page).unwrap_or(1);
        let limit = parse_positive(limit)
            .unwrap_or(default_limit)
            .min(MAX_PAGE_SIZE);
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Pagination block for listings that do not count their total:
    /// a full page implies there may be more.
    pub fn info(&self, returned: usize) -> PageInfo {
        PageInfo {
            page: self.page,
            limit: self.limit,
            total: None,
            has_more: returned as i64 == self.limit,
        }
    }

    /// Pagination block for listings with a known total.
    pub fn info_with_total(&self, returned: usize, total: i64) -> PageInfo {
        PageInfo {
            page: self.page,
            limit: self.limit,
            total: Some(total),
            has_more: self.offset() + (returned as i64) < total,
        }
    }
}

/// Parse a positive integer, ignoring surrounding whitespace.
pub fn parse_positive(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok()).filter(|v| *v > 0)
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PageInfo {
    pub page: i64,
    pub limit: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}
