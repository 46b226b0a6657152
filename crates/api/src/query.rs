use serde::Deserialize;

/// Default page size for paginated listings.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Maximum page size for paginated listings.
pub const MAX_PAGE_SIZE: usize = 100;

/// Common pagination query parameters (`?page=2&page_size=25`).
#[derive(Debug, Deserialize, Default)]
pub struct PaginationParams {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl PaginationParams {
    /// 1-based page number; zero is clamped to the first page.
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size clamped to `1..=MAX_PAGE_SIZE`.
    pub fn page_size(&self) -> usize {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let params = PaginationParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.page_size(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn zero_page_clamps_to_first() {
        let params = PaginationParams {
            page: Some(0),
            page_size: Some(0),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.page_size(), 1);
    }

    #[test]
    fn oversized_page_size_is_capped() {
        let params = PaginationParams {
            page: None,
            page_size: Some(10_000),
        };
        assert_eq!(params.page_size(), MAX_PAGE_SIZE);
    }
}
