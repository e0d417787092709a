//! Response envelopes shared by every HTTP implementation.

use domains::{FieldError, Page};
use serde::Serialize;

/// Page-numbered listing envelope.
#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub count: u64,
    pub page: u32,
    pub num_pages: u32,
    pub next: Option<u32>,
    pub previous: Option<u32>,
    pub results: Vec<T>,
}

impl<T> From<Page<T>> for PageResponse<T> {
    fn from(page: Page<T>) -> Self {
        Self {
            count: page.total,
            page: page.request.page,
            num_pages: page.num_pages(),
            next: page.next(),
            previous: page.previous(),
            results: page.items,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable kind, e.g. `not_found`
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::PageRequest;

    #[test]
    fn test_middle_page_links_both_ways() {
        let page = Page {
            items: vec![4, 5, 6],
            total: 9,
            request: PageRequest { page: 2, page_size: 3 },
        };
        let body = serde_json::to_value(PageResponse::from(page)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "count": 9,
                "page": 2,
                "num_pages": 3,
                "next": 3,
                "previous": 1,
                "results": [4, 5, 6],
            })
        );
    }

    #[test]
    fn test_empty_listing_is_one_page() {
        let page: Page<i32> = Page {
            items: vec![],
            total: 0,
            request: PageRequest::first(10),
        };
        let body = PageResponse::from(page);
        assert_eq!(body.num_pages, 1);
        assert_eq!(body.next, None);
        assert_eq!(body.previous, None);
    }

    #[test]
    fn test_error_body_omits_empty_fields() {
        let body = ErrorBody {
            error: "forbidden",
            message: "nope".into(),
            fields: vec![],
        };
        let json = serde_json::to_value(body).unwrap();
        assert!(json.get("fields").is_none());
    }
}
