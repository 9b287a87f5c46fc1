//! Response envelope shared by every endpoint.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::db::query::Page;

/// `{ success, data?, message?, errors?, pagination? }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            pagination: None,
            status: StatusCode::OK,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }

    pub fn paginated(data: T, pagination: Pagination) -> Self {
        Self {
            pagination: Some(pagination),
            ..Self::ok(data)
        }
    }

    /// 201 for successful creation.
    pub fn created(mut self) -> Self {
        self.status = StatusCode::CREATED;
        self
    }
}

impl ApiResponse<serde_json::Value> {
    /// Message-only body (deletes, deactivations).
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            errors: None,
            pagination: None,
            status: StatusCode::OK,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(&self)).into_response()
    }
}

/// Exact pagination metadata computed from the count query's total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub limit: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(total: i64, page: &Page) -> Self {
        let limit = page.limit();
        let total_pages = if total == 0 { 0 } else { (total + limit - 1) / limit };
        let current_page = page.current_page();
        Self {
            total,
            total_pages,
            current_page,
            limit,
            has_next: current_page < total_pages,
            has_prev: current_page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(current: i64, limit: i64) -> Page {
        Page::new(Some(current), Some(limit), Page::DEFAULT_LIMIT)
    }

    #[test]
    fn total_pages_is_ceiling_division() {
        assert_eq!(Pagination::new(25, &page(1, 10)).total_pages, 3);
        assert_eq!(Pagination::new(30, &page(1, 10)).total_pages, 3);
        assert_eq!(Pagination::new(31, &page(1, 10)).total_pages, 4);
        assert_eq!(Pagination::new(0, &page(1, 10)).total_pages, 0);
    }

    #[test]
    fn boundary_flags() {
        let first = Pagination::new(25, &page(1, 10));
        assert!(first.has_next);
        assert!(!first.has_prev);

        let middle = Pagination::new(25, &page(2, 10));
        assert!(middle.has_next);
        assert!(middle.has_prev);

        let last = Pagination::new(25, &page(3, 10));
        assert!(!last.has_next);
        assert!(last.has_prev);

        let empty = Pagination::new(0, &page(1, 10));
        assert!(!empty.has_next);
        assert!(!empty.has_prev);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(Pagination::new(25, &page(2, 10))).unwrap();
        assert_eq!(json["totalPages"], 3);
        assert_eq!(json["currentPage"], 2);
        assert_eq!(json["hasNext"], true);
        assert_eq!(json["hasPrev"], true);
        assert_eq!(json["total"], 25);
        assert_eq!(json["limit"], 10);
    }

    #[test]
    fn envelope_suppresses_absent_fields() {
        let json = serde_json::to_value(&ApiResponse::ok(serde_json::json!({"id": 1}))).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["id"], 1);
        assert!(json.get("message").is_none());
        assert!(json.get("errors").is_none());
        assert!(json.get("pagination").is_none());
    }

    #[tokio::test]
    async fn created_sets_201() {
        let response = ApiResponse::ok(serde_json::json!({"id": 1}))
            .created()
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn message_only_body_is_200() {
        let response = ApiResponse::message("Patient profile deleted successfully").into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
