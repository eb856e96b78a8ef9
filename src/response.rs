use axum::http::StatusCode;
use serde::Serialize;

/// Success envelope shared by every handler.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: u16,
    pub message: String,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_items: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<i64>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        Self {
            status: status.as_u16(),
            message: status.canonical_reason().unwrap_or_default().to_string(),
            data: Some(data),
            page: None,
            limit: None,
            total_items: None,
            total_pages: None,
        }
    }

    pub fn paginated(data: T, page: i64, limit: i64, total_items: i64) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
            total_items: Some(total_items),
            total_pages: Some(total_pages(total_items, limit)),
            ..Self::new(StatusCode::OK, data)
        }
    }
}

pub fn total_pages(total_items: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total_items + limit - 1) / limit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
    }

    #[test]
    fn plain_envelope_omits_pagination_fields() {
        let json = serde_json::to_value(ApiResponse::new(StatusCode::CREATED, "x")).unwrap();
        assert_eq!(json["status"], 201);
        assert_eq!(json["message"], "Created");
        assert_eq!(json["data"], "x");
        assert!(json.get("page").is_none());
        assert!(json.get("total_pages").is_none());
    }

    #[test]
    fn paginated_envelope_carries_totals() {
        let json = serde_json::to_value(ApiResponse::paginated(vec![1, 2], 2, 2, 5)).unwrap();
        assert_eq!(json["page"], 2);
        assert_eq!(json["limit"], 2);
        assert_eq!(json["total_items"], 5);
        assert_eq!(json["total_pages"], 3);
    }
}
