use serde::Serialize;

// ============================================================================
// Response Envelopes
// ============================================================================
//
// Success:    { "success": true, "data": ..., "message": ... }
// Paginated:  { "success": true, "data": [...], "meta": { ... } }
// Error:      { "success": false, "error": ..., "error_code": ..., "message": ..., "details": [...] }
//
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub success: bool,
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, total: i64, limit: i64, offset: i64) -> Self {
        Self {
            success: true,
            data,
            meta: PageMeta::new(total, limit, offset),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageMeta {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub page_size: i64,
}

impl PageMeta {
    /// Pages are 1-based; an empty result still reports one page.
    pub fn new(total: i64, limit: i64, offset: i64) -> Self {
        if limit <= 0 {
            return Self {
                current_page: 1,
                total_pages: 1,
                total_items: total,
                page_size: limit,
            };
        }

        let total_pages = ((total + limit - 1) / limit).max(1);
        Self {
            current_page: offset / limit + 1,
            total_pages,
            total_items: total,
            page_size: limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_code: &'static str,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}
