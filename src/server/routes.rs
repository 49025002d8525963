use crate::engine::RaidEngine;
use crate::server::api::{self, ApiError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status_code: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl HttpResponse {
    fn json(body: String) -> Self {
        Self {
            status_code: 200,
            content_type: "application/json",
            body,
        }
    }
}

/// Pure request dispatch. The SSE feed is the only route not served here; see
/// [`crate::server::run_server`].
pub fn route_request(engine: &RaidEngine, method: &str, path: &str, body: &str) -> HttpResponse {
    let path = path.split('?').next().unwrap_or_default();
    let segments: Vec<&str> = path
        .trim_start_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    let result = match (method, segments.as_slice()) {
        ("GET", ["api", "health"]) => api::health_payload(),
        ("GET", ["api", "catalog"]) => api::catalog_payload(engine),
        ("GET", ["api", "battles"]) => api::battles_list_payload(engine),
        ("POST", ["api", "battles"]) => api::battle_create_payload(engine, body),
        ("GET", ["api", "battles", id]) => api::battle_get_payload(engine, id),
        ("DELETE", ["api", "battles", id]) => api::battle_delete_payload(engine, id),
        ("POST", ["api", "battles", id, "answer"]) => api::answer_payload(engine, id, body),
        ("POST", ["api", "battles", id, "ability"]) => api::ability_payload(engine, id, body),
        ("POST", ["api", "battles", id, "end"]) => api::end_payload(engine, id, body),
        (_, ["api", "battles", ..]) | (_, ["api", "health" | "catalog"]) => {
            return error_response(405, "Method not allowed");
        }
        _ => return error_response(404, "Route not found"),
    };

    match result {
        Ok(payload) => HttpResponse::json(payload),
        Err(ApiError::Validation(validation)) => {
            validation_error_response(400, validation)
        }
        Err(err @ (ApiError::Parse(_) | ApiError::BadRequest(_))) => {
            error_response(400, &err.to_string())
        }
        Err(err @ ApiError::NotFound(_)) => error_response(404, &err.to_string()),
        Err(err @ ApiError::Engine(_)) => {
            tracing::error!(%method, %path, %err, "request failed");
            error_response(500, &err.to_string())
        }
    }
}

fn validation_error_response(
    status_code: u16,
    payload: api::ValidationErrorResponse,
) -> HttpResponse {
    let fallback =
        "{\n  \"status\": \"error\",\n  \"message\": \"Validation failed\"\n}".to_string();

    HttpResponse {
        status_code,
        content_type: "application/json",
        body: serde_json::to_string_pretty(&payload).unwrap_or(fallback),
    }
}

pub(crate) fn error_response(status_code: u16, message: &str) -> HttpResponse {
    HttpResponse {
        status_code,
        content_type: "application/json",
        body: format!(
            "{{\n  \"status\": \"error\",\n  \"message\": {}\n}}",
            serde_json::to_string(message).unwrap_or_else(|_| "\"Unknown error\"".to_string())
        ),
    }
}
