use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockgate_core::DomainError;
use stockgate_infra::EngineError;

pub fn engine_error_to_response(err: EngineError) -> axum::response::Response {
    match err {
        EngineError::Domain(e) => domain_error_to_response(e),
        EngineError::LedgerStore(e) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
        EngineError::ReservationStore(e) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
        EngineError::ActorUnavailable => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "actor_unavailable",
            "reservation actor unavailable",
        ),
    }
}

fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::InsufficientStock(figures) => {
            // Full figures so callers can render a precise message.
            let message = DomainError::InsufficientStock(figures).to_string();
            (
                StatusCode::CONFLICT,
                axum::Json(json!({
                    "error": "insufficient_stock",
                    "message": message,
                    "requested": figures.requested,
                    "available": figures.available,
                    "total": figures.total,
                    "reserved": figures.reserved,
                    "applied": figures.applied,
                })),
            )
                .into_response()
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
