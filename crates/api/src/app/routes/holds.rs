use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};

use stockgate_core::{OrderId, ProductId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/products/:id/holds", post(place_hold))
        .route("/products/:id/holds", delete(release_hold))
        .route("/products/:id/holds", get(hold_status))
        .route("/products/:id/holds/commit", post(commit_hold))
        .route("/products/:id/holds/cleanup", post(cleanup_holds))
        .route("/products/:id/holds/all", get(inspect_holds))
}

fn parse_product(id: &str) -> Result<ProductId, axum::response::Response> {
    id.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"))
}

pub async fn place_hold(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::HoldRequest>,
) -> axum::response::Response {
    let product_id = match parse_product(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let order_id = match OrderId::new(body.order_id) {
        Ok(v) => v,
        Err(e) => return errors::engine_error_to_response(e.into()),
    };

    match services
        .hold(product_id, order_id, body.quantity, body.ttl_minutes)
        .await
    {
        Ok(outcome) => (StatusCode::CREATED, Json(outcome)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn release_hold(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::SelectionRequest>,
) -> axum::response::Response {
    let product_id = match parse_product(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let key = match body.selection_key() {
        Ok(v) => v,
        Err(e) => return errors::engine_error_to_response(e.into()),
    };

    match services.release_hold(product_id, key).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn commit_hold(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::SelectionRequest>,
) -> axum::response::Response {
    let product_id = match parse_product(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let key = match body.selection_key() {
        Ok(v) => v,
        Err(e) => return errors::engine_error_to_response(e.into()),
    };
    let preferred = match body.preferred_warehouse() {
        Ok(v) => v,
        Err(e) => return errors::engine_error_to_response(e.into()),
    };

    match services.commit_hold(product_id, key, preferred).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn hold_status(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match parse_product(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.hold_status(product_id).await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn cleanup_holds(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match parse_product(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.cleanup_holds(product_id).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn inspect_holds(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match parse_product(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.inspect_holds(product_id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}
