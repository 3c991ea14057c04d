use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};

use stockgate_core::{ProductId, WarehouseId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/products/:id/stock", get(get_stock))
        .route("/products/:id/stock", put(set_stock_default))
        .route("/products/:id/stock/:warehouse", put(set_stock))
        .route("/products/:id/stock/:warehouse", delete(remove_stock))
        .route("/products/:id/stock/reduce", post(reduce_stock))
        .route("/products/:id/stock/reserve", post(reserve_stock))
        .route("/products/:id/stock/release", post(release_stock))
        .route("/products/:id/warehouses", get(per_warehouse_stock))
        .route("/stock/batch", post(batch_stock))
}

fn parse_product(id: &str) -> Result<ProductId, axum::response::Response> {
    id.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"))
}

fn parse_warehouse(id: &str) -> Result<WarehouseId, axum::response::Response> {
    id.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid warehouse id")
    })
}

pub async fn get_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match parse_product(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.aggregate_stock(product_id).await {
        Ok(agg) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "product_id": product_id.to_string(),
                "quantity": agg.quantity,
                "reserved_quantity": agg.reserved_quantity,
                "available": agg.available,
            })),
        )
            .into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn set_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, warehouse)): Path<(String, String)>,
    Json(body): Json<dto::SetStockRequest>,
) -> axum::response::Response {
    let product_id = match parse_product(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let warehouse_id = match parse_warehouse(&warehouse) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.set_stock(product_id, Some(warehouse_id), body.quantity).await {
        Ok(row) => (StatusCode::OK, Json(row)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

/// Stock set without naming a warehouse: resolves to the product's sole
/// warehouse (or mints one for a new product).
pub async fn set_stock_default(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::StockChangeRequest>,
) -> axum::response::Response {
    let product_id = match parse_product(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let warehouse_id = match body.preferred_warehouse() {
        Ok(v) => v,
        Err(e) => return errors::engine_error_to_response(e.into()),
    };

    match services.set_stock(product_id, warehouse_id, body.quantity).await {
        Ok(row) => (StatusCode::OK, Json(row)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn remove_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, warehouse)): Path<(String, String)>,
) -> axum::response::Response {
    let product_id = match parse_product(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let warehouse_id = match parse_warehouse(&warehouse) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.remove_stock(product_id, warehouse_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn reduce_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::StockChangeRequest>,
) -> axum::response::Response {
    let product_id = match parse_product(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let preferred = match body.preferred_warehouse() {
        Ok(v) => v,
        Err(e) => return errors::engine_error_to_response(e.into()),
    };

    match services.reduce_stock(product_id, body.quantity, preferred).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn reserve_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::StockChangeRequest>,
) -> axum::response::Response {
    let product_id = match parse_product(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let preferred = match body.preferred_warehouse() {
        Ok(v) => v,
        Err(e) => return errors::engine_error_to_response(e.into()),
    };

    match services.reserve_stock(product_id, body.quantity, preferred).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn release_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::StockChangeRequest>,
) -> axum::response::Response {
    let product_id = match parse_product(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let preferred = match body.preferred_warehouse() {
        Ok(v) => v,
        Err(e) => return errors::engine_error_to_response(e.into()),
    };

    match services.release_stock(product_id, body.quantity, preferred).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn per_warehouse_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match parse_product(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.per_warehouse_stock(product_id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn batch_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::BatchStockRequest>,
) -> axum::response::Response {
    let mut product_ids = Vec::with_capacity(body.product_ids.len());
    for raw in &body.product_ids {
        match parse_product(raw) {
            Ok(v) => product_ids.push(v),
            Err(resp) => return resp,
        }
    }

    match services.available_stock_batch(&product_ids).await {
        Ok(batch) => {
            let items: Vec<serde_json::Value> = batch
                .into_iter()
                .map(|(product_id, available)| {
                    serde_json::json!({
                        "product_id": product_id.to_string(),
                        "available": available,
                    })
                })
                .collect();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => errors::engine_error_to_response(e),
    }
}
