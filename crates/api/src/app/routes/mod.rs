use axum::Router;

pub mod holds;
pub mod stock;

pub fn router() -> Router {
    Router::new().merge(stock::router()).merge(holds::router())
}
