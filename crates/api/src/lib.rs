//! `stockgate-api` — HTTP/JSON binding of the fulfillment engine.
//!
//! Thin by design: routing, DTO validation, and error translation only.
//! All stock semantics live in `stockgate-infra`.

pub mod app;
