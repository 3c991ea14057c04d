//! `stockgate-reservations` — time-bounded soft holds per product.
//!
//! Pure domain: the reservation set state machine with TTL sweep and
//! idempotent operations. The per-product mailbox that serializes access to
//! a set lives in `stockgate-infra`.

pub mod set;

pub use set::{
    AllView, AnnotatedReservation, CleanupOutcome, DEFAULT_TTL_MINUTES, MAX_TTL_MINUTES,
    MIN_TTL_MINUTES, ReduceOutcome, ReleaseOutcome, ReservationSet, ReserveOutcome, SelectionKey,
    SoftReservation, StatusView,
};
