//! Soft-reservation set: ordered, TTL-bounded holds keyed by order id.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use stockgate_core::{DomainError, DomainResult, OrderId};

/// TTL bounds for a hold, in minutes.
pub const MIN_TTL_MINUTES: i64 = 1;
pub const MAX_TTL_MINUTES: i64 = 60;
pub const DEFAULT_TTL_MINUTES: i64 = 15;

/// A time-bounded, advisory hold on quantity for a product. Does not
/// decrement warehouse stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftReservation {
    pub order_id: OrderId,
    pub quantity: i64,
    pub expires_at: DateTime<Utc>,
}

impl SoftReservation {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Selects which hold(s) a release/reduce touches: by idempotency key, or by
/// plain quantity (the backward-compatibility fallback, consumed
/// oldest-first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionKey {
    ByOrder(OrderId),
    ByQuantity(i64),
}

impl SelectionKey {
    fn validate(&self) -> DomainResult<()> {
        match self {
            SelectionKey::ByOrder(_) => Ok(()),
            SelectionKey::ByQuantity(q) if *q > 0 => Ok(()),
            SelectionKey::ByQuantity(_) => {
                Err(DomainError::validation("quantity must be positive"))
            }
        }
    }
}

/// Outcome of a reserve call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveOutcome {
    pub reserved: i64,
    pub total_reserved: i64,
    pub previous_reserved: i64,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of a release call. `released == 0` for an unknown order id:
/// releasing twice is success, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseOutcome {
    pub released: i64,
    pub total_reserved: i64,
    pub previous_reserved: i64,
}

/// Outcome of a reduce call (hold realized as a permanent ledger deduction).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReduceOutcome {
    pub reduced: i64,
    pub total_reserved: i64,
    pub previous_reserved: i64,
}

/// Active holds for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusView {
    pub reserved: i64,
    pub updated_at: DateTime<Utc>,
    pub reservations: Vec<SoftReservation>,
}

/// Outcome of an explicit sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupOutcome {
    pub cleaned: usize,
    pub total_reserved: i64,
}

/// Diagnostic row: one hold, annotated with expiry state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedReservation {
    pub order_id: OrderId,
    pub quantity: i64,
    pub expires_at: DateTime<Utc>,
    pub is_expired: bool,
    pub expires_in_seconds: i64,
}

/// Diagnostic view including expired entries that a sweep would purge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllView {
    pub reservations: Vec<AnnotatedReservation>,
    pub total_reserved: i64,
    pub expired_reserved: i64,
    pub active_count: usize,
    pub expired_count: usize,
}

/// Ordered set of soft reservations for one product.
///
/// At most one entry per order id; re-reserving overwrites that entry's
/// quantity and expiry in place. Entry order is insertion order, which is
/// what the release-by-quantity fallback consumes oldest-first.
///
/// The owning actor runs [`sweep`] before every operation other than the
/// sweep itself, so the mutating operations here may assume an already-swept
/// set. No operation partially applies.
///
/// [`sweep`]: ReservationSet::sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationSet {
    entries: Vec<SoftReservation>,
    updated_at: DateTime<Utc>,
}

impl ReservationSet {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            entries: Vec::new(),
            updated_at: now,
        }
    }

    /// Rehydrate from durable storage.
    pub fn from_entries(entries: Vec<SoftReservation>, updated_at: DateTime<Utc>) -> Self {
        Self {
            entries,
            updated_at,
        }
    }

    pub fn entries(&self) -> &[SoftReservation] {
        &self.entries
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Sum of all held quantities. Meaningful after a sweep.
    pub fn total_reserved(&self) -> i64 {
        self.entries.iter().map(|r| r.quantity).sum()
    }

    /// Purge entries past their expiry. Returns how many were dropped;
    /// abandoned holds return to the effective pool here, without any
    /// release call from the original caller.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|r| !r.is_expired(now));
        let cleaned = before - self.entries.len();
        if cleaned > 0 {
            self.updated_at = now;
        }
        cleaned
    }

    /// Create or overwrite the hold for `order_id`. Last writer wins for an
    /// order: the new quantity replaces (not adds to) the previous one.
    pub fn reserve(
        &mut self,
        order_id: OrderId,
        quantity: i64,
        ttl_minutes: Option<i64>,
        now: DateTime<Utc>,
    ) -> DomainResult<ReserveOutcome> {
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        let ttl = ttl_minutes.unwrap_or(DEFAULT_TTL_MINUTES);
        if !(MIN_TTL_MINUTES..=MAX_TTL_MINUTES).contains(&ttl) {
            return Err(DomainError::validation(format!(
                "ttl must be between {MIN_TTL_MINUTES} and {MAX_TTL_MINUTES} minutes"
            )));
        }

        let previous_reserved = self.total_reserved();
        let expires_at = now + Duration::minutes(ttl);

        match self.entries.iter_mut().find(|r| r.order_id == order_id) {
            Some(existing) => {
                existing.quantity = quantity;
                existing.expires_at = expires_at;
            }
            None => self.entries.push(SoftReservation {
                order_id,
                quantity,
                expires_at,
            }),
        }
        self.updated_at = now;

        Ok(ReserveOutcome {
            reserved: quantity,
            total_reserved: self.total_reserved(),
            previous_reserved,
            expires_at,
        })
    }

    /// Drop hold(s). By order id: wholesale, idempotent. By quantity:
    /// oldest-first, splitting the last entry touched; fails with a conflict
    /// if the amount exceeds the active total (state untouched).
    pub fn release(
        &mut self,
        key: SelectionKey,
        now: DateTime<Utc>,
    ) -> DomainResult<ReleaseOutcome> {
        key.validate()?;
        let previous_reserved = self.total_reserved();

        let released = match key {
            SelectionKey::ByOrder(order_id) => self.take_order(&order_id, now),
            SelectionKey::ByQuantity(amount) => {
                if amount > previous_reserved {
                    return Err(DomainError::conflict(format!(
                        "cannot release {amount}: only {previous_reserved} reserved"
                    )));
                }
                self.take_quantity(amount, now);
                amount
            }
        };

        Ok(ReleaseOutcome {
            released,
            total_reserved: self.total_reserved(),
            previous_reserved,
        })
    }

    /// Same selection semantics as release, but models "hold converted into
    /// a permanent commitment". The caller is expected to deduct the ledger
    /// separately.
    pub fn reduce(&mut self, key: SelectionKey, now: DateTime<Utc>) -> DomainResult<ReduceOutcome> {
        key.validate()?;
        let previous_reserved = self.total_reserved();

        let reduced = match key {
            SelectionKey::ByOrder(order_id) => self.take_order(&order_id, now),
            SelectionKey::ByQuantity(amount) => {
                if amount > previous_reserved {
                    return Err(DomainError::conflict(format!(
                        "cannot reduce {amount}: only {previous_reserved} reserved"
                    )));
                }
                self.take_quantity(amount, now);
                amount
            }
        };

        Ok(ReduceOutcome {
            reduced,
            total_reserved: self.total_reserved(),
            previous_reserved,
        })
    }

    /// Active holds (assumes a sweep ran).
    pub fn status(&self) -> StatusView {
        StatusView {
            reserved: self.total_reserved(),
            updated_at: self.updated_at,
            reservations: self.entries.clone(),
        }
    }

    /// Diagnostic view. Does NOT purge: expired entries are reported
    /// annotated, which is the whole point of this endpoint.
    pub fn all(&self, now: DateTime<Utc>) -> AllView {
        let reservations: Vec<AnnotatedReservation> = self
            .entries
            .iter()
            .map(|r| AnnotatedReservation {
                order_id: r.order_id.clone(),
                quantity: r.quantity,
                expires_at: r.expires_at,
                is_expired: r.is_expired(now),
                expires_in_seconds: (r.expires_at - now).num_seconds().max(0),
            })
            .collect();

        let expired_reserved: i64 = reservations
            .iter()
            .filter(|r| r.is_expired)
            .map(|r| r.quantity)
            .sum();
        let expired_count = reservations.iter().filter(|r| r.is_expired).count();
        let total_reserved: i64 = reservations.iter().map(|r| r.quantity).sum();

        AllView {
            active_count: reservations.len() - expired_count,
            expired_count,
            expired_reserved,
            total_reserved,
            reservations,
        }
    }

    /// Remove the entry for an order. Returns its quantity, or 0 if absent.
    fn take_order(&mut self, order_id: &OrderId, now: DateTime<Utc>) -> i64 {
        match self.entries.iter().position(|r| &r.order_id == order_id) {
            Some(idx) => {
                let removed = self.entries.remove(idx);
                self.updated_at = now;
                removed.quantity
            }
            None => 0,
        }
    }

    /// Consume `amount` oldest-first. Callers must have checked that the
    /// total covers it.
    fn take_quantity(&mut self, amount: i64, now: DateTime<Utc>) {
        let mut remaining = amount;
        while remaining > 0 {
            let Some(head) = self.entries.first_mut() else {
                break;
            };
            if head.quantity > remaining {
                head.quantity -= remaining;
                remaining = 0;
            } else {
                remaining -= head.quantity;
                self.entries.remove(0);
            }
        }
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: &str) -> OrderId {
        OrderId::new(id).unwrap()
    }

    fn set_with(entries: &[(&str, i64, i64)], now: DateTime<Utc>) -> ReservationSet {
        // (order, quantity, ttl_minutes)
        let mut set = ReservationSet::new(now);
        for (id, qty, ttl) in entries {
            set.reserve(order(id), *qty, Some(*ttl), now).unwrap();
        }
        set
    }

    #[test]
    fn reserve_rejects_non_positive_quantity() {
        let now = Utc::now();
        let mut set = ReservationSet::new(now);
        assert!(set.reserve(order("o1"), 0, None, now).is_err());
        assert!(set.reserve(order("o1"), -3, None, now).is_err());
        assert!(set.entries().is_empty());
    }

    #[test]
    fn reserve_rejects_out_of_range_ttl() {
        let now = Utc::now();
        let mut set = ReservationSet::new(now);
        assert!(set.reserve(order("o1"), 1, Some(0), now).is_err());
        assert!(set.reserve(order("o1"), 1, Some(61), now).is_err());
        assert!(set.reserve(order("o1"), 1, Some(60), now).is_ok());
    }

    #[test]
    fn reserve_defaults_to_fifteen_minute_ttl() {
        let now = Utc::now();
        let mut set = ReservationSet::new(now);
        let outcome = set.reserve(order("o1"), 5, None, now).unwrap();
        assert_eq!(outcome.expires_at, now + Duration::minutes(15));
    }

    #[test]
    fn re_reserving_replaces_not_adds() {
        let now = Utc::now();
        let mut set = ReservationSet::new(now);
        set.reserve(order("o1"), 5, None, now).unwrap();
        let outcome = set.reserve(order("o1"), 8, None, now).unwrap();

        assert_eq!(outcome.previous_reserved, 5);
        assert_eq!(outcome.total_reserved, 8);
        assert_eq!(set.entries().len(), 1);
    }

    #[test]
    fn re_reserving_keeps_insertion_position() {
        let now = Utc::now();
        let mut set = set_with(&[("o1", 5, 15), ("o2", 3, 15)], now);
        set.reserve(order("o1"), 7, None, now).unwrap();

        assert_eq!(set.entries()[0].order_id, order("o1"));
        assert_eq!(set.entries()[0].quantity, 7);
    }

    #[test]
    fn sweep_purges_expired_entries() {
        let now = Utc::now();
        let mut set = set_with(&[("o1", 5, 1), ("o2", 3, 30)], now);

        let later = now + Duration::minutes(2);
        assert_eq!(set.sweep(later), 1);
        assert_eq!(set.total_reserved(), 3);
        // Idempotent.
        assert_eq!(set.sweep(later), 0);
    }

    #[test]
    fn entry_expires_exactly_at_its_deadline() {
        let now = Utc::now();
        let mut set = set_with(&[("o1", 5, 1)], now);
        let deadline = now + Duration::minutes(1);
        assert_eq!(set.sweep(deadline), 1);
    }

    #[test]
    fn release_by_order_is_idempotent() {
        let now = Utc::now();
        let mut set = set_with(&[("o1", 5, 15)], now);

        let first = set.release(SelectionKey::ByOrder(order("o1")), now).unwrap();
        assert_eq!(first.released, 5);
        assert_eq!(first.total_reserved, 0);

        let second = set.release(SelectionKey::ByOrder(order("o1")), now).unwrap();
        assert_eq!(second.released, 0);
        assert_eq!(second.previous_reserved, 0);
    }

    #[test]
    fn release_by_quantity_consumes_oldest_first_and_splits() {
        let now = Utc::now();
        let mut set = set_with(&[("o1", 4, 15), ("o2", 6, 15)], now);

        let outcome = set.release(SelectionKey::ByQuantity(7), now).unwrap();
        assert_eq!(outcome.released, 7);
        assert_eq!(outcome.total_reserved, 3);

        // o1 fully consumed, o2 split down to 3.
        assert_eq!(set.entries().len(), 1);
        assert_eq!(set.entries()[0].order_id, order("o2"));
        assert_eq!(set.entries()[0].quantity, 3);
    }

    #[test]
    fn release_by_quantity_beyond_total_is_a_conflict_and_leaves_state_untouched() {
        let now = Utc::now();
        let mut set = set_with(&[("o1", 4, 15)], now);

        let err = set.release(SelectionKey::ByQuantity(5), now).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(set.total_reserved(), 4);
        assert_eq!(set.entries().len(), 1);
    }

    #[test]
    fn release_by_non_positive_quantity_is_invalid() {
        let now = Utc::now();
        let mut set = set_with(&[("o1", 4, 15)], now);
        assert!(set.release(SelectionKey::ByQuantity(0), now).is_err());
        assert!(set.release(SelectionKey::ByQuantity(-1), now).is_err());
    }

    #[test]
    fn reduce_by_order_drops_the_hold() {
        let now = Utc::now();
        let mut set = set_with(&[("o1", 5, 15), ("o2", 2, 15)], now);

        let outcome = set.reduce(SelectionKey::ByOrder(order("o1")), now).unwrap();
        assert_eq!(outcome.reduced, 5);
        assert_eq!(outcome.total_reserved, 2);

        // Idempotent on unknown order.
        let again = set.reduce(SelectionKey::ByOrder(order("o1")), now).unwrap();
        assert_eq!(again.reduced, 0);
    }

    #[test]
    fn status_reports_active_entries_and_total() {
        let now = Utc::now();
        let mut set = set_with(&[("o1", 5, 15), ("o2", 2, 15)], now);
        set.sweep(now);

        let status = set.status();
        assert_eq!(status.reserved, 7);
        assert_eq!(status.reservations.len(), 2);
    }

    #[test]
    fn all_annotates_expired_entries_without_purging() {
        let now = Utc::now();
        let set = set_with(&[("o1", 5, 1), ("o2", 3, 30)], now);

        let later = now + Duration::minutes(5);
        let view = set.all(later);

        assert_eq!(view.total_reserved, 8);
        assert_eq!(view.expired_reserved, 5);
        assert_eq!(view.active_count, 1);
        assert_eq!(view.expired_count, 1);
        assert_eq!(set.entries().len(), 2);

        let expired = view.reservations.iter().find(|r| r.is_expired).unwrap();
        assert_eq!(expired.order_id, order("o1"));
        assert_eq!(expired.expires_in_seconds, 0);

        let active = view.reservations.iter().find(|r| !r.is_expired).unwrap();
        assert_eq!(active.expires_in_seconds, 25 * 60);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                ..ProptestConfig::default()
            })]

            /// Property: total reserved equals the sum of the individual
            /// entries after any sequence of distinct-order reserves.
            #[test]
            fn totals_match_entry_sums(quantities in proptest::collection::vec(1i64..1_000, 1..16)) {
                let now = Utc::now();
                let mut set = ReservationSet::new(now);
                for (i, qty) in quantities.iter().enumerate() {
                    set.reserve(order(&format!("o{i}")), *qty, None, now).unwrap();
                }
                prop_assert_eq!(set.total_reserved(), quantities.iter().sum::<i64>());
            }

            /// Property: a sweep never increases the total and never touches
            /// unexpired entries.
            #[test]
            fn sweep_only_removes_expired(
                quantities in proptest::collection::vec((1i64..100, 1i64..60), 0..12),
                elapsed in 0i64..120,
            ) {
                let now = Utc::now();
                let mut set = ReservationSet::new(now);
                for (i, (qty, ttl)) in quantities.iter().enumerate() {
                    set.reserve(order(&format!("o{i}")), *qty, Some(*ttl), now).unwrap();
                }

                let later = now + Duration::minutes(elapsed);
                let expected: i64 = quantities
                    .iter()
                    .filter(|(_, ttl)| *ttl > elapsed)
                    .map(|(qty, _)| *qty)
                    .sum();

                set.sweep(later);
                prop_assert_eq!(set.total_reserved(), expected);
            }

            /// Property: release-by-quantity removes exactly the requested
            /// amount when it is covered.
            #[test]
            fn release_by_quantity_is_exact(
                quantities in proptest::collection::vec(1i64..100, 1..10),
                release_fraction in 0.0f64..1.0,
            ) {
                let now = Utc::now();
                let mut set = ReservationSet::new(now);
                for (i, qty) in quantities.iter().enumerate() {
                    set.reserve(order(&format!("o{i}")), *qty, None, now).unwrap();
                }

                let total: i64 = quantities.iter().sum();
                let amount = ((total as f64) * release_fraction) as i64;
                prop_assume!(amount > 0);

                let outcome = set.release(SelectionKey::ByQuantity(amount), now).unwrap();
                prop_assert_eq!(outcome.released, amount);
                prop_assert_eq!(set.total_reserved(), total - amount);
            }
        }
    }
}
