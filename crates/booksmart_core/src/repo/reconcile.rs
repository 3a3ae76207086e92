//! Time-based state transitions applied before dependent reads.
//!
//! # Responsibility
//! - Deactivate library cards past their validity window.
//! - Expire open reservations past their return date.
//!
//! # Invariants
//! - A reconciler only moves records forward (active to inactive, open to
//!   expired) and is safe to run any number of times.
//! - `now` comes from the injected clock, never from the caller.

use crate::clock::{Clock, SystemClock};
use crate::context::Context;
use crate::model::lib_card::card_expiry_cutoff;
use crate::model::reservation::ReservationState;
use crate::repo::mapper::datetime;
use crate::store::{DocumentCollection, Filter, SetPatch, StoreResult};
use log::{debug, info};

/// Pre-read hook that persists time-driven state transitions.
pub trait Reconciler {
    /// Applies pending transitions and returns how many documents changed.
    fn reconcile(&self, ctx: &Context, collection: &dyn DocumentCollection) -> StoreResult<u64>;
}

fn report(event: &str, collection: &dyn DocumentCollection, transitioned: u64) {
    if transitioned > 0 {
        info!(
            "event={event} module=reconcile status=ok collection={} transitioned={transitioned}",
            collection.name()
        );
    } else {
        debug!(
            "event={event} module=reconcile status=ok collection={} transitioned=0",
            collection.name()
        );
    }
}

/// Flags active cards issued more than the validity window ago as inactive.
#[derive(Debug, Default)]
pub struct CardExpiryReconciler<C: Clock = SystemClock> {
    clock: C,
}

impl CardExpiryReconciler<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<C: Clock> CardExpiryReconciler<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Active cards whose validity window has elapsed at `now_millis`.
    pub fn stale_filter(now_millis: i64) -> Filter {
        Filter::new()
            .eq("action_status", true)
            .lt("issue_date", datetime(card_expiry_cutoff(now_millis)))
    }
}

impl<C: Clock> Reconciler for CardExpiryReconciler<C> {
    fn reconcile(&self, ctx: &Context, collection: &dyn DocumentCollection) -> StoreResult<u64> {
        let filter = Self::stale_filter(self.clock.now_millis());
        let patch = SetPatch::new().set("action_status", false);
        let transitioned = collection.update_many(ctx, &filter, &patch)?;
        report("card_expiry", collection, transitioned);
        Ok(transitioned)
    }
}

/// Marks issued or extended reservations past their return date as expired.
#[derive(Debug, Default)]
pub struct ReservationExpiryReconciler<C: Clock = SystemClock> {
    clock: C,
}

impl ReservationExpiryReconciler<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<C: Clock> ReservationExpiryReconciler<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Open reservations overdue at `now_millis`.
    pub fn stale_filter(now_millis: i64) -> Filter {
        Filter::new()
            .is_in(
                "state",
                ReservationState::OPEN.iter().map(|state| state.as_str()),
            )
            .lt("return_date", datetime(now_millis))
    }
}

impl<C: Clock> Reconciler for ReservationExpiryReconciler<C> {
    fn reconcile(&self, ctx: &Context, collection: &dyn DocumentCollection) -> StoreResult<u64> {
        let filter = Self::stale_filter(self.clock.now_millis());
        let patch = SetPatch::new().set("state", ReservationState::Expired.as_str());
        let transitioned = collection.update_many(ctx, &filter, &patch)?;
        report("reservation_expiry", collection, transitioned);
        Ok(transitioned)
    }
}

#[cfg(test)]
mod tests {
    use super::{CardExpiryReconciler, ReservationExpiryReconciler};
    use crate::clock::MILLIS_PER_DAY;
    use crate::repo::mapper::datetime;
    use bson::doc;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn card_filter_selects_only_active_cards_past_validity() {
        let filter = CardExpiryReconciler::<crate::clock::SystemClock>::stale_filter(NOW);

        let old = doc! { "action_status": true, "issue_date": datetime(NOW - 400 * MILLIS_PER_DAY) };
        let fresh = doc! { "action_status": true, "issue_date": datetime(NOW - 10 * MILLIS_PER_DAY) };
        let already_off =
            doc! { "action_status": false, "issue_date": datetime(NOW - 400 * MILLIS_PER_DAY) };

        assert!(filter.matches(&old));
        assert!(!filter.matches(&fresh));
        assert!(!filter.matches(&already_off));
    }

    #[test]
    fn card_exactly_at_the_boundary_stays_active() {
        let filter = CardExpiryReconciler::<crate::clock::SystemClock>::stale_filter(NOW);
        let boundary =
            doc! { "action_status": true, "issue_date": datetime(NOW - 365 * MILLIS_PER_DAY) };
        assert!(!filter.matches(&boundary));
    }

    #[test]
    fn reservation_filter_skips_finished_and_future_reservations() {
        let filter = ReservationExpiryReconciler::<crate::clock::SystemClock>::stale_filter(NOW);
        let past = datetime(NOW - 1);
        let future = datetime(NOW + MILLIS_PER_DAY);

        assert!(filter.matches(&doc! { "state": "Issued", "return_date": past.clone() }));
        assert!(filter.matches(&doc! { "state": "Extended", "return_date": past.clone() }));
        assert!(!filter.matches(&doc! { "state": "Closed", "return_date": past.clone() }));
        assert!(!filter.matches(&doc! { "state": "Expired", "return_date": past }));
        assert!(!filter.matches(&doc! { "state": "Issued", "return_date": future }));
    }
}
