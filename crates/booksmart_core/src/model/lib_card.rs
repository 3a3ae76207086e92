//! Library card issued to a reader.
//!
//! # Invariants
//! - A card is valid for [`CARD_VALIDITY_DAYS`] after `issue_date`; past that
//!   window `action_status` must read `false`.

use crate::clock::MILLIS_PER_DAY;
use crate::model::reader::ReaderId;
use uuid::Uuid;

pub type LibCardId = Uuid;

/// Validity window applied to every card.
pub const CARD_VALIDITY_DAYS: i32 = 365;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibCard {
    pub id: LibCardId,
    pub reader_id: ReaderId,
    /// Printed card number.
    pub lib_card_num: String,
    /// Validity window in days.
    pub validity: i32,
    /// Unix epoch milliseconds.
    pub issue_date: i64,
    /// Whether the card is currently usable.
    pub action_status: bool,
}

impl LibCard {
    /// Issues an active card with the standard validity window.
    pub fn issue(reader_id: ReaderId, lib_card_num: impl Into<String>, issue_date: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            reader_id,
            lib_card_num: lib_card_num.into(),
            validity: CARD_VALIDITY_DAYS,
            issue_date,
            action_status: true,
        }
    }
}

/// Cards issued strictly before the returned instant are expired at `now_millis`.
pub fn card_expiry_cutoff(now_millis: i64) -> i64 {
    now_millis.saturating_sub(i64::from(CARD_VALIDITY_DAYS) * MILLIS_PER_DAY)
}
