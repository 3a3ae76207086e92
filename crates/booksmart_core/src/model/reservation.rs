//! Book reservation and its lifecycle state.
//!
//! # Invariants
//! - `Issued`/`Extended` reservations whose `return_date` has passed must read
//!   as `Expired`.
//! - `Expired` and `Closed` are terminal for the active-set query.

use crate::model::book::BookId;
use crate::model::reader::ReaderId;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

pub type ReservationId = Uuid;

/// Closed set of reservation lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservationState {
    /// Book handed out, return date pending.
    Issued,
    /// Return date pushed back once.
    Extended,
    /// Return date passed while issued or extended.
    Expired,
    /// Book returned.
    Closed,
}

impl ReservationState {
    /// States that still count toward a reader's active set.
    pub const OPEN: [ReservationState; 2] = [Self::Issued, Self::Extended];
    /// States excluded from a reader's active set.
    pub const FINISHED: [ReservationState; 2] = [Self::Expired, Self::Closed];

    /// Wire label persisted in the `state` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Issued => "Issued",
            Self::Extended => "Extended",
            Self::Expired => "Expired",
            Self::Closed => "Closed",
        }
    }
}

impl Display for ReservationState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationState {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Issued" => Ok(Self::Issued),
            "Extended" => Ok(Self::Extended),
            "Expired" => Ok(Self::Expired),
            "Closed" => Ok(Self::Closed),
            other => Err(format!("unknown reservation state `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub id: ReservationId,
    pub reader_id: ReaderId,
    pub book_id: BookId,
    /// Unix epoch milliseconds.
    pub issue_date: i64,
    /// Due date in Unix epoch milliseconds.
    pub return_date: i64,
    pub state: ReservationState,
}

impl Reservation {
    /// Creates an `Issued` reservation.
    pub fn issue(reader_id: ReaderId, book_id: BookId, issue_date: i64, return_date: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            reader_id,
            book_id,
            issue_date,
            return_date,
            state: ReservationState::Issued,
        }
    }

    pub fn is_overdue_at(&self, now_millis: i64) -> bool {
        ReservationState::OPEN.contains(&self.state) && self.return_date < now_millis
    }
}

#[cfg(test)]
mod tests {
    use super::{Reservation, ReservationState};
    use uuid::Uuid;

    #[test]
    fn labels_round_trip_through_from_str() {
        for state in [
            ReservationState::Issued,
            ReservationState::Extended,
            ReservationState::Expired,
            ReservationState::Closed,
        ] {
            assert_eq!(state.as_str().parse::<ReservationState>(), Ok(state));
        }
        assert!("issued".parse::<ReservationState>().is_err());
    }

    #[test]
    fn only_open_states_become_overdue() {
        let mut reservation = Reservation::issue(Uuid::new_v4(), Uuid::new_v4(), 0, 100);
        assert!(reservation.is_overdue_at(101));
        assert!(!reservation.is_overdue_at(100));

        reservation.state = ReservationState::Closed;
        assert!(!reservation.is_overdue_at(101));
    }
}
