//! Domain records exposed to callers of the repository façades.
//!
//! # Responsibility
//! - Define the externally visible shape of every library entity.
//! - Keep persistence concerns (wire names, BSON types) out of these types.
//!
//! # Invariants
//! - Every entity except the favorite join is identified by a stable `Uuid`.
//! - Timestamps are Unix epoch milliseconds.

pub mod book;
pub mod lib_card;
pub mod rating;
pub mod reader;
pub mod reservation;
