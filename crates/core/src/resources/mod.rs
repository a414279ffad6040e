//! Shared resources workers contend for.
//!
//! Workers take an ingredient permit first and the station second. The
//! permit pool caps how many workers can queue on the station at once.

mod permits;
mod station;

pub use permits::{IngredientPermit, ResourcePermits};
pub use station::{ExclusiveStation, StationGuard, StationState};
