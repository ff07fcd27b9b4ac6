//! Batched bulk writes bounded by the protocol parameter ceiling.

mod budget;
mod insert_helper;

pub use budget::{close_to_placeholder_limit, PlaceholderBudget};
pub use insert_helper::InsertHelper;
