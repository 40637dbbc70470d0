//! Per-category card bookkeeping.

mod store;

pub use store::{CardEntry, CardRegistry, CategoryId};
