//! Per-iteration memory bookkeeping and read-only replay.
//!
//! A [`MemoryLedger`] is filled during the collection iteration and frozen
//! afterwards. Later iterations read it back through a rotating
//! [`SampleCursor`]; [`ReplaySchedule`] offers the same rotation over a
//! sequence produced by static estimation.

mod cursor;
mod ledger;


pub use cursor::{NonModelUsage, ReplaySchedule, SampleCursor};
pub use ledger::MemoryLedger;
