//! Gantry placement planner.
//!
//! Decides how many new instances each host should launch to keep the
//! pool balanced. Intentionally greedy: O(desired) assignment against a
//! ceiling, trading precision for simplicity.

pub mod planner;

pub use planner::plan;
