//! Flag evaluation
//!
//! [`PureEvaluator`] is the CPU-only precedence pipeline; [`FlagEvaluator`]
//! wraps it with cache and repository I/O.

mod evaluator;
mod pure;

pub use evaluator::{FlagEvaluator, EVALUATE_ALL_SCAN_LIMIT};
pub use pure::PureEvaluator;
