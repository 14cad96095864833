//! Combinator jobs: structure over leaf jobs.
//!
//! Combinators own the cross-child plumbing of the tree: intersection and
//! union merging, result limits, deadlines, and the required/optional
//! pairing. They never talk to backends themselves.

mod and;
mod limit;
mod noop;
mod or;
mod parallel;
mod required_optional;
mod timeout;

pub use and::AndJob;
pub use limit::LimitJob;
pub use noop::NoopJob;
pub use or::OrJob;
pub use parallel::ParallelJob;
pub use required_optional::RequiredAndOptionalJob;
pub use timeout::TimeoutJob;
