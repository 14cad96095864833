//! Execution ceilings and budgets.

use std::time::Duration;

/// Fan-out ceiling for AND/OR combinators: at most this many children run
/// concurrently per combinator, to bound pressure on backend services.
pub const MAX_CONCURRENT_CHILDREN: usize = 16;

/// Grace budget granted to the optional job once the required job has
/// finished.
pub const OPTIONAL_BUDGET: Duration = Duration::from_millis(100);

/// Result ceiling when the query carries no `count:`.
pub const DEFAULT_MAX_RESULTS: usize = 30;

/// Result ceiling for each operand of an intersection. Operands need a much
/// higher ceiling than the final result count, since most of their matches
/// are discarded by the intersection.
pub const DEFAULT_AND_OPERAND_LIMIT: usize = 10_000;

/// Wall-clock budget per basic query when the query carries no `timeout:`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
