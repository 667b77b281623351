//! Built-in filters.
//!
//! | Filter | Behaviour |
//! |--------|-----------|
//! | [`FaultBoundary`] | Converts faults raised further in (optionally panics too) into a result |
//! | [`CancellationFilter`] | Short-circuits once the context's cancellation flag is set |
//! | [`ArgumentGuard`] | Short-circuits when a positional argument check fails |
//! | [`TimingFilter`] | Measures the inner chain and stores the elapsed time |

mod argument_guard;
mod cancellation;
mod fault_boundary;
mod timing;

pub use argument_guard::{ArgumentGuard, ArgumentRejection};
pub use cancellation::CancellationFilter;
pub use fault_boundary::{FaultBoundary, ObservedFault};
pub use timing::{StageTimings, TimingFilter};
