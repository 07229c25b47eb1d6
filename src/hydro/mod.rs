//! Hydropower head handling
//!
//! Plant output depends on the product of head and generation flow. The
//! planning model keeps it linear by fixing the head per station and period;
//! [`head`] re-estimates the head from the reservoir levels of a solution and
//! re-solves until the estimate settles.

pub mod head;
pub mod rating_curve;

pub use head::{Convergence, HeadField, HeadIterationReport, HeadIterationSettings};
pub use rating_curve::RatingCurve;
