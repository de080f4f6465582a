//! Stream combinators used by the station handle

mod throttle;

pub use throttle::{Throttle, ThrottleExt};
