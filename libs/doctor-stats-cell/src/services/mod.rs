pub mod clock;
pub mod stats;

pub use clock::{Clock, SystemClock};
pub use stats::StatsService;
