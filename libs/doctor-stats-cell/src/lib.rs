pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;
pub mod test_utils;
pub mod window;

pub use models::*;
pub use services::{Clock, StatsService, SystemClock};
pub use store::{StatsStore, SupabaseStatsStore};
pub use window::StatsWindow;
