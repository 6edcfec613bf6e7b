pub mod supabase;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Booking, PatientName, RatingSummary};

pub use supabase::SupabaseStatsStore;

/// Read-only view over bookings, reviews and patients.
///
/// Every method counts only rows with status `booked` where bookings are
/// concerned; range bounds are inclusive on both ends.
#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn ping(&self) -> Result<()>;

    /// Booked slots starting in `[from, to]`, ascending by start, at most `limit` rows.
    async fn booked_between(
        &self,
        doctor_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Booking>>;

    async fn count_booked_between(
        &self,
        doctor_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64>;

    /// Lifetime count of distinct patients with a booked slot.
    async fn distinct_booked_patients(&self, doctor_id: &str) -> Result<u64>;

    async fn rating_summary(&self, doctor_id: &str) -> Result<RatingSummary>;

    async fn patient_names(&self, patient_ids: &[String]) -> Result<Vec<PatientName>>;
}
