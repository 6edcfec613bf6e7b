use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde::Deserialize;
use tracing::debug;
use urlencoding::encode;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Booking, BookingStatus, PatientName, RatingSummary};
use crate::store::StatsStore;

const BOOKINGS_PATH: &str = "/rest/v1/bookings";
const REVIEWS_PATH: &str = "/rest/v1/reviews";
const PATIENTS_PATH: &str = "/rest/v1/patients";

const BOOKING_COLUMNS: &str = "id,doctor_id,patient_id,status,slot_start,slot_end,booking_type,visit_type";

#[derive(Debug, Deserialize)]
struct PatientRef {
    patient_id: String,
}

#[derive(Debug, Deserialize)]
struct RatingRow {
    rating: f64,
}

/// `StatsStore` backed by the Supabase PostgREST API.
pub struct SupabaseStatsStore {
    supabase: SupabaseClient,
}

impl SupabaseStatsStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

fn timestamp(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn booked_filter(doctor_id: &str) -> String {
    format!(
        "doctor_id=eq.{}&status=eq.{}",
        encode(doctor_id),
        BookingStatus::Booked.as_str()
    )
}

fn slot_range_filter(from: &DateTime<Utc>, to: &DateTime<Utc>) -> String {
    format!("slot_start=gte.{}&slot_start=lte.{}", timestamp(from), timestamp(to))
}

/// A double-quoted, URL-encoded `in.(...)` list item, so ids holding `,`
/// `(` or `)` stay one value.
fn quoted_list_value(id: &str) -> String {
    let escaped = id.replace('\\', "\\\\").replace('"', "\\\"");
    encode(&format!("\"{}\"", escaped)).into_owned()
}

#[async_trait]
impl StatsStore for SupabaseStatsStore {
    async fn ping(&self) -> Result<()> {
        self.supabase.ping().await
    }

    async fn booked_between(
        &self,
        doctor_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Booking>> {
        let path = format!(
            "{}?select={}&{}&{}&order=slot_start.asc&limit={}",
            BOOKINGS_PATH,
            BOOKING_COLUMNS,
            booked_filter(doctor_id),
            slot_range_filter(&from, &to),
            limit
        );
        debug!("Fetching booked slots for doctor {} between {} and {}", doctor_id, from, to);

        self.supabase.request::<Vec<Booking>>(Method::GET, &path).await
    }

    async fn count_booked_between(
        &self,
        doctor_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64> {
        let path = format!(
            "{}?select=id&{}&{}&limit=1",
            BOOKINGS_PATH,
            booked_filter(doctor_id),
            slot_range_filter(&from, &to)
        );
        debug!("Counting booked slots for doctor {} between {} and {}", doctor_id, from, to);

        self.supabase.count(&path).await
    }

    async fn distinct_booked_patients(&self, doctor_id: &str) -> Result<u64> {
        let path = format!(
            "{}?select=patient_id&{}&order=id.asc",
            BOOKINGS_PATH,
            booked_filter(doctor_id)
        );
        debug!("Fetching booked patient ids for doctor {}", doctor_id);

        let rows: Vec<PatientRef> = self.supabase.get_all(&path).await?;
        let distinct: HashSet<String> = rows.into_iter().map(|row| row.patient_id).collect();

        Ok(distinct.len() as u64)
    }

    async fn rating_summary(&self, doctor_id: &str) -> Result<RatingSummary> {
        let path = format!(
            "{}?select=rating&doctor_id=eq.{}&order=id.asc",
            REVIEWS_PATH,
            encode(doctor_id)
        );
        debug!("Fetching ratings for doctor {}", doctor_id);

        let rows: Vec<RatingRow> = self.supabase.get_all(&path).await?;

        Ok(RatingSummary::from_ratings(rows.into_iter().map(|row| row.rating)))
    }

    async fn patient_names(&self, patient_ids: &[String]) -> Result<Vec<PatientName>> {
        if patient_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = patient_ids
            .iter()
            .map(|id| quoted_list_value(id))
            .collect::<Vec<_>>()
            .join(",");
        let path = format!("{}?select=id,first_name,last_name&id=in.({})", PATIENTS_PATH, ids);
        debug!("Resolving {} patient names", patient_ids.len());

        self.supabase.request::<Vec<PatientName>>(Method::GET, &path).await
    }
}
