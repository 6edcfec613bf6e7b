use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shared_models::error::AppError;

/// Rows returned for "today" beyond this ceiling are dropped. There is no
/// cursor, so `appointments_today` never exceeds this value.
pub const TODAY_APPOINTMENTS_LIMIT: usize = 100;

pub const PATIENT_NAME_FALLBACK: &str = "Patient";

// ==============================================================================
// STORE ROWS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Booked,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Booked => "booked",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub doctor_id: String,
    pub patient_id: String,
    pub status: BookingStatus,
    pub slot_start: DateTime<Utc>,
    pub slot_end: DateTime<Utc>,
    pub booking_type: Option<String>,
    pub visit_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub doctor_id: String,
    pub rating: i32,
    pub comment: Option<String>,
}

/// The display-name slice of a patient record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientName {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl PatientName {
    pub fn display_name(&self) -> String {
        let full = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        );
        let full = full.trim();

        if full.is_empty() {
            PATIENT_NAME_FALLBACK.to_string()
        } else {
            full.to_string()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RatingSummary {
    pub count: u64,
    pub sum: f64,
}

impl RatingSummary {
    pub fn from_ratings<I: IntoIterator<Item = f64>>(ratings: I) -> Self {
        ratings.into_iter().fold(Self::default(), |acc, rating| Self {
            count: acc.count + 1,
            sum: acc.sum + rating,
        })
    }

    /// Mean rating rounded to one decimal place, `0.0` with no reviews.
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let mean = self.sum / self.count as f64;
        (mean * 10.0).round() / 10.0
    }
}

// ==============================================================================
// SNAPSHOT
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub appointments_today: u64,
    pub month_appointments: u64,
    pub total_patients: u64,
    pub average_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayAppointment {
    pub id: String,
    pub patient_name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(rename = "type")]
    pub appointment_type: Option<String>,
    pub visit_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub stats: StatsSummary,
    pub today_appointments: Vec<TodayAppointment>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub success: bool,
    #[serde(flatten)]
    pub snapshot: StatsSnapshot,
}

impl From<StatsSnapshot> for StatsResponse {
    fn from(snapshot: StatsSnapshot) -> Self {
        Self {
            success: true,
            snapshot,
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("Store query `{query}` failed: {message}")]
    Store { query: &'static str, message: String },

    #[error("Store query `{query}` timed out after {timeout_ms} ms")]
    Timeout { query: &'static str, timeout_ms: u64 },

    #[error("Invalid local time boundary: {0}")]
    Window(String),
}

impl From<StatsError> for AppError {
    fn from(err: StatsError) -> Self {
        match err {
            StatsError::Window(_) => AppError::Internal(err.to_string()),
            _ => AppError::Database(err.to_string()),
        }
    }
}
