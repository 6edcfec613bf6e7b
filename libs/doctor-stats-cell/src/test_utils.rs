use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};

use crate::models::{Booking, BookingStatus, PatientName, RatingSummary, Review};
use crate::services::Clock;
use crate::store::StatsStore;

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Local>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

/// In-memory `StatsStore` that counts every query it answers.
#[derive(Default)]
pub struct MemoryStatsStore {
    bookings: Vec<Booking>,
    reviews: Vec<Review>,
    patients: Vec<PatientName>,
    queries: AtomicUsize,
    delay: Option<Duration>,
    failing_query: Option<&'static str>,
}

impl MemoryStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_booking(mut self, booking: Booking) -> Self {
        self.bookings.push(booking);
        self
    }

    pub fn with_bookings<I: IntoIterator<Item = Booking>>(mut self, bookings: I) -> Self {
        self.bookings.extend(bookings);
        self
    }

    pub fn with_review(mut self, doctor_id: &str, rating: i32) -> Self {
        let id = format!("review-{}", self.reviews.len() + 1);
        self.reviews.push(Review {
            id,
            doctor_id: doctor_id.to_string(),
            rating,
            comment: None,
        });
        self
    }

    pub fn with_patient(mut self, id: &str, first_name: Option<&str>, last_name: Option<&str>) -> Self {
        self.patients.push(PatientName {
            id: id.to_string(),
            first_name: first_name.map(str::to_string),
            last_name: last_name.map(str::to_string),
        });
        self
    }

    /// Every query sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// The named query returns an error. Names match the `StatsStore` methods.
    pub fn failing_on(mut self, query: &'static str) -> Self {
        self.failing_query = Some(query);
        self
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    async fn enter(&self, query: &'static str) -> Result<()> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_query == Some(query) {
            return Err(anyhow!("{} unavailable", query));
        }
        Ok(())
    }

    fn booked_for<'a>(&'a self, doctor_id: &'a str) -> impl Iterator<Item = &'a Booking> + 'a {
        self.bookings
            .iter()
            .filter(move |b| b.doctor_id == doctor_id && b.status == BookingStatus::Booked)
    }
}

#[async_trait]
impl StatsStore for MemoryStatsStore {
    async fn ping(&self) -> Result<()> {
        self.enter("ping").await
    }

    async fn booked_between(
        &self,
        doctor_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Booking>> {
        self.enter("booked_between").await?;

        let mut rows: Vec<Booking> = self
            .booked_for(doctor_id)
            .filter(|b| from <= b.slot_start && b.slot_start <= to)
            .cloned()
            .collect();
        rows.sort_by_key(|b| b.slot_start);
        rows.truncate(limit);
        Ok(rows)
    }

    async fn count_booked_between(
        &self,
        doctor_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64> {
        self.enter("count_booked_between").await?;

        Ok(self
            .booked_for(doctor_id)
            .filter(|b| from <= b.slot_start && b.slot_start <= to)
            .count() as u64)
    }

    async fn distinct_booked_patients(&self, doctor_id: &str) -> Result<u64> {
        self.enter("distinct_booked_patients").await?;

        let distinct: HashSet<&str> = self.booked_for(doctor_id).map(|b| b.patient_id.as_str()).collect();
        Ok(distinct.len() as u64)
    }

    async fn rating_summary(&self, doctor_id: &str) -> Result<RatingSummary> {
        self.enter("rating_summary").await?;

        Ok(RatingSummary::from_ratings(
            self.reviews
                .iter()
                .filter(|r| r.doctor_id == doctor_id)
                .map(|r| r.rating as f64),
        ))
    }

    async fn patient_names(&self, patient_ids: &[String]) -> Result<Vec<PatientName>> {
        self.enter("patient_names").await?;

        Ok(self
            .patients
            .iter()
            .filter(|p| patient_ids.contains(&p.id))
            .cloned()
            .collect())
    }
}

/// A 30 minute booking starting at `start`.
pub fn booking(
    id: &str,
    doctor_id: &str,
    patient_id: &str,
    status: BookingStatus,
    start: DateTime<Utc>,
) -> Booking {
    Booking {
        id: id.to_string(),
        doctor_id: doctor_id.to_string(),
        patient_id: patient_id.to_string(),
        status,
        slot_start: start,
        slot_end: start + chrono::Duration::minutes(30),
        booking_type: Some("consultation".to_string()),
        visit_type: Some("in_person".to_string()),
    }
}
