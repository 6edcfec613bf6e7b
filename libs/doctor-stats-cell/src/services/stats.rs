use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info};

use crate::models::{
    Booking, StatsError, StatsSnapshot, StatsSummary, TodayAppointment,
    PATIENT_NAME_FALLBACK, TODAY_APPOINTMENTS_LIMIT,
};
use crate::store::StatsStore;
use crate::window::StatsWindow;

pub struct StatsService {
    store: Arc<dyn StatsStore>,
    query_timeout: Duration,
}

impl StatsService {
    pub fn new(store: Arc<dyn StatsStore>, query_timeout: Duration) -> Self {
        Self { store, query_timeout }
    }

    /// Builds the dashboard snapshot for `doctor_id` over `window`.
    ///
    /// The four metric queries run concurrently; the first failure or timeout
    /// fails the whole snapshot.
    pub async fn snapshot(
        &self,
        doctor_id: &str,
        window: &StatsWindow,
    ) -> Result<StatsSnapshot, StatsError> {
        debug!("Computing stats snapshot for doctor: {}", doctor_id);

        let (mut today_rows, month_appointments, total_patients, ratings) = tokio::try_join!(
            self.run(
                "booked_today",
                self.store.booked_between(doctor_id, window.day_start, window.day_end, TODAY_APPOINTMENTS_LIMIT),
            ),
            self.run(
                "booked_this_month",
                self.store.count_booked_between(doctor_id, window.month_start, window.month_end),
            ),
            self.run("distinct_patients", self.store.distinct_booked_patients(doctor_id)),
            self.run("rating_summary", self.store.rating_summary(doctor_id)),
        )?;

        today_rows.truncate(TODAY_APPOINTMENTS_LIMIT);

        let names = self.resolve_names(&today_rows).await?;

        let today_appointments: Vec<TodayAppointment> = today_rows
            .into_iter()
            .map(|booking| TodayAppointment {
                patient_name: names
                    .get(&booking.patient_id)
                    .cloned()
                    .unwrap_or_else(|| PATIENT_NAME_FALLBACK.to_string()),
                id: booking.id,
                start: booking.slot_start,
                end: booking.slot_end,
                appointment_type: booking.booking_type,
                visit_type: booking.visit_type,
            })
            .collect();

        let stats = StatsSummary {
            appointments_today: today_appointments.len() as u64,
            month_appointments,
            total_patients,
            average_rating: ratings.average(),
        };

        info!(
            "Stats for doctor {}: today={} month={} patients={} rating={}",
            doctor_id,
            stats.appointments_today,
            stats.month_appointments,
            stats.total_patients,
            stats.average_rating
        );

        Ok(StatsSnapshot {
            stats,
            today_appointments,
        })
    }

    async fn resolve_names(&self, rows: &[Booking]) -> Result<HashMap<String, String>, StatsError> {
        let mut patient_ids: Vec<String> = rows.iter().map(|row| row.patient_id.clone()).collect();
        patient_ids.sort();
        patient_ids.dedup();

        if patient_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let patients = self
            .run("patient_names", self.store.patient_names(&patient_ids))
            .await?;

        Ok(patients
            .into_iter()
            .map(|patient| {
                let name = patient.display_name();
                (patient.id, name)
            })
            .collect())
    }

    async fn run<T, F>(&self, query: &'static str, fut: F) -> Result<T, StatsError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match timeout(self.query_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StatsError::Store {
                query,
                message: format!("{:#}", e),
            }),
            Err(_) => Err(StatsError::Timeout {
                query,
                timeout_ms: self.query_timeout.as_millis() as u64,
            }),
        }
    }
}
