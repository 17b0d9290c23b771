use crate::types::{Appointment, TimeSlot, User};
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("Unknown machine: {0}")]
    UnknownMachine(String),
    #[error("Multiple users with same room and name found")]
    AmbiguousUser { name: String, room: String },
    #[error("Appointment store is unavailable")]
    Poisoned,
}

/// Storage for appointments. Every query only sees appointments that have not
/// been deleted.
pub trait AppointmentBackend: Clone + Send + Sync + 'static {
    fn appointments_by_date(&self, date: NaiveDate) -> Result<Vec<Appointment>, BackendError>;
    fn find_appointment(
        &self,
        date: NaiveDate,
        time_slot: TimeSlot,
        machine: &str,
    ) -> Result<Option<Appointment>, BackendError>;
    fn count_appointments(&self, room: &str, date: NaiveDate) -> Result<u64, BackendError>;
    fn insert_appointment(
        &self,
        date: NaiveDate,
        time_slot: TimeSlot,
        machine: &str,
        user: &User,
    ) -> Result<Appointment, BackendError>;
    /// Returns the number of appointments removed.
    fn delete_appointment(
        &self,
        date: NaiveDate,
        time_slot: TimeSlot,
        machine: &str,
        user_name: &str,
    ) -> Result<u64, BackendError>;
}
