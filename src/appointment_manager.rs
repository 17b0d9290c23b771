use crate::auth::VerifiedToken;
use crate::backend::{AppointmentBackend, BackendError};
use crate::types::{Appointment, User};
use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_DAILY_LIMIT: u64 = 2;

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("User cannot be null")]
    MissingUser,
    #[error("User in room {authenticated} cannot create appointments for room {requested}")]
    CreateForOtherRoom {
        authenticated: String,
        requested: String,
    },
    #[error("User in room {authenticated} cannot delete appointments belonging to room {requested}")]
    DeleteForOtherRoom {
        authenticated: String,
        requested: String,
    },
    #[error("Appointment already exists")]
    SlotTaken,
    #[error("Too many appointments that day")]
    DailyLimitReached,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Applies the booking rules on top of an appointment store.
#[derive(Clone)]
pub struct AppointmentManager<T: AppointmentBackend> {
    backend: T,
    daily_limit: u64,
}

impl<T: AppointmentBackend> AppointmentManager<T> {
    pub fn new(backend: T, daily_limit: u64) -> Self {
        Self {
            backend,
            daily_limit,
        }
    }

    pub fn appointments(&self, date: NaiveDate) -> Result<Vec<Appointment>, BookingError> {
        Ok(self.backend.appointments_by_date(date)?)
    }

    /// Books the requested slot for the token's room.
    ///
    /// Checks run in order: ownership, slot conflict, daily limit. Nothing
    /// locks the store between the checks and the insert.
    pub fn book(
        &self,
        token: &VerifiedToken,
        appointment: Appointment,
    ) -> Result<Appointment, BookingError> {
        let user = requested_user(&appointment)?;
        if user.room != token.room {
            warn!(authenticated = %token.room, requested = %user.room, "Rejected booking for another room");
            return Err(BookingError::CreateForOtherRoom {
                authenticated: token.room.clone(),
                requested: user.room.clone(),
            });
        }

        if self
            .backend
            .find_appointment(appointment.date, appointment.time_slot, &appointment.machine)?
            .is_some()
        {
            warn!(date = %appointment.date, time_slot = %appointment.time_slot, machine = %appointment.machine, "Slot already booked");
            return Err(BookingError::SlotTaken);
        }

        let booked = self.backend.count_appointments(&token.room, appointment.date)?;
        if booked >= self.daily_limit {
            warn!(room = %token.room, date = %appointment.date, booked, "Daily limit reached");
            return Err(BookingError::DailyLimitReached);
        }

        let created = self.backend.insert_appointment(
            appointment.date,
            appointment.time_slot,
            &appointment.machine,
            user,
        )?;
        info!(room = %token.room, date = %created.date, time_slot = %created.time_slot, machine = %created.machine, "Appointment booked");
        Ok(created)
    }

    /// Removes the appointment booked under the given user name. Returns how
    /// many appointments were removed.
    pub fn cancel(
        &self,
        token: &VerifiedToken,
        appointment: Appointment,
    ) -> Result<u64, BookingError> {
        let user = requested_user(&appointment)?;
        if user.room != token.room {
            warn!(authenticated = %token.room, requested = %user.room, "Rejected cancellation for another room");
            return Err(BookingError::DeleteForOtherRoom {
                authenticated: token.room.clone(),
                requested: user.room.clone(),
            });
        }

        let deleted = self.backend.delete_appointment(
            appointment.date,
            appointment.time_slot,
            &appointment.machine,
            &user.name,
        )?;
        info!(room = %token.room, date = %appointment.date, time_slot = %appointment.time_slot, deleted, "Appointment cancelled");
        Ok(deleted)
    }
}

fn requested_user(appointment: &Appointment) -> Result<&User, BookingError> {
    appointment.user.as_ref().ok_or(BookingError::MissingUser)
}
