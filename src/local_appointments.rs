use crate::backend::{AppointmentBackend, BackendError};
use crate::types::{Appointment, TimeSlot, User};
use chrono::NaiveDate;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::debug;
use uuid::Uuid;

/// In-memory appointment store used when no database is configured.
#[derive(Debug, Clone, Default)]
pub struct LocalAppointments {
    appointments: Arc<Mutex<HashMap<Uuid, Appointment>>>,
}

impl LocalAppointments {
    fn appointments(&self) -> Result<MutexGuard<'_, HashMap<Uuid, Appointment>>, BackendError> {
        self.appointments.lock().map_err(|_| BackendError::Poisoned)
    }
}

fn booked_by(appointment: &Appointment) -> Option<&User> {
    appointment.user.as_ref()
}

impl AppointmentBackend for LocalAppointments {
    fn appointments_by_date(&self, date: NaiveDate) -> Result<Vec<Appointment>, BackendError> {
        let mut appointments: Vec<Appointment> = self
            .appointments()?
            .values()
            .filter(|appointment| appointment.date == date)
            .cloned()
            .collect();
        appointments.sort_unstable_by(|a, b| {
            a.time_slot
                .cmp(&b.time_slot)
                .then_with(|| a.machine.cmp(&b.machine))
        });
        Ok(appointments)
    }

    fn find_appointment(
        &self,
        date: NaiveDate,
        time_slot: TimeSlot,
        machine: &str,
    ) -> Result<Option<Appointment>, BackendError> {
        Ok(self
            .appointments()?
            .values()
            .find(|appointment| {
                appointment.date == date
                    && appointment.time_slot == time_slot
                    && appointment.machine == machine
            })
            .cloned())
    }

    fn count_appointments(&self, room: &str, date: NaiveDate) -> Result<u64, BackendError> {
        let count = self
            .appointments()?
            .values()
            .filter(|appointment| appointment.date == date)
            .filter(|appointment| booked_by(appointment).is_some_and(|user| user.room == room))
            .count();
        Ok(count as u64)
    }

    fn insert_appointment(
        &self,
        date: NaiveDate,
        time_slot: TimeSlot,
        machine: &str,
        user: &User,
    ) -> Result<Appointment, BackendError> {
        let appointment = Appointment::new(date, time_slot, machine, user.clone());
        let id = Uuid::new_v4();
        self.appointments()?.insert(id, appointment.clone());
        debug!(%id, %date, %time_slot, machine, "Stored appointment");
        Ok(appointment)
    }

    fn delete_appointment(
        &self,
        date: NaiveDate,
        time_slot: TimeSlot,
        machine: &str,
        user_name: &str,
    ) -> Result<u64, BackendError> {
        let mut appointments = self.appointments()?;
        let before = appointments.len();
        appointments.retain(|_, appointment| {
            !(appointment.date == date
                && appointment.time_slot == time_slot
                && appointment.machine == machine
                && booked_by(appointment).is_some_and(|user| user.name == user_name))
        });
        Ok((before - appointments.len()) as u64)
    }
}
