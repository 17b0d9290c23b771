use crate::backend::{AppointmentBackend, BackendError};
use crate::schema::{appointment, users, washer};
use crate::types::{Appointment, TimeSlot, User};
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::{ConnectionError, PgConnection};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

type AppointmentRow = (NaiveDate, i32, String, String, String);

#[derive(Insertable)]
#[diesel(table_name = appointment)]
struct NewAppointment {
    washer_id: i32,
    user_id: i32,
    slot_id: i32,
    date: NaiveDate,
}

/// PostgreSQL backed appointment store. Deleting an appointment only flags it.
#[derive(Clone)]
pub struct DatabaseInterface {
    connection: Arc<Mutex<PgConnection>>,
}

impl DatabaseInterface {
    pub fn new(database_url: &str) -> Result<Self, ConnectionError> {
        let connection = Self::establish_connection(database_url)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    fn establish_connection(database_url: &str) -> Result<PgConnection, ConnectionError> {
        PgConnection::establish(database_url)
    }

    fn connection(&self) -> Result<MutexGuard<'_, PgConnection>, BackendError> {
        self.connection.lock().map_err(|_| BackendError::Poisoned)
    }

    fn user_id(connection: &mut PgConnection, user: &User) -> Result<i32, BackendError> {
        let ids = users::table
            .filter(users::name.eq(&user.name))
            .filter(users::room.eq(&user.room))
            .select(users::id)
            .load::<i32>(connection)?;

        match ids.as_slice() {
            [id] => Ok(*id),
            [] => {
                debug!(name = %user.name, room = %user.room, "Creating user");
                let id = diesel::insert_into(users::table)
                    .values((users::name.eq(&user.name), users::room.eq(&user.room)))
                    .returning(users::id)
                    .get_result::<i32>(connection)?;
                Ok(id)
            }
            _ => Err(BackendError::AmbiguousUser {
                name: user.name.clone(),
                room: user.room.clone(),
            }),
        }
    }

    fn washer_id(connection: &mut PgConnection, machine: &str) -> Result<i32, BackendError> {
        washer::table
            .filter(washer::name.eq(machine))
            .select(washer::id)
            .first::<i32>(connection)
            .optional()?
            .ok_or_else(|| BackendError::UnknownMachine(machine.to_string()))
    }
}

fn appointment_from_row((date, slot_id, machine, name, room): AppointmentRow) -> Option<Appointment> {
    match u8::try_from(slot_id).ok().and_then(TimeSlot::new) {
        Some(time_slot) => Some(Appointment::new(date, time_slot, machine, User::new(name, room))),
        None => {
            warn!(slot_id, %date, "Skipping appointment with invalid slot id");
            None
        }
    }
}

impl AppointmentBackend for DatabaseInterface {
    fn appointments_by_date(&self, date: NaiveDate) -> Result<Vec<Appointment>, BackendError> {
        let mut connection = self.connection()?;
        let rows = appointment::table
            .inner_join(users::table)
            .inner_join(washer::table)
            .filter(appointment::date.eq(date))
            .filter(appointment::deleted.eq(false))
            .order((appointment::slot_id, washer::name))
            .select((
                appointment::date,
                appointment::slot_id,
                washer::name,
                users::name,
                users::room,
            ))
            .load::<AppointmentRow>(&mut *connection)?;

        Ok(rows.into_iter().filter_map(appointment_from_row).collect())
    }

    fn find_appointment(
        &self,
        date: NaiveDate,
        time_slot: TimeSlot,
        machine: &str,
    ) -> Result<Option<Appointment>, BackendError> {
        let mut connection = self.connection()?;
        let row = appointment::table
            .inner_join(users::table)
            .inner_join(washer::table)
            .filter(appointment::date.eq(date))
            .filter(appointment::slot_id.eq(i32::from(time_slot.id())))
            .filter(washer::name.eq(machine))
            .filter(appointment::deleted.eq(false))
            .select((
                appointment::date,
                appointment::slot_id,
                washer::name,
                users::name,
                users::room,
            ))
            .first::<AppointmentRow>(&mut *connection)
            .optional()?;

        Ok(row.and_then(appointment_from_row))
    }

    fn count_appointments(&self, room: &str, date: NaiveDate) -> Result<u64, BackendError> {
        let mut connection = self.connection()?;
        let count = appointment::table
            .inner_join(users::table)
            .filter(users::room.eq(room))
            .filter(appointment::date.eq(date))
            .filter(appointment::deleted.eq(false))
            .count()
            .get_result::<i64>(&mut *connection)?;

        Ok(count.max(0) as u64)
    }

    fn insert_appointment(
        &self,
        date: NaiveDate,
        time_slot: TimeSlot,
        machine: &str,
        user: &User,
    ) -> Result<Appointment, BackendError> {
        let mut connection = self.connection()?;
        connection.transaction::<_, BackendError, _>(|connection| {
            let new_appointment = NewAppointment {
                washer_id: Self::washer_id(connection, machine)?,
                user_id: Self::user_id(connection, user)?,
                slot_id: i32::from(time_slot.id()),
                date,
            };
            diesel::insert_into(appointment::table)
                .values(&new_appointment)
                .execute(connection)?;
            Ok(())
        })?;

        Ok(Appointment::new(date, time_slot, machine, user.clone()))
    }

    fn delete_appointment(
        &self,
        date: NaiveDate,
        time_slot: TimeSlot,
        machine: &str,
        user_name: &str,
    ) -> Result<u64, BackendError> {
        let mut connection = self.connection()?;
        let deleted = connection.transaction::<_, BackendError, _>(|connection| {
            let ids = appointment::table
                .inner_join(users::table)
                .inner_join(washer::table)
                .filter(appointment::date.eq(date))
                .filter(appointment::slot_id.eq(i32::from(time_slot.id())))
                .filter(washer::name.eq(machine))
                .filter(users::name.eq(user_name))
                .filter(appointment::deleted.eq(false))
                .select(appointment::id)
                .load::<i32>(connection)?;

            if ids.is_empty() {
                return Ok(0);
            }
            let deleted = diesel::update(appointment::table.filter(appointment::id.eq_any(ids)))
                .set(appointment::deleted.eq(true))
                .execute(connection)?;
            Ok(deleted)
        })?;

        Ok(deleted as u64)
    }
}
