use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
    thread,
    time::{Duration, Instant},
};

use chrono::NaiveDate;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;
use tokio::task::JoinHandle;

use crate::{
    appointment_manager::DEFAULT_DAILY_LIMIT,
    auth::TokenVerifier,
    backend::{AppointmentBackend, BackendError},
    configuration::Configuration,
    http::create_app,
    types::{Appointment, TimeSlot, User},
};

pub const TEST_PRIVATE_KEY: &[u8] = include_bytes!("../tests/fixtures/private.pem");
pub const TEST_PUBLIC_KEY: &[u8] = include_bytes!("../tests/fixtures/public.pem");
/// Valid RSA key that does not belong to `TEST_PUBLIC_KEY`.
pub const OTHER_PRIVATE_KEY: &[u8] = include_bytes!("../tests/fixtures/other_private.pem");

pub fn sign_token(private_key: &[u8], claims: serde_json::Value) -> String {
    encode(
        &Header::new(Algorithm::RS256),
        &claims,
        &EncodingKey::from_rsa_pem(private_key).unwrap(),
    )
    .unwrap()
}

pub fn room_token(room: &str) -> String {
    sign_token(TEST_PRIVATE_KEY, json!({ "room": room, "name": "Alice" }))
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

#[derive(Clone)]
pub struct TestConfiguration {
    pub daily_limit: u64,
}

impl Default for TestConfiguration {
    fn default() -> Self {
        Self {
            daily_limit: DEFAULT_DAILY_LIMIT,
        }
    }
}

impl Configuration for TestConfiguration {
    fn port(&self) -> String {
        "0".into()
    }

    fn database_url(&self) -> Option<String> {
        None
    }

    fn public_key_path(&self) -> PathBuf {
        PathBuf::from("tests/fixtures/public.pem")
    }

    fn daily_limit(&self) -> u64 {
        self.daily_limit
    }

    fn cors_origins(&self) -> String {
        "*".into()
    }
}

/// Serves the app on an ephemeral port and returns its base url.
pub async fn spawn_app<T: AppointmentBackend>(backend: T) -> (JoinHandle<()>, String) {
    let token_verifier = TokenVerifier::from_rsa_pem(TEST_PUBLIC_KEY).unwrap();
    let app = create_app(backend, token_verifier, &TestConfiguration::default());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (server, format!("http://{address}"))
}

pub struct MockAppointmentBackendInner {
    pub success: AtomicBool,
    pub slot_taken: AtomicBool,
    pub booked_count: AtomicU64,
    pub deleted_count: AtomicU64,
    /// Makes `appointments_by_date` wait for `released` (up to two seconds).
    pub hold_appointments_by_date: AtomicBool,
    pub released: AtomicBool,
    pub released_while_held: AtomicBool,
    pub calls_to_appointments_by_date: AtomicU64,
    pub calls_to_find_appointment: AtomicU64,
    pub calls_to_count_appointments: AtomicU64,
    pub calls_to_insert_appointment: AtomicU64,
    pub calls_to_delete_appointment: AtomicU64,
    pub appointments: Mutex<Vec<Appointment>>,
}

#[derive(Clone)]
pub struct MockAppointmentBackend(pub Arc<MockAppointmentBackendInner>);

impl MockAppointmentBackendInner {
    fn new() -> Self {
        Self {
            success: AtomicBool::new(true),
            slot_taken: AtomicBool::new(false),
            booked_count: AtomicU64::default(),
            deleted_count: AtomicU64::default(),
            hold_appointments_by_date: AtomicBool::new(false),
            released: AtomicBool::new(false),
            released_while_held: AtomicBool::new(false),
            calls_to_appointments_by_date: AtomicU64::default(),
            calls_to_find_appointment: AtomicU64::default(),
            calls_to_count_appointments: AtomicU64::default(),
            calls_to_insert_appointment: AtomicU64::default(),
            calls_to_delete_appointment: AtomicU64::default(),
            appointments: Mutex::default(),
        }
    }
}

impl MockAppointmentBackend {
    pub fn new() -> Self {
        Self(Arc::new(MockAppointmentBackendInner::new()))
    }

    fn result(&self) -> Result<(), BackendError> {
        match self.0.success.load(Ordering::SeqCst) {
            true => Ok(()),
            false => Err(BackendError::Poisoned),
        }
    }
}

impl AppointmentBackend for MockAppointmentBackend {
    fn appointments_by_date(&self, _date: NaiveDate) -> Result<Vec<Appointment>, BackendError> {
        self.0
            .calls_to_appointments_by_date
            .fetch_add(1, Ordering::SeqCst);
        self.hold();
        self.result()?;
        Ok(self.0.appointments.lock().unwrap().clone())
    }

    fn find_appointment(
        &self,
        date: NaiveDate,
        time_slot: TimeSlot,
        machine: &str,
    ) -> Result<Option<Appointment>, BackendError> {
        self.0
            .calls_to_find_appointment
            .fetch_add(1, Ordering::SeqCst);
        self.result()?;
        Ok(self
            .0
            .slot_taken
            .load(Ordering::SeqCst)
            .then(|| Appointment::new(date, time_slot, machine, User::new("Someone", "000"))))
    }

    fn count_appointments(&self, _room: &str, _date: NaiveDate) -> Result<u64, BackendError> {
        self.0
            .calls_to_count_appointments
            .fetch_add(1, Ordering::SeqCst);
        self.result()?;
        Ok(self.0.booked_count.load(Ordering::SeqCst))
    }

    fn insert_appointment(
        &self,
        date: NaiveDate,
        time_slot: TimeSlot,
        machine: &str,
        user: &User,
    ) -> Result<Appointment, BackendError> {
        self.0
            .calls_to_insert_appointment
            .fetch_add(1, Ordering::SeqCst);
        self.result()?;
        Ok(Appointment::new(date, time_slot, machine, user.clone()))
    }

    fn delete_appointment(
        &self,
        _date: NaiveDate,
        _time_slot: TimeSlot,
        _machine: &str,
        _user_name: &str,
    ) -> Result<u64, BackendError> {
        self.0
            .calls_to_delete_appointment
            .fetch_add(1, Ordering::SeqCst);
        self.result()?;
        Ok(self.0.deleted_count.load(Ordering::SeqCst))
    }
}
