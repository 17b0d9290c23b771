//! Typed client for the appointment API.

use crate::types::Appointment;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The request contained invalid data or conflicts with existing bookings.
    #[error("Request rejected ({status}): {message}")]
    Request { status: u16, message: String },
    #[error("Authentication failed: {0}")]
    Authentication(String),
    /// The caller tried to act on behalf of another room.
    #[error("Not authorized: {0}")]
    Authorization(String),
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("Could not connect to server: {0}")]
    Network(String),
    #[error("Unexpected response ({status}): {message}")]
    Unexpected { status: u16, message: String },
    #[error("Invalid response body: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Classifies a failed response by its status code.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            400 | 409 => ClientError::Request { status, message },
            401 => ClientError::Authentication(message),
            403 => ClientError::Authorization(message),
            500..=599 => ClientError::Server { status, message },
            _ => ClientError::Unexpected { status, message },
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: &str, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn appointments_url(&self) -> String {
        format!("{}/api/appointments", self.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status.as_u16(), message));
        }
        Ok(response)
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    pub async fn appointments(&self, date: NaiveDate) -> Result<Vec<Appointment>, ClientError> {
        let request = self
            .client
            .get(self.appointments_url())
            .query(&[("date", date.to_string())]);
        Self::parse(self.send(request).await?).await
    }

    pub async fn create_appointment(
        &self,
        appointment: &Appointment,
    ) -> Result<Appointment, ClientError> {
        let request = self.client.post(self.appointments_url()).json(appointment);
        Self::parse(self.send(request).await?).await
    }

    pub async fn delete_appointment(&self, appointment: &Appointment) -> Result<(), ClientError> {
        let request = self.client.delete(self.appointments_url()).json(appointment);
        self.send(request).await?;
        Ok(())
    }
}
