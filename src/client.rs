use crate::model::attendance::{AttendanceRecord, LocationStamp};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

/// Request budget on a wired connection.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longer budget for low-bandwidth mobile links.
pub const MOBILE_TIMEOUT: Duration = Duration::from_secs(30);

/// Client-side failure classes. The UI shows different guidance for a
/// timeout, an unreachable server and an API rejection, so they must stay
/// distinguishable. Check-in must never silently retry; the evidence would
/// be submitted twice.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request timed out")]
    TimedOut,

    #[error("server unreachable: {0}")]
    Unreachable(String),

    #[error("request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid response payload: {0}")]
    Payload(String),

    #[error("http client error: {0}")]
    Http(String),
}

fn classify(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::TimedOut
    } else if e.is_connect() {
        ClientError::Unreachable(e.to_string())
    } else if e.is_decode() {
        ClientError::Payload(e.to_string())
    } else {
        ClientError::Http(e.to_string())
    }
}

#[derive(Debug)]
pub enum CheckoutOutcome {
    Completed(AttendanceRecord),
    /// Below the minimum shift length; re-send with `confirm_early` to
    /// commit the early checkout.
    ConfirmationRequired {
        hours_worked: f64,
    },
}

#[derive(Deserialize)]
struct ApiMessage {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct AttendanceEnvelope {
    attendance: Option<AttendanceRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutEnvelope {
    #[serde(default)]
    confirmation_required: bool,
    hours_worked: Option<f64>,
    attendance: Option<AttendanceRecord>,
}

fn checkout_outcome(envelope: CheckoutEnvelope) -> Result<CheckoutOutcome, ClientError> {
    if envelope.confirmation_required {
        Ok(CheckoutOutcome::ConfirmationRequired {
            hours_worked: envelope.hours_worked.unwrap_or_default(),
        })
    } else {
        envelope
            .attendance
            .map(CheckoutOutcome::Completed)
            .ok_or_else(|| ClientError::Payload("response missing attendance record".to_string()))
    }
}

/// HTTP client for the attendance API, used by the location tracking agent
/// and by headless check-in tooling. `base_url` points at the mounted API
/// prefix, e.g. `http://localhost:8080/api`.
pub struct AttendanceClient {
    http: Client,
    base_url: String,
    token: String,
}

impl AttendanceClient {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check in with photo bytes and a location stamp.
    pub async fn mark_attendance(
        &self,
        photo: Vec<u8>,
        photo_mime: &str,
        location: &LocationStamp,
    ) -> Result<AttendanceRecord, ClientError> {
        let location_json =
            serde_json::to_string(location).map_err(|e| ClientError::Payload(e.to_string()))?;

        let part = reqwest::multipart::Part::bytes(photo)
            .file_name("attendance-photo.jpg")
            .mime_str(photo_mime)
            .map_err(|e| ClientError::Http(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("image", part)
            .text("location", location_json);

        let response = self
            .http
            .post(self.url("/attendance/mark"))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await
            .map_err(classify)?;

        let envelope: AttendanceEnvelope = decode_json(response).await?;
        envelope
            .attendance
            .ok_or_else(|| ClientError::Payload("response missing attendance record".to_string()))
    }

    pub async fn mark_checkout(
        &self,
        location: &LocationStamp,
        confirm_early: bool,
    ) -> Result<CheckoutOutcome, ClientError> {
        let response = self
            .http
            .post(self.url("/attendance/checkout"))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({
                "location": location,
                "confirmEarly": confirm_early,
            }))
            .send()
            .await
            .map_err(classify)?;

        checkout_outcome(decode_json(response).await?)
    }

    pub async fn today(&self) -> Result<Vec<AttendanceRecord>, ClientError> {
        let response = self
            .http
            .get(self.url("/attendance/today"))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(classify)?;

        decode_json(response).await
    }

    pub async fn update_location(&self, sample: &LocationStamp) -> Result<(), ClientError> {
        let response = self
            .http
            .put(self.url("/attendance/location"))
            .bearer_auth(&self.token)
            .json(sample)
            .send()
            .await
            .map_err(classify)?;

        let _: ApiMessage = decode_json(response).await?;
        Ok(())
    }
}

async fn decode_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let message = response
            .json::<ApiMessage>()
            .await
            .map(|m| m.message)
            .unwrap_or_else(|_| status.to_string());
        return Err(ClientError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response.json::<T>().await.map_err(classify)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client =
            AttendanceClient::new("http://localhost:8080/api/", "t", Duration::from_secs(10))
                .unwrap();
        assert_eq!(
            client.url("/attendance/today"),
            "http://localhost:8080/api/attendance/today"
        );
    }

    #[test]
    fn checkout_envelope_maps_to_confirmation_outcome() {
        let envelope: CheckoutEnvelope = serde_json::from_value(serde_json::json!({
            "confirmationRequired": true,
            "hoursWorked": 4.25,
            "message": "confirm to check out early"
        }))
        .unwrap();

        match checkout_outcome(envelope).unwrap() {
            CheckoutOutcome::ConfirmationRequired { hours_worked } => {
                assert_eq!(hours_worked, 4.25)
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn checkout_envelope_without_record_is_a_payload_error() {
        let envelope: CheckoutEnvelope =
            serde_json::from_value(serde_json::json!({ "message": "ok" })).unwrap();
        assert!(matches!(
            checkout_outcome(envelope),
            Err(ClientError::Payload(_))
        ));
    }
}
