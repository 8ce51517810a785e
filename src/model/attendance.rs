use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Daily lifecycle: `checked-in` is the only live state, `checked-out` is
/// terminal for the day.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    strum_macros::Display,
    strum_macros::EnumString,
    ToSchema,
)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AttendanceStatus {
    CheckedIn,
    CheckedOut,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    #[schema(example = 23.7808)]
    pub latitude: f64,
    #[schema(example = 90.2792)]
    pub longitude: f64,
}

impl Coordinates {
    pub fn in_range(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// One device-reported position reading, as sent by clients on check-in,
/// checkout and periodic updates.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationStamp {
    pub coordinates: Coordinates,

    #[serde(default)]
    #[schema(example = "23.7808, 90.2792")]
    pub address: Option<String>,

    #[serde(default)]
    #[schema(example = "2026-01-01T09:00:00Z", format = "date-time", value_type = String)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl LocationStamp {
    /// Capture instant of the sample, defaulting to `now` when the client
    /// did not stamp one.
    pub fn captured_at_or(&self, now: NaiveDateTime) -> NaiveDateTime {
        self.last_updated.map(|t| t.naive_utc()).unwrap_or(now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 42)]
    pub user_id: u64,

    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub work_date: NaiveDate,

    pub status: AttendanceStatus,

    #[schema(example = "2026-01-01T09:00:00", format = "date-time", value_type = String)]
    pub check_in_at: NaiveDateTime,

    pub check_in_latitude: f64,
    pub check_in_longitude: f64,
    pub check_in_address: Option<String>,

    #[schema(example = "/api/uploads/7f3b.jpg")]
    pub check_in_photo: String,

    #[schema(example = "2026-01-01T18:30:00", format = "date-time", value_type = String, nullable = true)]
    pub check_out_at: Option<NaiveDateTime>,

    pub check_out_latitude: Option<f64>,
    pub check_out_longitude: Option<f64>,
    pub check_out_address: Option<String>,

    #[schema(example = 9.5, nullable = true)]
    pub hours_worked: Option<f64>,

    pub last_latitude: Option<f64>,
    pub last_longitude: Option<f64>,
    pub last_address: Option<String>,

    #[schema(format = "date-time", value_type = String, nullable = true)]
    pub last_location_at: Option<NaiveDateTime>,
}

/// Elapsed wall-clock duration in hours, full precision. Display rounding is
/// the caller's concern.
pub fn hours_between(check_in: NaiveDateTime, check_out: NaiveDateTime) -> f64 {
    (check_out - check_in).num_seconds() as f64 / 3600.0
}

#[derive(Debug, PartialEq, Eq)]
pub enum CheckoutDisposition {
    Proceed,
    ConfirmationRequired,
}

/// A checkout below the minimum shift length must be explicitly confirmed
/// before the terminal transition is committed.
pub fn checkout_disposition(
    elapsed_hours: f64,
    min_shift_hours: f64,
    confirmed: bool,
) -> CheckoutDisposition {
    if elapsed_hours >= min_shift_hours || confirmed {
        CheckoutDisposition::Proceed
    } else {
        CheckoutDisposition::ConfirmationRequired
    }
}

/// Last-write-wins in capture-time order: a sample older than the most
/// recent accepted one is ignored.
pub fn is_stale_sample(latest_accepted: Option<NaiveDateTime>, incoming: NaiveDateTime) -> bool {
    matches!(latest_accepted, Some(latest) if incoming < latest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(date: (i32, u32, u32), time: (u32, u32, u32)) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .unwrap()
            .and_hms_opt(time.0, time.1, time.2)
            .unwrap()
    }

    #[test]
    fn hours_worked_is_exact_elapsed_duration() {
        let check_in = dt((2026, 1, 5), (9, 0, 0));
        let check_out = dt((2026, 1, 5), (18, 30, 0));
        assert_eq!(hours_between(check_in, check_out), 9.5);
    }

    #[test]
    fn full_shift_checks_out_directly() {
        assert_eq!(
            checkout_disposition(9.0, 9.0, false),
            CheckoutDisposition::Proceed
        );
        assert_eq!(
            checkout_disposition(10.25, 9.0, false),
            CheckoutDisposition::Proceed
        );
    }

    #[test]
    fn early_checkout_requires_confirmation() {
        assert_eq!(
            checkout_disposition(8.99, 9.0, false),
            CheckoutDisposition::ConfirmationRequired
        );
        assert_eq!(
            checkout_disposition(0.5, 9.0, true),
            CheckoutDisposition::Proceed
        );
    }

    #[test]
    fn stale_samples_are_detected_against_latest_accepted() {
        let earlier = dt((2026, 1, 5), (10, 0, 0));
        let later = dt((2026, 1, 5), (10, 5, 0));

        assert!(is_stale_sample(Some(later), earlier));
        assert!(!is_stale_sample(Some(earlier), later));
        // Equal capture times are accepted (idempotent re-delivery).
        assert!(!is_stale_sample(Some(later), later));
        assert!(!is_stale_sample(None, earlier));
    }

    #[test]
    fn coordinate_ranges() {
        assert!(
            Coordinates {
                latitude: 23.7808,
                longitude: 90.2792
            }
            .in_range()
        );
        assert!(
            !Coordinates {
                latitude: 90.01,
                longitude: 0.0
            }
            .in_range()
        );
        assert!(
            !Coordinates {
                latitude: 0.0,
                longitude: -180.5
            }
            .in_range()
        );
        assert!(
            !Coordinates {
                latitude: f64::NAN,
                longitude: 0.0
            }
            .in_range()
        );
    }

    #[test]
    fn status_round_trips_as_kebab_case() {
        assert_eq!(AttendanceStatus::CheckedIn.to_string(), "checked-in");
        assert_eq!(
            "checked-out".parse::<AttendanceStatus>().unwrap(),
            AttendanceStatus::CheckedOut
        );
    }
}
