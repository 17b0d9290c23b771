use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use validator::Validate;

/// Number of bookable slots per day.
pub const SLOTS_PER_DAY: u8 = 12;
const SLOT_HOURS: i64 = 2;

/// A fixed two hour booking window, identified by its index within the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct TimeSlot(u8);

impl TimeSlot {
    pub fn new(id: u8) -> Option<Self> {
        (id < SLOTS_PER_DAY).then_some(Self(id))
    }

    pub fn id(&self) -> u8 {
        self.0
    }

    pub fn start(&self) -> NaiveTime {
        NaiveTime::default() + Duration::hours(i64::from(self.0) * SLOT_HOURS)
    }

    /// Wraps to midnight for the last slot of the day.
    pub fn end(&self) -> NaiveTime {
        NaiveTime::default() + Duration::hours((i64::from(self.0) + 1) * SLOT_HOURS)
    }
}

impl TryFrom<u8> for TimeSlot {
    type Error = String;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::new(id).ok_or_else(|| {
            format!(
                "Time slot {id} out of range, expected 0 to {}",
                SLOTS_PER_DAY - 1
            )
        })
    }
}

impl From<TimeSlot> for u8 {
    fn from(time_slot: TimeSlot) -> Self {
        time_slot.0
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.start().format("%H:%M"),
            self.end().format("%H:%M")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct User {
    #[validate(length(min = 1, message = "User name must not be empty"))]
    pub name: String,
    #[validate(length(min = 1, message = "Room must not be empty"))]
    pub room: String,
}

impl User {
    pub fn new(name: impl Into<String>, room: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            room: room.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(deserialize_with = "deserialize_iso_date")]
    pub date: NaiveDate,
    #[serde(deserialize_with = "deserialize_time_slot")]
    pub time_slot: TimeSlot,
    #[serde(deserialize_with = "deserialize_machine")]
    #[validate(length(min = 1, message = "Machine name must not be empty"))]
    pub machine: String,
    #[validate(nested)]
    pub user: Option<User>,
}

impl Appointment {
    pub fn new(date: NaiveDate, time_slot: TimeSlot, machine: impl Into<String>, user: User) -> Self {
        Self {
            date,
            time_slot,
            machine: machine.into(),
            user: Some(user),
        }
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d"];
const OFFSET_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%z"];
const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Reduces an ISO-8601 date or timestamp to its calendar day.
///
/// Timestamps with an offset keep the day as seen in that offset, so
/// `2024-05-01T23:30:00+02:00` is the 1st of May.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
    {
        return Some(date);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.date_naive());
    }
    if let Some(datetime) = OFFSET_DATETIME_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(value, format).ok())
    {
        return Some(datetime.date_naive());
    }
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|datetime| datetime.date())
}

fn deserialize_iso_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_iso_date(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid ISO-8601 date: {value}")))
}

/// Slots arrive either as their id or as the web client's `{start, end, id}` object.
#[derive(Deserialize)]
#[serde(untagged)]
enum TimeSlotField {
    Id(u8),
    Object { id: u8 },
}

/// Machines arrive either as their name or as a `{name}` object.
#[derive(Deserialize)]
#[serde(untagged)]
enum MachineField {
    Name(String),
    Object { name: String },
}

fn deserialize_time_slot<'de, D>(deserializer: D) -> Result<TimeSlot, D::Error>
where
    D: Deserializer<'de>,
{
    let id = match TimeSlotField::deserialize(deserializer)? {
        TimeSlotField::Id(id) | TimeSlotField::Object { id } => id,
    };
    TimeSlot::try_from(id).map_err(serde::de::Error::custom)
}

fn deserialize_machine<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match MachineField::deserialize(deserializer)? {
        MachineField::Name(name) | MachineField::Object { name } => Ok(name),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test_case::test_case(0, "00:00 - 02:00")]
    #[test_case::test_case(3, "06:00 - 08:00")]
    #[test_case::test_case(6, "12:00 - 14:00")]
    #[test_case::test_case(11, "22:00 - 00:00")]
    fn test_time_slot_display(id: u8, expected: &str) {
        assert_eq!(TimeSlot::new(id).unwrap().to_string(), expected);
    }

    #[test]
    fn test_time_slot_range() {
        assert!(TimeSlot::new(12).is_none());
        let last = TimeSlot::new(SLOTS_PER_DAY - 1).unwrap();
        assert_eq!(last.start(), NaiveTime::from_hms_opt(22, 0, 0).unwrap());
        assert_eq!(last.end(), NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    }

    #[test_case::test_case("2024-05-01", Some((2024, 5, 1)))]
    #[test_case::test_case("2024-05-01T00:00:00.000Z", Some((2024, 5, 1)))]
    #[test_case::test_case("2024-05-01T23:30:00+02:00", Some((2024, 5, 1)))]
    #[test_case::test_case("2024-05-01T10:15:00", Some((2024, 5, 1)))]
    #[test_case::test_case("2024-05-01T10:15", Some((2024, 5, 1)))]
    #[test_case::test_case("2024-05-01T10:15:00.000+0200", Some((2024, 5, 1)))]
    #[test_case::test_case("2024-05-01T23:30+0200", Some((2024, 5, 1)))]
    #[test_case::test_case("20240501", Some((2024, 5, 1)))]
    #[test_case::test_case("2024-05-01T25:00", None)]
    #[test_case::test_case("01.05.2024", None)]
    #[test_case::test_case("", None)]
    fn test_parse_iso_date(value: &str, expected: Option<(i32, u32, u32)>) {
        let expected = expected.map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap());
        assert_eq!(parse_iso_date(value), expected);
    }

    #[test]
    fn test_appointment_json_shape() {
        let json = r#"{
            "date": "2024-05-01T00:00:00.000Z",
            "timeSlot": 3,
            "machine": "Washer 1",
            "user": {"name": "Alice", "room": "101"}
        }"#;
        let appointment: Appointment = serde_json::from_str(json).unwrap();
        assert_eq!(appointment.date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(appointment.time_slot.id(), 3);
        assert_eq!(appointment.user, Some(User::new("Alice", "101")));

        let value = serde_json::to_value(&appointment).unwrap();
        assert_eq!(value["date"], "2024-05-01");
        assert_eq!(value["timeSlot"], 3);
    }

    #[test]
    fn test_appointment_nested_fields() {
        let json = r#"{
            "user": {"name": "Alice", "room": "101"},
            "date": "2024-05-01T00:00:00.000Z",
            "timeSlot": {"start": "06:00", "end": "08:00", "id": 3},
            "machine": {"name": "Washer 1"}
        }"#;
        let appointment: Appointment = serde_json::from_str(json).unwrap();
        assert_eq!(
            appointment,
            Appointment::new(
                NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                TimeSlot::new(3).unwrap(),
                "Washer 1",
                User::new("Alice", "101"),
            )
        );

        let value = serde_json::to_value(&appointment).unwrap();
        assert_eq!(value["timeSlot"], 3);
        assert_eq!(value["machine"], "Washer 1");
    }

    #[test_case::test_case(r#""timeSlot": 12, "machine": "Washer 1""# ; "unknown slot id")]
    #[test_case::test_case(r#""timeSlot": {"id": 12}, "machine": "Washer 1""# ; "unknown nested slot id")]
    #[test_case::test_case(r#""timeSlot": {"start": "06:00"}, "machine": "Washer 1""# ; "nested slot without id")]
    #[test_case::test_case(r#""timeSlot": 3, "machine": {"id": 1}"# ; "nested machine without name")]
    fn test_appointment_rejects_bad_fields(fields: &str) {
        let json = format!(r#"{{"date": "2024-05-01", {fields}, "user": null}}"#);
        assert!(serde_json::from_str::<Appointment>(&json).is_err());
    }

    #[test]
    fn test_appointment_validation() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let slot = TimeSlot::new(1).unwrap();
        assert!(Appointment::new(date, slot, "Washer 1", User::new("Alice", "101"))
            .validate()
            .is_ok());
        assert!(Appointment::new(date, slot, "", User::new("Alice", "101"))
            .validate()
            .is_err());
        assert!(Appointment::new(date, slot, "Washer 1", User::new("Alice", ""))
            .validate()
            .is_err());
    }
}
