//! Records mirrored from the pet-care backend

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PetCareError;

// ============================================================================
// Users and authentication
// ============================================================================

/// Authenticated user profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(alias = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Response body of login and register
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub refresh_token: String,
    pub user: User,
}

/// Profile fields to change; omitted fields are left untouched by the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

// ============================================================================
// Sensors
// ============================================================================

/// Latest snapshot of all device sensors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    #[serde(default)]
    pub food_level: f64,
    #[serde(default)]
    pub water_level: f64,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default)]
    pub humidity: f64,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl SensorReading {
    /// Overwrite the fields present in `update`, keeping the rest
    pub fn merge(&mut self, update: SensorUpdate) {
        if let Some(level) = update.food_level {
            self.food_level = level;
        }
        if let Some(level) = update.water_level {
            self.water_level = level;
        }
        if let Some(temperature) = update.temperature {
            self.temperature = temperature;
        }
        if let Some(humidity) = update.humidity {
            self.humidity = humidity;
        }
        if let Some(at) = update.last_updated {
            self.last_updated = Some(at);
        }
    }
}

/// Sensor values as returned by `GET /sensors`; any field may be missing
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorUpdate {
    #[serde(default)]
    pub food_level: Option<f64>,
    #[serde(default)]
    pub water_level: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Sensor metric selector used for history queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Food,
    Water,
    Temperature,
    Humidity,
}

impl SensorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Food => "food",
            SensorKind::Water => "water",
            SensorKind::Temperature => "temperature",
            SensorKind::Humidity => "humidity",
        }
    }

    /// Display unit for values of this metric
    pub fn unit(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "°C",
            _ => "%",
        }
    }
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for SensorKind {
    type Err = PetCareError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "food" => Ok(SensorKind::Food),
            "water" => Ok(SensorKind::Water),
            "temperature" => Ok(SensorKind::Temperature),
            "humidity" => Ok(SensorKind::Humidity),
            _ => Err(PetCareError::Config(format!("Unknown sensor: {}", s))),
        }
    }
}

/// Time window for sensor history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Day,
    Week,
    Month,
    Custom,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Day => "day",
            TimeRange::Week => "week",
            TimeRange::Month => "month",
            TimeRange::Custom => "custom",
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TimeRange {
    type Err = PetCareError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "day" => Ok(TimeRange::Day),
            "week" => Ok(TimeRange::Week),
            "month" => Ok(TimeRange::Month),
            "custom" => Ok(TimeRange::Custom),
            _ => Err(PetCareError::Config(format!("Unknown time range: {}", s))),
        }
    }
}

/// Parameters of a sensor history request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub kind: SensorKind,
    pub range: TimeRange,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl HistoryQuery {
    pub fn new(kind: SensorKind, range: TimeRange) -> Self {
        Self {
            kind,
            range,
            start_date: None,
            end_date: None,
        }
    }

    pub fn custom(kind: SensorKind, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            kind,
            range: TimeRange::Custom,
            start_date: Some(start_date),
            end_date: Some(end_date),
        }
    }

    /// Query string pairs; dates are only sent for a custom range with both ends set
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("type", self.kind.as_str().to_string()),
            ("range", self.range.as_str().to_string()),
        ];
        if self.range == TimeRange::Custom {
            if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
                params.push(("startDate", start.format("%Y-%m-%d").to_string()));
                params.push(("endDate", end.format("%Y-%m-%d").to_string()));
            }
        }
        params
    }
}

/// One charted history sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    #[serde(rename = "x", alias = "label")]
    pub label: String,
    #[serde(rename = "y", alias = "value")]
    pub value: f64,
}

// ============================================================================
// Schedules
// ============================================================================

/// What a schedule dispenses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    Food,
    Water,
}

impl std::fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleKind::Food => write!(f, "food"),
            ScheduleKind::Water => write!(f, "water"),
        }
    }
}

impl std::str::FromStr for ScheduleKind {
    type Err = PetCareError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "food" => Ok(ScheduleKind::Food),
            "water" => Ok(ScheduleKind::Water),
            _ => Err(PetCareError::Config(format!("Unknown schedule type: {}", s))),
        }
    }
}

/// Day of week as named by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn abbreviation(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Mon",
            DayOfWeek::Tuesday => "Tue",
            DayOfWeek::Wednesday => "Wed",
            DayOfWeek::Thursday => "Thu",
            DayOfWeek::Friday => "Fri",
            DayOfWeek::Saturday => "Sat",
            DayOfWeek::Sunday => "Sun",
        }
    }
}

impl std::str::FromStr for DayOfWeek {
    type Err = PetCareError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        DayOfWeek::ALL
            .into_iter()
            .find(|day| {
                let name = format!("{:?}", day);
                s.eq_ignore_ascii_case(&name) || s.eq_ignore_ascii_case(day.abbreviation())
            })
            .ok_or_else(|| PetCareError::Config(format!("Unknown day: {}", s)))
    }
}

/// A feeding or watering schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ScheduleKind,
    /// Time of day as `HH:MM`
    pub time: String,
    #[serde(default)]
    pub days: BTreeSet<DayOfWeek>,
    /// Amount as a percentage
    pub amount: u8,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Body of schedule create and update requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleDraft {
    #[serde(rename = "type")]
    pub kind: ScheduleKind,
    pub time: String,
    pub days: BTreeSet<DayOfWeek>,
    pub amount: u8,
}

impl Default for ScheduleDraft {
    fn default() -> Self {
        Self {
            kind: ScheduleKind::Food,
            time: "08:00".to_string(),
            days: DayOfWeek::ALL.into_iter().collect(),
            amount: 50,
        }
    }
}

// ============================================================================
// Notifications
// ============================================================================

/// Severity tag attached to a notification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    #[default]
    Info,
    Success,
    Warning,
    Danger,
    Other(String),
}

impl From<String> for Severity {
    fn from(value: String) -> Self {
        match value.as_str() {
            "info" => Severity::Info,
            "success" => Severity::Success,
            "warning" => Severity::Warning,
            "danger" => Severity::Danger,
            _ => Severity::Other(value),
        }
    }
}

impl From<Severity> for String {
    fn from(value: Severity) -> Self {
        match value {
            Severity::Info => "info".to_string(),
            Severity::Success => "success".to_string(),
            Severity::Warning => "warning".to_string(),
            Severity::Danger => "danger".to_string(),
            Severity::Other(other) => other,
        }
    }
}

/// A backend notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub severity: Severity,
    #[serde(default)]
    pub read: bool,
    #[serde(default, alias = "createdAt")]
    pub timestamp: Option<DateTime<Utc>>,
}

// ============================================================================
// Device control
// ============================================================================

/// A manual control command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceCommand {
    /// Dispense food, amount in percent
    DispenseFood { amount: u8 },
    /// Dispense water, amount in percent
    DispenseWater { amount: u8 },
    /// Set the enclosure temperature in °C
    SetTemperature { temperature: f64 },
}

impl DeviceCommand {
    /// Live-channel event name
    pub fn event_name(&self) -> &'static str {
        match self {
            DeviceCommand::DispenseFood { .. } => "dispenseFood",
            DeviceCommand::DispenseWater { .. } => "dispenseWater",
            DeviceCommand::SetTemperature { .. } => "setTemperature",
        }
    }

    /// REST endpoint relative to the API base URL
    pub fn endpoint(&self) -> &'static str {
        match self {
            DeviceCommand::DispenseFood { .. } => "/control/dispense-food",
            DeviceCommand::DispenseWater { .. } => "/control/dispense-water",
            DeviceCommand::SetTemperature { .. } => "/control/set-temperature",
        }
    }

    /// Payload shared by both transports
    pub fn payload(&self) -> serde_json::Value {
        match self {
            DeviceCommand::DispenseFood { amount } | DeviceCommand::DispenseWater { amount } => {
                serde_json::json!({ "amount": amount })
            }
            DeviceCommand::SetTemperature { temperature } => {
                serde_json::json!({ "temperature": temperature })
            }
        }
    }

    /// Fallback error text for a failed dispatch
    pub fn failure_message(&self) -> &'static str {
        match self {
            DeviceCommand::DispenseFood { .. } => "Failed to dispense food",
            DeviceCommand::DispenseWater { .. } => "Failed to dispense water",
            DeviceCommand::SetTemperature { .. } => "Failed to set temperature",
        }
    }
}

/// Most recent successfully dispatched command
#[derive(Debug, Clone, PartialEq)]
pub struct LastCommand {
    pub command: DeviceCommand,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Envelopes
// ============================================================================

/// `{ "data": ... }` wrapper used by most endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

/// `{ "user": ... }` wrapper used by profile endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct UserEnvelope {
    pub user: User,
}
