//! Sensor threshold classification

use crate::types::{SensorKind, SensorReading};

pub const FOOD_LOW: f64 = 20.0;
pub const FOOD_CRITICAL: f64 = 10.0;
pub const WATER_LOW: f64 = 25.0;
pub const WATER_CRITICAL: f64 = 15.0;
pub const TEMPERATURE_RANGE: (f64, f64) = (15.0, 30.0);
pub const HUMIDITY_RANGE: (f64, f64) = (40.0, 70.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelStatus {
    Normal,
    Low,
    Critical,
    /// Outside the safe range for temperature or humidity
    OutOfRange,
}

impl std::fmt::Display for LevelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LevelStatus::Normal => write!(f, "normal"),
            LevelStatus::Low => write!(f, "low"),
            LevelStatus::Critical => write!(f, "critical"),
            LevelStatus::OutOfRange => write!(f, "out of range"),
        }
    }
}

fn level(value: f64, low: f64, critical: f64) -> LevelStatus {
    if value <= critical {
        LevelStatus::Critical
    } else if value <= low {
        LevelStatus::Low
    } else {
        LevelStatus::Normal
    }
}

fn range(value: f64, (min, max): (f64, f64)) -> LevelStatus {
    if value < min || value > max {
        LevelStatus::OutOfRange
    } else {
        LevelStatus::Normal
    }
}

/// Classify one value of the given metric
pub fn classify(kind: SensorKind, value: f64) -> LevelStatus {
    match kind {
        SensorKind::Food => level(value, FOOD_LOW, FOOD_CRITICAL),
        SensorKind::Water => level(value, WATER_LOW, WATER_CRITICAL),
        SensorKind::Temperature => range(value, TEMPERATURE_RANGE),
        SensorKind::Humidity => range(value, HUMIDITY_RANGE),
    }
}

impl SensorReading {
    pub fn value(&self, kind: SensorKind) -> f64 {
        match kind {
            SensorKind::Food => self.food_level,
            SensorKind::Water => self.water_level,
            SensorKind::Temperature => self.temperature,
            SensorKind::Humidity => self.humidity,
        }
    }

    /// Every metric paired with its value and status
    pub fn statuses(&self) -> [(SensorKind, f64, LevelStatus); 4] {
        [
            SensorKind::Food,
            SensorKind::Water,
            SensorKind::Temperature,
            SensorKind::Humidity,
        ]
        .map(|kind| {
            let value = self.value(kind);
            (kind, value, classify(kind, value))
        })
    }
}
