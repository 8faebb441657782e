//! Shared application state
//!
//! A single state container mutated only through [`Action`]s. Each slice
//! carries its own `loading` flag and a single `error` field that the next
//! action of that kind overwrites.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::types::{
    HistoryPoint, LastCommand, Notification, Schedule, SensorKind, SensorReading, SensorUpdate, User,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub loading: bool,
    pub error: Option<String>,
    pub is_authenticated: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorState {
    pub reading: SensorReading,
    pub loading: bool,
    pub error: Option<String>,
    pub history: HashMap<SensorKind, Vec<HistoryPoint>>,
    pub history_loading: bool,
    pub history_error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleState {
    pub schedules: Vec<Schedule>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationState {
    pub notifications: Vec<Notification>,
    pub loading: bool,
    pub error: Option<String>,
}

impl NotificationState {
    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlState {
    pub loading: bool,
    pub error: Option<String>,
    pub last_command: Option<LastCommand>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceState {
    pub status: Option<serde_json::Value>,
}

/// Whole client state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub auth: AuthState,
    pub sensors: SensorState,
    pub schedules: ScheduleState,
    pub notifications: NotificationState,
    pub control: ControlState,
    pub device: DeviceState,
}

/// State transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    AuthRequest,
    AuthSuccess(User),
    AuthFailure(String),
    ProfileUpdated(User),
    PasswordChanged,
    PasswordResetRequested,
    Logout,

    SensorsRequest,
    SensorsSuccess(SensorUpdate),
    SensorsFailure(String),
    SensorUpdated {
        kind: SensorKind,
        value: f64,
        at: DateTime<Utc>,
    },
    HistoryRequest,
    HistorySuccess {
        kind: SensorKind,
        points: Vec<HistoryPoint>,
    },
    HistoryFailure(String),

    CommandRequest,
    CommandSuccess(LastCommand),
    CommandFailure(String),

    SchedulesRequest,
    SchedulesLoaded(Vec<Schedule>),
    ScheduleCreated(Schedule),
    /// Update and toggle both replace the schedule with the server's copy
    ScheduleUpdated(Schedule),
    ScheduleDeleted(String),
    SchedulesFailure(String),

    NotificationsRequest,
    NotificationsLoaded(Vec<Notification>),
    NotificationAdded(Notification),
    NotificationRead(String),
    AllNotificationsRead,
    NotificationsCleared,
    NotificationsFailure(String),

    DeviceStatus(serde_json::Value),
}

impl AppState {
    /// Apply one action
    pub fn reduce(&mut self, action: Action) {
        match action {
            Action::AuthRequest => {
                self.auth.loading = true;
                self.auth.error = None;
            }
            Action::AuthSuccess(user) => {
                self.auth.loading = false;
                self.auth.user = Some(user);
                self.auth.is_authenticated = true;
                self.auth.error = None;
            }
            Action::AuthFailure(error) => {
                self.auth.loading = false;
                self.auth.error = Some(error);
            }
            Action::ProfileUpdated(user) => {
                self.auth.loading = false;
                self.auth.user = Some(user);
                self.auth.error = None;
            }
            Action::PasswordChanged | Action::PasswordResetRequested => {
                self.auth.loading = false;
                self.auth.error = None;
            }
            Action::Logout => self.auth = AuthState::default(),

            Action::SensorsRequest => {
                self.sensors.loading = true;
                self.sensors.error = None;
            }
            Action::SensorsSuccess(update) => {
                self.sensors.reading.merge(update);
                self.sensors.loading = false;
                self.sensors.error = None;
            }
            Action::SensorsFailure(error) => {
                self.sensors.loading = false;
                self.sensors.error = Some(error);
            }
            Action::SensorUpdated { kind, value, at } => {
                let reading = &mut self.sensors.reading;
                match kind {
                    SensorKind::Food => reading.food_level = value,
                    SensorKind::Water => reading.water_level = value,
                    SensorKind::Temperature => reading.temperature = value,
                    SensorKind::Humidity => reading.humidity = value,
                }
                reading.last_updated = Some(at);
            }
            Action::HistoryRequest => {
                self.sensors.history_loading = true;
                self.sensors.history_error = None;
            }
            Action::HistorySuccess { kind, points } => {
                self.sensors.history.insert(kind, points);
                self.sensors.history_loading = false;
                self.sensors.history_error = None;
            }
            Action::HistoryFailure(error) => {
                self.sensors.history_loading = false;
                self.sensors.history_error = Some(error);
            }

            Action::CommandRequest => {
                self.control.loading = true;
                self.control.error = None;
            }
            Action::CommandSuccess(command) => {
                self.control.loading = false;
                self.control.last_command = Some(command);
            }
            Action::CommandFailure(error) => {
                self.control.loading = false;
                self.control.error = Some(error);
            }

            Action::SchedulesRequest => {
                self.schedules.loading = true;
                self.schedules.error = None;
            }
            Action::SchedulesLoaded(schedules) => {
                self.schedules.schedules = schedules;
                self.schedules.loading = false;
                self.schedules.error = None;
            }
            Action::ScheduleCreated(schedule) => {
                self.schedules.schedules.push(schedule);
                self.schedules.loading = false;
                self.schedules.error = None;
            }
            Action::ScheduleUpdated(schedule) => {
                for existing in self.schedules.schedules.iter_mut() {
                    if existing.id == schedule.id {
                        *existing = schedule.clone();
                    }
                }
                self.schedules.loading = false;
                self.schedules.error = None;
            }
            Action::ScheduleDeleted(id) => {
                self.schedules.schedules.retain(|s| s.id != id);
                self.schedules.loading = false;
                self.schedules.error = None;
            }
            Action::SchedulesFailure(error) => {
                self.schedules.loading = false;
                self.schedules.error = Some(error);
            }

            Action::NotificationsRequest => {
                self.notifications.loading = true;
                self.notifications.error = None;
            }
            Action::NotificationsLoaded(notifications) => {
                self.notifications.notifications = notifications;
                self.notifications.loading = false;
                self.notifications.error = None;
            }
            Action::NotificationAdded(notification) => {
                self.notifications.notifications.insert(0, notification);
            }
            Action::NotificationRead(id) => {
                for notification in self.notifications.notifications.iter_mut() {
                    if notification.id == id {
                        notification.read = true;
                    }
                }
                self.notifications.loading = false;
            }
            Action::AllNotificationsRead => {
                for notification in self.notifications.notifications.iter_mut() {
                    notification.read = true;
                }
                self.notifications.loading = false;
                self.notifications.error = None;
            }
            Action::NotificationsCleared => {
                self.notifications.notifications.clear();
                self.notifications.loading = false;
                self.notifications.error = None;
            }
            Action::NotificationsFailure(error) => {
                self.notifications.loading = false;
                self.notifications.error = Some(error);
            }

            Action::DeviceStatus(status) => self.device.status = Some(status),
        }
    }
}

/// Thread-safe handle to the shared state
#[derive(Debug, Clone, Default)]
pub struct Store {
    state: Arc<RwLock<AppState>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn dispatch(&self, action: Action) {
        tracing::trace!("Dispatching {:?}", action);
        self.state.write().await.reduce(action);
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> AppState {
        self.state.read().await.clone()
    }

    /// Read part of the state without cloning all of it
    pub async fn read<T>(&self, f: impl FnOnce(&AppState) -> T) -> T {
        f(&*self.state.read().await)
    }
}
