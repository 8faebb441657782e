//! PetCare client library
//!
//! Talks to the pet-care backend over REST and a reconnecting live channel,
//! and keeps the results in a shared state store.

pub mod actions;
pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod live;
pub mod onboarding;
pub mod push;
pub mod storage;
pub mod store;
pub mod thresholds;
pub mod types;

pub use actions::{dual_dispatch, DeliveryPath, PetCare};
pub use api::ApiClient;
pub use config::{load_config, Config};
pub use error::{PetCareError, Result};
pub use live::{CommandChannel, LiveClient, LiveEvent};
pub use store::{Action, AppState, Store};
