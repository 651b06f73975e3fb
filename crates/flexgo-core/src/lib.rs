//! flexgo-core - client library for Flexit GO ventilation units.
//!
//! Talks to the Climatix IC cloud API the Flexit GO app uses: exchanges
//! account credentials for a bearer token, keeps it fresh, discovers the
//! plant and reads or writes controller datapoints.
//!
//! ```no_run
//! use flexgo_core::{Config, Credentials, FlexitGo, PresetMode};
//!
//! # async fn run() -> Result<(), flexgo_core::ApiError> {
//! let config = Config::load().unwrap_or_default();
//! let flexit = FlexitGo::new(&config, Credentials::new("me@example.com", "secret"))?;
//! flexit.login().await?;
//! let readings = flexit.sensors().await?;
//! println!("room {} C", readings.temperatures.room);
//! flexit.set_preset_mode(PresetMode::Home).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod datapoints;
pub mod flexit;
pub mod models;

pub use api::{ApiClient, ApiError, ApiRequest, RetryPolicy};
pub use auth::{
    AuthState, CredentialStore, Credentials, FileTokenStore, MemoryTokenStore, Session,
    TokenStore,
};
pub use config::Config;
pub use flexit::FlexitGo;
pub use models::{
    DatapointValues, DeviceInfo, ModeChange, Plant, PresetMode, SensorReadings, VentilationMode,
};
