//! Datapoint reads and writes on top of an authenticated [`Session`].

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::api::client::VALUES_PATH;
use crate::api::{ApiError, ApiRequest};
use crate::auth::{Credentials, Session};
use crate::config::Config;
use crate::datapoints::{self as dp, datapoint_url, full_path, values_filter};
use crate::models::{
    DatapointValues, DeviceInfo, ModeChange, ModeWrite, Plant, PresetMode, SensorReadings,
    VentilationMode,
};

/// Client for one Flexit GO installation.
pub struct FlexitGo {
    session: Session,
}

impl FlexitGo {
    pub fn new(config: &Config, credentials: Credentials) -> Result<Self, ApiError> {
        Ok(Self::with_session(Session::new(config, credentials)?))
    }

    pub fn with_session(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn login(&self) -> Result<(), ApiError> {
        self.session.login().await
    }

    pub async fn plants(&self) -> Result<Vec<Plant>, ApiError> {
        self.session.plants().await
    }

    // ===== Reads =====

    /// Read a batch of datapoints in one request.
    pub async fn read_values(&self, suffixes: &[&str]) -> Result<DatapointValues, ApiError> {
        self.session.validate_and_refresh().await?;
        let plant_id = self.session.plant_id().await?;

        let request = ApiRequest::get(VALUES_PATH)
            .with_query("filterId", values_filter(&plant_id, suffixes));
        let response = self.session.request(&request).await?;
        let values = DatapointValues::from_response(&plant_id, response)?;
        debug!(requested = suffixes.len(), received = values.len(), "Read datapoints");
        Ok(values)
    }

    pub async fn sensors(&self) -> Result<SensorReadings, ApiError> {
        let values = self.read_values(dp::SENSOR_PATHS).await?;
        let now = Utc::now().with_timezone(&self.session.time_zone());
        SensorReadings::from_values(&values, now)
    }

    pub async fn device_info(&self) -> Result<DeviceInfo, ApiError> {
        let values = self.read_values(dp::DEVICE_INFO_PATHS).await?;
        DeviceInfo::from_values(&values)
    }

    pub async fn ventilation_mode(&self) -> Result<VentilationMode, ApiError> {
        let values = self.read_values(&[dp::MODE]).await?;
        Ok(VentilationMode::from_code(values.sensor_int(dp::MODE)?))
    }

    // ===== Writes =====

    /// Write one datapoint. `None` clears the value on the unit.
    pub async fn write_datapoint(&self, suffix: &str, value: Option<&str>) -> Result<(), ApiError> {
        self.session.validate_and_refresh().await?;
        let plant_id = self.session.plant_id().await?;
        let path = full_path(&plant_id, suffix);

        let request = ApiRequest::put_json(datapoint_url(&plant_id, suffix), json!({ "Value": value }));
        let response = self.session.request(&request).await?;

        match response.get("stateTexts").and_then(|states| states.get(&path)) {
            Some(Value::String(state)) if state == "Success" => {
                debug!(path = %path, "Datapoint written");
                Ok(())
            }
            Some(state) => {
                let state = state.as_str().map_or_else(|| state.to_string(), str::to_string);
                warn!(path = %path, state = %state, "Write rejected");
                Err(ApiError::Rejected { path, state })
            }
            None => Err(ApiError::InvalidResponse(format!(
                "write response has no state for {}",
                path
            ))),
        }
    }

    /// Switch the unit to `mode`, releasing a latched mode first if needed.
    ///
    /// Every write is issued even when an earlier one is rejected; the first
    /// failure is returned afterwards.
    pub async fn set_preset_mode(&self, mode: PresetMode) -> Result<ModeChange, ApiError> {
        let current = self.ventilation_mode().await?;
        let writes = mode.transition_from(current);
        if writes.is_empty() {
            info!(mode = %mode, "Already in requested mode");
            return Ok(ModeChange::Unchanged);
        }

        info!(from = %current, to = %mode, writes = writes.len(), "Switching mode");
        let mut first_error = None;
        for ModeWrite { path, value } in &writes {
            let value = value.to_string();
            if let Err(e) = self.write_datapoint(path, Some(&value)).await {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(ModeChange::Applied {
                writes: writes.len(),
            }),
        }
    }

    pub async fn set_home_temperature(&self, celsius: f64) -> Result<(), ApiError> {
        self.write_datapoint(dp::HOME_AIR_TEMPERATURE, Some(&celsius.to_string()))
            .await
    }

    pub async fn set_away_temperature(&self, celsius: f64) -> Result<(), ApiError> {
        self.write_datapoint(dp::AWAY_AIR_TEMPERATURE, Some(&celsius.to_string()))
            .await
    }

    pub async fn set_fireplace_duration(&self, minutes: u32) -> Result<(), ApiError> {
        self.write_datapoint(dp::FIREPLACE_DURATION, Some(&minutes.to_string()))
            .await
    }

    pub async fn set_boost_duration(&self, minutes: u32) -> Result<(), ApiError> {
        self.write_datapoint(dp::BOOST_DURATION, Some(&minutes.to_string()))
            .await
    }

    pub async fn set_away_delay(&self, minutes: u32) -> Result<(), ApiError> {
        self.write_datapoint(dp::AWAY_DELAY, Some(&minutes.to_string()))
            .await
    }

    pub async fn set_heater(&self, on: bool) -> Result<(), ApiError> {
        self.write_datapoint(dp::HEATER, Some(if on { "1" } else { "0" }))
            .await
    }

    /// Hand mode control back to the week calendar.
    pub async fn set_calendar_active(&self) -> Result<(), ApiError> {
        self.write_datapoint(dp::MODE_HOME_HIGH_CAL_PUT, None).await
    }

    pub async fn set_calendar_temporary_override(&self, value: &str) -> Result<(), ApiError> {
        self.write_datapoint(dp::CALENDAR_TEMPORARY_OVERRIDE, Some(value))
            .await
    }
}
