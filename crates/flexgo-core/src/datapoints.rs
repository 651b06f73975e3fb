//! Datapoint path suffixes of the Flexit controller.
//!
//! Full paths are the plant id followed by one of these suffixes.

use serde_json::json;

// Mode writes
pub const MODE_AWAY_PUT: &str = ";1!005000032000055";
pub const MODE_HOME_HIGH_CAL_PUT: &str = ";1!01300002A000055";
/// Toggles on every write.
pub const MODE_HIGH_TEMP_PUT: &str = ";1!013000165000055";
/// Toggles on every write.
pub const MODE_FIREPLACE_PUT: &str = ";1!013000168000055";

// Read and write
pub const FIREPLACE_DURATION: &str = ";1!03000010E000055";
pub const BOOST_DURATION: &str = ";1!030000125000055";
pub const AWAY_DELAY: &str = ";1!03000013E000055";
pub const CALENDAR_TEMPORARY_OVERRIDE: &str = ";1!0050001DA000055";

pub const HOME_AIR_TEMPERATURE: &str = ";1!0020007CA000055";
pub const AWAY_AIR_TEMPERATURE: &str = ";1!0020007C1000055";
pub const ROOM_TEMPERATURE: &str = ";1!00000004B000055";

/// Null, Off, Away, Home, High, Cooker hood, Fireplace, Forced ventilation
pub const MODE: &str = ";1!013000169000055";
pub const OUTSIDE_AIR_TEMPERATURE: &str = ";1!000000001000055";
pub const SUPPLY_AIR_TEMPERATURE: &str = ";1!000000004000055";
pub const EXTRACT_AIR_TEMPERATURE: &str = ";1!00000003B000055";
pub const EXHAUST_AIR_TEMPERATURE: &str = ";1!00000000B000055";
pub const HEATER: &str = ";1!0050001BD000055";
pub const FILTER_OPERATING_TIME: &str = ";1!00200011D000055";
pub const FILTER_TIME_FOR_EXCHANGE: &str = ";1!00200011E000055";
pub const ALARM_CODE_A: &str = ";1!002000008000055";
pub const ALARM_CODE_B: &str = ";1!002000082000055";

pub const HEAT_EXCHANGER_SPEED: &str = ";1!001000000000055";
pub const SUPPLY_FAN_SPEED: &str = ";1!000000005000055";
pub const SUPPLY_FAN_CONTROL_SIGNAL: &str = ";1!001000003000055";
pub const EXTRACT_FAN_SPEED: &str = ";1!00000000C000055";
pub const EXTRACT_FAN_CONTROL_SIGNAL: &str = ";1!001000004000055";
pub const ADDITIONAL_HEATER: &str = ";1!00100001D000055";

// Device
pub const OFFLINE_ONLINE: &str = ";0!Online";
pub const LAST_RESTART_REASON: &str = ";0!0083FFFFF0000C4";
pub const SYSTEM_STATUS: &str = ";0!0083FFFFF000070";
pub const APPLICATION_SOFTWARE_VERSION: &str = ";0!0083FFFFF00000C";
pub const DEVICE_DESCRIPTION: &str = ";0!0083FFFFF00001C";
pub const MODEL_NAME: &str = ";0!0083FFFFF000046";
pub const MODEL_INFORMATION: &str = ";0!0083FFFFF0012DB";
pub const SERIAL_NUMBER: &str = ";0!0083FFFFF0013EC";
pub const FIRMWARE_REVISION: &str = ";0!0083FFFFF00002C";

/// Everything `FlexitGo::sensors` reads in one batch.
pub const SENSOR_PATHS: &[&str] = &[
    MODE,
    MODE_HOME_HIGH_CAL_PUT,
    OUTSIDE_AIR_TEMPERATURE,
    SUPPLY_AIR_TEMPERATURE,
    EXTRACT_AIR_TEMPERATURE,
    EXHAUST_AIR_TEMPERATURE,
    HOME_AIR_TEMPERATURE,
    AWAY_AIR_TEMPERATURE,
    ROOM_TEMPERATURE,
    FILTER_OPERATING_TIME,
    FILTER_TIME_FOR_EXCHANGE,
    HEATER,
    HEAT_EXCHANGER_SPEED,
    SUPPLY_FAN_SPEED,
    SUPPLY_FAN_CONTROL_SIGNAL,
    EXTRACT_FAN_SPEED,
    EXTRACT_FAN_CONTROL_SIGNAL,
    ADDITIONAL_HEATER,
    ALARM_CODE_A,
    ALARM_CODE_B,
    BOOST_DURATION,
    FIREPLACE_DURATION,
    AWAY_DELAY,
    CALENDAR_TEMPORARY_OVERRIDE,
];

/// Everything `FlexitGo::device_info` reads in one batch.
pub const DEVICE_INFO_PATHS: &[&str] = &[
    APPLICATION_SOFTWARE_VERSION,
    DEVICE_DESCRIPTION,
    MODEL_NAME,
    MODEL_INFORMATION,
    SERIAL_NUMBER,
    FIRMWARE_REVISION,
    OFFLINE_ONLINE,
    SYSTEM_STATUS,
    LAST_RESTART_REASON,
];

pub fn full_path(plant_id: &str, suffix: &str) -> String {
    format!("{}{}", plant_id, suffix)
}

/// Compact JSON for the `filterId` query parameter:
/// `[{"DataPoints":"<plant><suffix>"},...]`.
pub fn values_filter(plant_id: &str, suffixes: &[&str]) -> String {
    let entries: Vec<_> = suffixes
        .iter()
        .map(|suffix| json!({ "DataPoints": full_path(plant_id, suffix) }))
        .collect();
    serde_json::Value::Array(entries).to_string()
}

/// Request path of a single datapoint, percent-encoded.
pub fn datapoint_url(plant_id: &str, suffix: &str) -> String {
    format!(
        "{}/{}",
        crate::api::client::DATAPOINTS_PATH,
        urlencoding::encode(&full_path(plant_id, suffix))
    )
}
