use serde::Serialize;

use crate::api::ApiError;
use crate::datapoints as dp;

use super::values::DatapointValues;

/// Identity and health of the controller.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub firmware_revision: String,
    pub model_name: String,
    pub model_information: String,
    pub serial_number: String,
    pub system_status: String,
    /// Cloud connectivity as reported by the portal.
    pub status: String,
    pub device_description: String,
    pub application_software_version: String,
    pub last_restart_reason: i64,
}

impl DeviceInfo {
    pub fn from_values(values: &DatapointValues) -> Result<Self, ApiError> {
        Ok(Self {
            firmware_revision: values.device_str(dp::FIRMWARE_REVISION)?,
            model_name: values.device_str(dp::MODEL_NAME)?,
            model_information: values.device_str(dp::MODEL_INFORMATION)?,
            serial_number: values.device_str(dp::SERIAL_NUMBER)?,
            system_status: values.device_str(dp::SYSTEM_STATUS)?,
            status: values.device_str(dp::OFFLINE_ONLINE)?,
            device_description: values.device_str(dp::DEVICE_DESCRIPTION)?,
            application_software_version: values.device_str(dp::APPLICATION_SOFTWARE_VERSION)?,
            last_restart_reason: values.device_int(dp::LAST_RESTART_REASON)?,
        })
    }
}
