use chrono::{DateTime, Duration, NaiveDate};
use chrono_tz::Tz;
use serde::Serialize;

use crate::api::ApiError;
use crate::datapoints as dp;

use super::mode::VentilationMode;
use super::values::{round1, DatapointValues};

/// `presentPriority` of the mode datapoint while the week calendar drives it.
const CALENDAR_PRIORITY: i64 = 15;

#[derive(Debug, Clone, Serialize)]
pub struct SensorReadings {
    pub temperatures: Temperatures,
    pub modes: Modes,
    pub fans: Fans,
    pub alarms: Alarms,
    pub filter: FilterStatus,
    pub timestamp: DateTime<Tz>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Temperatures {
    pub home_setpoint: f64,
    pub away_setpoint: f64,
    pub outside: f64,
    pub supply: f64,
    pub exhaust: f64,
    pub extract: f64,
    pub room: f64,
    /// Heat recovery efficiency on the supply side, percent.
    pub supply_efficiency: Option<f64>,
    /// Heat recovery efficiency on the extract side, percent.
    pub extract_efficiency: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Modes {
    pub electric_heater: bool,
    pub ventilation_mode: VentilationMode,
    pub ventilation_mode_calendar: VentilationMode,
    pub heat_exchanger_speed: i64,
    pub additional_heater: bool,
    pub calendar_temporary_override: bool,
    pub calendar_active: bool,
    pub boost_duration: i64,
    pub away_delay: i64,
    pub fireplace_duration: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Fans {
    pub supply_speed: i64,
    pub supply_control_signal: f64,
    pub extract_speed: i64,
    pub extract_control_signal: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Alarms {
    pub code_a: i64,
    pub code_b: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterStatus {
    pub exchanged_on: NaiveDate,
    pub exchange_due: NaiveDate,
    pub dirty: bool,
}

/// `(supply - outside) / (extract - outside) * 100`, one decimal.
pub fn supply_efficiency(supply: f64, outside: f64, extract: f64) -> Option<f64> {
    let span = extract - outside;
    (span != 0.0).then(|| round1((supply - outside) / span * 100.0))
}

/// `(extract - exhaust) / (extract - outside) * 100`, one decimal.
pub fn extract_efficiency(outside: f64, extract: f64, exhaust: f64) -> Option<f64> {
    let span = extract - outside;
    (span != 0.0).then(|| round1((extract - exhaust) / span * 100.0))
}

impl FilterStatus {
    /// Derive filter dates from the unit's operating-hour counters.
    pub fn from_hours(
        now: DateTime<Tz>,
        operating_hours: i64,
        exchange_interval_hours: i64,
    ) -> Result<Self, ApiError> {
        let out_of_range = || {
            ApiError::InvalidResponse(format!(
                "filter counters out of range: {} of {} hours",
                operating_hours, exchange_interval_hours
            ))
        };

        let exchanged_on = Duration::try_hours(operating_hours)
            .and_then(|elapsed| now.checked_sub_signed(elapsed))
            .ok_or_else(out_of_range)?
            .date_naive();
        let exchange_due = exchange_interval_hours
            .checked_sub(operating_hours)
            .and_then(Duration::try_hours)
            .and_then(|remaining| now.checked_add_signed(remaining))
            .ok_or_else(out_of_range)?
            .date_naive();

        Ok(Self {
            exchanged_on,
            exchange_due,
            dirty: exchange_due <= now.date_naive(),
        })
    }
}

impl SensorReadings {
    pub fn from_values(values: &DatapointValues, now: DateTime<Tz>) -> Result<Self, ApiError> {
        let outside = values.sensor_float(dp::OUTSIDE_AIR_TEMPERATURE)?;
        let supply = values.sensor_float(dp::SUPPLY_AIR_TEMPERATURE)?;
        let extract = values.sensor_float(dp::EXTRACT_AIR_TEMPERATURE)?;
        let exhaust = values.sensor_float(dp::EXHAUST_AIR_TEMPERATURE)?;

        let temperatures = Temperatures {
            home_setpoint: values.sensor_float(dp::HOME_AIR_TEMPERATURE)?,
            away_setpoint: values.sensor_float(dp::AWAY_AIR_TEMPERATURE)?,
            outside,
            supply,
            exhaust,
            extract,
            room: values.sensor_float(dp::ROOM_TEMPERATURE)?,
            supply_efficiency: supply_efficiency(supply, outside, extract),
            extract_efficiency: extract_efficiency(outside, extract, exhaust),
        };

        let modes = Modes {
            electric_heater: values.sensor_bool(dp::HEATER)?,
            ventilation_mode: VentilationMode::from_code(values.sensor_int(dp::MODE)?),
            ventilation_mode_calendar: VentilationMode::from_code(
                values.sensor_int(dp::MODE_HOME_HIGH_CAL_PUT)?,
            ),
            heat_exchanger_speed: values.sensor_int(dp::HEAT_EXCHANGER_SPEED)?,
            additional_heater: values.sensor_bool(dp::ADDITIONAL_HEATER)?,
            calendar_temporary_override: values.sensor_bool(dp::CALENDAR_TEMPORARY_OVERRIDE)?,
            calendar_active: values.present_priority(dp::MODE_HOME_HIGH_CAL_PUT)?
                == CALENDAR_PRIORITY,
            boost_duration: values.sensor_int(dp::BOOST_DURATION)?,
            away_delay: values.sensor_int(dp::AWAY_DELAY)?,
            fireplace_duration: values.sensor_int(dp::FIREPLACE_DURATION)?,
        };

        let fans = Fans {
            supply_speed: values.sensor_int(dp::SUPPLY_FAN_SPEED)?,
            supply_control_signal: values.sensor_float(dp::SUPPLY_FAN_CONTROL_SIGNAL)?,
            extract_speed: values.sensor_int(dp::EXTRACT_FAN_SPEED)?,
            extract_control_signal: values.sensor_float(dp::EXTRACT_FAN_CONTROL_SIGNAL)?,
        };

        let alarms = Alarms {
            code_a: values.sensor_int(dp::ALARM_CODE_A)?,
            code_b: values.sensor_int(dp::ALARM_CODE_B)?,
        };

        let filter = FilterStatus::from_hours(
            now,
            values.sensor_int(dp::FILTER_OPERATING_TIME)?,
            values.sensor_int(dp::FILTER_TIME_FOR_EXCHANGE)?,
        )?;

        Ok(Self {
            temperatures,
            modes,
            fans,
            alarms,
            filter,
            timestamp: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Europe::Stockholm;
    use serde_json::{json, Map, Value};

    #[test]
    fn test_efficiency_formulas() {
        assert_eq!(supply_efficiency(20.0, 5.0, 22.0), Some(88.2));
        assert_eq!(extract_efficiency(5.0, 22.0, 10.0), Some(70.6));
    }

    #[test]
    fn test_efficiency_without_temperature_span() {
        assert_eq!(supply_efficiency(20.0, 21.0, 21.0), None);
        assert_eq!(extract_efficiency(21.0, 21.0, 10.0), None);
    }

    #[test]
    fn test_filter_status() {
        let now = Stockholm.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();

        let fresh = FilterStatus::from_hours(now, 48, 24 * 30).unwrap();
        assert_eq!(fresh.exchanged_on, NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());
        assert_eq!(fresh.exchange_due, NaiveDate::from_ymd_opt(2026, 11, 16).unwrap());
        assert!(!fresh.dirty);

        let due_today = FilterStatus::from_hours(now, 100, 105).unwrap();
        assert_eq!(due_today.exchange_due, now.date_naive());
        assert!(due_today.dirty);

        let overdue = FilterStatus::from_hours(now, 5000, 4380).unwrap();
        assert!(overdue.dirty);
    }

    #[test]
    fn test_filter_counters_out_of_range() {
        let now = Stockholm.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let counters = [(i64::MAX, 4380), (24, i64::MAX), (i64::MIN, 4380), (-1, i64::MAX)];
        for (operating, interval) in counters {
            assert!(
                matches!(
                    FilterStatus::from_hours(now, operating, interval),
                    Err(ApiError::InvalidResponse(_))
                ),
                "{operating} of {interval}"
            );
        }
    }

    #[test]
    fn test_from_values_huge_filter_counter() {
        let mut map = Map::new();
        for path in dp::SENSOR_PATHS {
            map.insert(format!("P1{}", path), sensor(json!(1)));
        }
        // Floats beyond i64 saturate during coercion.
        map.insert(format!("P1{}", dp::FILTER_OPERATING_TIME), sensor(json!(1e20)));

        let values = DatapointValues::from_response("P1", json!({ "values": map })).unwrap();
        let now = Stockholm.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        assert!(matches!(
            SensorReadings::from_values(&values, now),
            Err(ApiError::InvalidResponse(_))
        ));
    }

    fn sensor(value: Value) -> Value {
        json!({ "value": { "value": value, "presentPriority": 16 } })
    }

    #[test]
    fn test_from_values() {
        let mut map = Map::new();
        for path in dp::SENSOR_PATHS {
            map.insert(format!("P1{}", path), sensor(json!(0)));
        }
        let mut set = |path: &str, value: Value| {
            map.insert(format!("P1{}", path), sensor(value));
        };
        set(dp::OUTSIDE_AIR_TEMPERATURE, json!(5.0));
        set(dp::SUPPLY_AIR_TEMPERATURE, json!("20.0"));
        set(dp::EXTRACT_AIR_TEMPERATURE, json!(22.04));
        set(dp::EXHAUST_AIR_TEMPERATURE, json!(10.0));
        set(dp::MODE, json!(2));
        set(dp::HEATER, json!(1));
        set(dp::FILTER_OPERATING_TIME, json!(24));
        set(dp::FILTER_TIME_FOR_EXCHANGE, json!(4380));
        map.insert(
            format!("P1{}", dp::MODE_HOME_HIGH_CAL_PUT),
            json!({ "value": { "value": 3, "presentPriority": 15 } }),
        );

        let values = DatapointValues::from_response("P1", json!({ "values": map })).unwrap();
        let now = Stockholm.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let readings = SensorReadings::from_values(&values, now).unwrap();

        assert_eq!(readings.temperatures.extract, 22.0);
        assert_eq!(readings.temperatures.supply_efficiency, Some(88.2));
        assert_eq!(readings.temperatures.extract_efficiency, Some(70.6));
        assert_eq!(readings.modes.ventilation_mode, VentilationMode::Away);
        assert_eq!(readings.modes.ventilation_mode_calendar, VentilationMode::Home);
        assert!(readings.modes.calendar_active);
        assert!(readings.modes.electric_heater);
        assert!(!readings.modes.additional_heater);
        assert!(!readings.filter.dirty);
        assert_eq!(readings.timestamp, now);
    }

    #[test]
    fn test_from_values_missing_datapoint() {
        let values = DatapointValues::from_response("P1", json!({ "values": {} })).unwrap();
        let now = Stockholm.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        assert!(matches!(
            SensorReadings::from_values(&values, now),
            Err(ApiError::InvalidResponse(_))
        ));
    }
}
