use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::datapoints::{MODE_AWAY_PUT, MODE_FIREPLACE_PUT, MODE_HIGH_TEMP_PUT, MODE_HOME_HIGH_CAL_PUT};

/// Operating mode reported by the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VentilationMode {
    Null,
    Off,
    Away,
    Home,
    High,
    CookerHood,
    Fireplace,
    /// Forced ventilation running on a timer.
    HighDelayed,
    Unknown(i64),
}

impl VentilationMode {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Null,
            1 => Self::Off,
            2 => Self::Away,
            3 => Self::Home,
            4 => Self::High,
            5 => Self::CookerHood,
            6 => Self::Fireplace,
            7 => Self::HighDelayed,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for VentilationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Off => f.write_str("OFF"),
            Self::Away => f.write_str("AWAY"),
            Self::Home => f.write_str("HOME"),
            Self::High => f.write_str("HIGH"),
            Self::CookerHood => f.write_str("COOKER_HOOD"),
            Self::Fireplace => f.write_str("FIREPLACE"),
            Self::HighDelayed => f.write_str("HIGH_DELAYED"),
            Self::Unknown(code) => write!(f, "Unknown mode: {}", code),
        }
    }
}

impl Serialize for VentilationMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Mode a caller can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresetMode {
    Home,
    Away,
    AwayDelayed,
    High,
    HighOnTimer,
    Fireplace,
}

/// One datapoint write making up a mode change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeWrite {
    pub path: &'static str,
    pub value: i64,
}

impl PresetMode {
    pub const ALL: [PresetMode; 6] = [
        Self::Home,
        Self::Away,
        Self::AwayDelayed,
        Self::High,
        Self::HighOnTimer,
        Self::Fireplace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "HOME",
            Self::Away => "AWAY",
            Self::AwayDelayed => "AWAY_DELAYED",
            Self::High => "HIGH",
            Self::HighOnTimer => "HIGH_ONTIMER",
            Self::Fireplace => "FIREPLACE",
        }
    }

    /// The write that selects this mode.
    pub fn write(&self) -> ModeWrite {
        let (path, value) = match self {
            Self::Away => (MODE_AWAY_PUT, 0),
            Self::AwayDelayed => (MODE_AWAY_PUT, 1),
            Self::Home => (MODE_HOME_HIGH_CAL_PUT, 3),
            Self::High => (MODE_HOME_HIGH_CAL_PUT, 4),
            Self::HighOnTimer => (MODE_HIGH_TEMP_PUT, 2),
            Self::Fireplace => (MODE_FIREPLACE_PUT, 2),
        };
        ModeWrite { path, value }
    }

    /// Whether the unit is already running this mode.
    pub fn matches(&self, current: VentilationMode) -> bool {
        matches!(
            (self, current),
            (Self::Home, VentilationMode::Home)
                | (Self::Away, VentilationMode::Away)
                | (Self::High, VentilationMode::High)
                | (Self::Fireplace, VentilationMode::Fireplace)
                | (Self::HighOnTimer, VentilationMode::HighDelayed)
        )
    }

    /// Writes needed to go from `current` to this mode, in order. Empty when
    /// the unit already runs it.
    ///
    /// Away, fireplace and timed high are latched on the unit and have to be
    /// released with a toggle write before another mode takes effect.
    pub fn transition_from(&self, current: VentilationMode) -> Vec<ModeWrite> {
        if self.matches(current) {
            return Vec::new();
        }

        let release = match current {
            VentilationMode::Away => Some(Self::AwayDelayed.write()),
            VentilationMode::HighDelayed => Some(Self::HighOnTimer.write()),
            VentilationMode::Fireplace => Some(Self::Fireplace.write()),
            _ => None,
        };

        let target = self.write();
        let mut writes = Vec::with_capacity(2);
        if let Some(release) = release {
            if release != target {
                writes.push(release);
            }
        }
        writes.push(target);
        writes
    }
}

impl fmt::Display for PresetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresetMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| format!("{} is not a valid mode", s))
    }
}

/// Outcome of a successful preset mode request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum ModeChange {
    /// The unit already ran the requested mode; nothing was written.
    Unchanged,
    Applied { writes: usize },
}
