use crate::core::lot::DEFAULT_RATE_PER_HOUR;
use crate::utils::error::{ParkingError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_rate, validate_required_field,
    validate_unique_names, Validate,
};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::Path;
use std::str::FromStr;

/// Furthest back an arrival may be dated: one hundred years.
pub const MAX_PARKED_MINUTES_AGO: i64 = 100 * 365 * 24 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityConfig {
    pub facility: FacilitySection,
    pub attendant: Option<AttendantConfig>,
    #[serde(default)]
    pub lots: Vec<LotConfig>,
    #[serde(default)]
    pub arrivals: Vec<ArrivalConfig>,
    #[serde(default)]
    pub departures: Vec<DepartureConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilitySection {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendantConfig {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotConfig {
    pub name: String,
    pub capacity: usize,
    pub rate_per_hour: Option<f64>,
}

impl LotConfig {
    pub fn rate_per_hour(&self) -> f64 {
        self.rate_per_hour.unwrap_or(DEFAULT_RATE_PER_HOUR)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrivalConfig {
    pub plate: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub make: String,
    #[serde(default)]
    pub model: String,
    #[serde(default = "default_size")]
    pub size: String,
    #[serde(default)]
    pub accessible: bool,
    /// Ask for an accessible space; defaults to the vehicle's own flag.
    pub needs_accessible: Option<bool>,
    #[serde(default)]
    pub oversized: bool,
    pub row: Option<String>,
    pub parked_minutes_ago: Option<i64>,
}

impl ArrivalConfig {
    pub fn needs_accessible(&self) -> bool {
        self.needs_accessible.unwrap_or(self.accessible)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartureConfig {
    pub plate: String,
}

fn default_size() -> String {
    "medium".to_string()
}

impl FacilityConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            tracing::debug!(path = %path.display(), error = %e, "facility config unreadable");
            ParkingError::IoError(e)
        })?;
        raw.parse()
    }

    /// Parses TOML after expanding `${NAME}` environment references.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        content.parse()
    }

    pub fn attendant_name(&self) -> Result<&str> {
        validate_required_field("attendant", &self.attendant).map(|a| a.name.as_str())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("facility.name", &self.facility.name)?;
        validate_non_empty_string("attendant.name", self.attendant_name()?)?;

        if self.lots.is_empty() {
            return Err(ParkingError::MissingConfigError {
                field: "lots".to_string(),
            });
        }

        for lot in &self.lots {
            validate_non_empty_string("lots.name", &lot.name)?;
            validate_positive_number("lots.capacity", lot.capacity, 1)?;
            validate_rate("lots.rate_per_hour", lot.rate_per_hour())?;
        }
        validate_unique_names("lots.name", self.lots.iter().map(|l| l.name.as_str()))?;

        for arrival in &self.arrivals {
            validate_non_empty_string("arrivals.plate", &arrival.plate)?;
            if let Some(minutes) = arrival.parked_minutes_ago {
                let reason = if minutes < 0 {
                    "Entry time cannot be in the future"
                } else if minutes > MAX_PARKED_MINUTES_AGO {
                    "Entry time is more than a hundred years ago"
                } else {
                    continue;
                };
                return Err(ParkingError::InvalidConfigValueError {
                    field: "arrivals.parked_minutes_ago".to_string(),
                    value: minutes.to_string(),
                    reason: reason.to_string(),
                });
            }
        }

        for departure in &self.departures {
            validate_non_empty_string("departures.plate", &departure.plate)?;
        }

        Ok(())
    }

    pub fn total_capacity(&self) -> usize {
        self.lots.iter().map(|l| l.capacity).sum()
    }
}

impl FromStr for FacilityConfig {
    type Err = ParkingError;

    fn from_str(content: &str) -> Result<Self> {
        let expanded = expand_env(content)?;
        toml::from_str(&expanded).map_err(|e| ParkingError::ConfigValidationError {
            field: "toml".to_string(),
            message: e.message().to_string(),
        })
    }
}

/// Unset variables stay as written so the parse or validation error names them.
fn expand_env(content: &str) -> Result<Cow<'_, str>> {
    let reference = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").map_err(|e| ParkingError::ConfigError {
        message: e.to_string(),
    })?;

    Ok(reference.replace_all(content, |caps: &Captures| match std::env::var(&caps[1]) {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(variable = &caps[1], "environment variable not set, left unexpanded");
            caps[0].to_string()
        }
    }))
}

impl Validate for FacilityConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
