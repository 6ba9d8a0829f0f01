//! Configuration models and loaders for astroprop scenarios.
//!
//! Scenario documents are YAML or TOML. Parsing is strict: unknown fields,
//! unknown force-model types, and unknown event kinds are parse errors, and
//! [`ScenarioConfig::validate`] catches contradictory numerics before a
//! session is ever constructed.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur while loading or validating configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// Top-level scenario document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    pub integrator: IntegratorConfig,
    #[serde(default)]
    pub force_models: Vec<ForceModelConfig>,
    #[serde(default)]
    pub events: Vec<EventConfig>,
    #[serde(default)]
    pub spacecraft: Option<SpacecraftConfig>,
    #[serde(default)]
    pub initial_state: Option<InitialStateConfig>,
}

/// Integrator settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntegratorConfig {
    pub method: IntegratorMethodName,
    #[serde(default = "defaults::relative_tolerance")]
    pub relative_tolerance: f64,
    #[serde(default = "defaults::absolute_tolerance")]
    pub absolute_tolerance: f64,
    #[serde(default = "defaults::min_step_s")]
    pub min_step_s: f64,
    #[serde(default = "defaults::max_step_s")]
    pub max_step_s: f64,
    #[serde(default = "defaults::initial_step_s")]
    pub initial_step_s: f64,
}

mod defaults {
    pub fn relative_tolerance() -> f64 {
        1e-10
    }
    pub fn absolute_tolerance() -> f64 {
        1e-9
    }
    pub fn min_step_s() -> f64 {
        1e-3
    }
    pub fn max_step_s() -> f64 {
        600.0
    }
    pub fn initial_step_s() -> f64 {
        10.0
    }
    pub fn event_time_tolerance_s() -> f64 {
        1e-3
    }
}

/// Recognized integration methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum IntegratorMethodName {
    #[serde(rename = "fixed4")]
    Fixed4,
    #[serde(rename = "adaptive45")]
    Adaptive45,
}

/// Force model entries. The tag is the model name; an unrecognized tag is a
/// parse error by design — a typo must not silently drop a force.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ForceModelConfig {
    PointMassGravity {
        #[serde(default)]
        mu_km3_s2: Option<f64>,
    },
    HarmonicGravity {
        degree: u32,
        #[serde(default)]
        order: u32,
        #[serde(default)]
        mu_km3_s2: Option<f64>,
        #[serde(default)]
        reference_radius_km: Option<f64>,
        /// Zonal coefficients starting at J2; defaults to the bundled Earth
        /// values when omitted.
        #[serde(default)]
        zonal: Option<Vec<f64>>,
    },
    Drag {
        coefficient: f64,
        area_m2: f64,
        #[serde(default)]
        atmosphere: Option<AtmosphereConfig>,
    },
    SolarRadiationPressure {
        coefficient: f64,
        area_m2: f64,
        #[serde(default = "shadow_default")]
        shadow: ShadowModelName,
    },
    ThirdBody {
        bodies: Vec<String>,
    },
    ConstantThrust {
        thrust_newtons: f64,
        isp_seconds: f64,
        direction: ThrustDirectionConfig,
        start: EpochConfig,
        duration_s: f64,
    },
}

fn shadow_default() -> ShadowModelName {
    ShadowModelName::Conical
}

/// Atmospheric density configuration for the drag model.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum AtmosphereConfig {
    Exponential {
        rho0_kg_m3: f64,
        scale_height_km: f64,
    },
    Tabulated {
        /// `(altitude_km, density_kg_m3)` pairs sorted by altitude.
        points: Vec<(f64, f64)>,
    },
}

/// Shadow model names for SRP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadowModelName {
    None,
    Cylindrical,
    Conical,
}

/// Thrust direction for finite burns.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThrustDirectionConfig {
    AlongVelocity,
    AntiVelocity,
    Inertial([f64; 3]),
}

/// Event entries: built-in scalar kinds with thresholds and direction
/// filters.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventConfig {
    pub name: String,
    pub kind: EventKindName,
    /// Threshold in the kind's natural unit (km for altitude; unused for
    /// apsis/node/eclipse).
    #[serde(default)]
    pub threshold: f64,
    pub direction: EventDirectionName,
    #[serde(default = "defaults::event_time_tolerance_s")]
    pub time_tolerance_s: f64,
}

/// Recognized built-in event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKindName {
    Altitude,
    Apsis,
    Node,
    Eclipse,
}

/// Crossing-direction filter names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventDirectionName {
    Rising,
    Falling,
    Either,
}

/// Spacecraft physical properties shared by drag/SRP/thrust models and the
/// optional mass/attitude degrees of freedom.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpacecraftConfig {
    #[serde(default)]
    pub mass_kg: Option<f64>,
    #[serde(default)]
    pub propagate_mass: bool,
    #[serde(default)]
    pub propagate_attitude: bool,
    #[serde(default)]
    pub inertia_kg_m2: Option<[f64; 3]>,
}

/// Initial state block.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InitialStateConfig {
    pub epoch: EpochConfig,
    /// Frame name (`GCRF`, `ITRF`, `TEME`).
    pub frame: String,
    pub position_km: [f64; 3],
    pub velocity_km_s: [f64; 3],
}

/// An epoch given either as seconds past J2000 in a named scale or as a UTC
/// calendar string (RFC 3339).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EpochConfig {
    #[serde(default)]
    pub seconds_j2000: Option<f64>,
    #[serde(default)]
    pub calendar_utc: Option<String>,
    /// Scale for `seconds_j2000` (default TDB); a calendar epoch is always
    /// UTC.
    #[serde(default)]
    pub scale: Option<String>,
}

impl EpochConfig {
    /// Resolve to `(seconds_past_j2000, scale_name)`.
    pub fn resolve(&self) -> Result<(f64, String), ConfigError> {
        match (self.seconds_j2000, &self.calendar_utc) {
            (Some(_), Some(_)) => Err(ConfigError::invalid(
                "epoch must set exactly one of seconds_j2000 and calendar_utc, not both",
            )),
            (Some(seconds), None) => {
                let scale = self.scale.clone().unwrap_or_else(|| "TDB".to_string());
                Ok((seconds, scale))
            }
            (None, Some(calendar)) => {
                if self.scale.is_some() {
                    return Err(ConfigError::invalid(
                        "calendar_utc epochs are always UTC; drop the scale field",
                    ));
                }
                let parsed: DateTime<Utc> = calendar.parse().map_err(|e| {
                    ConfigError::invalid(format!("unparseable calendar epoch `{calendar}`: {e}"))
                })?;
                let j2000 = Utc
                    .with_ymd_and_hms(2000, 1, 1, 12, 0, 0)
                    .single()
                    .expect("J2000 is a valid UTC timestamp");
                let delta = parsed.signed_duration_since(j2000);
                let seconds = delta.num_microseconds().map_or_else(
                    || delta.num_seconds() as f64,
                    |micros| micros as f64 / 1e6,
                );
                Ok((seconds, "UTC".to_string()))
            }
            (None, None) => Err(ConfigError::invalid(
                "epoch needs seconds_j2000 or calendar_utc",
            )),
        }
    }
}

/// Load a scenario from a YAML or TOML file (dispatched on extension:
/// `.toml` is TOML, anything else is read as YAML) and validate it.
pub fn load_scenario<P: AsRef<Path>>(path: P) -> Result<ScenarioConfig, ConfigError> {
    let path = path.as_ref();
    let scenario: ScenarioConfig = if path.extension().map(|ext| ext == "toml").unwrap_or(false) {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)?
    } else {
        let reader = File::open(path)?;
        serde_yaml::from_reader(reader)?
    };
    scenario.validate()?;
    Ok(scenario)
}

impl ScenarioConfig {
    /// Semantic validation beyond what serde enforces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let integrator = &self.integrator;
        if !(integrator.absolute_tolerance > 0.0 && integrator.absolute_tolerance.is_finite()) {
            return Err(ConfigError::invalid("absolute_tolerance must be positive"));
        }
        if !(integrator.relative_tolerance >= 0.0 && integrator.relative_tolerance.is_finite()) {
            return Err(ConfigError::invalid(
                "relative_tolerance must be non-negative",
            ));
        }
        if !(integrator.min_step_s > 0.0) {
            return Err(ConfigError::invalid("min_step_s must be positive"));
        }
        if integrator.min_step_s > integrator.max_step_s {
            return Err(ConfigError::invalid(format!(
                "min_step_s ({}) exceeds max_step_s ({})",
                integrator.min_step_s, integrator.max_step_s
            )));
        }
        if integrator.initial_step_s < integrator.min_step_s
            || integrator.initial_step_s > integrator.max_step_s
        {
            return Err(ConfigError::invalid(
                "initial_step_s must lie within [min_step_s, max_step_s]",
            ));
        }

        for model in &self.force_models {
            model.validate()?;
        }

        let mut seen = std::collections::BTreeSet::new();
        for event in &self.events {
            if !seen.insert(event.name.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "duplicate event name `{}`",
                    event.name
                )));
            }
            if !(event.time_tolerance_s > 0.0) {
                return Err(ConfigError::invalid(format!(
                    "event `{}` needs a positive time_tolerance_s",
                    event.name
                )));
            }
        }

        if let Some(spacecraft) = &self.spacecraft {
            if spacecraft.propagate_attitude && spacecraft.inertia_kg_m2.is_none() {
                return Err(ConfigError::invalid(
                    "propagate_attitude requires inertia_kg_m2",
                ));
            }
            if spacecraft.propagate_mass && spacecraft.mass_kg.is_none() {
                return Err(ConfigError::invalid("propagate_mass requires mass_kg"));
            }
        }

        if let Some(initial) = &self.initial_state {
            initial.epoch.resolve()?;
        }
        Ok(())
    }
}

impl ForceModelConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::PointMassGravity { .. } => Ok(()),
            Self::HarmonicGravity { degree, order, .. } => {
                if *degree < 2 {
                    return Err(ConfigError::invalid(format!(
                        "harmonic_gravity degree must be at least 2, got {degree}"
                    )));
                }
                if *order > *degree {
                    return Err(ConfigError::invalid(format!(
                        "harmonic_gravity order ({order}) exceeds degree ({degree})"
                    )));
                }
                Ok(())
            }
            Self::Drag {
                coefficient,
                area_m2,
                ..
            } => {
                if *coefficient <= 0.0 || *area_m2 <= 0.0 {
                    return Err(ConfigError::invalid(
                        "drag coefficient and area must be positive",
                    ));
                }
                Ok(())
            }
            Self::SolarRadiationPressure {
                coefficient,
                area_m2,
                ..
            } => {
                if *coefficient <= 0.0 || *area_m2 <= 0.0 {
                    return Err(ConfigError::invalid(
                        "solar_radiation_pressure coefficient and area must be positive",
                    ));
                }
                Ok(())
            }
            Self::ThirdBody { bodies } => {
                if bodies.is_empty() {
                    return Err(ConfigError::invalid(
                        "third_body needs at least one body name",
                    ));
                }
                Ok(())
            }
            Self::ConstantThrust {
                thrust_newtons,
                isp_seconds,
                duration_s,
                start,
                ..
            } => {
                if *thrust_newtons <= 0.0 || *isp_seconds <= 0.0 || *duration_s <= 0.0 {
                    return Err(ConfigError::invalid(
                        "constant_thrust thrust, Isp, and duration must be positive",
                    ));
                }
                start.resolve()?;
                Ok(())
            }
        }
    }
}
