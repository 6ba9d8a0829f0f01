//! Scenario assembly: turn a parsed configuration document into a runnable
//! propagation session wired to a set of providers.

use std::sync::Arc;

use astroprop_config::{
    AtmosphereConfig, ConfigError, EventConfig, EventDirectionName, EventKindName,
    ForceModelConfig, IntegratorMethodName, ScenarioConfig, ShadowModelName,
    ThrustDirectionConfig,
};
use astroprop_core::constants::{
    EARTH_RADIUS_KM, MU_EARTH_KM3_S2, MU_MOON_KM3_S2, MU_SUN_KM3_S2, OMEGA_EARTH_RAD_S,
    SOLAR_PRESSURE_1AU_N_M2, SUN_RADIUS_KM,
};
use astroprop_core::state::{Attitude, Frame, StateVector};
use astroprop_core::time::{Epoch, TimeScale};
use astroprop_events::{EventDefinition, EventDirection};
use astroprop_export::TrajectoryRecord;
use astroprop_forces::shadow::{self, ShadowGeometry};
use astroprop_forces::{
    Atmosphere, AtmosphericDrag, ConstantThrust, ForceError, ForceRegistry, HarmonicGravity,
    PointMassGravity, ShadowModel, SolarRadiationPressure, ThirdBody, ThrustDirection,
};
use astroprop_frames::builtin::{AnalyticEphemeris, GmstFrameProvider, TableTimeProvider};
use astroprop_frames::{Body, EphemerisProvider, FrameAdapter};
use astroprop_session::{
    IntegratorMethod, PropagationOutcome, PropagationSession, SessionConfig, SessionError,
    StateLayout,
};
use thiserror::Error;

/// The external data sources a scenario runs against.
#[derive(Clone)]
pub struct Providers {
    pub adapter: Arc<FrameAdapter>,
    pub ephemeris: Arc<dyn EphemerisProvider>,
}

impl Providers {
    /// Low-precision built-in providers; fine for testing and rough work,
    /// not for precision products.
    pub fn builtin() -> Self {
        Self {
            adapter: Arc::new(FrameAdapter::new(
                Arc::new(GmstFrameProvider::new()),
                Arc::new(TableTimeProvider::with_bundled_table()),
            )),
            ephemeris: Arc::new(AnalyticEphemeris::new()),
        }
    }
}

/// Errors from scenario assembly.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Force(#[from] ForceError),
    #[error("scenario has no initial_state block")]
    MissingInitialState,
    #[error("unknown frame `{0}`")]
    UnknownFrame(String),
    #[error("unknown time scale `{0}`")]
    UnknownTimeScale(String),
    #[error("unknown body `{0}`")]
    UnknownBody(String),
}

/// Build a ready-to-run session from a validated scenario config.
pub fn build_session(
    scenario: &ScenarioConfig,
    providers: &Providers,
) -> Result<PropagationSession, ScenarioError> {
    scenario.validate()?;

    let initial_config = scenario
        .initial_state
        .as_ref()
        .ok_or(ScenarioError::MissingInitialState)?;
    let frame = Frame::from_name(&initial_config.frame)
        .ok_or_else(|| ScenarioError::UnknownFrame(initial_config.frame.clone()))?;
    let epoch = resolve_epoch(&initial_config.epoch)?;

    let spacecraft = scenario.spacecraft.as_ref();
    let mass_kg = spacecraft.and_then(|s| s.mass_kg);
    let layout = StateLayout {
        mass: spacecraft.map(|s| s.propagate_mass).unwrap_or(false),
        attitude: spacecraft.map(|s| s.propagate_attitude).unwrap_or(false),
    };

    let mut initial = StateVector::new(
        initial_config.position_km,
        initial_config.velocity_km_s,
        frame,
        epoch,
    );
    initial.mass_kg = mass_kg;
    if layout.attitude {
        initial.attitude = Some(Attitude::identity());
    }

    let registry = ForceRegistry::new(providers.adapter.clone());
    for model in &scenario.force_models {
        // Burn windows must live on the propagation time scale; a mismatch
        // here would otherwise only surface mid-step.
        if let ForceModelConfig::ConstantThrust { start, .. } = model {
            let burn_start = resolve_epoch(start)?;
            if burn_start.scale() != epoch.scale() {
                return Err(ScenarioError::Config(ConfigError::Invalid {
                    message: format!(
                        "constant_thrust start is on {} but the initial state is on {}",
                        burn_start.scale(),
                        epoch.scale()
                    ),
                }));
            }
        }
        registry.add(build_force_model(model, mass_kg, &providers.ephemeris)?)?;
    }

    let config = SessionConfig {
        method: match scenario.integrator.method {
            IntegratorMethodName::Fixed4 => IntegratorMethod::Fixed4,
            IntegratorMethodName::Adaptive45 => IntegratorMethod::Adaptive45,
        },
        relative_tolerance: scenario.integrator.relative_tolerance,
        absolute_tolerance: scenario.integrator.absolute_tolerance,
        min_step_s: scenario.integrator.min_step_s,
        max_step_s: scenario.integrator.max_step_s,
        initial_step_s: scenario.integrator.initial_step_s,
        layout,
        inertia_kg_m2: spacecraft
            .and_then(|s| s.inertia_kg_m2)
            .unwrap_or([1.0, 1.0, 1.0]),
        ..SessionConfig::default()
    };

    let mut session = PropagationSession::new(initial, registry, config)?;
    for event in &scenario.events {
        session.add_event(build_event(event, &providers.ephemeris));
    }
    Ok(session)
}

fn resolve_epoch(config: &astroprop_config::EpochConfig) -> Result<Epoch, ScenarioError> {
    let (seconds, scale_name) = config.resolve()?;
    let scale = TimeScale::from_name(&scale_name)
        .ok_or_else(|| ScenarioError::UnknownTimeScale(scale_name))?;
    Ok(Epoch::from_seconds_since_j2000(seconds, scale))
}

fn build_force_model(
    config: &ForceModelConfig,
    mass_kg: Option<f64>,
    ephemeris: &Arc<dyn EphemerisProvider>,
) -> Result<Box<dyn astroprop_forces::ForceModel>, ScenarioError> {
    let model: Box<dyn astroprop_forces::ForceModel> = match config {
        ForceModelConfig::PointMassGravity { mu_km3_s2 } => Box::new(PointMassGravity::new(
            mu_km3_s2.unwrap_or(MU_EARTH_KM3_S2),
        )),
        ForceModelConfig::HarmonicGravity {
            degree,
            order,
            mu_km3_s2,
            reference_radius_km,
            zonal,
        } => {
            let coefficients = zonal.clone().unwrap_or_else(|| {
                use astroprop_core::constants::{EARTH_J2, EARTH_J3, EARTH_J4};
                vec![EARTH_J2, EARTH_J3, EARTH_J4]
            });
            Box::new(HarmonicGravity::with_degree_order(
                mu_km3_s2.unwrap_or(MU_EARTH_KM3_S2),
                reference_radius_km.unwrap_or(EARTH_RADIUS_KM),
                *degree,
                *order,
                coefficients,
            )?)
        }
        ForceModelConfig::Drag {
            coefficient,
            area_m2,
            atmosphere,
        } => {
            let atmosphere = match atmosphere {
                Some(AtmosphereConfig::Exponential {
                    rho0_kg_m3,
                    scale_height_km,
                }) => Atmosphere::Exponential {
                    rho0_kg_m3: *rho0_kg_m3,
                    scale_height_km: *scale_height_km,
                },
                Some(AtmosphereConfig::Tabulated { points }) => Atmosphere::Tabulated {
                    points: points.clone(),
                },
                None => Atmosphere::standard_exponential(),
            };
            Box::new(AtmosphericDrag::new(
                *coefficient,
                *area_m2,
                mass_kg,
                atmosphere,
                EARTH_RADIUS_KM,
                OMEGA_EARTH_RAD_S,
            )?)
        }
        ForceModelConfig::SolarRadiationPressure {
            coefficient,
            area_m2,
            shadow,
        } => Box::new(SolarRadiationPressure::new(
            *coefficient,
            *area_m2,
            mass_kg,
            SOLAR_PRESSURE_1AU_N_M2,
            match shadow {
                ShadowModelName::None => ShadowModel::None,
                ShadowModelName::Cylindrical => ShadowModel::Cylindrical,
                ShadowModelName::Conical => ShadowModel::Conical,
            },
            earth_shadow_geometry(),
            ephemeris.clone(),
        )?),
        ForceModelConfig::ThirdBody { bodies } => {
            let mut resolved = Vec::with_capacity(bodies.len());
            for name in bodies {
                let body = Body::from_name(name)
                    .ok_or_else(|| ScenarioError::UnknownBody(name.clone()))?;
                let mu = match body {
                    Body::Sun => MU_SUN_KM3_S2,
                    Body::Moon => MU_MOON_KM3_S2,
                    Body::Earth => MU_EARTH_KM3_S2,
                };
                resolved.push((body, mu));
            }
            Box::new(ThirdBody::new(resolved, ephemeris.clone()))
        }
        ForceModelConfig::ConstantThrust {
            thrust_newtons,
            isp_seconds,
            direction,
            start,
            duration_s,
        } => Box::new(ConstantThrust::new(
            *thrust_newtons,
            *isp_seconds,
            match direction {
                ThrustDirectionConfig::AlongVelocity => ThrustDirection::AlongVelocity,
                ThrustDirectionConfig::AntiVelocity => ThrustDirection::AntiVelocity,
                ThrustDirectionConfig::Inertial(v) => ThrustDirection::Inertial(*v),
            },
            resolve_epoch(start)?,
            *duration_s,
            mass_kg,
        )?),
    };
    Ok(model)
}

fn build_event(config: &EventConfig, ephemeris: &Arc<dyn EphemerisProvider>) -> EventDefinition {
    let direction = match config.direction {
        EventDirectionName::Rising => EventDirection::Rising,
        EventDirectionName::Falling => EventDirection::Falling,
        EventDirectionName::Either => EventDirection::Either,
    };
    match config.kind {
        EventKindName::Altitude => EventDefinition::altitude(
            config.name.clone(),
            EARTH_RADIUS_KM,
            config.threshold,
            direction,
            config.time_tolerance_s,
        ),
        EventKindName::Apsis => {
            EventDefinition::apsis(config.name.clone(), direction, config.time_tolerance_s)
        }
        EventKindName::Node => {
            EventDefinition::node(config.name.clone(), direction, config.time_tolerance_s)
        }
        EventKindName::Eclipse => eclipse_event(
            config.name.clone(),
            ephemeris.clone(),
            earth_shadow_geometry(),
            direction,
            config.time_tolerance_s,
        ),
    }
}

fn earth_shadow_geometry() -> ShadowGeometry {
    ShadowGeometry {
        body_radius_km: EARTH_RADIUS_KM,
        sun_radius_km: SUN_RADIUS_KM,
    }
}

/// Eclipse entry/exit event: the g-function is the signed distance to the
/// penumbra cone, so a falling crossing is eclipse entry and a rising one
/// is exit. If the ephemeris provider fails at a sampled epoch the sample
/// evaluates to NaN and is skipped by the detector; force evaluation using
/// the same provider surfaces the gap as a hard error instead.
pub fn eclipse_event(
    name: impl Into<String>,
    ephemeris: Arc<dyn EphemerisProvider>,
    geometry: ShadowGeometry,
    direction: EventDirection,
    time_tolerance_s: f64,
) -> EventDefinition {
    EventDefinition::new(
        name,
        Box::new(move |state: &StateVector| {
            match ephemeris.body_state(Body::Sun, state.epoch) {
                Ok((sun_position, _)) => {
                    shadow::penumbra_depth_km(&state.position_km, &sun_position, &geometry)
                }
                Err(_) => f64::NAN,
            }
        }),
        0.0,
        direction,
        time_tolerance_s,
    )
}

/// Flatten a propagate call's outcome into exchange records, starting from
/// the pre-step initial state.
pub fn trajectory_records(
    initial: &StateVector,
    outcome: &PropagationOutcome,
) -> Vec<TrajectoryRecord> {
    let mut records = Vec::with_capacity(outcome.steps.len() + 1);
    records.push(TrajectoryRecord::from_state(initial, 0.0, 0.0));
    for step in &outcome.steps {
        records.push(TrajectoryRecord::from_state(
            &step.state,
            step.step_s,
            step.error_estimate,
        ));
    }
    records
}
