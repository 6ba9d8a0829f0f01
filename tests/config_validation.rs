//! Configuration loading and construction-time validation: bad options must
//! fail before propagation, never at step time.

use std::io::Write;

use astroprop::config::{self, ConfigError};
use astroprop::scenario::{self, Providers};
use astroprop::session::SessionState;
use tempfile::NamedTempFile;

fn write_temp(contents: &str, suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

const GOOD_SCENARIO: &str = r"
integrator:
  method: adaptive45
  max_step_s: 120.0
force_models:
  - type: point_mass_gravity
  - type: harmonic_gravity
    degree: 3
events:
  - name: low_gate
    kind: altitude
    threshold: 400.0
    direction: falling
initial_state:
  epoch:
    seconds_j2000: 0.0
    scale: TDB
  frame: GCRF
  position_km: [6878.0, 0.0, 0.0]
  velocity_km_s: [0.0, 7.6126837456899, 0.0]
";

#[test]
fn good_scenario_loads_builds_and_runs() {
    let file = write_temp(GOOD_SCENARIO, ".yaml");
    let scenario_config = config::load_scenario(file.path()).unwrap();
    let mut session = scenario::build_session(&scenario_config, &Providers::builtin()).unwrap();
    let outcome = session.propagate_by(600.0).unwrap();
    assert_eq!(session.session_state(), SessionState::Completed);
    assert!(!outcome.steps.is_empty());
}

#[test]
fn min_step_above_max_step_fails_at_load() {
    let yaml = r"
integrator:
  method: adaptive45
  min_step_s: 10.0
  max_step_s: 1.0
";
    let file = write_temp(yaml, ".yaml");
    let err = config::load_scenario(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. }), "got {err}");
}

#[test]
fn unknown_force_model_name_fails_at_parse() {
    let yaml = r"
integrator:
  method: adaptive45
force_models:
  - type: lift
";
    let file = write_temp(yaml, ".yaml");
    let err = config::load_scenario(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)), "got {err}");
}

#[test]
fn unknown_integrator_method_fails_at_parse() {
    let yaml = r"
integrator:
  method: adaptive78
";
    let file = write_temp(yaml, ".yaml");
    assert!(config::load_scenario(file.path()).is_err());
}

#[test]
fn toml_scenarios_load_too() {
    let toml_doc = r#"
[integrator]
method = "fixed4"
initial_step_s = 5.0

[[force_models]]
type = "point_mass_gravity"

[initial_state]
frame = "GCRF"
position_km = [7000.0, 0.0, 0.0]
velocity_km_s = [0.0, 7.546, 0.0]

[initial_state.epoch]
seconds_j2000 = 0.0
"#;
    let file = write_temp(toml_doc, ".toml");
    let scenario_config = config::load_scenario(file.path()).unwrap();
    let mut session = scenario::build_session(&scenario_config, &Providers::builtin()).unwrap();
    session.propagate_by(60.0).unwrap();
}

#[test]
fn missing_initial_state_fails_assembly_not_propagation() {
    let yaml = r"
integrator:
  method: adaptive45
";
    let file = write_temp(yaml, ".yaml");
    let scenario_config = config::load_scenario(file.path()).unwrap();
    let err = scenario::build_session(&scenario_config, &Providers::builtin()).unwrap_err();
    assert!(matches!(
        err,
        scenario::ScenarioError::MissingInitialState
    ));
}

#[test]
fn unknown_frame_fails_assembly() {
    let yaml = r"
integrator:
  method: adaptive45
initial_state:
  epoch:
    seconds_j2000: 0.0
  frame: EME2000
  position_km: [7000.0, 0.0, 0.0]
  velocity_km_s: [0.0, 7.5, 0.0]
";
    let file = write_temp(yaml, ".yaml");
    let scenario_config = config::load_scenario(file.path()).unwrap();
    let err = scenario::build_session(&scenario_config, &Providers::builtin()).unwrap_err();
    assert!(matches!(err, scenario::ScenarioError::UnknownFrame(_)));
}

#[test]
fn tesseral_harmonics_fail_assembly_with_a_clear_error() {
    let yaml = r"
integrator:
  method: adaptive45
force_models:
  - type: harmonic_gravity
    degree: 8
    order: 8
initial_state:
  epoch:
    seconds_j2000: 0.0
  frame: GCRF
  position_km: [7000.0, 0.0, 0.0]
  velocity_km_s: [0.0, 7.5, 0.0]
";
    let file = write_temp(yaml, ".yaml");
    let scenario_config = config::load_scenario(file.path()).unwrap();
    let err = scenario::build_session(&scenario_config, &Providers::builtin()).unwrap_err();
    assert!(matches!(err, scenario::ScenarioError::Force(_)), "got {err}");
}
