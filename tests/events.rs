//! Event detection against hand-computed crossings.

use astroprop::constants::{
    AU_KM, EARTH_RADIUS_KM, MU_EARTH_KM3_S2, SUN_RADIUS_KM,
};
use astroprop::events::{CrossingDirection, EventDefinition, EventDirection};
use astroprop::forces::shadow::ShadowGeometry;
use astroprop::forces::{ForceRegistry, PointMassGravity};
use astroprop::frames::builtin::{GmstFrameProvider, TableTimeProvider};
use astroprop::frames::{Body, EphemerisProvider, FrameAdapter, FrameError};
use astroprop::scenario;
use astroprop::session::{PropagationSession, SessionConfig};
use astroprop::state::{Frame, StateVector};
use astroprop::time::{Epoch, TimeScale};
use astroprop::vector::Vector3;
use std::sync::Arc;

fn adapter() -> Arc<FrameAdapter> {
    Arc::new(FrameAdapter::new(
        Arc::new(GmstFrameProvider::new()),
        Arc::new(TableTimeProvider::with_bundled_table()),
    ))
}

fn epoch(seconds: f64) -> Epoch {
    Epoch::from_seconds_since_j2000(seconds, TimeScale::Tdb)
}

#[test]
fn constant_rate_crossing_is_found_at_the_computed_epoch() {
    // Force-free drift: x(t) = 1 km/s · t. The scalar x crosses 100 km at
    // exactly t = 100 s.
    let registry = ForceRegistry::new(adapter());
    let initial = StateVector::new([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], Frame::Gcrf, epoch(0.0));
    let config = SessionConfig {
        max_step_s: 30.0,
        ..SessionConfig::default()
    };
    let mut session = PropagationSession::new(initial, registry, config).unwrap();
    session.add_event(EventDefinition::new(
        "range_gate",
        Box::new(|state: &StateVector| state.position_km[0]),
        100.0,
        EventDirection::Rising,
        1e-6,
    ));

    let outcome = session.propagate_by(300.0).unwrap();
    assert!(outcome.refinement_failures.is_empty());
    assert_eq!(outcome.events.len(), 1);
    let event = &outcome.events[0];
    assert_eq!(event.event, "range_gate");
    assert_eq!(event.direction, CrossingDirection::Rising);
    let crossing_time = event.epoch.duration_since(&initial.epoch).unwrap();
    assert!(
        (crossing_time - 100.0).abs() < 1e-6,
        "crossed at t = {crossing_time}"
    );
    assert!((event.state.position_km[0] - 100.0).abs() < 1e-6);
}

#[test]
fn apoapsis_is_detected_half_a_period_after_periapsis() {
    let registry = ForceRegistry::new(adapter());
    registry
        .add(Box::new(PointMassGravity::new(MU_EARTH_KM3_S2)))
        .unwrap();

    // Eccentric orbit starting at periapsis.
    let periapsis_radius = 6_800.0;
    let apoapsis_radius = 13_600.0;
    let semi_major = 0.5 * (periapsis_radius + apoapsis_radius);
    let periapsis_speed =
        (MU_EARTH_KM3_S2 * (2.0 / periapsis_radius - 1.0 / semi_major)).sqrt();
    let period = 2.0 * std::f64::consts::PI * (semi_major.powi(3) / MU_EARTH_KM3_S2).sqrt();

    let initial = StateVector::new(
        [periapsis_radius, 0.0, 0.0],
        [0.0, periapsis_speed, 0.0],
        Frame::Gcrf,
        epoch(0.0),
    );
    let mut session =
        PropagationSession::new(initial, registry, SessionConfig::default()).unwrap();
    session.add_event(EventDefinition::apsis(
        "apoapsis",
        EventDirection::Falling,
        1e-4,
    ));

    let outcome = session.propagate_by(0.75 * period).unwrap();
    assert_eq!(outcome.events.len(), 1, "expected exactly one apoapsis");
    let event = &outcome.events[0];
    let crossing_time = event.epoch.duration_since(&initial.epoch).unwrap();
    assert!(
        (crossing_time - 0.5 * period).abs() < 1e-2,
        "apoapsis at t = {crossing_time}, expected {}",
        0.5 * period
    );
    assert!(
        (event.state.radius_km() - apoapsis_radius).abs() < 1.0,
        "apoapsis radius {}",
        event.state.radius_km()
    );
}

#[test]
fn node_crossings_tag_direction_correctly() {
    let registry = ForceRegistry::new(adapter());
    registry
        .add(Box::new(PointMassGravity::new(MU_EARTH_KM3_S2)))
        .unwrap();

    // Inclined circular orbit starting at the ascending node.
    let radius = 7_000.0;
    let speed = (MU_EARTH_KM3_S2 / radius).sqrt();
    let inclination: f64 = 0.9;
    let initial = StateVector::new(
        [radius, 0.0, 0.0],
        [
            0.0,
            speed * inclination.cos(),
            speed * inclination.sin(),
        ],
        Frame::Gcrf,
        epoch(0.0),
    );
    let period = 2.0 * std::f64::consts::PI * (radius.powi(3) / MU_EARTH_KM3_S2).sqrt();

    let mut session =
        PropagationSession::new(initial, registry, SessionConfig::default()).unwrap();
    session.add_event(EventDefinition::node("node", EventDirection::Either, 1e-4));

    // 1.25 periods: descending node at T/2, ascending node at T, both
    // strictly interior to the propagation span.
    let outcome = session.propagate_by(1.25 * period).unwrap();
    assert_eq!(outcome.events.len(), 2, "found {} nodes", outcome.events.len());
    assert_eq!(outcome.events[0].direction, CrossingDirection::Falling);
    assert_eq!(outcome.events[1].direction, CrossingDirection::Rising);
    let descending = outcome.events[0]
        .epoch
        .duration_since(&initial.epoch)
        .unwrap();
    let ascending = outcome.events[1]
        .epoch
        .duration_since(&initial.epoch)
        .unwrap();
    assert!(
        (descending - 0.5 * period).abs() < 1e-2,
        "descending node at {descending}"
    );
    assert!(
        (ascending - period).abs() < 1e-2,
        "ascending node at {ascending}"
    );
}

/// Sun pinned at +x, 1 AU away; turns the shadow geometry into a fixture.
struct FixedSun;

impl EphemerisProvider for FixedSun {
    fn body_state(&self, _body: Body, _epoch: Epoch) -> Result<(Vector3, Vector3), FrameError> {
        Ok(([AU_KM, 0.0, 0.0], [0.0, 0.0, 0.0]))
    }
}

#[test]
fn eclipse_entry_is_detected_at_the_cone_boundary() {
    // Force-free pass behind the Earth, parallel to the y axis at
    // x = −7000 km. Entry into penumbra happens where the off-axis distance
    // equals the cone's cross-section there.
    let registry = ForceRegistry::new(adapter());
    let initial = StateVector::new(
        [-7_000.0, 20_000.0, 0.0],
        [0.0, -3.0, 0.0],
        Frame::Gcrf,
        epoch(0.0),
    );
    let mut session = PropagationSession::new(
        initial,
        registry,
        SessionConfig {
            max_step_s: 60.0,
            ..SessionConfig::default()
        },
    )
    .unwrap();

    let geometry = ShadowGeometry {
        body_radius_km: EARTH_RADIUS_KM,
        sun_radius_km: SUN_RADIUS_KM,
    };
    session.add_event(scenario::eclipse_event(
        "penumbra",
        Arc::new(FixedSun),
        geometry,
        EventDirection::Falling,
        1e-3,
    ));

    let outcome = session.propagate_by(5_400.0).unwrap();
    assert_eq!(outcome.events.len(), 1, "expected one shadow entry");

    // Cone cross-section radius at 7000 km behind the Earth.
    let penumbra_angle = ((SUN_RADIUS_KM + EARTH_RADIUS_KM) / AU_KM).atan();
    let vertex = EARTH_RADIUS_KM / penumbra_angle.sin();
    let entry_offset = penumbra_angle.tan() * (vertex + 7_000.0);
    let expected_time = (20_000.0 - entry_offset) / 3.0;

    let event = &outcome.events[0];
    let crossing_time = event.epoch.duration_since(&initial.epoch).unwrap();
    assert!(
        (crossing_time - expected_time).abs() < 1e-2,
        "entered shadow at t = {crossing_time}, expected {expected_time}"
    );
    assert_eq!(event.direction, CrossingDirection::Falling);
}
