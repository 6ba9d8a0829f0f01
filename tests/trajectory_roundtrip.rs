//! Persisted trajectory format: serialization must reproduce every value to
//! floating-point precision.

use astroprop::constants::MU_EARTH_KM3_S2;
use astroprop::export;
use astroprop::forces::{ForceRegistry, PointMassGravity};
use astroprop::frames::FrameAdapter;
use astroprop::frames::builtin::{GmstFrameProvider, TableTimeProvider};
use astroprop::scenario;
use astroprop::session::{PropagationSession, SessionConfig};
use astroprop::state::{Frame, StateVector};
use astroprop::time::{Epoch, TimeScale};
use std::sync::Arc;

fn propagated_records() -> Vec<export::TrajectoryRecord> {
    let adapter = Arc::new(FrameAdapter::new(
        Arc::new(GmstFrameProvider::new()),
        Arc::new(TableTimeProvider::with_bundled_table()),
    ));
    let registry = ForceRegistry::new(adapter);
    registry
        .add(Box::new(PointMassGravity::new(MU_EARTH_KM3_S2)))
        .unwrap();
    let initial = StateVector::new(
        [6_878.0, 0.0, 0.0],
        [0.0, 7.612_683_745_689_998, 0.0],
        Frame::Gcrf,
        Epoch::from_seconds_since_j2000(0.0, TimeScale::Tdb),
    );
    let mut session =
        PropagationSession::new(initial, registry, SessionConfig::default()).unwrap();
    let outcome = session.propagate_by(1_800.0).unwrap();
    scenario::trajectory_records(&initial, &outcome)
}

#[test]
fn json_round_trip_reproduces_the_trajectory_exactly() {
    let records = propagated_records();
    assert!(records.len() > 2);

    let mut buffer = Vec::new();
    export::write_json(&mut buffer, &records).unwrap();
    let back = export::read_json(&mut buffer.as_slice()).unwrap();

    assert_eq!(back.len(), records.len());
    for (a, b) in records.iter().zip(back.iter()) {
        assert_eq!(a.x_km.to_bits(), b.x_km.to_bits());
        assert_eq!(a.y_km.to_bits(), b.y_km.to_bits());
        assert_eq!(a.z_km.to_bits(), b.z_km.to_bits());
        assert_eq!(a.vx_km_s.to_bits(), b.vx_km_s.to_bits());
        assert_eq!(a.vy_km_s.to_bits(), b.vy_km_s.to_bits());
        assert_eq!(a.vz_km_s.to_bits(), b.vz_km_s.to_bits());
        assert_eq!(
            a.epoch_seconds_j2000.to_bits(),
            b.epoch_seconds_j2000.to_bits()
        );
        assert_eq!(a.step_s.to_bits(), b.step_s.to_bits());
        assert_eq!(a.error_estimate.to_bits(), b.error_estimate.to_bits());
        assert_eq!(a.frame, b.frame);
        assert_eq!(a.time_scale, b.time_scale);
    }
}

#[test]
fn csv_round_trip_reproduces_the_trajectory_exactly() {
    let records = propagated_records();

    let mut buffer = Vec::new();
    export::write_csv(&mut buffer, &records).unwrap();
    let back = export::read_csv(&mut buffer.as_slice()).unwrap();

    assert_eq!(back, records);
}

#[test]
fn records_rebuild_tagged_states() {
    let records = propagated_records();
    let state = records[1].to_state().unwrap();
    assert_eq!(state.frame, Frame::Gcrf);
    assert_eq!(state.epoch.scale(), TimeScale::Tdb);
    assert!(state.radius_km() > 6_000.0);
}
