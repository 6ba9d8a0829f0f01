//! Built-in low-precision providers.
//!
//! These let the engine run and be tested without any external data files.
//! They are deliberately modest: the Sun/Moon positions come from the
//! standard almanac polynomial series (~0.1–0.3 deg), frame rotations use
//! the published GMST angle only (no precession/nutation/polar motion), and
//! the leap-second table is bundled with an explicit validity horizon.
//! Anything better comes from an external provider behind the same traits.

use astroprop_core::constants::{
    AU_KM, EARTH_RADIUS_KM, OMEGA_EARTH_RAD_S, SECONDS_PER_DAY,
};
use astroprop_core::matrix;
use astroprop_core::state::Frame;
use astroprop_core::time::{Epoch, TimeScale};
use astroprop_core::vector::{self, Vector3};

use crate::{Body, EphemerisProvider, FrameError, FrameProvider, FrameRotation, TimeScaleProvider};

/// TT − TAI, a defined constant (seconds).
const TT_MINUS_TAI: f64 = 32.184;

/// Bundled TAI−UTC table: (UTC seconds past J2000, ΔAT seconds). One entry
/// per leap second since 1999.
const LEAP_SECONDS: &[(f64, f64)] = &[
    (-31_579_200.0, 32.0), // 1999-01-01
    (189_345_600.0, 33.0), // 2006-01-01
    (284_040_000.0, 34.0), // 2009-01-01
    (394_372_800.0, 35.0), // 2012-07-01
    (488_980_800.0, 36.0), // 2015-07-01
    (536_500_800.0, 37.0), // 2017-01-01
];

/// End of the bundled table's validity (2035-01-01; IERS has announced no
/// leap seconds before then).
const LEAP_TABLE_VALID_UNTIL: f64 = 1_104_494_400.0;

/// Time-scale conversions from a leap-second table plus the defined TT−TAI
/// offset and the leading periodic term of TDB−TT.
#[derive(Debug, Clone)]
pub struct TableTimeProvider {
    table: Vec<(f64, f64)>,
    valid_until: f64,
}

impl TableTimeProvider {
    /// Provider over the bundled leap-second table.
    pub fn with_bundled_table() -> Self {
        Self {
            table: LEAP_SECONDS.to_vec(),
            valid_until: LEAP_TABLE_VALID_UNTIL,
        }
    }

    /// Provider over a caller-supplied table of
    /// `(utc_seconds_past_j2000, tai_minus_utc)` entries, sorted ascending,
    /// valid until `valid_until` UTC seconds past J2000.
    pub fn new(table: Vec<(f64, f64)>, valid_until: f64) -> Self {
        Self { table, valid_until }
    }

    fn delta_at(&self, utc_seconds: f64, epoch: Epoch) -> Result<f64, FrameError> {
        let first = self
            .table
            .first()
            .ok_or_else(|| FrameError::data_unavailable("leap-second table", epoch))?;
        if utc_seconds < first.0 || utc_seconds >= self.valid_until {
            return Err(FrameError::data_unavailable("leap-second data", epoch));
        }
        let mut delta = first.1;
        for &(start, value) in &self.table {
            if utc_seconds >= start {
                delta = value;
            } else {
                break;
            }
        }
        Ok(delta)
    }

    /// Earth's mean anomaly for the TDB−TT periodic term (radians).
    fn earth_mean_anomaly(days: f64) -> f64 {
        6.240_040_77 + 0.017_201_969_9 * days
    }

    /// TDB − TT in seconds, leading periodic term only.
    fn tdb_minus_tt(seconds: f64) -> f64 {
        let g = Self::earth_mean_anomaly(seconds / SECONDS_PER_DAY);
        0.001_657 * g.sin()
    }

    /// Convert any supported scale to TAI seconds past J2000.
    fn to_tai(&self, epoch: Epoch) -> Result<f64, FrameError> {
        let t = epoch.seconds_since_j2000();
        match epoch.scale() {
            TimeScale::Tai => Ok(t),
            TimeScale::Tt => Ok(t - TT_MINUS_TAI),
            TimeScale::Tdb => Ok(t - Self::tdb_minus_tt(t) - TT_MINUS_TAI),
            TimeScale::Utc => Ok(t + self.delta_at(t, epoch)?),
            TimeScale::Ut1 => Err(FrameError::data_unavailable("UT1 offset data", epoch)),
        }
    }

    /// Convert TAI seconds past J2000 to the target scale.
    fn from_tai(&self, tai: f64, target: TimeScale, epoch: Epoch) -> Result<f64, FrameError> {
        match target {
            TimeScale::Tai => Ok(tai),
            TimeScale::Tt => Ok(tai + TT_MINUS_TAI),
            TimeScale::Tdb => {
                let tt = tai + TT_MINUS_TAI;
                Ok(tt + Self::tdb_minus_tt(tt))
            }
            TimeScale::Utc => {
                // ΔAT is keyed by UTC; a second pass settles epochs that sit
                // on a leap boundary.
                let mut utc = tai - self.delta_at(tai, epoch)?;
                utc = tai - self.delta_at(utc, epoch)?;
                Ok(utc)
            }
            TimeScale::Ut1 => Err(FrameError::data_unavailable("UT1 offset data", epoch)),
        }
    }
}

impl TimeScaleProvider for TableTimeProvider {
    fn convert(&self, epoch: Epoch, target: TimeScale) -> Result<Epoch, FrameError> {
        if epoch.scale() == target {
            return Ok(epoch);
        }
        let tai = self.to_tai(epoch)?;
        let seconds = self.from_tai(tai, target, epoch)?;
        Ok(Epoch::from_seconds_since_j2000(seconds, target))
    }
}

/// Low-precision analytic Sun/Moon ephemeris (almanac polynomial series).
///
/// Accuracy is on the order of 0.1 deg for the Sun and 0.3 deg for the
/// Moon; the epoch's scale tag is ignored (scale offsets are far below the
/// series' own error). Velocities come from a fixed ±30 s central
/// difference, which keeps the provider deterministic.
#[derive(Debug, Clone, Default)]
pub struct AnalyticEphemeris;

impl AnalyticEphemeris {
    pub fn new() -> Self {
        Self
    }

    /// Geocentric Sun position (km) in GCRF.
    pub fn sun_position_km(centuries: f64) -> Vector3 {
        let t = centuries;
        let mean_longitude = 280.460 + 36_000.771 * t;
        let mean_anomaly = (357.529_109_2 + 35_999.050_34 * t).to_radians();
        let ecliptic_longitude = (mean_longitude
            + 1.914_666_471 * mean_anomaly.sin()
            + 0.019_994_643 * (2.0 * mean_anomaly).sin())
        .to_radians();
        let distance_au = 1.000_140_612
            - 0.016_708_617 * mean_anomaly.cos()
            - 0.000_139_589 * (2.0 * mean_anomaly).cos();
        let obliquity = (23.439_291 - 0.013_004_2 * t).to_radians();
        let r = distance_au * AU_KM;
        [
            r * ecliptic_longitude.cos(),
            r * obliquity.cos() * ecliptic_longitude.sin(),
            r * obliquity.sin() * ecliptic_longitude.sin(),
        ]
    }

    /// Geocentric Moon position (km) in GCRF (truncated almanac series).
    pub fn moon_position_km(centuries: f64) -> Vector3 {
        let t = centuries;
        let sin_d = |deg: f64| deg.to_radians().sin();
        let cos_d = |deg: f64| deg.to_radians().cos();

        let longitude = (218.32 + 481_267.881_3 * t
            + 6.29 * sin_d(134.9 + 477_198.85 * t)
            - 1.27 * sin_d(259.2 - 413_335.38 * t)
            + 0.66 * sin_d(235.7 + 890_534.23 * t)
            + 0.21 * sin_d(269.9 + 954_397.70 * t)
            - 0.19 * sin_d(357.5 + 35_999.05 * t)
            - 0.11 * sin_d(186.6 + 966_404.05 * t))
        .to_radians();
        let latitude = (5.13 * sin_d(93.3 + 483_202.03 * t)
            + 0.28 * sin_d(228.2 + 960_400.87 * t)
            - 0.28 * sin_d(318.3 + 6_003.18 * t)
            - 0.17 * sin_d(217.6 - 407_332.20 * t))
        .to_radians();
        let parallax = (0.950_8
            + 0.051_8 * cos_d(134.9 + 477_198.85 * t)
            + 0.009_5 * cos_d(259.2 - 413_335.38 * t)
            + 0.007_8 * cos_d(235.7 + 890_534.23 * t)
            + 0.002_8 * cos_d(269.9 + 954_397.70 * t))
        .to_radians();
        let obliquity = (23.439_291 - 0.013_004_2 * t).to_radians();

        let r = EARTH_RADIUS_KM / parallax.sin();
        let (sin_lon, cos_lon) = longitude.sin_cos();
        let (sin_lat, cos_lat) = latitude.sin_cos();
        let (sin_eps, cos_eps) = obliquity.sin_cos();
        [
            r * cos_lat * cos_lon,
            r * (cos_eps * cos_lat * sin_lon - sin_eps * sin_lat),
            r * (sin_eps * cos_lat * sin_lon + cos_eps * sin_lat),
        ]
    }

    fn position(body: Body, epoch: Epoch) -> Vector3 {
        let centuries = epoch.centuries_since_j2000();
        match body {
            Body::Sun => Self::sun_position_km(centuries),
            Body::Moon => Self::moon_position_km(centuries),
            Body::Earth => vector::ZERO,
        }
    }
}

impl EphemerisProvider for AnalyticEphemeris {
    fn body_state(&self, body: Body, epoch: Epoch) -> Result<(Vector3, Vector3), FrameError> {
        let position = Self::position(body, epoch);
        let ahead = Self::position(body, epoch.offset_by(30.0));
        let behind = Self::position(body, epoch.offset_by(-30.0));
        let velocity = vector::scale(&vector::sub(&ahead, &behind), 1.0 / 60.0);
        Ok((position, velocity))
    }
}

/// Frame rotations from the published GMST angle alone: GCRF↔ITRF and
/// TEME↔ITRF are a z-rotation by GMST; GCRF↔TEME is treated as identity at
/// this precision (the equation of the equinoxes and frame bias are left to
/// external providers).
#[derive(Debug, Clone, Default)]
pub struct GmstFrameProvider;

impl GmstFrameProvider {
    pub fn new() -> Self {
        Self
    }

    /// Greenwich Mean Sidereal Time (radians), low-precision form.
    pub fn gmst_rad(epoch: Epoch) -> f64 {
        let days = epoch.days_since_j2000();
        let degrees = 280.460_618_37 + 360.985_647_366_29 * days;
        degrees.rem_euclid(360.0).to_radians()
    }
}

impl FrameProvider for GmstFrameProvider {
    fn rotation(&self, from: Frame, to: Frame, epoch: Epoch) -> Result<FrameRotation, FrameError> {
        let earth_rate = [0.0, 0.0, OMEGA_EARTH_RAD_S];
        match (from, to) {
            (Frame::Gcrf, Frame::Itrf) | (Frame::Teme, Frame::Itrf) => Ok(FrameRotation {
                matrix: matrix::rotation_z(Self::gmst_rad(epoch)),
                angular_velocity_rad_s: earth_rate,
            }),
            (Frame::Itrf, Frame::Gcrf) | (Frame::Itrf, Frame::Teme) => Ok(FrameRotation {
                matrix: matrix::transpose(&matrix::rotation_z(Self::gmst_rad(epoch))),
                angular_velocity_rad_s: vector::neg(&earth_rate),
            }),
            // Same frame, or GCRF↔TEME (identity at this precision).
            _ => Ok(FrameRotation::inertial(matrix::IDENTITY)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(seconds: f64) -> Epoch {
        Epoch::from_seconds_since_j2000(seconds, TimeScale::Utc)
    }

    #[test]
    fn utc_to_tai_applies_current_leap_count() {
        let provider = TableTimeProvider::with_bundled_table();
        // 2020-01-01 12:00:00 UTC.
        let epoch = utc(631_152_000.0);
        let tai = provider.convert(epoch, TimeScale::Tai).unwrap();
        assert_eq!(tai.scale(), TimeScale::Tai);
        assert!((tai.seconds_since_j2000() - (631_152_000.0 + 37.0)).abs() < 1e-9);
    }

    #[test]
    fn utc_round_trip_through_tdb() {
        let provider = TableTimeProvider::with_bundled_table();
        let epoch = utc(631_152_000.0);
        let tdb = provider.convert(epoch, TimeScale::Tdb).unwrap();
        let back = provider.convert(tdb, TimeScale::Utc).unwrap();
        assert!((back.seconds_since_j2000() - epoch.seconds_since_j2000()).abs() < 1e-6);
    }

    #[test]
    fn epochs_outside_table_are_data_gaps() {
        let provider = TableTimeProvider::with_bundled_table();
        // 1990s, before the bundled table starts.
        let epoch = utc(-400_000_000.0);
        let err = provider.convert(epoch, TimeScale::Tai).unwrap_err();
        assert!(matches!(err, FrameError::DataUnavailable { .. }));
    }

    #[test]
    fn ut1_requires_external_data() {
        let provider = TableTimeProvider::with_bundled_table();
        let err = provider.convert(utc(0.0), TimeScale::Ut1).unwrap_err();
        assert!(matches!(err, FrameError::DataUnavailable { .. }));
    }

    #[test]
    fn sun_distance_is_about_one_au() {
        let (pos, _) = AnalyticEphemeris::new()
            .body_state(Body::Sun, Epoch::from_seconds_since_j2000(0.0, TimeScale::Tdb))
            .unwrap();
        let r = vector::norm(&pos);
        assert!((r / AU_KM - 1.0).abs() < 0.02, "Sun at {r} km");
    }

    #[test]
    fn moon_distance_is_plausible() {
        let (pos, _) = AnalyticEphemeris::new()
            .body_state(Body::Moon, Epoch::from_seconds_since_j2000(0.0, TimeScale::Tdb))
            .unwrap();
        let r = vector::norm(&pos);
        assert!((356_000.0..407_000.0).contains(&r), "Moon at {r} km");
    }

    #[test]
    fn gmst_at_j2000_matches_published_value() {
        let gmst = GmstFrameProvider::gmst_rad(Epoch::from_seconds_since_j2000(
            0.0,
            TimeScale::Ut1,
        ));
        assert!((gmst.to_degrees() - 280.460_618_37).abs() < 1e-9);
    }

    #[test]
    fn itrf_round_trip_preserves_state() {
        use astroprop_core::state::StateVector;
        use std::sync::Arc;

        let adapter = crate::FrameAdapter::new(
            Arc::new(GmstFrameProvider::new()),
            Arc::new(TableTimeProvider::with_bundled_table()),
        );
        let state = StateVector::new(
            [6_878.0, 0.0, 0.0],
            [0.0, 7.6, 0.0],
            Frame::Gcrf,
            Epoch::from_seconds_since_j2000(1_000.0, TimeScale::Tdb),
        );
        let itrf = adapter.convert_state(&state, Frame::Itrf).unwrap();
        let back = adapter.convert_state(&itrf, Frame::Gcrf).unwrap();
        for i in 0..3 {
            assert!((back.position_km[i] - state.position_km[i]).abs() < 1e-9);
            assert!((back.velocity_km_s[i] - state.velocity_km_s[i]).abs() < 1e-12);
        }
    }
}
