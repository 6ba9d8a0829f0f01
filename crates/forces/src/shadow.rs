//! Earth (central-body) shadow geometry: umbra and penumbra cones.
//!
//! Geometry: both cones share the Sun–body axis. An object on the anti-Sun
//! side is compared against the cone cross-sections at its along-axis
//! distance; inside the penumbra cone it may additionally be inside the
//! narrower umbra cone.

use astroprop_core::vector::{self, Vector3};

/// Radii defining the shadow cones.
#[derive(Debug, Clone, Copy)]
pub struct ShadowGeometry {
    pub body_radius_km: f64,
    pub sun_radius_km: f64,
}

/// Illumination classification of a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowState {
    Sunlit,
    Penumbra,
    Umbra,
}

/// Classify a body-centered position against the shadow cones.
///
/// `sun_position_km` is the body→Sun vector in the same frame as
/// `position_km`.
pub fn shadow_state(
    position_km: &Vector3,
    sun_position_km: &Vector3,
    geometry: &ShadowGeometry,
) -> ShadowState {
    if vector::dot(position_km, sun_position_km) >= 0.0 {
        return ShadowState::Sunlit;
    }

    let sun_distance = vector::norm(sun_position_km);
    let umbra_angle = ((geometry.sun_radius_km - geometry.body_radius_km) / sun_distance).atan();
    let penumbra_angle = ((geometry.sun_radius_km + geometry.body_radius_km) / sun_distance).atan();

    let anti_sun = vector::neg(sun_position_km);
    let angle = vector::angle_between(&anti_sun, position_km);
    let radius = vector::norm(position_km);
    let horizontal = radius * angle.cos();
    let vertical = radius * angle.sin();

    let penumbra_vertex = geometry.body_radius_km / penumbra_angle.sin();
    let penumbra_extent = penumbra_angle.tan() * (penumbra_vertex + horizontal);
    if vertical > penumbra_extent {
        return ShadowState::Sunlit;
    }

    let umbra_vertex = geometry.body_radius_km / umbra_angle.sin();
    let umbra_extent = umbra_angle.tan() * (umbra_vertex - horizontal);
    if vertical <= umbra_extent {
        ShadowState::Umbra
    } else {
        ShadowState::Penumbra
    }
}

/// Fraction of sunlight reaching the point: 1 in sunlight, 0 in umbra, and
/// a flat 0.5 in penumbra (the sub-percent-duration penumbra transit does
/// not justify a partial-occultation integral here).
pub fn illumination_factor(
    position_km: &Vector3,
    sun_position_km: &Vector3,
    geometry: &ShadowGeometry,
) -> f64 {
    match shadow_state(position_km, sun_position_km, geometry) {
        ShadowState::Sunlit => 1.0,
        ShadowState::Penumbra => 0.5,
        ShadowState::Umbra => 0.0,
    }
}

/// Signed distance (km) from the point to the penumbra boundary: negative
/// inside the penumbra (or umbra), positive in sunlight. Continuous along a
/// trajectory, which makes it a usable event g-function for eclipse
/// entry/exit.
///
/// On the anti-Sun side this is the off-axis distance to the cone surface;
/// on the Sun side (where the cone equation would spuriously report shadow)
/// the along-axis distance to the terminator plane is added instead, which
/// keeps the function continuous and strictly positive there.
pub fn penumbra_depth_km(
    position_km: &Vector3,
    sun_position_km: &Vector3,
    geometry: &ShadowGeometry,
) -> f64 {
    let sun_distance = vector::norm(sun_position_km);
    let penumbra_angle = ((geometry.sun_radius_km + geometry.body_radius_km) / sun_distance).atan();

    let anti_sun = vector::neg(sun_position_km);
    let angle = vector::angle_between(&anti_sun, position_km);
    let radius = vector::norm(position_km);
    let horizontal = radius * angle.cos();
    let vertical = radius * angle.sin();

    let penumbra_vertex = geometry.body_radius_km / penumbra_angle.sin();
    if horizontal >= 0.0 {
        vertical - penumbra_angle.tan() * (penumbra_vertex + horizontal)
    } else {
        vertical - penumbra_angle.tan() * penumbra_vertex - horizontal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astroprop_core::constants::{AU_KM, EARTH_RADIUS_KM, SUN_RADIUS_KM};

    fn geometry() -> ShadowGeometry {
        ShadowGeometry {
            body_radius_km: EARTH_RADIUS_KM,
            sun_radius_km: SUN_RADIUS_KM,
        }
    }

    fn sun() -> [f64; 3] {
        [AU_KM, 0.0, 0.0]
    }

    #[test]
    fn point_behind_earth_is_in_umbra() {
        let position = [-7_000.0, 0.0, 0.0];
        assert_eq!(shadow_state(&position, &sun(), &geometry()), ShadowState::Umbra);
        assert!(penumbra_depth_km(&position, &sun(), &geometry()) < 0.0);
    }

    #[test]
    fn point_on_sun_side_is_lit() {
        let position = [7_000.0, 0.0, 0.0];
        assert_eq!(shadow_state(&position, &sun(), &geometry()), ShadowState::Sunlit);
        assert!(penumbra_depth_km(&position, &sun(), &geometry()) > 0.0);
    }

    #[test]
    fn point_well_off_axis_is_lit() {
        let position = [-7_000.0, 50_000.0, 0.0];
        assert_eq!(shadow_state(&position, &sun(), &geometry()), ShadowState::Sunlit);
        assert!(penumbra_depth_km(&position, &sun(), &geometry()) > 0.0);
    }

    #[test]
    fn grazing_point_is_in_penumbra() {
        // Just outside the umbra cone but inside the penumbra: slightly more
        // than one Earth radius off-axis close behind the Earth.
        let position = [-2_000.0, EARTH_RADIUS_KM + 1.0, 0.0];
        assert_eq!(
            shadow_state(&position, &sun(), &geometry()),
            ShadowState::Penumbra
        );
    }
}
