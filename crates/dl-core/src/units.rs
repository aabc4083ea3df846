// dl-core/src/units.rs

use uom::si::f64::Angle as UomAngle;

// Public canonical unit type (SI, f64)
pub type Angle = UomAngle;

#[inline]
pub fn deg(v: f64) -> Angle {
    use uom::si::angle::degree;
    Angle::new::<degree>(v)
}

#[inline]
pub fn to_degrees(a: Angle) -> f64 {
    use uom::si::angle::degree;
    a.get::<degree>()
}

/// Horizontal unit vector `(sin az, cos az)` for an azimuth measured clockwise from north.
pub fn azimuth_vector(azimuth: Angle) -> (f64, f64) {
    use uom::si::angle::radian;
    let rad = azimuth.get::<radian>();
    (rad.sin(), rad.cos())
}

/// Standard meridian longitude for a time zone offset in hours.
pub fn standard_meridian(time_zone_hours: f64) -> Angle {
    deg(time_zone_hours * 15.0)
}
