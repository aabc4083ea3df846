//! Photometric conversions applied to raw Radiance output.

/// Luminous efficacy of the Radiance white-light standard (lm/W).
pub const WHITE_EFFICACY: f64 = 179.0;

/// Channel weights for red, green and blue radiance.
pub const RGB_WEIGHTS: [f64; 3] = [0.265, 0.67, 0.065];

/// Slope of the simplified daylight glare probability against vertical illuminance.
pub const DGP_SLOPE: f64 = 6.22e-5;

/// Intercept of the simplified daylight glare probability.
pub const DGP_INTERCEPT: f64 = 0.184;

/// Converts an RGB irradiance triplet to illuminance in lux.
#[inline]
pub fn rgb_to_lux(rgb: [f64; 3]) -> f64 {
    WHITE_EFFICACY * (rgb[0] * RGB_WEIGHTS[0] + rgb[1] * RGB_WEIGHTS[1] + rgb[2] * RGB_WEIGHTS[2])
}

/// Simplified daylight glare probability from vertical eye illuminance, never negative.
#[inline]
pub fn simplified_dgp(vertical_illuminance: f64) -> f64 {
    (DGP_SLOPE * vertical_illuminance + DGP_INTERCEPT).max(0.0)
}
