use crate::DlError;

/// Floating point type used throughout the pipeline
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, DlError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(DlError::NonFinite { what, value: v })
    }
}

/// Replaces negative values with zero in place and returns how many were clamped.
pub fn clamp_non_negative(values: &mut [Real]) -> usize {
    let mut clamped = 0;
    for v in values.iter_mut() {
        if *v < 0.0 {
            *v = 0.0;
            clamped += 1;
        }
    }
    clamped
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[Real]) -> Option<Real> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<Real>() / values.len() as Real)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn clamped_values_are_non_negative(mut values in prop::collection::vec(-1.0e4_f64..1.0e4_f64, 0..64)) {
            let negatives = values.iter().filter(|v| **v < 0.0).count();
            prop_assert_eq!(clamp_non_negative(&mut values), negatives);
            prop_assert!(values.iter().all(|v| *v >= 0.0));
        }

        #[test]
        fn mean_lies_within_range(values in prop::collection::vec(0.0_f64..1.0e5_f64, 1..64)) {
            let m = mean(&values).unwrap();
            let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let slack = 1e-9 * hi.max(1.0);
            prop_assert!(m >= lo - slack && m <= hi + slack);
        }
    }
}
