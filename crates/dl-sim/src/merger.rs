//! Window-group state selection and merging for three-phase hours.

use crate::timestep::HourOutput;
use crate::{SimError, SimResult};
use dl_radiance::WindowGroupSpec;

/// Point illuminance for one hour after state selection.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedHour {
    pub values: Vec<f64>,
    /// Selected state per controlled group, `0` or `1`.
    pub shade_states: Vec<u8>,
    /// Set for hours with no computed values; glare is reported as zero.
    pub zero_filled: bool,
}

impl MergedHour {
    pub fn zeros(points: usize, groups: usize) -> Self {
        Self {
            values: vec![0.0; points],
            shade_states: vec![0; groups],
            zero_filled: true,
        }
    }
}

/// State for a group: the shaded state once control illuminance reaches the setpoint.
pub fn select_state(control_lux: f64, setpoint_lux: f64, state_count: usize) -> usize {
    if state_count >= 2 && control_lux >= setpoint_lux {
        1
    } else {
        0
    }
}

/// Resolves one hour's output into point values. `None` output gives zeros.
///
/// `groups` are the controlled groups in the order their matrices were built.
pub fn merge_hour(
    output: Option<&HourOutput>,
    groups: &[WindowGroupSpec],
    points: usize,
) -> SimResult<MergedHour> {
    let Some(output) = output else {
        return Ok(MergedHour::zeros(points, groups.len()));
    };
    match output {
        HourOutput::SinglePhase(values) => {
            ensure_len("single-phase output", values, points)?;
            Ok(MergedHour {
                values: values.clone(),
                shade_states: Vec::new(),
                zero_filled: false,
            })
        }
        HourOutput::ThreePhase {
            control,
            uncontrolled,
            groups: group_values,
        } => {
            let mut merged = match uncontrolled {
                Some(values) => {
                    ensure_len("uncontrolled apertures", values, points)?;
                    values.clone()
                }
                None => vec![0.0; points],
            };
            let mut shade_states = Vec::with_capacity(groups.len());
            for (g, group) in groups.iter().enumerate() {
                let states = group_values.get(g).map(Vec::as_slice).unwrap_or(&[]);
                let Some(control_lux) = control.get(g).copied() else {
                    return Err(SimError::PointCount {
                        what: "window control values".to_string(),
                        expected: groups.len(),
                        got: control.len(),
                    });
                };
                if states.is_empty() {
                    shade_states.push(0);
                    continue;
                }
                let state = select_state(control_lux, group.setpoint_lux, states.len());
                let selected = &states[state];
                ensure_len(&group.id, selected, points)?;
                for (total, v) in merged.iter_mut().zip(selected) {
                    *total += v;
                }
                shade_states.push(state as u8);
            }
            Ok(MergedHour {
                values: merged,
                shade_states,
                zero_filled: false,
            })
        }
    }
}

fn ensure_len(what: &str, values: &[f64], points: usize) -> SimResult<()> {
    if values.len() != points {
        return Err(SimError::PointCount {
            what: what.to_string(),
            expected: points,
            got: values.len(),
        });
    }
    Ok(())
}
