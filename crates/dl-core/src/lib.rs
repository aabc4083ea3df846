//! dl-core: shared foundation for the daylight pipeline.
//!
//! Contains:
//! - units (uom SI angles, azimuth vectors, time zone meridians)
//! - numeric (Real + float helpers)
//! - photometry (RGB to lux conversion, simplified glare probability)
//! - series (hourly time series with a strictly increasing time axis)
//! - names (space and file name sanitizing)
//! - error (shared error types)

pub mod error;
pub mod names;
pub mod numeric;
pub mod photometry;
pub mod series;
pub mod units;

pub use error::{DlError, DlResult};
pub use names::sanitize_name;
pub use numeric::*;
pub use photometry::*;
pub use series::{TimeSeries, hour_of_year};
pub use units::*;
