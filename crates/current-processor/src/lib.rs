//! Ocean-current field reduction.
//!
//! Reduces 4-D `(time, depth, lat, lon)` velocity products to 2-D-per-time
//! fields that can be drawn on a map:
//!
//! - **Depth-bin extraction**: one depth level (1000 m by default)
//! - **Depth-weighted averaging**: the whole water column, each level
//!   weighted by the thickness of the layer it represents
//! - **Daily means**: per-day averages feeding the KMZ overlays
//!
//! [`process_currents`] runs the first two against a file located through
//! the JSON manifest and records the outputs back into it.
//!
//! # Example
//!
//! ```ignore
//! use current_processor::{process_currents, PipelineOptions};
//! use netcdf_io::NetCdfStore;
//!
//! let options = PipelineOptions::new("/data/cmems_prod_config.json", "/data");
//! let output = process_currents(&NetCdfStore, &options)?;
//! println!("{}", output.averaged_path.display());
//! ```

pub mod averaging;
pub mod daily;
pub mod depth_bin;
pub mod error;
pub mod field;
pub mod pipeline;

pub use averaging::{depth_weighted_average, depth_weights, NanPolicy};
pub use daily::{current_components, daily_means, DailyCurrents, DailyMean};
pub use depth_bin::{extract_depth_bin, find_depth_index, DepthMatch, DEPTH_TOLERANCE_M};
pub use error::{ProcessingError, Result};
pub use field::{GriddedVelocityField, DEPTH, TIME};
pub use pipeline::{process_currents, PipelineOptions, PipelineOutput};
