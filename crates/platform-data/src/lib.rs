//! Platform data for the glider fleet and profiling floats.
//!
//! - [`c2`]: async client for the C2 positions and observations endpoints
//! - [`positions`]: position responses and track extraction
//! - [`timeseries`]: pivoting and cleaning glider observations
//! - [`cts`]: float position fixes from CTS5 alert e-mails

pub mod c2;
pub mod cts;
pub mod error;
pub mod positions;
pub mod timeseries;

pub use c2::{C2Client, SLOCUM};
pub use cts::{parse_alert, read_alert, write_positions_csv, FloatPosition};
pub use error::{PlatformError, PlatformResult};
pub use positions::{parse_positions, PlatformPositions, PositionRecord};
pub use timeseries::{
    depth_from_pressure, ObservationTable, ProfileTimeseries, DEFAULT_LATITUDE_COLUMN,
    DEFAULT_PRESSURE_COLUMN,
};
