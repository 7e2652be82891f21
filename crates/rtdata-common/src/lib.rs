//! Common types and utilities shared across the rtdata crates.

pub mod bbox;
pub mod config;
pub mod error;
pub mod time;

pub use bbox::BoundingBox;
pub use config::{
    C2Config, C2Environment, CmemsConfig, CmemsDataset, Config, GliderConfig, OverlayConfig,
    ProcessingConfig,
};
pub use error::{CommonError, CommonResult};
pub use time::{group_by_day, CfTimeUnits};
