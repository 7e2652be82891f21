//! Gridded NetCDF datasets for ocean-current products.
//!
//! This crate loads CF-style NetCDF-4 files (CMEMS model and observation
//! products) into an in-memory [`Dataset`], and writes derived datasets back
//! out atomically.
//!
//! # Implementation Notes
//!
//! Reading and writing go through libnetcdf via the `netcdf` crate
//! (system requirements: libhdf5-dev libnetcdf-dev). Packed variables are
//! unpacked on load, so every value in memory is a physical `f64` with NaN
//! marking missing samples.

pub mod dataset;
pub mod error;
pub mod native;
pub mod store;
pub mod writer;

pub use dataset::{AttrValue, Attribute, Attributes, Coordinate, DataVariable, Dataset};
pub use error::{NetCdfError, NetCdfResult};
pub use native::{open, silence_hdf5_errors};
pub use store::{GridStore, NetCdfStore};
pub use writer::write;
