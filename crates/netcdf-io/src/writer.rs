//! Writing datasets to NetCDF-4 files.
//!
//! Files are first written to a hidden temporary name in the target
//! directory and renamed into place once libnetcdf has closed them, so a
//! reader never sees a half-written file.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use crate::dataset::{AttrValue, Attributes, Dataset};
use crate::error::{NetCdfError, NetCdfResult};
use crate::native::silence_hdf5_errors;

/// Write `dataset` to `directory/filename`, replacing any existing file.
pub fn write(dataset: &Dataset, filename: &str, directory: &Path) -> NetCdfResult<PathBuf> {
    if filename.is_empty() || filename.contains(std::path::MAIN_SEPARATOR) {
        return Err(NetCdfError::InvalidFormat(format!(
            "invalid output filename '{}'",
            filename
        )));
    }
    std::fs::create_dir_all(directory)?;

    let target = directory.join(filename);
    let temp = directory.join(temp_filename(filename));

    silence_hdf5_errors();

    if let Err(e) = write_file(dataset, &temp) {
        let _ = std::fs::remove_file(&temp);
        return Err(e);
    }

    if let Err(e) = std::fs::rename(&temp, &target) {
        let _ = std::fs::remove_file(&temp);
        return Err(e.into());
    }

    info!(
        path = %target.display(),
        variables = dataset.variables().len(),
        "Wrote NetCDF file"
    );
    Ok(target)
}

fn write_file(dataset: &Dataset, path: &Path) -> NetCdfResult<()> {
    let mut file = netcdf::create(path)?;

    for (name, len) in dataset.dimensions() {
        file.add_dimension(&name, len)?;
    }

    for attr in dataset.attributes.iter() {
        file.add_attribute(&attr.name, to_netcdf(&attr.value))?;
    }

    for coord in dataset.coordinates() {
        let mut var = file.add_variable::<f64>(&coord.name, &[coord.name.as_str()])?;
        put_attributes(&mut var, &coord.attributes)?;
        var.put_values(&coord.values.to_vec(), ..)?;
    }

    for data_var in dataset.variables() {
        let dims: Vec<&str> = data_var.dims.iter().map(String::as_str).collect();
        let mut var = file.add_variable::<f64>(&data_var.name, &dims)?;
        put_attributes(&mut var, &data_var.attributes)?;
        // Logical iteration order is row-major regardless of memory layout
        let values: Vec<f64> = data_var.data.iter().copied().collect();
        var.put_values(&values, ..)?;
        debug!(variable = %data_var.name, shape = ?data_var.data.shape(), "Wrote variable");
    }

    // File is closed on drop, before the caller renames it
    drop(file);
    Ok(())
}

fn put_attributes(var: &mut netcdf::VariableMut<'_>, attributes: &Attributes) -> NetCdfResult<()> {
    for attr in attributes.iter() {
        var.put_attribute(&attr.name, to_netcdf(&attr.value))?;
    }
    Ok(())
}

fn to_netcdf(value: &AttrValue) -> netcdf::AttributeValue {
    use netcdf::AttributeValue as V;
    match value {
        AttrValue::Text(s) => V::Str(s.clone()),
        AttrValue::Texts(s) => V::Strs(s.clone()),
        AttrValue::Int(v) => V::Longlong(*v),
        AttrValue::Ints(v) => V::Longlongs(v.clone()),
        AttrValue::Float(v) => V::Double(*v),
        AttrValue::Floats(v) => V::Doubles(v.clone()),
    }
}

/// Unique hidden name next to the target, safe across threads.
fn temp_filename(filename: &str) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!(".{}.{}.{}.tmp", filename, std::process::id(), count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_filename_uniqueness() {
        let a = temp_filename("out.nc");
        let b = temp_filename("out.nc");
        assert_ne!(a, b);
        assert!(a.starts_with(".out.nc."));
    }

    #[test]
    fn test_rejects_path_in_filename() {
        let dir = tempfile::tempdir().unwrap();
        let name = format!("sub{}out.nc", std::path::MAIN_SEPARATOR);
        let result = write(&Dataset::default(), &name, dir.path());
        assert!(matches!(result, Err(NetCdfError::InvalidFormat(_))));
    }
}
