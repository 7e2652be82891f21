//! Native NetCDF reading using the netcdf library.
//!
//! Every numeric variable is read as `f64` and unpacked on the way in:
//! `scale_factor`/`add_offset` are applied and samples equal to
//! `_FillValue` or `missing_value` become NaN. Variables that cannot be read
//! as numbers (strings, compound types) are skipped with a debug log.

use std::path::Path;
use std::sync::Once;

use ndarray::{ArrayD, IxDyn};
use tracing::{debug, instrument};

use crate::dataset::{AttrValue, Attribute, Attributes, Coordinate, DataVariable, Dataset};
use crate::error::{NetCdfError, NetCdfResult};

/// Attributes consumed by unpacking; they no longer describe the data.
const PACKING_ATTRS: [&str; 2] = ["scale_factor", "add_offset"];

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints diagnostic stacks even for errors the netcdf
/// layer handles, such as probing for an optional attribute. Safe to call
/// repeatedly; only the first call has an effect.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and null handlers are a
        // documented way to disable automatic printing.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Load a whole NetCDF file into memory.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn open(path: impl AsRef<Path>) -> NetCdfResult<Dataset> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(NetCdfError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )));
    }

    silence_hdf5_errors();

    let file = netcdf::open(path).map_err(|e| {
        NetCdfError::InvalidFormat(format!("Failed to open {}: {}", path.display(), e))
    })?;

    let mut dataset = Dataset::new(read_attributes(file.attributes()));
    let mut coordinates = Vec::new();
    let mut variables = Vec::new();

    for var in file.variables() {
        let name = var.name();
        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

        let raw: Vec<f64> = match var.get_values(..) {
            Ok(values) => values,
            Err(e) => {
                debug!(variable = %name, error = %e, "Skipping non-numeric variable");
                continue;
            }
        };

        let mut attributes = read_attributes(var.attributes());
        let values = unpack(raw, &mut attributes);

        if dims.len() == 1 && dims[0] == name {
            coordinates.push(Coordinate {
                name,
                values: values.into(),
                attributes,
            });
        } else {
            let data = ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|e| {
                NetCdfError::InvalidFormat(format!("variable '{}': {}", name, e))
            })?;
            variables.push(DataVariable::new(name, dims, data, attributes)?);
        }
    }

    for coord in coordinates {
        dataset.add_coordinate(coord)?;
    }
    for var in variables {
        dataset.add_variable(var)?;
    }

    debug!(
        coordinates = dataset.coordinates().len(),
        variables = dataset.variables().len(),
        "Loaded NetCDF file"
    );
    Ok(dataset)
}

/// Apply CF packing conventions and rewrite the attributes to describe the
/// unpacked values.
fn unpack(raw: Vec<f64>, attributes: &mut Attributes) -> Vec<f64> {
    let fill = attributes.get("_FillValue").and_then(AttrValue::as_f64);
    let missing = attributes.get("missing_value").and_then(AttrValue::as_f64);
    let scale = attributes
        .get("scale_factor")
        .and_then(AttrValue::as_f64)
        .unwrap_or(1.0);
    let offset = attributes
        .get("add_offset")
        .and_then(AttrValue::as_f64)
        .unwrap_or(0.0);

    let values = raw
        .into_iter()
        .map(|v| {
            if !v.is_finite() || Some(v) == fill || Some(v) == missing {
                f64::NAN
            } else {
                v * scale + offset
            }
        })
        .collect();

    let packed = PACKING_ATTRS.iter().any(|a| attributes.get(a).is_some());
    if packed {
        for bound in ["valid_min", "valid_max"] {
            if let Some(v) = attributes.get(bound).and_then(AttrValue::as_f64) {
                attributes.set(bound, v * scale + offset);
            }
        }
    }
    for name in PACKING_ATTRS {
        attributes.remove(name);
    }
    if fill.is_some() || missing.is_some() {
        attributes.remove("missing_value");
        attributes.set("_FillValue", f64::NAN);
    }

    values
}

fn read_attributes<'a>(attrs: impl Iterator<Item = netcdf::Attribute<'a>>) -> Attributes {
    attrs
        .filter_map(|attr| {
            let name = attr.name().to_string();
            match attr.value() {
                Ok(value) => convert_value(value).map(|value| Attribute { name, value }),
                Err(e) => {
                    debug!(attribute = %name, error = %e, "Unreadable attribute");
                    None
                }
            }
        })
        .collect()
}

fn convert_value(value: netcdf::AttributeValue) -> Option<AttrValue> {
    use netcdf::AttributeValue as V;

    fn ints<T: Into<i64>>(v: Vec<T>) -> AttrValue {
        AttrValue::Ints(v.into_iter().map(Into::into).collect())
    }

    let converted = match value {
        V::Str(s) => AttrValue::Text(s),
        V::Strs(s) => AttrValue::Texts(s),
        V::Double(v) => AttrValue::Float(v),
        V::Doubles(v) => AttrValue::Floats(v),
        V::Float(v) => AttrValue::Float(v.into()),
        V::Floats(v) => AttrValue::Floats(v.into_iter().map(f64::from).collect()),
        V::Schar(v) => AttrValue::Int(v.into()),
        V::Schars(v) => ints(v),
        V::Uchar(v) => AttrValue::Int(v.into()),
        V::Uchars(v) => ints(v),
        V::Short(v) => AttrValue::Int(v.into()),
        V::Shorts(v) => ints(v),
        V::Ushort(v) => AttrValue::Int(v.into()),
        V::Ushorts(v) => ints(v),
        V::Int(v) => AttrValue::Int(v.into()),
        V::Ints(v) => ints(v),
        V::Uint(v) => AttrValue::Int(v.into()),
        V::Uints(v) => ints(v),
        V::Longlong(v) => AttrValue::Int(v),
        V::Longlongs(v) => AttrValue::Ints(v),
        V::Ulonglong(v) => AttrValue::Int(i64::try_from(v).ok()?),
        V::Ulonglongs(v) => AttrValue::Ints(
            v.into_iter()
                .map(i64::try_from)
                .collect::<Result<_, _>>()
                .ok()?,
        ),
        #[allow(unreachable_patterns)]
        _ => return None,
    };
    Some(converted)
}
