//! In-memory representation of a gridded dataset.
//!
//! A [`Dataset`] mirrors the parts of a NetCDF file this workspace cares
//! about: 1-D coordinate variables, n-D data variables laid out over named
//! dimensions, and attributes at both levels. All numeric payloads are held
//! as `f64` after unpacking, with missing samples represented by NaN.

use ndarray::{Array1, ArrayD};

use crate::error::{NetCdfError, NetCdfResult};

/// Attribute payload.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Texts(Vec<String>),
    Int(i64),
    Ints(Vec<i64>),
    Float(f64),
    Floats(Vec<f64>),
}

impl AttrValue {
    /// Scalar numeric view; single-element arrays count as scalars.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Float(v) => Some(*v),
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Floats(v) if v.len() == 1 => Some(v[0]),
            AttrValue::Ints(v) if v.len() == 1 => Some(v[0] as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            AttrValue::Texts(v) if v.len() == 1 => Some(&v[0]),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

/// A named attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: AttrValue,
}

/// Ordered attribute list with unique names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(Vec<Attribute>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.0.iter().find(|a| a.name == name).map(|a| &a.value)
    }

    /// Insert or replace, keeping the original position on replace.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.0.push(Attribute { name, value }),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
        let idx = self.0.iter().position(|a| a.name == name)?;
        Some(self.0.remove(idx).value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Attribute> for Attributes {
    fn from_iter<T: IntoIterator<Item = Attribute>>(iter: T) -> Self {
        let mut attrs = Attributes::new();
        for attr in iter {
            attrs.set(attr.name, attr.value);
        }
        attrs
    }
}

/// A 1-D coordinate variable; its dimension shares its name.
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinate {
    pub name: String,
    pub values: Array1<f64>,
    pub attributes: Attributes,
}

impl Coordinate {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values: Array1::from(values),
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes.set(name, value);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// An n-D data variable over named dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct DataVariable {
    pub name: String,
    pub dims: Vec<String>,
    pub data: ArrayD<f64>,
    pub attributes: Attributes,
}

impl DataVariable {
    /// Build a variable, checking that `dims` names every axis of `data`.
    pub fn new(
        name: impl Into<String>,
        dims: Vec<String>,
        data: ArrayD<f64>,
        attributes: Attributes,
    ) -> NetCdfResult<Self> {
        let name = name.into();
        if dims.len() != data.ndim() {
            return Err(NetCdfError::InvalidFormat(format!(
                "variable '{}' has {} dimension names for {}-D data",
                name,
                dims.len(),
                data.ndim()
            )));
        }
        Ok(Self {
            name,
            dims,
            data,
            attributes,
        })
    }

    /// Axis index of a named dimension.
    pub fn axis(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }
}

/// A collection of coordinates and data variables with global attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    coordinates: Vec<Coordinate>,
    variables: Vec<DataVariable>,
    pub attributes: Attributes,
}

impl Dataset {
    pub fn new(attributes: Attributes) -> Self {
        Self {
            coordinates: Vec::new(),
            variables: Vec::new(),
            attributes,
        }
    }

    /// Add a coordinate; its length must agree with variables already using
    /// the dimension.
    pub fn add_coordinate(&mut self, coord: Coordinate) -> NetCdfResult<()> {
        if self.coordinate(&coord.name).is_some() {
            return Err(NetCdfError::InvalidFormat(format!(
                "duplicate coordinate '{}'",
                coord.name
            )));
        }
        if let Some(len) = self.dimension_len(&coord.name) {
            if len != coord.len() {
                return Err(NetCdfError::InvalidFormat(format!(
                    "coordinate '{}' has {} values but dimension has length {}",
                    coord.name,
                    coord.len(),
                    len
                )));
            }
        }
        self.coordinates.push(coord);
        Ok(())
    }

    /// Add or replace a data variable, checking each axis against known
    /// dimension lengths.
    pub fn add_variable(&mut self, var: DataVariable) -> NetCdfResult<()> {
        if self.coordinate(&var.name).is_some() {
            return Err(NetCdfError::InvalidFormat(format!(
                "variable '{}' collides with a coordinate",
                var.name
            )));
        }
        for (dim, &len) in var.dims.iter().zip(var.data.shape()) {
            let known = self
                .variables
                .iter()
                .filter(|v| v.name != var.name)
                .find_map(|v| v.axis(dim).map(|axis| v.data.shape()[axis]))
                .or_else(|| self.coordinate(dim).map(Coordinate::len));
            if let Some(known) = known {
                if known != len {
                    return Err(NetCdfError::InvalidFormat(format!(
                        "variable '{}' has length {} along '{}', expected {}",
                        var.name, len, dim, known
                    )));
                }
            }
        }
        match self.variables.iter_mut().find(|v| v.name == var.name) {
            Some(existing) => *existing = var,
            None => self.variables.push(var),
        }
        Ok(())
    }

    pub fn coordinate(&self, name: &str) -> Option<&Coordinate> {
        self.coordinates.iter().find(|c| c.name == name)
    }

    pub fn variable(&self, name: &str) -> Option<&DataVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Like [`Dataset::variable`] but a missing name is an error.
    pub fn require_variable(&self, name: &str) -> NetCdfResult<&DataVariable> {
        self.variable(name)
            .ok_or_else(|| NetCdfError::MissingData(format!("variable '{}'", name)))
    }

    pub fn require_coordinate(&self, name: &str) -> NetCdfResult<&Coordinate> {
        self.coordinate(name)
            .ok_or_else(|| NetCdfError::MissingData(format!("coordinate '{}'", name)))
    }

    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }

    pub fn variables(&self) -> &[DataVariable] {
        &self.variables
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variable(name).is_some()
    }

    /// Length of a dimension, from its coordinate or any variable using it.
    pub fn dimension_len(&self, name: &str) -> Option<usize> {
        self.coordinate(name).map(Coordinate::len).or_else(|| {
            self.variables
                .iter()
                .find_map(|v| v.axis(name).map(|axis| v.data.shape()[axis]))
        })
    }

    /// Every dimension in first-use order, coordinates first.
    pub fn dimensions(&self) -> Vec<(String, usize)> {
        let mut dims: Vec<(String, usize)> = self
            .coordinates
            .iter()
            .map(|c| (c.name.clone(), c.len()))
            .collect();
        for var in &self.variables {
            for (dim, &len) in var.dims.iter().zip(var.data.shape()) {
                if !dims.iter().any(|(d, _)| d == dim) {
                    dims.push((dim.clone(), len));
                }
            }
        }
        dims
    }

    /// New dataset holding the given variables plus the coordinates they use.
    ///
    /// Global attributes are copied unchanged.
    pub fn derive(&self, variables: Vec<DataVariable>) -> NetCdfResult<Dataset> {
        let mut derived = Dataset::new(self.attributes.clone());
        for coord in &self.coordinates {
            if variables.iter().any(|v| v.axis(&coord.name).is_some()) {
                derived.add_coordinate(coord.clone())?;
            }
        }
        for var in variables {
            derived.add_variable(var)?;
        }
        Ok(derived)
    }
}
