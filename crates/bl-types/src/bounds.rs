//! Named parameter bounds and parameter maps.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Index;

use crate::errors::{BlError, BlResult, ObjectiveError};
use crate::space::{Dimension, Space};
use crate::validation_error;

/// Mapping from parameter name to a closed interval `(low, high)`.
///
/// Keys are kept sorted, which fixes the positional order used whenever the
/// bounds are turned into a [`Space`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, (f64, f64)>", into = "BTreeMap<String, (f64, f64)>")]
pub struct Bounds {
    entries: BTreeMap<String, (f64, f64)>,
}

impl TryFrom<BTreeMap<String, (f64, f64)>> for Bounds {
    type Error = BlError;

    fn try_from(entries: BTreeMap<String, (f64, f64)>) -> BlResult<Self> {
        Self::new(entries)
    }
}

impl From<Bounds> for BTreeMap<String, (f64, f64)> {
    fn from(bounds: Bounds) -> Self {
        bounds.entries
    }
}

impl Bounds {
    pub fn new<I, K>(entries: I) -> BlResult<Self>
    where
        I: IntoIterator<Item = (K, (f64, f64))>,
        K: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (name, (low, high)) in entries {
            let name = name.into();
            // Reuse the dimension checks so both entry points agree.
            Dimension::real(low, high).map_err(|e| match e {
                BlError::Validation(msg) => validation_error!("bound '{name}': {msg}"),
                other => other,
            })?;
            if map.insert(name.clone(), (low, high)).is_some() {
                return Err(validation_error!("duplicate bound '{name}'"));
            }
        }
        if map.is_empty() {
            return Err(validation_error!("bounds must name at least one parameter"));
        }
        Ok(Self { entries: map })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<(f64, f64)> {
        self.entries.get(name).copied()
    }

    /// Positional space, one real dimension per key in sorted order.
    pub fn to_space(&self) -> BlResult<Space> {
        self.entries
            .iter()
            .try_fold(Space::new(), |space, (name, (low, high))| {
                space.add_real(name.clone(), *low, *high)
            })
    }

    pub fn params_from_point(&self, point: &[f64]) -> Params {
        Params(
            self.entries
                .keys()
                .cloned()
                .zip(point.iter().copied())
                .collect(),
        )
    }

    /// Positional point for a parameter map; every key must be present and no extras allowed.
    pub fn point_from_params(&self, params: &Params) -> BlResult<Vec<f64>> {
        if let Some(unknown) = params.0.keys().find(|k| !self.entries.contains_key(*k)) {
            return Err(ObjectiveError::UnknownParameter {
                name: unknown.clone(),
            }
            .into());
        }
        self.entries
            .keys()
            .map(|name| {
                params.get(name).ok_or_else(|| {
                    BlError::from(ObjectiveError::MissingParameter { name: name.clone() })
                })
            })
            .collect()
    }
}

/// A concrete assignment of values to named parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, f64>);

impl Params {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Index<&str> for Params {
    type Output = f64;

    fn index(&self, name: &str) -> &f64 {
        &self.0[name]
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Params {
    fn from_iter<T: IntoIterator<Item = (K, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl std::fmt::Display for Params {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "'{name}': {value}")?;
        }
        write!(f, "}}")
    }
}
