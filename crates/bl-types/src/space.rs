//! Search space definitions: typed dimensions and the ordered space built from them.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{BlError, BlResult, ObjectiveError};
use crate::validation_error;

/// Describes the interval a dimension is sampled from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DimensionKind {
    /// Continuous closed interval [low, high].
    Real { low: f64, high: f64 },
    /// Integer range [low, high] inclusive.
    Integer { low: i64, high: i64 },
}

/// A single dimension of the search space.
///
/// Always constructed through [`Dimension::real`] / [`Dimension::integer`] (or
/// deserialized through the same checks), so `low <= high` holds for every
/// value of this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDimension", into = "RawDimension")]
pub struct Dimension {
    name: Option<String>,
    kind: DimensionKind,
}

/// Serialized shape of a dimension, e.g. `{"type": "real", "low": -10, "high": 10, "name": "x"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawDimension {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(flatten)]
    kind: DimensionKind,
}

impl TryFrom<RawDimension> for Dimension {
    type Error = BlError;

    fn try_from(raw: RawDimension) -> BlResult<Self> {
        let dim = match raw.kind {
            DimensionKind::Real { low, high } => Dimension::real(low, high)?,
            DimensionKind::Integer { low, high } => Dimension::integer(low, high)?,
        };
        Ok(match raw.name {
            Some(name) => dim.with_name(name),
            None => dim,
        })
    }
}

impl From<Dimension> for RawDimension {
    fn from(dim: Dimension) -> Self {
        Self {
            name: dim.name,
            kind: dim.kind,
        }
    }
}

impl Dimension {
    /// Continuous dimension over `[low, high]`.
    pub fn real(low: f64, high: f64) -> BlResult<Self> {
        if !low.is_finite() || !high.is_finite() {
            return Err(validation_error!(
                "real bounds must be finite, got [{low}, {high}]"
            ));
        }
        if low > high {
            return Err(validation_error!(
                "lower bound {low} exceeds upper bound {high}"
            ));
        }
        // The uniform sampler rescales the span, so leave headroom below f64::MAX.
        if !(high - low <= f64::MAX / 2.0) {
            return Err(validation_error!(
                "real bounds [{low}, {high}] are too wide to sample uniformly"
            ));
        }
        Ok(Self {
            name: None,
            kind: DimensionKind::Real { low, high },
        })
    }

    /// Integer dimension over `low..=high`.
    pub fn integer(low: i64, high: i64) -> BlResult<Self> {
        if low > high {
            return Err(validation_error!(
                "lower bound {low} exceeds upper bound {high}"
            ));
        }
        Ok(Self {
            name: None,
            kind: DimensionKind::Integer { low, high },
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn kind(&self) -> DimensionKind {
        self.kind
    }

    pub fn low(&self) -> f64 {
        match self.kind {
            DimensionKind::Real { low, .. } => low,
            DimensionKind::Integer { low, .. } => low as f64,
        }
    }

    pub fn high(&self) -> f64 {
        match self.kind {
            DimensionKind::Real { high, .. } => high,
            DimensionKind::Integer { high, .. } => high as f64,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low() && value <= self.high()
    }

    /// Draw a uniform sample from the dimension.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        match self.kind {
            DimensionKind::Real { low, high } => rng.random_range(low..=high),
            DimensionKind::Integer { low, high } => rng.random_range(low..=high) as f64,
        }
    }

    /// Map a value into [0, 1].
    pub fn to_unit(&self, value: f64) -> f64 {
        let span = self.high() - self.low();
        if span == 0.0 {
            return 0.0;
        }
        ((value - self.low()) / span).clamp(0.0, 1.0)
    }

    /// Inverse of [`Dimension::to_unit`]; integer dimensions are rounded.
    pub fn from_unit(&self, unit: f64) -> f64 {
        let value = self.low() + unit.clamp(0.0, 1.0) * (self.high() - self.low());
        match self.kind {
            DimensionKind::Real { low, high } => value.clamp(low, high),
            DimensionKind::Integer { low, high } => value.round().clamp(low as f64, high as f64),
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (kind, low, high) = match self.kind {
            DimensionKind::Real { low, high } => ("Real", low.to_string(), high.to_string()),
            DimensionKind::Integer { low, high } => ("Integer", low.to_string(), high.to_string()),
        };
        match &self.name {
            Some(name) => write!(f, "{kind}(low={low}, high={high}, name='{name}')"),
            None => write!(f, "{kind}(low={low}, high={high})"),
        }
    }
}

/// The full search space: an ordered list of dimensions.
///
/// Points are positional: coordinate `i` of a point belongs to dimension `i`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Dimension>", into = "Vec<Dimension>")]
pub struct Space {
    dimensions: Vec<Dimension>,
}

impl TryFrom<Vec<Dimension>> for Space {
    type Error = BlError;

    fn try_from(dimensions: Vec<Dimension>) -> BlResult<Self> {
        Self::from_dimensions(dimensions)
    }
}

impl From<Space> for Vec<Dimension> {
    fn from(space: Space) -> Self {
        space.dimensions
    }
}

impl Space {
    pub fn new() -> Self {
        Self {
            dimensions: Vec::new(),
        }
    }

    pub fn from_dimensions(dimensions: Vec<Dimension>) -> BlResult<Self> {
        dimensions
            .into_iter()
            .try_fold(Self::new(), |space, dim| space.push(dim))
    }

    /// Append a dimension, rejecting duplicate names.
    pub fn push(mut self, dimension: Dimension) -> BlResult<Self> {
        if let Some(name) = dimension.name() {
            if self.dimensions.iter().any(|d| d.name() == Some(name)) {
                return Err(validation_error!("duplicate dimension name '{name}'"));
            }
        }
        self.dimensions.push(dimension);
        Ok(self)
    }

    pub fn add_real(self, name: impl Into<String>, low: f64, high: f64) -> BlResult<Self> {
        self.push(Dimension::real(low, high)?.with_name(name))
    }

    pub fn add_integer(self, name: impl Into<String>, low: i64, high: i64) -> BlResult<Self> {
        self.push(Dimension::integer(low, high)?.with_name(name))
    }

    /// Build a space from a dynamically-typed description.
    ///
    /// Every element must be an interval object such as
    /// `{"type": "real", "low": -10, "high": 10, "name": "x"}`. Plain arrays
    /// like `["x", -10, 10]` are rejected: positional tuples carry no type
    /// information and are never guessed at.
    pub fn from_json(value: &Value) -> BlResult<Self> {
        let entries = value.as_array().ok_or_else(|| {
            validation_error!("space must be a list of dimensions, got {}", json_kind(value))
        })?;

        let mut dimensions = Vec::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            if !entry.is_object() {
                return Err(validation_error!(
                    "dimension {idx}: expected an interval object like \
                     {{\"type\": \"real\", \"low\": .., \"high\": ..}}, got {} {entry}",
                    json_kind(entry)
                ));
            }
            let dim: Dimension = serde_json::from_value(entry.clone())
                .map_err(|e| validation_error!("dimension {idx}: {e}"))?;
            dimensions.push(dim);
        }
        Self::from_dimensions(dimensions)
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Dimension names, with `X_i` standing in for unnamed dimensions.
    pub fn names(&self) -> Vec<String> {
        self.dimensions
            .iter()
            .enumerate()
            .map(|(i, d)| d.name().map_or_else(|| format!("X_{i}"), str::to_string))
            .collect()
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> Vec<f64> {
        self.dimensions.iter().map(|d| d.sample(rng)).collect()
    }

    /// Check arity and bounds of a point.
    pub fn check_point(&self, point: &[f64]) -> BlResult<()> {
        if point.len() != self.len() {
            return Err(ObjectiveError::DimensionMismatch {
                expected: self.len(),
                actual: point.len(),
            }
            .into());
        }
        for (dim, value) in self.dimensions.iter().zip(point) {
            if !dim.contains(*value) {
                return Err(validation_error!("{value} lies outside {dim}"));
            }
        }
        Ok(())
    }

    pub fn to_unit(&self, point: &[f64]) -> Vec<f64> {
        self.dimensions
            .iter()
            .zip(point)
            .map(|(d, v)| d.to_unit(*v))
            .collect()
    }

    pub fn from_unit(&self, unit: &[f64]) -> Vec<f64> {
        self.dimensions
            .iter()
            .zip(unit)
            .map(|(d, u)| d.from_unit(*u))
            .collect()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn sample_space() -> Space {
        Space::new()
            .add_real("x", -10.0, 10.0)
            .and_then(|s| s.add_real("y", -10.0, 10.0))
            .and_then(|s| s.add_integer("depth", 1, 5))
            .unwrap()
    }

    #[test]
    fn inverted_bounds_rejected() {
        assert!(matches!(
            Dimension::real(1.0, -1.0),
            Err(BlError::Validation(_))
        ));
        assert!(Dimension::integer(3, 2).is_err());
        assert!(Dimension::real(f64::NEG_INFINITY, 0.0).is_err());
        // Degenerate intervals are allowed.
        assert!(Dimension::real(2.0, 2.0).is_ok());
    }

    #[test]
    fn unrepresentable_span_rejected() {
        assert!(matches!(
            Dimension::real(-f64::MAX, f64::MAX),
            Err(BlError::Validation(_))
        ));
        assert!(Space::new().add_real("x", -f64::MAX, f64::MAX).is_err());
        assert!(Dimension::real(0.0, f64::MAX).is_err());
        let dim = Dimension::real(-f64::MAX / 4.0, f64::MAX / 4.0).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(dim.contains(dim.sample(&mut rng)));
    }

    #[test]
    fn duplicate_names_rejected() {
        let result = Space::new()
            .add_real("x", 0.0, 1.0)
            .and_then(|s| s.add_real("x", 0.0, 2.0));
        assert!(result.is_err());
    }

    #[test]
    fn sampling_respects_bounds() {
        let space = sample_space();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let point = space.sample(&mut rng);
            space.check_point(&point).unwrap();
            assert_eq!(point[2].fract(), 0.0);
        }
    }

    #[test]
    fn unit_transform_round_trips() {
        let space = sample_space();
        let point = vec![2.5, -7.5, 4.0];
        let unit = space.to_unit(&point);
        assert!((unit[0] - 0.625).abs() < 1e-12);
        assert!((unit[1] - 0.125).abs() < 1e-12);
        assert!((unit[2] - 0.75).abs() < 1e-12);
        assert_eq!(space.from_unit(&unit), point);
    }

    #[test]
    fn from_unit_clips_and_rounds() {
        let dim = Dimension::integer(1, 5).unwrap();
        assert_eq!(dim.from_unit(0.49), 3.0);
        assert_eq!(dim.from_unit(1.7), 5.0);
        let degenerate = Dimension::real(3.0, 3.0).unwrap();
        assert_eq!(degenerate.to_unit(3.0), 0.0);
        assert_eq!(degenerate.from_unit(0.9), 3.0);
    }

    #[test]
    fn check_point_reports_mismatch() {
        let space = sample_space();
        assert!(matches!(
            space.check_point(&[0.0, 0.0]),
            Err(BlError::Objective(ObjectiveError::DimensionMismatch { expected: 3, actual: 2 }))
        ));
        assert!(space.check_point(&[11.0, 0.0, 1.0]).is_err());
    }

    #[test]
    fn names_fill_in_unnamed_dimensions() {
        let space = Space::from_dimensions(vec![
            Dimension::real(0.0, 1.0).unwrap(),
            Dimension::real(0.0, 1.0).unwrap().with_name("lr"),
        ])
        .unwrap();
        assert_eq!(space.names(), vec!["X_0".to_string(), "lr".to_string()]);
    }

    #[test]
    fn json_space_accepts_interval_objects() {
        let space = Space::from_json(&json!([
            {"type": "real", "low": -10, "high": 10, "name": "x"},
            {"type": "integer", "low": 0, "high": 3},
        ]))
        .unwrap();
        assert_eq!(space.len(), 2);
        assert_eq!(space.dimensions()[0].name(), Some("x"));
        assert_eq!(space.dimensions()[1].kind(), DimensionKind::Integer { low: 0, high: 3 });
    }

    #[test]
    fn json_space_rejects_plain_tuples() {
        let err = Space::from_json(&json!([["x", -10.0, 10.0], ["y", -10.0, 10.0]])).unwrap_err();
        match err {
            BlError::Validation(msg) => {
                assert!(msg.starts_with("dimension 0"), "{msg}");
                assert!(msg.contains("array"), "{msg}");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn json_space_checks_bounds() {
        let err = Space::from_json(&json!([{"type": "real", "low": 5, "high": 1}])).unwrap_err();
        assert!(err.to_string().contains("exceeds"), "{err}");
        assert!(Space::from_json(&json!({"x": [0, 1]})).is_err());
    }

    #[test]
    fn serde_round_trip_keeps_invariants() {
        let space = sample_space();
        let text = serde_json::to_string(&space).unwrap();
        let back: Space = serde_json::from_str(&text).unwrap();
        assert_eq!(back, space);

        let bad: Result<Space, _> =
            serde_json::from_str(r#"[{"type":"real","low":1.0,"high":0.0}]"#);
        assert!(bad.is_err());
    }

    #[test]
    fn display_matches_interval_notation() {
        let dim = Dimension::real(-10.0, 10.0).unwrap().with_name("x");
        assert_eq!(dim.to_string(), "Real(low=-10, high=10, name='x')");
    }
}
