//! Run settings for the demo, from an optional JSON file plus environment overrides.

use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;

use bl_optimizer::{Acquisition, MaximizeConfig, MinimizeConfig};
use bl_types::{config_error, BlResult, Space};

pub const CONFIG_ENV: &str = "BAYESLAB_CONFIG";
pub const SEED_ENV: &str = "BAYESLAB_SEED";
pub const INIT_POINTS_ENV: &str = "BAYESLAB_INIT_POINTS";
pub const N_ITER_ENV: &str = "BAYESLAB_N_ITER";
pub const N_CALLS_ENV: &str = "BAYESLAB_N_CALLS";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NotebookConfig {
    /// Dimension list in the `Space::from_json` format. The square
    /// `[-10, 10]²` over `x`, `y` when absent.
    pub dimensions: Option<Value>,
    pub minimize: MinimizeConfig,
    pub maximize: MaximizeConfig,
}

impl Default for NotebookConfig {
    fn default() -> Self {
        Self {
            dimensions: None,
            minimize: MinimizeConfig::default()
                .with_n_calls(12)
                .with_random_state(1),
            maximize: MaximizeConfig::default()
                .with_init_points(2)
                .with_n_iter(10)
                .with_acquisition(Acquisition::ei())
                .with_random_state(1),
        }
    }
}

impl NotebookConfig {
    /// Reads `BAYESLAB_CONFIG` if set, then applies the other `BAYESLAB_*` overrides.
    pub fn load() -> BlResult<Self> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> BlResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn apply_overrides<L>(&mut self, lookup: L) -> BlResult<()>
    where
        L: Fn(&str) -> Option<String>,
    {
        if let Some(seed) = parse_var::<u64, _>(&lookup, SEED_ENV)? {
            self.minimize.random_state = Some(seed);
            self.maximize.random_state = Some(seed);
        }
        if let Some(n) = parse_var(&lookup, INIT_POINTS_ENV)? {
            self.maximize.init_points = n;
        }
        if let Some(n) = parse_var(&lookup, N_ITER_ENV)? {
            self.maximize.n_iter = n;
        }
        if let Some(n) = parse_var::<usize, _>(&lookup, N_CALLS_ENV)? {
            self.minimize.n_calls = n;
            // Keep a short budget usable: at least one guided call when possible.
            if self.minimize.n_initial_points >= n {
                self.minimize.n_initial_points = n.saturating_sub(1).max(1);
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> BlResult<()> {
        self.minimize.validate()?;
        self.maximize.validate()?;
        self.space().map(|_| ())
    }

    pub fn space(&self) -> BlResult<Space> {
        match &self.dimensions {
            Some(dims) => Space::from_json(dims),
            None => Space::from_json(&json!([
                {"type": "real", "low": -10.0, "high": 10.0, "name": "x"},
                {"type": "real", "low": -10.0, "high": 10.0, "name": "y"},
            ])),
        }
    }
}

fn parse_var<T, L>(lookup: &L, key: &str) -> BlResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    L: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| config_error!("{key}={raw:?}: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bl_types::BlError;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_demo_run() {
        let config = NotebookConfig::default();
        assert_eq!(config.minimize.n_calls, 12);
        assert_eq!(config.minimize.random_state, Some(1));
        assert_eq!(config.maximize.init_points, 2);
        assert_eq!(config.maximize.n_iter, 10);
        assert_eq!(config.maximize.acquisition, Acquisition::ei());
        assert_eq!(config.space().unwrap().names(), vec!["x", "y"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn overrides_apply() {
        let mut config = NotebookConfig::default();
        config
            .apply_overrides(env(&[(SEED_ENV, "42"), (N_ITER_ENV, "3"), (N_CALLS_ENV, "5")]))
            .unwrap();
        assert_eq!(config.minimize.random_state, Some(42));
        assert_eq!(config.maximize.random_state, Some(42));
        assert_eq!(config.maximize.n_iter, 3);
        assert_eq!(config.minimize.n_calls, 5);
        assert_eq!(config.minimize.n_initial_points, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bad_override_is_config_error() {
        let mut config = NotebookConfig::default();
        let err = config
            .apply_overrides(env(&[(INIT_POINTS_ENV, "two")]))
            .unwrap_err();
        assert!(matches!(err, BlError::Config(_)));
        assert!(err.to_string().contains(INIT_POINTS_ENV));
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config: NotebookConfig = serde_json::from_str(
            r#"{"maximize": {"init_points": 4, "n_iter": 6, "acquisition": {"kind": "expected_improvement", "xi": 0.0}}}"#,
        )
        .unwrap();
        assert_eq!(config.maximize.init_points, 4);
        assert_eq!(config.minimize.n_calls, 12);
        assert!(config.dimensions.is_none());
    }

    #[test]
    fn tuple_dimensions_fail_validation() {
        let config: NotebookConfig =
            serde_json::from_str(r#"{"dimensions": [["x", -10, 10], ["y", -10, 10]]}"#).unwrap();
        assert!(matches!(config.validate(), Err(BlError::Validation(_))));
    }
}
