use std::fs;
use std::path::Path;

use allocator::Client;
use allocator::ControllerConfig;
use anyhow::Context;
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;

/// One-shot input for `ratesim solve`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    #[serde(default)]
    pub config: ControllerConfig,
    pub clients: Vec<Client>,
    /// Tick timestamp handed to the controller.
    #[serde(default)]
    pub now: f64,
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
    load_file(path)
}

pub fn load_controller_config(path: &Path) -> Result<ControllerConfig> {
    load_file(path)
}

/// JSON for `.json` files, YAML for everything else.
fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON from {}", path.display()))
    } else {
        serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML from {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use allocator::SolverKind;
    use similar_asserts::assert_eq;

    use super::*;

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_yaml_scenario_with_defaults() {
        let file = write_temp(
            ".yaml",
            r#"
config:
  capacity: 80
  solver: greedy
clients:
  - id: alice
    demand: 55
    weight: 10
    minRate: 30
  - id: bob
    demand: 45
    weight: 5
"#,
        );

        let scenario = load_scenario(file.path()).unwrap();
        assert_eq!(scenario.config.capacity, 80.0);
        assert_eq!(scenario.config.solver, SolverKind::Greedy);
        assert_eq!(scenario.clients.len(), 2);
        assert_eq!(scenario.clients[0].min_rate, Some(30.0));
        assert_eq!(scenario.now, 0.0);
    }

    #[test]
    fn loads_json_config() {
        let file = write_temp(".json", r#"{"capacity": "120", "emaAlpha": 0.5}"#);
        let cfg = load_controller_config(file.path()).unwrap();
        assert_eq!(cfg.capacity, 120.0);
        assert_eq!(cfg.ema_alpha, 0.5);
    }

    #[test]
    fn reports_missing_and_malformed_files() {
        let err = load_scenario(Path::new("/nonexistent/scenario.yaml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));

        let file = write_temp(".json", "{ not json");
        let err = load_scenario(file.path()).unwrap_err();
        assert!(err.to_string().contains("failed to parse JSON"));
    }
}
