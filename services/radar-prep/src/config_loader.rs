//! Configuration loader for radar-prep
//!
//! Loads a single YAML file into [`RadarPrepConfig`]. Every section is
//! optional and falls back to its defaults.
//!
//! Supports environment variable substitution using ${VAR} syntax.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use radar_ingestion::RadarPrepConfig;

/// Load and parse a config file with environment variable substitution
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RadarPrepConfig> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config from {:?}", path.as_ref()))?;

    parse_config(&content)
        .with_context(|| format!("Failed to load config from {:?}", path.as_ref()))
}

/// Parse YAML config content
pub fn parse_config(content: &str) -> Result<RadarPrepConfig> {
    let expanded = expand_env_vars(content)?;

    let config: RadarPrepConfig =
        serde_yaml::from_str(&expanded).with_context(|| "Failed to parse config YAML")?;

    validate_config(&config)?;

    Ok(config)
}

/// Check a config after command-line overrides have been applied
pub fn validate_config(config: &RadarPrepConfig) -> Result<()> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in YAML content
/// Supports ${VAR} and ${VAR:-default} syntax
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next();

        let mut var_expr = String::new();
        let mut depth = 1;
        while depth > 0 {
            match chars.next() {
                Some('{') => {
                    depth += 1;
                    var_expr.push('{');
                }
                Some('}') => {
                    depth -= 1;
                    if depth > 0 {
                        var_expr.push('}');
                    }
                }
                Some(c) => var_expr.push(c),
                None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
            }
        }

        result.push_str(&resolve_var_expr(&var_expr)?);
    }

    Ok(result)
}

/// Resolve VAR or VAR:-default
fn resolve_var_expr(expr: &str) -> Result<String> {
    match expr.split_once(":-") {
        Some((name, default)) => match std::env::var(name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        },
        None => std::env::var(expr.trim())
            .with_context(|| format!("Environment variable {} not set", expr)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use superob::WeightMethod;

    #[test]
    fn test_expand_default() {
        let out = expand_env_vars("dir: ${RADAR_PREP_TEST_UNSET_DIR:-/tmp/obs}").unwrap();
        assert_eq!(out, "dir: /tmp/obs");
    }

    #[test]
    fn test_expand_set_variable() {
        std::env::set_var("RADAR_PREP_TEST_SPACING", "1500");
        let out = expand_env_vars("grid_spacing: ${RADAR_PREP_TEST_SPACING}").unwrap();
        assert_eq!(out, "grid_spacing: 1500");
    }

    #[test]
    fn test_unset_variable_is_error() {
        assert!(expand_env_vars("x: ${RADAR_PREP_TEST_NEVER_SET}").is_err());
        assert!(expand_env_vars("x: ${UNCLOSED").is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
grid:
  grid_spacing: 2000.0
  method: barnes
processing:
  unfold: phase
  threads: 4
serialization:
  errors:
    velocity: 2.0
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.grid.grid_spacing, 2000.0);
        assert_eq!(config.grid.method, WeightMethod::Barnes);
        assert_eq!(config.grid.min_count, 3);
        assert_eq!(config.processing.threads, Some(4));
        assert_eq!(config.processing.min_file_size, 2_048_000);
        assert_eq!(config.serialization.errors.velocity, 2.0);
        assert_eq!(config.serialization.errors.reflectivity, 5.0);
        assert_eq!(config.qc.thin_factor, 4);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(parse_config("grid:\n  roi: 0.0\n").is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("radar-prep.yaml");
        std::fs::write(&path, "processing:\n  only_velocity: true\n").unwrap();

        let config = load_config(&path).unwrap();
        assert!(config.processing.only_velocity);
        assert!(load_config(dir.path().join("missing.yaml")).is_err());
    }
}
