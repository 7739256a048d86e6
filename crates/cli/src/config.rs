use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Base URL of the service under test
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Values seeded into every run, overriding workflow vars
    #[serde(default)]
    pub vars: BTreeMap<String, Value>,

    /// Context key -> environment variable holding its value
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
            vars: BTreeMap::new(),
            env_vars: BTreeMap::new(),
        }
    }
}

impl CliConfig {
    pub fn load(config_path: &Path) -> Result<Self> {
        // Load config file if it exists, otherwise use defaults
        if !config_path.exists() {
            tracing::info!("Configuration file not found, using defaults");
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(config_path).context("Failed to read configuration file")?;
        toml::from_str(&content).context("Failed to parse configuration file")
    }

    /// Merge config vars, environment-backed vars and `--var` pairs, in
    /// increasing order of precedence
    pub fn resolve_vars(&self, cli_vars: &[(String, String)]) -> Result<BTreeMap<String, Value>> {
        self.resolve_vars_with(cli_vars, |name| std::env::var(name).ok())
    }

    /// Keys a run would seed, without reading the environment
    pub fn seeded_keys(&self, cli_vars: &[(String, String)]) -> Vec<String> {
        let mut keys: Vec<String> = self
            .vars
            .keys()
            .chain(self.env_vars.keys())
            .chain(cli_vars.iter().map(|(k, _)| k))
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    pub fn resolve_vars_with<F>(
        &self,
        cli_vars: &[(String, String)],
        lookup_env: F,
    ) -> Result<BTreeMap<String, Value>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut vars = self.vars.clone();

        for (key, env_name) in &self.env_vars {
            if cli_vars.iter().any(|(k, _)| k == key) {
                continue;
            }
            match lookup_env(env_name) {
                Some(value) => {
                    vars.insert(key.clone(), Value::String(value));
                }
                None => bail!(
                    "Environment variable {} (for '{}') is not set; set it or pass --var {}=...",
                    env_name,
                    key,
                    key
                ),
            }
        }

        for (key, value) in cli_vars {
            vars.insert(key.clone(), Value::String(value.clone()));
        }

        Ok(vars)
    }
}

/// Parse a `KEY=VALUE` pair; the value may itself contain `=`
pub fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = CliConfig::load(Path::new("/nonexistent/flowprobe.toml")).unwrap();
        assert!(config.base_url.is_none());
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_load_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
base_url = "https://stage-api.example.com"
timeout_secs = 10

[vars]
tenant = "stage_aithinkitive"

[env_vars]
password = "ECARE_PASSWORD"
"#
        )
        .unwrap();

        let config = CliConfig::load(file.path()).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("https://stage-api.example.com"));
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.vars.get("tenant"), Some(&json!("stage_aithinkitive")));
        assert_eq!(config.env_vars.get("password").unwrap(), "ECARE_PASSWORD");
    }

    #[test]
    fn test_invalid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "timeout_secs = \"soon\"").unwrap();
        assert!(CliConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_var_precedence() {
        let config = CliConfig {
            vars: BTreeMap::from([
                ("tenant".to_string(), json!("from-config")),
                ("username".to_string(), json!("config-user")),
            ]),
            env_vars: BTreeMap::from([("username".to_string(), "ECARE_USER".to_string())]),
            ..Default::default()
        };

        let vars = config
            .resolve_vars_with(&[], |name| (name == "ECARE_USER").then(|| "env-user".to_string()))
            .unwrap();
        assert_eq!(vars.get("tenant"), Some(&json!("from-config")));
        assert_eq!(vars.get("username"), Some(&json!("env-user")));

        let cli = vec![("username".to_string(), "cli-user".to_string())];
        let vars = config.resolve_vars_with(&cli, |_| None).unwrap();
        assert_eq!(vars.get("username"), Some(&json!("cli-user")));
    }

    #[test]
    fn test_missing_env_var() {
        let config = CliConfig {
            env_vars: BTreeMap::from([("password".to_string(), "ECARE_PASSWORD".to_string())]),
            ..Default::default()
        };

        let err = config.resolve_vars_with(&[], |_| None).unwrap_err();
        assert!(err.to_string().contains("ECARE_PASSWORD"));
    }

    #[test]
    fn test_seeded_keys_ignore_environment() {
        let config = CliConfig {
            vars: BTreeMap::from([("tenant".to_string(), json!("stage"))]),
            env_vars: BTreeMap::from([
                ("password".to_string(), "FLOWPROBE_UNSET_PASSWORD".to_string()),
                ("tenant".to_string(), "FLOWPROBE_UNSET_TENANT".to_string()),
            ]),
            ..Default::default()
        };
        let cli = vec![("username".to_string(), "rose".to_string())];

        assert_eq!(config.seeded_keys(&cli), vec!["password", "tenant", "username"]);
    }

    #[test]
    fn test_parse_var() {
        assert_eq!(
            parse_var("password=Pa=ss").unwrap(),
            ("password".to_string(), "Pa=ss".to_string())
        );
        assert_eq!(parse_var("empty=").unwrap(), ("empty".to_string(), String::new()));
        assert!(parse_var("novalue").is_err());
        assert!(parse_var("=value").is_err());
    }
}
