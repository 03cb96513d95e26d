// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Service Configuration Types
//
// Defines the configuration schema for a FleetFlow service, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Storage backend selection
// - Upload storage and workflow tuning
// - Network and observability settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::domain::repository::{PostgresConfig, StorageBackend};

pub const API_VERSION: &str = "fleetflow/v1";
pub const KIND: &str = "ServiceConfig";

/// Top-level Kubernetes-style service configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfigManifest {
    /// API version (must be "fleetflow/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "ServiceConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: ServiceConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable deployment name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Service configuration specification (content under spec:)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfigSpec {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub uploads: UploadConfig,

    #[serde(default)]
    pub workflow: WorkflowConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageKind,

    /// PostgreSQL connection string. Supports `env:VAR_NAME` indirection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Directory uploaded files are written to
    #[serde(default = "default_upload_dir")]
    pub directory: String,

    /// Prefix of the URL returned for an uploaded file
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    #[serde(default = "default_max_upload_bytes")]
    pub max_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Report whether a precondition miss was "not found" or "wrong status".
    /// Off by default: both outcomes are reported as one.
    #[serde(default)]
    pub precondition_detail: bool,

    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Prometheus scrape port
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_max_connections() -> u32 {
    5
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_upload_dir() -> String {
    "./uploads".to_string()
}

fn default_public_base_url() -> String {
    "/uploads".to_string()
}

fn default_max_upload_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_page_size() -> u32 {
    10
}

fn default_max_page_size() -> u32 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageKind::Memory,
            database_url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_api_port(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            directory: default_upload_dir(),
            public_base_url: default_public_base_url(),
            max_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            precondition_detail: false,
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

impl Default for ServiceConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "fleetflow".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: ServiceConfigSpec::default(),
        }
    }
}

impl ServiceConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. FLEETFLOW_CONFIG_PATH environment variable
    /// 2. ./fleetflow-config.yaml (working directory)
    /// 3. ~/.fleetflow/config.yaml (user home)
    /// 4. /etc/fleetflow/config.yaml (system, Unix) or C:\ProgramData\FleetFlow\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("FLEETFLOW_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./fleetflow-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".fleetflow").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/fleetflow/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\FleetFlow\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path fails if missing or invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("FLEETFLOW_DATABASE_URL") {
            tracing::info!("Environment override: FLEETFLOW_DATABASE_URL");
            self.spec.storage.database_url = Some(url);
            self.spec.storage.backend = StorageKind::Postgres;
        }

        if let Ok(val) = std::env::var("FLEETFLOW_PRECONDITION_DETAIL") {
            match parse_flag(&val) {
                Some(flag) => {
                    tracing::info!("Environment override: FLEETFLOW_PRECONDITION_DETAIL={}", flag);
                    self.spec.workflow.precondition_detail = flag;
                }
                None => {
                    tracing::warn!(
                        "Invalid value for FLEETFLOW_PRECONDITION_DETAIL: '{}'. Expected true/false. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    /// Resolve the configured storage into a backend selection.
    pub fn storage_backend(&self) -> anyhow::Result<StorageBackend> {
        match self.spec.storage.backend {
            StorageKind::Memory => Ok(StorageBackend::InMemory),
            StorageKind::Postgres => {
                let raw = self
                    .spec
                    .storage
                    .database_url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("spec.storage.database_url is required for the postgres backend"))?;
                Ok(StorageBackend::PostgreSQL(PostgresConfig {
                    connection_string: resolve_env_value(raw)?,
                    max_connections: self.spec.storage.max_connections,
                }))
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!("Invalid apiVersion: '{}'. Must be '{}'", self.api_version, API_VERSION);
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let storage = &self.spec.storage;
        if storage.backend == StorageKind::Postgres && storage.database_url.as_deref().is_none_or(str::is_empty) {
            anyhow::bail!("spec.storage.database_url is required for the postgres backend");
        }
        if storage.max_connections == 0 {
            anyhow::bail!("spec.storage.max_connections must be at least 1");
        }

        if self.spec.uploads.directory.is_empty() {
            anyhow::bail!("spec.uploads.directory cannot be empty");
        }
        if self.spec.uploads.max_bytes == 0 {
            anyhow::bail!("spec.uploads.max_bytes must be greater than zero");
        }

        let workflow = &self.spec.workflow;
        if workflow.default_page_size == 0 || workflow.max_page_size == 0 {
            anyhow::bail!("spec.workflow page sizes must be at least 1");
        }
        if workflow.default_page_size > workflow.max_page_size {
            anyhow::bail!(
                "spec.workflow.default_page_size ({}) exceeds max_page_size ({})",
                workflow.default_page_size,
                workflow.max_page_size
            );
        }

        let format = self.spec.observability.logging.format.as_str();
        if format != "json" && format != "text" {
            anyhow::bail!("Invalid logging format: '{}'. Must be 'json' or 'text'", format);
        }

        Ok(())
    }
}

fn parse_flag(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Resolve `env:VAR_NAME` indirection; any other value is returned as is.
pub fn resolve_env_value(raw: &str) -> anyhow::Result<String> {
    match raw.strip_prefix("env:") {
        Some(var) => std::env::var(var)
            .map_err(|_| anyhow::anyhow!("Environment variable '{}' referenced by configuration is not set", var)),
        None => Ok(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let manifest = ServiceConfigManifest::default();
        assert_eq!(manifest.api_version, "fleetflow/v1");
        assert_eq!(manifest.kind, "ServiceConfig");
        assert_eq!(manifest.spec.storage.backend, StorageKind::Memory);
        assert!(!manifest.spec.workflow.precondition_detail);
        assert_eq!(manifest.spec.workflow.default_page_size, 10);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
apiVersion: fleetflow/v1
kind: ServiceConfig
metadata:
  name: fleet-hq
spec:
  storage:
    backend: postgres
    database_url: postgres://fleet@localhost/fleet
  workflow:
    precondition_detail: true
"#;
        let manifest = ServiceConfigManifest::from_yaml_str(yaml).unwrap();
        assert_eq!(manifest.metadata.name, "fleet-hq");
        assert_eq!(manifest.spec.storage.backend, StorageKind::Postgres);
        assert_eq!(manifest.spec.storage.max_connections, 5);
        assert!(manifest.spec.workflow.precondition_detail);
        assert_eq!(manifest.spec.network.port, 8080);
        assert_eq!(manifest.spec.observability.logging.format, "text");
        assert!(manifest.validate().is_ok());

        match manifest.storage_backend().unwrap() {
            StorageBackend::PostgreSQL(config) => {
                assert_eq!(config.connection_string, "postgres://fleet@localhost/fleet")
            }
            StorageBackend::InMemory => panic!("expected postgres backend"),
        }
    }

    #[test]
    fn test_yaml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleetflow-config.yaml");
        let mut manifest = ServiceConfigManifest::default();
        manifest.spec.uploads.max_bytes = 2048;
        manifest.to_yaml_file(&path).unwrap();

        let loaded = ServiceConfigManifest::load_or_default(Some(path)).unwrap();
        assert_eq!(loaded.spec.uploads.max_bytes, 2048);
        assert!(ServiceConfigManifest::load_or_default(Some(dir.path().join("missing.yaml"))).is_err());
    }

    #[test]
    fn test_validation() {
        let mut manifest = ServiceConfigManifest::default();

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.kind = "NodeConfig".to_string();
        assert!(manifest.validate().is_err());
        manifest.kind = KIND.to_string();

        manifest.spec.storage.backend = StorageKind::Postgres;
        assert!(manifest.validate().is_err());
        manifest.spec.storage.backend = StorageKind::Memory;

        manifest.spec.workflow.default_page_size = 500;
        assert!(manifest.validate().is_err());
        manifest.spec.workflow.default_page_size = 10;

        manifest.spec.observability.logging.format = "xml".to_string();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_env_indirection() {
        std::env::set_var("FLEETFLOW_TEST_DB_URL", "postgres://indirect");
        assert_eq!(resolve_env_value("env:FLEETFLOW_TEST_DB_URL").unwrap(), "postgres://indirect");
        assert_eq!(resolve_env_value("postgres://direct").unwrap(), "postgres://direct");
        assert!(resolve_env_value("env:FLEETFLOW_TEST_UNSET_VARIABLE").is_err());
    }
}
