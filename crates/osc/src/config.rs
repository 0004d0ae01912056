//! Cloud configuration.
//!
//! Settings come from a `clouds.yaml` file and are overridden by the
//! `--os-*` flags (which clap also fills from `OS_*` environment variables).
//! The file is looked up in this order:
//!
//! 1. `--os-config` / `OS_CLIENT_CONFIG_FILE`
//! 2. `./clouds.yaml`
//! 3. the user config directory (`~/.config/osc/clouds.yaml` on Linux)
//! 4. `/etc/openstack/clouds.yaml`
//!
//! There is no service catalog: every service is reached through its entry
//! under `endpoints`. Catalog keys such as `region_name` and `interface` are
//! accepted and ignored.
//!
//! ```yaml
//! clouds:
//!   devstack:
//!     auth:
//!       token: gAAAAAB...
//!     region_name: RegionOne
//!     endpoints:
//!       compute: http://10.0.0.1:8774/v2.1
//!       network: http://10.0.0.1:9696
//!       volumev3: http://10.0.0.1:8776/v3/3f2a...
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use osc_dispatch::{Backend, Service};
use serde::Deserialize;

use crate::cli::CloudArgs;

const FILE_NAME: &str = "clouds.yaml";
const SYSTEM_PATH: &str = "/etc/openstack/clouds.yaml";

/// Contents of a `clouds.yaml` file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct CloudsFile {
    #[serde(default)]
    pub clouds: BTreeMap<String, CloudConfig>,
}

/// One named cloud.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CloudConfig {
    pub auth: AuthConfig,
    /// Service type to base URL.
    pub endpoints: BTreeMap<String, String>,
    pub verify: Option<bool>,
    /// Request timeout in seconds.
    pub timeout: Option<u64>,
    pub compute_api_version: Option<String>,
    pub volume_api_version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl CloudsFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read cloud configuration {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse cloud configuration {}", path.display()))
    }

    /// Picks the cloud to use: the named one, or the only one defined.
    pub fn select(&self, name: Option<&str>) -> Result<Option<&CloudConfig>> {
        match name {
            Some(name) => match self.clouds.get(name) {
                Some(cloud) => Ok(Some(cloud)),
                None => {
                    let known: Vec<&str> = self.clouds.keys().map(String::as_str).collect();
                    bail!(
                        "Cloud '{}' was not found (configured clouds: {})",
                        name,
                        if known.is_empty() {
                            "none".to_string()
                        } else {
                            known.join(", ")
                        }
                    )
                }
            },
            None if self.clouds.len() == 1 => Ok(self.clouds.values().next()),
            None => {
                if !self.clouds.is_empty() {
                    tracing::warn!(
                        clouds = self.clouds.len(),
                        "several clouds are configured and none was selected; use --os-cloud"
                    );
                }
                Ok(None)
            }
        }
    }
}

/// Resolved connection settings of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub token: Option<String>,
    pub endpoints: BTreeMap<Service, String>,
    pub verify: bool,
    pub timeout: Option<Duration>,
    pub backend: Backend,
    pub compute_api_version: Option<String>,
    pub volume_api_version: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            token: None,
            endpoints: BTreeMap::new(),
            verify: true,
            timeout: None,
            backend: Backend::Compute,
            compute_api_version: None,
            volume_api_version: None,
        }
    }
}

impl Settings {
    /// Loads the configuration file (if any) and applies the flags.
    pub fn load(args: &CloudArgs) -> Result<Self> {
        let file = match find_config(args.config.as_deref())? {
            Some(path) => {
                tracing::debug!(path = %path.display(), "using cloud configuration");
                CloudsFile::load(&path)?
            }
            None => CloudsFile::default(),
        };
        let cloud = file.select(args.cloud.as_deref())?;
        Ok(Self::merge(cloud, args))
    }

    /// Combines a cloud entry with the flags; flags win.
    pub fn merge(cloud: Option<&CloudConfig>, args: &CloudArgs) -> Self {
        let mut settings = Settings::default();

        if let Some(cloud) = cloud {
            settings.token = cloud.auth.token.clone();
            settings.verify = cloud.verify.unwrap_or(true);
            settings.timeout = cloud.timeout.map(Duration::from_secs);
            settings.compute_api_version = cloud.compute_api_version.clone();
            settings.volume_api_version = cloud.volume_api_version.clone();
            for (service_type, url) in &cloud.endpoints {
                match service_for(service_type) {
                    Some(service) => {
                        settings.endpoints.insert(service, url.clone());
                    }
                    None => tracing::debug!(service_type, "ignoring unknown endpoint"),
                }
            }
        }

        override_with(&mut settings.token, &args.token);
        override_with(&mut settings.compute_api_version, &args.compute_api_version);
        override_with(&mut settings.volume_api_version, &args.volume_api_version);
        for (service, url) in args.endpoint_overrides() {
            settings.endpoints.insert(service, url.to_string());
        }
        if args.insecure {
            settings.verify = false;
        }

        settings.backend = match args.network_backend {
            Some(backend) => backend.into(),
            None if settings.endpoints.contains_key(&Service::Network) => Backend::Network,
            None => Backend::Compute,
        };
        settings
    }

    pub fn endpoint(&self, service: Service) -> Option<&str> {
        self.endpoints.get(&service).map(String::as_str)
    }
}

fn override_with(target: &mut Option<String>, value: &Option<String>) {
    if let Some(value) = value {
        *target = Some(value.clone());
    }
}

/// Maps a catalog service type to a service.
fn service_for(service_type: &str) -> Option<Service> {
    match service_type {
        "compute" => Some(Service::Compute),
        "network" => Some(Service::Network),
        "image" => Some(Service::Image),
        "identity" => Some(Service::Identity),
        "volumev3" | "volume" | "block-storage" => Some(Service::Volume),
        _ => None,
    }
}

/// Locations searched when no file is named explicitly.
pub fn default_locations() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(FILE_NAME)];
    if let Some(dirs) = ProjectDirs::from("", "", "osc") {
        paths.push(dirs.config_dir().join(FILE_NAME));
    }
    paths.push(PathBuf::from(SYSTEM_PATH));
    paths
}

/// The configuration file to read. An explicit path must exist; the
/// default locations are optional.
pub fn find_config(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        let path = expand_tilde(path);
        if !path.is_file() {
            bail!("Cloud configuration {} does not exist", path.display());
        }
        return Ok(Some(path));
    }
    Ok(default_locations().into_iter().find(|p| p.is_file()))
}

fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(rest) = path.to_str().and_then(|s| s.strip_prefix("~/")) {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::NetworkBackend;
    use std::io::Write;

    const TWO_CLOUDS: &str = r#"
clouds:
  devstack:
    auth:
      token: secret
    region_name: RegionOne
    endpoints:
      compute: http://nova:8774/v2.1
      network: http://neutron:9696
      volumev3: http://cinder:8776/v3/p1
    timeout: 30
  legacy:
    auth:
      token: old
    verify: false
    endpoints:
      compute: http://nova-legacy:8774/v2.1
"#;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_select_named_cloud() {
        let file: CloudsFile = serde_yaml::from_str(TWO_CLOUDS).unwrap();
        let cloud = file.select(Some("legacy")).unwrap().unwrap();
        assert_eq!(cloud.auth.token.as_deref(), Some("old"));
        assert_eq!(cloud.verify, Some(false));
    }

    #[test]
    fn test_select_unknown_cloud_lists_known() {
        let file: CloudsFile = serde_yaml::from_str(TWO_CLOUDS).unwrap();
        let err = file.select(Some("prod")).unwrap_err().to_string();
        assert_eq!(
            err,
            "Cloud 'prod' was not found (configured clouds: devstack, legacy)"
        );
    }

    #[test]
    fn test_select_needs_name_when_ambiguous() {
        let file: CloudsFile = serde_yaml::from_str(TWO_CLOUDS).unwrap();
        assert!(file.select(None).unwrap().is_none());
    }

    #[test]
    fn test_single_cloud_is_implicit() {
        let file: CloudsFile =
            serde_yaml::from_str("clouds:\n  only:\n    auth:\n      token: t1\n").unwrap();
        let cloud = file.select(None).unwrap().unwrap();
        assert_eq!(cloud.auth.token.as_deref(), Some("t1"));
    }

    #[test]
    fn test_catalog_keys_are_ignored() {
        let yaml = "clouds:\n  c:\n    region_name: R1\n    interface: internal\n    \
                    endpoints:\n      image: http://glance:9292\n";
        let file: CloudsFile = serde_yaml::from_str(yaml).unwrap();
        let settings = Settings::merge(file.select(None).unwrap(), &CloudArgs::default());
        let expected = Settings {
            endpoints: BTreeMap::from([(Service::Image, "http://glance:9292".to_string())]),
            ..Settings::default()
        };
        assert_eq!(settings, expected);
    }

    #[test]
    fn test_merge_maps_endpoints_and_picks_network() {
        let file: CloudsFile = serde_yaml::from_str(TWO_CLOUDS).unwrap();
        let settings = Settings::merge(
            file.select(Some("devstack")).unwrap(),
            &CloudArgs::default(),
        );
        assert_eq!(
            settings.endpoint(Service::Volume),
            Some("http://cinder:8776/v3/p1")
        );
        assert_eq!(settings.backend, Backend::Network);
        assert_eq!(settings.timeout, Some(Duration::from_secs(30)));
        assert!(settings.verify);
    }

    #[test]
    fn test_merge_without_network_uses_compute() {
        let file: CloudsFile = serde_yaml::from_str(TWO_CLOUDS).unwrap();
        let settings = Settings::merge(file.select(Some("legacy")).unwrap(), &CloudArgs::default());
        assert_eq!(settings.backend, Backend::Compute);
        assert!(!settings.verify);
    }

    #[test]
    fn test_flags_override_file() {
        let file: CloudsFile = serde_yaml::from_str(TWO_CLOUDS).unwrap();
        let args = CloudArgs {
            token: Some("flag-token".into()),
            network_endpoint: Some("http://other:9696".into()),
            network_backend: Some(NetworkBackend::Compute),
            ..CloudArgs::default()
        };
        let settings = Settings::merge(file.select(Some("devstack")).unwrap(), &args);
        assert_eq!(settings.token.as_deref(), Some("flag-token"));
        assert_eq!(
            settings.endpoint(Service::Network),
            Some("http://other:9696")
        );
        assert_eq!(settings.backend, Backend::Compute);
    }

    #[test]
    fn test_load_explicit_file() {
        let file = write_config(TWO_CLOUDS);
        let args = CloudArgs {
            config: Some(file.path().to_path_buf()),
            cloud: Some("devstack".into()),
            ..CloudArgs::default()
        };
        let settings = Settings::load(&args).unwrap();
        assert_eq!(settings.token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(find_config(Some(&missing)).is_err());
    }

    #[test]
    fn test_malformed_file_names_path() {
        let file = write_config("clouds: [unclosed");
        let message = CloudsFile::load(file.path()).unwrap_err().to_string();
        assert!(message.starts_with("Failed to parse cloud configuration"));
    }
}
