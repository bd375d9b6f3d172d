// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration resolution.
//!
//! Source precedence, first match wins:
//!
//! 1. Explicit path in `MOCK_NVML_CONFIG`.
//! 2. Auto-discovery from the library's own mapping in `/proc/self/maps`
//!    (Linux only): the `.so` lives at `<root>/usr/lib64/`, the config at
//!    `<root>/config/config.yaml`.
//! 3. Scalar overrides `MOCK_NVML_NUM_DEVICES` / `MOCK_NVML_DRIVER_VERSION`.
//! 4. Hard defaults (8-device A100 fleet).
//!
//! A file that fails to read, parse, or validate logs a warning and falls
//! through to (3)/(4); a malformed optional config must never block
//! library load. The resolved result is cached process-wide, keyed by the
//! source path, until [`clear_cache`] runs.

use std::collections::HashSet;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use tracing::{debug, warn};

use crate::config::types::FleetConfig;
use crate::device::profile::MAX_DEVICES;
use crate::error::ConfigError;

/// Explicit configuration file path.
pub const ENV_CONFIG_PATH: &str = "MOCK_NVML_CONFIG";
/// Device-count scalar override, used when no file is loaded.
pub const ENV_NUM_DEVICES: &str = "MOCK_NVML_NUM_DEVICES";
/// Driver-version scalar override, used when no file is loaded.
pub const ENV_DRIVER_VERSION: &str = "MOCK_NVML_DRIVER_VERSION";

/// Default device count when nothing configures one (DGX A100 behavior).
pub const DEFAULT_NUM_DEVICES: usize = 8;
/// Default driver version; must match what the deployed tooling reports.
pub const DEFAULT_DRIVER_VERSION: &str = "550.163.01";
/// Default NVML library version string.
pub const DEFAULT_NVML_VERSION: &str = "12.550.163.01";
/// Default CUDA driver version in NVML integer encoding (12.4 -> 12040).
pub const DEFAULT_CUDA_DRIVER_VERSION: i32 = 12040;

/// Outcome of the precedence chain: the scalars every session needs plus
/// the parsed fleet document when one was loaded.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub num_devices: usize,
    pub driver_version: String,
    pub nvml_version: String,
    pub cuda_driver_version: i32,
    pub fleet: Option<FleetConfig>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            num_devices: DEFAULT_NUM_DEVICES,
            driver_version: DEFAULT_DRIVER_VERSION.to_string(),
            nvml_version: DEFAULT_NVML_VERSION.to_string(),
            cuda_driver_version: DEFAULT_CUDA_DRIVER_VERSION,
            fleet: None,
        }
    }
}

static CACHE: Lazy<Mutex<Option<(String, Arc<ResolvedConfig>)>>> = Lazy::new(|| Mutex::new(None));

/// Clears the cached configuration so the next [`load`] re-resolves it.
/// Needed for test isolation and for picking up a config swapped between
/// sessions.
pub fn clear_cache() {
    let mut cache = CACHE.lock().unwrap_or_else(|e| e.into_inner());
    *cache = None;
}

/// Resolves the configuration through the precedence chain, returning the
/// cached result when the source path is unchanged.
pub fn load() -> Arc<ResolvedConfig> {
    let config_path = match std::env::var(ENV_CONFIG_PATH) {
        Ok(path) if !path.is_empty() => path,
        _ => discover_config_path()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };

    let mut cache = CACHE.lock().unwrap_or_else(|e| e.into_inner());
    if let Some((cached_path, cached)) = cache.as_ref() {
        if *cached_path == config_path {
            return Arc::clone(cached);
        }
    }

    let mut config = ResolvedConfig::default();

    if !config_path.is_empty() {
        match load_fleet_file(Path::new(&config_path)) {
            Ok(fleet) => {
                apply_fleet(&mut config, fleet);
                debug!(
                    num_devices = config.num_devices,
                    driver_version = %config.driver_version,
                    path = %config_path,
                    "loaded fleet config"
                );
                let shared = Arc::new(config);
                *cache = Some((config_path, Arc::clone(&shared)));
                return shared;
            }
            Err(e) => {
                // Visible warning: the user pointed us at this file (or laid
                // out a discoverable tree), so silent fallback would hide a
                // broken deployment.
                warn!(path = %config_path, error = %e, "failed to load fleet config, falling back to defaults");
            }
        }
    }

    apply_env_overrides(&mut config);
    debug!(
        num_devices = config.num_devices,
        driver_version = %config.driver_version,
        "using env/default config"
    );

    let shared = Arc::new(config);
    *cache = Some((config_path, Arc::clone(&shared)));
    shared
}

fn apply_fleet(config: &mut ResolvedConfig, fleet: FleetConfig) {
    if !fleet.system.driver_version.is_empty() {
        config.driver_version = fleet.system.driver_version.clone();
    }
    if !fleet.system.nvml_version.is_empty() {
        config.nvml_version = fleet.system.nvml_version.clone();
    }
    if fleet.system.cuda_version_major > 0 {
        // Saturate rather than wrap: an absurd configured version must not
        // turn into a random negative encoding.
        let encoded = fleet
            .system
            .cuda_version_major
            .saturating_mul(1000)
            .saturating_add(fleet.system.cuda_version_minor.saturating_mul(10));
        config.cuda_driver_version = encoded.clamp(0, i32::MAX as i64) as i32;
    }

    config.num_devices = if fleet.devices.is_empty() {
        DEFAULT_NUM_DEVICES
    } else {
        fleet.devices.len()
    };
    // system.num_devices overrides the list length; the fleet is capped or
    // extended against the overrides when devices are materialized.
    if fleet.system.num_devices > 0 {
        config.num_devices = fleet.system.num_devices as usize;
    }
    if config.num_devices > MAX_DEVICES {
        warn!(
            requested = config.num_devices,
            cap = MAX_DEVICES,
            "device count exceeds arena bound, capping"
        );
        config.num_devices = MAX_DEVICES;
    }
    if config.num_devices != fleet.devices.len() && !fleet.devices.is_empty() {
        debug!(
            count = config.num_devices,
            listed = fleet.devices.len(),
            "explicit device count differs from override list length"
        );
    }

    config.fleet = Some(fleet);
}

fn apply_env_overrides(config: &mut ResolvedConfig) {
    if let Ok(raw) = std::env::var(ENV_NUM_DEVICES) {
        match raw.parse::<usize>() {
            Ok(n) if n <= MAX_DEVICES => config.num_devices = n,
            Ok(n) => {
                warn!(requested = n, cap = MAX_DEVICES, "device count exceeds arena bound, capping");
                config.num_devices = MAX_DEVICES;
            }
            Err(_) => debug!(value = %raw, "ignoring unparsable device count override"),
        }
    }
    if let Ok(ver) = std::env::var(ENV_DRIVER_VERSION) {
        if !ver.is_empty() {
            config.driver_version = ver;
        }
    }
}

/// Locates the config file relative to wherever the dynamic loader mapped
/// this library. Expected layout:
///
/// ```text
/// .so at:     <root>/usr/lib64/libnvidia-ml.so.<version>
/// config at:  <root>/config/config.yaml
/// ```
///
/// Returns `None` when discovery is not possible (non-Linux, not mapped
/// under the expected name, no config file present).
fn discover_config_path() -> Option<PathBuf> {
    if !cfg!(target_os = "linux") {
        return None;
    }

    let maps = fs::File::open("/proc/self/maps").ok()?;
    for line in BufReader::new(maps).lines() {
        let Ok(line) = line else { break };
        if !line.contains("libnvidia-ml.so") {
            continue;
        }
        // maps format: addr-addr perms offset dev inode   pathname
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 6 {
            continue;
        }
        let so_path = fields[fields.len() - 1];
        if !so_path.starts_with('/') {
            continue;
        }
        let lib_dir = Path::new(so_path).parent()?;
        let root = lib_dir.parent()?.parent()?;
        let candidate = root.join("config").join("config.yaml");
        if candidate.is_file() {
            debug!(path = %candidate.display(), "auto-discovered fleet config");
            return Some(candidate);
        }
    }
    None
}

/// Reads, parses, and validates a fleet document.
pub fn load_fleet_file(path: &Path) -> Result<FleetConfig, ConfigError> {
    let data = fs::read_to_string(path)?;
    let fleet: FleetConfig = serde_yaml_ng::from_str(&data)?;
    validate(&fleet)?;
    Ok(fleet)
}

fn validate(fleet: &FleetConfig) -> Result<(), ConfigError> {
    if fleet.version.is_empty() {
        return Err(ConfigError::Validation("config version is required".into()));
    }
    if fleet.system.driver_version.is_empty() {
        return Err(ConfigError::Validation(
            "system.driver_version is required".into(),
        ));
    }
    let mut seen = HashSet::new();
    for dev in &fleet.devices {
        if !seen.insert(dev.index) {
            return Err(ConfigError::Validation(format!(
                "duplicate device index: {}",
                dev.index
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::env_lock;
    use std::io::Write;

    fn clear_loader_env() {
        std::env::remove_var(ENV_CONFIG_PATH);
        std::env::remove_var(ENV_NUM_DEVICES);
        std::env::remove_var(ENV_DRIVER_VERSION);
    }

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn defaults_without_any_source() {
        let _guard = env_lock();
        clear_loader_env();
        clear_cache();

        let config = load();
        assert_eq!(config.num_devices, 8);
        assert_eq!(config.driver_version, "550.163.01");
        assert!(config.fleet.is_none());
    }

    #[test]
    fn env_scalar_overrides() {
        let _guard = env_lock();
        clear_loader_env();

        for (value, expected) in [("4", 4), ("0", 0), ("abc", 8), ("-1", 8), ("99", 8)] {
            clear_cache();
            std::env::set_var(ENV_NUM_DEVICES, value);
            let config = load();
            assert_eq!(config.num_devices, expected, "value {value:?}");
        }

        clear_cache();
        std::env::remove_var(ENV_NUM_DEVICES);
        std::env::set_var(ENV_DRIVER_VERSION, "535.129.03");
        let config = load();
        assert_eq!(config.driver_version, "535.129.03");
        clear_loader_env();
        clear_cache();
    }

    #[test]
    fn explicit_count_beats_list_length() {
        let _guard = env_lock();
        clear_loader_env();
        clear_cache();

        let file = write_config(
            r#"
version: v1
system:
  driver_version: "550.163.01"
  num_devices: 4
devices:
  - index: 0
    uuid: GPU-aaaa
  - index: 1
    uuid: GPU-bbbb
"#,
        );
        std::env::set_var(ENV_CONFIG_PATH, file.path());
        let config = load();
        assert_eq!(config.num_devices, 4);
        clear_loader_env();
        clear_cache();
    }

    #[test]
    fn list_length_used_without_explicit_count() {
        let _guard = env_lock();
        clear_loader_env();
        clear_cache();

        let file = write_config(
            r#"
version: v1
system:
  driver_version: "550.163.01"
devices:
  - index: 0
    uuid: GPU-aaaa
  - index: 1
    uuid: GPU-bbbb
  - index: 2
    uuid: GPU-cccc
"#,
        );
        std::env::set_var(ENV_CONFIG_PATH, file.path());
        let config = load();
        assert_eq!(config.num_devices, 3);
        assert_eq!(config.driver_version, "550.163.01");
        clear_loader_env();
        clear_cache();
    }

    #[test]
    fn malformed_file_degrades_to_env_and_defaults() {
        let _guard = env_lock();
        clear_loader_env();
        clear_cache();

        let file = write_config("version: [not, a, mapping");
        std::env::set_var(ENV_CONFIG_PATH, file.path());
        std::env::set_var(ENV_NUM_DEVICES, "2");
        let config = load();
        assert_eq!(config.num_devices, 2);
        assert!(config.fleet.is_none());
        clear_loader_env();
        clear_cache();
    }

    #[test]
    fn cuda_version_encoding_saturates() {
        let _guard = env_lock();
        clear_loader_env();

        for (major, minor, expected) in [
            ("12", "4", 12040),
            ("9223372036854775807", "9223372036854775807", i32::MAX),
            ("1", "-9223372036854775807", 0),
        ] {
            clear_cache();
            let file = write_config(&format!(
                r#"
version: v1
system:
  driver_version: "550.163.01"
  cuda_version_major: {major}
  cuda_version_minor: {minor}
devices:
  - index: 0
    uuid: GPU-aaaa
"#
            ));
            std::env::set_var(ENV_CONFIG_PATH, file.path());
            let config = load();
            assert_eq!(config.cuda_driver_version, expected, "major {major}");
        }
        clear_loader_env();
        clear_cache();
    }

    #[test]
    fn validation_rejects_duplicate_indices() {
        let _guard = env_lock();
        clear_loader_env();
        clear_cache();

        let file = write_config(
            r#"
version: v1
system:
  driver_version: "550.163.01"
devices:
  - index: 0
    uuid: GPU-aaaa
  - index: 0
    uuid: GPU-bbbb
"#,
        );
        let err = load_fleet_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("duplicate device index"));
    }

    #[test]
    fn missing_driver_version_rejected() {
        let file = write_config("version: v1\n");
        let err = load_fleet_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("driver_version"));
    }

    #[test]
    fn cache_returns_same_instance_until_cleared() {
        let _guard = env_lock();
        clear_loader_env();
        clear_cache();

        let first = load();
        let second = load();
        assert!(Arc::ptr_eq(&first, &second));

        clear_cache();
        let third = load();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn path_change_invalidates_cache() {
        let _guard = env_lock();
        clear_loader_env();
        clear_cache();

        let first = load();
        assert_eq!(first.num_devices, 8);

        let file = write_config(
            r#"
version: v1
system:
  driver_version: "551.00.01"
devices:
  - index: 0
    uuid: GPU-aaaa
"#,
        );
        std::env::set_var(ENV_CONFIG_PATH, file.path());
        let second = load();
        assert_eq!(second.num_devices, 1);
        assert_eq!(second.driver_version, "551.00.01");
        clear_loader_env();
        clear_cache();
    }
}
