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

//! Typed schema for the fleet configuration document.
//!
//! The document has a `system` block, a `device_defaults` template, and a
//! `devices` list of per-device overrides whose fields are flattened into
//! the same shape as the template. Unknown keys are ignored so larger fleet
//! descriptions (written for external tooling) still load here.

use serde::Deserialize;

/// Top-level fleet description.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    pub version: String,
    pub system: SystemConfig,
    pub device_defaults: DeviceConfig,
    pub devices: Vec<DeviceOverride>,
    pub nvlink: Option<NvlinkConfig>,
}

/// System-wide settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub driver_version: String,
    pub nvml_version: String,
    pub cuda_version: String,
    pub cuda_version_major: i64,
    pub cuda_version_minor: i64,
    /// Explicit device count. When > 0 it overrides the length of the
    /// `devices` list (deployment tooling injects this so the library knows
    /// the desired GPU count without consumers setting env vars).
    pub num_devices: i64,
}

/// Full per-device configuration, used both as the `device_defaults`
/// template and (flattened) inside each override.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub name: String,
    pub brand: String,
    pub serial: String,
    pub board_part_number: String,
    pub vbios_version: String,
    pub architecture: String,
    pub compute_capability: Option<ComputeCapabilityConfig>,
    pub memory: Option<MemoryConfig>,
    pub bar1_memory: Option<Bar1MemoryConfig>,
    pub pci: Option<PciConfig>,
    pub power: Option<PowerConfig>,
    pub thermal: Option<ThermalConfig>,
    pub fan: Option<FanConfig>,
    pub clocks: Option<ClocksConfig>,
    pub performance_state: String,
    pub utilization: Option<UtilizationConfig>,
    pub mig: Option<MigConfig>,
    pub processes: Vec<ProcessConfig>,
}

/// Per-device override: identity plus any subset of the template fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeviceOverride {
    pub index: usize,
    pub uuid: String,
    pub minor_number: Option<u32>,
    #[serde(flatten)]
    pub config: DeviceConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct ComputeCapabilityConfig {
    pub major: u32,
    pub minor: u32,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub total_bytes: u64,
    pub reserved_bytes: u64,
    pub free_bytes: u64, // 0 = derive as total - used
    pub used_bytes: u64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct Bar1MemoryConfig {
    pub total_bytes: u64,
    pub free_bytes: u64, // 0 = derive as total - used
    pub used_bytes: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PciConfig {
    pub device_id: u32,    // combined device/vendor id, e.g. 0x20B010DE
    pub subsystem_id: u32, // e.g. 0x134710DE
    pub bus_id: String,    // "dddd:bb:dd.f"
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct PowerConfig {
    pub default_limit_mw: u32,
    pub enforced_limit_mw: u32,
    pub min_limit_mw: u32,
    pub max_limit_mw: u32,
    pub current_draw_mw: u32,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct ThermalConfig {
    pub temperature_gpu_c: u32,
    pub shutdown_threshold_c: u32,
    pub slowdown_threshold_c: u32,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct FanConfig {
    pub count: u32, // 0 = passive board, fan queries unsupported
    pub speed_percent: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct ClocksConfig {
    pub graphics_current: u32,
    pub graphics_max: u32,
    pub sm_current: u32,
    pub sm_max: u32,
    pub memory_current: u32,
    pub memory_max: u32,
    pub video_current: u32,
    pub video_max: u32,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct UtilizationConfig {
    pub gpu: u32,
    pub memory: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MigConfig {
    pub mode_current: String, // "enabled"/"disabled"; empty = unsupported
    pub mode_pending: String,
    pub max_gpu_instances: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    pub pid: u32,
    #[serde(rename = "type")]
    pub kind: String, // "C" compute, "G" graphics
    pub name: String,
    pub used_memory_mib: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NvlinkConfig {
    pub version: u32,
    pub links_per_gpu: u32,
    pub bandwidth_per_link_gbps: u32,
    pub switch_support: bool,
    pub switch_count: u32,
    pub links: Vec<NvlinkLinkConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NvlinkLinkConfig {
    pub link: u32,
    pub state: String,
    pub remote_pci_bus_id: String,
}
