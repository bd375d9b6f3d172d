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

//! Device profile resolution.
//!
//! A [`DeviceProfile`] is the fully-merged, no-options record one virtual
//! device is built from: template defaults overlaid with the per-device
//! override, every remaining gap filled from the stock A100 profile.
//! Missing devices (explicit count larger than the override list) are
//! synthesized from the template with formulaic identities.

use tracing::warn;

use crate::config::types::{DeviceConfig, DeviceOverride, PciConfig};
use crate::config::ResolvedConfig;
use crate::ffi::{
    nvmlBrandType_t, nvmlDeviceArchitecture_t, nvmlPstates_t, NVML_BRAND_GEFORCE,
    NVML_BRAND_GEFORCE_RTX, NVML_BRAND_GRID, NVML_BRAND_NVIDIA, NVML_BRAND_NVIDIA_RTX,
    NVML_BRAND_NVS, NVML_BRAND_QUADRO, NVML_BRAND_QUADRO_RTX, NVML_BRAND_TESLA, NVML_BRAND_TITAN,
    NVML_BRAND_TITAN_RTX, NVML_BRAND_UNKNOWN, NVML_DEVICE_ARCH_ADA, NVML_DEVICE_ARCH_AMPERE,
    NVML_DEVICE_ARCH_HOPPER, NVML_DEVICE_ARCH_KEPLER, NVML_DEVICE_ARCH_MAXWELL,
    NVML_DEVICE_ARCH_PASCAL, NVML_DEVICE_ARCH_TURING, NVML_DEVICE_ARCH_UNKNOWN,
    NVML_DEVICE_ARCH_VOLTA, NVML_PSTATE_UNKNOWN,
};

/// Maximum number of devices the handle arena supports (DGX A100 sizing).
pub const MAX_DEVICES: usize = 8;

// Stock A100-SXM4-40GB profile, served when nothing configures a field.
pub const DEFAULT_DEVICE_NAME: &str = "NVIDIA A100-SXM4-40GB";
pub const DEFAULT_MEMORY_TOTAL_BYTES: u64 = 42_949_672_960; // 40 GiB
pub const DEFAULT_BAR1_SIZE_MB: u64 = 256;
pub const DEFAULT_TEMPERATURE_C: u32 = 30;
pub const DEFAULT_POWER_DRAW_MW: u32 = 250_000;
pub const DEFAULT_POWER_LIMIT_MW: u32 = 400_000;
pub const DEFAULT_GRAPHICS_CLOCK_MHZ: u32 = 1410;
pub const DEFAULT_SM_CLOCK_MHZ: u32 = 1410;
pub const DEFAULT_MEMORY_CLOCK_MHZ: u32 = 1215;
pub const DEFAULT_VIDEO_CLOCK_MHZ: u32 = 1290;
pub const DEFAULT_CUDA_CAPABILITY: (u32, u32) = (8, 0);
pub const DEFAULT_PCI_DEVICE_ID: u32 = 0x20B0_10DE;
pub const DEFAULT_PCI_SUBSYSTEM_ID: u32 = 0x1347_10DE;
pub const DEFAULT_VBIOS_VERSION: &str = "92.00.45.00.03";
pub const DEFAULT_BOARD_PART_NUMBER: &str = "692-2G506-0200-003";
pub const DEFAULT_NVLINK_LINKS: u32 = 12;

/// One resolved process entry for the running-process queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub used_gpu_memory: u64,
    pub gpu_instance_id: u32,
    pub compute_instance_id: u32,
}

/// Fully-resolved state for one virtual device. Immutable after build.
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    pub index: usize,
    pub uuid: String,
    pub minor_number: u32,
    pub name: String,
    pub serial: String,
    pub board_part_number: String,
    pub vbios_version: String,
    pub brand: nvmlBrandType_t,
    pub architecture: nvmlDeviceArchitecture_t,
    pub cuda_major: u32,
    pub cuda_minor: u32,

    pub pci_bus_id: String,
    pub pci_device_id: u32,
    pub pci_subsystem_id: u32,

    pub memory_total: u64,
    pub memory_reserved: u64,
    pub memory_free: u64,
    pub memory_used: u64,
    pub bar1_total: u64,
    pub bar1_free: u64,
    pub bar1_used: u64,

    pub temperature_c: u32,
    pub power_draw_mw: u32,
    pub power_limit_mw: u32,
    pub clock_graphics_mhz: u32,
    pub clock_sm_mhz: u32,
    pub clock_memory_mhz: u32,
    pub clock_video_mhz: u32,
    pub max_clock_graphics_mhz: u32,
    pub max_clock_sm_mhz: u32,
    pub max_clock_memory_mhz: u32,
    pub max_clock_video_mhz: u32,
    pub performance_state: nvmlPstates_t,
    pub utilization_gpu: u32,
    pub utilization_memory: u32,
    pub fan_count: u32,
    pub fan_speed_percent: u32,

    /// `Some((current, pending))` only when the config enables MIG.
    pub mig_mode: Option<(u32, u32)>,
    pub max_mig_count: u32,
    pub nvlink_links: u32,
    /// Per-link active flags, `nvlink_links` long.
    pub nvlink_active: Vec<bool>,

    pub compute_processes: Vec<ProcessEntry>,
    pub graphics_processes: Vec<ProcessEntry>,
}

/// Synthesized PCI bus id for device `index` (matches the fallback fleet
/// generator's numbering: bus 0x81 upward, one device per bus).
pub fn default_pci_bus_id(index: usize) -> String {
    format!("0000:{:02x}:00.0", 0x81 + index)
}

/// Synthesized UUID for device `index`.
pub fn default_uuid(index: usize) -> String {
    let n = index + 1;
    format!("GPU-{n:08}-{n:04}-{n:04}-{n:04}-{n:012}")
}

/// Synthesized serial number for device `index`.
pub fn default_serial(index: usize) -> String {
    format!("0321225000{index:03}")
}

/// Materializes the device list for a resolved configuration: exactly
/// `config.num_devices` profiles, overrides applied by index, the rest
/// synthesized from the template.
pub fn build_profiles(config: &ResolvedConfig) -> Vec<DeviceProfile> {
    let template = config
        .fleet
        .as_ref()
        .map(|f| f.device_defaults.clone())
        .unwrap_or_default();
    let nvlink = config.fleet.as_ref().and_then(|f| f.nvlink.as_ref());

    (0..config.num_devices)
        .map(|index| {
            let override_entry = config
                .fleet
                .as_ref()
                .and_then(|f| f.devices.iter().find(|d| d.index == index));
            let merged = match override_entry {
                Some(entry) => merge_device_config(&template, &entry.config),
                None => template.clone(),
            };
            resolve_profile(index, &merged, override_entry, nvlink)
        })
        .collect()
}

/// Overlays non-empty override fields onto the template. Whole sub-blocks
/// replace the template's, except PCI which merges field-wise so an
/// override can set just a bus id.
fn merge_device_config(base: &DeviceConfig, over: &DeviceConfig) -> DeviceConfig {
    let mut merged = base.clone();

    if !over.name.is_empty() {
        merged.name = over.name.clone();
    }
    if !over.brand.is_empty() {
        merged.brand = over.brand.clone();
    }
    if !over.serial.is_empty() {
        merged.serial = over.serial.clone();
    }
    if !over.board_part_number.is_empty() {
        merged.board_part_number = over.board_part_number.clone();
    }
    if !over.vbios_version.is_empty() {
        merged.vbios_version = over.vbios_version.clone();
    }
    if !over.architecture.is_empty() {
        merged.architecture = over.architecture.clone();
    }
    if !over.performance_state.is_empty() {
        merged.performance_state = over.performance_state.clone();
    }
    if over.compute_capability.is_some() {
        merged.compute_capability = over.compute_capability;
    }
    if over.memory.is_some() {
        merged.memory = over.memory;
    }
    if over.bar1_memory.is_some() {
        merged.bar1_memory = over.bar1_memory;
    }
    if let Some(over_pci) = &over.pci {
        let mut pci = merged.pci.clone().unwrap_or_default();
        if !over_pci.bus_id.is_empty() {
            pci.bus_id = over_pci.bus_id.clone();
        }
        if over_pci.device_id != 0 {
            pci.device_id = over_pci.device_id;
        }
        if over_pci.subsystem_id != 0 {
            pci.subsystem_id = over_pci.subsystem_id;
        }
        merged.pci = Some(pci);
    }
    if over.power.is_some() {
        merged.power = over.power;
    }
    if over.thermal.is_some() {
        merged.thermal = over.thermal;
    }
    if over.fan.is_some() {
        merged.fan = over.fan;
    }
    if over.clocks.is_some() {
        merged.clocks = over.clocks;
    }
    if over.utilization.is_some() {
        merged.utilization = over.utilization;
    }
    if over.mig.is_some() {
        merged.mig = over.mig.clone();
    }
    if !over.processes.is_empty() {
        merged.processes = over.processes.clone();
    }

    merged
}

fn resolve_profile(
    index: usize,
    merged: &DeviceConfig,
    override_entry: Option<&DeviceOverride>,
    nvlink: Option<&crate::config::types::NvlinkConfig>,
) -> DeviceProfile {
    let uuid = override_entry
        .map(|o| o.uuid.clone())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| default_uuid(index));
    let minor_number = override_entry
        .and_then(|o| o.minor_number)
        .unwrap_or(index as u32);

    let pci = merged.pci.clone().unwrap_or_else(PciConfig::default);
    let pci_bus_id = if pci.bus_id.is_empty() {
        default_pci_bus_id(index)
    } else {
        pci.bus_id
    };

    let memory = merged.memory.unwrap_or_default();
    let memory_total = if memory.total_bytes > 0 {
        memory.total_bytes
    } else {
        DEFAULT_MEMORY_TOTAL_BYTES
    };
    let memory_used = memory.used_bytes;
    let memory_reserved = memory.reserved_bytes;
    let memory_free = if memory.free_bytes > 0 {
        memory.free_bytes
    } else {
        memory_total.saturating_sub(memory_used + memory_reserved)
    };

    let bar1 = merged.bar1_memory.unwrap_or_default();
    let bar1_total = if bar1.total_bytes > 0 {
        bar1.total_bytes
    } else {
        DEFAULT_BAR1_SIZE_MB * 1024 * 1024
    };
    let bar1_used = bar1.used_bytes;
    let bar1_free = if bar1.free_bytes > 0 {
        bar1.free_bytes
    } else {
        bar1_total.saturating_sub(bar1_used)
    };

    let power = merged.power.unwrap_or_default();
    let power_draw_mw = if power.current_draw_mw > 0 {
        power.current_draw_mw
    } else {
        DEFAULT_POWER_DRAW_MW
    };
    let power_limit_mw = if power.enforced_limit_mw > 0 {
        power.enforced_limit_mw
    } else if power.default_limit_mw > 0 {
        power.default_limit_mw
    } else {
        DEFAULT_POWER_LIMIT_MW
    };

    let thermal = merged.thermal.unwrap_or_default();
    let temperature_c = if thermal.temperature_gpu_c > 0 {
        thermal.temperature_gpu_c
    } else {
        DEFAULT_TEMPERATURE_C
    };

    let clocks = merged.clocks.unwrap_or_default();
    let pick = |value: u32, fallback: u32| if value > 0 { value } else { fallback };
    let clock_graphics_mhz = pick(clocks.graphics_current, DEFAULT_GRAPHICS_CLOCK_MHZ);
    let clock_sm_mhz = pick(clocks.sm_current, DEFAULT_SM_CLOCK_MHZ);
    let clock_memory_mhz = pick(clocks.memory_current, DEFAULT_MEMORY_CLOCK_MHZ);
    let clock_video_mhz = pick(clocks.video_current, DEFAULT_VIDEO_CLOCK_MHZ);

    let capability = merged.compute_capability.map(|c| (c.major, c.minor));
    let (cuda_major, cuda_minor) = capability.unwrap_or(DEFAULT_CUDA_CAPABILITY);

    let fan = merged.fan.unwrap_or_default();

    let mig_mode = merged.mig.as_ref().and_then(|m| {
        if m.mode_current.is_empty() {
            None
        } else {
            Some((
                mig_mode_value(&m.mode_current),
                mig_mode_value(if m.mode_pending.is_empty() {
                    &m.mode_current
                } else {
                    &m.mode_pending
                }),
            ))
        }
    });
    let max_mig_count = merged.mig.as_ref().map(|m| m.max_gpu_instances).unwrap_or(0);

    let nvlink_links = nvlink
        .map(|n| n.links_per_gpu)
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_NVLINK_LINKS);
    let mut nvlink_active = vec![true; nvlink_links as usize];
    if let Some(n) = nvlink {
        for link in &n.links {
            if let Some(slot) = nvlink_active.get_mut(link.link as usize) {
                *slot = !link.state.eq_ignore_ascii_case("inactive");
            }
        }
    }

    let mut compute_processes = Vec::new();
    let mut graphics_processes = Vec::new();
    for proc in &merged.processes {
        let entry = ProcessEntry {
            pid: proc.pid,
            used_gpu_memory: proc.used_memory_mib.saturating_mul(1024 * 1024),
            // Not running under MIG: real drivers report the instance ids
            // as 0xFFFFFFFF.
            gpu_instance_id: u32::MAX,
            compute_instance_id: u32::MAX,
        };
        match proc.kind.as_str() {
            "G" | "g" => graphics_processes.push(entry),
            "C+G" | "c+g" => {
                compute_processes.push(entry);
                graphics_processes.push(entry);
            }
            _ => compute_processes.push(entry),
        }
    }

    DeviceProfile {
        index,
        uuid,
        minor_number,
        name: non_empty_or(&merged.name, DEFAULT_DEVICE_NAME),
        serial: if merged.serial.is_empty() {
            default_serial(index)
        } else {
            merged.serial.clone()
        },
        board_part_number: non_empty_or(&merged.board_part_number, DEFAULT_BOARD_PART_NUMBER),
        vbios_version: non_empty_or(&merged.vbios_version, DEFAULT_VBIOS_VERSION),
        brand: brand_from_label(&merged.brand),
        architecture: architecture_from_label(&merged.architecture),
        cuda_major,
        cuda_minor,
        pci_bus_id,
        pci_device_id: pick(pci.device_id, DEFAULT_PCI_DEVICE_ID),
        pci_subsystem_id: pick(pci.subsystem_id, DEFAULT_PCI_SUBSYSTEM_ID),
        memory_total,
        memory_reserved,
        memory_free,
        memory_used,
        bar1_total,
        bar1_free,
        bar1_used,
        temperature_c,
        power_draw_mw,
        power_limit_mw,
        clock_graphics_mhz,
        clock_sm_mhz,
        clock_memory_mhz,
        clock_video_mhz,
        max_clock_graphics_mhz: pick(clocks.graphics_max, clock_graphics_mhz),
        max_clock_sm_mhz: pick(clocks.sm_max, clock_sm_mhz),
        max_clock_memory_mhz: pick(clocks.memory_max, clock_memory_mhz),
        max_clock_video_mhz: pick(clocks.video_max, clock_video_mhz),
        performance_state: pstate_from_label(&merged.performance_state),
        utilization_gpu: merged.utilization.map(|u| u.gpu).unwrap_or(0),
        utilization_memory: merged.utilization.map(|u| u.memory).unwrap_or(0),
        fan_count: fan.count,
        fan_speed_percent: fan.speed_percent.unwrap_or(0),
        mig_mode,
        max_mig_count,
        nvlink_links,
        nvlink_active,
        compute_processes,
        graphics_processes,
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

fn mig_mode_value(label: &str) -> u32 {
    u32::from(label.eq_ignore_ascii_case("enabled"))
}

fn brand_from_label(label: &str) -> nvmlBrandType_t {
    match label.to_ascii_lowercase().as_str() {
        "" | "nvidia" => NVML_BRAND_NVIDIA,
        "quadro" => NVML_BRAND_QUADRO,
        "tesla" => NVML_BRAND_TESLA,
        "nvs" => NVML_BRAND_NVS,
        "grid" => NVML_BRAND_GRID,
        "geforce" => NVML_BRAND_GEFORCE,
        "titan" => NVML_BRAND_TITAN,
        "quadro_rtx" => NVML_BRAND_QUADRO_RTX,
        "nvidia_rtx" => NVML_BRAND_NVIDIA_RTX,
        "geforce_rtx" => NVML_BRAND_GEFORCE_RTX,
        "titan_rtx" => NVML_BRAND_TITAN_RTX,
        other => {
            warn!(brand = other, "unknown brand label in config");
            NVML_BRAND_UNKNOWN
        }
    }
}

fn architecture_from_label(label: &str) -> nvmlDeviceArchitecture_t {
    match label.to_ascii_lowercase().as_str() {
        "" | "ampere" => NVML_DEVICE_ARCH_AMPERE,
        "kepler" => NVML_DEVICE_ARCH_KEPLER,
        "maxwell" => NVML_DEVICE_ARCH_MAXWELL,
        "pascal" => NVML_DEVICE_ARCH_PASCAL,
        "volta" => NVML_DEVICE_ARCH_VOLTA,
        "turing" => NVML_DEVICE_ARCH_TURING,
        "ada" | "ada_lovelace" => NVML_DEVICE_ARCH_ADA,
        "hopper" => NVML_DEVICE_ARCH_HOPPER,
        other => {
            warn!(architecture = other, "unknown architecture label in config");
            NVML_DEVICE_ARCH_UNKNOWN
        }
    }
}

fn pstate_from_label(label: &str) -> nvmlPstates_t {
    if label.is_empty() {
        return 0;
    }
    label
        .trim_start_matches(['P', 'p'])
        .parse::<u32>()
        .ok()
        .filter(|&p| p <= 15)
        .unwrap_or(NVML_PSTATE_UNKNOWN)
}
