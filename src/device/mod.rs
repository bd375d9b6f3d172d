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

//! Virtual device model.
//!
//! [`Device`] wraps a resolved [`DeviceProfile`] behind the query surface the
//! FFI bridge calls into. All getters are pure reads of construction-time
//! state; a query returns the same value for the lifetime of the session.

pub mod profile;

use crate::error::{DeviceError, DeviceResult};
use crate::ffi::{
    nvmlBrandType_t, nvmlClockType_t, nvmlDeviceArchitecture_t, nvmlPstates_t,
    NVML_CLOCK_GRAPHICS, NVML_CLOCK_MEM, NVML_CLOCK_SM, NVML_CLOCK_VIDEO,
};

pub use profile::{build_profiles, DeviceProfile, ProcessEntry};

/// Aggregate framebuffer counters, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryInfo {
    pub total: u64,
    pub reserved: u64,
    pub free: u64,
    pub used: u64,
}

/// BAR1 aperture counters, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bar1MemoryInfo {
    pub total: u64,
    pub free: u64,
    pub used: u64,
}

/// Parsed PCI location plus the identifiers reported alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PciLocation {
    pub domain: u32,
    pub bus: u32,
    pub device: u32,
    pub pci_device_id: u32,
    pub pci_subsystem_id: u32,
    pub bus_id: String,
}

#[derive(Debug)]
pub struct Device {
    profile: DeviceProfile,
}

impl Device {
    pub fn new(profile: DeviceProfile) -> Self {
        Self { profile }
    }

    pub fn index(&self) -> u32 {
        self.profile.index as u32
    }

    pub fn minor_number(&self) -> u32 {
        self.profile.minor_number
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    pub fn uuid(&self) -> &str {
        &self.profile.uuid
    }

    pub fn serial(&self) -> &str {
        &self.profile.serial
    }

    pub fn board_part_number(&self) -> &str {
        &self.profile.board_part_number
    }

    pub fn vbios_version(&self) -> &str {
        &self.profile.vbios_version
    }

    pub fn brand(&self) -> nvmlBrandType_t {
        self.profile.brand
    }

    pub fn architecture(&self) -> nvmlDeviceArchitecture_t {
        self.profile.architecture
    }

    pub fn cuda_compute_capability(&self) -> (i32, i32) {
        (self.profile.cuda_major as i32, self.profile.cuda_minor as i32)
    }

    pub fn pci_bus_id(&self) -> &str {
        &self.profile.pci_bus_id
    }

    /// Parses the configured `"dddd:bb:dd.f"` bus id into its components.
    /// A malformed bus id surfaces as [`DeviceError::Unknown`], matching how
    /// the real library reports internal inconsistency.
    pub fn pci_location(&self) -> DeviceResult<PciLocation> {
        let bus_id = &self.profile.pci_bus_id;
        let parse = || -> Option<(u32, u32, u32)> {
            let mut parts = bus_id.split(':');
            let domain = u32::from_str_radix(parts.next()?, 16).ok()?;
            let bus = u32::from_str_radix(parts.next()?, 16).ok()?;
            let rest = parts.next()?;
            if parts.next().is_some() {
                return None;
            }
            let device_field = rest.split('.').next()?;
            let device = u32::from_str_radix(device_field, 16).ok()?;
            Some((domain, bus, device))
        };
        let (domain, bus, device) = parse().ok_or(DeviceError::Unknown)?;
        Ok(PciLocation {
            domain,
            bus,
            device,
            pci_device_id: self.profile.pci_device_id,
            pci_subsystem_id: self.profile.pci_subsystem_id,
            bus_id: bus_id.clone(),
        })
    }

    pub fn memory_info(&self) -> MemoryInfo {
        MemoryInfo {
            total: self.profile.memory_total,
            reserved: self.profile.memory_reserved,
            free: self.profile.memory_free,
            used: self.profile.memory_used,
        }
    }

    pub fn bar1_memory_info(&self) -> Bar1MemoryInfo {
        Bar1MemoryInfo {
            total: self.profile.bar1_total,
            free: self.profile.bar1_free,
            used: self.profile.bar1_used,
        }
    }

    /// Single thermal sensor on the virtual board, so the sensor selector
    /// is accepted but not differentiated.
    pub fn temperature(&self) -> u32 {
        self.profile.temperature_c
    }

    /// Fan queries are unsupported on passive boards (`fan.count: 0`,
    /// the stock profile).
    pub fn fan_speed(&self) -> DeviceResult<u32> {
        if self.profile.fan_count == 0 {
            return Err(DeviceError::NotSupported);
        }
        Ok(self.profile.fan_speed_percent)
    }

    pub fn power_usage_mw(&self) -> u32 {
        self.profile.power_draw_mw
    }

    pub fn power_limit_mw(&self) -> u32 {
        self.profile.power_limit_mw
    }

    /// Current clock for a clock domain. Unrecognized domains read as zero
    /// rather than erroring, which is what permissive clients expect.
    pub fn clock_mhz(&self, clock_type: nvmlClockType_t) -> u32 {
        match clock_type {
            NVML_CLOCK_GRAPHICS => self.profile.clock_graphics_mhz,
            NVML_CLOCK_SM => self.profile.clock_sm_mhz,
            NVML_CLOCK_MEM => self.profile.clock_memory_mhz,
            NVML_CLOCK_VIDEO => self.profile.clock_video_mhz,
            _ => 0,
        }
    }

    pub fn max_clock_mhz(&self, clock_type: nvmlClockType_t) -> u32 {
        match clock_type {
            NVML_CLOCK_GRAPHICS => self.profile.max_clock_graphics_mhz,
            NVML_CLOCK_SM => self.profile.max_clock_sm_mhz,
            NVML_CLOCK_MEM => self.profile.max_clock_memory_mhz,
            NVML_CLOCK_VIDEO => self.profile.max_clock_video_mhz,
            _ => 0,
        }
    }

    pub fn performance_state(&self) -> nvmlPstates_t {
        self.profile.performance_state
    }

    pub fn utilization_rates(&self) -> (u32, u32) {
        (self.profile.utilization_gpu, self.profile.utilization_memory)
    }

    /// `(current, pending)` MIG mode, or NotSupported when MIG is absent
    /// from the device's configuration.
    pub fn mig_mode(&self) -> DeviceResult<(u32, u32)> {
        self.profile.mig_mode.ok_or(DeviceError::NotSupported)
    }

    pub fn max_mig_device_count(&self) -> u32 {
        self.profile.max_mig_count
    }

    pub fn nvlink_state(&self, link: u32) -> DeviceResult<bool> {
        if self.profile.nvlink_links == 0 {
            return Err(DeviceError::NotSupported);
        }
        self.profile
            .nvlink_active
            .get(link as usize)
            .copied()
            .ok_or(DeviceError::InvalidArgument)
    }

    pub fn compute_running_processes(&self) -> &[ProcessEntry] {
        &self.profile.compute_processes
    }

    pub fn graphics_running_processes(&self) -> &[ProcessEntry] {
        &self.profile.graphics_processes
    }
}
