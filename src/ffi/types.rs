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

//! Raw NVML ABI definitions: return codes, enum values, buffer sizes, and
//! the `#[repr(C)]` structs callers pass across the boundary.
//!
//! These must match the real `nvml.h` exactly. Names keep NVML's C spelling
//! so the exported surface reads like the header it mimics.

#![allow(non_camel_case_types, non_snake_case, non_upper_case_globals)]

use std::ffi::{c_char, c_int, c_uint, c_ulonglong, c_void};

// ===========================================================================
// Opaque handle types
// ===========================================================================

/// Opaque device handle. The value is a table token, never a real address.
pub type nvmlDevice_t = *mut c_void;

/// Opaque event-set handle. Event monitoring is not supported by the mock.
pub type nvmlEventSet_t = *mut c_void;

// ===========================================================================
// Return codes (nvmlReturn_t)
// ===========================================================================

pub type nvmlReturn_t = c_int;

pub const NVML_SUCCESS: nvmlReturn_t = 0;
pub const NVML_ERROR_UNINITIALIZED: nvmlReturn_t = 1;
pub const NVML_ERROR_INVALID_ARGUMENT: nvmlReturn_t = 2;
pub const NVML_ERROR_NOT_SUPPORTED: nvmlReturn_t = 3;
pub const NVML_ERROR_NO_PERMISSION: nvmlReturn_t = 4;
pub const NVML_ERROR_ALREADY_INITIALIZED: nvmlReturn_t = 5;
pub const NVML_ERROR_NOT_FOUND: nvmlReturn_t = 6;
pub const NVML_ERROR_INSUFFICIENT_SIZE: nvmlReturn_t = 7;
pub const NVML_ERROR_INSUFFICIENT_POWER: nvmlReturn_t = 8;
pub const NVML_ERROR_DRIVER_NOT_LOADED: nvmlReturn_t = 9;
pub const NVML_ERROR_TIMEOUT: nvmlReturn_t = 10;
pub const NVML_ERROR_IRQ_ISSUE: nvmlReturn_t = 11;
pub const NVML_ERROR_LIBRARY_NOT_FOUND: nvmlReturn_t = 12;
pub const NVML_ERROR_FUNCTION_NOT_FOUND: nvmlReturn_t = 13;
pub const NVML_ERROR_CORRUPTED_INFOROM: nvmlReturn_t = 14;
pub const NVML_ERROR_GPU_IS_LOST: nvmlReturn_t = 15;
pub const NVML_ERROR_RESET_REQUIRED: nvmlReturn_t = 16;
pub const NVML_ERROR_OPERATING_SYSTEM: nvmlReturn_t = 17;
pub const NVML_ERROR_LIB_RM_VERSION_MISMATCH: nvmlReturn_t = 18;
pub const NVML_ERROR_IN_USE: nvmlReturn_t = 19;
pub const NVML_ERROR_MEMORY: nvmlReturn_t = 20;
pub const NVML_ERROR_NO_DATA: nvmlReturn_t = 21;
pub const NVML_ERROR_VGPU_ECC_NOT_SUPPORTED: nvmlReturn_t = 22;
pub const NVML_ERROR_INSUFFICIENT_RESOURCES: nvmlReturn_t = 23;
pub const NVML_ERROR_FREQ_NOT_SUPPORTED: nvmlReturn_t = 24;
pub const NVML_ERROR_ARGUMENT_VERSION_MISMATCH: nvmlReturn_t = 25;
pub const NVML_ERROR_DEPRECATED: nvmlReturn_t = 26;
pub const NVML_ERROR_NOT_READY: nvmlReturn_t = 27;
pub const NVML_ERROR_GPU_NOT_FOUND: nvmlReturn_t = 28;
pub const NVML_ERROR_INVALID_STATE: nvmlReturn_t = 29;
pub const NVML_ERROR_UNKNOWN: nvmlReturn_t = 999;

// ===========================================================================
// Enum typedefs
// ===========================================================================

pub type nvmlBrandType_t = c_uint;

pub const NVML_BRAND_UNKNOWN: nvmlBrandType_t = 0;
pub const NVML_BRAND_QUADRO: nvmlBrandType_t = 1;
pub const NVML_BRAND_TESLA: nvmlBrandType_t = 2;
pub const NVML_BRAND_NVS: nvmlBrandType_t = 3;
pub const NVML_BRAND_GRID: nvmlBrandType_t = 4;
pub const NVML_BRAND_GEFORCE: nvmlBrandType_t = 5;
pub const NVML_BRAND_TITAN: nvmlBrandType_t = 6;
pub const NVML_BRAND_NVIDIA_VAPPS: nvmlBrandType_t = 7;
pub const NVML_BRAND_NVIDIA_VPC: nvmlBrandType_t = 8;
pub const NVML_BRAND_NVIDIA_VCS: nvmlBrandType_t = 9;
pub const NVML_BRAND_NVIDIA_VWS: nvmlBrandType_t = 10;
pub const NVML_BRAND_NVIDIA_CLOUD_GAMING: nvmlBrandType_t = 11;
pub const NVML_BRAND_QUADRO_RTX: nvmlBrandType_t = 12;
pub const NVML_BRAND_NVIDIA_RTX: nvmlBrandType_t = 13;
pub const NVML_BRAND_NVIDIA: nvmlBrandType_t = 14;
pub const NVML_BRAND_GEFORCE_RTX: nvmlBrandType_t = 15;
pub const NVML_BRAND_TITAN_RTX: nvmlBrandType_t = 16;

pub type nvmlDeviceArchitecture_t = c_uint;

pub const NVML_DEVICE_ARCH_KEPLER: nvmlDeviceArchitecture_t = 2;
pub const NVML_DEVICE_ARCH_MAXWELL: nvmlDeviceArchitecture_t = 3;
pub const NVML_DEVICE_ARCH_PASCAL: nvmlDeviceArchitecture_t = 4;
pub const NVML_DEVICE_ARCH_VOLTA: nvmlDeviceArchitecture_t = 5;
pub const NVML_DEVICE_ARCH_TURING: nvmlDeviceArchitecture_t = 6;
pub const NVML_DEVICE_ARCH_AMPERE: nvmlDeviceArchitecture_t = 7;
pub const NVML_DEVICE_ARCH_ADA: nvmlDeviceArchitecture_t = 8;
pub const NVML_DEVICE_ARCH_HOPPER: nvmlDeviceArchitecture_t = 9;
pub const NVML_DEVICE_ARCH_UNKNOWN: nvmlDeviceArchitecture_t = 0xffffffff;

pub type nvmlTemperatureSensors_t = c_uint;

pub const NVML_TEMPERATURE_GPU: nvmlTemperatureSensors_t = 0;

pub type nvmlClockType_t = c_uint;

pub const NVML_CLOCK_GRAPHICS: nvmlClockType_t = 0;
pub const NVML_CLOCK_SM: nvmlClockType_t = 1;
pub const NVML_CLOCK_MEM: nvmlClockType_t = 2;
pub const NVML_CLOCK_VIDEO: nvmlClockType_t = 3;

pub type nvmlClockId_t = c_uint;

pub const NVML_CLOCK_ID_CURRENT: nvmlClockId_t = 0;
pub const NVML_CLOCK_ID_APP_CLOCK_TARGET: nvmlClockId_t = 1;
pub const NVML_CLOCK_ID_APP_CLOCK_DEFAULT: nvmlClockId_t = 2;
pub const NVML_CLOCK_ID_CUSTOMER_BOOST_MAX: nvmlClockId_t = 3;

pub type nvmlPstates_t = c_uint;

pub const NVML_PSTATE_0: nvmlPstates_t = 0;
pub const NVML_PSTATE_15: nvmlPstates_t = 15;
pub const NVML_PSTATE_UNKNOWN: nvmlPstates_t = 32;

pub type nvmlEnableState_t = c_uint;

pub const NVML_FEATURE_DISABLED: nvmlEnableState_t = 0;
pub const NVML_FEATURE_ENABLED: nvmlEnableState_t = 1;

// Flags accepted by nvmlInitWithFlags.
pub const NVML_INIT_FLAG_NO_GPUS: c_uint = 1;
pub const NVML_INIT_FLAG_NO_ATTACH: c_uint = 2;

// ===========================================================================
// Buffer size constants
// ===========================================================================

pub const NVML_DEVICE_NAME_BUFFER_SIZE: usize = 64;
pub const NVML_DEVICE_NAME_V2_BUFFER_SIZE: usize = 96;
pub const NVML_DEVICE_UUID_BUFFER_SIZE: usize = 80;
pub const NVML_DEVICE_UUID_V2_BUFFER_SIZE: usize = 96;
pub const NVML_DEVICE_SERIAL_BUFFER_SIZE: usize = 30;
pub const NVML_DEVICE_PART_NUMBER_BUFFER_SIZE: usize = 80;
pub const NVML_DEVICE_VBIOS_VERSION_BUFFER_SIZE: usize = 32;
pub const NVML_SYSTEM_DRIVER_VERSION_BUFFER_SIZE: usize = 80;
pub const NVML_SYSTEM_NVML_VERSION_BUFFER_SIZE: usize = 80;
pub const NVML_DEVICE_PCI_BUS_ID_BUFFER_SIZE: usize = 32;
pub const NVML_DEVICE_PCI_BUS_ID_LEGACY_FMT_SIZE: usize = 16;

// ===========================================================================
// ABI structs
// ===========================================================================

/// PCI information about a device.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct nvmlPciInfo_t {
    pub busIdLegacy: [c_char; NVML_DEVICE_PCI_BUS_ID_LEGACY_FMT_SIZE],
    pub domain: c_uint,
    pub bus: c_uint,
    pub device: c_uint,
    pub pciDeviceId: c_uint,
    pub pciSubSystemId: c_uint,
    pub busId: [c_char; NVML_DEVICE_PCI_BUS_ID_BUFFER_SIZE],
}

impl Default for nvmlPciInfo_t {
    fn default() -> Self {
        Self {
            busIdLegacy: [0; NVML_DEVICE_PCI_BUS_ID_LEGACY_FMT_SIZE],
            domain: 0,
            bus: 0,
            device: 0,
            pciDeviceId: 0,
            pciSubSystemId: 0,
            busId: [0; NVML_DEVICE_PCI_BUS_ID_BUFFER_SIZE],
        }
    }
}

/// Memory information (v1 layout).
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct nvmlMemory_t {
    pub total: c_ulonglong,
    pub free: c_ulonglong,
    pub used: c_ulonglong,
}

/// Memory information (v2 layout). The leading `version` field is set by
/// the caller; the mock fills the remaining fields without validating it.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct nvmlMemory_v2_t {
    pub version: c_uint,
    pub total: c_ulonglong,
    pub reserved: c_ulonglong,
    pub free: c_ulonglong,
    pub used: c_ulonglong,
}

/// Version tag callers place in `nvmlMemory_v2_t::version`.
pub const nvmlMemory_v2: c_uint = (std::mem::size_of::<nvmlMemory_v2_t>() as c_uint) | (2 << 24);

/// BAR1 aperture information.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct nvmlBAR1Memory_t {
    pub bar1Total: c_ulonglong,
    pub bar1Free: c_ulonglong,
    pub bar1Used: c_ulonglong,
}

/// Per-process accounting entry for the running-process queries.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct nvmlProcessInfo_t {
    pub pid: c_uint,
    pub usedGpuMemory: c_ulonglong,
    pub gpuInstanceId: c_uint,
    pub computeInstanceId: c_uint,
}

/// GPU/memory duty-cycle percentages.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct nvmlUtilization_t {
    pub gpu: c_uint,
    pub memory: c_uint,
}
