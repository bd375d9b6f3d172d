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

//! MIG entry points. Virtual devices default to non-MIG boards: mode
//! queries report NOT_SUPPORTED unless the config declares a mode, the
//! partition surface stays read-only, and instance enumeration is empty.

use std::ffi::{c_uint, c_void};

use crate::engine::engine;
use crate::error::to_return;
use crate::ffi::{nvmlDevice_t, nvmlReturn_t, NVML_ERROR_NOT_SUPPORTED};

use super::helpers::{ffi_guard, write_out};

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetMigMode(
    device: nvmlDevice_t,
    current_mode: *mut c_uint,
    pending_mode: *mut c_uint,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetMigMode", || {
        to_return(engine().with_device(device, |d| {
            let (current, pending) = d.mig_mode()?;
            unsafe {
                write_out(current_mode, current)?;
                write_out(pending_mode, pending)
            }
        }))
    })
}

/// Partitioning a virtual board is never supported, whatever the handle.
#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceSetMigMode(
    _device: nvmlDevice_t,
    _mode: c_uint,
    _activation_status: *mut nvmlReturn_t,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceSetMigMode", || NVML_ERROR_NOT_SUPPORTED)
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetGpuInstanceProfileInfo(
    _device: nvmlDevice_t,
    _profile: c_uint,
    _info: *mut c_void,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetGpuInstanceProfileInfo", || {
        NVML_ERROR_NOT_SUPPORTED
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetMaxMigDeviceCount(
    device: nvmlDevice_t,
    count: *mut c_uint,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetMaxMigDeviceCount", || {
        to_return(engine().with_device(device, |d| unsafe {
            write_out(count, d.max_mig_device_count())
        }))
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetGpuInstances(
    device: nvmlDevice_t,
    _profile_id: c_uint,
    _gpu_instances: *mut c_void,
    count: *mut c_uint,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetGpuInstances", || {
        to_return(engine().with_device(device, |_| unsafe { write_out(count, 0) }))
    })
}
