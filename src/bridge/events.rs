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

//! Event entry points. Virtual devices emit no events; the whole surface
//! reports NOT_SUPPORTED so clients fall back to polling.

use std::ffi::{c_uint, c_ulonglong, c_void};

use crate::ffi::{nvmlDevice_t, nvmlEventSet_t, nvmlReturn_t, NVML_ERROR_NOT_SUPPORTED};

use super::helpers::ffi_guard;

#[no_mangle]
pub unsafe extern "C" fn nvmlEventSetCreate(_set: *mut nvmlEventSet_t) -> nvmlReturn_t {
    ffi_guard("nvmlEventSetCreate", || NVML_ERROR_NOT_SUPPORTED)
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceRegisterEvents(
    _device: nvmlDevice_t,
    _event_types: c_ulonglong,
    _set: nvmlEventSet_t,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceRegisterEvents", || NVML_ERROR_NOT_SUPPORTED)
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetSupportedEventTypes(
    _device: nvmlDevice_t,
    _event_types: *mut c_ulonglong,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetSupportedEventTypes", || {
        NVML_ERROR_NOT_SUPPORTED
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlEventSetWait_v2(
    _set: nvmlEventSet_t,
    _data: *mut c_void,
    _timeout_ms: c_uint,
) -> nvmlReturn_t {
    ffi_guard("nvmlEventSetWait_v2", || NVML_ERROR_NOT_SUPPORTED)
}

#[no_mangle]
pub unsafe extern "C" fn nvmlEventSetWait(
    _set: nvmlEventSet_t,
    _data: *mut c_void,
    _timeout_ms: c_uint,
) -> nvmlReturn_t {
    ffi_guard("nvmlEventSetWait", || NVML_ERROR_NOT_SUPPORTED)
}

#[no_mangle]
pub unsafe extern "C" fn nvmlEventSetFree(_set: nvmlEventSet_t) -> nvmlReturn_t {
    ffi_guard("nvmlEventSetFree", || NVML_ERROR_NOT_SUPPORTED)
}
