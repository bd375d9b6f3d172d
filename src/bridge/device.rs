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

//! Device enumeration, handle lookup, and identity queries.

use std::ffi::{c_char, c_int, c_uint, CStr};

use crate::engine::engine;
use crate::error::{to_return, DeviceError};
use crate::ffi::{
    nvmlBrandType_t, nvmlDeviceArchitecture_t, nvmlDevice_t, nvmlEnableState_t, nvmlReturn_t,
};

use super::helpers::{copy_str, ffi_guard, write_out};

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetCount_v2(device_count: *mut c_uint) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetCount_v2", || {
        to_return(
            engine()
                .device_count()
                .and_then(|n| unsafe { write_out(device_count, n) }),
        )
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetCount(device_count: *mut c_uint) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetCount", || {
        to_return(
            engine()
                .device_count()
                .and_then(|n| unsafe { write_out(device_count, n) }),
        )
    })
}

/// `_v1` aliases stay exported for clients that resolve the oldest
/// spellings; all revisions share one behavior.
#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetCount_v1(device_count: *mut c_uint) -> nvmlReturn_t {
    unsafe { nvmlDeviceGetCount_v2(device_count) }
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetHandleByIndex_v2(
    index: c_uint,
    device: *mut nvmlDevice_t,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetHandleByIndex_v2", || {
        to_return(
            engine()
                .device_handle_by_index(index)
                .and_then(|handle| unsafe { write_out(device, handle) }),
        )
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetHandleByIndex(
    index: c_uint,
    device: *mut nvmlDevice_t,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetHandleByIndex", || {
        to_return(
            engine()
                .device_handle_by_index(index)
                .and_then(|handle| unsafe { write_out(device, handle) }),
        )
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetHandleByIndex_v1(
    index: c_uint,
    device: *mut nvmlDevice_t,
) -> nvmlReturn_t {
    unsafe { nvmlDeviceGetHandleByIndex_v2(index, device) }
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetHandleByUUID(
    uuid: *const c_char,
    device: *mut nvmlDevice_t,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetHandleByUUID", || {
        to_return(unsafe { handle_by_c_string(uuid, device, LookupKind::Uuid) })
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetHandleByPciBusId_v2(
    pci_bus_id: *const c_char,
    device: *mut nvmlDevice_t,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetHandleByPciBusId_v2", || {
        to_return(unsafe { handle_by_c_string(pci_bus_id, device, LookupKind::PciBusId) })
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetHandleByPciBusId(
    pci_bus_id: *const c_char,
    device: *mut nvmlDevice_t,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetHandleByPciBusId", || {
        to_return(unsafe { handle_by_c_string(pci_bus_id, device, LookupKind::PciBusId) })
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetHandleByPciBusId_v1(
    pci_bus_id: *const c_char,
    device: *mut nvmlDevice_t,
) -> nvmlReturn_t {
    unsafe { nvmlDeviceGetHandleByPciBusId_v2(pci_bus_id, device) }
}

enum LookupKind {
    Uuid,
    PciBusId,
}

unsafe fn handle_by_c_string(
    key: *const c_char,
    device: *mut nvmlDevice_t,
    kind: LookupKind,
) -> crate::error::DeviceResult<()> {
    if key.is_null() {
        return Err(DeviceError::InvalidArgument);
    }
    let key = unsafe { CStr::from_ptr(key) }
        .to_str()
        .map_err(|_| DeviceError::InvalidArgument)?;
    let handle = match kind {
        LookupKind::Uuid => engine().device_handle_by_uuid(key)?,
        LookupKind::PciBusId => engine().device_handle_by_pci_bus_id(key)?,
    };
    unsafe { write_out(device, handle) }
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetName(
    device: nvmlDevice_t,
    name: *mut c_char,
    length: c_uint,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetName", || {
        to_return(engine().with_device(device, |d| unsafe { copy_str(d.name(), name, length) }))
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetUUID(
    device: nvmlDevice_t,
    uuid: *mut c_char,
    length: c_uint,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetUUID", || {
        to_return(engine().with_device(device, |d| unsafe { copy_str(d.uuid(), uuid, length) }))
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetSerial(
    device: nvmlDevice_t,
    serial: *mut c_char,
    length: c_uint,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetSerial", || {
        to_return(
            engine().with_device(device, |d| unsafe { copy_str(d.serial(), serial, length) }),
        )
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetBoardPartNumber(
    device: nvmlDevice_t,
    part_number: *mut c_char,
    length: c_uint,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetBoardPartNumber", || {
        to_return(engine().with_device(device, |d| unsafe {
            copy_str(d.board_part_number(), part_number, length)
        }))
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetVbiosVersion(
    device: nvmlDevice_t,
    version: *mut c_char,
    length: c_uint,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetVbiosVersion", || {
        to_return(engine().with_device(device, |d| unsafe {
            copy_str(d.vbios_version(), version, length)
        }))
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetBrand(
    device: nvmlDevice_t,
    brand_type: *mut nvmlBrandType_t,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetBrand", || {
        to_return(
            engine().with_device(device, |d| unsafe { write_out(brand_type, d.brand()) }),
        )
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetArchitecture(
    device: nvmlDevice_t,
    arch: *mut nvmlDeviceArchitecture_t,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetArchitecture", || {
        to_return(
            engine().with_device(device, |d| unsafe { write_out(arch, d.architecture()) }),
        )
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetCudaComputeCapability(
    device: nvmlDevice_t,
    major: *mut c_int,
    minor: *mut c_int,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetCudaComputeCapability", || {
        to_return(engine().with_device(device, |d| {
            let (capability_major, capability_minor) = d.cuda_compute_capability();
            unsafe {
                write_out(major, capability_major)?;
                write_out(minor, capability_minor)
            }
        }))
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetIndex(
    device: nvmlDevice_t,
    index: *mut c_uint,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetIndex", || {
        to_return(engine().with_device(device, |d| unsafe { write_out(index, d.index()) }))
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetMinorNumber(
    device: nvmlDevice_t,
    minor_number: *mut c_uint,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetMinorNumber", || {
        to_return(
            engine()
                .with_device(device, |d| unsafe { write_out(minor_number, d.minor_number()) }),
        )
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetNvLinkState(
    device: nvmlDevice_t,
    link: c_uint,
    is_active: *mut nvmlEnableState_t,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetNvLinkState", || {
        to_return(engine().with_device(device, |d| {
            let active = d.nvlink_state(link)?;
            unsafe { write_out(is_active, nvmlEnableState_t::from(active)) }
        }))
    })
}
