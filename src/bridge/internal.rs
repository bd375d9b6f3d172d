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

//! The undocumented export-table escape hatch.
//!
//! CUDA runtimes resolve `nvmlInternalGetExportTable` with a well-known
//! GUID and index into the returned function table instead of calling the
//! public symbols. The mock serves one table: slot 0 carries the size
//! marker the loader checks, every other slot points at a single service
//! routine that answers the handle-by-index selector and acknowledges the
//! rest.

use std::ffi::c_void;

use once_cell::sync::Lazy;
use tracing::debug;

use crate::engine::engine;
use crate::error::to_return;
use crate::ffi::{
    nvmlDevice_t, nvmlReturn_t, NVML_ERROR_INVALID_ARGUMENT, NVML_ERROR_NOT_SUPPORTED,
    NVML_SUCCESS,
};

use super::helpers::{ffi_guard, write_out};

/// Byte layout of the GUID "6c3efec4-8fc9-4e6c-a327-ee696e12f7c4": the
/// first three groups are little-endian, the rest big-endian, per the
/// Microsoft GUID convention the driver uses.
const EXPORT_TABLE_GUID: [u8; 16] = [
    0xc4, 0xfe, 0x3e, 0x6c, 0xc9, 0x8f, 0x6c, 0x4e, 0xa3, 0x27, 0xee, 0x69, 0x6e, 0x12, 0xf7,
    0xc4,
];

const EXPORT_TABLE_SLOTS: usize = 256;

/// Size marker loaders read from slot 0 before indexing further.
const EXPORT_TABLE_SIZE_MARKER: usize = 0x1000;

/// Selector observed for handle-by-index lookups through the table.
const SELECTOR_HANDLE_BY_INDEX: u64 = 0x22;

type InternalFn = unsafe extern "C" fn(u64, u64, u64, u64) -> nvmlReturn_t;

#[repr(C)]
struct ExportTable {
    entries: [*const c_void; EXPORT_TABLE_SLOTS],
}

// The table is built once and only ever read afterwards.
unsafe impl Sync for ExportTable {}
unsafe impl Send for ExportTable {}

static EXPORT_TABLE: Lazy<ExportTable> = Lazy::new(|| {
    let service: InternalFn = internal_service;
    let mut entries = [service as *const c_void; EXPORT_TABLE_SLOTS];
    entries[0] = EXPORT_TABLE_SIZE_MARKER as *const c_void;
    ExportTable { entries }
});

/// Services every populated table slot. Argument meaning depends on the
/// slot the caller resolved; the only selector seen in practice maps an
/// index to a device handle, and anything else is acknowledged so the
/// caller proceeds down its public-API path.
unsafe extern "C" fn internal_service(
    arg0: u64,
    arg1: u64,
    arg2: u64,
    _arg3: u64,
) -> nvmlReturn_t {
    ffi_guard("nvmlInternalExportTableCall", || {
        if arg2 == SELECTOR_HANDLE_BY_INDEX && arg0 < 32 {
            let out = arg1 as *mut nvmlDevice_t;
            return to_return(
                engine()
                    .device_handle_by_index(arg0 as u32)
                    .and_then(|handle| unsafe { write_out(out, handle) }),
            );
        }
        debug!(arg0, arg2, "unrecognized export table call acknowledged");
        NVML_SUCCESS
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlInternalGetExportTable(
    pp_export_table: *mut *const c_void,
    p_export_table_id: *const u8,
) -> nvmlReturn_t {
    ffi_guard("nvmlInternalGetExportTable", || {
        if pp_export_table.is_null() || p_export_table_id.is_null() {
            return NVML_ERROR_INVALID_ARGUMENT;
        }
        let guid = unsafe { std::slice::from_raw_parts(p_export_table_id, 16) };
        if guid != EXPORT_TABLE_GUID {
            debug!(?guid, "unknown export table GUID");
            return NVML_ERROR_NOT_SUPPORTED;
        }
        unsafe { *pp_export_table = EXPORT_TABLE.entries.as_ptr().cast() };
        NVML_SUCCESS
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_guid_returns_table() {
        let mut table: *const c_void = std::ptr::null();
        let code = unsafe {
            nvmlInternalGetExportTable(&mut table, EXPORT_TABLE_GUID.as_ptr())
        };
        assert_eq!(code, NVML_SUCCESS);
        assert!(!table.is_null());

        let entries = table as *const *const c_void;
        unsafe {
            assert_eq!(*entries as usize, EXPORT_TABLE_SIZE_MARKER);
            assert!(!(*entries.add(1)).is_null());
            assert_eq!(*entries.add(1), *entries.add(255));
        }
    }

    #[test]
    fn unknown_guid_or_null_rejected() {
        let mut table: *const c_void = std::ptr::null();
        let bogus = [0u8; 16];
        let code = unsafe { nvmlInternalGetExportTable(&mut table, bogus.as_ptr()) };
        assert_eq!(code, NVML_ERROR_NOT_SUPPORTED);

        let code = unsafe {
            nvmlInternalGetExportTable(std::ptr::null_mut(), EXPORT_TABLE_GUID.as_ptr())
        };
        assert_eq!(code, NVML_ERROR_INVALID_ARGUMENT);
        let code = unsafe { nvmlInternalGetExportTable(&mut table, std::ptr::null()) };
        assert_eq!(code, NVML_ERROR_INVALID_ARGUMENT);
    }
}
