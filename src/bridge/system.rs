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

//! System-level queries: version strings and error-code rendering.

use std::ffi::{c_char, c_int, c_uint};
use std::panic::catch_unwind;

use crate::engine::engine;
use crate::error::to_return;
use crate::ffi::nvmlReturn_t;

use super::helpers::{copy_str, error_cstring, ffi_guard, write_out};

#[no_mangle]
pub unsafe extern "C" fn nvmlSystemGetDriverVersion(
    version: *mut c_char,
    length: c_uint,
) -> nvmlReturn_t {
    ffi_guard("nvmlSystemGetDriverVersion", || {
        to_return(
            engine()
                .driver_version()
                .and_then(|v| unsafe { copy_str(&v, version, length) }),
        )
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlSystemGetNVMLVersion(
    version: *mut c_char,
    length: c_uint,
) -> nvmlReturn_t {
    ffi_guard("nvmlSystemGetNVMLVersion", || {
        to_return(
            engine()
                .nvml_version()
                .and_then(|v| unsafe { copy_str(&v, version, length) }),
        )
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlSystemGetCudaDriverVersion(
    cuda_driver_version: *mut c_int,
) -> nvmlReturn_t {
    ffi_guard("nvmlSystemGetCudaDriverVersion", || {
        to_return(
            engine()
                .cuda_driver_version()
                .and_then(|v| unsafe { write_out(cuda_driver_version, v) }),
        )
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlSystemGetCudaDriverVersion_v2(
    cuda_driver_version: *mut c_int,
) -> nvmlReturn_t {
    ffi_guard("nvmlSystemGetCudaDriverVersion_v2", || {
        to_return(
            engine()
                .cuda_driver_version()
                .and_then(|v| unsafe { write_out(cuda_driver_version, v) }),
        )
    })
}

/// Returns a static rendering of `result`. Never null, valid for the life
/// of the process, usable before init and after shutdown.
#[no_mangle]
pub unsafe extern "C" fn nvmlErrorString(result: nvmlReturn_t) -> *const c_char {
    static FALLBACK: &[u8] = b"Unknown Error\0";
    match catch_unwind(|| error_cstring(result)) {
        Ok(text) => text,
        Err(_) => FALLBACK.as_ptr().cast(),
    }
}
