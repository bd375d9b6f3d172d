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

//! Shared plumbing for the exported entry points: panic containment,
//! C string buffer fills, the error-string cache, and logging setup.

use std::collections::HashMap;
use std::ffi::{c_char, c_uint, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Mutex, Once};

use once_cell::sync::Lazy;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use crate::error::{return_string, DeviceError, DeviceResult};
use crate::ffi::{nvmlReturn_t, NVML_ERROR_NOT_SUPPORTED, NVML_ERROR_UNKNOWN};

/// Enables stderr logging from the library when set to a non-empty value.
pub const ENV_DEBUG: &str = "MOCK_NVML_DEBUG";
/// Makes unimplemented entry points report NVML_ERROR_UNKNOWN with a logged
/// panic instead of a quiet NVML_ERROR_NOT_SUPPORTED.
pub const ENV_STRICT: &str = "MOCK_NVML_STRICT";

static TRACING_INIT: Once = Once::new();

/// Installs the stderr subscriber on first entry. The host process owns its
/// stdio, so the library stays silent unless MOCK_NVML_DEBUG is set;
/// RUST_LOG narrows the filter when present.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        if !env_flag(ENV_DEBUG) {
            return;
        }
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

fn env_flag(name: &str) -> bool {
    std::env::var_os(name).is_some_and(|v| !v.is_empty())
}

pub(crate) fn strict_mode() -> bool {
    env_flag(ENV_STRICT)
}

/// Runs one entry point body with panics contained. A panic crossing the
/// C boundary would abort the host process, so anything that unwinds is
/// reported as NVML_ERROR_UNKNOWN instead.
pub fn ffi_guard<F>(symbol: &'static str, body: F) -> nvmlReturn_t
where
    F: FnOnce() -> nvmlReturn_t,
{
    init_tracing();
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(code) => {
            debug!(symbol, code, "entry point served");
            code
        }
        Err(panic) => {
            error!(symbol, message = panic_message(panic.as_ref()), "entry point panicked");
            NVML_ERROR_UNKNOWN
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// The shared body of every generated entry point: NOT_SUPPORTED quietly,
/// or a contained panic when MOCK_NVML_STRICT is set.
pub fn unimplemented_symbol(symbol: &'static str) -> nvmlReturn_t {
    ffi_guard(symbol, || {
        if strict_mode() {
            panic!("entry point not implemented: {symbol}");
        }
        debug!(symbol, "unimplemented entry point");
        NVML_ERROR_NOT_SUPPORTED
    })
}

/// Copies `value` into a caller buffer of `length` bytes as a NUL
/// terminated C string. The buffer is left untouched when it cannot hold
/// the value and its terminator.
///
/// # Safety
/// `buffer` must be valid for writes of `length` bytes when non-null.
pub unsafe fn copy_str(value: &str, buffer: *mut c_char, length: c_uint) -> DeviceResult<()> {
    if buffer.is_null() {
        return Err(DeviceError::InvalidArgument);
    }
    let bytes = value.as_bytes();
    if bytes.len() + 1 > length as usize {
        return Err(DeviceError::InsufficientSize);
    }
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr().cast::<c_char>(), buffer, bytes.len());
        *buffer.add(bytes.len()) = 0;
    }
    Ok(())
}

/// Fills a fixed-size char array struct field, truncating to keep the NUL.
pub fn fill_char_array(value: &str, dest: &mut [c_char]) {
    for slot in dest.iter_mut() {
        *slot = 0;
    }
    let n = value.len().min(dest.len().saturating_sub(1));
    for (slot, byte) in dest.iter_mut().zip(value.as_bytes()[..n].iter()) {
        *slot = *byte as c_char;
    }
}

/// Null-checked scalar write through an out pointer.
///
/// # Safety
/// `ptr` must be valid for a write of `T` when non-null.
pub unsafe fn write_out<T>(ptr: *mut T, value: T) -> DeviceResult<()> {
    if ptr.is_null() {
        return Err(DeviceError::InvalidArgument);
    }
    unsafe { ptr.write(value) };
    Ok(())
}

static ERROR_STRINGS: Lazy<Mutex<HashMap<nvmlReturn_t, CString>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Stable C string for a return code. Entries live for the life of the
/// process, matching the static strings the real library hands out, so a
/// caller may hold the pointer across shutdown.
pub fn error_cstring(code: nvmlReturn_t) -> *const c_char {
    let mut cache = ERROR_STRINGS.lock().unwrap_or_else(|e| e.into_inner());
    cache
        .entry(code)
        .or_insert_with(|| CString::new(return_string(code)).unwrap_or_default())
        .as_ptr()
}
