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

//! Framebuffer and BAR1 memory queries.

use crate::engine::engine;
use crate::error::{to_return, DeviceError};
use crate::ffi::{nvmlBAR1Memory_t, nvmlDevice_t, nvmlMemory_t, nvmlMemory_v2_t, nvmlReturn_t};

use super::helpers::{ffi_guard, write_out};

/// The v1 struct has no reserved field; reserved carveout is folded into
/// `used` so that `free + used == total` still holds.
#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetMemoryInfo(
    device: nvmlDevice_t,
    memory: *mut nvmlMemory_t,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetMemoryInfo", || {
        to_return(engine().with_device(device, |d| {
            let info = d.memory_info();
            unsafe {
                write_out(
                    memory,
                    nvmlMemory_t {
                        total: info.total,
                        free: info.free,
                        used: info.total.saturating_sub(info.free),
                    },
                )
            }
        }))
    })
}

/// Fills the v2 counters in place, leaving the caller's version tag as it
/// arrived.
#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetMemoryInfo_v2(
    device: nvmlDevice_t,
    memory: *mut nvmlMemory_v2_t,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetMemoryInfo_v2", || {
        to_return(engine().with_device(device, |d| {
            if memory.is_null() {
                return Err(DeviceError::InvalidArgument);
            }
            let info = d.memory_info();
            unsafe {
                let out = &mut *memory;
                out.total = info.total;
                out.reserved = info.reserved;
                out.free = info.free;
                out.used = info.used;
            }
            Ok(())
        }))
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetBAR1MemoryInfo(
    device: nvmlDevice_t,
    bar1_memory: *mut nvmlBAR1Memory_t,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetBAR1MemoryInfo", || {
        to_return(engine().with_device(device, |d| {
            let info = d.bar1_memory_info();
            unsafe {
                write_out(
                    bar1_memory,
                    nvmlBAR1Memory_t {
                        bar1Total: info.total,
                        bar1Free: info.free,
                        bar1Used: info.used,
                    },
                )
            }
        }))
    })
}
