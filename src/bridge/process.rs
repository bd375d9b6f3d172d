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

//! Running-process queries, all revisions sharing NVML's two-call pattern:
//! a null info array asks for the count, a too-small count reports
//! INSUFFICIENT_SIZE with the required count written back.

use std::ffi::c_uint;

use crate::device::ProcessEntry;
use crate::engine::engine;
use crate::error::{to_return, DeviceError, DeviceResult};
use crate::ffi::{nvmlDevice_t, nvmlProcessInfo_t, nvmlReturn_t};

use super::helpers::ffi_guard;

unsafe fn fill_processes(
    entries: &[ProcessEntry],
    info_count: *mut c_uint,
    infos: *mut nvmlProcessInfo_t,
) -> DeviceResult<()> {
    if info_count.is_null() {
        return Err(DeviceError::InvalidArgument);
    }
    let count = entries.len() as c_uint;
    if infos.is_null() {
        unsafe { info_count.write(count) };
        return Ok(());
    }
    let capacity = unsafe { info_count.read() };
    unsafe { info_count.write(count) };
    if capacity < count {
        return Err(DeviceError::InsufficientSize);
    }
    for (i, entry) in entries.iter().enumerate() {
        unsafe {
            infos.add(i).write(nvmlProcessInfo_t {
                pid: entry.pid,
                usedGpuMemory: entry.used_gpu_memory,
                gpuInstanceId: entry.gpu_instance_id,
                computeInstanceId: entry.compute_instance_id,
            });
        }
    }
    Ok(())
}

macro_rules! process_query {
    ($($symbol:ident => $getter:ident),* $(,)?) => {
        $(
            #[no_mangle]
            pub unsafe extern "C" fn $symbol(
                device: nvmlDevice_t,
                info_count: *mut c_uint,
                infos: *mut nvmlProcessInfo_t,
            ) -> nvmlReturn_t {
                ffi_guard(stringify!($symbol), || {
                    to_return(engine().with_device(device, |d| unsafe {
                        fill_processes(d.$getter(), info_count, infos)
                    }))
                })
            }
        )*
    };
}

process_query! {
    nvmlDeviceGetComputeRunningProcesses_v3 => compute_running_processes,
    nvmlDeviceGetComputeRunningProcesses_v2 => compute_running_processes,
    nvmlDeviceGetComputeRunningProcesses => compute_running_processes,
    nvmlDeviceGetGraphicsRunningProcesses_v3 => graphics_running_processes,
    nvmlDeviceGetGraphicsRunningProcesses_v2 => graphics_running_processes,
    nvmlDeviceGetGraphicsRunningProcesses => graphics_running_processes,
}
