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

//! Library lifecycle entry points.

use std::ffi::c_uint;

use tracing::debug;

use crate::engine::engine;
use crate::error::to_return;
use crate::ffi::{nvmlReturn_t, NVML_INIT_FLAG_NO_ATTACH, NVML_INIT_FLAG_NO_GPUS};

use super::helpers::ffi_guard;

/// `nvmlInit_v2` is what modern clients bind; the unversioned name stays
/// exported for binaries linked against pre-v2 headers.
#[no_mangle]
pub unsafe extern "C" fn nvmlInit_v2() -> nvmlReturn_t {
    ffi_guard("nvmlInit_v2", || to_return(engine().init()))
}

#[no_mangle]
pub unsafe extern "C" fn nvmlInit() -> nvmlReturn_t {
    ffi_guard("nvmlInit", || to_return(engine().init()))
}

/// nvidia-smi also resolves an explicit `_v1` spelling; every revision
/// behaves the same here.
#[no_mangle]
pub unsafe extern "C" fn nvmlInit_v1() -> nvmlReturn_t {
    unsafe { nvmlInit_v2() }
}

/// Flags tune attach behavior on real hardware; with virtual devices there
/// is nothing to attach, so they are accepted and logged.
#[no_mangle]
pub unsafe extern "C" fn nvmlInitWithFlags(flags: c_uint) -> nvmlReturn_t {
    ffi_guard("nvmlInitWithFlags", || {
        if flags & (NVML_INIT_FLAG_NO_GPUS | NVML_INIT_FLAG_NO_ATTACH) != 0 {
            debug!(flags, "init flags accepted but not differentiated");
        }
        to_return(engine().init())
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlShutdown() -> nvmlReturn_t {
    ffi_guard("nvmlShutdown", || to_return(engine().shutdown()))
}
