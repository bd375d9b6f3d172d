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

//! Query-surface tests against the default fleet: identity strings,
//! counters, telemetry, process lists, and the export-table side door.

use std::ffi::{c_char, c_int, c_uint, c_void, CStr};
use std::ptr;
use std::sync::{Mutex, MutexGuard};

use mock_nvml::bridge::device::{
    nvmlDeviceGetArchitecture, nvmlDeviceGetBoardPartNumber, nvmlDeviceGetBrand,
    nvmlDeviceGetCudaComputeCapability, nvmlDeviceGetHandleByIndex_v2, nvmlDeviceGetIndex,
    nvmlDeviceGetMinorNumber, nvmlDeviceGetName, nvmlDeviceGetNvLinkState, nvmlDeviceGetSerial,
    nvmlDeviceGetUUID, nvmlDeviceGetVbiosVersion,
};
use mock_nvml::bridge::events::{nvmlEventSetCreate, nvmlEventSetFree, nvmlEventSetWait_v2};
use mock_nvml::bridge::helpers::ENV_STRICT;
use mock_nvml::bridge::init::{nvmlInit_v2, nvmlShutdown};
use mock_nvml::bridge::internal::nvmlInternalGetExportTable;
use mock_nvml::bridge::memory::{
    nvmlDeviceGetBAR1MemoryInfo, nvmlDeviceGetMemoryInfo, nvmlDeviceGetMemoryInfo_v2,
};
use mock_nvml::bridge::mig::{
    nvmlDeviceGetMaxMigDeviceCount, nvmlDeviceGetMigMode, nvmlDeviceSetMigMode,
};
use mock_nvml::bridge::pci::{nvmlDeviceGetPciInfo, nvmlDeviceGetPciInfo_v3};
use mock_nvml::bridge::process::{
    nvmlDeviceGetComputeRunningProcesses_v3, nvmlDeviceGetGraphicsRunningProcesses_v3,
};
use mock_nvml::bridge::stubs::{nvmlDeviceGetAccountingMode, nvmlSystemGetProcessName};
use mock_nvml::bridge::system::{
    nvmlSystemGetCudaDriverVersion, nvmlSystemGetCudaDriverVersion_v2, nvmlSystemGetDriverVersion,
    nvmlSystemGetNVMLVersion,
};
use mock_nvml::bridge::telemetry::{
    nvmlDeviceGetClockInfo, nvmlDeviceGetEnforcedPowerLimit, nvmlDeviceGetFanSpeed,
    nvmlDeviceGetMaxClockInfo, nvmlDeviceGetPerformanceState, nvmlDeviceGetPowerManagementLimit,
    nvmlDeviceGetPowerUsage, nvmlDeviceGetTemperature, nvmlDeviceGetUtilizationRates,
};
use mock_nvml::config::loader::{ENV_CONFIG_PATH, ENV_DRIVER_VERSION, ENV_NUM_DEVICES};
use mock_nvml::engine::engine;
use mock_nvml::ffi::{
    nvmlBAR1Memory_t, nvmlDevice_t, nvmlMemory_t, nvmlMemory_v2, nvmlMemory_v2_t, nvmlPciInfo_t,
    nvmlReturn_t, nvmlUtilization_t, NVML_BRAND_NVIDIA, NVML_CLOCK_GRAPHICS, NVML_CLOCK_MEM,
    NVML_CLOCK_SM, NVML_CLOCK_VIDEO, NVML_DEVICE_ARCH_AMPERE, NVML_DEVICE_NAME_BUFFER_SIZE,
    NVML_DEVICE_UUID_BUFFER_SIZE, NVML_ERROR_INSUFFICIENT_SIZE, NVML_ERROR_INVALID_ARGUMENT,
    NVML_ERROR_NOT_SUPPORTED, NVML_ERROR_UNKNOWN, NVML_FEATURE_ENABLED, NVML_PSTATE_0,
    NVML_SUCCESS, NVML_TEMPERATURE_GPU,
};

fn serial() -> MutexGuard<'static, ()> {
    static LOCK: Mutex<()> = Mutex::new(());
    let guard = LOCK.lock().unwrap_or_else(|e| e.into_inner());
    for var in [ENV_CONFIG_PATH, ENV_NUM_DEVICES, ENV_DRIVER_VERSION, ENV_STRICT] {
        std::env::remove_var(var);
    }
    engine().reset();
    guard
}

fn init_and_handle(index: c_uint) -> nvmlDevice_t {
    assert_eq!(unsafe { nvmlInit_v2() }, NVML_SUCCESS);
    let mut handle: nvmlDevice_t = ptr::null_mut();
    assert_eq!(
        unsafe { nvmlDeviceGetHandleByIndex_v2(index, &mut handle) },
        NVML_SUCCESS
    );
    handle
}

fn buf_str(buf: &[c_char]) -> String {
    unsafe { CStr::from_ptr(buf.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

#[test]
fn test_identity_strings_match_default_profile() {
    let _guard = serial();
    let handle = init_and_handle(1);

    let mut name = [0 as c_char; NVML_DEVICE_NAME_BUFFER_SIZE];
    assert_eq!(
        unsafe { nvmlDeviceGetName(handle, name.as_mut_ptr(), name.len() as c_uint) },
        NVML_SUCCESS
    );
    assert_eq!(buf_str(&name), "NVIDIA A100-SXM4-40GB");

    let mut uuid = [0 as c_char; NVML_DEVICE_UUID_BUFFER_SIZE];
    assert_eq!(
        unsafe { nvmlDeviceGetUUID(handle, uuid.as_mut_ptr(), uuid.len() as c_uint) },
        NVML_SUCCESS
    );
    assert_eq!(buf_str(&uuid), "GPU-00000002-0002-0002-0002-000000000002");

    let mut serial = [0 as c_char; 30];
    assert_eq!(
        unsafe { nvmlDeviceGetSerial(handle, serial.as_mut_ptr(), serial.len() as c_uint) },
        NVML_SUCCESS
    );
    assert_eq!(buf_str(&serial), "0321225000001");

    let mut vbios = [0 as c_char; 32];
    assert_eq!(
        unsafe { nvmlDeviceGetVbiosVersion(handle, vbios.as_mut_ptr(), vbios.len() as c_uint) },
        NVML_SUCCESS
    );
    assert_eq!(buf_str(&vbios), "92.00.45.00.03");

    let mut part = [0 as c_char; 80];
    assert_eq!(
        unsafe {
            nvmlDeviceGetBoardPartNumber(handle, part.as_mut_ptr(), part.len() as c_uint)
        },
        NVML_SUCCESS
    );
    assert_eq!(buf_str(&part), "692-2G506-0200-003");

    let mut minor: c_uint = 99;
    assert_eq!(
        unsafe { nvmlDeviceGetMinorNumber(handle, &mut minor) },
        NVML_SUCCESS
    );
    assert_eq!(minor, 1, "minor number tracks the index by default");

    assert_eq!(unsafe { nvmlShutdown() }, NVML_SUCCESS);
}

#[test]
fn test_short_buffer_reports_size_and_stays_untouched() {
    let _guard = serial();
    let handle = init_and_handle(0);

    // "NVIDIA A100-SXM4-40GB" needs 22 bytes with the terminator. One
    // byte short must fail without writing anything.
    let mut short = [0x2a as c_char; 21];
    assert_eq!(
        unsafe { nvmlDeviceGetName(handle, short.as_mut_ptr(), short.len() as c_uint) },
        NVML_ERROR_INSUFFICIENT_SIZE
    );
    assert!(
        short.iter().all(|&b| b == 0x2a as c_char),
        "failed copy must not partially fill the buffer"
    );

    let mut exact = [0x2a as c_char; 22];
    assert_eq!(
        unsafe { nvmlDeviceGetName(handle, exact.as_mut_ptr(), exact.len() as c_uint) },
        NVML_SUCCESS
    );
    assert_eq!(buf_str(&exact), "NVIDIA A100-SXM4-40GB");

    assert_eq!(
        unsafe { nvmlDeviceGetName(handle, ptr::null_mut(), 64) },
        NVML_ERROR_INVALID_ARGUMENT
    );

    assert_eq!(unsafe { nvmlShutdown() }, NVML_SUCCESS);
}

#[test]
fn test_brand_architecture_capability() {
    let _guard = serial();
    let handle = init_and_handle(0);

    let mut brand: c_uint = 0;
    assert_eq!(unsafe { nvmlDeviceGetBrand(handle, &mut brand) }, NVML_SUCCESS);
    assert_eq!(brand, NVML_BRAND_NVIDIA);

    let mut arch: c_uint = 0;
    assert_eq!(
        unsafe { nvmlDeviceGetArchitecture(handle, &mut arch) },
        NVML_SUCCESS
    );
    assert_eq!(arch, NVML_DEVICE_ARCH_AMPERE);

    let mut major: c_int = 0;
    let mut minor: c_int = 0;
    assert_eq!(
        unsafe { nvmlDeviceGetCudaComputeCapability(handle, &mut major, &mut minor) },
        NVML_SUCCESS
    );
    assert_eq!((major, minor), (8, 0));

    assert_eq!(unsafe { nvmlShutdown() }, NVML_SUCCESS);
}

#[test]
fn test_memory_counters_default_fleet() {
    let _guard = serial();
    let handle = init_and_handle(0);

    let mut memory = nvmlMemory_t::default();
    assert_eq!(
        unsafe { nvmlDeviceGetMemoryInfo(handle, &mut memory) },
        NVML_SUCCESS
    );
    assert_eq!(memory.total, 42_949_672_960, "A100 40 GiB framebuffer");
    assert_eq!(memory.total, memory.free + memory.used);
    assert_eq!(memory.used, 0);

    let mut v2 = nvmlMemory_v2_t {
        version: nvmlMemory_v2,
        ..Default::default()
    };
    assert_eq!(
        unsafe { nvmlDeviceGetMemoryInfo_v2(handle, &mut v2) },
        NVML_SUCCESS
    );
    assert_eq!(v2.version, nvmlMemory_v2, "caller's version tag preserved");
    assert_eq!(v2.total, memory.total);
    assert_eq!(v2.reserved, 0);
    assert_eq!(v2.free, memory.free);

    let mut bar1 = nvmlBAR1Memory_t::default();
    assert_eq!(
        unsafe { nvmlDeviceGetBAR1MemoryInfo(handle, &mut bar1) },
        NVML_SUCCESS
    );
    assert_eq!(bar1.bar1Total, 256 * 1024 * 1024);
    assert_eq!(bar1.bar1Total, bar1.bar1Free + bar1.bar1Used);

    assert_eq!(unsafe { nvmlShutdown() }, NVML_SUCCESS);
}

#[test]
fn test_pci_info_layout_and_revisions() {
    let _guard = serial();
    let handle = init_and_handle(0);

    let mut pci = nvmlPciInfo_t::default();
    assert_eq!(unsafe { nvmlDeviceGetPciInfo_v3(handle, &mut pci) }, NVML_SUCCESS);
    assert_eq!(buf_str(&pci.busId), "0000:81:00.0");
    assert_eq!(buf_str(&pci.busIdLegacy), "0000:81:00.0");
    assert_eq!(pci.domain, 0);
    assert_eq!(pci.bus, 0x81);
    assert_eq!(pci.device, 0);
    assert_eq!(pci.pciDeviceId, 0x20B0_10DE);
    assert_eq!(pci.pciSubSystemId, 0x1347_10DE);

    // Older revisions reuse the same struct and must agree.
    let mut legacy = nvmlPciInfo_t::default();
    assert_eq!(unsafe { nvmlDeviceGetPciInfo(handle, &mut legacy) }, NVML_SUCCESS);
    assert_eq!(buf_str(&legacy.busId), buf_str(&pci.busId));
    assert_eq!(legacy.bus, pci.bus);

    assert_eq!(unsafe { nvmlShutdown() }, NVML_SUCCESS);
}

#[test]
fn test_telemetry_default_values() {
    let _guard = serial();
    let handle = init_and_handle(0);

    let mut temp: c_uint = 0;
    assert_eq!(
        unsafe { nvmlDeviceGetTemperature(handle, NVML_TEMPERATURE_GPU, &mut temp) },
        NVML_SUCCESS
    );
    assert_eq!(temp, 30);

    let mut power: c_uint = 0;
    assert_eq!(unsafe { nvmlDeviceGetPowerUsage(handle, &mut power) }, NVML_SUCCESS);
    assert_eq!(power, 250_000, "milliwatts");

    let mut limit: c_uint = 0;
    assert_eq!(
        unsafe { nvmlDeviceGetPowerManagementLimit(handle, &mut limit) },
        NVML_SUCCESS
    );
    assert_eq!(limit, 400_000);
    let mut enforced: c_uint = 0;
    assert_eq!(
        unsafe { nvmlDeviceGetEnforcedPowerLimit(handle, &mut enforced) },
        NVML_SUCCESS
    );
    assert_eq!(enforced, limit);

    for (domain, expected) in [
        (NVML_CLOCK_GRAPHICS, 1410),
        (NVML_CLOCK_SM, 1410),
        (NVML_CLOCK_MEM, 1215),
        (NVML_CLOCK_VIDEO, 1290),
    ] {
        let mut clock: c_uint = 0;
        assert_eq!(
            unsafe { nvmlDeviceGetClockInfo(handle, domain, &mut clock) },
            NVML_SUCCESS
        );
        assert_eq!(clock, expected, "domain {domain}");

        // Idle defaults report max == current.
        let mut max: c_uint = 0;
        assert_eq!(
            unsafe { nvmlDeviceGetMaxClockInfo(handle, domain, &mut max) },
            NVML_SUCCESS
        );
        assert_eq!(max, expected, "max for domain {domain}");
    }

    let mut pstate: c_uint = 99;
    assert_eq!(
        unsafe { nvmlDeviceGetPerformanceState(handle, &mut pstate) },
        NVML_SUCCESS
    );
    assert_eq!(pstate, NVML_PSTATE_0);

    let mut util = nvmlUtilization_t::default();
    assert_eq!(
        unsafe { nvmlDeviceGetUtilizationRates(handle, &mut util) },
        NVML_SUCCESS
    );
    assert_eq!((util.gpu, util.memory), (0, 0), "idle fleet");

    // SXM boards are passively cooled, so there is no fan to report.
    let mut fan: c_uint = 0;
    assert_eq!(
        unsafe { nvmlDeviceGetFanSpeed(handle, &mut fan) },
        NVML_ERROR_NOT_SUPPORTED
    );

    assert_eq!(unsafe { nvmlShutdown() }, NVML_SUCCESS);
}

#[test]
fn test_process_lists_empty_by_default() {
    let _guard = serial();
    let handle = init_and_handle(0);

    // Count-only probe: null infos array just reports the count.
    let mut count: c_uint = 42;
    assert_eq!(
        unsafe {
            nvmlDeviceGetComputeRunningProcesses_v3(handle, &mut count, ptr::null_mut())
        },
        NVML_SUCCESS
    );
    assert_eq!(count, 0);

    count = 42;
    assert_eq!(
        unsafe {
            nvmlDeviceGetGraphicsRunningProcesses_v3(handle, &mut count, ptr::null_mut())
        },
        NVML_SUCCESS
    );
    assert_eq!(count, 0);

    assert_eq!(
        unsafe {
            nvmlDeviceGetComputeRunningProcesses_v3(handle, ptr::null_mut(), ptr::null_mut())
        },
        NVML_ERROR_INVALID_ARGUMENT
    );

    assert_eq!(unsafe { nvmlShutdown() }, NVML_SUCCESS);
}

#[test]
fn test_mig_disabled_on_default_fleet() {
    let _guard = serial();
    let handle = init_and_handle(0);

    let mut current: c_uint = 0;
    let mut pending: c_uint = 0;
    assert_eq!(
        unsafe { nvmlDeviceGetMigMode(handle, &mut current, &mut pending) },
        NVML_ERROR_NOT_SUPPORTED
    );

    let mut max: c_uint = 99;
    assert_eq!(
        unsafe { nvmlDeviceGetMaxMigDeviceCount(handle, &mut max) },
        NVML_SUCCESS
    );
    assert_eq!(max, 0);

    // The mock never accepts reconfiguration.
    let mut status: nvmlReturn_t = 0;
    assert_eq!(
        unsafe { nvmlDeviceSetMigMode(handle, 1, &mut status) },
        NVML_ERROR_NOT_SUPPORTED
    );

    assert_eq!(unsafe { nvmlShutdown() }, NVML_SUCCESS);
}

#[test]
fn test_nvlink_states_default_topology() {
    let _guard = serial();
    let handle = init_and_handle(0);

    // A100 SXM4 exposes 12 links, all up by default.
    for link in 0..12 {
        let mut active: c_uint = 0;
        assert_eq!(
            unsafe { nvmlDeviceGetNvLinkState(handle, link, &mut active) },
            NVML_SUCCESS,
            "link {link}"
        );
        assert_eq!(active, NVML_FEATURE_ENABLED);
    }

    let mut active: c_uint = 0;
    assert_eq!(
        unsafe { nvmlDeviceGetNvLinkState(handle, 12, &mut active) },
        NVML_ERROR_INVALID_ARGUMENT
    );

    assert_eq!(unsafe { nvmlShutdown() }, NVML_SUCCESS);
}

#[test]
fn test_event_surface_refuses_cleanly() {
    let _guard = serial();
    assert_eq!(unsafe { nvmlInit_v2() }, NVML_SUCCESS);

    let mut set: *mut c_void = ptr::null_mut();
    assert_eq!(unsafe { nvmlEventSetCreate(&mut set) }, NVML_ERROR_NOT_SUPPORTED);
    assert_eq!(
        unsafe { nvmlEventSetWait_v2(ptr::null_mut(), ptr::null_mut(), 0) },
        NVML_ERROR_NOT_SUPPORTED
    );
    assert_eq!(
        unsafe { nvmlEventSetFree(ptr::null_mut()) },
        NVML_ERROR_NOT_SUPPORTED
    );

    assert_eq!(unsafe { nvmlShutdown() }, NVML_SUCCESS);
}

#[test]
fn test_stub_symbols_report_not_supported() {
    let _guard = serial();

    assert_eq!(unsafe { nvmlSystemGetProcessName() }, NVML_ERROR_NOT_SUPPORTED);
    assert_eq!(
        unsafe { nvmlDeviceGetAccountingMode() },
        NVML_ERROR_NOT_SUPPORTED
    );
}

#[test]
fn test_strict_mode_turns_stubs_into_hard_errors() {
    let _guard = serial();

    std::env::set_var(ENV_STRICT, "1");
    assert_eq!(unsafe { nvmlSystemGetProcessName() }, NVML_ERROR_UNKNOWN);

    std::env::remove_var(ENV_STRICT);
    assert_eq!(unsafe { nvmlSystemGetProcessName() }, NVML_ERROR_NOT_SUPPORTED);
}

#[test]
fn test_cuda_and_version_strings() {
    let _guard = serial();
    assert_eq!(unsafe { nvmlInit_v2() }, NVML_SUCCESS);

    let mut driver = [0 as c_char; 80];
    assert_eq!(
        unsafe { nvmlSystemGetDriverVersion(driver.as_mut_ptr(), driver.len() as c_uint) },
        NVML_SUCCESS
    );
    assert_eq!(buf_str(&driver), "550.163.01");

    let mut nvml = [0 as c_char; 80];
    assert_eq!(
        unsafe { nvmlSystemGetNVMLVersion(nvml.as_mut_ptr(), nvml.len() as c_uint) },
        NVML_SUCCESS
    );
    assert_eq!(buf_str(&nvml), "12.550.163.01");

    let mut cuda: c_int = 0;
    assert_eq!(
        unsafe { nvmlSystemGetCudaDriverVersion(&mut cuda) },
        NVML_SUCCESS
    );
    assert_eq!(cuda, 12040, "CUDA 12.4 in driver-int encoding");

    let mut cuda_v2: c_int = 0;
    assert_eq!(
        unsafe { nvmlSystemGetCudaDriverVersion_v2(&mut cuda_v2) },
        NVML_SUCCESS
    );
    assert_eq!(cuda_v2, cuda);

    assert_eq!(unsafe { nvmlShutdown() }, NVML_SUCCESS);
}

#[test]
fn test_export_table_dispatch() {
    let _guard = serial();
    assert_eq!(unsafe { nvmlInit_v2() }, NVML_SUCCESS);

    let guid: [u8; 16] = [
        0xc4, 0xfe, 0x3e, 0x6c, 0xc9, 0x8f, 0x6c, 0x4e, 0xa3, 0x27, 0xee, 0x69, 0x6e, 0x12,
        0xf7, 0xc4,
    ];
    let mut table: *const c_void = ptr::null();
    assert_eq!(
        unsafe { nvmlInternalGetExportTable(&mut table, guid.as_ptr()) },
        NVML_SUCCESS
    );
    assert!(!table.is_null());

    let entries = table as *const *const c_void;
    // Slot 0 is the size marker, every later slot is callable.
    assert_eq!(unsafe { *entries } as usize, 0x1000);

    type TableFn = unsafe extern "C" fn(u64, u64, u64, u64) -> nvmlReturn_t;
    let service: TableFn = unsafe { std::mem::transmute(*entries.add(2)) };

    // Selector 0x22 is handle-by-index.
    let mut handle: nvmlDevice_t = ptr::null_mut();
    let code = unsafe { service(4, &mut handle as *mut nvmlDevice_t as u64, 0x22, 0) };
    assert_eq!(code, NVML_SUCCESS);
    let mut index: c_uint = 0;
    assert_eq!(unsafe { nvmlDeviceGetIndex(handle, &mut index) }, NVML_SUCCESS);
    assert_eq!(index, 4, "table handle interchangeable with public API");

    // Out-of-range index through the side door fails like the public path.
    let code = unsafe { service(30, &mut handle as *mut nvmlDevice_t as u64, 0x22, 0) };
    assert_eq!(code, NVML_ERROR_INVALID_ARGUMENT);

    // Unknown selectors are acknowledged so callers retry the public API.
    let code = unsafe { service(0, 0, 0x99, 0) };
    assert_eq!(code, NVML_SUCCESS);

    // Wrong GUID gets nothing.
    let bogus = [0u8; 16];
    let mut other: *const c_void = ptr::null();
    assert_eq!(
        unsafe { nvmlInternalGetExportTable(&mut other, bogus.as_ptr()) },
        NVML_ERROR_NOT_SUPPORTED
    );

    assert_eq!(unsafe { nvmlShutdown() }, NVML_SUCCESS);
}
