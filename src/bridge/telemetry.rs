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

//! Telemetry queries: thermal, power, clocks, utilization.

use std::ffi::c_uint;

use crate::engine::engine;
use crate::error::{to_return, DeviceError};
use crate::ffi::{
    nvmlClockId_t, nvmlClockType_t, nvmlDevice_t, nvmlPstates_t, nvmlReturn_t,
    nvmlTemperatureSensors_t, nvmlUtilization_t, NVML_CLOCK_ID_APP_CLOCK_DEFAULT,
    NVML_CLOCK_ID_APP_CLOCK_TARGET, NVML_CLOCK_ID_CURRENT, NVML_CLOCK_ID_CUSTOMER_BOOST_MAX,
};

use super::helpers::{ffi_guard, write_out};

/// The virtual board has a single thermal sensor, so the selector is
/// accepted without being differentiated.
#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetTemperature(
    device: nvmlDevice_t,
    _sensor_type: nvmlTemperatureSensors_t,
    temp: *mut c_uint,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetTemperature", || {
        to_return(engine().with_device(device, |d| unsafe { write_out(temp, d.temperature()) }))
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetFanSpeed(
    device: nvmlDevice_t,
    speed: *mut c_uint,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetFanSpeed", || {
        to_return(engine().with_device(device, |d| {
            let fan_speed = d.fan_speed()?;
            unsafe { write_out(speed, fan_speed) }
        }))
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetPowerUsage(
    device: nvmlDevice_t,
    power: *mut c_uint,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetPowerUsage", || {
        to_return(
            engine().with_device(device, |d| unsafe { write_out(power, d.power_usage_mw()) }),
        )
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetPowerManagementLimit(
    device: nvmlDevice_t,
    limit: *mut c_uint,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetPowerManagementLimit", || {
        to_return(
            engine().with_device(device, |d| unsafe { write_out(limit, d.power_limit_mw()) }),
        )
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetEnforcedPowerLimit(
    device: nvmlDevice_t,
    limit: *mut c_uint,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetEnforcedPowerLimit", || {
        to_return(
            engine().with_device(device, |d| unsafe { write_out(limit, d.power_limit_mw()) }),
        )
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetClockInfo(
    device: nvmlDevice_t,
    clock_type: nvmlClockType_t,
    clock: *mut c_uint,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetClockInfo", || {
        to_return(
            engine()
                .with_device(device, |d| unsafe { write_out(clock, d.clock_mhz(clock_type)) }),
        )
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetMaxClockInfo(
    device: nvmlDevice_t,
    clock_type: nvmlClockType_t,
    clock: *mut c_uint,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetMaxClockInfo", || {
        to_return(engine().with_device(device, |d| unsafe {
            write_out(clock, d.max_clock_mhz(clock_type))
        }))
    })
}

/// Selector form of the clock query. The virtual board idles at its rated
/// clocks, so the application/boost targets coincide with the maximums.
#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetClock(
    device: nvmlDevice_t,
    clock_type: nvmlClockType_t,
    clock_id: nvmlClockId_t,
    clock_mhz: *mut c_uint,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetClock", || {
        to_return(engine().with_device(device, |d| {
            let value = match clock_id {
                NVML_CLOCK_ID_CURRENT => d.clock_mhz(clock_type),
                NVML_CLOCK_ID_APP_CLOCK_TARGET
                | NVML_CLOCK_ID_APP_CLOCK_DEFAULT
                | NVML_CLOCK_ID_CUSTOMER_BOOST_MAX => d.max_clock_mhz(clock_type),
                _ => return Err(DeviceError::InvalidArgument),
            };
            unsafe { write_out(clock_mhz, value) }
        }))
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetPerformanceState(
    device: nvmlDevice_t,
    p_state: *mut nvmlPstates_t,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetPerformanceState", || {
        to_return(
            engine()
                .with_device(device, |d| unsafe { write_out(p_state, d.performance_state()) }),
        )
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetUtilizationRates(
    device: nvmlDevice_t,
    utilization: *mut nvmlUtilization_t,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetUtilizationRates", || {
        to_return(engine().with_device(device, |d| {
            let (gpu, memory) = d.utilization_rates();
            unsafe { write_out(utilization, nvmlUtilization_t { gpu, memory }) }
        }))
    })
}
