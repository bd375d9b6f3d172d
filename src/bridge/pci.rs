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

//! PCI info queries. All three ABI revisions fill the same modern struct.

use crate::device::Device;
use crate::engine::engine;
use crate::error::{to_return, DeviceError, DeviceResult};
use crate::ffi::{nvmlDevice_t, nvmlPciInfo_t, nvmlReturn_t};

use super::helpers::{ffi_guard, fill_char_array};

fn fill_pci_info(device: &Device, pci: *mut nvmlPciInfo_t) -> DeviceResult<()> {
    if pci.is_null() {
        return Err(DeviceError::InvalidArgument);
    }
    let location = device.pci_location()?;
    let mut info = nvmlPciInfo_t::default();
    fill_char_array(&location.bus_id, &mut info.busIdLegacy);
    fill_char_array(&location.bus_id, &mut info.busId);
    info.domain = location.domain;
    info.bus = location.bus;
    info.device = location.device;
    info.pciDeviceId = location.pci_device_id;
    info.pciSubSystemId = location.pci_subsystem_id;
    unsafe { pci.write(info) };
    Ok(())
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetPciInfo_v3(
    device: nvmlDevice_t,
    pci: *mut nvmlPciInfo_t,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetPciInfo_v3", || {
        to_return(engine().with_device(device, |d| fill_pci_info(d, pci)))
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetPciInfo_v2(
    device: nvmlDevice_t,
    pci: *mut nvmlPciInfo_t,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetPciInfo_v2", || {
        to_return(engine().with_device(device, |d| fill_pci_info(d, pci)))
    })
}

#[no_mangle]
pub unsafe extern "C" fn nvmlDeviceGetPciInfo(
    device: nvmlDevice_t,
    pci: *mut nvmlPciInfo_t,
) -> nvmlReturn_t {
    ffi_guard("nvmlDeviceGetPciInfo", || {
        to_return(engine().with_device(device, |d| fill_pci_info(d, pci)))
    })
}
