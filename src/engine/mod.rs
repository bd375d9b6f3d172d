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

//! Session engine.
//!
//! One [`Engine`] owns the initialization refcount, the device list, and
//! the handle arena. Initialization is reference counted the way the real
//! library behaves inside a process: the first `init` builds the session
//! from configuration, later ones only increment, and the session tears
//! down when the count returns to zero.

pub mod handles;

use std::ffi::c_void;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use once_cell::sync::Lazy;
use tracing::{debug, info};

use crate::config::{self, ResolvedConfig};
use crate::device::{build_profiles, Device};
use crate::error::{DeviceError, DeviceResult};
use handles::HandleTable;

struct Session {
    config: Arc<ResolvedConfig>,
    devices: Vec<Device>,
}

struct EngineState {
    refcount: u32,
    session: Option<Session>,
}

pub struct Engine {
    state: RwLock<EngineState>,
    handles: HandleTable,
}

static ENGINE: Lazy<Engine> = Lazy::new(Engine::new);

/// The process-wide engine the exported C entry points go through.
pub fn engine() -> &'static Engine {
    &ENGINE
}

impl Engine {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(EngineState {
                refcount: 0,
                session: None,
            }),
            handles: HandleTable::new(),
        }
    }

    /// Brings the session up, or bumps the refcount when it already is.
    /// The 0 to 1 transition re-reads configuration, so a re-initialized
    /// process observes config changes made since the last teardown.
    pub fn init(&self) -> DeviceResult<()> {
        let mut state = self.write_state();
        if state.refcount > 0 {
            state.refcount += 1;
            debug!(refcount = state.refcount, "init on live session");
            return Ok(());
        }

        let config = config::load();
        let devices: Vec<Device> = build_profiles(&config)
            .into_iter()
            .map(Device::new)
            .collect();
        self.handles.activate(devices.len());
        info!(
            devices = devices.len(),
            driver_version = %config.driver_version,
            "session initialized"
        );
        state.session = Some(Session { config, devices });
        state.refcount = 1;
        Ok(())
    }

    /// Drops one reference. The session tears down when the count reaches
    /// zero, which also invalidates every outstanding device handle.
    pub fn shutdown(&self) -> DeviceResult<()> {
        let mut state = self.write_state();
        if state.refcount == 0 {
            return Err(DeviceError::Uninitialized);
        }
        state.refcount -= 1;
        if state.refcount == 0 {
            state.session = None;
            self.handles.deactivate();
            info!("session torn down");
        } else {
            debug!(refcount = state.refcount, "shutdown on live session");
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.read_state().refcount > 0
    }

    pub fn device_count(&self) -> DeviceResult<u32> {
        let state = self.read_state();
        let session = state.session.as_ref().ok_or(DeviceError::Uninitialized)?;
        Ok(session.devices.len() as u32)
    }

    pub fn device_handle_by_index(&self, index: u32) -> DeviceResult<*mut c_void> {
        let state = self.read_state();
        let session = state.session.as_ref().ok_or(DeviceError::Uninitialized)?;
        if index as usize >= session.devices.len() {
            return Err(DeviceError::InvalidArgument);
        }
        self.handles
            .token_for(index as usize)
            .ok_or(DeviceError::Unknown)
    }

    pub fn device_handle_by_uuid(&self, uuid: &str) -> DeviceResult<*mut c_void> {
        let state = self.read_state();
        let session = state.session.as_ref().ok_or(DeviceError::Uninitialized)?;
        let slot = session
            .devices
            .iter()
            .position(|d| d.uuid() == uuid)
            .ok_or(DeviceError::NotFound)?;
        self.handles.token_for(slot).ok_or(DeviceError::Unknown)
    }

    pub fn device_handle_by_pci_bus_id(&self, bus_id: &str) -> DeviceResult<*mut c_void> {
        let state = self.read_state();
        let session = state.session.as_ref().ok_or(DeviceError::Uninitialized)?;
        let wanted = normalize_bus_id(bus_id);
        let slot = session
            .devices
            .iter()
            .position(|d| normalize_bus_id(d.pci_bus_id()) == wanted)
            .ok_or(DeviceError::NotFound)?;
        self.handles.token_for(slot).ok_or(DeviceError::Unknown)
    }

    /// Resolves a handle and runs `f` against its device under the read
    /// lock. All per-device bridge queries funnel through here.
    pub fn with_device<T>(
        &self,
        handle: *mut c_void,
        f: impl FnOnce(&Device) -> DeviceResult<T>,
    ) -> DeviceResult<T> {
        let state = self.read_state();
        let session = state.session.as_ref().ok_or(DeviceError::Uninitialized)?;
        let slot = self.handles.resolve(handle)?;
        let device = session.devices.get(slot).ok_or(DeviceError::InvalidArgument)?;
        f(device)
    }

    pub fn driver_version(&self) -> DeviceResult<String> {
        let state = self.read_state();
        let session = state.session.as_ref().ok_or(DeviceError::Uninitialized)?;
        Ok(session.config.driver_version.clone())
    }

    pub fn nvml_version(&self) -> DeviceResult<String> {
        let state = self.read_state();
        let session = state.session.as_ref().ok_or(DeviceError::Uninitialized)?;
        Ok(session.config.nvml_version.clone())
    }

    pub fn cuda_driver_version(&self) -> DeviceResult<i32> {
        let state = self.read_state();
        let session = state.session.as_ref().ok_or(DeviceError::Uninitialized)?;
        Ok(session.config.cuda_driver_version)
    }

    /// Test hook. Drops all session state regardless of refcount and
    /// clears the config cache, so the next `init` starts from scratch.
    #[doc(hidden)]
    pub fn reset(&self) {
        let mut state = self.write_state();
        state.refcount = 0;
        state.session = None;
        self.handles.deactivate();
        config::clear_cache();
    }

    fn read_state(&self) -> RwLockReadGuard<'_, EngineState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, EngineState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Bus id comparison tolerant of case and of the 8-digit domain form newer
/// clients use ("00000000:81:00.0" matches "0000:81:00.0").
fn normalize_bus_id(id: &str) -> String {
    let lower = id.to_ascii_lowercase();
    match lower.split_once(':') {
        Some((domain, rest)) => {
            let trimmed = domain.trim_start_matches('0');
            let domain = if trimmed.is_empty() { "0" } else { trimmed };
            format!("{domain}:{rest}")
        }
        None => lower,
    }
}
