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

//! Opaque device handle arena.
//!
//! Handles given out across the C boundary are integer tokens, never real
//! addresses, so a client dereferencing one faults immediately instead of
//! corrupting library state. A token packs the session generation in the
//! high half and `slot + 1` in the low half; re-initialization bumps the
//! generation, which invalidates every previously minted token at once.

use std::ffi::c_void;
use std::sync::RwLock;

use crate::error::{DeviceError, DeviceResult};

struct TableState {
    /// Bumped on every activation. Starts above zero so no live token is
    /// ever a small integer a caller could produce by accident.
    generation: u32,
    slots: usize,
}

pub struct HandleTable {
    inner: RwLock<TableState>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(TableState {
                generation: 1,
                slots: 0,
            }),
        }
    }

    /// Opens a new session generation with `count` live slots. Tokens from
    /// earlier generations stop resolving.
    pub fn activate(&self, count: usize) {
        let mut state = self.write();
        state.generation = state.generation.wrapping_add(1);
        state.slots = count;
    }

    /// Empties the arena. Existing tokens stop resolving until the next
    /// activation mints a fresh generation.
    pub fn deactivate(&self) {
        self.write().slots = 0;
    }

    /// The stable token for `slot`, identical for every call within one
    /// generation. `None` when the slot is not live.
    pub fn token_for(&self, slot: usize) -> Option<*mut c_void> {
        let state = self.read();
        if slot >= state.slots {
            return None;
        }
        Some(compose(state.generation, slot))
    }

    /// Maps a caller-supplied handle back to its slot. Null pointers,
    /// foreign pointers, and tokens from earlier generations are all
    /// rejected the same way.
    pub fn resolve(&self, handle: *mut c_void) -> DeviceResult<usize> {
        if handle.is_null() {
            return Err(DeviceError::InvalidArgument);
        }
        let (generation, low) = decompose(handle);
        let state = self.read();
        if generation != state.generation || low == 0 || low as usize > state.slots {
            return Err(DeviceError::InvalidArgument);
        }
        Ok(low as usize - 1)
    }

    #[cfg(test)]
    pub fn generation(&self) -> u32 {
        self.read().generation
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, TableState> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, TableState> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}

// Token layout assumes 64-bit pointers, same as the driver libraries this
// stands in for.
fn compose(generation: u32, slot: usize) -> *mut c_void {
    let bits = (u64::from(generation) << 32) | (slot as u64 + 1);
    bits as *mut c_void
}

fn decompose(handle: *mut c_void) -> (u32, u32) {
    let bits = handle as u64;
    ((bits >> 32) as u32, bits as u32)
}
