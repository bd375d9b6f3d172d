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

//! The exported C surface.
//!
//! Every public entry point lives here, grouped the way the upstream
//! header groups them. Bodies stay thin: validate pointers, call into the
//! engine, translate the result. Panics never cross the boundary; see
//! [`helpers::ffi_guard`].

pub mod device;
pub mod events;
pub mod helpers;
pub mod init;
pub mod internal;
pub mod memory;
pub mod mig;
pub mod pci;
pub mod process;
pub mod stubs;
pub mod system;
pub mod telemetry;
