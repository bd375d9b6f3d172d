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

//! Software-only stand-in for the NVIDIA Management Library.
//!
//! Built as a `cdylib` and dropped in place of `libnvidia-ml.so.1`, the
//! library answers the NVML C API from configuration instead of hardware:
//! unmodified client binaries initialize, enumerate a virtual GPU fleet,
//! and read back deterministic telemetry. Device topology comes from a
//! YAML fleet file or environment overrides, with a stock DGX A100 layout
//! as the fallback.
//!
//! The crate also builds as a plain library so the engine and bridge can
//! be exercised directly from Rust tests.

pub mod bridge;
pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod ffi;

#[cfg(test)]
pub(crate) mod test_support;
