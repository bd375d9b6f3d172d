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

//! Error types for the mock NVML engine.
//!
//! The engine works with [`DeviceError`], a closed taxonomy mirroring the
//! native return codes. Richer internal errors (config loading) live in
//! [`ConfigError`] and never cross the native boundary: the loader logs
//! them and degrades to defaults.
//!
//! # Example
//!
//! ```rust
//! use mock_nvml::error::DeviceError;
//! use mock_nvml::ffi::NVML_ERROR_NOT_SUPPORTED;
//!
//! let err = DeviceError::NotSupported;
//! assert_eq!(err.to_return(), NVML_ERROR_NOT_SUPPORTED);
//! ```

use thiserror::Error;

use crate::ffi::{
    nvmlReturn_t, NVML_ERROR_INSUFFICIENT_SIZE, NVML_ERROR_INVALID_ARGUMENT,
    NVML_ERROR_NOT_FOUND, NVML_ERROR_NOT_SUPPORTED, NVML_ERROR_UNINITIALIZED, NVML_ERROR_UNKNOWN,
    NVML_SUCCESS,
};

/// Result alias used throughout the engine and device model.
pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

/// The closed error set every engine operation reduces to before the
/// bridge translates it into a native return code.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// The library has not been initialized (or was shut down to zero).
    #[error("library not initialized")]
    Uninitialized,

    /// A supplied argument is invalid: null output pointer, out-of-range
    /// index, or a handle token that is null, foreign, or stale.
    #[error("invalid argument")]
    InvalidArgument,

    /// The capability is deliberately unimplemented on the mocked device
    /// (MIG partitioning, fan speed on passive boards, event monitoring).
    #[error("operation not supported")]
    NotSupported,

    /// Lookup by UUID or PCI bus id found no matching device.
    #[error("object not found")]
    NotFound,

    /// The caller-supplied buffer is smaller than the value requires.
    #[error("insufficient buffer size")]
    InsufficientSize,

    /// An internal fault, including any panic caught at the boundary.
    #[error("unknown internal error")]
    Unknown,
}

impl DeviceError {
    /// Reduces the error to its fixed native return code.
    pub fn to_return(self) -> nvmlReturn_t {
        match self {
            DeviceError::Uninitialized => NVML_ERROR_UNINITIALIZED,
            DeviceError::InvalidArgument => NVML_ERROR_INVALID_ARGUMENT,
            DeviceError::NotSupported => NVML_ERROR_NOT_SUPPORTED,
            DeviceError::NotFound => NVML_ERROR_NOT_FOUND,
            DeviceError::InsufficientSize => NVML_ERROR_INSUFFICIENT_SIZE,
            DeviceError::Unknown => NVML_ERROR_UNKNOWN,
        }
    }
}

/// Collapses a `DeviceResult` that carries no payload into a return code.
pub fn to_return(result: DeviceResult<()>) -> nvmlReturn_t {
    match result {
        Ok(()) => NVML_SUCCESS,
        Err(e) => e.to_return(),
    }
}

/// Errors raised while locating, parsing, or validating a configuration
/// file. These are internal to the loader: a failed load is logged and the
/// loader falls through to environment overrides and hard defaults.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("reading config file: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid YAML for the expected schema.
    #[error("parsing YAML config: {0}")]
    Parse(#[from] serde_yaml_ng::Error),

    /// The document parsed but violates a structural requirement.
    #[error("validating config: {0}")]
    Validation(String),
}

/// Human-readable text for a native return code, matching the phrasing the
/// real library's `nvmlErrorString` uses. Codes outside the known set map
/// to `"Unknown Error"`.
pub fn return_string(code: nvmlReturn_t) -> &'static str {
    use crate::ffi::*;
    match code {
        NVML_SUCCESS => "The operation was successful",
        NVML_ERROR_UNINITIALIZED => "NVML was not first initialized with nvmlInit()",
        NVML_ERROR_INVALID_ARGUMENT => "A supplied argument is invalid",
        NVML_ERROR_NOT_SUPPORTED => "The requested operation is not available on target device",
        NVML_ERROR_NO_PERMISSION => "The current user does not have permission",
        NVML_ERROR_ALREADY_INITIALIZED => "Multiple initializations are now allowed",
        NVML_ERROR_NOT_FOUND => "A query to find an object was unsuccessful",
        NVML_ERROR_INSUFFICIENT_SIZE => "An input argument is not large enough",
        NVML_ERROR_INSUFFICIENT_POWER => {
            "A device's external power cables are not properly attached"
        }
        NVML_ERROR_DRIVER_NOT_LOADED => "NVIDIA driver is not loaded",
        NVML_ERROR_TIMEOUT => "User provided timeout passed",
        NVML_ERROR_IRQ_ISSUE => "NVIDIA Kernel detected an interrupt issue",
        NVML_ERROR_LIBRARY_NOT_FOUND => "NVML Shared Library couldn't be found or loaded",
        NVML_ERROR_FUNCTION_NOT_FOUND => "Local version of NVML doesn't implement this function",
        NVML_ERROR_CORRUPTED_INFOROM => "infoROM is corrupted",
        NVML_ERROR_GPU_IS_LOST => "The GPU has fallen off the bus or has otherwise become inaccessible",
        NVML_ERROR_RESET_REQUIRED => "The GPU requires a reset before it can be used again",
        NVML_ERROR_OPERATING_SYSTEM => "The GPU control device has been blocked",
        NVML_ERROR_LIB_RM_VERSION_MISMATCH => "RM detects a driver/library version mismatch",
        NVML_ERROR_IN_USE => {
            "An operation cannot be performed because the GPU is currently in use"
        }
        NVML_ERROR_MEMORY => "Insufficient memory",
        NVML_ERROR_NO_DATA => "No data",
        NVML_ERROR_VGPU_ECC_NOT_SUPPORTED => {
            "The requested vgpu operation is not available on target device"
        }
        NVML_ERROR_INSUFFICIENT_RESOURCES => "Ran out of critical resources",
        NVML_ERROR_FREQ_NOT_SUPPORTED => "The requested frequency is not supported",
        NVML_ERROR_ARGUMENT_VERSION_MISMATCH => "The provided version is invalid/unsupported",
        NVML_ERROR_DEPRECATED => "The requested functionality has been deprecated",
        NVML_ERROR_NOT_READY => "The system is not ready for the request",
        NVML_ERROR_GPU_NOT_FOUND => "No GPUs were found",
        NVML_ERROR_INVALID_STATE => {
            "Resource not in correct state to perform requested operation"
        }
        NVML_ERROR_UNKNOWN => "An internal driver error occurred",
        _ => "Unknown Error",
    }
}
