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

//! Bulk coverage of the remaining public NVML surface.
//!
//! Clients resolve symbols with dlsym and fail hard when one is missing,
//! so every name a modern client might bind must exist. Entry points with
//! no mock semantics are generated from a name list and uniformly report
//! NVML_ERROR_NOT_SUPPORTED (or fail loudly under MOCK_NVML_STRICT).
//! Argument lists are ignored; the C calling convention leaves cleanup to
//! the caller, so a no-argument definition links and runs safely for any
//! signature as long as only the return code is produced.

use crate::ffi::nvmlReturn_t;

use super::helpers::unimplemented_symbol;

macro_rules! nvml_stubs {
    ($($symbol:ident),* $(,)?) => {
        $(
            #[no_mangle]
            pub unsafe extern "C" fn $symbol() -> nvmlReturn_t {
                unimplemented_symbol(stringify!($symbol))
            }
        )*
    };
}

nvml_stubs! {
    // System queries beyond the version strings.
    nvmlSystemGetProcessName,
    nvmlSystemGetHicVersion,
    nvmlSystemGetTopologyGpuSet,
    nvmlSystemGetConfComputeCapabilities,
    nvmlSystemGetConfComputeState,
    nvmlSystemGetConfComputeGpusReadyState,
    nvmlSystemSetConfComputeGpusReadyState,
    nvmlSystemGetNvlinkBwMode,
    nvmlSystemSetNvlinkBwMode,

    // S-class unit management.
    nvmlUnitGetCount,
    nvmlUnitGetHandleByIndex,
    nvmlUnitGetUnitInfo,
    nvmlUnitGetLedState,
    nvmlUnitGetPsuInfo,
    nvmlUnitGetTemperature,
    nvmlUnitGetFanSpeedInfo,
    nvmlUnitGetDevices,
    nvmlUnitSetLedState,

    // Device identity and board plumbing.
    nvmlDeviceGetAttributes,
    nvmlDeviceGetAttributes_v2,
    nvmlDeviceGetBoardId,
    nvmlDeviceGetMultiGpuBoard,
    nvmlDeviceGetHandleBySerial,
    nvmlDeviceGetModuleId,
    nvmlDeviceGetIrqNum,
    nvmlDeviceGetNumGpuCores,
    nvmlDeviceGetBusType,
    nvmlDeviceGetBridgeChipInfo,
    nvmlDeviceOnSameBoard,
    nvmlDeviceGetInforomVersion,
    nvmlDeviceGetInforomImageVersion,
    nvmlDeviceGetInforomConfigurationChecksum,
    nvmlDeviceValidateInforom,
    nvmlDeviceGetLastBBXFlushTime,
    nvmlDeviceGetDisplayMode,
    nvmlDeviceGetDisplayActive,
    nvmlDeviceGetPersistenceMode,
    nvmlDeviceSetPersistenceMode,

    // PCIe attributes beyond the basic location.
    nvmlDeviceGetMaxPcieLinkGeneration,
    nvmlDeviceGetMaxPcieLinkWidth,
    nvmlDeviceGetCurrPcieLinkGeneration,
    nvmlDeviceGetCurrPcieLinkWidth,
    nvmlDeviceGetGpuMaxPcieLinkGeneration,
    nvmlDeviceGetPcieThroughput,
    nvmlDeviceGetPcieReplayCounter,
    nvmlDeviceGetPcieSpeed,
    nvmlDeviceGetPcieLinkMaxSpeed,

    // Clock control surface beyond the current/max/selector queries.
    nvmlDeviceGetApplicationsClock,
    nvmlDeviceSetApplicationsClocks,
    nvmlDeviceResetApplicationsClocks,
    nvmlDeviceGetDefaultApplicationsClock,
    nvmlDeviceGetSupportedMemoryClocks,
    nvmlDeviceGetSupportedGraphicsClocks,
    nvmlDeviceGetAutoBoostedClocksEnabled,
    nvmlDeviceSetAutoBoostedClocksEnabled,
    nvmlDeviceSetDefaultAutoBoostedClocksEnabled,
    nvmlDeviceSetGpuLockedClocks,
    nvmlDeviceResetGpuLockedClocks,
    nvmlDeviceSetMemoryLockedClocks,
    nvmlDeviceResetMemoryLockedClocks,
    nvmlDeviceGetClkMonStatus,
    nvmlDeviceGetAdaptiveClockInfoStatus,
    nvmlDeviceGetCurrentClocksEventReasons,
    nvmlDeviceGetCurrentClocksThrottleReasons,
    nvmlDeviceGetSupportedClocksEventReasons,
    nvmlDeviceGetSupportedClocksThrottleReasons,
    nvmlDeviceGetSupportedPerformanceStates,
    nvmlDeviceGetDynamicPstatesInfo,

    // Thermal and cooling beyond the single GPU sensor.
    nvmlDeviceGetFanSpeed_v2,
    nvmlDeviceGetTargetFanSpeed,
    nvmlDeviceSetFanSpeed_v2,
    nvmlDeviceGetMinMaxFanSpeed,
    nvmlDeviceGetFanControlPolicy_v2,
    nvmlDeviceSetFanControlPolicy,
    nvmlDeviceGetNumFans,
    nvmlDeviceGetTemperatureThreshold,
    nvmlDeviceSetTemperatureThreshold,
    nvmlDeviceGetThermalSettings,

    // Power management beyond usage and the enforced limit.
    nvmlDeviceGetPowerState,
    nvmlDeviceGetPowerManagementMode,
    nvmlDeviceGetPowerManagementLimitConstraints,
    nvmlDeviceGetPowerManagementDefaultLimit,
    nvmlDeviceSetPowerManagementLimit,
    nvmlDeviceGetPowerSource,
    nvmlDeviceGetTotalEnergyConsumption,
    nvmlDeviceGetGpuOperationMode,
    nvmlDeviceSetGpuOperationMode,

    // Memory topology and reliability.
    nvmlDeviceGetMemoryBusWidth,
    nvmlDeviceGetEccMode,
    nvmlDeviceSetEccMode,
    nvmlDeviceGetDefaultEccMode,
    nvmlDeviceGetTotalEccErrors,
    nvmlDeviceGetDetailedEccErrors,
    nvmlDeviceGetMemoryErrorCounter,
    nvmlDeviceClearEccErrorCounts,
    nvmlDeviceGetRetiredPages,
    nvmlDeviceGetRetiredPages_v2,
    nvmlDeviceGetRetiredPagesPendingStatus,
    nvmlDeviceGetRemappedRows,
    nvmlDeviceGetRowRemapperHistogram,

    // Compute mode, accounting, and scheduling.
    nvmlDeviceGetComputeMode,
    nvmlDeviceSetComputeMode,
    nvmlDeviceGetDriverModel,
    nvmlDeviceSetDriverModel,
    nvmlDeviceGetAPIRestriction,
    nvmlDeviceSetAPIRestriction,
    nvmlDeviceGetSamples,
    nvmlDeviceGetViolationStatus,
    nvmlDeviceGetAccountingMode,
    nvmlDeviceSetAccountingMode,
    nvmlDeviceGetAccountingStats,
    nvmlDeviceGetAccountingPids,
    nvmlDeviceGetAccountingBufferSize,
    nvmlDeviceClearAccountingPids,
    nvmlDeviceGetProcessUtilization,
    nvmlDeviceGetProcessesUtilizationInfo,
    nvmlDeviceGetMPSComputeRunningProcesses,
    nvmlDeviceGetMPSComputeRunningProcesses_v2,
    nvmlDeviceGetMPSComputeRunningProcesses_v3,

    // Encoder, decoder, and frame-buffer capture sessions.
    nvmlDeviceGetEncoderUtilization,
    nvmlDeviceGetEncoderCapacity,
    nvmlDeviceGetEncoderStats,
    nvmlDeviceGetEncoderSessions,
    nvmlDeviceGetDecoderUtilization,
    nvmlDeviceGetJpgUtilization,
    nvmlDeviceGetOfaUtilization,
    nvmlDeviceGetFBCStats,
    nvmlDeviceGetFBCSessions,

    // CPU and memory affinity.
    nvmlDeviceGetMemoryAffinity,
    nvmlDeviceGetCpuAffinity,
    nvmlDeviceGetCpuAffinityWithinScope,
    nvmlDeviceSetCpuAffinity,
    nvmlDeviceClearCpuAffinity,
    nvmlDeviceGetTopologyCommonAncestor,
    nvmlDeviceGetTopologyNearestGpus,
    nvmlDeviceGetP2PStatus,

    // NvLink beyond per-link state.
    nvmlDeviceGetNvLinkVersion,
    nvmlDeviceGetNvLinkCapability,
    nvmlDeviceGetNvLinkRemotePciInfo,
    nvmlDeviceGetNvLinkRemotePciInfo_v2,
    nvmlDeviceGetNvLinkErrorCounter,
    nvmlDeviceResetNvLinkErrorCounters,
    nvmlDeviceGetNvLinkUtilizationControl,
    nvmlDeviceSetNvLinkUtilizationControl,
    nvmlDeviceGetNvLinkUtilizationCounter,
    nvmlDeviceFreezeNvLinkUtilizationCounter,
    nvmlDeviceResetNvLinkUtilizationCounter,
    nvmlDeviceGetNvLinkRemoteDeviceType,
    nvmlDeviceSetNvLinkDeviceLowPowerThreshold,
    nvmlDeviceGetGpuFabricInfo,

    // Field-value batch queries.
    nvmlDeviceGetFieldValues,
    nvmlDeviceClearFieldValues,

    // Drain state and hot-plug management.
    nvmlDeviceDiscoverGpus,
    nvmlDeviceModifyDrainState,
    nvmlDeviceQueryDrainState,
    nvmlDeviceRemoveGpu,
    nvmlDeviceRemoveGpu_v2,

    // GSP firmware.
    nvmlDeviceGetGspFirmwareVersion,
    nvmlDeviceGetGspFirmwareMode,

    // Virtualization and vGPU host surface.
    nvmlDeviceGetVirtualizationMode,
    nvmlDeviceSetVirtualizationMode,
    nvmlDeviceGetHostVgpuMode,
    nvmlDeviceGetSupportedVgpus,
    nvmlDeviceGetCreatableVgpus,
    nvmlDeviceGetActiveVgpus,
    nvmlDeviceGetVgpuCapabilities,
    nvmlDeviceGetVgpuMetadata,
    nvmlDeviceGetVgpuUtilization,
    nvmlDeviceGetPgpuMetadataString,
    nvmlDeviceGetVgpuSchedulerLog,
    nvmlDeviceGetVgpuSchedulerState,
    nvmlDeviceSetVgpuSchedulerState,
    nvmlDeviceGetVgpuSchedulerCapabilities,
    nvmlDeviceGetGridLicensableFeatures,
    nvmlGetVgpuCompatibility,
    nvmlGetVgpuVersion,
    nvmlSetVgpuVersion,
    nvmlGetVgpuDriverCapabilities,
    nvmlGetExcludedDeviceCount,
    nvmlGetExcludedDeviceInfoByIndex,

    // vGPU type and instance queries.
    nvmlVgpuTypeGetClass,
    nvmlVgpuTypeGetName,
    nvmlVgpuTypeGetGpuInstanceProfileId,
    nvmlVgpuTypeGetDeviceID,
    nvmlVgpuTypeGetFramebufferSize,
    nvmlVgpuTypeGetNumDisplayHeads,
    nvmlVgpuTypeGetResolution,
    nvmlVgpuTypeGetLicense,
    nvmlVgpuTypeGetFrameRateLimit,
    nvmlVgpuTypeGetMaxInstances,
    nvmlVgpuTypeGetMaxInstancesPerVm,
    nvmlVgpuInstanceGetVmID,
    nvmlVgpuInstanceGetUUID,
    nvmlVgpuInstanceGetVmDriverVersion,
    nvmlVgpuInstanceGetFbUsage,
    nvmlVgpuInstanceGetLicenseStatus,
    nvmlVgpuInstanceGetLicenseInfo_v2,
    nvmlVgpuInstanceGetType,
    nvmlVgpuInstanceGetFrameRateLimit,
    nvmlVgpuInstanceGetEccMode,
    nvmlVgpuInstanceGetEncoderCapacity,
    nvmlVgpuInstanceSetEncoderCapacity,
    nvmlVgpuInstanceGetEncoderStats,
    nvmlVgpuInstanceGetEncoderSessions,
    nvmlVgpuInstanceGetFBCStats,
    nvmlVgpuInstanceGetFBCSessions,
    nvmlVgpuInstanceGetGpuInstanceId,
    nvmlVgpuInstanceGetGpuPciId,
    nvmlVgpuInstanceGetMetadata,
    nvmlVgpuInstanceGetAccountingMode,
    nvmlVgpuInstanceGetAccountingPids,
    nvmlVgpuInstanceGetAccountingStats,
    nvmlVgpuInstanceClearAccountingPids,
    nvmlVgpuInstanceGetMdevUUID,

    // MIG partition management beyond the read-only queries.
    nvmlDeviceGetGpuInstanceProfileInfoV,
    nvmlDeviceGetGpuInstancePossiblePlacements_v2,
    nvmlDeviceGetGpuInstanceRemainingCapacity,
    nvmlDeviceCreateGpuInstance,
    nvmlDeviceCreateGpuInstanceWithPlacement,
    nvmlGpuInstanceDestroy,
    nvmlGpuInstanceGetInfo,
    nvmlGpuInstanceGetComputeInstanceProfileInfo,
    nvmlGpuInstanceGetComputeInstanceProfileInfoV,
    nvmlGpuInstanceGetComputeInstanceRemainingCapacity,
    nvmlGpuInstanceGetComputeInstancePossiblePlacements,
    nvmlGpuInstanceCreateComputeInstance,
    nvmlGpuInstanceCreateComputeInstanceWithPlacement,
    nvmlComputeInstanceDestroy,
    nvmlComputeInstanceGetInfo,
    nvmlComputeInstanceGetInfo_v2,
    nvmlGpuInstanceGetComputeInstances,
    nvmlGpuInstanceGetComputeInstanceById,
    nvmlDeviceGetGpuInstanceById,
    nvmlDeviceGetGpuInstanceId,
    nvmlDeviceGetComputeInstanceId,
    nvmlDeviceIsMigDeviceHandle,
    nvmlDeviceGetMigDeviceHandleByIndex,
    nvmlDeviceGetDeviceHandleFromMigDeviceHandle,

    // GPM metrics.
    nvmlGpmMetricsGet,
    nvmlGpmSampleFree,
    nvmlGpmSampleAlloc,
    nvmlGpmSampleGet,
    nvmlGpmMigSampleGet,
    nvmlGpmQueryDeviceSupport,
    nvmlGpmQueryIfStreamingEnabled,
    nvmlGpmSetStreamingEnabled,

    // Confidential computing.
    nvmlDeviceSetConfComputeUnprotectedMemSize,
    nvmlDeviceGetConfComputeMemSizeInfo,
    nvmlDeviceGetConfComputeProtectedMemoryUsage,
    nvmlDeviceGetConfComputeGpuCertificate,
    nvmlDeviceGetConfComputeGpuAttestationReport,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::helpers::ENV_STRICT;
    use crate::ffi::{NVML_ERROR_NOT_SUPPORTED, NVML_ERROR_UNKNOWN};

    #[test]
    fn stub_reports_not_supported() {
        let _guard = crate::test_support::env_lock();
        std::env::remove_var(ENV_STRICT);
        assert_eq!(
            unsafe { nvmlDeviceGetAccountingBufferSize() },
            NVML_ERROR_NOT_SUPPORTED
        );
    }

    #[test]
    fn stub_fails_loudly_in_strict_mode() {
        let _guard = crate::test_support::env_lock();
        std::env::set_var(ENV_STRICT, "1");
        assert_eq!(unsafe { nvmlGpmMetricsGet() }, NVML_ERROR_UNKNOWN);
        std::env::remove_var(ENV_STRICT);
    }
}
