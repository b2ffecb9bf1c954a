//! Execution-matrix expansion
//!
//! The matrix axes (timing, parallelism, device set, memory model) are
//! declarative; targets opt into the axes they support and a small
//! suppression predicate drops cells a target marks as redundant.
//! Configurations are only ever produced by [`expand`], never built by
//! hand elsewhere.

use crate::error::{Error, Result};
use crate::target::TestTarget;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered, non-empty set of device identifiers
///
/// Order matters: it is how the identifier list is serialized into the
/// workload's `-gpus=`/`-unified-gpus=` argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceSet(Vec<u32>);

impl DeviceSet {
    /// Create a device set from an ordered identifier list
    ///
    /// # Errors
    ///
    /// Returns [`Error::Suite`] if the list is empty.
    pub fn new(ids: Vec<u32>) -> Result<Self> {
        if ids.is_empty() {
            return Err(Error::Suite("device set must not be empty".to_string()));
        }
        Ok(Self(ids))
    }

    /// The single-device set `{1}`
    #[must_use]
    pub fn single() -> Self {
        Self(vec![1])
    }

    /// Number of devices in the set
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty (never true for a constructed set)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The ordered identifiers
    #[must_use]
    pub fn ids(&self) -> &[u32] {
        &self.0
    }
}

impl fmt::Display for DeviceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i != 0 {
                write!(f, ",")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

/// One concrete point in the execution matrix for one target
///
/// Derived by [`expand`]; consumed once and discarded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunConfiguration {
    /// Timing-accurate execution instead of functional-only
    pub timing: bool,
    /// Parallel internal scheduling inside the workload
    pub parallel: bool,
    /// Devices the workload runs on
    pub devices: DeviceSet,
    /// Present the devices as one unified device
    pub unified_devices: bool,
    /// Use the unified memory model
    pub unified_memory: bool,
}

impl RunConfiguration {
    /// Whether this configuration spans more than one device
    #[must_use]
    pub fn is_multi_device(&self) -> bool {
        self.devices.len() > 1
    }

    /// Human-readable label for report lines, e.g.
    /// `fir timing parallel gpus=1,2`
    #[must_use]
    pub fn label(&self, target_name: &str) -> String {
        let mut label = String::from(target_name);
        label.push_str(if self.timing { " timing" } else { " emu" });
        if self.parallel {
            label.push_str(" parallel");
        }
        if self.unified_devices {
            label.push_str(&format!(" unified-gpus={}", self.devices));
        } else {
            label.push_str(&format!(" gpus={}", self.devices));
        }
        if self.unified_memory {
            label.push_str(" unified-memory");
        }
        label
    }

    /// Render the full workload argument vector for this configuration
    ///
    /// Always includes `-verify`, the target's size arguments, exactly
    /// one of `-gpus=`/`-unified-gpus=`, and explicit boolean flags for
    /// the remaining axes.
    #[must_use]
    pub fn workload_args(&self, size_args: &[String]) -> Vec<String> {
        let mut args = vec!["-verify".to_string()];
        args.extend(size_args.iter().cloned());

        if self.unified_devices {
            args.push(format!("-unified-gpus={}", self.devices));
        } else {
            args.push(format!("-gpus={}", self.devices));
        }

        args.push(format!("-timing={}", self.timing));
        args.push(format!("-parallel={}", self.parallel));
        args.push(format!("-use-unified-memory={}", self.unified_memory));

        args
    }
}

/// Expand a target's enabled axes into the ordered configuration list
///
/// Device variants come first (single always; discrete then unified
/// multi-device when opted in), then the memory model, then the
/// timing × parallel product with timing as the outer loop.
#[must_use]
pub fn expand(target: &TestTarget) -> Vec<RunConfiguration> {
    let mut variants: Vec<(DeviceSet, bool)> = vec![(DeviceSet::single(), false)];
    if target.multi_device {
        for unified in [false, true] {
            variants.push((DeviceSet(vec![1, 2]), unified));
            variants.push((DeviceSet(vec![1, 2, 3, 4]), unified));
        }
    }

    let memory_models: &[bool] = if target.unified_memory {
        &[false, true]
    } else {
        &[false]
    };

    let mut configurations = Vec::new();
    for (devices, unified_devices) in &variants {
        for &unified_memory in memory_models {
            for timing in [false, true] {
                for parallel in [false, true] {
                    let configuration = RunConfiguration {
                        timing,
                        parallel,
                        devices: devices.clone(),
                        unified_devices: *unified_devices,
                        unified_memory,
                    };
                    if suppressed(target, &configuration) {
                        continue;
                    }
                    configurations.push(configuration);
                }
            }
        }
    }
    configurations
}

/// Per-target suppression predicate
///
/// A unified-memory run on a discrete multi-device set repeats the
/// serial non-timing coverage already provided by the single-device
/// cell; targets opt into dropping those cells via
/// `skip_redundant_discrete`.
fn suppressed(target: &TestTarget, configuration: &RunConfiguration) -> bool {
    target.skip_redundant_discrete
        && configuration.unified_memory
        && !configuration.unified_devices
        && configuration.is_multi_device()
        && !configuration.timing
        && !configuration.parallel
}
