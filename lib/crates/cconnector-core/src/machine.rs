//! Machine descriptor returned alongside a successful claim.
//!
//! Only the data shape and the provider contract live here; the daemon
//! supplies a `sysinfo`-backed implementation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const GIB: u64 = 1024 * 1024 * 1024;

/// Point-in-time snapshot of host hardware and OS facts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineDescriptor {
    pub ram: Usage,
    pub storage: StorageUsage,
    pub cpu: CpuInfo,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kernel_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub os_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub platform: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub platform_family: String,
    /// Whole hours since boot.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub uptime: u64,
}

/// Total / free / used, rendered as whole gibibytes (`"16 GB"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub total: String,
    pub free: String,
    pub used: String,
}

impl Usage {
    #[must_use]
    pub fn from_bytes(total: u64, free: u64, used: u64) -> Self {
        Self {
            total: gigabytes(total),
            free: gigabytes(free),
            used: gigabytes(used),
        }
    }
}

/// Disk space in gibibytes plus inode counts of the same filesystem(s).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageUsage {
    pub total: String,
    pub free: String,
    pub used: String,
    #[serde(default)]
    pub inode: InodeUsage,
}

impl StorageUsage {
    /// `used` is whatever of `total` is not `free`.
    #[must_use]
    pub fn new(total: u64, free: u64, inode: InodeUsage) -> Self {
        Self {
            total: gigabytes(total),
            free: gigabytes(free),
            used: gigabytes(total.saturating_sub(free)),
            inode,
        }
    }
}

/// Inode counts as plain decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InodeUsage {
    pub total: String,
    pub free: String,
    pub used: String,
}

impl Default for InodeUsage {
    fn default() -> Self {
        Self::from_counts(0, 0)
    }
}

impl InodeUsage {
    #[must_use]
    pub fn from_counts(total: u64, free: u64) -> Self {
        Self {
            total: total.to_string(),
            free: free.to_string(),
            used: total.saturating_sub(free).to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuInfo {
    pub cores: usize,
    pub model: String,
    pub percentages: Vec<String>,
}

#[derive(Debug, Error)]
pub enum MachineSpecsError {
    #[error("no CPU information found")]
    NoCpu,

    #[error("no disk information found")]
    NoDisk,

    #[error("machine specs collection failed: {0}")]
    Collection(String),
}

/// Source of [`MachineDescriptor`] snapshots.
///
/// Implementations may block (CPU sampling needs a short interval); async
/// callers should run them on the blocking pool.
pub trait MachineSpecs: Send + Sync {
    fn snapshot(&self) -> Result<MachineDescriptor, MachineSpecsError>;
}

/// `bytes` as whole gibibytes, e.g. `"15 GB"`.
#[must_use]
pub fn gigabytes(bytes: u64) -> String {
    format!("{} GB", bytes / GIB)
}

/// CPU usage with two decimals and a percent sign, e.g. `"12.50%"`.
#[must_use]
pub fn percentage(value: f32) -> String {
    format!("{value:.2}%")
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde skip_serializing_if signature
fn is_zero(value: &u64) -> bool {
    *value == 0
}
