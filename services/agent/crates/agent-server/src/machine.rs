//! `sysinfo`-backed machine descriptor.

use std::path::{Path, PathBuf};

use cconnector_core::machine::{CpuInfo, InodeUsage, StorageUsage, Usage, percentage};
use cconnector_core::{MachineDescriptor, MachineSpecs, MachineSpecsError};
use sysinfo::{Disks, MINIMUM_CPU_UPDATE_INTERVAL, System};

const MACHINE_ID_PATH: &str = "/etc/machine-id";
const ROOT_MOUNT: &str = "/";

/// Reads CPU, memory, disk and host facts from the running system.
///
/// `snapshot` sleeps for [`MINIMUM_CPU_UPDATE_INTERVAL`] to sample CPU
/// usage; call it from the blocking pool.
#[derive(Debug, Clone)]
pub struct SysinfoMachineSpecs {
    machine_id_path: PathBuf,
}

impl Default for SysinfoMachineSpecs {
    fn default() -> Self {
        Self {
            machine_id_path: PathBuf::from(MACHINE_ID_PATH),
        }
    }
}

impl SysinfoMachineSpecs {
    #[must_use]
    pub fn with_machine_id_path(path: impl Into<PathBuf>) -> Self {
        Self {
            machine_id_path: path.into(),
        }
    }
}

impl MachineSpecs for SysinfoMachineSpecs {
    fn snapshot(&self) -> Result<MachineDescriptor, MachineSpecsError> {
        let mut sys = System::new_all();
        std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
        sys.refresh_cpu_usage();

        let model = sys
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .ok_or(MachineSpecsError::NoCpu)?;
        let cpu = CpuInfo {
            cores: sys.cpus().len(),
            model,
            percentages: vec![percentage(sys.global_cpu_usage())],
        };

        let ram = Usage::from_bytes(sys.total_memory(), sys.free_memory(), sys.used_memory());

        let disks = Disks::new_with_refreshed_list();
        let samples: Vec<_> = disks
            .list()
            .iter()
            .map(|d| (d.mount_point(), d.total_space(), d.available_space()))
            .collect();
        let selected = select_storage(&samples).ok_or(MachineSpecsError::NoDisk)?;
        let (inodes_total, inodes_free) = selected
            .mounts
            .iter()
            .filter_map(|mount| inode_counts(mount))
            .fold((0u64, 0u64), |(total, free), (t, f)| {
                (total.saturating_add(t), free.saturating_add(f))
            });
        let storage = StorageUsage::new(
            selected.total,
            selected.free,
            InodeUsage::from_counts(inodes_total, inodes_free),
        );

        Ok(MachineDescriptor {
            ram,
            storage,
            cpu,
            host_id: read_machine_id(&self.machine_id_path),
            host_name: System::host_name().unwrap_or_default(),
            kernel_version: System::kernel_version().unwrap_or_default(),
            os_version: System::long_os_version().unwrap_or_default(),
            platform: System::distribution_id(),
            platform_family: std::env::consts::FAMILY.to_string(),
            uptime: System::uptime() / 3600,
        })
    }
}

/// Space figures for the descriptor and the mounts they were taken from.
#[derive(Debug, PartialEq, Eq)]
struct SelectedStorage<'a> {
    mounts: Vec<&'a Path>,
    total: u64,
    free: u64,
}

/// The root mount when one is reported, otherwise every disk summed.
/// Input is `(mount point, total bytes, available bytes)`.
fn select_storage<'a>(disks: &[(&'a Path, u64, u64)]) -> Option<SelectedStorage<'a>> {
    let root = disks.iter().find(|(m, ..)| *m == Path::new(ROOT_MOUNT));
    if let Some(&(mount, total, free)) = root {
        return Some(SelectedStorage {
            mounts: vec![mount],
            total,
            free,
        });
    }
    if disks.is_empty() {
        return None;
    }
    Some(SelectedStorage {
        mounts: disks.iter().map(|(m, ..)| *m).collect(),
        total: disks.iter().fold(0u64, |acc, (_, t, _)| acc.saturating_add(*t)),
        free: disks.iter().fold(0u64, |acc, (_, _, f)| acc.saturating_add(*f)),
    })
}

/// `(total, free)` inodes of the filesystem holding `mount`.
#[cfg(unix)]
#[allow(clippy::useless_conversion)] // fsfilcnt_t is narrower than u64 on some targets
fn inode_counts(mount: &Path) -> Option<(u64, u64)> {
    match nix::sys::statvfs::statvfs(mount) {
        Ok(stat) => Some((u64::from(stat.files()), u64::from(stat.files_free()))),
        Err(e) => {
            tracing::debug!(mount = %mount.display(), error = %e, "inode counts unavailable");
            None
        }
    }
}

#[cfg(not(unix))]
fn inode_counts(_mount: &Path) -> Option<(u64, u64)> {
    None
}

fn read_machine_id(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(id) => id.trim().to_string(),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "machine id unavailable");
            String::new()
        }
    }
}
