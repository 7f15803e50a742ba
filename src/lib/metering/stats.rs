use sysinfo::{Disks, System};

use super::types::HostStats;

const MIB: u64 = 1024 * 1024;

impl HostStats {
    /// Refreshes `system` and reads node usage. Memory figures are in MiB,
    /// usage figures in percent rounded to two decimals.
    pub fn collect(system: &mut System) -> Self {
        system.refresh_cpu_usage();
        system.refresh_memory();

        HostStats {
            cpu_usage: round2(system.global_cpu_usage()),
            total_memory: system.total_memory() / MIB,
            used_memory: system.used_memory() / MIB,
            total_swap: system.total_swap() / MIB,
            used_swap: system.used_swap() / MIB,
            system_name: System::name().unwrap_or_else(|| "Unknown".to_string()),
            hostname: System::host_name().unwrap_or_else(|| "Unknown".to_string()),
            total_cpus: system.cpus().len() as u64,
            disk_usage: round2(disk_usage(&Disks::new_with_refreshed_list())),
        }
    }
}

fn disk_usage(disks: &Disks) -> f32 {
    let total: u64 = disks.iter().map(|disk| disk.total_space()).sum();
    if total == 0 {
        return 0.0;
    }
    let used: u64 = disks
        .iter()
        .map(|disk| disk.total_space().saturating_sub(disk.available_space()))
        .sum();
    (used as f64 / total as f64 * 100.0) as f32
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}
