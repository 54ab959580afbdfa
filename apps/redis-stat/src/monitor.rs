//! Polling reports: `overview`, `vmstat` and `latency`.
//!
//! Each loops until the process is killed, one row per `delay`. The row
//! builders are pure over the INFO text so they can be tested offline.

use std::io::Write;
use std::time::{Duration, Instant};

use crate::errors::StatError;
use crate::store::info::info_long;
use crate::store::RedisStore;

/// Header lines are repeated every this many rows.
const HEADER_EVERY: usize = 20;
/// `overview` sums `dbN:keys` over this many databases.
const MAX_DBS: usize = 20;

pub const OVERVIEW_HEADER: &str = " ------- data ------ ------------ load ----------------------------- - childs -\n keys      used-mem  clients blpops  requests            connections";

pub const VMSTAT_HEADER: &str = " --------------- objects --------------- ------ pages ------ ----- memory -----\n load-in  swap-out  swapped   delta      used     delta      used     delta    ";

// ────────────────────────────────────────────────────────────────────────────
// Row builders
// ────────────────────────────────────────────────────────────────────────────

/// Remembers the previous request counter for the `(+delta)` column.
#[derive(Debug, Default)]
pub struct OverviewRows {
    requests: i64,
}

impl OverviewRows {
    pub fn row(&mut self, info: &str) -> String {
        let keys: i64 = (0..MAX_DBS)
            .filter_map(|db| info_long(info, &format!("db{db}:keys")))
            .sum();
        let used_memory = info_long(info, "used_memory").unwrap_or(0);
        let clients = info_long(info, "connected_clients").unwrap_or(0);
        let blocked = info_long(info, "blocked_clients").unwrap_or(0);
        let requests = info_long(info, "total_commands_processed").unwrap_or(0);
        let connections = info_long(info, "total_connections_received").unwrap_or(0);

        let requests_col = format!("{requests} (+{})", requests - self.requests);
        self.requests = requests;

        let children = info_long(info, "bgsave_in_progress").unwrap_or(0)
            | (info_long(info, "bgrewriteaof_in_progress").unwrap_or(0) << 1);
        let children_col = match children {
            1 => "BGSAVE",
            2 => "AOFREWRITE",
            3 => "BGSAVE+AOF",
            _ => "",
        };

        format!(
            " {:<10}{:<9} {:<8}{:<8}{:<19} {:<12}{}",
            keys,
            bytes_to_human(used_memory),
            clients,
            blocked,
            requests_col,
            connections,
            children_col
        )
    }
}

/// Previous VM counters, for the delta columns.
#[derive(Debug, Default)]
pub struct VmstatRows {
    pagein: i64,
    pageout: i64,
    swapped: i64,
    used_pages: i64,
    used_memory: i64,
}

impl VmstatRows {
    /// Fails with `VmDisabled` when the server reports no VM counters.
    pub fn row(&mut self, info: &str) -> Result<String, StatError> {
        let pagein = info_long(info, "vm_stats_swappin_count").ok_or(StatError::VmDisabled)?;
        let pageout = info_long(info, "vm_stats_swappout_count").unwrap_or(0);
        let swapped = info_long(info, "vm_stats_swapped_objects").unwrap_or(0);
        let used_pages = info_long(info, "vm_stats_used_pages").unwrap_or(0);
        let used_memory = info_long(info, "used_memory").unwrap_or(0);

        let line = format!(
            " {:<9}{:<9} {:<10}{}{:<10}{:<9}{}{:<9} {:<9}{}{:<9}",
            pagein - self.pagein,
            pageout - self.pageout,
            swapped,
            sign(swapped - self.swapped),
            swapped - self.swapped,
            used_pages,
            sign(used_pages - self.used_pages),
            used_pages - self.used_pages,
            bytes_to_human(used_memory),
            sign(used_memory - self.used_memory),
            bytes_to_human(used_memory - self.used_memory),
        );

        *self = VmstatRows {
            pagein,
            pageout,
            swapped,
            used_pages,
            used_memory,
        };
        Ok(line)
    }
}

pub fn latency_row(seq: u64, elapsed: Duration) -> String {
    format!("{seq}: {:.2} ms", elapsed.as_secs_f64() * 1000.0)
}

/// Leading marker for a signed delta: blank for zero, `+` for growth.
/// Negative values carry their own `-`.
fn sign(delta: i64) -> &'static str {
    match delta {
        0 => " ",
        d if d > 0 => "+",
        _ => "",
    }
}

/// `1023B`, `1.50K`, `12.00M`, `2.25G`; negative values get a leading `-`.
pub fn bytes_to_human(n: i64) -> String {
    if n < 0 {
        return format!("-{}", bytes_to_human(n.saturating_neg()));
    }
    const K: f64 = 1024.0;
    let d = n as f64;
    if d < K {
        format!("{n}B")
    } else if d < K * K {
        format!("{:.2}K", d / K)
    } else if d < K * K * K {
        format!("{:.2}M", d / (K * K))
    } else {
        format!("{:.2}G", d / (K * K * K))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Loops
// ────────────────────────────────────────────────────────────────────────────

pub async fn overview<W: Write>(
    store: &RedisStore,
    delay: Duration,
    out: &mut W,
) -> Result<(), StatError> {
    let mut rows = OverviewRows::default();
    for n in 0.. {
        let info = store.info().await?;
        if n % HEADER_EVERY == 0 {
            writeln!(out, "{OVERVIEW_HEADER}")?;
        }
        writeln!(out, "{}", rows.row(&info))?;
        out.flush()?;
        tokio::time::sleep(delay).await;
    }
    Ok(())
}

pub async fn vmstat<W: Write>(
    store: &RedisStore,
    delay: Duration,
    out: &mut W,
) -> Result<(), StatError> {
    let mut rows = VmstatRows::default();
    for n in 0.. {
        let info = store.info().await?;
        if n % HEADER_EVERY == 0 {
            writeln!(out, "{VMSTAT_HEADER}")?;
        }
        let line = rows.row(&info)?;
        writeln!(out, "{line}")?;
        out.flush()?;
        tokio::time::sleep(delay).await;
    }
    Ok(())
}

pub async fn latency<W: Write>(
    store: &RedisStore,
    delay: Duration,
    out: &mut W,
) -> Result<(), StatError> {
    for seq in 1.. {
        let start = Instant::now();
        store.ping().await?;
        writeln!(out, "{}", latency_row(seq, start.elapsed()))?;
        out.flush()?;
        tokio::time::sleep(delay).await;
    }
    Ok(())
}
