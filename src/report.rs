//! Run reports in Links Notation and Markdown.
//!
//! Links Notation (Lino) represents structured data as nested, indented
//! links:
//!
//! ```text
//! sort_report:
//!   timestamp '2026-10-17T12:00:00Z'
//!   description 'sample sort benchmark'
//!
//! runs:
//!   size_10000:
//!     channel_unstable_p4:
//!       transport channel
//!       workers 4
//!       total_ms 1.234
//!       buckets (2481 2530 2502 2487)
//! ```
//!
//! [`parse_lino_report`] reads back what [`RunReport::to_lino`] writes, which
//! is what the `report2md` binary relies on.

use std::fmt::{self, Write as _};
use std::fs;
use std::io;
use std::path::Path;

use crate::coordinator::RunStats;

/// Transport name used for single-call baselines in a report.
pub const BASELINE: &str = "baseline";
/// Baseline the speedup columns compare against.
pub const REFERENCE_BASELINE: &str = "std_unstable";

/// Outcome of one timed sort.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    /// `channel`, `rayon`, `inline`, or [`BASELINE`].
    pub transport: String,
    /// Local sort strategy, or the baseline's name.
    pub algorithm: String,
    pub worker_count: usize,
    pub input_len: usize,
    pub total_ms: f64,
    pub partition_ms: f64,
    pub exchange_ms: f64,
    /// Output was checked sorted and complete.
    pub verified: bool,
    pub bucket_sizes: Vec<usize>,
}

impl RunRecord {
    pub fn from_stats(stats: &RunStats, verified: bool) -> Self {
        RunRecord {
            transport: stats.transport.to_string(),
            algorithm: stats.algorithm.to_string(),
            worker_count: stats.worker_count,
            input_len: stats.input_len,
            total_ms: stats.total_time.as_secs_f64() * 1000.0,
            partition_ms: stats.partition_time.as_secs_f64() * 1000.0,
            exchange_ms: stats.exchange_time.as_secs_f64() * 1000.0,
            verified,
            bucket_sizes: stats.bucket_sizes.clone(),
        }
    }

    /// A single-call sort the pipeline is compared against.
    pub fn baseline(name: &str, input_len: usize, total_ms: f64, verified: bool) -> Self {
        RunRecord {
            transport: BASELINE.to_string(),
            algorithm: name.to_string(),
            worker_count: 1,
            input_len,
            total_ms,
            partition_ms: 0.0,
            exchange_ms: 0.0,
            verified,
            bucket_sizes: Vec::new(),
        }
    }

    pub fn is_baseline(&self) -> bool {
        self.transport == BASELINE
    }

    /// Block name in the Lino output, e.g. `rayon_radix_p8`.
    pub fn label(&self) -> String {
        if self.is_baseline() {
            format!("{}_{}", BASELINE, self.algorithm)
        } else {
            format!("{}_{}_p{}", self.transport, self.algorithm, self.worker_count)
        }
    }

    pub fn largest_bucket(&self) -> Option<usize> {
        self.bucket_sizes.iter().copied().max()
    }
}

/// Host the report was produced on.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    pub logical_cpus: usize,
}

impl Default for SystemInfo {
    fn default() -> Self {
        SystemInfo {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            logical_cpus: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

/// A set of runs, grouped by input size when rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// ISO 8601, UTC.
    pub timestamp: String,
    pub description: String,
    pub system_info: SystemInfo,
    pub runs: Vec<RunRecord>,
}

impl RunReport {
    pub fn new(description: &str) -> Self {
        RunReport {
            timestamp: utc_timestamp(),
            description: description.to_string(),
            system_info: SystemInfo::default(),
            runs: Vec::new(),
        }
    }

    pub fn add_run(&mut self, run: RunRecord) {
        self.runs.push(run);
    }

    fn sizes(&self) -> Vec<usize> {
        let mut sizes: Vec<usize> = self.runs.iter().map(|r| r.input_len).collect();
        sizes.sort_unstable();
        sizes.dedup();
        sizes
    }

    fn runs_of_size(&self, size: usize) -> impl Iterator<Item = &RunRecord> {
        self.runs.iter().filter(move |r| r.input_len == size)
    }

    /// How many times faster `run` was than the reference baseline of the
    /// same size, if that baseline was recorded.
    pub fn speedup(&self, run: &RunRecord) -> Option<f64> {
        let reference = self
            .runs_of_size(run.input_len)
            .find(|r| r.is_baseline() && r.algorithm == REFERENCE_BASELINE)?;
        (run.total_ms > 0.0).then(|| reference.total_ms / run.total_ms)
    }

    pub fn to_lino(&self) -> String {
        self.to_string()
    }

    pub fn save_lino(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.to_lino())
    }

    pub fn to_markdown_table(&self) -> String {
        Markdown(self).to_string()
    }

    pub fn save_markdown(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.to_markdown_table())
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "sort_report:")?;
        writeln!(f, "  timestamp '{}'", self.timestamp)?;
        writeln!(f, "  description '{}'", escape_lino_string(&self.description))?;

        writeln!(f)?;
        writeln!(f, "system_info:")?;
        writeln!(f, "  os '{}'", escape_lino_string(&self.system_info.os))?;
        writeln!(f, "  arch '{}'", escape_lino_string(&self.system_info.arch))?;
        writeln!(f, "  logical_cpus {}", self.system_info.logical_cpus)?;

        let sizes = self.sizes();

        writeln!(f)?;
        writeln!(f, "runs:")?;
        for &size in &sizes {
            writeln!(f, "  size_{size}:")?;
            for run in self.runs_of_size(size) {
                writeln!(f, "    {}:", run.label())?;
                writeln!(f, "      transport {}", run.transport)?;
                writeln!(f, "      algorithm {}", run.algorithm)?;
                writeln!(f, "      workers {}", run.worker_count)?;
                writeln!(f, "      total_ms {:.3}", run.total_ms)?;
                writeln!(f, "      partition_ms {:.3}", run.partition_ms)?;
                writeln!(f, "      exchange_ms {:.3}", run.exchange_ms)?;
                writeln!(f, "      verified {}", run.verified)?;
                if !run.bucket_sizes.is_empty() {
                    let sizes: Vec<String> = run.bucket_sizes.iter().map(usize::to_string).collect();
                    writeln!(f, "      buckets ({})", sizes.join(" "))?;
                }
            }
        }

        writeln!(f)?;
        writeln!(f, "comparisons:")?;
        for &size in &sizes {
            let mut block = String::new();
            for run in self.runs_of_size(size).filter(|r| !r.is_baseline()) {
                if let Some(speedup) = self.speedup(run) {
                    writeln!(block, "    {}_vs_{}_{}:", run.label(), BASELINE, REFERENCE_BASELINE)?;
                    writeln!(block, "      speedup {speedup:.2}")?;
                    let faster = if speedup > 1.0 { "pipeline" } else { "baseline" };
                    writeln!(block, "      faster {faster}")?;
                }
            }
            if !block.is_empty() {
                writeln!(f, "  size_{size}:")?;
                f.write_str(&block)?;
            }
        }
        Ok(())
    }
}

/// Markdown rendering of a [`RunReport`].
pub struct Markdown<'a>(pub &'a RunReport);

impl fmt::Display for Markdown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(f, "# Sample Sort Report")?;
        writeln!(f)?;
        writeln!(f, "**Timestamp:** {}", report.timestamp)?;
        writeln!(f, "**Description:** {}", report.description)?;
        writeln!(f)?;

        writeln!(f, "## System Information")?;
        writeln!(f)?;
        writeln!(f, "| Property | Value |")?;
        writeln!(f, "|----------|-------|")?;
        writeln!(f, "| OS | {} |", report.system_info.os)?;
        writeln!(f, "| Arch | {} |", report.system_info.arch)?;
        writeln!(f, "| Logical CPUs | {} |", report.system_info.logical_cpus)?;
        writeln!(f)?;

        writeln!(f, "## Runs")?;
        writeln!(f)?;
        writeln!(
            f,
            "| Size | Run | Workers | Total (ms) | Partition (ms) | Exchange (ms) | Largest bucket | Verified | vs {REFERENCE_BASELINE} |"
        )?;
        writeln!(
            f,
            "|------|-----|---------|------------|----------------|---------------|----------------|----------|-----------------|"
        )?;

        for size in report.sizes() {
            for run in report.runs_of_size(size) {
                let largest = run
                    .largest_bucket()
                    .map(|b| b.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let speedup = match report.speedup(run) {
                    Some(s) if !run.is_baseline() => format!("{s:.2}x"),
                    _ => "-".to_string(),
                };
                writeln!(
                    f,
                    "| {} | {} | {} | {:.3} | {:.3} | {:.3} | {} | {} | {} |",
                    format_size(size),
                    run.label(),
                    run.worker_count,
                    run.total_ms,
                    run.partition_ms,
                    run.exchange_ms,
                    largest,
                    if run.verified { "yes" } else { "NO" },
                    speedup
                )?;
            }
        }

        writeln!(f)?;
        writeln!(f, "---")?;
        writeln!(f, "*Report generated by sample-sort*")
    }
}

/// Escape a string for use in Links Notation (handle single quotes)
fn escape_lino_string(s: &str) -> String {
    s.replace('\'', "\\'")
}

/// Format a size as a human-readable string (e.g., "1K", "1M")
fn format_size(size: usize) -> String {
    match size {
        s if s >= 1_000_000_000 => format!("{}G", s / 1_000_000_000),
        s if s >= 1_000_000 => format!("{}M", s / 1_000_000),
        s if s >= 1_000 => format!("{}K", s / 1_000),
        s => s.to_string(),
    }
}

/// Current UTC time as `YYYY-MM-DDTHH:MM:SSZ`.
fn utc_timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format_timestamp(secs)
}

fn format_timestamp(unix_secs: u64) -> String {
    let days = (unix_secs / 86_400) as i64;
    let time_of_day = unix_secs % 86_400;
    let (year, month, day) = civil_from_days(days);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year,
        month,
        day,
        time_of_day / 3600,
        (time_of_day % 3600) / 60,
        time_of_day % 60
    )
}

/// Proleptic Gregorian date for a day count since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Parse a report written by [`RunReport::to_lino`]. Returns `None` when no
/// run could be read.
pub fn parse_lino_report(content: &str) -> Option<RunReport> {
    let mut report = RunReport::new("Parsed report");
    let mut section = "";
    let mut current_size: Option<usize> = None;
    let mut current: Option<RunRecord> = None;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if indent_of(line) == 0 {
            if let Some(run) = current.take() {
                report.runs.push(run);
            }
            section = trimmed.trim_end_matches(':');
            current_size = None;
            continue;
        }

        match section {
            "sort_report" => {
                if let Some(ts) = extract_quoted_value(trimmed, "timestamp") {
                    report.timestamp = ts;
                } else if let Some(desc) = extract_quoted_value(trimmed, "description") {
                    report.description = desc;
                }
            }
            "system_info" => {
                if let Some(os) = extract_quoted_value(trimmed, "os") {
                    report.system_info.os = os;
                } else if let Some(arch) = extract_quoted_value(trimmed, "arch") {
                    report.system_info.arch = arch;
                } else if let Some(cpus) = trimmed.strip_prefix("logical_cpus ") {
                    report.system_info.logical_cpus = cpus.parse().unwrap_or(0);
                }
            }
            "runs" => match indent_of(line) {
                2 => {
                    if let Some(run) = current.take() {
                        report.runs.push(run);
                    }
                    current_size = trimmed
                        .strip_prefix("size_")
                        .and_then(|s| s.strip_suffix(':'))
                        .and_then(|s| s.parse().ok());
                }
                4 => {
                    if let Some(run) = current.take() {
                        report.runs.push(run);
                    }
                    if let Some(size) = current_size {
                        current = Some(RunRecord {
                            transport: String::new(),
                            algorithm: String::new(),
                            worker_count: 0,
                            input_len: size,
                            total_ms: 0.0,
                            partition_ms: 0.0,
                            exchange_ms: 0.0,
                            verified: false,
                            bucket_sizes: Vec::new(),
                        });
                    }
                }
                _ => {
                    if let Some(run) = current.as_mut() {
                        parse_run_property(run, trimmed);
                    }
                }
            },
            _ => {}
        }
    }

    if let Some(run) = current {
        report.runs.push(run);
    }

    if report.runs.is_empty() {
        None
    } else {
        Some(report)
    }
}

fn parse_run_property(run: &mut RunRecord, line: &str) {
    let Some((key, value)) = line.split_once(' ') else {
        return;
    };
    match key {
        "transport" => run.transport = value.to_string(),
        "algorithm" => run.algorithm = value.to_string(),
        "workers" => run.worker_count = value.parse().unwrap_or(0),
        "total_ms" => run.total_ms = value.parse().unwrap_or(0.0),
        "partition_ms" => run.partition_ms = value.parse().unwrap_or(0.0),
        "exchange_ms" => run.exchange_ms = value.parse().unwrap_or(0.0),
        "verified" => run.verified = value == "true",
        "buckets" => {
            run.bucket_sizes = value
                .trim_start_matches('(')
                .trim_end_matches(')')
                .split_whitespace()
                .filter_map(|s| s.parse().ok())
                .collect();
        }
        _ => {}
    }
}

fn extract_quoted_value(line: &str, key: &str) -> Option<String> {
    let rest = line.strip_prefix(key)?.strip_prefix(' ')?.trim();
    let inner = rest.strip_prefix('\'')?.strip_suffix('\'')?;
    Some(inner.replace("\\'", "'"))
}
