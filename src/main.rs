//! Unique-IPv4 scanner CLI.
//!
//! Reads a newline-delimited file of IPv4 addresses and prints the
//! count of unique and total valid addresses, with a progress bar and
//! before/after memory snapshots. The worker pool is sized from sampled
//! I/O cost and pauses new chunk work under host memory pressure.
//!
//! # Usage
//!
//! The file path is taken from the first positional argument, or
//! prompted for interactively when omitted.
//!
//! # Exit Codes
//!
//! - `0`: scan completed (possibly with skipped chunks, reported on stderr)
//! - `1`: scan failed or the input file does not exist
//! - `2`: invalid arguments or configuration

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use ipscan_rs::memstats::{MemoryScope, MemoryStats, SystemMemory};
use ipscan_rs::progress::{format_duration, ConsoleProgress};
use ipscan_rs::{GrabPercent, ScanConfig, ScanOrchestrator};

fn print_usage(exe: &std::ffi::OsStr) {
    eprintln!(
        "usage: {} [OPTIONS] [path]

OPTIONS:
    --chunk-size=<bytes>     Bytes per file chunk (default: 5242880)
    --grab-percent=<N>       Free-memory share to grab, 10..100 by 10 (default: 80)
    --samples=<N>            Chunk reads sampled by the thread estimator (default: 100)
    --queue-capacity=<N>     Token queue capacity (default: 10000)
    --workers=<N>            Fixed worker count, skips the estimator
    --help, -h               Show this help message",
        exe.to_string_lossy()
    );
}

fn parse_flag<T: std::str::FromStr>(flag: &str, value: &str) -> T {
    value.parse().unwrap_or_else(|_| {
        eprintln!("invalid {} value: {}", flag, value);
        std::process::exit(2);
    })
}

fn main() -> ExitCode {
    let mut args = env::args_os();
    let exe = args.next().unwrap_or_else(|| "ipscan-rs".into());

    let mut config = ScanConfig::default();
    let mut path: Option<PathBuf> = None;

    for arg in args {
        if let Some(flag) = arg.to_str() {
            if flag == "--help" || flag == "-h" {
                print_usage(&exe);
                return ExitCode::SUCCESS;
            }
            if let Some(value) = flag.strip_prefix("--chunk-size=") {
                let bytes: usize = parse_flag("--chunk-size", value);
                if bytes == 0 {
                    eprintln!("--chunk-size must be positive");
                    return ExitCode::from(2);
                }
                config.chunk_size = bytes;
                continue;
            }
            if let Some(value) = flag.strip_prefix("--grab-percent=") {
                let percent: u64 = parse_flag("--grab-percent", value);
                match GrabPercent::from_value(percent) {
                    Some(grab) => config.grab_percent = grab,
                    None => {
                        eprintln!(
                            "unsupported --grab-percent value: {} (expected 10..100 in steps of 10)",
                            percent
                        );
                        return ExitCode::from(2);
                    }
                }
                continue;
            }
            if let Some(value) = flag.strip_prefix("--samples=") {
                config.sample_count = parse_flag("--samples", value);
                continue;
            }
            if let Some(value) = flag.strip_prefix("--queue-capacity=") {
                let capacity: usize = parse_flag("--queue-capacity", value);
                if capacity == 0 {
                    eprintln!("--queue-capacity must be positive");
                    return ExitCode::from(2);
                }
                config.queue_capacity = capacity;
                continue;
            }
            if let Some(value) = flag.strip_prefix("--workers=") {
                let workers: usize = parse_flag("--workers", value);
                if workers == 0 {
                    eprintln!("--workers must be positive");
                    return ExitCode::from(2);
                }
                config.workers = Some(workers);
                continue;
            }
            if flag.starts_with('-') {
                eprintln!("unknown option: {}", flag);
                print_usage(&exe);
                return ExitCode::from(2);
            }
        }
        if path.is_some() {
            eprintln!("unexpected extra argument: {}", arg.to_string_lossy());
            return ExitCode::from(2);
        }
        path = Some(PathBuf::from(arg));
    }

    let path = match path {
        Some(p) => p,
        None => match prompt_for_path() {
            Some(p) => p,
            None => return ExitCode::from(1),
        },
    };

    println!("Preparing to scan: {}", path.display());
    if !path.is_file() {
        eprintln!("invalid file: {}", path.display());
        return ExitCode::from(1);
    }

    let memory = SystemMemory::new();
    print_memory_snapshot("BEFORE", &memory);

    let orchestrator = ScanOrchestrator::new(config).with_progress(Arc::new(ConsoleProgress::new()));
    let started = Instant::now();
    let report = match orchestrator.run(&path) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("scan failed: {}", err);
            return ExitCode::from(1);
        }
    };
    let elapsed = started.elapsed();

    println!(
        "Scanned {} chunks with {} workers: {}",
        report.chunks, report.workers, report.summary
    );
    if report.io_errors > 0 {
        eprintln!(
            "warning: {} chunk(s) failed to read; the summary may undercount",
            report.io_errors
        );
    }

    print_memory_snapshot("AFTER", &memory);
    println!("Spent time: {}", format_duration(elapsed, false));
    ExitCode::SUCCESS
}

fn prompt_for_path() -> Option<PathBuf> {
    print!("Please enter the file to read: ");
    let _ = io::stdout().flush();
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => {
            eprintln!("no path given");
            None
        }
        Ok(_) => {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                eprintln!("no path given");
                None
            } else {
                Some(PathBuf::from(trimmed))
            }
        }
    }
}

fn print_memory_snapshot(label: &str, memory: &SystemMemory) {
    const GIB: f64 = (1u64 << 30) as f64;
    println!(
        "{} ---- process free memory: {:.2} GB of {:.2} GB",
        label,
        memory.free(MemoryScope::Process) as f64 / GIB,
        memory.total(MemoryScope::Process) as f64 / GIB,
    );
    println!(
        "{} ---- host free memory: {:.2} GB of {:.2} GB",
        label,
        memory.free(MemoryScope::Host) as f64 / GIB,
        memory.total(MemoryScope::Host) as f64 / GIB,
    );
}
