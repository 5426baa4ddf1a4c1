//! Progress rendering.
//!
//! The memory monitor reports scan progress through the
//! [`ProgressRenderer`] trait so the core never owns a terminal: the CLI
//! installs [`ConsoleProgress`], tests install [`SilentProgress`] or a
//! recording fake.
//!
//! # Thread Safety
//!
//! `render` is called from the monitor thread only, but implementations
//! must be `Send + Sync` because the pool holds them behind an `Arc`.

use std::io::{self, Write};
use std::sync::Mutex;
use std::time::Duration;

/// Receives one progress observation per monitor tick.
///
/// Returns `true` once the observation represents completion
/// (`done == total`); the monitor uses that as its exit signal.
pub trait ProgressRenderer: Send + Sync {
    fn render(&self, done: u64, total: u64, elapsed: Duration, remaining: Duration) -> bool;
}

/// No-op renderer for library embedding and tests.
pub struct SilentProgress;

impl ProgressRenderer for SilentProgress {
    fn render(&self, done: u64, total: u64, _elapsed: Duration, _remaining: Duration) -> bool {
        done >= total
    }
}

/// Terminal progress bar, redrawn in place with `\r`.
///
/// Layout: `[####----] 50.0% (elapsed/remaining) DONE: d TODO: t`.
/// Writes to stdout; the final redraw appends a newline so the summary
/// printed afterwards starts on a fresh line.
pub struct ConsoleProgress {
    bar_width: usize,
    out: Mutex<io::Stdout>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::with_width(25)
    }

    pub fn with_width(bar_width: usize) -> Self {
        Self {
            bar_width: bar_width.max(1),
            out: Mutex::new(io::stdout()),
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressRenderer for ConsoleProgress {
    fn render(&self, done: u64, total: u64, elapsed: Duration, remaining: Duration) -> bool {
        if total == 0 {
            return true;
        }
        let done = done.min(total);
        let percent = 100.0 * done as f64 / total as f64;
        let filled = (percent * self.bar_width as f64 / 100.0) as usize;
        let bar: String = (0..self.bar_width)
            .map(|i| if i < filled { '#' } else { '-' })
            .collect();

        let mut out = self.out.lock().expect("progress mutex poisoned");
        let _ = write!(
            out,
            "\r[{}] {:5.1}% ({}/{}) DONE: {} TODO: {}",
            bar,
            percent,
            format_duration(elapsed, true),
            format_duration(remaining, true),
            done,
            total - done,
        );
        let complete = done == total;
        if complete {
            let _ = writeln!(out);
        }
        let _ = out.flush();
        complete
    }
}

/// Formats a duration as `dd:hh:mm:ss` (short) or
/// `Days:dd Hours:hh Minutes:mm Seconds:ss` (long).
pub fn format_duration(duration: Duration, short: bool) -> String {
    let total = duration.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    if short {
        format!("{:02}:{:02}:{:02}:{:02}", days, hours, minutes, seconds)
    } else {
        format!(
            "Days:{:02} Hours:{:02} Minutes:{:02} Seconds:{:02}",
            days, hours, minutes, seconds
        )
    }
}
