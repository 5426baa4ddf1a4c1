//! Memory-adaptive worker pool.
//!
//! # States
//!
//! The pool is either RUNNING or PAUSED. Pausing gates only *task
//! starts*: a worker picks a task off the queue, then blocks at the
//! admission gate while the pool is paused. Tasks already executing are
//! never interrupted, so a pause lets in-flight chunk buffers finish and
//! get freed instead of cancelling work that already paid for its I/O.
//!
//! # Monitor
//!
//! A monitor thread polls every `poll_interval` (250 ms default):
//!
//! - **Floor**: `(100 - grab_percent)%` of the free host memory sampled
//!   at pool construction, held as an absolute byte threshold until the
//!   next resume recomputes it from then-current free memory.
//! - **RUNNING -> PAUSED** when current free memory drops below the
//!   floor.
//! - **PAUSED -> RUNNING** when the pool is fully starved (zero task
//!   bodies executing) while chunks are still outstanding. Starvation
//!   is the signal that everything the scan had in flight has been
//!   released, i.e. the memory that can come back has come back.
//!
//! The monitor also renders progress (done/total chunks, elapsed and
//! estimated remaining time) through the injected renderer and exits
//! once every chunk is done.
//!
//! # Accepted risk
//!
//! Resume keys on starvation, not on free memory climbing back over
//! the floor. A pause under pressure from some external process can
//! therefore oscillate slowly while still making progress; there is no
//! timeout or forced abort.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::config::GrabPercent;
use crate::memstats::{MemoryScope, MemoryStats};
use crate::progress::ProgressRenderer;
use crate::stdx::CountdownLatch;

/// A unit of pool work (one chunk parse).
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Pool tuning knobs.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    pub workers: usize,
    pub grab_percent: GrabPercent,
    pub poll_interval: Duration,
}

/// Pause/resume counters, for diagnostics and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolEvents {
    pub pauses: u64,
    pub resumes: u64,
}

struct Admission {
    paused: bool,
    /// Workers currently blocked at the gate with a task in hand.
    waiting: usize,
}

struct PoolShared {
    admission: Mutex<Admission>,
    admitted: Condvar,
    /// Task bodies currently executing (excludes workers waiting at the
    /// gate and workers idle on the queue).
    running: AtomicUsize,
    shutdown: AtomicBool,
    pauses: AtomicU64,
    resumes: AtomicU64,
}

impl PoolShared {
    fn new() -> Self {
        Self {
            admission: Mutex::new(Admission {
                paused: false,
                waiting: 0,
            }),
            admitted: Condvar::new(),
            running: AtomicUsize::new(0),
            shutdown: AtomicBool::new(false),
            pauses: AtomicU64::new(0),
            resumes: AtomicU64::new(0),
        }
    }

    /// Blocks while the pool is paused; returns once admitted.
    fn acquire_admission(&self) {
        let mut gate = self.admission.lock().expect("admission mutex poisoned");
        while gate.paused && !self.shutdown.load(Ordering::Acquire) {
            gate.waiting += 1;
            gate = self.admitted.wait(gate).expect("admission mutex poisoned");
            gate.waiting -= 1;
        }
    }

    fn pause(&self) {
        let mut gate = self.admission.lock().expect("admission mutex poisoned");
        if !gate.paused {
            gate.paused = true;
            self.pauses.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn resume(&self) {
        let mut gate = self.admission.lock().expect("admission mutex poisoned");
        if gate.paused {
            gate.paused = false;
            self.resumes.fetch_add(1, Ordering::Relaxed);
            self.admitted.notify_all();
        }
    }

    fn is_paused(&self) -> bool {
        self.admission
            .lock()
            .expect("admission mutex poisoned")
            .paused
    }
}

/// Bounded executor whose task starts are gated on host memory.
pub struct AdaptiveWorkerPool {
    shared: Arc<PoolShared>,
    task_tx: Option<Sender<Task>>,
    workers: Vec<JoinHandle<()>>,
    monitor: Option<JoinHandle<()>>,
}

impl AdaptiveWorkerPool {
    /// Starts `config.workers` workers plus the memory monitor.
    ///
    /// `gate` is the chunk completion latch (initialized to
    /// `total_chunks`); the monitor reads it for progress and for the
    /// starvation resume condition.
    pub fn new(
        config: PoolConfig,
        memory: Arc<dyn MemoryStats>,
        gate: Arc<CountdownLatch>,
        progress: Arc<dyn ProgressRenderer>,
        total_chunks: u64,
    ) -> Self {
        let shared = Arc::new(PoolShared::new());
        let (task_tx, task_rx) = unbounded::<Task>();

        let workers = (0..config.workers.max(1))
            .map(|i| {
                let shared = Arc::clone(&shared);
                let task_rx: Receiver<Task> = task_rx.clone();
                thread::Builder::new()
                    .name(format!("ip-chunk-{i}"))
                    .spawn(move || worker_loop(&shared, &task_rx))
                    .expect("failed to spawn pool worker")
            })
            .collect();

        let monitor = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("ip-mem-monitor".to_string())
                .spawn(move || {
                    monitor_loop(
                        &shared,
                        memory.as_ref(),
                        &gate,
                        progress.as_ref(),
                        config.grab_percent,
                        config.poll_interval,
                        total_chunks,
                    )
                })
                .expect("failed to spawn memory monitor")
        };

        Self {
            shared,
            task_tx: Some(task_tx),
            workers,
            monitor: Some(monitor),
        }
    }

    /// Submits one task. Tasks start in submission order per worker but
    /// interleave across workers.
    ///
    /// # Panics
    ///
    /// Panics if called after [`join`](Self::join).
    pub fn submit(&self, task: Task) {
        self.task_tx
            .as_ref()
            .expect("pool already joined")
            .send(task)
            .expect("pool workers exited early");
    }

    /// Stops accepting tasks, runs the queue dry, and joins every
    /// worker and the monitor.
    pub fn join(&mut self) {
        // Shutdown bypasses the admission gate so a paused pool cannot
        // wedge the join; remaining queued tasks still run.
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.admitted.notify_all();
        self.task_tx.take(); // disconnects the queue once drained
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        if let Some(monitor) = self.monitor.take() {
            let _ = monitor.join();
        }
    }

    /// Task bodies currently executing.
    pub fn running_tasks(&self) -> usize {
        self.shared.running.load(Ordering::Relaxed)
    }

    pub fn is_paused(&self) -> bool {
        self.shared.is_paused()
    }

    pub fn events(&self) -> PoolEvents {
        PoolEvents {
            pauses: self.shared.pauses.load(Ordering::Relaxed),
            resumes: self.shared.resumes.load(Ordering::Relaxed),
        }
    }
}

impl Drop for AdaptiveWorkerPool {
    fn drop(&mut self) {
        if self.monitor.is_some() || !self.workers.is_empty() {
            self.join();
        }
    }
}

fn worker_loop(shared: &PoolShared, tasks: &Receiver<Task>) {
    while let Ok(task) = tasks.recv() {
        shared.acquire_admission();
        shared.running.fetch_add(1, Ordering::SeqCst);
        task();
        shared.running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Absolute pause threshold: the reserved share of currently free memory.
fn floor_bytes(free: u64, grab: GrabPercent) -> u64 {
    free / 100 * grab.floor_percent()
}

fn monitor_loop(
    shared: &PoolShared,
    memory: &dyn MemoryStats,
    gate: &CountdownLatch,
    progress: &dyn ProgressRenderer,
    grab: GrabPercent,
    poll_interval: Duration,
    total_chunks: u64,
) {
    let started = Instant::now();
    let mut floor = floor_bytes(memory.free(MemoryScope::Host), grab);

    loop {
        let outstanding = gate.count() as u64;
        let done = total_chunks.saturating_sub(outstanding);
        let free = memory.free(MemoryScope::Host);

        if !shared.is_paused() {
            if free < floor {
                shared.pause();
            }
        } else if shared.running.load(Ordering::SeqCst) == 0 && outstanding > 0 {
            // Fully starved with work left: everything in flight has
            // drained, so re-baseline the floor and let work resume.
            floor = floor_bytes(free, grab);
            shared.resume();
        }

        let elapsed = started.elapsed();
        let remaining = if done > 0 {
            Duration::from_secs_f64(elapsed.as_secs_f64() * outstanding as f64 / done as f64)
        } else {
            Duration::ZERO
        };
        if progress.render(done, total_chunks, elapsed, remaining) {
            break;
        }
        // Checked after the render so the final 100% line still gets
        // drawn when a completed pool is being joined.
        if shared.shutdown.load(Ordering::Acquire) {
            break;
        }

        thread::sleep(poll_interval);
    }
}
