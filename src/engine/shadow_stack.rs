//! In-process sampling engine over an instrumented shadow stack.
//!
//! Code that wants to be profiled announces its frames through a
//! `StackRecorder`: `enter` pushes a frame and returns a guard that pops it,
//! `set_line` moves the innermost frame to another source line. While a
//! session is active, a timer thread wakes up every interval, copies the
//! shadow stack and merges it into that session's `CallTreeBuilder`.

use super::call_tree::{CallTreeBuilder, Frame};
use super::{RawProfile, SamplingEngine};
use crate::utils::config::{DEFAULT_SAMPLING_INTERVAL_US, MIN_SAMPLER_PERIOD_US};
use crate::utils::error::EngineError;
use log::{debug, info, trace, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct StackEntry {
    frame: Frame,
    current_line: Option<i32>,
}

/// Shared shadow stack written by instrumented code and read by the sampler
#[derive(Debug, Clone, Default)]
pub struct StackRecorder {
    stack: Arc<Mutex<Vec<StackEntry>>>,
}

impl StackRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StackEntry>> {
        self.stack.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Push `frame` as the new innermost frame, executing its first line
    pub fn enter(&self, frame: Frame) -> FrameGuard {
        let current_line = (frame.line > 0).then_some(frame.line);
        let mut stack = self.lock();
        stack.push(StackEntry {
            frame,
            current_line,
        });
        FrameGuard {
            recorder: self.clone(),
            depth: stack.len(),
        }
    }

    /// Record that the innermost frame is now executing `line`
    pub fn set_line(&self, line: i32) {
        if let Some(top) = self.lock().last_mut() {
            top.current_line = Some(line);
        }
    }

    pub fn depth(&self) -> usize {
        self.lock().len()
    }

    /// Copy of the current stack (outermost first) and the innermost line
    fn capture(&self) -> (Vec<Frame>, Option<i32>) {
        let stack = self.lock();
        let frames = stack.iter().map(|entry| entry.frame.clone()).collect();
        let current_line = stack.last().and_then(|entry| entry.current_line);
        (frames, current_line)
    }
}

/// Pops its frame from the shadow stack when dropped
#[derive(Debug)]
pub struct FrameGuard {
    recorder: StackRecorder,
    depth: usize,
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        let mut stack = self.recorder.lock();
        // Frames are popped in LIFO order; anything deeper was leaked by a
        // forgotten guard and goes with this frame.
        stack.truncate(self.depth.saturating_sub(1));
    }
}

#[derive(Debug)]
struct ActiveSession {
    builder: Arc<Mutex<CallTreeBuilder>>,
    started_at: Instant,
    stop_requested: Arc<AtomicBool>,
    sampler: Option<JoinHandle<()>>,
}

impl ActiveSession {
    fn halt(&mut self, label: &str) {
        self.stop_requested.store(true, Ordering::Release);
        if let Some(handle) = self.sampler.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                warn!("Sampler thread for '{}' panicked", label);
            }
        }
    }
}

/// Shortest period the sampler thread runs at, whatever the configured interval
const MIN_SAMPLER_PERIOD: Duration = Duration::from_micros(MIN_SAMPLER_PERIOD_US);

type SessionTable = Arc<Mutex<HashMap<String, ActiveSession>>>;

fn lock_sessions(sessions: &SessionTable) -> MutexGuard<'_, HashMap<String, ActiveSession>> {
    sessions.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle that takes samples on demand, usable after the engine has been
/// handed to a `Profiler`
#[derive(Debug, Clone)]
pub struct SampleTrigger {
    recorder: StackRecorder,
    sessions: SessionTable,
}

impl SampleTrigger {
    /// Take one sample of the shadow stack into every active session
    pub fn sample_now(&self) {
        for session in lock_sessions(&self.sessions).values() {
            take_sample(&self.recorder, &session.builder, session.started_at);
        }
    }
}

/// `SamplingEngine` over a `StackRecorder`
#[derive(Debug)]
pub struct ShadowStackEngine {
    recorder: StackRecorder,
    interval: Duration,
    timer_enabled: bool,
    sessions: SessionTable,
}

impl ShadowStackEngine {
    /// Engine sampling `recorder` from a timer thread per session
    pub fn new(recorder: StackRecorder) -> Self {
        Self {
            recorder,
            interval: Duration::from_micros(u64::from(DEFAULT_SAMPLING_INTERVAL_US)),
            timer_enabled: true,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Engine without timer threads; samples are taken only by `sample_now`
    pub fn manual(recorder: StackRecorder) -> Self {
        let mut engine = Self::new(recorder);
        engine.timer_enabled = false;
        engine
    }

    pub fn recorder(&self) -> &StackRecorder {
        &self.recorder
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn trigger(&self) -> SampleTrigger {
        SampleTrigger {
            recorder: self.recorder.clone(),
            sessions: Arc::clone(&self.sessions),
        }
    }

    /// Take one sample of the shadow stack into every active session
    pub fn sample_now(&self) {
        self.trigger().sample_now();
    }

    fn spawn_sampler(
        &self,
        label: &str,
        builder: Arc<Mutex<CallTreeBuilder>>,
        started_at: Instant,
        stop_requested: Arc<AtomicBool>,
    ) -> Result<JoinHandle<()>, EngineError> {
        let recorder = self.recorder.clone();
        let interval = self.interval.max(MIN_SAMPLER_PERIOD);
        if interval > self.interval {
            debug!(
                "Sampling interval {:?} raised to {:?} for '{}'",
                self.interval, interval, label
            );
        }
        thread::Builder::new()
            .name(sampler_thread_name(label))
            .spawn(move || {
                sampler_main_loop(recorder, builder, started_at, interval, stop_requested)
            })
            .map_err(|e| EngineError::SamplerThread(e.to_string()))
    }
}

fn take_sample(recorder: &StackRecorder, builder: &Mutex<CallTreeBuilder>, started_at: Instant) {
    let (frames, current_line) = recorder.capture();
    let mut builder = builder.lock().unwrap_or_else(PoisonError::into_inner);
    builder.add_sample(&frames, current_line, started_at.elapsed());
}

fn sampler_main_loop(
    recorder: StackRecorder,
    builder: Arc<Mutex<CallTreeBuilder>>,
    started_at: Instant,
    interval: Duration,
    stop_requested: Arc<AtomicBool>,
) {
    trace!("Sampler thread started ({:?} interval)", interval);
    while !stop_requested.load(Ordering::Acquire) {
        take_sample(&recorder, &builder, started_at);

        // `halt` unparks us, so a stop never waits out a long interval
        let deadline = Instant::now() + interval;
        loop {
            if stop_requested.load(Ordering::Acquire) {
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::park_timeout(deadline - now);
        }
    }
    trace!("Sampler thread exiting");
}

/// Thread names cannot carry NUL bytes
fn sampler_thread_name(label: &str) -> String {
    format!("heatline-sampler-{}", label.replace('\0', ""))
}

impl SamplingEngine for ShadowStackEngine {
    fn set_interval(&mut self, micros: u32) {
        debug!("Sampling interval set to {}us", micros);
        self.interval = Duration::from_micros(u64::from(micros));
    }

    fn start_profiling(&mut self, label: &str, record_samples: bool) -> Result<(), EngineError> {
        if lock_sessions(&self.sessions).contains_key(label) {
            return Err(EngineError::DuplicateSession(label.to_string()));
        }

        let builder = Arc::new(Mutex::new(CallTreeBuilder::new(record_samples)));
        let started_at = Instant::now();
        let stop_requested = Arc::new(AtomicBool::new(false));

        let sampler = if self.timer_enabled {
            Some(self.spawn_sampler(
                label,
                Arc::clone(&builder),
                started_at,
                Arc::clone(&stop_requested),
            )?)
        } else {
            None
        };

        info!("Started profiling session '{}'", label);
        lock_sessions(&self.sessions).insert(
            label.to_string(),
            ActiveSession {
                builder,
                started_at,
                stop_requested,
                sampler,
            },
        );
        Ok(())
    }

    fn stop_profiling(&mut self, label: &str) -> Result<Box<dyn RawProfile>, EngineError> {
        let removed = lock_sessions(&self.sessions).remove(label);
        let mut session = removed.ok_or_else(|| EngineError::UnknownSession(label.to_string()))?;
        session.halt(label);

        let builder = std::mem::replace(
            &mut *session.builder.lock().unwrap_or_else(PoisonError::into_inner),
            CallTreeBuilder::new(false),
        );
        let tree = builder.finish();
        info!(
            "Stopped profiling session '{}' after {:?} ({} nodes)",
            label,
            session.started_at.elapsed(),
            tree.node_count()
        );
        Ok(Box::new(tree))
    }
}

impl Drop for ShadowStackEngine {
    fn drop(&mut self) {
        for (label, session) in lock_sessions(&self.sessions).iter_mut() {
            debug!("Abandoning profiling session '{}'", label);
            session.halt(label);
        }
    }
}
