//! Profiler controller, snapshots and node views.
//!
//! This module handles:
//! - Driving a `SamplingEngine` through labelled sessions
//! - Wrapping finished captures into `ProfileSnapshot`s
//! - Read-only traversal of a snapshot through `ProfileNode` views

pub mod node;
pub mod snapshot;

// Re-export main types
pub use node::ProfileNode;
pub use snapshot::{ProfileSample, ProfileSnapshot};

use crate::engine::SamplingEngine;
use crate::utils::config::{ProfilerOptions, DEFAULT_SAMPLING_INTERVAL_US};
use crate::utils::error::ProfilerError;
use log::{debug, info};

/// Owns the sampling engine and mediates session control
pub struct Profiler {
    engine: Option<Box<dyn SamplingEngine>>,
    sampling_interval: u32,
    record_samples: bool,
    active_labels: Vec<String>,
}

impl Profiler {
    pub fn new(engine: impl SamplingEngine + 'static) -> Self {
        Self {
            engine: Some(Box::new(engine)),
            sampling_interval: DEFAULT_SAMPLING_INTERVAL_US,
            record_samples: true,
            active_labels: Vec::new(),
        }
    }

    /// Create a profiler and apply `options` to its engine
    ///
    /// # Errors
    /// * `ProfilerError::InvalidArgument` - sampling interval out of range
    pub fn with_options(
        engine: impl SamplingEngine + 'static,
        options: &ProfilerOptions,
    ) -> Result<Self, ProfilerError> {
        let mut profiler = Self::new(engine);
        if let Some(interval) = options.sampling_interval {
            profiler.set_sampling_interval(interval)?;
        }
        Ok(profiler)
    }

    fn engine_mut(&mut self) -> Result<&mut Box<dyn SamplingEngine>, ProfilerError> {
        self.engine.as_mut().ok_or(ProfilerError::EngineUnavailable)
    }

    /// Set the engine's tick granularity in microseconds.
    ///
    /// Applies to sessions started afterwards.
    ///
    /// # Errors
    /// * `ProfilerError::InvalidArgument` - negative or larger than `u32::MAX`
    /// * `ProfilerError::EngineUnavailable` - after `shutdown`
    pub fn set_sampling_interval(&mut self, micros: i64) -> Result<(), ProfilerError> {
        let micros = u32::try_from(micros).map_err(|_| {
            ProfilerError::InvalidArgument(format!(
                "sampling interval must be between 0 and {} microseconds, got {}",
                u32::MAX,
                micros
            ))
        })?;

        self.engine_mut()?.set_interval(micros);
        self.sampling_interval = micros;
        Ok(())
    }

    pub fn sampling_interval(&self) -> u32 {
        self.sampling_interval
    }

    /// Whether engines should keep a per-sample timeline (on by default)
    pub fn set_record_samples(&mut self, record_samples: bool) {
        self.record_samples = record_samples;
    }

    /// Begin accumulating samples under `label`
    ///
    /// # Errors
    /// * `ProfilerError::EngineUnavailable` - after `shutdown`
    /// * `ProfilerError::SessionAlreadyActive` - `label` is already running
    pub fn start(&mut self, label: &str) -> Result<(), ProfilerError> {
        let record_samples = self.record_samples;
        if self.engine.is_none() {
            return Err(ProfilerError::EngineUnavailable);
        }
        if self.active_labels.iter().any(|active| active == label) {
            return Err(ProfilerError::SessionAlreadyActive(label.to_string()));
        }

        self.engine_mut()?.start_profiling(label, record_samples)?;
        self.active_labels.push(label.to_string());
        info!("Profiling started ('{}', {}us interval)", label, self.sampling_interval);
        Ok(())
    }

    /// End the session started under `label` and take ownership of its tree
    ///
    /// # Errors
    /// * `ProfilerError::EngineUnavailable` - after `shutdown`
    /// * `ProfilerError::NoActiveSession` - nothing is running
    /// * `ProfilerError::LabelMismatch` - other sessions run, but not `label`
    pub fn stop(&mut self, label: &str) -> Result<ProfileSnapshot, ProfilerError> {
        if self.engine.is_none() {
            return Err(ProfilerError::EngineUnavailable);
        }
        let Some(position) = self.active_labels.iter().position(|active| active == label) else {
            if self.active_labels.is_empty() {
                return Err(ProfilerError::NoActiveSession(label.to_string()));
            }
            return Err(ProfilerError::LabelMismatch {
                requested: label.to_string(),
                active: self.active_labels.clone(),
            });
        };
        self.active_labels.remove(position);

        let raw = self.engine_mut()?.stop_profiling(label)?;
        info!("Profiling stopped ('{}')", label);
        Ok(ProfileSnapshot::new(label, raw))
    }

    pub fn is_running(&self) -> bool {
        !self.active_labels.is_empty()
    }

    pub fn active_labels(&self) -> &[String] {
        &self.active_labels
    }

    /// Tear the engine down; unfinished sessions are abandoned
    ///
    /// # Errors
    /// * `ProfilerError::EngineUnavailable` - already shut down
    pub fn shutdown(&mut self) -> Result<(), ProfilerError> {
        let engine = self.engine.take().ok_or(ProfilerError::EngineUnavailable)?;
        debug!(
            "Shutting down sampling engine ({} sessions abandoned)",
            self.active_labels.len()
        );
        self.active_labels.clear();
        drop(engine);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ShadowStackEngine, StackRecorder};

    fn profiler() -> Profiler {
        Profiler::new(ShadowStackEngine::manual(StackRecorder::new()))
    }

    #[test]
    fn test_sampling_interval_validation() {
        let mut profiler = profiler();
        assert_eq!(profiler.sampling_interval(), DEFAULT_SAMPLING_INTERVAL_US);

        profiler.set_sampling_interval(250).unwrap();
        profiler.set_sampling_interval(250).unwrap();
        assert_eq!(profiler.sampling_interval(), 250);

        assert!(matches!(
            profiler.set_sampling_interval(-1),
            Err(ProfilerError::InvalidArgument(_))
        ));
        assert!(matches!(
            profiler.set_sampling_interval(i64::from(u32::MAX) + 1),
            Err(ProfilerError::InvalidArgument(_))
        ));
        assert_eq!(profiler.sampling_interval(), 250);
    }

    #[test]
    fn test_with_options() {
        let options = ProfilerOptions::new().with_sampling_interval(500);
        let profiler =
            Profiler::with_options(ShadowStackEngine::manual(StackRecorder::new()), &options)
                .unwrap();
        assert_eq!(profiler.sampling_interval(), 500);

        let bad = ProfilerOptions::new().with_sampling_interval(-5);
        assert!(
            Profiler::with_options(ShadowStackEngine::manual(StackRecorder::new()), &bad).is_err()
        );
    }

    #[test]
    fn test_stop_without_start() {
        let mut profiler = profiler();
        assert_eq!(
            profiler.stop("heatline").unwrap_err(),
            ProfilerError::NoActiveSession("heatline".to_string())
        );
    }

    #[test]
    fn test_stop_with_other_label() {
        let mut profiler = profiler();
        profiler.start("b").unwrap();

        assert_eq!(
            profiler.stop("a").unwrap_err(),
            ProfilerError::LabelMismatch {
                requested: "a".to_string(),
                active: vec!["b".to_string()],
            }
        );
        assert!(profiler.is_running());
    }

    #[test]
    fn test_double_start() {
        let mut profiler = profiler();
        profiler.start("a").unwrap();
        assert_eq!(
            profiler.start("a"),
            Err(ProfilerError::SessionAlreadyActive("a".to_string()))
        );
    }

    #[test]
    fn test_shutdown() {
        let mut profiler = profiler();
        profiler.start("a").unwrap();
        profiler.shutdown().unwrap();

        assert!(!profiler.is_running());
        assert_eq!(profiler.start("a"), Err(ProfilerError::EngineUnavailable));
        assert_eq!(profiler.stop("a").unwrap_err(), ProfilerError::EngineUnavailable);
        assert_eq!(
            profiler.set_sampling_interval(10),
            Err(ProfilerError::EngineUnavailable)
        );
        assert_eq!(profiler.shutdown(), Err(ProfilerError::EngineUnavailable));
    }

    #[test]
    fn test_zero_length_session() {
        let mut profiler = profiler();
        profiler.start("short").unwrap();
        let snapshot = profiler.stop("short").unwrap();

        let top = snapshot.top().unwrap();
        assert_eq!(top.hit_count().unwrap(), 0);
        assert!(top.children().unwrap().is_empty());
        assert_eq!(snapshot.label(), "short");
    }
}
