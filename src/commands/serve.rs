//! Serve command implementation.
//!
//! The serve command:
//! 1. Configures a profiler over the shadow-stack engine
//! 2. Optionally keeps the built-in workload running in the background
//! 3. Serves the HTTP control routes until the process exits

use super::models::ServeArgs;
use super::workload::run_workload;
use crate::engine::{ShadowStackEngine, StackRecorder};
use crate::profiler::Profiler;
use crate::server::{ControlServer, ControlState};
use crate::utils::config::ProfilerOptions;
use anyhow::{Context, Result};
use log::info;
use std::thread;

/// Execute the serve command
///
/// # Errors
/// * Invalid sampling interval
/// * Address already in use
pub fn execute_serve(args: ServeArgs) -> Result<()> {
    // Step 1: Configure profiler
    info!("Step 1/3: Configuring profiler ({}us interval)...", args.interval_us);
    let recorder = StackRecorder::new();
    let options = ProfilerOptions::new().with_sampling_interval(args.interval_us);
    let profiler = Profiler::with_options(ShadowStackEngine::new(recorder.clone()), &options)
        .context("Failed to configure profiler")?;

    let server = ControlServer::bind(
        (args.host.as_str(), args.port),
        ControlState::new(profiler, args.label.as_str()),
    )
    .with_context(|| format!("Failed to bind control server on {}:{}", args.host, args.port))?;

    // Step 2: Background workload
    if args.workload {
        info!("Step 2/3: Starting background workload...");
        let rounds = args.rounds;
        thread::Builder::new()
            .name("heatline-workload".to_string())
            .spawn(move || loop {
                run_workload(&recorder, 1, rounds, &|| {});
            })
            .context("Failed to start workload thread")?;
    } else {
        info!("Step 2/3: No background workload (not requested)");
    }

    // Step 3: Serve
    info!(
        "Step 3/3: Serving on http://{} (GET /info, POST /start, POST /stop)",
        server.local_addr()
    );
    server.serve().context("Control server failed")?;

    Ok(())
}

/// Validate serve arguments
pub fn validate_serve_args(args: &ServeArgs) -> Result<()> {
    if args.label.trim().is_empty() {
        anyhow::bail!("Session label cannot be empty");
    }

    if args.interval_us < 0 || args.interval_us > i64::from(u32::MAX) {
        anyhow::bail!("Sampling interval must be between 0 and {} microseconds", u32::MAX);
    }

    if args.workload && args.rounds == 0 {
        anyhow::bail!("rounds must be greater than 0");
    }

    Ok(())
}
