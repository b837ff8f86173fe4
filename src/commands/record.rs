//! Record command implementation.
//!
//! The record command:
//! 1. Configures a profiler over the shadow-stack engine
//! 2. Runs the built-in workload between start and stop
//! 3. Walks the snapshot into a report
//! 4. Generates flamegraph
//! 5. Writes output files

use super::models::RecordArgs;
use super::workload::run_workload;
use crate::engine::{ShadowStackEngine, StackRecorder};
use crate::flamegraph::{generate_flamegraph, generate_text_summary};
use crate::profiler::Profiler;
use crate::report::{build_collapsed_stacks, build_report, write_report, write_svg, ProfileReport};
use anyhow::{Context, Result};
use log::{debug, info};
use std::time::Instant;

/// Execute the record command
///
/// # Returns
/// The report that was written
///
/// # Errors
/// * Invalid sampling interval
/// * Profiler session failures
/// * File write errors
pub fn execute_record(args: RecordArgs) -> Result<ProfileReport> {
    let start_time = Instant::now();

    info!("Recording session '{}'", args.label);

    // Step 1: Configure profiler
    info!("Step 1/5: Configuring profiler ({}us interval)...", args.interval_us);
    let recorder = StackRecorder::new();
    let mut profiler = Profiler::new(ShadowStackEngine::new(recorder.clone()));
    profiler
        .set_sampling_interval(args.interval_us)
        .context("Failed to set sampling interval")?;

    // Step 2: Run the workload
    info!("Step 2/5: Running workload ({} iterations)...", args.iterations);
    profiler.start(&args.label).context("Failed to start profiling")?;
    let checksum = run_workload(&recorder, args.iterations, args.rounds, &|| {});
    let snapshot = profiler.stop(&args.label).context("Failed to stop profiling")?;
    debug!("Workload checksum: {:#x}", checksum);

    // Step 3: Walk snapshot
    info!("Step 3/5: Walking call tree...");
    let report = build_report(&snapshot, profiler.sampling_interval(), args.top_paths)
        .context("Failed to walk profile snapshot")?;
    snapshot.release().context("Failed to release profile snapshot")?;

    let stacks = build_collapsed_stacks(&report.root);
    debug!("Built {} unique stacks from {} hits", stacks.len(), report.total_hits);

    // Step 4: Generate flamegraph (if requested)
    let svg_content = if args.output_svg.is_some() {
        info!("Step 4/5: Generating flamegraph...");
        let svg = generate_flamegraph(&stacks, args.flamegraph_config.as_ref())
            .context("Failed to generate flamegraph")?;
        Some(svg)
    } else {
        info!("Step 4/5: Skipping flamegraph generation (not requested)");
        None
    };

    // Step 5: Write outputs
    info!("Step 5/5: Writing output files...");
    write_report(&report, &args.output_json).context("Failed to write report JSON")?;
    info!("Report written to: {}", args.output_json.display());

    if let (Some(svg), Some(svg_path)) = (svg_content, &args.output_svg) {
        write_svg(&svg, svg_path).context("Failed to write flamegraph SVG")?;
        info!("Flamegraph written to: {}", svg_path.display());
    }

    if args.print_summary {
        println!("\n{}", "=".repeat(76));
        println!("PROFILE SUMMARY");
        println!("{}", "=".repeat(76));
        println!("Label:         {}", report.label);
        println!("Interval:      {}us", report.sampling_interval_us);
        println!("Total Samples: {}", report.total_hits);
        println!("Tree Nodes:    {}", report.root.node_count());
        println!("\n{}", generate_text_summary(&stacks, 10, report.total_hits));
        println!("{}", "=".repeat(76));
    }

    info!("Record completed in {:.2}s", start_time.elapsed().as_secs_f64());

    Ok(report)
}

/// Validate record arguments
///
/// **Public** - can be called before execute_record for early validation
pub fn validate_args(args: &RecordArgs) -> Result<()> {
    if args.label.trim().is_empty() {
        anyhow::bail!("Session label cannot be empty");
    }

    if args.interval_us < 0 || args.interval_us > i64::from(u32::MAX) {
        anyhow::bail!("Sampling interval must be between 0 and {} microseconds", u32::MAX);
    }

    if args.iterations == 0 {
        anyhow::bail!("iterations must be greater than 0");
    }

    if args.top_paths == 0 {
        anyhow::bail!("top_paths must be greater than 0");
    }

    if args.top_paths > 1000 {
        anyhow::bail!("top_paths is too large (max 1000)");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_args_valid() {
        assert!(validate_args(&RecordArgs::default()).is_ok());
    }

    #[test]
    fn test_validate_args_empty_label() {
        let args = RecordArgs {
            label: "  ".to_string(),
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_negative_interval() {
        let args = RecordArgs {
            interval_us: -1,
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_zero_iterations() {
        let args = RecordArgs {
            iterations: 0,
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_top_paths() {
        let zero = RecordArgs {
            top_paths: 0,
            ..Default::default()
        };
        let huge = RecordArgs {
            top_paths: 2000,
            ..Default::default()
        };
        assert!(validate_args(&zero).is_err());
        assert!(validate_args(&huge).is_err());
    }

    #[test]
    fn test_execute_record_writes_report() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output_json = temp_dir.path().join("profile.json");
        let args = RecordArgs {
            label: "record-test".to_string(),
            interval_us: 100,
            iterations: 2,
            rounds: 1_000,
            output_json: output_json.clone(),
            ..Default::default()
        };

        let report = execute_record(args).unwrap();

        assert_eq!(report.label, "record-test");
        assert_eq!(report.sampling_interval_us, 100);
        assert_eq!(report.total_hits, report.root.total_hits());
        assert!(output_json.exists());
    }
}
