use crate::report::read_report;
use crate::utils::config::REPORT_SCHEMA_VERSION;
use anyhow::Result;
use std::path::PathBuf;

/// Validate a report JSON file
pub fn validate_report_file(file_path: PathBuf) -> Result<()> {
    println!("Validating report: {}", file_path.display());

    let report = read_report(&file_path)?;

    let tree_hits = report.root.total_hits();
    if tree_hits != report.total_hits {
        anyhow::bail!(
            "Report total_hits ({}) does not match the call tree ({})",
            report.total_hits,
            tree_hits
        );
    }

    println!("✓ Valid report JSON");
    println!("  Version: {}", report.version);
    println!("  Label: {}", report.label);
    println!("  Interval: {}us", report.sampling_interval_us);
    println!("  Total Samples: {}", report.total_hits);
    println!("  Tree Nodes: {}", report.root.node_count());
    println!("  Hot Paths: {}", report.hot_paths.len());

    Ok(())
}

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("heatline Report Schema");
    println!("Current Version: {}", REPORT_SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Schema Structure:");
        println!("  version: string              - Schema version (e.g., '1.0.0')");
        println!("  label: string                - Profiling session label");
        println!("  sampling_interval_us: number - Sampling interval in microseconds");
        println!("  total_hits: number           - Samples across the whole tree");
        println!("  hot_paths: array             - Hottest call paths");
        println!("    stack: string              - Collapsed stack");
        println!("    hits: number               - Self samples of the innermost frame");
        println!("    percentage: number         - Percentage of total samples");
        println!("  root: object                 - Call tree node");
        println!("    name: string               - Function name");
        println!("    resourceName: string       - Script or resource");
        println!("    line, column: number       - Source position (-1 if unknown)");
        println!("    hits: number               - Self samples");
        println!("    hitLines: array            - {{ line, hitCount }} per sampled line");
        println!("    children: array            - Callee nodes");
        println!("  generated_at: string         - RFC 3339 timestamp");
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("heatline v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", REPORT_SCHEMA_VERSION);
    println!();
    println!("A sampling CPU profiler with per-line hit statistics.");
}
