use crate::cli::OutputFormat;
use crate::core::types::YieldReport;
use crate::demux::pipeline::{LibraryReport, LibraryWarning, ManifestReport};

/// Print a manifest report in the requested format
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn print_manifest_report(
    report: &ManifestReport,
    format: OutputFormat,
    verbose: bool,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => print_text(report, verbose),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Tsv => print_tsv(report),
    }
    Ok(())
}

fn print_text(report: &ManifestReport, verbose: bool) {
    for library in &report.libraries {
        println!("Library {}", library.library);
        if library.skipped() {
            println!("   Selected: none");
        } else {
            println!("   Selected: {}", library.selected.join(", "));
        }

        if let Some(detection) = &library.detection {
            println!("   Detection ({} read pairs sampled):", detection.processed);
            print_yields(detection, &library.selected);
        }

        if let Some(run) = &library.run {
            println!(
                "   Run: {} read pairs, {} rejected records",
                run.processed, run.rejected
            );
            print_yields(run, &library.selected);
            if run.reject_failures > 0 {
                println!("   {} rejected pairs could not be formatted", run.reject_failures);
            }
        }

        for warning in &library.warnings {
            match warning {
                LibraryWarning::NoStrategySelected => {
                    println!("   Warning: no strategy selected, library skipped");
                }
            }
        }
        println!();
    }

    if verbose && !report.construction_failures.is_empty() {
        println!("Unavailable strategies:");
        for failure in &report.construction_failures {
            println!("   {}: {}", failure.short_name, failure.reason);
        }
    }
}

fn print_yields(report: &YieldReport, selected: &[String]) {
    for entry in report.ranked() {
        let marker = if selected.contains(&entry.strategy) {
            "*"
        } else {
            " "
        };
        let defects = if entry.defects > 0 {
            format!("  ({} defects)", entry.defects)
        } else {
            String::new()
        };
        println!(
            "   {marker} {:<16} {:>10} {:>7.2}%{defects}",
            entry.strategy,
            entry.successes,
            report.percent(&entry.strategy)
        );
    }
}

fn print_tsv(report: &ManifestReport) {
    println!("library\tphase\tstrategy\tprocessed\tsuccesses\tdefects\tpercent\tselected");
    for library in &report.libraries {
        if let Some(detection) = &library.detection {
            print_tsv_rows(library, "detect", detection);
        }
        if let Some(run) = &library.run {
            print_tsv_rows(library, "run", run);
        }
        if library.detection.is_none() && library.run.is_none() {
            for strategy in &library.selected {
                println!("{}\tplan\t{}\t0\t0\t0\t0.0000\ttrue", library.library, strategy);
            }
        }
    }
}

fn print_tsv_rows(library: &LibraryReport, phase: &str, report: &YieldReport) {
    for entry in report.entries() {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{:.4}\t{}",
            library.library,
            phase,
            entry.strategy,
            report.processed,
            entry.successes,
            entry.defects,
            report.percent(&entry.strategy),
            library.selected.contains(&entry.strategy)
        );
    }
}
