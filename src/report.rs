use std::fmt::Write;
use std::path::Path;

use crate::aggregate::FatalityBucket;
use crate::models::{DayStateTally, RunSummary};

pub fn build_report(
    input: &Path,
    summary: &RunSummary,
    buckets: &[FatalityBucket],
    tally: &DayStateTally,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Case Pipeline Report");
    let _ = writeln!(output, "Generated from {}", input.display());
    let _ = writeln!(output);
    let _ = writeln!(output, "## Stages");
    let _ = writeln!(output, "- delimiters normalized: {} rows", summary.raw_rows);
    let _ = writeln!(output, "- columns reconciled: {} rows", summary.reconciled_rows);
    let _ = writeln!(
        output,
        "- dates normalized: {} rows across {} days",
        summary.normalized_rows, summary.days
    );
    let _ = writeln!(output, "- patients resolved: {}", summary.patients);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Fatality by Age");

    if buckets.is_empty() {
        let _ = writeln!(output, "No patients resolved.");
    } else {
        for bucket in buckets {
            let _ = writeln!(
                output,
                "- age {}: {} deaths, {} recoveries (ratio {:.2})",
                bucket.age,
                bucket.deaths,
                bucket.recoveries,
                bucket.ratio()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily States");

    if tally.is_empty() {
        let _ = writeln!(output, "No observations recorded.");
    } else {
        for (day, counts) in tally.iter() {
            let _ = writeln!(
                output,
                "- day {}: {} infected, {} dead, {} recovered",
                day, counts.infected, counts.dead, counts.recovered
            );
        }
    }

    output
}
