//! Report Module
//!
//! Summary reporting for batch conversions

use crate::batch::BatchSummary;
use std::time::Duration;

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

pub fn print_summary_report(
    summary: &BatchSummary,
    errors: &[(String, String)],
    duration: Duration,
    input_bytes: u64,
    output_bytes: u64,
    operation_name: &str,
) {
    println!();
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║  📊 {:<48} ║", format!("{} Summary", operation_name));
    println!("╠══════════════════════════════════════════════════════╣");
    println!("║  📁 Files Processed:    {:>10}                   ║", summary.total);
    println!("║  ✅ Succeeded:          {:>10}                   ║", summary.succeeded);
    println!("║  ❌ Failed:             {:>10}                   ║", summary.failed);
    println!("║  ⏭️  Skipped:            {:>10}                   ║", summary.skipped);
    println!(
        "║  📈 Success Rate:       {:>9.1}%                   ║",
        summary.success_rate()
    );
    println!("╠══════════════════════════════════════════════════════╣");
    println!(
        "║  💾 Input Size:         {:>10}                   ║",
        format_bytes(input_bytes)
    );
    println!(
        "║  💾 Output Size:        {:>10}                   ║",
        format_bytes(output_bytes)
    );
    println!(
        "║  ⏱️  Total Time:         {:>10}                   ║",
        format_duration(duration)
    );
    println!("╚══════════════════════════════════════════════════════╝");

    if !errors.is_empty() {
        println!();
        println!("❌ Errors encountered:");
        for (name, error) in errors {
            println!("   {} → {}", name, error);
        }
    }
}
