use colored::Colorize;
use provdir_export::{DeliveryOutcome, ExportReport, UploadOutcome};

pub fn print_report(report: &ExportReport) {
    let marker = match report.outcome() {
        None => "-".dimmed(),
        Some(DeliveryOutcome::Failed { .. }) => "✗".red(),
        Some(DeliveryOutcome::Archived {
            upload: UploadOutcome::Failed { .. },
            ..
        }) => "!".yellow(),
        Some(_) => "✓".green(),
    };
    println!("{marker} {report}");
}

pub fn print_setting(key: &str, value: Option<&str>) {
    println!("{} = {}", key.cyan(), value.unwrap_or("(table)"));
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}
