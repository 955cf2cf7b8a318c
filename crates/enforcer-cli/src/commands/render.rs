//! Human-readable and JSON rendering of reports

use colored::Colorize;
use enforcer_core::{
    Mode, Outcome, ReconciliationReport, StageKind, StageResult, StageStatus, TargetDescriptor,
};

use crate::error::Result;

pub fn render_header(action: &str, target: &TargetDescriptor) -> String {
    format!(
        "{} {} {} (service {})",
        "=>".blue().bold(),
        action,
        target.gui_executable.cyan(),
        target.service_name.cyan()
    )
}

/// Status labels are padded before coloring so columns line up with escapes
fn pad(label: &str) -> String {
    format!("{label:<10}")
}

fn render_stage(result: &StageResult) -> String {
    let label = match &result.status {
        StageStatus::Healthy if result.remediated => pad("FIXED").yellow().bold(),
        StageStatus::Healthy => pad("OK").green().bold(),
        StageStatus::Unhealthy => pad("UNHEALTHY").red().bold(),
        StageStatus::RelaunchRequired => pad("ELEVATE").yellow().bold(),
        StageStatus::Failed(_) => pad("FAILED").red().bold(),
    };
    let mut line = format!("   {} {}", label, result.stage);
    if result.remediated {
        line.push_str(&format!(" ({} attempts)", result.attempts).dimmed().to_string());
    }
    if let Some(failure) = result.failure() {
        line.push_str(&format!("\n   {} {}", pad(""), failure));
    }
    line
}

/// Render a report as the lines printed to the console
pub fn render_report(report: &ReconciliationReport) -> String {
    let mut lines: Vec<String> = report.results.iter().map(render_stage).collect();

    for stage in report.not_reached() {
        lines.push(format!("   {} {}", pad("-").dimmed(), stage.to_string().dimmed()));
    }
    for stage in &report.skipped {
        lines.push(format!("   {} {}", pad("SKIPPED").dimmed(), stage.to_string().dimmed()));
    }

    lines.push(String::new());
    lines.push(render_summary(report));
    lines.join("\n")
}

fn render_summary(report: &ReconciliationReport) -> String {
    match (report.outcome, report.mode) {
        (Outcome::Healthy, Mode::Reconcile) => {
            let fixed = report.remediations();
            if fixed == 0 {
                format!("{} All stages healthy.", "OK".green().bold())
            } else {
                format!("{} All stages healthy ({} repaired).", "OK".green().bold(), fixed)
            }
        }
        (Outcome::Healthy, Mode::Check) => {
            format!("{} All stages healthy. Nothing to repair.", "OK".green().bold())
        }
        (Outcome::ElevationRequired, _) => format!(
            "{} Administrator rights are required.",
            "ELEVATE".yellow().bold()
        ),
        (Outcome::Unhealthy { stage }, _) => format!(
            "{} {} is not healthy. Run {} to repair.",
            "UNHEALTHY".red().bold(),
            stage,
            "enforcer run".cyan()
        ),
        (Outcome::Failed { stage }, _) => failed_summary(stage),
    }
}

fn failed_summary(stage: StageKind) -> String {
    format!("{} Stopped at the {} stage.", "FAILED".red().bold(), stage)
}

/// Print `report` to stdout, as JSON when requested
pub fn print_report(report: &ReconciliationReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{}", render_report(report));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use enforcer_core::{Collaborators, PollPolicy, ReconciliationEngine};
    use enforcer_sys::{CommandOutput, StartType};
    use enforcer_test_utils::{
        FakeCommandRunner, FakeElevation, FakeFs, FakeProcessTable, FakeServiceManager,
    };
    use std::time::Duration;

    fn report_for(
        fs: &FakeFs,
        services: &FakeServiceManager,
        check: bool,
    ) -> ReconciliationReport {
        let target = TargetDescriptor::default();
        let elevation = FakeElevation::elevated();
        let processes = FakeProcessTable::new().with_running(&target.gui_executable);
        let commands = FakeCommandRunner::new()
            .respond("warp-cli status", CommandOutput::ok("Status update: Connected"));
        let engine = ReconciliationEngine::new(
            target,
            Collaborators {
                elevation: &elevation,
                fs,
                processes: &processes,
                services,
                commands: &commands,
            },
        )
        .with_policy(PollPolicy::new(Duration::ZERO, 3));
        if check { engine.check() } else { engine.run() }
    }

    fn installed() -> FakeFs {
        let target = TargetDescriptor::default();
        FakeFs::installed(
            &target.install_dir,
            &[&target.gui_executable, &target.service_executable],
        )
    }

    #[test]
    fn test_render_healthy_run() {
        colored::control::set_override(false);
        let services = FakeServiceManager::new("CloudflareWARP");

        let text = render_report(&report_for(&installed(), &services, false));

        assert!(text.contains("OK         privilege"));
        assert!(text.contains("OK         connectivity"));
        assert!(text.ends_with("All stages healthy."));
    }

    #[test]
    fn test_render_repaired_stage() {
        colored::control::set_override(false);
        let services =
            FakeServiceManager::new("CloudflareWARP").with_start_type(StartType::Manual);

        let text = render_report(&report_for(&installed(), &services, false));

        assert!(text.contains("FIXED      service auto-start (2 attempts)"));
        assert!(text.contains("(1 repaired)"));
    }

    #[test]
    fn test_render_missing_install() {
        colored::control::set_override(false);
        let services = FakeServiceManager::new("CloudflareWARP");

        let text = render_report(&report_for(&FakeFs::new(), &services, false));

        assert!(text.contains("FAILED     installation"));
        assert!(text.contains("winget install Cloudflare.Warp"));
        assert!(text.contains("-          connectivity"));
        assert!(text.contains("Stopped at the installation stage."));
    }

    #[test]
    fn test_render_check_unhealthy() {
        colored::control::set_override(false);
        let services =
            FakeServiceManager::new("CloudflareWARP").with_start_type(StartType::Manual);

        let text = render_report(&report_for(&installed(), &services, true));

        assert!(text.contains("UNHEALTHY  service auto-start"));
        assert!(text.contains("Run enforcer run to repair."));
    }
}
