use std::fmt::Write;

use console::Style;

use crate::step::Report;
use crate::step::StepRecord;
use crate::step::StepStatus;

pub struct OutPutter;

fn render_step(out: &mut String, step: &StepRecord, depth: usize) {
    let indent = "  ".repeat(depth + 1);

    let _ = match step.status {
        StepStatus::Passed => writeln!(
            out,
            "{indent}{} {}",
            console::style("✔").green().bold(),
            step.name
        ),
        StepStatus::Failed => writeln!(
            out,
            "{indent}{} {}",
            console::style("✘").red().bold(),
            console::style(&step.name).red()
        ),
    };

    if let Some(failure) = &step.failure {
        let _ = writeln!(
            out,
            "{indent}  {} {}",
            console::style(format!("{}:", failure.kind)).red().bold(),
            failure.message
        );
    }

    for child in &step.children {
        render_step(out, child, depth + 1);
    }
}

impl OutPutter {
    /// Renders one report as an indented step tree.
    pub fn render(report: &Report) -> String {
        let mut out = String::new();

        let mark = if report.passed() {
            console::style("✔").green().bold()
        } else {
            console::style("╳").red().bold()
        };
        let _ = writeln!(out, "{mark}  {}", report.name());

        for step in report.steps() {
            render_step(&mut out, &step, 0);
        }

        out
    }

    pub fn start(reports: &[Report], config_path: &str) {
        let n_tests = reports.len();
        let style = Style::new().bold().cyan();
        let open_text = format!("Running suite: {config_path} Found {n_tests} scenarios");
        println!("{}", style.apply_to(open_text));

        let mut failed: Vec<&Report> = vec![];
        for (i, report) in reports.iter().enumerate() {
            print!("[{}/{n_tests}] {}", i + 1, Self::render(report));
            if !report.passed() {
                failed.push(report);
            }
        }

        if failed.is_empty() {
            println!();
            println!("{}", console::style("All scenarios passed! 🎉").bold().green());
            return;
        }

        println!();
        println!(
            "{}",
            console::style("Summary of Failed Scenarios:").bold().red()
        );
        for (idx, report) in failed.iter().enumerate() {
            let path = report.failed_step_path().join(" › ");
            let failure = report
                .steps()
                .into_iter()
                .find(|s| s.status == StepStatus::Failed)
                .and_then(|s| deepest_failure(&s));
            println!("\n{}. {} [{}]", idx + 1, report.name(), path);
            if let Some((kind, message)) = failure {
                println!("   {} {}", console::style(kind).red().bold(), message);
            }
        }
    }
}

fn deepest_failure(step: &StepRecord) -> Option<(String, String)> {
    step.children
        .iter()
        .find(|c| c.status == StepStatus::Failed)
        .and_then(deepest_failure)
        .or_else(|| {
            step.failure
                .as_ref()
                .map(|f| (f.kind.clone(), f.message.clone()))
        })
}
