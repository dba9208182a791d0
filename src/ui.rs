//! Terminal output: a spinner that follows one job, and colored summaries.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use jobflow::{Job, JobStatus, NotifyOutcome, Transition};

/// Follows a single job in the terminal.
///
/// Shows a spinner while the job runs and colored lines for completion
/// (green), failure (red) and webhook attempts (yellow).
pub struct JobProgress {
    pb: ProgressBar,
    task_name: String,
    green: Style,
    red: Style,
    yellow: Style,
}

impl JobProgress {
    pub fn start(task_name: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("PENDING: {task_name}"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            task_name: task_name.to_string(),
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    pub fn transition(&self, transition: &Transition) {
        self.pb.set_message(format!(
            "{}: {}",
            transition.to.as_str().to_uppercase(),
            self.task_name
        ));
    }

    pub fn notified(&self, outcome: &NotifyOutcome) {
        let line = match outcome {
            NotifyOutcome::Sent { status } => format!("webhook delivered ({status})"),
            NotifyOutcome::Disabled => "no webhook configured".to_string(),
            NotifyOutcome::Failed(reason) => format!("webhook failed: {reason}"),
        };
        self.pb
            .println(format!("  {} {line}", self.yellow.apply_to("↗")));
    }

    /// Stops the spinner and prints the final status.
    pub fn finish(&self, job: &Job) {
        self.pb.finish_and_clear();
        match job.status {
            JobStatus::Completed => {
                println!("  {} Job {} completed", self.green.apply_to("✓"), job.id);
            }
            JobStatus::Failed => {
                println!("  {} Job {} failed", self.red.apply_to("✗"), job.id);
            }
            other => println!("  Job {} is {other}", job.id),
        }
    }
}

/// Prints a job record as colored JSON.
pub fn print_job(job: &Job) {
    let style = match job.status {
        JobStatus::Completed => Style::new().green(),
        JobStatus::Failed => Style::new().red(),
        _ => Style::new().yellow(),
    };
    println!();
    println!("{}", style.apply_to(format!("─── Job {} ───", job.id)));
    println!("{}", serde_json::to_string_pretty(job).unwrap_or_default());
}

/// Prints one line per job: id, status, priority, task name.
pub fn print_table(jobs: &[Job]) {
    let dim = Style::new().dim();
    println!(
        "{}",
        dim.apply_to(format!("{:>4}  {:<10} {:<7} {}", "ID", "STATUS", "PRIORITY", "TASK"))
    );
    for job in jobs {
        println!(
            "{:>4}  {:<10} {:<7} {}",
            job.id.get(),
            job.status.as_str(),
            job.priority.as_str(),
            job.task_name
        );
    }
}
