use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::pipeline::ScanEvent;

/// Progress bar over the targets of one scan.
pub struct ScanProgress {
    bar: ProgressBar,
    failed_tools: usize,
}

impl ScanProgress {
    pub fn new(enabled: bool) -> Self {
        let bar = ProgressBar::new(0);
        if !enabled {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        bar.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.cyan} {bar:30.cyan/dark_gray} {pos}/{len} targets | {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Self { bar, failed_tools: 0 }
    }

    pub fn handle_event(&mut self, event: &ScanEvent) {
        match event {
            ScanEvent::ScanStarted { total_targets, .. } => {
                self.bar.set_length(*total_targets as u64);
                self.bar.enable_steady_tick(Duration::from_millis(120));
                self.bar.set_message("starting");
            }
            ScanEvent::TargetStarted { target_type, target_id, .. } => {
                self.bar.set_message(format!("{} {}", target_type, target_id));
            }
            ScanEvent::TargetCompleted { target_type, target_id, failed, .. } => {
                self.failed_tools += failed;
                if *failed > 0 {
                    self.bar.println(format!(
                        "  {} {} {} ({} tool(s) failed)",
                        style("!").yellow().bold(),
                        target_type,
                        target_id,
                        failed
                    ));
                } else {
                    self.bar.println(format!(
                        "  {} {} {}",
                        style("✓").green().bold(),
                        target_type,
                        target_id
                    ));
                }
                self.bar.inc(1);
            }
            ScanEvent::TargetFailed { target_type, target_id, error } => {
                self.failed_tools += 1;
                self.bar.println(format!(
                    "  {} {} {}: {}",
                    style("✗").red().bold(),
                    target_type,
                    target_id,
                    error
                ));
                self.bar.inc(1);
            }
            ScanEvent::ScanCompleted { .. } => self.finish(),
        }
    }

    pub fn finish(&self) {
        if self.bar.is_finished() {
            return;
        }
        let msg = if self.failed_tools == 0 {
            style("all tools succeeded").green().to_string()
        } else {
            style(format!("{} tool run(s) failed", self.failed_tools)).yellow().to_string()
        };
        self.bar.finish_with_message(msg);
    }
}
