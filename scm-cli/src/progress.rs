use indicatif::{ProgressBar, ProgressStyle};
use scm_catalog::{OnSyncEvent, Outcome, SyncEvent};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn stage_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} {prefix:<16} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}\n  {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

#[derive(Debug, Default)]
struct StageState {
    bar: Option<ProgressBar>,
    reused: u64,
    failed: u64,
}

/// Renders synchronization events as one progress bar per stage.
#[derive(Clone)]
pub struct ProgressManager {
    state: Arc<Mutex<StageState>>,
    disabled: bool,
}

impl ProgressManager {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(StageState::default())),
            disabled: false,
        }
    }

    pub fn disabled() -> Self {
        Self {
            state: Arc::new(Mutex::new(StageState::default())),
            disabled: true,
        }
    }

    pub fn callback(&self) -> OnSyncEvent {
        let manager = self.clone();
        Arc::new(move |event: SyncEvent| manager.handle_event(event))
    }

    pub fn handle_event(&self, event: SyncEvent) {
        if self.disabled {
            return;
        }

        let Ok(mut state) = self.state.lock() else {
            return;
        };
        match event {
            SyncEvent::StageStarted { stage, total } => {
                let bar = ProgressBar::new(total);
                bar.set_style(stage_style());
                bar.set_prefix(stage.to_string());
                bar.enable_steady_tick(Duration::from_millis(200));
                *state = StageState {
                    bar: Some(bar),
                    ..Default::default()
                };
            }
            SyncEvent::Resolved { label, outcome, .. } => {
                match outcome {
                    Outcome::Reused => state.reused += 1,
                    Outcome::Failed => state.failed += 1,
                    Outcome::Fetched => {}
                }
                if let Some(bar) = &state.bar {
                    bar.set_message(format!("-> {label}"));
                    bar.inc(1);
                }
            }
            SyncEvent::StageFinished { .. } => {
                if let Some(bar) = state.bar.take() {
                    let mut summary = format!("done, {} cached", state.reused);
                    if state.failed > 0 {
                        summary.push_str(&format!(", {} failed", state.failed));
                    }
                    bar.finish_with_message(summary);
                }
            }
        }
    }

    pub fn finish(&self, message: &str) {
        if self.disabled {
            return;
        }
        if let Ok(mut state) = self.state.lock()
            && let Some(bar) = state.bar.take()
        {
            bar.abandon_with_message(message.to_string());
        }
    }
}
