use beamenv::engine::progress::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;
const PROPAGATION_LABEL: &str = "Propagating";

#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let pb = ProgressBar::new(0).with_message("Initializing...");
        if let Some(style) = Self::spinner_style() {
            pb.set_style(style);
        }
        pb.set_draw_target(ProgressDrawTarget::stderr());
        pb.finish_and_clear();

        Self {
            pb: Arc::new(Mutex::new(pb)),
        }
    }

    /// A handler whose bar never draws.
    pub fn hidden() -> Self {
        let handler = Self::new();
        if let Ok(pb) = handler.pb.lock() {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        handler
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb = self.pb.clone();

        Box::new(move |progress: Progress| {
            let Ok(pb) = pb.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::PhaseStart { name } => {
                    pb.reset();
                    pb.set_length(0);
                    if let Some(style) = Self::spinner_style() {
                        pb.set_style(style);
                    }
                    pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    pb.set_message(name);
                }
                Progress::PhaseFinish => {
                    pb.disable_steady_tick();
                    pb.finish_with_message("✓ Done");
                }
                Progress::PropagationStart { total_elements } => {
                    pb.disable_steady_tick();
                    pb.reset();
                    pb.set_length(total_elements);
                    pb.set_position(0);
                    if let Some(style) = Self::bar_style() {
                        pb.set_style(style);
                    }
                    pb.set_message(PROPAGATION_LABEL);
                }
                Progress::ElementAdvanced { .. } => pb.inc(1),
                Progress::PropagationFinish => {
                    let len = pb.length().unwrap_or(0);
                    if pb.position() < len {
                        pb.set_position(len);
                    }
                    pb.finish();
                }
                Progress::Message(msg) => {
                    if pb.is_finished() {
                        pb.set_message(msg);
                    } else {
                        pb.println(format!("  {}", msg));
                    }
                }
            }
        })
    }

    fn spinner_style() -> Option<ProgressStyle> {
        ProgressStyle::with_template("{spinner:.green} {msg}").ok()
    }

    fn bar_style() -> Option<ProgressStyle> {
        let style = ProgressStyle::with_template("{msg:<20} [{bar:40.cyan/blue}] {pos}/{len} ({eta})").ok()?;
        Some(
            style
                .with_key("eta", |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                    let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
                })
                .progress_chars("##-"),
        )
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}
