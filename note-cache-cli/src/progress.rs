use std::sync::Arc;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use note_cache::{AssetOutcome, CacheEvent, EventHandler};
use parking_lot::Mutex;

fn download_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} {prefix:<13} [{elapsed_precise}] [{bar:40.green/white}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// One progress bar per cache, fed by cache events.
#[derive(Clone)]
pub struct ProgressManager {
    multi: MultiProgress,
    bars: Arc<Mutex<Vec<ProgressBar>>>,
    disabled: bool,
}

impl ProgressManager {
    pub fn new(multi: MultiProgress) -> Self {
        Self {
            multi,
            bars: Arc::new(Mutex::new(Vec::new())),
            disabled: false,
        }
    }

    pub fn new_disabled(multi: MultiProgress) -> Self {
        Self {
            multi,
            bars: Arc::new(Mutex::new(Vec::new())),
            disabled: true,
        }
    }

    /// Event handler driving a new bar labelled `name`. `None` when disabled.
    pub fn handler(&self, name: &str) -> Option<EventHandler> {
        if self.disabled {
            return None;
        }

        let bar = self.multi.add(ProgressBar::new(0));
        bar.set_style(download_style());
        bar.set_prefix(name.to_string());
        bar.enable_steady_tick(Duration::from_millis(200));
        self.bars.lock().push(bar.clone());

        let failed = Arc::new(Mutex::new(0usize));
        Some(Arc::new(move |event: CacheEvent| match event {
            CacheEvent::BandStarted { priority, assets } => {
                bar.inc_length(assets as u64);
                bar.set_message(format!("priority {priority}"));
            }
            CacheEvent::AssetSettled { outcome, .. } => {
                if matches!(outcome, AssetOutcome::Failed { .. }) {
                    let mut failed = failed.lock();
                    *failed += 1;
                    bar.set_message(format!("{} failed", *failed));
                }
                bar.inc(1);
            }
            CacheEvent::BandFinished { .. } => {}
            CacheEvent::Cleared => bar.set_message("cleared"),
        }))
    }

    pub fn finish(&self) {
        for bar in self.bars.lock().drain(..) {
            bar.finish();
        }
    }

    #[inline]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
}
