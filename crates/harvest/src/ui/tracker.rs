use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use harvest_fetch::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use once_cell::sync::Lazy;

pub trait Tracker {
    type Ctx: Clone;
    fn new(ctx: Self::Ctx) -> Self;
    fn observe(&self, event: &Progress);
    fn finish(&self, msg: Option<String>);
}

const PB_STYLE: &str = "{spinner:.blue} [{elapsed_precise}] {wide_bar:.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {msg}";

const TICK: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";

const PB_CHARS: &str = "█▓▒░  ";

static PB_TEMPLATE: Lazy<ProgressStyle> = Lazy::new(|| match ProgressStyle::with_template(PB_STYLE) {
    Ok(style) => style.tick_chars(TICK).progress_chars(PB_CHARS),
    Err(_) => ProgressStyle::default_bar(),
});

/// Bytes moved by one file so far.
#[derive(Debug, Default, Clone, Copy)]
struct FileBytes {
    total:   Option<u64>,
    written: u64,
}

/// One bar for the whole run, growing as files are queued.
pub struct ProgressTracker {
    pub pb: ProgressBar,
    files:  Mutex<HashMap<String, FileBytes>>,
}

#[derive(Debug, Clone)]
pub struct ProgressTrackerConfig {
    pub hidden: bool,
}

impl ProgressTracker {
    /// Wrap the tracker into a callback for `DownloadOptions::on_progress`.
    pub fn callback(self: &Arc<Self>) -> ProgressCallback {
        let tracker = self.clone();
        Arc::new(move |event: &Progress| tracker.observe(event))
    }

    fn files(&self) -> std::sync::MutexGuard<'_, HashMap<String, FileBytes>> {
        self.files.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Tracker for ProgressTracker {
    type Ctx = ProgressTrackerConfig;

    fn new(ctx: Self::Ctx) -> Self {
        let pb = ProgressBar::new(0);
        if ctx.hidden {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        pb.set_style(PB_TEMPLATE.clone());
        ProgressTracker {
            pb,
            files: Mutex::new(HashMap::new()),
        }
    }

    fn observe(&self, event: &Progress) {
        match event {
            Progress::FileStarted {
                url,
                total_bytes,
                recovered_bytes,
            } => {
                self.files().insert(url.clone(), FileBytes {
                    total:   *total_bytes,
                    written: *recovered_bytes,
                });
                if let Some(total) = total_bytes {
                    self.pb.inc_length(*total);
                }
                self.pb.inc(*recovered_bytes);
                self.pb.set_message(short_name(url).to_string());
            }
            Progress::BytesWritten { url, bytes } => {
                if let Some(file) = self.files().get_mut(url) {
                    file.written += bytes;
                }
                self.pb.inc(*bytes);
            }
            Progress::ChunkRetry { .. } => {}
            Progress::FileDone { url } => {
                // Settle bytes no event reported.
                if let Some(file) = self.files().remove(url)
                    && let Some(total) = file.total
                {
                    self.pb.inc(total.saturating_sub(file.written));
                }
            }
        }
    }

    fn finish(&self, msg: Option<String>) {
        if let Some(msg) = msg {
            self.pb.finish_with_message(msg);
        }
        self.pb.finish();
    }
}

fn short_name(url: &str) -> &str { url.rsplit('/').next().unwrap_or(url) }
