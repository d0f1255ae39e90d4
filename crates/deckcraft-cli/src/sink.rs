//! Terminal export sink
//!
//! Shows export progress with an indicatif spinner and "downloads" files by
//! writing them into the export directory. A finished status stays on screen
//! for the requested linger and is cleared when the sink goes away.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use deckcraft_core::{ExportError, ExportSink, Notice};

use crate::output::Output;

/// Export sink writing downloads to a directory
pub struct ConsoleSink<'a> {
    dir: PathBuf,
    output: &'a Output,
    spinner: Option<ProgressBar>,
    finished: Option<ProgressBar>,
    dismiss_at: Option<Instant>,
    written: Vec<PathBuf>,
    failures: Vec<String>,
}

impl<'a> ConsoleSink<'a> {
    pub fn new(dir: impl Into<PathBuf>, output: &'a Output) -> Self {
        Self {
            dir: dir.into(),
            output,
            spinner: None,
            finished: None,
            dismiss_at: None,
            written: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Files written so far
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Failure notices received so far
    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    /// When the final status is due to be cleared
    pub fn dismiss_deadline(&self) -> Option<Instant> {
        self.dismiss_at
    }

    /// Whether a status line is currently on screen
    pub fn status_shown(&self) -> bool {
        self.spinner.is_some() || self.finished.is_some()
    }

    /// Keep the final status up until its deadline, then clear it
    pub fn linger(&mut self) {
        let deadline = self.dismiss_at.take();
        if let Some(spinner) = self.finished.take() {
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if !remaining.is_zero() {
                    thread::sleep(remaining);
                }
            }
            spinner.finish_and_clear();
        }
    }

    fn spinner(&mut self) -> Option<&ProgressBar> {
        // Spinners would corrupt machine-readable output
        if !self.output.is_human() {
            return None;
        }
        if self.spinner.is_none() {
            let spinner = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
                spinner.set_style(style);
            }
            spinner.enable_steady_tick(Duration::from_millis(100));
            self.spinner = Some(spinner);
        }
        self.spinner.as_ref()
    }

    fn target(&self, filename: &str) -> PathBuf {
        self.dir.join(safe_filename(filename))
    }
}

impl ExportSink for ConsoleSink<'_> {
    fn status(&mut self, message: &str) {
        debug!("Export status: {}", message);
        if let Some(spinner) = self.spinner() {
            spinner.set_message(message.to_string());
        }
    }

    fn dismiss_status_after(&mut self, delay: Duration) {
        let Some(spinner) = self.spinner.take() else {
            return;
        };
        if delay.is_zero() {
            spinner.finish_and_clear();
            return;
        }
        spinner.finish();
        self.finished = Some(spinner);
        self.dismiss_at = Some(Instant::now() + delay);
    }

    fn notice(&mut self, notice: Notice) {
        match notice {
            Notice::Info(message) => self.output.message(&message),
            Notice::Failure(message) => self.failures.push(message),
        }
    }

    fn download(&mut self, filename: &str, bytes: &[u8]) -> Result<(), ExportError> {
        let path = self.target(filename);
        write_file(&self.dir, &path, bytes).map_err(|source| ExportError::Download {
            filename: filename.to_string(),
            source,
        })?;
        debug!("Wrote {} byte(s) to {:?}", bytes.len(), path);
        self.written.push(path);
        Ok(())
    }
}

impl Drop for ConsoleSink<'_> {
    fn drop(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
        self.linger();
    }
}

fn write_file(dir: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(path, bytes)
}

/// Replace characters that cannot appear in a file name
pub fn safe_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    match cleaned.trim() {
        "" | "." | ".." => "deck".to_string(),
        trimmed => trimmed.to_string(),
    }
}
