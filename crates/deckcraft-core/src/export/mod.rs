//! Raster export
//!
//! The pipeline turns rendered card surfaces into PNG files. It knows
//! nothing about how cards are drawn: the view layer hands it
//! [`CaptureSurface`]s, and everything user-visible (status line, notices,
//! downloads) goes through an [`ExportSink`].
//!
//! ## Multi-card export
//!
//! [`ExportPipeline::export_many`] captures surfaces strictly one after
//! another, reporting progress per item. An item that fails to capture is
//! skipped and logged; the rest still make it into the archive. Only a
//! failure to assemble or deliver the archive fails the whole batch. A
//! second batch started while one is running is refused.

pub mod archive;

use std::cell::Cell;
use std::io;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

pub use archive::{ArchiveEntry, Archiver, ZipArchiver, ZipBuilder, DEFAULT_COMPRESSION_LEVEL};

/// Default supersampling factor for captures
pub const DEFAULT_SCALE: u32 = 2;

/// Largest accepted pixel ratio
pub const MAX_SCALE: u32 = 8;

/// How long the terminal status stays up before it is dismissed
pub const DEFAULT_STATUS_LINGER: Duration = Duration::from_secs(2);

/// Extension of captured images
pub const IMAGE_EXTENSION: &str = "png";

/// Errors raised while exporting
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to capture '{surface}': {reason}")]
    Capture { surface: String, reason: String },

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Failed to save '{filename}': {source}")]
    Download {
        filename: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Rasterization parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Output pixels per layout pixel
    pub scale: u32,
    /// Fill color as RGBA; `None` keeps the background transparent
    pub background: Option<[u8; 4]>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            background: None,
        }
    }
}

/// A rendered card the pipeline can capture
///
/// "Chrome" is any interactive overlay drawn on top of the card (buttons,
/// drag handles) that must not end up in exported pixels.
pub trait CaptureSurface {
    fn is_visible(&self) -> bool;

    fn set_visible(&mut self, visible: bool);

    fn chrome_visible(&self) -> bool;

    fn set_chrome_visible(&mut self, visible: bool);

    /// Rasterize the surface and encode it losslessly
    fn capture(&mut self, options: &CaptureOptions) -> Result<Vec<u8>, ExportError>;
}

/// Message shown to the user outside the status indicator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Failure(String),
}

/// Everything the pipeline shows to or hands back to the user
pub trait ExportSink {
    /// Show or replace the transient status indicator text
    fn status(&mut self, message: &str);

    /// Dismiss the status indicator once `delay` has passed
    fn dismiss_status_after(&mut self, delay: Duration);

    fn notice(&mut self, notice: Notice);

    /// Deliver a finished file to the user
    fn download(&mut self, filename: &str, bytes: &[u8]) -> Result<(), ExportError>;
}

/// A surface and the file stem it is exported under
pub struct ExportItem<S> {
    pub name: String,
    pub surface: S,
}

impl<S> ExportItem<S> {
    pub fn new(name: impl Into<String>, surface: S) -> Self {
        Self {
            name: name.into(),
            surface,
        }
    }
}

/// Result of a successful batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    /// File name the archive was delivered as
    pub archive: String,
    /// Names of the items included in the archive, in order
    pub exported: Vec<String>,
    /// Names of items whose capture failed
    pub skipped: Vec<String>,
}

/// What [`ExportPipeline::export_many`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Another batch is running; nothing was done
    Busy,
    /// No surfaces were given
    NothingToExport,
    Completed(ExportReport),
    /// The archive could not be built or delivered
    Failed,
}

/// Tunables for the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub scale: u32,
    pub status_linger: Duration,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            status_linger: DEFAULT_STATUS_LINGER,
        }
    }
}

/// Captures surfaces to images and bundles batches into archives
pub struct ExportPipeline<A = ZipArchiver> {
    archiver: A,
    options: ExportOptions,
    busy: Cell<bool>,
}

/// Clears the busy flag when a batch ends, however it ends
struct BusyGuard<'a>(&'a Cell<bool>);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl Default for ExportPipeline<ZipArchiver> {
    fn default() -> Self {
        Self::new(ZipArchiver::default(), ExportOptions::default())
    }
}

impl<A: Archiver> ExportPipeline<A> {
    pub fn new(archiver: A, options: ExportOptions) -> Self {
        Self {
            archiver,
            options,
            busy: Cell::new(false),
        }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Whether a batch export is in progress
    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            scale: self.options.scale,
            background: None,
        }
    }

    /// Capture one surface and deliver it as `{filename}.png`
    ///
    /// Returns the encoded image, or `None` after reporting a failure notice.
    pub fn export_one(
        &self,
        surface: &mut dyn CaptureSurface,
        filename: &str,
        sink: &mut dyn ExportSink,
    ) -> Option<Vec<u8>> {
        let result = surface.capture(&self.capture_options()).and_then(|bytes| {
            let target = format!("{}.{}", filename, IMAGE_EXTENSION);
            sink.download(&target, &bytes)?;
            Ok(bytes)
        });

        match result {
            Ok(bytes) => {
                info!("Exported {}.{}", filename, IMAGE_EXTENSION);
                Some(bytes)
            }
            Err(e) => {
                error!("Error exporting card '{}': {}", filename, e);
                sink.notice(Notice::Failure(
                    "Failed to export card. Please try again.".to_string(),
                ));
                None
            }
        }
    }

    /// Capture every item in order and deliver them as one archive named
    /// `{archive_name}.{ext}`
    pub fn export_many<S: CaptureSurface>(
        &self,
        items: &mut [ExportItem<S>],
        archive_name: &str,
        sink: &mut dyn ExportSink,
    ) -> ExportOutcome {
        if self.busy.get() {
            debug!("Export already running, ignoring request for '{}'", archive_name);
            return ExportOutcome::Busy;
        }

        if items.is_empty() {
            sink.notice(Notice::Info(
                "No cards to export. Create at least one card before exporting.".to_string(),
            ));
            return ExportOutcome::NothingToExport;
        }

        self.busy.set(true);
        let _guard = BusyGuard(&self.busy);

        let total = items.len();
        let options = self.capture_options();
        let mut entries = Vec::with_capacity(total);
        let mut exported = Vec::with_capacity(total);
        let mut skipped = Vec::new();

        sink.status("Generating card images...");

        for (index, item) in items.iter_mut().enumerate() {
            sink.status(&format!("Generating card {} of {}", index + 1, total));

            match capture_clean(&mut item.surface, &options) {
                Ok(bytes) => {
                    entries.push(ArchiveEntry {
                        name: format!("{}.{}", item.name, IMAGE_EXTENSION),
                        bytes,
                    });
                    exported.push(item.name.clone());
                }
                Err(e) => {
                    warn!("Error generating card {}: {}", item.name, e);
                    skipped.push(item.name.clone());
                }
            }
        }

        sink.status("Creating archive...");
        let archive = match self.archiver.bundle(&entries) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Error building archive '{}': {}", archive_name, e);
                return self.fail_batch(sink);
            }
        };

        sink.status("Finalizing and downloading...");
        let filename = format!("{}.{}", archive_name, self.archiver.extension());
        if let Err(e) = sink.download(&filename, &archive) {
            error!("Error delivering archive '{}': {}", filename, e);
            return self.fail_batch(sink);
        }

        info!(
            "Exported {} of {} card(s) to {}",
            exported.len(),
            total,
            filename
        );
        sink.status("Download complete!");
        sink.dismiss_status_after(self.options.status_linger);

        ExportOutcome::Completed(ExportReport {
            archive: filename,
            exported,
            skipped,
        })
    }

    fn fail_batch(&self, sink: &mut dyn ExportSink) -> ExportOutcome {
        sink.dismiss_status_after(Duration::ZERO);
        sink.notice(Notice::Failure(
            "Failed to export deck. Please try again.".to_string(),
        ));
        ExportOutcome::Failed
    }
}

/// Capture with the surface forced visible and its chrome hidden, then put
/// both back the way they were
fn capture_clean<S: CaptureSurface>(
    surface: &mut S,
    options: &CaptureOptions,
) -> Result<Vec<u8>, ExportError> {
    let was_visible = surface.is_visible();
    let had_chrome = surface.chrome_visible();

    surface.set_visible(true);
    surface.set_chrome_visible(false);

    let result = surface.capture(options);

    surface.set_visible(was_visible);
    surface.set_chrome_visible(had_chrome);

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::rc::Rc;
    use zip::ZipArchive;

    /// Surface recording what state it was in when captured
    #[derive(Default)]
    struct FakeSurface {
        label: String,
        visible: bool,
        chrome: bool,
        fail: bool,
        captured_with: Option<(bool, bool, CaptureOptions)>,
        on_capture: Option<Box<dyn FnMut()>>,
    }

    impl FakeSurface {
        fn new(label: &str) -> Self {
            Self {
                label: label.to_string(),
                chrome: true,
                ..Default::default()
            }
        }

        fn failing(label: &str) -> Self {
            Self {
                fail: true,
                ..Self::new(label)
            }
        }
    }

    impl CaptureSurface for FakeSurface {
        fn is_visible(&self) -> bool {
            self.visible
        }

        fn set_visible(&mut self, visible: bool) {
            self.visible = visible;
        }

        fn chrome_visible(&self) -> bool {
            self.chrome
        }

        fn set_chrome_visible(&mut self, visible: bool) {
            self.chrome = visible;
        }

        fn capture(&mut self, options: &CaptureOptions) -> Result<Vec<u8>, ExportError> {
            self.captured_with = Some((self.visible, self.chrome, *options));
            if let Some(hook) = self.on_capture.as_mut() {
                hook();
            }
            if self.fail {
                return Err(ExportError::Capture {
                    surface: self.label.clone(),
                    reason: "canvas tainted".to_string(),
                });
            }
            Ok(self.label.as_bytes().to_vec())
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Status(String),
        Dismiss(Duration),
        Notice(Notice),
        Download(String),
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Vec<Event>,
        files: Vec<(String, Vec<u8>)>,
        fail_downloads: bool,
    }

    impl RecordingSink {
        fn notices(&self) -> Vec<&Notice> {
            self.events
                .iter()
                .filter_map(|e| match e {
                    Event::Notice(n) => Some(n),
                    _ => None,
                })
                .collect()
        }

        fn statuses(&self) -> Vec<&str> {
            self.events
                .iter()
                .filter_map(|e| match e {
                    Event::Status(s) => Some(s.as_str()),
                    _ => None,
                })
                .collect()
        }
    }

    impl ExportSink for RecordingSink {
        fn status(&mut self, message: &str) {
            self.events.push(Event::Status(message.to_string()));
        }

        fn dismiss_status_after(&mut self, delay: Duration) {
            self.events.push(Event::Dismiss(delay));
        }

        fn notice(&mut self, notice: Notice) {
            self.events.push(Event::Notice(notice));
        }

        fn download(&mut self, filename: &str, bytes: &[u8]) -> Result<(), ExportError> {
            if self.fail_downloads {
                return Err(ExportError::Download {
                    filename: filename.to_string(),
                    source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
                });
            }
            self.events.push(Event::Download(filename.to_string()));
            self.files.push((filename.to_string(), bytes.to_vec()));
            Ok(())
        }
    }

    /// Archiver that counts calls and can be told to fail
    #[derive(Default)]
    struct CountingArchiver {
        calls: Cell<usize>,
        fail: bool,
    }

    impl Archiver for CountingArchiver {
        fn extension(&self) -> &str {
            "zip"
        }

        fn bundle(&self, entries: &[ArchiveEntry]) -> Result<Vec<u8>, ExportError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(ExportError::Archive(zip::result::ZipError::FileNotFound));
            }
            ZipArchiver::default().bundle(entries)
        }
    }

    fn archive_names(bytes: &[u8]) -> Vec<String> {
        let mut archive = ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    fn items(surfaces: Vec<FakeSurface>) -> Vec<ExportItem<FakeSurface>> {
        surfaces
            .into_iter()
            .map(|s| ExportItem::new(s.label.clone(), s))
            .collect()
    }

    #[test]
    fn test_empty_batch_only_emits_notice() {
        let pipeline = ExportPipeline::new(CountingArchiver::default(), ExportOptions::default());
        let mut sink = RecordingSink::default();
        let mut none: Vec<ExportItem<FakeSurface>> = Vec::new();

        let outcome = pipeline.export_many(&mut none, "My Deck", &mut sink);

        assert_eq!(outcome, ExportOutcome::NothingToExport);
        assert_eq!(pipeline.archiver.calls.get(), 0);
        assert!(sink.files.is_empty());
        assert_eq!(sink.events.len(), 1);
        assert!(matches!(sink.notices()[0], Notice::Info(_)));
    }

    #[test]
    fn test_failed_item_is_skipped() {
        let pipeline = ExportPipeline::default();
        let mut sink = RecordingSink::default();
        let mut batch = items(vec![
            FakeSurface::new("A_of_hearts"),
            FakeSurface::failing("2_of_hearts"),
            FakeSurface::new("3_of_hearts"),
        ]);

        let outcome = pipeline.export_many(&mut batch, "My Deck", &mut sink);

        let report = match outcome {
            ExportOutcome::Completed(report) => report,
            other => panic!("expected a completed export, got {:?}", other),
        };
        assert_eq!(report.archive, "My Deck.zip");
        assert_eq!(report.exported, vec!["A_of_hearts", "3_of_hearts"]);
        assert_eq!(report.skipped, vec!["2_of_hearts"]);

        assert_eq!(sink.files.len(), 1);
        let (name, bytes) = &sink.files[0];
        assert_eq!(name, "My Deck.zip");
        assert_eq!(
            archive_names(bytes),
            vec!["A_of_hearts.png", "3_of_hearts.png"]
        );
        // Partial success is not a failure
        assert!(sink.notices().is_empty());
    }

    #[test]
    fn test_progress_is_reported_per_item_in_order() {
        let pipeline = ExportPipeline::default();
        let mut sink = RecordingSink::default();
        let mut batch = items(vec![
            FakeSurface::new("a"),
            FakeSurface::new("b"),
            FakeSurface::new("c"),
        ]);

        pipeline.export_many(&mut batch, "deck", &mut sink);

        let statuses = sink.statuses();
        let progress: Vec<&str> = statuses
            .iter()
            .copied()
            .filter(|s| s.starts_with("Generating card ") && s.contains(" of "))
            .collect();
        assert_eq!(
            progress,
            vec![
                "Generating card 1 of 3",
                "Generating card 2 of 3",
                "Generating card 3 of 3"
            ]
        );
        assert_eq!(statuses.last(), Some(&"Download complete!"));
        assert_eq!(
            sink.events.last(),
            Some(&Event::Dismiss(DEFAULT_STATUS_LINGER))
        );
    }

    #[test]
    fn test_surface_state_forced_and_restored() {
        let pipeline = ExportPipeline::default();
        let mut sink = RecordingSink::default();
        let mut batch = items(vec![FakeSurface::new("a"), FakeSurface::failing("b")]);
        batch[1].surface.visible = true;
        batch[1].surface.chrome = false;

        pipeline.export_many(&mut batch, "deck", &mut sink);

        for item in &batch {
            let (visible, chrome, options) = item.surface.captured_with.unwrap();
            assert!(visible, "captured while hidden");
            assert!(!chrome, "captured with chrome");
            assert_eq!(options.scale, 2);
            assert_eq!(options.background, None);
        }
        // Original state is back, including after a failed capture
        assert!(!batch[0].surface.visible);
        assert!(batch[0].surface.chrome);
        assert!(batch[1].surface.visible);
        assert!(!batch[1].surface.chrome);
    }

    #[test]
    fn test_archive_failure_reports_once_without_download() {
        let archiver = CountingArchiver {
            fail: true,
            ..Default::default()
        };
        let pipeline = ExportPipeline::new(archiver, ExportOptions::default());
        let mut sink = RecordingSink::default();
        let mut batch = items(vec![FakeSurface::new("a")]);

        let outcome = pipeline.export_many(&mut batch, "deck", &mut sink);

        assert_eq!(outcome, ExportOutcome::Failed);
        assert!(sink.files.is_empty());
        let notices = sink.notices();
        assert_eq!(notices.len(), 1);
        assert!(matches!(notices[0], Notice::Failure(_)));
        assert!(!pipeline.is_busy());
    }

    #[test]
    fn test_download_failure_fails_batch() {
        let pipeline = ExportPipeline::default();
        let mut sink = RecordingSink {
            fail_downloads: true,
            ..Default::default()
        };
        let mut batch = items(vec![FakeSurface::new("a")]);

        assert_eq!(
            pipeline.export_many(&mut batch, "deck", &mut sink),
            ExportOutcome::Failed
        );
        assert_eq!(sink.notices().len(), 1);
    }

    #[test]
    fn test_reentrant_batch_is_refused() {
        let pipeline = Rc::new(ExportPipeline::default());
        let nested = Rc::new(Cell::new(None));

        let mut surface = FakeSurface::new("a");
        {
            let pipeline = Rc::clone(&pipeline);
            let nested = Rc::clone(&nested);
            surface.on_capture = Some(Box::new(move || {
                let mut inner_sink = RecordingSink::default();
                let mut inner = items(vec![FakeSurface::new("x")]);
                let outcome = pipeline.export_many(&mut inner, "other", &mut inner_sink);
                nested.set(Some((outcome == ExportOutcome::Busy, inner_sink.events.len())));
            }));
        }

        let mut sink = RecordingSink::default();
        let mut batch = vec![ExportItem::new("a", surface)];
        let outcome = pipeline.export_many(&mut batch, "deck", &mut sink);

        assert!(matches!(outcome, ExportOutcome::Completed(_)));
        assert_eq!(nested.get(), Some((true, 0)));
        assert_eq!(sink.files.len(), 1);
        // Flag is released afterwards
        assert!(!pipeline.is_busy());
    }

    #[test]
    fn test_export_one_downloads_png() {
        let pipeline = ExportPipeline::default();
        let mut sink = RecordingSink::default();
        let mut surface = FakeSurface::new("card");

        let bytes = pipeline.export_one(&mut surface, "My Deck_A_of_hearts", &mut sink);

        assert_eq!(bytes.as_deref(), Some("card".as_bytes()));
        assert_eq!(
            sink.events,
            vec![Event::Download("My Deck_A_of_hearts.png".to_string())]
        );
    }

    #[test]
    fn test_export_one_failure_notifies_and_returns_none() {
        let pipeline = ExportPipeline::default();
        let mut sink = RecordingSink::default();
        let mut surface = FakeSurface::failing("card");

        assert!(pipeline
            .export_one(&mut surface, "card", &mut sink)
            .is_none());
        assert!(sink.files.is_empty());
        assert_eq!(sink.notices().len(), 1);
        assert!(matches!(sink.notices()[0], Notice::Failure(_)));
    }
}
