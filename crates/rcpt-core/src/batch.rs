//! Sequential batch extraction over a directory of images.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::client::ReceiptExtractor;
use crate::error::{RcptError, Result};
use crate::loader::{ImageLoader, is_supported_image};
use crate::models::receipt::ExtractionResult;

/// Receives progress notifications during a batch run.
pub trait BatchObserver {
    /// Called before a file is processed.
    fn on_start(&self, _input: &Path) {}

    /// Called after the output file was written.
    fn on_saved(&self, _input: &Path, _output: &Path) {}

    /// Called when a file failed; the run continues with the next file.
    fn on_error(&self, _input: &Path, _error: &RcptError) {}
}

/// Observer that ignores all notifications.
pub struct NoopObserver;

impl BatchObserver for NoopObserver {}

/// Result of processing a single file.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    /// Input image.
    pub input: PathBuf,

    /// Written JSON file, if processing succeeded.
    pub output: Option<PathBuf>,

    /// Extracted fields, if processing succeeded.
    pub result: Option<ExtractionResult>,

    /// Error message, if processing failed.
    pub error: Option<String>,

    /// Wall-clock time spent on this file.
    pub processing_time_ms: u64,
}

impl FileOutcome {
    /// Whether the file produced an output.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcomes of a batch run in processing order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    /// Files that produced an output.
    pub fn succeeded(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    /// Files that failed.
    pub fn failed(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

/// List the supported images directly inside `dir`, sorted by name.
///
/// Subdirectories and files with other extensions are skipped.
pub fn collect_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_supported_image(&path) {
            files.push(path);
        } else {
            debug!("Skipping {}", path.display());
        }
    }

    files.sort();
    Ok(files)
}

/// Output file for an input: `<stem>.json` inside `output_dir`.
pub fn output_path_for(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "receipt".to_string());
    output_dir.join(format!("{}.json", stem))
}

/// Write a result as indented UTF-8 JSON.
///
/// The content goes to a temporary file in the same directory first, so a
/// failed write never leaves a partial file at `path`.
pub fn write_result(result: &ExtractionResult, path: &Path) -> Result<()> {
    let json = result.to_pretty_json()?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut builder = tempfile::Builder::new();
    builder.prefix(".rcpt-").suffix(".json.tmp");
    // 0666 minus umask, as for a plain create; the temp-file default is 0600
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }

    let mut file = builder.tempfile_in(dir)?;
    file.write_all(json.as_bytes())?;
    file.persist(path).map_err(|e| RcptError::Io(e.error))?;
    Ok(())
}

/// Create the output directory up front.
///
/// A failure is only logged: each file retries the creation and reports
/// its own error.
pub fn prepare_output_dir(output_dir: &Path) {
    if let Err(e) = fs::create_dir_all(output_dir) {
        warn!("Cannot create output directory {}: {}", output_dir.display(), e);
    }
}

/// Drives the loader and extractor over a directory, one file at a time.
pub struct BatchProcessor<'a, E: ReceiptExtractor + ?Sized> {
    extractor: &'a E,
    loader: ImageLoader,
}

impl<'a, E: ReceiptExtractor + ?Sized> BatchProcessor<'a, E> {
    /// Create a processor.
    pub fn new(extractor: &'a E, loader: ImageLoader) -> Self {
        Self { extractor, loader }
    }

    /// Extract one image and write `<stem>.json` into `output_dir`.
    pub async fn process_file(
        &self,
        input: &Path,
        output_dir: &Path,
    ) -> Result<(PathBuf, ExtractionResult)> {
        let request = self.loader.load(input)?;
        let result = self.extractor.extract(&request).await?;

        fs::create_dir_all(output_dir)?;
        let output = output_path_for(input, output_dir);
        write_result(&result, &output)?;

        Ok((output, result))
    }

    /// Process every supported image in `input_dir`.
    ///
    /// Per-file failures are reported to `observer` and recorded in the
    /// report; only a failure to list `input_dir` aborts the run.
    pub async fn run(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        observer: &dyn BatchObserver,
    ) -> Result<BatchReport> {
        let inputs = collect_inputs(input_dir)?;
        info!("Found {} images in {}", inputs.len(), input_dir.display());

        Ok(self.run_files(inputs, output_dir, observer).await)
    }

    /// Process the given files in order, continuing past failures.
    pub async fn run_files(
        &self,
        inputs: Vec<PathBuf>,
        output_dir: &Path,
        observer: &dyn BatchObserver,
    ) -> BatchReport {
        prepare_output_dir(output_dir);
        let mut report = BatchReport::default();

        for input in inputs {
            observer.on_start(&input);
            let start = Instant::now();

            let processed = self.process_file(&input, output_dir).await;
            let outcome = match processed {
                Ok((output, result)) => {
                    observer.on_saved(&input, &output);
                    FileOutcome {
                        input,
                        output: Some(output),
                        result: Some(result),
                        error: None,
                        processing_time_ms: start.elapsed().as_millis() as u64,
                    }
                }
                Err(e) => {
                    warn!("Failed to process {}: {}", input.display(), e);
                    observer.on_error(&input, &e);
                    FileOutcome {
                        input,
                        output: None,
                        result: None,
                        error: Some(e.to_string()),
                        processing_time_ms: start.elapsed().as_millis() as u64,
                    }
                }
            };

            report.outcomes.push(outcome);
        }

        report
    }
}
