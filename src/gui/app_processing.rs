// Conversion driver for the GUI
// The batch runs on a background thread and reports back over a channel

use super::{settings_path, ConverterApp, FileStatus, ProgressMessage};
use heic_converter::{
    BatchRunner, BatchState, BatchSummary, CancelToken, ConversionConfig, ConversionRequest,
    HeifCodec, Outcome, SettingsFile,
};
use std::path::PathBuf;
use std::sync::mpsc::channel;

impl ConverterApp {
    pub fn start_conversion(&mut self) {
        if self.files.is_empty() {
            self.error_message = "Please add HEIC/HEIF files first".to_string();
            return;
        }

        let output_path = self.output_path.trim().to_string();
        let config = ConversionConfig {
            output_format: self.output_format,
            jpg_quality: self.jpg_quality,
            create_subfolder: self.create_subfolder && output_path.is_empty(),
            output_directory: (!output_path.is_empty()).then(|| PathBuf::from(&output_path)),
            recursive: self.recursive,
        };

        // Save settings before starting
        if let Err(e) = self.save_settings() {
            tracing::warn!("failed to save settings: {:#}", e);
        }

        // Clear previous state
        for entry in &mut self.files {
            entry.status = FileStatus::Pending;
        }
        self.state = BatchState::Running;
        self.progress = 0.0;
        self.processed_count = 0;
        self.error_message.clear();
        self.results_message.clear();
        self.notice_message.clear();

        let requests: Vec<ConversionRequest> = self
            .files
            .iter()
            .map(|entry| ConversionRequest::new(entry.path.clone(), &config))
            .collect();

        let cancel = CancelToken::new();
        self.cancel = Some(cancel.clone());

        let (tx, rx) = channel();
        self.progress_receiver = Some(rx);

        std::thread::spawn(move || {
            let runner = BatchRunner::new(HeifCodec::new());
            let on_progress = |index, total, result: &heic_converter::ConversionResult| {
                let _ = tx.send(ProgressMessage::FileDone {
                    index,
                    total,
                    result: result.clone(),
                });
            };

            let message = match runner.run(&requests, &cancel, on_progress) {
                Ok(summary) => ProgressMessage::Complete(summary),
                Err(e) => ProgressMessage::Error(format!("Conversion failed: {}", e)),
            };
            let _ = tx.send(message);
        });
    }

    pub fn stop_conversion(&mut self) {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
            self.results_message = "Stopping after the current file...".to_string();
        }
    }

    /// Check for progress updates from the background thread
    pub fn check_progress(&mut self) {
        let messages: Vec<ProgressMessage> = match &self.progress_receiver {
            Some(receiver) => receiver.try_iter().collect(),
            None => return,
        };

        let mut finished = false;
        for msg in messages {
            match msg {
                ProgressMessage::FileDone {
                    index,
                    total,
                    result,
                } => {
                    self.processed_count += 1;
                    if total > 0 {
                        self.progress = self.processed_count as f32 / total as f32;
                    }
                    if let Some(entry) = self.files.get_mut(index) {
                        entry.status = match result.outcome {
                            Outcome::Success(output) => FileStatus::Converted(output),
                            Outcome::Failure(err) => FileStatus::Failed(err.to_string()),
                        };
                    }
                }
                ProgressMessage::Complete(summary) => {
                    self.state = summary.state;
                    self.results_message = completion_message(&summary);
                    if self.open_output_folder {
                        reveal_output_folder(&summary);
                    }
                    finished = true;
                }
                ProgressMessage::Error(err) => {
                    self.state = BatchState::Idle;
                    self.error_message = err;
                    finished = true;
                }
            }
        }

        if finished {
            self.progress_receiver = None;
            self.cancel = None;
        }
    }

    fn save_settings(&self) -> anyhow::Result<()> {
        let Some(path) = settings_path() else {
            return Ok(());
        };
        let settings = SettingsFile {
            output_format: Some(self.output_format),
            output_path: Some(self.output_path.trim().to_string()),
            create_subfolder: Some(self.create_subfolder),
            jpg_quality: Some(self.jpg_quality),
            recursive: Some(self.recursive),
            open_output_folder: Some(self.open_output_folder),
            ..Default::default()
        };
        settings.save(&path)
    }
}

/// Folder that received the most recent output, if any file converted
pub(crate) fn folder_to_open(summary: &BatchSummary) -> Option<PathBuf> {
    summary.output_directories().pop()
}

fn reveal_output_folder(summary: &BatchSummary) {
    let Some(folder) = folder_to_open(summary) else {
        return;
    };
    if let Err(e) = open::that(&folder) {
        tracing::warn!(folder = %folder.display(), "failed to open output folder: {}", e);
    }
}

pub(crate) fn completion_message(summary: &BatchSummary) -> String {
    let converted = summary.succeeded.len();
    let failed = summary.failed.len();

    if summary.state == BatchState::Cancelled {
        format!(
            "Stopped: {} converted, {} failed, {} not started",
            converted,
            failed,
            summary.skipped()
        )
    } else if summary.all_succeeded() {
        format!("✓ Successfully converted {} file(s)", converted)
    } else {
        format!(
            "Converted {} of {} file(s), {} failed",
            converted, summary.total_count, failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heic_converter::{ConversionError, ConversionResult};
    use std::time::Duration;

    fn converted(source: &str, output: &str) -> ConversionResult {
        ConversionResult {
            source_path: PathBuf::from(source),
            outcome: Outcome::Success(PathBuf::from(output)),
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn test_folder_to_open_is_last_output_directory() {
        let mut summary = BatchSummary::new(3);
        summary.record(converted("/a/1.heic", "/a/converted_jpg/1.jpg"));
        summary.record(converted("/b/2.heic", "/b/converted_jpg/2.jpg"));
        summary.record(converted("/a/3.heic", "/a/converted_jpg/3.jpg"));
        summary.state = BatchState::Completed;

        assert_eq!(folder_to_open(&summary), Some(PathBuf::from("/b/converted_jpg")));
    }

    #[test]
    fn test_nothing_to_open_when_all_failed() {
        let mut summary = BatchSummary::new(1);
        summary.record(ConversionResult {
            source_path: PathBuf::from("/a/1.heic"),
            outcome: Outcome::Failure(ConversionError::UnsupportedInput),
            duration: Duration::ZERO,
        });
        assert_eq!(folder_to_open(&summary), None);
    }

    #[test]
    fn test_completion_message() {
        let mut summary = BatchSummary::new(2);
        summary.record(converted("/a/1.heic", "/a/1.jpg"));
        summary.record(converted("/a/2.heic", "/a/2.jpg"));
        summary.state = BatchState::Completed;
        assert_eq!(completion_message(&summary), "✓ Successfully converted 2 file(s)");

        summary.total_count = 5;
        summary.state = BatchState::Cancelled;
        assert_eq!(
            completion_message(&summary),
            "Stopped: 2 converted, 0 failed, 3 not started"
        );
    }
}
