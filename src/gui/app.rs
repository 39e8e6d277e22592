use eframe::egui;
use heic_converter::conversion::discover_files;
use heic_converter::{
    BatchState, BatchSummary, ConversionResult, CancelToken, OutputFormat, SettingsFile,
    DEFAULT_JPG_QUALITY,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;

#[path = "app_processing.rs"]
mod app_processing;

pub struct ConverterApp {
    // Queued source files
    files: Vec<FileEntry>,
    queued: HashSet<PathBuf>,

    // Conversion settings
    output_format: OutputFormat,
    create_subfolder: bool,
    output_path: String,
    jpg_quality: u8,
    recursive: bool,
    open_output_folder: bool,

    // Batch state
    state: BatchState,
    progress: f32,
    processed_count: usize,
    cancel: Option<CancelToken>,

    // Results
    results_message: String,
    error_message: String,
    notice_message: String,

    // Communication channel for background conversion
    progress_receiver: Option<Receiver<ProgressMessage>>,
}

pub(crate) struct FileEntry {
    pub path: PathBuf,
    pub status: FileStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FileStatus {
    Pending,
    Converted(PathBuf),
    Failed(String),
}

#[derive(Debug)]
pub(crate) enum ProgressMessage {
    FileDone {
        index: usize,
        total: usize,
        result: ConversionResult,
    },
    Complete(BatchSummary),
    Error(String),
}

/// Where the GUI keeps its last-used settings
pub(crate) fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("heic-converter").join("settings.json"))
}

impl ConverterApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let settings = settings_path()
            .filter(|path| path.exists())
            .and_then(|path| SettingsFile::load(&path).ok())
            .unwrap_or_default();

        Self::from_settings(settings)
    }

    /// App state with unset settings falling back to the GUI defaults
    pub(crate) fn from_settings(settings: SettingsFile) -> Self {
        Self {
            files: Vec::new(),
            queued: HashSet::new(),
            output_format: settings.output_format.unwrap_or_default(),
            create_subfolder: settings.create_subfolder.unwrap_or(true),
            output_path: settings.output_path.unwrap_or_default(),
            jpg_quality: settings.jpg_quality.unwrap_or(DEFAULT_JPG_QUALITY),
            recursive: settings.recursive.unwrap_or(true),
            open_output_folder: settings.open_output_folder.unwrap_or(true),
            state: BatchState::Idle,
            progress: 0.0,
            processed_count: 0,
            cancel: None,
            results_message: String::new(),
            error_message: String::new(),
            notice_message: String::new(),
            progress_receiver: None,
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.state == BatchState::Running
    }

    /// Queue files and the HEIC/HEIF files found in folders
    fn add_inputs(&mut self, inputs: &[PathBuf]) {
        let discovery = discover_files(inputs, self.recursive);
        let mut added = 0;
        for path in discovery.files {
            if self.queued.insert(path.clone()) {
                self.files.push(FileEntry {
                    path,
                    status: FileStatus::Pending,
                });
                added += 1;
            }
        }

        self.notice_message = match (added, discovery.skipped.len()) {
            (_, 0) => String::new(),
            (0, skipped) => format!("{} item(s) skipped: not HEIC/HEIF", skipped),
            (_, skipped) => format!("Added {} file(s), skipped {} other item(s)", added, skipped),
        };
    }

    fn clear_files(&mut self) {
        self.files.clear();
        self.queued.clear();
        self.progress = 0.0;
        self.processed_count = 0;
        self.results_message.clear();
        self.error_message.clear();
        self.notice_message.clear();
        self.state = BatchState::Idle;
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        if !dropped.is_empty() && !self.is_running() {
            self.add_inputs(&dropped);
        }
    }

    fn render_file_selection(&mut self, ui: &mut egui::Ui) {
        ui.heading("Files");
        ui.separator();

        ui.add_enabled_ui(!self.is_running(), |ui| {
            ui.horizontal(|ui| {
                if ui.button("Add Files...").clicked() {
                    if let Some(paths) = rfd::FileDialog::new()
                        .add_filter("HEIC/HEIF", &["heic", "HEIC", "heif", "HEIF"])
                        .pick_files()
                    {
                        self.add_inputs(&paths);
                    }
                }
                if ui.button("Add Folder...").clicked() {
                    if let Some(path) = rfd::FileDialog::new().pick_folder() {
                        self.add_inputs(&[path]);
                    }
                }
                if ui.button("Clear").clicked() {
                    self.clear_files();
                }
            });
            ui.checkbox(&mut self.recursive, "Include subfolders when adding a folder");
        });

        if self.files.is_empty() {
            ui.label("Drop HEIC/HEIF files or folders here");
        } else {
            egui::ScrollArea::vertical()
                .max_height(200.0)
                .auto_shrink([false, true])
                .show(ui, |ui| {
                    for entry in &self.files {
                        render_file_entry(ui, entry);
                    }
                });
        }

        if !self.notice_message.is_empty() {
            ui.colored_label(egui::Color32::YELLOW, &self.notice_message);
        }

        ui.add_space(10.0);
    }

    fn render_output_settings(&mut self, ui: &mut egui::Ui) {
        ui.heading("Output");
        ui.separator();

        ui.add_enabled_ui(!self.is_running(), |ui| {
            ui.horizontal(|ui| {
                ui.label("Format:");
                egui::ComboBox::from_id_salt("output_format")
                    .selected_text(self.output_format.label())
                    .show_ui(ui, |ui| {
                        ui.selectable_value(&mut self.output_format, OutputFormat::Jpg, "JPG");
                        ui.selectable_value(&mut self.output_format, OutputFormat::Png, "PNG");
                    });
            });

            if self.output_format == OutputFormat::Jpg {
                ui.horizontal(|ui| {
                    ui.label("JPEG quality:");
                    ui.add(egui::Slider::new(&mut self.jpg_quality, 1..=100));
                });
            }

            ui.horizontal(|ui| {
                ui.label("Output folder:");
                ui.text_edit_singleline(&mut self.output_path);
                if ui.button("Browse...").clicked() {
                    if let Some(path) = rfd::FileDialog::new().pick_folder() {
                        self.output_path = path.display().to_string();
                    }
                }
            });
            ui.label("(Leave empty to write next to each source file)");

            ui.add_enabled(
                self.output_path.trim().is_empty(),
                egui::Checkbox::new(
                    &mut self.create_subfolder,
                    format!(
                        "Create \"{}\" subfolder",
                        heic_converter::conversion::subfolder_name(self.output_format)
                    ),
                ),
            );
            ui.checkbox(&mut self.open_output_folder, "Open output folder when done");
        });

        ui.add_space(10.0);
    }

    fn render_convert_buttons(&mut self, ui: &mut egui::Ui) {
        ui.separator();

        ui.horizontal(|ui| {
            let convert = egui::Button::new(if self.is_running() {
                "Converting..."
            } else {
                "Convert"
            })
            .min_size(egui::vec2(160.0, 36.0));

            let can_start = !self.is_running() && !self.files.is_empty();
            if ui.add_enabled(can_start, convert).clicked() {
                self.start_conversion();
            }

            let stop = egui::Button::new("Stop").min_size(egui::vec2(80.0, 36.0));
            if ui.add_enabled(self.is_running(), stop).clicked() {
                self.stop_conversion();
            }
        });

        ui.add_space(10.0);
    }

    fn render_progress(&mut self, ui: &mut egui::Ui) {
        if self.state == BatchState::Idle && self.error_message.is_empty() {
            return;
        }

        ui.heading("Progress");
        ui.separator();

        if self.is_running() {
            ui.label(format!("Converted {}/{}", self.processed_count, self.files.len()));
            ui.add(
                egui::ProgressBar::new(self.progress)
                    .show_percentage()
                    .animate(true),
            );
        }

        if !self.results_message.is_empty() {
            ui.label(&self.results_message);
        }

        if !self.error_message.is_empty() {
            ui.colored_label(egui::Color32::RED, &self.error_message);
        }
    }
}

fn render_file_entry(ui: &mut egui::Ui, entry: &FileEntry) {
    let name = display_name(&entry.path);
    ui.horizontal(|ui| match &entry.status {
        FileStatus::Pending => {
            ui.label("•");
            ui.label(name);
        }
        FileStatus::Converted(output) => {
            ui.colored_label(egui::Color32::GREEN, "✓");
            ui.label(name).on_hover_text(output.display().to_string());
        }
        FileStatus::Failed(reason) => {
            ui.colored_label(egui::Color32::RED, "✗");
            ui.label(name);
            ui.colored_label(egui::Color32::RED, reason);
        }
    });
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl eframe::App for ConverterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Check for progress updates from background thread
        self.check_progress();
        self.handle_dropped_files(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading("HEIC Converter");
                ui.label("Convert HEIC/HEIF photos to JPG or PNG");
                ui.add_space(20.0);

                self.render_file_selection(ui);
                self.render_output_settings(ui);
                self.render_convert_buttons(ui);
                self.render_progress(ui);
            });
        });

        if self.is_running() {
            ctx.request_repaint();
        }
    }
}
