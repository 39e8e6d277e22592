// GUI entry point for heic-converter
// Drag HEIC/HEIF photos onto the window, pick a format and convert

use eframe::egui;

mod app;
use app::ConverterApp;

fn main() -> Result<(), eframe::Error> {
    if let Err(e) = heic_converter::utils::init_logging(false) {
        eprintln!("{:#}", e);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([720.0, 560.0])
            .with_min_inner_size([520.0, 400.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "HEIC Converter",
        options,
        Box::new(|cc| Ok(Box::new(ConverterApp::new(cc)))),
    )
}
