use std::path::PathBuf;

use screenmark::app::MarkApp;

fn main() {
    env_logger::init();

    let image_path = std::env::args().nth(1).map(PathBuf::from);
    if let Some(path) = &image_path {
        if !path.exists() {
            eprintln!("File not found: {}", path.display());
            std::process::exit(1);
        }
    }

    let title = match &image_path {
        Some(path) => format!(
            "screenmark — {}",
            path.file_name().unwrap_or_default().to_str().unwrap_or("")
        ),
        None => "screenmark".to_owned(),
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title(&title),
        ..Default::default()
    };

    eframe::run_native(
        &title,
        options,
        Box::new(move |_cc| Ok(Box::new(MarkApp::new(image_path)))),
    )
    .expect("Failed to run eframe");
}
