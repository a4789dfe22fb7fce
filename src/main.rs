use std::path::PathBuf;

mod app;
mod category;
mod codec;
mod mode;
mod model;
mod richtext;

use app::GuideApp;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Optionally start with an image or a previously exported guide.
    let args: Vec<String> = std::env::args().collect();
    let initial = match args.len() {
        1 => None,
        2 => {
            let path = PathBuf::from(&args[1]);
            if !path.exists() {
                eprintln!("File not found: {}", path.display());
                std::process::exit(1);
            }
            Some(path)
        }
        _ => {
            eprintln!("Usage: guidemark [image-or-guide-file]");
            std::process::exit(1);
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title("guidemark"),
        ..Default::default()
    };

    eframe::run_native(
        "guidemark",
        options,
        Box::new(move |_cc| Ok(Box::new(GuideApp::new(initial.as_deref())))),
    )
    .expect("Failed to run eframe");
}
