mod action_bar;
mod annotation;
mod app;
mod background;
mod canvas;
mod config;
mod document;
mod export;
mod flatten;
mod geometry;
mod input;
mod notes_panel;
mod state;
mod store;
mod theme;
mod tools;
mod toolbar;
mod ui_controls;

use std::path::PathBuf;

use eframe::egui;

use config::AppConfig;

const LOG_FILE_NAME: &str = "compass-markup.log";

/// Stdout layer plus an optional file layer. Both shapes are the same subscriber type.
fn log_subscriber(
    filter: &str,
    file_writer: Option<tracing_appender::non_blocking::NonBlocking>,
) -> impl tracing::Subscriber + Send + Sync + 'static {
    use tracing_subscriber::prelude::*;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_target(true)
        .with_level(true);
    let file_layer = file_writer.map(|writer| {
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_level(true)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
}

/// File + stdout logging. `RUST_LOG` wins over the configured filter.
fn setup_logging(filter: &str) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use std::fs::OpenOptions;
    use std::io::Write;
    use tracing_subscriber::util::SubscriberInitExt;

    let logs_dir = AppConfig::logs_dir().filter(|dir| std::fs::create_dir_all(dir).is_ok());
    let Some(logs_dir) = logs_dir else {
        eprintln!("Failed to create logs directory, logging to stdout only");
        log_subscriber(filter, None).init();
        return None;
    };

    let log_file_path = logs_dir.join(LOG_FILE_NAME);
    if let Ok(mut file) = OpenOptions::new().append(true).open(&log_file_path) {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let separator = "=".repeat(80);
        let _ = writeln!(
            file,
            "\n\n{separator}\n=== New Session Started at {timestamp} ===\n{separator}\n"
        );
    }

    let file_appender = tracing_appender::rolling::never(&logs_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    log_subscriber(filter, Some(non_blocking)).init();

    Some(guard)
}

fn main() -> eframe::Result<()> {
    let loaded = AppConfig::load_user();
    let config = loaded
        .as_ref()
        .ok()
        .and_then(|config| config.clone())
        .unwrap_or_default();

    let _log_guard = setup_logging(config.log_filter());
    if let Err(err) = &loaded {
        tracing::warn!("using default config: {err:#}");
    }

    let initial_background = std::env::args_os().nth(1).map(PathBuf::from);
    tracing::info!(
        backgrounds = config.backgrounds.len(),
        initial = ?initial_background,
        "starting compass-markup"
    );

    let viewport = egui::ViewportBuilder::default()
        .with_title("Compass Markup")
        .with_inner_size([1280.0, 860.0])
        .with_min_inner_size([800.0, 560.0]);

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "Compass Markup",
        options,
        Box::new(move |cc| {
            Box::new(app::CompassMarkupApp::new(
                cc,
                config,
                initial_background,
            ))
        }),
    )
}
