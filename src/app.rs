use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use eframe::egui::{self, Context as EguiContext, Key, RichText, TopBottomPanel};
use eframe::{App, Frame};

use crate::action_bar;
use crate::background::{self, BackgroundSource};
use crate::canvas;
use crate::config::AppConfig;
use crate::document::PdfPackager;
use crate::export::{ExportTarget, PendingExport};
use crate::flatten::{Flattener, ThreadedRasterizer};
use crate::input::InputMode;
use crate::notes_panel;
use crate::state::EditorState;
use crate::theme;
use crate::toolbar;
use crate::ui_controls;

const EXPORT_POLL_INTERVAL: Duration = Duration::from_millis(50);

struct Alert {
    title: String,
    message: String,
}

pub struct CompassMarkupApp {
    pub state: EditorState,
    rasterizer: ThreadedRasterizer,
    packager: PdfPackager,
    pending: Option<PendingExport>,
    alert: Option<Alert>,
    status: Option<String>,
    theme: theme::AppTheme,
}

impl CompassMarkupApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: AppConfig,
        initial_background: Option<PathBuf>,
    ) -> Self {
        let theme = theme::workbench_theme();
        theme::apply_theme(&cc.egui_ctx, &theme);

        let rasterizer =
            ThreadedRasterizer::new(Flattener::with_system_font(config.font_path.as_deref()));

        let mut app = Self {
            state: EditorState::new(config),
            rasterizer,
            packager: PdfPackager,
            pending: None,
            alert: None,
            status: None,
            theme,
        };

        if let Some(path) = initial_background {
            app.load_background(BackgroundSource::Upload(path));
        }
        app
    }

    fn show_alert(&mut self, title: &str, err: &anyhow::Error) {
        tracing::error!("{title}: {err:#}");
        self.alert = Some(Alert {
            title: title.to_string(),
            message: format!("{err:#}"),
        });
    }

    fn load_background(&mut self, source: BackgroundSource) {
        match background::load(&source) {
            Ok(image) => {
                self.status = Some(format!("Background: {}", image.label));
                self.state.set_background(image);
            }
            Err(err) => self.show_alert("Cannot load background", &err),
        }
    }

    fn load_catalog_entry(&mut self, idx: usize) {
        let Some(entry) = self.state.config.backgrounds.get(idx).cloned() else {
            return;
        };
        self.load_background(BackgroundSource::Catalog(entry));
    }

    fn upload_background(&mut self) {
        if let Some(path) = background::pick_upload() {
            self.load_background(BackgroundSource::Upload(path));
        }
    }

    fn start_export(&mut self, target: ExportTarget) -> Result<()> {
        if self.pending.is_some() {
            return Ok(());
        }

        let (filter_name, extensions) = target.filter();
        let file = rfd::FileDialog::new()
            .set_title("Export annotated background")
            .set_file_name(target.default_file_name())
            .add_filter(filter_name, extensions)
            .save_file();
        let Some(path) = file else {
            return Ok(());
        };

        let with_footer = self.state.include_footer;
        let handle = self.state.export_snapshot(with_footer, &self.rasterizer)?;
        tracing::info!(path = %path.display(), ?target, "export started");
        self.pending = Some(PendingExport::new(target, path, handle));
        self.status = Some("Exporting…".to_string());
        Ok(())
    }

    fn poll_export(&mut self, ctx: &EguiContext) {
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        let Some(result) = pending.poll(&self.packager) else {
            ctx.request_repaint_after(EXPORT_POLL_INTERVAL);
            return;
        };
        self.pending = None;

        match result {
            Ok(path) => {
                tracing::info!(path = %path.display(), "export written");
                self.status = Some(format!("Saved {}", path.display()));
            }
            Err(err) => {
                self.status = None;
                self.show_alert("Export failed", &err);
            }
        }
    }

    fn handle_shortcuts(&mut self, ctx: &EguiContext) {
        if ctx.wants_keyboard_input() {
            return;
        }

        if ctx.input(|input| input.key_pressed(Key::Escape)) {
            self.state.set_mode(InputMode::Place);
        }
        if ctx.input(|input| input.key_pressed(Key::E)) {
            self.state.toggle_erase();
        }
        if ctx.input(|input| input.key_pressed(Key::H)) {
            self.state.toggle_highlight();
        }
    }

    fn show_alert_window(&mut self, ctx: &EguiContext) {
        let Some(alert) = self.alert.as_ref() else {
            return;
        };

        let mut dismissed = false;
        let title = RichText::new(&alert.title)
            .color(self.theme.surfaces.danger)
            .strong();
        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .frame(ui_controls::card_frame(&self.theme))
            .show(ctx, |ui| {
                ui.label(
                    RichText::new(&alert.message)
                        .color(self.theme.text.secondary)
                        .size(15.0),
                );
                ui.add_space(8.0);
                if ui_controls::primary_button(ui, &self.theme, "OK", egui::vec2(96.0, 32.0))
                    .clicked()
                {
                    dismissed = true;
                }
            });

        if dismissed {
            self.alert = None;
        }
    }
}

impl App for CompassMarkupApp {
    fn update(&mut self, ctx: &EguiContext, _frame: &mut Frame) {
        self.poll_export(ctx);
        self.handle_shortcuts(ctx);

        let toolbar_output = TopBottomPanel::top("toolbar")
            .min_height(self.theme.layout.toolbar_height)
            .frame(ui_controls::panel_frame(&self.theme))
            .show(ctx, |ui| toolbar::show_toolbar(ui, &mut self.state, &self.theme))
            .inner;

        let export_pending = self.pending.is_some();
        let status = self.status.clone();
        let action_output = TopBottomPanel::bottom("action_bar")
            .exact_height(self.theme.layout.action_bar_height)
            .frame(ui_controls::panel_frame(&self.theme))
            .show(ctx, |ui| {
                action_bar::show_action_bar(
                    ui,
                    &mut self.state,
                    &self.theme,
                    export_pending,
                    status.as_deref(),
                )
            })
            .inner;

        egui::SidePanel::right("notes_panel")
            .exact_width(self.theme.layout.notes_panel_width)
            .resizable(false)
            .frame(ui_controls::panel_frame(&self.theme))
            .show(ctx, |ui| {
                notes_panel::show_notes_panel(ui, &mut self.state, &self.theme);
            });

        egui::CentralPanel::default()
            .frame(
                egui::Frame::none()
                    .fill(self.theme.surfaces.app_bg)
                    .inner_margin(egui::Margin::same(self.theme.layout.panel_padding)),
            )
            .show(ctx, |ui| {
                canvas::show_canvas(ui, ctx, &mut self.state, &self.theme);
            });

        self.show_alert_window(ctx);

        if let Some(idx) = toolbar_output.pick_catalog {
            self.load_catalog_entry(idx);
        }
        if toolbar_output.upload {
            self.upload_background();
        }
        if toolbar_output.clear_all {
            self.state.clear_all();
        }
        if let Some(target) = action_output.export {
            if let Err(err) = self.start_export(target) {
                self.show_alert("Export failed", &err);
            }
        }
    }
}
