//! The editor shell: left editor panel, central preview canvas, right detail
//! pane. Owns the single live [`Guide`] and is its only writer; every upload
//! or import replaces guide state in one step, never partially.

use std::path::Path;

use egui::{
    pos2, vec2, Align2, Color32, FontId, Pos2, Rect, RichText, Sense, Stroke, TextureHandle,
};
use image::DynamicImage;
use thiserror::Error;

use crate::category::CategoryKey;
use crate::codec::{self, ImportError};
use crate::mode::{self, ModeController};
use crate::model::{Guide, Section, SectionPatch};
use crate::richtext::{strip_tags, RichTextEditor};

const PIN_RADIUS: f32 = 11.0;
const PIN_HIT_RADIUS: f32 = 13.0;

pub const EXPORT_WITHOUT_IMAGE_PROMPT: &str = "Please upload an image or guide first.";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("unsupported file type: upload an image or a previously exported guide")]
    UnsupportedFileType,
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Import(#[from] ImportError),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("could not encode section data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not write the exported file: {0}")]
    Io(#[from] std::io::Error),
}

pub struct GuideApp {
    guide: Guide,
    controller: ModeController,
    /// Pin shown in the detail pane. UI-selection state separate from the
    /// mode machine: a pin can be "active" while the controller is idle.
    active_section: Option<String>,
    rich_text: RichTextEditor,
    /// Decoded base image, turned into a texture on first paint.
    raw_image: Option<DynamicImage>,
    texture: Option<TextureHandle>,
    /// Last failure or prompt, shown in the editor panel until dismissed.
    banner: Option<String>,
}

impl GuideApp {
    pub fn new(initial: Option<&Path>) -> Self {
        let mut app = GuideApp {
            guide: Guide::new(),
            controller: ModeController::new(),
            active_section: None,
            rich_text: RichTextEditor::new(),
            raw_image: None,
            texture: None,
            banner: None,
        };
        if let Some(path) = initial {
            app.load_path(path);
        }
        app
    }

    // ── Upload / import ─────────────────────────────────────────────────────

    /// Single upload entry point: a guide document goes through the codec, an
    /// image resets the guide, anything else is rejected. Failures leave the
    /// current guide untouched and raise the banner.
    fn load_path(&mut self, path: &Path) {
        let result = if is_guide_document(path) {
            self.import_guide(path)
        } else {
            self.load_image(path)
        };
        match result {
            Ok(()) => self.banner = None,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "upload rejected");
                self.banner = Some(err.to_string());
            }
        }
    }

    fn import_guide(&mut self, path: &Path) -> Result<(), UploadError> {
        let document = std::fs::read_to_string(path).map_err(|source| UploadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let imported = codec::parse(&document)?;
        tracing::info!(
            path = %path.display(),
            sections = imported.sections.len(),
            "guide imported"
        );
        self.raw_image = codec::decode_data_uri(&imported.image)
            .and_then(|bytes| image::load_from_memory(&bytes).ok());
        self.texture = None;
        self.guide
            .replace_from_import(imported.title, imported.image, imported.sections);
        self.clear_selection();
        Ok(())
    }

    fn load_image(&mut self, path: &Path) -> Result<(), UploadError> {
        let bytes = std::fs::read(path).map_err(|source| UploadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let data_uri =
            codec::image_data_uri(&bytes).map_err(|_| UploadError::UnsupportedFileType)?;
        self.raw_image = image::load_from_memory(&bytes).ok();
        self.texture = None;
        self.guide.reset_with_image(data_uri);
        self.clear_selection();
        tracing::info!(path = %path.display(), "new image loaded, guide reset");
        Ok(())
    }

    fn clear_selection(&mut self) {
        self.controller = ModeController::new();
        self.active_section = None;
        self.rich_text.reset();
    }

    // ── Export ──────────────────────────────────────────────────────────────

    fn export(&mut self) {
        let Some(image) = self.guide.image.clone() else {
            self.banner = Some(EXPORT_WITHOUT_IMAGE_PROMPT.to_string());
            return;
        };
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(codec::export_file_name(&self.guide.title))
            .add_filter("HTML", &["html"])
            .save_file()
        else {
            return;
        };
        match self.write_export(&path, &image) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "guide exported");
                self.banner = None;
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "export failed");
                self.banner = Some(err.to_string());
            }
        }
    }

    fn write_export(&self, path: &Path, image: &str) -> Result<(), ExportError> {
        let document = codec::render(&self.guide.title, image, &self.guide.sections)?;
        std::fs::write(path, document)?;
        Ok(())
    }

    // ── Section operations ──────────────────────────────────────────────────

    fn delete_section(&mut self, id: &str) {
        if self.guide.delete_section(id) {
            self.controller.section_deleted(id);
            if self.active_section.as_deref() == Some(id) {
                self.active_section = None;
            }
        }
    }

    // ── Preview canvas ──────────────────────────────────────────────────────

    fn ensure_texture(&mut self, ctx: &egui::Context) {
        if self.texture.is_some() {
            return;
        }
        if let Some(ref img) = self.raw_image {
            let rgba = img.to_rgba8();
            let size = [rgba.width() as usize, rgba.height() as usize];
            let pixels = rgba.as_flat_samples();
            let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
            self.texture =
                Some(ctx.load_texture("guide-image", color_image, egui::TextureOptions::LINEAR));
        }
    }

    fn handle_canvas_click(&mut self, click: Pos2, image_rect: Rect) {
        let awaiting_click =
            self.controller.is_placing() || self.controller.moving_target().is_some();
        if awaiting_click {
            // Outside the image box there is no transition; the prompt stays.
            if image_rect.contains(click) {
                let (x, y) = mode::pin_position(click, image_rect);
                if let Some(id) = self.controller.image_click(&mut self.guide, x, y) {
                    self.active_section = Some(id);
                    self.rich_text.reset();
                }
            }
            return;
        }
        if let Some(id) = self.hit_test_pin(click, image_rect) {
            self.active_section = Some(id);
        }
    }

    fn hit_test_pin(&self, click: Pos2, image_rect: Rect) -> Option<String> {
        self.guide.sections.iter().rev().find_map(|section| {
            let center = pin_center(section, image_rect);
            (center.distance(click) <= PIN_HIT_RADIUS).then(|| section.id.clone())
        })
    }

    fn show_canvas(&mut self, ui: &mut egui::Ui) {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click());
        let canvas_rect = response.rect;
        painter.rect_filled(canvas_rect, 0.0, Color32::from_gray(40));

        let Some(texture) = self.texture.clone() else {
            painter.text(
                canvas_rect.center(),
                Align2::CENTER_CENTER,
                "Upload an image or a saved guide to begin.",
                FontId::proportional(15.0),
                Color32::from_gray(180),
            );
            return;
        };

        let tex_size = texture.size_vec2();
        let image_rect = fitted_image_rect(canvas_rect.shrink(12.0), (tex_size.x, tex_size.y));
        painter.image(
            texture.id(),
            image_rect,
            Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
            Color32::WHITE,
        );

        for (idx, section) in self.guide.sections.iter().enumerate() {
            let center = pin_center(section, image_rect);
            let color = section.category_key.color32();
            let is_active = self.active_section.as_deref() == Some(section.id.as_str());
            let is_moving = self.controller.moving_target() == Some(section.id.as_str());

            let radius = if is_active { PIN_RADIUS + 2.0 } else { PIN_RADIUS };
            painter.circle_filled(center, radius, color);
            if is_active {
                painter.circle_stroke(center, radius + 2.0, Stroke::new(2.0, Color32::WHITE));
            }
            if is_moving {
                painter.circle_stroke(
                    center,
                    radius + 4.0,
                    Stroke::new(2.0, Color32::from_rgb(96, 165, 250)),
                );
            }
            painter.text(
                center,
                Align2::CENTER_CENTER,
                (idx + 1).to_string(),
                FontId::proportional(12.0),
                Color32::WHITE,
            );
        }

        if let Some(status) = self.controller.status() {
            painter.rect_filled(image_rect, 0.0, Color32::from_black_alpha(120));
            painter.text(
                image_rect.center(),
                Align2::CENTER_CENTER,
                status,
                FontId::proportional(16.0),
                Color32::WHITE,
            );
        }

        if response.clicked() {
            if let Some(click) = response.interact_pointer_pos() {
                self.handle_canvas_click(click, image_rect);
            }
        }
    }

    // ── Editor panel ────────────────────────────────────────────────────────

    fn show_editor_panel(&mut self, ui: &mut egui::Ui) {
        if let Some(message) = self.banner.clone() {
            ui.horizontal(|ui| {
                if ui.small_button("✕").clicked() {
                    self.banner = None;
                }
                ui.colored_label(Color32::from_rgb(220, 38, 38), message);
            });
            ui.separator();
        }

        ui.label("Guide Title");
        ui.text_edit_singleline(&mut self.guide.title);
        ui.add_space(6.0);

        if ui.button("Upload Image or Guide…").clicked() {
            if let Some(path) = rfd::FileDialog::new()
                .add_filter(
                    "Images and guides",
                    &["png", "jpg", "jpeg", "gif", "webp", "bmp", "html", "htm"],
                )
                .pick_file()
            {
                self.load_path(&path);
            }
        }

        ui.separator();

        let has_image = self.guide.image.is_some();
        ui.horizontal(|ui| {
            ui.heading("Sections");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .add_enabled(has_image, egui::Button::new("Add Section"))
                    .clicked()
                {
                    self.controller.start_placement(has_image);
                }
            });
        });
        ui.add_space(4.0);

        let editing = self.controller.editing_target().map(str::to_owned);
        match editing.and_then(|id| self.guide.section(&id).cloned()) {
            Some(section) => self.show_section_form(ui, section),
            None => self.show_section_list(ui, has_image),
        }
    }

    fn show_section_form(&mut self, ui: &mut egui::Ui, section: Section) {
        let id = section.id.clone();

        ui.label("Title");
        let mut title = section.title.clone();
        if ui.text_edit_singleline(&mut title).changed() {
            self.guide.update_section(
                &id,
                SectionPatch {
                    title: Some(title),
                    ..SectionPatch::default()
                },
            );
        }

        ui.add_space(4.0);
        ui.label("Content / Notes");
        let mut content = section.content.clone();
        if self.rich_text.show(ui, &mut content) {
            self.guide.update_section(
                &id,
                SectionPatch {
                    content: Some(content),
                    ..SectionPatch::default()
                },
            );
        }

        ui.add_space(4.0);
        ui.label("Category");
        let mut key = section.category_key;
        egui::ComboBox::from_id_salt("section-category")
            .selected_text(key.name())
            .show_ui(ui, |ui| {
                for candidate in CategoryKey::ALL {
                    ui.selectable_value(&mut key, candidate, candidate.name());
                }
            });
        if key != section.category_key {
            self.guide.update_section(
                &id,
                SectionPatch {
                    category_key: Some(key),
                    ..SectionPatch::default()
                },
            );
        }

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            if ui.button("Move Pin").clicked() {
                self.controller.start_move(id.clone());
            }
            if ui.button("Delete").clicked() {
                self.delete_section(&id);
            }
        });
        if ui.button("Done Editing").clicked() {
            self.controller.finish_editing();
        }
    }

    fn show_section_list(&mut self, ui: &mut egui::Ui, has_image: bool) {
        if self.guide.sections.is_empty() {
            let hint = if has_image {
                "Click 'Add Section' to place a pin on the image."
            } else {
                "Upload an image or a saved guide to start."
            };
            ui.label(RichText::new(hint).color(Color32::GRAY));
            return;
        }

        let mut to_edit = None;
        let mut to_delete = None;
        egui::ScrollArea::vertical().show(ui, |ui| {
            for section in &self.guide.sections {
                ui.horizontal(|ui| {
                    let (dot, _) = ui.allocate_exact_size(vec2(10.0, 10.0), Sense::hover());
                    ui.painter()
                        .circle_filled(dot.center(), 5.0, section.category_key.color32());
                    ui.label(&section.title);
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("✕").clicked() {
                            to_delete = Some(section.id.clone());
                        }
                        if ui.small_button("Edit").clicked() {
                            to_edit = Some(section.id.clone());
                        }
                    });
                });
            }
        });
        if let Some(id) = to_edit {
            self.active_section = Some(id.clone());
            self.rich_text.reset();
            self.controller.edit(id);
        }
        if let Some(id) = to_delete {
            self.delete_section(&id);
        }
    }

    // ── Detail pane ─────────────────────────────────────────────────────────

    fn show_detail_pane(&mut self, ui: &mut egui::Ui) {
        let Some(section) = self
            .active_section
            .as_deref()
            .and_then(|id| self.guide.section(id))
        else {
            ui.add_space(20.0);
            ui.vertical_centered(|ui| {
                ui.label(RichText::new("Select a Section").heading().color(Color32::GRAY));
                ui.add_space(4.0);
                ui.label("Click a numbered pin on the image to see its details.");
            });
            return;
        };

        let color = section.category_key.color32();
        let number = self.guide.display_number(&section.id).unwrap_or(0);
        ui.horizontal(|ui| {
            ui.label(
                RichText::new(format!(" {number} "))
                    .strong()
                    .color(Color32::WHITE)
                    .background_color(color),
            );
            ui.heading(RichText::new(section.title.as_str()).color(color));
        });
        ui.label(
            RichText::new(section.category_key.name())
                .small()
                .color(Color32::GRAY),
        );
        ui.separator();
        let preview = strip_tags(&section.content);
        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.label(preview);
        });
    }
}

impl eframe::App for GuideApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ensure_texture(ctx);

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("guidemark");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let can_export = self.guide.image.is_some();
                    if ui
                        .add_enabled(can_export, egui::Button::new("Export HTML"))
                        .clicked()
                    {
                        self.export();
                    }
                });
            });
        });

        egui::SidePanel::left("editor")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                self.show_editor_panel(ui);
            });

        egui::SidePanel::right("detail")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                self.show_detail_pane(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_canvas(ui);
        });
    }
}

fn is_guide_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"))
}

/// Largest rect with the image's aspect ratio centered inside `avail`.
fn fitted_image_rect(avail: Rect, image_size: (f32, f32)) -> Rect {
    let scale = (avail.width() / image_size.0).min(avail.height() / image_size.1);
    let size = vec2(image_size.0 * scale, image_size.1 * scale);
    Rect::from_center_size(avail.center(), size)
}

fn pin_center(section: &Section, image_rect: Rect) -> Pos2 {
    pos2(
        image_rect.left() + image_rect.width() * (section.x as f32 / 100.0),
        image_rect.top() + image_rect.height() * (section.y as f32 / 100.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::Mode;
    use std::io::Write;

    fn png_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        let img = image::RgbaImage::from_pixel(4, 2, image::Rgba([0, 128, 255, 255]));
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn app_with_image() -> GuideApp {
        let mut app = GuideApp::new(None);
        app.guide
            .reset_with_image("data:image/png;base64,AA".to_string());
        app
    }

    #[test]
    fn fitted_rect_preserves_aspect_and_centers() {
        let avail = Rect::from_min_size(pos2(0.0, 0.0), vec2(1000.0, 500.0));
        let fitted = fitted_image_rect(avail, (200.0, 100.0));
        assert_eq!(fitted.width(), 1000.0);
        assert_eq!(fitted.height(), 500.0);

        let tall = fitted_image_rect(avail, (100.0, 200.0));
        assert_eq!(tall.height(), 500.0);
        assert_eq!(tall.width(), 250.0);
        assert_eq!(tall.center(), avail.center());
    }

    #[test]
    fn pin_center_maps_percentages_into_the_rect() {
        let rect = Rect::from_min_size(pos2(100.0, 50.0), vec2(400.0, 200.0));
        let section = Section {
            id: "s1".to_string(),
            title: String::new(),
            content: String::new(),
            category_key: CategoryKey::NotesOther,
            x: 50.0,
            y: 25.0,
        };
        let center = pin_center(&section, rect);
        assert_eq!(center, pos2(300.0, 100.0));
    }

    #[test]
    fn clicking_a_pin_selects_it_without_opening_its_editor() {
        let mut app = app_with_image();
        let id = app.guide.add_section(50.0, 25.0);

        let image_rect = Rect::from_min_size(pos2(100.0, 50.0), vec2(400.0, 200.0));
        let on_pin = pin_center(app.guide.section(&id).unwrap(), image_rect);
        app.handle_canvas_click(on_pin, image_rect);

        assert_eq!(app.active_section.as_deref(), Some(id.as_str()));
        assert_eq!(*app.controller.mode(), Mode::Idle);

        app.active_section = None;
        let off_pin = pos2(image_rect.right() - 1.0, image_rect.bottom() - 1.0);
        app.handle_canvas_click(off_pin, image_rect);
        assert!(app.active_section.is_none());
    }

    #[test]
    fn deleting_the_active_and_edited_section_clears_both_references() {
        let mut app = app_with_image();
        let id = app.guide.add_section(10.0, 10.0);
        app.active_section = Some(id.clone());
        app.controller.edit(id.clone());

        app.delete_section(&id);

        assert!(app.active_section.is_none());
        assert_eq!(*app.controller.mode(), Mode::Idle);
        assert!(app.guide.sections.is_empty());
    }

    #[test]
    fn unsupported_upload_sets_banner_and_leaves_guide_untouched() {
        let mut app = app_with_image();
        let before_image = app.guide.image.clone();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"plain text")
            .unwrap();

        app.load_path(&path);
        assert!(app.banner.is_some());
        assert_eq!(app.guide.image, before_image);
    }

    #[test]
    fn image_upload_resets_the_guide() {
        let mut app = app_with_image();
        app.guide.title = "Tour".to_string();
        app.guide.add_section(5.0, 5.0);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::write(&path, png_bytes()).unwrap();

        app.load_path(&path);
        assert!(app.banner.is_none());
        assert_eq!(app.guide.title, crate::model::DEFAULT_GUIDE_TITLE);
        assert!(app.guide.sections.is_empty());
        assert!(app
            .guide
            .image
            .as_deref()
            .unwrap()
            .starts_with("data:image/png;base64,"));
    }

    #[test]
    fn failed_import_leaves_existing_guide_untouched() {
        let mut app = app_with_image();
        let id = app.guide.add_section(30.0, 40.0);
        let before = app.guide.sections.clone();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.html");
        std::fs::write(&path, "<html><body><p>nothing here</p></body></html>").unwrap();

        app.load_path(&path);
        assert!(app.banner.is_some());
        assert_eq!(app.guide.sections, before);
        assert!(app.guide.section(&id).is_some());
    }

    #[test]
    fn successful_import_replaces_the_guide_and_clears_selection() {
        let mut app = app_with_image();
        app.active_section = Some("stale".to_string());
        app.controller.edit("stale".to_string());

        let image_uri = codec::image_data_uri(&png_bytes()).unwrap();
        let sections = vec![Section {
            id: "s1".to_string(),
            title: "Lobby".to_string(),
            content: "<b>Hi</b>".to_string(),
            category_key: CategoryKey::NotesOther,
            x: 50.0,
            y: 25.0,
        }];
        let document = codec::render("Tour", &image_uri, &sections).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tour_guide.html");
        std::fs::write(&path, document).unwrap();

        app.load_path(&path);
        assert!(app.banner.is_none());
        assert_eq!(app.guide.title, "Tour");
        assert_eq!(app.guide.sections, sections);
        assert!(app.active_section.is_none());
        assert_eq!(*app.controller.mode(), Mode::Idle);
    }

    #[test]
    fn export_without_image_raises_the_prompt_and_writes_nothing() {
        let mut app = GuideApp::new(None);
        app.export();
        assert_eq!(app.banner.as_deref(), Some(EXPORT_WITHOUT_IMAGE_PROMPT));
    }

    #[test]
    fn write_export_produces_an_importable_document() {
        let mut app = app_with_image();
        app.guide.title = "Tour".to_string();
        app.guide.add_section(50.0, 25.0);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tour_guide.html");
        app.write_export(&path, &app.guide.image.clone().unwrap())
            .unwrap();

        let document = std::fs::read_to_string(&path).unwrap();
        assert!(document.contains("guide-data"));
        let imported = codec::parse(&document).unwrap();
        assert_eq!(imported.title, "Tour");
        assert_eq!(imported.sections, app.guide.sections);
    }
}
