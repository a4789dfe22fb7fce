//! Rich text editing over an HTML markup string.
//!
//! Stands in for the original tool's contenteditable region: the widget is a
//! plain multiline editor bound to the section's HTML, and the toolbar
//! dispatches the discrete formatting commands {bold, italic, underline,
//! hyperlink, inline image} against the current selection. Binding the model
//! string directly every frame keeps widget and model in sync without an
//! explicit on-input/on-blur handshake.

use egui::RichText;

/// Toolbar + selection state for one rich text editor instance. The edited
/// string itself lives in the model and is passed in per frame.
#[derive(Default)]
pub struct RichTextEditor {
    /// Last observed selection as a char range, low index first.
    selection: (usize, usize),
    /// `Some` while the hyperlink URL prompt row is open.
    link_url: Option<String>,
}

impl RichTextEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops selection and any open URL prompt, for when the editor switches
    /// to a different section.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Renders toolbar and editor; mutates `html` in place. Returns whether
    /// the markup changed this frame.
    pub fn show(&mut self, ui: &mut egui::Ui, html: &mut String) -> bool {
        let mut changed = false;

        ui.horizontal(|ui| {
            if ui.button(RichText::new("B").strong()).clicked() {
                wrap_range(html, self.selection, "<b>", "</b>");
                changed = true;
            }
            if ui.button(RichText::new("I").italics()).clicked() {
                wrap_range(html, self.selection, "<i>", "</i>");
                changed = true;
            }
            if ui.button(RichText::new("U").underline()).clicked() {
                wrap_range(html, self.selection, "<u>", "</u>");
                changed = true;
            }
            if ui.button("Link").clicked() && self.link_url.is_none() {
                self.link_url = Some(String::new());
            }
            if ui.button("Image…").clicked() {
                changed |= self.insert_image(html);
            }
        });

        if let Some(url) = &mut self.link_url {
            let mut done = false;
            ui.horizontal(|ui| {
                ui.label("URL:");
                ui.text_edit_singleline(url);
                if ui.button("Insert").clicked() && !url.is_empty() {
                    let open = format!("<a href=\"{url}\">");
                    wrap_range(html, self.selection, &open, "</a>");
                    changed = true;
                    done = true;
                }
                if ui.button("Cancel").clicked() {
                    done = true;
                }
            });
            if done {
                self.link_url = None;
            }
        }

        let output = egui::TextEdit::multiline(html)
            .desired_rows(8)
            .desired_width(f32::INFINITY)
            .show(ui);
        if let Some(range) = output.state.cursor.char_range() {
            let (a, b) = (range.primary.index, range.secondary.index);
            self.selection = (a.min(b), a.max(b));
        }

        changed || output.response.changed()
    }

    /// Picks an image file and splices it in as an `<img>` with a data-URI
    /// source, so the markup stays self-contained.
    fn insert_image(&self, html: &mut String) -> bool {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg", "gif", "webp", "bmp"])
            .pick_file()
        else {
            return false;
        };
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "could not read image for insertion");
                return false;
            }
        };
        match crate::codec::image_data_uri(&bytes) {
            Ok(uri) => {
                insert_at(html, self.selection.1, &format!("<img src=\"{uri}\">"));
                true
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "not a usable image, nothing inserted");
                false
            }
        }
    }
}

fn byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Wraps the char range `(low, high)` in an open/close tag pair; with an
/// empty selection the pair is inserted at the cursor.
fn wrap_range(s: &mut String, range: (usize, usize), open: &str, close: &str) {
    let low = byte_index(s, range.0);
    let high = byte_index(s, range.1.max(range.0));
    s.insert_str(high, close);
    s.insert_str(low, open);
}

fn insert_at(s: &mut String, char_idx: usize, text: &str) {
    let at = byte_index(s, char_idx);
    s.insert_str(at, text);
}

/// Plain-text rendition of the markup for the in-editor detail pane (egui has
/// no HTML renderer; the exported viewer shows the real thing).
pub fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_range_wraps_the_selection() {
        let mut s = "make this bold".to_string();
        wrap_range(&mut s, (5, 9), "<b>", "</b>");
        assert_eq!(s, "make <b>this</b> bold");
    }

    #[test]
    fn wrap_range_with_empty_selection_inserts_a_pair() {
        let mut s = "cursor here".to_string();
        wrap_range(&mut s, (6, 6), "<i>", "</i>");
        assert_eq!(s, "cursor<i></i> here");
    }

    #[test]
    fn wrap_range_handles_multibyte_text() {
        let mut s = "caf\u{e9} au lait".to_string();
        wrap_range(&mut s, (0, 4), "<u>", "</u>");
        assert_eq!(s, "<u>caf\u{e9}</u> au lait");
    }

    #[test]
    fn wrap_range_clamps_past_the_end() {
        let mut s = "ab".to_string();
        wrap_range(&mut s, (1, 99), "<b>", "</b>");
        assert_eq!(s, "a<b>b</b>");
    }

    #[test]
    fn insert_at_splices_text() {
        let mut s = "before after".to_string();
        insert_at(&mut s, 6, "<img src=\"data:x\">");
        assert_eq!(s, "before<img src=\"data:x\"> after");
    }

    #[test]
    fn strip_tags_flattens_markup() {
        assert_eq!(strip_tags("<b>Hi</b> there"), "Hi there");
        assert_eq!(
            strip_tags("<a href=\"https://example.com\">map</a> &amp; notes"),
            "map & notes"
        );
        assert_eq!(strip_tags("an <img src=\"data:image/png;base64,AA\"> inline"), "an  inline");
    }
}
