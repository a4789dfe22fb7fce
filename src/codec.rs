//! Export/import codec for self-contained guide documents.
//!
//! `render` turns `(title, image, sections)` into one static HTML page:
//! the image inline as a data URI, numbered pins positioned by their stored
//! percentages with category colors baked in, and the full section list in a
//! versioned `<script type="application/json" id="guide-data">` block that
//! the embedded viewer script reads at page load. `parse` recovers the same
//! triple from such a document. Both directions are pure functions; the app
//! shell decides when to write files and when to apply a parsed guide.

use std::collections::HashSet;
use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use maud::{html, PreEscaped, DOCTYPE};
use regex::Regex;
use thiserror::Error;

use crate::model::Section;

const CSS: &str = include_str!("../static/viewer.css");
const JS: &str = include_str!("../static/viewer.js");

/// Bumped when the embedded payload shape changes; carried on the data block
/// as `data-version`.
pub const DATA_FORMAT_VERSION: &str = "1";

/// Title used when an imported document carries no `<title>` element.
pub const IMPORTED_GUIDE_TITLE: &str = "Imported Guide";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImportError {
    #[error("could not find an image in the document")]
    MissingImage,
    #[error("could not find the embedded section data block")]
    MissingSectionData,
    #[error("could not decode the embedded section data: {0}")]
    UnparsableSectionData(String),
}

/// The triple recovered by [`parse`]. Applied to the live guide wholesale,
/// and only after the whole document decoded cleanly.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportedGuide {
    pub title: String,
    pub image: String,
    pub sections: Vec<Section>,
}

/// Renders the exported document. Pure: identical input yields identical
/// output. The caller guarantees an image is present (export is rejected in
/// the UI before this point otherwise).
pub fn render(title: &str, image: &str, sections: &[Section]) -> Result<String, serde_json::Error> {
    let payload = escape_script_payload(&serde_json::to_string(sections)?);

    let markup = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(CSS)) }
            }
            body {
                header.guide-header {
                    h1 { (title) }
                }
                main.guide-body {
                    div id="image-wrapper" {
                        img src=(image) alt=(title);
                        @for (idx, section) in sections.iter().enumerate() {
                            @let category = section.category_key;
                            button.pin
                                data-section-id=(section.id)
                                data-category-name=(category.name())
                                style=(pin_style(section)) {
                                (idx + 1)
                            }
                        }
                    }
                    aside id="detail-pane" {
                        p.placeholder { "Click a numbered pin to see its details." }
                    }
                }
                script type="application/json" id="guide-data" data-version=(DATA_FORMAT_VERSION) {
                    (PreEscaped(payload))
                }
                script { (PreEscaped(JS)) }
            }
        }
    };

    Ok(markup.into_string())
}

fn pin_style(section: &Section) -> String {
    format!(
        "left:{}%;top:{}%;background-color:{};",
        section.x,
        section.y,
        section.category_key.color()
    )
}

/// `</` inside a `<script>` element would terminate the block early no matter
/// what the surrounding JSON says, so it is emitted as the equivalent JSON
/// escape `<\/`.
fn escape_script_payload(json: &str) -> String {
    json.replace("</", "<\\/")
}

/// Derives the export file name from the guide title: runs of whitespace
/// become single underscores, the result is lower-cased and suffixed
/// `_guide.html`.
pub fn export_file_name(title: &str) -> String {
    let collapsed = whitespace_re().replace_all(title, "_");
    format!("{}_guide.html", collapsed.to_lowercase())
}

/// Recovers `(title, image, sections)` from a document produced by [`render`]
/// or a structurally compatible one, including guides exported by the
/// original browser tool (its sections live in a `const sections = [...]`
/// script literal instead of the data block).
pub fn parse(document: &str) -> Result<ImportedGuide, ImportError> {
    let image = image_re()
        .captures(document)
        .map(|c| unescape_html(&c[1]))
        .ok_or(ImportError::MissingImage)?;

    let payload = match data_block_re().captures(document) {
        Some(c) => c[1].trim().to_string(),
        None => legacy_sections_re()
            .captures(document)
            .map(|c| c[1].to_string())
            .ok_or(ImportError::MissingSectionData)?,
    };

    let sections: Vec<Section> = serde_json::from_str(&payload)
        .map_err(|e| ImportError::UnparsableSectionData(e.to_string()))?;
    validate_sections(&sections)?;

    let title = title_re()
        .captures(document)
        .map(|c| unescape_html(c[1].trim()))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| IMPORTED_GUIDE_TITLE.to_string());

    Ok(ImportedGuide {
        title,
        image,
        sections,
    })
}

/// Imported sections become live model state, so the model's invariants are
/// enforced here: distinct ids and in-range pin positions.
fn validate_sections(sections: &[Section]) -> Result<(), ImportError> {
    let mut seen = HashSet::new();
    for section in sections {
        if !seen.insert(section.id.as_str()) {
            return Err(ImportError::UnparsableSectionData(format!(
                "duplicate section id {:?}",
                section.id
            )));
        }
        if !(0.0..=100.0).contains(&section.x) || !(0.0..=100.0).contains(&section.y) {
            return Err(ImportError::UnparsableSectionData(format!(
                "pin position ({}, {}) out of range for section {:?}",
                section.x, section.y, section.id
            )));
        }
    }
    Ok(())
}

/// Encodes raw image bytes as a data URI. The bytes must decode as an image;
/// anything else is the caller's "unsupported file type" condition.
pub fn image_data_uri(bytes: &[u8]) -> Result<String, image::ImageError> {
    let format = image::guess_format(bytes)?;
    image::load_from_memory_with_format(bytes, format)?;
    Ok(format!(
        "data:{};base64,{}",
        format.to_mime_type(),
        STANDARD.encode(bytes)
    ))
}

/// Recovers the raw bytes of a `data:<mime>;base64,<payload>` URI.
pub fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
    let (_, payload) = uri.split_once(";base64,")?;
    STANDARD.decode(payload).ok()
}

fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<title>(.*?)</title>").unwrap())
}

fn image_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?s)id="image-wrapper".*?<img[^>]*\ssrc="([^"]*)""#).unwrap())
}

fn data_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?s)<script[^>]*id="guide-data"[^>]*>(.*?)</script>"#).unwrap())
}

fn legacy_sections_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)const sections = (\[.*?\]);").unwrap())
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}
