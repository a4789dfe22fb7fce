//! The guide data model: a title, one base image, and an ordered list of
//! pinned sections. A pin's display number is its 1-based position in the
//! list, so order must survive every operation and the export/import cycle.

use serde::{Deserialize, Serialize};

use crate::category::CategoryKey;

pub const DEFAULT_GUIDE_TITLE: &str = "My Interactive Guide";
pub const DEFAULT_SECTION_TITLE: &str = "New Section";
pub const DEFAULT_SECTION_CONTENT: &str = "Add your detailed notes here.";

/// One pinned section. The JSON shape (field names, `categoryKey`, percentage
/// coordinates) matches the payload embedded in exported guides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    /// Rich text as HTML markup; may embed `<img>` tags with data-URI sources.
    pub content: String,
    #[serde(rename = "categoryKey")]
    pub category_key: CategoryKey,
    /// Pin position as percentages of the image's rendered box, in [0, 100].
    pub x: f64,
    pub y: f64,
}

/// Field-level update for [`Guide::update_section`]; `None` leaves the field
/// as it was.
#[derive(Clone, Debug, Default)]
pub struct SectionPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_key: Option<CategoryKey>,
    pub position: Option<(f64, f64)>,
}

impl SectionPatch {
    fn apply(self, mut section: Section) -> Section {
        if let Some(title) = self.title {
            section.title = title;
        }
        if let Some(content) = self.content {
            section.content = content;
        }
        if let Some(key) = self.category_key {
            section.category_key = key;
        }
        if let Some((x, y)) = self.position {
            section.x = x;
            section.y = y;
        }
        section
    }
}

#[derive(Clone, Debug)]
pub struct Guide {
    pub title: String,
    /// Base image as a data URI. At most one; replacing it resets the guide.
    pub image: Option<String>,
    pub sections: Vec<Section>,
    /// Per-guide sequence appended to minted ids so that adds landing on the
    /// same millisecond still get distinct ids.
    next_seq: u64,
}

impl Guide {
    pub fn new() -> Self {
        Guide {
            title: DEFAULT_GUIDE_TITLE.to_string(),
            image: None,
            sections: Vec::new(),
            next_seq: 0,
        }
    }

    /// Wholesale replacement on a new image upload: default title, no
    /// sections. The caller is responsible for clearing its own
    /// active/editing references.
    pub fn reset_with_image(&mut self, data_uri: String) {
        *self = Guide {
            image: Some(data_uri),
            ..Guide::new()
        };
    }

    /// Replacement from a successful import. Sections arrive already
    /// validated by the codec.
    pub fn replace_from_import(&mut self, title: String, image: String, sections: Vec<Section>) {
        *self = Guide {
            title,
            image: Some(image),
            sections,
            next_seq: 0,
        };
    }

    fn mint_id(&mut self) -> String {
        let millis = chrono::Utc::now().timestamp_millis();
        let seq = self.next_seq;
        self.next_seq += 1;
        format!("section-{millis}-{seq}")
    }

    /// Appends a new section with default title/content/category at the given
    /// normalized position and returns its id. The position is produced by
    /// the interaction layer and is already inside [0, 100].
    pub fn add_section(&mut self, x: f64, y: f64) -> String {
        let id = self.mint_id();
        self.sections.push(Section {
            id: id.clone(),
            title: DEFAULT_SECTION_TITLE.to_string(),
            content: DEFAULT_SECTION_CONTENT.to_string(),
            category_key: CategoryKey::default(),
            x,
            y,
        });
        id
    }

    /// Replaces the patched fields on the section matching `id` by rebuilding
    /// the sequence. A stale id is a silent no-op; the return value reports
    /// whether anything matched.
    pub fn update_section(&mut self, id: &str, patch: SectionPatch) -> bool {
        let found = self.sections.iter().any(|s| s.id == id);
        if !found {
            tracing::debug!(id, "update for unknown section ignored");
            return false;
        }
        self.sections = std::mem::take(&mut self.sections)
            .into_iter()
            .map(|s| {
                if s.id == id {
                    patch.clone().apply(s)
                } else {
                    s
                }
            })
            .collect();
        true
    }

    /// Removes the section matching `id`. A stale id is a silent no-op.
    pub fn delete_section(&mut self, id: &str) -> bool {
        let before = self.sections.len();
        self.sections.retain(|s| s.id != id);
        let found = self.sections.len() != before;
        if !found {
            tracing::debug!(id, "delete for unknown section ignored");
        }
        found
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// 1-based display number of a section, i.e. the label on its pin.
    pub fn display_number(&self, id: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.id == id).map(|i| i + 1)
    }
}
