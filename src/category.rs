//! The fixed category table: each key maps to a display name and a color.
//!
//! The table is closed: sections carry a [`CategoryKey`], so an unknown
//! category is unrepresentable in memory and a decode error at import time.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryKey {
    #[serde(rename = "MUST_SEE")]
    MustSee,
    #[serde(rename = "FOOD_DRINK")]
    FoodDrink,
    #[serde(rename = "SHOPPING")]
    Shopping,
    #[serde(rename = "ACTIVITY")]
    Activity,
    #[serde(rename = "GETTING_AROUND")]
    GettingAround,
    #[default]
    #[serde(rename = "NOTES_OTHER")]
    NotesOther,
}

impl CategoryKey {
    pub const ALL: [CategoryKey; 6] = [
        CategoryKey::MustSee,
        CategoryKey::FoodDrink,
        CategoryKey::Shopping,
        CategoryKey::Activity,
        CategoryKey::GettingAround,
        CategoryKey::NotesOther,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CategoryKey::MustSee => "Must See",
            CategoryKey::FoodDrink => "Food & Drink",
            CategoryKey::Shopping => "Shopping",
            CategoryKey::Activity => "Activity",
            CategoryKey::GettingAround => "Getting Around",
            CategoryKey::NotesOther => "Notes / Other",
        }
    }

    /// CSS hex color, baked into exported documents.
    pub fn color(self) -> &'static str {
        match self {
            CategoryKey::MustSee => "#ef4444",
            CategoryKey::FoodDrink => "#f97316",
            CategoryKey::Shopping => "#8b5cf6",
            CategoryKey::Activity => "#22c55e",
            CategoryKey::GettingAround => "#3b82f6",
            CategoryKey::NotesOther => "#64748b",
        }
    }

    pub fn color32(self) -> egui::Color32 {
        let hex = &self.color()[1..];
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0);
        egui::Color32::from_rgb(channel(0), channel(2), channel(4))
    }
}
