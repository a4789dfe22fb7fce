//! Interaction modes for the preview canvas.
//!
//! Exactly one mode is active at a time; the tagged enum makes combinations
//! like placing-while-moving unrepresentable. Which pin is shown in the
//! detail pane ("active") is separate UI-selection state owned by the app and
//! can coexist with `Idle`.

use egui::{Pos2, Rect};

use crate::model::Guide;

pub const PLACE_PROMPT: &str = "Click on the image to place the new pin.";
pub const MOVE_PROMPT: &str = "Click on the image to set the new location for the pin.";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Idle,
    PlacingPin,
    MovingPin(String),
    EditingSection(String),
}

/// Maps a click inside the image's rendered box to percentage coordinates.
/// For clicks inside the box the result lands in [0, 100] without clamping.
pub fn pin_position(click: Pos2, image_rect: Rect) -> (f64, f64) {
    let x = 100.0 * f64::from(click.x - image_rect.left()) / f64::from(image_rect.width());
    let y = 100.0 * f64::from(click.y - image_rect.top()) / f64::from(image_rect.height());
    (x, y)
}

#[derive(Debug, Default)]
pub struct ModeController {
    mode: Mode,
    status: Option<&'static str>,
}

impl ModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Prompt shown over the preview while a click is awaited.
    pub fn status(&self) -> Option<&'static str> {
        self.status
    }

    pub fn is_placing(&self) -> bool {
        self.mode == Mode::PlacingPin
    }

    pub fn moving_target(&self) -> Option<&str> {
        match &self.mode {
            Mode::MovingPin(id) => Some(id),
            _ => None,
        }
    }

    pub fn editing_target(&self) -> Option<&str> {
        match &self.mode {
            Mode::EditingSection(id) => Some(id),
            _ => None,
        }
    }

    /// Begin pin placement. Rejected while no image is loaded. Entering
    /// placement exits any section editor.
    pub fn start_placement(&mut self, has_image: bool) -> bool {
        if !has_image {
            tracing::warn!("pin placement requested with no image loaded");
            return false;
        }
        self.mode = Mode::PlacingPin;
        self.status = Some(PLACE_PROMPT);
        true
    }

    /// Begin moving the pin of an existing section. Exits any section editor.
    pub fn start_move(&mut self, id: String) {
        self.mode = Mode::MovingPin(id);
        self.status = Some(MOVE_PROMPT);
    }

    /// Open a section's editor directly (from the section list or right after
    /// placement).
    pub fn edit(&mut self, id: String) {
        self.mode = Mode::EditingSection(id);
        self.status = None;
    }

    pub fn finish_editing(&mut self) {
        if matches!(self.mode, Mode::EditingSection(_)) {
            self.mode = Mode::Idle;
        }
    }

    /// A click at normalized coordinates inside the image box. While placing,
    /// creates a section and opens its editor; while moving, overwrites the
    /// target's position and re-opens its editor. Returns the id of the
    /// section that became the editing target, which the caller should also
    /// mark active for the preview pane.
    pub fn image_click(&mut self, guide: &mut Guide, x: f64, y: f64) -> Option<String> {
        match std::mem::take(&mut self.mode) {
            Mode::PlacingPin => {
                let id = guide.add_section(x, y);
                tracing::info!(%id, x, y, "pin placed");
                self.edit(id.clone());
                Some(id)
            }
            Mode::MovingPin(id) => {
                guide.update_section(
                    &id,
                    crate::model::SectionPatch {
                        position: Some((x, y)),
                        ..Default::default()
                    },
                );
                tracing::info!(%id, x, y, "pin moved");
                self.edit(id.clone());
                Some(id)
            }
            other => {
                self.mode = other;
                None
            }
        }
    }

    /// Drop back to `Idle` when the section a mode refers to is deleted out
    /// from under it.
    pub fn section_deleted(&mut self, id: &str) {
        let orphaned = match &self.mode {
            Mode::MovingPin(target) | Mode::EditingSection(target) => target == id,
            _ => false,
        };
        if orphaned {
            self.mode = Mode::Idle;
            self.status = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    fn rect() -> Rect {
        Rect::from_min_size(pos2(100.0, 50.0), egui::vec2(400.0, 200.0))
    }

    #[test]
    fn placement_requires_an_image() {
        let mut ctl = ModeController::new();
        assert!(!ctl.start_placement(false));
        assert_eq!(*ctl.mode(), Mode::Idle);
        assert!(ctl.status().is_none());
    }

    #[test]
    fn center_click_places_pin_at_fifty_fifty() {
        let mut ctl = ModeController::new();
        let mut guide = Guide::new();
        guide.reset_with_image("data:image/png;base64,AA".to_string());

        assert!(ctl.start_placement(true));
        assert!(ctl.is_placing());
        assert_eq!(ctl.status(), Some(PLACE_PROMPT));

        let (x, y) = pin_position(rect().center(), rect());
        let id = ctl.image_click(&mut guide, x, y).unwrap();

        let section = guide.section(&id).unwrap();
        assert!((section.x - 50.0).abs() < 1e-9);
        assert!((section.y - 50.0).abs() < 1e-9);
        assert_eq!(*ctl.mode(), Mode::EditingSection(id));
        assert!(ctl.status().is_none());
    }

    #[test]
    fn clicks_inside_the_box_stay_in_range() {
        let r = rect();
        for point in [
            r.min,
            r.max,
            r.center(),
            pos2(r.left() + 1.0, r.bottom() - 1.0),
            pos2(r.right() - 0.5, r.top() + 0.5),
        ] {
            let (x, y) = pin_position(point, r);
            assert!((0.0..=100.0).contains(&x), "x out of range: {x}");
            assert!((0.0..=100.0).contains(&y), "y out of range: {y}");
        }
    }

    #[test]
    fn move_overwrites_position_and_reopens_editor() {
        let mut ctl = ModeController::new();
        let mut guide = Guide::new();
        guide.reset_with_image("data:image/png;base64,AA".to_string());
        let id = guide.add_section(10.0, 10.0);

        ctl.start_move(id.clone());
        assert_eq!(ctl.moving_target(), Some(id.as_str()));
        assert_eq!(ctl.status(), Some(MOVE_PROMPT));

        let target = ctl.image_click(&mut guide, 80.0, 40.0).unwrap();
        assert_eq!(target, id);
        let section = guide.section(&id).unwrap();
        assert_eq!((section.x, section.y), (80.0, 40.0));
        assert_eq!(*ctl.mode(), Mode::EditingSection(id));
    }

    #[test]
    fn starting_placement_or_move_clears_editing() {
        let mut ctl = ModeController::new();
        ctl.edit("section-1-0".to_string());
        ctl.start_placement(true);
        assert!(ctl.editing_target().is_none());

        ctl.edit("section-1-0".to_string());
        ctl.start_move("section-1-0".to_string());
        assert!(ctl.editing_target().is_none());
        assert_eq!(ctl.moving_target(), Some("section-1-0"));
    }

    #[test]
    fn at_most_one_mode_is_ever_active() {
        let mut ctl = ModeController::new();
        ctl.start_placement(true);
        let exclusive = |c: &ModeController| {
            [
                c.is_placing(),
                c.moving_target().is_some(),
                c.editing_target().is_some(),
            ]
            .iter()
            .filter(|b| **b)
            .count()
                <= 1
        };
        assert!(exclusive(&ctl));
        ctl.start_move("s".to_string());
        assert!(exclusive(&ctl));
        ctl.edit("s".to_string());
        assert!(exclusive(&ctl));
    }

    #[test]
    fn idle_clicks_do_nothing() {
        let mut ctl = ModeController::new();
        let mut guide = Guide::new();
        guide.reset_with_image("data:image/png;base64,AA".to_string());
        assert!(ctl.image_click(&mut guide, 50.0, 50.0).is_none());
        assert!(guide.sections.is_empty());
        assert_eq!(*ctl.mode(), Mode::Idle);
    }

    #[test]
    fn deleting_the_referenced_section_drops_to_idle() {
        let mut ctl = ModeController::new();
        ctl.edit("a".to_string());
        ctl.section_deleted("b");
        assert_eq!(ctl.editing_target(), Some("a"));
        ctl.section_deleted("a");
        assert_eq!(*ctl.mode(), Mode::Idle);

        ctl.start_move("a".to_string());
        ctl.section_deleted("a");
        assert_eq!(*ctl.mode(), Mode::Idle);
        assert!(ctl.status().is_none());
    }

    #[test]
    fn finish_editing_returns_to_idle() {
        let mut ctl = ModeController::new();
        ctl.edit("a".to_string());
        ctl.finish_editing();
        assert_eq!(*ctl.mode(), Mode::Idle);
    }
}
