//! Interaction modes and the gesture mapping for each.
//!
//! | Mode                  | Key | Hover         | Press         | Drag          |
//! |-----------------------|-----|---------------|---------------|---------------|
//! | add control points    | `a` | nothing       | add near      | add near      |
//! | remove control points | `r` | nothing       | remove near   | remove near   |
//! | deform                | `d` | pick drag set | pick drag set | move drag set |
//! | view                  | `v` | nothing       | nothing       | nothing       |
//!
//! Sessions start in add mode.

use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    #[default]
    AddControlPoints,
    RemoveControlPoints,
    Deform,
    View,
}

impl InteractionMode {
    pub const ALL: [InteractionMode; 4] = [
        InteractionMode::AddControlPoints,
        InteractionMode::RemoveControlPoints,
        InteractionMode::Deform,
        InteractionMode::View,
    ];

    pub fn from_key(key: char) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.hotkey() == key.to_ascii_lowercase())
    }

    pub fn hotkey(self) -> char {
        match self {
            InteractionMode::AddControlPoints => 'a',
            InteractionMode::RemoveControlPoints => 'r',
            InteractionMode::Deform => 'd',
            InteractionMode::View => 'v',
        }
    }

    /// Status text for the mode indicator.
    pub fn label(self) -> &'static str {
        match self {
            InteractionMode::AddControlPoints => "Add control points",
            InteractionMode::RemoveControlPoints => "Remove control points",
            InteractionMode::Deform => "Deform",
            InteractionMode::View => "View",
        }
    }
}

/// Raw pointer input, already in mesh coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Moved,
    Pressed,
    Dragged,
}

/// What the session should do with a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureAction {
    AddNear,
    RemoveNear,
    PickDragSet,
    Drag,
    None,
}

/// Current mode plus the mode-to-gesture table.
#[derive(Debug, Clone, Copy, Default)]
pub struct InteractionModeController {
    mode: InteractionMode,
}

impl InteractionModeController {
    pub fn new(mode: InteractionMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    /// Switch modes, returning the previous one.
    pub fn set_mode(&mut self, mode: InteractionMode) -> InteractionMode {
        let previous = std::mem::replace(&mut self.mode, mode);
        if previous != mode {
            info!("mode: {}", mode.label());
        }
        previous
    }

    pub fn dispatch(&self, event: PointerEvent) -> GestureAction {
        match (self.mode, event) {
            (InteractionMode::Deform, PointerEvent::Moved | PointerEvent::Pressed) => {
                GestureAction::PickDragSet
            }
            (InteractionMode::Deform, PointerEvent::Dragged) => GestureAction::Drag,
            (_, PointerEvent::Moved) => GestureAction::None,
            (InteractionMode::AddControlPoints, _) => GestureAction::AddNear,
            (InteractionMode::RemoveControlPoints, _) => GestureAction::RemoveNear,
            (InteractionMode::View, _) => GestureAction::None,
        }
    }

    pub fn is_deforming(&self) -> bool {
        self.mode == InteractionMode::Deform
    }
}
