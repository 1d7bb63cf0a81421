//! Scripted input: the headless stand-in for window events.
//!
//! A script is a JSON document `{ "events": [...] }`. Each event is tagged
//! with its type and carries its payload under `data`:
//!
//! ```json
//! { "type": "SelectMode", "data": "deform" }
//! { "type": "PointerDragged", "data": [120.0, 40.0] }
//! { "type": "Tick" }
//! ```
//!
//! Pointer positions are in mesh coordinates.

mod demo;

pub use demo::demo_script;

use std::path::Path;

use deformation::{DeformationSession, InteractionMode};
use glam::DVec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InputEvent {
    SelectMode(InteractionMode),
    KeyReleased(char),
    PointerMoved([f64; 2]),
    PointerPressed([f64; 2]),
    PointerDragged([f64; 2]),
    Scrolled(f64),
    Tick,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub events: Vec<InputEvent>,
}

impl Script {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path).map_err(|source| AppError::ScriptRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text).map_err(|source| AppError::ScriptParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Feeds events into a session and counts the ticks that recomputed.
#[derive(Debug, Default)]
pub struct ScriptRunner {
    ticks: usize,
    refreshes: usize,
}

impl ScriptRunner {
    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes
    }

    /// Run every event, then one final tick so staged drags are solved.
    pub fn run(&mut self, session: &mut DeformationSession, script: &Script) -> Result<(), AppError> {
        info!("Running script with {} events", script.events.len());
        for event in &script.events {
            self.apply(session, event)?;
        }
        self.apply(session, &InputEvent::Tick)?;
        info!(
            "Script finished: {} ticks, {} recomputes",
            self.ticks, self.refreshes
        );
        Ok(())
    }

    pub fn apply(&mut self, session: &mut DeformationSession, event: &InputEvent) -> Result<(), AppError> {
        debug!("event {:?}", event);
        match *event {
            InputEvent::SelectMode(mode) => {
                session.select_mode(mode)?;
            }
            InputEvent::KeyReleased(key) => {
                session.key_released(key)?;
            }
            InputEvent::PointerMoved([x, y]) => session.pointer_moved(DVec2::new(x, y))?,
            InputEvent::PointerPressed([x, y]) => session.pointer_pressed(DVec2::new(x, y))?,
            InputEvent::PointerDragged([x, y]) => session.pointer_dragged(DVec2::new(x, y))?,
            InputEvent::Scrolled(amount) => {
                session.scrolled(amount);
            }
            InputEvent::Tick => {
                self.ticks += 1;
                if session.update()?.is_some() {
                    self.refreshes += 1;
                }
            }
        }
        Ok(())
    }
}
