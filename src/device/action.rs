//! Natural-language step classification.
//!
//! Steps are free-form instructions like "click the search icon",
//! "type hello and press enter" or "scroll down". Classification is
//! keyword-based and ordered: key presses before text entry (so
//! "press enter" is a keystroke), gestures before both.

use serde::{Deserialize, Serialize};

use crate::perception::types::{PixelPoint, ScreenSize};

/// Swipe duration used for scroll gestures.
pub const SWIPE_DURATION_MS: u32 = 300;

const DEFAULT_WAIT_SECS: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepAction {
    /// Tap a located element. The only variant that requires coordinates.
    Tap,
    TypeText { text: String },
    Scroll { direction: Direction },
    KeyPress { key: Key },
    Wait { seconds: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Back,
    Home,
    Enter,
}

impl Key {
    pub fn keycode(self) -> &'static str {
        match self {
            Key::Back => "KEYCODE_BACK",
            Key::Home => "KEYCODE_HOME",
            Key::Enter => "KEYCODE_ENTER",
        }
    }
}

pub fn parse_step(step: &str) -> StepAction {
    let lower = step.to_lowercase();
    let lower = lower.trim();

    if let Some(key) = parse_key_press(lower) {
        return StepAction::KeyPress { key };
    }

    if lower.contains("scroll") || lower.contains("swipe") {
        return StepAction::Scroll {
            direction: parse_direction(lower),
        };
    }

    if let Some(text) = extract_text(step) {
        return StepAction::TypeText { text };
    }

    if lower.starts_with("wait") {
        return StepAction::Wait {
            seconds: extract_wait_secs(lower),
        };
    }

    StepAction::Tap
}

/// Whether a step needs an element located before it can run.
/// Gestures, key presses, waits and text entry act without coordinates.
pub fn needs_location(action: &StepAction) -> bool {
    matches!(action, StepAction::Tap)
}

/// Explicit key-press phrasing: "press back", "go back", or a bare key name.
fn parse_key_press(lower: &str) -> Option<Key> {
    let explicit = lower.starts_with("press ")
        || lower.starts_with("go back")
        || lower == "back"
        || lower == "home";
    if !explicit {
        return None;
    }
    if lower.contains("back") {
        Some(Key::Back)
    } else if lower.contains("home") {
        Some(Key::Home)
    } else if lower.contains("enter") {
        Some(Key::Enter)
    } else {
        None
    }
}

fn parse_direction(lower: &str) -> Direction {
    if lower.contains("up") {
        Direction::Up
    } else if lower.contains("left") {
        Direction::Left
    } else if lower.contains("right") {
        Direction::Right
    } else {
        Direction::Down
    }
}

/// Pull the text payload out of a type/input/enter step, dropping the
/// trailing "and press enter" / "and send" instructions.
fn extract_text(step: &str) -> Option<String> {
    let lower = step.to_lowercase();
    for keyword in ["type ", "input ", "enter ", "text "] {
        if let Some(idx) = lower.find(keyword) {
            let text = step[idx + keyword.len()..].trim();
            let text = strip_suffix_ci(text, " and press enter");
            let text = strip_suffix_ci(text, " and send");
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            return Some(text.to_string());
        }
    }
    None
}

fn strip_suffix_ci<'a>(text: &'a str, suffix: &str) -> &'a str {
    let Some(split) = text.len().checked_sub(suffix.len()) else {
        return text;
    };
    if text.is_char_boundary(split) && text[split..].eq_ignore_ascii_case(suffix) {
        &text[..split]
    } else {
        text
    }
}

fn extract_wait_secs(lower: &str) -> f64 {
    let re = regex::Regex::new(r"wait\s+(\d+)").expect("static regex");
    re.captures(lower)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(DEFAULT_WAIT_SECS)
}

/// Swipe endpoints for a scroll gesture: vertical scrolls travel the middle
/// third of the screen down the center line, horizontal scrolls likewise
/// across the middle.
pub fn swipe_gesture(direction: Direction, screen: ScreenSize) -> (PixelPoint, PixelPoint) {
    let w = screen.width as i32;
    let h = screen.height as i32;
    match direction {
        Direction::Down => (
            PixelPoint { x: w / 2, y: h * 2 / 3 },
            PixelPoint { x: w / 2, y: h / 3 },
        ),
        Direction::Up => (
            PixelPoint { x: w / 2, y: h / 3 },
            PixelPoint { x: w / 2, y: h * 2 / 3 },
        ),
        Direction::Left => (
            PixelPoint { x: w * 2 / 3, y: h / 2 },
            PixelPoint { x: w / 3, y: h / 2 },
        ),
        Direction::Right => (
            PixelPoint { x: w / 3, y: h / 2 },
            PixelPoint { x: w * 2 / 3, y: h / 2 },
        ),
    }
}
