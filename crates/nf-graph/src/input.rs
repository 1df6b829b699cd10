//! Raw pointer events in, graph gestures out.
//!
//! Positions are expected relative to the surface's top-left corner. Only
//! the primary button drives gestures; touch input follows the first touch
//! point.

use nf_core::Vector2;
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
    Middle,
    Other(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
}

impl Modifiers {
    /// Either modifier extends the selection.
    pub fn additive(self) -> bool {
        self.ctrl || self.shift
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    PointerDown {
        button: PointerButton,
        position: Vector2,
        #[serde(default)]
        modifiers: Modifiers,
    },
    PointerMove {
        position: Vector2,
    },
    PointerUp {
        button: PointerButton,
    },
    TouchStart {
        position: Vector2,
    },
    TouchMove {
        position: Vector2,
    },
    TouchEnd,
    /// Vertical scroll amount; only its sign is used.
    Wheel {
        delta: f64,
    },
    ContextMenu {
        position: Vector2,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputAction {
    /// The cursor is now at this position.
    Move(Vector2),
    /// Screen-space movement while the button is held.
    Drag(Vector2),
    ClickStart { position: Vector2, additive: bool },
    ClickEnd,
    /// Zoom by this many steps around the last cursor position.
    Zoom(f64),
    ContextMenu(Vector2),
}

pub type InputActions = SmallVec<[InputAction; 2]>;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputState {
    pressed: bool,
    last_position: Option<Vector2>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub fn last_position(&self) -> Option<Vector2> {
        self.last_position
    }

    pub fn handle(&mut self, event: InputEvent) -> InputActions {
        match event {
            InputEvent::PointerDown {
                button,
                position,
                modifiers,
            } => {
                if button != PointerButton::Primary {
                    return SmallVec::new();
                }
                self.pressed = true;
                self.last_position = Some(position);
                smallvec![InputAction::ClickStart {
                    position,
                    additive: modifiers.additive(),
                }]
            }
            InputEvent::PointerMove { position } | InputEvent::TouchMove { position } => {
                let mut actions = InputActions::new();
                if self.pressed
                    && let Some(last) = self.last_position
                {
                    actions.push(InputAction::Drag(position - last));
                }
                actions.push(InputAction::Move(position));
                self.last_position = Some(position);
                actions
            }
            InputEvent::PointerUp { button } => {
                if button != PointerButton::Primary {
                    return SmallVec::new();
                }
                self.pressed = false;
                smallvec![InputAction::ClickEnd]
            }
            InputEvent::TouchStart { position } => {
                self.pressed = true;
                self.last_position = Some(position);
                smallvec![
                    InputAction::Move(position),
                    InputAction::ClickStart {
                        position,
                        additive: false,
                    }
                ]
            }
            InputEvent::TouchEnd => {
                self.pressed = false;
                smallvec![InputAction::ClickEnd]
            }
            InputEvent::Wheel { delta } => {
                if delta == 0.0 {
                    return SmallVec::new();
                }
                smallvec![InputAction::Zoom(delta.signum())]
            }
            InputEvent::ContextMenu { position } => smallvec![InputAction::ContextMenu(position)],
        }
    }
}
