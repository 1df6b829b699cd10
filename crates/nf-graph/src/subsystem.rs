//! The contract every graph layer implements, and the actions its context
//! menus yield.

use crate::popup::PostProcess;
use nf_core::surface::Surface;
use nf_core::{Camera, ContextMenuConfig, NodeId, NoteId, Vector2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorStyle {
    #[default]
    Default,
    Pointer,
    Grab,
    Grabbing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderResults {
    pub cursor: Option<CursorStyle>,
}

impl RenderResults {
    pub fn cursor(cursor: CursorStyle) -> Self {
        Self {
            cursor: Some(cursor),
        }
    }
}

/// Everything a context menu entry can ask the graph to do. Positions come
/// from where the menu was opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "target", rename_all = "snake_case")]
pub enum GraphAction {
    ResetView,
    OrganizeAll,
    OrganizeSelected,
    NewNode { publisher: String, node_type: String },
    SelectConnected(NodeId),
    SelectInputsAndDescendants(NodeId),
    DeleteNode(NodeId),
    ClearConnections(NodeId),
    LockNode(NodeId),
    UnlockNode(NodeId),
    EditTitle(NodeId),
    EditInfo(NodeId),
    AddInput(NodeId),
    AddOutput(NodeId),
    AddWidget { node: NodeId, widget_type: String },
    NewNote,
    DeleteNote(NoteId),
    EditNote(NoteId),
    LockNote(NoteId),
    UnlockNote(NoteId),
    /// Host-defined entry from a configured menu.
    Custom(String),
}

/// A layer of the graph view. Layers are rendered in order and offered
/// clicks in reverse order, so the topmost layer sees input first.
pub trait GraphSubsystem {
    fn render(
        &mut self,
        surface: &mut dyn Surface,
        camera: &Camera,
        mouse: Option<Vector2>,
        post: &mut PostProcess,
    ) -> Option<RenderResults>;

    /// Entries this layer contributes to a menu opened at `position` (graph
    /// space).
    fn context_menu(&self, position: Vector2) -> Option<ContextMenuConfig<GraphAction>>;

    /// Returns true to claim the gesture.
    fn click_start(&mut self, mouse: Vector2, camera: &Camera, ctrl: bool) -> bool;

    /// `delta` is in screen space. Returns true when something moved.
    fn mouse_drag(&mut self, delta: Vector2, scale: f64) -> bool;

    fn click_end(&mut self);

    /// Carry out `action`. Returns true when this layer handled it.
    fn execute(&mut self, _action: &GraphAction, _position: Vector2) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn actions_load_from_json() {
        let action: GraphAction =
            serde_json::from_str(r#"{ "action": "custom", "target": "export" }"#)
                .expect("valid action");
        assert_eq!(action, GraphAction::Custom("export".into()));

        let action: GraphAction =
            serde_json::from_str(r#"{ "action": "reset_view" }"#).expect("valid action");
        assert_eq!(action, GraphAction::ResetView);
    }
}
