//! The note layer: hover, drag and resize for every note on the graph.

use crate::error::{GraphError, Result};
use crate::note::{DragHandle, FlowNote, FlowNoteConfig};
use crate::popup::PostProcess;
use crate::subsystem::{GraphAction, GraphSubsystem, RenderResults};
use nf_core::surface::Surface;
use nf_core::{Camera, ContextMenuConfig, ContextMenuItemConfig, NoteId, Vector2};
use serde::{Deserialize, Serialize};

pub const NOTE_MENU_GROUP: &str = "node-flow-graph-note-menu";

const NEW_NOTE_TEXT: &str =
    "Note\n\nRight-click this note and select \"edit note\" to put what you want here.";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteSubsystemConfig {
    pub notes: Vec<FlowNoteConfig>,
}

type NoteCallback = Box<dyn FnMut(&FlowNote)>;

#[derive(Default)]
struct Listeners {
    added: Vec<NoteCallback>,
    removed: Vec<NoteCallback>,
    drag_start: Vec<NoteCallback>,
    drag_stop: Vec<NoteCallback>,
}

fn notify(callbacks: &mut [NoteCallback], note: &FlowNote) {
    for callback in callbacks {
        callback(note);
    }
}

#[derive(Default)]
pub struct NoteSubsystem {
    notes: Vec<FlowNote>,
    hovering: Option<NoteId>,
    hovering_handle: Option<DragHandle>,
    selected: Option<NoteId>,
    listeners: Listeners,
}

impl std::fmt::Debug for NoteSubsystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteSubsystem")
            .field("notes", &self.notes.len())
            .field("hovering", &self.hovering)
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}

impl NoteSubsystem {
    pub fn new(config: NoteSubsystemConfig) -> Self {
        let mut notes = Self::default();
        for note in config.notes {
            notes.add_note(FlowNote::new(note));
        }
        notes
    }

    pub fn notes(&self) -> &[FlowNote] {
        &self.notes
    }

    pub fn note(&self, id: NoteId) -> Option<&FlowNote> {
        self.notes.iter().find(|n| n.id() == id)
    }

    pub fn note_mut(&mut self, id: NoteId) -> Option<&mut FlowNote> {
        self.notes.iter_mut().find(|n| n.id() == id)
    }

    pub fn hovered_note(&self) -> Option<NoteId> {
        self.hovering
    }

    pub fn add_note(&mut self, note: FlowNote) -> NoteId {
        let id = note.id();
        notify(&mut self.listeners.added, &note);
        self.notes.push(note);
        log::debug!("note {id} added");
        id
    }

    pub fn remove_note(&mut self, id: NoteId) -> Result<FlowNote> {
        let Some(index) = self.notes.iter().position(|n| n.id() == id) else {
            log::error!("no note {id} found to remove");
            return Err(GraphError::NoteNotFound(id));
        };
        let note = self.notes.remove(index);
        if self.hovering == Some(id) {
            self.hovering = None;
        }
        if self.selected == Some(id) {
            self.selected = None;
        }
        notify(&mut self.listeners.removed, &note);
        log::debug!("note {id} removed");
        Ok(note)
    }

    pub fn add_note_added_listener(&mut self, callback: impl FnMut(&FlowNote) + 'static) {
        self.listeners.added.push(Box::new(callback));
    }

    pub fn add_note_removed_listener(&mut self, callback: impl FnMut(&FlowNote) + 'static) {
        self.listeners.removed.push(Box::new(callback));
    }

    pub fn add_note_drag_start_listener(&mut self, callback: impl FnMut(&FlowNote) + 'static) {
        self.listeners.drag_start.push(Box::new(callback));
    }

    pub fn add_note_drag_stop_listener(&mut self, callback: impl FnMut(&FlowNote) + 'static) {
        self.listeners.drag_stop.push(Box::new(callback));
    }
}

impl GraphSubsystem for NoteSubsystem {
    fn render(
        &mut self,
        surface: &mut dyn Surface,
        camera: &Camera,
        mouse: Option<Vector2>,
        _post: &mut PostProcess,
    ) -> Option<RenderResults> {
        self.hovering = None;
        self.hovering_handle = None;

        if let Some(mouse) = mouse {
            for note in &mut self.notes {
                note.set_hovering(false);
                if note.bounds().contains(mouse) {
                    self.hovering = Some(note.id());
                }
            }
        }

        if let Some(id) = self.hovering
            && let Some(note) = self.notes.iter_mut().find(|n| n.id() == id)
        {
            note.set_hovering(true);
            if let Some(mouse) = mouse {
                if note.left_handle_box().contains(mouse) {
                    self.hovering_handle = Some(DragHandle::Left);
                } else if note.right_handle_box().contains(mouse) {
                    self.hovering_handle = Some(DragHandle::Right);
                }
            }
        }

        for note in &mut self.notes {
            note.render(surface, camera, mouse);
        }
        None
    }

    fn context_menu(&self, _position: Vector2) -> Option<ContextMenuConfig<GraphAction>> {
        let item = |name: &str, action| ContextMenuItemConfig::new(name, action).grouped(NOTE_MENU_GROUP);
        let mut menu = ContextMenuConfig::default().item(item("New Note", GraphAction::NewNote));

        if let Some(id) = self.hovering
            && let Some(note) = self.note(id)
        {
            menu = menu
                .item(item("Delete Note", GraphAction::DeleteNote(id)))
                .item(item("Edit Note", GraphAction::EditNote(id)));
            menu = if note.is_locked() {
                menu.item(item("Unlock Note", GraphAction::UnlockNote(id)))
            } else {
                menu.item(item("Lock Note", GraphAction::LockNote(id)))
            };
        }
        Some(menu)
    }

    fn click_start(&mut self, _mouse: Vector2, _camera: &Camera, _ctrl: bool) -> bool {
        let Some(id) = self.hovering else {
            return false;
        };
        let handle = self.hovering_handle;
        let Some(note) = self.notes.iter_mut().find(|n| n.id() == id && !n.is_locked()) else {
            return false;
        };
        note.select_handle(handle);
        self.selected = Some(id);
        notify(&mut self.listeners.drag_start, note);
        true
    }

    fn mouse_drag(&mut self, delta: Vector2, scale: f64) -> bool {
        let Some(id) = self.selected else {
            return false;
        };
        let Some(note) = self.notes.iter_mut().find(|n| n.id() == id) else {
            return false;
        };
        // Resizing is driven by render.
        if note.handle_selected().is_none() {
            note.translate(Vector2::new(delta.x / scale, delta.y / scale));
        }
        true
    }

    fn click_end(&mut self) {
        let Some(id) = self.selected.take() else {
            return;
        };
        if let Some(note) = self.notes.iter_mut().find(|n| n.id() == id) {
            note.select_handle(None);
            notify(&mut self.listeners.drag_stop, note);
        }
    }

    fn execute(&mut self, action: &GraphAction, position: Vector2) -> bool {
        match action {
            GraphAction::NewNote => {
                self.add_note(FlowNote::new(FlowNoteConfig {
                    text: Some(NEW_NOTE_TEXT.into()),
                    width: Some(300.0),
                    position,
                    ..Default::default()
                }));
            }
            GraphAction::DeleteNote(id) => {
                if let Err(err) = self.remove_note(*id) {
                    log::error!("failed to delete note {id}: {err}");
                }
            }
            GraphAction::LockNote(id) => {
                if let Some(note) = self.note_mut(*id) {
                    note.lock();
                }
            }
            GraphAction::UnlockNote(id) => {
                if let Some(note) = self.note_mut(*id) {
                    note.unlock();
                }
            }
            _ => return false,
        }
        true
    }
}
