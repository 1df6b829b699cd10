pub mod connection;
pub mod error;
pub mod graph;
pub mod input;
pub mod minimap;
pub mod node;
pub mod nodes;
pub mod note;
pub mod notes;
pub mod organize;
pub mod popup;
pub mod port;
pub mod publisher;
pub mod style;
pub mod subsystem;
pub mod widget;

pub use connection::{Connection, ConnectionRenderer, ConnectionRendererConfig, DefaultConnectionRenderer, Endpoint};
pub use error::{GraphError, Result};
pub use graph::{GraphConfig, GraphView, NodeFlowGraph};
pub use input::{InputEvent, InputState, Modifiers, PointerButton};
pub use minimap::{Minimap, MinimapConfig};
pub use node::{FlowNode, FlowNodeConfig, NodeMap, NodeState};
pub use nodes::{NodeSubsystem, NodeSubsystemConfig};
pub use note::{FlowNote, FlowNoteConfig};
pub use notes::{NoteSubsystem, NoteSubsystemConfig};
pub use organize::organize;
pub use popup::{Popup, PostProcess};
pub use port::{Port, PortConfig, PortType};
pub use publisher::{NodeFactory, NodeFactoryConfig, Publisher, PublisherConfig};
pub use subsystem::{CursorStyle, GraphAction, GraphSubsystem, RenderResults};
pub use widget::{NumberWidget, NumberWidgetConfig, Widget, WidgetConfig, WidgetFactory};

// Re-export so hosts can build configs without a direct nf-core dependency
pub use nf_core::{Camera, CameraConfig, Color, NodeId, NoteId, Vector2};
