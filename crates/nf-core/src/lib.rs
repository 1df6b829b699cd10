pub mod camera;
pub mod color;
pub mod error;
pub mod geometry;
pub mod id;
pub mod markdown;
pub mod menu;
pub mod pool;
pub mod surface;
pub mod text;
pub mod theme;

pub use camera::{Camera, CameraConfig};
pub use color::{Color, Hsv, fallback_port_color};
pub use error::{CoreError, Result};
pub use geometry::{BoundingBox, Vector2, clamp01};
pub use id::{ConnectionId, DataType, NodeId, NoteId};
pub use menu::{ContextMenu, ContextMenuConfig, ContextMenuItemConfig, combine_context_menus};
pub use pool::{Pool, Pooled};
pub use surface::{CornerRadii, FontSpec, HeadlessSurface, PaintMode, Surface, TextMetrics};
pub use text::{Text, TextStyle, TextStyleConfig};
pub use theme::{Palette, Theme};
