//! Wirebench Core Library
//!
//! Geometry, diagram model and interaction engine for the wirebench hardware
//! wiring editor. Front-ends drive an [`Editor`] through its pointer API and
//! render it with `wirebench-render`.

pub mod config;
pub mod consts;
pub mod editor;
pub mod geometry;
pub mod hit;
pub mod input;
pub mod interaction;
pub mod menu;
pub mod model;
pub mod relay;
pub mod schema;
pub mod snap;
pub mod storage;
pub mod viewport;

pub use config::EditorConfig;
pub use editor::{Container, Editor, EditorBuilder, EditorError, EditorEvent};
pub use hit::HitTarget;
pub use input::{MouseButton, PointerEvent};
pub use interaction::{InteractionState, RubberBand};
pub use menu::{ContextMenu, MenuAction, MenuItem, MenuTarget};
pub use model::{Connection, ConnectionId, ConnectionKind, Diagram, ModelError, Part, PartId, PinRef};
pub use relay::{ConnectionState, DiagramUpdate, RelayClient, RelayError, RelayEvent, UpdateOp};
pub use schema::{ComponentEntry, ComponentSchema, PinSpec, SchemaCatalog, SchemaError, SchemaLoader};
pub use snap::{SnapResult, snap_to_references};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError, StorageResult};
pub use viewport::Viewport;
