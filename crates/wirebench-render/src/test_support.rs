//! Shared fixture for renderer tests.

use kurbo::{Point, Size};
use std::sync::Arc;
use wirebench_core::schema::MemorySchemaLoader;
use wirebench_core::{
    Connection, ConnectionId, Diagram, Editor, Part, PartId, PinRef, SchemaCatalog,
};

const BOARD: &str = r#"{
    "name": "Board",
    "size": [100, 60],
    "pins": [["L", 0, 30], ["R", 100, 30, "Out"]]
}"#;

pub fn wire_id() -> ConnectionId {
    ConnectionId::from("w")
}

/// Boards `a` at (100,100) and `b` at (400,100), wired a:R -> b:L via (300,200).
pub fn editor() -> Editor {
    let catalog = Arc::new(SchemaCatalog::new(
        MemorySchemaLoader::new().with_schema("board", BOARD),
    ));
    let mut editor = Editor::builder()
        .container(Point::ZERO, Size::new(800.0, 600.0))
        .catalog(catalog)
        .build()
        .unwrap();

    let mut diagram = Diagram::new();
    diagram
        .add_part(Part::new(PartId::from("a"), "board", 100.0, 100.0))
        .unwrap();
    diagram
        .add_part(Part::new(PartId::from("b"), "board", 400.0, 100.0))
        .unwrap();
    let mut wire = Connection::new(
        wire_id(),
        PinRef::new("a", "R"),
        PinRef::new("b", "L"),
        "#1E90FF",
    );
    wire.waypoints.push(Point::new(300.0, 200.0));
    diagram.add_connection(wire).unwrap();

    pollster::block_on(editor.load_diagram(diagram));
    editor.take_events();
    editor
}
