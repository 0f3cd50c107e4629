//! Context menus: which actions are offered for which target.
//!
//! Menus are plain data. A front-end draws the items and hands the chosen
//! [`MenuAction`] back to [`crate::editor::Editor::apply_action`].

use crate::model::{ConnectionId, PartId};
use crate::schema::ComponentEntry;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Color used for destructive items.
pub const DESTRUCTIVE_COLOR: &str = "red";

/// An action a menu item performs when chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MenuAction {
    SetWireColor {
        connection: ConnectionId,
        color: String,
    },
    DeleteWire {
        connection: ConnectionId,
    },
    /// Insert a waypoint at `point` (diagram coordinates) on the closest segment.
    InsertWaypoint {
        connection: ConnectionId,
        point: Point,
    },
    RemoveWaypoint {
        connection: ConnectionId,
        index: usize,
    },
    SetWireLabel {
        connection: ConnectionId,
        label: String,
    },
    RotatePart {
        part: PartId,
        degrees: f64,
    },
    DeletePart {
        part: PartId,
    },
    ConfigurePart {
        part: PartId,
    },
    /// Add a part of type `kind` with its top-left at `position`.
    AddPart {
        kind: String,
        position: Point,
    },
}

/// One entry of a context menu.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    pub label: String,
    pub action: MenuAction,
    /// Accent color: the swatch for color items, red for destructive ones.
    pub color: Option<String>,
}

impl MenuItem {
    fn new(label: impl Into<String>, action: MenuAction) -> Self {
        Self {
            label: label.into(),
            action,
            color: None,
        }
    }

    fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// What the menu was opened on.
#[derive(Debug, Clone, PartialEq)]
pub enum MenuTarget {
    Wire(ConnectionId),
    Waypoint { connection: ConnectionId, index: usize },
    Part(PartId),
    Canvas,
}

/// An open context menu.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextMenu {
    pub target: MenuTarget,
    /// Where to show the menu, in container coordinates.
    pub position: Point,
    pub items: Vec<MenuItem>,
}

fn color_items<'a>(
    connection: &'a ConnectionId,
    palette: &'a [String],
) -> impl Iterator<Item = MenuItem> + 'a {
    palette.iter().map(move |color| {
        MenuItem::new(
            format!("Color {}", color),
            MenuAction::SetWireColor {
                connection: connection.clone(),
                color: color.clone(),
            },
        )
        .with_color(color.clone())
    })
}

impl ContextMenu {
    /// Menu for a wire body clicked at `at` (diagram coordinates).
    ///
    /// `near_waypoint` is the waypoint within the pick threshold, if any.
    pub fn for_wire(
        connection: ConnectionId,
        position: Point,
        at: Point,
        near_waypoint: Option<usize>,
        palette: &[String],
        default_label: &str,
    ) -> Self {
        let mut items: Vec<MenuItem> = color_items(&connection, palette).collect();
        items.push(MenuItem::new(
            "Add waypoint",
            MenuAction::InsertWaypoint {
                connection: connection.clone(),
                point: at,
            },
        ));
        if let Some(index) = near_waypoint {
            items.push(MenuItem::new(
                "Remove waypoint",
                MenuAction::RemoveWaypoint {
                    connection: connection.clone(),
                    index,
                },
            ));
        }
        items.push(MenuItem::new(
            "Comment",
            MenuAction::SetWireLabel {
                connection: connection.clone(),
                label: default_label.to_string(),
            },
        ));
        items.push(
            MenuItem::new(
                "Delete wire",
                MenuAction::DeleteWire {
                    connection: connection.clone(),
                },
            )
            .with_color(DESTRUCTIVE_COLOR),
        );
        Self {
            target: MenuTarget::Wire(connection),
            position,
            items,
        }
    }

    /// Menu for a waypoint handle.
    pub fn for_waypoint(
        connection: ConnectionId,
        index: usize,
        position: Point,
        palette: &[String],
    ) -> Self {
        let mut items = vec![
            MenuItem::new(
                "Delete waypoint",
                MenuAction::RemoveWaypoint {
                    connection: connection.clone(),
                    index,
                },
            )
            .with_color(DESTRUCTIVE_COLOR),
        ];
        items.extend(color_items(&connection, palette));
        Self {
            target: MenuTarget::Waypoint { connection, index },
            position,
            items,
        }
    }

    /// Menu for a part. `configurable` adds the configure entry.
    pub fn for_part(part: PartId, position: Point, configurable: bool) -> Self {
        let mut items = Vec::new();
        if configurable {
            items.push(MenuItem::new(
                "Configure",
                MenuAction::ConfigurePart { part: part.clone() },
            ));
        }
        items.push(MenuItem::new(
            "Rotate 90°",
            MenuAction::RotatePart {
                part: part.clone(),
                degrees: 90.0,
            },
        ));
        items.push(MenuItem::new(
            "Rotate -90°",
            MenuAction::RotatePart {
                part: part.clone(),
                degrees: -90.0,
            },
        ));
        items.push(
            MenuItem::new("Delete", MenuAction::DeletePart { part: part.clone() })
                .with_color(DESTRUCTIVE_COLOR),
        );
        Self {
            target: MenuTarget::Part(part),
            position,
            items,
        }
    }

    /// Menu for the empty canvas: one "add" entry per available component.
    pub fn for_canvas(position: Point, at: Point, components: &[ComponentEntry]) -> Self {
        let items = components
            .iter()
            .map(|entry| {
                MenuItem::new(
                    format!("Add {}", entry.name),
                    MenuAction::AddPart {
                        kind: entry.kind.clone(),
                        position: at,
                    },
                )
            })
            .collect();
        Self {
            target: MenuTarget::Canvas,
            position,
            items,
        }
    }

    /// Find the item that performs `action`.
    pub fn item_for(&self, action: &MenuAction) -> Option<&MenuItem> {
        self.items.iter().find(|item| &item.action == action)
    }
}
