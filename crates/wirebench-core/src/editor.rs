//! The editor: owns the diagram, the viewport and the interaction state.
//!
//! Front-ends feed pointer events in client coordinates and drain
//! [`EditorEvent`]s afterwards. Renderers read the editor through its
//! accessors and never mutate it.

use crate::config::EditorConfig;
use crate::consts::{CONTENT_PADDING, CONTENT_POINT_MARGIN, PART_FALLBACK_MARGIN};
use crate::geometry::{Frame, normalize_degrees};
use crate::hit::{self, HitTarget};
use crate::input::{MouseButton, PointerEvent, wheel_zoom_direction};
use crate::interaction::{InteractionState, RubberBand};
use crate::menu::{ContextMenu, MenuAction, MenuTarget};
use crate::model::{Connection, ConnectionId, Diagram, ModelError, Part, PartId, PinRef};
use crate::relay::UpdateOp;
use crate::schema::{ComponentEntry, ComponentSchema, MemorySchemaLoader, SchemaCatalog, SchemaError};
use crate::snap::snap_to_references;
use crate::viewport::Viewport;
use kurbo::{Point, Rect, Size, Vec2};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

/// Editor errors.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("Editor has no container")]
    MissingContainer,
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("Unknown part: {0}")]
    UnknownPart(PartId),
    #[error("Unknown connection: {0}")]
    UnknownConnection(ConnectionId),
    #[error("Connection {0} has an unresolved endpoint")]
    UnresolvedConnection(ConnectionId),
    #[error("Connection {connection} has no waypoint {index}")]
    WaypointOutOfRange {
        connection: ConnectionId,
        index: usize,
    },
}

/// Notifications for the host, drained with [`Editor::take_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// A local mutation, ready to be pushed to the relay.
    Changed(UpdateOp),
    SelectionChanged(Option<ConnectionId>),
    /// The "configure" action was chosen for a part.
    ConfigureRequested(PartId),
    ZoomChanged(i64),
    /// A user-facing message, e.g. a failed schema fetch.
    Notification(String),
}

/// The host element the editor is drawn into, in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Container {
    pub origin: Point,
    pub size: Size,
}

/// Builder for [`Editor`].
#[derive(Default)]
pub struct EditorBuilder {
    container: Option<Container>,
    catalog: Option<Arc<SchemaCatalog>>,
    config: EditorConfig,
}

impl EditorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the container's client origin and size. Required.
    pub fn container(mut self, origin: Point, size: Size) -> Self {
        self.container = Some(Container { origin, size });
        self
    }

    pub fn catalog(mut self, catalog: Arc<SchemaCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn config(mut self, config: EditorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Editor, EditorError> {
        let container = self.container.ok_or(EditorError::MissingContainer)?;
        let catalog = self
            .catalog
            .unwrap_or_else(|| Arc::new(SchemaCatalog::new(MemorySchemaLoader::new())));
        Ok(Editor {
            container,
            catalog,
            config: self.config,
            diagram: Diagram::new(),
            viewport: Viewport::new(),
            state: InteractionState::Idle,
            selected: None,
            menu: None,
            current_color: 0,
            events: Vec::new(),
            needs_redraw: true,
        })
    }
}

/// The diagram editor.
pub struct Editor {
    container: Container,
    catalog: Arc<SchemaCatalog>,
    config: EditorConfig,
    diagram: Diagram,
    viewport: Viewport,
    state: InteractionState,
    selected: Option<ConnectionId>,
    menu: Option<ContextMenu>,
    current_color: usize,
    events: Vec<EditorEvent>,
    needs_redraw: bool,
}

impl Editor {
    pub fn builder() -> EditorBuilder {
        EditorBuilder::new()
    }

    // --- Accessors ---

    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<SchemaCatalog> {
        &self.catalog
    }

    pub fn container(&self) -> Container {
        self.container
    }

    /// Update the container after the host element moved or resized.
    pub fn set_container(&mut self, origin: Point, size: Size) {
        self.container = Container { origin, size };
        self.needs_redraw = true;
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.state
    }

    pub fn rubber_band(&self) -> Option<&RubberBand> {
        self.state.rubber_band()
    }

    pub fn selected_wire(&self) -> Option<&ConnectionId> {
        self.selected.as_ref()
    }

    pub fn context_menu(&self) -> Option<&ContextMenu> {
        self.menu.as_ref()
    }

    /// Color given to newly drawn wires.
    pub fn current_color(&self) -> &str {
        self.config.palette_color(self.current_color)
    }

    /// Pick the palette entry used for new wires.
    pub fn set_current_color(&mut self, index: usize) {
        self.current_color = index % self.config.palette.len().max(1);
    }

    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    /// Acknowledge a redraw.
    pub fn mark_drawn(&mut self) {
        self.needs_redraw = false;
    }

    /// Drain pending events.
    pub fn take_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, event: EditorEvent) {
        self.events.push(event);
    }

    fn changed(&mut self, op: UpdateOp) {
        self.events.push(EditorEvent::Changed(op));
        self.needs_redraw = true;
    }

    // --- Loading ---

    /// Fetch every schema the diagram needs, then replace the current diagram.
    ///
    /// Parts whose schema cannot be fetched are dropped along with their
    /// wires; a notification is emitted for each failed component.
    /// Connections to missing parts are dropped.
    pub async fn load_diagram(&mut self, mut diagram: Diagram) {
        self.prepare_diagram(&mut diagram).await;
        log::info!(
            "Loaded diagram with {} parts and {} connections",
            diagram.part_count(),
            diagram.connection_count()
        );

        self.diagram = diagram;
        self.state = InteractionState::Idle;
        self.selected = None;
        self.menu = None;
        self.changed(UpdateOp::Snapshot {
            diagram: self.diagram.clone(),
        });
    }

    /// Load schemas, then remove unloadable parts and dangling connections.
    async fn prepare_diagram(&mut self, diagram: &mut Diagram) {
        let failed = self.preload_schemas(diagram).await;
        let unloadable: Vec<PartId> = diagram
            .parts()
            .filter(|p| failed.contains(&p.kind))
            .map(|p| p.id.clone())
            .collect();
        for id in unloadable {
            log::warn!("Dropping part {} without a schema", id);
            diagram.remove_part(&id);
        }
        for id in diagram.dangling_connections() {
            log::warn!("Dropping connection {} with a missing endpoint part", id);
            diagram.remove_connection(&id);
        }
    }

    /// Returns the kinds whose schema could not be fetched.
    async fn preload_schemas(&mut self, diagram: &Diagram) -> BTreeSet<String> {
        let kinds: BTreeSet<String> = diagram.parts().map(|p| p.kind.clone()).collect();
        let catalog = Arc::clone(&self.catalog);
        let mut failed = BTreeSet::new();
        for kind in kinds {
            if let Err(e) = catalog.ensure(&kind).await {
                log::warn!("Schema for {} unavailable: {}", kind, e);
                self.emit(EditorEvent::Notification(format!(
                    "Component {} could not be loaded: {}",
                    kind, e
                )));
                failed.insert(kind);
            }
        }
        failed
    }

    /// Reload the list of components offered on the canvas menu.
    pub async fn load_components(&mut self) -> Vec<ComponentEntry> {
        let catalog = Arc::clone(&self.catalog);
        catalog.load_component_list().await
    }

    // --- Geometry ---

    /// Convert raw client coordinates to container-relative coordinates.
    pub fn client_to_container(&self, client: Point) -> Point {
        Point::new(
            client.x - self.container.origin.x,
            client.y - self.container.origin.y,
        )
    }

    /// Convert raw client coordinates to diagram coordinates.
    pub fn client_to_diagram(&self, client: Point) -> Point {
        self.viewport
            .screen_to_diagram(self.client_to_container(client))
    }

    pub fn part_schema(&self, part: &Part) -> Option<Arc<ComponentSchema>> {
        self.catalog.get(&part.kind)
    }

    /// The part's placement frame. Without a schema, a placeholder box.
    pub fn part_frame(&self, part: &Part) -> Frame {
        match self.part_schema(part) {
            Some(schema) => schema.frame(part),
            None => Frame::new(
                Vec2::new(part.left, part.top),
                Size::new(PART_FALLBACK_MARGIN * 2.0, PART_FALLBACK_MARGIN * 2.0),
            )
            .with_rotation(part.rotation),
        }
    }

    /// Absolute position of a pin, if its part and schema are available.
    pub fn pin_position(&self, pin: &PinRef) -> Option<Point> {
        let part = self.diagram.part(&pin.part)?;
        self.part_schema(part)?.pin_position(part, &pin.pin)
    }

    /// Resolved polyline `from, waypoints.., to` of a connection.
    pub fn wire_polyline(&self, connection: &Connection) -> Option<Vec<Point>> {
        let from = self.pin_position(&connection.from)?;
        let to = self.pin_position(&connection.to)?;
        Some(connection.polyline(from, to))
    }

    /// Stroke color of a connection, falling back to the configured default.
    pub fn wire_color<'a>(&'a self, connection: &'a Connection) -> &'a str {
        if connection.color.is_empty() {
            &self.config.default_wire_color
        } else {
            &connection.color
        }
    }

    /// Connections whose endpoints resolve, in draw order, with their polylines.
    pub fn resolved_wires(&self) -> Vec<(&Connection, Vec<Point>)> {
        self.diagram
            .connections()
            .filter_map(|c| self.wire_polyline(c).map(|poly| (c, poly)))
            .collect()
    }

    /// Size of the drawing surface needed to show every part, pin and waypoint.
    pub fn content_extent(&self) -> Size {
        let mut max = Point::ZERO;
        let mut grow = |p: Point| {
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        };

        for part in self.diagram.parts() {
            let frame = self.part_frame(part);
            let bbox = frame
                .to_parent()
                .transform_rect_bbox(Rect::from_origin_size(Point::ZERO, frame.size));
            grow(Point::new(bbox.x1, bbox.y1));
            if let Some(schema) = self.part_schema(part) {
                for (_, p) in schema.pin_positions(part) {
                    grow(p + Vec2::new(CONTENT_POINT_MARGIN, CONTENT_POINT_MARGIN));
                }
            }
        }
        for connection in self.diagram.connections() {
            for wp in &connection.waypoints {
                grow(*wp + Vec2::new(CONTENT_POINT_MARGIN, CONTENT_POINT_MARGIN));
            }
        }
        Size::new(max.x + CONTENT_PADDING, max.y + CONTENT_PADDING)
    }

    // --- Hit testing ---

    /// The pin under a diagram point, topmost part first.
    pub fn pin_at(&self, point: Point) -> Option<PinRef> {
        let radius = self.config.pin_hit_radius;
        let parts: Vec<&Part> = self.diagram.parts().collect();
        parts.iter().rev().find_map(|part| {
            let schema = self.part_schema(part)?;
            let pin = schema
                .pin_positions(part)
                .find(|(_, p)| hit::within_radius(*p, point, radius))
                .map(|(spec, _)| PinRef::new(part.id.clone(), spec.name.clone()));
            pin
        })
    }

    /// Classify what lies under a diagram point.
    pub fn hit_test(&self, point: Point) -> HitTarget {
        let wires = self.resolved_wires();

        for (connection, _) in wires.iter().rev() {
            if let Some(index) =
                hit::nearest_waypoint(&connection.waypoints, point, self.config.waypoint_hit_radius)
            {
                return HitTarget::Waypoint {
                    connection: connection.id.clone(),
                    index,
                };
            }
        }

        if let Some(pin) = self.pin_at(point) {
            return HitTarget::Pin(pin);
        }

        let parts: Vec<&Part> = self.diagram.parts().collect();
        if let Some(part) = parts.iter().rev().find(|part| {
            hit::frame_contains(&self.part_frame(part), point, self.config.part_hit_padding)
        }) {
            return HitTarget::Part(part.id.clone());
        }

        hit::nearest_wire(
            point,
            wires.iter().map(|(c, poly)| (&c.id, poly.as_slice())),
            self.config.wire_hit_threshold,
        )
        .map(|id| HitTarget::Wire(id.clone()))
        .unwrap_or(HitTarget::Canvas)
    }

    // --- Pointer input ---

    /// Dispatch a pointer event to the matching handler.
    pub fn handle_pointer_event(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down { position, button } => self.pointer_down(position, button),
            PointerEvent::Move { position } => {
                self.pointer_move(position);
            }
            PointerEvent::Up { position } => self.pointer_up(position),
            PointerEvent::Wheel { position, delta } => {
                self.wheel(position, delta);
            }
            PointerEvent::ContextMenu { position } => {
                self.open_context_menu(position);
            }
        }
    }

    fn set_selection(&mut self, selection: Option<ConnectionId>) {
        if self.selected != selection {
            self.selected = selection.clone();
            self.emit(EditorEvent::SelectionChanged(selection));
        }
    }

    pub fn pointer_down(&mut self, client: Point, button: MouseButton) {
        if self.menu.take().is_some() {
            self.needs_redraw = true;
        }
        // A press without a release in between ends the current drag first.
        if !self.state.is_idle() {
            self.finish_interaction(None);
        }
        if !button.is_primary() {
            return;
        }

        let screen = self.client_to_container(client);
        let point = self.viewport.screen_to_diagram(screen);

        self.state = match self.hit_test(point) {
            HitTarget::Waypoint { connection, index } => {
                let Some(wp) = self
                    .diagram
                    .connection(&connection)
                    .and_then(|c| c.waypoints.get(index).copied())
                else {
                    return;
                };
                self.diagram.bring_connection_to_front(&connection);
                self.set_selection(Some(connection.clone()));
                InteractionState::DraggingWaypoint {
                    connection,
                    index,
                    offset: point - wp,
                }
            }
            HitTarget::Pin(pin) => {
                self.set_selection(None);
                let Some(start) = self.pin_position(&pin) else {
                    return;
                };
                InteractionState::DrawingWire(RubberBand::new(pin, start))
            }
            HitTarget::Part(id) => {
                self.set_selection(None);
                let Some(part) = self.diagram.part(&id) else {
                    return;
                };
                let offset = point - part.position();
                self.diagram.bring_part_to_front(&id);
                InteractionState::DraggingPart { part: id, offset }
            }
            HitTarget::Wire(id) => {
                self.diagram.bring_connection_to_front(&id);
                self.set_selection(Some(id));
                InteractionState::Idle
            }
            HitTarget::Canvas => {
                self.set_selection(None);
                InteractionState::Panning { last: screen }
            }
        };
        log::debug!("Pointer down at {:?}: {}", point, self.state.name());
        self.needs_redraw = true;
    }

    /// Returns whether anything changed.
    pub fn pointer_move(&mut self, client: Point) -> bool {
        let screen = self.client_to_container(client);
        let point = self.viewport.screen_to_diagram(screen);

        match &mut self.state {
            InteractionState::Idle => return false,
            InteractionState::Panning { last } => {
                let delta = screen - *last;
                *last = screen;
                self.viewport.apply_pan(delta);
            }
            InteractionState::DraggingPart { part, offset } => {
                let target = point - *offset;
                let Some(part) = self.diagram.part_mut(part) else {
                    return false;
                };
                part.left = target.x.round().max(0.0);
                part.top = target.y.round().max(0.0);
            }
            InteractionState::DraggingWaypoint {
                connection,
                index,
                offset,
            } => {
                let (connection, index) = (connection.clone(), *index);
                let candidate = point - *offset;
                let Some(snapped) = self.snap_waypoint(&connection, index, candidate) else {
                    return false;
                };
                let Some(wp) = self
                    .diagram
                    .connection_mut(&connection)
                    .and_then(|c| c.waypoints.get_mut(index))
                else {
                    return false;
                };
                *wp = Point::new(snapped.x.round().max(0.0), snapped.y.round().max(0.0));
            }
            InteractionState::DrawingWire(band) => {
                band.current = point;
            }
        }
        self.needs_redraw = true;
        true
    }

    /// Snap a dragged waypoint to its wire's endpoints and other waypoints.
    fn snap_waypoint(&self, id: &ConnectionId, index: usize, candidate: Point) -> Option<Point> {
        let connection = self.diagram.connection(id)?;
        let references: Vec<Point> = [&connection.from, &connection.to]
            .into_iter()
            .filter_map(|pin| self.pin_position(pin))
            .chain(
                connection
                    .waypoints
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != index)
                    .map(|(_, p)| *p),
            )
            .collect();
        Some(snap_to_references(candidate, references, self.config.snap_threshold).point)
    }

    pub fn pointer_up(&mut self, client: Point) {
        let point = self.client_to_diagram(client);
        self.finish_interaction(Some(point));
    }

    /// End the current interaction. A drawn wire is only created when it is
    /// released over a pin, so `None` discards it.
    fn finish_interaction(&mut self, release: Option<Point>) {
        match std::mem::take(&mut self.state) {
            InteractionState::Idle => return,
            InteractionState::Panning { .. } => {}
            InteractionState::DraggingPart { part, .. } => {
                if let Some(part) = self.diagram.part(&part).cloned() {
                    self.changed(UpdateOp::UpsertPart { part });
                }
            }
            InteractionState::DraggingWaypoint { connection, .. } => {
                if let Some(connection) = self.diagram.connection(&connection).cloned() {
                    self.changed(UpdateOp::UpsertConnection { connection });
                }
            }
            InteractionState::DrawingWire(band) => {
                let target = release.and_then(|point| self.pin_at(point));
                if let Some(to) = target.filter(|to| *to != band.from) {
                    self.create_wire(band.from, to);
                }
            }
        }
        self.needs_redraw = true;
    }

    fn create_wire(&mut self, from: PinRef, to: PinRef) {
        let connection = Connection::new(
            ConnectionId::generate(),
            from,
            to,
            self.current_color().to_string(),
        );
        log::debug!(
            "New wire {} from {} to {}",
            connection.id,
            connection.from,
            connection.to
        );
        match self.diagram.add_connection(connection.clone()) {
            Ok(()) => self.changed(UpdateOp::UpsertConnection { connection }),
            Err(e) => log::warn!("Could not add wire: {}", e),
        }
    }

    /// Zoom about the pointer. Returns whether the scale changed.
    pub fn wheel(&mut self, client: Point, delta: Vec2) -> bool {
        let direction = wheel_zoom_direction(delta);
        if direction == 0.0 {
            return false;
        }
        let screen = self.client_to_container(client);
        if !self.viewport.apply_zoom(screen, direction) {
            return false;
        }
        self.zoom_changed();
        true
    }

    /// Step zoom in (zoom button).
    pub fn zoom_in(&mut self) -> bool {
        self.step_zoom(1.0)
    }

    /// Step zoom out (zoom button).
    pub fn zoom_out(&mut self) -> bool {
        self.step_zoom(-1.0)
    }

    fn step_zoom(&mut self, direction: f64) -> bool {
        let changed = self.viewport.step_zoom(direction);
        if changed {
            self.zoom_changed();
        }
        changed
    }

    /// Back to 100% with no pan.
    pub fn reset_view(&mut self) {
        self.viewport.reset();
        self.zoom_changed();
    }

    fn zoom_changed(&mut self) {
        let percent = self.viewport.zoom_percent();
        self.emit(EditorEvent::ZoomChanged(percent));
        self.needs_redraw = true;
    }

    // --- Context menu ---

    /// Open the context menu for whatever lies under `client`.
    pub fn open_context_menu(&mut self, client: Point) -> Option<&ContextMenu> {
        let screen = self.client_to_container(client);
        let point = self.viewport.screen_to_diagram(screen);

        let menu = match self.hit_test(point) {
            HitTarget::Waypoint { connection, index } => {
                ContextMenu::for_waypoint(connection, index, screen, &self.config.palette)
            }
            HitTarget::Pin(PinRef { part, .. }) | HitTarget::Part(part) => {
                let configurable = self
                    .diagram
                    .part(&part)
                    .and_then(|p| self.part_schema(p))
                    .is_some_and(|s| s.has_script());
                ContextMenu::for_part(part, screen, configurable)
            }
            HitTarget::Wire(id) => {
                let near = self.diagram.connection(&id).and_then(|c| {
                    hit::nearest_waypoint(&c.waypoints, point, self.config.waypoint_pick_threshold)
                });
                ContextMenu::for_wire(
                    id,
                    screen,
                    point,
                    near,
                    &self.config.palette,
                    &self.config.default_wire_label,
                )
            }
            HitTarget::Canvas => ContextMenu::for_canvas(screen, point, &self.catalog.components()),
        };
        self.menu = Some(menu);
        self.needs_redraw = true;
        self.menu.as_ref()
    }

    pub fn close_context_menu(&mut self) {
        if self.menu.take().is_some() {
            self.needs_redraw = true;
        }
    }

    /// Apply a menu action. The menu closes whatever the outcome.
    pub async fn apply_action(&mut self, action: MenuAction) -> Result<(), EditorError> {
        self.close_context_menu();
        log::debug!("Applying {:?}", action);

        match action {
            MenuAction::SetWireColor { connection, color } => {
                self.update_connection(&connection, |c| c.color = color)?;
            }
            MenuAction::SetWireLabel { connection, label } => {
                self.update_connection(&connection, |c| c.label = Some(label))?;
            }
            MenuAction::DeleteWire { connection } => {
                self.diagram
                    .remove_connection(&connection)
                    .ok_or_else(|| EditorError::UnknownConnection(connection.clone()))?;
                self.drop_stale_state();
                self.changed(UpdateOp::RemoveConnection { id: connection });
            }
            MenuAction::InsertWaypoint { connection, point } => {
                let wire = self
                    .diagram
                    .connection(&connection)
                    .ok_or_else(|| EditorError::UnknownConnection(connection.clone()))?;
                let index = self
                    .wire_polyline(wire)
                    .and_then(|poly| hit::insertion_index(&poly, point))
                    .ok_or_else(|| EditorError::UnresolvedConnection(connection.clone()))?;
                let rounded = Point::new(point.x.round(), point.y.round());
                self.update_connection(&connection, |c| {
                    c.insert_waypoint(index, rounded);
                })?;
            }
            MenuAction::RemoveWaypoint { connection, index } => {
                let wire = self
                    .diagram
                    .connection(&connection)
                    .ok_or_else(|| EditorError::UnknownConnection(connection.clone()))?;
                if index >= wire.waypoints.len() {
                    return Err(EditorError::WaypointOutOfRange { connection, index });
                }
                self.update_connection(&connection, |c| {
                    c.remove_waypoint(index);
                })?;
            }
            MenuAction::RotatePart { part, degrees } => {
                let p = self
                    .diagram
                    .part_mut(&part)
                    .ok_or_else(|| EditorError::UnknownPart(part.clone()))?;
                p.rotation = normalize_degrees(p.rotation + degrees);
                let part = p.clone();
                self.changed(UpdateOp::UpsertPart { part });
            }
            MenuAction::DeletePart { part } => {
                let (_, cascaded) = self
                    .diagram
                    .remove_part(&part)
                    .ok_or_else(|| EditorError::UnknownPart(part.clone()))?;
                log::debug!("Deleted part {} and {} connections", part, cascaded.len());
                self.drop_stale_state();
                self.changed(UpdateOp::RemovePart { id: part });
            }
            MenuAction::ConfigurePart { part } => {
                if self.diagram.part(&part).is_none() {
                    return Err(EditorError::UnknownPart(part));
                }
                self.emit(EditorEvent::ConfigureRequested(part));
            }
            MenuAction::AddPart { kind, position } => {
                let catalog = Arc::clone(&self.catalog);
                if let Err(e) = catalog.ensure(&kind).await {
                    log::warn!("Cannot add {}: {}", kind, e);
                    self.emit(EditorEvent::Notification(format!(
                        "Component {} could not be loaded: {}",
                        kind, e
                    )));
                    return Err(e.into());
                }
                let part = Part::new(
                    PartId::generate(),
                    kind,
                    position.x.round().max(0.0),
                    position.y.round().max(0.0),
                );
                self.diagram.add_part(part.clone())?;
                self.changed(UpdateOp::UpsertPart { part });
            }
        }
        Ok(())
    }

    fn update_connection(
        &mut self,
        id: &ConnectionId,
        edit: impl FnOnce(&mut Connection),
    ) -> Result<(), EditorError> {
        let connection = self
            .diagram
            .connection_mut(id)
            .ok_or_else(|| EditorError::UnknownConnection(id.clone()))?;
        edit(connection);
        let connection = connection.clone();
        self.changed(UpdateOp::UpsertConnection { connection });
        Ok(())
    }

    /// Forget selection, drags and menus that point at deleted entities.
    fn drop_stale_state(&mut self) {
        let selection_stale = self
            .selected
            .as_ref()
            .is_some_and(|id| self.diagram.connection(id).is_none());
        if selection_stale {
            self.set_selection(None);
        }

        let stale = match &self.state {
            InteractionState::DraggingPart { part, .. } => self.diagram.part(part).is_none(),
            InteractionState::DraggingWaypoint {
                connection, index, ..
            } => self
                .diagram
                .connection(connection)
                .is_none_or(|c| *index >= c.waypoints.len()),
            InteractionState::DrawingWire(band) => self.diagram.part(&band.from.part).is_none(),
            InteractionState::Idle | InteractionState::Panning { .. } => false,
        };
        if stale {
            self.state = InteractionState::Idle;
        }

        let menu_stale = self.menu.as_ref().is_some_and(|menu| match &menu.target {
            MenuTarget::Wire(id) | MenuTarget::Waypoint { connection: id, .. } => {
                self.diagram.connection(id).is_none()
            }
            MenuTarget::Part(id) => self.diagram.part(id).is_none(),
            MenuTarget::Canvas => false,
        });
        if menu_stale {
            self.menu = None;
        }
    }

    // --- Remote updates ---

    /// Apply an update pushed by another editor. The last write wins.
    ///
    /// Remote updates are not echoed as [`EditorEvent::Changed`].
    pub async fn apply_remote(&mut self, op: UpdateOp) {
        match op {
            UpdateOp::UpsertPart { part } => {
                let catalog = Arc::clone(&self.catalog);
                match catalog.ensure(&part.kind).await {
                    Ok(_) => self.diagram.insert_part(part),
                    Err(e) => {
                        log::warn!("Ignoring remote part {} without a schema: {}", part.id, e);
                        self.emit(EditorEvent::Notification(format!(
                            "Component {} could not be loaded: {}",
                            part.kind, e
                        )));
                    }
                }
            }
            UpdateOp::RemovePart { id } => {
                self.diagram.remove_part(&id);
            }
            UpdateOp::UpsertConnection { connection } => {
                let resolved = [&connection.from, &connection.to]
                    .into_iter()
                    .all(|pin| self.diagram.part(&pin.part).is_some());
                if resolved {
                    self.diagram.insert_connection(connection);
                } else {
                    log::warn!("Ignoring remote connection {} to a missing part", connection.id);
                }
            }
            UpdateOp::RemoveConnection { id } => {
                self.diagram.remove_connection(&id);
            }
            UpdateOp::Snapshot { mut diagram } => {
                self.prepare_diagram(&mut diagram).await;
                self.diagram = diagram;
            }
        }
        for id in self.diagram.dangling_connections() {
            log::warn!("Dropping connection {} with a missing endpoint part", id);
            self.diagram.remove_connection(&id);
        }
        self.drop_stale_state();
        self.needs_redraw = true;
    }
}
