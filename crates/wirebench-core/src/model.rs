//! Diagram entity model: parts, connections and the diagram arena.
//!
//! The diagram owns every part and connection, keyed by id. Order is kept in
//! separate vectors so that removing an entity never invalidates the ids of
//! the others. Pins are not stored here; they are derived from component
//! schemas (see [`crate::schema`]).

use kurbo::Point;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Model errors.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Part already exists: {0}")]
    DuplicatePart(PartId),
    #[error("Connection already exists: {0}")]
    DuplicateConnection(ConnectionId),
    #[error("Unknown part: {0}")]
    UnknownPart(PartId),
    #[error("Unknown connection: {0}")]
    UnknownConnection(ConnectionId),
    #[error("Invalid pin reference: {0:?}")]
    InvalidPinRef(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Unique identifier of a part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartId(pub String);

impl PartId {
    /// Generate a fresh part id.
    pub fn generate() -> Self {
        Self(format!("part_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PartId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier of a connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    /// Generate a fresh connection id.
    pub fn generate() -> Self {
        Self(format!("connection_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Reference to a pin: the owning part plus the pin name.
///
/// This is a weak reference. It is resolved against the live part set and
/// the part's schema every time it is used. On the JSON edge it is written
/// as `"partId:pinName"` and parsed at the first `:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PinRef {
    pub part: PartId,
    pub pin: String,
}

impl PinRef {
    pub fn new(part: impl Into<PartId>, pin: impl Into<String>) -> Self {
        Self {
            part: part.into(),
            pin: pin.into(),
        }
    }

    /// Parse the `"partId:pinName"` form.
    pub fn parse(s: &str) -> Result<Self, ModelError> {
        match s.split_once(':') {
            Some((part, pin)) if !part.is_empty() && !pin.is_empty() => Ok(Self::new(part, pin)),
            _ => Err(ModelError::InvalidPinRef(s.to_string())),
        }
    }
}

impl fmt::Display for PinRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.part, self.pin)
    }
}

impl TryFrom<String> for PinRef {
    type Error = ModelError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<PinRef> for String {
    fn from(pin: PinRef) -> Self {
        pin.to_string()
    }
}

/// A component instance placed on the diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: PartId,
    /// Component type, used to look up the schema.
    #[serde(rename = "type")]
    pub kind: String,
    /// Left edge in diagram coordinates.
    pub left: f64,
    /// Top edge in diagram coordinates.
    pub top: f64,
    /// Rotation in degrees about the part's center.
    #[serde(default)]
    pub rotation: f64,
}

impl Part {
    pub fn new(id: PartId, kind: impl Into<String>, left: f64, top: f64) -> Self {
        Self {
            id,
            kind: kind.into(),
            left,
            top,
            rotation: 0.0,
        }
    }

    /// Top-left corner as a point.
    pub fn position(&self) -> Point {
        Point::new(self.left, self.top)
    }
}

/// Electrical kind of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    #[default]
    Wire,
    I2c,
    Can,
    Rs485,
}

/// A wire between two pins, routed through optional waypoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub from: PinRef,
    pub to: PinRef,
    #[serde(rename = "type", default)]
    pub kind: ConnectionKind,
    #[serde(default)]
    pub color: String,
    /// Intermediate points in diagram coordinates, in path order.
    #[serde(default, alias = "constrains", deserialize_with = "deserialize_waypoints")]
    pub waypoints: Vec<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Connection {
    /// Create a plain wire with no waypoints.
    pub fn new(id: ConnectionId, from: PinRef, to: PinRef, color: impl Into<String>) -> Self {
        Self {
            id,
            from,
            to,
            kind: ConnectionKind::Wire,
            color: color.into(),
            waypoints: Vec::new(),
            label: None,
        }
    }

    /// Whether either endpoint belongs to `part`.
    pub fn references(&self, part: &PartId) -> bool {
        &self.from.part == part || &self.to.part == part
    }

    /// Insert a waypoint, clamping the index to the end of the list.
    pub fn insert_waypoint(&mut self, index: usize, point: Point) -> usize {
        let index = index.min(self.waypoints.len());
        self.waypoints.insert(index, point);
        index
    }

    /// Remove the waypoint at `index`, if present.
    pub fn remove_waypoint(&mut self, index: usize) -> Option<Point> {
        (index < self.waypoints.len()).then(|| self.waypoints.remove(index))
    }

    /// The full polyline given resolved endpoint positions.
    pub fn polyline(&self, from: Point, to: Point) -> Vec<Point> {
        let mut points = Vec::with_capacity(self.waypoints.len() + 2);
        points.push(from);
        points.extend(self.waypoints.iter().copied());
        points.push(to);
        points
    }
}

/// Waypoints are read leniently: entries without numeric `x`/`y` are skipped.
fn deserialize_waypoints<'de, D>(deserializer: D) -> Result<Vec<Point>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .iter()
        .filter_map(|v| {
            let point = v
                .get("x")
                .and_then(serde_json::Value::as_f64)
                .zip(v.get("y").and_then(serde_json::Value::as_f64))
                .map(|(x, y)| Point::new(x, y));
            if point.is_none() {
                log::warn!("Skipping malformed waypoint: {}", v);
            }
            point
        })
        .collect())
}

/// Legacy `[from, to, color, [{x,y}, ...]]` connection entry.
#[derive(Deserialize)]
struct LegacyConnection(
    PinRef,
    PinRef,
    Option<String>,
    #[serde(deserialize_with = "deserialize_waypoints")] Vec<Point>,
);

#[derive(Deserialize)]
#[serde(untagged)]
enum ConnectionEntry {
    Current(Connection),
    Legacy(LegacyConnection),
}

impl From<ConnectionEntry> for Connection {
    fn from(entry: ConnectionEntry) -> Self {
        match entry {
            ConnectionEntry::Current(c) => c,
            ConnectionEntry::Legacy(LegacyConnection(from, to, color, waypoints)) => Connection {
                waypoints,
                ..Connection::new(ConnectionId::generate(), from, to, color.unwrap_or_default())
            },
        }
    }
}

/// On-disk shape of a diagram.
#[derive(Serialize, Deserialize)]
struct DiagramFile {
    #[serde(alias = "components", default)]
    parts: Vec<Part>,
    #[serde(default, deserialize_with = "deserialize_connections")]
    connections: Vec<Connection>,
}

fn deserialize_connections<'de, D>(deserializer: D) -> Result<Vec<Connection>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<ConnectionEntry>::deserialize(deserializer)?;
    Ok(entries.into_iter().map(Connection::from).collect())
}

/// The persisted aggregate: every part and connection, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "DiagramFile", into = "DiagramFile")]
pub struct Diagram {
    parts: HashMap<PartId, Part>,
    /// Z-order of parts (back to front).
    part_order: Vec<PartId>,
    connections: HashMap<ConnectionId, Connection>,
    /// Draw order of connections (back to front).
    connection_order: Vec<ConnectionId>,
}

impl From<DiagramFile> for Diagram {
    fn from(file: DiagramFile) -> Self {
        let mut diagram = Diagram::new();
        for part in file.parts {
            diagram.insert_part(part);
        }
        for connection in file.connections {
            diagram.insert_connection(connection);
        }
        diagram
    }
}

impl From<Diagram> for DiagramFile {
    fn from(diagram: Diagram) -> Self {
        let Diagram {
            mut parts,
            part_order,
            mut connections,
            connection_order,
        } = diagram;
        DiagramFile {
            parts: part_order.iter().filter_map(|id| parts.remove(id)).collect(),
            connections: connection_order
                .iter()
                .filter_map(|id| connections.remove(id))
                .collect(),
        }
    }
}

impl Diagram {
    /// Create an empty diagram.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the diagram has no parts and no connections.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty() && self.connections.is_empty()
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Parts in z-order (back to front).
    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.part_order.iter().filter_map(|id| self.parts.get(id))
    }

    /// Connections in draw order (back to front).
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connection_order
            .iter()
            .filter_map(|id| self.connections.get(id))
    }

    pub fn part(&self, id: &PartId) -> Option<&Part> {
        self.parts.get(id)
    }

    pub fn part_mut(&mut self, id: &PartId) -> Option<&mut Part> {
        self.parts.get_mut(id)
    }

    pub fn connection(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub fn connection_mut(&mut self, id: &ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(id)
    }

    /// Add a new part on top of the z-order.
    pub fn add_part(&mut self, part: Part) -> Result<(), ModelError> {
        if self.parts.contains_key(&part.id) {
            return Err(ModelError::DuplicatePart(part.id));
        }
        self.insert_part(part);
        Ok(())
    }

    /// Insert or replace a part. A replaced part keeps its z-order slot.
    pub fn insert_part(&mut self, part: Part) {
        if !self.parts.contains_key(&part.id) {
            self.part_order.push(part.id.clone());
        }
        self.parts.insert(part.id.clone(), part);
    }

    /// Remove a part and every connection that references it.
    ///
    /// Returns the removed part and the cascaded connections, in draw order.
    pub fn remove_part(&mut self, id: &PartId) -> Option<(Part, Vec<Connection>)> {
        let part = self.parts.remove(id)?;
        self.part_order.retain(|p| p != id);

        let dependent = self.connections_referencing(id);
        let removed = dependent
            .iter()
            .filter_map(|cid| self.remove_connection(cid))
            .collect();
        Some((part, removed))
    }

    /// Add a new connection on top of the draw order.
    ///
    /// Both endpoint parts must exist.
    pub fn add_connection(&mut self, connection: Connection) -> Result<(), ModelError> {
        if self.connections.contains_key(&connection.id) {
            return Err(ModelError::DuplicateConnection(connection.id));
        }
        for end in [&connection.from, &connection.to] {
            if !self.parts.contains_key(&end.part) {
                return Err(ModelError::UnknownPart(end.part.clone()));
            }
        }
        self.insert_connection(connection);
        Ok(())
    }

    /// Insert or replace a connection. A replaced connection keeps its slot.
    pub fn insert_connection(&mut self, connection: Connection) {
        if !self.connections.contains_key(&connection.id) {
            self.connection_order.push(connection.id.clone());
        }
        self.connections.insert(connection.id.clone(), connection);
    }

    pub fn remove_connection(&mut self, id: &ConnectionId) -> Option<Connection> {
        let connection = self.connections.remove(id)?;
        self.connection_order.retain(|c| c != id);
        Some(connection)
    }

    /// Ids of the connections with an endpoint on `part`, in draw order.
    pub fn connections_referencing(&self, part: &PartId) -> Vec<ConnectionId> {
        self.connections()
            .filter(|c| c.references(part))
            .map(|c| c.id.clone())
            .collect()
    }

    /// Ids of connections whose endpoint part is missing.
    pub fn dangling_connections(&self) -> Vec<ConnectionId> {
        self.connections()
            .filter(|c| !self.parts.contains_key(&c.from.part) || !self.parts.contains_key(&c.to.part))
            .map(|c| c.id.clone())
            .collect()
    }

    /// Move a part to the top of the z-order.
    pub fn bring_part_to_front(&mut self, id: &PartId) -> bool {
        bring_to_front(&mut self.part_order, id)
    }

    /// Move a connection to the end of the draw order.
    pub fn bring_connection_to_front(&mut self, id: &ConnectionId) -> bool {
        bring_to_front(&mut self.connection_order, id)
    }

    /// Serialize the diagram to pretty JSON.
    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize a diagram from JSON.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn bring_to_front<T: PartialEq>(order: &mut Vec<T>, id: &T) -> bool {
    match order.iter().position(|x| x == id) {
        Some(pos) if pos + 1 < order.len() => {
            let item = order.remove(pos);
            order.push(item);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(id: &str) -> Part {
        Part::new(PartId::from(id), "esp32", 10.0, 20.0)
    }

    fn wire(id: &str, from: &str, to: &str) -> Connection {
        Connection::new(
            ConnectionId::from(id),
            PinRef::new(from, "GND"),
            PinRef::new(to, "VCC"),
            "#FF6347",
        )
    }

    fn sample() -> Diagram {
        let mut d = Diagram::new();
        for id in ["A", "B", "C"] {
            d.add_part(part(id)).unwrap();
        }
        d.add_connection(wire("ab", "A", "B")).unwrap();
        d.add_connection(wire("bc", "B", "C")).unwrap();
        d
    }

    #[test]
    fn test_pin_ref_parse() {
        let pin = PinRef::parse("esp:GPIO:2").unwrap();
        assert_eq!(pin.part.as_str(), "esp");
        assert_eq!(pin.pin, "GPIO:2");
        assert_eq!(pin.to_string(), "esp:GPIO:2");
        assert!(PinRef::parse("nocolon").is_err());
        assert!(PinRef::parse(":pin").is_err());
    }

    #[test]
    fn test_cascade_delete() {
        let mut d = sample();
        let (removed, cascaded) = d.remove_part(&PartId::from("B")).unwrap();
        assert_eq!(removed.id.as_str(), "B");
        assert_eq!(cascaded.len(), 2);
        assert_eq!(d.connection_count(), 0);
        assert_eq!(d.part_count(), 2);
    }

    #[test]
    fn test_cascade_delete_keeps_unrelated() {
        let mut d = sample();
        d.remove_part(&PartId::from("A")).unwrap();
        let ids: Vec<_> = d.connections().map(|c| c.id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["bc"]);
    }

    #[test]
    fn test_add_connection_requires_parts() {
        let mut d = sample();
        let err = d.add_connection(wire("xz", "X", "A")).unwrap_err();
        assert!(matches!(err, ModelError::UnknownPart(_)));
        assert!(matches!(
            d.add_connection(wire("ab", "A", "B")),
            Err(ModelError::DuplicateConnection(_))
        ));
    }

    #[test]
    fn test_round_trip() {
        let mut d = sample();
        let c = d.connection_mut(&ConnectionId::from("ab")).unwrap();
        c.waypoints = vec![Point::new(30.0, 40.0), Point::new(30.0, 90.0)];
        c.label = Some("bus".to_string());
        c.kind = ConnectionKind::I2c;
        d.part_mut(&PartId::from("C")).unwrap().rotation = 90.0;

        let json = d.to_json().unwrap();
        let back = Diagram::from_json(&json).unwrap();
        assert_eq!(back, d);
        let order: Vec<_> = back.parts().map(|p| p.id.as_str().to_string()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_import_aliases_and_defaults() {
        let json = r##"{
            "components": [{"id": "p1", "type": "esp32", "left": 5, "top": 6}],
            "connections": [{
                "id": "c1", "from": "p1:GND", "to": "p1:3V3", "type": "can",
                "color": "#1E90FF", "constrains": [{"x": 1, "y": 2}, {"y": 4}, {"x": 3, "y": 4}]
            }]
        }"##;
        let d = Diagram::from_json(json).unwrap();
        let p = d.part(&PartId::from("p1")).unwrap();
        assert!((p.rotation).abs() < f64::EPSILON);
        let c = d.connection(&ConnectionId::from("c1")).unwrap();
        assert_eq!(c.kind, ConnectionKind::Can);
        assert_eq!(c.waypoints, vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)]);

        let out = d.to_json().unwrap();
        assert!(out.contains("\"parts\""));
        assert!(out.contains("\"waypoints\""));
    }

    #[test]
    fn test_import_legacy_connection() {
        let json = r#"{
            "parts": [{"id": "a", "type": "t", "left": 0, "top": 0},
                      {"id": "b", "type": "t", "left": 0, "top": 0}],
            "connections": [["a:1", "b:2", "blue", [{"x": 7, "y": 8}]]]
        }"#;
        let d = Diagram::from_json(json).unwrap();
        let c = d.connections().next().unwrap();
        assert_eq!(c.from, PinRef::new("a", "1"));
        assert_eq!(c.color, "blue");
        assert_eq!(c.kind, ConnectionKind::Wire);
        assert_eq!(c.waypoints, vec![Point::new(7.0, 8.0)]);
        assert!(c.id.as_str().starts_with("connection_"));
    }

    #[test]
    fn test_bring_to_front() {
        let mut d = sample();
        assert!(d.bring_connection_to_front(&ConnectionId::from("ab")));
        let order: Vec<_> = d.connections().map(|c| c.id.as_str().to_string()).collect();
        assert_eq!(order, vec!["bc", "ab"]);
        assert!(!d.bring_connection_to_front(&ConnectionId::from("ab")));
        assert!(d.bring_part_to_front(&PartId::from("A")));
        assert_eq!(d.parts().last().unwrap().id.as_str(), "A");
    }

    #[test]
    fn test_waypoint_editing() {
        let mut c = wire("w", "A", "B");
        assert_eq!(c.insert_waypoint(5, Point::new(1.0, 1.0)), 0);
        c.insert_waypoint(0, Point::new(0.0, 0.0));
        assert_eq!(c.waypoints[0], Point::new(0.0, 0.0));
        assert_eq!(c.remove_waypoint(1), Some(Point::new(1.0, 1.0)));
        assert_eq!(c.remove_waypoint(4), None);
    }

    #[test]
    fn test_dangling_connections() {
        let mut d = sample();
        d.insert_connection(wire("ghost", "A", "Z"));
        assert_eq!(d.dangling_connections(), vec![ConnectionId::from("ghost")]);
    }
}
