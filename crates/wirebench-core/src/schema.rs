//! Component schemas: pin layout, size and optional configuration script.
//!
//! Schemas are fetched asynchronously through a [`SchemaLoader`] and cached
//! in a [`SchemaCatalog`]. Pins are never persisted with the diagram; their
//! positions are derived from the schema and the owning part every time.

use crate::consts::PART_FALLBACK_MARGIN;
use crate::geometry::{Frame, absolute_position, bounding_box};
use crate::model::Part;
use crate::storage::BoxFuture;
use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// File listing the available component types.
pub const COMPONENT_LIST_FILE: &str = "components-list.json";

/// Schema errors.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Schema not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Malformed schema {kind}: {message}")]
    Parse { kind: String, message: String },
    #[error("Schema {0} declares no pins")]
    MissingPins(String),
    #[error("Schema {kind} has an invalid pin entry: {entry}")]
    InvalidPin { kind: String, entry: String },
}

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// One pin declared by a schema, relative to the part's top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct PinSpec {
    pub name: String,
    pub offset: Point,
    pub label: Option<String>,
}

impl PinSpec {
    /// Text shown next to the pin marker.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// Parse a `[name, x, y, label?]` entry.
    fn from_entry(entry: &[Value]) -> Option<Self> {
        let name = match entry.first()? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let x = length_value(entry.get(1)?)?;
        let y = length_value(entry.get(2)?)?;
        let label = entry.get(3).and_then(Value::as_str).map(String::from);
        Some(Self {
            name,
            offset: Point::new(x, y),
            label,
        })
    }
}

/// Parse a CSS-ish length: a bare number or a string such as `"120px"`.
pub fn parse_length(s: &str) -> Option<f64> {
    s.trim()
        .trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == '%')
        .trim()
        .parse()
        .ok()
}

fn length_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_length(s),
        _ => None,
    }
}

#[derive(Deserialize)]
struct RawSchema {
    name: Option<String>,
    size: Option<Vec<Value>>,
    preview: Option<String>,
    pins: Option<Vec<Vec<Value>>>,
    script: Option<Value>,
}

/// Parsed component schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSchema {
    /// Component type this schema was loaded for.
    pub kind: String,
    pub name: Option<String>,
    /// Declared body size, if any.
    pub size: Option<Size>,
    /// Preview image path relative to the schema directory.
    pub preview: Option<String>,
    pub pins: Vec<PinSpec>,
    /// Configuration script; its presence enables the "configure" action.
    pub script: Option<Value>,
}

impl ComponentSchema {
    /// Parse a schema document for component type `kind`.
    pub fn from_json(kind: &str, json: &str) -> SchemaResult<Self> {
        let raw: RawSchema = serde_json::from_str(json).map_err(|e| SchemaError::Parse {
            kind: kind.to_string(),
            message: e.to_string(),
        })?;
        let entries = raw
            .pins
            .ok_or_else(|| SchemaError::MissingPins(kind.to_string()))?;

        let pins = entries
            .iter()
            .map(|entry| {
                PinSpec::from_entry(entry).ok_or_else(|| SchemaError::InvalidPin {
                    kind: kind.to_string(),
                    entry: Value::Array(entry.clone()).to_string(),
                })
            })
            .collect::<SchemaResult<Vec<_>>>()?;

        let size = match raw.size.as_deref() {
            Some([w, h, ..]) => length_value(w).zip(length_value(h)).map(|(w, h)| Size::new(w, h)),
            _ => None,
        };

        Ok(Self {
            kind: kind.to_string(),
            name: raw.name,
            size,
            preview: raw.preview,
            pins,
            script: raw.script.filter(|s| !s.is_null()),
        })
    }

    /// Title shown on a part without a preview image.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.kind)
    }

    pub fn pin(&self, name: &str) -> Option<&PinSpec> {
        self.pins.iter().find(|p| p.name == name)
    }

    pub fn has_script(&self) -> bool {
        self.script.is_some()
    }

    /// Body size of a part. Without a declared size, the pins' extent plus a margin.
    pub fn part_size(&self) -> Size {
        if let Some(size) = self.size {
            return size;
        }
        bounding_box(self.pins.iter().map(|p| p.offset))
            .map(|r| Size::new(r.x1.max(0.0), r.y1.max(0.0)) + Size::new(PART_FALLBACK_MARGIN, PART_FALLBACK_MARGIN))
            .unwrap_or(Size::new(PART_FALLBACK_MARGIN * 2.0, PART_FALLBACK_MARGIN * 2.0))
    }

    /// The part's frame: offset to its top-left, rotated about its center.
    pub fn frame(&self, part: &Part) -> Frame {
        Frame::new(Vec2::new(part.left, part.top), self.part_size()).with_rotation(part.rotation)
    }

    /// Absolute diagram position of a named pin on `part`.
    pub fn pin_position(&self, part: &Part, pin: &str) -> Option<Point> {
        let spec = self.pin(pin)?;
        Some(absolute_position(spec.offset, &[self.frame(part)]))
    }

    /// Absolute positions of every pin on `part`, in schema order.
    pub fn pin_positions<'a>(&'a self, part: &Part) -> impl Iterator<Item = (&'a PinSpec, Point)> {
        let frame = self.frame(part);
        self.pins
            .iter()
            .map(move |spec| (spec, absolute_position(spec.offset, &[frame])))
    }
}

/// Entry of the available-component list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
}

/// Source of component schemas.
pub trait SchemaLoader: Send + Sync {
    /// Fetch and parse the schema for a component type.
    fn fetch_schema(&self, kind: &str) -> BoxFuture<'_, SchemaResult<ComponentSchema>>;

    /// Fetch the list of available component types.
    fn fetch_component_list(&self) -> BoxFuture<'_, SchemaResult<Vec<ComponentEntry>>>;
}

/// Loads `<kind>.json` schemas from a directory.
pub struct DirectorySchemaLoader {
    root: PathBuf,
}

impl DirectorySchemaLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read(&self, file: &str) -> SchemaResult<String> {
        let path = self.root.join(file);
        std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SchemaError::NotFound(path.display().to_string()),
            _ => SchemaError::Io(format!("Failed to read {}: {}", path.display(), e)),
        })
    }
}

/// Component types become file names; anything path-like is rejected.
fn is_safe_kind(kind: &str) -> bool {
    !kind.is_empty()
        && kind
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
        && !kind.starts_with('.')
}

impl SchemaLoader for DirectorySchemaLoader {
    fn fetch_schema(&self, kind: &str) -> BoxFuture<'_, SchemaResult<ComponentSchema>> {
        let kind = kind.to_string();
        Box::pin(async move {
            if !is_safe_kind(&kind) {
                return Err(SchemaError::NotFound(kind));
            }
            let json = self.read(&format!("{}.json", kind))?;
            ComponentSchema::from_json(&kind, &json)
        })
    }

    fn fetch_component_list(&self) -> BoxFuture<'_, SchemaResult<Vec<ComponentEntry>>> {
        Box::pin(async move {
            let json = self.read(COMPONENT_LIST_FILE)?;
            serde_json::from_str(&json).map_err(|e| SchemaError::Parse {
                kind: COMPONENT_LIST_FILE.to_string(),
                message: e.to_string(),
            })
        })
    }
}

/// In-memory schema source, keyed by component type.
#[derive(Default)]
pub struct MemorySchemaLoader {
    schemas: HashMap<String, String>,
    components: Option<Vec<ComponentEntry>>,
    fetches: AtomicUsize,
}

impl MemorySchemaLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register raw schema JSON for a component type.
    pub fn with_schema(mut self, kind: &str, json: &str) -> Self {
        self.schemas.insert(kind.to_string(), json.to_string());
        self
    }

    /// Set the component list.
    pub fn with_components(mut self, components: Vec<ComponentEntry>) -> Self {
        self.components = Some(components);
        self
    }

    /// Number of schema fetches served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl SchemaLoader for MemorySchemaLoader {
    fn fetch_schema(&self, kind: &str) -> BoxFuture<'_, SchemaResult<ComponentSchema>> {
        let kind = kind.to_string();
        Box::pin(async move {
            self.fetches.fetch_add(1, Ordering::Relaxed);
            let json = self
                .schemas
                .get(&kind)
                .ok_or_else(|| SchemaError::NotFound(kind.clone()))?;
            ComponentSchema::from_json(&kind, json)
        })
    }

    fn fetch_component_list(&self) -> BoxFuture<'_, SchemaResult<Vec<ComponentEntry>>> {
        Box::pin(async move {
            self.components
                .clone()
                .ok_or_else(|| SchemaError::NotFound(COMPONENT_LIST_FILE.to_string()))
        })
    }
}

/// Caching front for a [`SchemaLoader`].
///
/// Resolved schemas are shared; a failed fetch is not cached.
pub struct SchemaCatalog {
    loader: Box<dyn SchemaLoader>,
    cache: RwLock<HashMap<String, Arc<ComponentSchema>>>,
    components: RwLock<Vec<ComponentEntry>>,
}

impl SchemaCatalog {
    pub fn new(loader: impl SchemaLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            cache: RwLock::new(HashMap::new()),
            components: RwLock::new(Vec::new()),
        }
    }

    /// Catalog backed by a schema directory.
    pub fn from_directory(root: impl Into<PathBuf>) -> Self {
        Self::new(DirectorySchemaLoader::new(root))
    }

    /// A cached schema, without fetching.
    pub fn get(&self, kind: &str) -> Option<Arc<ComponentSchema>> {
        self.cache.read().ok()?.get(kind).cloned()
    }

    /// Put a schema into the cache directly.
    pub fn insert(&self, schema: ComponentSchema) -> Arc<ComponentSchema> {
        let schema = Arc::new(schema);
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(schema.kind.clone(), Arc::clone(&schema));
        }
        schema
    }

    /// Return the cached schema or fetch it through the loader.
    pub async fn ensure(&self, kind: &str) -> SchemaResult<Arc<ComponentSchema>> {
        if let Some(schema) = self.get(kind) {
            return Ok(schema);
        }
        let schema = self.loader.fetch_schema(kind).await?;
        log::debug!("Loaded schema {} with {} pins", kind, schema.pins.len());
        Ok(self.insert(schema))
    }

    /// Reload the available-component list. A missing list yields an empty one.
    pub async fn load_component_list(&self) -> Vec<ComponentEntry> {
        let list = match self.loader.fetch_component_list().await {
            Ok(list) => list,
            Err(e) => {
                log::warn!("Component list unavailable: {}", e);
                Vec::new()
            }
        };
        if let Ok(mut components) = self.components.write() {
            components.clone_from(&list);
        }
        list
    }

    /// The last loaded component list.
    pub fn components(&self) -> Vec<ComponentEntry> {
        self.components
            .read()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}
