//! Schema loading and validation.
//!
//! The loader turns a schema document into a [`SchemaModel`]. Checks run in
//! a fixed order and stop at the first violation, scanning in document
//! order, so a broken schema always reports the same error:
//!
//! 1. **Shape**: the document, its `enums`, `WIRE` and `messages` sections
//!    and every field entry have the expected structure.
//! 2. **Field types**: datatypes are known, enum and message references
//!    resolve, field names are unique, no message requires itself, and
//!    no repeated field holds messages that can encode to zero bytes.
//! 3. **Identifiers**: ids fit the id header and are pairwise distinct.
//! 4. **Names**: no message path or enum name is defined twice.
//!
//! Nothing global is touched: every call returns an independent model.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::audit::{self, Segment};
use crate::{
    EnumDefinition, EnumIndex, FieldDefinition, FieldType, MessageDefinition,
    MessageIndex, Namespace, NamespaceEntry, ScalarType, SchemaError,
    SchemaModel, WireConfig,
};

// ---------------------------------------------------------------------------
// SchemaSource
// ---------------------------------------------------------------------------

/// Where a schema comes from.
///
/// Strings and paths convert to [`SchemaSource::Path`], matching the common
/// `load("protocol.json")` call. JSON text held in memory must be wrapped
/// in [`SchemaSource::Text`] explicitly.
#[derive(Debug, Clone)]
pub enum SchemaSource {
    /// A JSON file on disk.
    Path(PathBuf),
    /// JSON text.
    Text(String),
    /// An already-parsed document.
    Json(Value),
}

impl From<PathBuf> for SchemaSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for SchemaSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<&str> for SchemaSource {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<String> for SchemaSource {
    fn from(path: String) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<Value> for SchemaSource {
    fn from(document: Value) -> Self {
        Self::Json(document)
    }
}

impl From<&Value> for SchemaSource {
    fn from(document: &Value) -> Self {
        Self::Json(document.clone())
    }
}

// ---------------------------------------------------------------------------
// SchemaLoader
// ---------------------------------------------------------------------------

/// Builder for loading schemas.
///
/// ```rust
/// use frogproto_schema::{SchemaLoader, Width, WireConfig};
/// use serde_json::json;
///
/// let model = SchemaLoader::new()
///     .wire_config(WireConfig { msgid: Width::U8, ..WireConfig::default() })
///     .load(json!({
///         "PROTOCOL_NAME": "demo",
///         "messages": { "Net": { "PING": [ { "name": "seq", "datatype": "u32" } ] } }
///     }))
///     .unwrap();
/// assert_eq!(model.wire().msgid, Width::U8);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaLoader {
    wire: Option<WireConfig>,
}

impl SchemaLoader {
    /// Creates a loader that takes the wire configuration from the schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `config` instead of the schema's own `WIRE` section.
    pub fn wire_config(mut self, config: WireConfig) -> Self {
        self.wire = Some(config);
        self
    }

    /// Loads and validates a schema.
    ///
    /// # Errors
    /// Returns the first [`SchemaError`] found; no partial model is ever
    /// returned.
    pub fn load(
        &self,
        source: impl Into<SchemaSource>,
    ) -> Result<SchemaModel, SchemaError> {
        let (document, duplicates) = match source.into() {
            SchemaSource::Path(path) => {
                tracing::debug!(path = %path.display(), "reading schema file");
                let text = std::fs::read_to_string(&path)
                    .map_err(|source| SchemaError::Io { path, source })?;
                parse(&text)?
            }
            SchemaSource::Text(text) => parse(&text)?,
            SchemaSource::Json(document) => (document, Vec::new()),
        };

        let model = build(document, &duplicates, self.wire.as_ref())?;
        tracing::info!(
            protocol = %model.name(),
            version = model.version(),
            messages = model.message_count(),
            "schema loaded"
        );
        Ok(model)
    }
}

/// Loads a schema with default options.
///
/// Shorthand for `SchemaLoader::new().load(source)`.
pub fn load(source: impl Into<SchemaSource>) -> Result<SchemaModel, SchemaError> {
    SchemaLoader::new().load(source)
}

fn parse(text: &str) -> Result<(Value, Vec<Vec<Segment>>), SchemaError> {
    let duplicates = audit::duplicate_keys(text)?;
    let document = serde_json::from_str(text)?;
    Ok((document, duplicates))
}

// ---------------------------------------------------------------------------
// Raw document shapes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RawDocument {
    #[serde(rename = "PROTOCOL_NAME", default)]
    name: Option<String>,
    #[serde(rename = "PROTOCOL_VERSION", default)]
    version: Option<RawVersion>,
    #[serde(rename = "WIRE", default)]
    wire: Option<WireConfig>,
    #[serde(default)]
    enums: Map<String, Value>,
    messages: Map<String, Value>,
}

/// Older schemas write the version as a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawVersion {
    Number(u64),
    Text(String),
}

impl RawVersion {
    fn resolve(self) -> Result<u32, SchemaError> {
        let parsed = match self {
            Self::Number(n) => u32::try_from(n).ok(),
            Self::Text(s) => s.trim().parse().ok(),
        };
        parsed.ok_or_else(|| {
            SchemaError::shape(
                "PROTOCOL_VERSION",
                "expected an unsigned 32-bit version number",
            )
        })
    }
}

/// A message written as an object rather than a bare field list.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMessageBody {
    #[serde(default)]
    id: Option<u64>,
    fields: Vec<Value>,
    #[serde(default, alias = "description")]
    doc: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawField {
    name: String,
    #[serde(alias = "type")]
    datatype: String,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    repeated: bool,
    #[serde(default, rename = "enum")]
    enum_name: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, alias = "description")]
    doc: Option<String>,
}

struct RawMessage {
    path: String,
    /// Path of the enclosing namespace, for relative message references.
    namespace: String,
    id: u64,
    fields: Vec<RawField>,
    doc: Option<String>,
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

fn build(
    document: Value,
    duplicates: &[Vec<Segment>],
    wire_override: Option<&WireConfig>,
) -> Result<SchemaModel, SchemaError> {
    // 1. Shape.
    if let Some(path) = duplicates.iter().find_map(|d| match classify(d) {
        Duplicate::Other(path) => Some(path),
        _ => None,
    }) {
        return Err(SchemaError::shape(path, "duplicate key"));
    }
    let doc: RawDocument = serde_json::from_value(document)
        .map_err(|e| SchemaError::shape("<document>", e.to_string()))?;
    let name = doc.name.unwrap_or_else(|| "unnamed".to_string());
    let version = match doc.version {
        Some(version) => version.resolve()?,
        None => 0,
    };
    let wire = wire_override.cloned().or(doc.wire).unwrap_or_default();
    let enums = collect_enums(&doc.enums, &wire)?;

    let mut walker = Walker::default();
    let mut root = Namespace::new(String::new());
    walker.walk(&doc.messages, &mut root)?;
    let raw = walker.messages;
    // A repeated key below `messages` that names no namespace or message
    // sits inside a message body.
    for duplicate in duplicates {
        if let Duplicate::Path(path) = classify(duplicate) {
            if root.resolve(&path).is_none() {
                return Err(SchemaError::shape(
                    format!("messages.{path}"),
                    "duplicate key",
                ));
            }
        }
    }

    // 2. Field types.
    let enum_index: HashMap<&str, EnumIndex> = enums
        .iter()
        .enumerate()
        .map(|(i, e)| (e.name.as_str(), EnumIndex(i)))
        .collect();
    let path_index: HashMap<&str, MessageIndex> = raw
        .iter()
        .enumerate()
        .map(|(i, m)| (m.path.as_str(), MessageIndex(i)))
        .collect();
    let mut resolved = Vec::with_capacity(raw.len());
    for message in &raw {
        resolved.push(resolve_fields(message, &enum_index, &path_index)?);
    }
    check_recursion(&raw, &resolved)?;
    let min_sizes = min_body_sizes(&resolved, &wire);
    check_repeated_sizes(&raw, &resolved, &min_sizes, &wire)?;

    // 3. Identifiers.
    let mut ids = Vec::with_capacity(raw.len());
    let mut seen: HashMap<u64, &str> = HashMap::new();
    for message in &raw {
        let id = u32::try_from(message.id)
            .ok()
            .filter(|_| wire.msgid.fits(message.id))
            .ok_or_else(|| SchemaError::IdOutOfRange {
                path: message.path.clone(),
                id: message.id,
                width: wire.msgid,
            })?;
        if let Some(first) = seen.insert(message.id, &message.path) {
            return Err(SchemaError::DuplicateId {
                id: message.id,
                first: first.to_string(),
                second: message.path.clone(),
            });
        }
        ids.push(id);
    }

    // 4. Names.
    for duplicate in duplicates {
        match classify(duplicate) {
            Duplicate::Path(path) => {
                return Err(SchemaError::DuplicatePath { path });
            }
            Duplicate::Enum(name) => {
                return Err(SchemaError::DuplicateEnum { name });
            }
            Duplicate::Other(_) => {}
        }
    }

    let messages = raw
        .into_iter()
        .zip(resolved)
        .zip(ids)
        .zip(min_sizes)
        .map(|(((message, fields), id), min_size)| {
            MessageDefinition::new(message.path, id, fields, message.doc)
                .with_min_size(min_size)
        })
        .collect();

    Ok(SchemaModel::new(name, version, wire, root, messages, enums))
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

fn collect_enums(
    section: &Map<String, Value>,
    wire: &WireConfig,
) -> Result<Vec<EnumDefinition>, SchemaError> {
    let mut enums = Vec::with_capacity(section.len());
    for (name, members) in section {
        let path = format!("enums.{name}");
        if name.is_empty() {
            return Err(SchemaError::shape(path, "enum names must not be empty"));
        }
        let Value::Object(members) = members else {
            return Err(SchemaError::shape(
                path,
                "expected an object of member values",
            ));
        };

        let mut doc = None;
        let mut values = Vec::with_capacity(members.len());
        for (member, value) in members {
            if member == "_info" {
                doc = Some(match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                });
                continue;
            }
            let qualified = format!("{name}.{member}");
            let raw = value.as_u64().ok_or_else(|| {
                SchemaError::shape(
                    format!("enums.{qualified}"),
                    "enum values must be unsigned integers",
                )
            })?;
            let value = u32::try_from(raw)
                .ok()
                .filter(|_| wire.enum_width.fits(raw))
                .ok_or_else(|| SchemaError::EnumValueOutOfRange {
                    member: qualified,
                    value: raw,
                    width: wire.enum_width,
                })?;
            values.push((member.clone(), value));
        }

        enums.push(EnumDefinition {
            name: name.clone(),
            members: values,
            doc,
        });
    }
    Ok(enums)
}

// ---------------------------------------------------------------------------
// Namespace walk
// ---------------------------------------------------------------------------

/// Walks the `messages` tree in document order, building the namespace
/// tree and numbering messages.
struct Walker {
    messages: Vec<RawMessage>,
    /// Auto identifiers start at 1 and advance once per message, whether
    /// or not that message carries an explicit id.
    next_id: u64,
}

impl Default for Walker {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            next_id: 1,
        }
    }
}

impl Walker {
    fn walk(
        &mut self,
        children: &Map<String, Value>,
        ns: &mut Namespace,
    ) -> Result<(), SchemaError> {
        for (segment, node) in children {
            let path = if ns.path().is_empty() {
                segment.clone()
            } else {
                format!("{}.{segment}", ns.path())
            };
            if segment.is_empty() || segment.contains('.') {
                return Err(SchemaError::shape(
                    path,
                    "names must be non-empty and must not contain '.'",
                ));
            }

            let entry = match node {
                Value::Array(items) => {
                    let fields = parse_fields(items, &path)?;
                    self.push(path.clone(), ns.path(), None, fields, None)
                }
                Value::Object(body) if body.get("fields").is_some_and(Value::is_array) => {
                    let body: RawMessageBody = serde_json::from_value(node.clone())
                        .map_err(|e| SchemaError::shape(&path, e.to_string()))?;
                    let fields = parse_fields(&body.fields, &path)?;
                    self.push(path.clone(), ns.path(), body.id, fields, body.doc)
                }
                Value::Object(grandchildren) => {
                    let mut child = Namespace::new(path.clone());
                    self.walk(grandchildren, &mut child)?;
                    NamespaceEntry::Namespace(child)
                }
                _ => {
                    return Err(SchemaError::shape(
                        path,
                        "expected a namespace object or a message definition",
                    ));
                }
            };

            if !ns.insert(segment.clone(), entry) {
                return Err(SchemaError::DuplicatePath { path });
            }
        }
        Ok(())
    }

    fn push(
        &mut self,
        path: String,
        namespace: &str,
        explicit_id: Option<u64>,
        fields: Vec<RawField>,
        doc: Option<String>,
    ) -> NamespaceEntry {
        let index = MessageIndex(self.messages.len());
        let id = explicit_id.unwrap_or(self.next_id);
        self.next_id += 1;
        self.messages.push(RawMessage {
            path,
            namespace: namespace.to_string(),
            id,
            fields,
            doc,
        });
        NamespaceEntry::Message(index)
    }
}

fn parse_fields(items: &[Value], path: &str) -> Result<Vec<RawField>, SchemaError> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let at = format!("{path}[{i}]");
            let field: RawField = serde_json::from_value(item.clone())
                .map_err(|e| SchemaError::shape(&at, e.to_string()))?;
            if field.name.is_empty() {
                return Err(SchemaError::shape(at, "field names must not be empty"));
            }
            if field.enum_name.is_some() && field.datatype != "enum" {
                return Err(SchemaError::shape(
                    at,
                    "`enum` is only allowed on fields of datatype `enum`",
                ));
            }
            if field.message.is_some() && field.datatype != "message" {
                return Err(SchemaError::shape(
                    at,
                    "`message` is only allowed on fields of datatype `message`",
                ));
            }
            Ok(field)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Field resolution
// ---------------------------------------------------------------------------

fn resolve_fields(
    message: &RawMessage,
    enums: &HashMap<&str, EnumIndex>,
    paths: &HashMap<&str, MessageIndex>,
) -> Result<Vec<FieldDefinition>, SchemaError> {
    let mut names = HashSet::new();
    let mut fields = Vec::with_capacity(message.fields.len());
    for raw in &message.fields {
        if !names.insert(raw.name.as_str()) {
            return Err(SchemaError::DuplicateField {
                message: message.path.clone(),
                field: raw.name.clone(),
            });
        }

        let ty = match raw.datatype.as_str() {
            // The original schemas name the enum after the field itself.
            "enum" => {
                let name = raw.enum_name.as_deref().unwrap_or(&raw.name);
                let index = enums.get(name).ok_or_else(|| SchemaError::UnknownEnum {
                    message: message.path.clone(),
                    field: raw.name.clone(),
                    name: name.to_string(),
                })?;
                FieldType::Enum(*index)
            }
            "message" => {
                let target = raw.message.as_deref().unwrap_or_default();
                let index = resolve_message(target, &message.namespace, paths)
                    .ok_or_else(|| SchemaError::UnknownMessage {
                        message: message.path.clone(),
                        field: raw.name.clone(),
                        target: target.to_string(),
                    })?;
                FieldType::Message(index)
            }
            other => ScalarType::from_datatype(other)
                .map(FieldType::Scalar)
                .ok_or_else(|| SchemaError::UnknownType {
                    message: message.path.clone(),
                    field: raw.name.clone(),
                    datatype: other.to_string(),
                })?,
        };

        fields.push(FieldDefinition {
            name: raw.name.clone(),
            ty,
            optional: raw.optional,
            repeated: raw.repeated,
            doc: raw.doc.clone(),
        });
    }
    Ok(fields)
}

/// Resolves `target` as an absolute path first, then relative to the
/// namespace holding the referring message.
fn resolve_message(
    target: &str,
    namespace: &str,
    paths: &HashMap<&str, MessageIndex>,
) -> Option<MessageIndex> {
    if target.is_empty() {
        return None;
    }
    if let Some(&index) = paths.get(target) {
        return Some(index);
    }
    if namespace.is_empty() {
        return None;
    }
    paths.get(format!("{namespace}.{target}").as_str()).copied()
}

/// Rejects messages that contain themselves through required, non-repeated
/// nested fields.
fn check_recursion(
    raw: &[RawMessage],
    fields: &[Vec<FieldDefinition>],
) -> Result<(), SchemaError> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Unvisited,
        Active,
        Done,
    }

    fn visit(index: usize, fields: &[Vec<FieldDefinition>], marks: &mut [Mark]) -> Option<usize> {
        match marks[index] {
            Mark::Done => return None,
            Mark::Active => return Some(index),
            Mark::Unvisited => {}
        }
        marks[index] = Mark::Active;
        for field in &fields[index] {
            if field.optional || field.repeated {
                continue;
            }
            if let FieldType::Message(target) = field.ty {
                if let Some(cycle) = visit(target.0, fields, marks) {
                    return Some(cycle);
                }
            }
        }
        marks[index] = Mark::Done;
        None
    }

    let mut marks = vec![Mark::Unvisited; raw.len()];
    for index in 0..raw.len() {
        if let Some(cycle) = visit(index, fields, &mut marks) {
            return Err(SchemaError::RecursiveMessage {
                path: raw[cycle].path.clone(),
            });
        }
    }
    Ok(())
}

/// Minimum encoded body size of every message.
///
/// Runs after [`check_recursion`], so required nesting is acyclic and the
/// walk terminates.
fn min_body_sizes(fields: &[Vec<FieldDefinition>], wire: &WireConfig) -> Vec<usize> {
    fn visit(
        index: usize,
        fields: &[Vec<FieldDefinition>],
        wire: &WireConfig,
        sizes: &mut [Option<usize>],
    ) -> usize {
        if let Some(size) = sizes[index] {
            return size;
        }
        let mut size = 0;
        for field in &fields[index] {
            size += if field.optional {
                1
            } else if field.repeated {
                wire.length.bytes()
            } else {
                field
                    .ty
                    .min_encoded_size(wire, |target| visit(target.0, fields, wire, sizes))
            };
        }
        sizes[index] = Some(size);
        size
    }

    let mut sizes = vec![None; fields.len()];
    (0..fields.len())
        .map(|index| visit(index, fields, wire, &mut sizes))
        .collect()
}

/// Rejects repeated fields whose elements can encode to no bytes at all.
///
/// A count header over such elements is unbounded by the input length, so
/// a few bytes could claim billions of elements.
fn check_repeated_sizes(
    raw: &[RawMessage],
    fields: &[Vec<FieldDefinition>],
    min_sizes: &[usize],
    wire: &WireConfig,
) -> Result<(), SchemaError> {
    for (message, fields) in raw.iter().zip(fields) {
        for field in fields.iter().filter(|f| f.repeated) {
            if field.ty.min_encoded_size(wire, |target| min_sizes[target.0]) == 0 {
                return Err(SchemaError::shape(
                    format!("messages.{}.{}", message.path, field.name),
                    "repeated field of a message that can encode to zero bytes",
                ));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Duplicate keys
// ---------------------------------------------------------------------------

enum Duplicate {
    /// A message path or namespace defined twice under `messages`.
    Path(String),
    /// An enum defined twice under `enums`.
    Enum(String),
    /// Any other repeated key.
    Other(String),
}

fn classify(path: &[Segment]) -> Duplicate {
    let keys: Option<Vec<&str>> = path
        .iter()
        .map(|segment| match segment {
            Segment::Key(key) => Some(key.as_str()),
            Segment::Index(_) => None,
        })
        .collect();

    match keys.as_deref() {
        Some(["messages", rest @ ..]) if !rest.is_empty() => {
            Duplicate::Path(rest.join("."))
        }
        Some(["enums", name]) => Duplicate::Enum((*name).to_string()),
        _ => Duplicate::Other(display_path(path)),
    }
}

fn display_path(path: &[Segment]) -> String {
    let mut out = String::new();
    for segment in path {
        match segment {
            Segment::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            Segment::Index(i) => out.push_str(&format!("[{i}]")),
        }
    }
    out
}
