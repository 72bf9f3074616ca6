//! The in-memory schema.
//!
//! A [`SchemaModel`] is built once by the loader and never changes. It owns
//! the message and enum tables, the namespace tree pointing into them, and
//! the id/name indices the payload registry is built on.

use std::collections::HashMap;

use crate::{
    EnumDefinition, EnumIndex, FieldType, MessageDefinition, MessageIndex,
    WireConfig,
};

// ---------------------------------------------------------------------------
// Namespace tree
// ---------------------------------------------------------------------------

/// One node of the namespace tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceEntry {
    /// A nested namespace, e.g. `System` inside `Testing`.
    Namespace(Namespace),
    /// A message definition leaf.
    Message(MessageIndex),
}

/// A namespace: an ordered set of named child entries.
///
/// Entries keep the order they had in the schema document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Namespace {
    path: String,
    entries: Vec<(String, NamespaceEntry)>,
    index: HashMap<String, usize>,
}

impl Namespace {
    pub(crate) fn new(path: String) -> Self {
        Self {
            path,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Adds a child. Returns `false` (and leaves the tree unchanged) if the
    /// name is already taken.
    pub(crate) fn insert(&mut self, name: String, entry: NamespaceEntry) -> bool {
        if self.index.contains_key(&name) {
            return false;
        }
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, entry));
        true
    }

    /// Dotted path of this namespace; empty for the root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Looks up a direct child.
    pub fn get(&self, name: &str) -> Option<&NamespaceEntry> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    /// Looks up a direct child namespace.
    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        match self.get(name)? {
            NamespaceEntry::Namespace(ns) => Some(ns),
            NamespaceEntry::Message(_) => None,
        }
    }

    /// Looks up a direct child message.
    pub fn message(&self, name: &str) -> Option<MessageIndex> {
        match self.get(name)? {
            NamespaceEntry::Message(index) => Some(*index),
            NamespaceEntry::Namespace(_) => None,
        }
    }

    /// Follows a dotted path relative to this namespace.
    pub fn resolve(&self, path: &str) -> Option<&NamespaceEntry> {
        let mut segments = path.split('.');
        let mut entry = self.get(segments.next()?)?;
        for segment in segments {
            match entry {
                NamespaceEntry::Namespace(ns) => entry = ns.get(segment)?,
                NamespaceEntry::Message(_) => return None,
            }
        }
        Some(entry)
    }

    /// Children in document order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &NamespaceEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// SchemaModel
// ---------------------------------------------------------------------------

/// A validated, immutable schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaModel {
    name: String,
    version: u32,
    wire: WireConfig,
    root: Namespace,
    messages: Vec<MessageDefinition>,
    enums: Vec<EnumDefinition>,
    by_id: HashMap<u32, MessageIndex>,
    by_path: HashMap<String, MessageIndex>,
    enums_by_name: HashMap<String, EnumIndex>,
}

impl SchemaModel {
    /// Assembles a model from tables the loader has already checked.
    pub(crate) fn new(
        name: String,
        version: u32,
        wire: WireConfig,
        root: Namespace,
        messages: Vec<MessageDefinition>,
        enums: Vec<EnumDefinition>,
    ) -> Self {
        let by_id = messages
            .iter()
            .enumerate()
            .map(|(i, m)| (m.id, MessageIndex(i)))
            .collect();
        let by_path = messages
            .iter()
            .enumerate()
            .map(|(i, m)| (m.path.clone(), MessageIndex(i)))
            .collect();
        let enums_by_name = enums
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), EnumIndex(i)))
            .collect();
        Self {
            name,
            version,
            wire,
            root,
            messages,
            enums,
            by_id,
            by_path,
            enums_by_name,
        }
    }

    /// `PROTOCOL_NAME` of the schema document.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `PROTOCOL_VERSION` of the schema document.
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn wire(&self) -> &WireConfig {
        &self.wire
    }

    /// Root of the message namespace tree.
    pub fn root(&self) -> &Namespace {
        &self.root
    }

    pub fn message(&self, index: MessageIndex) -> &MessageDefinition {
        &self.messages[index.0]
    }

    /// All message definitions with their indices, in document order.
    pub fn messages(
        &self,
    ) -> impl Iterator<Item = (MessageIndex, &MessageDefinition)> {
        self.messages
            .iter()
            .enumerate()
            .map(|(i, m)| (MessageIndex(i), m))
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Fewest bytes one value of `ty` can encode to.
    pub fn min_value_size(&self, ty: FieldType) -> usize {
        ty.min_encoded_size(&self.wire, |index| self.message(index).min_size())
    }

    pub fn enum_def(&self, index: EnumIndex) -> &EnumDefinition {
        &self.enums[index.0]
    }

    /// All enum definitions with their indices, in document order.
    pub fn enums(&self) -> impl Iterator<Item = (EnumIndex, &EnumDefinition)> {
        self.enums.iter().enumerate().map(|(i, e)| (EnumIndex(i), e))
    }

    pub fn enum_by_name(&self, name: &str) -> Option<EnumIndex> {
        self.enums_by_name.get(name).copied()
    }

    /// Message definition carrying identifier `id`.
    pub fn index_of_id(&self, id: u32) -> Option<MessageIndex> {
        self.by_id.get(&id).copied()
    }

    /// Message definition at qualified path `path`.
    pub fn index_of_path(&self, path: &str) -> Option<MessageIndex> {
        self.by_path.get(path).copied()
    }

    /// Returns `true` if `index` was minted for a model of this size.
    ///
    /// Indices from another model are not rejected by this check alone;
    /// callers that mix models compare model identity first.
    pub fn contains(&self, index: MessageIndex) -> bool {
        index.0 < self.messages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldDefinition, FieldType, ScalarType};

    fn model() -> SchemaModel {
        let mut system = Namespace::new("Testing.System".into());
        system.insert("TEXTMSG".into(), NamespaceEntry::Message(MessageIndex(0)));
        let mut testing = Namespace::new("Testing".into());
        testing.insert("System".into(), NamespaceEntry::Namespace(system));
        let mut root = Namespace::new(String::new());
        root.insert("Testing".into(), NamespaceEntry::Namespace(testing));

        let text = MessageDefinition::new(
            "Testing.System.TEXTMSG".into(),
            7,
            vec![FieldDefinition {
                name: "textdata".into(),
                ty: FieldType::Scalar(ScalarType::Text),
                optional: false,
                repeated: false,
                doc: None,
            }],
            None,
        );
        SchemaModel::new(
            "test".into(),
            1,
            WireConfig::default(),
            root,
            vec![text],
            Vec::new(),
        )
    }

    #[test]
    fn test_model_indices() {
        let model = model();
        let index = model.index_of_id(7).unwrap();
        assert_eq!(model.message(index).path, "Testing.System.TEXTMSG");
        assert_eq!(model.index_of_path("Testing.System.TEXTMSG"), Some(index));
        assert_eq!(model.index_of_id(8), None);
        assert_eq!(model.index_of_path("Testing.System"), None);
    }

    #[test]
    fn test_namespace_resolve() {
        let model = model();
        let root = model.root();
        assert!(matches!(
            root.resolve("Testing.System.TEXTMSG"),
            Some(NamespaceEntry::Message(_))
        ));
        assert!(matches!(
            root.resolve("Testing.System"),
            Some(NamespaceEntry::Namespace(_))
        ));
        assert!(root.resolve("Testing.System.TEXTMSG.extra").is_none());
        assert!(root.resolve("Nope").is_none());
    }

    #[test]
    fn test_namespace_navigation() {
        let model = model();
        let system = model
            .root()
            .namespace("Testing")
            .and_then(|ns| ns.namespace("System"))
            .unwrap();
        assert_eq!(system.path(), "Testing.System");
        assert_eq!(system.message("TEXTMSG"), Some(MessageIndex(0)));
        assert!(system.namespace("TEXTMSG").is_none());
        assert_eq!(system.len(), 1);
    }

    #[test]
    fn test_namespace_insert_rejects_duplicate() {
        let mut ns = Namespace::new("A".into());
        assert!(ns.insert("X".into(), NamespaceEntry::Message(MessageIndex(0))));
        assert!(!ns.insert("X".into(), NamespaceEntry::Message(MessageIndex(1))));
        assert_eq!(ns.message("X"), Some(MessageIndex(0)));
    }
}
