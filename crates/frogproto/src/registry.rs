//! The payload registry: message kind ↔ identifier ↔ qualified name.

use std::sync::Arc;

use frogproto_schema::SchemaModel;

use crate::{FrogprotoError, MessageKind};

/// Three-way lookup table over one loaded protocol.
///
/// All lookups are hashed. Misses are `None`, never a panic.
#[derive(Debug, Clone, Copy)]
pub struct PayloadRegistry<'a> {
    model: &'a Arc<SchemaModel>,
}

impl<'a> PayloadRegistry<'a> {
    pub(crate) fn new(model: &'a Arc<SchemaModel>) -> Self {
        Self { model }
    }

    /// Identifier of `kind`.
    ///
    /// Fails only if `kind` was created by a different protocol.
    pub fn kind_to_id(&self, kind: &MessageKind) -> Result<u32, FrogprotoError> {
        if !kind.belongs_to(self.model) {
            return Err(FrogprotoError::ForeignKind {
                kind: kind.name().to_string(),
                protocol: self.model.name().to_string(),
            });
        }
        Ok(kind.id())
    }

    pub fn id_to_kind(&self, id: u32) -> Option<MessageKind> {
        let index = self.model.index_of_id(id)?;
        Some(MessageKind::new(Arc::clone(self.model), index))
    }

    pub fn id_to_name(&self, id: u32) -> Option<&'a str> {
        let model: &'a SchemaModel = self.model;
        let index = model.index_of_id(id)?;
        Some(model.message(index).path.as_str())
    }

    pub fn name_to_kind(&self, name: &str) -> Option<MessageKind> {
        let index = self.model.index_of_path(name)?;
        Some(MessageKind::new(Arc::clone(self.model), index))
    }

    pub fn len(&self) -> usize {
        self.model.message_count()
    }

    pub fn is_empty(&self) -> bool {
        self.model.message_count() == 0
    }

    /// Every kind, ordered by identifier.
    pub fn kinds(&self) -> Vec<MessageKind> {
        let mut kinds: Vec<MessageKind> = self
            .model
            .messages()
            .map(|(index, _)| MessageKind::new(Arc::clone(self.model), index))
            .collect();
        kinds.sort_by_key(MessageKind::id);
        kinds
    }
}

#[cfg(test)]
mod tests {
    use frogproto_schema::load;
    use serde_json::json;

    use super::*;

    fn model() -> Arc<SchemaModel> {
        Arc::new(
            load(json!({
                "messages": {
                    "B": { "id": 9, "fields": [] },
                    "A": { "One": [], "Two": [] }
                }
            }))
            .unwrap(),
        )
    }

    #[test]
    fn test_lookups_agree() {
        let model = model();
        let registry = PayloadRegistry::new(&model);

        let kind = registry.name_to_kind("A.Two").unwrap();
        assert_eq!(registry.kind_to_id(&kind).unwrap(), 3);
        assert_eq!(registry.id_to_name(3), Some("A.Two"));
        assert_eq!(registry.id_to_kind(3), Some(kind));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_misses_are_none() {
        let model = model();
        let registry = PayloadRegistry::new(&model);
        assert!(registry.id_to_kind(1).is_none());
        assert!(registry.id_to_name(100).is_none());
        assert!(registry.name_to_kind("A").is_none());
        assert!(registry.name_to_kind("A.Three").is_none());
    }

    #[test]
    fn test_kinds_in_id_order() {
        let model = model();
        let registry = PayloadRegistry::new(&model);
        let ids: Vec<u32> = registry.kinds().iter().map(MessageKind::id).collect();
        assert_eq!(ids, vec![2, 3, 9]);
    }

    #[test]
    fn test_foreign_kind_is_rejected() {
        let first = model();
        let second = model();
        let kind = PayloadRegistry::new(&first).name_to_kind("B").unwrap();
        let err = PayloadRegistry::new(&second).kind_to_id(&kind).unwrap_err();
        assert!(matches!(err, FrogprotoError::ForeignKind { .. }));
    }
}
