//! Scoped selection of a host entity.

use super::{CadDocument, DocumentError, EntityId, EntityKind, Relation, SchemaLocation};

/// One entity made current in the host for the lifetime of the guard.
///
/// The guard holds the document's unique borrow, so a second selection
/// cannot be opened while this one is alive. Dropping the guard releases
/// the host's current object of this kind.
pub struct Selection<'d, D: CadDocument + ?Sized> {
    doc: &'d mut D,
    kind: EntityKind,
    id: EntityId,
}

impl<'d, D: CadDocument + ?Sized> Selection<'d, D> {
    pub fn acquire(doc: &'d mut D, kind: EntityKind, id: EntityId) -> Result<Self, DocumentError> {
        doc.select(kind, id)?;
        Ok(Self { doc, kind, id })
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn signal_name(&self) -> Result<String, DocumentError> {
        self.doc.signal_name()
    }

    pub fn net_id(&self) -> Result<Option<EntityId>, DocumentError> {
        self.doc.net_id(self.kind)
    }

    /// Related ids with the host's `0` placeholders filtered out.
    pub fn related(&self, relation: Relation) -> Result<Vec<EntityId>, DocumentError> {
        Ok(self
            .doc
            .related_ids(self.kind, relation)?
            .into_iter()
            .filter(|id| id.is_valid())
            .collect())
    }

    pub fn schema_location(&self) -> Result<Option<SchemaLocation>, DocumentError> {
        self.doc.schema_location(self.kind)
    }

    pub fn name(&self) -> Result<String, DocumentError> {
        self.doc.name(self.kind)
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), DocumentError> {
        self.doc.set_name(self.kind, name)
    }

    pub fn attribute(&self, name: &str) -> Result<Option<String>, DocumentError> {
        self.doc.attribute(self.kind, name)
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) -> Result<(), DocumentError> {
        self.doc.set_attribute(self.kind, name, value)
    }

    pub fn component_attribute(&self, name: &str) -> Result<Option<String>, DocumentError> {
        self.doc.component_attribute(name)
    }

    pub fn is_terminal(&self) -> Result<bool, DocumentError> {
        self.doc.is_terminal()
    }

    pub fn is_terminal_block(&self) -> Result<bool, DocumentError> {
        self.doc.is_terminal_block()
    }

    pub fn is_cable(&self) -> Result<bool, DocumentError> {
        self.doc.is_cable()
    }
}

impl<D: CadDocument + ?Sized> Drop for Selection<'_, D> {
    fn drop(&mut self) {
        self.doc.release(self.kind);
    }
}
