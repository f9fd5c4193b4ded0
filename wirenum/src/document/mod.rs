//! Document Capability Module
//!
//! This module describes the surface of the host CAD document that the
//! naming passes consume. The host exposes one "current object" per entity
//! kind: a caller selects an entity by id, queries or mutates it, and then
//! moves on. The [`CadDocument`] trait mirrors that API one-to-one so that a
//! real host binding and the in-memory [`MemoryDocument`] are interchangeable.
//!
//! Callers never talk to a `CadDocument` directly. Every interaction goes
//! through a [`Selection`] guard which selects on creation and releases on
//! drop, so there is never an ambient selection left behind between calls.

pub mod memory;
pub mod selection;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use memory::{DocumentSnapshot, MemoryDocument};
pub use selection::Selection;

/// Identifier of an entity inside the host document.
///
/// The host hands out positive integers; `0` and negative values are never
/// valid ids and are filtered out by enumeration calls.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(pub i64);

impl EntityId {
    pub fn is_valid(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        EntityId(value)
    }
}

/// Kinds of entity that have their own "current object" slot in the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Device,
    Pin,
    Connection,
    Net,
    NetSegment,
    Sheet,
    Symbol,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Device,
        EntityKind::Pin,
        EntityKind::Connection,
        EntityKind::Net,
        EntityKind::NetSegment,
        EntityKind::Sheet,
        EntityKind::Symbol,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Device => "device",
            EntityKind::Pin => "pin",
            EntityKind::Connection => "connection",
            EntityKind::Net => "net",
            EntityKind::NetSegment => "net segment",
            EntityKind::Sheet => "sheet",
            EntityKind::Symbol => "symbol",
        }
    }

    pub(crate) fn slot(self) -> usize {
        match self {
            EntityKind::Device => 0,
            EntityKind::Pin => 1,
            EntityKind::Connection => 2,
            EntityKind::Net => 3,
            EntityKind::NetSegment => 4,
            EntityKind::Sheet => 5,
            EntityKind::Symbol => 6,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Related-entity lists the host can report for the current object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// Pins of a connection or of a device
    Pins,
    /// Net segments of a connection or of a pin
    NetSegments,
    /// Symbols of a device, placed or not
    Symbols,
}

/// Raw schema location as reported by the host for a pin or symbol.
///
/// The host reports `(sheet, x, y, grid descriptor, column, row)`; any of
/// the textual parts may be empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaLocation {
    pub sheet: EntityId,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub grid: String,
    #[serde(default)]
    pub column: String,
    #[serde(default)]
    pub row: String,
}

impl SchemaLocation {
    /// A location counts as placed only when it sits on a real sheet.
    pub fn is_placed(&self) -> bool {
        self.sheet.is_valid()
    }
}

/// Errors reported by a host document
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DocumentError {
    #[error("no document is open")]
    NotOpen,

    #[error("{kind} {id} does not exist")]
    NoSuchEntity { kind: EntityKind, id: EntityId },

    #[error("no {0} is selected")]
    NoSelection(EntityKind),

    #[error("query not supported by host: {0}")]
    Unsupported(&'static str),

    #[error("host rejected write of '{attribute}' on {kind} {id}")]
    Rejected {
        kind: EntityKind,
        id: EntityId,
        attribute: String,
    },

    #[error("{kind} {id} is read only")]
    ReadOnly { kind: EntityKind, id: EntityId },

    #[error("invalid document snapshot: {0}")]
    InvalidSnapshot(String),
}

/// The host document API: select-by-id, then query or mutate the current
/// object of that kind.
///
/// Implementations keep exactly one current object per [`EntityKind`].
/// Query and mutation methods act on the current object of the kind they
/// name and fail with [`DocumentError::NoSelection`] when nothing is
/// selected. Use [`Selection`] instead of calling `select`/`release`
/// directly.
pub trait CadDocument {
    /// Fail fast when no document is available to work on.
    fn ensure_open(&self) -> Result<(), DocumentError>;

    fn connection_ids(&self) -> Result<Vec<EntityId>, DocumentError>;

    fn device_ids(&self) -> Result<Vec<EntityId>, DocumentError>;

    fn cable_ids(&self) -> Result<Vec<EntityId>, DocumentError>;

    /// Make `id` the current object of `kind`.
    fn select(&mut self, kind: EntityKind, id: EntityId) -> Result<(), DocumentError>;

    /// Clear the current object of `kind`.
    fn release(&mut self, kind: EntityKind);

    fn current(&self, kind: EntityKind) -> Option<EntityId>;

    /// Signal name of the current connection.
    fn signal_name(&self) -> Result<String, DocumentError>;

    /// Net owning the current connection or net segment.
    fn net_id(&self, kind: EntityKind) -> Result<Option<EntityId>, DocumentError>;

    fn related_ids(
        &self,
        kind: EntityKind,
        relation: Relation,
    ) -> Result<Vec<EntityId>, DocumentError>;

    /// Schema location of the current pin or symbol, `None` when unplaced.
    fn schema_location(&self, kind: EntityKind) -> Result<Option<SchemaLocation>, DocumentError>;

    fn name(&self, kind: EntityKind) -> Result<String, DocumentError>;

    fn set_name(&mut self, kind: EntityKind, name: &str) -> Result<(), DocumentError>;

    /// Attribute value of the current object, `None` when not set.
    fn attribute(&self, kind: EntityKind, name: &str) -> Result<Option<String>, DocumentError>;

    fn set_attribute(
        &mut self,
        kind: EntityKind,
        name: &str,
        value: &str,
    ) -> Result<(), DocumentError>;

    /// Component-level attribute of the current device.
    fn component_attribute(&self, name: &str) -> Result<Option<String>, DocumentError>;

    fn is_terminal(&self) -> Result<bool, DocumentError>;

    fn is_terminal_block(&self) -> Result<bool, DocumentError>;

    fn is_cable(&self) -> Result<bool, DocumentError>;
}
