//! In-memory host document
//!
//! [`MemoryDocument`] reproduces the select-then-query behavior of the host
//! API over plain records, and round-trips through a JSON
//! [`DocumentSnapshot`]. The CLI runs against it and every test uses it as
//! the fake host.
//!
//! Pin-to-segment connectivity is not stored on pins. It is derived from a
//! graph of pins, connections and net segments: a pin reaches every segment
//! of every connection it belongs to.

use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use super::{CadDocument, DocumentError, EntityId, EntityKind, Relation, SchemaLocation};
use crate::core::NamingError;

/// Attribute values keyed by attribute name
pub type Attributes = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetRecord {
    pub id: EntityId,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetRecord {
    pub id: EntityId,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetSegmentRecord {
    pub id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net: Option<EntityId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PinRecord {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SchemaLocation>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub id: EntityId,
    #[serde(default)]
    pub signal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net: Option<EntityId>,
    #[serde(default)]
    pub pins: Vec<EntityId>,
    #[serde(default)]
    pub net_segments: Vec<EntityId>,
    /// Simulates a host that cannot report the connection's net
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub net_unreadable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SchemaLocation>,
}

/// A device or cable.
///
/// `is_terminal` and `is_terminal_block` left out of the snapshot model a
/// host whose terminal predicates are unavailable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_terminal: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_terminal_block: Option<bool>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_cable: bool,
    #[serde(default)]
    pub symbols: Vec<EntityId>,
    #[serde(default)]
    pub pins: Vec<EntityId>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,
}

/// JSON form of a [`MemoryDocument`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSnapshot {
    /// Simulates a host with no project open
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub closed: bool,
    /// Attribute names the host does not know; writes to them are rejected
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unknown_attributes: Vec<String>,
    pub sheets: Vec<SheetRecord>,
    pub nets: Vec<NetRecord>,
    pub net_segments: Vec<NetSegmentRecord>,
    pub pins: Vec<PinRecord>,
    pub connections: Vec<ConnectionRecord>,
    pub symbols: Vec<SymbolRecord>,
    pub devices: Vec<DeviceRecord>,
}

/// One write attempted against the document, successful or not
#[derive(Debug, Clone, PartialEq)]
pub struct WriteAttempt {
    pub kind: EntityKind,
    pub id: EntityId,
    /// Attribute name, or `None` for a rename
    pub attribute: Option<String>,
    pub value: String,
    pub accepted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Node {
    Pin(EntityId),
    Connection(EntityId),
    Segment(EntityId),
}

/// In-memory host document with one current object per entity kind
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    snapshot: DocumentSnapshot,
    index: HashMap<(EntityKind, EntityId), usize>,
    connectivity: UnGraph<Node, ()>,
    nodes: HashMap<Node, NodeIndex>,
    current: [Option<EntityId>; 7],
    peak_selections: usize,
    writes: Vec<WriteAttempt>,
}

impl MemoryDocument {
    /// Build a document, checking ids are unique and references resolve.
    pub fn from_snapshot(snapshot: DocumentSnapshot) -> Result<Self, DocumentError> {
        let mut index = HashMap::new();

        let mut register = |kind: EntityKind, id: EntityId, pos: usize| {
            if !id.is_valid() {
                return Err(DocumentError::InvalidSnapshot(format!(
                    "{} id {} is not positive",
                    kind, id
                )));
            }
            if index.insert((kind, id), pos).is_some() {
                return Err(DocumentError::InvalidSnapshot(format!("duplicate {} id {}", kind, id)));
            }
            Ok(())
        };

        for (pos, r) in snapshot.sheets.iter().enumerate() {
            register(EntityKind::Sheet, r.id, pos)?;
        }
        for (pos, r) in snapshot.nets.iter().enumerate() {
            register(EntityKind::Net, r.id, pos)?;
        }
        for (pos, r) in snapshot.net_segments.iter().enumerate() {
            register(EntityKind::NetSegment, r.id, pos)?;
        }
        for (pos, r) in snapshot.pins.iter().enumerate() {
            register(EntityKind::Pin, r.id, pos)?;
        }
        for (pos, r) in snapshot.connections.iter().enumerate() {
            register(EntityKind::Connection, r.id, pos)?;
        }
        for (pos, r) in snapshot.symbols.iter().enumerate() {
            register(EntityKind::Symbol, r.id, pos)?;
        }
        for (pos, r) in snapshot.devices.iter().enumerate() {
            register(EntityKind::Device, r.id, pos)?;
        }

        let mut doc = Self {
            snapshot,
            index,
            connectivity: UnGraph::new_undirected(),
            nodes: HashMap::new(),
            current: [None; 7],
            peak_selections: 0,
            writes: Vec::new(),
        };
        doc.check_references()?;
        doc.build_connectivity();
        Ok(doc)
    }

    pub fn from_json_str(json: &str) -> Result<Self, NamingError> {
        let snapshot: DocumentSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(snapshot)?)
    }

    pub fn load(path: &Path) -> Result<Self, NamingError> {
        let json = std::fs::read_to_string(path)?;
        let doc = Self::from_json_str(&json)?;
        tracing::debug!("Loaded document snapshot from {}", path.display());
        Ok(doc)
    }

    pub fn save(&self, path: &Path) -> Result<(), NamingError> {
        let json = serde_json::to_string_pretty(&self.snapshot)?;
        std::fs::write(path, json)?;
        tracing::debug!("Saved document snapshot to {}", path.display());
        Ok(())
    }

    pub fn snapshot(&self) -> &DocumentSnapshot {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> DocumentSnapshot {
        self.snapshot
    }

    /// Every write attempted so far, in order
    pub fn write_log(&self) -> &[WriteAttempt] {
        &self.writes
    }

    /// Largest number of entity kinds that were selected at the same time
    pub fn peak_selections(&self) -> usize {
        self.peak_selections
    }

    pub fn net_segment(&self, id: EntityId) -> Option<&NetSegmentRecord> {
        self.position(EntityKind::NetSegment, id)
            .map(|pos| &self.snapshot.net_segments[pos])
    }

    pub fn pin(&self, id: EntityId) -> Option<&PinRecord> {
        self.position(EntityKind::Pin, id).map(|pos| &self.snapshot.pins[pos])
    }

    pub fn device(&self, id: EntityId) -> Option<&DeviceRecord> {
        self.position(EntityKind::Device, id)
            .map(|pos| &self.snapshot.devices[pos])
    }

    /// Attribute of a segment, read without touching the current selection
    pub fn segment_attribute(&self, id: EntityId, name: &str) -> Option<&str> {
        self.net_segment(id)
            .and_then(|s| s.attributes.get(name))
            .map(String::as_str)
    }

    fn position(&self, kind: EntityKind, id: EntityId) -> Option<usize> {
        self.index.get(&(kind, id)).copied()
    }

    fn check_references(&self) -> Result<(), DocumentError> {
        let missing = |kind: EntityKind, id: EntityId, owner: &str| {
            DocumentError::InvalidSnapshot(format!("{} refers to unknown {} {}", owner, kind, id))
        };

        for c in &self.snapshot.connections {
            let owner = format!("connection {}", c.id);
            for &pin in &c.pins {
                if pin.is_valid() && self.position(EntityKind::Pin, pin).is_none() {
                    return Err(missing(EntityKind::Pin, pin, &owner));
                }
            }
            for &seg in &c.net_segments {
                if seg.is_valid() && self.position(EntityKind::NetSegment, seg).is_none() {
                    return Err(missing(EntityKind::NetSegment, seg, &owner));
                }
            }
            if let Some(net) = c.net.filter(|n| n.is_valid()) {
                if self.position(EntityKind::Net, net).is_none() {
                    return Err(missing(EntityKind::Net, net, &owner));
                }
            }
        }
        for s in &self.snapshot.net_segments {
            if let Some(net) = s.net.filter(|n| n.is_valid()) {
                if self.position(EntityKind::Net, net).is_none() {
                    return Err(missing(EntityKind::Net, net, &format!("net segment {}", s.id)));
                }
            }
        }
        for d in &self.snapshot.devices {
            let owner = format!("device {}", d.id);
            for &sym in &d.symbols {
                if sym.is_valid() && self.position(EntityKind::Symbol, sym).is_none() {
                    return Err(missing(EntityKind::Symbol, sym, &owner));
                }
            }
            for &pin in &d.pins {
                if pin.is_valid() && self.position(EntityKind::Pin, pin).is_none() {
                    return Err(missing(EntityKind::Pin, pin, &owner));
                }
            }
        }
        Ok(())
    }

    fn build_connectivity(&mut self) {
        let mut graph = UnGraph::new_undirected();
        let mut nodes = HashMap::new();

        let mut node = |graph: &mut UnGraph<Node, ()>, n: Node| {
            *nodes.entry(n).or_insert_with(|| graph.add_node(n))
        };

        for c in &self.snapshot.connections {
            let conn = node(&mut graph, Node::Connection(c.id));
            for &pin in c.pins.iter().filter(|p| p.is_valid()) {
                let p = node(&mut graph, Node::Pin(pin));
                graph.update_edge(conn, p, ());
            }
            for &seg in c.net_segments.iter().filter(|s| s.is_valid()) {
                let s = node(&mut graph, Node::Segment(seg));
                graph.update_edge(conn, s, ());
            }
        }

        self.connectivity = graph;
        self.nodes = nodes;
    }

    /// Segments reachable from a pin through its connections
    fn pin_segments(&self, pin: EntityId) -> Vec<EntityId> {
        let Some(&start) = self.nodes.get(&Node::Pin(pin)) else {
            return Vec::new();
        };
        let mut segments = BTreeSet::new();
        for conn in self.connectivity.neighbors(start) {
            for n in self.connectivity.neighbors(conn) {
                if let Node::Segment(id) = self.connectivity[n] {
                    segments.insert(id);
                }
            }
        }
        segments.into_iter().collect()
    }

    fn selected(&self, kind: EntityKind) -> Result<(EntityId, usize), DocumentError> {
        let id = self.current[kind.slot()].ok_or(DocumentError::NoSelection(kind))?;
        let pos = self
            .position(kind, id)
            .ok_or(DocumentError::NoSuchEntity { kind, id })?;
        Ok((id, pos))
    }

    fn record_write(
        &mut self,
        kind: EntityKind,
        id: EntityId,
        attribute: Option<&str>,
        value: &str,
        accepted: bool,
    ) {
        self.writes.push(WriteAttempt {
            kind,
            id,
            attribute: attribute.map(str::to_string),
            value: value.to_string(),
            accepted,
        });
    }
}

impl CadDocument for MemoryDocument {
    fn ensure_open(&self) -> Result<(), DocumentError> {
        if self.snapshot.closed {
            Err(DocumentError::NotOpen)
        } else {
            Ok(())
        }
    }

    fn connection_ids(&self) -> Result<Vec<EntityId>, DocumentError> {
        self.ensure_open()?;
        Ok(self.snapshot.connections.iter().map(|c| c.id).collect())
    }

    fn device_ids(&self) -> Result<Vec<EntityId>, DocumentError> {
        self.ensure_open()?;
        Ok(self.snapshot.devices.iter().map(|d| d.id).collect())
    }

    fn cable_ids(&self) -> Result<Vec<EntityId>, DocumentError> {
        self.ensure_open()?;
        Ok(self
            .snapshot
            .devices
            .iter()
            .filter(|d| d.is_cable)
            .map(|d| d.id)
            .collect())
    }

    fn select(&mut self, kind: EntityKind, id: EntityId) -> Result<(), DocumentError> {
        self.ensure_open()?;
        if self.position(kind, id).is_none() {
            return Err(DocumentError::NoSuchEntity { kind, id });
        }
        self.current[kind.slot()] = Some(id);
        let active = self.current.iter().filter(|c| c.is_some()).count();
        self.peak_selections = self.peak_selections.max(active);
        Ok(())
    }

    fn release(&mut self, kind: EntityKind) {
        self.current[kind.slot()] = None;
    }

    fn current(&self, kind: EntityKind) -> Option<EntityId> {
        self.current[kind.slot()]
    }

    fn signal_name(&self) -> Result<String, DocumentError> {
        let (_, pos) = self.selected(EntityKind::Connection)?;
        Ok(self.snapshot.connections[pos].signal.clone())
    }

    fn net_id(&self, kind: EntityKind) -> Result<Option<EntityId>, DocumentError> {
        let (_, pos) = self.selected(kind)?;
        let net = match kind {
            EntityKind::Connection if self.snapshot.connections[pos].net_unreadable => {
                return Err(DocumentError::Unsupported("net id"));
            }
            EntityKind::Connection => self.snapshot.connections[pos].net,
            EntityKind::NetSegment => self.snapshot.net_segments[pos].net,
            _ => return Err(DocumentError::Unsupported("net id")),
        };
        Ok(net.filter(|n| n.is_valid()))
    }

    fn related_ids(
        &self,
        kind: EntityKind,
        relation: Relation,
    ) -> Result<Vec<EntityId>, DocumentError> {
        let (id, pos) = self.selected(kind)?;
        match (kind, relation) {
            (EntityKind::Connection, Relation::Pins) => {
                Ok(self.snapshot.connections[pos].pins.clone())
            }
            (EntityKind::Connection, Relation::NetSegments) => {
                Ok(self.snapshot.connections[pos].net_segments.clone())
            }
            (EntityKind::Pin, Relation::NetSegments) => Ok(self.pin_segments(id)),
            (EntityKind::Device, Relation::Pins) => Ok(self.snapshot.devices[pos].pins.clone()),
            (EntityKind::Device, Relation::Symbols) => {
                Ok(self.snapshot.devices[pos].symbols.clone())
            }
            _ => Err(DocumentError::Unsupported("related ids")),
        }
    }

    fn schema_location(&self, kind: EntityKind) -> Result<Option<SchemaLocation>, DocumentError> {
        let (_, pos) = self.selected(kind)?;
        let location = match kind {
            EntityKind::Pin => &self.snapshot.pins[pos].location,
            EntityKind::Symbol => &self.snapshot.symbols[pos].location,
            _ => return Err(DocumentError::Unsupported("schema location")),
        };
        Ok(location.clone())
    }

    fn name(&self, kind: EntityKind) -> Result<String, DocumentError> {
        let (_, pos) = self.selected(kind)?;
        match kind {
            EntityKind::Sheet => Ok(self.snapshot.sheets[pos].name.clone()),
            EntityKind::Pin => Ok(self.snapshot.pins[pos].name.clone()),
            EntityKind::Device => Ok(self.snapshot.devices[pos].name.clone()),
            _ => Err(DocumentError::Unsupported("name")),
        }
    }

    fn set_name(&mut self, kind: EntityKind, name: &str) -> Result<(), DocumentError> {
        let (id, pos) = self.selected(kind)?;
        let result = match kind {
            EntityKind::Pin if self.snapshot.pins[pos].read_only => {
                Err(DocumentError::ReadOnly { kind, id })
            }
            EntityKind::Pin => {
                self.snapshot.pins[pos].name = name.to_string();
                Ok(())
            }
            EntityKind::Device if self.snapshot.devices[pos].read_only => {
                Err(DocumentError::ReadOnly { kind, id })
            }
            EntityKind::Device => {
                self.snapshot.devices[pos].name = name.to_string();
                Ok(())
            }
            _ => Err(DocumentError::Unsupported("set name")),
        };
        self.record_write(kind, id, None, name, result.is_ok());
        result
    }

    fn attribute(&self, kind: EntityKind, name: &str) -> Result<Option<String>, DocumentError> {
        let (_, pos) = self.selected(kind)?;
        let attributes = match kind {
            EntityKind::Net => &self.snapshot.nets[pos].attributes,
            EntityKind::NetSegment => &self.snapshot.net_segments[pos].attributes,
            EntityKind::Device => &self.snapshot.devices[pos].attributes,
            _ => return Ok(None),
        };
        Ok(attributes.get(name).cloned())
    }

    fn set_attribute(
        &mut self,
        kind: EntityKind,
        name: &str,
        value: &str,
    ) -> Result<(), DocumentError> {
        let (id, pos) = self.selected(kind)?;
        let result = if self.snapshot.unknown_attributes.iter().any(|a| a == name) {
            Err(DocumentError::Rejected {
                kind,
                id,
                attribute: name.to_string(),
            })
        } else {
            let slot = match kind {
                EntityKind::Net => Ok(&mut self.snapshot.nets[pos].attributes),
                EntityKind::NetSegment if self.snapshot.net_segments[pos].read_only => {
                    Err(DocumentError::ReadOnly { kind, id })
                }
                EntityKind::NetSegment => Ok(&mut self.snapshot.net_segments[pos].attributes),
                EntityKind::Device if self.snapshot.devices[pos].read_only => {
                    Err(DocumentError::ReadOnly { kind, id })
                }
                EntityKind::Device => Ok(&mut self.snapshot.devices[pos].attributes),
                _ => Err(DocumentError::Unsupported("set attribute")),
            };
            slot.map(|attributes| {
                attributes.insert(name.to_string(), value.to_string());
            })
        };
        self.record_write(kind, id, Some(name), value, result.is_ok());
        result
    }

    fn component_attribute(&self, name: &str) -> Result<Option<String>, DocumentError> {
        let (_, pos) = self.selected(EntityKind::Device)?;
        Ok(self.snapshot.devices[pos].attributes.get(name).cloned())
    }

    fn is_terminal(&self) -> Result<bool, DocumentError> {
        let (_, pos) = self.selected(EntityKind::Device)?;
        self.snapshot.devices[pos]
            .is_terminal
            .ok_or(DocumentError::Unsupported("is_terminal"))
    }

    fn is_terminal_block(&self) -> Result<bool, DocumentError> {
        let (_, pos) = self.selected(EntityKind::Device)?;
        self.snapshot.devices[pos]
            .is_terminal_block
            .ok_or(DocumentError::Unsupported("is_terminal_block"))
    }

    fn is_cable(&self) -> Result<bool, DocumentError> {
        let (_, pos) = self.selected(EntityKind::Device)?;
        Ok(self.snapshot.devices[pos].is_cable)
    }
}
