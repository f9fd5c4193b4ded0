//! Wire numbering
//!
//! Connections are grouped into signals by signal name. Each signal takes
//! the lowest `"{page}{grid}"` label among the pins of all its connections,
//! signals sharing a label are suffixed left to right, and the final label
//! is written to every net segment of the signal.
//!
//! Connections on a net marked with the FixWireName attribute are left out
//! of grouping, and each segment's net is checked again right before the
//! write.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::config::NamingConfig;
use crate::core::{NamingError, PassKind, PassReport, RunOptions};
use crate::document::{CadDocument, DocumentError, EntityId, EntityKind, Relation, Selection};
use crate::labeling::{resolve_collisions, select_base, LabelCandidate, LabelRequest};
use crate::position::locate;

use super::writer::AliasWriter;

/// One signal with the label it will receive
#[derive(Debug, Clone, Serialize)]
pub struct SignalPlan {
    pub signal_name: String,
    pub connections: Vec<EntityId>,
    /// Segments of every member connection, de-duplicated in first-seen order
    pub net_segments: Vec<EntityId>,
    pub base_label: String,
    /// Representative point of the signal
    pub x: f64,
    pub y: f64,
    /// Final label after collision resolution
    pub label: String,
    /// Number of pin locations that contributed a candidate
    pub located: usize,
}

/// Labels for every signal of a document, computed without writing anything.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WireNumberPlan {
    /// Signals in first-seen order
    pub signals: Vec<SignalPlan>,
    pub protected_connections: Vec<EntityId>,
    pub protected_segments: Vec<EntityId>,
    /// Unnamed or unreadable connections
    pub ignored_connections: Vec<EntityId>,
}

impl WireNumberPlan {
    pub fn label_for_signal(&self, signal_name: &str) -> Option<&str> {
        self.signals
            .iter()
            .find(|s| s.signal_name == signal_name)
            .map(|s| s.label.as_str())
    }

    pub fn label_for_segment(&self, segment: EntityId) -> Option<&str> {
        self.signals
            .iter()
            .find(|s| s.net_segments.contains(&segment))
            .map(|s| s.label.as_str())
    }

    pub fn label_for_connection(&self, connection: EntityId) -> Option<&str> {
        self.signals
            .iter()
            .find(|s| s.connections.contains(&connection))
            .map(|s| s.label.as_str())
    }
}

/// What the host reports for one connection
struct ConnectionInfo {
    signal_name: String,
    net: Option<EntityId>,
    pins: Vec<EntityId>,
    net_segments: Vec<EntityId>,
}

fn read_connection<D: CadDocument + ?Sized>(
    doc: &mut D,
    id: EntityId,
) -> Result<ConnectionInfo, DocumentError> {
    let connection = Selection::acquire(doc, EntityKind::Connection, id)?;
    Ok(ConnectionInfo {
        signal_name: connection.signal_name()?.trim().to_string(),
        net: connection.net_id().unwrap_or_else(|e| {
            tracing::warn!("Could not read net of connection {}: {}", id, e);
            None
        }),
        pins: connection.related(Relation::Pins)?,
        net_segments: connection.related(Relation::NetSegments)?,
    })
}

/// FixWireName check for one net, cached for the rest of the pass.
///
/// A net whose attribute cannot be read is treated as unprotected.
pub(crate) fn net_is_protected<D: CadDocument + ?Sized>(
    doc: &mut D,
    net: EntityId,
    config: &NamingConfig,
    cache: &mut HashMap<EntityId, bool>,
) -> bool {
    if let Some(&protected) = cache.get(&net) {
        return protected;
    }
    let value = Selection::acquire(doc, EntityKind::Net, net)
        .and_then(|n| n.attribute(&config.fix_wire_name_attribute));
    let protected = match value {
        Ok(Some(value)) => NamingConfig::is_truthy_flag(&value),
        Ok(None) => false,
        Err(e) => {
            tracing::warn!(
                "Could not read {} of net {}: {}",
                config.fix_wire_name_attribute,
                net,
                e
            );
            false
        }
    };
    if protected {
        tracing::info!(
            "Net {} has {} set, its wires keep their numbers",
            net,
            config.fix_wire_name_attribute
        );
    }
    cache.insert(net, protected);
    protected
}

/// Net of a segment, read in its own selection
fn segment_net<D: CadDocument + ?Sized>(
    doc: &mut D,
    segment: EntityId,
) -> Result<Option<EntityId>, DocumentError> {
    let selection = Selection::acquire(doc, EntityKind::NetSegment, segment)?;
    selection.net_id()
}

struct SignalBuilder {
    signal_name: String,
    connections: Vec<EntityId>,
    net_segments: Vec<EntityId>,
    seen_segments: HashSet<EntityId>,
    candidates: Vec<LabelCandidate>,
}

/// Group connections into signals and compute every final label.
pub fn plan_wire_numbers<D: CadDocument + ?Sized>(
    doc: &mut D,
    config: &NamingConfig,
) -> Result<WireNumberPlan, NamingError> {
    let connection_ids = doc.connection_ids()?;
    tracing::info!("Found {} connections", connection_ids.len());

    let mut plan = WireNumberPlan::default();
    let mut protection = HashMap::new();
    let mut builders: Vec<SignalBuilder> = Vec::new();
    let mut by_name: HashMap<String, usize> = HashMap::new();

    for id in connection_ids.into_iter().filter(|id| id.is_valid()) {
        let info = match read_connection(doc, id) {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!("Skipping connection {}: {}", id, e);
                plan.ignored_connections.push(id);
                continue;
            }
        };
        if info.signal_name.is_empty() {
            tracing::debug!("Connection {} has no signal name, ignored", id);
            plan.ignored_connections.push(id);
            continue;
        }
        if let Some(net) = info.net {
            if net_is_protected(doc, net, config, &mut protection) {
                plan.protected_connections.push(id);
                plan.protected_segments.extend(info.net_segments);
                continue;
            }
        }

        let slot = *by_name.entry(info.signal_name.clone()).or_insert_with(|| {
            builders.push(SignalBuilder {
                signal_name: info.signal_name.clone(),
                connections: Vec::new(),
                net_segments: Vec::new(),
                seen_segments: HashSet::new(),
                candidates: Vec::new(),
            });
            builders.len() - 1
        });

        let mut candidates = Vec::new();
        for pin in &info.pins {
            if let Some(location) = locate(doc, EntityKind::Pin, *pin, &config.unknown_token) {
                candidates.push(location.candidate());
            }
        }

        let builder = &mut builders[slot];
        builder.connections.push(id);
        for segment in info.net_segments {
            if builder.seen_segments.insert(segment) {
                builder.net_segments.push(segment);
            }
        }
        builder.candidates.extend(candidates);
    }

    let mut signals: Vec<SignalPlan> = builders
        .into_iter()
        .map(|b| {
            let (base_label, x, y) = match select_base(&b.candidates, config.base_label_order) {
                Some(c) => (c.label.clone(), c.x, c.y),
                None => {
                    tracing::warn!(
                        "Signal '{}' has no placed pins, using {}",
                        b.signal_name,
                        config.unknown_token
                    );
                    (config.unknown_token.clone(), 0.0, 0.0)
                }
            };
            tracing::debug!(
                "Signal '{}': base label {} at ({}, {})",
                b.signal_name,
                base_label,
                x,
                y
            );
            SignalPlan {
                signal_name: b.signal_name,
                connections: b.connections,
                net_segments: b.net_segments,
                base_label,
                x,
                y,
                label: String::new(),
                located: b.candidates.len(),
            }
        })
        .collect();

    let requests: Vec<LabelRequest> = signals
        .iter()
        .map(|s| LabelRequest::new(s.base_label.clone(), s.x, s.y))
        .collect();
    for (signal, label) in signals.iter_mut().zip(resolve_collisions(&requests)) {
        signal.label = label;
    }

    // a segment shared with a numbered signal is handled there
    let numbered: HashSet<EntityId> = signals
        .iter()
        .flat_map(|s| s.net_segments.iter().copied())
        .collect();
    let mut seen = HashSet::new();
    plan.protected_segments
        .retain(|s| s.is_valid() && !numbered.contains(s) && seen.insert(*s));

    tracing::info!(
        "Planned {} signals, {} protected connections, {} ignored connections",
        signals.len(),
        plan.protected_connections.len(),
        plan.ignored_connections.len()
    );
    plan.signals = signals;
    Ok(plan)
}

/// Write a planned label to every unprotected segment.
pub fn apply_wire_numbers<D: CadDocument + ?Sized>(
    doc: &mut D,
    plan: &WireNumberPlan,
    config: &NamingConfig,
    options: &RunOptions,
) -> PassReport {
    let mut report = PassReport::new(PassKind::WireNumbers, options.dry_run);
    let mut writer = AliasWriter::new(&config.wire_number_attributes);
    let mut protection = HashMap::new();

    report.considered += plan.protected_segments.len();
    report.skipped += plan.protected_segments.len();

    for signal in &plan.signals {
        report.assign(&signal.signal_name, &signal.label);
        tracing::info!(
            "Signal '{}' -> {} ({} segments)",
            signal.signal_name,
            signal.label,
            signal.net_segments.len()
        );

        for &segment in &signal.net_segments {
            report.considered += 1;

            match segment_net(doc, segment) {
                Ok(Some(net)) if net_is_protected(doc, net, config, &mut protection) => {
                    tracing::info!("Segment {} is on protected net {}, not written", segment, net);
                    report.skipped += 1;
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("Error selecting net segment {}: {}", segment, e);
                    report.failed += 1;
                    continue;
                }
            }

            let mut selection = match Selection::acquire(doc, EntityKind::NetSegment, segment) {
                Ok(selection) => selection,
                Err(e) => {
                    tracing::error!("Error selecting net segment {}: {}", segment, e);
                    report.failed += 1;
                    continue;
                }
            };

            match writer.read(&selection) {
                Ok(Some(current)) if current == signal.label => {
                    tracing::debug!("Segment {} already numbered {}", segment, current);
                    report.unchanged += 1;
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!("Could not read wire number of segment {}: {}", segment, e)
                }
            }

            if options.dry_run {
                tracing::info!("[dry run] segment {} would be numbered {}", segment, signal.label);
                continue;
            }

            match writer.write(&mut selection, &signal.label) {
                Ok(alias) => {
                    tracing::debug!("Segment {}: {} = {}", segment, alias, signal.label);
                    report.updated += 1;
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to set wire number {} on segment {}: {}",
                        signal.label,
                        segment,
                        e
                    );
                    report.failed += 1;
                }
            }
        }
    }

    report.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::memory::{
        ConnectionRecord, DocumentSnapshot, MemoryDocument, NetRecord, NetSegmentRecord, PinRecord,
        SheetRecord,
    };
    use crate::document::SchemaLocation;

    fn pin(id: i64, grid: &str, x: f64, y: f64) -> PinRecord {
        PinRecord {
            id: EntityId(id),
            location: Some(SchemaLocation {
                sheet: EntityId(1),
                x,
                y,
                grid: format!("/1.{}", grid),
                column: String::new(),
                row: String::new(),
            }),
            ..Default::default()
        }
    }

    fn connection(id: i64, signal: &str, pins: &[i64], segments: &[i64]) -> ConnectionRecord {
        ConnectionRecord {
            id: EntityId(id),
            signal: signal.to_string(),
            net: None,
            pins: pins.iter().map(|&p| EntityId(p)).collect(),
            net_segments: segments.iter().map(|&s| EntityId(s)).collect(),
            net_unreadable: false,
        }
    }

    fn segment(id: i64) -> NetSegmentRecord {
        NetSegmentRecord {
            id: EntityId(id),
            ..Default::default()
        }
    }

    fn base_snapshot() -> DocumentSnapshot {
        DocumentSnapshot {
            sheets: vec![SheetRecord {
                id: EntityId(1),
                name: "1".to_string(),
            }],
            pins: vec![
                pin(1, "A5", 10.0, 10.0),
                pin(2, "B7", 50.0, 10.0),
                pin(3, "A5", 30.0, 20.0),
            ],
            net_segments: vec![segment(20), segment(21), segment(22)],
            connections: vec![
                connection(100, "A", &[1, 2], &[20]),
                connection(101, "B", &[3], &[21]),
                connection(102, "A", &[], &[22, 20]),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_plan_groups_by_signal_name() {
        let mut doc = MemoryDocument::from_snapshot(base_snapshot()).unwrap();
        let plan = plan_wire_numbers(&mut doc, &NamingConfig::default()).unwrap();

        assert_eq!(plan.signals.len(), 2);
        let a = &plan.signals[0];
        assert_eq!(a.connections, vec![EntityId(100), EntityId(102)]);
        assert_eq!(a.net_segments, vec![EntityId(20), EntityId(22)]);
        assert_eq!(a.label, "1A5");
        assert_eq!(plan.label_for_signal("B"), Some("1A5.A"));
        assert_eq!(plan.label_for_segment(EntityId(22)), Some("1A5"));
        assert_eq!(plan.label_for_connection(EntityId(101)), Some("1A5.A"));
    }

    #[test]
    fn test_signal_without_pins_is_unknown() {
        let mut snapshot = base_snapshot();
        snapshot.connections.push(connection(103, "C", &[], &[]));
        let mut doc = MemoryDocument::from_snapshot(snapshot).unwrap();
        let plan = plan_wire_numbers(&mut doc, &NamingConfig::default()).unwrap();
        assert_eq!(plan.label_for_signal("C"), Some("UNKNOWN"));
    }

    #[test]
    fn test_unnamed_connections_are_ignored() {
        let mut snapshot = base_snapshot();
        snapshot.connections.push(connection(103, "  ", &[1], &[]));
        let mut doc = MemoryDocument::from_snapshot(snapshot).unwrap();
        let plan = plan_wire_numbers(&mut doc, &NamingConfig::default()).unwrap();
        assert_eq!(plan.ignored_connections, vec![EntityId(103)]);
        assert_eq!(plan.signals.len(), 2);
    }

    #[test]
    fn test_protected_net_does_not_take_a_slot() {
        let mut snapshot = base_snapshot();
        let mut fixed = NetRecord {
            id: EntityId(7),
            ..Default::default()
        };
        fixed.attributes.insert("FixWireName".to_string(), "1".to_string());
        snapshot.nets.push(fixed);
        snapshot.net_segments.push(segment(23));
        let mut early = connection(99, "P", &[1], &[23]);
        early.net = Some(EntityId(7));
        snapshot.connections.insert(0, early);

        let mut doc = MemoryDocument::from_snapshot(snapshot).unwrap();
        let plan = plan_wire_numbers(&mut doc, &NamingConfig::default()).unwrap();
        assert_eq!(plan.protected_connections, vec![EntityId(99)]);
        assert_eq!(plan.protected_segments, vec![EntityId(23)]);
        assert_eq!(plan.label_for_signal("A"), Some("1A5"));
        assert_eq!(plan.label_for_signal("P"), None);
    }

    #[test]
    fn test_unreadable_net_is_still_numbered() {
        let mut snapshot = base_snapshot();
        snapshot.connections[1].net_unreadable = true;
        let mut doc = MemoryDocument::from_snapshot(snapshot).unwrap();
        let config = NamingConfig::default();
        let plan = plan_wire_numbers(&mut doc, &config).unwrap();

        assert_eq!(plan.label_for_connection(EntityId(101)), Some("1A5.A"));
        let report = apply_wire_numbers(&mut doc, &plan, &config, &RunOptions::default());
        assert_eq!(doc.segment_attribute(EntityId(21), "Wire number"), Some("1A5.A"));
        assert_eq!(report.updated, 3);
    }

    #[test]
    fn test_apply_writes_and_counts() {
        let mut doc = MemoryDocument::from_snapshot(base_snapshot()).unwrap();
        let config = NamingConfig::default();
        let plan = plan_wire_numbers(&mut doc, &config).unwrap();
        let report = apply_wire_numbers(&mut doc, &plan, &config, &RunOptions::default());

        assert_eq!(report.considered, 3);
        assert_eq!(report.updated, 3);
        assert_eq!(doc.segment_attribute(EntityId(20), "Wire number"), Some("1A5"));
        assert_eq!(doc.segment_attribute(EntityId(22), "Wire number"), Some("1A5"));
        assert_eq!(doc.segment_attribute(EntityId(21), "Wire number"), Some("1A5.A"));
        assert_eq!(doc.peak_selections(), 1);

        let again = apply_wire_numbers(&mut doc, &plan, &config, &RunOptions::default());
        assert_eq!(again.updated, 0);
        assert_eq!(again.unchanged, 3);
    }

    #[test]
    fn test_read_only_segment_is_counted_as_failed() {
        let mut snapshot = base_snapshot();
        snapshot.net_segments[1].read_only = true;
        let mut doc = MemoryDocument::from_snapshot(snapshot).unwrap();
        let config = NamingConfig::default();
        let plan = plan_wire_numbers(&mut doc, &config).unwrap();
        let report = apply_wire_numbers(&mut doc, &plan, &config, &RunOptions::default());

        assert_eq!(report.failed, 1);
        assert_eq!(report.updated, 2);
        assert!(report.has_failures());
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let mut doc = MemoryDocument::from_snapshot(base_snapshot()).unwrap();
        let config = NamingConfig::default();
        let plan = plan_wire_numbers(&mut doc, &config).unwrap();
        let report = apply_wire_numbers(&mut doc, &plan, &config, &RunOptions { dry_run: true });

        assert_eq!(report.considered, 3);
        assert_eq!(report.updated, 0);
        assert!(doc.write_log().is_empty());
        assert_eq!(report.label_of("B"), Some("1A5.A"));
    }
}
