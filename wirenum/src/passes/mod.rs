//! Naming passes
//!
//! Each pass reads the document through scoped selections, computes labels
//! with the [`labeling`](crate::labeling) core, and writes them back item by
//! item. A failure on one item is logged and counted; it never stops the
//! pass.

pub mod designation;
pub mod terminal_pins;
pub mod wire_numbers;
pub mod writer;

use std::collections::HashSet;

use crate::config::NamingConfig;
use crate::document::{CadDocument, DocumentError, EntityId, EntityKind, Selection};

pub use writer::{read_first, AliasWriter};

/// Terminal detection for the current device.
///
/// Uses the host's `is_terminal`/`is_terminal_block` predicates. When either
/// cannot be answered and neither said yes, falls back to the configured
/// name prefixes.
pub(crate) fn is_terminal<D: CadDocument + ?Sized>(
    device: &Selection<'_, D>,
    name: &str,
    config: &NamingConfig,
) -> bool {
    let terminal = device.is_terminal();
    let block = device.is_terminal_block();

    if matches!(terminal, Ok(true)) || matches!(block, Ok(true)) {
        tracing::debug!("Device {} ({}) is a terminal", name, device.id());
        return true;
    }
    if let (Ok(_), Ok(_)) = (&terminal, &block) {
        return false;
    }

    for e in [terminal.err(), block.err()].into_iter().flatten() {
        if !matches!(e, DocumentError::Unsupported(_)) {
            tracing::error!(
                "Error checking whether device {} is a terminal: {}",
                device.id(),
                e
            );
        }
    }
    let by_prefix = config.has_terminal_prefix(name);
    if by_prefix {
        tracing::warn!(
            "Device {} ({}) identified as terminal by name prefix",
            name,
            device.id()
        );
    }
    by_prefix
}

/// Terminal devices of a run, classified once before any device is renamed.
///
/// The name-prefix fallback looks at names, and the designation pass
/// rewrites them, so every pass of a run shares this one classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalSet {
    ids: HashSet<EntityId>,
}

impl TerminalSet {
    pub fn classify<D: CadDocument + ?Sized>(
        doc: &mut D,
        config: &NamingConfig,
    ) -> Result<Self, DocumentError> {
        let mut ids = HashSet::new();
        for id in device_and_cable_ids(doc)? {
            let device = match Selection::acquire(doc, EntityKind::Device, id) {
                Ok(device) => device,
                Err(e) => {
                    tracing::error!("Error selecting device {}: {}", id, e);
                    continue;
                }
            };
            let name = device.name().unwrap_or_default();
            if is_terminal(&device, &name, config) {
                ids.insert(id);
            }
        }
        tracing::debug!("{} terminal devices", ids.len());
        Ok(Self { ids })
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Devices and cables, merged without duplicates in first-seen order.
pub(crate) fn device_and_cable_ids<D: CadDocument + ?Sized>(
    doc: &D,
) -> Result<Vec<EntityId>, DocumentError> {
    let devices = doc.device_ids()?;
    let cables = match doc.cable_ids() {
        Ok(cables) => cables,
        Err(DocumentError::Unsupported(_)) => Vec::new(),
        Err(e) => return Err(e),
    };
    tracing::info!(
        "Document reports {} devices and {} cables",
        devices.len(),
        cables.len()
    );

    let mut seen = std::collections::HashSet::new();
    Ok(devices
        .into_iter()
        .chain(cables)
        .filter(|id| id.is_valid() && seen.insert(*id))
        .collect())
}
