//! Device designation
//!
//! Every non-terminal device is named `"{letter code}{page}{grid}"` after
//! its topmost-leftmost placed symbol, with the same suffix rule as wire
//! numbers. Cables have no symbol position and are numbered in discovery
//! order instead.

use serde::Serialize;

use crate::config::NamingConfig;
use crate::core::{NamingError, PassKind, PassReport, RunOptions};
use crate::document::{CadDocument, DocumentError, EntityId, EntityKind, Relation, Selection};
use crate::labeling::{resolve_collisions, LabelRequest};
use crate::position::{locate, PinLocation};

use super::{device_and_cable_ids, TerminalSet};

/// Where a device's base designation came from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Placement {
    /// Topmost-leftmost placed symbol
    Symbol { symbol: EntityId, location: PinLocation },
    /// Position in the run's cable sequence, starting at 1
    Cable { sequence: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct DevicePlan {
    pub device: EntityId,
    /// Name before the pass
    pub current_name: String,
    pub letter_code: String,
    pub placement: Placement,
    pub base_designation: String,
    pub designation: String,
}

/// Designations for every device, computed without writing anything.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DesignationPlan {
    pub devices: Vec<DevicePlan>,
    pub terminals: Vec<EntityId>,
    /// Devices without a placed symbol
    pub unplaced: Vec<EntityId>,
    /// Devices the host could not report on
    pub unreadable: Vec<EntityId>,
}

impl DesignationPlan {
    pub fn designation_of(&self, device: EntityId) -> Option<&str> {
        self.devices
            .iter()
            .find(|d| d.device == device)
            .map(|d| d.designation.as_str())
    }

    /// Every device the pass looked at
    pub fn considered(&self) -> usize {
        self.devices.len() + self.terminals.len() + self.unplaced.len() + self.unreadable.len()
    }
}

/// Letter code of the selected device.
///
/// Tried in order: the configured component attributes, the name rules,
/// the first letter of the name, then the configured default.
pub fn resolve_letter_code<D: CadDocument + ?Sized>(
    device: &Selection<'_, D>,
    name: &str,
    config: &NamingConfig,
) -> String {
    for alias in &config.letter_code_attributes {
        match device.component_attribute(alias) {
            Ok(Some(value)) if !value.trim().is_empty() => {
                tracing::debug!("Device {}: letter code from '{}'", device.id(), alias);
                return value.trim().to_uppercase();
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("Device {}: cannot read '{}': {}", device.id(), alias, e),
        }
    }
    if let Some(code) = config.rule_letter_code(name) {
        return code.to_string();
    }
    if let Some(c) = name.chars().find(|c| c.is_alphabetic()) {
        return c.to_uppercase().collect();
    }
    config.default_letter_code.clone()
}

/// Facts read about one device in a single selection
struct DeviceInfo {
    name: String,
    terminal: bool,
    cable: bool,
    letter_code: String,
    symbols: Vec<EntityId>,
}

fn read_device<D: CadDocument + ?Sized>(
    doc: &mut D,
    id: EntityId,
    config: &NamingConfig,
    terminals: &TerminalSet,
) -> Result<DeviceInfo, DocumentError> {
    let device = Selection::acquire(doc, EntityKind::Device, id)?;
    let name = device.name().unwrap_or_else(|e| {
        tracing::warn!("Could not read name of device {}: {}", id, e);
        String::new()
    });
    let terminal = terminals.contains(id);
    let cable = device.is_cable().unwrap_or_else(|e| {
        tracing::debug!("Could not check whether device {} is a cable: {}", id, e);
        false
    });
    let letter_code = resolve_letter_code(&device, &name, config);
    let symbols = if terminal || cable {
        Vec::new()
    } else {
        device.related(Relation::Symbols)?
    };
    Ok(DeviceInfo {
        name,
        terminal,
        cable,
        letter_code,
        symbols,
    })
}

/// The placed symbol nearest the top of the sheet, then nearest the left
fn topmost_leftmost<D: CadDocument + ?Sized>(
    doc: &mut D,
    symbols: &[EntityId],
    config: &NamingConfig,
) -> Option<(EntityId, PinLocation)> {
    let mut placed = Vec::new();
    for &symbol in symbols {
        if let Some(location) = locate(doc, EntityKind::Symbol, symbol, &config.unknown_token) {
            placed.push((symbol, location));
        }
    }
    placed
        .into_iter()
        .min_by(|(_, a), (_, b)| a.y.total_cmp(&b.y).then_with(|| a.x.total_cmp(&b.x)))
}

/// Compute the final designation of every device outside `terminals`.
pub fn plan_designations<D: CadDocument + ?Sized>(
    doc: &mut D,
    config: &NamingConfig,
    terminals: &TerminalSet,
) -> Result<DesignationPlan, NamingError> {
    let ids = device_and_cable_ids(doc)?;
    tracing::info!("Processing {} devices and cables", ids.len());

    let mut plan = DesignationPlan::default();
    let mut cables = 0usize;

    for id in ids {
        let info = match read_device(doc, id, config, terminals) {
            Ok(info) => info,
            Err(e) => {
                tracing::error!("Error processing device {}: {}", id, e);
                plan.unreadable.push(id);
                continue;
            }
        };

        if info.terminal {
            tracing::info!("Device {} ({}) is a terminal, skipped", id, info.name);
            plan.terminals.push(id);
            continue;
        }

        let (placement, base_designation) = if info.cable {
            cables += 1;
            let base = format!(
                "{}{:0width$}",
                info.letter_code,
                cables,
                width = config.cable_number_width
            );
            (Placement::Cable { sequence: cables }, base)
        } else {
            match topmost_leftmost(doc, &info.symbols, config) {
                Some((symbol, location)) => {
                    let base = format!("{}{}", info.letter_code, location.label());
                    (Placement::Symbol { symbol, location }, base)
                }
                None => {
                    tracing::warn!("Device {} ({}) has no placed symbol, skipped", id, info.name);
                    plan.unplaced.push(id);
                    continue;
                }
            }
        };

        tracing::debug!(
            "Device {} ({}): {} -> {}",
            id,
            info.name,
            info.letter_code,
            base_designation
        );
        plan.devices.push(DevicePlan {
            device: id,
            current_name: info.name,
            letter_code: info.letter_code,
            placement,
            base_designation,
            designation: String::new(),
        });
    }

    let requests: Vec<LabelRequest> = plan
        .devices
        .iter()
        .map(|d| match &d.placement {
            Placement::Symbol { location, .. } => {
                LabelRequest::new(d.base_designation.clone(), location.x, location.y)
            }
            Placement::Cable { .. } => LabelRequest::new(d.base_designation.clone(), 0.0, 0.0),
        })
        .collect();
    for (device, designation) in plan.devices.iter_mut().zip(resolve_collisions(&requests)) {
        device.designation = designation;
    }

    tracing::info!(
        "Planned {} designations ({} cables), {} terminals, {} without placed symbols",
        plan.devices.len(),
        cables,
        plan.terminals.len(),
        plan.unplaced.len()
    );
    Ok(plan)
}

/// Rename every planned device whose name differs from its designation.
pub fn apply_designations<D: CadDocument + ?Sized>(
    doc: &mut D,
    plan: &DesignationPlan,
    options: &RunOptions,
) -> PassReport {
    let mut report = PassReport::new(PassKind::DeviceDesignations, options.dry_run);
    report.considered = plan.considered();
    report.skipped = plan.terminals.len() + plan.unplaced.len();
    report.failed = plan.unreadable.len();

    for device in &plan.devices {
        let subject = if device.current_name.is_empty() {
            format!("#{}", device.device)
        } else {
            device.current_name.clone()
        };
        report.assign(subject, &device.designation);

        if device.current_name == device.designation {
            report.unchanged += 1;
            continue;
        }
        if options.dry_run {
            tracing::info!(
                "[dry run] device {} ({}) would be designated {}",
                device.device,
                device.current_name,
                device.designation
            );
            continue;
        }

        let result = Selection::acquire(doc, EntityKind::Device, device.device)
            .and_then(|mut selection| selection.set_name(&device.designation));
        match result {
            Ok(()) => {
                tracing::info!(
                    "Device {}: {} -> {}",
                    device.device,
                    device.current_name,
                    device.designation
                );
                report.updated += 1;
            }
            Err(e) => {
                tracing::error!(
                    "Failed to designate device {} as {}: {}",
                    device.device,
                    device.designation,
                    e
                );
                report.failed += 1;
            }
        }
    }

    report.finish()
}
