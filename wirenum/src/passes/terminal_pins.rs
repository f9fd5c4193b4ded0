//! Terminal pin names
//!
//! Each pin of a terminal device is renamed to the wire number carried by
//! the net segments it connects to, provided they agree on one value.

use std::collections::BTreeSet;

use crate::config::NamingConfig;
use crate::core::{NamingError, PassKind, PassReport, RunOptions};
use crate::document::{CadDocument, DocumentError, EntityId, EntityKind, Relation, Selection};

use super::{read_first, TerminalSet};

/// Distinct non-empty wire numbers on the segments connected to `pin`
pub fn pin_wire_numbers<D: CadDocument + ?Sized>(
    doc: &mut D,
    pin: EntityId,
    config: &NamingConfig,
) -> Result<BTreeSet<String>, DocumentError> {
    let segments =
        Selection::acquire(doc, EntityKind::Pin, pin)?.related(Relation::NetSegments)?;

    let mut numbers = BTreeSet::new();
    for segment in segments {
        let selection = Selection::acquire(doc, EntityKind::NetSegment, segment)?;
        if let Some(number) = read_first(&selection, &config.wire_number_attributes)? {
            numbers.insert(number);
        }
    }
    Ok(numbers)
}

/// Terminal devices with their pins, in document order
fn terminal_devices<D: CadDocument + ?Sized>(
    doc: &mut D,
    terminal_set: &TerminalSet,
) -> Result<Vec<(EntityId, String, Vec<EntityId>)>, DocumentError> {
    let ids = doc.device_ids()?;
    let mut terminals = Vec::new();

    for id in ids.into_iter().filter(|id| terminal_set.contains(*id)) {
        let device = match Selection::acquire(doc, EntityKind::Device, id) {
            Ok(device) => device,
            Err(e) => {
                tracing::error!("Error selecting device {}: {}", id, e);
                continue;
            }
        };
        let name = device.name().unwrap_or_default();
        match device.related(Relation::Pins) {
            Ok(pins) => terminals.push((id, name, pins)),
            Err(e) => tracing::error!("Error reading pins of terminal device {}: {}", id, e),
        }
    }
    Ok(terminals)
}

fn apply_pin_name<D: CadDocument + ?Sized>(
    doc: &mut D,
    pin: EntityId,
    number: &str,
    options: &RunOptions,
    report: &mut PassReport,
) {
    let mut selection = match Selection::acquire(doc, EntityKind::Pin, pin) {
        Ok(selection) => selection,
        Err(e) => {
            tracing::error!("Error selecting pin {}: {}", pin, e);
            report.failed += 1;
            return;
        }
    };
    let old_name = selection.name().unwrap_or_default();
    if old_name == number {
        tracing::debug!("Pin {} already named '{}'", pin, number);
        report.unchanged += 1;
        return;
    }
    if options.dry_run {
        tracing::info!(
            "[dry run] pin {} would be renamed '{}' -> '{}'",
            pin,
            old_name,
            number
        );
        return;
    }
    match selection.set_name(number) {
        Ok(()) => {
            tracing::info!("Updated pin {}: '{}' -> '{}'", pin, old_name, number);
            report.updated += 1;
        }
        Err(e) => {
            tracing::error!("Failed to set name of pin {}: {}", pin, e);
            report.failed += 1;
        }
    }
}

/// Rename every pin of the devices in `terminals` after its wire number.
pub fn assign_terminal_pin_names<D: CadDocument + ?Sized>(
    doc: &mut D,
    config: &NamingConfig,
    terminals: &TerminalSet,
    options: &RunOptions,
) -> Result<PassReport, NamingError> {
    let mut report = PassReport::new(PassKind::TerminalPinNames, options.dry_run);
    let terminals = terminal_devices(doc, terminals)?;
    if terminals.is_empty() {
        tracing::warn!("No terminal devices found in document");
    }

    for (device, device_name, pins) in terminals {
        tracing::info!(
            "Processing terminal device {} ({}) with {} pins",
            device_name,
            device,
            pins.len()
        );
        for pin in pins {
            report.considered += 1;
            let numbers = match pin_wire_numbers(doc, pin, config) {
                Ok(numbers) => numbers,
                Err(e) => {
                    tracing::warn!("Could not read wire numbers for pin {}: {}", pin, e);
                    report.skipped += 1;
                    continue;
                }
            };

            let mut values = numbers.iter();
            match (values.next(), values.next()) {
                (Some(number), None) => {
                    report.assign(format!("{}:{}", device_name, pin), number.as_str());
                    apply_pin_name(doc, pin, number, options, &mut report);
                }
                (None, _) => {
                    tracing::warn!(
                        "Pin {} of {} has no wire number, left unchanged",
                        pin,
                        device_name
                    );
                    report.skipped += 1;
                }
                (Some(_), Some(_)) => {
                    tracing::warn!(
                        "Pin {} of {} connects to several wire numbers {:?}, left unchanged",
                        pin,
                        device_name,
                        numbers
                    );
                    report.skipped += 1;
                }
            }
        }
    }

    Ok(report.finish())
}
