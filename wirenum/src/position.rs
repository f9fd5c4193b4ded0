//! Sheet position extraction for pins and symbols.

use serde::Serialize;

use crate::document::{CadDocument, EntityId, EntityKind, SchemaLocation, Selection};
use crate::labeling::{compose_label, LabelCandidate};

/// Where a pin or symbol sits: page name, grid cell and sheet coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PinLocation {
    pub sheet_page: String,
    pub grid_position: String,
    pub x: f64,
    pub y: f64,
}

impl PinLocation {
    /// `"{page}{grid}"`
    pub fn label(&self) -> String {
        compose_label(&self.sheet_page, &self.grid_position)
    }

    pub fn candidate(&self) -> LabelCandidate {
        LabelCandidate::new(self.label(), self.x, self.y)
    }
}

/// Grid cell from the host's location parts.
///
/// Tried in order: the text after the last `.` of a `"/sheet.grid"`
/// descriptor, column plus row, column alone, row alone, then `unknown`.
pub fn extract_grid_position(grid: &str, column: &str, row: &str, unknown: &str) -> String {
    let (grid, column, row) = (grid.trim(), column.trim(), row.trim());

    if let Some((_, cell)) = grid.rsplit_once('.') {
        if !cell.is_empty() {
            return cell.to_string();
        }
    }
    match (column.is_empty(), row.is_empty()) {
        (false, false) => format!("{}{}", column, row),
        (false, true) => column.to_string(),
        (true, false) => row.to_string(),
        (true, true) => unknown.to_string(),
    }
}

/// Location of a pin or symbol, or `None` when it is not placed on a sheet.
///
/// Host errors are logged and reported as "no location"; they never abort
/// the caller. A sheet whose page name cannot be read gets `unknown` as its
/// page.
pub fn locate<D: CadDocument + ?Sized>(
    doc: &mut D,
    kind: EntityKind,
    id: EntityId,
    unknown: &str,
) -> Option<PinLocation> {
    let location = match read_schema_location(doc, kind, id) {
        Ok(Some(location)) if location.is_placed() => location,
        Ok(_) => {
            tracing::debug!("{} {} has no placed schema location", kind, id);
            return None;
        }
        Err(e) => {
            tracing::error!("Error reading schema location of {} {}: {}", kind, id, e);
            return None;
        }
    };

    let sheet_page = match Selection::acquire(doc, EntityKind::Sheet, location.sheet)
        .and_then(|sheet| sheet.name())
    {
        Ok(name) => name,
        Err(e) => {
            tracing::error!("Error reading page name of sheet {}: {}", location.sheet, e);
            unknown.to_string()
        }
    };

    let grid_position =
        extract_grid_position(&location.grid, &location.column, &location.row, unknown);
    tracing::debug!(
        "{} {}: sheet {}, page {}, grid {}, x={}, y={}",
        kind,
        id,
        location.sheet,
        sheet_page,
        grid_position,
        location.x,
        location.y
    );

    Some(PinLocation {
        sheet_page,
        grid_position,
        x: location.x,
        y: location.y,
    })
}

fn read_schema_location<D: CadDocument + ?Sized>(
    doc: &mut D,
    kind: EntityKind,
    id: EntityId,
) -> Result<Option<SchemaLocation>, crate::document::DocumentError> {
    let selection = Selection::acquire(doc, kind, id)?;
    selection.schema_location()
}
