//! wirenum - naming automation for E3.series projects
//!
//! This library assigns wire numbers to net segments, designations to
//! devices, and wire numbers to terminal pin names, all derived from where
//! things sit on the schematic sheets.
//!
//! # Quick Start
//!
//! ```no_run
//! use wirenum::{MemoryDocument, NamingConfig, NamingCore, RunOptions};
//! use std::path::Path;
//!
//! let mut doc = MemoryDocument::load(Path::new("project.json")).unwrap();
//! let report = NamingCore::run_all(&mut doc, &NamingConfig::default(), &RunOptions::default())
//!     .unwrap();
//!
//! for pass in &report.passes {
//!     println!("{}: {}/{} updated", pass.pass, pass.updated, pass.considered);
//! }
//! doc.save(Path::new("project.json")).unwrap();
//! ```
//!
//! # Features
//!
//! - **Wire numbers**: one `"{page}{grid}"` label per signal, suffixed `.A`, `.B`, ...
//!   on collisions
//! - **Device designations**: letter code plus the position of the topmost-leftmost symbol
//! - **Terminal pin names**: copied from the wire number of the connected segments
//! - **Host independence**: any binding implementing [`CadDocument`] can be driven

pub mod config;
pub mod core;
pub mod document;
pub mod labeling;
pub mod passes;
pub mod position;

// Re-export main types
pub use crate::config::{LetterCodeRule, NamingConfig};
pub use crate::core::{
    Assignment, NamingCore, NamingError, PassKind, PassReport, RunOptions, RunReport,
};
pub use document::{
    CadDocument, DocumentError, DocumentSnapshot, EntityId, EntityKind, MemoryDocument, Relation,
    SchemaLocation, Selection,
};
pub use labeling::{resolve_collisions, select_base, BaseLabelOrder, LabelCandidate, LabelRequest};
pub use passes::designation::DesignationPlan;
pub use passes::wire_numbers::WireNumberPlan;
pub use passes::TerminalSet;
pub use position::PinLocation;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        BaseLabelOrder, CadDocument, MemoryDocument, NamingConfig, NamingCore, NamingError,
        PassKind, PassReport, RunOptions, RunReport,
    };
}
