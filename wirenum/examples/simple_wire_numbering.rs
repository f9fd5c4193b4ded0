//! Simple wire numbering example: number a document snapshot and print the labels.

use std::path::Path;
use wirenum::prelude::*;

fn main() -> Result<(), NamingError> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/panel.json".to_string());
    let path = Path::new(&path);

    if !path.exists() {
        eprintln!("File not found: {}", path.display());
        eprintln!("Usage: cargo run --example simple_wire_numbering [path/to/snapshot.json]");
        std::process::exit(1);
    }

    let mut doc = MemoryDocument::load(path)?;
    let options = RunOptions { dry_run: true };
    let report = NamingCore::assign_wire_numbers(&mut doc, &NamingConfig::default(), &options)?;

    println!("Wire numbers for: {}", path.display());
    println!();
    for assignment in &report.assignments {
        println!("  {:<20} {}", assignment.subject, assignment.label);
    }
    println!();
    println!(
        "{} segments considered, {} protected",
        report.considered, report.skipped
    );

    Ok(())
}
