//! Position-derived labels
//!
//! The pure half of every naming pass. A label starts as a base label
//! `"{page}{grid}"` (optionally prefixed, e.g. by a device letter code). Items
//! sharing a base label form a group; the group is ordered left to right,
//! then top to bottom, and everything after the first item receives a
//! letter suffix: `.A`, `.B`, ... `.Z`, `.AA`, `.AB`, ...
//!
//! Nothing here touches the host document.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// How candidate base labels are compared when picking the lowest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseLabelOrder {
    /// Plain string comparison: `"10A1"` sorts before `"2A1"`.
    #[default]
    Lexicographic,
    /// Page and grid numbers compared as integers: `"2A1"` sorts before `"10A1"`.
    Natural,
}

impl BaseLabelOrder {
    pub fn compare(self, a: &str, b: &str) -> Ordering {
        match self {
            BaseLabelOrder::Lexicographic => a.cmp(b),
            BaseLabelOrder::Natural => natural_key(a).cmp(&natural_key(b)).then_with(|| a.cmp(b)),
        }
    }
}

/// `(page, leading grid letters, grid number, rest)` of a label like `"12AB34x"`
fn natural_key(label: &str) -> (u64, &str, u64, &str) {
    let page_end = label
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(label.len());
    let (page, grid) = label.split_at(page_end);

    let alpha_end = grid
        .find(|c: char| !c.is_alphabetic())
        .unwrap_or(grid.len());
    let (letters, rest) = grid.split_at(alpha_end);

    let number_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let (number, trailing) = rest.split_at(number_end);

    (parse_number(page), letters, parse_number(number), trailing)
}

fn parse_number(digits: &str) -> u64 {
    if digits.is_empty() {
        0
    } else {
        digits.parse().unwrap_or(u64::MAX)
    }
}

/// Join a page name and grid position. An empty page is reported as page `0`.
pub fn compose_label(page: &str, grid: &str) -> String {
    let page = page.trim();
    if page.is_empty() {
        format!("0{}", grid)
    } else {
        format!("{}{}", page, grid)
    }
}

/// One position that could supply an item's base label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelCandidate {
    pub label: String,
    pub x: f64,
    pub y: f64,
}

impl LabelCandidate {
    pub fn new(label: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            label: label.into(),
            x,
            y,
        }
    }
}

/// The lowest candidate under `order`.
///
/// Among candidates with equal labels the one furthest left, then highest
/// up, wins; it becomes the item's representative point.
pub fn select_base(
    candidates: &[LabelCandidate],
    order: BaseLabelOrder,
) -> Option<&LabelCandidate> {
    candidates.iter().min_by(|a, b| {
        order
            .compare(&a.label, &b.label)
            .then_with(|| a.x.total_cmp(&b.x))
            .then_with(|| a.y.total_cmp(&b.y))
    })
}

/// An item waiting for its final label
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRequest {
    pub base: String,
    pub x: f64,
    pub y: f64,
}

impl LabelRequest {
    pub fn new(base: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            base: base.into(),
            x,
            y,
        }
    }
}

/// Suffix letters for the `n`th colliding item (1-based): `A`..`Z`, `AA`, `AB`, ...
pub fn suffix_letters(n: usize) -> String {
    let mut n = n;
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Final labels for `requests`, index-aligned with the input.
///
/// Ties on position fall back to input order, so the result only depends on
/// the order items were discovered in.
pub fn resolve_collisions(requests: &[LabelRequest]) -> Vec<String> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut group_of: HashMap<&str, usize> = HashMap::new();

    for (i, request) in requests.iter().enumerate() {
        let g = *group_of.entry(request.base.as_str()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[g].push(i);
    }

    let mut labels = vec![String::new(); requests.len()];
    for mut members in groups {
        members.sort_by(|&a, &b| {
            let (ra, rb) = (&requests[a], &requests[b]);
            ra.x.total_cmp(&rb.x)
                .then_with(|| ra.y.total_cmp(&rb.y))
                .then_with(|| a.cmp(&b))
        });
        if members.len() > 1 {
            tracing::debug!(
                "{} items share base label '{}'",
                members.len(),
                requests[members[0]].base
            );
        }
        for (rank, &i) in members.iter().enumerate() {
            labels[i] = if rank == 0 {
                requests[i].base.clone()
            } else {
                format!("{}.{}", requests[i].base, suffix_letters(rank))
            };
        }
    }
    labels
}
