use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// What an exposure dose clears on its layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoseKind {
    Clearing,
    Fullcut,
    Undercut,
}

/// One layer/dose assignment, dose in uC/cm^2.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DoseEntry {
    pub layer: u16,
    pub dose: f64,
    pub kind: DoseKind,
}

impl DoseEntry {
    pub fn new(layer: u16, dose: f64, kind: DoseKind) -> Self {
        Self { layer, dose, kind }
    }
}

/// A fixed-dose array recorded for the table notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseArrayNote {
    pub name: String,
    pub pin_layer: u16,
    pub gap_layer: u16,
    pub fullcut_dose: f64,
    pub undercut_dose: f64,
}

/// Accumulated layer -> dose assignments of a chip.
///
/// Entries are kept in the order they were pushed. When several entries
/// name the same layer the first one wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DoseTable {
    entries: Vec<DoseEntry>,
    arrays: Vec<DoseArrayNote>,
}

impl DoseTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: DoseEntry) {
        self.entries.push(entry);
    }

    pub fn extend<I: IntoIterator<Item = DoseEntry>>(&mut self, entries: I) {
        self.entries.extend(entries);
    }

    pub fn push_array_note(&mut self, note: DoseArrayNote) {
        self.arrays.push(note);
    }

    pub fn contains_layer(&self, layer: u16) -> bool {
        self.entries.iter().any(|e| e.layer == layer)
    }

    pub fn entries(&self) -> &[DoseEntry] {
        &self.entries
    }

    pub fn array_notes(&self) -> &[DoseArrayNote] {
        &self.arrays
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One entry per layer, sorted by layer, first occurrence kept.
    pub fn unique(&self) -> Vec<DoseEntry> {
        let mut by_layer: BTreeMap<u16, DoseEntry> = BTreeMap::new();
        for entry in &self.entries {
            by_layer.entry(entry.layer).or_insert(*entry);
        }
        by_layer.into_values().collect()
    }

    /// Plain-text table written next to the GDS file.
    pub fn to_text(&self) -> String {
        let mut out = String::from("# DOSE TABLE\n# Layer, Dose (uC/cm^2)\n");
        for entry in self.unique() {
            out.push_str(&format!("{}, {:.1}\n", entry.layer, entry.dose));
        }
        if !self.arrays.is_empty() {
            out.push_str("\n# DOSE ARRAYS (Fixed dose, varying geometry)\n");
            for note in &self.arrays {
                out.push_str(&format!(
                    "# {}: Layer {} = {:.1} uC/cm^2 (fullcut), Layer {} = {:.1} uC/cm^2 (undercut)\n",
                    note.name, note.pin_layer, note.fullcut_dose, note.gap_layer, note.undercut_dose
                ));
            }
        }
        out
    }
}
