//! Registered programs and free-text program-name resolution.

use serde::{Deserialize, Serialize};
use shared::domain::ProgramId;

/// Aliases this short only count on an exact match; as substrings they hit
/// far too many unrelated words.
const MIN_SUBSTRING_LEN: usize = 3;

/// Words that carry no program identity in phrases like "the dicom viewer panel".
const FILLER_WORDS: &[&str] = &[
    "the", "a", "an", "my", "please", "panel", "window", "program", "module", "view", "viewer",
    "screen", "display",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramEntry {
    pub id: ProgramId,
    pub display_name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl ProgramEntry {
    pub fn new(id: &str, display_name: &str, aliases: &[&str]) -> Self {
        Self {
            id: ProgramId::from(id),
            display_name: display_name.to_string(),
            aliases: aliases.iter().map(|alias| alias.to_string()).collect(),
        }
    }
}

/// Closed set of programs the grid can host, in registration order.
///
/// Registration order is the canonical program order used wherever the
/// engine has to pick a deterministic sequence (layout replay, listings).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramCatalog {
    entries: Vec<ProgramEntry>,
}

impl Default for ProgramCatalog {
    fn default() -> Self {
        Self::new(vec![
            ProgramEntry::new(
                "patient-info",
                "Patient Information",
                &["patient", "patient info", "patient data", "demographics", "chart"],
            ),
            ProgramEntry::new(
                "voice",
                "Voice Assistant",
                &["assistant", "voice command", "command", "chat", "transcription"],
            ),
            ProgramEntry::new(
                "monitoring",
                "Monitoring",
                &["monitor", "vitals", "vital signs", "hemodynamics", "ecg"],
            ),
            ProgramEntry::new(
                "volumetric-viewer",
                "3D Viewer",
                &["3d", "3d model", "vtk", "volume", "volumetric", "model", "cpo", "mesh"],
            ),
            ProgramEntry::new(
                "image-viewer",
                "Image Viewer",
                &["image", "images", "imaging", "picture", "photo"],
            ),
            ProgramEntry::new(
                "dicom-viewer",
                "DICOM Viewer",
                &["dicom", "scan", "ct", "mri", "series", "slice"],
            ),
        ])
    }
}

impl ProgramCatalog {
    pub fn new(entries: Vec<ProgramEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ProgramEntry] {
        &self.entries
    }

    pub fn get(&self, id: &ProgramId) -> Option<&ProgramEntry> {
        self.entries.iter().find(|entry| entry.id == *id)
    }

    pub fn contains(&self, id: &ProgramId) -> bool {
        self.get(id).is_some()
    }

    pub fn display_name(&self, id: &ProgramId) -> String {
        self.get(id)
            .map(|entry| entry.display_name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Registration index; unknown ids sort last.
    pub fn rank(&self, id: &ProgramId) -> usize {
        self.entries
            .iter()
            .position(|entry| entry.id == *id)
            .unwrap_or(usize::MAX)
    }

    /// Resolves a spoken or typed program reference.
    ///
    /// Tiers, first hit wins: exact canonical key, substring against
    /// canonical keys, substring against aliases, then the same three tiers
    /// per word of the phrase.
    pub fn find_program(&self, phrase: &str) -> Option<ProgramId> {
        let whole = normalize(phrase);
        if let Some(found) = self.match_tiers(&whole) {
            return Some(found);
        }

        phrase
            .split_whitespace()
            .filter(|word| !FILLER_WORDS.contains(&word.to_ascii_lowercase().as_str()))
            .map(normalize)
            .find_map(|word| self.match_tiers(&word))
    }

    fn match_tiers(&self, needle: &str) -> Option<ProgramId> {
        if needle.is_empty() {
            return None;
        }

        if let Some(entry) = self
            .entries
            .iter()
            .find(|entry| normalize(entry.id.as_str()) == needle)
        {
            return Some(entry.id.clone());
        }

        if let Some(entry) = self
            .entries
            .iter()
            .find(|entry| loosely_matches(needle, &normalize(entry.id.as_str())))
        {
            return Some(entry.id.clone());
        }

        // Exact alias hits beat substring hits so "ct" never loses to a
        // longer alias that happens to contain it.
        if let Some(entry) = self.entries.iter().find(|entry| {
            entry
                .aliases
                .iter()
                .any(|alias| normalize(alias) == needle)
        }) {
            return Some(entry.id.clone());
        }

        self.entries
            .iter()
            .find(|entry| {
                entry
                    .aliases
                    .iter()
                    .any(|alias| loosely_matches(needle, &normalize(alias)))
            })
            .map(|entry| entry.id.clone())
    }
}

/// Lowercase, keep only letters and digits.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn loosely_matches(needle: &str, key: &str) -> bool {
    if needle == key {
        return true;
    }
    (key.len() >= MIN_SUBSTRING_LEN && needle.contains(key))
        || (needle.len() >= MIN_SUBSTRING_LEN && key.contains(needle))
}

#[cfg(test)]
#[path = "tests/programs_tests.rs"]
mod tests;
