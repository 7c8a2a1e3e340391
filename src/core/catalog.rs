//! Card catalog: the join of the audio manifest and the kimariji list.
//!
//! `manifest.json` describes one entry per audio file; `kimariji.json` maps a
//! card id to its phonetic decision key. Cards are the "A" (stimulus) variants
//! that have a non-empty kimariji. A missing or malformed file is a fatal
//! startup error for the session runner.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(default)]
    pub filename: String,
    pub path: String,
    pub category_id: u32,
    #[serde(default)]
    pub variant: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KimarijiEntry {
    pub id: u32,
    pub kimariji: String,
}

/// One selectable stimulus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: u32,
    pub label: String,
    /// Phonetic decision key. Non-empty; its 2-character prefix is the
    /// grouping key for the choice hierarchy.
    pub kimariji: String,
    pub audio_path: String,
}

/// Join manifest and kimariji data into the card list.
///
/// Keeps manifest order; only "...A.ogg" entries qualify as stimuli.
pub fn build_cards(manifest: &[ManifestEntry], kimariji: &[KimarijiEntry]) -> Vec<Card> {
    let by_id: HashMap<u32, &str> = kimariji
        .iter()
        .map(|k| (k.id, k.kimariji.as_str()))
        .collect();

    manifest
        .iter()
        .filter(|m| m.path.ends_with("A.ogg"))
        .filter_map(|m| {
            let kimariji = by_id.get(&m.category_id).copied().unwrap_or("");
            if kimariji.is_empty() {
                return None;
            }
            Some(Card {
                id: m.category_id,
                label: m.label.clone(),
                kimariji: kimariji.to_string(),
                audio_path: m.path.clone(),
            })
        })
        .collect()
}

/// Load and join the two catalog files.
pub fn load_catalog(manifest_path: &Path, kimariji_path: &Path) -> Result<Vec<Card>, String> {
    let manifest_raw = fs::read_to_string(manifest_path)
        .map_err(|e| format!("Failed to read {}: {e}", manifest_path.display()))?;
    let manifest: Vec<ManifestEntry> = serde_json::from_str(&manifest_raw)
        .map_err(|e| format!("Malformed manifest {}: {e}", manifest_path.display()))?;

    let kimariji_raw = fs::read_to_string(kimariji_path)
        .map_err(|e| format!("Failed to read {}: {e}", kimariji_path.display()))?;
    let kimariji: Vec<KimarijiEntry> = serde_json::from_str(&kimariji_raw)
        .map_err(|e| format!("Malformed kimariji file {}: {e}", kimariji_path.display()))?;

    let cards = build_cards(&manifest, &kimariji);
    if cards.is_empty() {
        return Err(format!(
            "Catalog join produced no cards ({} manifest entries, {} kimariji entries)",
            manifest.len(),
            kimariji.len()
        ));
    }
    Ok(cards)
}
