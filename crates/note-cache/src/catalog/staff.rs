use std::fmt;
use std::path::Path;

use tracing::debug;
use url::Url;

use super::pitch::Pitch;
use super::priority::PriorityPolicy;
use super::types::{AssetConfig, Catalog};
use crate::error::CacheError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Clef {
    Treble,
    Bass,
}

impl Clef {
    pub fn as_str(&self) -> &'static str {
        match self {
            Clef::Treble => "treble",
            Clef::Bass => "bass",
        }
    }

    /// Catalog key of a note image, e.g. `treble_C4`
    pub fn key(&self, note: &str) -> String {
        format!("{}_{}", self.as_str(), note)
    }
}

impl fmt::Display for Clef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vertical position of a note head on the staff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StaffPosition {
    LedgerBelow(u8),
    SpaceBelow(u8),
    Line(u8),
    Space(u8),
    LedgerAbove(u8),
    SpaceAbove(u8),
}

impl StaffPosition {
    /// Label used in the remote file names of the asset store
    pub fn label(&self) -> String {
        match *self {
            StaffPosition::LedgerBelow(n) => format!("下加{n}线"),
            StaffPosition::SpaceBelow(n) => format!("下加{n}线间"),
            StaffPosition::Line(n) => format!("第{n}线"),
            StaffPosition::Space(n) => format!("第{n}间"),
            StaffPosition::LedgerAbove(n) => format!("上加{n}线"),
            StaffPosition::SpaceAbove(n) => format!("上加{n}线间"),
        }
    }

    /// ASCII code used in local file names
    pub fn code(&self) -> String {
        match *self {
            StaffPosition::LedgerBelow(n) => format!("ledger_below_{n}"),
            StaffPosition::SpaceBelow(n) => format!("space_below_{n}"),
            StaffPosition::Line(n) => format!("staff_line_{n}"),
            StaffPosition::Space(n) => format!("staff_space_{n}"),
            StaffPosition::LedgerAbove(n) => format!("ledger_above_{n}"),
            StaffPosition::SpaceAbove(n) => format!("space_above_{n}"),
        }
    }
}

use StaffPosition::{LedgerAbove, LedgerBelow, Line, Space, SpaceAbove, SpaceBelow};

const TREBLE_NOTES: &[(&str, StaffPosition)] = &[
    ("A3", LedgerBelow(3)),
    ("B3", SpaceBelow(3)),
    ("C4", LedgerBelow(2)),
    ("D4", SpaceBelow(2)),
    ("E4", LedgerBelow(1)),
    ("F4", SpaceBelow(1)),
    ("G4", Line(1)),
    ("A4", Space(1)),
    ("B4", Line(2)),
    ("C5", Space(2)),
    ("D5", Line(3)),
    ("E5", Space(3)),
    ("F5", Line(4)),
    ("G5", Space(4)),
    ("A5", Line(5)),
    ("B5", SpaceAbove(1)),
    ("C6", LedgerAbove(1)),
    ("D6", SpaceAbove(2)),
    ("E6", LedgerAbove(2)),
    ("F6", SpaceAbove(3)),
    ("G6", LedgerAbove(3)),
    ("A6", LedgerAbove(4)),
    ("B6", SpaceAbove(4)),
    ("C7", LedgerAbove(5)),
    ("D7", SpaceAbove(5)),
];

const BASS_NOTES: &[(&str, StaffPosition)] = &[
    ("C1", LedgerBelow(7)),
    ("D1", SpaceBelow(7)),
    ("E1", LedgerBelow(6)),
    ("F1", SpaceBelow(6)),
    ("G1", LedgerBelow(5)),
    ("A1", SpaceBelow(5)),
    ("B1", LedgerBelow(4)),
    ("C2", SpaceBelow(4)),
    ("D2", LedgerBelow(3)),
    ("E2", SpaceBelow(3)),
    ("F2", LedgerBelow(2)),
    ("G2", SpaceBelow(2)),
    ("A2", LedgerBelow(1)),
    ("B2", SpaceBelow(1)),
    ("C3", Line(1)),
    ("D3", Space(1)),
    ("E3", Line(2)),
    ("F3", Space(2)),
    ("G3", Line(3)),
    ("A3", Space(3)),
    ("B3", Line(4)),
    ("C4", Space(4)),
    ("D4", Line(5)),
    ("E4", SpaceAbove(1)),
    ("F4", LedgerAbove(1)),
    ("G4", SpaceAbove(2)),
    ("A4", LedgerAbove(2)),
    ("B4", SpaceAbove(3)),
    ("C5", LedgerAbove(3)),
];

/// Catalog of staff-notation images for both clefs.
pub fn staff_catalog(
    base_url: &Url,
    cache_dir: &Path,
    policy: &dyn PriorityPolicy,
) -> Result<Catalog, CacheError> {
    let mut entries = Vec::with_capacity(TREBLE_NOTES.len() + BASS_NOTES.len());

    for (clef, notes) in [(Clef::Treble, TREBLE_NOTES), (Clef::Bass, BASS_NOTES)] {
        for (note, position) in notes {
            let pitch: Pitch = note
                .parse()
                .map_err(|e| CacheError::Catalog(format!("{clef} table: {e}")))?;
            let remote_name = format!("{clef}_{note}_{}.png", position.label());
            let local_name = format!("{clef}_{note}_{}.png", position.code());
            entries.push(AssetConfig::from_names(
                clef.key(note),
                remote_name,
                local_name,
                base_url,
                cache_dir,
                policy.priority(&pitch),
            )?);
        }
    }

    let catalog = Catalog::new(entries)?;
    debug!(assets = catalog.len(), "Generated staff image catalog");
    Ok(catalog)
}
