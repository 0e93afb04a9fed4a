//! # Asset Catalog
//!
//! Deterministic enumeration of every asset of a domain, with remote URL,
//! local path and download priority.

mod domain;
mod piano;
mod pitch;
mod priority;
mod staff;
mod types;

pub use domain::AssetDomain;
pub use piano::piano_catalog;
pub use pitch::{Letter, ParsePitchError, Pitch};
pub use priority::{
    NoteProximityPolicy, PRIORITY_COMMON, PRIORITY_ESSENTIAL, PRIORITY_EXTENDED, PRIORITY_RARE,
    PriorityPolicy, UniformPolicy,
};
pub use staff::{Clef, StaffPosition, staff_catalog};
pub use types::{AssetConfig, Catalog, priority_bands, remote_url_for, safe_file_name};
