use serde::{Deserialize, Serialize};

use crate::layout::ratio::normalize_ratio;

/// Index of an item in the slice handed to the packer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub usize);

impl ItemId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One manifest entry as it arrives from the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub id: String,
    /// `"width/height"`.
    pub dim: String,
    #[serde(default)]
    pub importance: f64,
}

/// A media item ready for packing.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: String,
    pub raw_ratio: f64,
    /// Soft-clipped ratio; fixed at construction.
    pub ratio: f64,
    pub importance: f64,
    pub sensitive: bool,
    pub non_macro: bool,
}

impl Item {
    pub fn new(id: impl Into<String>, width: f64, height: f64, importance: f64, clip_param: f64) -> Self {
        let id = id.into();
        let raw_ratio = if height > 0.0 { width / height } else { 1.0 };
        Self {
            sensitive: is_sensitive_id(&id),
            non_macro: is_non_macro_id(&id),
            ratio: normalize_ratio(raw_ratio, clip_param),
            raw_ratio,
            importance,
            id,
        }
    }

    /// Item with an already bounded ratio, used by tests and benches.
    pub fn with_ratio(id: impl Into<String>, ratio: f64, importance: f64) -> Self {
        let id = id.into();
        Self {
            sensitive: is_sensitive_id(&id),
            non_macro: is_non_macro_id(&id),
            raw_ratio: ratio,
            ratio,
            importance,
            id,
        }
    }
}

/// Content classification flag carried through to the output.
///
/// Only numeric ids are classified; the flag never influences packing.
pub fn is_sensitive_id(id: &str) -> bool {
    numeric_id(id).is_some_and(is_sensitive_ord)
}

pub fn is_sensitive_ord(ord: u64) -> bool {
    (ord % 10 > 0 && ord > 10) || (10_000..100_000).contains(&ord) || ord >= 200_000
}

/// Items outside the macro range; carried to the output like `sensitive`.
pub fn is_non_macro_id(id: &str) -> bool {
    numeric_id(id).is_some_and(is_non_macro_ord)
}

pub fn is_non_macro_ord(ord: u64) -> bool {
    ord >= 100_000
}

fn numeric_id(id: &str) -> Option<u64> {
    id.trim().parse().ok()
}
