use serde::Serialize;

use super::rules::Rule;
use crate::ir::ItemId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    /// Axis the main panel and the sub-region share for `Beside` rules.
    pub fn along(self) -> Axis {
        match self {
            Orientation::Horizontal => Axis::X,
            Orientation::Vertical => Axis::Y,
        }
    }

    pub fn across(self) -> Axis {
        self.along().other()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Horizontal => "horizontal",
            Orientation::Vertical => "vertical",
        }
    }
}

/// Direction in which a group lays out its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Side by side; children share the group's width.
    X,
    /// Stacked; children share the group's height.
    Y,
}

impl Axis {
    pub fn other(self) -> Axis {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PanelId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum PanelKind {
    Leaf { letter: char, item: Option<ItemId> },
    Group { axis: Axis, children: Vec<PanelId> },
}

/// Arena record for one node of a band's partition tree.
///
/// `weight` is the node's share of its parent's extent along the parent's
/// axis; the rectangle fields are fractions of the whole band.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub id: PanelId,
    pub parent: Option<PanelId>,
    pub kind: PanelKind,
    pub weight: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Panel {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, PanelKind::Leaf { .. })
    }

    pub fn letter(&self) -> Option<char> {
        match self.kind {
            PanelKind::Leaf { letter, .. } => Some(letter),
            PanelKind::Group { .. } => None,
        }
    }

    pub fn item(&self) -> Option<ItemId> {
        match self.kind {
            PanelKind::Leaf { item, .. } => item,
            PanelKind::Group { .. } => None,
        }
    }
}

/// Tunable divider between two adjacent siblings of `group`.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub name: String,
    pub group: PanelId,
    pub first: PanelId,
    pub second: PanelId,
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub rule: Rule,
    pub ordinal: usize,
    pub orientation: Orientation,
    pub flipped: bool,
    pub width: f64,
    pub height: f64,
    pub root: PanelId,
    pub main: PanelId,
    pub panels: Vec<Panel>,
    pub splits: Vec<Split>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gallery {
    pub bands: Vec<Band>,
    pub columns: usize,
    pub band_width: f64,
    pub row_gap: f64,
}

impl Gallery {
    pub fn new(columns: usize, band_width: f64, row_gap: f64) -> Self {
        Self {
            bands: Vec::new(),
            columns,
            band_width,
            row_gap,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn item_count(&self) -> usize {
        self.bands.iter().map(|band| band.filled_count()).sum()
    }
}
