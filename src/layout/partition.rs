use super::error::LayoutError;
use super::rules::{Arrangement, Rule, Shape};
use super::types::{Axis, Band, Orientation, Panel, PanelId, PanelKind, Split};
use crate::ir::ItemId;

pub const SPLIT_MIN: f64 = 0.05;
pub const SPLIT_MAX: f64 = 0.95;
pub const DEFAULT_SPLIT: f64 = 0.5;

const EPS: f64 = 1e-9;

/// Position-derived orientation decisions for one band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub ordinal: usize,
    pub orientation: Orientation,
    pub flipped: bool,
}

impl Placement {
    pub fn for_ordinal(ordinal: usize, columns: usize) -> Self {
        let orientation = if is_vertical(ordinal, columns) {
            Orientation::Vertical
        } else {
            Orientation::Horizontal
        };
        Self {
            ordinal,
            orientation,
            flipped: is_flipped(ordinal, columns),
        }
    }

    pub fn of(band: &Band) -> Self {
        Self {
            ordinal: band.ordinal,
            orientation: band.orientation,
            flipped: band.flipped,
        }
    }
}

/// Bands per orientation period: a plain row for even counts, an upper flank
/// row, a centre band and a lower flank row for odd counts.
pub fn period(columns: usize) -> usize {
    if columns > 1 && columns % 2 == 1 {
        2 * columns - 1
    } else {
        columns.max(1)
    }
}

/// Centre band of each cluster in odd multi-column layouts.
pub fn is_vertical(ordinal: usize, columns: usize) -> bool {
    columns > 1 && columns % 2 == 1 && ordinal % period(columns) == columns - 1
}

/// Bands left of the row centre mirror their main panel.
pub fn is_flipped(ordinal: usize, columns: usize) -> bool {
    if columns <= 1 {
        return false;
    }
    if columns % 2 == 0 {
        return ordinal % columns < columns / 2;
    }
    let flank = columns - 1;
    let local = ordinal % period(columns);
    let offset = match local.cmp(&flank) {
        std::cmp::Ordering::Less => local,
        std::cmp::Ordering::Equal => return false,
        std::cmp::Ordering::Greater => local - flank - 1,
    };
    offset < flank / 2
}

/// Build the skeleton for `rule` at position `ordinal`, sized for `hero_ratio`.
pub fn build(
    rule: Rule,
    ordinal: usize,
    columns: usize,
    band_width: f64,
    hero_ratio: f64,
) -> Result<Band, LayoutError> {
    if columns == 0 {
        return Err(LayoutError::InvalidColumns(0));
    }
    Ok(build_with_placement(
        rule,
        Placement::for_ordinal(ordinal, columns),
        band_width,
        hero_ratio,
    ))
}

pub fn build_with_placement(
    rule: Rule,
    placement: Placement,
    band_width: f64,
    hero_ratio: f64,
) -> Band {
    let descriptor = rule.descriptor();
    let orientation = placement.orientation;
    let root_axis = match descriptor.arrangement {
        Arrangement::Beside => orientation.along(),
        Arrangement::Stacked => orientation.across(),
    };

    let mut panels = Vec::new();
    let root = push_panel(
        &mut panels,
        None,
        PanelKind::Group {
            axis: root_axis,
            children: Vec::new(),
        },
    );
    let main = push_panel(
        &mut panels,
        Some(root),
        PanelKind::Leaf {
            letter: 'A',
            item: None,
        },
    );
    let sub = push_shape(&mut panels, root, &descriptor.sub, orientation);
    let order = if placement.flipped {
        vec![sub, main]
    } else {
        vec![main, sub]
    };
    if let PanelKind::Group { children, .. } = &mut panels[root.0].kind {
        *children = order;
    }

    let mut band = Band {
        rule,
        ordinal: placement.ordinal,
        orientation,
        flipped: placement.flipped,
        width: band_width,
        height: 0.0,
        root,
        main,
        panels,
        splits: Vec::new(),
    };
    band.register_splits();
    band.layout();
    band.fit_height(hero_ratio);
    band
}

fn push_panel(panels: &mut Vec<Panel>, parent: Option<PanelId>, kind: PanelKind) -> PanelId {
    let id = PanelId(panels.len());
    panels.push(Panel {
        id,
        parent,
        kind,
        weight: 1.0,
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    });
    id
}

fn push_shape(
    panels: &mut Vec<Panel>,
    parent: PanelId,
    shape: &Shape,
    orientation: Orientation,
) -> PanelId {
    let (axis, shapes) = match shape {
        Shape::Leaf(letter) => {
            return push_panel(
                panels,
                Some(parent),
                PanelKind::Leaf {
                    letter: *letter,
                    item: None,
                },
            );
        }
        Shape::Along(shapes) => (orientation.along(), *shapes),
        Shape::Across(shapes) => (orientation.across(), *shapes),
    };
    let group = push_panel(
        panels,
        Some(parent),
        PanelKind::Group {
            axis,
            children: Vec::new(),
        },
    );
    let children: Vec<PanelId> = shapes
        .iter()
        .map(|child| push_shape(panels, group, child, orientation))
        .collect();
    if let PanelKind::Group { children: slot, .. } = &mut panels[group.0].kind {
        *slot = children;
    }
    group
}

impl Band {
    pub fn panel(&self, id: PanelId) -> &Panel {
        &self.panels[id.0]
    }

    fn children(&self, id: PanelId) -> &[PanelId] {
        match &self.panels[id.0].kind {
            PanelKind::Group { children, .. } => children,
            PanelKind::Leaf { .. } => &[],
        }
    }

    /// Sorted leaf letters of a subtree, e.g. `"BD"`.
    pub fn label(&self, id: PanelId) -> String {
        let mut letters = Vec::new();
        self.collect_letters(id, &mut letters);
        letters.sort_unstable();
        letters.into_iter().collect()
    }

    fn collect_letters(&self, id: PanelId, out: &mut Vec<char>) {
        match &self.panels[id.0].kind {
            PanelKind::Leaf { letter, .. } => out.push(*letter),
            PanelKind::Group { children, .. } => {
                for child in children {
                    self.collect_letters(*child, out);
                }
            }
        }
    }

    fn register_splits(&mut self) {
        let mut splits = Vec::new();
        for panel in &self.panels {
            let PanelKind::Group { children, .. } = &panel.kind else {
                continue;
            };
            for pair in children.windows(2) {
                splits.push(Split {
                    name: format!("{}-{}", self.label(pair[0]), self.label(pair[1])),
                    group: panel.id,
                    first: pair[0],
                    second: pair[1],
                    ratio: DEFAULT_SPLIT,
                });
            }
        }
        let groups: Vec<Vec<PanelId>> = self
            .panels
            .iter()
            .filter_map(|panel| match &panel.kind {
                PanelKind::Group { children, .. } => Some(children.clone()),
                PanelKind::Leaf { .. } => None,
            })
            .collect();
        // Equal siblings, so every split starts at 0.5.
        for children in groups {
            let share = 1.0 / children.len().max(1) as f64;
            for child in children {
                self.panels[child.0].weight = share;
            }
        }
        self.panels[self.root.0].weight = 1.0;
        self.splits = splits;
    }

    /// Recompute every panel rectangle from the weights.
    pub fn layout(&mut self) {
        self.layout_node(self.root, 0.0, 0.0, 1.0, 1.0);
    }

    fn layout_node(&mut self, id: PanelId, x: f64, y: f64, width: f64, height: f64) {
        let panel = &mut self.panels[id.0];
        panel.x = x;
        panel.y = y;
        panel.width = width;
        panel.height = height;
        let PanelKind::Group { axis, children } = panel.kind.clone() else {
            return;
        };
        let mut offset = 0.0;
        for child in children {
            let weight = self.panels[child.0].weight;
            match axis {
                Axis::X => {
                    let span = width * weight;
                    self.layout_node(child, x + offset, y, span, height);
                    offset += span;
                }
                Axis::Y => {
                    let span = height * weight;
                    self.layout_node(child, x, y + offset, width, span);
                    offset += span;
                }
            }
        }
    }

    /// Size the band so the hero fills the main panel at its own ratio.
    pub fn fit_height(&mut self, hero_ratio: f64) {
        let main = &self.panels[self.main.0];
        let ratio = if hero_ratio > 0.0 { hero_ratio } else { 1.0 };
        self.height = main.width * self.width / (main.height * ratio);
    }

    pub fn pixel_size(&self, id: PanelId) -> (f64, f64) {
        let panel = &self.panels[id.0];
        (panel.width * self.width, panel.height * self.height)
    }

    pub fn pixel_ratio(&self, id: PanelId) -> f64 {
        let (width, height) = self.pixel_size(id);
        if height > 0.0 { width / height } else { f64::INFINITY }
    }

    pub fn main_panel_size(&self) -> (f64, f64) {
        self.pixel_size(self.main)
    }

    /// Leaves ordered by letter; `A` first.
    pub fn leaf_ids(&self) -> Vec<PanelId> {
        let mut leaves: Vec<(char, PanelId)> = self
            .panels
            .iter()
            .filter_map(|panel| panel.letter().map(|letter| (letter, panel.id)))
            .collect();
        leaves.sort_unstable();
        leaves.into_iter().map(|(_, id)| id).collect()
    }

    pub fn leaf_by_letter(&self, letter: char) -> Option<PanelId> {
        self.panels
            .iter()
            .find(|panel| panel.letter() == Some(letter))
            .map(|panel| panel.id)
    }

    pub fn assign(&mut self, id: PanelId, assigned: Option<ItemId>) {
        if let PanelKind::Leaf { item, .. } = &mut self.panels[id.0].kind {
            *item = assigned;
        }
    }

    /// Assigned items in panel letter order; the hero comes first.
    pub fn items(&self) -> Vec<ItemId> {
        self.leaf_ids()
            .into_iter()
            .filter_map(|id| self.panels[id.0].item())
            .collect()
    }

    pub fn panel_count(&self) -> usize {
        self.panels.iter().filter(|panel| panel.is_leaf()).count()
    }

    pub fn filled_count(&self) -> usize {
        self.panels.iter().filter(|panel| panel.item().is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.filled_count() == self.panel_count()
    }

    pub fn is_single_panel(&self) -> bool {
        self.panel_count() == 1
    }

    /// Two-panel band with exactly one of its panels populated.
    pub fn is_underfilled_pair(&self) -> bool {
        self.panel_count() == 2 && self.filled_count() == 1
    }

    /// Move the split at `index` to `ratio` (clamped to the split bounds).
    ///
    /// Returns `false` without touching the band when the move would push
    /// another split of the same group outside the bounds.
    pub fn set_split(&mut self, index: usize, ratio: f64) -> bool {
        let Some(split) = self.splits.get(index) else {
            return false;
        };
        let ratio = ratio.clamp(SPLIT_MIN, SPLIT_MAX);
        let (group, first, second) = (split.group, split.first, split.second);
        let pair = self.panels[first.0].weight + self.panels[second.0].weight;
        let first_weight = pair * ratio;
        let second_weight = pair - first_weight;

        let weight_after = |id: PanelId, band: &Band| {
            if id == first {
                first_weight
            } else if id == second {
                second_weight
            } else {
                band.panels[id.0].weight
            }
        };
        for (other_index, other) in self.splits.iter().enumerate() {
            if other_index == index || other.group != group {
                continue;
            }
            let a = weight_after(other.first, self);
            let b = weight_after(other.second, self);
            let other_ratio = a / (a + b);
            if !(SPLIT_MIN - EPS..=SPLIT_MAX + EPS).contains(&other_ratio) {
                return false;
            }
        }

        self.panels[first.0].weight = first_weight;
        self.panels[second.0].weight = second_weight;
        for split in self.splits.iter_mut().filter(|split| split.group == group) {
            let a = self.panels[split.first.0].weight;
            let b = self.panels[split.second.0].weight;
            split.ratio = a / (a + b);
        }
        self.splits[index].ratio = ratio;
        self.layout();
        true
    }

    /// Index of the split between the main panel and its neighbour.
    pub fn main_split(&self) -> Option<usize> {
        self.splits
            .iter()
            .position(|split| split.first == self.main || split.second == self.main)
    }

    /// Replace the tree by a single full-band panel holding the populated item.
    pub fn collapse_to_single(&mut self, item_ratio: f64) {
        let Some(item) = self.items().first().copied() else {
            return;
        };
        let root = PanelId(0);
        self.panels = vec![Panel {
            id: root,
            parent: None,
            kind: PanelKind::Leaf {
                letter: 'A',
                item: Some(item),
            },
            weight: 1.0,
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }];
        self.splits.clear();
        self.root = root;
        self.main = root;
        self.fit_height(item_ratio);
    }

    /// Largest gap or overlap between siblings and their parent, as a fraction.
    pub fn conservation_error(&self) -> f64 {
        let mut worst: f64 = 0.0;
        for panel in &self.panels {
            let PanelKind::Group { axis, children } = &panel.kind else {
                continue;
            };
            let (extent, cross) = match axis {
                Axis::X => (panel.width, panel.height),
                Axis::Y => (panel.height, panel.width),
            };
            let mut sum = 0.0;
            for child in children {
                let child = &self.panels[child.0];
                let (child_extent, child_cross) = match axis {
                    Axis::X => (child.width, child.height),
                    Axis::Y => (child.height, child.width),
                };
                sum += child_extent;
                worst = worst.max((child_cross - cross).abs());
            }
            worst = worst.max((sum - extent).abs());
        }
        worst
    }

    /// Child panels of the band's root group, in layout order.
    pub fn root_children(&self) -> &[PanelId] {
        self.children(self.root)
    }

    pub fn root_axis(&self) -> Option<Axis> {
        match self.panels[self.root.0].kind {
            PanelKind::Group { axis, .. } => Some(axis),
            PanelKind::Leaf { .. } => None,
        }
    }
}
