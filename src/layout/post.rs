use std::ops::Range;

use tracing::debug;

use super::partition::{Placement, build_with_placement, period};
use super::rules::Rule;
use super::types::{Axis, Band, Gallery, Orientation};
use crate::ir::Item;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rewrite {
    /// Underfilled pair at this index moved to the end.
    Relocate(usize),
    /// Underfilled pairs at this index and the next merged into one band.
    Merge(usize),
    /// Last two bands swapped.
    SwapTail,
}

/// Rows the renderer lays out and the equalizer sizes together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowGroup {
    Row(Range<usize>),
    /// Odd column counts: two flank rows around a vertical central band.
    Cluster {
        upper: Range<usize>,
        centre: usize,
        lower: Range<usize>,
    },
}

pub fn post_process(gallery: &mut Gallery, items: &[Item]) {
    let mut rewrites = 0usize;
    while let Some(rewrite) = apply_rewrite(&mut gallery.bands, items) {
        debug!(?rewrite, "post-processor rewrite");
        rewrites += 1;
    }
    if let Some(last) = gallery.bands.last_mut()
        && last.is_underfilled_pair()
        && let Some(item) = last.items().first().copied()
    {
        last.collapse_to_single(items[item.index()].ratio);
        debug!(ordinal = last.ordinal, "collapsed trailing band");
    }
    equalize_rows(gallery);
    debug!(rewrites, bands = gallery.bands.len(), "post-processing done");
}

/// Apply the highest-priority rewrite that fires, if any.
pub fn apply_rewrite(bands: &mut Vec<Band>, items: &[Item]) -> Option<Rewrite> {
    if let Some(index) = relocation_target(bands) {
        let band = bands.remove(index);
        bands.push(band);
        return Some(Rewrite::Relocate(index));
    }
    if let Some(index) = bands
        .windows(2)
        .position(|pair| pair[0].is_underfilled_pair() && pair[1].is_underfilled_pair())
    {
        let second = bands.remove(index + 1);
        let merged = merge_pair(&bands[index], &second, items);
        bands[index] = merged;
        return Some(Rewrite::Merge(index));
    }
    let len = bands.len();
    if len >= 2 {
        let (last, prev) = (&bands[len - 1], &bands[len - 2]);
        if last.is_single_panel() && prev.panel_count() >= 2 && prev.filled_count() == 1 {
            bands.swap(len - 2, len - 1);
            return Some(Rewrite::SwapTail);
        }
    }
    None
}

/// First underfilled pair that still has a filled band somewhere after it.
fn relocation_target(bands: &[Band]) -> Option<usize> {
    let trailing = bands
        .iter()
        .rev()
        .take_while(|band| band.is_underfilled_pair())
        .count();
    bands[..bands.len() - trailing]
        .iter()
        .position(Band::is_underfilled_pair)
}

/// Combine two underfilled pairs into one two-panel band holding both items.
pub fn merge_pair(first: &Band, second: &Band, items: &[Item]) -> Band {
    let placement = Placement::of(first);
    let rule = if first.rule.panel_count() == 2 {
        first.rule
    } else {
        Rule::O
    };
    let (Some(&main_item), Some(&other_item)) = (first.items().first(), second.items().first())
    else {
        return first.clone();
    };
    let main_ratio = items[main_item.index()].ratio;
    let other_ratio = items[other_item.index()].ratio;

    let mut band = build_with_placement(rule, placement, first.width, main_ratio);
    band.assign(band.main, Some(main_item));
    if let Some(companion) = band.leaf_ids().into_iter().find(|id| *id != band.main) {
        band.assign(companion, Some(other_item));
    }
    if let Some(index) = band.main_split() {
        let total = main_ratio + other_ratio;
        let main_share = match band.root_axis() {
            Some(Axis::Y) => other_ratio / total,
            _ => main_ratio / total,
        };
        let ratio = if band.splits[index].first == band.main {
            main_share
        } else {
            1.0 - main_share
        };
        band.set_split(index, ratio);
        band.fit_height(main_ratio);
    }
    band
}

/// Group bands into rows. Even counts give plain rows of `columns` bands.
/// Odd counts give a cluster wherever `columns - 1` horizontal bands, a
/// vertical band and `columns - 1` horizontal bands follow each other; any
/// other run falls back to rows of horizontal bands, and a vertical band
/// outside a cluster gets a row of its own.
pub fn row_groups(bands: &[Band], columns: usize) -> Vec<RowGroup> {
    let len = bands.len();
    let mut groups = Vec::new();
    if columns <= 1 {
        groups.extend((0..len).map(|idx| RowGroup::Row(idx..idx + 1)));
        return groups;
    }
    if columns % 2 == 0 {
        let mut start = 0;
        while start < len {
            let end = (start + columns).min(len);
            groups.push(RowGroup::Row(start..end));
            start = end;
        }
        return groups;
    }
    let flank = columns - 1;
    let size = period(columns);
    let vertical = |idx: usize| bands[idx].orientation == Orientation::Vertical;
    let mut start = 0;
    while start < len {
        if start + size <= len
            && (start..start + size).all(|idx| vertical(idx) == (idx == start + flank))
        {
            groups.push(RowGroup::Cluster {
                upper: start..start + flank,
                centre: start + flank,
                lower: start + flank + 1..start + size,
            });
            start += size;
            continue;
        }
        if vertical(start) {
            groups.push(RowGroup::Row(start..start + 1));
            start += 1;
            continue;
        }
        let mut end = start + 1;
        while end < len && end - start < columns && !vertical(end) {
            end += 1;
        }
        groups.push(RowGroup::Row(start..end));
        start = end;
    }
    groups
}

pub fn geometric_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let log_sum: f64 = values.iter().map(|value| value.max(f64::MIN_POSITIVE).ln()).sum();
    (log_sum / values.len() as f64).exp()
}

/// Heights of an odd-column cluster: `(upper, lower, centre)`.
pub fn equalize_cluster(upper: &[f64], lower: &[f64], gap: f64) -> (f64, f64, f64) {
    let hi = geometric_mean(upper);
    let lo = geometric_mean(lower);
    (hi, lo, hi + lo + gap)
}

pub fn equalize_rows(gallery: &mut Gallery) {
    if gallery.columns <= 1 {
        return;
    }
    let heights: Vec<f64> = gallery.bands.iter().map(|band| band.height).collect();
    for group in row_groups(&gallery.bands, gallery.columns) {
        match group {
            RowGroup::Row(range) => {
                let height = geometric_mean(&heights[range.clone()]);
                for band in &mut gallery.bands[range] {
                    band.height = height;
                }
            }
            RowGroup::Cluster {
                upper,
                centre,
                lower,
            } => {
                let (hi, lo, mid) =
                    equalize_cluster(&heights[upper.clone()], &heights[lower.clone()], gallery.row_gap);
                for band in &mut gallery.bands[upper] {
                    band.height = hi;
                }
                for band in &mut gallery.bands[lower] {
                    band.height = lo;
                }
                gallery.bands[centre].height = mid;
            }
        }
    }
}
