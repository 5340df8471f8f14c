use tracing::{debug, warn};

use super::error::LayoutError;
use super::optimizer;
use super::partition::{Placement, build_with_placement};
use super::pool::ItemPool;
use super::rules::Rule;
use super::types::{Band, Gallery, Orientation};
use crate::config::LayoutConfig;
use crate::ir::{Item, ItemId};
use crate::sequence::SequenceGenerator;

const TOLERANCE_EPS: f64 = 1e-9;

/// Mutable state threaded through one packing run.
#[derive(Debug, Clone)]
pub struct PackingContext {
    pub rng: SequenceGenerator,
    /// Bands emitted so far; drives the orientation of the next band.
    pub ordinal: usize,
}

impl PackingContext {
    pub fn new(seed: i64) -> Self {
        Self {
            rng: SequenceGenerator::new(seed),
            ordinal: 0,
        }
    }

    pub fn for_config(config: &LayoutConfig) -> Self {
        match config.seed {
            Some(seed) => Self::new(seed),
            None => Self {
                rng: SequenceGenerator::from_session(),
                ordinal: 0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoolKind {
    Important,
    Lesser,
}

#[derive(Debug, Default)]
struct Pools {
    important: ItemPool,
    lesser: ItemPool,
}

impl Pools {
    fn split(items: &[Item], threshold: f64) -> Self {
        let mut pools = Self::default();
        for (idx, item) in items.iter().enumerate() {
            if item.importance >= threshold {
                pools.important.insert(ItemId(idx));
            } else {
                pools.lesser.insert(ItemId(idx));
            }
        }
        pools
    }

    fn available(&self) -> usize {
        self.important.len() + self.lesser.len()
    }

    fn pool_mut(&mut self, kind: PoolKind) -> &mut ItemPool {
        match kind {
            PoolKind::Important => &mut self.important,
            PoolKind::Lesser => &mut self.lesser,
        }
    }

    fn restore(&mut self, taken: Vec<(ItemId, PoolKind)>) {
        for (id, kind) in taken {
            self.pool_mut(kind).insert(id);
        }
    }

    /// Next hero. With no fillers left the narrowest hero goes first so wide
    /// heroes wait for fillers that may never come back.
    fn next_hero(&mut self, items: &[Item], rng: &mut SequenceGenerator) -> Option<ItemId> {
        if self.lesser.is_empty() && self.important.len() > 1 {
            let narrowest = self.important.ids().iter().copied().min_by(|a, b| {
                items[a.index()]
                    .ratio
                    .total_cmp(&items[b.index()].ratio)
                    .then(a.cmp(b))
            })?;
            self.important.remove(narrowest);
            return Some(narrowest);
        }
        self.important.pop_random(rng)
    }

    /// Take a filler for `target` through the tolerance ladder.
    fn take_filler(
        &mut self,
        target: f64,
        items: &[Item],
        tolerances: &[f64],
        rng: &mut SequenceGenerator,
    ) -> Option<(ItemId, PoolKind)> {
        let kind = if self.lesser.is_empty() {
            PoolKind::Important
        } else {
            PoolKind::Lesser
        };
        let pool = self.pool_mut(kind);
        if pool.is_empty() || !(target.is_finite() && target > 0.0) {
            return None;
        }
        for &tier in tolerances {
            let matches: Vec<ItemId> = pool
                .ids()
                .iter()
                .copied()
                .filter(|id| deviation(items[id.index()].ratio, target) <= tier + TOLERANCE_EPS)
                .collect();
            if let Some(&id) = rng.pick(&matches) {
                pool.remove(id);
                return Some((id, kind));
            }
        }
        None
    }
}

/// Relative distance between an item ratio and a panel's target ratio.
pub fn deviation(ratio: f64, target: f64) -> f64 {
    (ratio - target).abs() / target
}

/// Candidate rules for a hero, laid out so `Vec::pop` yields the preferred
/// rules first and the five-panel rules last.
pub fn candidate_rules(
    hero: &Item,
    effective_ratio: f64,
    available: usize,
    config: &LayoutConfig,
    rng: &mut SequenceGenerator,
) -> Vec<Rule> {
    let extreme = effective_ratio >= config.wide_ratio || effective_ratio <= 1.0 / config.wide_ratio;
    let near_square = effective_ratio >= 1.0 / config.square_tolerance
        && effective_ratio <= config.square_tolerance;

    let mut main = if extreme {
        vec![Rule::O, Rule::A, Rule::I]
    } else if hero.importance >= config.epic_threshold {
        vec![Rule::A, Rule::I, Rule::B, Rule::C, Rule::H]
    } else {
        vec![Rule::B, Rule::C, Rule::D, Rule::F1, Rule::F2, Rule::G, Rule::H]
    };
    let mut low = if near_square && !extreme {
        vec![Rule::E1, Rule::E2]
    } else {
        Vec::new()
    };

    let usable = |rule: &Rule| {
        rule.required_fillers() <= available
            && config
                .allowed_rules
                .as_ref()
                .is_none_or(|allowed| allowed.contains(rule))
    };
    main.retain(usable);
    low.retain(usable);

    rng.shuffle(&mut low);
    rng.shuffle(&mut main);
    low.extend(main);
    low
}

/// Pack `items` into bands. Configuration is validated before anything is
/// emitted; an empty slice yields an empty gallery.
pub fn allocate(
    items: &[Item],
    config: &LayoutConfig,
    ctx: &mut PackingContext,
) -> Result<Gallery, LayoutError> {
    config.validate()?;
    let _span = tracing::debug_span!(
        "allocate",
        items = items.len(),
        columns = config.columns,
        seed = ctx.rng.seed()
    )
    .entered();

    let mut gallery = Gallery::new(config.columns, config.band_width(), config.row_gap);
    let mut pools = Pools::split(items, config.importance_threshold);
    debug!(
        important = pools.important.len(),
        lesser = pools.lesser.len(),
        "split item pools"
    );

    loop {
        if pools.important.is_empty() {
            let Some(promoted) = pools.lesser.pop_random(&mut ctx.rng) else {
                break;
            };
            debug!(item = %items[promoted.index()].id, "promoted lesser item to hero");
            pools.important.insert(promoted);
        }
        let Some(hero) = pools.next_hero(items, &mut ctx.rng) else {
            break;
        };
        let band = allocate_band(hero, items, config, ctx, &mut pools);
        debug!(
            ordinal = band.ordinal,
            rule = %band.rule,
            panels = band.panel_count(),
            filled = band.filled_count(),
            "appended band"
        );
        gallery.bands.push(band);
        ctx.ordinal += 1;
    }

    if !pools.lesser.is_empty() {
        return Err(LayoutError::InsufficientInventory {
            remaining: pools.lesser.len(),
        });
    }
    Ok(gallery)
}

fn allocate_band(
    hero: ItemId,
    items: &[Item],
    config: &LayoutConfig,
    ctx: &mut PackingContext,
    pools: &mut Pools,
) -> Band {
    let hero_item = &items[hero.index()];
    let placement = Placement::for_ordinal(ctx.ordinal, config.columns);
    let band_width = config.band_width();
    let effective = match placement.orientation {
        Orientation::Vertical => 1.0 / hero_item.ratio,
        Orientation::Horizontal => hero_item.ratio,
    };

    let mut candidates = candidate_rules(hero_item, effective, pools.available(), config, &mut ctx.rng);
    while let Some(rule) = candidates.pop() {
        let mut band = build_with_placement(rule, placement, band_width, hero_item.ratio);
        band.assign(band.main, Some(hero));
        if fill_band(&mut band, items, config, &mut ctx.rng, pools) {
            debug!(rule = %rule, hero = %hero_item.id, "rule accepted");
            optimizer::optimize(&mut band, items, &config.optimizer);
            return band;
        }
        debug!(rule = %rule, hero = %hero_item.id, "rule rejected");
    }

    let mut band = build_with_placement(Rule::A, placement, band_width, hero_item.ratio);
    band.assign(band.main, Some(hero));
    if fill_band(&mut band, items, config, &mut ctx.rng, pools) {
        warn!(hero = %hero_item.id, "no rule fit; fell back to a two-panel band");
    } else {
        band = build_with_placement(Rule::O, placement, band_width, hero_item.ratio);
        band.assign(band.main, Some(hero));
        warn!(hero = %hero_item.id, "no filler fit; hero placed alone");
    }
    optimizer::optimize(&mut band, items, &config.optimizer);
    band
}

/// Fill every non-main panel. On failure the taken fillers go back to the
/// pools they came from and the band is left partially assigned.
fn fill_band(
    band: &mut Band,
    items: &[Item],
    config: &LayoutConfig,
    rng: &mut SequenceGenerator,
    pools: &mut Pools,
) -> bool {
    if band.rule.descriptor().optional_companion {
        return true;
    }
    let mut taken = Vec::new();
    for leaf in band.leaf_ids() {
        if leaf == band.main {
            continue;
        }
        let target = band.pixel_ratio(leaf);
        match pools.take_filler(target, items, &config.tolerances, rng) {
            Some((id, kind)) => {
                band.assign(leaf, Some(id));
                taken.push((id, kind));
            }
            None => {
                pools.restore(taken);
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn config(columns: usize) -> LayoutConfig {
        LayoutConfig {
            columns,
            seed: Some(1234),
            ..Default::default()
        }
    }

    fn items(shapes: &[(f64, f64)]) -> Vec<Item> {
        shapes
            .iter()
            .enumerate()
            .map(|(idx, (ratio, importance))| Item::with_ratio(format!("i{idx}"), *ratio, *importance))
            .collect()
    }

    fn pools_of(important: &[usize], lesser: &[usize]) -> Pools {
        let mut pools = Pools::default();
        for &idx in important {
            pools.important.insert(ItemId(idx));
        }
        for &idx in lesser {
            pools.lesser.insert(ItemId(idx));
        }
        pools
    }

    fn sorted(pool: &ItemPool) -> Vec<usize> {
        let mut ids: Vec<usize> = pool.ids().iter().map(|id| id.0).collect();
        ids.sort_unstable();
        ids
    }

    fn d_band() -> Band {
        // Hero 1.5 at 1000 wide: every D cell is 500 x 111.1, i.e. 4.5:1.
        let mut band = build_with_placement(Rule::D, Placement::for_ordinal(0, 1), 1000.0, 1.5);
        band.assign(band.main, Some(ItemId(0)));
        band
    }

    #[test]
    fn deviation_is_relative_to_the_target() {
        assert_eq!(deviation(1.0, 2.0), 0.5);
        assert_eq!(deviation(3.0, 2.0), 0.5);
        assert_eq!(deviation(2.0, 2.0), 0.0);
    }

    #[test]
    fn wide_heroes_only_try_two_panel_rules() {
        let cfg = config(1);
        let hero = Item::with_ratio("hero", 2.4, 1.0);
        let mut rng = SequenceGenerator::new(5);
        let mut rules = candidate_rules(&hero, 2.4, 10, &cfg, &mut rng);
        rules.sort();
        assert_eq!(rules, vec![Rule::O, Rule::A, Rule::I]);
    }

    #[test]
    fn near_square_heroes_keep_five_panel_rules_for_last() {
        let cfg = config(1);
        let hero = Item::with_ratio("hero", 1.0, 1.0);
        let mut rng = SequenceGenerator::new(5);
        let rules = candidate_rules(&hero, 1.0, 10, &cfg, &mut rng);
        assert_eq!(rules.len(), 9);
        let mut low = rules[..2].to_vec();
        low.sort();
        assert_eq!(low, vec![Rule::E1, Rule::E2]);
    }

    #[test]
    fn scarce_fillers_prune_expensive_rules() {
        let cfg = config(1);
        let hero = Item::with_ratio("hero", 1.5, 3.0);
        let mut rng = SequenceGenerator::new(5);
        let rules = candidate_rules(&hero, 1.5, 1, &cfg, &mut rng);
        assert!(rules.iter().all(|rule| rule.required_fillers() <= 1));
        let mut rules = rules;
        rules.sort();
        assert_eq!(rules, vec![Rule::A, Rule::I]);
    }

    #[test]
    fn allowed_rules_restrict_candidates() {
        let cfg = LayoutConfig {
            allowed_rules: Some(vec![Rule::D]),
            ..config(1)
        };
        let hero = Item::with_ratio("hero", 1.5, 1.0);
        let mut rng = SequenceGenerator::new(5);
        assert_eq!(candidate_rules(&hero, 1.5, 5, &cfg, &mut rng), vec![Rule::D]);
    }

    #[test]
    fn empty_input_gives_an_empty_gallery() {
        let mut ctx = PackingContext::new(1);
        let gallery = allocate(&[], &config(2), &mut ctx).unwrap();
        assert!(gallery.is_empty());
        assert_eq!(ctx.ordinal, 0);
    }

    #[test]
    fn zero_columns_fail_before_any_band() {
        let mut ctx = PackingContext::new(1);
        let err = allocate(&items(&[(1.0, 1.0)]), &config(0), &mut ctx).unwrap_err();
        assert_eq!(err, LayoutError::InvalidColumns(0));
    }

    #[test]
    fn every_item_is_placed_exactly_once() {
        let input = items(&[
            (1.5, 2.0),
            (1.0, 1.0),
            (0.75, 0.0),
            (1.33, 0.0),
            (0.66, 0.0),
            (1.0, 0.0),
            (1.78, 0.0),
            (1.2, 1.0),
            (0.8, 0.0),
            (1.5, 0.0),
        ]);
        let mut ctx = PackingContext::new(99);
        let gallery = allocate(&input, &config(1), &mut ctx).unwrap();
        let mut seen = HashSet::new();
        for band in &gallery.bands {
            for id in band.items() {
                assert!(seen.insert(id), "{id:?} placed twice");
            }
        }
        assert_eq!(seen.len(), input.len());
        assert_eq!(ctx.ordinal, gallery.len());
    }

    #[test]
    fn accepted_rules_fill_every_panel() {
        let input = items(&[(1.5, 1.0), (0.75, 0.0), (0.75, 0.0), (0.75, 0.0), (0.75, 0.0)]);
        let mut ctx = PackingContext::new(7);
        let gallery = allocate(&input, &config(1), &mut ctx).unwrap();
        for band in &gallery.bands {
            if band.rule != Rule::O {
                assert!(band.is_complete(), "{} band left a panel empty", band.rule);
            }
        }
    }

    #[test]
    fn same_seed_gives_the_same_gallery() {
        let input = items(&[(1.5, 2.0), (1.0, 0.0), (0.75, 0.0), (1.33, 1.0), (1.0, 0.0), (0.5, 0.0)]);
        let first = allocate(&input, &config(3), &mut PackingContext::new(42)).unwrap();
        let second = allocate(&input, &config(3), &mut PackingContext::new(42)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn hero_with_no_fillers_stands_alone() {
        let input = items(&[(1.5, 1.0)]);
        let gallery = allocate(&input, &config(1), &mut PackingContext::new(3)).unwrap();
        assert_eq!(gallery.len(), 1);
        let band = &gallery.bands[0];
        assert_eq!(band.rule, Rule::O);
        assert!(band.is_underfilled_pair());
    }

    #[test]
    fn tighter_tolerance_tier_wins_over_a_looser_match() {
        // 1.15 is within 20% of the target, 1.45 only within 50%.
        let input = items(&[(1.45, 0.0), (1.15, 0.0)]);
        let tolerances = LayoutConfig::default().tolerances;
        for seed in 0..20 {
            let mut rng = SequenceGenerator::new(seed);
            let mut pools = pools_of(&[], &[0, 1]);
            let taken = pools.take_filler(1.0, &input, &tolerances, &mut rng);
            assert_eq!(taken, Some((ItemId(1), PoolKind::Lesser)), "seed {seed}");
            let taken = pools.take_filler(1.0, &input, &tolerances, &mut rng);
            assert_eq!(taken, Some((ItemId(0), PoolKind::Lesser)), "seed {seed}");
        }
    }

    #[test]
    fn lesser_pool_is_drawn_before_the_important_pool() {
        let input = items(&[(1.0, 1.0), (1.0, 0.0)]);
        let tolerances = LayoutConfig::default().tolerances;
        let mut rng = SequenceGenerator::new(4);
        let mut pools = pools_of(&[0], &[1]);
        assert_eq!(
            pools.take_filler(1.0, &input, &tolerances, &mut rng),
            Some((ItemId(1), PoolKind::Lesser))
        );
        assert_eq!(
            pools.take_filler(1.0, &input, &tolerances, &mut rng),
            Some((ItemId(0), PoolKind::Important))
        );
        assert_eq!(pools.available(), 0);
    }

    #[test]
    fn important_items_are_not_fillers_while_lesser_items_remain() {
        let input = items(&[(1.0, 1.0), (3.0, 0.0)]);
        let tolerances = LayoutConfig::default().tolerances;
        let mut pools = pools_of(&[0], &[1]);
        let taken = pools.take_filler(1.0, &input, &tolerances, &mut SequenceGenerator::new(4));
        assert_eq!(taken, None);
        assert_eq!(sorted(&pools.important), vec![0]);
        assert_eq!(sorted(&pools.lesser), vec![1]);
    }

    #[test]
    fn narrowest_hero_goes_first_once_fillers_run_out() {
        let input = items(&[(1.5, 1.0), (0.8, 1.0), (0.8, 1.0), (1.2, 1.0)]);
        for seed in 0..10 {
            let mut rng = SequenceGenerator::new(seed);
            let mut pools = pools_of(&[3, 2, 0, 1], &[]);
            let order: Vec<usize> = std::iter::from_fn(|| pools.next_hero(&input, &mut rng))
                .map(|id| id.0)
                .collect();
            // Equal ratios break on the lower index.
            assert_eq!(order, vec![1, 2, 3, 0], "seed {seed}");
        }
    }

    #[test]
    fn failed_rules_fall_back_to_a_two_panel_band() {
        // The 1.3 fillers miss rule D's 4.5:1 cells but fit rule A's 1.5:1 companion.
        let input = items(&[(1.5, 1.0), (1.3, 0.0), (1.3, 0.0), (1.3, 0.0)]);
        let cfg = LayoutConfig {
            allowed_rules: Some(vec![Rule::D]),
            ..config(1)
        };
        let mut ctx = PackingContext::new(8);
        let mut pools = Pools::split(&input, cfg.importance_threshold);
        assert!(pools.important.remove(ItemId(0)));

        let band = allocate_band(ItemId(0), &input, &cfg, &mut ctx, &mut pools);
        assert_eq!(band.rule, Rule::A);
        let placed = band.items();
        assert_eq!(placed.len(), 2);
        assert_eq!(placed[0], ItemId(0));
        assert_eq!(pools.lesser.len(), 2);
        assert!(!pools.lesser.ids().contains(&placed[1]));
    }

    #[test]
    fn rejected_rule_returns_fillers_to_their_pools() {
        let cfg = config(1);
        let mut rng = SequenceGenerator::new(2);

        // Item 1 fits the first D cell; nothing fits the second.
        let input = items(&[(1.5, 1.0), (4.5, 0.0), (1.3, 0.0), (1.3, 0.0), (4.5, 1.0)]);
        let mut pools = pools_of(&[4], &[1, 2, 3]);
        assert!(!fill_band(&mut d_band(), &input, &cfg, &mut rng, &mut pools));
        assert_eq!(sorted(&pools.lesser), vec![1, 2, 3]);
        assert_eq!(sorted(&pools.important), vec![4]);

        // Without lesser items the filler comes from, and returns to, the important pool.
        let mut pools = pools_of(&[1, 2], &[]);
        assert!(!fill_band(&mut d_band(), &input, &cfg, &mut rng, &mut pools));
        assert_eq!(sorted(&pools.important), vec![1, 2]);
        assert!(pools.lesser.is_empty());
    }
}
