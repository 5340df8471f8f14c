use serde::{Deserialize, Serialize};

use super::types::Band;
use crate::ir::Item;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub max_passes: usize,
    pub step: f64,
    pub min_improvement: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_passes: 50,
            step: 0.02,
            min_improvement: 0.001,
        }
    }
}

/// Root-mean-square mismatch between item ratios and panel pixel ratios over
/// the filled panels of `band`.
pub fn band_error(band: &Band, items: &[Item]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for id in band.leaf_ids() {
        let Some(item) = band.panel(id).item() else {
            continue;
        };
        let diff = items[item.index()].ratio - band.pixel_ratio(id);
        sum += diff * diff;
        count += 1;
    }
    if count == 0 {
        return 0.0;
    }
    (sum / count as f64).sqrt()
}

/// Hill-climb the band's split ratios in place. Returns the passes run.
pub fn optimize(band: &mut Band, items: &[Item], config: &OptimizerConfig) -> usize {
    let mut error = band_error(band, items);
    let mut passes = 0;
    while passes < config.max_passes {
        passes += 1;
        let mut improved = false;
        for index in 0..band.splits.len() {
            let base = band.splits[index].ratio;
            let mut best: Option<(f64, f64)> = None;
            for candidate in [base + config.step, base - config.step] {
                let mut trial = band.clone();
                if !trial.set_split(index, candidate) {
                    continue;
                }
                let trial_error = band_error(&trial, items);
                if best.is_none_or(|(_, best_error)| trial_error < best_error) {
                    best = Some((trial.splits[index].ratio, trial_error));
                }
            }
            if let Some((ratio, trial_error)) = best
                && error - trial_error > config.min_improvement
                && band.set_split(index, ratio)
            {
                error = trial_error;
                improved = true;
            }
        }
        if !improved {
            break;
        }
    }
    tracing::trace!(rule = %band.rule, passes, error, "optimized band splits");
    passes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ItemId;
    use crate::layout::partition::{SPLIT_MAX, SPLIT_MIN, build};
    use crate::layout::rules::Rule;

    fn filled(rule: Rule, ratios: &[f64]) -> (Band, Vec<Item>) {
        let items: Vec<Item> = ratios
            .iter()
            .enumerate()
            .map(|(idx, ratio)| Item::with_ratio(format!("item-{idx}"), *ratio, 1.0))
            .collect();
        let mut band = build(rule, 0, 1, 1000.0, ratios[0]).unwrap();
        for (idx, leaf) in band.leaf_ids().into_iter().enumerate() {
            band.assign(leaf, Some(ItemId(idx)));
        }
        (band, items)
    }

    #[test]
    fn error_is_zero_for_a_perfect_fit() {
        let (band, items) = filled(Rule::A, &[2.0, 2.0]);
        assert!(band_error(&band, &items) < 1e-12);
    }

    #[test]
    fn error_ignores_empty_panels() {
        let mut band = build(Rule::O, 0, 1, 1000.0, 1.5).unwrap();
        band.assign(band.main, Some(ItemId(0)));
        let items = vec![Item::with_ratio("hero", 1.5, 2.0)];
        assert!(band_error(&band, &items) < 1e-12);
    }

    #[test]
    fn optimizer_reduces_mismatch() {
        // Hero 1.0 sets the height to 500; the wide filler wants more width.
        let (mut band, items) = filled(Rule::A, &[1.0, 1.6]);
        let before = band_error(&band, &items);
        let passes = optimize(&mut band, &items, &OptimizerConfig::default());
        let after = band_error(&band, &items);
        assert!(passes >= 1);
        assert!(after < before, "{after} !< {before}");
        assert!(band.conservation_error() < 1e-6);
    }

    #[test]
    fn optimizer_keeps_ratios_in_bounds() {
        let (mut band, items) = filled(Rule::E2, &[1.0, 0.3, 3.5, 0.3, 3.5]);
        optimize(&mut band, &items, &OptimizerConfig::default());
        for split in &band.splits {
            assert!((SPLIT_MIN..=SPLIT_MAX).contains(&split.ratio), "{split:?}");
        }
        assert!(band.conservation_error() < 1e-6);
    }

    #[test]
    fn optimizer_leaves_a_perfect_band_alone() {
        let (mut band, items) = filled(Rule::B, &[1.0, 2.0, 2.0]);
        let before = band.clone();
        let passes = optimize(&mut band, &items, &OptimizerConfig::default());
        assert_eq!(passes, 1);
        assert_eq!(band, before);
    }
}
