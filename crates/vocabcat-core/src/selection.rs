//! Next-item selection.
//!
//! The first item of a session is drawn uniformly from a medium-difficulty
//! band. Every later item is the one with maximum Fisher information at the
//! current ability estimate, after content balancing has possibly narrowed
//! the pool to high-level items.

use std::collections::HashSet;

use rand::Rng;

use crate::config::{CatConfig, SelectionStrategy};
use crate::estimation::prob_correct;
use crate::model::{Item, ItemBank, ItemId, Level};
use crate::statistics::ExposureSnapshot;

/// Fisher information of a 3PL item at `theta`.
///
/// I(θ) = a² · q · (p - c)² / (p · (1 - c)²), defined as 0 whenever
/// `p <= c` or `p >= 1`.
pub fn item_information(item: &Item, theta: f64) -> f64 {
    let a = item.discrimination;
    let c = item.guessing;
    let p = prob_correct(item, theta);
    if p <= c || p >= 1.0 {
        return 0.0;
    }
    let q = 1.0 - p;
    a * a * q * (p - c).powi(2) / (p * (1.0 - c).powi(2))
}

/// Number of administered items at or above `threshold`.
pub fn high_level_count(administered: &[ItemId], bank: &ItemBank, threshold: Level) -> usize {
    administered
        .iter()
        .filter_map(|&id| bank.by_id(id))
        .filter(|item| item.level >= threshold)
        .count()
}

/// Why a particular item was chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionBasis {
    /// Random draw for the first item.
    InitialDraw,
    /// Maximum information at the current estimate.
    MaxInformation { information: f64 },
}

/// A selected item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection<'b> {
    pub item: &'b Item,
    pub basis: SelectionBasis,
}

/// Chooses the next item for a session.
#[derive(Debug, Clone)]
pub struct ItemSelector {
    initial_level_band: Vec<Level>,
    high_level_threshold: Level,
    required_high_count: usize,
    strategy: SelectionStrategy,
}

impl ItemSelector {
    pub fn new(config: &CatConfig) -> Self {
        Self {
            initial_level_band: config.initial_level_band.clone(),
            high_level_threshold: config.high_level_threshold,
            required_high_count: config.required_high_count,
            strategy: config.selection,
        }
    }

    /// Select the next item, or `None` when every item has been
    /// administered (pool exhausted).
    pub fn select<'b, R: Rng + ?Sized>(
        &self,
        bank: &'b ItemBank,
        administered: &[ItemId],
        theta: f64,
        exposure: Option<&ExposureSnapshot>,
        rng: &mut R,
    ) -> Option<Selection<'b>> {
        if administered.is_empty() {
            return self.initial(bank, rng);
        }

        let used: HashSet<ItemId> = administered.iter().copied().collect();
        let mut pool: Vec<&Item> = bank.iter().filter(|item| !used.contains(&item.id)).collect();
        if pool.is_empty() {
            return None;
        }

        let high_admin = high_level_count(administered, bank, self.high_level_threshold);
        if high_admin < self.required_high_count {
            let high: Vec<&Item> = pool
                .iter()
                .copied()
                .filter(|item| item.level >= self.high_level_threshold)
                .collect();
            if high.is_empty() {
                tracing::warn!(
                    high_admin,
                    required = self.required_high_count,
                    "no high-level items left, selecting from full pool"
                );
            } else {
                pool = high;
            }
        }

        if let (SelectionStrategy::ExposureLimited { max_rate }, Some(snapshot)) =
            (self.strategy, exposure)
        {
            let allowed: Vec<&Item> = pool
                .iter()
                .copied()
                .filter(|item| snapshot.rate(item.id) <= max_rate)
                .collect();
            if allowed.is_empty() {
                tracing::debug!(max_rate, "every candidate over exposure limit, ignoring limit");
            } else {
                pool = allowed;
            }
        }

        max_information(&pool, theta).map(|(item, information)| Selection {
            item,
            basis: SelectionBasis::MaxInformation { information },
        })
    }

    fn initial<'b, R: Rng + ?Sized>(&self, bank: &'b ItemBank, rng: &mut R) -> Option<Selection<'b>> {
        let mut band = bank.filter(&self.initial_level_band);
        if band.is_empty() {
            tracing::warn!(
                band = ?self.initial_level_band,
                "no items in initial level band, drawing from whole bank"
            );
            band = bank.iter().collect();
        }
        if band.is_empty() {
            return None;
        }
        let item = band[rng.random_range(0..band.len())];
        Some(Selection {
            item,
            basis: SelectionBasis::InitialDraw,
        })
    }
}

/// The item with the largest information at `theta`. Ties go to the item
/// that comes first in `pool`.
fn max_information<'b>(pool: &[&'b Item], theta: f64) -> Option<(&'b Item, f64)> {
    let mut best: Option<(&Item, f64)> = None;
    for &item in pool {
        let info = item_information(item, theta);
        match best {
            Some((_, best_info)) if info <= best_info => {}
            _ => best = Some((item, info)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::{graded_bank, item};
    use crate::statistics::ExposureTracker;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn selector() -> ItemSelector {
        ItemSelector::new(&CatConfig::default())
    }

    #[test]
    fn information_reference_value() {
        let it = item(1, 4, 1.2, 0.0, 0.2);
        let info = item_information(&it, 0.0);
        assert!((info - 0.24).abs() < 1e-6, "got {info}");
    }

    #[test]
    fn information_is_zero_at_saturation() {
        let it = item(1, 4, 3.0, 0.0, 0.2);
        // p rounds to exactly 1.0 far above the difficulty.
        assert_eq!(item_information(&it, 40.0), 0.0);
        // p approaches c far below; numerically equal to c.
        assert_eq!(item_information(&it, -400.0), 0.0);
    }

    #[test]
    fn initial_item_comes_from_medium_band() {
        let bank = graded_bank(5);
        let sel = selector();
        for seed in 0..50 {
            let mut rng = Pcg64::seed_from_u64(seed);
            let choice = sel.select(&bank, &[], 0.0, None, &mut rng).unwrap();
            assert!([3, 4, 5].contains(&choice.item.level));
            assert_eq!(choice.basis, SelectionBasis::InitialDraw);
        }
    }

    #[test]
    fn initial_draw_is_replayable() {
        let bank = graded_bank(5);
        let sel = selector();
        let a = sel
            .select(&bank, &[], 0.0, None, &mut Pcg64::seed_from_u64(9))
            .unwrap();
        let b = sel
            .select(&bank, &[], 0.0, None, &mut Pcg64::seed_from_u64(9))
            .unwrap();
        assert_eq!(a.item.id, b.item.id);
    }

    #[test]
    fn initial_draw_falls_back_when_band_is_empty() {
        let bank = ItemBank::from_items(vec![item(1, 1, 1.0, -2.0, 0.2), item(2, 8, 1.0, 2.0, 0.2)])
            .unwrap();
        let mut rng = Pcg64::seed_from_u64(1);
        let choice = selector().select(&bank, &[], 0.0, None, &mut rng).unwrap();
        assert!([1, 2].contains(&choice.item.id));
    }

    #[test]
    fn never_returns_administered_item() {
        let bank = graded_bank(3);
        let sel = selector();
        let mut rng = Pcg64::seed_from_u64(3);
        let mut administered: Vec<ItemId> = vec![19, 22];
        while let Some(choice) = sel.select(&bank, &administered, 0.3, None, &mut rng) {
            assert!(!administered.contains(&choice.item.id));
            administered.push(choice.item.id);
        }
        assert_eq!(administered.len(), bank.len());
    }

    #[test]
    fn picks_most_informative_item() {
        let bank = ItemBank::from_items(vec![
            item(1, 7, 1.0, 2.0, 0.2),
            item(2, 7, 1.0, 2.1, 0.2),
            item(3, 4, 0.8, 0.0, 0.2),
            item(4, 4, 1.6, 0.1, 0.2),
            item(5, 5, 1.0, 3.0, 0.2),
        ])
        .unwrap();
        // Two high-level items already given, so no restriction applies.
        let choice = selector().select(&bank, &[1, 2], 0.2, None, &mut Pcg64::seed_from_u64(0));
        assert_eq!(choice.unwrap().item.id, 4);
    }

    #[test]
    fn ties_go_to_first_in_bank_order() {
        let bank = ItemBank::from_items(vec![
            item(10, 7, 1.0, 2.0, 0.2),
            item(11, 7, 1.0, 2.0, 0.2),
            item(20, 4, 1.2, 0.5, 0.2),
            item(21, 4, 1.2, 0.5, 0.2),
        ])
        .unwrap();
        let choice = selector()
            .select(&bank, &[10, 11], 0.5, None, &mut Pcg64::seed_from_u64(0))
            .unwrap();
        assert_eq!(choice.item.id, 20);
    }

    #[test]
    fn content_balancing_restricts_to_high_levels() {
        let bank = graded_bank(5);
        let sel = selector();
        // 25 items given, only one of them (id 31, level 7) is high-level.
        let mut administered: Vec<ItemId> = (1..=24).collect();
        administered.push(31);
        assert_eq!(high_level_count(&administered, &bank, 7), 1);

        let theta = -0.5;
        let choice = sel
            .select(&bank, &administered, theta, None, &mut Pcg64::seed_from_u64(0))
            .unwrap();
        assert!(choice.item.level >= 7);

        // A lower-level item would carry more information at this theta.
        let best_overall = bank
            .iter()
            .filter(|it| !administered.contains(&it.id))
            .map(|it| item_information(it, theta))
            .fold(0.0, f64::max);
        if let SelectionBasis::MaxInformation { information } = choice.basis {
            assert!(best_overall > information);
        } else {
            panic!("expected information-based selection");
        }
    }

    #[test]
    fn content_balancing_falls_back_when_no_high_items_remain() {
        let bank = ItemBank::from_items(vec![
            item(1, 3, 1.0, -0.5, 0.2),
            item(2, 4, 1.0, 0.0, 0.2),
            item(3, 5, 1.0, 0.5, 0.2),
        ])
        .unwrap();
        let choice = selector()
            .select(&bank, &[2], 0.0, None, &mut Pcg64::seed_from_u64(0))
            .unwrap();
        assert!([1, 3].contains(&choice.item.id));
    }

    #[test]
    fn exhausted_pool_returns_none() {
        let bank = graded_bank(1);
        let all = bank.all_ids();
        assert!(selector()
            .select(&bank, &all, 0.0, None, &mut Pcg64::seed_from_u64(0))
            .is_none());
    }

    #[test]
    fn exposure_limit_only_applies_when_enabled() {
        let bank = ItemBank::from_items(vec![
            item(1, 7, 1.0, 2.0, 0.2),
            item(2, 7, 1.0, 2.1, 0.2),
            item(3, 4, 1.6, 0.0, 0.2),
            item(4, 4, 0.9, 0.0, 0.2),
        ])
        .unwrap();
        let tracker = ExposureTracker::new(&bank);
        for _ in 0..10 {
            tracker.record_session();
            tracker.record_response(3, 1);
        }
        let snapshot = tracker.snapshot();

        let plain = selector()
            .select(&bank, &[1, 2], 0.0, Some(&snapshot), &mut Pcg64::seed_from_u64(0))
            .unwrap();
        assert_eq!(plain.item.id, 3, "default strategy ignores exposure");

        let limited = ItemSelector::new(&CatConfig {
            selection: SelectionStrategy::ExposureLimited { max_rate: 0.5 },
            ..CatConfig::default()
        });
        let choice = limited
            .select(&bank, &[1, 2], 0.0, Some(&snapshot), &mut Pcg64::seed_from_u64(0))
            .unwrap();
        assert_eq!(choice.item.id, 4);

        let without_snapshot = limited
            .select(&bank, &[1, 2], 0.0, None, &mut Pcg64::seed_from_u64(0))
            .unwrap();
        assert_eq!(without_snapshot.item.id, 3);
    }
}
