//! Bayesian ability estimation under the three-parameter logistic model.
//!
//! The posterior is evaluated on a fixed, evenly spaced ability grid with a
//! standard normal prior. The expected a posteriori (EAP) estimate is the
//! posterior mean and its standard error is the posterior standard
//! deviation:
//!
//! P(θ) = c + (1 - c) / (1 + exp(-a(θ - b)))
//!
//! posterior(θ_k) ∝ φ(θ_k) · Π_i P_i(θ_k)^u_i · (1 - P_i(θ_k))^(1 - u_i)

use crate::config::CatConfig;
use crate::error::{CatError, Result};
use crate::model::{Item, ItemBank, ItemId};

const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

/// Standard logistic function.
#[inline]
pub fn logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let exp_x = x.exp();
        exp_x / (1.0 + exp_x)
    }
}

/// Probability of a correct response under the 3PL model.
#[inline]
pub fn prob_3pl(theta: f64, a: f64, b: f64, c: f64) -> f64 {
    c + (1.0 - c) * logistic(a * (theta - b))
}

/// [`prob_3pl`] with the parameters of `item`.
#[inline]
pub fn prob_correct(item: &Item, theta: f64) -> f64 {
    prob_3pl(theta, item.discrimination, item.difficulty, item.guessing)
}

#[inline]
fn standard_normal_pdf(x: f64) -> f64 {
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Upper bound on the number of grid points.
pub const MAX_GRID_POINTS: usize = 100_001;

/// Evenly spaced ability grid with a standard normal prior attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ThetaGrid {
    points: Vec<f64>,
    prior: Vec<f64>,
}

impl ThetaGrid {
    /// Build the grid `min, min + step, ..., max`. The point count is
    /// rounded so that `[-4, 4]` at `0.01` yields exactly 801 points.
    pub fn new(min: f64, max: f64, step: f64) -> Result<Self> {
        if !(min.is_finite() && max.is_finite() && step.is_finite()) || step <= 0.0 || max <= min
        {
            return Err(CatError::config(format!(
                "invalid theta grid: min={min}, max={max}, step={step}"
            )));
        }

        let span = ((max - min) / step).round();
        if span + 1.0 > MAX_GRID_POINTS as f64 {
            return Err(CatError::config(format!(
                "theta grid would have more than {MAX_GRID_POINTS} points (step={step})"
            )));
        }
        let n = span as usize + 1;
        if n < 2 {
            return Err(CatError::config("theta grid must contain at least 2 points"));
        }

        let points: Vec<f64> = (0..n).map(|k| min + k as f64 * step).collect();
        let prior = points.iter().map(|&t| standard_normal_pdf(t)).collect();
        Ok(Self { points, prior })
    }

    /// Grid described by the engine configuration.
    pub fn from_config(config: &CatConfig) -> Result<Self> {
        Self::new(
            config.theta_grid_min,
            config.theta_grid_max,
            config.theta_grid_step,
        )
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    pub fn prior(&self) -> &[f64] {
        &self.prior
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl Default for ThetaGrid {
    fn default() -> Self {
        let points: Vec<f64> = (0..801).map(|k| -4.0 + k as f64 * 0.01).collect();
        let prior = points.iter().map(|&t| standard_normal_pdf(t)).collect();
        Self { points, prior }
    }
}

/// Normalized posterior over the ability grid.
#[derive(Debug, Clone)]
pub struct Posterior<'g> {
    grid: &'g ThetaGrid,
    weights: Vec<f64>,
}

impl Posterior<'_> {
    /// Posterior mass at each grid point; sums to 1.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Posterior mean.
    pub fn mean(&self) -> f64 {
        self.grid
            .points
            .iter()
            .zip(&self.weights)
            .map(|(t, w)| t * w)
            .sum()
    }

    /// Posterior standard deviation around `mean`.
    pub fn sd(&self, mean: f64) -> f64 {
        let variance: f64 = self
            .grid
            .points
            .iter()
            .zip(&self.weights)
            .map(|(t, w)| (t - mean).powi(2) * w)
            .sum();
        variance.sqrt()
    }
}

/// Ability estimate and its standard error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub theta: f64,
    pub se: f64,
}

impl Estimate {
    /// The value reported before any response exists.
    pub const NO_DATA: Estimate = Estimate {
        theta: 0.0,
        se: f64::INFINITY,
    };
}

/// Compute the normalized posterior for a response history.
///
/// Ids are resolved against `bank`; an unknown id or a response outside
/// `{0, 1}` is a validation error.
pub fn posterior<'g>(
    grid: &'g ThetaGrid,
    administered: &[ItemId],
    responses: &[u8],
    bank: &ItemBank,
) -> Result<Posterior<'g>> {
    if administered.len() != responses.len() {
        return Err(CatError::validation(format!(
            "{} administered items but {} responses",
            administered.len(),
            responses.len()
        )));
    }

    let items = administered
        .iter()
        .map(|&id| {
            bank.by_id(id)
                .ok_or_else(|| CatError::validation(format!("unknown item id: {id}")))
        })
        .collect::<Result<Vec<_>>>()?;

    if let Some(bad) = responses.iter().find(|&&r| r > 1) {
        return Err(CatError::validation(format!(
            "response must be 0 or 1, got {bad}"
        )));
    }

    let mut weights = grid.prior.clone();
    for (item, &response) in items.iter().zip(responses) {
        for (w, &theta) in weights.iter_mut().zip(&grid.points) {
            let p = prob_correct(item, theta);
            *w *= if response == 1 { p } else { 1.0 - p };
        }
    }

    let total: f64 = weights.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(CatError::NumericalInstability(format!(
            "posterior mass is {total} after {} responses",
            responses.len()
        )));
    }
    for w in &mut weights {
        *w /= total;
    }

    Ok(Posterior { grid, weights })
}

/// EAP ability estimate and standard error for a response history.
///
/// An empty history returns [`Estimate::NO_DATA`] without touching the grid.
pub fn estimate(
    grid: &ThetaGrid,
    administered: &[ItemId],
    responses: &[u8],
    bank: &ItemBank,
) -> Result<Estimate> {
    if administered.is_empty() && responses.is_empty() {
        return Ok(Estimate::NO_DATA);
    }

    let post = posterior(grid, administered, responses, bank)?;
    let theta = post.mean();
    let se = post.sd(theta);
    Ok(Estimate { theta, se })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::{graded_bank, item};

    fn single_item_bank() -> ItemBank {
        ItemBank::from_items(vec![item(1, 4, 1.2, 0.0, 0.2)]).unwrap()
    }

    #[test]
    fn default_grid_has_801_points() {
        let grid = ThetaGrid::default();
        assert_eq!(grid.len(), 801);
        assert_eq!(grid.points()[0], -4.0);
        assert!((grid.points()[800] - 4.0).abs() < 1e-9);

        let configured = ThetaGrid::from_config(&CatConfig::default()).unwrap();
        assert_eq!(configured, grid);
    }

    #[test]
    fn grid_rejects_bad_bounds() {
        assert!(ThetaGrid::new(1.0, -1.0, 0.1).is_err());
        assert!(ThetaGrid::new(-1.0, 1.0, 0.0).is_err());
        assert!(ThetaGrid::new(-1.0, 1.0, f64::NAN).is_err());
    }

    #[test]
    fn grid_rejects_excessive_point_count() {
        let err = ThetaGrid::new(-4.0, 4.0, 1e-10).unwrap_err();
        assert!(matches!(err, CatError::Configuration(_)));
        // 8 / 0.0001 + 1 = 80_001 points is still allowed.
        assert_eq!(ThetaGrid::new(-4.0, 4.0, 0.0001).unwrap().len(), 80_001);
    }

    #[test]
    fn prob_3pl_reference_values() {
        assert!((prob_3pl(0.0, 1.2, 0.0, 0.2) - 0.6).abs() < 1e-12);
        assert!((prob_3pl(0.0, 1.0, 0.0, 0.0) - 0.5).abs() < 1e-12);
        // Lower asymptote is the guessing parameter.
        assert!((prob_3pl(-40.0, 1.0, 0.0, 0.25) - 0.25).abs() < 1e-9);
        assert!(prob_3pl(40.0, 1.0, 0.0, 0.25) <= 1.0);
    }

    #[test]
    fn logistic_is_symmetric() {
        for x in [-30.0, -2.5, 0.0, 0.7, 12.0] {
            assert!((logistic(x) + logistic(-x) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn empty_history_returns_sentinel() {
        let bank = single_item_bank();
        let est = estimate(&ThetaGrid::default(), &[], &[], &bank).unwrap();
        assert_eq!(est.theta, 0.0);
        assert!(est.se.is_infinite() && est.se > 0.0);
    }

    #[test]
    fn posterior_sums_to_one() {
        let bank = graded_bank(4);
        let grid = ThetaGrid::default();
        let ids = [3, 9, 14, 20, 27, 31];
        let responses = [1, 1, 0, 1, 0, 0];
        let post = posterior(&grid, &ids, &responses, &bank).unwrap();
        let total: f64 = post.weights().iter().sum();
        assert!((total - 1.0).abs() < 1e-6, "posterior sums to {total}");
    }

    #[test]
    fn correct_answers_raise_theta_monotonically() {
        let bank = single_item_bank();
        let grid = ThetaGrid::default();
        let mut previous = estimate(&grid, &[1], &[1], &bank).unwrap().theta;
        for n in 2..=12 {
            let ids = vec![1; n];
            let responses = vec![1; n];
            let theta = estimate(&grid, &ids, &responses, &bank).unwrap().theta;
            assert!(theta > previous, "n={n}: {theta} <= {previous}");
            previous = theta;
        }
        assert!(previous > 0.0);
    }

    #[test]
    fn incorrect_answers_lower_theta_monotonically() {
        let bank = single_item_bank();
        let grid = ThetaGrid::default();
        let mut previous = estimate(&grid, &[1], &[0], &bank).unwrap().theta;
        for n in 2..=12 {
            let ids = vec![1; n];
            let responses = vec![0; n];
            let theta = estimate(&grid, &ids, &responses, &bank).unwrap().theta;
            assert!(theta < previous, "n={n}: {theta} >= {previous}");
            previous = theta;
        }
        assert!(previous < 0.0);
    }

    #[test]
    fn estimate_is_deterministic() {
        let bank = graded_bank(3);
        let grid = ThetaGrid::default();
        let ids = [2, 8, 13, 19];
        let responses = [1, 0, 1, 1];
        let a = estimate(&grid, &ids, &responses, &bank).unwrap();
        let b = estimate(&grid, &ids, &responses, &bank).unwrap();
        assert_eq!(a.theta.to_bits(), b.theta.to_bits());
        assert_eq!(a.se.to_bits(), b.se.to_bits());
    }

    #[test]
    fn se_shrinks_with_more_information() {
        let bank = graded_bank(4);
        let grid = ThetaGrid::default();
        let one = estimate(&grid, &[13], &[1], &bank).unwrap();
        let many = estimate(&grid, &[13, 14, 15, 16, 17], &[1, 0, 1, 0, 1], &bank).unwrap();
        assert!(one.se < 1.0, "single response se {}", one.se);
        assert!(many.se < one.se);
    }

    #[test]
    fn unknown_item_is_rejected() {
        let bank = single_item_bank();
        let err = estimate(&ThetaGrid::default(), &[42], &[1], &bank).unwrap_err();
        assert!(matches!(err, CatError::Validation(_)));
    }

    #[test]
    fn out_of_range_response_is_rejected() {
        let bank = single_item_bank();
        let err = estimate(&ThetaGrid::default(), &[1], &[2], &bank).unwrap_err();
        assert!(matches!(err, CatError::Validation(_)));
        assert!(err.to_string().contains("got 2"));
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let bank = single_item_bank();
        let err = estimate(&ThetaGrid::default(), &[1], &[1, 0], &bank).unwrap_err();
        assert!(matches!(err, CatError::Validation(_)));
    }

    #[test]
    fn zero_posterior_mass_is_numerical_instability() {
        // A narrow grid far in the tail with many incorrect answers to a very
        // easy, highly discriminating item drives the likelihood to zero.
        let bank = ItemBank::from_items(vec![item(1, 1, 50.0, -30.0, 0.0)]).unwrap();
        let grid = ThetaGrid::new(30.0, 31.0, 0.5).unwrap();
        let ids = vec![1; 40];
        let responses = vec![0; 40];
        let err = estimate(&grid, &ids, &responses, &bank).unwrap_err();
        assert!(matches!(err, CatError::NumericalInstability(_)));
    }
}
