//! Single-session driver.

use anyhow::{Context, Result};
use rand::Rng;
use vocabcat_core::engine::RoundOutcome;
use vocabcat_core::report::SessionReport;
use vocabcat_core::statistics::ExposureTracker;
use vocabcat_core::{CatEngine, Examinee};

/// Run one complete session: start, answer every item the engine hands
/// out, and return the full trajectory with its final result.
pub fn run_session<E, R>(engine: &CatEngine, examinee: &mut E, rng: &mut R) -> Result<SessionReport>
where
    E: Examinee,
    R: Rng + ?Sized,
{
    drive(engine, examinee, None, rng)
}

/// Like [`run_session`], but records every presentation in `tracker` and
/// lets an exposure-limited selection strategy see the running counts.
pub fn run_session_with_exposure<E, R>(
    engine: &CatEngine,
    examinee: &mut E,
    tracker: &ExposureTracker,
    rng: &mut R,
) -> Result<SessionReport>
where
    E: Examinee,
    R: Rng + ?Sized,
{
    tracker.record_session();
    drive(engine, examinee, Some(tracker), rng)
}

fn drive<E, R>(
    engine: &CatEngine,
    examinee: &mut E,
    tracker: Option<&ExposureTracker>,
    rng: &mut R,
) -> Result<SessionReport>
where
    E: Examinee,
    R: Rng + ?Sized,
{
    let mut report = SessionReport::new("simulated");
    let mut round = engine.start(rng).context("failed to start session")?;

    while let Some(item_id) = round.next_item().map(|next| next.id) {
        let item = engine
            .bank()
            .by_id(item_id)
            .with_context(|| format!("engine selected unknown item {item_id}"))?;
        let response = examinee.respond(item, rng);
        let theta_before = round.state.theta;

        let next = match tracker {
            Some(tracker) => {
                tracker.record_response(item_id, response);
                engine.submit_with_exposure(&round.state, item_id, response, &tracker.snapshot(), rng)
            }
            None => engine.submit(&round.state, item_id, response, rng),
        }
        .with_context(|| format!("failed to submit response to item {item_id}"))?;

        report.record_round(item, response, theta_before, next.state.theta, next.state.se);
        round = next;
    }

    if let RoundOutcome::Finished { result, reason } = round.outcome {
        report.finish(result, reason);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::engine;
    use crate::SimulatedExaminee;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;
    use vocabcat_core::traits::ScriptedExaminee;
    use vocabcat_core::{CatConfig, SelectionStrategy};

    #[test]
    fn session_runs_to_completion() {
        let engine = engine(CatConfig::default());
        let mut rng = Pcg64::seed_from_u64(3);
        let mut examinee = SimulatedExaminee::new(0.5);
        let report = run_session(&engine, &mut examinee, &mut rng).unwrap();

        let result = report.final_result.as_ref().unwrap();
        assert!(report.stop_reason.is_some());
        assert_eq!(result.items_administered, report.rounds.len());
        assert!((20..=30).contains(&result.items_administered));
        assert!([3, 4, 5].contains(&report.rounds[0].level));
        assert_eq!(report.rounds[0].theta_before, 0.0);
        for pair in report.rounds.windows(2) {
            assert_eq!(pair[0].theta_after, pair[1].theta_before);
        }
    }

    #[test]
    fn scripted_all_wrong_scores_low() {
        let engine = engine(CatConfig::default());
        let mut rng = Pcg64::seed_from_u64(5);
        let low = run_session(&engine, &mut ScriptedExaminee::new(vec![]), &mut rng).unwrap();
        let high = run_session(&engine, &mut ScriptedExaminee::new(vec![1; 30]), &mut rng).unwrap();

        let low = low.final_result.unwrap();
        let high = high.final_result.unwrap();
        assert!(low.final_theta < 0.0);
        assert!(high.final_theta > 0.0);
        assert!(high.vocabulary_size > low.vocabulary_size);
    }

    #[test]
    fn exposure_tracking_counts_presentations() {
        let config = CatConfig {
            selection: SelectionStrategy::ExposureLimited { max_rate: 0.6 },
            ..CatConfig::default()
        };
        let engine = engine(config);
        let tracker = ExposureTracker::new(engine.bank());
        let mut rng = Pcg64::seed_from_u64(9);

        let mut total = 0;
        for _ in 0..3 {
            let mut examinee = SimulatedExaminee::new(0.0);
            let report = run_session_with_exposure(&engine, &mut examinee, &tracker, &mut rng).unwrap();
            total += report.rounds.len() as u64;
        }

        assert_eq!(tracker.sessions(), 3);
        let recorded: u64 = engine.bank().iter().map(|i| tracker.exposures(i.id)).sum();
        assert_eq!(recorded, total);
    }
}
