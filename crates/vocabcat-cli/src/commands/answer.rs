//! The `vocabcat answer` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use vocabcat_core::RoundOutput;

pub struct AnswerArgs {
    pub state: PathBuf,
    pub answer: Option<String>,
    pub response: Option<u8>,
    pub item_id: Option<u32>,
    pub in_place: bool,
    pub item_bank: Option<PathBuf>,
    pub seed: Option<u64>,
    pub config: Option<PathBuf>,
}

pub fn execute(args: AnswerArgs) -> Result<()> {
    let (config, engine) = super::load_engine(args.item_bank, args.config)?;
    let mut rng = super::make_rng(args.seed, &config);

    let content = std::fs::read_to_string(&args.state)
        .with_context(|| format!("failed to read state from {}", args.state.display()))?;
    let previous: RoundOutput =
        serde_json::from_str(&content).context("failed to parse state JSON")?;
    let state = previous.into_state();

    let item_id = args
        .item_id
        .or(state.pending_item)
        .context("no pending item in state; pass --item-id")?;

    let round = match (&args.answer, args.response) {
        (Some(answer), _) => engine.submit_answer(&state, item_id, answer, &mut rng)?,
        (None, Some(response)) => engine.submit(&state, item_id, response, &mut rng)?,
        (None, None) => anyhow::bail!("either --answer or --response is required"),
    };

    if let Some(result) = round.final_result() {
        eprintln!(
            "Finished after {} items: vocabulary size {} (theta {:.3}, SE {:.3})",
            result.items_administered, result.vocabulary_size, result.final_theta, result.final_se
        );
    } else if let Some(next) = round.next_item() {
        eprintln!("Next item {} (level {}): {}", next.id, next.level, next.word);
        for (i, option) in next.shuffled_options(&mut rng).iter().enumerate() {
            eprintln!("  {}. {option}", i + 1);
        }
    }

    let json = serde_json::to_string_pretty(&round.to_output())?;
    if args.in_place {
        std::fs::write(&args.state, &json)
            .with_context(|| format!("failed to write state to {}", args.state.display()))?;
    }
    println!("{json}");
    Ok(())
}
