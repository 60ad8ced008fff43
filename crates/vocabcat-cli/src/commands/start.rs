//! The `vocabcat start` command.

use std::path::PathBuf;

use anyhow::Result;

pub fn execute(
    item_bank: Option<PathBuf>,
    seed: Option<u64>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let (config, engine) = super::load_engine(item_bank, config_path)?;
    let mut rng = super::make_rng(seed, &config);

    let round = engine.start(&mut rng)?;
    if let Some(next) = round.next_item() {
        let options = next.shuffled_options(&mut rng);
        eprintln!("Item {} (level {}): {}", next.id, next.level, next.word);
        for (i, option) in options.iter().enumerate() {
            eprintln!("  {}. {option}", i + 1);
        }
    }

    println!("{}", serde_json::to_string_pretty(&round.to_output())?);
    Ok(())
}
