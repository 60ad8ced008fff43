//! The `vocabcat init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("vocabcat.toml").exists() {
        println!("vocabcat.toml already exists, skipping.");
    } else {
        std::fs::write("vocabcat.toml", SAMPLE_CONFIG)?;
        println!("Created vocabcat.toml");
    }

    println!("\nNext steps:");
    println!("  1. Point item_bank in vocabcat.toml at your calibrated item bank CSV");
    println!("  2. Run: vocabcat validate");
    println!("  3. Run: vocabcat start > round.json");
    println!("  4. Run: vocabcat answer --state round.json --response 1 --in-place");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# vocabcat configuration

item_bank = "item_bank.csv"
output_dir = "./vocabcat-results"
# seed = 42

[cat]
theta_grid_min = -4.0
theta_grid_max = 4.0
theta_grid_step = 0.01
se_threshold = 0.4
min_items = 20
max_items = 30
high_level_threshold = 7
required_high_count = 2
initial_level_band = [3, 4, 5]
vocab_calibration_table = [-2.206, -1.512, -0.701, -0.075, 0.748, 1.152, 1.504, 2.089]
efficiency_baseline = 160.0

[cat.selection]
type = "max_information"
# type = "exposure_limited"
# max_rate = 0.3
"#;
