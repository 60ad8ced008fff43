//! vocabcat CLI — run and evaluate adaptive vocabulary-size tests.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vocabcat", version, about = "Adaptive vocabulary-size test engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check an item bank for errors and warnings
    Validate {
        /// Item bank CSV (defaults to the configured bank)
        #[arg(long)]
        item_bank: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Start a session and print the first round as JSON
    Start {
        /// Item bank CSV (defaults to the configured bank)
        #[arg(long)]
        item_bank: Option<PathBuf>,

        /// Seed for the initial item draw
        #[arg(long)]
        seed: Option<u64>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Answer the pending item of a stored round and print the next round
    Answer {
        /// JSON file holding the previous round's output
        #[arg(long)]
        state: PathBuf,

        /// Answer text, scored against the item's correct answer
        #[arg(long, conflicts_with = "response")]
        answer: Option<String>,

        /// Scored response (0 or 1)
        #[arg(long, required_unless_present = "answer")]
        response: Option<u8>,

        /// Item answered (defaults to the pending item)
        #[arg(long)]
        item_id: Option<u32>,

        /// Overwrite the state file with the new round
        #[arg(long)]
        in_place: bool,

        /// Item bank CSV (defaults to the configured bank)
        #[arg(long)]
        item_bank: Option<PathBuf>,

        /// Seed for the random source
        #[arg(long)]
        seed: Option<u64>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Simulate sessions for examinees of known ability
    Simulate {
        /// True abilities (comma-separated, e.g. "-1,0,1.5")
        #[arg(long, conflicts_with = "sample", allow_hyphen_values = true)]
        theta: Option<String>,

        /// Draw this many abilities from N(mean, sd) instead
        #[arg(long, required_unless_present = "theta")]
        sample: Option<usize>,

        /// Mean of the sampled ability distribution
        #[arg(long, default_value = "0.0", allow_negative_numbers = true)]
        mean: f64,

        /// Standard deviation of the sampled ability distribution
        #[arg(long, default_value = "1.0")]
        sd: f64,

        /// Sessions per ability
        #[arg(long, default_value = "10")]
        replications: usize,

        /// Batch seed
        #[arg(long)]
        seed: Option<u64>,

        /// Write one session report per run into this directory
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Item bank CSV (defaults to the configured bank)
        #[arg(long)]
        item_bank: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Aggregate statistics over saved session reports
    Summarize {
        /// Directory of session report JSON files
        #[arg(long)]
        reports: PathBuf,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Create a starter config file
    Init,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vocabcat=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { item_bank, config } => commands::validate::execute(item_bank, config),
        Commands::Start {
            item_bank,
            seed,
            config,
        } => commands::start::execute(item_bank, seed, config),
        Commands::Answer {
            state,
            answer,
            response,
            item_id,
            in_place,
            item_bank,
            seed,
            config,
        } => commands::answer::execute(commands::answer::AnswerArgs {
            state,
            answer,
            response,
            item_id,
            in_place,
            item_bank,
            seed,
            config,
        }),
        Commands::Simulate {
            theta,
            sample,
            mean,
            sd,
            replications,
            seed,
            output,
            format,
            item_bank,
            config,
        } => commands::simulate::execute(commands::simulate::SimulateArgs {
            theta,
            sample,
            mean,
            sd,
            replications,
            seed,
            output,
            format,
            item_bank,
            config,
        }),
        Commands::Summarize { reports, format } => commands::summarize::execute(reports, format),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
