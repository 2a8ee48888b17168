use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Print more about what is happening (repeat for more)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command
}

#[derive(Subcommand)]
pub enum Command {
    /// Count the inputs the grammar accepts
    Check {
        /// File containing the grammar, optionally followed by inputs
        file: PathBuf,

        /// Rule to accept (default: first in the file)
        #[arg(short, long, value_name = "NAME")]
        accept: Vec<String>,

        /// Extra rule replacing the one with the same name
        #[arg(short, long = "rule", value_name = "RULE")]
        rules: Vec<String>,

        /// Also print every accepted input
        #[arg(short, long)]
        list: bool
    },
    /// Print random sentences of the grammar
    Generate {
        /// File containing the grammar
        file: PathBuf,

        /// Start symbol (default: first in the file)
        #[arg(short, long, value_name = "NAME")]
        start: Option<String>,

        /// Amount to generate (default: 1)
        #[arg(short = 'n', long, value_name = "AMOUNT")]
        amount: Option<u32>,

        /// Seed for repeatable output
        #[arg(long, value_name = "N")]
        seed: Option<u64>
    }
}
