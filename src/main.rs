mod cli;

use std::collections::BTreeSet;
use std::fmt::Display;
use std::io::BufRead;
use std::path::Path;
use std::process::exit;

use chomsky::error_handling::*;
use chomsky::generator::{self, GenerateError};
use chomsky::grammar::RuleId;
use chomsky::parser::{self, CompileError, LoadedGrammar};
use chomsky::{normalize, recognize};
use clap::Parser;
use cli::{Cli, Command};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn fail<T: Display>(errors: impl IntoIterator<Item = T>) -> ! {
    for e in errors {
        error!("{}", e);
    }
    exit(1);
}

fn resolve(loaded: &LoadedGrammar, name: &str, file: &Path) -> RuleId {
    loaded.resolve(name)
        .unwrap_or_else(|e| fail([CompileError::at(Location::file(file.to_path_buf()), e)]))
}

fn read_stdin() -> Vec<String> {
    std::io::stdin().lock().lines()
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|e| {
            error!("Read error on stdin: {}", e);
            exit(1);
        })
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .collect()
}

fn check(file: &Path, accept: &[String], rules: &[String], list: bool) {
    let mut grammar_file = parser::parse_file(file).unwrap_or_else(|e| fail(e));
    grammar_file.override_rules(rules).unwrap_or_else(|e| fail(e));
    let loaded = grammar_file.compile().unwrap_or_else(|e| fail(e));

    let accept = match accept {
        [] => BTreeSet::from([loaded.start()]),
        names => names.iter().map(|name| resolve(&loaded, name, file)).collect(),
    };
    let canonical = normalize(loaded.grammar(), &accept)
        .unwrap_or_else(|e| fail([CompileError::at(Location::file(file.to_path_buf()), parser::CompileErrorType::Malformed(e))]));
    info!(
        "{} canonical rules ({} binary, {} synthesized)",
        canonical.len(),
        canonical.binary_count(),
        canonical.synthesized_count()
    );
    debug!("canonical grammar:\n{}", canonical);

    let inputs = if grammar_file.inputs.is_empty() {
        read_stdin()
    } else {
        grammar_file.inputs.clone()
    };

    let mut matches = 0;
    for input in &inputs {
        let tokens = input.chars().collect::<Vec<_>>();
        match recognize(&canonical, &tokens) {
            Ok(true) => {
                matches += 1;
                if list {
                    println!("{}", input);
                }
            }
            Ok(false) => debug!("rejected `{}`", input),
            Err(e) => warn!("skipping `{}`: {}", input, e),
        }
    }
    println!("{}", matches);
}

fn generate(file: &Path, start: Option<&str>, amount: u32, seed: Option<u64>) {
    let loaded = parser::parse_file(file)
        .and_then(|grammar_file| grammar_file.compile())
        .unwrap_or_else(|e| fail(e));

    let start = match start {
        Some(name) => resolve(&loaded, name, file),
        None => loaded.start(),
    };
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    for _ in 0..amount {
        let sentence = generator::generate(loaded.grammar(), start, &mut rng)
            .unwrap_or_else(|e| fail([GenerateError::at(Location::file(file.to_path_buf()), e)]));
        println!("{}", sentence.into_iter().collect::<String>());
    }
}

fn main() {
    let args = Cli::parse();

    if let Err(e) = stderrlog::new().verbosity(args.verbose as usize).init() {
        eprintln!("could not set up logging: {}", e);
    }

    match args.command {
        Command::Check { file, accept, rules, list } => check(&file, &accept, &rules, list),
        Command::Generate { file, start, amount, seed } => generate(&file, start.as_deref(), amount.unwrap_or(1), seed),
    }
}
