use std::collections::HashSet;

use super::CompileErrorType::{DuplicateRule, UndefinedNonterminal};
use super::{Alternative, CompileError, CompileErrors, FileResult, Item, Location, Rewrite, TextRule};

type RuleNames<'a> = HashSet<&'a str>;

fn get_alternative_undefined_symbols(alternative: &Alternative, location: &Location, names: &RuleNames) -> CompileErrors {
    // Filter out everything but nonterminals and unwrap their names. Then
    // filter out all the defined ones.
    alternative.iter()
        .filter_map(|item| match item {
            Item::Name(name) => Some(name),
            Item::Literal(_) => None
        })
        .filter(|name| !names.contains(name.as_str()))
        .map(|name| CompileError {
            location: location.to_owned(),
            error: UndefinedNonterminal(name.to_owned())
        })
        .collect()
}

fn get_rewrite_undefined_symbols(rewrite: &Rewrite, location: &Location, names: &RuleNames) -> CompileErrors {
    rewrite.iter()
        .flat_map(|alternative| get_alternative_undefined_symbols(alternative, location, names))
        .collect()
}

fn get_undefined_symbols(rules: &[TextRule], names: &RuleNames) -> CompileErrors {
    rules.iter()
        .flat_map(|rule| get_rewrite_undefined_symbols(&rule.rewrite, &rule.location, names))
        .collect()
}

// Every definition after the first for the same name
fn get_duplicate_rules(rules: &[TextRule]) -> CompileErrors {
    let mut seen = HashSet::new();
    rules.iter()
        .filter(|rule| !seen.insert(rule.name.as_str()))
        .map(|rule| CompileError {
            location: rule.location.clone(),
            error: DuplicateRule(rule.name.clone())
        })
        .collect()
}

pub fn verify_rules(rules: &[TextRule]) -> FileResult<()> {
    let names: RuleNames = rules.iter().map(|rule| rule.name.as_str()).collect();

    let mut errors = get_duplicate_rules(rules);
    errors.extend(get_undefined_symbols(rules, &names));

    if errors.len() > 0 {
        Err(errors)
    } else {
        Ok(())
    }
}
