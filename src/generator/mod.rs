/*
    This module generates random sentences from a grammar
*/

use rand::prelude::*;
use std::fmt::Display;

use crate::grammar::*;
use crate::error_handling::*;

pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, PartialEq)]
pub enum GenerateErrorType {
    // A reference to a rule the grammar does not define
    UndefinedNonterminal(RuleId),
    // Expansion kept recursing past the depth limit
    DepthExceeded(usize),
}

impl ErrorType for GenerateErrorType {}

impl Display for GenerateErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerateErrorType::UndefinedNonterminal(id) => write!(f, "No definition for rule {}", id),
            GenerateErrorType::DepthExceeded(depth) => write!(f, "Gave up expanding after {} nested rules", depth),
        }
    }
}

pub type GenerateError = Error<GenerateErrorType>;
pub type GenResult<T> = Result<Vec<T>, GenerateErrorType>;

// Generates a sentence derivable from `start`
pub fn generate<T: Clone>(grammar: &Grammar<T>, start: RuleId, rng: &mut impl Rng) -> GenResult<T> {
    generate_with_depth(grammar, start, DEFAULT_MAX_DEPTH, rng)
}

pub fn generate_with_depth<T: Clone>(grammar: &Grammar<T>, start: RuleId, max_depth: usize, rng: &mut impl Rng) -> GenResult<T> {
    let mut sentence = Vec::new();
    generate_rule(grammar, start, 0, max_depth, rng, &mut sentence)?;
    Ok(sentence)
}

fn generate_rule<T: Clone>(grammar: &Grammar<T>, id: RuleId, depth: usize, max_depth: usize, rng: &mut impl Rng, sentence: &mut Vec<T>) -> Result<(), GenerateErrorType> {
    let rule = grammar.rule(id).ok_or(GenerateErrorType::UndefinedNonterminal(id))?;
    if depth >= max_depth {
        return Err(GenerateErrorType::DepthExceeded(max_depth));
    }

    // Rules always have at least one alternative
    let Some(alternative) = rule.alternatives().choose(rng) else {
        return Ok(());
    };

    for symbol in alternative.symbols() {
        match symbol {
            Symbol::Terminal(token) => sentence.push(token.clone()),
            Symbol::NonTerminalRef(child) => generate_rule(grammar, *child, depth + 1, max_depth, rng, sentence)?,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;

    use super::*;

    fn rule(id: u32, alternatives: Vec<Vec<Symbol<char>>>) -> Rule<char> {
        Rule::new(
            RuleId(id),
            alternatives.into_iter().map(|symbols| SubRule::new(symbols).unwrap()).collect(),
        ).unwrap()
    }

    #[test]
    fn generate_fixed_sentence() {
        let grammar = Grammar::new(vec![
            rule(0, vec![vec![Symbol::NonTerminalRef(RuleId(1)), Symbol::Terminal('!')]]),
            rule(1, vec![vec![Symbol::Terminal('h'), Symbol::Terminal('i')]]),
        ]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(generate(&grammar, RuleId(0), &mut rng), Ok(vec!['h', 'i', '!']));
    }

    #[test]
    fn generate_from_choices() {
        let grammar = Grammar::new(vec![
            rule(0, vec![vec![Symbol::Terminal('x')], vec![Symbol::Terminal('y')]]),
        ]).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            let sentence = generate(&grammar, RuleId(0), &mut rng).unwrap();
            assert!(sentence == vec!['x'] || sentence == vec!['y']);
        }
    }

    #[test]
    fn generate_epsilon_alternative() {
        let grammar = Grammar::new(vec![
            Rule::new(RuleId(0), vec![SubRule::epsilon()]).unwrap(),
        ]).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(generate::<char>(&grammar, RuleId(0), &mut rng), Ok(vec![]));
    }

    #[test]
    fn generate_failures() {
        let looping = Grammar::new(vec![
            rule(0, vec![vec![Symbol::NonTerminalRef(RuleId(0)), Symbol::Terminal('a')]]),
        ]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(generate_with_depth(&looping, RuleId(0), 5, &mut rng), Err(GenerateErrorType::DepthExceeded(5)));
        assert_eq!(generate(&looping, RuleId(2), &mut rng), Err(GenerateErrorType::UndefinedNonterminal(RuleId(2))));
    }
}
