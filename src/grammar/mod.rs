/*
    This module is for storing context-free grammars
*/

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt::Display;

use crate::error_handling::ErrorType;

// Index of a rule in a grammar's rule table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(pub u32);

impl RuleId {
    // None once the id space is used up
    pub fn next(self) -> Option<RuleId> {
        self.0.checked_add(1).map(RuleId)
    }
}

impl Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    // No rules at all were supplied
    EmptyGrammar,
    // An alternative was built from zero symbols
    EmptySubRule,
    // A rule was built from zero alternatives
    EmptyRule(RuleId),
    // Two rules share an id
    DuplicateRule(RuleId),
    // A symbol (or an accept id when `from` is None) names a missing rule
    UndefinedRuleReference { from: Option<RuleId>, target: RuleId },
    // Unit productions loop back on themselves without reaching a terminal
    GrammarCycle(RuleId),
    // An explicit epsilon alternative reached the normalizer
    UnsupportedEpsilonProduction(RuleId),
    // Nothing was designated as an accept rule
    EmptyAcceptSet,
    // A rule had to be synthesized but every id above the grammar's is taken
    RuleIdsExhausted,
}

impl ErrorType for GrammarError {}

impl Display for GrammarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrammarError::EmptyGrammar => write!(f, "Grammar has no rules"),
            GrammarError::EmptySubRule => write!(f, "Alternative has no symbols"),
            GrammarError::EmptyRule(id) => write!(f, "Rule {} has no alternatives", id),
            GrammarError::DuplicateRule(id) => write!(f, "Rule {} is defined more than once", id),
            GrammarError::UndefinedRuleReference { from: Some(from), target } =>
                write!(f, "Rule {} references undefined rule {}", from, target),
            GrammarError::UndefinedRuleReference { from: None, target } =>
                write!(f, "Accept rule {} is not defined", target),
            GrammarError::GrammarCycle(id) =>
                write!(f, "Rule {} only rewrites to itself through unit productions", id),
            GrammarError::UnsupportedEpsilonProduction(id) =>
                write!(f, "Rule {} has an empty alternative, which is not supported", id),
            GrammarError::EmptyAcceptSet => write!(f, "No accept rules were given"),
            GrammarError::RuleIdsExhausted => write!(f, "No rule ids are left for synthesized rules"),
        }
    }
}

pub type GrammarResult<T> = Result<T, GrammarError>;

// The base unit in a grammar rule
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol<T> {
    Terminal(T),
    NonTerminalRef(RuleId),
}

// The symbols in a single alternative
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubRule<T> {
    symbols: Vec<Symbol<T>>,
}

impl<T> SubRule<T> {
    pub fn new(symbols: Vec<Symbol<T>>) -> GrammarResult<Self> {
        if symbols.is_empty() {
            return Err(GrammarError::EmptySubRule);
        }
        Ok(SubRule { symbols })
    }

    /// An explicit empty alternative. The grammar can carry one, but
    /// normalization rejects it.
    pub fn epsilon() -> Self {
        SubRule { symbols: Vec::new() }
    }

    pub fn symbols(&self) -> &[Symbol<T>] {
        &self.symbols
    }

    pub fn is_epsilon(&self) -> bool {
        self.symbols.is_empty()
    }
}

// All the alternatives for one nonterminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule<T> {
    id: RuleId,
    alternatives: Vec<SubRule<T>>,
}

impl<T> Rule<T> {
    pub fn new(id: RuleId, alternatives: Vec<SubRule<T>>) -> GrammarResult<Self> {
        if alternatives.is_empty() {
            return Err(GrammarError::EmptyRule(id));
        }
        Ok(Rule { id, alternatives })
    }

    pub fn id(&self) -> RuleId {
        self.id
    }

    pub fn alternatives(&self) -> &[SubRule<T>] {
        &self.alternatives
    }
}

/// An immutable table of rules keyed by id. References between rules are
/// plain ids and are only resolved when the grammar is normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar<T> {
    rules: BTreeMap<RuleId, Rule<T>>,
}

impl<T> Grammar<T> {
    pub fn new(rules: impl IntoIterator<Item = Rule<T>>) -> GrammarResult<Self> {
        let mut table = BTreeMap::new();
        for rule in rules {
            match table.entry(rule.id) {
                Entry::Occupied(_) => return Err(GrammarError::DuplicateRule(rule.id)),
                Entry::Vacant(slot) => { slot.insert(rule); }
            }
        }

        if table.is_empty() {
            return Err(GrammarError::EmptyGrammar);
        }

        Ok(Grammar { rules: table })
    }

    pub fn rule(&self, id: RuleId) -> Option<&Rule<T>> {
        self.rules.get(&id)
    }

    pub fn contains(&self, id: RuleId) -> bool {
        self.rules.contains_key(&id)
    }

    // Rules in increasing id order
    pub fn rules(&self) -> impl Iterator<Item = &Rule<T>> {
        self.rules.values()
    }

    pub fn max_id(&self) -> RuleId {
        // The table is never empty
        self.rules.keys().next_back().copied().unwrap_or(RuleId(0))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}
