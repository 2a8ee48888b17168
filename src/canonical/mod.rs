/*
    This module holds grammars in Chomsky normal form
*/

use std::collections::{BTreeSet, HashMap};
use std::fmt::{Debug, Display};
use std::hash::Hash;

use itertools::Itertools;

use crate::grammar::RuleId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalKind<T> {
    // Rewrites to exactly one token
    Terminal(T),
    // Rewrites to any of these pairs of rules
    Binary(BTreeSet<(RuleId, RuleId)>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRule<T> {
    id: RuleId,
    kind: CanonicalKind<T>,
    original: bool,
}

impl<T> CanonicalRule<T> {
    pub(crate) fn new(id: RuleId, kind: CanonicalKind<T>, original: bool) -> Self {
        CanonicalRule { id, kind, original }
    }

    pub fn id(&self) -> RuleId {
        self.id
    }

    pub fn kind(&self) -> &CanonicalKind<T> {
        &self.kind
    }

    /// False for rules the normalizer made up while isolating terminals or
    /// splitting long alternatives.
    pub fn is_original(&self) -> bool {
        self.original
    }
}

/// The output of normalization.
///
/// An id owns at most one `Binary` entry and one `Terminal` entry per
/// distinct token. Lookups from a token, or from a pair of child ids, to the
/// rules producing them are built once here so recognition never has to scan
/// the rule table.
#[derive(Debug, Clone)]
pub struct CanonicalGrammar<T> {
    rules: Vec<CanonicalRule<T>>,
    accept: BTreeSet<RuleId>,
    by_token: HashMap<T, Vec<RuleId>>,
    by_pair: HashMap<(RuleId, RuleId), Vec<RuleId>>,
}

impl<T: Clone + Eq + Hash> CanonicalGrammar<T> {
    pub(crate) fn assemble(mut rules: Vec<CanonicalRule<T>>, accept: BTreeSet<RuleId>) -> Self {
        // Stable, so entries for one id keep the order they were produced in
        rules.sort_by_key(CanonicalRule::id);

        let mut by_token: HashMap<T, Vec<RuleId>> = HashMap::new();
        let mut by_pair: HashMap<(RuleId, RuleId), Vec<RuleId>> = HashMap::new();
        for rule in &rules {
            match &rule.kind {
                CanonicalKind::Terminal(token) => by_token.entry(token.clone()).or_default().push(rule.id),
                CanonicalKind::Binary(pairs) => {
                    for pair in pairs {
                        by_pair.entry(*pair).or_default().push(rule.id);
                    }
                }
            }
        }

        CanonicalGrammar { rules, accept, by_token, by_pair }
    }

    // Every rule with a Terminal entry for this token
    pub fn producers_of(&self, token: &T) -> &[RuleId] {
        self.by_token.get(token).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl<T> CanonicalGrammar<T> {
    pub fn rules(&self) -> &[CanonicalRule<T>] {
        &self.rules
    }

    pub fn rules_for(&self, id: RuleId) -> impl Iterator<Item = &CanonicalRule<T>> {
        self.rules.iter().filter(move |rule| rule.id == id)
    }

    pub fn accept(&self) -> &BTreeSet<RuleId> {
        &self.accept
    }

    pub fn is_accept(&self, id: RuleId) -> bool {
        self.accept.contains(&id)
    }

    // Every rule with (left, right) among its Binary pairs
    pub fn parents_of(&self, left: RuleId, right: RuleId) -> &[RuleId] {
        self.by_pair.get(&(left, right)).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn binary_count(&self) -> usize {
        self.rules.iter()
            .filter(|rule| matches!(rule.kind, CanonicalKind::Binary(_)))
            .count()
    }

    pub fn synthesized_count(&self) -> usize {
        self.rules.iter()
            .filter(|rule| !rule.original)
            .map(CanonicalRule::id)
            .unique()
            .count()
    }
}

impl<T: Debug> Display for CanonicalRule<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let marker = if self.original { "" } else { "*" };
        match &self.kind {
            CanonicalKind::Terminal(token) => write!(f, "{}{} -> {:?}", self.id, marker, token),
            CanonicalKind::Binary(pairs) => write!(
                f,
                "{}{} -> {}",
                self.id,
                marker,
                pairs.iter().map(|(left, right)| format!("{} {}", left, right)).join(" | ")
            ),
        }
    }
}

impl<T: Debug> Display for CanonicalGrammar<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "accept: {}", self.accept.iter().join(", "))?;
        for rule in &self.rules {
            writeln!(f, "{}", rule)?;
        }
        Ok(())
    }
}
