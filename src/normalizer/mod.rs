/*
    This module rewrites context-free grammars into Chomsky normal form
*/

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;

use itertools::Itertools;
use log::{debug, trace};

use crate::canonical::{CanonicalGrammar, CanonicalKind, CanonicalRule};
use crate::grammar::*;

pub type NormalizationError = GrammarError;

// What one original rule rewrites to before unit productions are resolved
struct Bodies<T> {
    tokens: Vec<T>,
    pairs: BTreeSet<(RuleId, RuleId)>,
    units: Vec<RuleId>,
}

impl<T> Bodies<T> {
    fn new() -> Self {
        Bodies { tokens: Vec::new(), pairs: BTreeSet::new(), units: Vec::new() }
    }
}

// Hands out ids for synthesized rules, reusing one per distinct body
struct Synthesizer<T> {
    next_id: Option<RuleId>,
    token_rules: HashMap<T, RuleId>,
    pair_rules: HashMap<(RuleId, RuleId), RuleId>,
    rules: Vec<CanonicalRule<T>>,
}

impl<T: Clone + Eq + Hash> Synthesizer<T> {
    fn new(first_free: Option<RuleId>) -> Self {
        Synthesizer {
            next_id: first_free,
            token_rules: HashMap::new(),
            pair_rules: HashMap::new(),
            rules: Vec::new(),
        }
    }

    fn fresh_id(&mut self) -> GrammarResult<RuleId> {
        let id = self.next_id.ok_or(GrammarError::RuleIdsExhausted)?;
        self.next_id = id.next();
        Ok(id)
    }

    fn token_rule(&mut self, token: &T) -> GrammarResult<RuleId> {
        if let Some(&id) = self.token_rules.get(token) {
            return Ok(id);
        }
        let id = self.fresh_id()?;
        trace!("synthesized {} -> terminal", id);
        self.token_rules.insert(token.clone(), id);
        self.rules.push(CanonicalRule::new(id, CanonicalKind::Terminal(token.clone()), false));
        Ok(id)
    }

    fn pair_rule(&mut self, left: RuleId, right: RuleId) -> GrammarResult<RuleId> {
        if let Some(&id) = self.pair_rules.get(&(left, right)) {
            return Ok(id);
        }
        let id = self.fresh_id()?;
        trace!("synthesized {} -> {} {}", id, left, right);
        self.pair_rules.insert((left, right), id);
        self.rules.push(CanonicalRule::new(id, CanonicalKind::Binary(BTreeSet::from([(left, right)])), false));
        Ok(id)
    }

    // Terminals inside a long alternative become references to single-token
    // rules, then everything past the first symbol is folded from the right
    // into nested pairs.
    fn binarize(&mut self, symbols: &[Symbol<T>]) -> GrammarResult<(RuleId, RuleId)> {
        let ids = symbols.iter()
            .map(|symbol| match symbol {
                Symbol::Terminal(token) => self.token_rule(token),
                Symbol::NonTerminalRef(id) => Ok(*id),
            })
            .collect::<GrammarResult<Vec<_>>>()?;

        let last = ids.len() - 1;
        let mut right = ids[last];
        for &left in ids[1..last].iter().rev() {
            right = self.pair_rule(left, right)?;
        }
        Ok((ids[0], right))
    }
}

fn check_references<T>(grammar: &Grammar<T>, rule: &Rule<T>, alternative: &SubRule<T>) -> GrammarResult<()> {
    alternative.symbols().iter()
        .filter_map(|symbol| match symbol {
            Symbol::NonTerminalRef(target) => Some(*target),
            Symbol::Terminal(_) => None,
        })
        .find(|target| !grammar.contains(*target))
        .map_or(Ok(()), |target| Err(GrammarError::UndefinedRuleReference {
            from: Some(rule.id()),
            target,
        }))
}

fn check_accept<T>(grammar: &Grammar<T>, accept: &BTreeSet<RuleId>) -> GrammarResult<()> {
    if accept.is_empty() {
        return Err(GrammarError::EmptyAcceptSet);
    }
    match accept.iter().find(|id| !grammar.contains(**id)) {
        Some(&target) => Err(GrammarError::UndefinedRuleReference { from: None, target }),
        None => Ok(()),
    }
}

// Every rule reachable from `start` through unit productions, `start` included
fn unit_closure<T>(start: RuleId, direct: &BTreeMap<RuleId, Bodies<T>>) -> BTreeSet<RuleId> {
    let mut visited = BTreeSet::from([start]);
    let mut pending = vec![start];
    while let Some(id) = pending.pop() {
        for &unit in direct.get(&id).map(|bodies| bodies.units.as_slice()).unwrap_or(&[]) {
            if visited.insert(unit) {
                pending.push(unit);
            }
        }
    }
    visited
}

// Drops every rule the accept set cannot reach through binary pairs
fn prune<T>(rules: Vec<CanonicalRule<T>>, accept: &BTreeSet<RuleId>) -> Vec<CanonicalRule<T>> {
    let mut children: HashMap<RuleId, Vec<RuleId>> = HashMap::new();
    for rule in &rules {
        if let CanonicalKind::Binary(pairs) = rule.kind() {
            children.entry(rule.id()).or_default()
                .extend(pairs.iter().flat_map(|&(left, right)| [left, right]));
        }
    }

    let mut reachable = accept.clone();
    let mut pending = accept.iter().copied().collect_vec();
    while let Some(id) = pending.pop() {
        for &child in children.get(&id).map(Vec::as_slice).unwrap_or(&[]) {
            if reachable.insert(child) {
                pending.push(child);
            }
        }
    }

    rules.into_iter().filter(|rule| reachable.contains(&rule.id())).collect()
}

/// Rewrites `grammar` into an equivalent grammar in Chomsky normal form whose
/// accepted language is the union of what the `accept` rules derive.
///
/// Terminals in alternatives longer than one symbol are isolated into
/// synthesized single-token rules, long alternatives are folded from the
/// right into binary rules, and unit productions are replaced by the
/// alternatives of the rules they name. Synthesized rules are shared between
/// every place that needs the same body.
pub fn normalize<T: Clone + Eq + Hash>(grammar: &Grammar<T>, accept: &BTreeSet<RuleId>) -> GrammarResult<CanonicalGrammar<T>> {
    let mut synthesizer = Synthesizer::new(grammar.max_id().next());
    let mut direct = BTreeMap::new();

    for rule in grammar.rules() {
        let mut bodies = Bodies::new();
        for alternative in rule.alternatives() {
            if alternative.is_epsilon() {
                return Err(GrammarError::UnsupportedEpsilonProduction(rule.id()));
            }
            check_references(grammar, rule, alternative)?;

            match alternative.symbols() {
                [Symbol::Terminal(token)] => bodies.tokens.push(token.clone()),
                [Symbol::NonTerminalRef(target)] => bodies.units.push(*target),
                symbols => { bodies.pairs.insert(synthesizer.binarize(symbols)?); }
            }
        }
        direct.insert(rule.id(), bodies);
    }
    check_accept(grammar, accept)?;

    debug!(
        "isolated {} terminals and split off {} pairs from {} rules",
        synthesizer.token_rules.len(),
        synthesizer.pair_rules.len(),
        grammar.len()
    );

    let mut rules = Vec::new();
    for &id in direct.keys() {
        let closure = unit_closure(id, &direct);
        let tokens = closure.iter()
            .flat_map(|member| direct[member].tokens.iter())
            .unique()
            .cloned()
            .collect_vec();
        let pairs: BTreeSet<_> = closure.iter()
            .flat_map(|member| direct[member].pairs.iter().copied())
            .collect();

        if tokens.is_empty() && pairs.is_empty() {
            return Err(GrammarError::GrammarCycle(id));
        }
        trace!("{} resolves through {} rules to {} tokens and {} pairs", id, closure.len(), tokens.len(), pairs.len());

        rules.extend(tokens.into_iter().map(|token| CanonicalRule::new(id, CanonicalKind::Terminal(token), true)));
        if !pairs.is_empty() {
            rules.push(CanonicalRule::new(id, CanonicalKind::Binary(pairs), true));
        }
    }
    rules.extend(synthesizer.rules);

    let total = rules.len();
    let rules = prune(rules, accept);
    debug!("normalized into {} canonical rules ({} unreachable dropped)", rules.len(), total - rules.len());

    Ok(CanonicalGrammar::assemble(rules, accept.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(c: char) -> Symbol<char> {
        Symbol::Terminal(c)
    }

    fn r(id: u32) -> Symbol<char> {
        Symbol::NonTerminalRef(RuleId(id))
    }

    fn rule(id: u32, alternatives: Vec<Vec<Symbol<char>>>) -> Rule<char> {
        Rule::new(
            RuleId(id),
            alternatives.into_iter().map(|symbols| SubRule::new(symbols).unwrap()).collect(),
        ).unwrap()
    }

    fn accept(ids: &[u32]) -> BTreeSet<RuleId> {
        ids.iter().map(|&id| RuleId(id)).collect()
    }

    fn binary(grammar: &CanonicalGrammar<char>, id: u32) -> BTreeSet<(RuleId, RuleId)> {
        grammar.rules_for(RuleId(id))
            .find_map(|rule| match rule.kind() {
                CanonicalKind::Binary(pairs) => Some(pairs.clone()),
                CanonicalKind::Terminal(_) => None,
            })
            .unwrap_or_default()
    }

    fn tokens(grammar: &CanonicalGrammar<char>, id: u32) -> Vec<char> {
        grammar.rules_for(RuleId(id))
            .filter_map(|rule| match rule.kind() {
                CanonicalKind::Terminal(token) => Some(*token),
                CanonicalKind::Binary(_) => None,
            })
            .collect()
    }

    #[test]
    fn binary_rule_is_kept() {
        let grammar = Grammar::new(vec![
            rule(0, vec![vec![r(1), r(2)]]),
            rule(1, vec![vec![t('a')]]),
            rule(2, vec![vec![t('b')]]),
        ]).unwrap();
        let canonical = normalize(&grammar, &accept(&[0])).unwrap();

        assert_eq!(binary(&canonical, 0), BTreeSet::from([(RuleId(1), RuleId(2))]));
        assert_eq!(tokens(&canonical, 1), vec!['a']);
        assert_eq!(tokens(&canonical, 2), vec!['b']);
        assert_eq!(canonical.synthesized_count(), 0);
        assert!(canonical.rules().iter().all(CanonicalRule::is_original));
    }

    #[test]
    fn terminals_are_isolated_once_per_token() {
        // 0: "a" 1 "a" | "a" "a"
        let grammar = Grammar::new(vec![
            rule(0, vec![vec![t('a'), r(1), t('a')], vec![t('a'), t('a')]]),
            rule(1, vec![vec![t('b')]]),
        ]).unwrap();
        let canonical = normalize(&grammar, &accept(&[0])).unwrap();

        // Ids 0 and 1 are taken, so the shared "a" rule is 2 and the tail of
        // the first alternative is 3
        assert_eq!(tokens(&canonical, 2), vec!['a']);
        assert!(!canonical.rules_for(RuleId(2)).next().unwrap().is_original());
        assert_eq!(binary(&canonical, 3), BTreeSet::from([(RuleId(1), RuleId(2))]));
        assert_eq!(binary(&canonical, 0), BTreeSet::from([
            (RuleId(2), RuleId(3)),
            (RuleId(2), RuleId(2)),
        ]));
        assert_eq!(canonical.synthesized_count(), 2);
    }

    #[test]
    fn long_alternatives_fold_from_the_right() {
        // 0: 1 2 3 4
        let grammar = Grammar::new(vec![
            rule(0, vec![vec![r(1), r(2), r(3), r(4)]]),
            rule(1, vec![vec![t('a')]]),
            rule(2, vec![vec![t('b')]]),
            rule(3, vec![vec![t('c')]]),
            rule(4, vec![vec![t('d')]]),
        ]).unwrap();
        let canonical = normalize(&grammar, &accept(&[0])).unwrap();

        // 5 -> 3 4, 6 -> 2 5, 0 -> 1 6
        assert_eq!(binary(&canonical, 5), BTreeSet::from([(RuleId(3), RuleId(4))]));
        assert_eq!(binary(&canonical, 6), BTreeSet::from([(RuleId(2), RuleId(5))]));
        assert_eq!(binary(&canonical, 0), BTreeSet::from([(RuleId(1), RuleId(6))]));
    }

    #[test]
    fn identical_tails_share_a_rule() {
        // 0: 1 2 3 | 2 2 3
        let grammar = Grammar::new(vec![
            rule(0, vec![vec![r(1), r(2), r(3)], vec![r(2), r(2), r(3)]]),
            rule(1, vec![vec![t('a')]]),
            rule(2, vec![vec![t('b')]]),
            rule(3, vec![vec![t('c')]]),
        ]).unwrap();
        let canonical = normalize(&grammar, &accept(&[0])).unwrap();

        assert_eq!(canonical.synthesized_count(), 1);
        assert_eq!(binary(&canonical, 0), BTreeSet::from([
            (RuleId(1), RuleId(4)),
            (RuleId(2), RuleId(4)),
        ]));
    }

    #[test]
    fn unit_productions_are_substituted_transitively() {
        // 0: 1, 1: 2 | "x", 2: "y" | 3 3, 3: "z"
        let grammar = Grammar::new(vec![
            rule(0, vec![vec![r(1)]]),
            rule(1, vec![vec![r(2)], vec![t('x')]]),
            rule(2, vec![vec![t('y')], vec![r(3), r(3)]]),
            rule(3, vec![vec![t('z')]]),
        ]).unwrap();
        let canonical = normalize(&grammar, &accept(&[0])).unwrap();

        let mut found = tokens(&canonical, 0);
        found.sort();
        assert_eq!(found, vec!['x', 'y']);
        assert_eq!(binary(&canonical, 0), BTreeSet::from([(RuleId(3), RuleId(3))]));
        // 1 and 2 are only reachable through units, so they are pruned
        assert_eq!(canonical.rules_for(RuleId(1)).count(), 0);
        assert_eq!(canonical.rules_for(RuleId(2)).count(), 0);
    }

    #[test]
    fn duplicate_bodies_collapse() {
        // 0: 1 | "a", 1: "a"
        let grammar = Grammar::new(vec![
            rule(0, vec![vec![r(1)], vec![t('a')]]),
            rule(1, vec![vec![t('a')]]),
        ]).unwrap();
        let canonical = normalize(&grammar, &accept(&[0])).unwrap();
        assert_eq!(tokens(&canonical, 0), vec!['a']);
    }

    #[test]
    fn unit_cycle_with_escape_is_accepted() {
        // 0: 1 | "a", 1: 0
        let grammar = Grammar::new(vec![
            rule(0, vec![vec![r(1)], vec![t('a')]]),
            rule(1, vec![vec![r(0)]]),
        ]).unwrap();
        let canonical = normalize(&grammar, &accept(&[1])).unwrap();
        assert_eq!(tokens(&canonical, 1), vec!['a']);
    }

    #[test]
    fn unit_cycle_without_escape_fails() {
        let grammar = Grammar::new(vec![
            rule(0, vec![vec![r(1)]]),
            rule(1, vec![vec![r(0)]]),
        ]).unwrap();
        assert_eq!(normalize(&grammar, &accept(&[0])).unwrap_err(), GrammarError::GrammarCycle(RuleId(0)));

        let self_loop = Grammar::new(vec![rule(4, vec![vec![r(4)]])]).unwrap();
        assert_eq!(normalize(&self_loop, &accept(&[4])).unwrap_err(), GrammarError::GrammarCycle(RuleId(4)));
    }

    #[test]
    fn malformed_grammars_fail() {
        let undefined = Grammar::new(vec![rule(0, vec![vec![r(0), r(7)]])]).unwrap();
        assert_eq!(
            normalize(&undefined, &accept(&[0])).unwrap_err(),
            GrammarError::UndefinedRuleReference { from: Some(RuleId(0)), target: RuleId(7) }
        );

        let epsilon = Grammar::new(vec![
            Rule::new(RuleId(0), vec![SubRule::new(vec![t('a')]).unwrap(), SubRule::epsilon()]).unwrap(),
        ]).unwrap();
        assert_eq!(
            normalize(&epsilon, &accept(&[0])).unwrap_err(),
            GrammarError::UnsupportedEpsilonProduction(RuleId(0))
        );

        let fine = Grammar::new(vec![rule(0, vec![vec![t('a')]])]).unwrap();
        assert_eq!(normalize(&fine, &accept(&[])).unwrap_err(), GrammarError::EmptyAcceptSet);
        assert_eq!(
            normalize(&fine, &accept(&[3])).unwrap_err(),
            GrammarError::UndefinedRuleReference { from: None, target: RuleId(3) }
        );
    }

    #[test]
    fn normalization_is_deterministic() {
        let grammar = Grammar::new(vec![
            rule(0, vec![vec![r(1), t('+'), r(0)], vec![r(1)]]),
            rule(1, vec![vec![t('('), r(0), t(')')], vec![t('n')]]),
        ]).unwrap();
        let first = normalize(&grammar, &accept(&[0])).unwrap();
        let second = normalize(&grammar, &accept(&[0])).unwrap();
        assert_eq!(first.rules(), second.rules());
    }

    #[test]
    fn synthesized_ids_start_above_the_highest_original() {
        // 0: 10 "x" 10, 10: "a"
        let grammar = Grammar::new(vec![
            rule(0, vec![vec![r(10), t('x'), r(10)]]),
            rule(10, vec![vec![t('a')]]),
        ]).unwrap();
        let canonical = normalize(&grammar, &accept(&[0])).unwrap();

        // 11 -> 'x', 12 -> 11 10, 0 -> 10 12
        assert_eq!(tokens(&canonical, 11), vec!['x']);
        assert_eq!(binary(&canonical, 12), BTreeSet::from([(RuleId(11), RuleId(10))]));
        assert_eq!(binary(&canonical, 0), BTreeSet::from([(RuleId(10), RuleId(12))]));
        for id in 1..10 {
            assert_eq!(canonical.rules_for(RuleId(id)).count(), 0, "{}", id);
        }
        assert!(canonical.rules().iter()
            .filter(|rule| !rule.is_original())
            .all(|rule| rule.id() > RuleId(10)));
    }

    #[test]
    fn highest_rule_id() {
        let top = u32::MAX;

        // Nothing to synthesize, so the full id range is fine
        let plain = Grammar::new(vec![
            rule(top, vec![vec![t('a')], vec![r(0), r(0)]]),
            rule(0, vec![vec![t('b')]]),
        ]).unwrap();
        let canonical = normalize(&plain, &accept(&[top])).unwrap();
        assert_eq!(tokens(&canonical, top), vec!['a']);
        assert_eq!(binary(&canonical, top), BTreeSet::from([(RuleId(0), RuleId(0))]));

        // A terminal in a pair needs a new id and there is none
        let crowded = Grammar::new(vec![
            rule(top, vec![vec![t('a'), r(0)]]),
            rule(0, vec![vec![t('b')]]),
        ]).unwrap();
        assert_eq!(normalize(&crowded, &accept(&[top])).unwrap_err(), GrammarError::RuleIdsExhausted);
    }
}
