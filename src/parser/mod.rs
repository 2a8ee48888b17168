/*
    This module parses grammar files

    A grammar file holds one rule per line, `name: sym sym | sym "lit"`,
    where bare words name other rules and quoted text is matched character
    by character. The first blank line ends the rules; every nonblank line
    after it is an input to check against the grammar.
*/

mod lexer;
mod verifier;

use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};

use crate::grammar::*;
use crate::error_handling::*;
use itertools::Itertools;
use lexer::*;
use log::debug;
use verifier::verify_rules;

#[derive(Debug)]
pub enum CompileErrorType {
    // A line which should contain a rule does not
    MissingColon,
    // A rule has multiple colons
    UnexpectedColon,
    // The user starts a rule line with something other than a nonterminal
    MissingNonterminal,
    // There is an unclosed quote
    UnmatchedQuote,
    // Nothing between two bars, or after the colon
    EmptyAlternative,
    // The same name is defined twice
    DuplicateRule(String),
    // An undefined name was used
    UndefinedNonterminal(String),
    // Somehow a full rewrite was parsed as a base alternative
    // This is a problem with the parser, not the grammar
    UnsplitRewrite,
    // A blank line got too deep into the parser
    // This is a problem with the parser, not the grammar
    UnexpectedBlankLine,
    // The rules parsed but do not form a grammar
    Malformed(GrammarError),
    // There was an issue with reading a file
    FileError(std::io::Error),
}

impl ErrorType for CompileErrorType {}

impl PartialEq for CompileErrorType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CompileErrorType::FileError(a), CompileErrorType::FileError(b)) => a.kind() == b.kind(),
            (CompileErrorType::DuplicateRule(a), CompileErrorType::DuplicateRule(b)) => a == b,
            (CompileErrorType::UndefinedNonterminal(a), CompileErrorType::UndefinedNonterminal(b)) => a == b,
            (CompileErrorType::Malformed(a), CompileErrorType::Malformed(b)) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl Display for CompileErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileErrorType::MissingColon => write!(f, "Expected `:` after nonterminal"),
            CompileErrorType::UnexpectedColon => write!(f, "Unexpected `:` encountered"),
            CompileErrorType::MissingNonterminal => write!(f, "Tried to define something other than a nonterminal"),
            CompileErrorType::UnmatchedQuote => write!(f, "Unmatched quotes"),
            CompileErrorType::EmptyAlternative => write!(f, "Alternative has no symbols"),
            CompileErrorType::DuplicateRule(name) => write!(f, "`{}` is defined more than once", name),
            CompileErrorType::UndefinedNonterminal(name) => write!(f, "Could not find definition for `{}`", name),
            CompileErrorType::UnsplitRewrite => write!(f, "Rewrite was not fully split (this is a problem with the parser, not the grammar)"),
            CompileErrorType::UnexpectedBlankLine => write!(f, "Blank line encountered in rule parser (this is a problem with the parser, not the grammar)"),
            CompileErrorType::Malformed(error) => write!(f, "{}", error),
            CompileErrorType::FileError(e) => write!(f, "File error: {}", e),
        }
    }
}

pub type CompileError = Error<CompileErrorType>;
pub type CompileErrors = Errors<CompileErrorType>;

fn io_error(error: std::io::Error, file: PathBuf) -> CompileError {
    CompileError {
        location: Location::file(file),
        error: CompileErrorType::FileError(error)
    }
}

pub type Result<T> = std::result::Result<T, CompileErrorType>;
pub type LineResult<T> = std::result::Result<T, CompileError>;
pub type FileResult<T> = std::result::Result<T, CompileErrors>;

// One element of an alternative, as written
#[derive(PartialEq, Debug, Clone)]
pub enum Item {
    Name(String),
    Literal(String),
}

pub type Alternative = Vec<Item>;
pub type Rewrite = Vec<Alternative>;

#[derive(PartialEq, Debug, Clone)]
pub struct TextRule {
    pub name: String,
    pub rewrite: Rewrite,
    pub location: Location
}

#[derive(PartialEq, Debug)]
pub struct GrammarFile {
    pub path: PathBuf,
    pub rules: Vec<TextRule>,
    pub inputs: Vec<String>,
}

/// A grammar together with the names its rules were written with. Rule ids
/// follow the order of definition, so the first rule in the file is `#0`.
#[derive(Debug)]
pub struct LoadedGrammar {
    grammar: Grammar<char>,
    names: Vec<String>,
    ids: HashMap<String, RuleId>,
}

impl LoadedGrammar {
    pub fn grammar(&self) -> &Grammar<char> {
        &self.grammar
    }

    pub fn start(&self) -> RuleId {
        RuleId(0)
    }

    pub fn id_of(&self, name: &str) -> Option<RuleId> {
        self.ids.get(name).copied()
    }

    pub fn name_of(&self, id: RuleId) -> Option<&str> {
        self.names.get(id.0 as usize).map(String::as_str)
    }

    pub fn resolve(&self, name: &str) -> Result<RuleId> {
        self.id_of(name).ok_or_else(|| CompileErrorType::UndefinedNonterminal(name.to_string()))
    }
}

fn parse_alternative(tokens: &[Token]) -> Result<Alternative> {
    if tokens.is_empty() {
        return Err(CompileErrorType::EmptyAlternative);
    }

    tokens.iter().map(|t| match t {
        Token::Colon => Err(CompileErrorType::UnexpectedColon),
        Token::Or => Err(CompileErrorType::UnsplitRewrite),
        Token::Nonterminal(s) => Ok(Item::Name(s.clone())),
        Token::Terminal(s) => Ok(Item::Literal(s.clone()))
    }).collect()
}

fn parse_rewrite(tokens: &[Token]) -> Result<Rewrite> {
    tokens.split(|t| *t == Token::Or).map(parse_alternative).collect()
}

fn parse_line(tokens: &[Token], location: Location) -> Result<TextRule> {
    // Try to get the name the rule is for. The match returns a result which
    // is then unwrapped with the ? operator
    let name = match tokens.get(0) {
        Some(Token::Nonterminal(s)) => Ok(s.clone()),
        Some(_) => Err(CompileErrorType::MissingNonterminal),
        None => Err(CompileErrorType::UnexpectedBlankLine)
    }?;

    if tokens.get(1) != Some(&Token::Colon) {
        return Err(CompileErrorType::MissingColon)
    }

    let rewrite = parse_rewrite(&tokens[2..])?;

    return Ok(TextRule {
        name,
        rewrite,
        location
    });
}

fn parse_lex_line(line: &str, location: Location) -> LineResult<TextRule> {
    lexer::lex_line(line)
        .and_then(|lexed_line| parse_line(&lexed_line, location.clone()))
        .map_err(|error| CompileError { location: location, error })
}

fn is_rule_line(line: &str) -> bool {
    !line.is_empty() && !line.starts_with(';')
}

fn parse_rule_lines<'a>(lines: impl Iterator<Item = (usize, &'a str)>, file: &Path) -> FileResult<Vec<TextRule>> {
    let (rules, errors): (Vec<_>, Vec<_>) = lines
        .map(|(num, line)| parse_lex_line(line, Location {
            file: file.to_path_buf(),
            line: num
        }))
        .partition_result();

    if errors.len() > 0 {
        return Err(errors);
    }

    Ok(rules)
}

// Every character of a literal is its own terminal. An alternative holding
// nothing but empty literals is an epsilon alternative.
fn compile_alternative(alternative: &Alternative, ids: &HashMap<String, RuleId>) -> Result<SubRule<char>> {
    let mut symbols = Vec::new();
    for item in alternative {
        match item {
            Item::Name(name) => {
                let id = ids.get(name).ok_or_else(|| CompileErrorType::UndefinedNonterminal(name.clone()))?;
                symbols.push(Symbol::NonTerminalRef(*id));
            }
            Item::Literal(text) => symbols.extend(text.chars().map(Symbol::Terminal)),
        }
    }

    if symbols.is_empty() {
        return Ok(SubRule::epsilon());
    }
    SubRule::new(symbols).map_err(CompileErrorType::Malformed)
}

fn compile_rule(rule: &TextRule, id: RuleId, ids: &HashMap<String, RuleId>) -> LineResult<Rule<char>> {
    rule.rewrite.iter()
        .map(|alternative| compile_alternative(alternative, ids))
        .collect::<Result<Vec<_>>>()
        .and_then(|alternatives| Rule::new(id, alternatives).map_err(CompileErrorType::Malformed))
        .map_err(|error| CompileError { location: rule.location.clone(), error })
}

impl GrammarFile {
    // Name of the first rule, the default start and accept rule
    pub fn start(&self) -> Option<&str> {
        self.rules.first().map(|rule| rule.name.as_str())
    }

    /// Replaces rules with the ones written in `lines`, matching by name.
    /// Rules with new names are added after the existing ones.
    pub fn override_rules(&mut self, lines: &[String]) -> FileResult<()> {
        let overrides = parse_rule_lines(
            lines.iter().enumerate().map(|(num, line)| (num + 1, line.as_str())),
            Path::new("--rule")
        )?;

        for rule in overrides {
            match self.rules.iter_mut().find(|existing| existing.name == rule.name) {
                Some(existing) => {
                    debug!("overriding rule `{}`", rule.name);
                    *existing = rule;
                }
                None => {
                    debug!("adding rule `{}`", rule.name);
                    self.rules.push(rule);
                }
            }
        }

        Ok(())
    }

    pub fn compile(&self) -> FileResult<LoadedGrammar> {
        verify_rules(&self.rules)?;

        let names = self.rules.iter().map(|rule| rule.name.clone()).collect_vec();
        let ids: HashMap<String, RuleId> = names.iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), RuleId(index as u32)))
            .collect();

        let (rules, errors): (Vec<_>, Vec<_>) = self.rules.iter()
            .enumerate()
            .map(|(index, rule)| compile_rule(rule, RuleId(index as u32), &ids))
            .partition_result();
        if errors.len() > 0 {
            return Err(errors);
        }

        let grammar = Grammar::new(rules).map_err(|error| vec![CompileError {
            location: Location::file(self.path.clone()),
            error: CompileErrorType::Malformed(error)
        }])?;
        debug!("compiled {} rules from {}", grammar.len(), self.path.display());

        Ok(LoadedGrammar { grammar, names, ids })
    }
}

pub fn parse_str(text: &str, path: &Path) -> FileResult<GrammarFile> {
    let mut lines = text.lines()
        .enumerate()
        .map(|(num, line)| (num + 1, line.trim_end()));

    // Blank lines before the first rule do not end the rule section
    let rule_lines = lines.by_ref()
        .skip_while(|(_, line)| line.is_empty())
        .take_while(|(_, line)| !line.is_empty())
        .filter(|(_, line)| is_rule_line(line))
        .collect_vec();
    let inputs = lines
        .map(|(_, line)| line)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect_vec();

    let rules = parse_rule_lines(rule_lines.into_iter(), path)?;

    return Ok(GrammarFile {
        path: path.to_path_buf(),
        rules,
        inputs
    });
}

pub fn parse_file(path: &Path) -> FileResult<GrammarFile> {
    let text = std::fs::read_to_string(path).map_err(|e| vec![io_error(e, path.to_path_buf())])?;
    parse_str(&text, path)
}
