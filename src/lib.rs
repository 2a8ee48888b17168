pub mod canonical;
pub mod error_handling;
pub mod generator;
pub mod grammar;
pub mod normalizer;
pub mod parser;
pub mod recognizer;

pub use canonical::{CanonicalGrammar, CanonicalKind, CanonicalRule};
pub use grammar::{Grammar, GrammarError, Rule, RuleId, SubRule, Symbol};
pub use normalizer::{normalize, NormalizationError};
pub use recognizer::{recognize, RecognitionError};
