/*
    This module decides membership with the CYK algorithm
*/

use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;

use log::trace;

use crate::canonical::CanonicalGrammar;
use crate::error_handling::ErrorType;
use crate::grammar::RuleId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    // There were no tokens to recognize
    InvalidInput,
}

impl ErrorType for RecognitionError {}

impl Display for RecognitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecognitionError::InvalidInput => write!(f, "Cannot recognize an empty input"),
        }
    }
}

/// For every span of the input, the rules that derive it.
///
/// Cells are indexed by start position and span length. A cell only ever
/// reads cells of strictly shorter spans, so the chart is filled one length
/// at a time.
#[derive(Debug)]
pub struct Chart {
    cells: Vec<Vec<HashSet<RuleId>>>,
}

impl Chart {
    pub fn fill<T: Clone + Eq + Hash>(grammar: &CanonicalGrammar<T>, tokens: &[T]) -> Result<Chart, RecognitionError> {
        let n = tokens.len();
        if n == 0 {
            return Err(RecognitionError::InvalidInput);
        }

        // cells[i][len - 1] covers [i, i + len)
        let mut cells: Vec<Vec<HashSet<RuleId>>> = tokens.iter()
            .map(|token| {
                let mut row = Vec::with_capacity(n);
                row.push(grammar.producers_of(token).iter().copied().collect());
                row
            })
            .collect();

        for len in 2..=n {
            for i in 0..=(n - len) {
                let mut cell = HashSet::new();
                for k in 1..len {
                    for &left in &cells[i][k - 1] {
                        for &right in &cells[i + k][len - k - 1] {
                            cell.extend(grammar.parents_of(left, right).iter().copied());
                        }
                    }
                }
                cells[i].push(cell);
            }
            trace!("filled spans of length {}", len);
        }

        Ok(Chart { cells })
    }

    pub fn input_len(&self) -> usize {
        self.cells.len()
    }

    // None for spans that are empty or run past the input
    pub fn derivable(&self, start: usize, len: usize) -> Option<&HashSet<RuleId>> {
        self.cells.get(start)?.get(len.checked_sub(1)?)
    }
}

/// True if one of the grammar's accept rules derives all of `tokens`.
pub fn recognize<T: Clone + Eq + Hash>(grammar: &CanonicalGrammar<T>, tokens: &[T]) -> Result<bool, RecognitionError> {
    let chart = Chart::fill(grammar, tokens)?;
    Ok(chart.derivable(0, chart.input_len())
        .is_some_and(|ids| ids.iter().any(|id| grammar.is_accept(*id))))
}
