// Single-predicate row filtering

use crate::dataset::{cell_at, Dataset, Row, Table};
use crate::value::text_to_number;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a filter predicate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    #[default]
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    GtEq,
    #[serde(rename = "<=")]
    LtEq,
}

impl FilterOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::NotEq => "!=",
            FilterOperator::Gt => ">",
            FilterOperator::Lt => "<",
            FilterOperator::GtEq => ">=",
            FilterOperator::LtEq => "<=",
        }
    }

    pub fn all() -> &'static [FilterOperator] {
        &[
            FilterOperator::Eq,
            FilterOperator::Gt,
            FilterOperator::Lt,
            FilterOperator::GtEq,
            FilterOperator::LtEq,
            FilterOperator::NotEq,
        ]
    }

    /// The operator selecting exactly the rows this one rejects, for `=` and `!=`
    pub fn negated(&self) -> Option<FilterOperator> {
        match self {
            FilterOperator::Eq => Some(FilterOperator::NotEq),
            FilterOperator::NotEq => Some(FilterOperator::Eq),
            _ => None,
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for FilterOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterOperator::all()
            .iter()
            .find(|op| op.symbol() == s)
            .copied()
            .ok_or_else(|| format!("Unknown filter operator '{}'", s))
    }
}

/// `column == None` makes the predicate inert: it matches every row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterPredicate {
    pub column: Option<String>,
    pub operator: FilterOperator,
    pub value: String,
}

impl FilterPredicate {
    pub fn new(column: impl Into<String>, operator: FilterOperator, value: impl Into<String>) -> Self {
        FilterPredicate {
            column: Some(column.into()),
            operator,
            value: value.into(),
        }
    }

    pub fn inert() -> Self {
        FilterPredicate::default()
    }

    pub fn is_inert(&self) -> bool {
        self.column.as_deref().map_or(true, str::is_empty)
    }
}

/// Row counts before and after filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowCounts {
    pub shown: usize,
    pub total: usize,
}

impl fmt::Display for RowCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Showing {} of {} rows", self.shown, self.total)
    }
}

/// Rows of a dataset that passed a predicate, in dataset order.
#[derive(Debug, Clone, Default)]
pub struct FilteredRows {
    dataset: Dataset,
    indices: Vec<usize>,
}

impl FilteredRows {
    /// Every row of the dataset.
    pub fn all(dataset: &Dataset) -> Self {
        FilteredRows {
            dataset: dataset.clone(),
            indices: (0..dataset.len()).collect(),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn columns(&self) -> &[String] {
        self.dataset.columns()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn iter(&self) -> impl Iterator<Item = &Row> + '_ {
        let rows = self.dataset.rows();
        self.indices.iter().map(move |&i| &rows[i])
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn counts(&self) -> RowCounts {
        RowCounts {
            shown: self.len(),
            total: self.dataset.len(),
        }
    }

    /// Copy the selected rows out into a standalone table.
    pub fn to_table(&self) -> Table {
        Table::new(self.columns().to_vec(), self.iter().cloned().collect())
    }
}

/// Apply a predicate to a dataset.
///
/// An inert predicate returns every row. `=` and `!=` compare the raw cell
/// loosely against the value string; ordering operators coerce both sides to
/// numbers and reject the row when either side is not a number.
pub fn apply(dataset: &Dataset, predicate: &FilterPredicate) -> FilteredRows {
    let column = match predicate.column.as_deref() {
        Some(c) if !c.is_empty() => c,
        _ => return FilteredRows::all(dataset),
    };

    let col_idx = dataset.column_index(column);
    let threshold = text_to_number(&predicate.value);

    let indices = dataset
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            let cell = cell_at(row, col_idx);
            match predicate.operator {
                FilterOperator::Eq => cell.loose_eq(&predicate.value),
                FilterOperator::NotEq => !cell.loose_eq(&predicate.value),
                op => match (cell.to_number(), threshold) {
                    (Some(lhs), Some(rhs)) => compare(op, lhs, rhs),
                    _ => false,
                },
            }
        })
        .map(|(i, _)| i)
        .collect();

    FilteredRows {
        dataset: dataset.clone(),
        indices,
    }
}

fn compare(op: FilterOperator, lhs: f64, rhs: f64) -> bool {
    match op {
        FilterOperator::Gt => lhs > rhs,
        FilterOperator::Lt => lhs < rhs,
        FilterOperator::GtEq => lhs >= rhs,
        FilterOperator::LtEq => lhs <= rhs,
        FilterOperator::Eq => lhs == rhs,
        FilterOperator::NotEq => lhs != rhs,
    }
}
