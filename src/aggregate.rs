// Group-by aggregation over filtered rows

use crate::dataset::{cell_at, Table};
use crate::filter::FilteredRows;
use crate::value::{GroupKey, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Reduction applied to each group's measure values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationOp {
    /// Skip aggregation and chart the filtered rows directly
    #[default]
    None,
    Sum,
    Average,
    Count,
    Min,
    Max,
}

impl AggregationOp {
    pub fn name(&self) -> &'static str {
        match self {
            AggregationOp::None => "none",
            AggregationOp::Sum => "sum",
            AggregationOp::Average => "average",
            AggregationOp::Count => "count",
            AggregationOp::Min => "min",
            AggregationOp::Max => "max",
        }
    }

    pub fn all() -> &'static [AggregationOp] {
        &[
            AggregationOp::None,
            AggregationOp::Sum,
            AggregationOp::Average,
            AggregationOp::Count,
            AggregationOp::Min,
            AggregationOp::Max,
        ]
    }

    pub fn is_none(&self) -> bool {
        matches!(self, AggregationOp::None)
    }

    /// Upper-case label for chart titles; `None` has no label.
    pub fn label(&self) -> Option<String> {
        (!self.is_none()).then(|| self.name().to_uppercase())
    }

    fn reduce(&self, values: &[&Value]) -> f64 {
        let numbers = values.iter().map(|v| measure_number(v));
        match self {
            AggregationOp::None => f64::NAN,
            AggregationOp::Sum => numbers.sum(),
            // Denominator is the group size, non-numeric entries included
            AggregationOp::Average => numbers.sum::<f64>() / values.len() as f64,
            AggregationOp::Count => values.len() as f64,
            AggregationOp::Min => numbers.fold(f64::INFINITY, |acc, n| nan_or(acc, n, f64::min)),
            AggregationOp::Max => numbers.fold(f64::NEG_INFINITY, |acc, n| nan_or(acc, n, f64::max)),
        }
    }
}

impl fmt::Display for AggregationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AggregationOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "" | "none" => Ok(AggregationOp::None),
            "avg" => Ok(AggregationOp::Average),
            _ => AggregationOp::all()
                .iter()
                .find(|op| op.name() == lower)
                .copied()
                .ok_or_else(|| format!("Unknown aggregation '{}'", s)),
        }
    }
}

/// Group by `dimension`, reduce `measure` with `op`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationSpec {
    pub dimension: Option<String>,
    pub measure: Option<String>,
    pub op: AggregationOp,
}

impl AggregationSpec {
    pub fn new(dimension: impl Into<String>, measure: impl Into<String>, op: AggregationOp) -> Self {
        AggregationSpec {
            dimension: Some(dimension.into()),
            measure: Some(measure.into()),
            op,
        }
    }
}

/// Missing cells count as 0, other non-numeric values as NaN.
fn measure_number(value: &Value) -> f64 {
    match value {
        Value::Missing => 0.0,
        other => other.to_number().unwrap_or(f64::NAN),
    }
}

fn nan_or(acc: f64, n: f64, pick: fn(f64, f64) -> f64) -> f64 {
    if acc.is_nan() || n.is_nan() {
        f64::NAN
    } else {
        pick(acc, n)
    }
}

/// Aggregate filtered rows into a `[dimension, measure]` table.
///
/// Groups use the exact raw dimension value as key and appear in the order
/// their first row was seen. With `op == None`, or with either column unset,
/// the filtered rows are returned unchanged.
pub fn aggregate(rows: &FilteredRows, spec: &AggregationSpec) -> Table {
    let (dimension, measure) = match (&spec.dimension, &spec.measure) {
        (Some(d), Some(m)) if !spec.op.is_none() && !d.is_empty() && !m.is_empty() => (d, m),
        _ => return rows.to_table(),
    };

    let dataset = rows.dataset();
    let dim_idx = dataset.column_index(dimension);
    let measure_idx = dataset.column_index(measure);

    let mut groups: Vec<(&Value, Vec<&Value>)> = Vec::new();
    let mut slots: HashMap<GroupKey, usize> = HashMap::new();

    for row in rows.iter() {
        let key = cell_at(row, dim_idx);
        let slot = *slots.entry(key.group_key()).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(cell_at(row, measure_idx));
    }

    let out_rows = groups
        .into_iter()
        .map(|(key, values)| vec![key.clone(), Value::Number(spec.op.reduce(&values))])
        .collect();

    Table::new(vec![dimension.clone(), measure.clone()], out_rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::filter::{self, FilterOperator, FilterPredicate};

    fn make_data() -> Dataset {
        Dataset::new(
            vec!["city".to_string(), "sales".to_string()],
            vec![
                vec![Value::from("A"), Value::from(10.0)],
                vec![Value::from("B"), Value::from(5.0)],
                vec![Value::from("A"), Value::from(7.0)],
            ],
        )
    }

    fn sparse_data() -> Dataset {
        Dataset::new(
            vec!["g".to_string(), "v".to_string()],
            vec![
                vec![Value::from(2.0), Value::from(4.0)],
                vec![Value::from("x"), Value::from(1.0)],
                vec![Value::from(2.0), Value::Missing],
                vec![Value::Missing, Value::from(3.0)],
                vec![Value::from("2"), Value::from(6.0)],
                vec![Value::from("x"), Value::from("oops")],
            ],
        )
    }

    fn run(ds: &Dataset, op: AggregationOp) -> Table {
        aggregate(&FilteredRows::all(ds), &AggregationSpec::new(&ds.columns()[0], &ds.columns()[1], op))
    }

    fn values(table: &Table) -> Vec<f64> {
        table.rows.iter().map(|r| r[1].to_number().unwrap_or(f64::NAN)).collect()
    }

    #[test]
    fn test_sum_by_city() {
        let table = run(&make_data(), AggregationOp::Sum);
        assert_eq!(table.columns, vec!["city", "sales"]);
        assert_eq!(
            table.rows,
            vec![
                vec![Value::from("A"), Value::from(17.0)],
                vec![Value::from("B"), Value::from(5.0)],
            ]
        );
    }

    #[test]
    fn test_each_op() {
        let ds = make_data();
        assert_eq!(values(&run(&ds, AggregationOp::Average)), vec![8.5, 5.0]);
        assert_eq!(values(&run(&ds, AggregationOp::Count)), vec![2.0, 1.0]);
        assert_eq!(values(&run(&ds, AggregationOp::Min)), vec![7.0, 5.0]);
        assert_eq!(values(&run(&ds, AggregationOp::Max)), vec![10.0, 5.0]);
    }

    #[test]
    fn test_none_passes_rows_through() {
        let ds = make_data();
        let table = run(&ds, AggregationOp::None);
        assert_eq!(table.rows, ds.rows());
        assert_eq!(table.columns, ds.columns());

        let unset = AggregationSpec {
            dimension: Some("city".to_string()),
            measure: None,
            op: AggregationOp::Sum,
        };
        assert_eq!(aggregate(&FilteredRows::all(&ds), &unset).rows, ds.rows());
    }

    #[test]
    fn test_group_keys_are_strict_and_first_seen() {
        let table = run(&sparse_data(), AggregationOp::Count);
        let keys: Vec<Value> = table.rows.iter().map(|r| r[0].clone()).collect();
        assert_eq!(
            keys,
            vec![Value::from(2.0), Value::from("x"), Value::Missing, Value::from("2")]
        );
    }

    #[test]
    fn test_missing_measure_counts_as_zero() {
        let ds = sparse_data();
        let sum = values(&run(&ds, AggregationOp::Sum));
        assert_eq!(sum[0], 4.0);
        // Average keeps the missing cell in the denominator
        let avg = values(&run(&ds, AggregationOp::Average));
        assert_eq!(avg[0], 2.0);
        assert_eq!(values(&run(&ds, AggregationOp::Min))[0], 0.0);
    }

    #[test]
    fn test_non_numeric_measure_propagates_nan() {
        let ds = sparse_data();
        for op in [AggregationOp::Sum, AggregationOp::Average, AggregationOp::Min, AggregationOp::Max] {
            let table = run(&ds, op);
            // group "x" holds 1 and "oops"
            match &table.rows[1][1] {
                Value::Number(n) => assert!(n.is_nan(), "{} should be NaN", op),
                other => panic!("expected number, got {:?}", other),
            }
        }
        assert_eq!(values(&run(&ds, AggregationOp::Count))[1], 2.0);
    }

    #[test]
    fn test_count_sums_to_filtered_rows() {
        let ds = sparse_data();
        let filtered = filter::apply(&ds, &FilterPredicate::new("v", FilterOperator::NotEq, "3"));
        let table = aggregate(&filtered, &AggregationSpec::new("g", "v", AggregationOp::Count));
        let total: f64 = values(&table).iter().sum();
        assert_eq!(total as usize, filtered.len());
    }

    #[test]
    fn test_order_follows_filtered_rows() {
        let ds = Dataset::new(
            vec!["k".to_string(), "v".to_string()],
            vec![
                vec![Value::from("c"), Value::from(1.0)],
                vec![Value::from("a"), Value::from(2.0)],
                vec![Value::from("b"), Value::from(3.0)],
                vec![Value::from("a"), Value::from(4.0)],
            ],
        );
        let filtered = filter::apply(&ds, &FilterPredicate::new("v", FilterOperator::Gt, "1"));
        for op in AggregationOp::all().iter().filter(|op| !op.is_none()) {
            let table = aggregate(&filtered, &AggregationSpec::new("k", "v", *op));
            let keys: Vec<String> = table.rows.iter().map(|r| r[0].to_string()).collect();
            assert_eq!(keys, vec!["a", "b"]);
        }
    }

    #[test]
    fn test_empty_input() {
        let ds = make_data();
        let filtered = filter::apply(&ds, &FilterPredicate::new("sales", FilterOperator::Gt, "100"));
        let table = aggregate(&filtered, &AggregationSpec::new("city", "sales", AggregationOp::Sum));
        assert!(table.is_empty());
        assert_eq!(table.columns, vec!["city", "sales"]);
    }

    #[test]
    fn test_parse_op() {
        assert_eq!("SUM".parse::<AggregationOp>(), Ok(AggregationOp::Sum));
        assert_eq!("avg".parse::<AggregationOp>(), Ok(AggregationOp::Average));
        assert_eq!("".parse::<AggregationOp>(), Ok(AggregationOp::None));
        assert!("median".parse::<AggregationOp>().is_err());
        assert_eq!(AggregationOp::Max.label().as_deref(), Some("MAX"));
        assert_eq!(AggregationOp::None.label(), None);
    }
}
