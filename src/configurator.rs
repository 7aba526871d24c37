// Chart configuration state machine
//
// Owns the loaded dataset, the filter predicate and its debounced value, the
// chart selections and the generate timer. Time never advances on its own:
// callers pass `now` into every time-dependent operation and call `tick`
// when `next_deadline` comes due.

use crate::aggregate::{aggregate, AggregationOp, AggregationSpec};
use crate::chart::{ChartSpec, ChartType};
use crate::dashboard::{ChartStore, Dashboard};
use crate::dataset::{cell_at, Dataset};
use crate::debounce::Debouncer;
use crate::error::ChartError;
use crate::filter::{self, FilterOperator, FilterPredicate, FilteredRows, RowCounts};
use crate::settings::Settings;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Coarse lifecycle of the configurator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No dataset loaded
    Idle,
    /// Dataset present, selections being adjusted
    Configuring,
    /// Generate requested, waiting out the busy interval
    Computing,
    /// A chart is materialized and ready to show
    Generated,
}

/// Time and sampling parameters of the configurator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub debounce: Duration,
    pub generate_delay: Duration,
    pub sample_rows: usize,
}

impl Default for Timing {
    fn default() -> Self {
        Timing::from(&Settings::default())
    }
}

impl From<&Settings> for Timing {
    fn from(settings: &Settings) -> Self {
        Timing {
            debounce: settings.debounce(),
            generate_delay: settings.generate_delay(),
            sample_rows: settings.validation_sample_rows,
        }
    }
}

#[derive(Debug, Clone)]
enum ChartState {
    Empty,
    Computing { chart: ChartSpec, ready_at: Instant },
    Ready(ChartSpec),
}

#[derive(Debug, Clone)]
pub struct ChartConfigurator {
    timing: Timing,
    dataset: Dataset,
    source_name: Option<String>,
    parsing: bool,

    /// Committed predicate; its value is the debounced one
    predicate: FilterPredicate,
    value_input: String,
    pending_value: Debouncer<String>,
    filtered: FilteredRows,
    filter_active: bool,

    chart_type: ChartType,
    x: Option<String>,
    y: Option<String>,
    aggregation: AggregationOp,
    y_error: Option<String>,
    chart: ChartState,
}

impl Default for ChartConfigurator {
    fn default() -> Self {
        ChartConfigurator::new(Timing::default())
    }
}

impl ChartConfigurator {
    pub fn new(timing: Timing) -> Self {
        ChartConfigurator {
            timing,
            dataset: Dataset::empty(),
            source_name: None,
            parsing: false,
            predicate: FilterPredicate::inert(),
            value_input: String::new(),
            pending_value: Debouncer::new(timing.debounce),
            filtered: FilteredRows::default(),
            filter_active: false,
            chart_type: ChartType::default(),
            x: None,
            y: None,
            aggregation: AggregationOp::default(),
            y_error: None,
            chart: ChartState::Empty,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        ChartConfigurator::new(Timing::from(settings))
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn phase(&self) -> Phase {
        match &self.chart {
            _ if self.dataset.is_empty() => Phase::Idle,
            ChartState::Empty => Phase::Configuring,
            ChartState::Computing { .. } => Phase::Computing,
            ChartState::Ready(_) => Phase::Generated,
        }
    }

    // =========================================================================
    // Ingestion boundary
    // =========================================================================

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn columns(&self) -> &[String] {
        self.dataset.columns()
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    pub fn is_parsing(&self) -> bool {
        self.parsing
    }

    /// While parsing, nothing reads the dataset: filtering is deferred and
    /// generate is refused.
    pub fn set_parsing(&mut self, parsing: bool) {
        if self.parsing != parsing {
            debug!(parsing, "Parsing state changed");
        }
        self.parsing = parsing;
        if !parsing {
            self.refilter();
        }
    }

    /// Replace the dataset. Every derived selection resets; with at least two
    /// columns the axes default to the first two.
    pub fn load_dataset(&mut self, dataset: Dataset, source_name: Option<String>) {
        info!(
            rows = dataset.len(),
            columns = dataset.columns().len(),
            source = source_name.as_deref().unwrap_or(""),
            "Dataset loaded"
        );
        self.parsing = false;
        self.dataset = dataset;
        self.source_name = source_name;
        self.reset_selections();

        if let [first, second, ..] = self.dataset.columns() {
            self.x = Some(first.clone());
            self.y = Some(second.clone());
        }

        self.validate_y();
        self.refilter();
    }

    pub fn clear_dataset(&mut self) {
        info!("Dataset cleared");
        self.dataset = Dataset::empty();
        self.source_name = None;
        self.reset_selections();
        self.refilter();
    }

    fn reset_selections(&mut self) {
        self.predicate = FilterPredicate::inert();
        self.value_input.clear();
        self.pending_value.cancel();
        self.filter_active = false;
        self.chart_type = ChartType::default();
        self.x = None;
        self.y = None;
        self.aggregation = AggregationOp::default();
        self.y_error = None;
        self.chart = ChartState::Empty;
    }

    // =========================================================================
    // Filter
    // =========================================================================

    /// The committed predicate, with the debounced value
    pub fn filter(&self) -> &FilterPredicate {
        &self.predicate
    }

    /// The filter value as last typed, possibly not applied yet
    pub fn filter_input(&self) -> &str {
        &self.value_input
    }

    /// True once a filter column is selected, until the filter is cleared
    pub fn is_filtered(&self) -> bool {
        self.filter_active
    }

    pub fn filtered_rows(&self) -> &FilteredRows {
        &self.filtered
    }

    pub fn row_counts(&self) -> RowCounts {
        self.filtered.counts()
    }

    /// Select the filter column. `None` or `""` makes the predicate inert.
    pub fn set_filter_column(&mut self, column: Option<&str>) -> Result<(), ChartError> {
        match column {
            Some(c) if !c.is_empty() => {
                self.require_column(c)?;
                self.predicate.column = Some(c.to_string());
                self.filter_active = true;
            }
            _ => {
                self.predicate.column = None;
                self.filter_active = false;
            }
        }
        self.refilter();
        Ok(())
    }

    pub fn set_filter_operator(&mut self, operator: FilterOperator) {
        self.predicate.operator = operator;
        self.refilter();
    }

    /// Record an edit of the filter value. It takes effect once no further
    /// edit arrives within the debounce window.
    pub fn set_filter_value(&mut self, value: impl Into<String>, now: Instant) {
        let value = value.into();
        self.value_input = value.clone();
        self.pending_value.push(value, now);
    }

    /// Reset column, operator and value at once.
    pub fn clear_filter(&mut self) {
        self.predicate = FilterPredicate::inert();
        self.value_input.clear();
        self.pending_value.cancel();
        self.filter_active = false;
        self.refilter();
    }

    fn refilter(&mut self) {
        if self.parsing {
            return;
        }
        self.filtered = filter::apply(&self.dataset, &self.predicate);
        if self.filter_active {
            debug!(
                shown = self.filtered.len(),
                total = self.dataset.len(),
                "Filter applied"
            );
        }
    }

    // =========================================================================
    // Timers
    // =========================================================================

    /// Advance timers to `now`. Returns whether any state changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = false;

        if !self.parsing {
            if let Some(value) = self.pending_value.poll(now) {
                if value != self.predicate.value {
                    self.predicate.value = value;
                    self.refilter();
                    changed = true;
                }
            }
        }

        if let ChartState::Computing { ready_at, .. } = &self.chart {
            if *ready_at <= now {
                if let ChartState::Computing { chart, .. } =
                    std::mem::replace(&mut self.chart, ChartState::Empty)
                {
                    info!(chart = %chart.title(), "Chart ready");
                    self.chart = ChartState::Ready(chart);
                    changed = true;
                }
            }
        }

        changed
    }

    /// Earliest instant at which `tick` has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        let chart_deadline = match &self.chart {
            ChartState::Computing { ready_at, .. } => Some(*ready_at),
            _ => None,
        };
        match (self.pending_value.deadline(), chart_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // =========================================================================
    // Chart selections
    // =========================================================================

    pub fn chart_type(&self) -> ChartType {
        self.chart_type
    }

    pub fn x_axis(&self) -> Option<&str> {
        self.x.as_deref()
    }

    pub fn y_axis(&self) -> Option<&str> {
        self.y.as_deref()
    }

    pub fn aggregation(&self) -> AggregationOp {
        self.aggregation
    }

    /// Field-level message when the y-axis column is not numeric
    pub fn y_axis_error(&self) -> Option<&str> {
        self.y_error.as_deref()
    }

    pub fn set_chart_type(&mut self, chart_type: ChartType) {
        if self.chart_type != chart_type {
            self.chart_type = chart_type;
            self.discard_chart();
        }
    }

    pub fn set_x_axis(&mut self, column: Option<&str>) -> Result<(), ChartError> {
        let column = self.checked_axis(column)?;
        if self.x != column {
            self.x = column;
            self.discard_chart();
        }
        Ok(())
    }

    pub fn set_y_axis(&mut self, column: Option<&str>) -> Result<(), ChartError> {
        let column = self.checked_axis(column)?;
        if self.y != column {
            self.y = column;
            self.discard_chart();
        }
        self.validate_y();
        Ok(())
    }

    pub fn set_aggregation(&mut self, op: AggregationOp) {
        if self.aggregation != op {
            self.aggregation = op;
            self.discard_chart();
        }
    }

    fn checked_axis(&self, column: Option<&str>) -> Result<Option<String>, ChartError> {
        match column {
            Some(c) if !c.is_empty() => {
                self.require_column(c)?;
                Ok(Some(c.to_string()))
            }
            _ => Ok(None),
        }
    }

    fn require_column(&self, column: &str) -> Result<(), ChartError> {
        if self.dataset.has_column(column) {
            Ok(())
        } else {
            Err(ChartError::UnknownColumn {
                column: column.to_string(),
                available: self.dataset.columns().join(", "),
            })
        }
    }

    fn discard_chart(&mut self) {
        if !matches!(self.chart, ChartState::Empty) {
            debug!("Selection changed, discarding materialized chart");
            self.chart = ChartState::Empty;
        }
    }

    fn validate_y(&mut self) {
        self.y_error = match &self.y {
            Some(y) if !self.dataset.is_empty() => {
                check_numeric_sample(&self.dataset, y, self.timing.sample_rows).err()
            }
            _ => None,
        };
        if let Some(message) = &self.y_error {
            warn!("{}", message);
        }
    }

    // =========================================================================
    // Generate and save
    // =========================================================================

    /// Ok when generate would be accepted right now
    pub fn can_generate(&self) -> Result<(), ChartError> {
        if self.parsing {
            return Err(ChartError::ParsingInProgress);
        }
        if self.dataset.is_empty() {
            return Err(ChartError::NoData);
        }
        if self.filtered.is_empty() {
            return Err(ChartError::NoRows);
        }
        if self.x.is_none() || self.y.is_none() {
            return Err(ChartError::MissingAxis);
        }
        if let Some(message) = &self.y_error {
            return Err(ChartError::InvalidYAxis(message.clone()));
        }
        Ok(())
    }

    /// Lock in the current selections, materialize the series and start the
    /// busy interval. A request while one is pending replaces it and restarts
    /// the interval.
    pub fn generate(&mut self, now: Instant) -> Result<(), ChartError> {
        self.can_generate()?;
        let (x, y) = match (&self.x, &self.y) {
            (Some(x), Some(y)) => (x.clone(), y.clone()),
            _ => return Err(ChartError::MissingAxis),
        };

        let spec = AggregationSpec {
            dimension: Some(x.clone()),
            measure: Some(y.clone()),
            op: self.aggregation,
        };
        let chart = ChartSpec {
            chart_type: self.chart_type,
            x,
            y,
            aggregation: self.aggregation,
            data: aggregate(&self.filtered, &spec),
        };

        if matches!(self.chart, ChartState::Computing { .. }) {
            debug!("Restarting pending chart computation");
        }
        info!(chart = %chart.title(), points = chart.data.len(), "Chart generated");
        self.chart = ChartState::Computing {
            chart,
            ready_at: now + self.timing.generate_delay,
        };
        Ok(())
    }

    pub fn is_computing(&self) -> bool {
        matches!(self.chart, ChartState::Computing { .. })
    }

    /// The materialized chart, once its busy interval has elapsed
    pub fn chart(&self) -> Option<&ChartSpec> {
        match &self.chart {
            ChartState::Ready(chart) => Some(chart),
            _ => None,
        }
    }

    /// Save the generated chart to the dashboard, returning its id.
    pub fn add_to_dashboard<S: ChartStore>(
        &self,
        dashboard: &mut Dashboard<S>,
    ) -> Result<i64, ChartError> {
        let chart = self.chart().ok_or(ChartError::NotGenerated)?;
        let saved = dashboard.add_chart(chart.clone())?;
        Ok(saved.id)
    }
}

/// Check the first `sample` rows of `column` for values that are not numbers.
/// Blank and missing cells are skipped.
pub fn check_numeric_sample(dataset: &Dataset, column: &str, sample: usize) -> Result<(), String> {
    let idx = dataset.column_index(column);
    let non_numeric = dataset
        .rows()
        .iter()
        .take(sample)
        .map(|row| cell_at(row, idx))
        .filter(|v| !v.is_blank())
        .any(|v| v.to_number().is_none());

    if non_numeric {
        Err(format!("Y-axis column '{}' must be numeric.", column))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::{MemoryStore, DEFAULT_CAPACITY};
    use crate::error::DashboardError;
    use crate::value::Value;

    fn timing() -> Timing {
        Timing {
            debounce: Duration::from_millis(500),
            generate_delay: Duration::from_millis(400),
            sample_rows: 20,
        }
    }

    fn sales() -> Dataset {
        Dataset::new(
            vec!["city".to_string(), "sales".to_string()],
            vec![
                vec![Value::from("A"), Value::from(10.0)],
                vec![Value::from("B"), Value::from(5.0)],
                vec![Value::from("A"), Value::from(7.0)],
            ],
        )
    }

    fn loaded() -> ChartConfigurator {
        let mut c = ChartConfigurator::new(timing());
        c.load_dataset(sales(), Some("sales.csv".to_string()));
        c
    }

    /// Drive timers until nothing is pending.
    fn settle(c: &mut ChartConfigurator, mut now: Instant) -> Instant {
        while let Some(deadline) = c.next_deadline() {
            now = now.max(deadline);
            c.tick(now);
        }
        now
    }

    fn generated(c: &mut ChartConfigurator, now: Instant) -> ChartSpec {
        let now = settle(c, now);
        c.generate(now).unwrap();
        settle(c, now);
        c.chart().cloned().unwrap()
    }

    // Lifecycle

    #[test]
    fn test_idle_until_dataset_loaded() {
        let c = ChartConfigurator::new(timing());
        assert_eq!(c.phase(), Phase::Idle);
        assert!(matches!(c.can_generate(), Err(ChartError::NoData)));
    }

    #[test]
    fn test_axes_default_to_first_two_columns() {
        let c = loaded();
        assert_eq!(c.phase(), Phase::Configuring);
        assert_eq!(c.x_axis(), Some("city"));
        assert_eq!(c.y_axis(), Some("sales"));
        assert_eq!(c.row_counts(), RowCounts { shown: 3, total: 3 });
    }

    #[test]
    fn test_single_column_dataset_has_no_default_axes() {
        let mut c = ChartConfigurator::new(timing());
        c.load_dataset(
            Dataset::new(vec!["only".to_string()], vec![vec![Value::from(1.0)]]),
            None,
        );
        assert_eq!(c.x_axis(), None);
        assert!(matches!(c.can_generate(), Err(ChartError::MissingAxis)));
    }

    // Scenario D

    #[test]
    fn test_replacing_dataset_resets_everything() {
        let now = Instant::now();
        let mut c = loaded();
        c.set_filter_column(Some("sales")).unwrap();
        c.set_filter_operator(FilterOperator::Gt);
        c.set_filter_value("6", now);
        c.set_aggregation(AggregationOp::Sum);
        c.set_chart_type(ChartType::Pie);
        generated(&mut c, now);
        assert_eq!(c.phase(), Phase::Generated);

        let replacement = Dataset::new(
            vec!["month".to_string(), "revenue".to_string(), "units".to_string()],
            vec![vec![Value::from("Jan"), Value::from(100.0), Value::from(3.0)]],
        );
        c.load_dataset(replacement, Some("other.csv".to_string()));

        assert_eq!(c.phase(), Phase::Configuring);
        assert!(c.chart().is_none());
        assert!(c.filter().is_inert());
        assert!(!c.is_filtered());
        assert_eq!(c.filter().operator, FilterOperator::Eq);
        assert_eq!(c.filter_input(), "");
        assert_eq!(c.next_deadline(), None);
        assert_eq!(c.x_axis(), Some("month"));
        assert_eq!(c.y_axis(), Some("revenue"));
        assert_eq!(c.aggregation(), AggregationOp::None);
        assert_eq!(c.chart_type(), ChartType::Bar);
        assert_eq!(c.row_counts(), RowCounts { shown: 1, total: 1 });
    }

    #[test]
    fn test_clearing_dataset_returns_to_idle() {
        let now = Instant::now();
        let mut c = loaded();
        generated(&mut c, now);
        c.clear_dataset();
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.x_axis(), None);
        assert_eq!(c.y_axis(), None);
        assert_eq!(c.source_name(), None);
        assert_eq!(c.row_counts(), RowCounts { shown: 0, total: 0 });
    }

    // Filter

    #[test]
    fn test_filter_value_is_debounced() {
        let t0 = Instant::now();
        let mut c = loaded();
        c.set_filter_column(Some("sales")).unwrap();
        c.set_filter_operator(FilterOperator::Gt);

        c.set_filter_value("1", t0);
        c.set_filter_value("100", t0 + Duration::from_millis(200));
        c.set_filter_value("6", t0 + Duration::from_millis(400));
        assert_eq!(c.filter_input(), "6");

        // Superseded deadlines do nothing
        assert!(!c.tick(t0 + Duration::from_millis(700)));
        assert_eq!(c.filter().value, "");
        assert_eq!(c.next_deadline(), Some(t0 + Duration::from_millis(900)));

        assert!(c.tick(t0 + Duration::from_millis(900)));
        assert_eq!(c.filter().value, "6");
        assert_eq!(c.row_counts().to_string(), "Showing 2 of 3 rows");
    }

    #[test]
    fn test_scenario_b_filtered_rows() {
        let now = Instant::now();
        let mut c = loaded();
        c.set_filter_column(Some("sales")).unwrap();
        c.set_filter_operator(FilterOperator::Gt);
        c.set_filter_value("6", now);
        settle(&mut c, now);

        let rows: Vec<_> = c.filtered_rows().iter().cloned().collect();
        assert_eq!(
            rows,
            vec![
                vec![Value::from("A"), Value::from(10.0)],
                vec![Value::from("A"), Value::from(7.0)],
            ]
        );
    }

    #[test]
    fn test_filter_flag_tracks_column_selection() {
        let mut c = loaded();
        assert!(!c.is_filtered());

        // Selected but matching everything still counts as filtered
        c.set_filter_column(Some("city")).unwrap();
        c.set_filter_operator(FilterOperator::NotEq);
        assert!(c.is_filtered());
        assert_eq!(c.row_counts().shown, 3);

        c.set_filter_column(None).unwrap();
        assert!(!c.is_filtered());

        c.set_filter_column(Some("city")).unwrap();
        c.clear_filter();
        assert!(!c.is_filtered());
        assert_eq!(c.filter().operator, FilterOperator::Eq);
    }

    #[test]
    fn test_unknown_filter_column_is_rejected() {
        let mut c = loaded();
        let err = c.set_filter_column(Some("region")).unwrap_err();
        assert!(matches!(err, ChartError::UnknownColumn { .. }));
        assert!(err.to_string().contains("Available columns: city, sales"));
        assert!(!c.is_filtered());
    }

    #[test]
    fn test_no_matching_rows_blocks_generate() {
        let now = Instant::now();
        let mut c = loaded();
        c.set_filter_column(Some("city")).unwrap();
        c.set_filter_value("Z", now);
        settle(&mut c, now);
        assert_eq!(c.row_counts(), RowCounts { shown: 0, total: 3 });
        assert!(matches!(c.generate(now), Err(ChartError::NoRows)));
    }

    // Validation

    #[test]
    fn test_scenario_c_non_numeric_y_axis() {
        let mut c = ChartConfigurator::new(timing());
        c.load_dataset(
            Dataset::new(
                vec!["k".to_string(), "v".to_string()],
                vec![
                    vec![Value::from("a"), Value::from("10")],
                    vec![Value::from("b"), Value::from("x")],
                    vec![Value::from("c"), Value::from("30")],
                ],
            ),
            None,
        );
        assert_eq!(c.y_axis_error(), Some("Y-axis column 'v' must be numeric."));
        let err = c.generate(Instant::now()).unwrap_err();
        assert!(matches!(err, ChartError::InvalidYAxis(_)));
        assert_eq!(c.phase(), Phase::Configuring);

        // Switching the axis clears the error without touching other selections
        c.set_aggregation(AggregationOp::Count);
        c.set_y_axis(Some("k")).unwrap();
        assert!(c.y_axis_error().is_some());
        c.set_y_axis(None).unwrap();
        assert_eq!(c.y_axis_error(), None);
        assert_eq!(c.aggregation(), AggregationOp::Count);
    }

    #[test]
    fn test_validation_skips_blanks_and_samples_twenty_rows() {
        let mut rows = vec![
            vec![Value::from("a"), Value::Missing],
            vec![Value::from("b"), Value::from("  ")],
            vec![Value::from("c"), Value::from(" 4 ")],
        ];
        for i in 0..17 {
            rows.push(vec![Value::from("d"), Value::from(i as f64)]);
        }
        // 21st row is outside the sample window
        rows.push(vec![Value::from("e"), Value::from("oops")]);
        let ds = Dataset::new(vec!["k".to_string(), "v".to_string()], rows);

        assert_eq!(check_numeric_sample(&ds, "v", 20), Ok(()));
        assert!(check_numeric_sample(&ds, "v", 21).is_err());
    }

    #[test]
    fn test_validation_ignores_filter() {
        let now = Instant::now();
        let mut c = ChartConfigurator::new(timing());
        c.load_dataset(
            Dataset::new(
                vec!["k".to_string(), "v".to_string()],
                vec![
                    vec![Value::from("a"), Value::from("bad")],
                    vec![Value::from("b"), Value::from(2.0)],
                ],
            ),
            None,
        );
        c.set_filter_column(Some("k")).unwrap();
        c.set_filter_value("b", now);
        settle(&mut c, now);
        assert_eq!(c.row_counts().shown, 1);
        assert!(c.y_axis_error().is_some());
    }

    // Generate

    #[test]
    fn test_generate_waits_for_busy_interval() {
        let t0 = Instant::now();
        let mut c = loaded();
        c.set_aggregation(AggregationOp::Sum);
        c.generate(t0).unwrap();

        assert_eq!(c.phase(), Phase::Computing);
        assert!(c.chart().is_none());
        assert!(!c.tick(t0 + Duration::from_millis(399)));
        assert!(c.tick(t0 + Duration::from_millis(400)));
        assert_eq!(c.phase(), Phase::Generated);

        let chart = c.chart().unwrap();
        assert_eq!(chart.chart_type, ChartType::Bar);
        assert_eq!(chart.aggregation, AggregationOp::Sum);
        assert_eq!(
            chart.data.rows,
            vec![
                vec![Value::from("A"), Value::from(17.0)],
                vec![Value::from("B"), Value::from(5.0)],
            ]
        );
    }

    #[test]
    fn test_second_generate_restarts_delay() {
        let t0 = Instant::now();
        let mut c = loaded();
        c.generate(t0).unwrap();
        c.generate(t0 + Duration::from_millis(300)).unwrap();
        assert!(!c.tick(t0 + Duration::from_millis(400)));
        assert!(c.is_computing());
        assert_eq!(c.next_deadline(), Some(t0 + Duration::from_millis(700)));
        assert!(c.tick(t0 + Duration::from_millis(700)));
        assert!(c.chart().is_some());
    }

    #[test]
    fn test_generate_is_idempotent() {
        let now = Instant::now();
        let mut c = loaded();
        c.set_aggregation(AggregationOp::Average);
        let first = generated(&mut c, now);
        let second = generated(&mut c, now + Duration::from_secs(1));
        assert_eq!(first, second);
    }

    #[test]
    fn test_chart_is_frozen_against_filter_changes() {
        let now = Instant::now();
        let mut c = loaded();
        let chart = generated(&mut c, now);

        c.set_filter_column(Some("city")).unwrap();
        c.set_filter_value("B", now);
        settle(&mut c, now);
        assert_eq!(c.row_counts().shown, 1);
        assert_eq!(c.chart(), Some(&chart));
        assert_eq!(chart.data.len(), 3);
    }

    #[test]
    fn test_selection_change_discards_chart() {
        let now = Instant::now();
        let mut c = loaded();
        generated(&mut c, now);

        c.set_chart_type(ChartType::Bar);
        assert_eq!(c.phase(), Phase::Generated);

        c.set_chart_type(ChartType::Line);
        assert_eq!(c.phase(), Phase::Configuring);
        assert!(c.chart().is_none());

        generated(&mut c, now);
        c.set_x_axis(Some("sales")).unwrap();
        assert_eq!(c.phase(), Phase::Configuring);
    }

    #[test]
    fn test_parsing_blocks_generate_and_filtering() {
        let now = Instant::now();
        let mut c = loaded();
        c.set_filter_column(Some("city")).unwrap();
        c.set_parsing(true);
        assert!(matches!(c.generate(now), Err(ChartError::ParsingInProgress)));

        c.set_filter_value("A", now);
        c.tick(now + Duration::from_secs(1));
        assert_eq!(c.filter().value, "");

        c.set_parsing(false);
        c.tick(now + Duration::from_secs(1));
        assert_eq!(c.filter().value, "A");
        assert_eq!(c.row_counts().shown, 2);
    }

    // Dashboard

    #[test]
    fn test_add_requires_generated_chart() {
        let now = Instant::now();
        let mut dashboard = Dashboard::open(MemoryStore::new(), DEFAULT_CAPACITY).unwrap();
        let mut c = loaded();
        assert!(matches!(c.add_to_dashboard(&mut dashboard), Err(ChartError::NotGenerated)));

        c.generate(now).unwrap();
        assert!(matches!(c.add_to_dashboard(&mut dashboard), Err(ChartError::NotGenerated)));

        settle(&mut c, now);
        let id = c.add_to_dashboard(&mut dashboard).unwrap();
        assert_eq!(dashboard.list()[0].id, id);
        assert_eq!(Some(&dashboard.list()[0].chart), c.chart());
    }

    #[test]
    fn test_add_to_full_dashboard_reports_capacity() {
        let now = Instant::now();
        let mut dashboard = Dashboard::open(MemoryStore::new(), DEFAULT_CAPACITY).unwrap();
        let mut c = loaded();
        generated(&mut c, now);
        for _ in 0..DEFAULT_CAPACITY {
            c.add_to_dashboard(&mut dashboard).unwrap();
        }

        let err = c.add_to_dashboard(&mut dashboard).unwrap_err();
        assert!(matches!(
            err,
            ChartError::Dashboard(DashboardError::CapacityExceeded { capacity: 10 })
        ));
        assert_eq!(err.to_string(), "Maximum 10 charts. Remove one first.");
        assert_eq!(dashboard.len(), DEFAULT_CAPACITY);
        assert_eq!(c.phase(), Phase::Generated);
    }
}
