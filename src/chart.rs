// Chart specifications: what gets rendered and what gets saved

use crate::aggregate::AggregationOp;
use crate::dataset::{cell_at, Table};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Bar,
    Line,
    Pie,
}

impl ChartType {
    pub fn name(&self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Pie => "pie",
        }
    }

    pub fn all() -> &'static [ChartType] {
        &[ChartType::Bar, ChartType::Line, ChartType::Pie]
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartType::all()
            .iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("Unknown chart type '{}' (expected bar, line or pie)", s))
    }
}

/// A single labelled value, as drawn by a renderer
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub label: String,
    /// `None` when the y cell is not a number
    pub value: Option<f64>,
}

/// A materialized chart: selections locked in at generate time plus the
/// computed data. The data is frozen until the chart is generated again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub x: String,
    pub y: String,
    pub aggregation: AggregationOp,
    /// Aggregated series, or the raw filtered rows when `aggregation` is none
    pub data: Table,
}

impl ChartSpec {
    /// Project the data onto `(label, value)` pairs keyed by `x` and `y`.
    pub fn points(&self) -> Vec<SeriesPoint> {
        self.render_request().points()
    }

    /// e.g. `BAR Chart - CITY vs SALES (SUM)`
    pub fn title(&self) -> String {
        let mut title = format!(
            "{} Chart - {} vs {}",
            self.chart_type.name().to_uppercase(),
            self.x.to_uppercase(),
            self.y.to_uppercase()
        );
        if let Some(label) = self.aggregation.label() {
            title.push_str(&format!(" ({})", label));
        }
        title
    }

    pub fn render_request(&self) -> RenderRequest<'_> {
        RenderRequest {
            chart_type: self.chart_type,
            x: &self.x,
            y: &self.y,
            data: &self.data,
            aggregation_label: self.aggregation.label(),
        }
    }
}

/// What the rendering surface receives. It draws; it computes nothing.
#[derive(Debug, Clone)]
pub struct RenderRequest<'a> {
    pub chart_type: ChartType,
    pub x: &'a str,
    pub y: &'a str,
    pub data: &'a Table,
    pub aggregation_label: Option<String>,
}

impl RenderRequest<'_> {
    pub fn points(&self) -> Vec<SeriesPoint> {
        let x_idx = self.data.column_index(self.x);
        let y_idx = self.data.column_index(self.y);
        self.data
            .rows
            .iter()
            .map(|row| SeriesPoint {
                label: cell_at(row, x_idx).to_string(),
                value: cell_at(row, y_idx).to_number(),
            })
            .collect()
    }
}

/// A chart kept on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedChart {
    pub id: i64,
    #[serde(flatten)]
    pub chart: ChartSpec,
}

impl SavedChart {
    pub fn new(id: i64, chart: ChartSpec) -> Self {
        SavedChart { id, chart }
    }

    pub fn title(&self) -> String {
        self.chart.title()
    }
}
