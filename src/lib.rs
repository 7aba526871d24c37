// Library exports for chartdeck

pub mod aggregate;
pub mod chart;
pub mod configurator;
pub mod csv_reader;
pub mod dashboard;
pub mod dataset;
pub mod debounce;
pub mod error;
pub mod filter;
pub mod graph;
pub mod palette;
pub mod parser;
pub mod settings;
pub mod value;
