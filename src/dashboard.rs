// Bounded, persisted collection of saved charts

use crate::chart::{ChartSpec, SavedChart};
use crate::error::{DashboardError, StoreError};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Maximum number of charts the dashboard holds by default
pub const DEFAULT_CAPACITY: usize = 10;

/// Persistence port for saved charts.
///
/// `load` is called once when the dashboard opens, `save` after every
/// successful mutation with the complete new list.
pub trait ChartStore {
    fn load(&self) -> Result<Vec<SavedChart>, StoreError>;
    fn save(&mut self, charts: &[SavedChart]) -> Result<(), StoreError>;
}

/// Keeps charts in memory only
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    charts: Vec<SavedChart>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn with_charts(charts: Vec<SavedChart>) -> Self {
        MemoryStore { charts }
    }

    pub fn charts(&self) -> &[SavedChart] {
        &self.charts
    }
}

impl ChartStore for MemoryStore {
    fn load(&self) -> Result<Vec<SavedChart>, StoreError> {
        Ok(self.charts.clone())
    }

    fn save(&mut self, charts: &[SavedChart]) -> Result<(), StoreError> {
        self.charts = charts.to_vec();
        Ok(())
    }
}

/// Stores charts as a JSON array in a single file, replaced atomically on save
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChartStore for JsonFileStore {
    fn load(&self) -> Result<Vec<SavedChart>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&mut self, charts: &[SavedChart]) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, charts)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Persist {
            path: self.path.display().to_string(),
            source: e.error,
        })?;
        Ok(())
    }
}

/// The saved-chart collection, bounded to `capacity` entries
#[derive(Debug)]
pub struct Dashboard<S: ChartStore> {
    store: S,
    charts: Vec<SavedChart>,
    capacity: usize,
    last_id: i64,
}

impl<S: ChartStore> Dashboard<S> {
    pub fn open(store: S, capacity: usize) -> Result<Self, StoreError> {
        let charts = store.load()?;
        let last_id = charts.iter().map(|c| c.id).max().unwrap_or(0);
        debug!(count = charts.len(), capacity, "Dashboard loaded");
        Ok(Dashboard {
            store,
            charts,
            capacity,
            last_id,
        })
    }

    pub fn list(&self) -> &[SavedChart] {
        &self.charts
    }

    pub fn get(&self, id: i64) -> Option<&SavedChart> {
        self.charts.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.charts.len() >= self.capacity
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// A fresh id: the current time in milliseconds, strictly above every id
    /// handed out so far.
    pub fn next_id(&mut self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        self.last_id = now.max(self.last_id + 1);
        self.last_id
    }

    /// Wrap a chart with a fresh id and add it.
    pub fn add_chart(&mut self, chart: ChartSpec) -> Result<&SavedChart, DashboardError> {
        if self.is_full() {
            return Err(self.capacity_error());
        }
        let id = self.next_id();
        self.add(SavedChart::new(id, chart))
    }

    /// Add a saved chart. Rejected without any change when its id is already
    /// taken or the dashboard is full.
    pub fn add(&mut self, chart: SavedChart) -> Result<&SavedChart, DashboardError> {
        if self.get(chart.id).is_some() {
            warn!(id = chart.id, "Duplicate chart id");
            return Err(DashboardError::DuplicateId { id: chart.id });
        }
        if self.is_full() {
            return Err(self.capacity_error());
        }
        self.last_id = self.last_id.max(chart.id);

        let mut next = self.charts.clone();
        next.push(chart);
        self.commit(next)?;

        info!(count = self.charts.len(), "Chart added to dashboard");
        Ok(&self.charts[self.charts.len() - 1])
    }

    /// Remove a chart by id. Returns whether anything was removed.
    pub fn remove(&mut self, id: i64) -> Result<bool, StoreError> {
        if self.get(id).is_none() {
            return Ok(false);
        }
        let next: Vec<SavedChart> = self.charts.iter().filter(|c| c.id != id).cloned().collect();
        self.commit(next)?;
        info!(id, "Chart removed from dashboard");
        Ok(true)
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.commit(Vec::new())?;
        info!("Dashboard cleared");
        Ok(())
    }

    fn commit(&mut self, next: Vec<SavedChart>) -> Result<(), StoreError> {
        self.store.save(&next)?;
        self.charts = next;
        Ok(())
    }

    fn capacity_error(&self) -> DashboardError {
        warn!(capacity = self.capacity, "Dashboard is full");
        DashboardError::CapacityExceeded {
            capacity: self.capacity,
        }
    }
}
