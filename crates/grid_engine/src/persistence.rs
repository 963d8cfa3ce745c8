//! Named layout snapshots and their replay onto the grid.

use std::{collections::BTreeMap, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use shared::{
    error::GridError,
    protocol::{Layout, LayoutSummary},
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{grid::GridState, span::SpanManager};

/// Durable key (layout name) to JSON map.
#[async_trait]
pub trait LayoutStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<String>>;
    async fn set(&self, name: &str, body: &str) -> Result<()>;
    /// Returns whether a record was removed.
    async fn delete(&self, name: &str) -> Result<bool>;
    async fn list_all(&self) -> Result<Vec<(String, String)>>;
    async fn reset(&self) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryLayoutStore {
    layouts: Mutex<BTreeMap<String, String>>,
}

impl MemoryLayoutStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LayoutStore for MemoryLayoutStore {
    async fn get(&self, name: &str) -> Result<Option<String>> {
        Ok(self.layouts.lock().await.get(name).cloned())
    }

    async fn set(&self, name: &str, body: &str) -> Result<()> {
        self.layouts
            .lock()
            .await
            .insert(name.to_string(), body.to_string());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        Ok(self.layouts.lock().await.remove(name).is_some())
    }

    async fn list_all(&self) -> Result<Vec<(String, String)>> {
        Ok(self
            .layouts
            .lock()
            .await
            .iter()
            .map(|(name, body)| (name.clone(), body.clone()))
            .collect())
    }

    async fn reset(&self) -> Result<()> {
        self.layouts.lock().await.clear();
        Ok(())
    }
}

#[derive(Clone)]
pub struct LayoutPersistence {
    store: Arc<dyn LayoutStore>,
}

impl LayoutPersistence {
    pub fn new(store: Arc<dyn LayoutStore>) -> Self {
        Self { store }
    }

    pub fn snapshot(name: &str, grid: &GridState) -> Layout {
        Layout {
            name: name.to_string(),
            timestamp: Utc::now(),
            cells: grid.snapshot(),
        }
    }

    /// Stores a snapshot of `grid`, replacing any layout with the same name.
    pub async fn save(&self, name: &str, grid: &GridState) -> Result<Layout, GridError> {
        let name = checked_name(name)?;
        let layout = Self::snapshot(name, grid);
        let body = serde_json::to_string(&layout)
            .map_err(|err| GridError::CorruptLayout(err.to_string()))?;
        self.store.set(name, &body).await.map_err(|err| {
            warn!(layout = name, error = %err, "layout save failed");
            GridError::StoreUnavailable(err.to_string())
        })?;
        info!(layout = name, cells = layout.occupied_count(), "layout saved");
        Ok(layout)
    }

    pub async fn fetch(&self, name: &str) -> Result<Layout, GridError> {
        let name = checked_name(name)?;
        let body = self
            .store
            .get(name)
            .await
            .map_err(|err| {
                warn!(layout = name, error = %err, "layout read failed");
                GridError::StoreUnavailable(err.to_string())
            })?
            .ok_or_else(|| GridError::LayoutNotFound(name.to_string()))?;
        serde_json::from_str(&body).map_err(|err| GridError::CorruptLayout(err.to_string()))
    }

    /// Replaces the grid contents with the named layout. Nothing changes
    /// unless every group replays.
    pub async fn load_by_name(
        &self,
        name: &str,
        spans: &mut SpanManager,
    ) -> Result<Layout, GridError> {
        let layout = self.fetch(name).await?;
        replay(&layout, spans)?;
        info!(layout = %layout.name, cells = layout.occupied_count(), "layout loaded");
        Ok(layout)
    }

    pub async fn delete(&self, name: &str) -> Result<(), GridError> {
        let name = checked_name(name)?;
        let removed = self
            .store
            .delete(name)
            .await
            .map_err(|err| GridError::StoreUnavailable(err.to_string()))?;
        if !removed {
            return Err(GridError::LayoutNotFound(name.to_string()));
        }
        info!(layout = name, "layout deleted");
        Ok(())
    }

    /// Summaries sorted by name. Unreadable records are skipped.
    pub async fn list(&self) -> Result<Vec<LayoutSummary>, GridError> {
        let records = self
            .store
            .list_all()
            .await
            .map_err(|err| GridError::StoreUnavailable(err.to_string()))?;

        let mut summaries: Vec<LayoutSummary> = records
            .into_iter()
            .filter_map(|(name, body)| match serde_json::from_str::<Layout>(&body) {
                Ok(layout) => Some(LayoutSummary {
                    name,
                    timestamp: layout.timestamp,
                    occupied_cells: layout.occupied_count(),
                }),
                Err(err) => {
                    warn!(layout = %name, error = %err, "skipping unreadable layout");
                    None
                }
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(summaries)
    }

    pub async fn reset(&self) -> Result<(), GridError> {
        self.store
            .reset()
            .await
            .map_err(|err| GridError::StoreUnavailable(err.to_string()))?;
        info!("layout store reset");
        Ok(())
    }
}

/// Clears the grid and opens each program group of `layout` in catalog
/// registration order.
pub fn replay(layout: &Layout, spans: &mut SpanManager) -> Result<(), GridError> {
    let mut groups: Vec<_> = layout.groups().into_iter().collect();
    groups.sort_by_key(|(program, _)| (spans.catalog().rank(program), program.clone()));

    let mut next = spans.clone();
    next.clear_cells();
    for (program, positions) in &groups {
        next.open(program, positions)?;
    }
    *spans = next;
    Ok(())
}

fn checked_name(name: &str) -> Result<&str, GridError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GridError::LayoutNameRequired);
    }
    Ok(name)
}

#[cfg(test)]
#[path = "tests/persistence_tests.rs"]
mod tests;
