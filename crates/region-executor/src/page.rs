//! A page request: shell plus regions.

use std::collections::HashSet;
use std::sync::Arc;

use region_cache::{page_cache_control, CachePolicy};
use region_core::{ConfigError, PageDescriptor, RegionConfig};
use region_data::{DataSource, SimulatedSource};
use region_streaming::{Shell, ShellRenderer};

use crate::region::Region;

/// Everything needed to compose one page.
#[derive(Clone)]
pub struct Page {
    /// Page name, for logs and metrics.
    pub name: String,
    /// Regions in declaration order.
    pub regions: Vec<Region>,
    shell: Arc<dyn ShellRenderer>,
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("name", &self.name)
            .field("regions", &self.regions)
            .finish()
    }
}

impl Page {
    /// Create a page without regions.
    pub fn new(name: impl Into<String>, shell: impl ShellRenderer + 'static) -> Self {
        Self {
            name: name.into(),
            regions: Vec::new(),
            shell: Arc::new(shell),
        }
    }

    /// Add a region.
    pub fn with_region(mut self, region: Region) -> Self {
        self.regions.push(region);
        self
    }

    /// Build a page from a validated descriptor, asking `source_for` for
    /// each region's data source.
    pub fn from_descriptor<F>(page: &PageDescriptor, mut source_for: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&RegionConfig) -> Arc<dyn DataSource>,
    {
        page.validate()?;

        let regions = page
            .regions
            .iter()
            .map(|config| Region::from_config(config, source_for(config)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: page.name.clone(),
            regions,
            shell: Arc::new(Shell::from_descriptor(page)),
        })
    }

    /// Build a page whose regions are backed by the descriptor's inline
    /// simulated sources. Regions without one answer with their id.
    pub fn simulated(page: &PageDescriptor) -> Result<Self, ConfigError> {
        Self::from_descriptor(page, |config| {
            let source = match &config.source {
                Some(source) => SimulatedSource::from_config(config.id.as_str(), source),
                None => SimulatedSource::new(config.id.as_str(), config.id.clone().into()),
            };
            Arc::new(source)
        })
    }

    /// The shell renderer.
    pub fn shell(&self) -> &dyn ShellRenderer {
        self.shell.as_ref()
    }

    /// Cache policies of every region.
    pub fn policies(&self) -> impl Iterator<Item = &CachePolicy> {
        self.regions.iter().map(|r| &r.policy)
    }

    /// Cache-Control for the whole page.
    pub fn cache_control(&self) -> String {
        page_cache_control(self.policies())
    }

    /// Reject duplicate region ids.
    pub fn check_unique_ids(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for region in &self.regions {
            if !seen.insert(&region.id) {
                return Err(ConfigError::DuplicateRegion(region.id.to_string()));
            }
        }
        Ok(())
    }
}
