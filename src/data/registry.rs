//! Lookup from source kind to the adapter instance serving it.

use std::collections::HashMap;
use std::sync::Arc;

use crate::data::{
    BocFixedAdapter, BocomAdapter, CiticAdapter, CmbcAdapter, EfundsAdapter, HzbankAdapter,
    SourceAdapter, SourceSettings,
};
use crate::domain::SourceKind;
use crate::error::AppError;

/// Adapters are built once per run and shared by handle across workers.
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<SourceKind, Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One adapter per [`SourceKind`], all built from `settings`.
    pub fn with_default_adapters(settings: &SourceSettings) -> Result<Self, AppError> {
        let mut registry = Self::new();
        registry.register(Arc::new(BocomAdapter::new(settings)?));
        registry.register(Arc::new(CmbcAdapter::new(settings)?));
        registry.register(Arc::new(EfundsAdapter::new(settings)?));
        registry.register(Arc::new(CiticAdapter::new(settings)?));
        registry.register(Arc::new(HzbankAdapter::new(settings)?));
        registry.register(Arc::new(BocFixedAdapter::new(settings)?));
        Ok(registry)
    }

    /// Register `adapter` under its own kind, replacing any previous one.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    pub fn get(&self, kind: SourceKind) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.get(&kind).cloned()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
