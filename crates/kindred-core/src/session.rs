//! # Session Module
//!
//! A session owns one dataset and everything derived from it: the family
//! cache, the traversal context of the last build and the view settings.
//!
//! ## Storage Backends
//!
//! - `InMemory`: `MemoryStore` (fast, volatile unless saved through the
//!   persistence format)
//! - `Persistent`: `RedbStore` for disk-backed ACID storage

use crate::config::ViewConfig;
use crate::family::{FamilyDeriver, FamilyView};
use crate::formats::Dataset;
use crate::metrics::DatasetMetrics;
use crate::mode::{ModeSelector, ViewMode};
use crate::store::{EntityStore, MemoryStore};
use crate::storage::RedbStore;
use crate::traversal::{TraversalContext, TraversalEngine};
use crate::view::{FamilySource, PersonNode, PopulateReport, ViewGraph};
use crate::{KindredError, Person, PersonId, Relationship, RelationshipId, RelationshipType};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::Path;

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Storage backend for a Session.
#[derive(Debug)]
pub enum StorageBackend {
    InMemory(MemoryStore),
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        StorageBackend::InMemory(MemoryStore::new())
    }
}

impl StorageBackend {
    fn store(&self) -> &dyn EntityStore {
        match self {
            StorageBackend::InMemory(store) => store,
            StorageBackend::Persistent(store) => store,
        }
    }

    fn store_mut(&mut self) -> &mut dyn EntityStore {
        match self {
            StorageBackend::InMemory(store) => store,
            StorageBackend::Persistent(store) => store,
        }
    }
}

impl EntityStore for StorageBackend {
    fn put_person(&mut self, person: Person) -> Result<(), KindredError> {
        self.store_mut().put_person(person)
    }

    fn put_relationship(&mut self, relationship: Relationship) -> Result<(), KindredError> {
        self.store_mut().put_relationship(relationship)
    }

    fn clear(&mut self) -> Result<(), KindredError> {
        self.store_mut().clear()
    }

    fn person_by_id(&self, id: PersonId) -> Result<Option<Person>, KindredError> {
        self.store().person_by_id(id)
    }

    fn relationship_by_id(
        &self,
        id: RelationshipId,
    ) -> Result<Option<Relationship>, KindredError> {
        self.store().relationship_by_id(id)
    }

    fn relationships_of_type(
        &self,
        rel_type: RelationshipType,
    ) -> Result<Vec<Relationship>, KindredError> {
        self.store().relationships_of_type(rel_type)
    }

    fn children_of(&self, person: PersonId) -> Result<Vec<PersonId>, KindredError> {
        self.store().children_of(person)
    }

    fn parents_of(&self, person: PersonId) -> Result<Vec<PersonId>, KindredError> {
        self.store().parents_of(person)
    }

    fn couple_relationships_of(
        &self,
        person: PersonId,
    ) -> Result<Vec<Relationship>, KindredError> {
        self.store().couple_relationships_of(person)
    }

    fn person_ids(&self) -> Result<Vec<PersonId>, KindredError> {
        self.store().person_ids()
    }

    fn relationship_ids(&self) -> Result<Vec<RelationshipId>, KindredError> {
        self.store().relationship_ids()
    }

    fn person_count(&self) -> Result<usize, KindredError> {
        self.store().person_count()
    }

    fn relationship_count(&self) -> Result<usize, KindredError> {
        self.store().relationship_count()
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// A loaded dataset plus its derived state.
#[derive(Debug)]
pub struct Session {
    backend: StorageBackend,
    deriver: FamilyDeriver,
    config: ViewConfig,
    /// Context of the last `prepare` / `build_view_graph`.
    context: Option<TraversalContext>,
    ahnentafel: BTreeMap<PersonId, u64>,
    /// Fixed "today" for ages; `None` means the local date at use.
    as_of: Option<NaiveDate>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create an in-memory session with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_backend(StorageBackend::default())
    }

    #[must_use]
    pub fn with_backend(backend: StorageBackend) -> Self {
        Self {
            backend,
            deriver: FamilyDeriver::new(),
            config: ViewConfig::default(),
            context: None,
            ahnentafel: BTreeMap::new(),
            as_of: None,
        }
    }

    /// Open (or create) a redb-backed session.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, KindredError> {
        Ok(Self::with_backend(StorageBackend::Persistent(
            RedbStore::open(path)?,
        )))
    }

    /// Create an in-memory session holding a dataset.
    pub fn from_dataset(dataset: &Dataset) -> Result<Self, KindredError> {
        let mut session = Self::new();
        session.load_dataset(dataset)?;
        Ok(session)
    }

    #[must_use]
    pub fn with_config(mut self, config: ViewConfig) -> Self {
        self.config = config;
        self
    }

    /// Pin the date ages are computed against.
    #[must_use]
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn deriver(&self) -> &FamilyDeriver {
        &self.deriver
    }

    /// Traversal context of the last build, if any.
    pub fn context(&self) -> Option<&TraversalContext> {
        self.context.as_ref()
    }

    fn as_of(&self) -> NaiveDate {
        self.as_of
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    // -------------------------------------------------------------------------
    // Dataset
    // -------------------------------------------------------------------------

    /// Replace the stored dataset and drop every derived cache.
    pub fn load_dataset(&mut self, dataset: &Dataset) -> Result<DatasetMetrics, KindredError> {
        dataset.validate()?;
        match &mut self.backend {
            StorageBackend::InMemory(store) => dataset.load_into(store)?,
            StorageBackend::Persistent(store) => {
                store.clear()?;
                store.put_batch(&dataset.persons, &dataset.relationships)?;
            }
        }
        self.deriver.invalidate();
        self.context = None;
        self.ahnentafel.clear();

        let metrics = self.metrics()?;
        tracing::info!(
            persons = metrics.person_count,
            relationships = metrics.relationship_count,
            "dataset loaded"
        );
        Ok(metrics)
    }

    /// Snapshot the stored dataset.
    pub fn dataset(&self) -> Result<Dataset, KindredError> {
        Dataset::from_store(&self.backend)
    }

    pub fn metrics(&self) -> Result<DatasetMetrics, KindredError> {
        DatasetMetrics::from_store(&self.backend)
    }

    /// Lookup a person, failing with `PersonNotFound`.
    pub fn person(&self, id: PersonId) -> Result<Person, KindredError> {
        self.backend
            .person_by_id(id)?
            .ok_or(KindredError::PersonNotFound(id))
    }

    fn require_start(&self, start: PersonId) -> Result<(), KindredError> {
        if self.backend.person_count()? == 0 {
            return Err(KindredError::EmptyDataset);
        }
        self.person(start).map(|_| ())
    }

    // -------------------------------------------------------------------------
    // Model queries
    // -------------------------------------------------------------------------

    pub fn families_as_parent(&mut self, person: PersonId) -> Result<Vec<FamilyView>, KindredError> {
        self.deriver.families_as_parent(&self.backend, person)
    }

    pub fn families_as_child(&mut self, person: PersonId) -> Result<Vec<FamilyView>, KindredError> {
        self.deriver.families_as_child(&self.backend, person)
    }

    pub fn ancestors(&self, person: PersonId) -> Result<Vec<PersonId>, KindredError> {
        TraversalEngine::new(&self.backend).ancestors(person)
    }

    pub fn descendants(&self, person: PersonId) -> Result<Vec<PersonId>, KindredError> {
        TraversalEngine::new(&self.backend).descendants(person)
    }

    pub fn ahnentafel(&self, start: PersonId) -> Result<BTreeMap<PersonId, u64>, KindredError> {
        TraversalEngine::new(&self.backend).ahnentafel(start)
    }

    /// Families a fresh view for `start` would display in `mode`.
    pub fn select(
        &mut self,
        start: PersonId,
        mode: ViewMode,
    ) -> Result<Vec<FamilyView>, KindredError> {
        ModeSelector::new(&self.backend, &mut self.deriver).select(start, mode)
    }

    /// Compute generations, the age reference and Ahnentafel numbers for
    /// `start`, replacing the previous context.
    pub fn prepare(&mut self, start: PersonId) -> Result<&TraversalContext, KindredError> {
        self.require_start(start)?;
        let engine = TraversalEngine::new(&self.backend);
        let context = engine.assign_generations(
            start,
            self.config.years_per_generation,
            self.as_of(),
        )?;
        self.ahnentafel = engine.ahnentafel(start)?;
        Ok(self.context.insert(context))
    }

    /// Age of `person` relative to the family of `start`.
    pub fn estimate_age(
        &mut self,
        start: PersonId,
        person: PersonId,
    ) -> Result<Option<i64>, KindredError> {
        let record = self.person(person)?;
        let context: &TraversalContext = match self.context.take() {
            Some(context) if context.start() == start => self.context.insert(context),
            _ => self.prepare(start)?,
        };
        Ok(context.estimate_age(&record))
    }

    // -------------------------------------------------------------------------
    // View graph
    // -------------------------------------------------------------------------

    /// Build and populate a view graph.
    ///
    /// `progress` receives `(done, total)` while families are shown.
    pub fn build_view_graph(
        &mut self,
        start: PersonId,
        mode: ViewMode,
        progress: impl FnMut(usize, usize),
    ) -> Result<(ViewGraph, PopulateReport), KindredError> {
        self.prepare(start)?;
        let families = self.select(start, mode)?;
        tracing::debug!(start = start.0, %mode, candidates = families.len(), "building view graph");

        let mut graph = ViewGraph::new(start, self)?;
        let max_person_nodes = self.config.max_person_nodes;
        let report = graph.populate(&families, max_person_nodes, self, progress)?;

        tracing::info!(
            start = start.0,
            %mode,
            nodes = graph.node_count(),
            links = graph.link_count(),
            truncated = report.truncated,
            "view graph built"
        );
        Ok((graph, report))
    }
}

impl FamilySource for Session {
    fn person_node(&mut self, id: PersonId) -> Result<PersonNode, KindredError> {
        let record = self.backend.person_by_id(id)?;
        if record.is_none() {
            tracing::warn!(person = id.0, "referenced person is missing, using placeholder");
        }
        let mut node = PersonNode::new(id, record, self.config.language.as_deref());
        node.ascendancy_number = self.ahnentafel.get(&id).copied();
        if let Some(context) = &self.context {
            node.generation = context.generation(id).or_else(|| node.person.generation());
            node.age = context.estimate_age(&node.person);
        }
        Ok(node)
    }

    fn families_as_parent(&mut self, id: PersonId) -> Result<Vec<FamilyView>, KindredError> {
        Session::families_as_parent(self, id)
    }

    fn families_as_child(&mut self, id: PersonId) -> Result<Vec<FamilyView>, KindredError> {
        Session::families_as_child(self, id)
    }
}

// =============================================================================
// TESTS
// =============================================================================
