//! # Dataset Document
//!
//! The flat `{ persons, relationships }` document loaders hand to the engine.
//!
//! JSON field names are camelCase, so a GEDCOM-X shaped export maps onto it
//! without a custom parser. Validation rejects structural errors (reserved or
//! duplicate ids, size limits); references to missing persons are only
//! logged, because the view renders them as unknown placeholders.

use crate::store::EntityStore;
use crate::{primitives, KindredError, Person, PersonId, Relationship, RelationshipId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Persons and relationships of one family tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default)]
    pub persons: Vec<Person>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl Dataset {
    #[must_use]
    pub fn new(persons: Vec<Person>, relationships: Vec<Relationship>) -> Self {
        Self {
            persons,
            relationships,
        }
    }

    /// Snapshot the contents of a store, in id order.
    pub fn from_store<S: EntityStore + ?Sized>(store: &S) -> Result<Self, KindredError> {
        let mut persons = Vec::new();
        for id in store.person_ids()? {
            if let Some(person) = store.person_by_id(id)? {
                persons.push(person);
            }
        }
        let mut relationships = Vec::new();
        for id in store.relationship_ids()? {
            if let Some(relationship) = store.relationship_by_id(id)? {
                relationships.push(relationship);
            }
        }
        Ok(Self::new(persons, relationships))
    }

    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }

    /// Check structural consistency.
    pub fn validate(&self) -> Result<(), KindredError> {
        if self.persons.len() > primitives::MAX_DATASET_PERSONS {
            return Err(KindredError::InvalidDataset(format!(
                "{} persons exceed the limit of {}",
                self.persons.len(),
                primitives::MAX_DATASET_PERSONS
            )));
        }
        if self.relationships.len() > primitives::MAX_DATASET_RELATIONSHIPS {
            return Err(KindredError::InvalidDataset(format!(
                "{} relationships exceed the limit of {}",
                self.relationships.len(),
                primitives::MAX_DATASET_RELATIONSHIPS
            )));
        }

        let mut person_ids = BTreeSet::new();
        for person in &self.persons {
            if person.id.is_unknown() {
                return Err(KindredError::InvalidDataset(
                    "person id 0 is reserved".to_string(),
                ));
            }
            if !person_ids.insert(person.id) {
                return Err(KindredError::InvalidDataset(format!(
                    "duplicate person id {}",
                    person.id
                )));
            }
        }

        let mut relationship_ids: BTreeSet<RelationshipId> = BTreeSet::new();
        for relationship in &self.relationships {
            if !relationship_ids.insert(relationship.id) {
                return Err(KindredError::InvalidDataset(format!(
                    "duplicate relationship id {}",
                    relationship.id.0
                )));
            }
            for endpoint in [relationship.person1, relationship.person2] {
                if !person_ids.contains(&endpoint) {
                    tracing::warn!(
                        relationship = relationship.id.0,
                        person = endpoint.0,
                        "relationship references a missing person"
                    );
                }
            }
        }

        Ok(())
    }

    /// Replace the contents of a store with this dataset.
    pub fn load_into<S: EntityStore + ?Sized>(&self, store: &mut S) -> Result<(), KindredError> {
        self.validate()?;
        store.clear()?;
        for person in &self.persons {
            store.put_person(person.clone())?;
        }
        for relationship in &self.relationships {
            store.put_relationship(relationship.clone())?;
        }
        Ok(())
    }

    /// Ids referenced by relationships but absent from `persons`.
    #[must_use]
    pub fn dangling_references(&self) -> BTreeSet<PersonId> {
        let known: BTreeSet<PersonId> = self.persons.iter().map(|person| person.id).collect();
        self.relationships
            .iter()
            .flat_map(|rel| [rel.person1, rel.person2])
            .filter(|id| !known.contains(id))
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
