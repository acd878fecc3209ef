//! # Entity Store
//!
//! Keyed storage of persons and relationships.
//!
//! This module defines the `EntityStore` trait the engine consumes and the
//! in-memory `MemoryStore` implementation. All data structures use `BTreeMap`
//! so that every lookup returns ids in a deterministic order.

use crate::{KindredError, Person, PersonId, Relationship, RelationshipId, RelationshipType};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// ENTITYSTORE TRAIT
// =============================================================================

/// The EntityStore trait defines the lookups the engine needs.
///
/// All fallible operations return `Result<T, KindredError>` so that in-memory
/// and persistent backends are used uniformly. Id lists are returned in
/// ascending id order.
pub trait EntityStore {
    /// Insert or replace a person.
    fn put_person(&mut self, person: Person) -> Result<(), KindredError>;

    /// Insert or replace a relationship.
    fn put_relationship(&mut self, relationship: Relationship) -> Result<(), KindredError>;

    /// Remove every record.
    fn clear(&mut self) -> Result<(), KindredError>;

    /// Lookup a person by id.
    fn person_by_id(&self, id: PersonId) -> Result<Option<Person>, KindredError>;

    /// Lookup a relationship by id.
    fn relationship_by_id(&self, id: RelationshipId)
    -> Result<Option<Relationship>, KindredError>;

    /// All relationships of one type.
    fn relationships_of_type(
        &self,
        rel_type: RelationshipType,
    ) -> Result<Vec<Relationship>, KindredError>;

    /// Children recorded through ParentChild relationships.
    fn children_of(&self, person: PersonId) -> Result<Vec<PersonId>, KindredError>;

    /// Parents recorded through ParentChild relationships.
    fn parents_of(&self, person: PersonId) -> Result<Vec<PersonId>, KindredError>;

    /// Couple relationships the person takes part in.
    fn couple_relationships_of(&self, person: PersonId)
    -> Result<Vec<Relationship>, KindredError>;

    /// All person ids.
    fn person_ids(&self) -> Result<Vec<PersonId>, KindredError>;

    /// All relationship ids.
    fn relationship_ids(&self) -> Result<Vec<RelationshipId>, KindredError>;

    /// Total number of persons.
    fn person_count(&self) -> Result<usize, KindredError>;

    /// Total number of relationships.
    fn relationship_count(&self) -> Result<usize, KindredError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-memory entity store.
///
/// Keeps parent/child and couple indexes next to the records so every
/// contract lookup is a map access.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    persons: BTreeMap<PersonId, Person>,
    relationships: BTreeMap<RelationshipId, Relationship>,
    /// parent -> children
    children: BTreeMap<PersonId, BTreeSet<PersonId>>,
    /// child -> parents
    parents: BTreeMap<PersonId, BTreeSet<PersonId>>,
    /// person -> couple relationships
    couples: BTreeMap<PersonId, BTreeSet<RelationshipId>>,
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterate persons in id order.
    pub fn persons(&self) -> impl Iterator<Item = &Person> {
        self.persons.values()
    }

    /// Iterate relationships in id order.
    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.values()
    }

    fn unindex(&mut self, relationship: &Relationship) {
        match relationship.rel_type {
            RelationshipType::ParentChild => {
                if let Some(set) = self.children.get_mut(&relationship.person1) {
                    set.remove(&relationship.person2);
                }
                if let Some(set) = self.parents.get_mut(&relationship.person2) {
                    set.remove(&relationship.person1);
                }
            }
            RelationshipType::Couple => {
                for person in [relationship.person1, relationship.person2] {
                    if let Some(set) = self.couples.get_mut(&person) {
                        set.remove(&relationship.id);
                    }
                }
            }
            RelationshipType::Other => {}
        }
    }

    fn index(&mut self, relationship: &Relationship) {
        match relationship.rel_type {
            RelationshipType::ParentChild => {
                self.children
                    .entry(relationship.person1)
                    .or_default()
                    .insert(relationship.person2);
                self.parents
                    .entry(relationship.person2)
                    .or_default()
                    .insert(relationship.person1);
            }
            RelationshipType::Couple => {
                for person in [relationship.person1, relationship.person2] {
                    self.couples
                        .entry(person)
                        .or_default()
                        .insert(relationship.id);
                }
            }
            RelationshipType::Other => {}
        }
    }
}

impl EntityStore for MemoryStore {
    fn put_person(&mut self, person: Person) -> Result<(), KindredError> {
        self.persons.insert(person.id, person);
        Ok(())
    }

    fn put_relationship(&mut self, relationship: Relationship) -> Result<(), KindredError> {
        if let Some(previous) = self.relationships.remove(&relationship.id) {
            self.unindex(&previous);
        }
        self.index(&relationship);
        self.relationships.insert(relationship.id, relationship);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), KindredError> {
        *self = Self::default();
        Ok(())
    }

    fn person_by_id(&self, id: PersonId) -> Result<Option<Person>, KindredError> {
        Ok(self.persons.get(&id).cloned())
    }

    fn relationship_by_id(
        &self,
        id: RelationshipId,
    ) -> Result<Option<Relationship>, KindredError> {
        Ok(self.relationships.get(&id).cloned())
    }

    fn relationships_of_type(
        &self,
        rel_type: RelationshipType,
    ) -> Result<Vec<Relationship>, KindredError> {
        Ok(self
            .relationships
            .values()
            .filter(|rel| rel.rel_type == rel_type)
            .cloned()
            .collect())
    }

    fn children_of(&self, person: PersonId) -> Result<Vec<PersonId>, KindredError> {
        Ok(self
            .children
            .get(&person)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }

    fn parents_of(&self, person: PersonId) -> Result<Vec<PersonId>, KindredError> {
        Ok(self
            .parents
            .get(&person)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }

    fn couple_relationships_of(
        &self,
        person: PersonId,
    ) -> Result<Vec<Relationship>, KindredError> {
        Ok(self
            .couples
            .get(&person)
            .into_iter()
            .flat_map(|ids| ids.iter())
            .filter_map(|id| self.relationships.get(id).cloned())
            .collect())
    }

    fn person_ids(&self) -> Result<Vec<PersonId>, KindredError> {
        Ok(self.persons.keys().copied().collect())
    }

    fn relationship_ids(&self) -> Result<Vec<RelationshipId>, KindredError> {
        Ok(self.relationships.keys().copied().collect())
    }

    fn person_count(&self) -> Result<usize, KindredError> {
        Ok(self.persons.len())
    }

    fn relationship_count(&self) -> Result<usize, KindredError> {
        Ok(self.relationships.len())
    }
}

// =============================================================================
// TESTS
// =============================================================================
