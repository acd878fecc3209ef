//! # Dataset Metrics
//!
//! Summary counts for status reporting. Integer math only.

use crate::store::EntityStore;
use crate::{KindredError, RelationshipType};
use serde::{Deserialize, Serialize};

/// Counts describing a loaded dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetrics {
    pub person_count: usize,
    pub relationship_count: usize,
    pub couple_count: usize,
    pub parent_child_count: usize,
    /// Persons without Death fact or negative living marker.
    pub living_count: usize,
    /// Relationship endpoints that name no stored person.
    pub dangling_references: usize,
    /// Parent-child links per person, as millionths.
    pub parent_links_per_person_millionths: u64,
}

impl DatasetMetrics {
    /// Compute metrics by scanning a store.
    pub fn from_store<S: EntityStore + ?Sized>(store: &S) -> Result<Self, KindredError> {
        let person_count = store.person_count()?;
        let relationship_count = store.relationship_count()?;
        let couple_count = store.relationships_of_type(RelationshipType::Couple)?.len();
        let parent_child = store.relationships_of_type(RelationshipType::ParentChild)?;

        let mut living_count = 0;
        for id in store.person_ids()? {
            if store.person_by_id(id)?.is_some_and(|person| person.is_living()) {
                living_count += 1;
            }
        }

        let mut dangling_references = 0;
        for id in store.relationship_ids()? {
            let Some(relationship) = store.relationship_by_id(id)? else {
                continue;
            };
            for endpoint in [relationship.person1, relationship.person2] {
                if store.person_by_id(endpoint)?.is_none() {
                    dangling_references += 1;
                }
            }
        }

        let parent_links_per_person_millionths = if person_count > 0 {
            (parent_child.len() as u64).saturating_mul(1_000_000) / person_count as u64
        } else {
            0
        };

        Ok(Self {
            person_count,
            relationship_count,
            couple_count,
            parent_child_count: parent_child.len(),
            living_count,
            dangling_references,
            parent_links_per_person_millionths,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::{Fact, FactType, Person, PersonId, Relationship};

    #[test]
    fn empty_store_is_all_zero() {
        let metrics = DatasetMetrics::from_store(&MemoryStore::new()).expect("metrics");
        assert_eq!(metrics, DatasetMetrics::default());
    }

    #[test]
    fn counts_by_type() {
        let mut store = MemoryStore::new();
        store.put_person(Person::new(PersonId(1))).expect("put");
        store
            .put_person(Person::new(PersonId(2)).with_fact(Fact::new(FactType::Death)))
            .expect("put");
        store
            .put_relationship(Relationship::couple(10, 1, 2))
            .expect("put");
        store
            .put_relationship(Relationship::parent_child(11, 1, 3))
            .expect("put");

        let metrics = DatasetMetrics::from_store(&store).expect("metrics");
        assert_eq!(metrics.couple_count, 1);
        assert_eq!(metrics.parent_child_count, 1);
        assert_eq!(metrics.living_count, 1);
        assert_eq!(metrics.dangling_references, 1);
        assert_eq!(metrics.parent_links_per_person_millionths, 500_000);
    }
}
