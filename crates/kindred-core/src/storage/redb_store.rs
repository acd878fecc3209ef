//! # redb-backed Entity Store
//!
//! A disk-backed entity store using the redb embedded database.
//!
//! Records are postcard-encoded. Parent/child and couple indexes are kept in
//! tuple-keyed tables so that every contract lookup is a single range scan:
//!
//! | Table | Key | Value |
//! |-------|-----|-------|
//! | `persons` | person id | postcard `Person` |
//! | `relationships` | relationship id | postcard `Relationship` |
//! | `parent_child` | (parent, child) | relationship id |
//! | `child_parent` | (child, parent) | relationship id |
//! | `couples` | (person, relationship id) | partner id |

use crate::store::EntityStore;
use crate::{KindredError, Person, PersonId, Relationship, RelationshipId, RelationshipType};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use std::path::Path;

const PERSONS: TableDefinition<u64, &[u8]> = TableDefinition::new("persons");

const RELATIONSHIPS: TableDefinition<u64, &[u8]> = TableDefinition::new("relationships");

const PARENT_CHILD: TableDefinition<(u64, u64), u64> = TableDefinition::new("parent_child");

const CHILD_PARENT: TableDefinition<(u64, u64), u64> = TableDefinition::new("child_parent");

const COUPLES: TableDefinition<(u64, u64), u64> = TableDefinition::new("couples");

fn io_err(e: impl std::fmt::Display) -> KindredError {
    KindredError::IoError(e.to_string())
}

/// A disk-backed entity store using redb.
///
/// Every write is its own ACID transaction; use [`RedbStore::put_batch`] to
/// load a whole dataset in one transaction.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KindredError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            Self::open_all_tables(&write_txn)?;
            write_txn.commit().map_err(io_err)?;
        }

        Ok(Self { db })
    }

    fn open_all_tables(write_txn: &WriteTransaction) -> Result<(), KindredError> {
        write_txn.open_table(PERSONS).map_err(io_err)?;
        write_txn.open_table(RELATIONSHIPS).map_err(io_err)?;
        write_txn.open_table(PARENT_CHILD).map_err(io_err)?;
        write_txn.open_table(CHILD_PARENT).map_err(io_err)?;
        write_txn.open_table(COUPLES).map_err(io_err)?;
        Ok(())
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), KindredError> {
        self.db.compact().map_err(io_err)?;
        Ok(())
    }

    /// Insert persons and relationships in a single ACID transaction.
    ///
    /// Reduces fsync overhead from O(N) to O(1) when loading a dataset.
    pub fn put_batch(
        &mut self,
        persons: &[Person],
        relationships: &[Relationship],
    ) -> Result<(), KindredError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        for person in persons {
            Self::write_person(&write_txn, person)?;
        }
        for relationship in relationships {
            Self::write_relationship(&write_txn, relationship)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn write_person(write_txn: &WriteTransaction, person: &Person) -> Result<(), KindredError> {
        let bytes = postcard::to_allocvec(person)
            .map_err(|e| KindredError::SerializationError(e.to_string()))?;
        let mut table = write_txn.open_table(PERSONS).map_err(io_err)?;
        table.insert(person.id.0, bytes.as_slice()).map_err(io_err)?;
        Ok(())
    }

    fn write_relationship(
        write_txn: &WriteTransaction,
        relationship: &Relationship,
    ) -> Result<(), KindredError> {
        let bytes = postcard::to_allocvec(relationship)
            .map_err(|e| KindredError::SerializationError(e.to_string()))?;

        let previous = {
            let mut table = write_txn.open_table(RELATIONSHIPS).map_err(io_err)?;
            table
                .insert(relationship.id.0, bytes.as_slice())
                .map_err(io_err)?
                .map(|old| decode_relationship(old.value()))
                .transpose()?
        };

        if let Some(previous) = previous {
            Self::write_index(write_txn, &previous, false)?;
        }
        Self::write_index(write_txn, relationship, true)
    }

    /// Add (`insert == true`) or remove the index rows of a relationship.
    fn write_index(
        write_txn: &WriteTransaction,
        relationship: &Relationship,
        insert: bool,
    ) -> Result<(), KindredError> {
        let rel_id = relationship.id.0;
        let (p1, p2) = (relationship.person1.0, relationship.person2.0);

        match relationship.rel_type {
            RelationshipType::ParentChild => {
                let mut down = write_txn.open_table(PARENT_CHILD).map_err(io_err)?;
                let mut up = write_txn.open_table(CHILD_PARENT).map_err(io_err)?;
                if insert {
                    down.insert((p1, p2), rel_id).map_err(io_err)?;
                    up.insert((p2, p1), rel_id).map_err(io_err)?;
                } else {
                    down.remove((p1, p2)).map_err(io_err)?;
                    up.remove((p2, p1)).map_err(io_err)?;
                }
            }
            RelationshipType::Couple => {
                let mut couples = write_txn.open_table(COUPLES).map_err(io_err)?;
                if insert {
                    couples.insert((p1, rel_id), p2).map_err(io_err)?;
                    couples.insert((p2, rel_id), p1).map_err(io_err)?;
                } else {
                    couples.remove((p1, rel_id)).map_err(io_err)?;
                    couples.remove((p2, rel_id)).map_err(io_err)?;
                }
            }
            RelationshipType::Other => {}
        }
        Ok(())
    }

    /// Second components of every `(person, *)` key in an index table.
    fn range_ids(
        &self,
        definition: TableDefinition<(u64, u64), u64>,
        person: PersonId,
    ) -> Result<Vec<u64>, KindredError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(definition).map_err(io_err)?;

        let mut ids = Vec::new();
        for entry in table
            .range((person.0, 0u64)..=(person.0, u64::MAX))
            .map_err(io_err)?
        {
            let (key, _) = entry.map_err(io_err)?;
            let (_, other) = key.value();
            ids.push(other);
        }
        Ok(ids)
    }
}

fn decode_person(bytes: &[u8]) -> Result<Person, KindredError> {
    postcard::from_bytes(bytes).map_err(|e| KindredError::DeserializationError(e.to_string()))
}

fn decode_relationship(bytes: &[u8]) -> Result<Relationship, KindredError> {
    postcard::from_bytes(bytes).map_err(|e| KindredError::DeserializationError(e.to_string()))
}

impl EntityStore for RedbStore {
    fn put_person(&mut self, person: Person) -> Result<(), KindredError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        Self::write_person(&write_txn, &person)?;
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn put_relationship(&mut self, relationship: Relationship) -> Result<(), KindredError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        Self::write_relationship(&write_txn, &relationship)?;
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), KindredError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        write_txn.delete_table(PERSONS).map_err(io_err)?;
        write_txn.delete_table(RELATIONSHIPS).map_err(io_err)?;
        write_txn.delete_table(PARENT_CHILD).map_err(io_err)?;
        write_txn.delete_table(CHILD_PARENT).map_err(io_err)?;
        write_txn.delete_table(COUPLES).map_err(io_err)?;
        Self::open_all_tables(&write_txn)?;
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn person_by_id(&self, id: PersonId) -> Result<Option<Person>, KindredError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(PERSONS).map_err(io_err)?;
        table
            .get(id.0)
            .map_err(io_err)?
            .map(|data| decode_person(data.value()))
            .transpose()
    }

    fn relationship_by_id(
        &self,
        id: RelationshipId,
    ) -> Result<Option<Relationship>, KindredError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(RELATIONSHIPS).map_err(io_err)?;
        table
            .get(id.0)
            .map_err(io_err)?
            .map(|data| decode_relationship(data.value()))
            .transpose()
    }

    fn relationships_of_type(
        &self,
        rel_type: RelationshipType,
    ) -> Result<Vec<Relationship>, KindredError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(RELATIONSHIPS).map_err(io_err)?;

        let mut result = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_, data) = entry.map_err(io_err)?;
            let relationship = decode_relationship(data.value())?;
            if relationship.rel_type == rel_type {
                result.push(relationship);
            }
        }
        Ok(result)
    }

    fn children_of(&self, person: PersonId) -> Result<Vec<PersonId>, KindredError> {
        Ok(self
            .range_ids(PARENT_CHILD, person)?
            .into_iter()
            .map(PersonId)
            .collect())
    }

    fn parents_of(&self, person: PersonId) -> Result<Vec<PersonId>, KindredError> {
        Ok(self
            .range_ids(CHILD_PARENT, person)?
            .into_iter()
            .map(PersonId)
            .collect())
    }

    fn couple_relationships_of(
        &self,
        person: PersonId,
    ) -> Result<Vec<Relationship>, KindredError> {
        let mut result = Vec::new();
        for rel_id in self.range_ids(COUPLES, person)? {
            if let Some(relationship) = self.relationship_by_id(RelationshipId(rel_id))? {
                result.push(relationship);
            }
        }
        Ok(result)
    }

    fn person_ids(&self) -> Result<Vec<PersonId>, KindredError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(PERSONS).map_err(io_err)?;

        let mut ids = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (key, _) = entry.map_err(io_err)?;
            ids.push(PersonId(key.value()));
        }
        Ok(ids)
    }

    fn relationship_ids(&self) -> Result<Vec<RelationshipId>, KindredError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(RELATIONSHIPS).map_err(io_err)?;

        let mut ids = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (key, _) = entry.map_err(io_err)?;
            ids.push(RelationshipId(key.value()));
        }
        Ok(ids)
    }

    fn person_count(&self) -> Result<usize, KindredError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(PERSONS).map_err(io_err)?;
        Ok(table.len().map_err(io_err)? as usize)
    }

    fn relationship_count(&self) -> Result<usize, KindredError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(RELATIONSHIPS).map_err(io_err)?;
        Ok(table.len().map_err(io_err)? as usize)
    }
}
