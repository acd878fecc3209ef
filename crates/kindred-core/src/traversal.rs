//! # Traversal Engine
//!
//! Ancestor and descendant closures, generation numbering, age estimation and
//! Ahnentafel numbering.
//!
//! Every walk is an explicit breadth-first worklist with a visited set, so
//! pedigree collapse (the same ancestor reached along several lines) and
//! malformed cyclic data terminate.
//!
//! Generation numbers and the age reference point are per-build state held in
//! a [`TraversalContext`]; nothing is global.

use crate::age::exact_age;
use crate::store::EntityStore;
use crate::{primitives, Gender, KindredError, Person, PersonId};
use chrono::NaiveDate;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

// =============================================================================
// TRAVERSAL CONTEXT
// =============================================================================

/// The living person whose exact age anchors age estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferencePoint {
    pub person: PersonId,
    pub age: i64,
    pub generation: i32,
}

/// A person reached along two paths with different generation numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationConflict {
    pub person: PersonId,
    /// The value kept (first assigned).
    pub assigned: i32,
    /// The value that was rejected.
    pub rejected: i32,
}

/// Generation numbers and age reference for one start person.
#[derive(Debug, Clone)]
pub struct TraversalContext {
    start: PersonId,
    generations: BTreeMap<PersonId, i32>,
    reference: Option<ReferencePoint>,
    years_per_generation: i64,
    conflicts: Vec<GenerationConflict>,
    as_of: NaiveDate,
}

impl TraversalContext {
    /// Create an empty context.
    #[must_use]
    pub fn new(start: PersonId, years_per_generation: i64, as_of: NaiveDate) -> Self {
        Self {
            start,
            generations: BTreeMap::new(),
            reference: None,
            years_per_generation,
            conflicts: Vec::new(),
            as_of,
        }
    }

    pub fn start(&self) -> PersonId {
        self.start
    }

    /// Generation relative to the start person (0), ancestors positive.
    pub fn generation(&self, person: PersonId) -> Option<i32> {
        self.generations.get(&person).copied()
    }

    pub fn generations(&self) -> &BTreeMap<PersonId, i32> {
        &self.generations
    }

    pub fn reference(&self) -> Option<ReferencePoint> {
        self.reference
    }

    pub fn conflicts(&self) -> &[GenerationConflict] {
        &self.conflicts
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Record a generation. The first value wins; a different later value is
    /// logged as a conflict.
    ///
    /// Returns true if the person was newly assigned.
    fn assign(&mut self, person: PersonId, generation: i32) -> bool {
        match self.generations.entry(person) {
            Entry::Vacant(slot) => {
                slot.insert(generation);
                true
            }
            Entry::Occupied(slot) => {
                let assigned = *slot.get();
                if assigned != generation {
                    tracing::warn!(
                        person = person.0,
                        assigned,
                        rejected = generation,
                        "conflicting generation numbers, keeping the first"
                    );
                    self.conflicts.push(GenerationConflict {
                        person,
                        assigned,
                        rejected: generation,
                    });
                }
                false
            }
        }
    }

    /// Capture the reference point if none is set yet.
    ///
    /// Only a living person with an exact age and a known generation
    /// qualifies.
    fn offer_reference(&mut self, person: &Person) {
        if self.reference.is_some() || !person.is_living() {
            return;
        }
        let (Some(generation), Some(age)) = (
            self.known_generation(person),
            exact_age(person, self.as_of),
        ) else {
            return;
        };
        tracing::debug!(person = person.id.0, age, generation, "age reference point captured");
        self.reference = Some(ReferencePoint {
            person: person.id,
            age,
            generation,
        });
    }

    /// Assigned generation, else the one recorded in a Generation fact.
    fn known_generation(&self, person: &Person) -> Option<i32> {
        self.generation(person.id).or_else(|| person.generation())
    }

    /// Age of a person: exact when the record allows, otherwise estimated from
    /// the reference point and the generation distance.
    pub fn estimate_age(&self, person: &Person) -> Option<i64> {
        if let Some(age) = exact_age(person, self.as_of) {
            return Some(age);
        }
        let reference = self.reference?;
        let generation = self.known_generation(person)?;
        let distance = i64::from(generation) - i64::from(reference.generation);
        distance
            .checked_mul(self.years_per_generation)?
            .checked_add(reference.age)
            .filter(|age| *age >= 0)
    }
}

// =============================================================================
// TRAVERSAL ENGINE
// =============================================================================

/// Closure and numbering walks over an entity store.
#[derive(Debug, Clone, Copy)]
pub struct TraversalEngine<'a, S: EntityStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: EntityStore + ?Sized> TraversalEngine<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// The person followed by every ancestor, in breadth-first order.
    pub fn ancestors(&self, person: PersonId) -> Result<Vec<PersonId>, KindredError> {
        self.closure(person, |store, id| store.parents_of(id))
    }

    /// The person followed by every descendant, in breadth-first order.
    pub fn descendants(&self, person: PersonId) -> Result<Vec<PersonId>, KindredError> {
        self.closure(person, |store, id| store.children_of(id))
    }

    fn closure(
        &self,
        person: PersonId,
        next: impl Fn(&S, PersonId) -> Result<Vec<PersonId>, KindredError>,
    ) -> Result<Vec<PersonId>, KindredError> {
        let mut visited = BTreeSet::from([person]);
        let mut queue = VecDeque::from([person]);
        let mut order = Vec::new();

        while let Some(current) = queue.pop_front() {
            order.push(current);
            for neighbor in next(self.store, current)? {
                if visited.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }

        Ok(order)
    }

    /// Assign generation numbers relative to `start` and capture the age
    /// reference point.
    ///
    /// Blood relatives first (parents +1, children -1). Partners without a
    /// generation then inherit their partner's, and their own blood relatives
    /// are expanded. Repeats until no partner adds anyone.
    pub fn assign_generations(
        &self,
        start: PersonId,
        years_per_generation: i64,
        as_of: NaiveDate,
    ) -> Result<TraversalContext, KindredError> {
        let mut context = TraversalContext::new(start, years_per_generation, as_of);
        context.assign(start, 0);

        let mut queue = VecDeque::from([start]);
        let mut partners_scanned = BTreeSet::new();

        loop {
            self.expand_blood(&mut context, &mut queue)?;

            let pending: Vec<(PersonId, i32)> = context
                .generations
                .iter()
                .filter(|(id, _)| !partners_scanned.contains(*id))
                .map(|(id, generation)| (*id, *generation))
                .collect();

            for (person, generation) in pending {
                partners_scanned.insert(person);
                for couple in self.store.couple_relationships_of(person)? {
                    let Some(partner) = couple.partner_of(person) else {
                        continue;
                    };
                    if !context.generations.contains_key(&partner) {
                        context.assign(partner, generation);
                        queue.push_back(partner);
                    }
                }
            }

            if queue.is_empty() {
                break;
            }
        }

        // Relatives first, then anyone else carrying a Generation fact.
        let assigned: Vec<PersonId> = context.generations.keys().copied().collect();
        let others: Vec<PersonId> = self
            .store
            .person_ids()?
            .into_iter()
            .filter(|id| !context.generations.contains_key(id))
            .collect();
        for id in assigned.into_iter().chain(others) {
            if context.reference.is_some() {
                break;
            }
            if let Some(person) = self.store.person_by_id(id)? {
                context.offer_reference(&person);
            }
        }

        Ok(context)
    }

    fn expand_blood(
        &self,
        context: &mut TraversalContext,
        queue: &mut VecDeque<PersonId>,
    ) -> Result<(), KindredError> {
        while let Some(current) = queue.pop_front() {
            let Some(generation) = context.generation(current) else {
                continue;
            };
            for parent in self.store.parents_of(current)? {
                if context.assign(parent, generation.saturating_add(1)) {
                    queue.push_back(parent);
                }
            }
            for child in self.store.children_of(current)? {
                if context.assign(child, generation.saturating_sub(1)) {
                    queue.push_back(child);
                }
            }
        }
        Ok(())
    }

    /// Ahnentafel numbers: start is 1, the father of n is 2n and the mother
    /// 2n+1.
    ///
    /// Under pedigree collapse the smallest number wins. Numbering stops where
    /// the number would overflow.
    pub fn ahnentafel(&self, start: PersonId) -> Result<BTreeMap<PersonId, u64>, KindredError> {
        let mut numbers = BTreeMap::from([(start, 1u64)]);
        let mut queue = VecDeque::from([(start, 1u64, 0u32)]);

        while let Some((current, number, depth)) = queue.pop_front() {
            if depth >= primitives::MAX_AHNENTAFEL_DEPTH {
                continue;
            }
            let Some(base) = number.checked_mul(2) else {
                continue;
            };

            let (father, mother) = self.ordered_parents(current)?;
            for (parent, offset) in [(father, 0u64), (mother, 1u64)] {
                let Some(parent) = parent else { continue };
                let Some(parent_number) = base.checked_add(offset) else {
                    continue;
                };
                if let Entry::Vacant(slot) = numbers.entry(parent) {
                    slot.insert(parent_number);
                    queue.push_back((parent, parent_number, depth + 1));
                }
            }
        }

        Ok(numbers)
    }

    /// Father and mother slots. Parents of unknown gender fill the remaining
    /// slots in id order.
    fn ordered_parents(
        &self,
        person: PersonId,
    ) -> Result<(Option<PersonId>, Option<PersonId>), KindredError> {
        let mut father = None;
        let mut mother = None;
        let mut unplaced = Vec::new();

        for parent in self.store.parents_of(person)? {
            let gender = self
                .store
                .person_by_id(parent)?
                .map(|record| record.gender)
                .unwrap_or_default();
            match gender {
                Gender::Male if father.is_none() => father = Some(parent),
                Gender::Female if mother.is_none() => mother = Some(parent),
                _ => unplaced.push(parent),
            }
        }

        for parent in unplaced {
            if father.is_none() {
                father = Some(parent);
            } else if mother.is_none() {
                mother = Some(parent);
            }
        }

        Ok((father, mother))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::{Fact, FactType, Relationship};

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid date")
    }

    fn store(persons: Vec<Person>, relationships: Vec<Relationship>) -> MemoryStore {
        let mut store = MemoryStore::new();
        for person in persons {
            store.put_person(person).expect("put");
        }
        for rel in relationships {
            store.put_relationship(rel).expect("put");
        }
        store
    }

    fn plain(ids: &[u64]) -> Vec<Person> {
        ids.iter().map(|id| Person::new(PersonId(*id))).collect()
    }

    /// Grandparents 1+2; children 3 and 4; 3+5 have 7; 4+6 have 8.
    fn cousins() -> MemoryStore {
        store(
            plain(&[1, 2, 3, 4, 5, 6, 7, 8]),
            vec![
                Relationship::couple(100, 1, 2),
                Relationship::parent_child(101, 1, 3),
                Relationship::parent_child(102, 2, 3),
                Relationship::parent_child(103, 1, 4),
                Relationship::parent_child(104, 2, 4),
                Relationship::couple(105, 3, 5),
                Relationship::couple(106, 4, 6),
                Relationship::parent_child(107, 3, 7),
                Relationship::parent_child(108, 5, 7),
                Relationship::parent_child(109, 4, 8),
                Relationship::parent_child(110, 6, 8),
            ],
        )
    }

    #[test]
    fn ancestors_include_start_first() {
        let store = cousins();
        let engine = TraversalEngine::new(&store);

        let ancestors = engine.ancestors(PersonId(7)).expect("ancestors");
        assert_eq!(ancestors[0], PersonId(7));
        let set: BTreeSet<_> = ancestors.iter().copied().collect();
        assert_eq!(
            set,
            BTreeSet::from([PersonId(7), PersonId(3), PersonId(5), PersonId(1), PersonId(2)])
        );
        assert_eq!(ancestors.len(), set.len());
    }

    #[test]
    fn descendants_reach_both_cousins_once() {
        let store = cousins();
        let engine = TraversalEngine::new(&store);

        let descendants = engine.descendants(PersonId(1)).expect("descendants");
        assert_eq!(
            descendants,
            vec![PersonId(1), PersonId(3), PersonId(4), PersonId(7), PersonId(8)]
        );
    }

    #[test]
    fn closure_terminates_on_cycles() {
        let store = store(
            plain(&[1, 2]),
            vec![
                Relationship::parent_child(1, 1, 2),
                Relationship::parent_child(2, 2, 1),
            ],
        );
        let engine = TraversalEngine::new(&store);
        assert_eq!(engine.ancestors(PersonId(1)).expect("ancestors").len(), 2);
    }

    #[test]
    fn generations_relative_to_start() {
        let store = cousins();
        let engine = TraversalEngine::new(&store);
        let context = engine
            .assign_generations(PersonId(7), 25, as_of())
            .expect("assign");

        assert_eq!(context.generation(PersonId(7)), Some(0));
        assert_eq!(context.generation(PersonId(3)), Some(1));
        assert_eq!(context.generation(PersonId(1)), Some(2));
        assert_eq!(context.generation(PersonId(4)), Some(1));
        assert_eq!(context.generation(PersonId(8)), Some(0));
        // Married in: reached through the partner.
        assert_eq!(context.generation(PersonId(6)), Some(1));
        assert!(context.conflicts().is_empty());
    }

    #[test]
    fn conflicting_paths_keep_first_value() {
        // 1 is parent of 2 and of 3, and 2 is also parent of 3.
        let store = store(
            plain(&[1, 2, 3]),
            vec![
                Relationship::parent_child(1, 1, 2),
                Relationship::parent_child(2, 1, 3),
                Relationship::parent_child(3, 2, 3),
            ],
        );
        let engine = TraversalEngine::new(&store);
        let context = engine
            .assign_generations(PersonId(3), 25, as_of())
            .expect("assign");

        assert_eq!(context.generation(PersonId(1)), Some(1));
        assert_eq!(context.generation(PersonId(2)), Some(1));
        assert!(!context.conflicts().is_empty());
        assert_eq!(context.conflicts()[0].assigned, 1);
    }

    #[test]
    fn unreachable_person_has_no_generation() {
        let store = store(plain(&[1, 2]), Vec::new());
        let engine = TraversalEngine::new(&store);
        let context = engine
            .assign_generations(PersonId(1), 25, as_of())
            .expect("assign");
        assert_eq!(context.generation(PersonId(2)), None);
    }

    #[test]
    fn age_estimated_from_reference() {
        let mut persons = plain(&[1, 2, 3, 4, 5, 6, 8]);
        persons.push(
            Person::new(PersonId(7)).with_fact(Fact::new(FactType::Birth).with_date("+1990-01-01")),
        );
        let mut store = store(persons, Vec::new());
        for rel in cousins().relationships() {
            store.put_relationship(rel.clone()).expect("put");
        }
        let engine = TraversalEngine::new(&store);
        let context = engine
            .assign_generations(PersonId(7), 25, as_of())
            .expect("assign");

        let reference = context.reference().expect("reference");
        assert_eq!(reference.person, PersonId(7));
        assert_eq!(reference.age, 30);

        let grandparent = store.person_by_id(PersonId(1)).expect("get").expect("exists");
        assert_eq!(context.estimate_age(&grandparent), Some(80));
    }

    #[test]
    fn generation_fact_covers_unlinked_person() {
        let mut persons = plain(&[1, 2]);
        persons.push(
            Person::new(PersonId(3)).with_fact(Fact::new(FactType::Birth).with_date("+1990-01-01")),
        );
        let unlinked =
            Person::new(PersonId(20)).with_fact(Fact::new(FactType::Generation).with_value("1"));
        persons.push(unlinked.clone());
        let store = store(
            persons,
            vec![
                Relationship::couple(10, 1, 2),
                Relationship::parent_child(11, 1, 3),
                Relationship::parent_child(12, 2, 3),
            ],
        );
        let context = TraversalEngine::new(&store)
            .assign_generations(PersonId(3), 25, as_of())
            .expect("assign");

        assert_eq!(context.generation(PersonId(20)), None);
        assert_eq!(context.estimate_age(&unlinked), Some(55));
    }

    #[test]
    fn unlinked_person_can_be_the_reference() {
        let anchor = Person::new(PersonId(9))
            .with_fact(Fact::new(FactType::Generation).with_value("-1"))
            .with_fact(Fact::new(FactType::Birth).with_date("+2000-01-01"));
        let store = store(
            vec![Person::new(PersonId(1)), Person::new(PersonId(2)), anchor],
            vec![Relationship::parent_child(10, 2, 1)],
        );
        let context = TraversalEngine::new(&store)
            .assign_generations(PersonId(1), 25, as_of())
            .expect("assign");

        let reference = context.reference().expect("reference");
        assert_eq!(reference.person, PersonId(9));
        assert_eq!(reference.generation, -1);
        assert_eq!(reference.age, 20);

        let parent = store.person_by_id(PersonId(2)).expect("get").expect("exists");
        assert_eq!(context.estimate_age(&parent), Some(70));
    }

    #[test]
    fn no_reference_means_no_estimate() {
        let store = cousins();
        let engine = TraversalEngine::new(&store);
        let context = engine
            .assign_generations(PersonId(7), 25, as_of())
            .expect("assign");

        assert!(context.reference().is_none());
        assert_eq!(context.estimate_age(&Person::new(PersonId(1))), None);
    }

    #[test]
    fn ahnentafel_numbers_by_gender() {
        let store = store(
            vec![
                Person::new(PersonId(1)),
                Person::new(PersonId(2)).with_gender(Gender::Female),
                Person::new(PersonId(3)).with_gender(Gender::Male),
                Person::new(PersonId(4)).with_gender(Gender::Male),
            ],
            vec![
                Relationship::parent_child(1, 2, 1),
                Relationship::parent_child(2, 3, 1),
                Relationship::parent_child(3, 4, 3),
            ],
        );
        let engine = TraversalEngine::new(&store);
        let numbers = engine.ahnentafel(PersonId(1)).expect("ahnentafel");

        assert_eq!(numbers[&PersonId(1)], 1);
        assert_eq!(numbers[&PersonId(3)], 2);
        assert_eq!(numbers[&PersonId(2)], 3);
        assert_eq!(numbers[&PersonId(4)], 4);
    }

    #[test]
    fn ahnentafel_pedigree_collapse_keeps_smallest() {
        // 2 and 3 are siblings whose child 1 is the start; 4 is parent of both.
        let store = store(
            plain(&[1, 2, 3, 4]),
            vec![
                Relationship::parent_child(1, 2, 1),
                Relationship::parent_child(2, 3, 1),
                Relationship::parent_child(3, 4, 2),
                Relationship::parent_child(4, 4, 3),
            ],
        );
        let engine = TraversalEngine::new(&store);
        let numbers = engine.ahnentafel(PersonId(1)).expect("ahnentafel");
        assert_eq!(numbers[&PersonId(4)], 4);
    }
}
