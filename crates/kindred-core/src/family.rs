//! # Family Deriver
//!
//! Derives nuclear families from raw relationships.
//!
//! A family is never stored in the dataset: it is the pair of parents linked
//! by a Couple relationship (or by shared children) plus the children both of
//! them have. Two families are the same family when their parent pair matches,
//! regardless of order; [`FamilyKey`] is that normalized pair.
//!
//! Results are memoized per person in maps owned by the [`FamilyDeriver`].
//! The maps are only cleared by [`FamilyDeriver::invalidate`], which a session
//! calls when a new dataset is loaded.

use crate::store::EntityStore;
use crate::{KindredError, PersonId, Relationship, RelationshipId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// FAMILY KEY
// =============================================================================

/// Unordered parent pair identifying a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FamilyKey {
    pub low: Option<PersonId>,
    pub high: Option<PersonId>,
}

impl FamilyKey {
    /// Normalize a parent pair.
    #[must_use]
    pub fn new(a: Option<PersonId>, b: Option<PersonId>) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    /// Key of a couple.
    #[must_use]
    pub fn couple(a: PersonId, b: PersonId) -> Self {
        Self::new(Some(a), Some(b))
    }
}

// =============================================================================
// FAMILY VIEW
// =============================================================================

/// A derived nuclear family.
///
/// Equality only looks at the parent pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyView {
    pub parent1: Option<PersonId>,
    pub parent2: Option<PersonId>,
    pub children: Vec<PersonId>,
    /// Couple relationship linking the parents, if recorded.
    pub relationship: Option<RelationshipId>,
    pub marriage_date: Option<String>,
}

impl PartialEq for FamilyView {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for FamilyView {}

impl FamilyView {
    /// Create a family without couple relationship data.
    #[must_use]
    pub fn new(
        parent1: Option<PersonId>,
        parent2: Option<PersonId>,
        children: Vec<PersonId>,
    ) -> Self {
        Self {
            parent1,
            parent2,
            children,
            relationship: None,
            marriage_date: None,
        }
    }

    fn from_couple(couple: Option<&Relationship>, a: PersonId, b: PersonId) -> Self {
        match couple {
            Some(rel) => Self {
                parent1: Some(rel.person1),
                parent2: Some(rel.person2),
                children: Vec::new(),
                relationship: Some(rel.id),
                marriage_date: rel.marriage_date().map(str::to_string),
            },
            None => Self::new(Some(a), Some(b), Vec::new()),
        }
    }

    /// The normalized parent pair.
    #[must_use]
    pub fn key(&self) -> FamilyKey {
        FamilyKey::new(self.parent1, self.parent2)
    }

    /// Present parents, in order.
    pub fn parents(&self) -> impl Iterator<Item = PersonId> + '_ {
        self.parent1.into_iter().chain(self.parent2)
    }

    /// Parents followed by children, without duplicates.
    #[must_use]
    pub fn members(&self) -> Vec<PersonId> {
        let mut seen = BTreeSet::new();
        self.parents()
            .chain(self.children.iter().copied())
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Check if the person is a parent or a child of this family.
    #[must_use]
    pub fn contains(&self, person: PersonId) -> bool {
        self.is_parent(person) || self.children.contains(&person)
    }

    /// Check if the person is one of the parents.
    #[must_use]
    pub fn is_parent(&self, person: PersonId) -> bool {
        self.parent1 == Some(person) || self.parent2 == Some(person)
    }
}

/// Append families whose key is not yet present.
pub(crate) fn extend_unique(
    target: &mut Vec<FamilyView>,
    seen: &mut BTreeSet<FamilyKey>,
    families: impl IntoIterator<Item = FamilyView>,
) {
    for family in families {
        if seen.insert(family.key()) {
            target.push(family);
        }
    }
}

// =============================================================================
// FAMILY DERIVER
// =============================================================================

/// Computes and memoizes families per person.
#[derive(Debug, Clone, Default)]
pub struct FamilyDeriver {
    as_parent: BTreeMap<PersonId, Vec<FamilyView>>,
    as_child: BTreeMap<PersonId, Vec<FamilyView>>,
    /// Incremented on every invalidation (dataset load).
    dataset_generation: u64,
}

impl FamilyDeriver {
    /// Create a deriver with empty caches.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every cached family. Call when a new dataset is loaded.
    pub fn invalidate(&mut self) {
        self.as_parent.clear();
        self.as_child.clear();
        self.dataset_generation = self.dataset_generation.wrapping_add(1);
    }

    /// Number of invalidations since creation.
    #[must_use]
    pub fn dataset_generation(&self) -> u64 {
        self.dataset_generation
    }

    /// Check if the families-as-parent of a person are cached (even if empty).
    #[must_use]
    pub fn is_parent_cached(&self, person: PersonId) -> bool {
        self.as_parent.contains_key(&person)
    }

    /// Check if the families-as-child of a person are cached (even if empty).
    #[must_use]
    pub fn is_child_cached(&self, person: PersonId) -> bool {
        self.as_child.contains_key(&person)
    }

    /// Families in which the person is a parent.
    ///
    /// One family per Couple relationship, including childless couples.
    pub fn families_as_parent<S: EntityStore + ?Sized>(
        &mut self,
        store: &S,
        person: PersonId,
    ) -> Result<Vec<FamilyView>, KindredError> {
        if let Some(cached) = self.as_parent.get(&person) {
            return Ok(cached.clone());
        }

        let mut families = Vec::new();
        let mut seen = BTreeSet::new();

        for couple in store.couple_relationships_of(person)? {
            let Some(partner) = couple.partner_of(person) else {
                continue;
            };
            if partner == person {
                tracing::warn!(
                    person = person.0,
                    relationship = couple.id.0,
                    "couple relationship links a person to itself, skipped"
                );
                continue;
            }
            if store.person_by_id(partner)?.is_none() {
                tracing::warn!(
                    person = person.0,
                    partner = partner.0,
                    relationship = couple.id.0,
                    "couple relationship references a missing person"
                );
            }

            let mut family = FamilyView::from_couple(Some(&couple), person, partner);
            family.children = shared_children(store, person, partner)?;
            extend_unique(&mut families, &mut seen, [family]);
        }

        self.as_parent.insert(person, families.clone());
        Ok(families)
    }

    /// Families in which the person is a child.
    ///
    /// Requires two known parents; a single recorded parent yields nothing.
    pub fn families_as_child<S: EntityStore + ?Sized>(
        &mut self,
        store: &S,
        person: PersonId,
    ) -> Result<Vec<FamilyView>, KindredError> {
        if let Some(cached) = self.as_child.get(&person) {
            return Ok(cached.clone());
        }

        let parents = store.parents_of(person)?;
        let mut families = Vec::new();
        let mut seen = BTreeSet::new();

        if let [a, b] = parents.as_slice() {
            let couple = couple_between(store, *a, *b)?;
            let mut family = FamilyView::from_couple(couple.as_ref(), *a, *b);
            family.children = shared_children(store, *a, *b)?;
            extend_unique(&mut families, &mut seen, [family]);
        } else if parents.len() > 2 {
            tracing::warn!(
                person = person.0,
                parents = parents.len(),
                "more than two parents recorded, using partnered pairs only"
            );
            for (i, a) in parents.iter().enumerate() {
                for b in &parents[i + 1..] {
                    if let Some(couple) = couple_between(store, *a, *b)? {
                        let mut family = FamilyView::from_couple(Some(&couple), *a, *b);
                        family.children = shared_children(store, *a, *b)?;
                        extend_unique(&mut families, &mut seen, [family]);
                    }
                }
            }
        }

        self.as_child.insert(person, families.clone());
        Ok(families)
    }
}

/// The Couple relationship linking two persons, if any.
fn couple_between<S: EntityStore + ?Sized>(
    store: &S,
    a: PersonId,
    b: PersonId,
) -> Result<Option<Relationship>, KindredError> {
    Ok(store
        .couple_relationships_of(a)?
        .into_iter()
        .find(|rel| rel.partner_of(a) == Some(b)))
}

/// Children both persons are recorded as parents of.
fn shared_children<S: EntityStore + ?Sized>(
    store: &S,
    a: PersonId,
    b: PersonId,
) -> Result<Vec<PersonId>, KindredError> {
    let of_b: BTreeSet<PersonId> = store.children_of(b)?.into_iter().collect();
    Ok(store
        .children_of(a)?
        .into_iter()
        .filter(|child| of_b.contains(child))
        .collect())
}

// =============================================================================
// TESTS
// =============================================================================
