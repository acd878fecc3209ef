//! # Mode Selector
//!
//! Decides which families a fresh view graph displays.
//!
//! | Mode          | Families                                                    |
//! |---------------|-------------------------------------------------------------|
//! | `default`     | families as parent and as child of the start person         |
//! | `all`         | every family of every person in the dataset                 |
//! | `living`      | `all`, restricted to families touching living relatives     |
//! | `ancestors`   | families as parent of every ancestor (start included)       |
//! | `descendants` | families as child of every descendant (start excluded)      |
//!
//! Lists are de-duplicated by family key, first occurrence kept. An empty
//! selection falls back to `default`.

use crate::family::{extend_unique, FamilyDeriver, FamilyView};
use crate::store::EntityStore;
use crate::traversal::TraversalEngine;
use crate::{KindredError, PersonId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

// =============================================================================
// VIEW MODE
// =============================================================================

/// Selection strategy. String values are stable identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Default,
    All,
    Living,
    Ancestors,
    Descendants,
}

impl ViewMode {
    /// Every mode, in documentation order.
    pub const ALL: [ViewMode; 5] = [
        ViewMode::Default,
        ViewMode::All,
        ViewMode::Living,
        ViewMode::Ancestors,
        ViewMode::Descendants,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Default => "default",
            ViewMode::All => "all",
            ViewMode::Living => "living",
            ViewMode::Ancestors => "ancestors",
            ViewMode::Descendants => "descendants",
        }
    }
}

impl std::fmt::Display for ViewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = KindredError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViewMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| KindredError::InvalidDataset(format!("unknown view mode: {s}")))
    }
}

// =============================================================================
// MODE SELECTOR
// =============================================================================

/// Family selection over a store and a deriver.
pub struct ModeSelector<'a, S: EntityStore + ?Sized> {
    store: &'a S,
    deriver: &'a mut FamilyDeriver,
}

impl<'a, S: EntityStore + ?Sized> ModeSelector<'a, S> {
    pub fn new(store: &'a S, deriver: &'a mut FamilyDeriver) -> Self {
        Self { store, deriver }
    }

    /// Families to display for `start` in `mode`.
    pub fn select(
        &mut self,
        start: PersonId,
        mode: ViewMode,
    ) -> Result<Vec<FamilyView>, KindredError> {
        let selected = match mode {
            ViewMode::Default => self.default_families(start)?,
            ViewMode::All => self.all_families()?,
            ViewMode::Living => self.living_families(start)?,
            ViewMode::Ancestors => self.ancestor_families(start)?,
            ViewMode::Descendants => self.descendant_families(start)?,
        };

        if selected.is_empty() && mode != ViewMode::Default {
            tracing::debug!(start = start.0, %mode, "empty selection, falling back to default");
            return self.default_families(start);
        }
        Ok(selected)
    }

    fn default_families(&mut self, start: PersonId) -> Result<Vec<FamilyView>, KindredError> {
        let mut families = Vec::new();
        let mut seen = BTreeSet::new();
        extend_unique(
            &mut families,
            &mut seen,
            self.deriver.families_as_parent(self.store, start)?,
        );
        extend_unique(
            &mut families,
            &mut seen,
            self.deriver.families_as_child(self.store, start)?,
        );
        Ok(families)
    }

    fn all_families(&mut self) -> Result<Vec<FamilyView>, KindredError> {
        let mut families = Vec::new();
        let mut seen = BTreeSet::new();
        for person in self.store.person_ids()? {
            extend_unique(
                &mut families,
                &mut seen,
                self.deriver.families_as_parent(self.store, person)?,
            );
            extend_unique(
                &mut families,
                &mut seen,
                self.deriver.families_as_child(self.store, person)?,
            );
        }
        Ok(families)
    }

    /// Families with a member that is a living relative of `start` or an
    /// ancestor of one.
    fn living_families(&mut self, start: PersonId) -> Result<Vec<FamilyView>, KindredError> {
        let engine = TraversalEngine::new(self.store);

        let mut relatives: BTreeSet<PersonId> = engine.ancestors(start)?.into_iter().collect();
        relatives.extend(engine.descendants(start)?);

        let mut keep = BTreeSet::new();
        for person in relatives {
            let living = self
                .store
                .person_by_id(person)?
                .is_some_and(|record| record.is_living());
            if living && !keep.contains(&person) {
                keep.extend(engine.ancestors(person)?);
            }
        }

        Ok(self
            .all_families()?
            .into_iter()
            .filter(|family| family.members().iter().any(|member| keep.contains(member)))
            .collect())
    }

    fn ancestor_families(&mut self, start: PersonId) -> Result<Vec<FamilyView>, KindredError> {
        let mut families = Vec::new();
        let mut seen = BTreeSet::new();
        for person in TraversalEngine::new(self.store).ancestors(start)? {
            extend_unique(
                &mut families,
                &mut seen,
                self.deriver.families_as_parent(self.store, person)?,
            );
        }
        Ok(families)
    }

    fn descendant_families(&mut self, start: PersonId) -> Result<Vec<FamilyView>, KindredError> {
        let mut families = Vec::new();
        let mut seen = BTreeSet::new();
        for person in TraversalEngine::new(self.store).descendants(start)? {
            if person == start {
                continue;
            }
            extend_unique(
                &mut families,
                &mut seen,
                self.deriver.families_as_child(self.store, person)?,
            );
        }
        Ok(families)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::FamilyKey;
    use crate::store::MemoryStore;
    use crate::{Fact, FactType, Person, Relationship};

    /// 1+2 -> 3; 3+4 -> 5; 8 unrelated couple with 9. 1 and 2 are dead.
    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        for id in [1, 2] {
            store
                .put_person(Person::new(PersonId(id)).with_fact(Fact::new(FactType::Death)))
                .expect("put");
        }
        for id in [3, 4, 5, 8, 9] {
            store.put_person(Person::new(PersonId(id))).expect("put");
        }
        for rel in [
            Relationship::couple(10, 1, 2),
            Relationship::parent_child(11, 1, 3),
            Relationship::parent_child(12, 2, 3),
            Relationship::couple(13, 3, 4),
            Relationship::parent_child(14, 3, 5),
            Relationship::parent_child(15, 4, 5),
            Relationship::couple(16, 8, 9),
        ] {
            store.put_relationship(rel).expect("put");
        }
        store
    }

    fn keys(families: &[FamilyView]) -> Vec<FamilyKey> {
        families.iter().map(FamilyView::key).collect()
    }

    #[test]
    fn mode_strings_are_stable() {
        for mode in ViewMode::ALL {
            assert_eq!(mode.as_str().parse::<ViewMode>().expect("parse"), mode);
        }
        assert_eq!(ViewMode::Descendants.to_string(), "descendants");
        assert!("sideways".parse::<ViewMode>().is_err());
    }

    #[test]
    fn mode_serde_uses_lowercase() {
        let json = serde_json::to_string(&ViewMode::Living).expect("serialize");
        assert_eq!(json, "\"living\"");
    }

    #[test]
    fn default_mode_parent_and_child_families() {
        let store = store();
        let mut deriver = FamilyDeriver::new();
        let mut selector = ModeSelector::new(&store, &mut deriver);

        let families = selector.select(PersonId(3), ViewMode::Default).expect("select");
        assert_eq!(
            keys(&families),
            vec![
                FamilyKey::couple(PersonId(3), PersonId(4)),
                FamilyKey::couple(PersonId(1), PersonId(2)),
            ]
        );
    }

    #[test]
    fn all_mode_is_deduplicated() {
        let store = store();
        let mut deriver = FamilyDeriver::new();
        let mut selector = ModeSelector::new(&store, &mut deriver);

        let families = selector.select(PersonId(3), ViewMode::All).expect("select");
        assert_eq!(families.len(), 3);
        let unique: BTreeSet<_> = keys(&families).into_iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn ancestors_mode() {
        let store = store();
        let mut deriver = FamilyDeriver::new();
        let mut selector = ModeSelector::new(&store, &mut deriver);

        let families = selector.select(PersonId(5), ViewMode::Ancestors).expect("select");
        assert_eq!(
            keys(&families),
            vec![
                FamilyKey::couple(PersonId(3), PersonId(4)),
                FamilyKey::couple(PersonId(1), PersonId(2)),
            ]
        );
    }

    #[test]
    fn descendants_mode_excludes_start_as_child() {
        let store = store();
        let mut deriver = FamilyDeriver::new();
        let mut selector = ModeSelector::new(&store, &mut deriver);

        let families = selector.select(PersonId(1), ViewMode::Descendants).expect("select");
        assert_eq!(
            keys(&families),
            vec![
                FamilyKey::couple(PersonId(1), PersonId(2)),
                FamilyKey::couple(PersonId(3), PersonId(4)),
            ]
        );
    }

    #[test]
    fn living_mode_drops_unrelated_families() {
        let store = store();
        let mut deriver = FamilyDeriver::new();
        let mut selector = ModeSelector::new(&store, &mut deriver);

        let families = selector.select(PersonId(5), ViewMode::Living).expect("select");
        let keys = keys(&families);
        assert!(keys.contains(&FamilyKey::couple(PersonId(1), PersonId(2))));
        assert!(keys.contains(&FamilyKey::couple(PersonId(3), PersonId(4))));
        assert!(!keys.contains(&FamilyKey::couple(PersonId(8), PersonId(9))));
    }

    #[test]
    fn empty_selection_falls_back_to_default() {
        let store = store();
        let mut deriver = FamilyDeriver::new();
        let mut selector = ModeSelector::new(&store, &mut deriver);

        // 5 has no descendants, so Descendants falls back to 5's own families.
        let families = selector.select(PersonId(5), ViewMode::Descendants).expect("select");
        assert_eq!(keys(&families), vec![FamilyKey::couple(PersonId(3), PersonId(4))]);
    }
}
