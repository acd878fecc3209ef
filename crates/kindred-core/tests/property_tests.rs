//! # Property-Based Tests
//!
//! View graph and traversal invariants over generated pedigrees.
//!
//! Generated trees are acyclic by construction: a parent always has a smaller
//! id than its child.

use kindred_core::{
    Dataset, FamilyKey, FamilyView, NodeType, Person, PersonId, Relationship, Session, ViewMode,
};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeSet;

// =============================================================================
// GENERATORS
// =============================================================================

/// Up to `size` persons; person `i` may get a couple of parents `(a, b)` with
/// `a < b < i`.
fn pedigree(size: u64) -> impl Strategy<Value = Dataset> {
    vec((any::<u64>(), any::<u64>(), any::<bool>()), 1..size as usize).prop_map(|picks| {
        let count = picks.len() as u64 + 1;
        let persons = (1..=count).map(|id| Person::new(PersonId(id))).collect();
        let mut relationships = Vec::new();
        let mut next_id = 1u64;
        let mut couples = BTreeSet::new();

        for (offset, (a, b, with_parents)) in picks.into_iter().enumerate() {
            let child = offset as u64 + 2;
            if !with_parents || child < 3 {
                continue;
            }
            let first = a % (child - 1) + 1;
            let second = b % (child - 1) + 1;
            if first == second {
                continue;
            }
            let (low, high) = (first.min(second), first.max(second));
            if couples.insert((low, high)) {
                relationships.push(Relationship::couple(next_id, low, high));
                next_id += 1;
            }
            relationships.push(Relationship::parent_child(next_id, low, child));
            relationships.push(Relationship::parent_child(next_id + 1, high, child));
            next_id += 2;
        }

        Dataset::new(persons, relationships)
    })
}

fn mode() -> impl Strategy<Value = ViewMode> {
    prop::sample::select(ViewMode::ALL.to_vec())
}

fn all_families(session: &mut Session) -> Vec<FamilyView> {
    session
        .select(PersonId(1), ViewMode::All)
        .expect("select")
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// No two nodes represent the same person or the same family, and no two
    /// links join the same pair of nodes.
    #[test]
    fn dedup_over_any_show_sequence(
        dataset in pedigree(25),
        start in 1u64..25,
        order in vec(any::<prop::sample::Index>(), 0..20),
    ) {
        let start = PersonId(start.min(dataset.persons.len() as u64));
        let mut session = Session::from_dataset(&dataset).expect("load");
        let (mut graph, _) = session
            .build_view_graph(start, ViewMode::Default, |_, _| {})
            .expect("build");
        let families = all_families(&mut session);

        if !families.is_empty() {
            for index in order {
                let family = index.get(&families);
                graph.show_family(family, &mut session).expect("show");
            }
        }

        let mut persons = BTreeSet::new();
        let mut keys = BTreeSet::new();
        for node in graph.nodes() {
            match node.node_type() {
                NodeType::Person => {
                    prop_assert!(persons.insert(node.person().expect("person").id));
                }
                NodeType::Family | NodeType::Etc => {
                    prop_assert!(keys.insert(node.family().expect("family").key()));
                }
            }
        }

        let mut pairs = BTreeSet::new();
        for link in graph.links() {
            let pair = (link.source.min(link.target), link.source.max(link.target));
            prop_assert!(pairs.insert(pair));
            prop_assert!(graph.endpoints(link).is_some());
        }
    }

    /// Showing a family twice changes nothing the second time.
    #[test]
    fn show_family_idempotent(dataset in pedigree(20), pick in any::<prop::sample::Index>()) {
        let mut session = Session::from_dataset(&dataset).expect("load");
        let families = all_families(&mut session);
        prop_assume!(!families.is_empty());
        let family = pick.get(&families).clone();
        let start = family.parents().next().expect("parent");

        let (mut graph, _) = session
            .build_view_graph(start, ViewMode::Default, |_, _| {})
            .expect("build");
        graph.show_family(&family, &mut session).expect("show");
        let nodes = graph.node_count();
        let links = graph.link_count();

        prop_assert!(!graph.show_family(&family, &mut session).expect("show"));
        prop_assert_eq!(graph.node_count(), nodes);
        prop_assert_eq!(graph.link_count(), links);
    }

    /// Showing then hiding a family the view never held leaves exactly its
    /// collapsed node behind.
    #[test]
    fn round_trip_of_unseen_family(dataset in pedigree(20), start in 1u64..20) {
        let start = PersonId(start.min(dataset.persons.len() as u64));
        let mut session = Session::from_dataset(&dataset).expect("load");
        let (mut graph, _) = session
            .build_view_graph(start, ViewMode::Default, |_, _| {})
            .expect("build");
        let unseen = all_families(&mut session).into_iter().find(|family| {
            graph.family_by_key(family.key()).is_none()
                && family.members().iter().all(|member| !graph.contains_person(*member))
        });
        let Some(family) = unseen else {
            return Ok(());
        };

        let nodes = graph.node_count();
        let links = graph.link_count();
        let etcs = graph.etc_count();

        prop_assert!(graph.show_family(&family, &mut session).expect("show"));
        prop_assert!(graph.hide_family(&family).expect("hide"));

        prop_assert_eq!(graph.node_count(), nodes + 1);
        prop_assert_eq!(graph.link_count(), links);
        prop_assert_eq!(graph.etc_count(), etcs + 1);
    }

    /// Families containing the start person are never hidden.
    #[test]
    fn start_families_are_pinned(dataset in pedigree(20), start in 1u64..20, mode in mode()) {
        let start = PersonId(start.min(dataset.persons.len() as u64));
        let mut session = Session::from_dataset(&dataset).expect("load");
        let (mut graph, _) = session
            .build_view_graph(start, mode, |_, _| {})
            .expect("build");

        let pinned: Vec<FamilyView> = graph
            .nodes()
            .iter()
            .filter(|node| node.node_type() == NodeType::Family)
            .filter_map(|node| node.family())
            .filter(|family| family.contains(start))
            .cloned()
            .collect();

        for family in pinned {
            let nodes = graph.node_count();
            prop_assert!(!graph.hide_family(&family).expect("hide"));
            prop_assert_eq!(graph.node_count(), nodes);
            prop_assert!(graph.is_shown(family.key()));
        }
    }

    /// Parents sit exactly one generation above their children whenever the
    /// pedigree reached no conflict.
    #[test]
    fn generation_consistency(dataset in pedigree(25), start in 1u64..25) {
        let start = PersonId(start.min(dataset.persons.len() as u64));
        let mut session = Session::from_dataset(&dataset).expect("load");
        let context = session.prepare(start).expect("prepare");

        prop_assert_eq!(context.generation(start), Some(0));
        if context.conflicts().is_empty() {
            for rel in &dataset.relationships {
                if rel.rel_type != kindred_core::RelationshipType::ParentChild {
                    continue;
                }
                if let (Some(parent), Some(child)) =
                    (context.generation(rel.person1), context.generation(rel.person2))
                {
                    prop_assert_eq!(parent, child + 1);
                }
            }
        }
    }

    /// Ancestor and descendant closures list each person once, start first.
    #[test]
    fn closures_have_no_duplicates(dataset in pedigree(30), start in 1u64..30) {
        let start = PersonId(start.min(dataset.persons.len() as u64));
        let session = Session::from_dataset(&dataset).expect("load");

        for closure in [
            session.ancestors(start).expect("ancestors"),
            session.descendants(start).expect("descendants"),
        ] {
            prop_assert_eq!(closure[0], start);
            let unique: BTreeSet<_> = closure.iter().collect();
            prop_assert_eq!(unique.len(), closure.len());
        }
    }

    /// Mode selection never returns the same family twice.
    #[test]
    fn selection_is_deduplicated(dataset in pedigree(25), start in 1u64..25, mode in mode()) {
        let start = PersonId(start.min(dataset.persons.len() as u64));
        let mut session = Session::from_dataset(&dataset).expect("load");
        let families = session.select(start, mode).expect("select");

        let keys: BTreeSet<FamilyKey> = families.iter().map(FamilyView::key).collect();
        prop_assert_eq!(keys.len(), families.len());
    }
}
