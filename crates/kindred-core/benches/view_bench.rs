//! # View Benchmarks
//!
//! Performance benchmarks for view graph population and traversal.
//!
//! Run with: `cargo bench -p kindred-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use kindred_core::{Dataset, Person, PersonId, Relationship, Session, ViewMode};
use std::hint::black_box;

/// A full binary pedigree of `depth` generations above person 1.
///
/// Person n has father 2n and mother 2n+1, each pair linked as a couple.
fn create_pedigree(depth: u32) -> Dataset {
    let count = (1u64 << depth) - 1;
    let persons = (1..=count).map(|id| Person::new(PersonId(id))).collect();
    let mut relationships = Vec::new();
    let mut next_id = 1;

    for child in 1..=count {
        let father = child * 2;
        let mother = father + 1;
        if mother > count {
            break;
        }
        relationships.push(Relationship::couple(next_id, father, mother));
        relationships.push(Relationship::parent_child(next_id + 1, father, child));
        relationships.push(Relationship::parent_child(next_id + 2, mother, child));
        next_id += 3;
    }

    Dataset::new(persons, relationships)
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_build_view(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_view_graph");

    for depth in [4u32, 6, 8] {
        let dataset = create_pedigree(depth);
        for mode in [ViewMode::Ancestors, ViewMode::All] {
            group.bench_with_input(
                BenchmarkId::new(mode.as_str(), depth),
                &dataset,
                |b, dataset| {
                    b.iter(|| {
                        let mut session = Session::from_dataset(dataset).expect("load");
                        let built = session
                            .build_view_graph(PersonId(1), mode, |_, _| {})
                            .expect("build");
                        black_box(built)
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_ancestors(c: &mut Criterion) {
    let mut group = c.benchmark_group("ancestors");

    for depth in [6u32, 10, 12] {
        let session = Session::from_dataset(&create_pedigree(depth)).expect("load");
        group.bench_with_input(BenchmarkId::from_parameter(depth), &session, |b, session| {
            b.iter(|| black_box(session.ancestors(PersonId(1)).expect("ancestors")));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build_view, bench_ancestors);
criterion_main!(benches);
