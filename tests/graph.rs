use score_engine::sig::{
    ExclusionCause, HorizontalSide, InterId, Interpretation, Median, Relation, Shape, Sig,
};

fn beam(x1: f64, x2: f64, y: f64) -> Interpretation {
    Interpretation::new(Shape::Beam, Median::horizontal(x1, x2, y, 10.0), 0.8)
}

#[test]
fn composite_replacement_leaves_no_trace_of_the_source() {
    let mut sig = Sig::new();
    let bar = sig.add_vertex(beam(100.0, 300.0, 140.0));
    let rival = sig.add_vertex(beam(100.0, 200.0, 120.0));
    sig.add_edge(
        bar,
        rival,
        Relation::Exclusion {
            cause: ExclusionCause::Overlap,
        },
    )
    .unwrap();

    // Replacement protocol: build the composite first, then retract the bar.
    let rest = sig.add_vertex(Interpretation::new(
        Shape::MultiRest,
        Median::horizontal(100.0, 300.0, 140.0, 10.0),
        0.8,
    ));
    for (x, side) in [(100.0, HorizontalSide::Left), (300.0, HorizontalSide::Right)] {
        let serif = sig.add_vertex(Interpretation::new(
            Shape::Serif,
            Median::vertical(x, 120.0, 160.0, 4.0),
            0.8,
        ));
        sig.add_edge(rest, serif, Relation::RestSerif { side }).unwrap();
    }
    let removed = sig.delete_vertices(&[bar]);

    assert!(!sig.contains(bar));
    assert_eq!(removed.len(), 1, "only the bar's exclusion edge dies");
    assert_eq!(sig.inters_of(Shape::MultiRest), vec![rest]);
    assert_eq!(sig.degree(rest), 2);

    let sides: Vec<HorizontalSide> = sig
        .edges_of(rest)
        .into_iter()
        .filter_map(|(_, edge)| match edge.relation {
            Relation::RestSerif { side } => Some(side),
            _ => None,
        })
        .collect();
    assert_eq!(sides, vec![HorizontalSide::Left, HorizontalSide::Right]);
}

#[test]
fn exclusion_resolution_keeps_the_better_grade() {
    let mut sig = Sig::new();
    let strong = sig.add_vertex(Interpretation::new(
        Shape::Ledger,
        Median::horizontal(100.0, 140.0, 200.0, 3.0),
        0.9,
    ));
    let weak = sig.add_vertex(Interpretation::new(
        Shape::Ledger,
        Median::horizontal(130.0, 170.0, 201.0, 3.0),
        0.4,
    ));
    sig.add_edge(
        strong,
        weak,
        Relation::Exclusion {
            cause: ExclusionCause::Overlap,
        },
    )
    .unwrap();

    let loser = if sig.inter(strong).unwrap().grade() >= sig.inter(weak).unwrap().grade() {
        weak
    } else {
        strong
    };
    sig.delete_vertices(&[loser]);

    assert!(sig.contains(strong));
    assert!(!sig.contains(weak));
    assert_eq!(sig.edge_count(), 0);
}

/// Tiny deterministic generator, good enough to shuffle mutation orders.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

#[test]
fn random_mutations_never_leave_dangling_edges() {
    let mut rng = Lcg(0xfeed5eed);
    let mut sig = Sig::new();
    let mut alive: Vec<InterId> = Vec::new();

    for round in 0..500 {
        match rng.next() % 4 {
            // Grow the graph most of the time.
            0 | 1 => {
                let id = sig.add_vertex(beam(0.0, 100.0, round as f64));
                alive.push(id);
            }
            2 if alive.len() >= 2 => {
                let a = alive[(rng.next() as usize) % alive.len()];
                let b = alive[(rng.next() as usize) % alive.len()];
                if a != b {
                    sig.add_edge(a, b, Relation::LedgerNeighbor).unwrap();
                }
            }
            3 if !alive.is_empty() => {
                let victim = alive.swap_remove((rng.next() as usize) % alive.len());
                sig.delete_vertices(&[victim]);
                assert!(!sig.contains(victim));
            }
            _ => {}
        }

        assert_eq!(sig.vertex_count(), alive.len());
        for &id in &alive {
            for (_, edge) in sig.edges_of(id) {
                assert!(sig.contains(edge.source), "dangling source after round {round}");
                assert!(sig.contains(edge.target), "dangling target after round {round}");
            }
        }
    }
}

#[test]
fn deleting_everything_empties_the_graph() {
    let mut sig = Sig::new();
    let ids: Vec<InterId> = (0..10).map(|i| sig.add_vertex(beam(0.0, 50.0, i as f64))).collect();
    for pair in ids.windows(2) {
        sig.add_edge(pair[0], pair[1], Relation::LedgerNeighbor).unwrap();
    }
    sig.delete_vertices(&ids);
    assert_eq!(sig.vertex_count(), 0);
    assert_eq!(sig.edge_count(), 0);
}
