use std::collections::BTreeSet;

use chunkrecall::keyspace::{ActivationVector, Atom, Dimension, Family, Key, KeySpace};
use chunkrecall::memory::{ks_crawl, AssociativeStore, Chunk};
use chunkrecall::runtime::{EventKind, Participant, ParticipantConfig};
use chunkrecall::selection::{select, Selection, SelectionPolicy};
use chunkrecall::RecallError;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn memory() -> KeySpace {
    KeySpace::new(
        Family::new("memory")
            .with_dimension(Dimension::digits("number"))
            .with_dimension(Dimension::new("value", ["value"]))
            .with_dimension(Dimension::new("group", ["group"]))
            .with_dimension(Dimension::new("list", ["list"])),
    )
    .unwrap()
}

fn binding(ks: &KeySpace, dim: &str, n: u8) -> (Atom, Atom) {
    (
        ks.resolve(dim).unwrap(),
        ks.resolve(&format!("number._{}", n)).unwrap(),
    )
}

/// A 9-digit list: list chunk, three groups (1.0 · list + 0.9 · group_i)
/// and one value chunk per digit (1.0 · group + 1.0 · digit).
fn nine_digit_list(ks: &KeySpace, digits: [u8; 9]) -> Vec<Chunk> {
    let (list_dim, zero) = binding(ks, "list.list", 0);
    let list = Chunk::builder("list")
        .feature(1.0, &list_dim, &zero)
        .build()
        .unwrap();
    let mut chunks = vec![list.clone()];

    let groups: Vec<Chunk> = (1..=3)
        .map(|i| {
            let (dim, val) = binding(ks, "group.group", i);
            Chunk::builder(&format!("g{}", i))
                .chunk(1.0, &list)
                .feature(0.9, &dim, &val)
                .build()
                .unwrap()
        })
        .collect();
    chunks.extend(groups.iter().cloned());

    for (pos, &d) in digits.iter().enumerate() {
        let (dim, val) = binding(ks, "value.value", d);
        chunks.push(
            Chunk::builder(&format!("v{}", pos))
                .chunk(1.0, &groups[pos / 3])
                .feature(1.0, &dim, &val)
                .build()
                .unwrap(),
        );
    }
    chunks
}

fn studied(config: ParticipantConfig) -> Participant {
    let ks = memory();
    let mut p = Participant::new("participant", ks.clone(), config).unwrap();
    for chunk in nine_digit_list(&ks, [1, 2, 3, 4, 5, 6, 7, 8, 9]) {
        p.compile(chunk).unwrap();
    }
    p.run_until_quiescent().unwrap();
    p
}

/// Drive one cue through the queue, returning the selection it produced.
fn settle(p: &mut Participant) -> Selection {
    let mut selected = None;
    while let Some(event) = p.advance().unwrap() {
        if event.kind == EventKind::SelectionMade {
            selected = Some(p.last_selection().clone());
        }
    }
    selected.unwrap()
}

#[test]
fn list_cue_recovers_each_group_once() {
    let mut p = studied(ParticipantConfig::default());
    let cue = ActivationVector::from_chunks([("list", 1.0)]).unwrap();

    let mut winners = Vec::new();
    for _ in 0..3 {
        p.send(cue.clone());
        match settle(&mut p) {
            Selection::Chunk(name) => winners.push(name),
            Selection::Nil => panic!("nil before all groups were recalled"),
        }
    }
    assert_eq!(winners, vec!["g1", "g2", "g3"]);
    let distinct: BTreeSet<&String> = winners.iter().collect();
    assert_eq!(distinct.len(), 3);
}

#[test]
fn restricted_to_groups_then_nil() {
    let mut p = studied(ParticipantConfig::default());
    p.restrict_candidates(["g1", "g2", "g3"]);
    p.send_chunks(&[("list", 1.0)]).unwrap();

    let mut winners = Vec::new();
    loop {
        match settle(&mut p) {
            Selection::Chunk(name) => winners.push(name),
            Selection::Nil => break,
        }
        p.send_chunks(&[("list", 1.0)]).unwrap();
    }
    assert_eq!(winners, vec!["g1", "g2", "g3"]);
}

#[test]
fn poll_and_crawl_resolve_the_winner() {
    let mut p = studied(ParticipantConfig::default());
    p.send_chunks(&[("list", 1.0)]).unwrap();
    settle(&mut p);
    let polled = p.poll();
    let (key, weight) = polled.strongest().unwrap();
    assert_eq!(weight, 1.0);
    let chunk = ks_crawl(p.store(), key).unwrap();
    assert_eq!(chunk.name(), "g1");
    assert!(ks_crawl(p.store(), &Key::chunk("nil")).unwrap().is_nil());
}

#[test]
fn inhibited_tie_falls_to_the_other_chunk() {
    let ks = memory();
    let (dim, val) = binding(&ks, "value.value", 4);
    let config = ParticipantConfig {
        inhibition_of_return: false,
        ..Default::default()
    };
    let mut p = Participant::new("participant", ks.clone(), config).unwrap();
    for name in ["a", "b"] {
        p.compile(Chunk::builder(name).feature(1.0, &dim, &val).build().unwrap())
            .unwrap();
    }
    let cue = ActivationVector::single(Key::feature(&dim, &val), 1.0).unwrap();

    p.send(cue.clone());
    assert_eq!(settle(&mut p), Selection::Chunk("a".into()));
    p.inhibit("a", 1.0).unwrap();
    p.send(cue.clone());
    assert_eq!(settle(&mut p), Selection::Chunk("b".into()));
    p.inhibit("b", 1.0).unwrap();
    p.send(cue);
    assert_eq!(settle(&mut p), Selection::Nil);
}

#[test]
fn cyclic_definition_leaves_store_untouched() {
    let ks = memory();
    let (dim, val) = binding(&ks, "value.value", 1);
    let mut store = AssociativeStore::new(ks);
    let y = Chunk::builder("y").feature(1.0, &dim, &val).build().unwrap();
    store.compile(y.clone()).unwrap();
    let x = Chunk::builder("x").chunk(1.0, &y).build().unwrap();
    store.compile(x.clone()).unwrap();
    store.take_dirty();

    let y_cyclic = Chunk::builder("y").chunk(1.0, &x).build();
    assert!(matches!(y_cyclic, Err(RecallError::CyclicChunkDefinition(_))));

    // Same loop assembled by re-declaring y against a stale handle to x.
    let stale_x = Chunk::builder("x").build().unwrap();
    let y_redeclared = Chunk::builder("y").chunk(1.0, &stale_x).build().unwrap();
    let before = store.propagate_top_down("y").unwrap();
    assert!(matches!(
        store.compile(y_redeclared),
        Err(RecallError::CyclicChunkDefinition(_))
    ));
    assert_eq!(store.propagate_top_down("y").unwrap(), before);
    assert!(!store.is_dirty());
}

#[test]
fn repeated_compile_is_idempotent() {
    let ks = memory();
    let chunks = nine_digit_list(&ks, [9, 8, 7, 6, 5, 4, 3, 2, 1]);
    let mut once = AssociativeStore::new(ks.clone());
    let mut twice = AssociativeStore::new(ks.clone());
    for chunk in &chunks {
        once.compile(chunk.clone()).unwrap();
        twice.compile(chunk.clone()).unwrap();
        twice.compile(chunk.clone()).unwrap();
    }
    let (dim, val) = binding(&ks, "value.value", 5);
    let cue = ActivationVector::from_pairs([
        (Key::chunk("list"), 1.0),
        (Key::feature(&dim, &val), 1.0),
    ])
    .unwrap();
    assert_eq!(
        once.propagate_bottom_up(&cue).unwrap(),
        twice.propagate_bottom_up(&cue).unwrap()
    );
    for chunk in &chunks {
        assert_eq!(
            once.propagate_top_down(chunk.name()).unwrap(),
            twice.propagate_top_down(chunk.name()).unwrap()
        );
    }
    assert_eq!(once.len(), twice.len());
}

#[test]
fn empty_cue_scores_every_chunk_zero() {
    let ks = memory();
    let mut store = AssociativeStore::new(ks.clone());
    for chunk in nine_digit_list(&ks, [0; 9]) {
        store.compile(chunk).unwrap();
    }
    let scores = store.propagate_bottom_up(&ActivationVector::new()).unwrap();
    assert_eq!(scores.len(), store.len());
    assert!(scores.is_zero());
}

#[test]
fn choice_falls_back_to_nil() {
    let mut rng = StdRng::seed_from_u64(0);
    let scores = ActivationVector::from_chunks([("a", -1.0), ("b", 0.0)]).unwrap();
    let nil = select(&scores, &[], SelectionPolicy::Deterministic, 0.0, &mut rng).unwrap();
    assert!(nil.is_nil());
    let nil = select(&scores, &["a", "b"], SelectionPolicy::Deterministic, 0.0, &mut rng).unwrap();
    assert!(nil.is_nil());
}

#[test]
fn unknown_cue_is_a_stimulus_failure() {
    let mut p = studied(ParticipantConfig::default());
    p.send_chunks(&[("never_studied", 1.0)]).unwrap();
    let err = p.run_until_quiescent().unwrap_err();
    assert!(err.is_stimulus_failure());

    // The participant keeps working after the failed stimulus.
    p.send_chunks(&[("list", 1.0)]).unwrap();
    assert_eq!(settle(&mut p), Selection::Chunk("g1".into()));
}
