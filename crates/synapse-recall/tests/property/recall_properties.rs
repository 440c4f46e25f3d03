//! Property tests for synapse-recall: Merkle proofs and tamper sensitivity,
//! hitting-set coverage and minimality.

use proptest::prelude::*;

use synapse_core::config::HittingSetStrategy;
use synapse_recall::certificate::compute_root;
use synapse_recall::hitting_set::{satisfies, select};
use synapse_recall::merkle::{leaf_hash, prove, root_of_leaves};
use synapse_recall::CertificateChunk;

const VOCAB: [&str; 6] = ["alpha", "beta", "gamma", "delta", "omega", "sigma"];

fn contents() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{0,12}", 0..40)
}

fn chunk_strategy() -> impl Strategy<Value = CertificateChunk> {
    (
        prop::collection::vec(prop::sample::select(VOCAB.to_vec()), 0..4),
        0.0f64..1.0,
    )
        .prop_map(|(tags, relevance)| CertificateChunk::new("c", "").with_tags(tags).with_relevance(relevance))
}

fn chunks() -> impl Strategy<Value = Vec<CertificateChunk>> {
    prop::collection::vec(chunk_strategy(), 0..8).prop_map(|mut chunks| {
        for (i, chunk) in chunks.iter_mut().enumerate() {
            chunk.id = format!("c{i}");
        }
        chunks
    })
}

fn requirements() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(prop::sample::select(VOCAB.to_vec()), 0..6)
        .prop_map(|r| r.into_iter().map(str::to_string).collect())
}

fn check_cover(chunks: &[CertificateChunk], reqs: &[String], selected: &[usize], unsatisfied: &[String]) -> Result<(), TestCaseError> {
    for req in reqs {
        let coverable = chunks.iter().any(|c| satisfies(c, req));
        let covered = selected.iter().any(|&i| satisfies(&chunks[i], req));
        prop_assert_eq!(coverable, covered, "requirement {}", req);
        prop_assert_eq!(!coverable, unsatisfied.contains(req));
    }
    prop_assert!(selected.windows(2).all(|w| w[0] < w[1]));
    Ok(())
}

proptest! {
    #[test]
    fn every_leaf_proves_into_the_root(contents in contents()) {
        let leaves: Vec<_> = contents.iter().map(|c| leaf_hash(c.as_bytes())).collect();
        let root = root_of_leaves(&leaves);
        for (i, leaf) in leaves.iter().enumerate() {
            let proof = prove(&leaves, i).unwrap();
            prop_assert!(proof.verify(leaf, &root));
        }
        prop_assert!(prove(&leaves, leaves.len()).is_none());
    }

    #[test]
    fn editing_any_chunk_changes_the_root(contents in contents().prop_filter("non-empty", |c| !c.is_empty()), pick in any::<prop::sample::Index>()) {
        let original: Vec<CertificateChunk> = contents.iter().map(|c| CertificateChunk::new("c", c.as_str())).collect();
        let mut edited = original.clone();
        let i = pick.index(edited.len());
        edited[i].content.push('!');
        prop_assert_ne!(compute_root(&original), compute_root(&edited));
    }

    #[test]
    fn reordering_distinct_chunks_changes_the_root(a in "[a-z]{1,8}", b in "[A-Z]{1,8}") {
        let forward = [CertificateChunk::new("1", a.as_str()), CertificateChunk::new("2", b.as_str())];
        let backward = [forward[1].clone(), forward[0].clone()];
        prop_assert_ne!(compute_root(&forward), compute_root(&backward));
    }

    #[test]
    fn greedy_covers_everything_coverable(chunks in chunks(), reqs in requirements()) {
        let cover = select(&chunks, &reqs, HittingSetStrategy::Greedy);
        check_cover(&chunks, &reqs, &cover.selected, &cover.unsatisfied)?;
    }

    #[test]
    fn exhaustive_is_never_larger_than_greedy(chunks in chunks(), reqs in requirements()) {
        let greedy = select(&chunks, &reqs, HittingSetStrategy::Greedy);
        let exact = select(&chunks, &reqs, HittingSetStrategy::Exhaustive { max_chunks: 8 });
        check_cover(&chunks, &reqs, &exact.selected, &exact.unsatisfied)?;
        prop_assert!(exact.selected.len() <= greedy.selected.len());
        prop_assert_eq!(exact.unsatisfied, greedy.unsatisfied);
    }
}
