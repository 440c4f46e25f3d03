//! Smallest chunk subset whose tags and content satisfy every requirement.
//!
//! Minimum hitting set is NP-hard, so the default strategy is the greedy
//! `ln(n)`-approximation; the exhaustive search is exact for small inputs.

use std::collections::BTreeSet;

use synapse_core::config::HittingSetStrategy;

use crate::certificate::CertificateChunk;

/// Hard ceiling on exhaustive candidates, whatever the configured limit.
pub const EXHAUSTIVE_CEILING: usize = 20;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cover {
    /// Chunk positions, ascending.
    pub selected: Vec<usize>,
    /// Requirements no chunk satisfies, in the order given.
    pub unsatisfied: Vec<String>,
}

/// A tag equal to the requirement, ignoring case, or content containing it.
pub fn satisfies(chunk: &CertificateChunk, requirement: &str) -> bool {
    let needle = requirement.to_lowercase();
    chunk.tags.iter().any(|t| t.to_lowercase() == needle) || chunk.content.to_lowercase().contains(&needle)
}

struct Candidate {
    position: usize,
    relevance: f64,
    covers: BTreeSet<usize>,
}

pub fn select(chunks: &[CertificateChunk], requirements: &[String], strategy: HittingSetStrategy) -> Cover {
    // Duplicate requirements (ignoring case) count once.
    let mut seen = BTreeSet::new();
    let distinct: Vec<&String> = requirements
        .iter()
        .filter(|r| seen.insert(r.to_lowercase()))
        .collect();

    let candidates: Vec<Candidate> = chunks
        .iter()
        .enumerate()
        .map(|(position, chunk)| Candidate {
            position,
            relevance: chunk.relevance,
            covers: distinct
                .iter()
                .enumerate()
                .filter(|(_, r)| satisfies(chunk, r))
                .map(|(i, _)| i)
                .collect(),
        })
        .filter(|c| !c.covers.is_empty())
        .collect();

    let coverable: BTreeSet<usize> = candidates.iter().flat_map(|c| c.covers.iter().copied()).collect();
    let unsatisfied = distinct
        .iter()
        .enumerate()
        .filter(|(i, _)| !coverable.contains(i))
        .map(|(_, r)| (*r).clone())
        .collect();

    let mut selected = match strategy {
        HittingSetStrategy::Exhaustive { max_chunks } if candidates.len() <= max_chunks.min(EXHAUSTIVE_CEILING) => {
            exhaustive(&candidates, &coverable)
        }
        _ => greedy(&candidates, &coverable),
    };
    selected.sort_unstable();
    Cover { selected, unsatisfied }
}

/// Take the chunk covering the most uncovered requirements until none are
/// left. Ties go to higher relevance, then the earlier chunk.
fn greedy(candidates: &[Candidate], coverable: &BTreeSet<usize>) -> Vec<usize> {
    let mut uncovered = coverable.clone();
    let mut selected = Vec::new();
    while !uncovered.is_empty() {
        let best = candidates
            .iter()
            .filter(|c| !selected.contains(&c.position))
            .map(|c| (c, c.covers.intersection(&uncovered).count()))
            .filter(|(_, gain)| *gain > 0)
            .max_by(|(a, gain_a), (b, gain_b)| {
                gain_a
                    .cmp(gain_b)
                    .then_with(|| a.relevance.total_cmp(&b.relevance))
                    .then_with(|| b.position.cmp(&a.position))
            });
        let Some((chunk, _)) = best else {
            break;
        };
        for requirement in &chunk.covers {
            uncovered.remove(requirement);
        }
        selected.push(chunk.position);
    }
    selected
}

/// Every subset, smallest first. Among minimum covers the one with the
/// highest total relevance wins, then the earliest positions.
fn exhaustive(candidates: &[Candidate], coverable: &BTreeSet<usize>) -> Vec<usize> {
    if coverable.is_empty() {
        return Vec::new();
    }
    let mut best: Option<(u32, f64, Vec<usize>)> = None;
    for mask in 1u32..(1u32 << candidates.len()) {
        let size = mask.count_ones();
        if best.as_ref().is_some_and(|(best_size, _, _)| size > *best_size) {
            continue;
        }
        let chosen: Vec<&Candidate> = candidates
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, c)| c)
            .collect();
        let covered: BTreeSet<usize> = chosen.iter().flat_map(|c| c.covers.iter().copied()).collect();
        if covered.len() != coverable.len() {
            continue;
        }
        let relevance: f64 = chosen.iter().map(|c| c.relevance).sum();
        let positions: Vec<usize> = chosen.iter().map(|c| c.position).collect();
        let better = match &best {
            None => true,
            Some((best_size, best_relevance, best_positions)) => {
                size < *best_size
                    || (size == *best_size
                        && (relevance > *best_relevance
                            || (relevance == *best_relevance && positions < *best_positions)))
            }
        };
        if better {
            best = Some((size, relevance, positions));
        }
    }
    best.map(|(_, _, positions)| positions).unwrap_or_default()
}
