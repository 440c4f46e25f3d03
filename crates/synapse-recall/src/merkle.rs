//! Binary Merkle tree over chunk contents.
//!
//! Leaves are `blake3(0x00 || content)` and inner nodes
//! `blake3(0x01 || left || right)`, so a leaf can never be passed off as an
//! inner node. A node without a sibling is promoted unchanged to the next
//! level. The root of an empty tree is `blake3(0x00)`.

use blake3::{Hash, Hasher};

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

pub fn leaf_hash(content: &[u8]) -> Hash {
    let mut hasher = Hasher::new();
    hasher.update(&[LEAF_PREFIX]);
    hasher.update(content);
    hasher.finalize()
}

pub fn node_hash(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Hasher::new();
    hasher.update(&[NODE_PREFIX]);
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    hasher.finalize()
}

fn next_level(level: &[Hash]) -> Vec<Hash> {
    level
        .chunks(2)
        .filter_map(|pair| match pair {
            [left, right] => Some(node_hash(left, right)),
            [single] => Some(*single),
            _ => None,
        })
        .collect()
}

pub fn root_of_leaves(leaves: &[Hash]) -> Hash {
    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = next_level(&level);
    }
    level.first().copied().unwrap_or_else(|| leaf_hash(&[]))
}

/// Root over contents in order.
pub fn merkle_root<I, C>(contents: I) -> Hash
where
    I: IntoIterator<Item = C>,
    C: AsRef<[u8]>,
{
    let leaves: Vec<Hash> = contents.into_iter().map(|c| leaf_hash(c.as_ref())).collect();
    root_of_leaves(&leaves)
}

/// Which side the sibling sits on when folding a proof upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Inclusion proof for one leaf: siblings from the bottom up. Levels where
/// the node was promoted contribute no step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleProof {
    pub leaf_index: usize,
    pub steps: Vec<(Side, Hash)>,
}

impl MerkleProof {
    /// Fold `leaf` up through the proof and compare with `root`.
    pub fn verify(&self, leaf: &Hash, root: &Hash) -> bool {
        let computed = self.steps.iter().fold(*leaf, |acc, (side, sibling)| match side {
            Side::Left => node_hash(sibling, &acc),
            Side::Right => node_hash(&acc, sibling),
        });
        computed == *root
    }
}

/// Proof that `leaves[index]` is under `root_of_leaves(leaves)`.
pub fn prove(leaves: &[Hash], index: usize) -> Option<MerkleProof> {
    if index >= leaves.len() {
        return None;
    }
    let mut steps = Vec::new();
    let mut level = leaves.to_vec();
    let mut position = index;
    while level.len() > 1 {
        let sibling = position ^ 1;
        if let Some(hash) = level.get(sibling) {
            let side = if sibling < position { Side::Left } else { Side::Right };
            steps.push((side, *hash));
        }
        level = next_level(&level);
        position /= 2;
    }
    Some(MerkleProof {
        leaf_index: index,
        steps,
    })
}
