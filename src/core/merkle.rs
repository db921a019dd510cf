// Merkle root and inclusion paths over transaction ids

use crate::core::{hash256_pair, Hash256};

/// One level of an inclusion proof
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MerkleStep {
    /// `true` when the sibling is the left operand
    pub orientation: bool,
    pub hash: Hash256,
}

/// Inclusion proof, ordered from the leaf level up to the root
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
#[serde(transparent)]
pub struct MerklePath(Vec<MerkleStep>);

impl MerklePath {
    pub fn new(steps: Vec<MerkleStep>) -> Self {
        Self(steps)
    }

    pub fn steps(&self) -> &[MerkleStep] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fold `leaf` with every step to recover the root
    pub fn root_from(&self, leaf: &Hash256) -> Hash256 {
        self.0.iter().fold(*leaf, |acc, step| {
            if step.orientation {
                hash256_pair(&step.hash, &acc)
            } else {
                hash256_pair(&acc, &step.hash)
            }
        })
    }

    /// Check that `leaf` is committed to by `root`
    pub fn verify(&self, leaf: &Hash256, root: &Hash256) -> bool {
        self.root_from(leaf) == *root
    }
}

/// Hash adjacent pairs, duplicating the last node of an odd level
fn next_level(level: &[Hash256]) -> Vec<Hash256> {
    level
        .chunks(2)
        .map(|pair| {
            let left = &pair[0];
            let right = pair.get(1).unwrap_or(left);
            hash256_pair(left, right)
        })
        .collect()
}

/// Merkle root of `leaves`, or `None` for an empty set
pub fn merkle_root(leaves: &[Hash256]) -> Option<Hash256> {
    if leaves.is_empty() {
        return None;
    }

    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = next_level(&level);
        log::trace!("merkle level reduced to {} nodes", level.len());
    }
    Some(level[0])
}

/// Inclusion path for `leaves[index]`, or `None` if `index` is out of range
pub fn merkle_path(leaves: &[Hash256], index: usize) -> Option<MerklePath> {
    if index >= leaves.len() {
        return None;
    }

    let mut steps = Vec::new();
    let mut level = leaves.to_vec();
    let mut position = index;

    while level.len() > 1 {
        let sibling = (position ^ 1).min(level.len() - 1);
        steps.push(MerkleStep {
            orientation: position % 2 == 1,
            hash: level[sibling],
        });
        level = next_level(&level);
        position /= 2;
    }

    Some(MerklePath(steps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hash256;

    fn block_100000_txids() -> Vec<Hash256> {
        [
            "8c14f0db3df150123e6f3dbbf30f8b955a8249b62ac1d1ff16284aefa3d06d87",
            "fff2525b8931402dd09222c50775608f75787bd2b87e56995a7bdd30f79702c4",
            "6359f0868171b1d194cbee1af2f16ea598ae8fad666d9b012c8ed2b79a236ec4",
            "e9a66845e05d5abc0ad04ec80f774a7e585c6e8db975962d069a522137b80c1d",
        ]
        .iter()
        .map(|id| Hash256::from_hex(id).unwrap())
        .collect()
    }

    #[test]
    fn test_block_100000_root() {
        let root = merkle_root(&block_100000_txids()).unwrap();
        assert_eq!(
            root.to_hex(),
            "f3e94742aca4b5ef85488dc37c06c3282295ffec960994b2c0d5ac2a25a95766"
        );
    }

    #[test]
    fn test_empty_and_single() {
        assert_eq!(merkle_root(&[]), None);
        assert_eq!(merkle_path(&[], 0), None);

        let leaf = hash256(b"only");
        assert_eq!(merkle_root(&[leaf]), Some(leaf));
        let path = merkle_path(&[leaf], 0).unwrap();
        assert!(path.is_empty());
        assert!(path.verify(&leaf, &leaf));
    }

    #[test]
    fn test_odd_level_duplicates_last() {
        let a = hash256(b"a");
        let b = hash256(b"b");
        let c = hash256(b"c");

        let expected = hash256_pair(&hash256_pair(&a, &b), &hash256_pair(&c, &c));
        let root = merkle_root(&[a, b, c]).unwrap();
        assert_eq!(root, expected);
        assert_eq!(
            root.to_hex(),
            "bf0ca48d50405f62cb40fa67c6f9fd9309e9a5fcb2ad05d3976ecb28839b4474"
        );
    }

    #[test]
    fn test_path_for_duplicated_leaf() {
        let leaves = [hash256(b"a"), hash256(b"b"), hash256(b"c")];
        let path = merkle_path(&leaves, 2).unwrap();

        // Sibling of the odd leaf is itself, on the right
        assert_eq!(path.steps()[0], MerkleStep { orientation: false, hash: leaves[2] });
        assert_eq!(
            path.steps()[1],
            MerkleStep { orientation: true, hash: hash256_pair(&leaves[0], &leaves[1]) }
        );
    }

    #[test]
    fn test_every_path_verifies() {
        for n in 1..=9 {
            let leaves: Vec<Hash256> = (0..n as u32).map(|i| hash256(&i.to_le_bytes())).collect();
            let root = merkle_root(&leaves).unwrap();
            for (i, leaf) in leaves.iter().enumerate() {
                let path = merkle_path(&leaves, i).unwrap();
                assert!(path.verify(leaf, &root), "leaf {} of {}", i, n);
            }
        }
    }

    #[test]
    fn test_wrong_leaf_or_root_fails() {
        let leaves = block_100000_txids();
        let root = merkle_root(&leaves).unwrap();
        let path = merkle_path(&leaves, 1).unwrap();

        assert_eq!(path.len(), 2);
        assert!(path.verify(&leaves[1], &root));
        assert!(!path.verify(&leaves[0], &root));
        assert!(!path.verify(&leaves[1], &Hash256::zero()));
    }

    #[test]
    fn test_index_out_of_range() {
        assert_eq!(merkle_path(&block_100000_txids(), 4), None);
    }
}
