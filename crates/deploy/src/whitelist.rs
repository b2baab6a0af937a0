//! Whitelist entries, mint windows and the Merkle commitment over the whitelist.
//!
//! The orchestrator only ever receives a precomputed whitelist root. Building the
//! tree happens out-of-band through a [`MerkleTreeBuilder`]; the provided
//! [`StandardMerkleTree`] produces the same root and proofs as the OpenZeppelin
//! standard tree for the `(address, uint32)` leaf encoding, so the deployed
//! contract can check proofs with `MerkleProof.verify`.

use std::path::Path;

use alloy_core::{
    dyn_abi::DynSolValue,
    primitives::{Address, B256, U256, keccak256},
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Solidity types of a whitelist leaf.
pub const LEAF_ENCODING: [&str; 2] = ["address", "uint32"];

/// Dump format identifier shared with the OpenZeppelin tooling.
const DUMP_FORMAT: &str = "standard-v1";

/// An account allowed to mint from `mint_time` onward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhitelistEntry {
    pub account: Address,
    pub mint_time: u32,
}

impl WhitelistEntry {
    pub fn new(account: Address, mint_time: u32) -> Self {
        Self { account, mint_time }
    }

    /// Whether the entry admits minting at unix time `now`.
    pub fn can_mint(&self, now: u64) -> bool {
        u64::from(self.mint_time) <= now
    }

    /// Double keccak of `abi.encode(account, mintTime)`.
    pub fn leaf_hash(&self) -> B256 {
        let encoded = DynSolValue::Tuple(vec![
            DynSolValue::Address(self.account),
            DynSolValue::Uint(U256::from(self.mint_time), 32),
        ])
        .abi_encode_params();
        keccak256(keccak256(encoded))
    }
}

/// Read a whitelist from a JSON array of `{ "account", "mintTime" }` objects.
pub fn read_whitelist(path: &Path) -> Result<Vec<WhitelistEntry>> {
    let content = std::fs::read_to_string(path)
        .context(format!("Failed to read whitelist from {}", path.display()))?;
    serde_json::from_str(&content).context("Failed to parse whitelist JSON")
}

/// Time after which any account may mint without a whitelist proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintWindow {
    pub public_mint_time: u32,
}

impl MintWindow {
    pub fn can_public_mint(&self, now: u64) -> bool {
        now >= u64::from(self.public_mint_time)
    }
}

/// Root and per-entry proofs of a whitelist commitment.
///
/// `proofs[i]` proves membership of the i-th entry given to the builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    pub root: B256,
    pub proofs: Vec<Vec<B256>>,
}

/// Builds a Merkle commitment over whitelist entries.
pub trait MerkleTreeBuilder {
    fn build(&self, entries: &[WhitelistEntry]) -> Result<MerkleTree>;
}

/// Builder producing [`StandardMerkleTree`] commitments.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardTreeBuilder;

impl MerkleTreeBuilder for StandardTreeBuilder {
    fn build(&self, entries: &[WhitelistEntry]) -> Result<MerkleTree> {
        let tree = StandardMerkleTree::of(entries)?;
        Ok(MerkleTree {
            root: tree.root(),
            proofs: (0..entries.len()).map(|i| tree.proof(i)).collect(),
        })
    }
}

/// A value of the tree together with the index of its leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
struct IndexedValue {
    entry: WhitelistEntry,
    tree_index: usize,
}

/// Complete binary Merkle tree laid out as an array, root at index 0.
///
/// Leaves are sorted by hash and stored at the end of the array in reverse
/// order; inner nodes hash the sorted pair of their children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardMerkleTree {
    tree: Vec<B256>,
    values: Vec<IndexedValue>,
}

impl StandardMerkleTree {
    pub fn of(entries: &[WhitelistEntry]) -> Result<Self> {
        anyhow::ensure!(
            !entries.is_empty(),
            "Cannot build a Merkle tree without leaves"
        );

        let mut hashed: Vec<(usize, B256)> = entries
            .iter()
            .map(WhitelistEntry::leaf_hash)
            .enumerate()
            .collect();
        hashed.sort_by(|a, b| a.1.cmp(&b.1));

        let len = 2 * hashed.len() - 1;
        let mut tree = vec![B256::ZERO; len];
        let mut tree_indices = vec![0; entries.len()];
        for (leaf_index, (value_index, hash)) in hashed.iter().enumerate() {
            let tree_index = len - 1 - leaf_index;
            tree[tree_index] = *hash;
            tree_indices[*value_index] = tree_index;
        }
        for i in (0..len - hashed.len()).rev() {
            tree[i] = hash_pair(tree[2 * i + 1], tree[2 * i + 2]);
        }

        let values = entries
            .iter()
            .zip(tree_indices)
            .map(|(entry, tree_index)| IndexedValue {
                entry: *entry,
                tree_index,
            })
            .collect();

        Ok(Self { tree, values })
    }

    pub fn root(&self) -> B256 {
        self.tree[0]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Proof for the entry at `index` in the original input order.
    ///
    /// # Panics
    /// If `index` is out of bounds.
    pub fn proof(&self, index: usize) -> Vec<B256> {
        let mut node = self.values[index].tree_index;
        let mut proof = Vec::new();
        while node > 0 {
            let sibling = if node % 2 == 1 { node + 1 } else { node - 1 };
            proof.push(self.tree[sibling]);
            node = (node - 1) / 2;
        }
        proof
    }

    /// Check `proof` for `entry` against `root`.
    pub fn verify(root: B256, entry: &WhitelistEntry, proof: &[B256]) -> bool {
        let computed = proof
            .iter()
            .fold(entry.leaf_hash(), |node, sibling| hash_pair(node, *sibling));
        computed == root
    }

    /// Serializable dump, readable by the OpenZeppelin `StandardMerkleTree.load`.
    pub fn dump(&self) -> StandardTreeDump {
        StandardTreeDump {
            format: DUMP_FORMAT.to_string(),
            leaf_encoding: LEAF_ENCODING.iter().map(|t| t.to_string()).collect(),
            tree: self.tree.clone(),
            values: self
                .values
                .iter()
                .map(|value| DumpedValue {
                    value: (value.entry.account, value.entry.mint_time),
                    tree_index: value.tree_index,
                })
                .collect(),
        }
    }
}

/// JSON layout of a dumped standard tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardTreeDump {
    pub format: String,
    pub leaf_encoding: Vec<String>,
    pub tree: Vec<B256>,
    pub values: Vec<DumpedValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DumpedValue {
    pub value: (Address, u32),
    pub tree_index: usize,
}

fn hash_pair(a: B256, b: B256) -> B256 {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(first.as_slice());
    buf[32..].copy_from_slice(second.as_slice());
    keccak256(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(count: u8) -> Vec<WhitelistEntry> {
        (1..=count)
            .map(|i| WhitelistEntry::new(Address::repeat_byte(i), 1_709_337_600 + u32::from(i)))
            .collect()
    }

    #[test]
    fn test_leaf_hash_matches_abi_encoding() {
        let entry = WhitelistEntry::new(Address::repeat_byte(0x11), 5);
        let mut encoded = [0u8; 64];
        encoded[12..32].copy_from_slice(Address::repeat_byte(0x11).as_slice());
        encoded[63] = 5;

        assert_eq!(entry.leaf_hash(), keccak256(keccak256(encoded)));
    }

    #[test]
    fn test_single_leaf_tree() {
        let entries = entries(1);
        let tree = StandardMerkleTree::of(&entries).unwrap();

        assert_eq!(tree.root(), entries[0].leaf_hash());
        assert!(tree.proof(0).is_empty());
        assert!(StandardMerkleTree::verify(tree.root(), &entries[0], &[]));
    }

    #[test]
    fn test_every_proof_verifies() {
        for count in [2u8, 3, 5, 8] {
            let entries = entries(count);
            let built = StandardTreeBuilder.build(&entries).unwrap();

            assert_eq!(built.proofs.len(), entries.len());
            for (entry, proof) in entries.iter().zip(&built.proofs) {
                assert!(
                    StandardMerkleTree::verify(built.root, entry, proof),
                    "proof failed for {entry:?} in a tree of {count}"
                );
            }
        }
    }

    #[test]
    fn test_root_is_independent_of_input_order() {
        let entries = entries(5);
        let mut reversed = entries.clone();
        reversed.reverse();

        assert_eq!(
            StandardMerkleTree::of(&entries).unwrap().root(),
            StandardMerkleTree::of(&reversed).unwrap().root()
        );
    }

    #[test]
    fn test_tampered_entry_does_not_verify() {
        let entries = entries(4);
        let tree = StandardMerkleTree::of(&entries).unwrap();
        let proof = tree.proof(2);

        let mut tampered = entries[2];
        tampered.mint_time -= 1;
        assert!(!StandardMerkleTree::verify(tree.root(), &tampered, &proof));
    }

    #[test]
    fn test_empty_whitelist_is_rejected() {
        assert!(StandardMerkleTree::of(&[]).is_err());
    }

    #[test]
    fn test_dump_layout() {
        let entries = entries(3);
        let tree = StandardMerkleTree::of(&entries).unwrap();
        let dump = serde_json::to_value(tree.dump()).unwrap();

        assert_eq!(dump["format"], "standard-v1");
        assert_eq!(dump["leafEncoding"], serde_json::json!(["address", "uint32"]));
        assert_eq!(dump["tree"].as_array().unwrap().len(), 5);
        assert_eq!(dump["values"].as_array().unwrap().len(), 3);
        assert_eq!(dump["values"][0]["value"][1], entries[0].mint_time);
    }

    #[test]
    fn test_mint_windows() {
        let entry = WhitelistEntry::new(Address::ZERO, 100);
        assert!(!entry.can_mint(99));
        assert!(entry.can_mint(100));

        let window = MintWindow {
            public_mint_time: 200,
        };
        assert!(!window.can_public_mint(199));
        assert!(window.can_public_mint(200));
    }
}
