// Copyright (C) Parity Technologies (UK) Ltd.
// This file is part of Parity Bridges Common.

// Parity Bridges Common is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// Parity Bridges Common is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with Parity Bridges Common.  If not, see <http://www.gnu.org/licenses/>.

//! Fixture builders. Trees are built with `binary-merkle-tree` and `ckb-merkle-mountain-range`,
//! so the verification code of this crate is checked against independent implementations.

use crate::{keccak, merkle::MerkleProof, mmr::BeefyMmrLeaf};

use mmr_lib::{
	util::{MemMMR, MemStore},
	Merge,
};
use sp_consensus_beefy::mmr::{BeefyNextAuthoritySet, MmrLeafVersion};
use sp_core::H256;
use sp_runtime::traits::Keccak256;

/// MMR leaf with given parent number and some arbitrary (but deterministic) contents.
pub fn test_leaf(parent_number: u32) -> BeefyMmrLeaf {
	test_leaf_with_next_set(parent_number, 1, H256::repeat_byte(0xaa))
}

/// MMR leaf with given parent number and next authority set.
pub fn test_leaf_with_next_set(
	parent_number: u32,
	next_set_id: u64,
	next_set_root: H256,
) -> BeefyMmrLeaf {
	BeefyMmrLeaf {
		version: MmrLeafVersion::new(0, 0),
		parent_number_and_hash: (parent_number, H256::repeat_byte(parent_number as u8)),
		beefy_next_authority_set: BeefyNextAuthoritySet {
			id: next_set_id,
			len: 3,
			keyset_commitment: next_set_root,
		},
		leaf_extra: H256::repeat_byte(0xbb),
	}
}

/// Node merging of the `pallet-mmr` with keccak hasher.
pub struct MergeKeccak;

impl Merge for MergeKeccak {
	type Item = H256;

	fn merge(left: &H256, right: &H256) -> mmr_lib::Result<H256> {
		let mut concat = left.as_bytes().to_vec();
		concat.extend_from_slice(right.as_bytes());
		Ok(H256(sp_crypto_hashing::keccak_256(&concat)))
	}
}

/// In-memory Merkle Mountain Range.
pub struct TestMmr {
	mmr: MemMMR<'static, H256, MergeKeccak>,
	leaf_count: u64,
}

impl Default for TestMmr {
	fn default() -> Self {
		TestMmr { mmr: MemMMR::new(0, Box::leak(Box::<MemStore<H256>>::default())), leaf_count: 0 }
	}
}

impl TestMmr {
	/// Number of leaves.
	pub fn leaf_count(&self) -> u64 {
		self.leaf_count
	}

	/// Append leaf hash.
	pub fn push(&mut self, leaf_hash: H256) {
		self.mmr.push(leaf_hash).expect("in-memory store never fails");
		self.leaf_count += 1;
	}

	/// Bagged root of all peaks.
	pub fn root(&self) -> H256 {
		self.mmr.get_root().expect("at least one leaf is pushed")
	}

	/// Raw proof items for the leaf, in the order they're returned by the chain.
	pub fn gen_proof(&self, leaf_index: u64) -> Vec<H256> {
		self.mmr
			.gen_proof(vec![mmr_lib::leaf_index_to_pos(leaf_index)])
			.expect("leaf is pushed")
			.proof_items()
			.to_vec()
	}
}

/// Root of the binary Merkle tree over hashes of given leaves.
pub fn merkle_root<L: AsRef<[u8]>>(leaves: &[L]) -> H256 {
	binary_merkle_tree::merkle_root::<Keccak256, _>(leaves.iter().map(|leaf| leaf.as_ref()))
}

/// Proof of given leaf in the binary Merkle tree over hashes of given leaves.
pub fn merkle_proof<L: AsRef<[u8]>>(leaves: &[L], leaf_index: u64) -> MerkleProof {
	let proof = binary_merkle_tree::merkle_proof::<Keccak256, _, _>(
		leaves.iter().map(|leaf| leaf.as_ref()),
		leaf_index as u32,
	);
	MerkleProof {
		root: proof.root,
		proof: proof.proof,
		number_of_leaves: proof.number_of_leaves as u64,
		leaf_index: proof.leaf_index as u64,
		leaf: keccak(proof.leaf),
	}
}
