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

//! BEEFY MMR proofs.
//!
//! The MMR positions are numbered in the post-order, the same way `ckb-merkle-mountain-range`
//! does it. The raw proof (as returned by `mmr_generateProof`) contains: one item per peak
//! that is to the left of the leaf peak, then the leaf path inside its peak (bottom-up),
//! then one item that is the bagged hash of all peaks to the right of the leaf peak (if any).

use crate::{keccak, keccak_pair, Error};

use codec::{Decode, Encode};
use sp_consensus_beefy::mmr::MmrLeaf;
use sp_core::H256;

/// MMR leaf of Polkadot-like relay chain. Leaf extra is the root of parachain heads.
pub type BeefyMmrLeaf = MmrLeaf<u32, H256, H256, H256>;

/// Max number of hashing steps that fit the order bitfield.
pub const MAX_PROOF_STEPS: usize = u64::BITS as usize;

/// MMR proof in the form that may be verified by a simple fold.
///
/// Bit `i` of `merkle_proof_order` is set if `merkle_proof_items[i]` is the left operand of
/// `i`-th hashing step.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct SimplifiedMmrProof {
	/// Sibling hashes, in hashing order.
	pub merkle_proof_items: Vec<H256>,
	/// Hashing order bitfield.
	pub merkle_proof_order: u64,
	/// Hash of the block at which the proof has been generated.
	pub block_hash: H256,
	/// The leaf itself.
	pub leaf: BeefyMmrLeaf,
}

impl SimplifiedMmrProof {
	/// Recompute MMR root from the leaf and proof items.
	pub fn root(&self) -> H256 {
		calculate_merkle_root(hash_leaf(&self.leaf), &self.merkle_proof_items, self.merkle_proof_order)
	}
}

/// Hash of the MMR leaf, as it is computed by the `pallet-mmr`.
pub fn hash_leaf(leaf: &BeefyMmrLeaf) -> H256 {
	keccak(&leaf.encode())
}

/// Fold proof items over the leaf hash.
pub fn calculate_merkle_root(leaf_hash: H256, items: &[H256], order: u64) -> H256 {
	items.iter().enumerate().fold(leaf_hash, |current, (index, item)| {
		let is_sibling_left = index < MAX_PROOF_STEPS && (order >> index) & 1 == 1;
		if is_sibling_left {
			keccak_pair(item, &current)
		} else {
			keccak_pair(&current, item)
		}
	})
}

/// Convert raw MMR proof of a single leaf into the simplified form.
///
/// Fails if proof is malformed: the shape of the tree (which is defined by `leaf_count` and
/// `leaf_index`) must match the number of items exactly.
pub fn convert_to_simplified_mmr_proof(
	block_hash: H256,
	leaf_index: u64,
	leaf: BeefyMmrLeaf,
	leaf_count: u64,
	items: &[H256],
) -> Result<SimplifiedMmrProof, Error> {
	if leaf_count == 0 {
		return Err(Error::EmptyMmr)
	}
	if leaf_index >= leaf_count {
		return Err(Error::LeafIndexOutOfRange { leaf_index, leaf_count })
	}

	let mmr_size =
		leaf_index_to_mmr_size(leaf_count - 1).ok_or(Error::LeafCountOverflow(leaf_count))?;
	let leaf_pos = leaf_index_to_pos(leaf_index).ok_or(Error::LeafCountOverflow(leaf_count))?;
	let peaks = get_peaks(mmr_size);
	let leaf_peak_index = peaks
		.iter()
		.position(|peak_pos| leaf_pos <= *peak_pos)
		.ok_or(Error::LeafIndexOutOfRange { leaf_index, leaf_count })?;
	let leaf_peak_pos = peaks[leaf_peak_index];

	// the path from leaf to its peak
	let mut path = Vec::new();
	let mut pos = leaf_pos;
	let mut height = 0u32;
	while pos != leaf_peak_pos {
		let is_right_child = pos_height_in_tree(pos + 1) > height;
		let parent_pos = if is_right_child {
			pos.checked_add(1)
		} else {
			pos.checked_add(parent_offset(height))
		};
		let parent_pos = parent_pos
			.filter(|parent_pos| *parent_pos <= leaf_peak_pos)
			.ok_or(Error::PathEscapedPeak(leaf_peak_pos))?;
		path.push(is_right_child);
		pos = parent_pos;
		height += 1;
	}

	let has_right_peaks = leaf_peak_index + 1 < peaks.len();
	let expected_items = leaf_peak_index + path.len() + usize::from(has_right_peaks);
	if items.len() != expected_items {
		return Err(Error::InvalidItemsCount { expected: expected_items, actual: items.len() })
	}
	if expected_items > MAX_PROOF_STEPS {
		return Err(Error::ProofTooLong(expected_items))
	}

	let (left_peaks, rest) = items.split_at(leaf_peak_index);
	let (path_items, right_peaks) = rest.split_at(path.len());

	let mut merkle_proof_items = Vec::with_capacity(expected_items);
	let mut merkle_proof_order = 0u64;
	let mut push = |item: H256, is_sibling_left: bool| {
		if is_sibling_left {
			merkle_proof_order |= 1 << merkle_proof_items.len();
		}
		merkle_proof_items.push(item);
	};

	for (item, is_right_child) in path_items.iter().zip(path) {
		push(*item, is_right_child);
	}
	// peaks are bagged from right to left: `hash(right_bag, left_peak)`
	if let Some(right_peaks_bag) = right_peaks.first() {
		push(*right_peaks_bag, true);
	}
	for left_peak in left_peaks.iter().rev() {
		push(*left_peak, false);
	}

	Ok(SimplifiedMmrProof { merkle_proof_items, merkle_proof_order, block_hash, leaf })
}

/// Position of the leaf with given index. `None` if it doesn't fit into `u64`.
fn leaf_index_to_pos(index: u64) -> Option<u64> {
	let mmr_size = leaf_index_to_mmr_size(index)?;
	Some(mmr_size - u64::from((index + 1).trailing_zeros()) - 1)
}

/// Size of the MMR (number of nodes) where the leaf with given index is the last leaf.
fn leaf_index_to_mmr_size(index: u64) -> Option<u64> {
	let leaves_count = index.checked_add(1)?;
	let peaks_count = u64::from(leaves_count.count_ones());
	leaves_count.checked_mul(2).map(|nodes| nodes - peaks_count)
}

/// Height of node at given position. Leaves have zero height.
fn pos_height_in_tree(mut pos: u64) -> u32 {
	fn all_ones(num: u64) -> bool {
		num != 0 && num.count_zeros() == num.leading_zeros()
	}
	fn jump_left(pos: u64) -> u64 {
		let bit_length = 64 - pos.leading_zeros();
		let most_significant_bits = 1 << (bit_length - 1);
		pos - (most_significant_bits - 1)
	}

	pos += 1;
	while !all_ones(pos) {
		pos = jump_left(pos)
	}

	64 - pos.leading_zeros() - 1
}

fn parent_offset(height: u32) -> u64 {
	2 << height
}

fn sibling_offset(height: u32) -> u64 {
	(2 << height) - 1
}

/// Positions of all peaks of the MMR with given size, left to right.
fn get_peaks(mmr_size: u64) -> Vec<u64> {
	let mut peaks = Vec::new();
	let (mut height, mut pos) = left_peak_height_pos(mmr_size);
	peaks.push(pos);
	while height > 0 {
		match get_right_peak(height, pos, mmr_size) {
			Some((right_height, right_pos)) => {
				height = right_height;
				pos = right_pos;
				peaks.push(pos);
			},
			None => break,
		}
	}
	peaks
}

fn get_right_peak(mut height: u32, mut pos: u64, mmr_size: u64) -> Option<(u32, u64)> {
	// move to the right sibling
	pos += sibling_offset(height);
	// and then down the left children until we're inside the MMR
	while pos > mmr_size - 1 {
		if height == 0 {
			return None
		}
		pos -= parent_offset(height - 1);
		height -= 1;
	}
	Some((height, pos))
}

fn get_peak_pos_by_height(height: u32) -> u64 {
	1u64.checked_shl(height + 1).map_or(u64::MAX, |size| size - 2)
}

fn left_peak_height_pos(mmr_size: u64) -> (u32, u64) {
	let mut height = 1;
	let mut prev_pos = 0;
	let mut pos = get_peak_pos_by_height(height);
	while pos < mmr_size {
		height += 1;
		prev_pos = pos;
		pos = get_peak_pos_by_height(height);
	}
	(height - 1, prev_pos)
}
