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

//! Primitives of Polkadot-like relay chain and its parachains, as they are seen by the relayer.

use codec::{Decode, Encode};
use sp_core::{Bytes, H256};
use sp_mmr_primitives::{EncodableOpaqueLeaf, LeafProof};
use sp_runtime::traits::BlakeTwo256;

/// Block number type used by the relay chain and parachains.
pub type BlockNumber = u32;

/// Hash type used by the relay chain and parachains.
pub type Hash = H256;

/// Block header type used by the relay chain and parachains.
pub type Header = sp_runtime::generic::Header<BlockNumber, BlakeTwo256>;

/// Number and hash of the block.
pub type HeaderId = relay_utils::HeaderId<Hash, BlockNumber>;

/// Parachain identifier.
#[derive(
	Clone, Copy, Debug, Decode, Default, Encode, Eq, Hash, Ord, PartialEq, PartialOrd,
)]
pub struct ParaId(pub u32);

impl From<u32> for ParaId {
	fn from(id: u32) -> Self {
		ParaId(id)
	}
}

impl std::fmt::Display for ParaId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.0.fmt(f)
	}
}

/// Parachain head, as it is stored in the relay chain storage. It is the encoded
/// parachain header.
#[derive(Clone, Debug, Decode, Default, Encode, Eq, PartialEq)]
pub struct ParaHead(pub Vec<u8>);

impl ParaHead {
	/// Hash of the head (which is also the hash of the parachain header).
	pub fn hash(&self) -> Hash {
		H256(sp_crypto_hashing::blake2_256(&self.0))
	}

	/// Decode the parachain header.
	pub fn header(&self) -> Result<Header, codec::Error> {
		Header::decode(&mut &self.0[..])
	}
}

impl From<&Header> for ParaHead {
	fn from(header: &Header) -> Self {
		ParaHead(header.encode())
	}
}

/// Validation data that is persisted by the parachain in every block.
#[derive(Clone, Debug, Decode, Default, Encode, Eq, PartialEq)]
pub struct PersistedValidationData {
	/// The parent head data.
	pub parent_head: ParaHead,
	/// The relay chain block number this is in the context of.
	pub relay_parent_number: BlockNumber,
	/// The relay chain block storage root this is in the context of.
	pub relay_parent_storage_root: Hash,
	/// The maximum legal size of a PoV block, in bytes.
	pub max_pov_size: u32,
}

/// MMR proof of single leaf, as it is returned by the `mmr_generateProof` RPC method.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawMmrProof {
	/// Hash of the block at which the proof has been generated.
	pub block_hash: Hash,
	/// SCALE-encoded `Vec<EncodableOpaqueLeaf>`.
	pub leaves: Bytes,
	/// SCALE-encoded `LeafProof<Hash>`.
	pub proof: Bytes,
}

impl RawMmrProof {
	/// Decode proved leaves and the proof itself.
	pub fn decode(&self) -> Result<(Vec<EncodableOpaqueLeaf>, LeafProof<Hash>), codec::Error> {
		let leaves = Vec::<EncodableOpaqueLeaf>::decode(&mut &self.leaves[..])?;
		let proof = LeafProof::<Hash>::decode(&mut &self.proof[..])?;
		Ok((leaves, proof))
	}
}
