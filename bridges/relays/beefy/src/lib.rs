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

//! Scanner of BEEFY commitments.
//!
//! The relay chain produces a mandatory BEEFY commitment at the first block of every session.
//! The scanner walks relay chain blocks, finds session boundaries, reads commitments from the
//! block justifications and proves that the MMR leaf of the commitment block is a part of
//! the MMR, which root is stored at this block. Verified commitments are then classified
//! against the relay progress and sent to the consumer as [`Request`]s.

#![warn(missing_docs)]

use bp_merkle_proofs::SimplifiedMmrProof;
use relay_substrate_client::{BlockNumber, Hash};
use serde::Deserialize;
use sp_consensus_beefy::{
	ecdsa_crypto::{AuthorityId, Signature},
	SignedCommitment, ValidatorSetId,
};
use sp_core::H256;
use std::time::Duration;

pub use commitments_loop::{
	classify, request_channel, run, sync_update, try_emit, Classification, DiscardReason,
	EmitOutcome,
};
pub use error::Error;

mod commitments_loop;
mod error;
mod proof;
mod scanner;

#[cfg(test)]
mod mock;

/// BEEFY commitment, signed by the relay chain validators.
pub type BeefySignedCommitment = SignedCommitment<BlockNumber, Signature>;

/// Parameters of the BEEFY commitments relay.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct BeefyRelayParams {
	/// Minimal distance (in relay chain blocks) between two relayed commitments of the same
	/// validator set.
	pub update_period: BlockNumber,
	/// Commitments of the same validator set that are deeper than this number of blocks
	/// behind the best BEEFY-finalized block are not relayed.
	pub fast_forward_depth: BlockNumber,
	/// Interval between checks of the best BEEFY-finalized block, when scanner has reached it.
	#[serde(with = "relay_utils::config::duration_secs")]
	pub finality_poll_interval: Duration,
	/// Capacity of the requests channel.
	pub request_channel_capacity: usize,
	/// If true, commitment of validator set that is older than the current set is treated
	/// as a fatal error. Otherwise it is ignored.
	pub reject_outdated_validator_set: bool,
}

impl Default for BeefyRelayParams {
	fn default() -> Self {
		BeefyRelayParams {
			update_period: 0,
			fast_forward_depth: 20,
			finality_poll_interval: Duration::from_secs(3),
			request_channel_capacity: 0,
			reject_outdated_validator_set: false,
		}
	}
}

/// Progress of the relay, as it is seen by the destination chain.
///
/// It is a snapshot, which is read once before the scan is started. The scanner never
/// changes it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RelayProgress {
	/// Number of the latest relayed BEEFY block.
	pub latest_beefy_block: BlockNumber,
	/// Id of the current validator set, known to the destination chain.
	pub current_validator_set_id: ValidatorSetId,
	/// Merkle root of the next validator set, known to the destination chain.
	pub next_validator_set_root: H256,
}

/// Verified commitment that is ready to be relayed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
	/// Validators, which have signed the commitment.
	pub validators: Vec<AuthorityId>,
	/// The commitment itself.
	pub signed_commitment: BeefySignedCommitment,
	/// Proof of the MMR leaf, added at the commitment block.
	pub proof: SimplifiedMmrProof,
	/// True if the commitment hands over to the new validator set.
	pub is_handover: bool,
	/// Hash of the commitment block.
	pub block_hash: Hash,
	/// Distance between the best BEEFY-finalized block and the commitment block, at the time
	/// when the commitment has been scanned.
	pub depth: BlockNumber,
}

impl Request {
	/// Number of the commitment block.
	pub fn block_number(&self) -> BlockNumber {
		self.signed_commitment.commitment.block_number
	}

	/// Validator set, which has signed the commitment.
	pub fn validator_set_id(&self) -> ValidatorSetId {
		self.signed_commitment.commitment.validator_set_id
	}
}
