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

use relay_substrate_client::{BlockNumber, Hash};
use relay_utils::{Cancelled, MaybeConnectionError};
use sp_consensus_beefy::ValidatorSetId;
use sp_core::H256;
use thiserror::Error;

/// BEEFY relay errors.
#[derive(Error, Debug)]
pub enum Error {
	/// Relay chain client error.
	#[error(transparent)]
	Client(#[from] relay_substrate_client::Error),
	/// There's no BEEFY justification at the session boundary block.
	#[error("Mandatory BEEFY justification is missing at block #{0} ({1})")]
	MissingJustification(BlockNumber, Hash),
	/// BEEFY justification can't be decoded.
	#[error("Failed to decode BEEFY justification of block #{0}: {1:?}")]
	InvalidJustification(BlockNumber, codec::Error),
	/// MMR proof, returned by the node, can't be decoded.
	#[error("Failed to decode MMR proof of block #{0}: {1:?}")]
	InvalidMmrProofEncoding(BlockNumber, codec::Error),
	/// MMR proof is malformed.
	#[error("MMR leaf of block #{0} is unprovable: {1}")]
	InvalidMmrProof(BlockNumber, bp_merkle_proofs::Error),
	/// MMR root, computed from the proof, differs from the root, stored at the relay chain.
	#[error(
		"MMR root mismatch at block #{block}: computed {computed:?}, stored at the chain {stored:?}"
	)]
	MmrRootMismatch {
		/// The commitment block.
		block: BlockNumber,
		/// Root, computed from the proof.
		computed: H256,
		/// Root, stored at the chain.
		stored: H256,
	},
	/// The commitment is signed by the validator set that is older than the current set.
	#[error(
		"Commitment of block #{block} is signed by validator set {commitment_set_id}, \
		which is older than the current set {current_set_id}"
	)]
	OutdatedValidatorSet {
		/// The commitment block.
		block: BlockNumber,
		/// Validator set that has signed the commitment.
		commitment_set_id: ValidatorSetId,
		/// Current validator set.
		current_set_id: ValidatorSetId,
	},
	/// Consumer has dropped the requests channel.
	#[error("Requests channel is closed by the consumer")]
	RequestChannelClosed,
	/// The operation has been cancelled.
	#[error(transparent)]
	Cancelled(#[from] Cancelled),
}

impl MaybeConnectionError for Error {
	fn is_connection_error(&self) -> bool {
		match *self {
			Error::Client(ref e) => e.is_connection_error(),
			_ => false,
		}
	}
}
