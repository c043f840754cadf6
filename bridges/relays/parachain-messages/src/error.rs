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

use crate::ChannelId;

use relay_substrate_client::{BlockNumber, Hash, ParaId};
use relay_utils::{Cancelled, MaybeConnectionError};
use sp_core::H256;
use thiserror::Error;

/// Parachain messages scanner errors.
#[derive(Error, Debug)]
pub enum Error {
	/// Relay chain or parachain client error.
	#[error(transparent)]
	Client(#[from] relay_substrate_client::Error),
	/// Failed to read the delivered nonce from the destination chain.
	#[error("Failed to read inbound nonce of channel {channel:?} from the target chain: {error}")]
	FailedToReadInboundNonce {
		/// The channel.
		channel: ChannelId,
		/// Underlying error.
		error: Box<dyn std::error::Error + Send + Sync>,
		/// True if the underlying error is a connection error.
		is_connection_error: bool,
	},
	/// There's no head of the parachain at the relay chain block.
	#[error("Parachain {para_id} is not registered at relay chain block #{relay_block}")]
	ParachainNotRegistered {
		/// The parachain.
		para_id: ParaId,
		/// The relay chain block.
		relay_block: BlockNumber,
	},
	/// The parachain head, stored at the relay chain, is not a valid parachain header.
	#[error("Head of parachain {para_id} at relay chain block #{relay_block} is invalid: {error:?}")]
	InvalidParachainHead {
		/// The parachain.
		para_id: ParaId,
		/// The relay chain block.
		relay_block: BlockNumber,
		/// Decode error.
		error: codec::Error,
	},
	/// The backward walk has reached the genesis without finding the first undelivered message.
	#[error(
		"Message {nonce} of channel {channel:?} is not found in parachain blocks #1..=#{from_block}"
	)]
	NonceNotFoundAtGenesis {
		/// The channel.
		channel: ChannelId,
		/// The first undelivered nonce.
		nonce: u64,
		/// The block where the walk has been started.
		from_block: BlockNumber,
	},
	/// The backward walk has visited more blocks than it is allowed to.
	#[error(
		"Message {nonce} of channel {channel:?} is not found in {limit} blocks before #{from_block}"
	)]
	BackwardWalkLimitExceeded {
		/// The channel.
		channel: ChannelId,
		/// The first undelivered nonce.
		nonce: u64,
		/// The block where the walk has been started.
		from_block: BlockNumber,
		/// Max number of visited blocks.
		limit: BlockNumber,
	},
	/// Collected messages are not the contiguous range of undelivered nonces.
	#[error(
		"Undelivered messages of channel {channel:?} are not contiguous: expected nonce \
		{expected_nonce}, found {found_nonce:?}"
	)]
	MessageNonceGap {
		/// The channel.
		channel: ChannelId,
		/// The nonce that must follow previously collected messages.
		expected_nonce: u64,
		/// The nonce of the next collected message, if any.
		found_nonce: Option<u64>,
	},
	/// The digest commitment differs from the root of the outbound queue proof.
	#[error(
		"Commitment root mismatch at parachain block {block_hash}: digest has {digest_root:?}, \
		message proof has {proof_root:?}"
	)]
	CommitmentRootMismatch {
		/// The parachain block.
		block_hash: Hash,
		/// Commitment from the header digest.
		digest_root: H256,
		/// Root from the message proof.
		proof_root: H256,
	},
	/// The message proof is malformed or doesn't prove the message.
	#[error("Invalid proof of message {nonce} at parachain block {block_hash}: {reason}")]
	InvalidMessageProof {
		/// The parachain block.
		block_hash: Hash,
		/// Nonce of the message.
		nonce: u64,
		/// What is wrong with the proof.
		reason: String,
	},
	/// There's no persisted validation data at the parachain block.
	#[error("Validation data is missing at parachain block #{0}")]
	ValidationDataMissing(BlockNumber),
	/// The parachain block is not included within the finalization window.
	#[error(
		"Parachain block #{para_block} is not included at relay chain blocks #{first_relay_block}..#{end_relay_block}"
	)]
	InclusionBlockNotFound {
		/// The parachain block.
		para_block: BlockNumber,
		/// The first checked relay chain block.
		first_relay_block: BlockNumber,
		/// The first relay chain block after the window.
		end_relay_block: BlockNumber,
	},
	/// The operation has been cancelled.
	#[error(transparent)]
	Cancelled(#[from] Cancelled),
}

impl MaybeConnectionError for Error {
	fn is_connection_error(&self) -> bool {
		match *self {
			Error::Client(ref e) => e.is_connection_error(),
			Error::FailedToReadInboundNonce { is_connection_error, .. } => is_connection_error,
			_ => false,
		}
	}
}
