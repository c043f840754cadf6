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

//! Substrate node RPC errors.

use crate::chain::{BlockNumber, Hash};

use relay_utils::MaybeConnectionError;
use sp_core::storage::StorageKey;
use thiserror::Error;

/// Result type used by Substrate client.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur only when interacting with
/// a Substrate node through RPC.
#[derive(Error, Debug)]
pub enum Error {
	/// The node is unreachable or the connection has been lost.
	#[error("Connection to the node is lost: {0}")]
	Connection(String),
	/// The node has responded with an error.
	#[error("RPC error: {0}")]
	Rpc(String),
	/// The response from the node can't be decoded.
	#[error("Failed to decode {what}: {error:?}")]
	ResponseParseFailed {
		/// What we have tried to decode.
		what: &'static str,
		/// Underlying decode error.
		error: codec::Error,
	},
	/// Failed to read hash of the block with given number.
	#[error("Failed to read hash of block #{number}: {error:?}")]
	FailedToReadBlockHash {
		/// Number of the block.
		number: BlockNumber,
		/// Underlying error.
		error: Box<Error>,
	},
	/// Failed to read header by its hash.
	#[error("Failed to read header {hash}: {error:?}")]
	FailedToReadHeaderByHash {
		/// Hash of the header.
		hash: Hash,
		/// Underlying error.
		error: Box<Error>,
	},
	/// Failed to read best BEEFY-finalized header hash.
	#[error("Failed to read best BEEFY finalized header hash: {error:?}")]
	FailedToReadBestFinalizedBeefyHeaderHash {
		/// Underlying error.
		error: Box<Error>,
	},
	/// Failed to read storage value at given block.
	#[error("Failed to read storage value {key:?} at {hash}: {error:?}")]
	FailedToReadStorageValue {
		/// Hash of the block.
		hash: Hash,
		/// Storage key.
		key: StorageKey,
		/// Underlying error.
		error: Box<Error>,
	},
	/// Storage value that must exist is missing.
	#[error("Required storage value {what} ({key:?}) is missing at {hash}")]
	MissingRequiredStorageValue {
		/// Human readable name of the value.
		what: &'static str,
		/// Hash of the block.
		hash: Hash,
		/// Storage key.
		key: StorageKey,
	},
	/// Runtime call has failed.
	#[error("Runtime call {method} at {hash} has failed: {error:?}")]
	FailedStateCall {
		/// Hash of the block.
		hash: Hash,
		/// Runtime API method.
		method: String,
		/// Underlying error.
		error: Box<Error>,
	},
	/// Failed to read justifications of the block.
	#[error("Failed to read justifications of block {hash}: {error:?}")]
	FailedToReadJustifications {
		/// Hash of the block.
		hash: Hash,
		/// Underlying error.
		error: Box<Error>,
	},
	/// Failed to generate MMR proof.
	#[error("Failed to generate MMR proof of block #{leaf_block} at {hash}: {error:?}")]
	FailedToGenerateMmrProof {
		/// The block, which leaf we're proving.
		leaf_block: BlockNumber,
		/// Hash of the block at which the proof is generated.
		hash: Hash,
		/// Underlying error.
		error: Box<Error>,
	},
}

impl MaybeConnectionError for Error {
	fn is_connection_error(&self) -> bool {
		match *self {
			Error::Connection(_) => true,
			Error::FailedToReadBlockHash { ref error, .. } |
			Error::FailedToReadHeaderByHash { ref error, .. } |
			Error::FailedToReadBestFinalizedBeefyHeaderHash { ref error } |
			Error::FailedToReadStorageValue { ref error, .. } |
			Error::FailedStateCall { ref error, .. } |
			Error::FailedToReadJustifications { ref error, .. } |
			Error::FailedToGenerateMmrProof { ref error, .. } => error.is_connection_error(),
			_ => false,
		}
	}
}

impl Error {
	/// Returns nested error reference.
	pub fn nested(&self) -> Option<&Self> {
		match *self {
			Error::FailedToReadBlockHash { ref error, .. } |
			Error::FailedToReadHeaderByHash { ref error, .. } |
			Error::FailedToReadBestFinalizedBeefyHeaderHash { ref error } |
			Error::FailedToReadStorageValue { ref error, .. } |
			Error::FailedStateCall { ref error, .. } |
			Error::FailedToReadJustifications { ref error, .. } |
			Error::FailedToGenerateMmrProof { ref error, .. } => Some(&**error),
			_ => None,
		}
	}

	/// Constructs `FailedToReadBlockHash` variant.
	pub fn failed_to_read_block_hash(number: BlockNumber, e: Error) -> Self {
		Error::FailedToReadBlockHash { number, error: e.boxed() }
	}

	/// Constructs `FailedToReadHeaderByHash` variant.
	pub fn failed_to_read_header_by_hash(hash: Hash, e: Error) -> Self {
		Error::FailedToReadHeaderByHash { hash, error: e.boxed() }
	}

	/// Constructs `FailedToReadBestFinalizedBeefyHeaderHash` variant.
	pub fn failed_to_read_best_finalized_beefy_header_hash(e: Error) -> Self {
		Error::FailedToReadBestFinalizedBeefyHeaderHash { error: e.boxed() }
	}

	/// Constructs `FailedToReadStorageValue` variant.
	pub fn failed_to_read_storage_value(hash: Hash, key: StorageKey, e: Error) -> Self {
		Error::FailedToReadStorageValue { hash, key, error: e.boxed() }
	}

	/// Constructs `FailedStateCall` variant.
	pub fn failed_state_call(hash: Hash, method: String, e: Error) -> Self {
		Error::FailedStateCall { hash, method, error: e.boxed() }
	}

	/// Constructs `FailedToReadJustifications` variant.
	pub fn failed_to_read_justifications(hash: Hash, e: Error) -> Self {
		Error::FailedToReadJustifications { hash, error: e.boxed() }
	}

	/// Constructs `FailedToGenerateMmrProof` variant.
	pub fn failed_to_generate_mmr_proof(leaf_block: BlockNumber, hash: Hash, e: Error) -> Self {
		Error::FailedToGenerateMmrProof { leaf_block, hash, error: e.boxed() }
	}

	fn boxed(self) -> Box<Self> {
		Box::new(self)
	}
}
