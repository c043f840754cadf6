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

use crate::{
	chain::{BlockNumber, Hash, Header, RawMmrProof},
	error::{Error, Result},
};

use async_trait::async_trait;
use codec::{Decode, Encode};
use sp_core::{
	storage::{StorageData, StorageKey},
	Bytes,
};
use sp_runtime::Justification;
use std::fmt::Debug;

/// Read-only client of Substrate-based node.
///
/// Implementations are responsible for connection management, retries and timeouts. Errors
/// returned by implementations should be as close to the transport as possible: callers wrap
/// them with the context of the failed operation.
#[async_trait]
pub trait Client: 'static + Send + Sync + Clone + Debug {
	/// Get hash of the canonical block with given number.
	async fn block_hash_by_number(&self, number: BlockNumber) -> Result<Hash>;

	/// Get header by hash.
	async fn header_by_hash(&self, hash: Hash) -> Result<Header>;

	/// Get the hash of the best header, finalized by BEEFY.
	async fn best_finalized_beefy_header_hash(&self) -> Result<Hash>;

	/// Read raw value from the runtime storage.
	async fn raw_storage_value(&self, at: Hash, key: StorageKey) -> Result<Option<StorageData>>;

	/// Read and decode value from the runtime storage.
	async fn storage_value<T: Decode + 'static>(
		&self,
		at: Hash,
		key: StorageKey,
	) -> Result<Option<T>> {
		let raw_value = self
			.raw_storage_value(at, key.clone())
			.await
			.map_err(|e| Error::failed_to_read_storage_value(at, key.clone(), e))?;
		raw_value
			.map(|StorageData(encoded)| {
				T::decode(&mut &encoded[..]).map_err(|error| {
					Error::failed_to_read_storage_value(
						at,
						key,
						Error::ResponseParseFailed { what: std::any::type_name::<T>(), error },
					)
				})
			})
			.transpose()
	}

	/// Read and decode value that must exist in the runtime storage.
	async fn required_storage_value<T: Decode + 'static>(
		&self,
		at: Hash,
		key: StorageKey,
		what: &'static str,
	) -> Result<T> {
		self.storage_value(at, key.clone())
			.await?
			.ok_or(Error::MissingRequiredStorageValue { what, hash: at, key })
	}

	/// Execute runtime call at given block.
	async fn raw_state_call(&self, at: Hash, method: String, arguments: Bytes) -> Result<Bytes>;

	/// Execute runtime call at given block and decode its result.
	async fn state_call<Args: Encode + Send, Ret: Decode>(
		&self,
		at: Hash,
		method: String,
		arguments: Args,
	) -> Result<Ret> {
		let arguments = Bytes(arguments.encode());
		let encoded = self
			.raw_state_call(at, method.clone(), arguments)
			.await
			.map_err(|e| Error::failed_state_call(at, method.clone(), e))?;
		Ret::decode(&mut &encoded.0[..]).map_err(|error| {
			Error::failed_state_call(
				at,
				method,
				Error::ResponseParseFailed { what: std::any::type_name::<Ret>(), error },
			)
		})
	}

	/// Get all justifications of given block.
	async fn justifications(&self, at: Hash) -> Result<Vec<Justification>>;

	/// Generate MMR proof of the leaf, added at given block. The proof is generated against
	/// the MMR root at block `at`.
	async fn generate_mmr_proof(&self, leaf_block: BlockNumber, at: Hash) -> Result<RawMmrProof>;
}
