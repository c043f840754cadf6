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

//! In-memory client that is used in tests.

use crate::{
	chain::{BlockNumber, Hash, Header, RawMmrProof},
	client::Client,
	error::{Error, Result},
};

use async_trait::async_trait;
use codec::Encode;
use futures::channel::oneshot;
use parking_lot::{Mutex, MutexGuard};
use sp_core::{
	storage::{StorageData, StorageKey},
	Bytes, H256,
};
use sp_runtime::{traits::Header as _, DigestItem, Justification};
use std::{
	collections::{BTreeMap, HashMap, VecDeque},
	sync::Arc,
};

/// In-memory chain, shared by all clones of the client.
#[derive(Clone, Debug, Default)]
pub struct TestClient {
	data: Arc<Mutex<TestClientData>>,
}

/// Contents of the in-memory chain.
#[derive(Debug, Default)]
pub struct TestClientData {
	/// Canonical block hashes.
	pub canonical: BTreeMap<BlockNumber, Hash>,
	/// All known headers.
	pub headers: HashMap<Hash, Header>,
	/// Storage values.
	pub storage: HashMap<(Hash, StorageKey), StorageData>,
	/// Results of runtime calls.
	pub state_calls: HashMap<(Hash, String, Bytes), Bytes>,
	/// Block justifications.
	pub justifications: HashMap<Hash, Vec<Justification>>,
	/// MMR proofs by the leaf block number and the block they're generated at.
	pub mmr_proofs: HashMap<(BlockNumber, Hash), RawMmrProof>,
	/// Best BEEFY-finalized header hash.
	pub best_finalized_beefy_header_hash: Option<Hash>,
	/// Every request of BEEFY-finalized head takes the next number from this queue (if it
	/// is not empty) and makes it the best BEEFY-finalized block.
	pub best_finalized_beefy_header_updates: VecDeque<BlockNumber>,
	/// If set, it is fired when the BEEFY-finalized head is requested and there are no more
	/// updates in `best_finalized_beefy_header_updates`.
	pub exit_signal_sender: Option<oneshot::Sender<()>>,
	/// If true, all requests fail with connection error.
	pub is_connection_lost: bool,
	/// Hashes of all requested headers, in request order.
	pub requested_headers: Vec<Hash>,
	/// Keys of all requested storage values, in request order.
	pub requested_storage: Vec<(Hash, StorageKey)>,
}

impl TestClientData {
	/// Append block with given digest items to the canonical chain.
	pub fn push_block(&mut self, logs: Vec<DigestItem>) -> Hash {
		let (number, parent_hash) = match self.canonical.iter().next_back() {
			Some((number, hash)) => (number + 1, *hash),
			None => (0, Hash::default()),
		};
		let mut header = Header::new(
			number,
			Default::default(),
			Default::default(),
			parent_hash,
			Default::default(),
		);
		header.digest.logs = logs;

		let hash = header.hash();
		self.canonical.insert(number, hash);
		self.headers.insert(hash, header);
		hash
	}

	/// Append empty blocks until the best block has given number.
	pub fn push_blocks_until(&mut self, number: BlockNumber) {
		while self.best_number().map(|best| best < number).unwrap_or(true) {
			self.push_block(vec![]);
		}
	}

	/// Number of the best canonical block.
	pub fn best_number(&self) -> Option<BlockNumber> {
		self.canonical.keys().next_back().copied()
	}

	/// Hash of the canonical block.
	pub fn hash(&self, number: BlockNumber) -> Hash {
		self.canonical[&number]
	}

	/// Canonical header.
	pub fn header(&self, number: BlockNumber) -> Header {
		self.headers[&self.hash(number)].clone()
	}

	/// Set storage value at given block.
	pub fn set_storage(&mut self, at: Hash, key: StorageKey, value: impl Encode) {
		self.storage.insert((at, key), StorageData(value.encode()));
	}

	/// Set storage value at every canonical block in given (inclusive) range.
	pub fn set_storage_range(
		&mut self,
		blocks: std::ops::RangeInclusive<BlockNumber>,
		key: StorageKey,
		value: impl Encode,
	) {
		let value = value.encode();
		for number in blocks {
			let at = self.hash(number);
			self.storage.insert((at, key.clone()), StorageData(value.clone()));
		}
	}

	/// Set result of the runtime call.
	pub fn set_state_call(
		&mut self,
		at: Hash,
		method: &str,
		arguments: impl Encode,
		result: impl Encode,
	) {
		self.state_calls
			.insert((at, method.into(), Bytes(arguments.encode())), Bytes(result.encode()));
	}

	/// Returns true if header has been requested by the client user.
	pub fn is_header_requested(&self, hash: Hash) -> bool {
		self.requested_headers.contains(&hash)
	}

	fn ensure_connected(&self) -> Result<()> {
		if self.is_connection_lost {
			return Err(Error::Connection("test connection is lost".into()))
		}
		Ok(())
	}
}

impl From<TestClientData> for TestClient {
	fn from(data: TestClientData) -> TestClient {
		TestClient { data: Arc::new(Mutex::new(data)) }
	}
}

impl TestClient {
	/// Access chain data.
	pub fn data(&self) -> MutexGuard<'_, TestClientData> {
		self.data.lock()
	}
}

#[async_trait]
impl Client for TestClient {
	async fn block_hash_by_number(&self, number: BlockNumber) -> Result<Hash> {
		let data = self.data.lock();
		data.ensure_connected()?;
		data.canonical
			.get(&number)
			.copied()
			.ok_or_else(|| Error::Rpc(format!("Unknown block #{}", number)))
	}

	async fn header_by_hash(&self, hash: Hash) -> Result<Header> {
		let mut data = self.data.lock();
		data.ensure_connected()?;
		data.requested_headers.push(hash);
		data.headers
			.get(&hash)
			.cloned()
			.ok_or_else(|| Error::Rpc(format!("Unknown header {}", hash)))
	}

	async fn best_finalized_beefy_header_hash(&self) -> Result<Hash> {
		let mut data = self.data.lock();
		data.ensure_connected()?;
		match data.best_finalized_beefy_header_updates.pop_front() {
			Some(number) => {
				let hash = data.hash(number);
				data.best_finalized_beefy_header_hash = Some(hash);
			},
			None =>
				if let Some(exit_signal_sender) = data.exit_signal_sender.take() {
					let _ = exit_signal_sender.send(());
				},
		}
		data.best_finalized_beefy_header_hash
			.ok_or_else(|| Error::Rpc("Unknown best BEEFY finalized header".into()))
	}

	async fn raw_storage_value(&self, at: Hash, key: StorageKey) -> Result<Option<StorageData>> {
		let mut data = self.data.lock();
		data.ensure_connected()?;
		data.requested_storage.push((at, key.clone()));
		Ok(data.storage.get(&(at, key)).cloned())
	}

	async fn raw_state_call(&self, at: Hash, method: String, arguments: Bytes) -> Result<Bytes> {
		let data = self.data.lock();
		data.ensure_connected()?;
		data.state_calls
			.get(&(at, method.clone(), arguments))
			.cloned()
			.ok_or_else(|| Error::Rpc(format!("Unexpected runtime call {} at {}", method, at)))
	}

	async fn justifications(&self, at: Hash) -> Result<Vec<Justification>> {
		let data = self.data.lock();
		data.ensure_connected()?;
		Ok(data.justifications.get(&at).cloned().unwrap_or_default())
	}

	async fn generate_mmr_proof(&self, leaf_block: BlockNumber, at: Hash) -> Result<RawMmrProof> {
		let data = self.data.lock();
		data.ensure_connected()?;
		data.mmr_proofs
			.get(&(leaf_block, at))
			.cloned()
			.ok_or_else(|| Error::Rpc(format!("No MMR proof of #{} at {}", leaf_block, at)))
	}
}

/// Hash that is used as a storage value placeholder in tests.
pub fn test_hash(seed: u8) -> Hash {
	H256::repeat_byte(seed)
}
