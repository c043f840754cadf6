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

//! Loading relay parameters from JSON configuration files.

use crate::Error;

use serde::de::DeserializeOwned;
use std::path::Path;

/// Read and parse JSON configuration file.
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, Error> {
	let path = path.as_ref();
	let contents =
		std::fs::read_to_string(path).map_err(|e| Error::ReadConfig(path.to_path_buf(), e))?;
	let config = serde_json::from_str(&contents)
		.map_err(|e| Error::ParseConfig(path.display().to_string(), e))?;

	log::debug!(target: "bridge", "Loaded relay configuration from {}", path.display());

	Ok(config)
}

/// Parse JSON configuration from string.
pub fn parse_json<T: DeserializeOwned>(contents: &str) -> Result<T, Error> {
	serde_json::from_str(contents).map_err(|e| Error::ParseConfig("<string>".into(), e))
}

/// (De)serialize `Duration` as a number of seconds.
///
/// Use with `#[serde(with = "relay_utils::config::duration_secs")]`.
pub mod duration_secs {
	use serde::{Deserialize, Deserializer, Serializer};
	use std::time::Duration;

	/// Serialize duration as a number of whole seconds.
	pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_u64(duration.as_secs())
	}

	/// Deserialize duration from a number of seconds.
	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
		u64::deserialize(deserializer).map(Duration::from_secs)
	}
}
