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

//! Cooperative cancellation of relay operations.

use futures::{
	future::{BoxFuture, FutureExt, Shared},
	pin_mut, select_biased,
};
use std::{future::Future, time::Duration};

/// The operation has been interrupted by the exit signal.
#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq, Eq)]
#[error("Operation has been cancelled by the exit signal")]
pub struct Cancelled;

/// Exit signal, shared by all tasks of the relay.
///
/// Every network call and every wait of the relay is raced against this signal, so that
/// the relay stops at the next await point after the signal has been fired.
#[derive(Clone)]
pub struct ExitSignal(Shared<BoxFuture<'static, ()>>);

impl ExitSignal {
	/// Create exit signal that fires when given future resolves.
	pub fn new(exit_signal: impl Future<Output = ()> + Send + 'static) -> Self {
		ExitSignal(exit_signal.boxed().shared())
	}

	/// Exit signal that never fires.
	pub fn never() -> Self {
		Self::new(futures::future::pending())
	}

	/// Returns true if the signal has been fired.
	pub fn is_triggered(&self) -> bool {
		self.0.clone().now_or_never().is_some()
	}

	/// Wait until the signal is fired.
	pub async fn wait(&self) {
		self.0.clone().await
	}

	/// Run the future to completion unless the signal is fired first.
	///
	/// If the signal is already fired, the future is not polled at all.
	pub async fn guard<T>(&self, future: impl Future<Output = T>) -> Result<T, Cancelled> {
		let exit_signal = self.0.clone();
		let future = future.fuse();
		pin_mut!(exit_signal, future);

		select_biased! {
			_ = exit_signal => Err(Cancelled),
			result = future => Ok(result),
		}
	}

	/// Sleep for given duration unless the signal is fired first.
	pub async fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
		self.guard(async_std::task::sleep(duration)).await
	}
}

impl std::fmt::Debug for ExitSignal {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ExitSignal").field("is_triggered", &self.is_triggered()).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::channel::oneshot;

	fn signal() -> (oneshot::Sender<()>, ExitSignal) {
		let (sender, receiver) = oneshot::channel();
		(sender, ExitSignal::new(receiver.map(|_| ())))
	}

	#[async_std::test]
	async fn guarded_future_completes_when_signal_is_not_fired() {
		let (_sender, exit_signal) = signal();
		assert_eq!(exit_signal.guard(async { 42 }).await, Ok(42));
		assert!(!exit_signal.is_triggered());
	}

	#[async_std::test]
	async fn guarded_future_is_cancelled_when_signal_is_fired() {
		let (sender, exit_signal) = signal();
		sender.send(()).unwrap();

		assert!(exit_signal.is_triggered());
		assert_eq!(exit_signal.guard(futures::future::pending::<()>()).await, Err(Cancelled));
		assert_eq!(exit_signal.guard(async { 42 }).await, Err(Cancelled));
	}

	#[async_std::test]
	async fn sleep_is_interrupted_by_signal() {
		let (sender, exit_signal) = signal();
		let sleeping_signal = exit_signal.clone();
		let sleep = async_std::task::spawn(async move {
			sleeping_signal.sleep(Duration::from_secs(3600)).await
		});

		sender.send(()).unwrap();
		assert_eq!(sleep.await, Err(Cancelled));
	}

	#[async_std::test]
	async fn dropped_sender_fires_the_signal() {
		let (sender, exit_signal) = signal();
		drop(sender);
		exit_signal.wait().await;
		assert!(exit_signal.is_triggered());
	}

	#[test]
	fn never_signal_is_never_fired() {
		let exit_signal = ExitSignal::never();
		assert!(!exit_signal.is_triggered());
		assert_eq!(
			async_std::task::block_on(exit_signal.sleep(Duration::from_millis(1))),
			Ok(()),
		);
	}
}
