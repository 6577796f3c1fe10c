//! In-process event bus.
//!
//! Components publish [`ClientEvent`]s here instead of rendering notifications.
//! Any number of subscribers (a CLI printer, a UI layer, tests) receive every
//! event published after they subscribed.

use tokio::sync::broadcast;
use umeal_types::ClientEvent;

/// Broadcast channel shared by every component of a client.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<ClientEvent>,
}

impl EventBus {
	/// Creates a bus that buffers up to `capacity` events per slow subscriber.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event. Fails only when nobody is subscribed, which callers
	/// are free to ignore.
	pub fn publish(
		&self,
		event: ClientEvent,
	) -> Result<usize, broadcast::error::SendError<ClientEvent>> {
		self.sender.send(event)
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(256)
	}
}
