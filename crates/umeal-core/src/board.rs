//! Order status board.
//!
//! Shows a restaurant's orders grouped into lanes by status and lets an
//! operator move an order one step forward along the status chain. The move is
//! applied locally before the API confirms it and reverted if the API rejects
//! it.

use crate::event_bus::EventBus;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::instrument;
use umeal_api::{ApiError, BackendService};
use umeal_types::{truncate_id, BoardEvent, ClientEvent, Order, OrderStatus, LANE_STATUSES};

/// Errors that can occur during board operations.
#[derive(Debug, Error)]
pub enum BoardError {
	#[error("Backend error: {0}")]
	Backend(#[from] ApiError),
}

/// Result of [`OrderBoard::advance`].
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
	/// The order is unknown or has no next status; nothing was sent.
	NoOp,
	/// The API accepted the change.
	Advanced { from: OrderStatus, to: OrderStatus },
}

/// Orders sharing one status, in the order the API returned them.
#[derive(Debug, Clone, PartialEq)]
pub struct Lane {
	pub status: OrderStatus,
	pub title: &'static str,
	pub orders: Vec<Order>,
}

#[derive(Default)]
struct BoardState {
	orders: Vec<Order>,
	/// Bumped whenever a refresh replaces `orders`.
	generation: u64,
}

/// Board for one restaurant's incoming orders.
pub struct OrderBoard {
	restaurant_id: String,
	backend: Arc<BackendService>,
	events: EventBus,
	state: RwLock<BoardState>,
	/// One lock per order id so advances of the same order never overlap.
	advance_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl OrderBoard {
	pub fn new(restaurant_id: impl Into<String>, backend: Arc<BackendService>, events: EventBus) -> Self {
		Self {
			restaurant_id: restaurant_id.into(),
			backend,
			events,
			state: RwLock::new(BoardState::default()),
			advance_locks: Mutex::new(HashMap::new()),
		}
	}

	pub fn restaurant_id(&self) -> &str {
		&self.restaurant_id
	}

	/// Replaces the orders with a fresh list from the API.
	///
	/// On failure the previous orders stay in place.
	#[instrument(skip_all, fields(restaurant_id = %truncate_id(&self.restaurant_id)))]
	pub async fn refresh(&self) -> Result<usize, BoardError> {
		let orders = match self.backend.list_restaurant_orders(&self.restaurant_id).await {
			Ok(orders) => orders,
			Err(e) => {
				tracing::warn!(error = %e, "Failed to refresh orders");
				self.events
					.publish(ClientEvent::Board(BoardEvent::RefreshFailed {
						restaurant_id: self.restaurant_id.clone(),
						message: e.user_message(),
					}))
					.ok();
				return Err(e.into());
			},
		};

		let count = orders.len();
		let ids: HashSet<String> = orders.iter().map(|o| o.id.clone()).collect();
		{
			let mut state = self.state.write().await;
			state.orders = orders;
			state.generation += 1;
		}
		self.advance_locks
			.lock()
			.await
			.retain(|id, lock| ids.contains(id) || Arc::strong_count(lock) > 1);

		tracing::debug!(count, "Refreshed orders");
		self.events
			.publish(ClientEvent::Board(BoardEvent::Refreshed {
				restaurant_id: self.restaurant_id.clone(),
				count,
			}))
			.ok();
		Ok(count)
	}

	/// Moves an order to the next status in the chain.
	///
	/// The new status shows up immediately. If the API rejects it, the order
	/// goes back to its previous state unless a refresh has replaced the list
	/// in the meantime.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn advance(&self, order_id: &str) -> Result<AdvanceOutcome, BoardError> {
		let lock = {
			let mut locks = self.advance_locks.lock().await;
			locks.entry(order_id.to_string()).or_default().clone()
		};
		let _guard = lock.lock().await;

		let (previous, generation, to) = {
			let mut state = self.state.write().await;
			let generation = state.generation;
			let Some(order) = state.orders.iter_mut().find(|o| o.id == order_id) else {
				tracing::debug!("Order not on board, nothing to advance");
				return Ok(AdvanceOutcome::NoOp);
			};
			let Some(next) = order.status.next() else {
				tracing::debug!(status = %order.status, "Order has no next status");
				return Ok(AdvanceOutcome::NoOp);
			};
			let previous = order.clone();
			order.status = next.clone();
			(previous, generation, next)
		};
		let from = previous.status.clone();

		match self.backend.update_order_status(order_id, &to).await {
			Ok(()) => {
				tracing::info!(from = %from, to = %to, "Advanced order");
				self.events
					.publish(ClientEvent::Board(BoardEvent::StatusAdvanced {
						order_id: order_id.to_string(),
						from: from.clone(),
						to: to.clone(),
					}))
					.ok();
				Ok(AdvanceOutcome::Advanced { from, to })
			},
			Err(e) => {
				{
					let mut state = self.state.write().await;
					if state.generation == generation {
						if let Some(order) = state.orders.iter_mut().find(|o| o.id == order_id) {
							*order = previous;
						}
					} else {
						tracing::debug!("Board was refreshed during the update, keeping fresh data");
					}
				}
				tracing::warn!(error = %e, "Failed to advance order, rolled back");
				self.events
					.publish(ClientEvent::Board(BoardEvent::AdvanceFailed {
						order_id: order_id.to_string(),
						message: e.user_message(),
					}))
					.ok();
				Err(e.into())
			},
		}
	}

	/// All orders currently on the board.
	pub async fn orders(&self) -> Vec<Order> {
		self.state.read().await.orders.clone()
	}

	pub async fn order(&self, order_id: &str) -> Option<Order> {
		self.state
			.read()
			.await
			.orders
			.iter()
			.find(|o| o.id == order_id)
			.cloned()
	}

	/// The five display lanes in chain order. Cancelled orders are not shown.
	pub async fn lanes(&self) -> Vec<Lane> {
		let state = self.state.read().await;
		LANE_STATUSES
			.iter()
			.map(|status| Lane {
				status: status.clone(),
				title: status.lane_title(),
				orders: state
					.orders
					.iter()
					.filter(|o| &o.status == status)
					.cloned()
					.collect(),
			})
			.collect()
	}

	/// Orders whose status this client does not recognise.
	pub async fn unknown(&self) -> Vec<Order> {
		self.state
			.read()
			.await
			.orders
			.iter()
			.filter(|o| o.status.is_unknown())
			.cloned()
			.collect()
	}

	/// Starts refreshing the board every `interval`, beginning immediately.
	///
	/// Refresh errors are reported through events and do not stop the poller.
	pub fn spawn_poller(self: &Arc<Self>, interval: Duration) -> PollerHandle {
		let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
		let board = Arc::clone(self);

		let handle = tokio::spawn(async move {
			let mut ticker = tokio::time::interval(interval);
			ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
			loop {
				tokio::select! {
					_ = ticker.tick() => {
						// Errors were already logged and published.
						let _ = board.refresh().await;
					}
					_ = shutdown_rx.changed() => break,
				}
			}
			tracing::debug!(
				restaurant_id = %truncate_id(&board.restaurant_id),
				"Stopped order poller"
			);
		});

		tracing::info!(
			restaurant_id = %truncate_id(&self.restaurant_id),
			interval_secs = interval.as_secs(),
			"Started order poller"
		);
		PollerHandle {
			shutdown: shutdown_tx,
			handle: Some(handle),
		}
	}
}

/// Handle of a running board poller. Dropping it signals the poller to stop
/// without waiting for it.
pub struct PollerHandle {
	shutdown: watch::Sender<bool>,
	handle: Option<JoinHandle<()>>,
}

impl PollerHandle {
	/// Stops the poller and waits for it to exit. A refresh already in flight
	/// finishes first, so no board events follow once this returns.
	pub async fn stop(mut self) {
		let _ = self.shutdown.send(true);
		if let Some(handle) = self.handle.take() {
			if let Err(e) = handle.await {
				tracing::warn!(error = %e, "Order poller ended abnormally");
			}
		}
	}

	pub fn is_finished(&self) -> bool {
		self.handle.as_ref().map_or(true, JoinHandle::is_finished)
	}
}

impl Drop for PollerHandle {
	fn drop(&mut self) {
		let _ = self.shutdown.send(true);
	}
}
