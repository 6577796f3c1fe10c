//! Command handlers and terminal rendering.

use crate::{AddressAction, CartAction, Command, ProductAction};
use std::error::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use umeal_core::{
	filter_restaurants, AddOutcome, AdvanceOutcome, CheckoutError, Client, Lane, OrderBoard,
	RestaurantForm,
};
use umeal_types::{
	format_order_number, format_price, AccountEvent, AddressInput, BoardEvent, CartEvent,
	CheckoutEvent, ClientEvent, NewProduct, Order,
};

type CommandResult = Result<(), Box<dyn Error>>;

const ORDER_PREFIX: &str = "OR";

/// Runs a command, then prints the notifications it raised.
pub(crate) async fn run(client: &Client, command: Command) -> CommandResult {
	let mut events = client.events().subscribe();
	let result = execute(client, command, &mut events).await;

	while let Ok(event) = events.try_recv() {
		if let Some(text) = describe(&event) {
			println!("{}", text);
		}
	}
	result
}

async fn execute(
	client: &Client,
	command: Command,
	events: &mut broadcast::Receiver<ClientEvent>,
) -> CommandResult {
	let catalog = client.catalog();
	match command {
		Command::Restaurants { search, category } => {
			let all = catalog.restaurants().await?;
			let found = filter_restaurants(&all, search.as_deref(), category.as_deref());
			if found.is_empty() {
				println!("Nenhum restaurante encontrado.");
			}
			for restaurant in &found {
				let categories: Vec<_> =
					restaurant.categories.iter().map(|c| c.name.as_str()).collect();
				println!(
					"{:>6}  {}  [{}]",
					restaurant.id,
					restaurant.restaurant_name,
					categories.join(", ")
				);
			}
		},
		Command::Menu { restaurant } => {
			let info = catalog.restaurant(&restaurant).await?;
			let menu = catalog.menu(&restaurant).await?;
			println!("{}", info.restaurant_name);
			if let Some(description) = info.description.filter(|d| !d.is_empty()) {
				println!("{}", description);
			}
			if menu.is_empty() {
				println!("Cardápio vazio.");
			}
			for product in &menu {
				println!(
					"{:>6}  {}  {}",
					product.id,
					product.name,
					format_price(product.price)
				);
				if !product.description.is_empty() {
					println!("        {}", product.description);
				}
			}
		},
		Command::Categories => {
			for category in catalog.categories().await? {
				println!("{:>6}  {}", category.id, category.name);
			}
		},
		Command::Cart { action } => cart(client, action).await?,
		Command::Addresses => {
			let book = client.checkout().load_addresses().await?;
			if book.addresses.is_empty() {
				println!("Nenhum endereço cadastrado.");
			}
			for address in &book.addresses {
				let marker = if Some(address.id) == book.selected { "*" } else { " " };
				println!("{} {:>6}  {}", marker, address.id, address.label());
			}
		},
		Command::Checkout { address } => {
			let checkout = client.checkout();
			let address = match address {
				Some(id) => Some(id),
				None => checkout.load_addresses().await?.selected,
			};
			let mut cart = client.cart().await;
			let total = cart.cart_total();
			match checkout.submit(&mut cart, address).await {
				Ok(()) => {},
				Err(CheckoutError::PlacedCartKept(e)) => {
					tracing::warn!(error = %e, "Cart kept after placing order");
					println!(
						"O pedido foi realizado, mas o carrinho não pôde ser esvaziado. Não envie de novo; use `umeal cart clear`."
					);
				},
				Err(e) => return Err(e.into()),
			}
			println!("Total: {}", format_price(total));
		},
		Command::Orders => {
			let orders = catalog.my_orders().await?;
			if orders.is_empty() {
				println!("Você ainda não fez nenhum pedido.");
			}
			for order in &orders {
				println!(
					"{}  {}  {}  {}",
					format_order_number(&order.id, ORDER_PREFIX),
					order.restaurant_name.as_deref().unwrap_or("-"),
					order.status.label(),
					format_price(order.total_price)
				);
			}
		},
		Command::Me => {
			let me = catalog.me().await?;
			println!("{} <{}>", me.name, me.email);
			println!("{}", me.role.label().unwrap_or(me.role.as_str()));
		},
		Command::Board { restaurant, watch } => {
			let restaurant_id = match restaurant {
				Some(id) => id,
				None => catalog.my_restaurant().await?.id,
			};
			let board = client.board(&restaurant_id);
			if watch {
				watch_board(client, &board, events).await;
			} else {
				board.refresh().await?;
				print!("{}", render_board(&board.lanes().await, &board.unknown().await));
			}
		},
		Command::Advance { restaurant, order } => {
			let board = client.board(&restaurant);
			board.refresh().await?;
			if board.advance(&order).await? == AdvanceOutcome::NoOp {
				println!(
					"Pedido {} não pode avançar.",
					format_order_number(&order, ORDER_PREFIX)
				);
			}
		},
		Command::Product { action } => match action {
			ProductAction::Add {
				restaurant,
				name,
				price,
				category,
				description,
				image_url,
			} => {
				let product = NewProduct {
					name,
					description,
					price,
					category_id: category,
					image_url,
				};
				catalog.create_product(&restaurant, &product).await?;
				println!("Produto {} criado.", product.name);
			},
			ProductAction::Delete { product } => {
				catalog.delete_product(product).await?;
				println!("Produto {} removido.", product);
			},
		},
		Command::Address { action } => address(client, action).await?,
		Command::Profile { name } => client.account().update_profile(&name).await?,
		Command::Setup {
			name,
			cnpj,
			category,
			address,
		} => {
			let form = RestaurantForm {
				restaurant_name: name,
				cnpj,
				category_id: category,
				address: AddressInput::from(address),
			};
			client.account().open_restaurant(&form).await?;
		},
	}
	Ok(())
}

async fn address(client: &Client, action: AddressAction) -> CommandResult {
	let account = client.account();
	match action {
		AddressAction::Add { address } => {
			let saved = account.add_address(&AddressInput::from(address)).await?;
			println!("{:>6}  {}", saved.id, saved.label());
		},
		AddressAction::Update { id, address } => {
			account.update_address(id, &AddressInput::from(address)).await?;
		},
		AddressAction::Delete { id } => account.delete_address(id).await?,
		AddressAction::Lookup { zip } => {
			let info = account.lookup_postal_code(&zip).await?;
			println!(
				"{} - {}, {}/{}",
				info.street, info.neighborhood, info.city, info.state
			);
		},
	}
	Ok(())
}

async fn cart(client: &Client, action: CartAction) -> CommandResult {
	let mut cart = client.cart().await;
	match action {
		CartAction::Show => {
			if cart.is_empty() {
				println!("Seu carrinho está vazio.");
				return Ok(());
			}
			println!("Restaurante {}", cart.restaurant_id().unwrap_or("-"));
			for item in cart.items() {
				println!(
					"{:>3}x  {:>6}  {}  {}",
					item.quantity,
					item.product.id,
					item.product.name,
					format_price(item.subtotal())
				);
			}
			println!(
				"Total: {} ({} itens)",
				format_price(cart.cart_total()),
				cart.cart_count()
			);
		},
		CartAction::Add {
			restaurant,
			product,
			replace,
		} => {
			let menu = client.catalog().menu(&restaurant).await?;
			let product = menu
				.into_iter()
				.find(|p| p.id == product)
				.ok_or_else(|| format!("Produto {} não encontrado no cardápio", product))?;
			if let AddOutcome::Conflict(conflict) = cart.add_to_cart(product, &restaurant).await? {
				if replace {
					conflict.clear_and_retry(&mut cart).await?;
				}
			}
		},
		CartAction::Remove { product } => cart.remove_from_cart(product).await?,
		CartAction::Update { product, delta } => cart.update_quantity(product, delta).await?,
		CartAction::Clear => cart.clear_cart().await?,
	}
	Ok(())
}

/// Polls the board and redraws it after every refresh until Ctrl-C.
async fn watch_board(
	client: &Client,
	board: &std::sync::Arc<OrderBoard>,
	events: &mut broadcast::Receiver<ClientEvent>,
) {
	let poller = board.spawn_poller(client.config().poll_interval());
	loop {
		tokio::select! {
			_ = tokio::signal::ctrl_c() => break,
			event = events.recv() => match event {
				Ok(ClientEvent::Board(BoardEvent::Refreshed { .. })) => {
					print!("{}", render_board(&board.lanes().await, &board.unknown().await));
				}
				Ok(other) => {
					if let Some(text) = describe(&other) {
						println!("{}", text);
					}
				}
				Err(RecvError::Lagged(skipped)) => {
					tracing::debug!(skipped, "Event printer fell behind");
				}
				Err(RecvError::Closed) => break,
			},
		}
	}
	poller.stop().await;
}

fn order_line(order: &Order) -> String {
	let time = order
		.placed_at()
		.map(|t| t.format("%H:%M").to_string())
		.unwrap_or_else(|| "--:--".to_string());
	format!(
		"  {}  {}  {}  {}",
		format_order_number(&order.id, ORDER_PREFIX),
		time,
		if order.customer_name.is_empty() {
			"Cliente"
		} else {
			order.customer_name.as_str()
		},
		format_price(order.total_price)
	)
}

/// Renders lanes followed by the bucket of unrecognised statuses, if any.
pub(crate) fn render_board(lanes: &[Lane], unknown: &[Order]) -> String {
	let mut out = String::new();
	for lane in lanes {
		out.push_str(&format!("{} ({})\n", lane.title, lane.orders.len()));
		for order in &lane.orders {
			out.push_str(&order_line(order));
			out.push('\n');
		}
	}
	if !unknown.is_empty() {
		out.push_str(&format!("Desconhecido ({})\n", unknown.len()));
		for order in unknown {
			out.push_str(&format!("{}  [{}]\n", order_line(order), order.status));
		}
	}
	out
}

/// User-facing text for an event, or `None` for events that are not shown.
pub(crate) fn describe(event: &ClientEvent) -> Option<String> {
	let text = match event {
		ClientEvent::Cart(CartEvent::ItemAdded {
			product_name,
			cart_count,
		}) => format!(
			"{} adicionado ao carrinho! ({} {})",
			product_name,
			cart_count,
			if *cart_count == 1 { "item" } else { "itens" }
		),
		ClientEvent::Cart(CartEvent::Conflict { .. }) => {
			"Seu carrinho tem itens de outro restaurante. Use --replace para esvaziá-lo e adicionar este item."
				.to_string()
		},
		ClientEvent::Cart(CartEvent::Cleared) => "Carrinho esvaziado.".to_string(),
		ClientEvent::Board(BoardEvent::Refreshed { .. }) => return None,
		ClientEvent::Board(BoardEvent::RefreshFailed { message, .. }) => {
			format!("Erro ao atualizar pedidos: {}", message)
		},
		ClientEvent::Board(BoardEvent::StatusAdvanced { order_id, to, .. }) => format!(
			"Pedido {} movido para {}",
			format_order_number(order_id, ORDER_PREFIX),
			to.lane_title()
		),
		ClientEvent::Board(BoardEvent::AdvanceFailed { message, .. }) => {
			format!("Erro ao atualizar status: {}", message)
		},
		ClientEvent::Checkout(CheckoutEvent::OrderPlaced { .. }) => {
			"Pedido realizado com sucesso!".to_string()
		},
		ClientEvent::Checkout(CheckoutEvent::Failed { message }) => {
			format!("Erro ao finalizar pedido: {}", message)
		},
		ClientEvent::Account(AccountEvent::AddressSaved { .. }) => "Endereço salvo!".to_string(),
		ClientEvent::Account(AccountEvent::AddressRemoved { .. }) => {
			"Endereço removido!".to_string()
		},
		ClientEvent::Account(AccountEvent::ProfileUpdated) => {
			"Perfil atualizado com sucesso!".to_string()
		},
		ClientEvent::Account(AccountEvent::RestaurantOpened { .. }) => {
			"Restaurante Inaugurado! Você já pode cadastrar seu cardápio e receber pedidos!"
				.to_string()
		},
	};
	Some(text)
}
