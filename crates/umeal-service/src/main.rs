//! Command-line front-end for the uMeal client.
//!
//! Browses restaurants, manages the persisted cart, places orders, and gives
//! restaurant owners an order board with one-step status advancement. Account
//! commands manage saved addresses, the profile name and restaurant setup.

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use umeal_config::Config;
use umeal_types::AddressInput;

mod commands;
mod factory_registry;

/// Command-line arguments for the uMeal client.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config/umeal.toml", env = "UMEAL_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "warn")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub(crate) enum Command {
	/// List restaurants, optionally filtered by name and category
	Restaurants {
		#[arg(long)]
		search: Option<String>,
		#[arg(long)]
		category: Option<String>,
	},
	/// Show a restaurant's menu
	Menu { restaurant: String },
	/// List food categories
	Categories,
	/// Inspect or change the cart
	Cart {
		#[command(subcommand)]
		action: CartAction,
	},
	/// List saved delivery addresses
	Addresses,
	/// Place an order with the cart's contents
	Checkout {
		/// Delivery address id; defaults to the first saved address
		#[arg(long)]
		address: Option<i64>,
	},
	/// Show your order history
	Orders,
	/// Show the signed-in account
	Me,
	/// Show a restaurant's order board
	Board {
		/// Restaurant id; defaults to the restaurant you own
		restaurant: Option<String>,
		/// Keep refreshing until interrupted
		#[arg(long)]
		watch: bool,
	},
	/// Move an order to its next status
	Advance { restaurant: String, order: String },
	/// Manage your restaurant's menu
	Product {
		#[command(subcommand)]
		action: ProductAction,
	},
	/// Manage saved addresses
	Address {
		#[command(subcommand)]
		action: AddressAction,
	},
	/// Change your display name
	Profile {
		#[arg(long)]
		name: String,
	},
	/// Register your restaurant
	Setup {
		#[arg(long)]
		name: String,
		/// 14 digits, punctuation allowed
		#[arg(long)]
		cnpj: String,
		#[arg(long)]
		category: i64,
		#[command(flatten)]
		address: AddressArgs,
	},
}

#[derive(Subcommand, Debug, PartialEq)]
pub(crate) enum AddressAction {
	Add {
		#[command(flatten)]
		address: AddressArgs,
	},
	Update {
		id: i64,
		#[command(flatten)]
		address: AddressArgs,
	},
	Delete { id: i64 },
	/// Show what a postal code resolves to
	Lookup { zip: String },
}

/// Address fields. Blank street, neighborhood, city and state are filled
/// from the postal code.
#[derive(clap::Args, Debug, PartialEq)]
pub(crate) struct AddressArgs {
	#[arg(long)]
	zip: String,
	#[arg(long)]
	number: String,
	#[arg(long, default_value = "")]
	street: String,
	#[arg(long, default_value = "")]
	neighborhood: String,
	#[arg(long, default_value = "")]
	city: String,
	#[arg(long, default_value = "")]
	state: String,
	#[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
	latitude: f64,
	#[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
	longitude: f64,
}

impl From<AddressArgs> for AddressInput {
	fn from(args: AddressArgs) -> Self {
		AddressInput {
			street: args.street,
			number: args.number,
			neighborhood: args.neighborhood,
			city: args.city,
			state: args.state,
			zip_code: args.zip,
			latitude: args.latitude,
			longitude: args.longitude,
		}
	}
}

#[derive(Subcommand, Debug, PartialEq)]
pub(crate) enum CartAction {
	Show,
	/// Add one unit of a product
	Add {
		restaurant: String,
		product: i64,
		/// Empty a cart from another restaurant first
		#[arg(long)]
		replace: bool,
	},
	/// Remove a product entirely
	Remove { product: i64 },
	/// Change a product's quantity by a signed amount
	Update {
		product: i64,
		#[arg(allow_hyphen_values = true)]
		delta: i64,
	},
	Clear,
}

#[derive(Subcommand, Debug, PartialEq)]
pub(crate) enum ProductAction {
	Add {
		restaurant: String,
		#[arg(long)]
		name: String,
		#[arg(long)]
		price: Decimal,
		#[arg(long)]
		category: i64,
		#[arg(long, default_value = "")]
		description: String,
		#[arg(long, default_value = "")]
		image_url: String,
	},
	Delete { product: i64 },
}

/// Main entry point.
///
/// Parses arguments, initializes logging, loads configuration, builds the
/// client and runs the requested command.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	// Logs go to stderr so command output stays clean.
	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	let config = Config::from_file(&args.config).await?;
	tracing::info!("Loaded configuration [{}]", config.client.id);

	let client = factory_registry::build_client_from_config(config).await?;
	commands::run(&client, args.command).await?;

	tracing::debug!("Done");
	Ok(())
}
