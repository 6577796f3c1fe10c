//! Account management: saved addresses, the profile name and restaurant setup.

use crate::event_bus::EventBus;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;
use umeal_api::{ApiError, BackendService};
use umeal_types::{
	digits_only, AccountEvent, AddressInput, ClientEvent, DeliveryAddress, NewRestaurant,
	PostalCodeInfo, ProfileUpdate,
};

const POSTAL_CODE_DIGITS: usize = 8;
const CNPJ_DIGITS: usize = 14;

/// Errors that can occur while managing the account.
#[derive(Debug, Error)]
pub enum AccountError {
	#[error("Backend error: {0}")]
	Backend(#[from] ApiError),
	#[error("Invalid postal code: {0}")]
	InvalidPostalCode(String),
	#[error("Invalid input: {0}")]
	InvalidInput(String),
}

/// What the restaurant setup form collects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestaurantForm {
	pub restaurant_name: String,
	/// Punctuation is accepted and stripped.
	pub cnpj: String,
	pub category_id: i64,
	pub address: AddressInput,
}

pub struct Account {
	backend: Arc<BackendService>,
	events: EventBus,
}

impl Account {
	pub fn new(backend: Arc<BackendService>, events: EventBus) -> Self {
		Self { backend, events }
	}

	/// Looks up a postal code. Punctuation is ignored; anything other than
	/// eight digits is rejected before reaching the API.
	pub async fn lookup_postal_code(&self, raw: &str) -> Result<PostalCodeInfo, AccountError> {
		let cep = digits_only(raw);
		if cep.len() != POSTAL_CODE_DIGITS {
			return Err(AccountError::InvalidPostalCode(raw.to_string()));
		}
		Ok(self.backend.lookup_postal_code(&cep).await?)
	}

	/// Normalises the input and fills blank fields from the postal code.
	pub async fn resolve_address(&self, input: &AddressInput) -> Result<AddressInput, AccountError> {
		let mut address = input.normalised();
		if address.needs_lookup() {
			let info = self.lookup_postal_code(&address.zip_code).await?;
			address.fill_from(&info);
		}
		validate_address(&address)?;
		Ok(address)
	}

	#[instrument(skip_all)]
	pub async fn add_address(&self, input: &AddressInput) -> Result<DeliveryAddress, AccountError> {
		let address = self.resolve_address(input).await?;
		let saved = self.backend.create_address(&address).await?;
		tracing::info!(address_id = saved.id, "Address saved");
		self.publish(AccountEvent::AddressSaved {
			address_id: saved.id,
		});
		Ok(saved)
	}

	#[instrument(skip_all, fields(address_id = address_id))]
	pub async fn update_address(
		&self,
		address_id: i64,
		input: &AddressInput,
	) -> Result<(), AccountError> {
		let address = self.resolve_address(input).await?;
		self.backend.update_address(address_id, &address).await?;
		self.publish(AccountEvent::AddressSaved { address_id });
		Ok(())
	}

	#[instrument(skip_all, fields(address_id = address_id))]
	pub async fn delete_address(&self, address_id: i64) -> Result<(), AccountError> {
		self.backend.delete_address(address_id).await?;
		self.publish(AccountEvent::AddressRemoved { address_id });
		Ok(())
	}

	/// Renames the signed-in user. The email is sent back unchanged.
	pub async fn update_profile(&self, name: &str) -> Result<(), AccountError> {
		let name = name.trim();
		if name.is_empty() {
			return Err(AccountError::InvalidInput("name must not be empty".into()));
		}
		let me = self.backend.current_user().await?;
		self.backend
			.update_profile(&ProfileUpdate {
				name: name.to_string(),
				email: me.email,
			})
			.await?;
		self.publish(AccountEvent::ProfileUpdated);
		Ok(())
	}

	/// Registers the signed-in user's restaurant.
	///
	/// The address is saved first and the restaurant is bound to it. Form
	/// fields are checked before anything is sent.
	#[instrument(skip_all)]
	pub async fn open_restaurant(&self, form: &RestaurantForm) -> Result<(), AccountError> {
		let restaurant_name = form.restaurant_name.trim().to_string();
		if restaurant_name.is_empty() {
			return Err(AccountError::InvalidInput(
				"restaurant name must not be empty".into(),
			));
		}
		let cnpj = digits_only(&form.cnpj);
		if cnpj.len() != CNPJ_DIGITS {
			return Err(AccountError::InvalidInput(format!(
				"CNPJ must have {} digits",
				CNPJ_DIGITS
			)));
		}

		let address = self.add_address(&form.address).await?;
		self.backend
			.create_restaurant(&NewRestaurant {
				restaurant_name: restaurant_name.clone(),
				cnpj,
				category_ids: vec![form.category_id],
				address_id: address.id,
			})
			.await?;
		tracing::info!(restaurant_name = %restaurant_name, "Restaurant opened");
		self.publish(AccountEvent::RestaurantOpened { restaurant_name });
		Ok(())
	}

	fn publish(&self, event: AccountEvent) {
		self.events.publish(ClientEvent::Account(event)).ok();
	}
}

fn validate_address(address: &AddressInput) -> Result<(), AccountError> {
	if address.zip_code.len() != POSTAL_CODE_DIGITS {
		return Err(AccountError::InvalidPostalCode(address.zip_code.clone()));
	}
	if address.street.is_empty() || address.number.is_empty() {
		return Err(AccountError::InvalidInput(
			"street and number are required".into(),
		));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use tokio::sync::broadcast::Receiver;
	use umeal_api::implementations::memory::{Fixture, MemoryBackend};
	use umeal_types::{Category, UserProfile, UserRole};

	fn fixture() -> Fixture {
		let mut fixture = Fixture {
			user: Some(UserProfile {
				id: "u1".into(),
				name: "Ana".into(),
				email: "ana@umeal.dev".into(),
				role: UserRole::Client,
			}),
			categories: vec![Category {
				id: 5,
				name: "Italiana".into(),
			}],
			..Default::default()
		};
		fixture.postal_codes.insert(
			"01001000".into(),
			PostalCodeInfo {
				street: "Praça da Sé".into(),
				neighborhood: "Sé".into(),
				city: "São Paulo".into(),
				state: "SP".into(),
			},
		);
		fixture
	}

	fn setup() -> (Account, MemoryBackend, Receiver<ClientEvent>) {
		let backend = MemoryBackend::with_fixture(fixture());
		let events = EventBus::default();
		let rx = events.subscribe();
		let account = Account::new(
			Arc::new(BackendService::new(Box::new(backend.clone()))),
			events,
		);
		(account, backend, rx)
	}

	fn by_zip(zip: &str, number: &str) -> AddressInput {
		AddressInput {
			number: number.into(),
			zip_code: zip.into(),
			..Default::default()
		}
	}

	#[tokio::test]
	async fn test_add_address_fills_from_postal_code() {
		let (account, backend, mut rx) = setup();

		let saved = account.add_address(&by_zip("01001-000", " 100 ")).await.unwrap();

		assert_eq!(saved.street, "Praça da Sé");
		assert_eq!(saved.number, "100");
		assert_eq!(saved.city, "São Paulo");
		assert_eq!(saved.zip_code, "01001000");
		assert_eq!(backend.fixture().await.addresses, vec![saved.clone()]);
		assert_eq!(
			rx.try_recv().unwrap(),
			ClientEvent::Account(AccountEvent::AddressSaved { address_id: saved.id })
		);
	}

	#[tokio::test]
	async fn test_typed_fields_skip_the_lookup() {
		let (account, backend, _rx) = setup();
		let input = AddressInput {
			street: "Rua Augusta".into(),
			number: "5".into(),
			neighborhood: "Consolação".into(),
			city: "São Paulo".into(),
			state: "SP".into(),
			zip_code: "01305-000".into(),
			..Default::default()
		};

		let saved = account.add_address(&input).await.unwrap();

		assert_eq!(saved.street, "Rua Augusta");
		assert_eq!(backend.fixture().await.addresses.len(), 1);
	}

	#[tokio::test]
	async fn test_malformed_postal_code_never_reaches_the_api() {
		let (account, backend, mut rx) = setup();
		backend
			.fail_next(ApiError::Network("should not be called".into()))
			.await;

		let result = account.add_address(&by_zip("0100-100", "1")).await;

		assert!(matches!(result, Err(AccountError::InvalidPostalCode(_))));
		// The queued failure is still pending, so no request was made.
		assert!(account.lookup_postal_code("01001000").await.is_err());
		assert!(rx.try_recv().is_err());
	}

	#[tokio::test]
	async fn test_unknown_postal_code_is_a_backend_error() {
		let (account, backend, _rx) = setup();

		let result = account.add_address(&by_zip("99999999", "1")).await;

		assert!(matches!(
			result,
			Err(AccountError::Backend(ApiError::Http { status: 404, .. }))
		));
		assert!(backend.fixture().await.addresses.is_empty());
	}

	#[tokio::test]
	async fn test_update_and_delete_address() {
		let (account, backend, mut rx) = setup();
		let saved = account.add_address(&by_zip("01001000", "1")).await.unwrap();
		rx.try_recv().unwrap();

		account
			.update_address(saved.id, &by_zip("01001000", "2"))
			.await
			.unwrap();
		assert_eq!(backend.fixture().await.addresses[0].number, "2");

		account.delete_address(saved.id).await.unwrap();
		assert!(backend.fixture().await.addresses.is_empty());
		assert_eq!(
			rx.try_recv().unwrap(),
			ClientEvent::Account(AccountEvent::AddressSaved { address_id: saved.id })
		);
		assert_eq!(
			rx.try_recv().unwrap(),
			ClientEvent::Account(AccountEvent::AddressRemoved { address_id: saved.id })
		);

		let missing = account.delete_address(saved.id).await;
		assert!(matches!(missing, Err(AccountError::Backend(_))));
	}

	#[tokio::test]
	async fn test_update_profile_keeps_email() {
		let (account, backend, mut rx) = setup();

		account.update_profile("  Ana Maria ").await.unwrap();

		let user = backend.fixture().await.user.unwrap();
		assert_eq!(user.name, "Ana Maria");
		assert_eq!(user.email, "ana@umeal.dev");
		assert_eq!(
			rx.try_recv().unwrap(),
			ClientEvent::Account(AccountEvent::ProfileUpdated)
		);
		assert!(matches!(
			account.update_profile("   ").await,
			Err(AccountError::InvalidInput(_))
		));
	}

	#[tokio::test]
	async fn test_open_restaurant() {
		let (account, backend, mut rx) = setup();
		let form = RestaurantForm {
			restaurant_name: "Cantina".into(),
			cnpj: "12.345.678/0001-99".into(),
			category_id: 5,
			address: by_zip("01001000", "10"),
		};

		account.open_restaurant(&form).await.unwrap();

		let data = backend.fixture().await;
		let id = data.my_restaurant_id.clone().unwrap();
		let restaurant = data.restaurants.iter().find(|r| r.id == id).unwrap();
		assert_eq!(restaurant.restaurant_name, "Cantina");
		assert_eq!(restaurant.categories[0].name, "Italiana");
		assert_eq!(
			restaurant.address.as_ref().map(|a| a.id),
			Some(data.addresses[0].id)
		);
		assert!(matches!(
			rx.try_recv().unwrap(),
			ClientEvent::Account(AccountEvent::AddressSaved { .. })
		));
		assert_eq!(
			rx.try_recv().unwrap(),
			ClientEvent::Account(AccountEvent::RestaurantOpened {
				restaurant_name: "Cantina".into()
			})
		);

		let again = account.open_restaurant(&form).await;
		assert!(matches!(
			again,
			Err(AccountError::Backend(ApiError::Http { status: 409, .. }))
		));
	}

	#[tokio::test]
	async fn test_open_restaurant_rejects_short_cnpj() {
		let (account, backend, _rx) = setup();
		let form = RestaurantForm {
			restaurant_name: "Cantina".into(),
			cnpj: "1234".into(),
			category_id: 5,
			address: by_zip("01001000", "10"),
		};

		let result = account.open_restaurant(&form).await;

		assert!(matches!(result, Err(AccountError::InvalidInput(_))));
		let data = backend.fixture().await;
		assert!(data.addresses.is_empty());
		assert!(data.my_restaurant_id.is_none());
	}
}
