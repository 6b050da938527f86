//! Cart/session state manager.
//!
//! [`Storefront`] owns the cart, the authenticated session, and the current
//! catalog snapshot. Every mutation follows the same path: apply the change
//! in memory, mirror it into local storage, then re-project the view for any
//! registered change listeners. There is no ambient global; the front-end
//! holds the instance and calls its operations.
//!
//! Catalog loads are last-write-wins: each load mints an epoch token, and a
//! snapshot arriving under a superseded token is discarded so a stale
//! response can never overwrite a newer one.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use abshine_core::{Email, ProductId, Role};

use crate::auth::{AuthError, AuthProvider};
use crate::catalog::{self, Catalog, CatalogError};
use crate::docstore::{DocStoreError, DocumentStore};
use crate::forms::{self, FieldErrors, FormField, MSG_BAD_CREDENTIALS};
use crate::models::{AddOutcome, Cart, ProfileRecord, UserSession};
use crate::profiles::ProfileRepository;
use crate::storage::{self, Storage, keys};
use crate::view::{self, Notification, NotificationLevel, ViewModel};

// =============================================================================
// Errors
// =============================================================================

/// Errors from cart mutations that need a catalog lookup.
#[derive(Debug, Error)]
pub enum CartError {
    /// No catalog snapshot has been installed yet; the mutation is rejected
    /// rather than queued so behavior stays deterministic.
    #[error("catalog not ready")]
    CatalogNotReady,

    /// The product id is not in the current snapshot.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),
}

/// Errors from [`Storefront::login`].
#[derive(Debug, Error)]
pub enum LoginError {
    /// Wrong email/password combination.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The provider accepted the credentials but no profile record exists.
    #[error("profile not found")]
    ProfileNotFound,

    /// Provider or store unreachable.
    #[error("authentication unavailable: {0}")]
    Unavailable(String),
}

impl LoginError {
    /// Field-scoped rendering for the login form: every failure surfaces on
    /// the email field, the way the form has always reported it.
    #[must_use]
    pub fn field_errors(&self) -> FieldErrors {
        match self {
            Self::InvalidCredentials | Self::ProfileNotFound | Self::Unavailable(_) => {
                FieldErrors::single(FormField::Email, MSG_BAD_CREDENTIALS)
            }
        }
    }
}

/// Errors from [`Storefront::register`].
#[derive(Debug, Error)]
pub enum RegisterError {
    /// Local validation failed; no network call was made.
    #[error("registration form invalid")]
    Validation(FieldErrors),

    /// The provider rejected account creation.
    #[error("account creation failed: {0}")]
    Provider(#[source] AuthError),

    /// The profile record could not be written.
    #[error("profile write failed: {0}")]
    Store(#[source] DocStoreError),
}

impl RegisterError {
    /// Field-scoped rendering for the registration form. Provider and store
    /// failures surface verbatim on the email field.
    #[must_use]
    pub fn field_errors(&self) -> FieldErrors {
        match self {
            Self::Validation(errors) => errors.clone(),
            Self::Provider(error) => FieldErrors::single(FormField::Email, error.to_string()),
            Self::Store(error) => FieldErrors::single(FormField::Email, error.to_string()),
        }
    }
}

/// Errors from the checkout pre-flight.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to buy.
    #[error("cart is empty")]
    EmptyCart,

    /// Checkout requires a signed-in user.
    #[error("sign-in required")]
    SignInRequired,
}

/// Errors from [`Storefront::save_profile`].
#[derive(Debug, Error)]
pub enum ProfileSaveError {
    /// No active session.
    #[error("not signed in")]
    NotSignedIn,

    /// The store rejected the write.
    #[error(transparent)]
    Store(#[from] DocStoreError),
}

// =============================================================================
// Storefront
// =============================================================================

/// Epoch token minted per catalog load; see [`Storefront::begin_catalog_load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogLoadToken(u64);

type ChangeListener = Box<dyn Fn(&ViewModel)>;

/// The cart/session state manager.
///
/// Generic over its collaborators: local [`Storage`], the remote
/// [`DocumentStore`], and the [`AuthProvider`]. Construction restores
/// persisted state and applies the session TTL check, so a restarted client
/// comes up exactly where it left off (minus any expired session).
pub struct Storefront<S, D, A> {
    storage: S,
    store: D,
    auth: A,
    cart: Cart,
    session: Option<UserSession>,
    catalog: Option<Catalog>,
    catalog_epoch: u64,
    notification: Option<Notification>,
    listeners: Vec<ChangeListener>,
}

impl<S: Storage, D: DocumentStore, A: AuthProvider> Storefront<S, D, A> {
    /// Restore a storefront from local storage.
    pub fn new(storage: S, store: D, auth: A) -> Self {
        let cart = storage::load(&storage, keys::CART).unwrap_or_default();
        let session = storage::load(&storage, keys::USER);

        let mut storefront = Self {
            storage,
            store,
            auth,
            cart,
            session,
            catalog: None,
            catalog_epoch: 0,
            notification: None,
            listeners: Vec::new(),
        };
        storefront.check_session_validity();
        storefront
    }

    // =========================================================================
    // State access
    // =========================================================================

    /// The current cart.
    #[must_use]
    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// The active session, if any.
    #[must_use]
    pub fn session(&self) -> Option<&UserSession> {
        self.session.as_ref()
    }

    /// The installed catalog snapshot, if any.
    #[must_use]
    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.as_ref()
    }

    /// The last notification set by a mutation.
    #[must_use]
    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    /// Σ(price × quantity) over the cart.
    #[must_use]
    pub fn cart_total(&self) -> Decimal {
        self.cart.total()
    }

    /// Σ(quantity) over the cart.
    #[must_use]
    pub fn cart_item_count(&self) -> u64 {
        self.cart.item_count()
    }

    /// Project the current state into render-ready data.
    #[must_use]
    pub fn view(&self) -> ViewModel {
        view::project(&self.cart, self.session.as_ref(), self.notification.as_ref())
    }

    /// Register a change listener, invoked with the fresh view model after
    /// every state mutation.
    pub fn on_change(&mut self, listener: impl Fn(&ViewModel) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Mint an epoch token for a catalog load about to start. Any token
    /// minted earlier becomes stale.
    pub fn begin_catalog_load(&mut self) -> CatalogLoadToken {
        self.catalog_epoch += 1;
        CatalogLoadToken(self.catalog_epoch)
    }

    /// Install a fetched snapshot. Returns `false` (and discards the
    /// snapshot) when `token` has been superseded by a newer load.
    pub fn install_catalog(&mut self, token: CatalogLoadToken, catalog: Catalog) -> bool {
        if token.0 != self.catalog_epoch {
            tracing::debug!(
                token = token.0,
                current = self.catalog_epoch,
                "discarding catalog snapshot from superseded load"
            );
            return false;
        }
        tracing::info!(products = catalog.len(), "catalog snapshot installed");
        self.catalog = Some(catalog);
        true
    }

    /// Fetch and install a fresh catalog snapshot from the remote store.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Unavailable`] when the store cannot be read;
    /// the previous snapshot (if any) is kept.
    #[instrument(skip(self))]
    pub async fn refresh_catalog(&mut self) -> Result<(), CatalogError> {
        let token = self.begin_catalog_load();
        let catalog = catalog::fetch_catalog(&self.store).await?;
        self.install_catalog(token, catalog);
        Ok(())
    }

    // =========================================================================
    // Cart operations
    // =========================================================================

    /// Add one unit of a product to the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::CatalogNotReady`] before a snapshot is installed
    /// and [`CartError::ProductNotFound`] for an unknown id; the cart is
    /// untouched in both cases.
    pub fn add_to_cart(&mut self, product_id: &ProductId) -> Result<(), CartError> {
        if self.catalog.is_none() {
            return Err(CartError::CatalogNotReady);
        }

        let product = self
            .catalog
            .as_ref()
            .and_then(|catalog| catalog.get(product_id))
            .cloned();
        let Some(product) = product else {
            self.notification = Some(Notification::new(
                "Producto no encontrado",
                NotificationLevel::Error,
            ));
            self.notify();
            return Err(CartError::ProductNotFound(product_id.clone()));
        };

        let message = match self.cart.add(&product) {
            AddOutcome::Added => format!("{} agregado al carrito", product.name),
            AddOutcome::Incremented => format!("Cantidad actualizada: {}", product.name),
        };
        self.notification = Some(Notification::new(message, NotificationLevel::Success));

        self.persist_cart();
        self.notify();
        Ok(())
    }

    /// Remove a product's line from the cart. No-op if the line is absent.
    pub fn remove_from_cart(&mut self, product_id: &ProductId) {
        let Some(removed) = self.cart.remove(product_id) else {
            return;
        };
        self.notification = Some(Notification::new(
            format!("{} eliminado del carrito", removed.name),
            NotificationLevel::Info,
        ));

        self.persist_cart();
        self.notify();
    }

    /// Set a line's quantity. A quantity of zero or less removes the line;
    /// an unknown product id is a no-op.
    pub fn update_quantity(&mut self, product_id: &ProductId, new_quantity: i64) {
        if new_quantity <= 0 {
            self.remove_from_cart(product_id);
            return;
        }

        let quantity = u32::try_from(new_quantity).unwrap_or(u32::MAX);
        if self.cart.set_quantity(product_id, quantity) {
            self.persist_cart();
            self.notify();
        }
    }

    // =========================================================================
    // Session operations
    // =========================================================================

    /// Authenticate and establish a session.
    ///
    /// The pending cart is preserved; there is no server-side cart to merge.
    ///
    /// # Errors
    ///
    /// Returns [`LoginError::InvalidCredentials`] when the provider rejects
    /// the credentials, [`LoginError::ProfileNotFound`] when no profile
    /// record exists for the account, and [`LoginError::Unavailable`] when a
    /// remote service cannot be reached.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), LoginError> {
        let email = Email::parse(email.trim()).map_err(|_| LoginError::InvalidCredentials)?;

        let identity = self
            .auth
            .authenticate(&email, password)
            .await
            .map_err(|error| match error {
                AuthError::Unavailable(message) => LoginError::Unavailable(message),
                _ => LoginError::InvalidCredentials,
            })?;

        let profile = ProfileRepository::new(&self.store)
            .get(&identity.email)
            .await
            .map_err(|error| LoginError::Unavailable(error.to_string()))?
            .ok_or(LoginError::ProfileNotFound)?;

        let session = UserSession::new(profile.name, identity.email, profile.role, Utc::now());
        tracing::info!(email = %session.email, "user logged in");

        self.notification = Some(Notification::new(
            format!("¡Bienvenido, {}!", session.name),
            NotificationLevel::Success,
        ));
        self.session = Some(session);
        self.persist_session();
        self.notify();
        Ok(())
    }

    /// Validate the form, create the account, write the profile record, and
    /// establish a session for the new user.
    ///
    /// # Errors
    ///
    /// Returns [`RegisterError::Validation`] on local validation failure
    /// (no network call is made), [`RegisterError::Provider`] when account
    /// creation is rejected, and [`RegisterError::Store`] when the profile
    /// record cannot be written.
    #[instrument(skip(self, password, confirm_password), fields(email = %email))]
    pub async fn register(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<(), RegisterError> {
        let email = forms::validate_registration(name, email, password, confirm_password)
            .map_err(RegisterError::Validation)?;

        let identity = self
            .auth
            .create_account(&email, password)
            .await
            .map_err(RegisterError::Provider)?;

        let profile = ProfileRecord {
            name: name.trim().to_owned(),
            email: identity.email,
            role: Role::User,
        };
        ProfileRepository::new(&self.store)
            .create(&profile)
            .await
            .map_err(RegisterError::Store)?;

        let session = UserSession::new(profile.name, profile.email, profile.role, Utc::now());
        tracing::info!(email = %session.email, "user registered");

        self.notification = Some(Notification::new(
            format!("¡Registro exitoso! Bienvenido, {}", session.name),
            NotificationLevel::Success,
        ));
        self.session = Some(session);
        self.persist_session();
        self.notify();
        Ok(())
    }

    /// Clear the session. The cart survives logout by design.
    pub fn logout(&mut self) {
        let name = self
            .session
            .take()
            .map_or_else(|| "Usuario".to_owned(), |session| session.name);
        self.storage.remove(keys::USER);

        self.notification = Some(Notification::new(
            format!("¡Hasta luego, {name}!"),
            NotificationLevel::Info,
        ));
        self.notify();
    }

    /// Apply the session TTL: a session older than the fixed window is
    /// logged out. Called at startup and re-checked opportunistically.
    pub fn check_session_validity(&mut self) {
        self.check_session_validity_at(Utc::now());
    }

    /// TTL check against an explicit clock, for deterministic tests.
    pub fn check_session_validity_at(&mut self, now: DateTime<Utc>) {
        if self
            .session
            .as_ref()
            .is_some_and(|session| session.is_expired_at(now))
        {
            tracing::info!("session expired, logging out");
            self.logout();
        }
    }

    // =========================================================================
    // Checkout & profile
    // =========================================================================

    /// Pre-flight for checkout: a non-empty cart and a signed-in user.
    /// Payment itself happens elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::EmptyCart`] or [`CheckoutError::SignInRequired`].
    pub fn checkout(&mut self) -> Result<(), CheckoutError> {
        if self.cart.is_empty() {
            self.notification = Some(Notification::new(
                "Tu carrito está vacío",
                NotificationLevel::Warning,
            ));
            self.notify();
            return Err(CheckoutError::EmptyCart);
        }
        if self.session.is_none() {
            self.notification = Some(Notification::new(
                "Debes iniciar sesión para comprar",
                NotificationLevel::Info,
            ));
            self.notify();
            return Err(CheckoutError::SignInRequired);
        }

        self.persist_cart();
        Ok(())
    }

    /// Merge free-form profile details into the signed-in user's customer
    /// record.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileSaveError::NotSignedIn`] without a session, or the
    /// store error on write failure.
    #[instrument(skip(self, details))]
    pub async fn save_profile(&self, details: &Value) -> Result<(), ProfileSaveError> {
        let Some(session) = &self.session else {
            return Err(ProfileSaveError::NotSignedIn);
        };
        ProfileRepository::new(&self.store)
            .save_details(&session.email, details)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn persist_cart(&mut self) {
        storage::save(&mut self.storage, keys::CART, &self.cart);
    }

    fn persist_session(&mut self) {
        if let Some(session) = &self.session {
            storage::save(&mut self.storage, keys::USER, session);
        }
    }

    fn notify(&self) {
        if self.listeners.is_empty() {
            return;
        }
        let view = self.view();
        for listener in &self.listeners {
            listener(&view);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    use chrono::Duration;
    use serde_json::json;

    use crate::auth::MemoryAuthProvider;
    use crate::docstore::MemoryDocumentStore;
    use crate::models::session::SESSION_TTL_HOURS;
    use crate::storage::MemoryStorage;

    type TestStorefront = Storefront<MemoryStorage, Arc<MemoryDocumentStore>, Arc<MemoryAuthProvider>>;

    struct Fixture {
        storage: MemoryStorage,
        store: Arc<MemoryDocumentStore>,
        auth: Arc<MemoryAuthProvider>,
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(MemoryDocumentStore::new());
            store.insert("productos", "p1", json!({"name": "Limpiador", "price": 100}));
            store.insert("productos", "p2", json!({"name": "Jabón", "price": 250}));
            Self {
                storage: MemoryStorage::new(),
                store,
                auth: Arc::new(MemoryAuthProvider::new()),
            }
        }

        fn build(&self) -> TestStorefront {
            Storefront::new(self.storage.clone(), Arc::clone(&self.store), Arc::clone(&self.auth))
        }

        async fn build_ready(&self) -> TestStorefront {
            let mut storefront = self.build();
            storefront.refresh_catalog().await.unwrap();
            storefront
        }

        fn seed_user(&self, name: &str, email: &str, password: &str, role: &str) {
            self.auth.seed_account(email, password);
            self.store.insert(
                "usuarios",
                email,
                json!({"name": name, "email": email, "role": role}),
            );
        }
    }

    fn p(id: &str) -> ProductId {
        ProductId::new(id)
    }

    #[tokio::test]
    async fn test_add_before_catalog_is_rejected() {
        let fixture = Fixture::new();
        let mut storefront = fixture.build();

        assert!(matches!(
            storefront.add_to_cart(&p("p1")),
            Err(CartError::CatalogNotReady)
        ));
        assert!(storefront.cart().is_empty());
    }

    #[tokio::test]
    async fn test_add_unknown_product() {
        let fixture = Fixture::new();
        let mut storefront = fixture.build_ready().await;

        assert!(matches!(
            storefront.add_to_cart(&p("ghost")),
            Err(CartError::ProductNotFound(_))
        ));
        assert!(storefront.cart().is_empty());
        assert_eq!(
            storefront.notification().unwrap().message,
            "Producto no encontrado"
        );
    }

    #[tokio::test]
    async fn test_repeated_adds_accumulate_one_line() {
        let fixture = Fixture::new();
        let mut storefront = fixture.build_ready().await;

        for _ in 0..4 {
            storefront.add_to_cart(&p("p1")).unwrap();
        }

        assert_eq!(storefront.cart().len(), 1);
        assert_eq!(storefront.cart().line(&p("p1")).unwrap().quantity, 4);
        assert_eq!(storefront.cart_total(), Decimal::from(400));
    }

    #[tokio::test]
    async fn test_price_scenario() {
        let fixture = Fixture::new();
        let mut storefront = fixture.build_ready().await;

        storefront.add_to_cart(&p("p1")).unwrap();
        assert_eq!(storefront.cart_total(), Decimal::from(100));

        storefront.add_to_cart(&p("p1")).unwrap();
        assert_eq!(storefront.cart().line(&p("p1")).unwrap().quantity, 2);
        assert_eq!(storefront.cart_total(), Decimal::from(200));

        storefront.update_quantity(&p("p1"), 5);
        assert_eq!(storefront.cart_total(), Decimal::from(500));

        storefront.remove_from_cart(&p("p1"));
        assert!(storefront.cart().is_empty());
        assert_eq!(storefront.cart_total(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_update_quantity_zero_and_negative_remove() {
        let fixture = Fixture::new();
        let mut storefront = fixture.build_ready().await;

        storefront.add_to_cart(&p("p1")).unwrap();
        storefront.update_quantity(&p("p1"), 0);
        assert!(storefront.cart().is_empty());

        storefront.add_to_cart(&p("p1")).unwrap();
        storefront.update_quantity(&p("p1"), -5);
        assert!(storefront.cart().is_empty());
    }

    #[tokio::test]
    async fn test_update_quantity_unknown_line_is_noop() {
        let fixture = Fixture::new();
        let mut storefront = fixture.build_ready().await;

        storefront.update_quantity(&p("ghost"), 3);
        assert!(storefront.cart().is_empty());
    }

    #[tokio::test]
    async fn test_restart_reproduces_state() {
        let fixture = Fixture::new();
        fixture.seed_user("Ana", "ana@x.com", "secreta1", "user");

        let mut storefront = fixture.build_ready().await;
        storefront.add_to_cart(&p("p1")).unwrap();
        storefront.add_to_cart(&p("p2")).unwrap();
        storefront.update_quantity(&p("p1"), 3);
        storefront.login("ana@x.com", "secreta1").await.unwrap();

        let cart_before = storefront.cart().clone();
        let session_before = storefront.session().cloned();
        drop(storefront);

        let restarted = fixture.build();
        assert_eq!(restarted.cart(), &cart_before);
        assert_eq!(restarted.session(), session_before.as_ref());
        assert_eq!(restarted.cart_total(), cart_before.total());
    }

    #[tokio::test]
    async fn test_expired_session_removed_at_startup() {
        let fixture = Fixture::new();

        let stale = UserSession::new(
            "Ana".to_owned(),
            Email::parse("ana@x.com").unwrap(),
            Role::User,
            Utc::now() - Duration::hours(SESSION_TTL_HOURS) - Duration::minutes(1),
        );
        let mut seed_storage = fixture.storage.clone();
        storage::save(&mut seed_storage, keys::USER, &stale);

        let storefront = fixture.build();
        assert!(storefront.session().is_none());
        // The persisted record is gone too
        assert!(storage::load::<UserSession>(&fixture.storage, keys::USER).is_none());
    }

    #[tokio::test]
    async fn test_check_session_validity_at_boundary() {
        let fixture = Fixture::new();
        fixture.seed_user("Ana", "ana@x.com", "secreta1", "user");

        let mut storefront = fixture.build_ready().await;
        storefront.login("ana@x.com", "secreta1").await.unwrap();
        let login_time = storefront.session().unwrap().login_time;

        storefront.check_session_validity_at(login_time + Duration::hours(SESSION_TTL_HOURS));
        assert!(storefront.session().is_some());

        storefront.check_session_validity_at(
            login_time + Duration::hours(SESSION_TTL_HOURS) + Duration::seconds(1),
        );
        assert!(storefront.session().is_none());
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let fixture = Fixture::new();
        fixture.seed_user("Ana", "ana@x.com", "secreta1", "user");

        let mut storefront = fixture.build_ready().await;
        let error = storefront.login("ana@x.com", "mala").await.unwrap_err();
        assert!(matches!(error, LoginError::InvalidCredentials));
        assert_eq!(
            error.field_errors().get(FormField::Email),
            Some(MSG_BAD_CREDENTIALS)
        );
        assert!(storefront.session().is_none());
    }

    #[tokio::test]
    async fn test_login_without_profile_record() {
        let fixture = Fixture::new();
        fixture.auth.seed_account("ana@x.com", "secreta1");

        let mut storefront = fixture.build_ready().await;
        assert!(matches!(
            storefront.login("ana@x.com", "secreta1").await,
            Err(LoginError::ProfileNotFound)
        ));
    }

    #[tokio::test]
    async fn test_login_reads_profile_role() {
        let fixture = Fixture::new();
        fixture.seed_user("Dueña", "admin@abshine.com", "secreta1", "admin");

        let mut storefront = fixture.build_ready().await;
        storefront.login("admin@abshine.com", "secreta1").await.unwrap();

        let session = storefront.session().unwrap();
        assert_eq!(session.role, Role::Admin);
        assert_eq!(session.name, "Dueña");
        assert_eq!(
            storefront.notification().unwrap().message,
            "¡Bienvenido, Dueña!"
        );
    }

    #[tokio::test]
    async fn test_register_validation_makes_no_network_call() {
        let fixture = Fixture::new();
        let mut storefront = fixture.build_ready().await;

        let error = storefront
            .register("Ana", "a@x.com", "123", "123")
            .await
            .unwrap_err();
        let RegisterError::Validation(errors) = error else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get(FormField::Password), Some("Mínimo 6 caracteres"));
        assert_eq!(fixture.auth.request_count(), 0);
    }

    #[tokio::test]
    async fn test_register_creates_profile_and_session() {
        let fixture = Fixture::new();
        let mut storefront = fixture.build_ready().await;

        storefront
            .register("Ana", "ana@x.com", "secreta1", "secreta1")
            .await
            .unwrap();

        let session = storefront.session().unwrap();
        assert_eq!(session.name, "Ana");
        assert_eq!(session.role, Role::User);

        let record = fixture
            .store
            .get("usuarios", "ana@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record["role"], "user");
        assert_eq!(record["name"], "Ana");
    }

    #[tokio::test]
    async fn test_register_duplicate_email_surfaces_on_email_field() {
        let fixture = Fixture::new();
        fixture.seed_user("Ana", "ana@x.com", "secreta1", "user");

        let mut storefront = fixture.build_ready().await;
        let error = storefront
            .register("Otra", "ana@x.com", "secreta2", "secreta2")
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            RegisterError::Provider(AuthError::EmailAlreadyInUse)
        ));
        assert_eq!(
            error.field_errors().get(FormField::Email),
            Some("email already in use")
        );
        assert!(storefront.session().is_none());
    }

    #[tokio::test]
    async fn test_logout_preserves_cart() {
        let fixture = Fixture::new();
        fixture.seed_user("Ana", "ana@x.com", "secreta1", "user");

        let mut storefront = fixture.build_ready().await;
        storefront.add_to_cart(&p("p1")).unwrap();
        storefront.add_to_cart(&p("p2")).unwrap();
        storefront.login("ana@x.com", "secreta1").await.unwrap();

        let count_before = storefront.cart_item_count();
        storefront.logout();

        assert!(storefront.session().is_none());
        assert_eq!(storefront.cart_item_count(), count_before);
        assert_eq!(
            storefront.notification().unwrap().message,
            "¡Hasta luego, Ana!"
        );
    }

    #[tokio::test]
    async fn test_superseded_catalog_load_is_discarded() {
        let fixture = Fixture::new();
        let mut storefront = fixture.build();

        let stale_token = storefront.begin_catalog_load();
        let stale_catalog =
            Catalog::from_products(vec![]);

        let fresh_token = storefront.begin_catalog_load();
        let fresh_catalog = catalog::fetch_catalog(&fixture.store).await.unwrap();

        // The slow first response arrives after the newer load began
        assert!(!storefront.install_catalog(stale_token, stale_catalog));
        assert!(storefront.catalog().is_none());

        assert!(storefront.install_catalog(fresh_token, fresh_catalog));
        assert_eq!(storefront.catalog().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_catalog_unavailable_keeps_previous_snapshot() {
        let fixture = Fixture::new();
        let mut storefront = fixture.build_ready().await;

        fixture.store.set_offline(true);
        assert!(matches!(
            storefront.refresh_catalog().await,
            Err(CatalogError::Unavailable(_))
        ));
        // Still usable with the old snapshot
        assert!(storefront.add_to_cart(&p("p1")).is_ok());
    }

    #[tokio::test]
    async fn test_change_listener_fires_per_mutation() {
        let fixture = Fixture::new();
        let mut storefront = fixture.build_ready().await;

        let views: Rc<RefCell<Vec<ViewModel>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&views);
        storefront.on_change(move |view| sink.borrow_mut().push(view.clone()));

        storefront.add_to_cart(&p("p1")).unwrap();
        storefront.update_quantity(&p("p1"), 5);
        storefront.remove_from_cart(&p("p1"));

        let views = views.borrow();
        assert_eq!(views.len(), 3);
        assert_eq!(views[0].cart.item_count, 1);
        assert_eq!(views[1].cart.item_count, 5);
        assert!(views[2].cart.is_empty);
    }

    #[tokio::test]
    async fn test_checkout_preflight() {
        let fixture = Fixture::new();
        fixture.seed_user("Ana", "ana@x.com", "secreta1", "user");

        let mut storefront = fixture.build_ready().await;
        assert!(matches!(storefront.checkout(), Err(CheckoutError::EmptyCart)));

        storefront.add_to_cart(&p("p1")).unwrap();
        assert!(matches!(
            storefront.checkout(),
            Err(CheckoutError::SignInRequired)
        ));

        storefront.login("ana@x.com", "secreta1").await.unwrap();
        assert!(storefront.checkout().is_ok());
    }

    #[tokio::test]
    async fn test_save_profile_requires_session() {
        let fixture = Fixture::new();
        let storefront = fixture.build();

        assert!(matches!(
            storefront.save_profile(&json!({"provincia": "Córdoba"})).await,
            Err(ProfileSaveError::NotSignedIn)
        ));
    }

    #[tokio::test]
    async fn test_save_profile_merges_details() {
        let fixture = Fixture::new();
        fixture.seed_user("Ana", "ana@x.com", "secreta1", "user");

        let mut storefront = fixture.build_ready().await;
        storefront.login("ana@x.com", "secreta1").await.unwrap();

        storefront
            .save_profile(&json!({"provincia": "Córdoba"}))
            .await
            .unwrap();
        storefront
            .save_profile(&json!({"direccion": "Av. Colón 123"}))
            .await
            .unwrap();

        let record = fixture
            .store
            .get("clientes", "ana@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record["provincia"], "Córdoba");
        assert_eq!(record["direccion"], "Av. Colón 123");
    }

    #[tokio::test]
    async fn test_total_matches_recomputation_after_mutation_storm() {
        let fixture = Fixture::new();
        let mut storefront = fixture.build_ready().await;

        storefront.add_to_cart(&p("p1")).unwrap();
        storefront.add_to_cart(&p("p2")).unwrap();
        storefront.add_to_cart(&p("p1")).unwrap();
        storefront.update_quantity(&p("p2"), 7);
        storefront.remove_from_cart(&p("p1"));
        storefront.add_to_cart(&p("p1")).unwrap();

        let expected: Decimal = storefront
            .cart()
            .lines()
            .iter()
            .map(|line| line.price.amount() * Decimal::from(line.quantity))
            .sum();
        assert_eq!(storefront.cart_total(), expected);
        assert_eq!(storefront.cart_total(), Decimal::from(7 * 250 + 100));
    }
}
