//! ABShine CLI - Storefront front-end.
//!
//! # Usage
//!
//! ```bash
//! # List the catalog
//! abshine catalog
//!
//! # Cart operations (state persists between runs)
//! abshine cart add limpiador-multiuso
//! abshine cart set limpiador-multiuso 3
//! abshine cart show
//!
//! # Account
//! abshine register -n Ana -e ana@example.com -p secreta1 --confirm-password secreta1
//! abshine login -e ana@example.com -p secreta1
//! abshine whoami
//! abshine checkout
//! abshine logout
//!
//! # Against in-memory services with a demo catalog (no remote configuration)
//! abshine --offline catalog
//! ```
//!
//! # Environment Variables
//!
//! - `ABSHINE_STORE_URL` / `ABSHINE_STORE_API_KEY` - remote document store
//! - `ABSHINE_AUTH_URL` / `ABSHINE_AUTH_API_KEY` - authentication provider
//! - `ABSHINE_DATA_DIR` - local state directory (default: `.abshine`)

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::print_stdout)]

use clap::{Parser, Subcommand};
use serde_json::json;
use thiserror::Error;

use abshine_core::ProductId;

use abshine_client::auth::{AuthProvider, HttpAuthProvider, MemoryAuthProvider};
use abshine_client::catalog::{CATALOG_COLLECTION, CatalogError};
use abshine_client::config::{ClientConfig, ConfigError, DEFAULT_DATA_DIR};
use abshine_client::docstore::{DocumentStore, HttpDocumentStore, MemoryDocumentStore};
use abshine_client::forms::FieldErrors;
use abshine_client::storage::{FileStorage, Storage, StorageError};
use abshine_client::storefront::{
    CartError, CheckoutError, LoginError, RegisterError, Storefront,
};
use abshine_client::view::{AuthPanel, ViewModel};

#[derive(Parser)]
#[command(name = "abshine")]
#[command(author, version, about = "ABShine storefront client")]
struct Cli {
    /// Run against in-memory services seeded with a demo catalog
    #[arg(long)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the product catalog
    Catalog,
    /// Inspect or mutate the shopping cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Sign in with email and password
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },
    /// Create an account
    Register {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password (at least 6 characters)
        #[arg(short, long)]
        password: String,

        /// Password confirmation
        #[arg(long)]
        confirm_password: String,
    },
    /// Sign out (the cart is kept)
    Logout,
    /// Verify the cart and session are ready for checkout
    Checkout,
    /// Show the signed-in user
    Whoami,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart lines and totals
    Show,
    /// Add one unit of a product
    Add {
        /// Catalog product id
        product_id: String,
    },
    /// Remove a product's line
    Remove {
        /// Catalog product id
        product_id: String,
    },
    /// Set a line's quantity (0 removes the line)
    Set {
        /// Catalog product id
        product_id: String,

        /// New quantity
        quantity: i64,
    },
}

/// Errors surfaced to the terminal.
#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Cart(#[from] CartError),
    #[error("login failed")]
    Login(#[source] LoginError),
    #[error("registration failed")]
    Register(#[source] RegisterError),
    #[error(transparent)]
    Checkout(#[from] CheckoutError),
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "abshine_cli=info,abshine_client=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    let result = if cli.offline {
        run_offline(cli.command).await
    } else {
        run_online(cli.command).await
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

/// Run against the configured remote services.
async fn run_online(command: Commands) -> Result<(), CliError> {
    let config = ClientConfig::from_env()?;
    let storage = FileStorage::open(&config.data_dir)?;
    let store = HttpDocumentStore::new(&config.store);
    let auth = HttpAuthProvider::new(&config.auth);

    dispatch(Storefront::new(storage, store, auth), command).await
}

/// Run against in-memory services seeded with a small demo catalog. Cart and
/// session still persist to the local data directory.
async fn run_offline(command: Commands) -> Result<(), CliError> {
    let data_dir =
        std::env::var("ABSHINE_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_owned());
    let storage = FileStorage::open(data_dir)?;

    let store = MemoryDocumentStore::new();
    store.insert(
        CATALOG_COLLECTION,
        "limpiador-multiuso",
        json!({"name": "Limpiador multiuso", "price": 1500, "details": "Aroma lavanda, 1L"}),
    );
    store.insert(
        CATALOG_COLLECTION,
        "jabon-liquido",
        json!({"name": "Jabón líquido", "price": 800, "details": "Ropa blanca y de color, 3L"}),
    );
    store.insert(
        CATALOG_COLLECTION,
        "lavandina",
        json!({"name": "Lavandina concentrada", "price": 650}),
    );
    store.insert(
        "usuarios",
        "demo@abshine.com",
        json!({"name": "Demo", "email": "demo@abshine.com", "role": "user"}),
    );

    let auth = MemoryAuthProvider::new();
    auth.seed_account("demo@abshine.com", "demo123");

    tracing::info!("offline mode: demo catalog, account demo@abshine.com / demo123");
    dispatch(Storefront::new(storage, store, auth), command).await
}

/// Execute one command against the storefront.
async fn dispatch<S, D, A>(
    mut storefront: Storefront<S, D, A>,
    command: Commands,
) -> Result<(), CliError>
where
    S: Storage,
    D: DocumentStore,
    A: AuthProvider,
{
    // Every mutation re-renders through the change subscription
    storefront.on_change(render_view);

    match command {
        Commands::Catalog => {
            storefront.refresh_catalog().await?;
            render_catalog(&storefront);
        }
        Commands::Cart { action } => match action {
            CartAction::Show => render_view(&storefront.view()),
            CartAction::Add { product_id } => {
                storefront.refresh_catalog().await?;
                storefront.add_to_cart(&ProductId::new(product_id))?;
            }
            CartAction::Remove { product_id } => {
                storefront.remove_from_cart(&ProductId::new(product_id));
            }
            CartAction::Set {
                product_id,
                quantity,
            } => {
                storefront.update_quantity(&ProductId::new(product_id), quantity);
            }
        },
        Commands::Login { email, password } => {
            if let Err(error) = storefront.login(&email, &password).await {
                render_field_errors(&error.field_errors());
                return Err(CliError::Login(error));
            }
        }
        Commands::Register {
            name,
            email,
            password,
            confirm_password,
        } => {
            if let Err(error) = storefront
                .register(&name, &email, &password, &confirm_password)
                .await
            {
                render_field_errors(&error.field_errors());
                return Err(CliError::Register(error));
            }
        }
        Commands::Logout => storefront.logout(),
        Commands::Checkout => {
            storefront.checkout()?;
            println!("Listo para el checkout.");
        }
        Commands::Whoami => match storefront.view().auth {
            AuthPanel::SignedIn { name, email, role } => {
                println!("{name} <{email}> ({role})");
            }
            AuthPanel::SignedOut => println!("No has iniciado sesión."),
        },
    }

    Ok(())
}

// =============================================================================
// Rendering
// =============================================================================

/// Print the product catalog.
fn render_catalog<S, D, A>(storefront: &Storefront<S, D, A>)
where
    S: Storage,
    D: DocumentStore,
    A: AuthProvider,
{
    let Some(catalog) = storefront.catalog() else {
        println!("Catálogo no disponible.");
        return;
    };

    if catalog.is_empty() {
        println!("El catálogo está vacío.");
        return;
    }

    for product in catalog.products() {
        let price = abshine_client::view::format_price(product.price.amount());
        println!("{:<24} {:<32} {price}", product.id.as_str(), product.name);
    }
}

/// Print the rendered view model: notification, cart panel, auth panel.
fn render_view(view: &ViewModel) {
    if let Some(notification) = &view.notification {
        println!("[{}] {}", notification.level, notification.message);
    }

    if view.cart.is_empty {
        println!("Tu carrito está vacío");
    } else {
        for line in &view.cart.lines {
            println!(
                "{:>3} x {:<32} {:>12}  ({} c/u)",
                line.quantity, line.name, line.line_total, line.unit_price
            );
        }
        println!("Total: {} ({} artículos)", view.cart.total, view.cart.item_count);
    }

    match &view.auth {
        AuthPanel::SignedIn { name, .. } => println!("Sesión: {name}"),
        AuthPanel::SignedOut => {}
    }
}

/// Print field-scoped form errors, one per line.
fn render_field_errors(errors: &FieldErrors) {
    for (field, message) in errors.iter() {
        println!("{field}: {message}");
    }
}
