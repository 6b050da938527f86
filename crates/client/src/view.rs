//! View projection.
//!
//! Pure derivation of render-ready data from current state. The projection
//! has no memory of its own: calling [`project`] twice with the same state
//! yields the same view model.

use rust_decimal::Decimal;
use serde::Serialize;

use abshine_core::Role;

use crate::models::{Cart, CartLine, UserSession};

/// Severity of a pending notification toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A pending user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Message shown to the user.
    pub message: String,
    /// Severity, used for toast styling.
    pub level: NotificationLevel,
}

impl Notification {
    /// Create a notification.
    #[must_use]
    pub fn new(message: impl Into<String>, level: NotificationLevel) -> Self {
        Self {
            message: message.into(),
            level,
        }
    }
}

/// Cart line display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLineView {
    pub product_id: String,
    pub name: String,
    pub unit_price: String,
    pub line_total: String,
    pub quantity: u32,
    pub image: Option<String>,
    pub details: String,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id.as_str().to_owned(),
            name: line.name.clone(),
            unit_price: format_price(line.price.amount()),
            line_total: format_price(line.line_total()),
            quantity: line.quantity,
            image: line.image.clone(),
            details: line.details.clone(),
        }
    }
}

/// Cart panel display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartPanel {
    pub lines: Vec<CartLineView>,
    pub total: String,
    pub item_count: u64,
    /// The count badge is hidden while the cart is empty.
    pub badge_visible: bool,
    pub is_empty: bool,
}

/// Auth panel display state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuthPanel {
    SignedOut,
    SignedIn {
        name: String,
        email: String,
        role: Role,
    },
}

/// Render-ready data for the cart panel, auth panel, and notification toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewModel {
    pub cart: CartPanel,
    pub auth: AuthPanel,
    pub notification: Option<Notification>,
}

/// Project current state into a [`ViewModel`].
#[must_use]
pub fn project(
    cart: &Cart,
    session: Option<&UserSession>,
    notification: Option<&Notification>,
) -> ViewModel {
    let item_count = cart.item_count();

    ViewModel {
        cart: CartPanel {
            lines: cart.lines().iter().map(CartLineView::from).collect(),
            total: format_price(cart.total()),
            item_count,
            badge_visible: item_count > 0,
            is_empty: cart.is_empty(),
        },
        auth: session.map_or(AuthPanel::SignedOut, |session| AuthPanel::SignedIn {
            name: session.name.clone(),
            email: session.email.as_str().to_owned(),
            role: session.role,
        }),
        notification: notification.cloned(),
    }
}

/// Format a decimal amount as a price string, e.g. `$1,234.50`.
#[must_use]
pub fn format_price(amount: Decimal) -> String {
    let rendered = format!("{:.2}", amount.abs());
    let (integer, fraction) = rendered.split_once('.').unwrap_or((rendered.as_str(), "00"));

    let digits: Vec<char> = integer.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*digit);
    }

    let sign = if amount.is_sign_negative() && !amount.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}${grouped}.{fraction}")
}
