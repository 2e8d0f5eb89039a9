//! ============================================================================
//! Core Types for the Goldie storefront
//! ============================================================================
//! Orders, identities and shelf records. Intent, currency and item type are
//! closed enums at the boundary; free-form labels are parsed once on the way
//! in.
//! ============================================================================

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::GoldieError;

// ============================================================================
// Order Types
// ============================================================================

/// Transactional stance of the order's originator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Intent {
    /// "COMPRAR" / "EN COMPRA"
    Buy,
    /// "VENDER" / "EN VENTA"
    Sell,
    /// "OBSERVANDO" and anything unrecognized
    Watching,
}

impl Intent {
    /// Parse a stored intent label. Unknown labels collapse to `Watching`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_uppercase().as_str() {
            "COMPRAR" | "EN COMPRA" | "BUY" => Self::Buy,
            "VENDER" | "EN VENTA" | "SELL" => Self::Sell,
            _ => Self::Watching,
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Buy => "COMPRAR",
            Self::Sell => "VENDER",
            Self::Watching => "OBSERVANDO",
        }
    }
}

impl From<String> for Intent {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<Intent> for String {
    fn from(intent: Intent) -> Self {
        intent.as_label().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Currency {
    #[default]
    Ars,
    Usd,
}

impl Currency {
    /// Anything other than "USD" is pesos
    pub fn from_code(code: &str) -> Self {
        if code.trim().eq_ignore_ascii_case("USD") {
            Self::Usd
        } else {
            Self::Ars
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Ars => "ARS",
            Self::Usd => "USD",
        }
    }

    /// Symbol used in rendered prices
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Ars => "$",
            Self::Usd => "US$",
        }
    }
}

impl From<String> for Currency {
    fn from(code: String) -> Self {
        Self::from_code(&code)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.code().to_string()
    }
}

/// Catalog entity kind an order points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    #[default]
    Release,
    Master,
}

impl FromStr for ItemType {
    type Err = GoldieError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "release" => Ok(Self::Release),
            "master" => Ok(Self::Master),
            _ => Err(GoldieError::Parse(format!(
                "Unknown item type '{}'. Valid values: release, master",
                s
            ))),
        }
    }
}

impl ItemType {
    /// Path segment in catalog URLs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::Master => "master",
        }
    }
}

/// What the user filled in for an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub intent: Intent,
    pub artist: String,
    pub album: String,
    pub format: String,
    pub condition: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub currency: Currency,
}

/// An order ready to be rendered into a message.
/// `details` stays optional so an incomplete order can still be represented
/// and rejected at render time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Order {
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub item_type: ItemType,
    /// Operator counter-offer, shown instead of the user's price
    #[serde(default)]
    pub admin_offer_price: Option<Decimal>,
    #[serde(default)]
    pub admin_offer_currency: Currency,
    pub details: Option<OrderDetails>,
}

impl Order {
    pub fn new(details: OrderDetails) -> Self {
        Self {
            details: Some(details),
            ..Self::default()
        }
    }

    pub fn with_item(mut self, item_id: impl Into<String>, item_type: ItemType) -> Self {
        self.item_id = Some(item_id.into());
        self.item_type = item_type;
        self
    }

    pub fn with_order_number(mut self, order_number: impl Into<String>) -> Self {
        self.order_number = Some(order_number.into());
        self
    }

    pub fn with_admin_offer(mut self, price: Decimal, currency: Currency) -> Self {
        self.admin_offer_price = Some(price);
        self.admin_offer_currency = currency;
        self
    }
}

// ============================================================================
// Identity Types
// ============================================================================

/// Identity as issued by the provider after a successful sign-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    /// Provider session token, never persisted
    #[serde(skip)]
    pub id_token: Option<String>,
}

impl ProviderUser {
    /// Provider name, else the local part of the email
    pub fn derived_display_name(&self) -> Option<String> {
        if let Some(name) = self.display_name.as_deref().map(str::trim) {
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
        self.email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
            .map(str::to_string)
    }
}

/// The signed-in user as seen by the rest of the app
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub last_login: DateTime<Utc>,
}

/// Profile document mirrored into the store, keyed by uid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

impl UserProfile {
    pub fn identity(&self) -> UserIdentity {
        UserIdentity {
            uid: self.uid.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            photo_url: self.photo_url.clone(),
            last_login: self.last_login,
        }
    }
}

/// Fields to merge into a profile. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfilePatch {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub location: Option<String>,
    /// Stamp `last_login` with the store's clock
    pub touch_last_login: bool,
}

// ============================================================================
// Shelf Types
// ============================================================================

/// Per-user shelves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shelf {
    Collection,
    Wantlist,
}

impl FromStr for Shelf {
    type Err = GoldieError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "collection" | "archive" | "coleccion" => Ok(Self::Collection),
            "wantlist" | "deseados" => Ok(Self::Wantlist),
            _ => Err(GoldieError::Parse(format!(
                "Unknown shelf '{}'. Valid values: collection, wantlist",
                s
            ))),
        }
    }
}

impl Shelf {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collection => "collection",
            Self::Wantlist => "wantlist",
        }
    }
}

/// A record on a user's collection or wantlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShelfItem {
    /// Catalog id, doubles as the document key
    pub id: String,
    pub title: String,
    pub cover_image: String,
    #[serde(default)]
    pub artist: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// An item being assembled into the lote (cart) before ordering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoteEntry {
    pub item_id: String,
    #[serde(default)]
    pub item_type: ItemType,
    pub title: String,
    pub details: OrderDetails,
}

impl LoteEntry {
    pub fn to_order(&self) -> Order {
        Order::new(self.details.clone()).with_item(self.item_id.clone(), self.item_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_labels() {
        assert_eq!(Intent::from_label("COMPRAR"), Intent::Buy);
        assert_eq!(Intent::from_label("en compra"), Intent::Buy);
        assert_eq!(Intent::from_label("VENDER"), Intent::Sell);
        assert_eq!(Intent::from_label("EN VENTA"), Intent::Sell);
        assert_eq!(Intent::from_label("OBSERVANDO"), Intent::Watching);
        assert_eq!(Intent::from_label("whatever"), Intent::Watching);
    }

    #[test]
    fn test_intent_serde_accepts_free_labels() {
        let intent: Intent = serde_json::from_str("\"EN VENTA\"").unwrap();
        assert_eq!(intent, Intent::Sell);
        assert_eq!(serde_json::to_string(&Intent::Buy).unwrap(), "\"COMPRAR\"");
    }

    #[test]
    fn test_currency_defaults_to_pesos() {
        assert_eq!(Currency::from_code("usd"), Currency::Usd);
        assert_eq!(Currency::from_code("ARS"), Currency::Ars);
        assert_eq!(Currency::from_code("EUR"), Currency::Ars);
        assert_eq!(Currency::Usd.symbol(), "US$");
        assert_eq!(Currency::Ars.symbol(), "$");
    }

    #[test]
    fn test_order_deserializes_without_optionals() {
        let json = r#"{
            "details": {
                "intent": "COMPRAR",
                "artist": "Soda Stereo",
                "album": "Signos",
                "format": "Vinyl",
                "condition": "VG+"
            }
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.item_type, ItemType::Release);
        assert!(order.item_id.is_none());
        let details = order.details.unwrap();
        assert_eq!(details.currency, Currency::Ars);
        assert!(details.price.is_none());
    }

    #[test]
    fn test_display_name_fallback() {
        let mut user = ProviderUser {
            uid: "u1".to_string(),
            email: Some("charly@example.com".to_string()),
            display_name: None,
            photo_url: None,
            id_token: None,
        };
        assert_eq!(user.derived_display_name().as_deref(), Some("charly"));

        user.display_name = Some("  ".to_string());
        assert_eq!(user.derived_display_name().as_deref(), Some("charly"));

        user.display_name = Some("Charly García".to_string());
        assert_eq!(user.derived_display_name().as_deref(), Some("Charly García"));

        user.display_name = None;
        user.email = None;
        assert!(user.derived_display_name().is_none());
    }

    #[test]
    fn test_shelf_parsing() {
        assert_eq!("Collection".parse::<Shelf>().unwrap(), Shelf::Collection);
        assert_eq!(" deseados ".parse::<Shelf>().unwrap(), Shelf::Wantlist);
        assert!(matches!("cart".parse::<Shelf>(), Err(GoldieError::Parse(_))));
    }

    #[test]
    fn test_item_type_parsing() {
        assert_eq!("MASTER".parse::<ItemType>().unwrap(), ItemType::Master);
        assert_eq!("release".parse::<ItemType>().unwrap(), ItemType::Release);
        let err = "label".parse::<ItemType>().unwrap_err();
        assert!(err.to_string().contains("Valid values: release, master"));
    }
}
