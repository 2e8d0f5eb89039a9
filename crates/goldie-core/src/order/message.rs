use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::debug;

use super::format::format_amount;
use crate::error::{GoldieError, Result};
use crate::types::{Intent, Order};

/// WhatsApp click-to-chat base
pub const WHATSAPP_BASE: &str = "https://wa.me";

/// Shop's WhatsApp number
pub const DEFAULT_WHATSAPP_PHONE: &str = "5492974188914";

/// Where catalog deep links point
pub const DEFAULT_CATALOG_SITE: &str = "https://www.discogs.com";

const GREETING: &str = "Hola Oldie But Goldie!";
const MISSING: &str = "N/A";

/// Same set as JavaScript's encodeURIComponent leaves alone
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// The phrasing is reversed on purpose: a stored "wants to buy" intent is
/// answered from the seller's side and vice versa.
fn action_phrase(intent: Intent) -> &'static str {
    match intent {
        Intent::Buy => "Quiero vender",
        Intent::Sell => "Quiero comprar",
        Intent::Watching => "Me interesa este disco",
    }
}

fn or_missing(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        MISSING
    } else {
        trimmed
    }
}

/// Link back to the catalog item, only when the order references one
pub fn catalog_deep_link(order: &Order, catalog_site: &str) -> Option<String> {
    let item_id = order.item_id.as_deref().map(str::trim).filter(|id| !id.is_empty())?;
    Some(format!(
        "{}/{}/{}",
        catalog_site.trim_end_matches('/'),
        order.item_type.as_str(),
        item_id
    ))
}

/// Render the order as the message text sent to the shop.
///
/// Lines, in order: greeting, action, deep link (optional), order number
/// (optional), format/condition, price (optional; the admin offer wins over
/// the user's price).
pub fn build_order_message(order: &Order, catalog_site: &str) -> Result<String> {
    let details = order
        .details
        .as_ref()
        .ok_or_else(|| GoldieError::InvalidOrder("order has no details".to_string()))?;

    let mut lines = vec![
        GREETING.to_string(),
        format!(
            "{}: {} - {}.",
            action_phrase(details.intent),
            or_missing(&details.artist),
            or_missing(&details.album)
        ),
    ];

    if let Some(link) = catalog_deep_link(order, catalog_site) {
        lines.push(format!("Link: {}", link));
    }

    if let Some(number) = order.order_number.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        lines.push(format!("Mi número de orden es {}.", number));
    }

    lines.push(format!(
        "Formato: {} | Estado: {}.",
        or_missing(&details.format),
        or_missing(&details.condition)
    ));

    // A zero amount counts as no price
    let admin_offer = order.admin_offer_price.filter(|p| !p.is_zero());
    let user_price = details.price.filter(|p| !p.is_zero());

    if let Some(offer) = admin_offer {
        lines.push(format!(
            "Cotización Admin: {} {}",
            order.admin_offer_currency.symbol(),
            format_amount(offer)
        ));
    } else if let Some(price) = user_price {
        lines.push(format!(
            "Precio: {} {}",
            details.currency.symbol(),
            format_amount(price)
        ));
    }

    Ok(lines.join("\n"))
}

/// Build the `wa.me` URI carrying the rendered message
pub fn build_whatsapp_link(order: &Order, phone: &str, catalog_site: &str) -> Result<String> {
    let message = build_order_message(order, catalog_site)?;
    let encoded = utf8_percent_encode(&message, URI_COMPONENT).to_string();
    debug!("Built WhatsApp link ({} chars encoded)", encoded.len());
    Ok(format!("{}/{}?text={}", WHATSAPP_BASE, phone, encoded))
}

/// Recover the message text from a `wa.me` URI
pub fn decode_whatsapp_text(uri: &str) -> Result<String> {
    let parsed =
        url::Url::parse(uri).map_err(|e| GoldieError::Parse(format!("Invalid URI: {}", e)))?;
    let raw = parsed
        .query()
        .unwrap_or_default()
        .split('&')
        .find_map(|pair| pair.strip_prefix("text="))
        .ok_or_else(|| GoldieError::Parse("No text parameter in URI".to_string()))?;

    percent_decode_str(raw)
        .decode_utf8()
        .map(|text| text.into_owned())
        .map_err(|e| GoldieError::Parse(format!("Text is not UTF-8: {}", e)))
}

/// Message builder bound to a shop phone number and catalog site
#[derive(Debug, Clone)]
pub struct OrderMessenger {
    phone: String,
    catalog_site: String,
}

impl Default for OrderMessenger {
    fn default() -> Self {
        Self::new(DEFAULT_WHATSAPP_PHONE.to_string(), DEFAULT_CATALOG_SITE.to_string())
    }
}

impl OrderMessenger {
    pub fn new(phone: String, catalog_site: String) -> Self {
        Self { phone, catalog_site }
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn message(&self, order: &Order) -> Result<String> {
        build_order_message(order, &self.catalog_site)
    }

    pub fn deep_link(&self, order: &Order) -> Option<String> {
        catalog_deep_link(order, &self.catalog_site)
    }

    pub fn whatsapp_link(&self, order: &Order) -> Result<String> {
        build_whatsapp_link(order, &self.phone, &self.catalog_site)
    }
}
