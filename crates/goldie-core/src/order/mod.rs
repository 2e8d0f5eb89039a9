//! ============================================================================
//! Order Module - WhatsApp order handoff
//! ============================================================================
//! Turns an `Order` into the human-readable message sent to the shop and the
//! `wa.me` link that carries it. Everything here is pure string building.
//! ============================================================================

mod format;
mod message;

pub use format::format_amount;
pub use message::{
    build_order_message, build_whatsapp_link, catalog_deep_link, decode_whatsapp_text,
    OrderMessenger, DEFAULT_CATALOG_SITE, DEFAULT_WHATSAPP_PHONE, WHATSAPP_BASE,
};
