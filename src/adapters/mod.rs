//! Adapters
//!
//! Inbound adapters feed samples in; outbound adapters reach the SignalFx
//! API and the user's browser.

pub mod inbound;
pub mod outbound;
