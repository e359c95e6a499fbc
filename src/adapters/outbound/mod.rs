mod signalfx_session;
mod system_browser;

pub use signalfx_session::{Payload, SessionConfig, SignalfxSession, TOKEN_HEADER};
pub use system_browser::SystemBrowser;
