mod serializer;
mod token;

pub use serializer::{DatapointSerializer, DEFAULT_TIMES_MULTIPLIER};
pub use token::{resolve_token, TokenSource, TOKEN_ENV_VAR};
