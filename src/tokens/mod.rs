//! OAuth tokens and their on-disk cache.

mod model;
mod store;

pub(crate) use model::unix_now;
pub use model::{OAuth1Token, OAuth2Token};
pub use store::{CachePolicy, TokenStore, TokenStoreError};
