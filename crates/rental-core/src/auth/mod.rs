//! Bearer-token lifecycle: persistence and payload decoding.

pub mod store;
pub mod token;

pub use store::{CredentialPair, FileStorage, MemoryStorage, Storage, TokenStore};
pub use token::{TokenPayload, decode, is_expired, mask_token};
