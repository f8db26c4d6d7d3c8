//! Shared fixtures for unit tests.

use std::sync::{Arc, LazyLock};

use crate::auth::jwt::TokenCodec;

pub const PRIVATE_PEM: &[u8] = include_bytes!("../testdata/private.pem");
pub const PUBLIC_PEM: &[u8] = include_bytes!("../testdata/public.pem");
pub const OTHER_PRIVATE_PEM: &[u8] = include_bytes!("../testdata/other_private.pem");
pub const OTHER_PUBLIC_PEM: &[u8] = include_bytes!("../testdata/other_public.pem");

static CODEC: LazyLock<Arc<TokenCodec>> = LazyLock::new(|| {
    Arc::new(TokenCodec::from_rsa_pem(PRIVATE_PEM, PUBLIC_PEM).expect("fixture key pair"))
});

/// Codec over the checked-in fixture key pair.
pub fn codec() -> Arc<TokenCodec> {
    Arc::clone(&CODEC)
}
