//! State token, PKCE and nonce generation

use sha2::{Digest, Sha256};

use crate::utils::{UtilError, base64url_encode, gen_random_hex, gen_random_string};

const STATE_TOKEN_BYTES: usize = 32;
const CODE_VERIFIER_BYTES: usize = 32;
const NONCE_BYTES: usize = 16;

pub const CODE_CHALLENGE_METHOD: &str = "S256";

/// 256-bit hex state token.
pub fn generate_state_token() -> Result<String, UtilError> {
    gen_random_hex(STATE_TOKEN_BYTES)
}

/// 43-character base64url PKCE verifier.
pub fn generate_code_verifier() -> Result<String, UtilError> {
    gen_random_string(CODE_VERIFIER_BYTES)
}

pub fn generate_nonce() -> Result<String, UtilError> {
    gen_random_hex(NONCE_BYTES)
}

/// `base64url(sha256(verifier))`, the S256 challenge of RFC 7636.
pub fn code_challenge_s256(code_verifier: &str) -> String {
    base64url_encode(&Sha256::digest(code_verifier.as_bytes()))
}
