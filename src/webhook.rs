// ABOUTME: Webhook request verification and account extraction
// ABOUTME: HMAC-SHA256 signature check, challenge echo, and dispatch of accounts

use crate::{dispatch::Dispatcher, model::WebhookPayload, AccountId, Error, Result};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::info;

const BLOCK_SIZE: usize = 64;

fn hmac_sha256(key: &[u8], message: &[u8]) -> [u8; 32] {
    let mut k_padded = [0u8; BLOCK_SIZE];
    if key.len() <= BLOCK_SIZE {
        k_padded[..key.len()].copy_from_slice(key);
    } else {
        let hash = Sha256::digest(key);
        k_padded[..32].copy_from_slice(&hash);
    }

    let mut inner_pad = [0x36u8; BLOCK_SIZE];
    let mut outer_pad = [0x5cu8; BLOCK_SIZE];
    for i in 0..BLOCK_SIZE {
        inner_pad[i] ^= k_padded[i];
        outer_pad[i] ^= k_padded[i];
    }

    let mut inner = Sha256::new();
    inner.update(inner_pad);
    inner.update(message);
    let inner_hash = inner.finalize();

    let mut outer = Sha256::new();
    outer.update(outer_pad);
    outer.update(inner_hash);

    outer.finalize().into()
}

/// Hex HMAC-SHA256 of `body` keyed by the app secret.
pub fn sign(app_secret: &str, body: &[u8]) -> String {
    hex::encode(hmac_sha256(app_secret.as_bytes(), body))
}

/// Checks the `X-Dropbox-Signature` header value against the raw body.
pub fn verify_signature(app_secret: &str, body: &[u8], signature: &str) -> Result<()> {
    let provided = hex::decode(signature.trim()).map_err(|_| Error::Signature)?;
    let expected = hmac_sha256(app_secret.as_bytes(), body);
    if bool::from(provided.as_slice().ct_eq(&expected[..])) {
        Ok(())
    } else {
        Err(Error::Signature)
    }
}

pub fn parse_notification(body: &[u8]) -> Result<Vec<AccountId>> {
    let payload: WebhookPayload =
        serde_json::from_slice(body).map_err(|e| Error::Webhook(e.to_string()))?;

    payload
        .list_folder
        .accounts
        .into_iter()
        .map(|id| AccountId::new(id).map_err(|_| Error::Webhook("empty account id".into())))
        .collect()
}

/// Response body for the GET verification handshake.
pub fn challenge_response(challenge: &str) -> String {
    challenge.to_string()
}

/// Verifies and parses a notification, then triggers a sync per account.
pub fn handle_webhook(
    dispatcher: &Dispatcher,
    app_secret: &str,
    body: &[u8],
    signature: &str,
) -> Result<usize> {
    verify_signature(app_secret, body, signature)?;
    let accounts = parse_notification(body)?;
    info!(accounts = accounts.len(), "webhook accepted");

    let count = accounts.len();
    for account in accounts {
        dispatcher.notify(account);
    }
    Ok(count)
}
