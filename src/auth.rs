// ABOUTME: App secret discovery with precedence chain
// ABOUTME: CLI flag → MARKBOX_APP_SECRET → APP_SECRET

use crate::{Error, Result};
use std::env;

const ENV_VARS: [&str; 2] = ["MARKBOX_APP_SECRET", "APP_SECRET"];

pub fn resolve_app_secret(cli_secret: Option<String>) -> Result<String> {
    resolve_with(cli_secret, |name| env::var(name).ok())
}

fn resolve_with(
    cli_secret: Option<String>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String> {
    // 1. CLI flag
    if let Some(secret) = cli_secret.filter(|s| !s.is_empty()) {
        return Ok(secret);
    }

    // 2. Environment, most specific first
    for name in ENV_VARS {
        if let Some(secret) = lookup(name).filter(|s| !s.is_empty()) {
            return Ok(secret);
        }
    }

    Err(Error::Config(
        "No app secret found. Provide via --app-secret, MARKBOX_APP_SECRET, or APP_SECRET".into(),
    ))
}
