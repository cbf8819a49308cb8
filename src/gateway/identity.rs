//! Client identity resolution via a signed session cookie.
//!
//! The identity is resolved (or minted) before the relay runs and handed to it
//! as an explicit parameter; nothing downstream reads ambient session state.

use axum_extra::extract::cookie::{Cookie, Key, SameSite};
use axum_extra::extract::SignedCookieJar;
use sha2::{Digest, Sha512};
use tracing::info;
use uuid::Uuid;

/// Cookie holding the opaque session identity.
pub const SESSION_COOKIE: &str = "charrelay_session";

/// Derive the cookie signing key from the configured secret, or generate a
/// fresh one. A restart with no secret invalidates old cookies, which only
/// costs clients their (already gone) in-memory transcripts.
pub fn signing_key(secret: Option<&str>) -> Key {
    match secret {
        Some(secret) => {
            // SHA-512 output is exactly the 64 bytes Key::from requires.
            let digest = Sha512::digest(secret.as_bytes());
            Key::from(digest.as_slice())
        }
        None => Key::generate(),
    }
}

/// Reuse the identity from the signed jar, or mint a new one and add its
/// cookie so the Set-Cookie header reaches the client.
pub fn resolve_identity(jar: SignedCookieJar) -> (SignedCookieJar, String) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return (jar, cookie.value().to_string());
    }

    let identity = Uuid::new_v4().to_string();
    info!(identity = %identity, "minted new session identity");
    let cookie = Cookie::build((SESSION_COOKIE.to_string(), identity.clone()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .build();
    (jar.add(cookie), identity)
}
