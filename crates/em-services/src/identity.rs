//! # Anonymous Identity Generator
//!
//! Derives the pseudonym pair shown in place of a user inside a room. The
//! join timestamp is part of the hash input, so this is a display pseudonym
//! that rotates on every join, not a stable per-room identity.

use em_core::models::AnonymousIdentity;
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Generates a fresh pseudonym pair for `user_id` inside `room_id`.
pub fn generate_anonymous_identity(user_id: Uuid, room_id: Uuid) -> AnonymousIdentity {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = rand::thread_rng().gen_range(1000..=9999);
    identity_at(user_id, room_id, millis, suffix)
}

/// Deterministic inner derivation: first 10 hex characters of
/// SHA-256(user || room || millis), plus "Anonymous-<suffix>".
fn identity_at(user_id: Uuid, room_id: Uuid, millis: i64, suffix: u32) -> AnonymousIdentity {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update(room_id.as_bytes());
    hasher.update(millis.to_be_bytes());
    let hash = hex::encode(hasher.finalize());

    AnonymousIdentity {
        anonymous_id: hash[..10].to_string(),
        anonymous_name: format!("Anonymous-{suffix}"),
    }
}
