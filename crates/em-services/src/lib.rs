//! # em-services
//!
//! The algorithmic core of Embers: the expiration/renewal policy, the room
//! admission controller, the anonymous identity generator, the post
//! lifecycle service, and the background cleanup scheduler. Everything here
//! talks to the durable store through the `em-core` ports only.

pub mod expiry;
pub mod identity;
pub mod posts;
pub mod rooms;
pub mod sweeper;
