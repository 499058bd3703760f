//! # Domain Layer
//!
//! Addresses, network identity, wire messages and the seen-order cache.
//! Nothing here performs I/O except the frame helpers in [`messages`], which
//! are generic over `AsyncRead`/`AsyncWrite`.

pub mod address;
pub mod config;
pub mod identity;
pub mod messages;
pub mod seen_cache;
