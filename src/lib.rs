//! Video-hoster stream extraction and anime catalog normalization.
//!
//! [`ProviderFacade`] is the entry point: it wraps a [`MediaProvider`] with
//! per-family caches and resolves embed and redirect links to playable
//! streams through the [`hoster`] registry.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod facade;
pub mod hoster;
pub mod http;
pub mod markup;
pub mod models;
pub mod provider;
pub mod storage;

pub use error::{Error, Result};
pub use facade::ProviderFacade;
pub use hoster::Hoster;
pub use provider::MediaProvider;
