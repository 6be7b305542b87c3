#![allow(async_fn_in_trait)]
pub mod catalog;
pub mod client;
pub mod config;
pub mod download;
pub mod download_plan;
pub mod error;
pub mod extensions;
pub mod search;
pub mod selection;
pub mod transport;
pub mod walkthrough;
pub mod workdir;

pub use client::CatalogClient;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use search::{ItemCursor, SearchFilter};
