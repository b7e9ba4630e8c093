//! Transport wrapper around reqwest

mod client;

pub use client::{HttpClient, HttpClientBuilder};
