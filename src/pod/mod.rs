//! HTTP client to the user's linked-data pod (§4.5).

mod client;
mod turtle;

pub use client::PodClient;
