//! REST backend access: transport, authenticated client, wire DTOs and the
//! per-resource services built on them.

pub mod auth;
pub mod client;
pub mod dto;
pub mod services;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::TokenStore;
pub use client::ApiClient;
pub use services::{RemoteServices, Resource};
pub use transport::{
    ApiRequest, ApiResponse, FileAttachment, FormPart, HttpTransport, Method, ReqwestTransport, RequestBody,
};
