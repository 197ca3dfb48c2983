//! 传输层：Provider 调用抽象与 HTTP 实现
//!
//! The provider client seam. [`ProviderClient`] executes one prepared
//! [`ProviderRequest`] and returns the raw JSON response; the tracked
//! invocation in [`crate::client`] wraps exactly this call.
//!
//! [`HttpProviderClient`] covers the HTTP-native families. Framework kinds
//! (`langchain`, `langgraph`) run in-process, so callers plug in their own
//! implementation for them.

pub mod http;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::drivers::ProviderRequest;
use crate::Result;

pub use http::HttpProviderClient;

#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn invoke(&self, request: &ProviderRequest) -> Result<Value>;
}

#[async_trait]
impl<C: ProviderClient + ?Sized> ProviderClient for Arc<C> {
    async fn invoke(&self, request: &ProviderRequest) -> Result<Value> {
        (**self).invoke(request).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}
