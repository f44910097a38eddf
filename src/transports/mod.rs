//! HTTP transports the paying client sends requests through.

#[cfg(feature = "reqwest-transport")]
mod reqwest_transport;

#[cfg(feature = "reqwest-transport")]
pub use reqwest_transport::ReqwestTransport;

use bytes::Bytes;

/// Sends one buffered HTTP request and returns the buffered response.
///
/// Implementations must not follow payment challenges themselves; a 402 is
/// returned like any other status.
pub trait HttpTransport: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn send(
        &self,
        request: http::Request<Bytes>,
    ) -> impl Future<Output = Result<http::Response<Bytes>, Self::Error>> + Send;
}
