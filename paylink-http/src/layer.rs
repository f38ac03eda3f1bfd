//! Tower middleware that scopes the payer wallet to each request.
//!
//! [`WalletLayer`] reads the payer's wallet connection string from a request
//! header and runs the rest of the stack inside
//! [`paylink::context::with_wallet`]. Handlers further down, including any
//! [`PaymentGate`](paylink::PaymentGate), see the wallet through
//! [`paylink::context::get`]; it is gone once the response future completes or
//! is dropped.
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/tools/call", post(call_tool))
//!     .layer(WalletLayer::new());
//! ```

use std::task::{Context, Poll};

use http::header::HeaderName;
use http::{HeaderMap, Request};
use paylink::WalletId;
use paylink::context::{self, WalletScope};
use tower::{Layer, Service};

use crate::constants::DEFAULT_WALLET_HEADER;

/// Layer producing [`WalletService`].
#[derive(Debug, Clone)]
pub struct WalletLayer {
    header: HeaderName,
}

impl Default for WalletLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl WalletLayer {
    /// Reads the wallet from the `wallet_connection_string` header.
    #[must_use]
    pub fn new() -> Self {
        Self::with_header(HeaderName::from_static(DEFAULT_WALLET_HEADER))
    }

    /// Reads the wallet from `header`.
    #[must_use]
    pub const fn with_header(header: HeaderName) -> Self {
        Self { header }
    }

    /// Name of the header the wallet is read from.
    #[must_use]
    pub const fn header(&self) -> &HeaderName {
        &self.header
    }
}

impl<S> Layer<S> for WalletLayer {
    type Service = WalletService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        WalletService {
            inner,
            header: self.header.clone(),
        }
    }
}

/// Service that runs each request inside its own wallet scope.
#[derive(Debug, Clone)]
pub struct WalletService<S> {
    inner: S,
    header: HeaderName,
}

impl<S, B> Service<Request<B>> for WalletService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = WalletScope<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let wallet = extract_wallet(req.headers(), &self.header);

        #[cfg(feature = "telemetry")]
        {
            if let Some(wallet) = &wallet {
                tracing::debug!(header = %self.header, wallet = %wallet.redacted(), "Payer wallet found");
            } else {
                tracing::trace!(header = %self.header, "No payer wallet on request");
            }
        }

        context::with_wallet(wallet, self.inner.call(req))
    }
}

/// Reads a wallet identifier from `headers`.
///
/// Empty, whitespace-only and non-UTF-8 values count as absent. Any other
/// value is forwarded unchanged.
#[must_use]
pub fn extract_wallet(headers: &HeaderMap, name: &HeaderName) -> Option<WalletId> {
    let value = headers.get(name)?.to_str().ok()?;
    WalletId::non_empty(value)
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use http::HeaderValue;
    use tower::ServiceExt;

    use super::*;

    fn echo_wallet()
    -> impl Service<Request<()>, Response = Option<WalletId>, Error = Infallible> + Clone {
        tower::service_fn(|_req: Request<()>| async { Ok::<_, Infallible>(context::get()) })
    }

    fn request(header: &str, value: &[u8]) -> Request<()> {
        let mut req = Request::new(());
        req.headers_mut().insert(
            HeaderName::from_bytes(header.as_bytes()).unwrap(),
            HeaderValue::from_bytes(value).unwrap(),
        );
        req
    }

    #[tokio::test]
    async fn header_value_is_visible_to_the_inner_service() {
        let svc = WalletLayer::new().layer(echo_wallet());
        let seen = svc
            .oneshot(request("wallet_connection_string", b"w1"))
            .await
            .unwrap();
        assert_eq!(seen, Some(WalletId::new("w1")));
        assert_eq!(context::get(), None);
    }

    #[tokio::test]
    async fn header_name_is_case_insensitive() {
        let svc = WalletLayer::new().layer(echo_wallet());
        let seen = svc
            .oneshot(request("WALLET_CONNECTION_STRING", b"w2"))
            .await
            .unwrap();
        assert_eq!(seen, Some(WalletId::new("w2")));
    }

    #[tokio::test]
    async fn missing_or_blank_header_yields_no_wallet() {
        let svc = WalletLayer::new().layer(echo_wallet());
        assert_eq!(svc.clone().oneshot(Request::new(())).await.unwrap(), None);
        assert_eq!(
            svc.oneshot(request("wallet_connection_string", b"  "))
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn custom_header_is_honoured() {
        let layer = WalletLayer::with_header(HeaderName::from_static("x-payer"));
        let svc = layer.layer(echo_wallet());
        let seen = svc.oneshot(request("x-payer", b"w3")).await.unwrap();
        assert_eq!(seen, Some(WalletId::new("w3")));
    }

    #[test]
    fn wallet_value_is_forwarded_verbatim() {
        let name = HeaderName::from_static(DEFAULT_WALLET_HEADER);
        let mut headers = HeaderMap::new();
        headers.insert(name.clone(), HeaderValue::from_static(" w1 "));
        assert_eq!(extract_wallet(&headers, &name), Some(WalletId::new(" w1 ")));
    }

    #[test]
    fn non_utf8_values_are_ignored() {
        let name = HeaderName::from_static(DEFAULT_WALLET_HEADER);
        let mut headers = HeaderMap::new();
        headers.insert(name.clone(), HeaderValue::from_bytes(&[0xfa, 0xfb]).unwrap());
        assert_eq!(extract_wallet(&headers, &name), None);
    }

    #[tokio::test]
    async fn concurrent_requests_do_not_share_wallets() {
        let svc = WalletLayer::new().layer(tower::service_fn(|_req: Request<()>| async {
            tokio::task::yield_now().await;
            Ok::<_, Infallible>(context::get())
        }));

        let (a, b) = tokio::join!(
            svc.clone().oneshot(request("wallet_connection_string", b"alice")),
            svc.clone().oneshot(request("wallet_connection_string", b"bob")),
        );
        assert_eq!(a.unwrap(), Some(WalletId::new("alice")));
        assert_eq!(b.unwrap(), Some(WalletId::new("bob")));
    }
}
