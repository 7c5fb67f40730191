//! Tower integration.
//!
//! [`Dispatcher`] implements `tower::Service<Request>`, so transports can
//! stack ordinary tower layers (timeouts, concurrency limits, tracing) on top
//! of it. Dispatch is synchronous; the returned future is always ready.
//!
//! # Example
//!
//! ```rust,ignore
//! use tower::{ServiceBuilder, ServiceExt};
//!
//! let service = ServiceBuilder::new()
//!     .concurrency_limit(64)
//!     .service(dispatcher);
//!
//! let payload = service.oneshot(request).await?;
//! ```

use std::future::{Ready, ready};
use std::task::{Context, Poll};

use serde_json::Value;
use tower::Service;

use crate::dispatcher::Dispatcher;
use objgate_core::{DispatchError, Request};

impl Service<Request> for Dispatcher {
    type Response = Value;
    type Error = DispatchError;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        ready(self.dispatch(&request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constructor::Root;
    use crate::object::Namespace;
    use objgate_core::{AttributeSpec, ErrorKind};
    use serde_json::json;
    use tower::ServiceExt;

    fn dispatcher() -> Dispatcher {
        Dispatcher::builder()
            .root(Root::constant(Namespace::new("Root").value("answer", 42)))
            .permissions(&AttributeSpec::list(["answer"]))
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_service_oneshot() {
        let request = Request::new().route_arg("attr", "answer");
        let payload = tokio_test::block_on(dispatcher().oneshot(request)).unwrap();
        assert_eq!(payload, json!(42));
    }

    #[test]
    fn test_service_error() {
        let request = Request::new().route_arg("attr", "question");
        let err = tokio_test::block_on(dispatcher().oneshot(request)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ForbiddenAttribute);
    }

    #[test]
    fn test_service_is_always_ready() {
        let mut service = dispatcher();
        let mut task = tokio_test::task::spawn(());
        task.enter(|cx, _| {
            assert!(matches!(service.poll_ready(cx), Poll::Ready(Ok(()))));
        });
    }
}
