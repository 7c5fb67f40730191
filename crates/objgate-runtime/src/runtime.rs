//! A configured dispatcher together with its configuration.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use objgate_runtime::{GateBuilder, Gateway};
//!
//! let gateway = Gateway::builder()
//!     .config_file("objgate.toml")
//!     .root(Root::constructor(make_controller))
//!     .build()?;
//!
//! let response = gateway.respond(&request);
//! println!("{} {}", response.status, response.body);
//! ```

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::builder::GateBuilder;
use crate::config::GateConfig;
use objgate_core::{DispatchResult, Request};
use objgate_framework::Dispatcher;

/// A status code and JSON body ready for a transport to send.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    /// HTTP-style status code.
    pub status: u16,
    /// The payload, or the error payload.
    pub body: Value,
}

impl Response {
    /// Returns `true` for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A dispatcher assembled from configuration.
#[derive(Debug, Clone)]
pub struct Gateway {
    config: GateConfig,
    dispatcher: Dispatcher,
}

impl Gateway {
    /// Creates a gateway builder.
    pub fn builder() -> GateBuilder {
        GateBuilder::new()
    }

    pub(crate) fn new(config: GateConfig, dispatcher: Dispatcher) -> Self {
        Self { config, dispatcher }
    }

    /// Returns the loaded configuration.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Returns the dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Dispatches a request.
    pub fn dispatch(&self, request: &Request) -> DispatchResult<Value> {
        self.dispatcher.dispatch(request)
    }

    /// Dispatches a request and maps the outcome to a [`Response`].
    ///
    /// Server faults are reported with an opaque message; their detail is
    /// only logged by the dispatcher.
    pub fn respond(&self, request: &Request) -> Response {
        match self.dispatch(request) {
            Ok(body) => Response { status: 200, body },
            Err(err) => {
                let payload = err.payload();
                if !err.kind().is_client_fault() {
                    warn!(status = payload.status, "Responding with server error");
                }
                Response {
                    status: payload.status,
                    body: payload.to_value(),
                }
            }
        }
    }
}
