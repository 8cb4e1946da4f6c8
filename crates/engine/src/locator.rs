//! Handler address resolution.
//!
//! The executor never hard-codes routes; it asks a [`HandlerLocator`] supplied
//! at construction time. [`StaticHandlerLocator`] serves a fixed table built
//! from configuration.

use indexmap::IndexMap;
use lambdachain_registry::{HandlerAddress, RuntimeConfig};
use thiserror::Error;
use url::Url;

/// Errors raised while resolving or building handler routes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocatorError {
    #[error("no address configured for handler '{handler}'")]
    UnknownHandler { handler: String },

    #[error("invalid address '{address}' for handler '{handler}': {reason}")]
    InvalidAddress {
        handler: String,
        address: String,
        reason: String,
    },
}

/// Maps a handler reference to the address it is dispatched to.
///
/// Resolution must be pure: the same reference yields the same address for
/// the lifetime of the locator.
pub trait HandlerLocator: Send + Sync {
    fn resolve(&self, handler: &str) -> Result<Url, LocatorError>;
}

/// Fixed routing table.
#[derive(Debug, Clone, Default)]
pub struct StaticHandlerLocator {
    routes: IndexMap<String, Url>,
}

impl StaticHandlerLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper adding a route.
    pub fn with_route(mut self, handler: impl Into<String>, address: Url) -> Self {
        self.routes.insert(handler.into(), address);
        self
    }

    /// Adds or replaces a route.
    pub fn insert(&mut self, handler: impl Into<String>, address: Url) {
        self.routes.insert(handler.into(), address);
    }

    /// Builds the table from the `handlers` section of `config`.
    ///
    /// Addresses may be a bare port (`8080`, local host), `host:port`, or an
    /// `http` URL. `${env:...}` placeholders must already be expanded.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self, LocatorError> {
        let mut locator = Self::new();
        for (handler, address) in &config.handlers {
            locator.insert(handler.clone(), parse_handler_address(handler, address)?);
        }
        Ok(locator)
    }

    /// Configured routes in declaration order.
    pub fn routes(&self) -> impl Iterator<Item = (&str, &Url)> {
        self.routes.iter().map(|(handler, url)| (handler.as_str(), url))
    }
}

impl HandlerLocator for StaticHandlerLocator {
    fn resolve(&self, handler: &str) -> Result<Url, LocatorError> {
        self.routes.get(handler).cloned().ok_or_else(|| LocatorError::UnknownHandler {
            handler: handler.to_string(),
        })
    }
}

/// Normalizes one configured address into a URL.
///
/// The HTTP client is built without TLS, so `https` routes are refused here
/// rather than failing at connect time.
pub fn parse_handler_address(handler: &str, address: &HandlerAddress) -> Result<Url, LocatorError> {
    let invalid = |reason: String| LocatorError::InvalidAddress {
        handler: handler.to_string(),
        address: address.raw(),
        reason,
    };

    let candidate = match address {
        HandlerAddress::Port(port) => format!("http://localhost:{port}"),
        HandlerAddress::Address(raw) => {
            let raw = raw.trim();
            if raw.is_empty() {
                return Err(invalid("address is empty".to_string()));
            }
            if raw.contains("://") {
                raw.to_string()
            } else if let Ok(port) = raw.parse::<u16>() {
                format!("http://localhost:{port}")
            } else {
                format!("http://{raw}")
            }
        }
    };

    let url = Url::parse(&candidate).map_err(|error| invalid(error.to_string()))?;
    match url.scheme() {
        "http" => {}
        "https" => return Err(invalid("https is not supported; handlers are reached over plain http".to_string())),
        other => return Err(invalid(format!("unsupported scheme '{other}'"))),
    }
    if url.host_str().is_none() {
        return Err(invalid("address has no host".to_string()));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(handlers: &[(&str, HandlerAddress)]) -> RuntimeConfig {
        RuntimeConfig {
            handlers: handlers.iter().map(|(name, address)| (name.to_string(), address.clone())).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn normalizes_configured_address_forms() {
        let locator = StaticHandlerLocator::from_config(&config(&[
            ("user_create", HandlerAddress::Port(8080)),
            ("user_read", HandlerAddress::Address("localhost:8081".into())),
            ("user_update", HandlerAddress::Address("8082".into())),
            ("user_delete", HandlerAddress::Address("http://users.internal/delete".into())),
        ]))
        .unwrap();

        assert_eq!(locator.resolve("user_create").unwrap().as_str(), "http://localhost:8080/");
        assert_eq!(locator.resolve("user_read").unwrap().as_str(), "http://localhost:8081/");
        assert_eq!(locator.resolve("user_update").unwrap().as_str(), "http://localhost:8082/");
        assert_eq!(locator.resolve("user_delete").unwrap().as_str(), "http://users.internal/delete");
        let names: Vec<_> = locator.routes().map(|(name, _)| name).collect();
        assert_eq!(names, ["user_create", "user_read", "user_update", "user_delete"]);
    }

    #[test]
    fn unknown_handler_is_reported() {
        let locator = StaticHandlerLocator::new();
        assert_eq!(
            locator.resolve("missing"),
            Err(LocatorError::UnknownHandler {
                handler: "missing".into()
            })
        );
    }

    #[test]
    fn rejects_unusable_addresses() {
        for address in ["", "ftp://files.internal", "http://"] {
            let result = parse_handler_address("h", &HandlerAddress::Address(address.into()));
            assert!(matches!(result, Err(LocatorError::InvalidAddress { .. })), "{address}");
        }
    }

    #[test]
    fn https_routes_are_refused_up_front() {
        let result = StaticHandlerLocator::from_config(&config(&[
            ("user_read", HandlerAddress::Port(8081)),
            ("user_delete", HandlerAddress::Address("https://users.internal/delete".into())),
        ]));
        let Err(LocatorError::InvalidAddress { handler, reason, .. }) = result else {
            panic!("expected https route to be rejected");
        };
        assert_eq!(handler, "user_delete");
        assert!(reason.contains("https"), "{reason}");
    }

    #[test]
    fn resolution_is_stable() {
        let url = Url::parse("http://localhost:9000").unwrap();
        let locator = StaticHandlerLocator::new().with_route("echo", url.clone());
        assert_eq!(locator.resolve("echo").unwrap(), url);
        assert_eq!(locator.resolve("echo").unwrap(), url);
    }
}
