//! Outbound request model and per-request context resolution

pub mod endpoints;
pub mod headers;
pub mod resolver;
pub mod types;

pub use endpoints::EndpointPolicy;
pub use resolver::RequestContextResolver;
pub use types::{ApiRequest, DecoratedRequest, EffectiveIdentity, Method, RequestOptions};
