//! # Verso Versioning
//!
//! API version negotiation and response adaptation for Verso.
//!
//! One handler implementation serves every API version:
//!
//! - a [`VersionRegistry`] holds the known versions and their
//!   deprecation/sunset lifecycle
//! - a [`VersionExtractor`] negotiates the version from the URL path,
//!   `Accept` header, vendor content type, query parameter or a custom header
//! - an [`AdapterChain`] rewrites the current-schema payload into the shape
//!   the client negotiated
//! - [`VersioningLayer`] ties them together as middleware and adds the
//!   `X-API-*` response headers
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use verso_core::{get, App};
//! use verso_versioning::{ApiVersion, VersionRegistry, VersioningLayer};
//!
//! let registry = Arc::new(
//!     VersionRegistry::new()
//!         .with_version(ApiVersion::major(1), true, false)?
//!         .with_version(ApiVersion::major(2), false, true)?,
//! );
//!
//! App::new()
//!     .layer(VersioningLayer::new(registry))
//!     .route("/api/announcements", get(list_announcements))
//!     .run("127.0.0.1:8080")
//!     .await?;
//! ```

#![warn(missing_docs)]

pub mod adapter;
pub mod clock;
pub mod config;
pub mod decorators;
pub mod envelope;
mod error;
pub mod extractor;
pub mod headers;
pub mod introspection;
pub mod middleware;
pub mod registry;
pub mod router;
pub mod strategy;
pub mod version;

pub use adapter::{Adapter, AdapterChain};
pub use clock::{system_clock, Clock, FixedClock, SharedClock, SystemClock};
pub use config::VersioningConfig;
pub use decorators::{check_version_range, deprecated, experimental, version_range};
pub use envelope::{Envelope, ErrorDetail, Pagination};
pub use error::{VersionError, VersionResult};
pub use extractor::{NegotiatedVersion, VersionExtractor};
pub use headers::DeprecationNotice;
pub use introspection::{version_info, VersionDetails, VersionInfo};
pub use middleware::{
    version_error_response, ExperimentalRoute, ExplicitVersion, OriginalPath, RequestPhase,
    RequestVersionExt, RouteAdapters, VersioningLayer,
};
pub use registry::{RegistrySnapshot, VersionRegistry};
pub use router::{RouteVersionSpec, VersionedRouter};
pub use strategy::{RequestSignals, VersionSource, VersionStrategy};
pub use version::{ApiVersion, VersionRange};
