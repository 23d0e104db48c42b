//! # Verso
//!
//! API version negotiation and response adaptation for Rust HTTP services.
//!
//! Handlers are written once, against the current schema. Verso negotiates the
//! version each client asked for, strips `/v1`-style segments before routing,
//! rewrites the response into the negotiated version's shape and announces
//! deprecation and sunset through `X-API-*` headers.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use verso_rs::prelude::*;
//!
//! async fn announcements(_req: Request) -> Envelope {
//!     Envelope::success(serde_json::json!([{"id": "1", "title": "Welcome"}]), "ok")
//! }
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     init_tracing(DEFAULT_FILTER);
//!
//!     let registry = Arc::new(
//!         VersionRegistry::new()
//!             .with_version(ApiVersion::major(1), true, false)?
//!             .with_version(ApiVersion::major(2), false, true)?,
//!     );
//!
//!     App::new()
//!         .layer(VersioningLayer::new(registry))
//!         .route("/api/announcements", get(announcements))
//!         .run("127.0.0.1:8080")
//!         .await
//! }
//! ```
//!
//! ## Optional Features
//!
//! - `config` (default) - `VersioningConfig::from_env` reading `VERSO_VERSIONING_*`
//! - `test-utils` - in-memory `TestClient`

mod logging;

// Re-export the host engine
pub use verso_core::*;

// Re-export the versioning layer
pub use verso_versioning as versioning;
pub use verso_versioning::{
    check_version_range, deprecated, experimental, system_clock, version_error_response,
    version_info, version_range, Adapter, AdapterChain, ApiVersion, Clock, DeprecationNotice,
    Envelope, ErrorDetail, ExperimentalRoute, ExplicitVersion, FixedClock, NegotiatedVersion,
    OriginalPath, Pagination, RegistrySnapshot, RequestPhase, RequestSignals, RequestVersionExt,
    RouteAdapters, RouteVersionSpec, SharedClock, SystemClock, VersionDetails, VersionError,
    VersionExtractor, VersionInfo, VersionRange, VersionRegistry, VersionResult, VersionSource,
    VersionStrategy, VersionedRouter, VersioningConfig, VersioningLayer,
};

pub use logging::{init_tracing, DEFAULT_FILTER};

// Crates that appear in public signatures
pub use chrono;
pub use serde_json;
pub use tokio;

/// Prelude module - import everything you need with `use verso_rs::prelude::*`
pub mod prelude {
    // Host engine
    pub use verso_core::{
        delete, get, patch, post, put, ApiError, App, IntoResponse, Json, Request, Response,
        Result, Router, TracingLayer,
    };

    // Versioning
    pub use verso_versioning::{
        deprecated, experimental, version_range, AdapterChain, ApiVersion, DeprecationNotice,
        Envelope, ErrorDetail, NegotiatedVersion, Pagination, RequestVersionExt,
        RouteVersionSpec, VersionError, VersionRange, VersionRegistry, VersionStrategy,
        VersionedRouter, VersioningConfig, VersioningLayer,
    };

    pub use crate::logging::{init_tracing, DEFAULT_FILTER};

    // Re-export commonly used external types
    pub use serde::{Deserialize, Serialize};
    pub use tracing::{debug, error, info, trace, warn};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn prelude_imports_work() {
        let _: fn() -> Result<()> = || Ok(());
        let _ = ApiVersion::major(1);
    }
}
