//! # ferrous-incant
//!
//! Function composition by dependency resolution: register rules that map a
//! parameter description to a factory, then compose any callable into one
//! that fills its parameters automatically.
//!
//! ## Features
//!
//! - **Rule precedence**: rules registered later override earlier ones
//! - **Recursive resolution**: factories have their own parameters resolved the same way
//! - **Shared dependencies**: a factory reached twice runs once per call
//! - **Scoped resources**: entered in dependency order, released in reverse on every exit path
//! - **Sync and async**: async anywhere in the graph makes the composition async
//! - **Cached compositions**: composing twice against the same rules returns the same callable
//! - **Circular dependency detection**: reported with the full path at compose time
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_incant::{Incanter, Callable, CallArgs, Supply, ValueExt};
//!
//! let mut incanter = Incanter::new();
//!
//! // Parameters called `base_url` get a constant.
//! incanter.register_by_name("base_url", Supply::value("https://example.org".to_string()));
//!
//! // Parameters called `endpoint` are produced from `base_url` and a
//! // caller-supplied `path`.
//! incanter.register_by_name(
//!     "endpoint",
//!     Callable::from_fn2("endpoint", ["base_url", "path"], |base: String, path: String| {
//!         format!("{}/{}", base, path)
//!     }),
//! );
//!
//! let fetch = Callable::from_fn1("fetch", "endpoint", |endpoint: String| endpoint.len());
//!
//! // The composed callable only takes what no rule could satisfy.
//! let composed = incanter.compose(&fetch).unwrap();
//! assert_eq!(composed.signature().params()[0].name(), "path");
//!
//! let out = composed.call(CallArgs::new().arg("users".to_string())).unwrap();
//! assert_eq!(out.get::<usize>().unwrap(), "https://example.org/users".len());
//! ```
//!
//! ## Scoped Resources
//!
//! ```rust
//! use ferrous_incant::{Incanter, Callable, CallArgs, Resource, Signature, ScopeKind};
//! use std::sync::{Arc, Mutex};
//!
//! let log = Arc::new(Mutex::new(Vec::new()));
//! let sink = log.clone();
//!
//! let connection = Callable::scoped("connection", Signature::new(), move |_| {
//!     sink.lock().unwrap().push("open");
//!     let sink = sink.clone();
//!     Ok(Resource::new(42u32, move |_exit| {
//!         sink.lock().unwrap().push("close");
//!         Ok(())
//!     }))
//! });
//!
//! let mut incanter = Incanter::new();
//! incanter.register_hook(|p| p.name() == "conn", connection, ScopeKind::Sync);
//!
//! let query = Callable::from_fn1("query", "conn", |conn: u32| conn + 1);
//! incanter.call(&query, CallArgs::new()).unwrap();
//! assert_eq!(*log.lock().unwrap(), vec!["open", "close"]);
//! ```
//!
//! ## Incant
//!
//! ```rust
//! use ferrous_incant::{Incanter, Available, Callable, ValueExt};
//!
//! let incanter = Incanter::new();
//! let handler = Callable::from_fn1("handler", "user", |user: String| user.to_uppercase());
//!
//! // Values the handler does not declare are dropped.
//! let available = Available::new()
//!     .with("user", "ada".to_string())
//!     .with("request_id", 7u64);
//! let out = incanter.incant(&handler, available).unwrap();
//! assert_eq!(out.get::<String>().unwrap(), "ADA");
//! ```

// Module declarations
pub mod callable;
#[cfg(feature = "async")]
pub mod cancellation;
pub mod config;
pub mod descriptors;
pub mod error;
pub mod incanter;
pub mod key;
pub mod kind;
pub mod observer;
pub mod registration;
pub mod traits;
pub mod value;

// Internal modules
mod cache;
mod composer;
mod internal;
mod resolver;

// Re-export core types
pub use callable::{Arguments, AsyncResource, BoxFuture, Callable, Resource};
#[cfg(feature = "async")]
pub use cancellation::CancellationToken;
pub use config::{IncanterConfig, IncanterConfigBuilder};
pub use descriptors::{CallArgs, Param, ParamKind, Signature};
pub use error::{BoxError, IncantError, IncantResult};
pub use incanter::{AdaptedCall, Available, ComposeOptions, Incanter, Shape};
pub use key::{type_key, CallableId, TypeKey};
pub use kind::{CallableKind, Exit, Flavor, ScopeKind};
pub use observer::{IncantObserver, LoggingObserver, MetricsObserver};
pub use registration::{FactoryOf, Hook, HookSet, Predicate, Rule, SnapshotId, Supply};
pub use traits::{AsyncDispose, Dispose};
pub use value::{value, Value, ValueExt};
