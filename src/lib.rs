#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # Driftscan
//!
//! > **A parallel cloud resource acquisition engine.**
//!
//! This crate lists the live resources of a cloud account and, on demand,
//! hydrates each of them into a fully attributed resource through a
//! provider RPC plugin. It is the acquisition half of a drift detector: the
//! output is a normalized set of [`resource::Resource`] values ready to be
//! compared against a desired state.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Two phases, one bound
//! A scan runs in two phases. **Enumeration** asks cheap listing APIs for
//! resource identities and produces stubs. **Details fetching** (deep mode)
//! reads each stub back through the provider plugin. Both phases fan out on a
//! [`parallel::ParallelRunner`] family sharing a single global concurrency
//! bound, so a scan never holds more in-flight calls than configured no
//! matter how many resource types it covers.
//!
//! ### Capabilities over clients
//! Enumerators depend on narrow repository traits, and hydrators on the
//! [`provider::ResourceReader`] capability, never on concrete SDK or RPC
//! clients. Everything is mockable; see [`provider::mock`].
//!
//! ### Failures are policy
//! An access-denied listing can abort a scan or become an alert, depending
//! on [`scanner::FailurePolicy`]. A resource that vanished between phases is
//! a soft miss, not an error.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Engine ([`parallel`], [`scanner`])
//! Bounded fan-out/fan-in with first-error-wins semantics, and the two-phase
//! orchestrator built on top of it.
//! - **Key items**: [`parallel::ParallelRunner`], [`scanner::Scanner`].
//!
//! ### 2. The Provider ([`provider`])
//! Drives the RPC plugin: one configured client per region alias, schema
//! cache, retried `ReadResource` calls.
//! - **Key items**: [`provider::ProviderDriver`], [`provider::ProviderClient`].
//!
//! ### 3. The Pipelines ([`remote`])
//! Per-resource-type listers and hydrators, registered in a
//! [`remote::RemoteLibrary`].
//! - **Key items**: [`remote::ResourceLister`], [`remote::GenericHydrator`].
//!
//! ### 4. The Model ([`resource`], [`alerter`], [`cache`])
//! The normalized resource representation, deserialization from raw plugin
//! state, alert collection and the repository read-through cache.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Run the tests with debug logs
//! RUST_LOG=driftscan=debug cargo test
//! ```

pub mod alerter;
pub mod cache;
pub mod parallel;
pub mod provider;
pub mod remote;
pub mod resource;
pub mod runtime;
pub mod scanner;
