//! graphsvg - diagram sources to cached SVG
//!
//! Renders Graphviz, TeX, Mscgen, PlantUML and Shaape sources by driving the
//! tools' own executables, caches the SVG by content, and hands it back
//! either inline or as a written asset referenced by `<img>`, `<object>`,
//! `<embed>`, `<iframe>` or a bare URL.
//!
//! # Architecture Overview
//!
//! ```text
//! request ─▶ models (validate) ─▶ cache::digest ─▶ cache ─hit─▶ output
//!                                                    │miss
//!                                                    ▼
//!                                   pipeline (renderer [+ dvisvgm]) ─▶ cache ─▶ output
//! ```
//!
//! - Equal requests map to the same [`cache::CacheDigest`]: sources are
//!   whitespace-trimmed, options hashed in a canonical order, and the
//!   resolved command line is part of the key.
//! - A render either produces non-empty SVG or fails; failures are never
//!   cached.
//! - Concurrent identical requests through one [`engine::GraphEngine`]
//!   render once.
//!
//! # Core Modules
//!
//! - [`renderer`] - The closed renderer set, argument building and executable lookup
//! - [`models`] - Requests, option typing and layering
//! - [`cache`] - Content digests, the on-disk SVG cache and in-flight render locks
//! - [`pipeline`] - Process execution for single-stage and TeX renders
//! - [`output`] - Inline SVG filtering and external asset markup
//! - [`engine`] - The end-to-end render flow for one site
//! - [`config`] - `graphs.toml` loading and validation
//! - [`cli`] - The `graphsvg` command line
//!
//! # Example
//!
//! ```rust,no_run
//! use graphsvg::config::GraphsConfig;
//! use graphsvg::engine::GraphEngine;
//! use graphsvg::models::RenderRequest;
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let site = Path::new(".");
//! let config = GraphsConfig::load(site, None).await?;
//! let engine = GraphEngine::from_config(site, &config)?;
//!
//! let outcome = engine
//!     .render(RenderRequest::new("dot", "digraph { a -> b }").with_option("format", "img"))
//!     .await?;
//! println!("{}", outcome.rendered.output());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod engine;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod renderer;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
