// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]
//#![deny(unsafe_code)]
// - 'merge/session.rs' uses mmap to map input files into memory

//! # dotfuse
//!
//! A metadata merge engine that fuses multiple .NET modules into a single
//! self-contained assembly. `dotfuse` unions the type systems of its inputs,
//! rewrites every cross-module symbolic reference so the result stands alone,
//! resolves name collisions deterministically, and hands the populated module
//! graph to an external writer - all in pure Rust, without the .NET runtime.
//!
//! ## Features
//!
//! - **Type-system union** - Clone types, members, method bodies, generic
//!   parameters, attributes and security data into one output graph
//! - **Reference rewriting** - A second pass ties every surviving mention
//!   (including cyclic and self-referential ones) to output definitions
//! - **Deterministic collisions** - Displacement renames and diagnostics follow
//!   the fixed input order; reruns produce identical output
//! - **Internalization** - Reduce secondary modules' public surface, with
//!   exclusion patterns and override-chain accessibility correction
//! - **Platform retargeting** - Rewrite external references against a platform
//!   baseline through a pluggable resolver
//!
//! ## Quick Start
//!
//! ```rust
//! use dotfuse::build::{ClassBuilder, ModuleGraphBuilder};
//! use dotfuse::merge::{MergeOptions, MergeSession};
//!
//! let mut lib_a = ModuleGraphBuilder::new("LibA").build();
//! ClassBuilder::new("Widget")
//!     .namespace("Gui")
//!     .public()
//!     .build(&mut lib_a)?;
//!
//! let mut lib_b = ModuleGraphBuilder::new("LibB").build();
//! ClassBuilder::new("Helper")
//!     .namespace("Gui")
//!     .build(&mut lib_b)?;
//!
//! let mut session = MergeSession::new(MergeOptions::default().with_internalize(true));
//! let output = session.merge_graphs(vec![lib_a, lib_b])?;
//! assert!(output.lookup("Gui.Widget").is_some());
//! assert!(output.lookup("Gui.Helper").is_some());
//! # Ok::<(), dotfuse::Error>(())
//! ```
//!
//! ## Architecture
//!
//! `dotfuse` is organized into several key modules:
//!
//! - [`metadata`] - The in-memory object model: module graphs, definitions,
//!   symbolic references, identities, diagnostics
//! - [`merge`] - The engine: structural comparer, platform fixer, identity
//!   mapper, import engine, reference fixator and the session orchestrator
//! - [`build`] - Programmatic graph construction for tests and embedders
//! - [`project`] - Seams to the external loader, writer and resolver
//! - [`Error`] and [`Result`] - Comprehensive error handling
//!
//! ### Merge Pipeline
//!
//! The [`merge::MergeSession`] sequences: load inputs (parallelized, memory
//! mapped) -> import the primary module -> import secondary modules under the
//! internalization policy -> fix references -> serialize through the external
//! [`project::GraphWriter`]. Fatal errors abort atomically; the output graph is
//! never partially written.
//!
//! ### Scope
//!
//! Reading bytes into a module graph and writing one back out are external
//! capabilities ([`project::GraphLoader`] / [`project::GraphWriter`]); so are
//! strong-name signing, resource-format merging and tree shaking. The engine
//! itself consumes and produces in-memory graphs only.

#[macro_use]
pub(crate) mod error;

pub mod build;
pub mod merge;
pub mod metadata;
pub mod prelude;
pub mod project;

pub use error::Error;

/// Result alias used throughout dotfuse.
pub type Result<T> = std::result::Result<T, Error>;
