//! # doke
//!
//! Turns semi-structured Markdown into typed data trees, driven by a small
//! per-project grammar (a "Doké definition") instead of a hand-written parser.
//!
//! File Layout
//!
//! The library follows the order in which a document flows through it:
//! src/doke
//!   ├── document      Frontmatter / body / trailing split
//!   ├── statements    Body text to statement forest
//!   ├── grammar       Definition sources to grammar types
//!   ├── registry      Union of grammar types, immutable snapshots
//!   ├── matching      Sentence matcher (rule attempts, captures)
//!   ├── resolving     Right-hand sides to values
//!   ├── assembling    Children specs walked against the statement tree
//!   └── pipeline      End-to-end entry point
//!
//! For test fixtures and fluent value assertions, see the [testing module](doke::testing).

#![allow(rustdoc::invalid_html_tags)]

pub mod doke;

pub use doke::error::{DokeError, DokeResult};
pub use doke::pipeline::{DokeParser, ParsedDocument};
pub use doke::value::{Scalar, Value};
