//! # Fileshare Testkit
//!
//! Testing utilities for fileshare.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Decision vectors**: Requests with known authorization outcomes
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: A service on a manual clock with a fixed master key
//!
//! The workspace's cross-crate integration tests live in `tests/`.
//!
//! ## Decision Vectors
//!
//! ```rust
//! use fileshare_testkit::vectors::{all_vectors, evaluate, Expected};
//!
//! for vector in all_vectors() {
//!     let decision = evaluate(&vector);
//!     match vector.expected {
//!         Expected::Allow(tier) => assert_eq!(decision.tier(), Some(tier), "{}", vector.name),
//!         Expected::Deny(reason) => assert_eq!(decision.reason(), Some(reason), "{}", vector.name),
//!     }
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use fileshare_testkit::generators::{action, principal};
//!
//! proptest! {
//!     #[test]
//!     fn strangers_are_denied(p in principal(), a in action()) {
//!         // ...
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use fileshare_testkit::fixtures::TestFixture;
//!
//! async fn example() {
//!     let fixture = TestFixture::new();
//!     let file = fixture.upload("alice", "notes.txt", b"hello").await.unwrap();
//!     fixture.advance(60_000);
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{user, TestFixture, START};
