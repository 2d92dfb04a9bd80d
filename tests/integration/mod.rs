//! Integration test suite for mmm
//!
//! End-to-end tests that run the `mmm` binary against `wiremock` stand-ins for
//! Modrinth, CurseForge and the Minecraft version manifest.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **add**: resolving, installing and recording a single mod
//! - **install**: restoring and locking every configured mod
//! - **scan**: identifying unmanaged jars and recording matches

mod add;
mod common;
mod install;
mod scan;
