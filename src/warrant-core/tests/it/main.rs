//! Consolidated integration tests for warrant-core.
//!
//! One test binary keeps the proptest suites from running as separate
//! processes in parallel.

mod attestation;
mod envelope;
mod license;
mod rotation;
mod tamper;
