//! # Mole
//!
//! A safety-gated cache and junk cleanup utility for macOS.
//!
//! Mole enumerates cleanup candidates under a fixed set of per-category
//! locations, filters them through a multi-tier path policy, and deletes a
//! caller-chosen subset with per-item failure isolation:
//!
//! - **Path policy**: an ordered rule chain (protected paths, system roots,
//!   bundled apps, traversal, symlink targets, user folders) decides what may go
//! - **Scanner**: shallow or recursive listing that skips unreadable entries
//!   instead of failing, with concurrent multi-root scans
//! - **Deleter**: move-to-trash or permanent delete, batch results that keep
//!   successes and failures apart
//! - **Orchestrator**: category sweeps and reconciliation of delete results
//!   back onto scanned candidates

pub mod cli;
pub mod cleaner;
pub mod common;
pub mod policy;
pub mod scanner;
