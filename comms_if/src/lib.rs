//! # Communications interface crate.
//!
//! Provides the command intake interface of the rover core. The transport and encoding used to
//! deliver these commands are not part of this crate, only the command types and the validation
//! that every command goes through before it reaches the core.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Telecommand definitions
pub mod tc;
