//! Core crate modules
//!
//! Houses the unified configuration types shared by every subsystem.

pub mod config;
