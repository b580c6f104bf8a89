#![doc = include_str!("../README.md")]

pub mod config;
pub mod core;
pub mod error;
pub mod report;
pub mod symbols;
pub mod trace;

pub use crate::core::engine::Engine;
pub use crate::error::EngineError;
