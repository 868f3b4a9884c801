//! Main module for doke library functionality

pub mod assembling;
pub mod config;
pub mod document;
pub mod error;
pub mod grammar;
pub mod matching;
pub mod pipeline;
pub mod registry;
pub mod resolving;
pub mod sources;
pub mod statements;
pub mod testing;
pub mod value;
