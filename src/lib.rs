//! hub-analyzer: Channel Analyzer gateway and polling client with Hexagonal Architecture.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
