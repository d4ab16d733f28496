//! Adapters: infrastructure implementations of the ports, plus the inbound
//! HTTP surface.

pub mod auth;
pub mod cms;
pub mod gateway_api;
pub mod http;
