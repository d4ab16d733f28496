//! CMS adapters: HTTP client for the real headless CMS, document mapping,
//! and an in-memory double.

pub mod client;
pub mod mapper;
pub mod memory;

pub use client::CmsHttpAdapter;
pub use memory::MemoryCms;
