//! Extension contracts for attaching tokens to outbound requests.

pub mod request_signer;

pub use request_signer::*;
