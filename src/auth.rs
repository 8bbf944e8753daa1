//! Credential and token models: client identifiers, scope sets, secrets, and issued tokens.

pub mod credentials;
pub mod id;
pub mod scope;
pub mod token;

pub use credentials::*;
pub use id::*;
pub use scope::*;
pub use token::{record::*, secret::*};
