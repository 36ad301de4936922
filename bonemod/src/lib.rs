//! Layered per-bone transform modifiers for hierarchical character rigs.
//!
//! Modifiers perturb each bone's local transform relative to a captured baseline pose,
//! on top of whatever the host animation wrote this frame. The crate is IO-free and
//! host-agnostic: the embedding application provides a [`SceneGraph`] and implements
//! [`HostAdapter`].

#![forbid(unsafe_code)]

mod config;
mod effect;
mod error;
mod ext_data;
mod host;
mod locator;
mod location;
mod modifier;
mod runtime;
mod scene;

pub mod binary;

#[cfg(feature = "json")]
pub mod json;

pub use config::*;
pub use effect::*;
pub use error::*;
pub use ext_data::*;
pub use host::*;
pub use locator::*;
pub use location::*;
pub use modifier::*;
pub use runtime::*;
pub use scene::*;

#[cfg(test)]
mod test_host;



#[cfg(test)]
mod modifier_tests;
