//! Hydra scene indices for [OpenUSD](https://github.com/PixarAnimationStudios/OpenUSD) in pure Rust

pub mod base;
pub mod hd;
pub mod hdsi;
pub mod hdx;
pub mod sdf;

#[doc(hidden)]
pub use base::*;

pub(crate) use tf::declare_public_tokens;
