//! # blockdiff — frame delta streaming over stdio
//!
//! `encode` reads fixed-size frames (a framebuffer device, a file or
//! stdin) and writes a tagged wire stream of keyframes and RLE deltas
//! to stdout. `decode` reverses it, writing one full frame to stdout
//! per wire frame.
//!
//! Settings come from a TOML file, overridden by command-line flags.

pub mod cli;
pub mod config;
pub mod service;
