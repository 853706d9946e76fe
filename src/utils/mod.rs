// src/utils/mod.rs
//! Helper functions: the status list transport codec.

pub mod codec;
