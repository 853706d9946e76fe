// src/storage/mod.rs
//! Storage layer: the status store capability and its in-memory backend.

pub mod status_store;
