// src/models/mod.rs
//! Data structures: the bit-indexed status list and the signed assertion
//! claim schema.

pub mod assertion;
pub mod status_list;
