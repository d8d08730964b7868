//! Flutter-facing bindings for the LearnPath core.

pub mod api;
