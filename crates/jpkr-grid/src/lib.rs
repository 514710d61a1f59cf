// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod clipboard;
pub mod edit;
pub mod ids;
pub mod model;
pub mod selection;
pub mod sort;
pub mod state;
pub mod tsv;

pub use clipboard::*;
pub use edit::*;
pub use ids::*;
pub use model::*;
pub use selection::*;
pub use sort::*;
pub use state::*;
pub use tsv::*;
