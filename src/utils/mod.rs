//! Internal utility helpers: query escaping, on-disk cache management,
//! serde shims, and the data tables the matcher code consults.

pub(crate) mod constants;
pub(crate) mod download;
pub(crate) mod query;
