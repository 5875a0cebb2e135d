pub mod config;
pub mod content_store;
pub mod media_catalog;
pub mod messages;
pub mod path_index;
pub mod paths;
pub mod pipeline;
pub mod profile_pictures;
pub mod render;
pub mod sessions;
pub mod store;
pub mod timestamp;
pub mod warn;

#[cfg(test)]
pub(crate) mod fixtures;
