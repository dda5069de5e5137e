//! Catalog data model and collaborator seams

pub mod models;
pub mod service;

pub use models::{AlbumContext, Quality, TrackDescriptor};
pub use service::{BatchKind, CatalogService, ResolvedBatch, SourceResolver, Tagger, TrackSource};
