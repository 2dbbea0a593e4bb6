//! storefront-media - image preparation and submission for storefront admin forms
//!
//! Takes user-selected image files, normalizes them to PNG/JPEG, shrinks
//! oversized ones, tracks which images are kept, added, or removed relative
//! to what the server already has, and assembles a multipart submission with
//! upload progress reporting.

pub mod assets;
pub mod config;
pub mod error;
pub mod form;
pub mod media;
pub mod submit;
pub mod transport;
pub mod types;
