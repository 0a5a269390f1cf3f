//! Bookshelf application library
//!
//! Project modules mounted by the bookshelf HTTP server.

pub mod modules;

pub use modules::*;
