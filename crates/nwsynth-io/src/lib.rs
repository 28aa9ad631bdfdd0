//! # nwsynth-io: deck access and export
//!
//! The boundary between the synthesis pipeline and the filesystem:
//!
//! - [`DeckAccessor`] reads registry tables and raw simulator outputs.
//!   [`InMemoryDeck`] and [`DirectoryDeck`] implement it.
//! - [`Exporter`] persists named frames. [`FileExporter`] writes CSV/Parquet
//!   through polars; [`MemoryExporter`] keeps frames for inspection.
//! - [`frames`] converts synthesis tables to polars frames and back.

pub mod accessor;
pub mod directory;
pub mod export;
pub mod frames;
pub mod memory;
pub mod registry;

pub use accessor::{required, DeckAccessor, Records};
pub use directory::DirectoryDeck;
pub use export::{Exporter, FileExporter, MemoryExporter, OutputFormat};
pub use frames::{labeled_frame, read_frame, table_frame};
pub use memory::InMemoryDeck;
pub use polars::prelude::DataFrame;
pub use registry::*;
