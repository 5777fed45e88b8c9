//! Storage layer: document loading on the way in, Parquet export on the way out.

mod error;
pub use error::StoreError;

pub mod export;
pub mod loader;

pub use export::write_gaps_parquet;
pub use loader::{DocumentLoader, FileLoader, FormatParser, SHORT_TEXT_CHARS};
