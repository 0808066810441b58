pub mod filter;
pub mod selection;

pub use filter::FilterEngine;
pub use selection::{NoCandidates, SelectionPolicy};
