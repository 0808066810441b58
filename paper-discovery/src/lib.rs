pub mod arxiv;
pub mod citations;

pub use arxiv::{build_query, ArxivClient, FailureClass, SearchError};
pub use citations::SemanticScholarClient;
