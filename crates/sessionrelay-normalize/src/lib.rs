pub mod error;
pub mod explore;
pub mod normalize;
pub mod schema;

pub use error::{Error, Result};
pub use explore::{format_explored_summary, summarize_tool_use};
pub use normalize::{normalize_line, normalize_parsed};
