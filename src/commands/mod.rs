//! CLI commands implementation

pub mod add;
pub mod list;
pub mod search;
pub mod status;

pub use add::*;
pub use list::*;
pub use search::*;
pub use status::*;
