pub mod browser;
pub mod error;
pub mod simplify;

// Re-export commonly used items
pub use browser::elements::{ElementDescriptor, MatchResult};
pub use browser::session::{BrowserSession, SessionConfig};
pub use error::{BrowserError, Result};
pub use simplify::simplify_html;
