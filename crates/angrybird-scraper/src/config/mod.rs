pub mod schema;
pub mod selectors;

pub use schema::{
    BrowserConfig, Config, FilterConfig, Limits, OutputConfig, SessionConfig, Target, Viewport,
    DEFAULT_KEYWORDS, DEFAULT_OUTPUT,
};
pub use selectors::{Field, SelectorMap};
