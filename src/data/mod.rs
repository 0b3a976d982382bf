//! Versioned data files and the templates parsed from them

pub mod path;
pub mod template;

pub use path::{resolve_all, resolve_latest, FilePattern, PathPattern};
pub use template::{
    InlineTemplateSource, JsonTemplateSource, State, Template, TemplateCache, TemplateSource,
};
