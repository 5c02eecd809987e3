pub mod export;
pub mod run;
pub mod templates;

pub use export::{export, ExportArgs};
pub use run::{run, RunArgs};
pub use templates::{templates, TemplatesArgs};
