//! Report formatting and rendering.

pub mod formatter;
pub mod renderer;
pub mod response;

pub use formatter::{select_template, FormatTemplate, Formatter};
pub use renderer::{
    artifact_stem, ChartRenderer, DocumentRenderer, MarkdownChartRenderer,
    MarkdownDocumentRenderer, RenderDocument, RenderTemplate,
};
pub use response::{generate_json_response, generate_markdown_response};
