//! Documentation synthesis: description + example, rendered input/output
//! schema.

use crate::tool::ToolDyn;
use sandbox_schema::render;

/// Render a tool's full documentation block.
#[must_use]
pub fn render_doc(tool: &dyn ToolDyn) -> String {
    let mut doc = format!("{}.{}\n{}", tool.namespace(), tool.name(), tool.description());
    if let Some(example) = tool.example() {
        doc.push_str(&format!("\nExample: {example}"));
    }
    doc.push_str(&format!("\nInput: {}", render(tool.input_schema())));
    if let Some(output_schema) = tool.output_schema() {
        doc.push_str(&format!("\nOutput: {}", render(output_schema)));
    }
    doc
}
