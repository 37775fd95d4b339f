//! Diagram domain module.
//!
//! The in-process stand-in for a diagram library: a strict flowchart parser,
//! a renderer that lays the result out and makes nodes clickable, and a lenient
//! label scan that also works on partial text.
//!
//! # Module Structure
//!
//! - `model`: Flowchart types (`Flowchart`, `DiagramNode`, `NodeRef`, ...)
//! - `parser`: `parse_flowchart`
//! - `render`: `DiagramRenderer` and `RenderOutcome`
//! - `extract`: `extract_node_labels`

mod extract;
mod model;
mod parser;
mod render;

pub use extract::extract_node_labels;
pub use model::{
    DiagramEdge, DiagramNode, Direction, EdgeStyle, Flowchart, NodeRef, NodeShape, Subgraph,
};
pub use parser::parse_flowchart;
pub use render::{DiagramLayout, DiagramRenderer, NodeBox, RenderOutcome, RenderedDiagram};
