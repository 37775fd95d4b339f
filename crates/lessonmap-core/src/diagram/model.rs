//! Flowchart model produced by the diagram parser.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Layout direction declared in the diagram header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
pub enum Direction {
    /// Top to bottom (`TD` and `TB` are synonyms).
    #[default]
    #[strum(to_string = "TD", serialize = "TB")]
    TopDown,
    #[strum(serialize = "BT")]
    BottomUp,
    #[strum(serialize = "LR")]
    LeftRight,
    #[strum(serialize = "RL")]
    RightLeft,
}

impl Direction {
    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::TopDown | Direction::BottomUp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeShape {
    /// `[label]`, also used for nodes that never declare a shape.
    #[default]
    Rect,
    /// `(label)`
    Round,
    /// `([label])`
    Stadium,
    /// `[[label]]`
    Subroutine,
    /// `[(label)]`
    Cylinder,
    /// `((label))`
    Circle,
    /// `{label}`
    Rhombus,
    /// `{{label}}`
    Hexagon,
    /// `>label]`
    Asymmetric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EdgeStyle {
    #[default]
    Solid,
    Dotted,
    Thick,
}

/// A labelled vertex. Clicking it in a rendered diagram yields its [`NodeRef`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramNode {
    pub id: String,
    pub label: String,
    pub shape: NodeShape,
}

impl DiagramNode {
    pub fn node_ref(&self) -> NodeRef {
        NodeRef {
            id: self.id.clone(),
            label: self.label.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramEdge {
    pub from: String,
    pub to: String,
    pub label: Option<String>,
    pub style: EdgeStyle,
    /// False for open links such as `---`.
    pub arrow: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subgraph {
    pub id: String,
    pub title: String,
    pub node_ids: Vec<String>,
}

/// Node identifier and display label, the payload of a node click.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub id: String,
    pub label: String,
}

/// A parsed flowchart. Nodes keep declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Flowchart {
    pub direction: Direction,
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
    pub subgraphs: Vec<Subgraph>,
}

impl Flowchart {
    pub fn node(&self, id: &str) -> Option<&DiagramNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == id)
    }

    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a DiagramEdge> + 'a {
        self.edges.iter().filter(move |edge| edge.from == id)
    }
}
