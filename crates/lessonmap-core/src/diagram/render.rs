//! Turns diagram text into something a user can look at and click.
//!
//! While a lesson is still streaming the text is passed through untouched.
//! Only the final document is parsed, laid out in ranks and drawn as SVG.

use super::model::{Direction, EdgeStyle, Flowchart, NodeRef, NodeShape};
use super::parser::parse_flowchart;
use std::collections::HashMap;

const NODE_HEIGHT: f64 = 40.0;
const MIN_NODE_WIDTH: f64 = 60.0;
const CHAR_WIDTH: f64 = 8.0;
const LABEL_PADDING: f64 = 16.0;
const NODE_GAP: f64 = 30.0;
const RANK_GAP: f64 = 60.0;
const MARGIN: f64 = 20.0;

/// Result of one render call.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    /// Streaming is in progress; show the text as-is.
    Raw(String),
    Rendered(RenderedDiagram),
    /// Final text did not parse. The message is meant for an inline indicator.
    Failed { message: String },
}

impl RenderOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiagramRenderer;

impl DiagramRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Renders `text`, or passes it through while `streaming` is true.
    ///
    /// Never panics on bad input; parse failures come back as
    /// [`RenderOutcome::Failed`].
    pub fn render(&self, text: &str, streaming: bool) -> RenderOutcome {
        if streaming {
            return RenderOutcome::Raw(text.to_string());
        }

        match parse_flowchart(text) {
            Ok(flowchart) => {
                tracing::debug!(
                    "[Renderer] Rendered diagram with {} nodes, {} edges",
                    flowchart.nodes.len(),
                    flowchart.edges.len()
                );
                RenderOutcome::Rendered(RenderedDiagram::new(flowchart))
            }
            Err(e) => {
                tracing::warn!("[Renderer] Diagram failed to parse: {}", e);
                RenderOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }
}

/// Position and size of one node, top-left origin.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeBox {
    pub id: String,
    pub rank: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NodeBox {
    fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiagramLayout {
    /// Same order as the flowchart's nodes.
    pub nodes: Vec<NodeBox>,
    pub width: f64,
    pub height: f64,
}

impl DiagramLayout {
    pub fn node(&self, id: &str) -> Option<&NodeBox> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn rank_count(&self) -> usize {
        self.nodes.iter().map(|n| n.rank + 1).max().unwrap_or(0)
    }
}

/// A successfully parsed and laid out diagram.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDiagram {
    flowchart: Flowchart,
    layout: DiagramLayout,
    svg: String,
    outline: String,
}

impl RenderedDiagram {
    pub fn new(flowchart: Flowchart) -> Self {
        let ranks = assign_ranks(&flowchart);
        let layout = compute_layout(&flowchart, &ranks);
        let svg = draw_svg(&flowchart, &layout);
        let outline = draw_outline(&flowchart, &ranks);

        Self {
            flowchart,
            layout,
            svg,
            outline,
        }
    }

    pub fn flowchart(&self) -> &Flowchart {
        &self.flowchart
    }

    pub fn layout(&self) -> &DiagramLayout {
        &self.layout
    }

    pub fn svg(&self) -> &str {
        &self.svg
    }

    pub fn outline(&self) -> &str {
        &self.outline
    }

    /// Every clickable node, in declaration order.
    pub fn nodes(&self) -> Vec<NodeRef> {
        self.flowchart.nodes.iter().map(|n| n.node_ref()).collect()
    }

    /// Resolves a click on a node to its id and display label.
    pub fn click(&self, node_id: &str) -> Option<NodeRef> {
        self.flowchart.node(node_id).map(|n| n.node_ref())
    }
}

// ============================================================================
// Ranking
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}

/// Longest-path ranks from the roots, ignoring edges that close a cycle.
fn assign_ranks(chart: &Flowchart) -> Vec<usize> {
    let count = chart.nodes.len();
    let index: HashMap<&str, usize> = chart
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect();

    let mut adjacency = vec![Vec::new(); count];
    for edge in &chart.edges {
        if let (Some(&from), Some(&to)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str())) {
            adjacency[from].push(to);
        }
    }

    // Depth-first search in declaration order. Edges into an active node are
    // back edges and are left out of `forward`.
    let mut state = vec![Visit::New; count];
    let mut forward: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut postorder = Vec::with_capacity(count);

    for root in 0..count {
        if state[root] != Visit::New {
            continue;
        }
        state[root] = Visit::Active;
        let mut stack = vec![(root, 0usize)];

        while let Some(top) = stack.last_mut() {
            let node = top.0;
            match adjacency[node].get(top.1).copied() {
                Some(next) => {
                    top.1 += 1;
                    match state[next] {
                        Visit::New => {
                            forward[node].push(next);
                            state[next] = Visit::Active;
                            stack.push((next, 0));
                        }
                        Visit::Active => {}
                        Visit::Done => forward[node].push(next),
                    }
                }
                None => {
                    state[node] = Visit::Done;
                    postorder.push(node);
                    stack.pop();
                }
            }
        }
    }

    let mut ranks = vec![0; count];
    for &node in postorder.iter().rev() {
        for &next in &forward[node] {
            ranks[next] = ranks[next].max(ranks[node] + 1);
        }
    }
    ranks
}

// ============================================================================
// Layout
// ============================================================================

fn node_width(label: &str) -> f64 {
    (label.chars().count() as f64 * CHAR_WIDTH + LABEL_PADDING * 2.0).max(MIN_NODE_WIDTH)
}

fn compute_layout(chart: &Flowchart, ranks: &[usize]) -> DiagramLayout {
    let vertical = chart.direction.is_vertical();
    let flipped = matches!(chart.direction, Direction::BottomUp | Direction::RightLeft);
    let max_rank = ranks.iter().copied().max().unwrap_or(0);

    let mut by_rank: Vec<Vec<usize>> = vec![Vec::new(); max_rank + 1];
    for (idx, &rank) in ranks.iter().enumerate() {
        by_rank[rank].push(idx);
    }

    let widths: Vec<f64> = chart.nodes.iter().map(|n| node_width(&n.label)).collect();
    let widest = widths.iter().copied().fold(MIN_NODE_WIDTH, f64::max);
    let rank_step = if vertical {
        NODE_HEIGHT + RANK_GAP
    } else {
        widest + RANK_GAP
    };

    let cross_len = |members: &[usize]| -> f64 {
        if members.is_empty() {
            return 0.0;
        }
        let gaps = (members.len() - 1) as f64 * NODE_GAP;
        if vertical {
            members.iter().map(|&idx| widths[idx]).sum::<f64>() + gaps
        } else {
            members.len() as f64 * NODE_HEIGHT + gaps
        }
    };
    let max_cross = by_rank.iter().map(|m| cross_len(m)).fold(0.0, f64::max);

    let mut nodes: Vec<Option<NodeBox>> = vec![None; chart.nodes.len()];
    for (rank, members) in by_rank.iter().enumerate() {
        let slot = if flipped { max_rank - rank } else { rank };
        let rank_pos = MARGIN + slot as f64 * rank_step;
        let mut cross = MARGIN + (max_cross - cross_len(members)) / 2.0;

        for &idx in members {
            let (x, y) = if vertical {
                let pos = (cross, rank_pos);
                cross += widths[idx] + NODE_GAP;
                pos
            } else {
                let pos = (rank_pos + (widest - widths[idx]) / 2.0, cross);
                cross += NODE_HEIGHT + NODE_GAP;
                pos
            };
            nodes[idx] = Some(NodeBox {
                id: chart.nodes[idx].id.clone(),
                rank,
                x,
                y,
                width: widths[idx],
                height: NODE_HEIGHT,
            });
        }
    }

    let rank_extent = if chart.nodes.is_empty() {
        0.0
    } else {
        (max_rank + 1) as f64 * rank_step - RANK_GAP
    };
    let (width, height) = if vertical {
        (max_cross + MARGIN * 2.0, rank_extent + MARGIN * 2.0)
    } else {
        (rank_extent + MARGIN * 2.0, max_cross + MARGIN * 2.0)
    };

    DiagramLayout {
        nodes: nodes.into_iter().flatten().collect(),
        width,
        height,
    }
}

// ============================================================================
// SVG
// ============================================================================

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

fn draw_svg(chart: &Flowchart, layout: &DiagramLayout) -> String {
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" class="lessonmap-diagram" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}">"#,
        w = layout.width,
        h = layout.height
    );
    svg.push('\n');
    svg.push_str(concat!(
        r#"<defs><marker id="arrowhead" viewBox="0 0 10 10" refX="10" refY="5" "#,
        r#"markerWidth="8" markerHeight="8" orient="auto-start-reverse">"#,
        r#"<path d="M0,0 L10,5 L0,10 z"/></marker></defs>"#,
        "\n"
    ));

    for subgraph in &chart.subgraphs {
        let members: Vec<&NodeBox> = subgraph
            .node_ids
            .iter()
            .filter_map(|id| layout.node(id))
            .collect();
        if members.is_empty() {
            continue;
        }
        let pad = NODE_GAP / 2.0;
        let left = members.iter().map(|b| b.x).fold(f64::MAX, f64::min) - pad;
        let top = members.iter().map(|b| b.y).fold(f64::MAX, f64::min) - pad;
        let right = members.iter().map(|b| b.x + b.width).fold(f64::MIN, f64::max) + pad;
        let bottom = members.iter().map(|b| b.y + b.height).fold(f64::MIN, f64::max) + pad;
        svg.push_str(&format!(
            r#"<g class="subgraph" id="subgraph-{}"><rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="none" stroke-dasharray="4 2"/><text x="{:.1}" y="{:.1}">{}</text></g>"#,
            escape_xml(&subgraph.id),
            left,
            top,
            right - left,
            bottom - top,
            left + 4.0,
            top + 12.0,
            escape_xml(&subgraph.title)
        ));
        svg.push('\n');
    }

    for edge in &chart.edges {
        let (Some(from), Some(to)) = (layout.node(&edge.from), layout.node(&edge.to)) else {
            continue;
        };
        let (x1, y1, x2, y2) = edge_endpoints(from, to, chart.direction.is_vertical());
        let style = match edge.style {
            EdgeStyle::Solid => r#"stroke-width="1.5""#,
            EdgeStyle::Dotted => r#"stroke-width="1.5" stroke-dasharray="3 3""#,
            EdgeStyle::Thick => r#"stroke-width="3.5""#,
        };
        let marker = if edge.arrow {
            r#" marker-end="url(#arrowhead)""#
        } else {
            ""
        };
        svg.push_str(&format!(
            r#"<path class="edge" data-from="{}" data-to="{}" d="M{:.1},{:.1} L{:.1},{:.1}" fill="none" stroke="currentColor" {}{}/>"#,
            escape_xml(&edge.from),
            escape_xml(&edge.to),
            x1,
            y1,
            x2,
            y2,
            style,
            marker
        ));
        if let Some(label) = &edge.label {
            svg.push_str(&format!(
                r#"<text class="edge-label" x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
                (x1 + x2) / 2.0,
                (y1 + y2) / 2.0,
                escape_xml(label)
            ));
        }
        svg.push('\n');
    }

    for (node, bbox) in chart.nodes.iter().zip(&layout.nodes) {
        let (cx, cy) = bbox.center();
        let label = escape_xml(&node.label);
        svg.push_str(&format!(
            r#"<g class="node" id="node-{}" data-id="{}" data-label="{}" cursor="pointer">{}<text x="{:.1}" y="{:.1}" text-anchor="middle" dominant-baseline="middle">{}</text></g>"#,
            escape_xml(&node.id),
            escape_xml(&node.id),
            label,
            draw_shape(node.shape, bbox),
            cx,
            cy,
            label
        ));
        svg.push('\n');
    }

    svg.push_str("</svg>\n");
    svg
}

fn edge_endpoints(from: &NodeBox, to: &NodeBox, vertical: bool) -> (f64, f64, f64, f64) {
    let (fx, fy) = from.center();
    let (tx, ty) = to.center();

    if vertical {
        let (y1, y2) = if ty >= fy {
            (from.y + from.height, to.y)
        } else {
            (from.y, to.y + to.height)
        };
        (fx, y1, tx, y2)
    } else {
        let (x1, x2) = if tx >= fx {
            (from.x + from.width, to.x)
        } else {
            (from.x, to.x + to.width)
        };
        (x1, fy, x2, ty)
    }
}

const SHAPE_PAINT: &str = r#"fill="white" stroke="currentColor""#;

fn polygon(points: &[(f64, f64)]) -> String {
    let points: Vec<String> = points.iter().map(|(px, py)| format!("{px:.1},{py:.1}")).collect();
    format!(r#"<polygon points="{}" {SHAPE_PAINT}/>"#, points.join(" "))
}

fn draw_shape(shape: NodeShape, b: &NodeBox) -> String {
    let (x, y, w, h) = (b.x, b.y, b.width, b.height);
    let (cx, cy) = b.center();
    let common = SHAPE_PAINT;

    let rect = |rx: f64| {
        format!(r#"<rect x="{x:.1}" y="{y:.1}" width="{w:.1}" height="{h:.1}" rx="{rx:.1}" {common}/>"#)
    };

    match shape {
        NodeShape::Rect => rect(0.0),
        NodeShape::Round => rect(8.0),
        NodeShape::Stadium => rect(h / 2.0),
        NodeShape::Subroutine => format!(
            r#"{}<path d="M{:.1},{y:.1} V{:.1} M{:.1},{y:.1} V{:.1}" stroke="currentColor"/>"#,
            rect(0.0),
            x + 6.0,
            y + h,
            x + w - 6.0,
            y + h
        ),
        NodeShape::Cylinder => format!(
            r#"{}<ellipse cx="{cx:.1}" cy="{:.1}" rx="{:.1}" ry="5.0" {common}/>"#,
            rect(4.0),
            y + 5.0,
            w / 2.0
        ),
        NodeShape::Circle => format!(
            r#"<ellipse cx="{cx:.1}" cy="{cy:.1}" rx="{:.1}" ry="{:.1}" {common}/>"#,
            w / 2.0,
            h / 2.0 + 4.0
        ),
        NodeShape::Rhombus => polygon(&[(cx, y - 6.0), (x + w, cy), (cx, y + h + 6.0), (x, cy)]),
        NodeShape::Hexagon => polygon(&[
            (x + 10.0, y),
            (x + w - 10.0, y),
            (x + w, cy),
            (x + w - 10.0, y + h),
            (x + 10.0, y + h),
            (x, cy),
        ]),
        NodeShape::Asymmetric => polygon(&[(x, y), (x + w, y), (x + w, y + h), (x, y + h), (x + 12.0, cy)]),
    }
}

// ============================================================================
// Text outline
// ============================================================================

fn link_marker(style: EdgeStyle, arrow: bool) -> &'static str {
    match (style, arrow) {
        (EdgeStyle::Solid, true) => "-->",
        (EdgeStyle::Solid, false) => "---",
        (EdgeStyle::Dotted, true) => "-.->",
        (EdgeStyle::Dotted, false) => "-.-",
        (EdgeStyle::Thick, true) => "==>",
        (EdgeStyle::Thick, false) => "===",
    }
}

/// Indented tree walk from the rank-0 nodes. Nodes reached a second time are
/// printed once more with `(see above)` and not expanded.
fn draw_outline(chart: &Flowchart, ranks: &[usize]) -> String {
    let mut out = String::new();
    let mut seen = vec![false; chart.nodes.len()];

    for (idx, &rank) in ranks.iter().enumerate() {
        if rank == 0 && !seen[idx] {
            walk_outline(chart, idx, 0, "", &mut seen, &mut out);
        }
    }
    out
}

fn walk_outline(
    chart: &Flowchart,
    idx: usize,
    depth: usize,
    prefix: &str,
    seen: &mut [bool],
    out: &mut String,
) {
    let node = &chart.nodes[idx];
    let indent = "  ".repeat(depth);

    if seen[idx] {
        out.push_str(&format!("{indent}{prefix}{} [{}] (see above)\n", node.label, node.id));
        return;
    }
    seen[idx] = true;
    out.push_str(&format!("{indent}{prefix}{} [{}]\n", node.label, node.id));

    for edge in chart.outgoing(&node.id) {
        let Some(next) = chart.node_index(&edge.to) else {
            continue;
        };
        let marker = link_marker(edge.style, edge.arrow);
        let prefix = match &edge.label {
            Some(label) => format!("{marker}|{label}| "),
            None => format!("{marker} "),
        };
        walk_outline(chart, next, depth + 1, &prefix, seen, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(text: &str) -> RenderedDiagram {
        match DiagramRenderer::new().render(text, false) {
            RenderOutcome::Rendered(diagram) => diagram,
            other => panic!("expected rendered diagram, got {other:?}"),
        }
    }

    #[test]
    fn test_streaming_returns_raw_text() {
        let outcome = DiagramRenderer::new().render("graph TD\nA-->", true);
        assert_eq!(outcome, RenderOutcome::Raw("graph TD\nA-->".to_string()));
    }

    #[test]
    fn test_parse_failure_is_inline() {
        let outcome = DiagramRenderer::new().render("graph TD\nA-->", false);
        match outcome {
            RenderOutcome::Failed { message } => assert!(message.contains("line 2")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_click_resolves_id_and_label() {
        let diagram = rendered("graph TD\nA[Photosynthesis] --> B[Light reactions]");
        assert_eq!(
            diagram.click("B"),
            Some(NodeRef {
                id: "B".into(),
                label: "Light reactions".into()
            })
        );
        assert_eq!(diagram.click("Z"), None);
        assert_eq!(diagram.nodes().len(), 2);
    }

    #[test]
    fn test_ranks_follow_longest_path() {
        let diagram = rendered("graph TD\nA-->B\nB-->C\nA-->C");
        let layout = diagram.layout();
        assert_eq!(layout.node("A").unwrap().rank, 0);
        assert_eq!(layout.node("B").unwrap().rank, 1);
        assert_eq!(layout.node("C").unwrap().rank, 2);
        assert_eq!(layout.rank_count(), 3);
        assert!(layout.node("C").unwrap().y > layout.node("B").unwrap().y);
    }

    #[test]
    fn test_cycles_do_not_loop() {
        let diagram = rendered("graph LR\nA-->B\nB-->C\nC-->A\nC-->C");
        let layout = diagram.layout();
        assert_eq!(layout.node("A").unwrap().rank, 0);
        assert_eq!(layout.node("C").unwrap().rank, 2);
        assert!(layout.node("B").unwrap().x > layout.node("A").unwrap().x);
        assert!(diagram.outline().contains("(see above)"));
    }

    #[test]
    fn test_bottom_up_flips_ranks() {
        let diagram = rendered("graph BT\nA-->B");
        let layout = diagram.layout();
        assert!(layout.node("A").unwrap().y > layout.node("B").unwrap().y);
    }

    #[test]
    fn test_svg_marks_clickable_nodes() {
        let diagram = rendered("graph TD\nA[\"Cells & <tissue>\"] -->|makes| B((Organ))");
        let svg = diagram.svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"id="node-A""#));
        assert!(svg.contains(r#"data-label="Cells &amp; &lt;tissue&gt;""#));
        assert!(svg.contains(r#"id="node-B""#));
        assert!(svg.contains("<ellipse"));
        assert!(svg.contains(">makes</text>"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_outline_is_indented_tree() {
        let diagram = rendered("graph TD\nA[Root] -->|has| B[Child]\nA -.-> C[Other]");
        assert_eq!(
            diagram.outline(),
            "Root [A]\n  -->|has| Child [B]\n  -.-> Other [C]\n"
        );
    }

    #[test]
    fn test_header_only_diagram_renders_empty() {
        let diagram = rendered("graph TD");
        assert!(diagram.nodes().is_empty());
        assert_eq!(diagram.outline(), "");
        assert_eq!(diagram.layout().rank_count(), 0);
    }
}
