//! Strict parser for the flowchart dialect the lesson server emits.
//!
//! Accepts `graph`/`flowchart` headers with an optional direction, node shapes,
//! solid/dotted/thick links with pipe or inline labels, `&` groups, chains and
//! `subgraph ... end` blocks. Styling directives are tolerated and ignored.
//! Anything else is a parse error carrying the offending line number.

use super::model::{
    DiagramEdge, DiagramNode, Direction, EdgeStyle, Flowchart, NodeShape, Subgraph,
};
use crate::error::{LessonMapError, Result};
use std::collections::HashMap;
use std::str::FromStr;

const IGNORED_DIRECTIVES: &[&str] = &["classDef", "class", "style", "linkStyle", "click", "direction"];

/// Shape delimiters, longest opener first.
const SHAPES: &[(&str, &str, NodeShape)] = &[
    ("((", "))", NodeShape::Circle),
    ("([", "])", NodeShape::Stadium),
    ("[[", "]]", NodeShape::Subroutine),
    ("[(", ")]", NodeShape::Cylinder),
    ("{{", "}}", NodeShape::Hexagon),
    ("[", "]", NodeShape::Rect),
    ("(", ")", NodeShape::Round),
    ("{", "}", NodeShape::Rhombus),
    (">", "]", NodeShape::Asymmetric),
];

/// Parses a complete flowchart document.
pub fn parse_flowchart(text: &str) -> Result<Flowchart> {
    let mut builder = FlowchartBuilder::default();
    let mut header_seen = false;
    let mut last_line = 1;

    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;
        last_line = line_no;

        let line = raw_line.trim();
        if line.is_empty() || line.starts_with("%%") || line.starts_with("```") {
            continue;
        }

        for statement in split_statements(line) {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }

            if !header_seen {
                builder.direction = parse_header(statement, line_no)?;
                header_seen = true;
            } else {
                builder.statement(statement, line_no)?;
            }
        }
    }

    if !header_seen {
        return Err(LessonMapError::parse(
            last_line,
            "missing `graph` or `flowchart` header",
        ));
    }

    if let Some(&open) = builder.subgraph_stack.last() {
        return Err(LessonMapError::parse(
            last_line,
            format!("subgraph '{}' is never closed", builder.subgraphs[open].id),
        ));
    }

    Ok(builder.finish())
}

fn parse_header(statement: &str, line: usize) -> Result<Direction> {
    let mut words = statement.split_whitespace();

    match words.next() {
        Some("graph") | Some("flowchart") => {}
        Some(other) => {
            return Err(LessonMapError::parse(
                line,
                format!("expected `graph` or `flowchart`, found `{other}`"),
            ));
        }
        None => return Err(LessonMapError::parse(line, "empty header")),
    }

    let direction = match words.next() {
        Some(dir) => Direction::from_str(dir)
            .map_err(|_| LessonMapError::parse(line, format!("unknown direction `{dir}`")))?,
        None => Direction::default(),
    };

    if let Some(extra) = words.next() {
        return Err(LessonMapError::parse(
            line,
            format!("unexpected `{extra}` after header"),
        ));
    }

    Ok(direction)
}

/// Splits a line on `;` outside of quotes and brackets.
fn split_statements(line: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: usize = 0;
    let mut in_quote = false;
    let mut start = 0;

    for (idx, ch) in line.char_indices() {
        match ch {
            '"' => in_quote = !in_quote,
            '[' | '(' | '{' if !in_quote => depth += 1,
            ']' | ')' | '}' if !in_quote => depth = depth.saturating_sub(1),
            ';' if !in_quote && depth == 0 => {
                parts.push(&line[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&line[start..]);
    parts
}

#[derive(Default)]
struct FlowchartBuilder {
    direction: Direction,
    nodes: Vec<DiagramNode>,
    index: HashMap<String, usize>,
    edges: Vec<DiagramEdge>,
    subgraphs: Vec<Subgraph>,
    subgraph_stack: Vec<usize>,
}

struct Link {
    style: EdgeStyle,
    arrow: bool,
    label: Option<String>,
}

impl FlowchartBuilder {
    fn statement(&mut self, statement: &str, line: usize) -> Result<()> {
        let keyword = statement.split_whitespace().next().unwrap_or_default();

        if keyword == "subgraph" {
            return self.open_subgraph(statement["subgraph".len()..].trim(), line);
        }
        if statement == "end" {
            return match self.subgraph_stack.pop() {
                Some(_) => Ok(()),
                None => Err(LessonMapError::parse(line, "`end` without an open subgraph")),
            };
        }
        if IGNORED_DIRECTIVES.contains(&keyword) {
            return Ok(());
        }

        self.chain(statement, line)
    }

    fn open_subgraph(&mut self, rest: &str, line: usize) -> Result<()> {
        if rest.is_empty() {
            return Err(LessonMapError::parse(line, "subgraph needs a name"));
        }

        let (id, title) = match (rest.find('['), rest.ends_with(']')) {
            (Some(open), true) => {
                let id = rest[..open].trim();
                let title = rest[open + 1..rest.len() - 1].trim().trim_matches('"');
                (id.to_string(), title.to_string())
            }
            _ => {
                let title = rest.trim_matches('"').to_string();
                (title.clone(), title)
            }
        };

        self.subgraphs.push(Subgraph {
            id,
            title,
            node_ids: Vec::new(),
        });
        self.subgraph_stack.push(self.subgraphs.len() - 1);
        Ok(())
    }

    fn chain(&mut self, statement: &str, line: usize) -> Result<()> {
        let mut cursor = Cursor::new(statement, line);
        let mut previous = self.group(&mut cursor)?;

        loop {
            cursor.skip_ws();
            if cursor.at_end() {
                return Ok(());
            }

            let link = cursor.link()?;
            cursor.skip_ws();
            let next = self.group(&mut cursor)?;

            for from in &previous {
                for to in &next {
                    self.edges.push(DiagramEdge {
                        from: from.clone(),
                        to: to.clone(),
                        label: link.label.clone(),
                        style: link.style,
                        arrow: link.arrow,
                    });
                }
            }
            previous = next;
        }
    }

    /// `node ( & node )*`
    fn group(&mut self, cursor: &mut Cursor) -> Result<Vec<String>> {
        let mut ids = vec![self.node(cursor)?];

        loop {
            let save = cursor.pos;
            cursor.skip_ws();
            if cursor.eat("&") {
                cursor.skip_ws();
                ids.push(self.node(cursor)?);
            } else {
                cursor.pos = save;
                return Ok(ids);
            }
        }
    }

    fn node(&mut self, cursor: &mut Cursor) -> Result<String> {
        let id = cursor.take_while(|c| c.is_alphanumeric() || c == '_');
        if id.is_empty() {
            return Err(cursor.error("expected node id"));
        }

        let shape = cursor.shape()?;
        self.declare(&id, shape);
        Ok(id)
    }

    fn declare(&mut self, id: &str, shape: Option<(NodeShape, String)>) {
        match self.index.get(id) {
            Some(&idx) => {
                if let Some((shape, label)) = shape {
                    self.nodes[idx].shape = shape;
                    self.nodes[idx].label = label;
                }
            }
            None => {
                let (shape, label) = shape.unwrap_or((NodeShape::Rect, id.to_string()));
                self.index.insert(id.to_string(), self.nodes.len());
                self.nodes.push(DiagramNode {
                    id: id.to_string(),
                    label,
                    shape,
                });
            }
        }

        if let Some(&open) = self.subgraph_stack.last() {
            let members = &mut self.subgraphs[open].node_ids;
            if !members.iter().any(|member| member == id) {
                members.push(id.to_string());
            }
        }
    }

    fn finish(self) -> Flowchart {
        Flowchart {
            direction: self.direction,
            nodes: self.nodes,
            edges: self.edges,
            subgraphs: self.subgraphs,
        }
    }
}

struct Cursor {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Cursor {
    fn new(text: &str, line: usize) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line,
        }
    }

    fn error(&self, message: &str) -> LessonMapError {
        let found = self
            .peek()
            .map(|c| format!("`{c}`"))
            .unwrap_or_else(|| "end of line".to_string());
        LessonMapError::parse(self.line, format!("{message} at column {}, found {found}", self.pos + 1))
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn rest(&self) -> String {
        self.chars[self.pos.min(self.chars.len())..].iter().collect()
    }

    fn starts_with(&self, pattern: &str) -> bool {
        let mut idx = self.pos;
        for expected in pattern.chars() {
            if self.chars.get(idx) != Some(&expected) {
                return false;
            }
            idx += 1;
        }
        true
    }

    fn eat(&mut self, pattern: &str) -> bool {
        if self.starts_with(pattern) {
            self.pos += pattern.chars().count();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn count(&mut self, ch: char) -> usize {
        self.take_while(|c| c == ch).chars().count()
    }

    /// Consumes text up to the first of `terminators`, then the terminator.
    /// Returns the text before it, trimmed.
    fn until_any(&mut self, terminators: &[&str]) -> Option<(String, String)> {
        let rest = self.rest();
        let (byte_idx, terminator) = terminators
            .iter()
            .filter_map(|t| rest.find(t).map(|idx| (idx, *t)))
            .min_by_key(|(idx, _)| *idx)?;

        let text = rest[..byte_idx].trim().to_string();
        self.pos += rest[..byte_idx].chars().count() + terminator.chars().count();
        Some((text, terminator.to_string()))
    }

    fn shape(&mut self) -> Result<Option<(NodeShape, String)>> {
        let Some(&(open, close, shape)) = SHAPES.iter().find(|(open, _, _)| self.starts_with(open))
        else {
            return Ok(None);
        };
        self.eat(open);

        let label = if self.peek() == Some('"') {
            self.pos += 1;
            let quoted = self.take_while(|c| c != '"');
            if !self.eat("\"") {
                return Err(self.error("unterminated quoted label"));
            }
            self.skip_ws();
            if !self.eat(close) {
                return Err(self.error(&format!("expected `{close}`")));
            }
            quoted
        } else {
            match self.until_any(&[close]) {
                Some((text, _)) => text,
                None => return Err(self.error(&format!("unterminated node shape, expected `{close}`"))),
            }
        };

        let label = label.trim().to_string();
        if label.is_empty() {
            return Err(self.error("empty node label"));
        }
        Ok(Some((shape, label)))
    }

    fn link(&mut self) -> Result<Link> {
        let (style, arrow, inline_label) = match self.peek() {
            Some('-') => self.dash_link()?,
            Some('=') => self.thick_link()?,
            _ => return Err(self.error("expected link such as `-->`")),
        };

        self.skip_ws();
        let mut label = inline_label;
        if self.eat("|") {
            let text = self.take_while(|c| c != '|');
            if !self.eat("|") {
                return Err(self.error("unterminated `|` label"));
            }
            label = Some(text.trim().to_string()).filter(|text| !text.is_empty());
        }

        Ok(Link { style, arrow, label })
    }

    fn dash_link(&mut self) -> Result<(EdgeStyle, bool, Option<String>)> {
        let dashes = self.count('-');

        if dashes == 1 && self.eat(".") {
            self.count('.');
            if self.count('-') > 0 {
                return Ok((EdgeStyle::Dotted, self.eat(">"), None));
            }
            return match self.until_any(&[".->", ".-"]) {
                Some((text, terminator)) => Ok((EdgeStyle::Dotted, terminator.ends_with('>'), non_empty(text))),
                None => Err(self.error("unterminated dotted link")),
            };
        }

        match dashes {
            0 | 1 => Err(self.error("expected link such as `-->`")),
            _ if self.eat(">") => Ok((EdgeStyle::Solid, true, None)),
            2 => match self.until_any(&["-->", "---"]) {
                Some((text, terminator)) => {
                    let mut arrow = terminator.ends_with('>');
                    self.count('-');
                    arrow |= self.eat(">");
                    Ok((EdgeStyle::Solid, arrow, non_empty(text)))
                }
                None => Err(self.error("unterminated link label")),
            },
            _ => Ok((EdgeStyle::Solid, false, None)),
        }
    }

    fn thick_link(&mut self) -> Result<(EdgeStyle, bool, Option<String>)> {
        match self.count('=') {
            0 | 1 => Err(self.error("expected link such as `==>`")),
            _ if self.eat(">") => Ok((EdgeStyle::Thick, true, None)),
            2 => match self.until_any(&["==>", "==="]) {
                Some((text, terminator)) => {
                    let mut arrow = terminator.ends_with('>');
                    self.count('=');
                    arrow |= self.eat(">");
                    Ok((EdgeStyle::Thick, arrow, non_empty(text)))
                }
                None => Err(self.error("unterminated link label")),
            },
            _ => Ok((EdgeStyle::Thick, false, None)),
        }
    }
}

fn non_empty(text: String) -> Option<String> {
    Some(text).filter(|text| !text.is_empty())
}
