//! Flow boards collection
//!
//! A board holds a graph of nodes and edges. Edges must connect existing
//! nodes, `createdAt` never changes after creation, and every mutation moves
//! `updatedAt` forward.

use super::{non_blank, required, Collection};
use chrono::{DateTime, Duration, Utc};
use flowmuse_core::{Entity, Result};
use flowmuse_engine::CollectionDescriptor;
use flowmuse_storage::Backend;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Collection name
pub const COLLECTION: &str = "boards";

/// Rendering style of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Card with icon and content
    #[default]
    Custom,
    /// Plain node
    Default,
    /// Flow entry point
    Input,
    /// Flow exit point
    Output,
    /// Container for other nodes
    Group,
}

/// Canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal offset
    pub x: f64,
    /// Vertical offset
    pub y: f64,
}

/// What a node card shows
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeData {
    /// Card heading
    pub title: String,
    /// Icon name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Body text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Accent color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// A node on the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique within the board
    pub id: String,
    /// Rendering style
    #[serde(rename = "type", default)]
    pub kind: NodeKind,
    /// Canvas position
    pub position: Position,
    /// Card contents
    pub data: NodeData,
}

/// A directed connection between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique within the board
    pub id: String,
    /// Source node id
    pub source: String,
    /// Target node id
    pub target: String,
    /// Draw with a moving dash
    #[serde(default)]
    pub animated: bool,
}

/// A flow board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    /// Board title
    pub title: String,
    /// Creation time, immutable
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
    /// Graph nodes
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Graph edges
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Board {
    /// Empty board created now
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Board {
            title: title.into(),
            created_at: now,
            updated_at: now,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }
}

/// Boards facade
pub type Boards<B> = Collection<B, Board>;

fn validate_board(_id: &str, board: &Board) -> std::result::Result<(), String> {
    non_blank("title", &board.title)?;
    if board.updated_at < board.created_at {
        return Err("updatedAt precedes createdAt".into());
    }

    let mut node_ids = HashSet::new();
    for node in &board.nodes {
        if node.id.is_empty() {
            return Err("node id must not be empty".into());
        }
        if !node_ids.insert(node.id.as_str()) {
            return Err(format!("duplicate node id {:?}", node.id));
        }
        if !node.position.x.is_finite() || !node.position.y.is_finite() {
            return Err(format!("node {:?} has a non-finite position", node.id));
        }
    }

    let mut edge_ids = HashSet::new();
    for edge in &board.edges {
        if edge.id.is_empty() {
            return Err("edge id must not be empty".into());
        }
        if !edge_ids.insert(edge.id.as_str()) {
            return Err(format!("duplicate edge id {:?}", edge.id));
        }
        for end in [&edge.source, &edge.target] {
            if !node_ids.contains(end.as_str()) {
                return Err(format!("edge {:?} references unknown node {:?}", edge.id, end));
            }
        }
    }
    Ok(())
}

fn touch(board: &mut Board) {
    board.updated_at = Utc::now().max(board.created_at);
}

fn card(id: &str, x: f64, y: f64, title: &str, icon: &str, content: Option<&str>) -> Node {
    Node {
        id: id.into(),
        kind: NodeKind::Custom,
        position: Position { x, y },
        data: NodeData {
            title: title.into(),
            icon: Some(icon.into()),
            content: content.map(Into::into),
            color: None,
        },
    }
}

fn edge(id: &str, source: &str, target: &str, animated: bool) -> Edge {
    Edge {
        id: id.into(),
        source: source.into(),
        target: target.into(),
        animated,
    }
}

fn seed_boards() -> Vec<(String, Board)> {
    let now = Utc::now();
    vec![
        (
            "board-1".into(),
            Board {
                title: "My First Flow".into(),
                created_at: now - Duration::days(1),
                updated_at: now,
                nodes: vec![
                    card("1", 100.0, 100.0, "Welcome to FlowMuse", "Sparkles", Some("This is a custom node.")),
                    card("2", 400.0, 150.0, "Drag me around", "Move", Some("You can move nodes on the canvas.")),
                    card("3", 250.0, 300.0, "Connect the dots", "Share2", Some("Create connections between nodes.")),
                ],
                edges: vec![edge("e1-2", "1", "2", true), edge("e1-3", "1", "3", false)],
            },
        ),
        (
            "board-2".into(),
            Board {
                title: "Project Plan Q3".into(),
                created_at: now - Duration::days(3),
                updated_at: now - Duration::days(1),
                nodes: vec![
                    card("q3-1", 50.0, 50.0, "Kickoff Meeting", "Users", None),
                    card("q3-2", 250.0, 150.0, "Design Phase", "Palette", None),
                    card("q3-3", 50.0, 250.0, "Development Sprint", "Code", None),
                ],
                edges: vec![
                    edge("qe1-2", "q3-1", "q3-2", false),
                    edge("qe1-3", "q3-1", "q3-3", false),
                ],
            },
        ),
        (
            "board-3".into(),
            Board {
                title: "Empty Board".into(),
                created_at: now,
                updated_at: now,
                nodes: Vec::new(),
                edges: Vec::new(),
            },
        ),
    ]
}

/// Descriptor of the boards collection
pub fn descriptor() -> Result<CollectionDescriptor<Board>> {
    Ok(CollectionDescriptor::<Board>::new(COLLECTION)?
        .validator(validate_board)
        .immutable_fields(&["createdAt"])
        .on_mutate(touch)
        .seed(seed_boards))
}

impl<B: Backend> Collection<B, Board> {
    /// Create an empty board with a generated id
    ///
    /// # Errors
    ///
    /// `Validation` if `title` is blank.
    pub async fn create(&self, title: &str) -> Result<Entity<Board>> {
        let title = required("title", title)?;
        self.insert(None, Board::new(title)).await
    }
}
