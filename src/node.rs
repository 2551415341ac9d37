use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Opinion {
    Red,
    Blue,
    None,
}

impl Opinion {
    /// Colors in evaluation order. RED before BLUE is the tie-break when both reach majority.
    pub const COLORS: [Opinion; 2] = [Opinion::Red, Opinion::Blue];

    pub fn is_color(self) -> bool {
        !matches!(self, Opinion::None)
    }
}

impl fmt::Display for Opinion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opinion::Red => write!(f, "RED"),
            Opinion::Blue => write!(f, "BLUE"),
            Opinion::None => write!(f, "NONE"),
        }
    }
}

/// Per-color counter pair. Used both for a node's confidence history and for a round's tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorCounts {
    pub red: u32,
    pub blue: u32,
}

impl ColorCounts {
    pub fn get(&self, opinion: Opinion) -> u32 {
        match opinion {
            Opinion::Red => self.red,
            Opinion::Blue => self.blue,
            Opinion::None => 0,
        }
    }

    // NONE never accumulates
    pub fn increment(&mut self, opinion: Opinion) {
        match opinion {
            Opinion::Red => self.red += 1,
            Opinion::Blue => self.blue += 1,
            Opinion::None => {}
        }
    }
}

pub type Confidence = ColorCounts;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub id: usize,
    pub opinion: Opinion,
    pub pending_opinion: Option<Opinion>,
    pub accepted_streak: u32,
    pub confidence: Confidence,
    pub failed: bool,
    pub decided: bool,
}

impl NodeState {
    pub fn new(id: usize, opinion: Opinion) -> Self {
        Self {
            id,
            opinion,
            pending_opinion: None,
            accepted_streak: 0,
            confidence: Confidence::default(),
            failed: false,
            decided: false,
        }
    }

    /// Whether this node initiates a query this round (failure already rolled).
    pub fn can_query(&self) -> bool {
        !self.failed && !self.decided && self.opinion.is_color()
    }

    /// Applies the deferred write. Returns true if the opinion changed.
    pub(crate) fn commit_pending(&mut self) -> bool {
        match self.pending_opinion.take() {
            Some(next) if next != self.opinion => {
                self.opinion = next;
                true
            }
            _ => false,
        }
    }
}

// Same field order as the node tooltip
impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id: {} | color: {} | count: {} | failed: {} | accepted: {} | conf r: {} | conf b: {}",
            self.id,
            self.opinion,
            self.accepted_streak,
            self.failed,
            self.decided,
            self.confidence.red,
            self.confidence.blue,
        )
    }
}
