// Abstract syntax tree for session scripts

use crate::relational::RelationalOp;
use crate::selection::Selection;

/// One step of a session script
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Summary statistics of the whole dataset
    Describe,
    /// A chart type with its selected columns
    Plot(Selection),
    Relational(RelationalOp),
}

/// Commands in the order they were written
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub commands: Vec<Command>,
}
