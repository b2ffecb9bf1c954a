//! Structural comparison of metrics tables
//!
//! Compares two artifacts of the same logical table for exact equality
//! and reports the first point of divergence for diagnosis.

use crate::table::{CellValue, MetricsTable};
use serde::Serialize;
use std::fmt;

/// Outcome of comparing two metrics tables
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ComparisonVerdict {
    /// Identical schema, row count, and values
    Equal,
    /// Column names or order differ; no further comparison attempted
    SchemaMismatch {
        /// Columns of the left table
        left: Vec<String>,
        /// Columns of the right table
        right: Vec<String>,
    },
    /// Row counts differ; no per-row comparison attempted
    RowCountMismatch {
        /// Row count of the left table
        left: usize,
        /// Row count of the right table
        right: usize,
    },
    /// First row index where the tables disagree, with both full rows
    RowDivergence {
        /// Index of the first differing row
        index: usize,
        /// The left table's row at that index
        left: Vec<CellValue>,
        /// The right table's row at that index
        right: Vec<CellValue>,
    },
}

impl ComparisonVerdict {
    /// Whether the two tables compared equal
    #[must_use]
    pub fn is_equal(&self) -> bool {
        matches!(self, Self::Equal)
    }
}

fn format_row(row: &[CellValue]) -> String {
    let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
    format!("({})", cells.join(", "))
}

impl fmt::Display for ComparisonVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "equal"),
            Self::SchemaMismatch { left, right } => write!(
                f,
                "incompatible schema: [{}] vs [{}]",
                left.join(", "),
                right.join(", ")
            ),
            Self::RowCountMismatch { left, right } => {
                write!(f, "row count mismatch: {left} vs {right}")
            }
            Self::RowDivergence { index, left, right } => write!(
                f,
                "row {index} differs: {} vs {}",
                format_row(left),
                format_row(right)
            ),
        }
    }
}

/// Compare two tables: schema first, then row counts, then rows
/// pairwise by position
///
/// Equality is exact value equality per column; approximate comparison
/// is out of scope.
#[must_use]
pub fn compare(left: &MetricsTable, right: &MetricsTable) -> ComparisonVerdict {
    if left.columns != right.columns {
        return ComparisonVerdict::SchemaMismatch {
            left: left.columns.clone(),
            right: right.columns.clone(),
        };
    }

    if left.row_count() != right.row_count() {
        return ComparisonVerdict::RowCountMismatch {
            left: left.row_count(),
            right: right.row_count(),
        };
    }

    for (index, (left_row, right_row)) in left.rows.iter().zip(&right.rows).enumerate() {
        if left_row != right_row {
            return ComparisonVerdict::RowDivergence {
                index,
                left: left_row.clone(),
                right: right_row.clone(),
            };
        }
    }

    ComparisonVerdict::Equal
}
