//! Domain failures raised by the import pipeline.
//!
//! Every validation stage collects all of its violations before failing, so
//! each list-carrying variant holds the complete, ordered set of offenders
//! for that stage. Infrastructure failures (I/O, SQLite, config parsing) use
//! `anyhow` instead and never appear here.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("Report header is missing required column '{column}'")]
    InvalidInputHeader { column: String },

    #[error("No analyte conversion configured for Param value(s): {}", .params.join(", "))]
    MissingParamConversion { params: Vec<String> },

    #[error("Invalid Test description(s): {}", join_display(.entries))]
    InvalidTestDescription { entries: Vec<InvalidTest> },

    #[error(
        "Sample point(s) must map to exactly one SampleNumber: {}",
        join_display(.conflicts)
    )]
    NonUniqueSampleNumber { conflicts: Vec<SampleNumberConflict> },

    #[error(
        "Samples already present in database for sample point(s): {}",
        .sample_points.join(", ")
    )]
    DuplicateSample { sample_points: Vec<String> },

    #[error("Failed to convert record for sample point '{sample_point}': {reason}")]
    Conversion { sample_point: String, reason: String },
}

/// A (sample point, category, test) triple rejected by the test vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InvalidTest {
    pub sample_point: String,
    pub param: String,
    pub test: String,
}

impl fmt::Display for InvalidTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} '{}'", self.sample_point, self.param, self.test)
    }
}

/// A sample point whose report rows carry zero or several sample numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleNumberConflict {
    pub sample_point: String,
    pub sample_numbers: Vec<String>,
}

impl fmt::Display for SampleNumberConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]",
            self.sample_point,
            self.sample_numbers.join(", ")
        )
    }
}

fn join_display<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_list_every_offender() {
        let err = ImportError::MissingParamConversion {
            params: vec!["Bogus".to_string(), "Unobtainium".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "No analyte conversion configured for Param value(s): Bogus, Unobtainium"
        );

        let err = ImportError::NonUniqueSampleNumber {
            conflicts: vec![
                SampleNumberConflict {
                    sample_point: "W-1A".to_string(),
                    sample_numbers: vec!["S1".to_string(), "S2".to_string()],
                },
                SampleNumberConflict {
                    sample_point: "W-2A".to_string(),
                    sample_numbers: Vec::new(),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "Sample point(s) must map to exactly one SampleNumber: W-1A [S1, S2]; W-2A []"
        );
    }

    #[test]
    fn invalid_test_renders_triple() {
        let entry = InvalidTest {
            sample_point: "W-1A".to_string(),
            param: "Arsenic".to_string(),
            test: "EPA 999".to_string(),
        };
        assert_eq!(entry.to_string(), "W-1A Arsenic 'EPA 999'");
    }
}
