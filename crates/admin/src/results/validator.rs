use std::collections::{BTreeMap, HashSet};

use tracing::warn;

use super::models::{FORMAT_VERSION, ResultsFile};
use crate::{AdminError, Result};

pub struct ResultsValidator;

impl ResultsValidator {
    /// Structural checks that need no database. Enrollment and the configured
    /// round count are checked again at finalization.
    pub fn validate(file: &ResultsFile, max_round_points: i32) -> Result<ValidationReport> {
        let mut report = ValidationReport::default();

        if file.format_version != FORMAT_VERSION {
            report.errors.push(format!(
                "Unsupported format version: {}. Expected {FORMAT_VERSION}",
                file.format_version
            ));
        }

        if file.source.exporter.trim().is_empty() {
            report
                .warnings
                .push("Source exporter is not specified".to_string());
        }

        if file.rounds.is_empty() {
            report
                .errors
                .push("At least one round is required".to_string());
        }

        let mut round_numbers = HashSet::new();
        let mut rounds_played: BTreeMap<_, usize> = BTreeMap::new();

        for round in &file.rounds {
            if round.round_number < 1 {
                report.errors.push(format!(
                    "Round has invalid round_number: {}. Must be >= 1",
                    round.round_number
                ));
            }
            if !round_numbers.insert(round.round_number) {
                report
                    .errors
                    .push(format!("Duplicate round number: {}", round.round_number));
            }
            if round.results.is_empty() {
                report
                    .warnings
                    .push(format!("Round {} has no results", round.round_number));
            }

            let mut seen = HashSet::new();
            for entry in &round.results {
                let label = format!("Round {}, user {}", round.round_number, entry.user_id);

                if !seen.insert((entry.user_id, entry.participant_type)) {
                    report
                        .errors
                        .push(format!("{label}: appears more than once"));
                }
                if entry.points < 0 {
                    report
                        .errors
                        .push(format!("{label}: negative points {}", entry.points));
                } else if entry.points > max_round_points {
                    report.errors.push(format!(
                        "{label}: points {} exceed the maximum of {max_round_points}",
                        entry.points
                    ));
                }

                *rounds_played
                    .entry((entry.user_id, entry.participant_type))
                    .or_default() += 1;
            }
        }

        if let Some(&max_rounds) = rounds_played.values().max() {
            let mut numbers: Vec<i32> = round_numbers.iter().copied().collect();
            numbers.sort_unstable();
            for pair in numbers.windows(2) {
                if pair[1] - pair[0] > 1 {
                    report.warnings.push(format!(
                        "Round numbers jump from {} to {}",
                        pair[0], pair[1]
                    ));
                }
            }

            for ((user_id, _), played) in &rounds_played {
                if *played < max_rounds {
                    report.warnings.push(format!(
                        "User {user_id} has results in {played} of {max_rounds} rounds"
                    ));
                }
            }
        }

        if !report.errors.is_empty() {
            Err(AdminError::ValidationError(format!(
                "Validation failed with {} error(s): {}",
                report.errors.len(),
                report.errors.join("; ")
            )))
        } else {
            Ok(report)
        }
    }
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            warn!("{}", warning);
        }
    }
}
