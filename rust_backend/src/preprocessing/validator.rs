//! Biological plausibility checks for candidate trackways.
//!
//! Rules run in a fixed order and the first failing rule rejects the
//! candidate:
//!
//! 1. path length below `min_length`
//! 2. any instantaneous speed above `max_speed`
//! 3. fewer than three points: accepted without turning analysis
//! 4. any turning angle beyond `max_turn_angle_deg`
//! 5. tortuosity above `max_tortuosity` (see [`ZeroDisplacementPolicy`])
//!
//! Accepted candidates may additionally be tagged as commuting. Rejections are
//! not errors; they are logged at debug level and counted in [`ValidationStats`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{ValidationSettings, ZeroDisplacementPolicy};
use crate::core::domain::{Candidate, MovementBehavior};

/// The rule a candidate failed, with the observed and limiting values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RejectionReason {
    TooShort { length: f64, min_length: f64 },
    TooFast { speed: f64, max_speed: f64 },
    SharpTurn { angle: f64, max_angle: f64 },
    TooTortuous { tortuosity: f64, max_tortuosity: f64 },
    /// Non-empty path that ends where it started, under [`ZeroDisplacementPolicy::Reject`].
    ClosedLoop { length: f64 },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::TooShort { length, min_length } => {
                write!(f, "length {:.3} below minimum {}", length, min_length)
            }
            RejectionReason::TooFast { speed, max_speed } => {
                write!(f, "speed {:.3} above maximum {}", speed, max_speed)
            }
            RejectionReason::SharpTurn { angle, max_angle } => {
                write!(f, "turning angle {:.1} exceeds {} degrees", angle, max_angle)
            }
            RejectionReason::TooTortuous {
                tortuosity,
                max_tortuosity,
            } => write!(f, "tortuosity {:.3} above maximum {}", tortuosity, max_tortuosity),
            RejectionReason::ClosedLoop { length } => {
                write!(f, "closed loop of length {:.3} has no end-to-end displacement", length)
            }
        }
    }
}

/// Outcome of evaluating one candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Accepted { behavior: Option<MovementBehavior> },
    Rejected(RejectionReason),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted { .. })
    }
}

/// Counts of validation outcomes across one analysis.
///
/// # Examples
///
/// ```
/// use trackway_analysis::preprocessing::validator::{ValidationStats, Verdict};
///
/// let mut stats = ValidationStats::default();
/// stats.record(&Verdict::Accepted { behavior: None });
/// assert_eq!(stats.evaluated, 1);
/// assert_eq!(stats.accepted, 1);
/// assert_eq!(stats.rejected(), 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationStats {
    pub evaluated: usize,
    pub accepted: usize,
    pub commuting: usize,
    pub rejected_length: usize,
    pub rejected_speed: usize,
    pub rejected_turn: usize,
    pub rejected_tortuosity: usize,
}

impl ValidationStats {
    pub fn record(&mut self, verdict: &Verdict) {
        self.evaluated += 1;
        match verdict {
            Verdict::Accepted { behavior } => {
                self.accepted += 1;
                if behavior.is_some() {
                    self.commuting += 1;
                }
            }
            Verdict::Rejected(reason) => match reason {
                RejectionReason::TooShort { .. } => self.rejected_length += 1,
                RejectionReason::TooFast { .. } => self.rejected_speed += 1,
                RejectionReason::SharpTurn { .. } => self.rejected_turn += 1,
                RejectionReason::TooTortuous { .. } | RejectionReason::ClosedLoop { .. } => {
                    self.rejected_tortuosity += 1
                }
            },
        }
    }

    pub fn rejected(&self) -> usize {
        self.evaluated - self.accepted
    }
}

/// Heading change in degrees at each interior point.
///
/// Headings are `atan2` of consecutive displacement vectors and the change is
/// their raw difference, so a turn across the ±180° seam reads as a large
/// angle.
pub fn turning_angles(candidate: &Candidate) -> Vec<f64> {
    let headings: Vec<f64> = candidate
        .points
        .windows(2)
        .map(|pair| {
            (pair[1].y - pair[0].y)
                .atan2(pair[1].x - pair[0].x)
                .to_degrees()
        })
        .collect();
    headings.windows(2).map(|h| h[1] - h[0]).collect()
}

/// Path length over end-to-end displacement; `None` when the path ends where it began.
pub fn tortuosity(candidate: &Candidate) -> Option<f64> {
    let displacement = candidate.end_to_end_displacement();
    if displacement > 0.0 {
        Some(candidate.path_length() / displacement)
    } else {
        None
    }
}

/// Rule-based plausibility validator.
#[derive(Debug, Clone, Default)]
pub struct PlausibilityValidator {
    settings: ValidationSettings,
}

impl PlausibilityValidator {
    pub fn new(settings: ValidationSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ValidationSettings {
        &self.settings
    }

    /// Run every rule against `candidate` and return the verdict.
    pub fn evaluate(&self, candidate: &Candidate) -> Verdict {
        let verdict = match self.check(candidate) {
            Ok(behavior) => Verdict::Accepted { behavior },
            Err(reason) => Verdict::Rejected(reason),
        };
        if let Verdict::Rejected(reason) = &verdict {
            log::debug!(
                "Rejected cluster {} ({} points): {}",
                candidate.cluster_id,
                candidate.len(),
                reason
            );
        }
        verdict
    }

    fn check(&self, candidate: &Candidate) -> Result<Option<MovementBehavior>, RejectionReason> {
        let s = &self.settings;

        let length = candidate.path_length();
        if length < s.min_length || length.is_nan() {
            return Err(RejectionReason::TooShort {
                length,
                min_length: s.min_length,
            });
        }

        let speeds = candidate.point_speeds();
        let max_speed = speeds.iter().copied().fold(0.0_f64, f64::max);
        if max_speed > s.max_speed {
            return Err(RejectionReason::TooFast {
                speed: max_speed,
                max_speed: s.max_speed,
            });
        }

        if candidate.len() < 3 {
            return Ok(None);
        }

        if let Some(angle) = turning_angles(candidate)
            .into_iter()
            .find(|a| a.abs() > s.max_turn_angle_deg)
        {
            return Err(RejectionReason::SharpTurn {
                angle,
                max_angle: s.max_turn_angle_deg,
            });
        }

        let tortuosity = match tortuosity(candidate) {
            Some(t) => t,
            None => {
                return match s.zero_displacement {
                    ZeroDisplacementPolicy::Skip => Ok(None),
                    ZeroDisplacementPolicy::Reject => Err(RejectionReason::ClosedLoop { length }),
                };
            }
        };
        if tortuosity > s.max_tortuosity {
            return Err(RejectionReason::TooTortuous {
                tortuosity,
                max_tortuosity: s.max_tortuosity,
            });
        }

        let mean_speed = speeds.iter().sum::<f64>() / speeds.len() as f64;
        if mean_speed > s.min_commuting_speed && tortuosity < s.max_commuting_tortuosity {
            Ok(Some(MovementBehavior::Commuting))
        } else {
            Ok(None)
        }
    }
}
