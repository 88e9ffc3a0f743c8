//! Findings of a consistency check.

use std::fmt;

use serde::{Deserialize, Serialize};

use ddd_core::{ExceptionCode, Gid, ObjType, Priority, Rank};

/// One violated replication invariant, as seen by the reporting rank.
///
/// `from` is the rank whose check message exposed the problem; `holder` is
/// the rank whose copy the disagreement is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inconsistency {
    /// Two local objects share a global id.
    DuplicateObject { gid: Gid },
    /// A coupling names this rank itself or a rank outside the run.
    InvalidCoupling { gid: Gid, partner: Rank },
    /// An object has two couplings to the same rank.
    DuplicateCoupling { gid: Gid, partner: Rank },
    /// `from` has a coupling to this rank for an object this rank lacks.
    MissingObject { gid: Gid, from: Rank },
    TypeMismatch {
        gid: Gid,
        from: Rank,
        local: ObjType,
        remote: ObjType,
    },
    /// `from` lists `holder` as a holder, this rank has no coupling to it.
    MissingCoupling { gid: Gid, from: Rank, holder: Rank },
    PriorityMismatch {
        gid: Gid,
        from: Rank,
        holder: Rank,
        local: Priority,
        remote: Priority,
    },
    /// This rank couples to `holder`, `from` does not list it.
    UnlistedHolder { gid: Gid, from: Rank, holder: Rank },
    /// This rank withdrew from a check phase.
    PhaseAborted { code: ExceptionCode },
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateObject { gid } => write!(f, "object {gid} is held twice"),
            Self::InvalidCoupling { gid, partner } => {
                write!(f, "object {gid} has invalid coupling to rank {partner}")
            }
            Self::DuplicateCoupling { gid, partner } => {
                write!(f, "object {gid} has two couplings to rank {partner}")
            }
            Self::MissingObject { gid, from } => {
                write!(f, "rank {from} couples object {gid} here, but it does not exist")
            }
            Self::TypeMismatch {
                gid,
                from,
                local,
                remote,
            } => write!(
                f,
                "object {gid} has type {local} here, rank {from} says {remote}"
            ),
            Self::MissingCoupling { gid, from, holder } => write!(
                f,
                "rank {from} lists rank {holder} as holder of {gid}, no coupling here"
            ),
            Self::PriorityMismatch {
                gid,
                from,
                holder,
                local,
                remote,
            } => write!(
                f,
                "object {gid} on rank {holder} has priority {local} here, rank {from} says {remote}"
            ),
            Self::UnlistedHolder { gid, from, holder } => write!(
                f,
                "rank {holder} holds {gid} according to this rank, rank {from} does not list it"
            ),
            Self::PhaseAborted { code } => write!(f, "check phase aborted with {code}"),
        }
    }
}

/// Result of [`cons_check`](crate::ConsChecker::cons_check) on one rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsReport {
    pub rank: Rank,
    /// Inconsistencies found by this rank.
    pub local_errors: u64,
    /// Sum of `local_errors` over all ranks; identical everywhere.
    pub total_errors: u64,
    /// The first findings of this rank, bounded by the configuration.
    pub inconsistencies: Vec<Inconsistency>,
    /// Findings counted but not kept.
    pub omitted: u64,
}

impl ConsReport {
    pub(crate) fn new(
        rank: Rank,
        total_errors: u64,
        mut findings: Vec<Inconsistency>,
        max_reported: usize,
    ) -> Self {
        let local_errors = findings.len() as u64;
        findings.truncate(max_reported);
        Self {
            rank,
            local_errors,
            total_errors,
            omitted: local_errors - findings.len() as u64,
            inconsistencies: findings,
        }
    }

    /// True if no rank found anything.
    pub fn is_consistent(&self) -> bool {
        self.total_errors == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_truncates() {
        let findings = (0..5)
            .map(|i| Inconsistency::DuplicateObject { gid: Gid(i) })
            .collect();
        let report = ConsReport::new(Rank(1), 9, findings, 2);
        assert_eq!(report.local_errors, 5);
        assert_eq!(report.inconsistencies.len(), 2);
        assert_eq!(report.omitted, 3);
        assert!(!report.is_consistent());
    }

    #[test]
    fn test_inconsistency_json() {
        let finding = Inconsistency::PriorityMismatch {
            gid: Gid(7),
            from: Rank(0),
            holder: Rank(1),
            local: Priority(2),
            remote: Priority(3),
        };
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["kind"], "priority_mismatch");
        assert_eq!(json["holder"], 1);
        let back: Inconsistency = serde_json::from_value(json).unwrap();
        assert_eq!(back, finding);
    }

    #[test]
    fn test_display_names_ranks() {
        let finding = Inconsistency::MissingCoupling {
            gid: Gid(1),
            from: Rank(2),
            holder: Rank(3),
        };
        assert_eq!(
            finding.to_string(),
            "rank 2 lists rank 3 as holder of 0x00000001, no coupling here"
        );
    }
}
