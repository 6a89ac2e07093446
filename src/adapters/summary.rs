use std::collections::BTreeMap;
use std::fmt;

use crate::domain::{DispatchOutcome, DispatchResult};

/// Aggregate view of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    /// Operations that received an HTTP response, whatever its status
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub by_status: BTreeMap<u16, usize>,
    pub failures_by_kind: BTreeMap<String, usize>,
}

impl RunSummary {
    pub fn from_results(results: &[DispatchResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Default::default()
        };

        for result in results {
            match &result.outcome {
                DispatchOutcome::Success { .. } => summary.succeeded += 1,
                DispatchOutcome::Failed { kind, .. } => {
                    summary.failed += 1;
                    *summary.failures_by_kind.entry(kind.clone()).or_default() += 1;
                }
                DispatchOutcome::Cancelled => summary.cancelled += 1,
            }
            if let Some(status) = result.status {
                *summary.by_status.entry(status).or_default() += 1;
            }
        }

        summary
    }

    /// Responses with a 2xx status
    pub fn ok_responses(&self) -> usize {
        self.by_status
            .range(200..300)
            .map(|(_, count)| count)
            .sum()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} operations: {} responded, {} failed, {} cancelled",
            self.total, self.succeeded, self.failed, self.cancelled
        )?;
        if !self.by_status.is_empty() {
            let statuses: Vec<String> = self
                .by_status
                .iter()
                .map(|(status, count)| format!("{}={}", status, count))
                .collect();
            write!(f, "; statuses [{}]", statuses.join(", "))?;
        }
        if !self.failures_by_kind.is_empty() {
            let kinds: Vec<String> = self
                .failures_by_kind
                .iter()
                .map(|(kind, count)| format!("{}={}", kind, count))
                .collect();
            write!(f, "; failures [{}]", kinds.join(", "))?;
        }
        Ok(())
    }
}
