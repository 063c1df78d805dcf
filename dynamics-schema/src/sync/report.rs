//! Sync report: the collected status stream plus per-phase totals

use serde::Serialize;

use super::types::{ObjectKind, SyncEvent, SyncOutcome};

/// Created/skipped/failed counts for one phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhaseSummary {
    pub kind: Option<ObjectKind>,
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl PhaseSummary {
    pub fn total(&self) -> usize {
        self.created + self.skipped + self.failed
    }

    fn record(&mut self, outcome: &SyncOutcome) {
        match outcome {
            SyncOutcome::Created => self.created += 1,
            SyncOutcome::Skipped { .. } => self.skipped += 1,
            SyncOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// Everything that happened during one sync run
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub sync_date: String,
    pub events: Vec<SyncEvent>,
    /// The run was interrupted before every object was processed
    pub cancelled: bool,
}

impl Default for SyncReport {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncReport {
    pub fn new() -> Self {
        Self {
            sync_date: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            events: Vec::new(),
            cancelled: false,
        }
    }

    pub fn push(&mut self, event: SyncEvent) {
        self.events.push(event);
    }

    /// Totals for every phase, in execution order, including empty ones
    pub fn summary(&self) -> Vec<PhaseSummary> {
        ObjectKind::all()
            .iter()
            .map(|kind| {
                let mut summary = PhaseSummary {
                    kind: Some(*kind),
                    ..Default::default()
                };
                for event in self.events.iter().filter(|e| e.kind == *kind) {
                    summary.record(&event.outcome);
                }
                summary
            })
            .collect()
    }

    /// Totals across all phases
    pub fn totals(&self) -> PhaseSummary {
        let mut totals = PhaseSummary::default();
        for event in &self.events {
            totals.record(&event.outcome);
        }
        totals
    }

    pub fn failures(&self) -> impl Iterator<Item = &SyncEvent> {
        self.events.iter().filter(|e| e.outcome.is_failed())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::types::SkipReason;

    fn event(kind: ObjectKind, name: &str, outcome: SyncOutcome) -> SyncEvent {
        SyncEvent {
            kind,
            entity: "oap_country".to_string(),
            name: name.to_string(),
            outcome,
            detail: None,
        }
    }

    fn sample() -> SyncReport {
        let mut report = SyncReport::new();
        report.push(event(ObjectKind::Entity, "oap_country", SyncOutcome::Created));
        report.push(event(
            ObjectKind::Attribute,
            "oap_active",
            SyncOutcome::Skipped {
                reason: SkipReason::AlreadyExists,
            },
        ));
        report.push(event(
            ObjectKind::Attribute,
            "oap_capital",
            SyncOutcome::Failed {
                error: "Duplicate (HTTP 400)".to_string(),
            },
        ));
        report
    }

    #[test]
    fn test_summary_per_phase() {
        let summary = sample().summary();
        assert_eq!(summary.len(), ObjectKind::all().len());

        assert_eq!(summary[0].kind, Some(ObjectKind::Entity));
        assert_eq!(summary[0].created, 1);

        assert_eq!(summary[1].kind, Some(ObjectKind::Attribute));
        assert_eq!((summary[1].skipped, summary[1].failed), (1, 1));
        assert_eq!(summary[1].total(), 2);

        assert_eq!(summary[4].total(), 0);
    }

    #[test]
    fn test_failures_listed_individually() {
        let report = sample();
        assert!(report.has_failures());
        let failed: Vec<&str> = report.failures().map(|e| e.name.as_str()).collect();
        assert_eq!(failed, vec!["oap_capital"]);

        let totals = report.totals();
        assert_eq!((totals.created, totals.skipped, totals.failed), (1, 1, 1));
    }

    #[test]
    fn test_json_output() {
        let json: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        assert_eq!(json["cancelled"], false);
        assert_eq!(json["events"][2]["outcome"]["status"], "failed");
        assert_eq!(json["events"][0]["kind"], "entity");
    }

    #[test]
    fn test_empty_report() {
        let report = SyncReport::default();
        assert!(!report.has_failures());
        assert_eq!(report.totals().total(), 0);
    }
}
