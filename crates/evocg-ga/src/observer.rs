//! Per-generation progress reporting.

use evocg_core::Stats;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Which of the two nested searches produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchKind {
    Selection,
    Scheduling,
}

impl std::fmt::Display for SearchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchKind::Selection => write!(f, "selection"),
            SearchKind::Scheduling => write!(f, "scheduling"),
        }
    }
}

/// State of a search after one generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub search: SearchKind,
    pub generation: u64,
    pub best_objective: f64,
    pub best_valid: bool,
    pub objective: Stats,
    pub fitness: Option<Stats>,
    pub diversity: Option<f64>,
}

/// Receives a report after every computed generation
pub trait GenerationObserver {
    fn generation_computed(&mut self, report: &GenerationReport);
}

/// Discards every report
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl GenerationObserver for NoopObserver {
    fn generation_computed(&mut self, _report: &GenerationReport) {}
}

/// Emits reports as structured tracing events.
///
/// Selection generations log at info level; the far more frequent
/// scheduling generations log at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl GenerationObserver for TracingObserver {
    fn generation_computed(&mut self, report: &GenerationReport) {
        match report.search {
            SearchKind::Selection => info!(
                event = "generation_computed",
                search = %report.search,
                generation = report.generation,
                best = report.best_objective,
                valid = report.best_valid,
                mean = report.objective.mean,
                deviation = report.objective.deviation,
                diversity = report.diversity,
                "generation computed"
            ),
            SearchKind::Scheduling => debug!(
                event = "generation_computed",
                search = %report.search,
                generation = report.generation,
                best = report.best_objective,
                valid = report.best_valid,
                mean = report.objective.mean,
                "generation computed"
            ),
        }
    }
}

/// Keeps every report in memory
#[derive(Debug, Clone, Default)]
pub struct CollectingObserver {
    pub reports: Vec<GenerationReport>,
}

impl CollectingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of_kind(&self, search: SearchKind) -> impl Iterator<Item = &GenerationReport> {
        self.reports.iter().filter(move |r| r.search == search)
    }
}

impl GenerationObserver for CollectingObserver {
    fn generation_computed(&mut self, report: &GenerationReport) {
        self.reports.push(report.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(search: SearchKind, generation: u64) -> GenerationReport {
        GenerationReport {
            search,
            generation,
            best_objective: 1.0,
            best_valid: true,
            objective: Stats::default(),
            fitness: None,
            diversity: None,
        }
    }

    #[test]
    fn test_collecting_observer_filters_by_kind() {
        let mut observer = CollectingObserver::new();
        observer.generation_computed(&report(SearchKind::Selection, 0));
        observer.generation_computed(&report(SearchKind::Scheduling, 0));
        observer.generation_computed(&report(SearchKind::Scheduling, 1));
        assert_eq!(observer.reports.len(), 3);
        assert_eq!(observer.of_kind(SearchKind::Scheduling).count(), 2);
    }

    #[test]
    fn test_search_kind_display() {
        assert_eq!(SearchKind::Selection.to_string(), "selection");
    }
}
