//! Result reporting.
//!
//! The `Reporter` is installed with `Search::set_reporter` and therefore sees every
//! event after all other listeners. It feeds a shared `Statistics`, drives the probe
//! timer and forwards the interesting events to a list of publishers.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, trace, warn};

use crate::listener::{ListenerResult, SearchListener};
use crate::probe::ProbeTimer;
use crate::record::{ErrorRecord, ErrorSummary};
use crate::search::SearchRun;
use crate::stats::{SearchStats, Statistics};

/// Output channel for search results.
pub trait Publisher {
    fn name(&self) -> &'static str;

    fn publish_start(&mut self, _run: &SearchRun) -> ListenerResult {
        Ok(())
    }

    fn publish_transition(&mut self, _run: &SearchRun) -> ListenerResult {
        Ok(())
    }

    fn publish_constraint_hit(&mut self, _run: &SearchRun, _constraint: &str) -> ListenerResult {
        Ok(())
    }

    fn publish_property_violation(
        &mut self,
        _run: &SearchRun,
        _error: &ErrorRecord,
    ) -> ListenerResult {
        Ok(())
    }

    fn publish_probe(&mut self, _run: &SearchRun, _stats: &SearchStats) -> ListenerResult {
        Ok(())
    }

    fn publish_finished(&mut self, _run: &SearchRun, _report: &SearchReport) -> ListenerResult {
        Ok(())
    }
}

/// Final result of a search run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchReport {
    pub depth: usize,
    pub constraint: Option<String>,
    pub stats: SearchStats,
    pub errors: Vec<ErrorSummary>,
}

impl SearchReport {
    fn collect(run: &SearchRun, stats: &SearchStats) -> Self {
        Self {
            depth: run.depth(),
            constraint: run.last_constraint().map(str::to_string),
            stats: stats.clone(),
            errors: run.errors().iter().map(ErrorRecord::summary).collect(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Publishes through `tracing`.
#[derive(Debug, Default)]
pub struct TracingPublisher;

impl Publisher for TracingPublisher {
    fn name(&self) -> &'static str {
        "tracing"
    }

    fn publish_start(&mut self, run: &SearchRun) -> ListenerResult {
        info!(
            depth_limit = run.depth_limit(),
            continue_on_violation = run.config().continue_on_violation,
            "search started"
        );
        Ok(())
    }

    fn publish_transition(&mut self, run: &SearchRun) -> ListenerResult {
        trace!(depth = run.depth(), state_id = run.state_id(), "transition");
        Ok(())
    }

    fn publish_constraint_hit(&mut self, run: &SearchRun, constraint: &str) -> ListenerResult {
        warn!(constraint, depth = run.depth(), "search constraint hit");
        Ok(())
    }

    fn publish_property_violation(
        &mut self,
        _run: &SearchRun,
        error: &ErrorRecord,
    ) -> ListenerResult {
        warn!(
            id = error.id(),
            property = %error.property_name(),
            path_length = error.path().borrow().len(),
            "property violation"
        );
        Ok(())
    }

    fn publish_probe(&mut self, run: &SearchRun, stats: &SearchStats) -> ListenerResult {
        info!(
            depth = run.depth(),
            max_depth = stats.max_depth,
            new_states = stats.new_states,
            visited_states = stats.visited_states,
            backtracked = stats.backtracked,
            elapsed_secs = stats.elapsed_secs,
            "search progress"
        );
        Ok(())
    }

    fn publish_finished(&mut self, _run: &SearchRun, report: &SearchReport) -> ListenerResult {
        info!(
            errors = report.errors.len(),
            max_depth = report.stats.max_depth,
            new_states = report.stats.new_states,
            end_states = report.stats.end_states,
            elapsed_secs = report.stats.elapsed_secs,
            "search results"
        );
        Ok(())
    }
}

/// Writes the final `SearchReport` as JSON.
pub struct JsonPublisher<W> {
    writer: W,
}

impl<W: Write> JsonPublisher<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Publisher for JsonPublisher<W> {
    fn name(&self) -> &'static str {
        "json"
    }

    fn publish_finished(&mut self, _run: &SearchRun, report: &SearchReport) -> ListenerResult {
        serde_json::to_writer_pretty(&mut self.writer, report)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Aggregates statistics and hands results to its publishers.
pub struct Reporter {
    statistics: Rc<RefCell<Statistics>>,
    publishers: Vec<Box<dyn Publisher>>,
    timer: Option<ProbeTimer>,
    last_report: Option<SearchReport>,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter {
    pub fn new() -> Self {
        Self::with_statistics(Rc::new(RefCell::new(Statistics::new())))
    }

    /// Reporter feeding a statistics handle the caller keeps.
    pub fn with_statistics(statistics: Rc<RefCell<Statistics>>) -> Self {
        Self {
            statistics,
            publishers: Vec::new(),
            timer: None,
            last_report: None,
        }
    }

    pub fn with_publisher<P: Publisher + 'static>(mut self, publisher: P) -> Self {
        self.publishers.push(Box::new(publisher));
        self
    }

    pub fn statistics(&self) -> Rc<RefCell<Statistics>> {
        self.statistics.clone()
    }

    pub fn stats(&self) -> SearchStats {
        self.statistics.borrow().stats().clone()
    }

    /// Report built at the last `searchFinished`.
    pub fn last_report(&self) -> Option<&SearchReport> {
        self.last_report.as_ref()
    }

    fn publish<F>(&mut self, mut f: F) -> ListenerResult
    where
        F: FnMut(&mut dyn Publisher) -> ListenerResult,
    {
        for publisher in self.publishers.iter_mut() {
            f(publisher.as_mut())?;
        }
        Ok(())
    }
}

impl SearchListener for Reporter {
    fn name(&self) -> &'static str {
        "reporter"
    }

    fn search_started(&mut self, run: &mut SearchRun) -> ListenerResult {
        self.statistics.borrow_mut().search_started(run)?;
        self.last_report = None;
        if let Some(interval) = run.config().probe_interval_ms {
            self.timer = Some(ProbeTimer::start(
                run.probe_handle(),
                Duration::from_millis(interval),
            ));
        }
        self.publish(|p| p.publish_start(run))
    }

    fn state_advanced(&mut self, run: &mut SearchRun) -> ListenerResult {
        self.statistics.borrow_mut().state_advanced(run)?;
        self.publish(|p| p.publish_transition(run))
    }

    fn state_processed(&mut self, run: &mut SearchRun) -> ListenerResult {
        self.statistics.borrow_mut().state_processed(run)
    }

    fn state_backtracked(&mut self, run: &mut SearchRun) -> ListenerResult {
        self.statistics.borrow_mut().state_backtracked(run)
    }

    fn state_stored(&mut self, run: &mut SearchRun) -> ListenerResult {
        self.statistics.borrow_mut().state_stored(run)
    }

    fn state_restored(&mut self, run: &mut SearchRun) -> ListenerResult {
        self.statistics.borrow_mut().state_restored(run)
    }

    fn property_violated(&mut self, run: &mut SearchRun) -> ListenerResult {
        self.statistics.borrow_mut().property_violated(run)?;
        let Some(error) = run.current_error().or_else(|| run.last_error()) else {
            return Ok(());
        };
        let error = error.clone();
        self.publish(|p| p.publish_property_violation(run, &error))
    }

    fn search_constraint_hit(&mut self, run: &mut SearchRun) -> ListenerResult {
        self.statistics.borrow_mut().search_constraint_hit(run)?;
        let constraint = run.last_constraint().unwrap_or_default().to_string();
        self.publish(|p| p.publish_constraint_hit(run, &constraint))
    }

    fn search_probed(&mut self, run: &mut SearchRun) -> ListenerResult {
        self.statistics.borrow_mut().search_probed(run)?;
        let stats = self.stats();
        self.publish(|p| p.publish_probe(run, &stats))
    }

    fn search_finished(&mut self, run: &mut SearchRun) -> ListenerResult {
        if let Some(mut timer) = self.timer.take() {
            timer.stop();
        }
        self.statistics.borrow_mut().search_finished(run)?;
        let report = SearchReport::collect(run, &self.stats());
        let result = self.publish(|p| p.publish_finished(run, &report));
        self.last_report = Some(report);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_is_clean_without_errors() {
        let report = SearchReport {
            depth: 3,
            constraint: None,
            stats: SearchStats::default(),
            errors: Vec::new(),
        };
        assert!(report.is_clean());
        let json = serde_json::to_string(&report).unwrap();
        let back: SearchReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_reporter_names() {
        let reporter = Reporter::new().with_publisher(TracingPublisher);
        assert_eq!(reporter.name(), "reporter");
        assert_eq!(reporter.publishers[0].name(), "tracing");
        assert_eq!(reporter.stats().transitions(), 0);
    }
}
