// ── Batch runner ──
//
// Applies one operation to many sites, strictly one after another. A
// failing site is recorded and the run moves on; nothing is retried.

use std::fmt::Display;

use tracing::{debug, warn};

use crate::model::Domain;

/// Result for one site of a batch.
#[derive(Debug)]
pub struct BatchEntry<T, E> {
    pub domain: Domain,
    pub result: Result<T, E>,
}

/// Per-site results in execution order.
#[derive(Debug)]
pub struct BatchReport<T, E> {
    pub entries: Vec<BatchEntry<T, E>>,
}

impl<T, E> BatchReport<T, E> {
    pub fn succeeded(&self) -> impl Iterator<Item = &BatchEntry<T, E>> {
        self.entries.iter().filter(|e| e.result.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &BatchEntry<T, E>> {
        self.entries.iter().filter(|e| e.result.is_err())
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchRunner;

impl BatchRunner {
    /// Run `op` for each domain in order, continuing past failures.
    pub fn run<T, E, I, F>(self, domains: I, mut op: F) -> BatchReport<T, E>
    where
        I: IntoIterator<Item = Domain>,
        F: FnMut(&Domain) -> Result<T, E>,
        E: Display,
    {
        let entries = domains
            .into_iter()
            .map(|domain| {
                debug!(%domain, "batch: processing site");
                let result = op(&domain);
                if let Err(e) = &result {
                    warn!(%domain, error = %e, "batch: site failed, continuing");
                }
                BatchEntry { domain, result }
            })
            .collect();
        BatchReport { entries }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn domains(names: &[&str]) -> Vec<Domain> {
        names.iter().map(|n| Domain::parse(n).unwrap()).collect()
    }

    #[test]
    fn continues_after_failure_and_keeps_order() {
        let mut seen = Vec::new();
        let report = BatchRunner.run(domains(&["a.com", "b.com", "c.com"]), |d| {
            seen.push(d.to_string());
            if d.as_str() == "b.com" {
                Err("boom")
            } else {
                Ok(d.as_str().len())
            }
        });

        assert_eq!(seen, ["a.com", "b.com", "c.com"]);
        assert_eq!(report.len(), 3);
        assert!(report.has_failures());
        let failed: Vec<_> = report.failed().map(|e| e.domain.as_str()).collect();
        assert_eq!(failed, ["b.com"]);
        assert_eq!(report.succeeded().count(), 2);
    }

    #[test]
    fn empty_batch() {
        let report: BatchReport<(), String> = BatchRunner.run(Vec::new(), |_| Ok(()));
        assert!(report.is_empty());
        assert!(!report.has_failures());
    }
}
