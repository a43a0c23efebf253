//! TLD sweeps: find the cheapest registration across TLD variants of a name.

use crate::aggregator::{is_cheaper, QuoteAggregator};
use crate::error::DomainPriceError;
use crate::types::{
    AggregateResult, DomainName, PriceConfig, ProgressEvent, ProgressSink, Quote, SweepEntry,
    SweepResult,
};
use crate::utils::{normalize_tld, root_label};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

/// Runs a [`QuoteAggregator`] over every TLD candidate of a base name.
///
/// Candidates are checked with bounded concurrency; results are collected
/// first and folded afterwards in candidate order, so the running minimum and
/// its tie-breaks do not depend on which lookup finished first.
#[derive(Clone)]
pub struct TldSweeper {
    aggregator: QuoteAggregator,
    concurrency: usize,
}

impl TldSweeper {
    pub fn new(aggregator: QuoteAggregator, concurrency: usize) -> Self {
        Self {
            aggregator,
            concurrency: concurrency.max(1),
        }
    }

    pub fn from_config(config: &PriceConfig) -> Result<Self, DomainPriceError> {
        Ok(Self::new(
            QuoteAggregator::from_config(config)?,
            config.concurrency,
        ))
    }

    pub fn aggregator(&self) -> &QuoteAggregator {
        &self.aggregator
    }

    /// Check `<root>.<tld>` for every candidate, where `<root>` is the part of
    /// `base_name` before its first '.'.
    ///
    /// Candidates may be given with or without a leading dot. All candidates
    /// are validated before any lookup starts; duplicates are checked once.
    pub async fn sweep(
        &self,
        base_name: &str,
        tld_candidates: &[String],
    ) -> Result<SweepResult, DomainPriceError> {
        self.sweep_with_progress(base_name, tld_candidates, None).await
    }

    /// Like [`sweep`](Self::sweep), reporting milestones to `progress`.
    pub async fn sweep_with_progress(
        &self,
        base_name: &str,
        tld_candidates: &[String],
        progress: Option<&ProgressSink>,
    ) -> Result<SweepResult, DomainPriceError> {
        let domains = candidate_domains(base_name, tld_candidates)?;
        let total = domains.len();
        debug!(base_name, candidates = total, "Starting sweep");

        let completed = AtomicUsize::new(0);
        let completed = &completed;
        let aggregator = &self.aggregator;

        let mut collected: Vec<(usize, AggregateResult)> =
            stream::iter(domains.into_iter().enumerate())
                .map(|(index, domain)| async move {
                    let result = aggregator.aggregate_with_progress(&domain, progress).await;
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(sink) = progress {
                        sink(ProgressEvent::DomainDone {
                            domain,
                            completed: done,
                            total,
                        });
                    }
                    (index, result)
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        // merge after collect: restore candidate order before folding
        collected.sort_by_key(|(index, _)| *index);

        let result = fold_sweep(base_name, collected.into_iter().map(|(_, r)| r));
        match (&result.cheapest_domain, &result.cheapest_quote) {
            (Some(domain), Some(quote)) => info!(
                base_name,
                cheapest = %domain,
                registrar = %quote.registrar(),
                price = ?quote.amount(),
                "Sweep finished"
            ),
            _ => info!(base_name, candidates = total, "Sweep finished without a priced offer"),
        }

        Ok(result)
    }
}

/// Expand a base name and TLD candidates into validated, de-duplicated
/// domain names in candidate order.
pub fn candidate_domains(
    base_name: &str,
    tld_candidates: &[String],
) -> Result<Vec<DomainName>, DomainPriceError> {
    let root = root_label(base_name)?;
    let mut domains: Vec<DomainName> = Vec::with_capacity(tld_candidates.len());

    for candidate in tld_candidates {
        let tld = normalize_tld(candidate)?;
        let domain = DomainName::parse(&format!("{}.{}", root, tld))?;
        if !domains.contains(&domain) {
            domains.push(domain);
        }
    }

    Ok(domains)
}

/// Fold per-domain results, in order, into a sweep result with its running
/// minimum.
fn fold_sweep<I>(base_name: &str, results: I) -> SweepResult
where
    I: IntoIterator<Item = AggregateResult>,
{
    let mut entries = Vec::new();
    let mut cheapest: Option<Quote> = None;

    for aggregate in results {
        if let Some(best) = &aggregate.best_quote {
            if is_cheaper(best, cheapest.as_ref()) {
                cheapest = Some(best.clone());
            }
        }

        entries.push(SweepEntry {
            domain: aggregate.domain.clone(),
            price: aggregate.best_quote.as_ref().and_then(Quote::amount),
            registrar: aggregate.best_quote.as_ref().map(|q| q.registrar().clone()),
            aggregate,
        });
    }

    SweepResult {
        base_name: base_name.to_string(),
        entries,
        cheapest_domain: cheapest.as_ref().map(|q| q.domain().clone()),
        cheapest_quote: cheapest,
    }
}
