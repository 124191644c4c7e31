//! Conversion of an amount of any currency into Chaos Orbs
//!
//! Currency pairs form a directed graph: an edge `A -> B` says one `A`
//! sold for `mean` units of `B`, backed by `count` sales. A path's score
//! is the smallest count along it; the best-scored path to the canonical
//! unit wins and its rate is the product of the means.

use super::currency_names::CANONICAL_CURRENCY;
use crate::error::Result;
use crate::store::ValuationStore;
use crate::types::CurrencyPairStat;

/// Longest chain of pairs considered when looking for a route
pub const MAX_CONVERSION_HOPS: usize = 2;

/// Read access to currency pair statistics
pub trait ConversionGraph {
    /// Edges leaving `from`, highest count first
    fn edges_from(&self, from: &str) -> Result<Vec<CurrencyPairStat>>;

    fn edge(&self, from: &str, to: &str) -> Result<Option<CurrencyPairStat>>;
}

impl<S: ValuationStore + ?Sized> ConversionGraph for S {
    fn edges_from(&self, from: &str) -> Result<Vec<CurrencyPairStat>> {
        self.find_currency_pairs_from(from)
    }

    fn edge(&self, from: &str, to: &str) -> Result<Option<CurrencyPairStat>> {
        self.find_currency_pair(from, to)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Route {
    score: i64,
    rate: f64,
}

impl Route {
    fn direct(edge: &CurrencyPairStat) -> Self {
        Self {
            score: edge.count,
            rate: edge.mean,
        }
    }

    fn through(edge: &CurrencyPairStat, tail: Route) -> Self {
        Self {
            score: edge.count.min(tail.score),
            rate: edge.mean * tail.rate,
        }
    }
}

fn beats(candidate: &Route, best: Option<&Route>) -> bool {
    best.map_or(true, |best| candidate.score > best.score)
}

#[derive(Debug, Clone)]
pub struct ValueResolver {
    max_hops: usize,
}

impl Default for ValueResolver {
    fn default() -> Self {
        Self {
            max_hops: MAX_CONVERSION_HOPS,
        }
    }
}

impl ValueResolver {
    pub fn with_max_hops(max_hops: usize) -> Self {
        Self {
            max_hops: max_hops.max(1),
        }
    }

    /// Value of `amount` units of `currency` in Chaos Orbs
    ///
    /// Returns `None` when no forward route exists and no reverse
    /// (`Chaos Orb -> currency`) pair with a non-zero mean is known.
    pub fn value_in_canonical<G: ConversionGraph + ?Sized>(
        &self,
        graph: &G,
        currency: &str,
        amount: f64,
    ) -> Result<Option<f64>> {
        if currency == CANONICAL_CURRENCY {
            return Ok(Some(amount));
        }

        if let Some(route) = self.best_forward_route(graph, currency)? {
            log::debug!(
                "{} -> {}: rate {:.4} (score {})",
                currency,
                CANONICAL_CURRENCY,
                route.rate,
                route.score
            );
            return Ok(Some(route.rate * amount));
        }

        match graph.edge(CANONICAL_CURRENCY, currency)? {
            Some(reverse) if reverse.mean != 0.0 => {
                log::debug!(
                    "{} valued through reverse pair (mean {:.4})",
                    currency,
                    reverse.mean
                );
                Ok(Some(amount / reverse.mean))
            }
            _ => {
                log::debug!("No conversion route for {}", currency);
                Ok(None)
            }
        }
    }

    /// Walk the edges out of `currency` in descending count order
    ///
    /// The first direct edge to the canonical unit ends the walk: it is
    /// taken when its count is at least the best score seen so far.
    /// Multi-hop routes replace the best only with a strictly higher
    /// score, so earlier candidates win ties among them.
    fn best_forward_route<G: ConversionGraph + ?Sized>(
        &self,
        graph: &G,
        currency: &str,
    ) -> Result<Option<Route>> {
        let mut best: Option<Route> = None;
        // routes never pass back through the origin
        let mut visited = vec![currency.to_string()];

        for edge in graph.edges_from(currency)? {
            if edge.to_currency == CANONICAL_CURRENCY {
                if best.map_or(true, |b| edge.count >= b.score) {
                    best = Some(Route::direct(&edge));
                }
                break;
            }

            if self.max_hops < 2 {
                continue;
            }

            if let Some(tail) =
                self.best_tail(graph, &edge.to_currency, self.max_hops - 1, &mut visited)?
            {
                let candidate = Route::through(&edge, tail);
                if beats(&candidate, best.as_ref()) {
                    best = Some(candidate);
                }
            }
        }

        Ok(best)
    }

    /// Best route from `node` to the canonical unit in at most `hops` edges
    ///
    /// The final hop is always a point lookup of `node -> Chaos Orb`.
    fn best_tail<G: ConversionGraph + ?Sized>(
        &self,
        graph: &G,
        node: &str,
        hops: usize,
        visited: &mut Vec<String>,
    ) -> Result<Option<Route>> {
        if visited.iter().any(|v| v == node) {
            return Ok(None);
        }

        let mut best = graph
            .edge(node, CANONICAL_CURRENCY)?
            .map(|edge| Route::direct(&edge));

        if hops <= 1 {
            return Ok(best);
        }

        visited.push(node.to_string());
        for edge in graph.edges_from(node)? {
            if edge.to_currency == CANONICAL_CURRENCY {
                continue;
            }
            if let Some(tail) = self.best_tail(graph, &edge.to_currency, hops - 1, visited)? {
                let candidate = Route::through(&edge, tail);
                if beats(&candidate, best.as_ref()) {
                    best = Some(candidate);
                }
            }
        }
        visited.pop();

        Ok(best)
    }
}
