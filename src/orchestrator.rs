// Search orchestration: drives the destination x window matrix for one run
use crate::config::RunConfig;
use crate::offer::{FlightDeal, OfferParser, RawOffer};
use crate::rate_limit::{Clock, RateLimiter, TokioClock};
use crate::search::{FlightSearchClient, SearchQuery};
use crate::windows::DateWindow;
use rust_decimal::Decimal;
use tracing::{info, warn};

// Counters for one run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SearchStats {
    pub searches_attempted: usize,
    pub searches_failed: usize,
    pub offers_received: usize,
    pub offers_over_threshold: usize,
    pub offers_skipped: usize,
}

/// Everything discovered in one run, in discovery order
/// (destination-major, then window, then offer order).
#[derive(Debug, Clone)]
pub struct DealDigest {
    pub origin: String,
    pub deals: Vec<FlightDeal>,
    pub threshold: Decimal,
    pub currency: String,
    pub destinations_searched: usize,
    pub stats: SearchStats,
}

impl DealDigest {
    pub fn is_empty(&self) -> bool {
        self.deals.is_empty()
    }

    pub fn deal_count(&self) -> usize {
        self.deals.len()
    }
}

pub struct SearchOrchestrator<S: FlightSearchClient, C: Clock = TokioClock> {
    client: S,
    limiter: RateLimiter<C>,
    parser: OfferParser,
}

impl<S: FlightSearchClient> SearchOrchestrator<S, TokioClock> {
    pub fn new(client: S, limiter: RateLimiter<TokioClock>) -> Self {
        Self::with_limiter(client, limiter)
    }
}

impl<S: FlightSearchClient, C: Clock> SearchOrchestrator<S, C> {
    pub fn with_limiter(client: S, limiter: RateLimiter<C>) -> Self {
        Self {
            client,
            limiter,
            parser: OfferParser::new(),
        }
    }

    pub fn client(&self) -> &S {
        &self.client
    }

    pub fn limiter(&self) -> &RateLimiter<C> {
        &self.limiter
    }

    // Query every destination/window cell exactly once. A failed search or a
    // bad offer only loses its own contribution.
    pub async fn run(&mut self, config: &RunConfig, windows: &[DateWindow]) -> DealDigest {
        let mut deals: Vec<FlightDeal> = Vec::new();
        let mut stats = SearchStats::default();

        for destination in &config.destinations {
            for window in windows {
                let query =
                    SearchQuery::new(&config.origin, destination, *window, &config.currency);
                info!(
                    destination = %destination,
                    departure = %window.departure_date,
                    return_date = %window.return_date,
                    "Searching flights"
                );

                self.limiter.acquire().await;
                stats.searches_attempted += 1;

                let result = self.client.search(&query).await;
                self.limiter.record_call();

                let offers = match result {
                    Ok(offers) => offers,
                    Err(e) => {
                        warn!(
                            destination = %destination,
                            departure = %window.departure_date,
                            error = %e,
                            "Search failed, skipping"
                        );
                        stats.searches_failed += 1;
                        continue;
                    }
                };

                let found = self.collect_deals(config, &query, &offers, &mut stats);
                if !found.is_empty() {
                    info!(destination = %destination, count = found.len(), "Deals found");
                }
                deals.extend(found);
            }
        }

        info!(
            searches = stats.searches_attempted,
            failed = stats.searches_failed,
            offers = stats.offers_received,
            deals = deals.len(),
            "Search run complete"
        );

        DealDigest {
            origin: config.origin.clone(),
            deals,
            threshold: config.price_threshold,
            currency: config.currency.clone(),
            destinations_searched: config.destinations.len(),
            stats,
        }
    }

    // Price filter, then parse; keeps offer order
    fn collect_deals(
        &self,
        config: &RunConfig,
        query: &SearchQuery,
        offers: &[RawOffer],
        stats: &mut SearchStats,
    ) -> Vec<FlightDeal> {
        let mut found = Vec::new();

        for offer in offers {
            stats.offers_received += 1;

            let price = match offer.total_price() {
                Ok(price) => price,
                Err(e) => {
                    warn!(offer_id = ?offer.id, error = %e, "Skipping offer");
                    stats.offers_skipped += 1;
                    continue;
                }
            };
            if price > config.price_threshold {
                stats.offers_over_threshold += 1;
                continue;
            }

            match self.parser.parse(offer, &query.destination, query.window) {
                Ok(deal) if deal.currency != config.currency => {
                    warn!(
                        offer_id = ?offer.id,
                        currency = %deal.currency,
                        expected = %config.currency,
                        "Skipping offer priced in another currency"
                    );
                    stats.offers_skipped += 1;
                }
                Ok(deal) => found.push(deal),
                Err(e) => {
                    warn!(offer_id = ?offer.id, error = %e, "Skipping malformed offer");
                    stats.offers_skipped += 1;
                }
            }
        }

        found
    }
}
