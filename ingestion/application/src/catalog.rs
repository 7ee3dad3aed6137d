use crate::ports::{MarketDataProvider, ProviderError};
use async_trait::async_trait;
use ingestion_domain::{Instrument, Segment};
use shaku::{Component, Interface};
use std::sync::Arc;
use tracing::{debug, error, info};

#[async_trait]
pub trait InstrumentCatalog: Interface {
    async fn list_instruments(&self) -> Result<Vec<Instrument>, CatalogError>;

    /// Current instrument set; an unreachable provider yields an empty catalog.
    async fn snapshot(&self) -> Catalog {
        match self.list_instruments().await {
            Ok(instruments) => {
                let catalog = Catalog::new(instruments);
                info!(
                    "Retrieved {} regular and {} weekend instruments",
                    catalog.count(Segment::Regular),
                    catalog.count(Segment::Weekend)
                );
                catalog
            }
            Err(e) => {
                error!("Failed to retrieve instrument lists: {}", e);
                Catalog::default()
            }
        }
    }
}

#[derive(Component)]
#[shaku(interface = InstrumentCatalog)]
pub struct InstrumentCatalogImpl {
    #[shaku(inject)]
    provider: Arc<dyn MarketDataProvider>,
}

impl InstrumentCatalogImpl {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl InstrumentCatalog for InstrumentCatalogImpl {
    async fn list_instruments(&self) -> Result<Vec<Instrument>, CatalogError> {
        let instruments = self
            .provider
            .list_instruments()
            .await
            .map_err(CatalogError::ProviderUnavailable)?;

        for instrument in &instruments {
            debug!("Instrument: {:?}", instrument);
        }

        Ok(instruments)
    }
}

/// Instruments resolved for one boundary, in provider order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    instruments: Vec<Instrument>,
}

impl Catalog {
    pub fn new(instruments: Vec<Instrument>) -> Self {
        Self { instruments }
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn in_segment(&self, segment: Segment) -> impl Iterator<Item = &Instrument> + '_ {
        self.instruments
            .iter()
            .filter(move |instrument| instrument.belongs_to(segment))
    }

    pub fn count(&self, segment: Segment) -> usize {
        self.in_segment(segment).count()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(#[source] ProviderError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingestion_domain::TradingStatus;

    #[test]
    fn test_segment_selection_keeps_order() {
        let catalog = Catalog::new(vec![
            Instrument::new("F-A", "AAA", TradingStatus::NormalTrading, false),
            Instrument::new("F-B", "BBB", TradingStatus::NotAvailableForTrading, true),
            Instrument::new("F-C", "CCC", TradingStatus::BreakInTrading, true),
            Instrument::new("F-D", "DDD", TradingStatus::ClosingAuction, false),
        ]);

        let regular: Vec<&str> = catalog
            .in_segment(Segment::Regular)
            .map(|i| i.ticker())
            .collect();
        let weekend: Vec<&str> = catalog
            .in_segment(Segment::Weekend)
            .map(|i| i.ticker())
            .collect();

        assert_eq!(regular, vec!["AAA", "CCC"]);
        assert_eq!(weekend, vec!["BBB", "CCC"]);
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = Catalog::default();
        assert!(catalog.is_empty());
        assert_eq!(catalog.count(Segment::Regular), 0);
    }
}
