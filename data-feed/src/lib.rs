use std::fmt::Display;
use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ts_core::{Granularity, RawBar};

/// Monotonic request generation; bumped on every symbol switch.
pub type Generation = u64;

/// Identity of one load: results are committed only while it is current.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchTicket {
    pub symbol: String,
    pub generation: Generation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataEvent {
    /// Full replacement of one granularity's bars.
    SeriesLoaded {
        ticket: FetchTicket,
        granularity: Granularity,
        bars: Vec<RawBar>,
    },
    /// Drop everything held for the current symbol.
    Reset,
}

/// Consumer interface for feed events.
pub trait DataSink {
    fn on_event(&mut self, event: DataEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// The ticket belongs to an earlier symbol selection; nothing was written.
    Stale,
}

/// Bars per granularity for the current symbol.
///
/// A write replaces the whole sequence for that granularity; there is no
/// merging of overlapping ranges.
#[derive(Debug, Default)]
pub struct DataStore {
    series: [Option<Vec<RawBar>>; 5],
    ticket: Option<FetchTicket>,
    last_generation: Generation,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bars for `granularity`, empty if never populated.
    pub fn get(&self, granularity: Granularity) -> &[RawBar] {
        self.series[granularity.index()].as_deref().unwrap_or(&[])
    }

    /// Replace the bars for `granularity`, restoring ascending date order.
    pub fn set(&mut self, granularity: Granularity, mut bars: Vec<RawBar>) {
        if !bars.windows(2).all(|w| w[0].date <= w[1].date) {
            bars.sort_by_key(|b| b.date);
        }
        self.series[granularity.index()] = Some(bars);
    }

    pub fn is_populated(&self, granularity: Granularity) -> bool {
        self.series[granularity.index()].is_some()
    }

    pub fn populated(&self) -> Vec<Granularity> {
        Granularity::ALL
            .into_iter()
            .filter(|g| self.is_populated(*g))
            .collect()
    }

    pub fn clear(&mut self) {
        self.series = Default::default();
    }

    /// Start a new load for `symbol`: bump the generation and drop old bars.
    pub fn begin(&mut self, symbol: impl Into<String>) -> FetchTicket {
        self.last_generation += 1;
        let ticket = FetchTicket {
            symbol: symbol.into(),
            generation: self.last_generation,
        };
        self.clear();
        self.ticket = Some(ticket.clone());
        ticket
    }

    pub fn ticket(&self) -> Option<&FetchTicket> {
        self.ticket.as_ref()
    }

    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.ticket.as_ref() == Some(ticket)
    }

    pub fn commit(
        &mut self,
        ticket: &FetchTicket,
        granularity: Granularity,
        bars: Vec<RawBar>,
    ) -> CommitOutcome {
        if !self.is_current(ticket) {
            debug!(
                symbol = %ticket.symbol,
                generation = ticket.generation,
                %granularity,
                "discarding stale series"
            );
            return CommitOutcome::Stale;
        }
        debug!(symbol = %ticket.symbol, %granularity, bars = bars.len(), "series committed");
        self.set(granularity, bars);
        CommitOutcome::Committed
    }
}

impl DataSink for DataStore {
    fn on_event(&mut self, event: DataEvent) {
        match event {
            DataEvent::SeriesLoaded {
                ticket,
                granularity,
                bars,
            } => {
                let _ = self.commit(&ticket, granularity, bars);
            }
            DataEvent::Reset => self.clear(),
        }
    }
}

/// Where bars come from: concrete implementations live in platform crates.
#[async_trait(?Send)]
pub trait SeriesSource {
    type Error: Display;

    async fn fetch_series(
        &self,
        symbol: &str,
        granularity: Granularity,
    ) -> Result<Vec<RawBar>, Self::Error>;
}

pub type DataStream<'a> = Pin<Box<dyn Stream<Item = DataEvent> + 'a>>;

/// Fetch every granularity in `granularities` concurrently.
///
/// Events arrive in completion order, one per successful fetch. A failed
/// fetch is logged and yields nothing; it never holds back the others.
pub fn load_symbol<'a, S>(
    source: &'a S,
    ticket: FetchTicket,
    granularities: &[Granularity],
) -> DataStream<'a>
where
    S: SeriesSource + ?Sized,
{
    let pending: FuturesUnordered<_> = granularities
        .iter()
        .map(|&granularity| {
            let ticket = ticket.clone();
            async move {
                match source.fetch_series(&ticket.symbol, granularity).await {
                    Ok(bars) => Some(DataEvent::SeriesLoaded {
                        ticket,
                        granularity,
                        bars,
                    }),
                    Err(err) => {
                        warn!(
                            symbol = %ticket.symbol,
                            %granularity,
                            error = %err,
                            "series fetch failed; treating as no data"
                        );
                        None
                    }
                }
            }
        })
        .collect();
    Box::pin(pending.filter_map(futures::future::ready))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn bar(date: i64) -> RawBar {
        RawBar::new(date, 1.0, 2.0, 0.5, 1.5, 10.0)
    }

    #[test]
    fn empty_until_set_then_replaced_wholesale() {
        let mut store = DataStore::new();
        assert!(store.get(Granularity::Daily).is_empty());
        assert!(!store.is_populated(Granularity::Daily));

        store.set(Granularity::Daily, vec![bar(1), bar(2), bar(3)]);
        store.set(Granularity::Daily, vec![bar(7)]);
        assert_eq!(store.get(Granularity::Daily), &[bar(7)]);
        assert!(store.get(Granularity::Weekly).is_empty());
        assert_eq!(store.populated(), vec![Granularity::Daily]);
    }

    #[test]
    fn set_restores_ascending_order() {
        let mut store = DataStore::new();
        store.set(Granularity::Monthly, vec![bar(3), bar(1), bar(2)]);
        let dates: Vec<_> = store
            .get(Granularity::Monthly)
            .iter()
            .map(|b| b.date.unwrap())
            .collect();
        assert_eq!(dates, vec![1, 2, 3]);
    }

    #[test]
    fn stale_generation_is_discarded() {
        let mut store = DataStore::new();
        let first = store.begin("AAPL");
        let second = store.begin("MSFT");
        assert!(second.generation > first.generation);

        assert_eq!(
            store.commit(&first, Granularity::Yearly, vec![bar(1)]),
            CommitOutcome::Stale
        );
        assert!(store.get(Granularity::Yearly).is_empty());
        assert_eq!(
            store.commit(&second, Granularity::Yearly, vec![bar(2)]),
            CommitOutcome::Committed
        );
        assert_eq!(store.get(Granularity::Yearly), &[bar(2)]);
    }

    #[test]
    fn reselecting_same_symbol_still_invalidates() {
        let mut store = DataStore::new();
        let a = store.begin("AAPL");
        let b = store.begin("AAPL");
        assert_ne!(a, b);
        assert!(!store.is_current(&a));
        assert!(store.is_current(&b));
    }

    #[test]
    fn sink_applies_events() {
        let mut store = DataStore::new();
        let ticket = store.begin("IBM");
        store.on_event(DataEvent::SeriesLoaded {
            ticket,
            granularity: Granularity::Weekly,
            bars: vec![bar(4)],
        });
        assert!(store.is_populated(Granularity::Weekly));
        store.on_event(DataEvent::Reset);
        assert!(store.populated().is_empty());
    }

    struct FakeSource {
        calls: RefCell<Vec<Granularity>>,
    }

    #[async_trait(?Send)]
    impl SeriesSource for FakeSource {
        type Error = String;

        async fn fetch_series(
            &self,
            symbol: &str,
            granularity: Granularity,
        ) -> Result<Vec<RawBar>, Self::Error> {
            self.calls.borrow_mut().push(granularity);
            if granularity == Granularity::Intraday {
                return Err(format!("{symbol}: connection reset"));
            }
            Ok(vec![bar(granularity.index() as i64)])
        }
    }

    #[tokio::test]
    async fn loader_yields_one_event_per_successful_fetch() {
        let source = FakeSource {
            calls: RefCell::new(Vec::new()),
        };
        let ticket = FetchTicket {
            symbol: "AAPL".into(),
            generation: 1,
        };
        let events: Vec<DataEvent> = load_symbol(&source, ticket.clone(), &Granularity::ALL)
            .collect()
            .await;
        assert_eq!(source.calls.borrow().len(), 5);
        assert_eq!(events.len(), 4);
        for ev in &events {
            match ev {
                DataEvent::SeriesLoaded {
                    ticket: t,
                    granularity,
                    bars,
                } => {
                    assert_eq!(t, &ticket);
                    assert_ne!(*granularity, Granularity::Intraday);
                    assert_eq!(bars.len(), 1);
                }
                DataEvent::Reset => panic!("unexpected reset"),
            }
        }
    }
}
