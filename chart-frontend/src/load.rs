//! Drives one symbol load: the series stream and the overview request run
//! side by side, so a hung series fetch never holds back the overview panel.

use std::future::Future;

use data_feed::{DataEvent, DataStream};
use futures_util::future;
use futures_util::StreamExt;

/// Feed every series event to `on_event` while `overview` runs concurrently.
/// Completes once both are done.
pub async fn run_load<E, O>(events: DataStream<'_>, mut on_event: E, overview: O)
where
    E: FnMut(DataEvent),
    O: Future<Output = ()>,
{
    let series = events.for_each(|event| {
        on_event(event);
        future::ready(())
    });
    future::join(series, overview).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use data_feed::FetchTicket;
    use futures_util::stream;
    use futures_util::FutureExt;
    use ts_core::{Granularity, RawBar};

    #[test]
    fn overview_completes_while_a_series_fetch_hangs() {
        let ticket = FetchTicket {
            symbol: "AAPL".into(),
            generation: 1,
        };
        let loaded = DataEvent::SeriesLoaded {
            ticket,
            granularity: Granularity::Yearly,
            bars: vec![RawBar::new(1, 1.0, 2.0, 0.5, 1.5, 10.0)],
        };
        // One fetch answers, the next never does.
        let events: DataStream<'_> = Box::pin(stream::iter([loaded]).chain(stream::pending()));
        let applied = Cell::new(0);
        let overview_done = Cell::new(false);

        let load = run_load(
            events,
            |_| applied.set(applied.get() + 1),
            async { overview_done.set(true) },
        );
        assert!(load.now_or_never().is_none());
        assert_eq!(applied.get(), 1);
        assert!(overview_done.get());
    }

    #[test]
    fn finishes_when_both_sides_finish() {
        let events: DataStream<'_> = Box::pin(stream::iter([DataEvent::Reset]));
        let mut seen = Vec::new();
        let done = run_load(events, |ev| seen.push(ev), future::ready(())).now_or_never();
        assert!(done.is_some());
        assert_eq!(seen, vec![DataEvent::Reset]);
    }
}
