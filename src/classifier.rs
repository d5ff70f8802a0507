//! Dual-timeframe decision rules.
//!
//! Rules are evaluated in order, first match wins:
//! - daily BUY and weekly BUY: buy.
//! - daily SELL and weekly BUY: protect with a stop at the daily close. If the
//!   live price is already below that close the stop would be breached on
//!   placement, so the position is sold at market instead.
//! - weekly SELL (any daily): sell.
//! - anything else: no action.

use crate::types::{Decision, Signal, TimeframeReading};

pub fn classify(daily: &TimeframeReading, weekly: &TimeframeReading) -> Option<Decision> {
    match (daily.signal, weekly.signal) {
        (Signal::Buy, Signal::Buy) => Some(Decision::Buy),
        (Signal::Sell, Signal::Buy) => {
            let close = daily.close_price?;
            match daily.market_price {
                Some(market) if close > market => Some(Decision::Sell {
                    stop_price: Some(close),
                }),
                _ => Some(Decision::SetStopLoss { stop_price: close }),
            }
        }
        (_, Signal::Sell) => Some(Decision::Sell {
            stop_price: daily.close_price,
        }),
        _ => None,
    }
}

/// Combines per-oscillator decisions for one instrument.
///
/// Any sell wins. Otherwise the tightest (highest) stop wins. A buy needs every
/// oscillator to agree; a single abstaining oscillator cancels it.
pub fn resolve<I>(votes: I) -> Option<Decision>
where
    I: IntoIterator<Item = Option<Decision>>,
{
    let mut sell: Option<Decision> = None;
    let mut stop: Option<f64> = None;
    let mut all_buy = true;
    let mut any = false;

    for vote in votes {
        any = true;
        match vote {
            Some(d @ Decision::Sell { .. }) => {
                all_buy = false;
                if sell.is_none() {
                    sell = Some(d);
                }
            }
            Some(Decision::SetStopLoss { stop_price }) => {
                all_buy = false;
                stop = Some(stop.map_or(stop_price, |s| s.max(stop_price)));
            }
            Some(Decision::Buy) => {}
            None => all_buy = false,
        }
    }

    if sell.is_some() {
        return sell;
    }
    if let Some(stop_price) = stop {
        return Some(Decision::SetStopLoss { stop_price });
    }
    if any && all_buy {
        return Some(Decision::Buy);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn r(signal: Signal) -> TimeframeReading {
        TimeframeReading::new(signal, Some(100.0))
    }

    #[test]
    fn full_signal_table() {
        use Signal::*;
        let cases = [
            (Buy, Buy, Some(Decision::Buy)),
            (Sell, Buy, Some(Decision::SetStopLoss { stop_price: 100.0 })),
            (Neutral, Buy, None),
            (Buy, Sell, Some(Decision::Sell { stop_price: Some(100.0) })),
            (Sell, Sell, Some(Decision::Sell { stop_price: Some(100.0) })),
            (Neutral, Sell, Some(Decision::Sell { stop_price: Some(100.0) })),
            (Buy, Neutral, None),
            (Sell, Neutral, None),
            (Neutral, Neutral, None),
        ];
        for (daily, weekly, expected) in cases {
            assert_eq!(
                classify(&r(daily), &r(weekly)),
                expected,
                "daily={daily} weekly={weekly}"
            );
        }
    }

    #[test]
    fn stop_below_market_is_kept_as_stop() {
        let daily = TimeframeReading::new(Signal::Sell, Some(3000.0)).with_market_price(3100.0);
        let weekly = r(Signal::Buy);
        assert_eq!(
            classify(&daily, &weekly),
            Some(Decision::SetStopLoss { stop_price: 3000.0 })
        );
    }

    #[test]
    fn breached_stop_sells_at_market() {
        let daily = TimeframeReading::new(Signal::Sell, Some(3000.0)).with_market_price(2900.0);
        let weekly = r(Signal::Buy);
        assert_eq!(
            classify(&daily, &weekly),
            Some(Decision::Sell {
                stop_price: Some(3000.0)
            })
        );
    }

    #[test]
    fn stop_without_close_is_no_action() {
        let daily = TimeframeReading::new(Signal::Sell, None);
        assert_eq!(classify(&daily, &r(Signal::Buy)), None);
    }

    #[test]
    fn resolve_prefers_protection() {
        let sell = Some(Decision::Sell { stop_price: Some(1.0) });
        assert_eq!(resolve([Some(Decision::Buy), sell]), sell);

        let resolved = resolve([
            Some(Decision::SetStopLoss { stop_price: 90.0 }),
            Some(Decision::SetStopLoss { stop_price: 95.0 }),
            Some(Decision::Buy),
        ]);
        assert_eq!(resolved, Some(Decision::SetStopLoss { stop_price: 95.0 }));

        assert_eq!(resolve([Some(Decision::Buy), None]), None);
        assert_eq!(resolve([Some(Decision::Buy), Some(Decision::Buy)]), Some(Decision::Buy));
        assert_eq!(resolve(std::iter::empty()), None);
    }
}
