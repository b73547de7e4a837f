//! The evaluation engine
//!
//! One full pass over all instruments per cycle, sequentially. Each
//! instrument: fetch candles, compute the three timeframe snapshots,
//! classify biases, check the open position against the fresh price BEFORE
//! any new-entry logic, then run the entry trigger and the re-entry scorer,
//! and publish the per-instrument record. A failure in one instrument never
//! stops the cycle.

use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use crate::candles::CandleSeries;
use crate::config::Config;
use crate::contracts;
use crate::filters::orb::OrbTracker;
use crate::filters::premarket::PremarketProvider;
use crate::filters::{evaluate_entry_gates, GateRejection};
use crate::indicators::{compute_snapshot, TimeframeSnapshot};
use crate::instruments::InstrumentSpec;
use crate::logger::{self, LogTag};
use crate::marketdata::{fetch_series, QuoteSource, RetryPolicy};
use crate::positions::{
    evaluate, open_position, trade_metrics, Direction, HistoryEvent, HistoryLog,
    LifecycleEventKind, LifecycleStatus, Position, PositionStore, RiskParams,
};
use crate::reentry::score_reentry;
use crate::snapshot::{
    EntryView, InstrumentRecord, MomentumView, OverallStatus, PublishedSnapshot, SharedSnapshot,
    TrendView,
};
use crate::strategy::{detect_trigger, entry_gates, momentum_bias, trend_bias, trigger_allows_entry, Bias};
use crate::telegram::TelegramNotifier;
use crate::utils::check_shutdown_or_delay;

pub struct Engine {
    config: Config,
    source: Arc<dyn QuoteSource>,
    retry: RetryPolicy,
    store: Arc<PositionStore>,
    history: Arc<HistoryLog>,
    notifier: Option<Arc<TelegramNotifier>>,
    premarket: Arc<PremarketProvider>,
    orb: OrbTracker,
    snapshot: SharedSnapshot,
    signals_path: PathBuf,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        source: Arc<dyn QuoteSource>,
        store: Arc<PositionStore>,
        history: Arc<HistoryLog>,
        notifier: Option<Arc<TelegramNotifier>>,
        premarket: Arc<PremarketProvider>,
        orb: OrbTracker,
        snapshot: SharedSnapshot,
        signals_path: PathBuf,
    ) -> Self {
        let retry = RetryPolicy::new(
            config.data.retry_attempts,
            config.data.retry_backoff_seconds,
        );
        Self {
            config,
            source,
            retry,
            store,
            history,
            notifier,
            premarket,
            orb,
            snapshot,
            signals_path,
        }
    }

    /// Poll loop: evaluate, publish, sleep, repeat until shutdown
    pub async fn run(&mut self, shutdown: Arc<Notify>) {
        let interval = Duration::from_secs(self.config.engine.poll_interval_seconds);
        loop {
            let started = std::time::Instant::now();
            let evaluated = self.run_cycle().await;
            logger::info(
                LogTag::Engine,
                &format!(
                    "Cycle complete: {} instruments in {:.1}s",
                    evaluated,
                    started.elapsed().as_secs_f64()
                ),
            );

            if crate::arguments::is_run_once_enabled() {
                logger::info(LogTag::Engine, "Single run complete, exiting loop");
                break;
            }
            if check_shutdown_or_delay(&shutdown, interval).await {
                logger::info(LogTag::Engine, "Engine loop shutting down...");
                break;
            }
        }
    }

    /// One full pass over all instruments; returns how many produced records
    pub async fn run_cycle(&mut self) -> usize {
        let now = Utc::now();
        self.orb.cleanup(now);

        // One sentiment reading serves every gated instrument this cycle
        let premarket_sentiment = self.premarket_sentiment_if_needed().await;

        let specs = self.config.instruments.clone();
        let mut records = Vec::with_capacity(specs.len());
        for spec in &specs {
            match self.evaluate_instrument(spec, premarket_sentiment).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => {
                    logger::error(
                        LogTag::Engine,
                        &format!("Error evaluating {}: {}", spec.name, e),
                    );
                }
            }
        }

        let evaluated = records.len();
        let published = PublishedSnapshot::new(records, Utc::now());
        if let Err(e) = published.write(&self.signals_path) {
            logger::error(LogTag::Engine, &format!("Failed to publish snapshot: {}", e));
        }
        *self.snapshot.write().await = Some(published);
        evaluated
    }

    async fn premarket_sentiment_if_needed(&self) -> Option<Bias> {
        let needs_cues = self
            .config
            .instruments
            .iter()
            .any(|s| s.category.session_filters_enabled());
        if !needs_cues {
            return None;
        }
        self.premarket
            .sentiment(self.source.as_ref(), &self.retry)
            .await
    }

    /// Evaluate a single instrument. `Ok(None)` means insufficient data
    /// this cycle; the instrument is skipped without touching any state.
    async fn evaluate_instrument(
        &mut self,
        spec: &InstrumentSpec,
        premarket_sentiment: Option<Bias>,
    ) -> anyhow::Result<Option<InstrumentRecord>> {
        let now = Utc::now();
        let plan = spec.category.timeframe_plan();

        logger::debug(
            LogTag::Engine,
            &format!("Analyzing {} ({})", spec.name, spec.symbol),
        );

        // Contract metadata travels with the record; never engine state
        let contract_info = spec
            .futures_base
            .as_ref()
            .map(|_| contracts::active_contract(now.date_naive()));

        // The momentum fetch doubles as the trend source when the trend
        // timeframe is just a coarser view of the same bars
        let momentum_series =
            fetch_series(self.source.as_ref(), &spec.symbol, plan.momentum, &self.retry).await;
        let trend_series = if plan.trend.fetch_interval() == plan.momentum {
            momentum_series.resample(plan.trend)
        } else {
            fetch_series(self.source.as_ref(), &spec.symbol, plan.trend, &self.retry).await
        };
        let entry_series =
            fetch_series(self.source.as_ref(), &spec.symbol, plan.entry, &self.retry).await;

        let (Some(trend_snap), Some(momentum_snap), Some(entry_snap)) = (
            compute_snapshot(&trend_series),
            compute_snapshot(&momentum_series),
            compute_snapshot(&entry_series),
        ) else {
            logger::warning(LogTag::Engine, &format!("{}: insufficient data", spec.name));
            return Ok(None);
        };

        // Live price with the single-bar glitch guard
        let latest_close = entry_series
            .latest()
            .map(|c| c.close)
            .unwrap_or(entry_snap.close);
        let (price, corrected) =
            crate::positions::lifecycle::sanitize_price(latest_close, entry_snap.close, spec.category);
        if corrected {
            logger::warning(
                LogTag::Engine,
                &format!(
                    "{}: ignoring price spike {} -> using previous close {}",
                    spec.name, latest_close, price
                ),
            );
        }

        // Classify
        let t_bias = trend_bias(&trend_snap, spec.rule_profile);
        let m_bias = momentum_bias(&momentum_snap, spec.rule_profile);
        let gates = entry_gates(&entry_snap, spec.rule_profile);
        let trigger = detect_trigger(entry_snap.prev_histogram, entry_snap.histogram);

        // Opening-range upkeep for gated instruments
        let orb_alignment = if spec.category.session_filters_enabled() {
            if let Some(latest) = entry_series.latest() {
                self.orb
                    .update(&spec.name, latest.high, latest.low, latest.volume, now);
            }
            self.orb.check_breakout(&spec.name, price, now)
        } else {
            None
        };

        // 1. Existing position first: close-before-open
        let mut closed_by_reversal = false;
        if let Some(position) = self.store.get(&spec.name).await {
            let opposite = position.direction.opposite();
            let reversal_confirmed = self.is_reversal(opposite, t_bias, m_bias, trigger);
            let risk = RiskParams::for_category(spec.category);
            let evaluation = evaluate(&position, price, reversal_confirmed, &risk, now);

            for event in &evaluation.events {
                self.apply_event(spec, &position, event.kind, event.price).await;
            }
            match evaluation.position {
                Some(next) => self.store.upsert(next).await,
                None => {
                    self.store.remove(&spec.name).await;
                    closed_by_reversal = evaluation
                        .events
                        .iter()
                        .any(|e| e.kind == LifecycleEventKind::ReversalClose);
                }
            }
        }

        // 2. Entry logic when no position remains open
        let mut status = OverallStatus::Waiting;
        if self.store.get(&spec.name).await.is_none() && !closed_by_reversal {
            status = self
                .try_open(
                    spec,
                    t_bias,
                    m_bias,
                    &gates,
                    trigger,
                    &entry_snap,
                    &entry_series,
                    price,
                    orb_alignment,
                    premarket_sentiment,
                )
                .await;
        }

        // 3. Re-entry scorer only runs against an open position
        let mut re_entry = None;
        if let Some(position) = self.store.get(&spec.name).await {
            status = match position.direction {
                Direction::Buy => OverallStatus::ActiveBuy,
                Direction::Sell => OverallStatus::ActiveSell,
            };

            if spec.category.reentry_enabled() {
                re_entry = score_reentry(
                    &position,
                    &entry_series,
                    &entry_snap,
                    price,
                    spec.tick_size,
                    &self.config.reentry,
                );
                if let Some(opportunity) = &re_entry {
                    logger::info(
                        LogTag::Reentry,
                        &format!(
                            "{}: re-entry {} strength {}% @ {}",
                            spec.name,
                            opportunity.kind,
                            opportunity.strength,
                            opportunity.suggested_entry
                        ),
                    );
                    let mut flagged = position.clone();
                    flagged.status = LifecycleStatus::ReentryOpportunity;
                    self.store.upsert(flagged.clone()).await;

                    if let Some(notifier) = &self.notifier {
                        let notifier = Arc::clone(notifier);
                        let opportunity = opportunity.clone();
                        tokio::spawn(async move {
                            notifier.notify_reentry(&flagged, &opportunity).await;
                        });
                    }
                }
            }
        }

        let signal = self.store.get(&spec.name).await;
        Ok(Some(InstrumentRecord {
            instrument: spec.name.clone(),
            ltp: price,
            trend: TrendView {
                macd_line: trend_snap.macd_line,
                bias: t_bias,
                label: plan.trend_label.to_string(),
            },
            momentum: MomentumView {
                histogram: momentum_snap.histogram,
                bias: m_bias,
                label: plan.momentum_label.to_string(),
            },
            entry: EntryView {
                histogram: entry_snap.histogram,
                status: trigger,
                close: entry_snap.close,
                label: plan.entry_label.to_string(),
                ema_200: entry_snap.ema_200,
                rsi: entry_snap.rsi,
            },
            overall_status: status,
            signal,
            re_entry,
            category: spec.category,
            contract_info,
            timestamp: now,
        }))
    }

    /// Reversal requires the opposite bias confirmed on BOTH higher
    /// timeframes plus a fresh opposite cross on the entry timeframe
    fn is_reversal(
        &self,
        opposite: Direction,
        t_bias: Bias,
        m_bias: Bias,
        trigger: crate::strategy::TriggerEvent,
    ) -> bool {
        use crate::strategy::TriggerEvent;
        match opposite {
            Direction::Buy => {
                t_bias == Bias::Bullish && m_bias == Bias::Bullish && trigger == TriggerEvent::BuyCross
            }
            Direction::Sell => {
                t_bias == Bias::Bearish
                    && m_bias == Bias::Bearish
                    && trigger == TriggerEvent::SellCross
            }
        }
    }

    /// Attempt to open a position; returns the cycle status label
    #[allow(clippy::too_many_arguments)]
    async fn try_open(
        &mut self,
        spec: &InstrumentSpec,
        t_bias: Bias,
        m_bias: Bias,
        gates: &crate::strategy::EntryGates,
        trigger: crate::strategy::TriggerEvent,
        entry_snap: &TimeframeSnapshot,
        entry_series: &CandleSeries,
        price: f64,
        orb_alignment: Option<Direction>,
        premarket_sentiment: Option<Bias>,
    ) -> OverallStatus {
        let direction = if t_bias == Bias::Bullish && m_bias == Bias::Bullish && gates.allows_buy() {
            Direction::Buy
        } else if t_bias == Bias::Bearish && m_bias == Bias::Bearish && gates.allows_sell() {
            Direction::Sell
        } else if t_bias == Bias::Neutral && m_bias == Bias::Neutral {
            return OverallStatus::Waiting;
        } else {
            return OverallStatus::Conflict;
        };

        let looking = match direction {
            Direction::Buy => OverallStatus::LookingForBuy,
            Direction::Sell => OverallStatus::LookingForSell,
        };

        if !trigger_allows_entry(trigger, entry_snap.prev_histogram, direction) {
            return looking;
        }

        if let Err(rejection) = evaluate_entry_gates(
            spec,
            direction,
            entry_series,
            orb_alignment,
            premarket_sentiment,
            Utc::now(),
            self.config.filters.volume_multiple,
            self.config.filters.volume_lookback,
            self.config.filters.premarket_window_minutes,
        ) {
            log_gate_rejection(&spec.name, &rejection);
            return OverallStatus::EntryFiltered;
        }

        let position = open_position(
            spec,
            direction,
            price,
            entry_snap.atr,
            entry_snap.bar_time,
            Utc::now(),
        );
        logger::info(
            LogTag::Positions,
            &format!(
                "{}: NEW {} SIGNAL @ {} (SL {}, TP1 {})",
                spec.name,
                direction.as_str(),
                price,
                position.original_sl,
                position.tp_levels[0]
            ),
        );

        self.store.upsert(position.clone()).await;
        self.apply_event(spec, &position, LifecycleEventKind::Entry, price)
            .await;

        match direction {
            Direction::Buy => OverallStatus::ActiveBuy,
            Direction::Sell => OverallStatus::ActiveSell,
        }
    }

    /// Record a lifecycle event in history and dispatch its notification.
    /// The transition is authoritative once computed; notification failures
    /// only get logged.
    async fn apply_event(
        &self,
        spec: &InstrumentSpec,
        position: &Position,
        kind: LifecycleEventKind,
        price: f64,
    ) {
        let now = Utc::now();
        let metrics = if kind.is_terminal() {
            Some(trade_metrics(position, price, now, spec.tick_size))
        } else {
            None
        };

        logger::info(
            LogTag::Positions,
            &format!("{}: {} @ {}", spec.name, kind.as_str(), price),
        );
        self.history
            .record(HistoryEvent::from_position(
                position,
                kind,
                price,
                now,
                metrics.clone(),
            ))
            .await;

        let Some(notifier) = &self.notifier else {
            return;
        };
        let notifier = Arc::clone(notifier);
        let position = position.clone();
        let tick_size = spec.tick_size;
        tokio::spawn(async move {
            match kind {
                LifecycleEventKind::Entry => {
                    notifier.notify_new_signal(&position, tick_size).await;
                }
                LifecycleEventKind::Tp1Hit => {
                    notifier.notify_tp_hit(&position, 1, price, tick_size).await;
                }
                LifecycleEventKind::Tp2Hit => {
                    notifier.notify_tp_hit(&position, 2, price, tick_size).await;
                }
                LifecycleEventKind::Tp3Hit => {
                    notifier.notify_tp_hit(&position, 3, price, tick_size).await;
                }
                LifecycleEventKind::SlHit => {
                    if let Some(metrics) = metrics {
                        notifier
                            .notify_sl_hit(&position, price, false, &metrics, tick_size)
                            .await;
                    }
                }
                LifecycleEventKind::TrailSlHit => {
                    if let Some(metrics) = metrics {
                        notifier
                            .notify_sl_hit(&position, price, true, &metrics, tick_size)
                            .await;
                    }
                }
                LifecycleEventKind::ReversalClose => {
                    if let Some(metrics) = metrics {
                        notifier
                            .notify_reversal_close(&position, price, &metrics, tick_size)
                            .await;
                    }
                }
            }
        });
    }
}

fn log_gate_rejection(instrument: &str, rejection: &GateRejection) {
    logger::info(
        LogTag::Filters,
        &format!("{}: entry suppressed, {}", instrument, rejection.as_str()),
    );
}
