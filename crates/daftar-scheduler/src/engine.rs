//! Scheduler engine — the periodic sweep and its lifecycle.
//!
//! One background task owns the interval. A sweep is: evaluate every
//! eligible obligation, throttle, claim, materialize, dispatch, then rescan
//! leftover `scheduled` records from earlier crashes or failed passes.
//! Per-item errors are logged and skipped; one bad record never aborts the
//! sweep. `stop()` lets an in-flight sweep finish before returning.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use daftar_core::error::Result;
use daftar_core::models::{Debt, NotificationStatus};
use daftar_core::traits::{DebtStore, NotificationStore};

use crate::dispatch::Dispatcher;
use crate::{due, factory, throttle};

/// Counters from one sweep, logged at the end of every pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Obligations pulled from the eligibility query.
    pub evaluated: usize,
    /// Claims won; equals the number of notifications created.
    pub fired: usize,
    /// Dispatch attempts that ended in `sent`, including rescanned records.
    pub dispatched: usize,
    /// Per-item errors plus dispatches that ended in `failed`.
    pub failures: usize,
}

/// Periodic debt reminder sweep. `start` / `stop` are idempotent and the
/// engine can be restarted after a stop.
pub struct ReminderScheduler {
    debts: Arc<dyn DebtStore>,
    notifications: Arc<dyn NotificationStore>,
    dispatcher: Dispatcher,
    tick: Duration,
    running: Arc<AtomicBool>,
    pass_active: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    handle: Option<JoinHandle<()>>,
}

impl ReminderScheduler {
    pub fn new(
        debts: Arc<dyn DebtStore>,
        notifications: Arc<dyn NotificationStore>,
        dispatcher: Dispatcher,
        tick: Duration,
    ) -> Self {
        Self {
            debts,
            notifications,
            dispatcher,
            tick,
            running: Arc::new(AtomicBool::new(false)),
            pass_active: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Probe both stores, run one immediate sweep, then spawn the interval
    /// loop. Fails without starting the loop when either store is
    /// unreachable, so the caller can retry later.
    pub async fn start(&mut self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("reminder scheduler already running, start ignored");
            return Ok(());
        }

        if let Err(e) = self.ping_stores().await {
            self.running.store(false, Ordering::SeqCst);
            return Err(e);
        }

        let stats = self.run_once().await?;
        tracing::info!(
            evaluated = stats.evaluated,
            fired = stats.fired,
            "🔔 reminder scheduler started, first sweep done"
        );

        let debts = self.debts.clone();
        let notifications = self.notifications.clone();
        let dispatcher = self.dispatcher.clone();
        let tick = self.tick;
        let running = self.running.clone();
        let pass_active = self.pass_active.clone();
        let shutdown = self.shutdown.clone();

        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // the interval fires immediately; the start() sweep already ran
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if pass_active.swap(true, Ordering::SeqCst) {
                            tracing::debug!("previous sweep still active, skipping tick");
                            continue;
                        }
                        let stats =
                            run_pass(&debts, &notifications, &dispatcher, Utc::now()).await;
                        pass_active.store(false, Ordering::SeqCst);
                        tracing::debug!(
                            evaluated = stats.evaluated,
                            fired = stats.fired,
                            dispatched = stats.dispatched,
                            failures = stats.failures,
                            "reminder sweep complete"
                        );
                    }
                    _ = shutdown.notified() => break,
                }
            }
            running.store(false, Ordering::SeqCst);
            tracing::info!("reminder scheduler stopped");
        }));

        Ok(())
    }

    /// Signal the loop and wait for it to wind down. An in-flight sweep
    /// completes before this returns. Safe to call twice.
    pub async fn stop(&mut self) {
        // only signal when a task exists, or a stored permit would kill the
        // next start() immediately
        let Some(handle) = self.handle.take() else {
            self.running.store(false, Ordering::SeqCst);
            return;
        };
        self.shutdown.notify_one();
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "scheduler task join failed");
        }
        self.running.store(false, Ordering::SeqCst);
    }

    /// One sweep at the current instant. Used by the interval loop, the
    /// `--once` CLI mode, and tests.
    pub async fn run_once(&self) -> Result<PassStats> {
        Ok(run_pass(&self.debts, &self.notifications, &self.dispatcher, Utc::now()).await)
    }

    async fn ping_stores(&self) -> Result<()> {
        self.debts.ping().await?;
        self.notifications.ping().await?;
        Ok(())
    }
}

/// One full sweep: evaluate + dispatch, then rescan stale records.
async fn run_pass(
    debts: &Arc<dyn DebtStore>,
    notifications: &Arc<dyn NotificationStore>,
    dispatcher: &Dispatcher,
    now: DateTime<Utc>,
) -> PassStats {
    let mut stats = PassStats::default();

    match debts.list_reminder_eligible(now).await {
        Ok(eligible) => {
            stats.evaluated = eligible.len();
            for debt in &eligible {
                match process_debt(debts, notifications, dispatcher, debt, now).await {
                    Ok(Some(NotificationStatus::Sent)) => {
                        stats.fired += 1;
                        stats.dispatched += 1;
                    }
                    Ok(Some(_)) => {
                        stats.fired += 1;
                        stats.failures += 1;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        stats.failures += 1;
                        tracing::warn!(debt = %debt.id, error = %e, "reminder processing failed");
                    }
                }
            }
        }
        Err(e) => {
            stats.failures += 1;
            tracing::warn!(error = %e, "eligibility query failed, skipping sweep");
        }
    }

    // records a previous pass created but never moved out of `scheduled`
    match notifications.list_scheduled_due(now).await {
        Ok(stale) => {
            for n in &stale {
                match dispatcher.deliver(n, now).await {
                    Ok(NotificationStatus::Sent) => stats.dispatched += 1,
                    Ok(_) => stats.failures += 1,
                    Err(e) => {
                        stats.failures += 1;
                        tracing::warn!(id = %n.id, error = %e, "rescan dispatch failed");
                    }
                }
            }
        }
        Err(e) => {
            stats.failures += 1;
            tracing::warn!(error = %e, "scheduled-record rescan failed");
        }
    }

    stats
}

/// Evaluate, throttle, claim, materialize, dispatch — for one obligation.
/// `Ok(None)` means nothing fired; `Ok(Some(status))` is the delivery
/// outcome of a freshly created notification.
async fn process_debt(
    debts: &Arc<dyn DebtStore>,
    notifications: &Arc<dyn NotificationStore>,
    dispatcher: &Dispatcher,
    debt: &Debt,
    now: DateTime<Utc>,
) -> Result<Option<NotificationStatus>> {
    let Some(matched) = due::evaluate(debt, now) else {
        return Ok(None);
    };
    if !throttle::may_fire(&debt.reminders, matched.category, matched.days, now) {
        return Ok(None);
    }

    let expected = debt.reminders.last_sent(matched.category);
    if !debts
        .claim_reminder(debt.id, matched.category, expected, now)
        .await?
    {
        // another sweep got here first with the same snapshot
        tracing::debug!(debt = %debt.id, category = matched.category.as_str(), "claim lost");
        return Ok(None);
    }

    let notification = factory::build(debt, matched.category, matched.days, now);
    notifications.insert(&notification).await?;
    let status = dispatcher.deliver(&notification, now).await?;
    tracing::info!(
        debt = %debt.id,
        category = matched.category.as_str(),
        status = status.as_str(),
        "🔔 reminder fired"
    );
    Ok(Some(status))
}
