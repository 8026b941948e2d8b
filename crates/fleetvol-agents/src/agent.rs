use std::sync::Arc;
use std::time::Duration;

use fleetvol_models::{Account, Address, CycleReport, Fleet, TradingConfig};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::AgentError;
use crate::executor::TradeExecutor;
use crate::intent::IntentGenerator;

/// How a cycle reacts to failed attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per cycle, including the first.
    pub max_attempts: u32,
    /// Fixed wait between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &TradingConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: config.retry_delay(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&TradingConfig::default())
    }
}

/// Counters for an agent's lifetime, returned when it stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentSummary {
    pub cycles: u64,
    pub successes: u64,
    pub give_ups: u64,
}

/// Drives one account through select → attempt → cooldown, forever.
pub struct AccountAgent {
    account: Arc<Account>,
    pool: Vec<Arc<Account>>,
    executor: Arc<TradeExecutor>,
    generator: Box<dyn IntentGenerator>,
    retry: RetryPolicy,
    summary: AgentSummary,
}

impl AccountAgent {
    pub fn new(
        account: Arc<Account>,
        fleet: &Fleet,
        executor: Arc<TradeExecutor>,
        generator: Box<dyn IntentGenerator>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            account,
            pool: fleet.counterparties(),
            executor,
            generator,
            retry,
            summary: AgentSummary::default(),
        }
    }

    pub fn address(&self) -> &Address {
        self.account.address()
    }

    pub fn summary(&self) -> &AgentSummary {
        &self.summary
    }

    /// Trade until `cancel` fires. Only a generator that cannot produce a
    /// trade ends the loop early.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<AgentSummary, AgentError> {
        info!(account = %self.address(), "Agent started");

        loop {
            let report = tokio::select! {
                _ = cancel.cancelled() => break,
                report = self.run_cycle(&cancel) => report?,
            };
            let Some(report) = report else { break };
            debug!(
                account = %self.address(),
                attempts = report.attempts,
                succeeded = report.succeeded(),
                "Cycle complete"
            );

            let pause = self.generator.cooldown();
            info!(
                account = %self.address(),
                seconds = pause.as_secs(),
                "Waiting before the next trade"
            );
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        info!(
            account = %self.address(),
            cycles = self.summary.cycles,
            successes = self.summary.successes,
            give_ups = self.summary.give_ups,
            "Agent stopped"
        );
        Ok(self.summary)
    }

    /// One cycle: draw a trade and attempt it until it succeeds or the
    /// attempts run out. Every retry reuses the same intent.
    ///
    /// Returns `Ok(None)` if cancelled while waiting to retry.
    pub async fn run_cycle(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<CycleReport>, AgentError> {
        let intent = self
            .generator
            .next_intent(&self.account, &self.pool)
            .ok_or_else(|| AgentError::NoIntent(self.account.address().to_string()))?;

        info!(
            account = %self.address(),
            trade = %intent.id,
            direction = %intent.direction,
            asset = %intent.asset,
            amount = %intent.amount,
            sender = %intent.sender_address(),
            receiver = %intent.receiver_address(),
            "Starting new trade"
        );
        if intent.is_self_trade() {
            debug!(account = %self.address(), "Counterparty is the agent's own account");
        }

        let mut attempts = 0;
        let mut retries = 0;
        let outcome = loop {
            attempts += 1;
            let outcome = self.executor.execute(&intent).await;
            if outcome.is_success() {
                break outcome;
            }

            retries += 1;
            if retries >= self.retry.max_attempts {
                error!(
                    account = %self.address(),
                    trade = %intent.id,
                    attempts,
                    "Failed to complete trade, giving up until next cycle"
                );
                break outcome;
            }

            warn!(
                account = %self.address(),
                trade = %intent.id,
                retry = retries,
                max_attempts = self.retry.max_attempts,
                "Retrying trade"
            );
            tokio::select! {
                _ = cancel.cancelled() => return Ok(None),
                _ = tokio::time::sleep(self.retry.delay) => {}
            }
        };

        self.summary.cycles += 1;
        if outcome.is_success() {
            self.summary.successes += 1;
        } else {
            self.summary.give_ups += 1;
        }

        Ok(Some(CycleReport {
            intent,
            outcome,
            attempts,
            retries,
            completed_at: chrono::Utc::now(),
        }))
    }
}
