use std::sync::Arc;

use fleetvol_ledger::LedgerClient;
use fleetvol_models::{Address, Fleet, ResolvedConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::agent::{AccountAgent, AgentSummary, RetryPolicy};
use crate::distributor::AssetDistributor;
use crate::error::{AgentError, SetupError};
use crate::executor::TradeExecutor;
use crate::intent::{IntentGenerator, RandomIntentGenerator, TradePolicy};
use crate::provisioner::FleetProvisioner;
use crate::snapshot::{fleet_balances, log_balances};

/// Builds the intent generator for the agent at the given fleet index.
pub type GeneratorFactory = Box<dyn Fn(usize) -> Box<dyn IntentGenerator> + Send + Sync>;

/// How a supervised run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorExit {
    /// Shutdown was requested before trading started.
    Cancelled,
    /// Trading ran and every agent has stopped.
    Stopped(FleetReport),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FleetReport {
    pub agents: usize,
    /// Agents that ended with an error.
    pub failed: usize,
    pub panicked: usize,
    pub cycles: u64,
    pub successes: u64,
    pub give_ups: u64,
}

impl FleetReport {
    fn record(&mut self, summary: &AgentSummary) {
        self.cycles += summary.cycles;
        self.successes += summary.successes;
        self.give_ups += summary.give_ups;
    }
}

/// Runs the whole fleet: provisioning, then distribution, then one agent
/// task per account until cancelled.
pub struct FleetSupervisor {
    ledger: Arc<dyn LedgerClient>,
    config: ResolvedConfig,
    generators: GeneratorFactory,
    cancel: CancellationToken,
}

impl FleetSupervisor {
    pub fn new(ledger: Arc<dyn LedgerClient>, config: ResolvedConfig) -> Result<Self, SetupError> {
        let policy = TradePolicy::from_config(&config.trading)?;
        let seed = config.fleet.seed;
        let generators: GeneratorFactory = Box::new(move |index| match seed {
            Some(seed) => Box::new(RandomIntentGenerator::with_seed(
                policy.clone(),
                agent_seed(seed, index),
            )),
            None => Box::new(RandomIntentGenerator::new(policy.clone())),
        });
        Ok(Self {
            ledger,
            config,
            generators,
            cancel: CancellationToken::new(),
        })
    }

    /// Replace how each agent's intent generator is built.
    pub fn with_generators(mut self, generators: GeneratorFactory) -> Self {
        self.generators = generators;
        self
    }

    /// Returns a CancellationToken that stops setup and every agent.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Set up the fleet, then trade until cancelled.
    pub async fn run(&self) -> Result<SupervisorExit, SetupError> {
        info!(
            endpoint = %self.config.network.rpc_url,
            native_asset = %self.config.network.native_asset,
            secondary_asset = %self.config.network.secondary_asset,
            accounts = self.config.fleet.num_accounts,
            funding = self.config.fleet.funding_amount,
            "Starting trading simulation"
        );

        let fleet = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                info!("Shutdown requested during setup");
                return Ok(SupervisorExit::Cancelled);
            }
            fleet = self.setup() => fleet?,
        };

        let report = self.launch(Arc::new(fleet)).await;
        Ok(SupervisorExit::Stopped(report))
    }

    /// Load the primary, provision and distribute. Must finish before any
    /// agent starts.
    pub async fn setup(&self) -> Result<Fleet, SetupError> {
        let network = &self.config.network;
        let primary = self
            .ledger
            .account_from_secret(network.primary_secret_key.as_bytes())
            .await
            .map_err(SetupError::Primary)?;
        info!(account = %primary.address(), "Loaded primary account");

        let provisioner = FleetProvisioner::new(
            Arc::clone(&self.ledger),
            Arc::new(primary),
            network.secondary_asset.clone(),
        );
        let fleet = provisioner
            .provision(self.config.fleet.num_accounts, self.config.fleet.funding_amount)
            .await?;

        let distributor = AssetDistributor::new(
            Arc::clone(&self.ledger),
            network.secondary_asset.clone(),
            self.config.distribution.clone(),
        );
        let mut rng = match self.config.fleet.seed {
            Some(seed) => StdRng::seed_from_u64(distribution_seed(seed, self.config.fleet.num_accounts)),
            None => StdRng::from_os_rng(),
        };
        distributor.distribute(&fleet, &mut rng).await?;

        Ok(fleet)
    }

    /// Spawn one agent per member and wait for all of them to stop.
    /// A failing or panicking agent is logged and does not affect the rest.
    pub async fn launch(&self, fleet: Arc<Fleet>) -> FleetReport {
        self.log_snapshot("after distribution", &fleet).await;

        let executor = Arc::new(TradeExecutor::new(
            Arc::clone(&self.ledger),
            self.config.network.secondary_asset.clone(),
        ));
        let retry = RetryPolicy::from_config(&self.config.trading);

        let mut join_set = tokio::task::JoinSet::new();
        for (index, account) in fleet.members().iter().enumerate() {
            let agent = AccountAgent::new(
                Arc::clone(account),
                &fleet,
                Arc::clone(&executor),
                (self.generators)(index),
                retry.clone(),
            );
            let cancel = self.cancel.clone();
            join_set.spawn(async move {
                let address: Address = agent.address().clone();
                (address, agent.run(cancel).await)
            });
        }
        info!(agents = fleet.len(), "All agents started");

        let mut report = FleetReport {
            agents: fleet.len(),
            ..FleetReport::default()
        };
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((_, Ok(summary))) => report.record(&summary),
                Ok((address, Err(e))) => {
                    report.failed += 1;
                    log_agent_failure(&address, &e);
                }
                Err(e) => {
                    report.panicked += 1;
                    error!(error = %e, "Agent task panicked");
                }
            }
        }

        self.log_snapshot("final", &fleet).await;
        info!(
            cycles = report.cycles,
            successes = report.successes,
            give_ups = report.give_ups,
            failed = report.failed,
            "All agents stopped"
        );
        report
    }

    async fn log_snapshot(&self, label: &str, fleet: &Fleet) {
        let asset = &self.config.network.secondary_asset;
        let decimals = match self.ledger.get_asset_decimals(asset).await {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "Skipping balance snapshot");
                return;
            }
        };
        match fleet_balances(self.ledger.as_ref(), fleet, asset).await {
            Ok(balances) => log_balances(label, &balances, decimals),
            Err(e) => warn!(error = %e, snapshot = label, "Balance snapshot failed"),
        }
    }
}

/// Agent `index` draws from `seed + index`.
fn agent_seed(seed: u64, index: usize) -> u64 {
    seed.wrapping_add(index as u64)
}

/// The distribution draws from `seed + num_accounts`, past every agent seed.
fn distribution_seed(seed: u64, num_accounts: usize) -> u64 {
    seed.wrapping_add(num_accounts as u64)
}

fn log_agent_failure(address: &Address, e: &AgentError) {
    error!(account = %address, error = %e, "Error managing account");
}
