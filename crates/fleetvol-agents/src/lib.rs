pub mod agent;
pub mod distributor;
pub mod error;
pub mod executor;
pub mod intent;
pub mod provisioner;
pub mod snapshot;
pub mod supervisor;

pub mod test_support;

pub use agent::{AccountAgent, AgentSummary, RetryPolicy};
pub use distributor::{amount_bounds, AssetDistributor, Distribution};
pub use error::{AgentError, SetupError, TradeError};
pub use executor::TradeExecutor;
pub use intent::{IntentGenerator, RandomIntentGenerator, TradePolicy};
pub use provisioner::FleetProvisioner;
pub use snapshot::{fleet_balances, log_balances, AccountBalance, AccountRole};
pub use supervisor::{FleetReport, FleetSupervisor, GeneratorFactory, SupervisorExit};
