use std::sync::Arc;
use std::time::Duration;

use fleetvol_models::{Account, AssetKind, ConfigError, Direction, TradeIntent, TradingConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

/// Source of every random choice an agent makes.
pub trait IntentGenerator: Send {
    /// Pick the next trade for `own`. `None` means nothing can be traded.
    fn next_intent(&mut self, own: &Arc<Account>, pool: &[Arc<Account>]) -> Option<TradeIntent>;

    /// Pause before the next cycle.
    fn cooldown(&mut self) -> Duration;
}

/// Bounds for random trade selection, in integer steps of `10^-scale`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradePolicy {
    min_steps: i64,
    max_steps: i64,
    scale: u32,
    cooldown_min: u64,
    cooldown_max: u64,
}

impl TradePolicy {
    pub fn from_config(config: &TradingConfig) -> Result<Self, ConfigError> {
        let (min_steps, max_steps) = config.amount_steps()?;
        Ok(Self {
            min_steps,
            max_steps,
            scale: config.amount_scale,
            cooldown_min: config.cooldown_min_seconds,
            cooldown_max: config.cooldown_max_seconds.max(config.cooldown_min_seconds),
        })
    }

    pub fn min_amount(&self) -> Decimal {
        Decimal::new(self.min_steps, self.scale)
    }

    pub fn max_amount(&self) -> Decimal {
        Decimal::new(self.max_steps, self.scale)
    }

    pub fn cooldown_bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_secs(self.cooldown_min),
            Duration::from_secs(self.cooldown_max),
        )
    }
}

/// Uniform random selection of direction, asset, counterparty and amount.
///
/// The counterparty is drawn from the whole pool, which includes the agent's
/// own account, so self-trades happen.
pub struct RandomIntentGenerator {
    rng: StdRng,
    policy: TradePolicy,
}

impl RandomIntentGenerator {
    pub fn new(policy: TradePolicy) -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            policy,
        }
    }

    /// Reproducible generator for tests and seeded runs.
    pub fn with_seed(policy: TradePolicy, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            policy,
        }
    }

    pub fn draw_amount(&mut self) -> Decimal {
        let steps = self
            .rng
            .random_range(self.policy.min_steps..=self.policy.max_steps);
        Decimal::new(steps, self.policy.scale)
    }
}

impl IntentGenerator for RandomIntentGenerator {
    fn next_intent(&mut self, own: &Arc<Account>, pool: &[Arc<Account>]) -> Option<TradeIntent> {
        if pool.is_empty() {
            return None;
        }
        let direction = if self.rng.random_bool(0.5) {
            Direction::Send
        } else {
            Direction::Receive
        };
        let asset = if self.rng.random_bool(0.5) {
            AssetKind::Native
        } else {
            AssetKind::Secondary
        };
        let counterparty = Arc::clone(&pool[self.rng.random_range(0..pool.len())]);
        let amount = self.draw_amount();
        Some(TradeIntent::new(
            Arc::clone(own),
            counterparty,
            direction,
            asset,
            amount,
        ))
    }

    fn cooldown(&mut self) -> Duration {
        Duration::from_secs(
            self.rng
                .random_range(self.policy.cooldown_min..=self.policy.cooldown_max),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::default_policy;
    use fleetvol_models::{Address, SecretKey};
    use rust_decimal_macros::dec;

    fn pool(n: usize) -> Vec<Arc<Account>> {
        (0..n)
            .map(|i| {
                Arc::new(Account::new(
                    Address::new(format!("acct{i}")),
                    SecretKey::new(vec![i as u8; 64]),
                ))
            })
            .collect()
    }

    #[test]
    fn default_policy_bounds() {
        let policy = default_policy();
        assert_eq!(policy.min_amount(), dec!(0.01));
        assert_eq!(policy.max_amount(), dec!(0.10));
        assert_eq!(
            policy.cooldown_bounds(),
            (Duration::from_secs(30), Duration::from_secs(90))
        );
    }

    #[test]
    fn amounts_stay_in_range_with_four_decimals() {
        let mut generator = RandomIntentGenerator::with_seed(default_policy(), 7);
        for _ in 0..1_000 {
            let amount = generator.draw_amount();
            assert!(amount >= dec!(0.01) && amount <= dec!(0.10), "{amount}");
            assert!(amount.scale() <= 4);
        }
    }

    #[test]
    fn cooldown_stays_in_range() {
        let mut generator = RandomIntentGenerator::with_seed(default_policy(), 11);
        let mut seen_min = u64::MAX;
        let mut seen_max = 0;
        for _ in 0..2_000 {
            let secs = generator.cooldown().as_secs();
            assert!((30..=90).contains(&secs));
            seen_min = seen_min.min(secs);
            seen_max = seen_max.max(secs);
        }
        assert_eq!((seen_min, seen_max), (30, 90));
    }

    #[test]
    fn every_choice_is_eventually_made() {
        let accounts = pool(4);
        let own = Arc::clone(&accounts[1]);
        let mut generator = RandomIntentGenerator::with_seed(default_policy(), 3);
        let mut sends = 0;
        let mut natives = 0;
        let mut counterparties = std::collections::HashSet::new();
        for _ in 0..500 {
            let intent = generator.next_intent(&own, &accounts).unwrap();
            if intent.direction == Direction::Send {
                sends += 1;
                assert_eq!(intent.sender_address(), own.address());
                counterparties.insert(intent.receiver_address().clone());
            } else {
                assert_eq!(intent.receiver_address(), own.address());
                counterparties.insert(intent.sender_address().clone());
            }
            if intent.asset == AssetKind::Native {
                natives += 1;
            }
            assert_ne!(intent.asset, AssetKind::Unsupported);
        }
        assert!(sends > 150 && sends < 350, "{sends}");
        assert!(natives > 150 && natives < 350, "{natives}");
        assert_eq!(counterparties.len(), 4);
    }

    /// Self-trades are not filtered out. This mirrors how the fleet has always
    /// behaved and may not be intended.
    #[test]
    fn own_account_can_be_drawn_as_counterparty() {
        let accounts = pool(2);
        let own = Arc::clone(&accounts[0]);
        let mut generator = RandomIntentGenerator::with_seed(default_policy(), 5);
        let self_trades = (0..200)
            .filter_map(|_| generator.next_intent(&own, &accounts))
            .filter(|intent| intent.is_self_trade())
            .count();
        assert!(self_trades > 0);
    }

    #[test]
    fn empty_pool_yields_no_intent() {
        let own = pool(1).remove(0);
        let mut generator = RandomIntentGenerator::with_seed(default_policy(), 1);
        assert!(generator.next_intent(&own, &[]).is_none());
    }

    #[test]
    fn same_seed_same_choices() {
        let accounts = pool(3);
        let own = Arc::clone(&accounts[0]);
        let mut a = RandomIntentGenerator::with_seed(default_policy(), 42);
        let mut b = RandomIntentGenerator::with_seed(default_policy(), 42);
        for _ in 0..20 {
            let x = a.next_intent(&own, &accounts).unwrap();
            let y = b.next_intent(&own, &accounts).unwrap();
            assert_eq!(x.amount, y.amount);
            assert_eq!(x.asset, y.asset);
            assert_eq!(x.sender_address(), y.sender_address());
            assert_eq!(a.cooldown(), b.cooldown());
        }
    }

    #[test]
    fn oversized_range_is_rejected() {
        let config = TradingConfig {
            min_trade_amount: dec!(1),
            max_trade_amount: dec!(100000000000),
            amount_scale: 18,
            ..TradingConfig::default()
        };
        assert!(TradePolicy::from_config(&config).is_err());

        let config = TradingConfig {
            min_trade_amount: dec!(10),
            max_trade_amount: dec!(20),
            amount_scale: 18,
            ..TradingConfig::default()
        };
        assert!(TradePolicy::from_config(&config).is_err());
    }

    #[test]
    fn custom_range_is_respected() {
        let config = TradingConfig {
            min_trade_amount: dec!(0.5),
            max_trade_amount: dec!(0.5),
            amount_scale: 2,
            ..TradingConfig::default()
        };
        let mut generator = RandomIntentGenerator::with_seed(TradePolicy::from_config(&config).unwrap(), 9);
        assert_eq!(generator.draw_amount(), dec!(0.50));
    }
}
