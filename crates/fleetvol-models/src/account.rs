use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Public address of an account on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque signing material. Only the ledger client knows how to use it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(<{} bytes redacted>)", self.0.len())
    }
}

/// An identity that can hold and transfer assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    address: Address,
    secret: SecretKey,
}

impl Account {
    pub fn new(address: Address, secret: SecretKey) -> Self {
        Self { address, secret }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }
}

/// The provisioned accounts plus the primary account that funded them.
///
/// Built once during provisioning and shared read-only by every agent.
#[derive(Debug, Clone)]
pub struct Fleet {
    primary: Arc<Account>,
    members: Vec<Arc<Account>>,
}

impl Fleet {
    pub fn new(primary: Arc<Account>, members: Vec<Arc<Account>>) -> Self {
        Self { primary, members }
    }

    pub fn primary(&self) -> &Arc<Account> {
        &self.primary
    }

    pub fn members(&self) -> &[Arc<Account>] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Counterparty pool: the primary first, then every member in creation order.
    pub fn counterparties(&self) -> Vec<Arc<Account>> {
        std::iter::once(Arc::clone(&self.primary))
            .chain(self.members.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(name: &str) -> Arc<Account> {
        Arc::new(Account::new(
            Address::new(name),
            SecretKey::new(vec![7; 64]),
        ))
    }

    #[test]
    fn secret_is_redacted_in_debug() {
        let acct = account("alice");
        let debug = format!("{acct:?}");
        assert!(debug.contains("alice"));
        assert!(debug.contains("64 bytes redacted"));
        assert!(!debug.contains("7, 7"));
    }

    #[test]
    fn counterparties_start_with_primary() {
        let fleet = Fleet::new(account("main"), vec![account("a"), account("b")]);
        let pool = fleet.counterparties();
        assert_eq!(pool.len(), 3);
        assert_eq!(pool[0].address().as_str(), "main");
        assert_eq!(pool[2].address().as_str(), "b");
        assert_eq!(fleet.len(), 2);
    }

    #[test]
    fn address_serializes_as_plain_string() {
        let json = serde_json::to_string(&Address::new("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }
}
