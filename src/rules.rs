//! Decoded governance rules container: users, groups, whitelisting rule sets,
//! and the threshold trees they carry.
//!
//! The container forms a small directed graph (rules reference groups, groups
//! reference users) kept as flat vectors of string-keyed records. Group member
//! lists may reference users absent from `users`; such dangling references are
//! not a decode error and only matter if a quorum would need a signature from
//! that id.
//!
//! Containers are immutable once decoded and safe to share across tasks.

use serde::Deserialize;

use crate::crypto::P256PublicKey;

/// Role marking the custody HSM's signing identity among container users.
pub const ROLE_HSM_SLOT: &str = "HSMSLOT";

/// The active, SuperAdmin-signed authorization policy.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesContainer {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub address_whitelisting_rules: Vec<AddressRule>,
    #[serde(default)]
    pub contract_address_whitelisting_rules: Vec<ContractAddressRule>,
}

/// A platform user able to approve whitelisted entries.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    /// P-256 only; containers carrying keys of another curve fail to decode.
    pub public_key: P256PublicKey,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl User {
    /// Whether this user is the custody HSM's signing slot.
    pub fn is_hsm_slot(&self) -> bool {
        self.roles.iter().any(|role| role == ROLE_HSM_SLOT)
    }
}

/// A named set of users. One user may belong to several groups.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    #[serde(default)]
    pub user_ids: Vec<String>,
}

/// Approval requirements for whitelisted addresses of one `(currency, network)`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRule {
    pub currency: String,
    pub network: String,
    /// OR across entries; see [`SequentialThresholds`].
    #[serde(default)]
    pub parallel_thresholds: Vec<SequentialThresholds>,
    /// Per-wallet-path overrides of the default thresholds.
    #[serde(default)]
    pub lines: Vec<RuleLine>,
}

/// Approval requirements for whitelisted assets of one `(blockchain, network)`.
///
/// Asset rules carry only default thresholds; rule lines do not apply.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractAddressRule {
    pub blockchain: String,
    pub network: String,
    #[serde(default)]
    pub parallel_thresholds: Vec<SequentialThresholds>,
}

/// One approval path: an AND of group thresholds, all of which must be met.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequentialThresholds {
    #[serde(default)]
    pub thresholds: Vec<GroupThreshold>,
}

/// Requirement that at least `minimum_signatures` valid signatures come from
/// members of `group_id`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupThreshold {
    pub group_id: String,
    pub minimum_signatures: u32,
}

/// A per-wallet-path threshold override for address rules.
///
/// A line matches an envelope iff its first cell carries an internal-wallet
/// source whose derivation path equals the envelope's single linked wallet
/// path.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleLine {
    #[serde(default)]
    pub cells: Vec<RuleCell>,
    #[serde(default)]
    pub parallel_thresholds: Vec<SequentialThresholds>,
}

/// A single cell of a rule line, wrapping its source.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCell {
    pub source: RuleSource,
}

/// Where a rule-line cell draws its value from.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum RuleSource {
    /// An internal custody wallet identified by derivation path.
    #[serde(rename = "INTERNAL_WALLET", rename_all = "camelCase")]
    InternalWallet { path: String },
    /// Any source kind this verifier does not interpret.
    #[serde(untagged)]
    Other(serde_json::Value),
}

impl RuleLine {
    /// The derivation path of this line's leading internal-wallet cell, if any.
    pub fn leading_wallet_path(&self) -> Option<&str> {
        match self.cells.first().map(|cell| &cell.source) {
            Some(RuleSource::InternalWallet { path }) => Some(path),
            _ => None,
        }
    }
}

impl RulesContainer {
    /// Find a user by id. First match wins.
    pub fn find_user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|user| user.id == id)
    }

    /// Find a group by id. First match wins.
    pub fn find_group(&self, id: &str) -> Option<&Group> {
        self.groups.iter().find(|group| group.id == id)
    }

    /// Find the address rules for `(currency, network)`, case-sensitive.
    pub fn find_address_rules(&self, currency: &str, network: &str) -> Option<&AddressRule> {
        self.address_whitelisting_rules
            .iter()
            .find(|rule| rule.currency == currency && rule.network == network)
    }

    /// Find the contract address rules for `(blockchain, network)`, case-sensitive.
    pub fn find_contract_rules(
        &self,
        blockchain: &str,
        network: &str,
    ) -> Option<&ContractAddressRule> {
        self.contract_address_whitelisting_rules
            .iter()
            .find(|rule| rule.blockchain == blockchain && rule.network == network)
    }

    /// The public key of the first user carrying the HSM slot role, if any.
    pub fn hsm_public_key(&self) -> Option<&P256PublicKey> {
        self.users
            .iter()
            .find(|user| user.is_hsm_slot())
            .map(|user| &user.public_key)
    }
}
