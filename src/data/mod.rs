//! Account data provider
//!
//! Point queries for the customer profile, accounts, transactions and
//! branch metadata. The orchestrator only sees the [`AccountDataProvider`]
//! trait; the in-memory provider carries the demo records and the couch
//! provider reads transactions and branches from a document store.

use crate::error::AssistantError;
use crate::models::{Account, Branch, Profile, Transaction, TransactionSummary};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod couch;
pub use couch::CouchBankData;

/// Customer used by the demo for every turn.
pub const DEMO_CUSTOMER_ID: u64 = 7829706;

/// Read-only account data queries
#[async_trait::async_trait]
pub trait AccountDataProvider: Send + Sync {
    async fn get_profile(&self, customer_id: u64) -> Result<Profile>;

    /// Accounts of one type; `None` or `"all"` returns every account.
    async fn get_accounts(
        &self,
        customer_id: u64,
        account_type: Option<&str>,
    ) -> Result<Vec<Account>>;

    async fn get_transactions(
        &self,
        customer_id: u64,
        category: Option<&str>,
    ) -> Result<TransactionSummary>;

    /// Branch by lowercased location key.
    async fn get_branch(&self, location: &str) -> Result<Option<Branch>>;

    async fn list_branches(&self) -> Result<Vec<Branch>>;
}

/// Seed document for [`InMemoryBankData`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankSeed {
    pub profile: Profile,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub branches: Vec<Branch>,
}

/// In-memory provider for a single demo customer
pub struct InMemoryBankData {
    seed: BankSeed,
}

impl InMemoryBankData {
    pub fn new(seed: BankSeed) -> Self {
        Self { seed }
    }

    /// Built-in demo customer.
    pub fn demo() -> Self {
        Self::new(demo_seed())
    }

    pub async fn from_json_file(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        let seed: BankSeed = serde_json::from_str(&raw)?;
        Ok(Self::new(seed))
    }

    fn ensure_customer(&self, customer_id: u64) -> Result<()> {
        if self.seed.profile.customer_id == customer_id {
            Ok(())
        } else {
            Err(AssistantError::upstream(
                Some(404),
                format!("Unknown customer {}", customer_id),
            ))
        }
    }
}

impl Default for InMemoryBankData {
    fn default() -> Self {
        Self::demo()
    }
}

fn matches_ignore_case(value: Option<&str>, wanted: &str) -> bool {
    value.map(|v| v.eq_ignore_ascii_case(wanted)).unwrap_or(false)
}

#[async_trait::async_trait]
impl AccountDataProvider for InMemoryBankData {
    async fn get_profile(&self, customer_id: u64) -> Result<Profile> {
        self.ensure_customer(customer_id)?;
        Ok(self.seed.profile.clone())
    }

    async fn get_accounts(
        &self,
        customer_id: u64,
        account_type: Option<&str>,
    ) -> Result<Vec<Account>> {
        self.ensure_customer(customer_id)?;

        Ok(self
            .seed
            .accounts
            .iter()
            .filter(|a| match account_type {
                None => true,
                Some(t) if t.eq_ignore_ascii_case("all") => true,
                Some(t) => a.kind.eq_ignore_ascii_case(t),
            })
            .cloned()
            .collect())
    }

    async fn get_transactions(
        &self,
        customer_id: u64,
        category: Option<&str>,
    ) -> Result<TransactionSummary> {
        self.ensure_customer(customer_id)?;

        let transactions: Vec<Transaction> = self
            .seed
            .transactions
            .iter()
            .filter(|t| match category {
                None => true,
                Some(c) => matches_ignore_case(t.category.as_deref(), c),
            })
            .cloned()
            .collect();

        let total = transactions.iter().map(|t| t.amount).sum();
        Ok(TransactionSummary {
            total,
            transactions,
        })
    }

    async fn get_branch(&self, location: &str) -> Result<Option<Branch>> {
        Ok(self
            .seed
            .branches
            .iter()
            .find(|b| b.location.eq_ignore_ascii_case(location))
            .cloned())
    }

    async fn list_branches(&self) -> Result<Vec<Branch>> {
        Ok(self.seed.branches.clone())
    }
}

fn demo_seed() -> BankSeed {
    let tx = |date: &str, amount: f64, bname: &str, kind: &str, category: &str| Transaction {
        date: date.to_string(),
        amount,
        description: Some(bname.to_string()),
        bname: Some(bname.to_string()),
        kind: Some(kind.to_string()),
        category: Some(category.to_string()),
    };

    BankSeed {
        profile: Profile {
            customer_id: DEMO_CUSTOMER_ID,
            fname: "Noa".to_string(),
            lname: "Levin".to_string(),
            ..Default::default()
        },
        accounts: vec![
            Account {
                number: "xxx8990".to_string(),
                kind: "checking".to_string(),
                balance: 12_500.0,
                available_credit: None,
                last_statement_balance: None,
            },
            Account {
                number: "xxx3635".to_string(),
                kind: "savings".to_string(),
                balance: 84_210.55,
                available_credit: None,
                last_statement_balance: None,
            },
            Account {
                number: "xxx5421".to_string(),
                kind: "credit card".to_string(),
                balance: 3_120.4,
                available_credit: Some(16_879.6),
                last_statement_balance: Some(2_950.0),
            },
        ],
        transactions: vec![
            tx("2018-03-01", 15_000.0, "משכורת", "ז", "income"),
            tx("2018-03-02", 320.5, "סופרמרקט", "ח", "groceries"),
            tx("2018-03-04", 89.9, "בית קפה", "ח", "dining"),
            tx("2018-03-07", 1_200.0, "ביטוח", "ח", "insurance"),
            tx("2018-03-09", 245.0, "מסעדה", "ח", "dining"),
            tx("2018-03-12", 500.0, "העברה", "ז", "transfer"),
            tx("2018-03-15", 410.3, "סופרמרקט", "ח", "groceries"),
        ],
        branches: vec![
            Branch {
                location: "petah tikva".to_string(),
                address: "דרך אם המושבות 94 פתח תקווה".to_string(),
                phone: "03-9000000".to_string(),
                hours: "Sun-Thu 08:30-15:00".to_string(),
            },
            Branch {
                location: "tel aviv".to_string(),
                address: "רוטשילד 1 תל אביב".to_string(),
                phone: "03-5000000".to_string(),
                hours: "Sun-Thu 08:30-14:00".to_string(),
            },
        ],
    }
}
