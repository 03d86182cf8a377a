//! Directive parsing
//!
//! Reads the side-effect requests the dialog engine leaves in the reply
//! context. Priority is fixed: map directions, then the ledger table, then
//! `action.lookup`. Only the first match is acted on in a turn.

use crate::models::Context;

pub const LOOKUP_BALANCE: &str = "balance";
pub const LOOKUP_TRANSACTIONS: &str = "transactions";
pub const LOOKUP_5TRANSACTIONS: &str = "5transactions";
pub const LOOKUP_BRANCH: &str = "branch";
/// Marker the dialog engine uses once it has consumed a lookup itself.
pub const LOOKUP_COMPLETE: &str = "complete";

#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// `org`: embed a directions map from `origin` to the fixed branch.
    MapDirections { origin: String },
    /// `getTransactions`: ledger table of recent transactions.
    Ledger,
    Lookup(Lookup),
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Balance {
        account_type: Option<String>,
        append_response: bool,
    },
    Transactions {
        category: Option<String>,
        start: Option<String>,
        end: Option<String>,
        append_total: bool,
    },
    RecentTransactions {
        category: Option<String>,
        append_total: bool,
    },
    Branch {
        location: String,
        append_response: bool,
    },
}

impl Directive {
    pub fn parse(context: &Context) -> Self {
        if let Some(origin) = context.org.as_deref().filter(|o| !o.is_empty()) {
            return Directive::MapDirections {
                origin: origin.to_string(),
            };
        }

        if context.wants_transactions() {
            return Directive::Ledger;
        }

        let Some(action) = context.action.as_ref() else {
            return Directive::None;
        };

        let append_response = action.append_response == Some(true);
        let append_total = action.append_total == Some(true);

        let lookup = match action.lookup.as_deref() {
            Some(LOOKUP_BALANCE) => Lookup::Balance {
                account_type: action.account_type.clone(),
                append_response,
            },
            Some(LOOKUP_TRANSACTIONS) => Lookup::Transactions {
                category: action.category.clone(),
                start: action.startdt.clone(),
                end: action.enddt.clone(),
                append_total,
            },
            Some(LOOKUP_5TRANSACTIONS) => Lookup::RecentTransactions {
                category: action.category.clone(),
                append_total,
            },
            Some(LOOKUP_BRANCH) => Lookup::Branch {
                location: action.location.clone().unwrap_or_default(),
                append_response,
            },
            // `complete`, unknown values and a missing lookup
            _ => return Directive::None,
        };

        Directive::Lookup(lookup)
    }

    /// Short name for log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Directive::MapDirections { .. } => "org",
            Directive::Ledger => "getTransactions",
            Directive::Lookup(Lookup::Balance { .. }) => LOOKUP_BALANCE,
            Directive::Lookup(Lookup::Transactions { .. }) => LOOKUP_TRANSACTIONS,
            Directive::Lookup(Lookup::RecentTransactions { .. }) => LOOKUP_5TRANSACTIONS,
            Directive::Lookup(Lookup::Branch { .. }) => LOOKUP_BRANCH,
            Directive::None => "none",
        }
    }
}
