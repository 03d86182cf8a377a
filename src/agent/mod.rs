//! Turn orchestrator
//!
//! REDACT → ATTACH PROFILE → DIALOG → DIRECTIVE? → LOOKUP → APPEND | RE-ASK ONCE
//!
//! Every step is a sequential await within the request. The only work that
//! outlives a turn is the detached branch-distance probe of the map path.

use crate::data::AccountDataProvider;
use crate::dialog::DialogEngine;
use crate::directions::{spawn_distance_probe, DistanceService};
use crate::directive::{Directive, Lookup};
use crate::error::AssistantError;
use crate::formatter::{
    account_view, ledger_rows, render_balance_summary, render_branch_text, render_face_text,
    render_ledger_table, render_map_embed, render_statement_table, render_total,
};
use crate::models::{parse_date, Context, Reply, Transaction, Turn};
use crate::privacy::redact_pan;
use crate::vision::{decode_data_uri, FaceClassifier};
use crate::workspace::WorkspaceHandle;
use crate::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Rows shown by the `5transactions` lookup.
const RECENT_TRANSACTIONS: usize = 5;

#[derive(Debug, Clone)]
pub struct TurnSettings {
    pub customer_id: u64,
    pub maps_api_key: String,
    pub branch_destination: String,
}

pub struct TurnOrchestrator {
    dialog: Arc<dyn DialogEngine>,
    data: Arc<dyn AccountDataProvider>,
    distances: Arc<dyn DistanceService>,
    classifier: Option<Arc<dyn FaceClassifier>>,
    workspace: WorkspaceHandle,
    settings: TurnSettings,
}

fn sort_newest_first(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
}

/// Apply `transNumber` when it is smaller than the row count; it is
/// consumed only when it actually capped something.
fn apply_row_cap<T>(rows: &mut Vec<T>, context: &mut Context) {
    if let Some(cap) = context.trans_number_cap() {
        if cap < rows.len() {
            rows.truncate(cap);
            context.trans_number = None;
        }
    }
}

/// Keep transactions strictly between `start` and `end` when both parse.
fn within_range(transactions: Vec<Transaction>, start: Option<&str>, end: Option<&str>) -> Vec<Transaction> {
    let (Some(start), Some(end)) = (start.and_then(parse_date), end.and_then(parse_date)) else {
        return transactions;
    };

    transactions
        .into_iter()
        .filter(|t| matches!(t.timestamp(), Some(ts) if ts > start && ts < end))
        .collect()
}

impl TurnOrchestrator {
    pub fn new(
        dialog: Arc<dyn DialogEngine>,
        data: Arc<dyn AccountDataProvider>,
        distances: Arc<dyn DistanceService>,
        classifier: Option<Arc<dyn FaceClassifier>>,
        workspace: WorkspaceHandle,
        settings: TurnSettings,
    ) -> Self {
        Self {
            dialog,
            data,
            distances,
            classifier,
            workspace,
            settings,
        }
    }

    pub fn workspace(&self) -> &WorkspaceHandle {
        &self.workspace
    }

    /// Run one chat turn.
    pub async fn handle_turn(&self, text: Option<&str>, client_context: Option<Context>) -> Result<Reply> {
        let workspace_id = self.workspace.require_ready()?.to_string();
        let turn_id = Uuid::new_v4();

        // Redaction happens before anything leaves the process.
        let text = redact_pan(text.unwrap_or_default());

        let profile = self.data.get_profile(self.settings.customer_id).await?;
        let mut context = client_context.unwrap_or_default();
        if context.person.is_none() {
            context.person = Some(profile);
        }
        let turn = Turn { text, context };

        debug!(%turn_id, workspace_id = %workspace_id, "Sending turn to dialog engine");
        let reply = self
            .dialog
            .send_turn(&workspace_id, &turn.text, &turn.context)
            .await?;

        let directive = Directive::parse(&reply.context);
        info!(%turn_id, directive = directive.name(), "Dialog reply received");

        match directive {
            Directive::None => Ok(reply),
            Directive::MapDirections { origin } => Ok(self.map_directions(reply, origin)),
            Directive::Ledger => self.ledger(reply).await,
            Directive::Lookup(lookup) => self.lookup(&workspace_id, &turn, reply, lookup).await,
        }
    }

    fn map_directions(&self, mut reply: Reply, origin: String) -> Reply {
        reply.output.text.push(render_map_embed(
            &origin,
            &self.settings.branch_destination,
            &self.settings.maps_api_key,
        ));
        reply.context.org = None;

        // Detached; the response does not wait for it.
        let _probe = spawn_distance_probe(
            self.data.clone(),
            self.distances.clone(),
            origin,
            reply.context.trans_number_cap(),
        );

        reply
    }

    async fn ledger(&self, mut reply: Reply) -> Result<Reply> {
        let mut summary = self
            .data
            .get_transactions(self.settings.customer_id, None)
            .await?;
        sort_newest_first(&mut summary.transactions);

        let mut rows = ledger_rows(&summary.transactions);
        apply_row_cap(&mut rows, &mut reply.context);

        reply.output.text.push(render_ledger_table(&rows));
        reply.context.get_transactions = None;
        Ok(reply)
    }

    async fn lookup(&self, workspace_id: &str, turn: &Turn, mut reply: Reply, lookup: Lookup) -> Result<Reply> {
        let customer_id = self.settings.customer_id;

        match lookup {
            Lookup::Balance {
                account_type,
                append_response,
            } => {
                let accounts = self
                    .data
                    .get_accounts(customer_id, account_type.as_deref())
                    .await?;
                let views: Vec<_> = accounts.iter().map(account_view).collect();
                let summary = render_balance_summary(&views);

                reply.context.accounts = Some(views);
                reply.context.action = None;
                self.finish_lookup(workspace_id, turn, reply, append_response, summary)
                    .await
            }

            Lookup::Branch {
                location,
                append_response,
            } => {
                let branch = self.data.get_branch(&location.to_lowercase()).await?;
                let text = render_branch_text(branch.as_ref(), &location);

                reply.context.branch = branch;
                reply.context.action = None;
                self.finish_lookup(workspace_id, turn, reply, append_response, text)
                    .await
            }

            Lookup::Transactions {
                category,
                start,
                end,
                append_total,
            } => {
                let summary = self
                    .data
                    .get_transactions(customer_id, category.as_deref())
                    .await?;
                let mut transactions =
                    within_range(summary.transactions, start.as_deref(), end.as_deref());
                sort_newest_first(&mut transactions);
                apply_row_cap(&mut transactions, &mut reply.context);

                let total = append_total.then_some(summary.total);
                append_statement(&mut reply, total, &transactions);
                reply.context.action = None;
                Ok(reply)
            }

            Lookup::RecentTransactions {
                category,
                append_total,
            } => {
                let mut summary = self
                    .data
                    .get_transactions(customer_id, category.as_deref())
                    .await?;
                sort_newest_first(&mut summary.transactions);
                summary.transactions.truncate(RECENT_TRANSACTIONS);

                let total = append_total.then_some(summary.total);
                append_statement(&mut reply, total, &summary.transactions);
                reply.context.action = None;
                Ok(reply)
            }
        }
    }

    /// Append the rendered text, or ask the dialog engine once more with the
    /// lookup result in context. The second reply is returned as-is, even if
    /// it carries another directive.
    async fn finish_lookup(
        &self,
        workspace_id: &str,
        turn: &Turn,
        mut reply: Reply,
        append_response: bool,
        text: String,
    ) -> Result<Reply> {
        if append_response {
            reply.output.text.push(text);
            return Ok(reply);
        }

        debug!("Re-asking dialog engine with lookup results");
        self.dialog
            .send_turn(workspace_id, &turn.text, &reply.context)
            .await
    }

    /// Classify an uploaded picture and forward the result as a turn.
    pub async fn handle_picture(&self, data_uri: &str, client_context: Option<Context>) -> Result<Reply> {
        let workspace_id = self.workspace.require_ready()?.to_string();
        let classifier = self
            .classifier
            .as_ref()
            .ok_or_else(|| AssistantError::upstream(Some(503), "Image classifier is not configured"))?;

        let image = decode_data_uri(data_uri)?;
        let temp = tempfile::Builder::new()
            .prefix("fl")
            .suffix(&format!(".{}", image.extension))
            .tempfile()?;
        tokio::fs::write(temp.path(), &image.bytes).await?;

        let classified = classifier.classify_face(temp.path()).await;
        if let Err(e) = temp.close() {
            warn!(error = %e, "Failed to remove uploaded picture");
        }
        let face = classified?;

        let text = render_face_text(face.as_ref());
        let mut context = client_context.unwrap_or_default();
        if let Some(face) = &face {
            context.gender = Some(face.gender.clone());
            context.age = Some(face.mean_age());
        }

        self.dialog.send_turn(&workspace_id, &text, &context).await
    }
}

/// Optional total line followed by the statement table, as one segment.
fn append_statement(reply: &mut Reply, total: Option<f64>, transactions: &[Transaction]) {
    if transactions.is_empty() && total.is_none() {
        return;
    }

    let mut segment = total.map(render_total).unwrap_or_default();
    if !transactions.is_empty() {
        segment.push_str(&render_statement_table(transactions));
    }
    reply.output.text.push(segment);
}
