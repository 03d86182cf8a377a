//! Presentation formatter
//!
//! Renders lookup results into markup fragments appended to the reply
//! text. Everything here is pure. Field values are inserted as-is, without
//! HTML escaping.

use crate::models::{Account, AccountView, Branch, FaceAttributes, Transaction};
use chrono::NaiveDateTime;

pub const LEDGER_COLUMNS: [&str; 4] = ["תאריך", "סוג פעולה", "זכות ₪", "חובה ₪"];
pub const STATEMENT_COLUMNS: [&str; 3] = ["Date", "Amount", "Description"];

const MAPS_EMBED_URL: &str = "https://www.google.com/maps/embed/v1/directions";

/// Attributes placed on the `<table>` and header `<tr>` tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStyle {
    pub table: &'static str,
    pub header_row: &'static str,
}

/// Right-to-left ledger layout.
pub const LEDGER_STYLE: TableStyle = TableStyle {
    table: " class=\"trans\" dir=\"rtl\"",
    header_row: " dir=\"rtl\"",
};

pub const STATEMENT_STYLE: TableStyle = TableStyle {
    table: " class=\"statement\"",
    header_row: "",
};

/// Render an HTML table with one header row.
pub fn render_table(style: &TableStyle, columns: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = format!("<table{}><tr{}>", style.table, style.header_row);
    for column in columns {
        out.push_str("<th>");
        out.push_str(column);
        out.push_str("</th>");
    }
    out.push_str("</tr>");

    for row in rows {
        out.push_str("<tr>");
        for cell in row {
            out.push_str("<td>");
            out.push_str(cell);
            out.push_str("</td>");
        }
        out.push_str("</tr>");
    }

    out.push_str("</table>");
    out
}

pub fn render_ledger_table(rows: &[Vec<String>]) -> String {
    render_table(&LEDGER_STYLE, &LEDGER_COLUMNS, rows)
}

pub fn render_statement_table(transactions: &[Transaction]) -> String {
    render_table(&STATEMENT_STYLE, &STATEMENT_COLUMNS, &statement_rows(transactions))
}

/// Ledger rows: date, counterparty, credit, debit. Unlabelled records are skipped.
pub fn ledger_rows(transactions: &[Transaction]) -> Vec<Vec<String>> {
    transactions
        .iter()
        .filter_map(|t| {
            let label = t.label()?;
            let date = t
                .timestamp()
                .map(|ts| format_day_month_year(&ts))
                .unwrap_or_else(|| t.date.clone());
            let amount = format!("{:.2}", t.amount);
            let (credit, debit) = if t.is_debit() {
                (String::new(), amount)
            } else {
                (amount, String::new())
            };
            Some(vec![date, label.to_string(), credit, debit])
        })
        .collect()
}

/// Statement rows: date, amount as currency, description.
pub fn statement_rows(transactions: &[Transaction]) -> Vec<Vec<String>> {
    transactions
        .iter()
        .map(|t| {
            let date = t
                .timestamp()
                .map(|ts| ts.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| t.date.clone());
            vec![
                date,
                format_currency(t.amount),
                t.description
                    .as_deref()
                    .or(t.bname.as_deref())
                    .unwrap_or_default()
                    .to_string(),
            ]
        })
        .collect()
}

pub fn format_day_month_year(ts: &NaiveDateTime) -> String {
    ts.format("%d/%m/%Y").to_string()
}

/// `INR 0,0.00` style currency.
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("INR {}{}.{:02}", sign, grouped, cents % 100)
}

pub fn render_total(total: f64) -> String {
    format!("Total = <b>{}</b>", format_currency(total))
}

pub fn account_view(account: &Account) -> AccountView {
    AccountView {
        number: account.number.clone(),
        kind: account.kind.clone(),
        balance: format_currency(account.balance),
        available_credit: account.available_credit.map(format_currency),
        last_statement_balance: account.last_statement_balance.map(format_currency),
    }
}

pub fn render_balance_summary(accounts: &[AccountView]) -> String {
    accounts
        .iter()
        .map(|a| format!("{} {} Balance: {}<br/>", a.number, a.kind, a.balance))
        .collect()
}

pub fn render_branch_text(branch: Option<&Branch>, location: &str) -> String {
    match branch {
        Some(b) => format!(
            "Here are the branch details for {} <br/>Address: {}<br/>Phone: {}<br/>Operation Hours: {}<br/>",
            b.location, b.address, b.phone, b.hours
        ),
        None => format!(
            "Sorry currently we don't have branch details for {}",
            location
        ),
    }
}

pub fn render_map_embed(origin: &str, destination: &str, api_key: &str) -> String {
    format!(
        "<iframe width=\"100%\" height=\"50%\" frameborder=\"0\" style=\"border:0\" \
         src=\"{}?origin={}&destination={}&key={}\" allowfullscreen></iframe>",
        MAPS_EMBED_URL, origin, destination, api_key
    )
}

/// Text sent to the dialog engine after a picture turn.
pub fn render_face_text(face: Option<&FaceAttributes>) -> String {
    match face {
        Some(f) => format!(
            "גילך המינימלי הוא : {} גילך המקסימלי הוא {}. המין שלך הוא {}",
            f.age.min, f.age.max, f.gender
        ),
        None => "לא זוהו פנים בתמונה".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AgeRange;

    fn tx(date: &str, amount: f64, bname: Option<&str>, kind: Option<&str>) -> Transaction {
        Transaction {
            date: date.to_string(),
            amount,
            description: None,
            bname: bname.map(str::to_string),
            kind: kind.map(str::to_string),
            category: None,
        }
    }

    #[test]
    fn test_render_table() {
        let rows = vec![vec!["a".to_string(), "<b>".to_string()]];
        assert_eq!(
            render_table(&LEDGER_STYLE, &["x", "y"], &rows),
            "<table class=\"trans\" dir=\"rtl\"><tr dir=\"rtl\"><th>x</th><th>y</th></tr>\
             <tr><td>a</td><td><b></td></tr></table>"
        );
        // deterministic
        assert_eq!(
            render_table(&LEDGER_STYLE, &["x", "y"], &rows),
            render_table(&LEDGER_STYLE, &["x", "y"], &rows)
        );
    }

    #[test]
    fn test_statement_table_is_left_to_right() {
        let html = render_statement_table(&[Transaction {
            description: Some("Coffee".into()),
            ..tx("2018-03-05", 12.5, None, Some("ח"))
        }]);

        assert!(html.starts_with(
            "<table class=\"statement\"><tr><th>Date</th><th>Amount</th><th>Description</th></tr>"
        ));
        assert!(!html.contains("rtl"));
        assert!(html.contains("<tr><td>2018-03-05</td><td>INR 12.50</td><td>Coffee</td></tr>"));
        assert!(render_ledger_table(&[]).starts_with("<table class=\"trans\" dir=\"rtl\">"));
    }

    #[test]
    fn test_ledger_rows_split_credit_and_debit() {
        let rows = ledger_rows(&[
            tx("2018-03-05", 120.0, Some("Salary"), Some("ז")),
            tx("2018-03-04", 45.5, Some("Grocer"), Some("ח")),
            tx("2018-03-03", 10.0, None, None),
        ]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["05/03/2018", "Salary", "120.00", ""]);
        assert_eq!(rows[1], vec!["04/03/2018", "Grocer", "", "45.50"]);
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "INR 0.00");
        assert_eq!(format_currency(999.999), "INR 1,000.00");
        assert_eq!(format_currency(1234567.5), "INR 1,234,567.50");
        assert_eq!(format_currency(-42.1), "INR -42.10");
    }

    #[test]
    fn test_balance_summary() {
        let view = account_view(&Account {
            number: "xxx4567".into(),
            kind: "checking".into(),
            balance: 2500.0,
            available_credit: None,
            last_statement_balance: None,
        });
        assert_eq!(
            render_balance_summary(&[view]),
            "xxx4567 checking Balance: INR 2,500.00<br/>"
        );
    }

    #[test]
    fn test_branch_text() {
        let branch = Branch {
            location: "Haifa".into(),
            address: "1 Harbour St".into(),
            phone: "04-555".into(),
            hours: "8-16".into(),
        };
        assert_eq!(
            render_branch_text(Some(&branch), "haifa"),
            "Here are the branch details for Haifa <br/>Address: 1 Harbour St<br/>Phone: 04-555<br/>Operation Hours: 8-16<br/>"
        );
        assert_eq!(
            render_branch_text(None, "Eilat"),
            "Sorry currently we don't have branch details for Eilat"
        );
    }

    #[test]
    fn test_map_embed() {
        let html = render_map_embed("Haifa", "Main St 1", "k");
        assert!(html.starts_with("<iframe"));
        assert!(html.contains("origin=Haifa&destination=Main St 1&key=k"));
    }

    #[test]
    fn test_face_text() {
        let face = FaceAttributes {
            age: AgeRange { min: 25, max: 34 },
            gender: "MALE".into(),
        };
        let text = render_face_text(Some(&face));
        assert!(text.contains("25"));
        assert!(text.ends_with("MALE"));
    }
}
