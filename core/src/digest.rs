//! Email digest rendering: result rows to an HTML + plaintext document with a hard size cap.

use crate::model::{ResultItem, ResultSet};
use crate::truncate::truncate;
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::Serialize;
use thiserror::Error;

/// Hard cap on the rendered HTML body, in bytes.
pub const MAX_DIGEST_BYTES: usize = 50_000;
/// Rows taken from the head of each source.
pub const MAX_ROWS_PER_SOURCE: usize = 5;
/// Byte budget for a row's content preview, before the ellipsis.
pub const DESCRIPTION_MAX_BYTES: usize = 200;

const RECIPIENT_NAME: &str = "CodeQuest User";
const EMPTY_BODY: &str = "No content";
const COLUMNS: [&str; 4] = ["Title", "Content Preview", "Score", "Link"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DigestError {
    #[error(
        "Email content too large ({size} bytes, limit {limit}). \
         Please reduce the number of results."
    )]
    TooLarge { size: usize, limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRow {
    pub item: String,
    pub description: String,
    pub score: i64,
    pub secondary_metric: u64,
    pub link: String,
}

impl EmailRow {
    pub fn from_item(item: &ResultItem) -> Self {
        let body = if item.body.trim().is_empty() { EMPTY_BODY } else { item.body.as_str() };
        Self {
            item: format!("{}: {}", item.source.tag(), item.title),
            description: truncate(Some(body), DESCRIPTION_MAX_BYTES),
            score: item.score,
            secondary_metric: item.secondary_metric,
            link: item.source.absolute_link(&item.link),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Digest {
    pub rows: Vec<EmailRow>,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
    /// UTF-8 length of `html_body`.
    pub byte_size: usize,
}

/// Product identity printed in the digest header and signature.
#[derive(Debug, Clone)]
pub struct Branding {
    pub product_name: String,
    pub product_link: Option<String>,
}

impl Default for Branding {
    fn default() -> Self {
        Self { product_name: "CodeQuest Search".to_string(), product_link: None }
    }
}

pub fn render_digest(results: &ResultSet, query: &str) -> Result<Digest, DigestError> {
    render_digest_with(results, query, &Branding::default())
}

/// Render the first rows of each source. Callers filter and sort beforehand.
pub fn render_digest_with(
    results: &ResultSet,
    query: &str,
    branding: &Branding,
) -> Result<Digest, DigestError> {
    let rows = select_rows(results);
    let subject = format!("Search Results for: {}", query);
    let html_body = render_html(&rows, query, &subject, branding);
    let text_body = render_text(&rows, query, branding);

    let byte_size = html_body.len();
    if byte_size > MAX_DIGEST_BYTES {
        tracing::warn!(size_bytes = byte_size, limit = MAX_DIGEST_BYTES, "digest over size cap");
        return Err(DigestError::TooLarge { size: byte_size, limit: MAX_DIGEST_BYTES });
    }
    tracing::debug!(rows = rows.len(), size_bytes = byte_size, "rendered digest");
    Ok(Digest { rows, subject, html_body, text_body, byte_size })
}

fn select_rows(results: &ResultSet) -> Vec<EmailRow> {
    let take = |items: &[ResultItem]| -> Vec<EmailRow> {
        items.iter().take(MAX_ROWS_PER_SOURCE).map(EmailRow::from_item).collect()
    };
    let mut rows = take(&results.reddit);
    rows.extend(take(&results.stack_overflow));
    rows
}

fn outro_lines(branding: &Branding) -> [String; 2] {
    [
        format!("Thank you for using {}!", branding.product_name),
        "If you have any questions, feel free to reach out to our support team.".to_string(),
    ]
}

fn render_html(rows: &[EmailRow], query: &str, subject: &str, branding: &Branding) -> String {
    let product = encode_text(&branding.product_name);
    let masthead = match &branding.product_link {
        Some(link) => format!(
            concat!(
                r#"<a href="{}" style="font-size:16px;font-weight:bold;color:#2f3133;"#,
                r#"text-decoration:none">{}</a>"#
            ),
            encode_double_quoted_attribute(link),
            product
        ),
        None => format!(
            r#"<span style="font-size:16px;font-weight:bold;color:#2f3133">{}</span>"#,
            product
        ),
    };

    let mut html = String::with_capacity(4096 + rows.len() * 512);
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n</head>\n", encode_text(subject)));
    html.push_str(concat!(
        r#"<body style="margin:0;padding:0;background-color:#f2f4f6;"#,
        r#"font-family:Arial,Helvetica,sans-serif;color:#51545e">"#
    ));
    html.push('\n');
    html.push_str(
        r#"<table width="100%" cellpadding="0" cellspacing="0" style="background-color:#f2f4f6">"#,
    );
    html.push_str(&format!(
        "\n<tr><td style=\"padding:25px 0;text-align:center\">{}</td></tr>\n",
        masthead
    ));
    html.push_str(r#"<tr><td style="background-color:#ffffff;padding:35px">"#);
    html.push('\n');
    html.push_str(&format!(
        "<h1 style=\"font-size:19px;color:#2f3133\">Hi {},</h1>\n",
        RECIPIENT_NAME
    ));
    html.push_str(&format!(
        "<p>Here are your search results for: &quot;{}&quot;</p>\n",
        encode_text(query)
    ));

    html.push_str(concat!(
        r#"<table width="100%" cellpadding="0" cellspacing="0" "#,
        r#"style="margin:30px 0;border-collapse:collapse">"#
    ));
    html.push_str("\n<tr>");
    for col in COLUMNS {
        html.push_str(&format!(
            concat!(
                r#"<th style="padding-bottom:8px;border-bottom:1px solid #eaeaec;"#,
                r#"text-align:left;font-size:12px">{}</th>"#
            ),
            col
        ));
    }
    html.push_str("</tr>\n");
    for row in rows {
        html.push_str(&format!(
            concat!(
                "<tr>",
                r#"<td style="padding:10px 5px;font-size:14px">{}</td>"#,
                r#"<td style="padding:10px 5px;font-size:13px">{}</td>"#,
                r#"<td style="padding:10px 5px;font-size:14px">{}</td>"#,
                r#"<td style="padding:10px 5px;font-size:13px"><a href="{}">{}</a></td>"#,
                "</tr>\n"
            ),
            encode_text(&row.item),
            encode_text(&row.description),
            row.score,
            encode_double_quoted_attribute(&row.link),
            encode_text(&row.link),
        ));
    }
    html.push_str("</table>\n");

    for line in outro_lines(branding) {
        html.push_str(&format!("<p>{}</p>\n", encode_text(&line)));
    }
    html.push_str(&format!("<p>Best regards,<br>{}</p>\n", product));
    html.push_str("</td></tr>\n");
    html.push_str(&format!(
        concat!(
            "<tr><td style=\"padding:25px;text-align:center;font-size:12px;color:#a8aaaf\">",
            "&copy; {}. All rights reserved.</td></tr>\n"
        ),
        product
    ));
    html.push_str("</table>\n</body>\n</html>\n");
    html
}

fn render_text(rows: &[EmailRow], query: &str, branding: &Branding) -> String {
    let mut text = String::new();
    text.push_str(&format!("Hi {},\n\n", RECIPIENT_NAME));
    text.push_str(&format!("Here are your search results for: \"{}\"\n\n", query));
    for row in rows {
        text.push_str(&format!("{}: {}\n", COLUMNS[0], row.item));
        text.push_str(&format!("{}: {}\n", COLUMNS[1], row.description));
        text.push_str(&format!("{}: {}\n", COLUMNS[2], row.score));
        text.push_str(&format!("{}: {}\n\n", COLUMNS[3], row.link));
    }
    for line in outro_lines(branding) {
        text.push_str(&line);
        text.push('\n');
    }
    text.push_str(&format!("\nBest regards,\n{}\n", branding.product_name));
    text
}
