//! AI performance reports: pick the months to cover, describe them in a
//! prompt, and ask an OpenAI-compatible chat-completions endpoint for an HTML
//! report. One request per report; nothing is retried.

use std::{collections::BTreeSet, time::Duration};

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::OpenAiConfig,
    format,
    models::{Client, OrganicPeriod, PaidPeriod, SavedReport},
};

/// The selected month plus this many earlier months.
const MONTHS_BEFORE: usize = 3;

const SYSTEM_PROMPT: &str = "You are a digital marketing and data analysis specialist focused on \
Google Ads and SEO. You write professional, detailed and actionable client reports in HTML.";

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("no API key configured")]
    NotConfigured,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("response contained no report")]
    EmptyResponse,
}

/// The data one report is built from.
#[derive(Debug)]
pub struct ReportInput<'a> {
    pub client: &'a Client,
    pub selected_month: String,
    /// Newest first, starting at `selected_month`.
    pub months: Vec<String>,
    pub paid: Vec<&'a PaidPeriod>,
    pub organic: Vec<&'a OrganicPeriod>,
    pub additional_context: Option<String>,
}

impl<'a> ReportInput<'a> {
    /// Collect `month` and up to three earlier months that have paid or
    /// organic data. `None` when the client has no data for `month`.
    pub fn select(client: &'a Client, month: &str, additional_context: Option<String>) -> Option<Self> {
        let available: BTreeSet<&str> = client
            .monthly_data
            .iter()
            .map(|p| p.month.as_str())
            .chain(client.organic_data.iter().map(|p| p.month.as_str()))
            .collect();

        if !available.contains(month) {
            return None;
        }

        let months: Vec<String> = available
            .iter()
            .rev()
            .skip_while(|m| **m != month)
            .take(MONTHS_BEFORE + 1)
            .map(|m| m.to_string())
            .collect();

        let paid = months
            .iter()
            .filter_map(|m| client.monthly_data.iter().find(|p| &p.month == m))
            .collect();
        let organic = months
            .iter()
            .filter_map(|m| client.organic_data.iter().find(|p| &p.month == m))
            .collect();

        Some(Self {
            client,
            selected_month: month.to_owned(),
            months,
            paid,
            organic,
            additional_context: additional_context.filter(|c| !c.trim().is_empty()),
        })
    }

    pub fn into_saved_report(self, html_content: String) -> SavedReport {
        SavedReport {
            id: Uuid::new_v4().to_string(),
            month: self.selected_month,
            generated_at: Utc::now(),
            html_content,
            has_paid_traffic: !self.paid.is_empty(),
            has_organic_traffic: !self.organic.is_empty(),
        }
    }
}

fn paid_section(p: &PaidPeriod) -> String {
    let mut out = format!(
        "**{}** ({} to {}):\n\
         - Clicks: {}\n\
         - Impressions: {}\n\
         - Conversions: {}\n\
         - CPC: {}\n\
         - Total spent: {}\n\
         - Conversion rate: {}\n",
        format::month(&p.month),
        p.start_date,
        p.end_date,
        format::number(p.clicks),
        format::number(p.impressions),
        format::number(p.conversions),
        format::money(p.cost_per_click),
        format::money(p.total_spent),
        format::percent(p.conversion_rate),
    );

    match (&p.keywords, &p.top_keywords) {
        (Some(keywords), _) if !keywords.is_empty() => {
            out.push_str("- Top keywords (representative sample):\n");
            for kw in keywords {
                let ctr = if kw.impressions > 0.0 {
                    kw.clicks / kw.impressions * 100.0
                } else {
                    0.0
                };
                out.push_str(&format!(
                    "  • \"{}\": {} clicks, {} impressions, CPC {}, {} conversions, cost {}, CTR {}\n",
                    kw.name,
                    format::number(kw.clicks),
                    format::number(kw.impressions),
                    format::money(kw.cpc),
                    format::number(kw.conversions),
                    format::money(kw.cost),
                    format::percent(ctr),
                ));
            }
        }
        (_, Some(top)) if !top.trim().is_empty() => {
            out.push_str(&format!("- Top keywords:\n{top}\n"));
        }
        _ => {}
    }
    out
}

fn organic_section(p: &OrganicPeriod) -> String {
    let mut out = format!(
        "**{}** ({} to {}):\n\
         - Impressions: {}\n\
         - Clicks: {}\n\
         - Average position: {:.1}\n",
        format::month(&p.month),
        p.start_date,
        p.end_date,
        format::number(p.impressions),
        format::number(p.clicks),
        p.average_position,
    );
    if let Some(sessions) = p.sessions.filter(|v| *v > 0.0) {
        out.push_str(&format!("- Sessions: {}\n", format::number(sessions)));
    }
    if let Some(conversions) = p.organic_conversions.filter(|v| *v > 0.0) {
        out.push_str(&format!("- Conversions: {}\n", format::number(conversions)));
    }
    if let Some(rate) = p.conversion_rate.filter(|v| *v > 0.0) {
        out.push_str(&format!("- Conversion rate: {}\n", format::percent(rate)));
    }
    if let Some(keywords) = p.keywords.as_deref().filter(|k| !k.is_empty()) {
        out.push_str("- Top keywords (representative sample):\n");
        for kw in keywords {
            let ctr = if kw.impressions > 0.0 {
                kw.clicks / kw.impressions * 100.0
            } else {
                0.0
            };
            out.push_str(&format!(
                "  • \"{}\": {} clicks, {} impressions, CTR {}\n",
                kw.name,
                format::number(kw.clicks),
                format::number(kw.impressions),
                format::percent(ctr),
            ));
        }
    }
    out
}

pub fn build_prompt(input: &ReportInput<'_>) -> String {
    let paid = if input.paid.is_empty() {
        "No data available".to_owned()
    } else {
        input.paid.iter().map(|p| paid_section(p)).collect::<Vec<_>>().join("\n")
    };
    let organic = if input.organic.is_empty() {
        "No data available".to_owned()
    } else {
        input
            .organic
            .iter()
            .map(|p| organic_section(p))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let mut prompt = String::new();
    prompt.push_str(
        "Write a professional, detailed performance report to present to the client. \
         Write it in Brazilian Portuguese.\n\n",
    );
    prompt.push_str("**CLIENT:**\n");
    prompt.push_str(&format!("- Name: {}\n", input.client.name));
    if let Some(company) = &input.client.company {
        prompt.push_str(&format!("- Company: {company}\n"));
    }
    prompt.push_str(&format!(
        "- Main month under analysis: {}\n\n",
        format::month(&input.selected_month)
    ));
    prompt.push_str(&format!("**PAID TRAFFIC (Google Ads):**\n{paid}\n\n"));
    prompt.push_str(&format!("**ORGANIC TRAFFIC (SEO):**\n{organic}\n\n"));

    if let Some(context) = &input.additional_context {
        prompt.push_str(&format!(
            "**ADDITIONAL CONTEXT:**\n{context}\n\n\
             Use this context to explain variations in the data and sharpen the insights.\n\n"
        ));
    }

    prompt.push_str(
        "**STRUCTURE:**\n\
         1. Title and executive introduction summarising the period's highlights.\n\
         2. Paid traffic analysis: month-over-month comparison, trends, investment \
            efficiency (CPC, conversions, ROI), keyword performance with optimisation ideas.\n\
         3. Organic traffic analysis: impressions and clicks across months, average \
            position evolution, keyword performance, relation to paid traffic.\n\
         4. Three to five strategic insights with concrete actions.\n\
         5. Conclusion with suggested next steps.\n\n\
         **FORMAT:**\n\
         - Well-formed semantic HTML: h2, h3, p, ul, li, tables for comparisons.\n\
         - Do NOT use h1; the page header adds it.\n\
         - Highlight boxes may use divs with classes 'info-box', 'warning-box', 'success-box'.\n\
         - Use <strong> and <em> for emphasis and format numbers with thousands separators.\n\
         - Return ONLY the HTML body content: no preamble, no markdown code blocks.\n",
    );
    prompt
}

/// Drop a surrounding markdown code fence if the model added one anyway.
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

pub struct ReportGenerator {
    http: reqwest::Client,
    config: OpenAiConfig,
}

impl ReportGenerator {
    pub fn new(config: OpenAiConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Generate the HTML body of a report for `input`.
    pub async fn generate(&self, input: &ReportInput<'_>) -> Result<String, ReportError> {
        let api_key = self.config.api_key.as_deref().ok_or(ReportError::NotConfigured)?;

        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_prompt(input) },
            ],
            "temperature": 0.7,
            "max_tokens": 4000,
        });

        let resp = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error)
                .and_then(|e| e.message)
                .unwrap_or_else(|| "unknown error".to_owned());
            return Err(ReportError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = resp.json().await?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(ReportError::EmptyResponse)?;

        let html = strip_code_fence(&content);
        if html.is_empty() {
            return Err(ReportError::EmptyResponse);
        }

        tracing::info!(
            "Generated report for client {} ({})",
            input.client.id,
            input.selected_month
        );
        Ok(html.to_owned())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{client, organic, paid};
    use axum::http::StatusCode;

    fn sample_client() -> Client {
        let mut c = client("c1", "Acme");
        c.company = Some("Acme Ltd".into());
        for (i, m) in ["2025-01", "2025-02", "2025-03", "2025-04", "2025-05"].iter().enumerate() {
            c.insert_paid(paid(&format!("p{i}"), m, 100.0, 1000.0, 5.0, 150.0));
        }
        c.insert_organic(organic("o1", "2025-06", 5000.0, 200.0, 7.5));
        c
    }

    fn config(url: String, key: Option<&str>) -> OpenAiConfig {
        OpenAiConfig {
            api_key: key.map(str::to_owned),
            api_url: url,
            model: "test-model".into(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn selects_month_and_three_before() {
        let c = sample_client();
        let input = ReportInput::select(&c, "2025-05", None).unwrap();
        assert_eq!(input.months, ["2025-05", "2025-04", "2025-03", "2025-02"]);
        assert_eq!(input.paid.len(), 4);
        assert!(input.organic.is_empty());

        let latest = ReportInput::select(&c, "2025-06", None).unwrap();
        assert_eq!(latest.months[0], "2025-06");
        assert_eq!(latest.organic.len(), 1);
        assert_eq!(latest.paid.len(), 3);
    }

    #[test]
    fn unknown_month_selects_nothing() {
        assert!(ReportInput::select(&sample_client(), "2024-12", None).is_none());
    }

    #[test]
    fn prompt_mentions_client_and_metrics() {
        let c = sample_client();
        let input = ReportInput::select(&c, "2025-06", Some("Black Friday campaign".into())).unwrap();
        let prompt = build_prompt(&input);
        assert!(prompt.contains("- Name: Acme"));
        assert!(prompt.contains("- Company: Acme Ltd"));
        assert!(prompt.contains("junho de 2025"));
        assert!(prompt.contains("Brazilian Portuguese"));
        assert!(prompt.contains("Total spent: R$ 150,00"));
        assert!(prompt.contains("Average position: 7.5"));
        assert!(prompt.contains("Black Friday campaign"));
    }

    #[test]
    fn saved_report_flags_traffic_types() {
        let c = sample_client();
        let report = ReportInput::select(&c, "2025-05", None)
            .unwrap()
            .into_saved_report("<p>ok</p>".into());
        assert!(report.has_paid_traffic);
        assert!(!report.has_organic_traffic);
        assert_eq!(report.month, "2025-05");
    }

    #[test]
    fn strips_fences() {
        assert_eq!(strip_code_fence("```html\n<h2>Hi</h2>\n```"), "<h2>Hi</h2>");
        assert_eq!(strip_code_fence("  <p>plain</p>\n"), "<p>plain</p>");
    }

    #[tokio::test]
    async fn generate_without_key_is_not_configured() {
        let c = sample_client();
        let input = ReportInput::select(&c, "2025-05", None).unwrap();
        let gen = ReportGenerator::new(config("http://127.0.0.1:9/".into(), None)).unwrap();
        assert!(matches!(gen.generate(&input).await, Err(ReportError::NotConfigured)));
    }

    #[tokio::test]
    async fn generate_returns_model_html() {
        let url = fake::serve(Ok("```html\n<h2>Summary</h2>\n```")).await;
        let c = sample_client();
        let input = ReportInput::select(&c, "2025-05", None).unwrap();
        let gen = ReportGenerator::new(config(url, Some("sk-test"))).unwrap();
        assert_eq!(gen.generate(&input).await.unwrap(), "<h2>Summary</h2>");
    }

    #[tokio::test]
    async fn generate_surfaces_api_errors() {
        let url = fake::serve(Err(StatusCode::TOO_MANY_REQUESTS)).await;
        let c = sample_client();
        let input = ReportInput::select(&c, "2025-05", None).unwrap();
        let gen = ReportGenerator::new(config(url, Some("sk-test"))).unwrap();
        match gen.generate(&input).await {
            Err(ReportError::Api { status, message }) => {
                assert_eq!(status, 429);
                assert_eq!(message, "quota exceeded");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
