//! Per-service insight extraction.
//!
//! Four JSON questions are asked one after another about a single service:
//! upstream feeds, downstream consumers, the main problem and recurring
//! patterns. Each reply must be a JSON object; code fences around it are
//! tolerated, anything else is [`AIError::MalformedResponse`].

use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::AIError;
use crate::narrative::{clean_ai_output, CancellationToken, ChatClient, StreamOutcome};
use crate::types::ai::ChatMessage;
use crate::types::{Dimension, IncidentRecord};

pub const DEFAULT_INSIGHT_SYSTEM_PROMPT: &str = "You are a financial analyst for incident management.

Given a JSON array of incidents for the service: \"{service}\",

{question}

Return your answer in plain JSON format without any code fences or markdown formatting.
Only return raw JSON.";

/// Upstream and downstream lists are cut to this many entries.
pub const MAX_NEIGHBOURS: usize = 8;
pub const NO_PROBLEM: &str = "No problem identified.";
pub const NOT_AVAILABLE: &str = "Not available";

lazy_static! {
    static ref RE_CODE_FENCE: Regex = Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InsightQuestion {
    Upstream,
    Downstream,
    MainProblem,
    RecurringPatterns,
}

impl InsightQuestion {
    pub const ALL: [InsightQuestion; 4] = [
        InsightQuestion::Upstream,
        InsightQuestion::Downstream,
        InsightQuestion::MainProblem,
        InsightQuestion::RecurringPatterns,
    ];

    pub fn prompt(&self) -> &'static str {
        match self {
            InsightQuestion::Upstream => "Identify the correct array of \"upstreams based on number of incident caused\" which gives feeds to the service and return it as {\"upstream\": [ ... ]}",
            InsightQuestion::Downstream => "Identify the correct array of \"downstreams based on number of incidents caused\" which takes feeds from the service and return it as {\"downstream\": [ ... ]}",
            InsightQuestion::MainProblem => "Identify the main problem for this service and return it as {\"mainProblem\": \"...\" }",
            InsightQuestion::RecurringPatterns => "Identify and explain recurring patterns focusing on Time of the day(EST), Country, and Feeds. Return them as: {\"recurringPatterns\": {\"Time\": \"...\", \"Country\": \"...\", \"Feeds\": \"...\"}}",
        }
    }

    /// Only the recurring-pattern question sees whole rows; the others get
    /// the raw `Incident Data` text.
    pub fn uses_full_rows(&self) -> bool {
        matches!(self, InsightQuestion::RecurringPatterns)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecurringPatterns {
    pub time: String,
    pub country: String,
    pub feeds: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceInsights {
    pub service: String,
    pub incidents: usize,
    pub upstream: Vec<String>,
    pub downstream: Vec<String>,
    pub main_problem: String,
    /// `None` when the reply had no `recurringPatterns` object.
    pub recurring_patterns: Option<RecurringPatterns>,
}

/// Distinct non-empty services, ordered case-insensitively.
pub fn service_names(rows: &[IncidentRecord]) -> Vec<String> {
    let mut names: Vec<String> = rows
        .iter()
        .map(|r| r.service.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    names.sort_by(|a, b| {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    });
    names.dedup();
    names
}

pub fn system_message(template: &str, service: &str, question: InsightQuestion) -> String {
    template
        .replace("{service}", service)
        .replace("{question}", question.prompt())
}

fn row_object(row: &IncidentRecord) -> Value {
    let mut object = Map::new();
    for dimension in Dimension::ALL {
        object.insert(dimension.column().to_string(), Value::from(row.value(dimension)));
    }
    object.insert("Count".to_string(), Value::from(row.count));
    object.insert("Hours".to_string(), Value::from(row.hours));
    object.insert("Incident Data".to_string(), Value::from(row.incident_data.as_str()));
    Value::Object(object)
}

/// `Service: …` header followed by the JSON payload for `question`.
pub fn user_message(service: &str, rows: &[&IncidentRecord], question: InsightQuestion) -> String {
    let payload: Vec<Value> = if question.uses_full_rows() {
        rows.iter().map(|r| row_object(r)).collect()
    } else {
        rows.iter()
            .map(|r| Value::from(r.incident_data.as_str()))
            .collect()
    };
    format!("Service: {service}\nData:\n{}", Value::Array(payload))
}

/// Remove `<think>` blocks and code-fence markers, keeping fenced content.
pub fn strip_code_fences(text: &str) -> String {
    let cleaned = clean_ai_output(text);
    RE_CODE_FENCE.replace_all(&cleaned, "$1").trim().to_string()
}

pub fn parse_reply(text: &str) -> Result<Map<String, Value>, AIError> {
    let body = strip_code_fences(text);
    match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) | Err(_) => {
            tracing::error!("无法将 AI 回复解析为 JSON 对象: {}", body);
            Err(AIError::MalformedResponse(body.chars().take(200).collect()))
        }
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

pub fn extract_list(reply: &Map<String, Value>, key: &str) -> Vec<String> {
    reply
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(as_text).take(MAX_NEIGHBOURS).collect())
        .unwrap_or_default()
}

pub fn extract_main_problem(reply: &Map<String, Value>) -> String {
    reply
        .get("mainProblem")
        .and_then(as_text)
        .unwrap_or_else(|| NO_PROBLEM.to_string())
}

pub fn extract_recurring_patterns(reply: &Map<String, Value>) -> Option<RecurringPatterns> {
    let patterns = reply.get("recurringPatterns")?.as_object()?;
    let field = |key: &str| {
        patterns
            .get(key)
            .and_then(as_text)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    };
    Some(RecurringPatterns {
        time: field("Time"),
        country: field("Country"),
        feeds: field("Feeds"),
    })
}

/// Ask one question and parse the final snapshot.
pub async fn ask(
    client: &ChatClient,
    template: &str,
    service: &str,
    rows: &[&IncidentRecord],
    question: InsightQuestion,
    cancel: &CancellationToken,
) -> Result<Map<String, Value>, AIError> {
    let messages = vec![
        ChatMessage::system(system_message(template, service, question)),
        ChatMessage::user(user_message(service, rows, question)),
    ];
    match client.complete(messages, cancel, |_| {}).await? {
        StreamOutcome::Completed(text) => parse_reply(&text),
        StreamOutcome::Cancelled(_) => Err(AIError::Cancelled),
    }
}

/// Run all four questions for `service`, pausing `delay` between requests.
///
/// `progress` is called before each question is sent.
pub async fn collect_insights<F>(
    client: &ChatClient,
    template: &str,
    service: &str,
    rows: &[&IncidentRecord],
    delay: Duration,
    cancel: &CancellationToken,
    mut progress: F,
) -> Result<ServiceInsights, AIError>
where
    F: FnMut(InsightQuestion),
{
    let mut insights = ServiceInsights {
        service: service.to_string(),
        incidents: rows.len(),
        upstream: Vec::new(),
        downstream: Vec::new(),
        main_problem: NO_PROBLEM.to_string(),
        recurring_patterns: None,
    };

    for (i, question) in InsightQuestion::ALL.into_iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AIError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        progress(question);
        tracing::debug!(service, question = ?question, "请求服务洞察");
        let reply = ask(client, template, service, rows, question, cancel).await?;
        match question {
            InsightQuestion::Upstream => insights.upstream = extract_list(&reply, "upstream"),
            InsightQuestion::Downstream => insights.downstream = extract_list(&reply, "downstream"),
            InsightQuestion::MainProblem => insights.main_problem = extract_main_problem(&reply),
            InsightQuestion::RecurringPatterns => {
                insights.recurring_patterns = extract_recurring_patterns(&reply)
            }
        }
    }

    tracing::info!(
        service,
        upstream = insights.upstream.len(),
        downstream = insights.downstream.len(),
        "服务洞察完成"
    );
    Ok(insights)
}
