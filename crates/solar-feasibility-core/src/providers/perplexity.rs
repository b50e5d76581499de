use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, warn};

use super::{check_status, http_client, provider_error, FacilityCostProvider};
use crate::config::{HttpConfig, PerplexityConfig};
use crate::types::{Money, Sourced};
use crate::SolarResult;

const PROVIDER: &str = "perplexity";

const SYSTEM_PROMPT: &str = "You are an advanced agent with internet access. Your goal is to find \
and/or estimate the facility's name, size (ft²), EUI (kWh/ft²/year), local electricity rate ($/kWh), \
and demand charge ($/kW) for the location data the user provides. If peak demand is unknown, \
assume 200 kW. Then calculate annual cost using:\n\
(Facility Size × EUI × Electricity Rate) + (Peak kW × Demand Charge × 12).\n\
Output only a single numeric value with no text or explanation.";

/// Who and where the facility is, as given to the search model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FacilityLocation {
    pub organization: String,
    pub city: String,
    pub county: String,
    pub state: String,
}

pub fn facility_prompt(location: &FacilityLocation) -> String {
    format!(
        "You have internet access and must find data for a facility located at:\n\
         Organization: {}\n\
         City: {}\n\
         County: {}\n\
         State: {}\n\
         \n\
         Steps:\n\
         1) Confirm or determine the facility name from the above details.\n\
         2) Find or approximate the facility size (ft²).\n\
         3) Find or approximate the EUI (kWh/ft²/year) for that facility/building type.\n\
         4) Find or approximate local commercial electricity rate ($/kWh).\n\
         5) Find or approximate local demand charges ($/kW).\n\
         6) Assume 200 kW peak demand if no actual data is available.\n\
         7) Calculate annual cost:\n   \
            (Facility Size × EUI × Electricity Rate)\n   \
            + (Peak kW × Demand Charge × 12).\n\
         8) Output a single dollar amount on one line, with no explanation or sources.",
        location.organization, location.city, location.county, location.state
    )
}

/// Pull a dollar figure out of a free-text reply.
///
/// Everything except digits and `.` is dropped, then the longest numeric
/// prefix is parsed, so `"$1,250,000.00"` yields 1250000.00.
pub fn parse_estimate(reply: &str) -> Option<Decimal> {
    let cleaned: String = reply
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let mut seen_point = false;
    let numeric: String = cleaned
        .chars()
        .take_while(|c| {
            if *c == '.' {
                if seen_point {
                    return false;
                }
                seen_point = true;
            }
            true
        })
        .collect();

    let numeric = numeric.trim_end_matches('.');
    if numeric.is_empty() {
        return None;
    }
    let numeric = if numeric.starts_with('.') {
        format!("0{numeric}")
    } else {
        numeric.to_string()
    };
    Decimal::from_str(&numeric).ok()
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

/// Perplexity chat-completions client (OpenAI-compatible wire format).
pub struct PerplexityClient {
    client: reqwest::Client,
    config: PerplexityConfig,
}

impl PerplexityClient {
    pub fn new(config: &PerplexityConfig, http: &HttpConfig) -> SolarResult<Self> {
        Ok(Self {
            client: http_client(http)?,
            config: config.clone(),
        })
    }

    async fn ask(&self, location: &FacilityLocation) -> SolarResult<String> {
        if self.config.api_key.is_empty() {
            return Err(provider_error(PROVIDER, "API key not configured"));
        }

        let user_prompt = facility_prompt(location);
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        debug!(organization = %location.organization, "requesting facility cost estimate");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| provider_error(PROVIDER, format!("Request failed: {e}")))?;
        let response = check_status(PROVIDER, response).await?;

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| provider_error(PROVIDER, format!("Failed to parse response: {e}")))?;

        chat.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| provider_error(PROVIDER, "Reply contained no choices"))
    }
}

#[async_trait]
impl FacilityCostProvider for PerplexityClient {
    async fn annual_facility_cost(&self, location: &FacilityLocation) -> Sourced<Money> {
        let reply = match self.ask(location).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "facility cost estimate unavailable");
                return Sourced::degraded(Decimal::ZERO, format!("Facility cost estimate: {e}"));
            }
        };

        match parse_estimate(&reply) {
            Some(cost) => Sourced::live(cost),
            None => {
                warn!(%reply, "facility cost reply was not numeric");
                Sourced::degraded(Decimal::ZERO, "Facility cost reply was not numeric")
            }
        }
    }
}
