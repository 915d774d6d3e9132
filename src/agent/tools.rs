//! Country lookup tools the agent can invoke during a turn.

use crate::countries::CountryData;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

pub const GET_COUNTRY_CAPITAL: &str = "get_country_capital";
pub const GET_COUNTRY_FLAG: &str = "get_country_flag";

/// State key recording which country the conversation is currently about.
pub const STATE_LAST_COUNTRY: &str = "last_mentioned_country";

/// Result of one tool invocation: the payload carried in the tool-result
/// part, plus any session-state updates the tool made.
pub struct ToolOutcome {
    pub payload: serde_json::Value,
    pub state_delta: HashMap<String, String>,
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        self.payload.get("status").and_then(|s| s.as_str()) == Some("success")
    }

    pub fn result_text(&self) -> Option<&str> {
        self.payload.get("result").and_then(|r| r.as_str())
    }

    pub fn error_message(&self) -> Option<&str> {
        self.payload.get("error_message").and_then(|e| e.as_str())
    }
}

#[async_trait]
pub trait CountryTool: Send + Sync {
    /// Tool name as it appears in tool-result events.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn execute(&self, country: &str) -> ToolOutcome;
}

fn success(result: String, country: &str) -> ToolOutcome {
    let mut state_delta = HashMap::new();
    state_delta.insert(STATE_LAST_COUNTRY.to_string(), country.to_lowercase());
    ToolOutcome {
        payload: serde_json::json!({ "status": "success", "result": result }),
        state_delta,
    }
}

fn failure(error_message: String) -> ToolOutcome {
    ToolOutcome {
        payload: serde_json::json!({ "status": "error", "error_message": error_message }),
        state_delta: HashMap::new(),
    }
}

/// Retrieves the capital city for a given country.
pub struct GetCountryCapital {
    data: Arc<CountryData>,
}

impl GetCountryCapital {
    pub fn new(data: Arc<CountryData>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl CountryTool for GetCountryCapital {
    fn name(&self) -> &str {
        GET_COUNTRY_CAPITAL
    }

    fn description(&self) -> &str {
        "Retrieves the capital city for a given country."
    }

    async fn execute(&self, country: &str) -> ToolOutcome {
        match self.data.capital(country).await {
            Some(capital) => success(capital, country),
            None => failure(format!(
                "Sorry, I couldn't find the capital for {country}."
            )),
        }
    }
}

/// Retrieves the flag emoji for a given country.
pub struct GetCountryFlag {
    data: Arc<CountryData>,
}

impl GetCountryFlag {
    pub fn new(data: Arc<CountryData>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl CountryTool for GetCountryFlag {
    fn name(&self) -> &str {
        GET_COUNTRY_FLAG
    }

    fn description(&self) -> &str {
        "Retrieves the flag emoji for a given country."
    }

    async fn execute(&self, country: &str) -> ToolOutcome {
        match self.data.flag(country).await {
            Some(flag) => success(flag, country),
            None => failure(format!("Sorry, I couldn't find the flag for {country}.")),
        }
    }
}
