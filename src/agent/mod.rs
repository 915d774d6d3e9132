//! The countries agent: answers capital and flag questions by calling the
//! lookup tools, keeps track of the last mentioned country in session state,
//! and hands fundamental-geography follow-ups to a general-knowledge
//! sub-agent. Everything else is refused.
//!
//! Replies are always a single JSON object with `message` and `status`
//! ("success", "error", or "denied") carried as the text part of the final
//! event. Tool invocations surface as tool-result events ahead of it.

pub mod tools;

use crate::countries::CountryData;
use crate::events::Event;
use crate::runtime::{Agent, AgentTurn, TurnRequest};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tools::{
    CountryTool, GetCountryCapital, GetCountryFlag, STATE_LAST_COUNTRY, ToolOutcome,
};

pub const AGENT_NAME: &str = "countries_agent";

const GENERAL_KNOWLEDGE_AGENT: &str = "country_general_knowledge_agent";

const GREETINGS: &[&str] = &["hi", "hello", "hey", "howdy", "good morning", "good evening"];

/// Words that mark a follow-up as fundamental physical geography, which the
/// general-knowledge sub-agent is allowed to answer.
const GEOGRAPHY_MARKERS: &[&str] = &[
    "where", "located", "location", "terrain", "climate", "mountain", "river", "coast", "ocean",
    "continent", "border", "big", "large", "size", "island", "desert",
];

pub struct CountriesAgent {
    data: Arc<CountryData>,
    capital_tool: GetCountryCapital,
    flag_tool: GetCountryFlag,
}

impl CountriesAgent {
    pub fn new(data: Arc<CountryData>) -> Self {
        Self {
            capital_tool: GetCountryCapital::new(Arc::clone(&data)),
            flag_tool: GetCountryFlag::new(Arc::clone(&data)),
            data,
        }
    }

    async fn find_country(&self, lowered: &str) -> Option<String> {
        self.data
            .known_countries()
            .await
            .into_iter()
            .find(|country| contains_word(lowered, country))
    }

    /// Run the selected tools and fold their outcomes into one turn.
    async fn answer_with_tools(
        &self,
        country: &str,
        wants_capital: bool,
        wants_flag: bool,
    ) -> AgentTurn {
        let display = title_case(country);
        let mut events = Vec::new();
        let mut fragments: Vec<String> = Vec::new();
        let mut state_delta: HashMap<String, String> = HashMap::new();
        let mut first_error: Option<String> = None;

        let mut selected: Vec<(&dyn CountryTool, &str)> = Vec::new();
        if wants_capital {
            selected.push((&self.capital_tool, "capital"));
        }
        if wants_flag {
            selected.push((&self.flag_tool, "flag"));
        }

        for (tool, kind) in selected {
            let outcome = tool.execute(&display).await;
            events.push(Event::tool_response(
                AGENT_NAME,
                tool.name(),
                outcome.payload.clone(),
            ));
            if outcome.is_success() {
                if let Some(result) = outcome.result_text() {
                    fragments.push(format!("The {kind} of {display} is {result}."));
                }
                state_delta.extend(outcome.state_delta);
            } else if first_error.is_none() {
                first_error = outcome.error_message().map(ToString::to_string);
            }
        }

        let (message, status) = match first_error {
            Some(error) if fragments.is_empty() => (error, "error"),
            Some(error) => (format!("{} {error}", fragments.join(" ")), "error"),
            None => (fragments.join(" "), "success"),
        };

        events.push(final_reply(&message, status, &fragments.join(" ")));
        AgentTurn {
            events,
            state_delta,
        }
    }

    /// Sub-agent path for fundamental-geography follow-ups about the last
    /// mentioned country. Refuses changeable topics.
    async fn general_knowledge(&self, country: &str, lowered: &str) -> AgentTurn {
        let display = title_case(country);
        if !is_geography_question(lowered) {
            return refusal(format!(
                "I can only share fundamental geographic facts about {display}. \
                 What about 'Where is {display} located?'"
            ));
        }

        let answer = match self.data.capital(country).await {
            Some(capital) => format!(
                "{display} is a sovereign country; its principal city and capital is {capital}."
            ),
            None => format!("{display} is a country I only have limited data for."),
        };

        let outcome = ToolOutcome {
            payload: serde_json::json!({ "status": "success", "result": answer }),
            state_delta: HashMap::new(),
        };
        let events = vec![
            Event::tool_response(AGENT_NAME, GENERAL_KNOWLEDGE_AGENT, outcome.payload.clone()),
            final_reply(&answer, "success", &answer),
        ];
        AgentTurn {
            events,
            state_delta: HashMap::new(),
        }
    }
}

#[async_trait]
impl Agent for CountriesAgent {
    fn name(&self) -> &str {
        AGENT_NAME
    }

    async fn run(&self, request: TurnRequest) -> anyhow::Result<AgentTurn> {
        let message = request.message.trim();
        let lowered = message.to_lowercase();

        if let Some(country) = self.find_country(&lowered).await {
            let wants_capital = lowered.contains("capital");
            let wants_flag = lowered.contains("flag");
            // A very general question about a country answers with the capital.
            let (wants_capital, wants_flag) = if wants_capital || wants_flag {
                (wants_capital, wants_flag)
            } else {
                (true, false)
            };
            return Ok(self.answer_with_tools(&country, wants_capital, wants_flag).await);
        }

        if is_greeting(&lowered) {
            let intro = "Hello! I'm the countries agent. Ask me about the capital or flag \
                         of a country, for example 'What is the capital of France?'";
            return Ok(AgentTurn {
                events: vec![final_reply(intro, "success", intro)],
                state_delta: HashMap::new(),
            });
        }

        if let Some(last) = request.state.get(STATE_LAST_COUNTRY) {
            if lowered.contains('?') || is_geography_question(&lowered) {
                return Ok(self.general_knowledge(last, &lowered).await);
            }
        }

        Ok(AgentTurn {
            events: vec![final_reply(
                "I cannot answer that. What about 'What is the capital of France?'",
                "denied",
                "",
            )],
            state_delta: HashMap::new(),
        })
    }
}

fn final_reply(message: &str, status: &str, answer_text: &str) -> Event {
    let body = serde_json::json!({ "message": message, "status": status }).to_string();
    let prompt_tokens = message.split_whitespace().count();
    let reply_tokens = answer_text.split_whitespace().count().max(1);
    Event::agent_text(AGENT_NAME, body).with_usage(serde_json::json!({
        "promptTokenCount": prompt_tokens,
        "candidatesTokenCount": reply_tokens,
        "totalTokenCount": prompt_tokens + reply_tokens,
    }))
}

fn refusal(message: String) -> AgentTurn {
    AgentTurn {
        events: vec![final_reply(&message, "denied", "")],
        state_delta: HashMap::new(),
    }
}

fn is_greeting(lowered: &str) -> bool {
    let head: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    let head = head.trim();
    GREETINGS
        .iter()
        .any(|greeting| head == *greeting || head.starts_with(&format!("{greeting} ")))
}

fn is_geography_question(lowered: &str) -> bool {
    GEOGRAPHY_MARKERS
        .iter()
        .any(|marker| contains_word(lowered, marker))
}

fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word == needle)
}

fn title_case(country: &str) -> String {
    country
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
