//! Model backends. Each one turns an [`OracleQuery`] into an HTTP
//! completion request and parses the reply back into the wrapped output
//! object. The prompt wording lives here, outside the language core.

use std::time::Duration;

use mindscript_lang::{Backend, OracleQuery};
use serde_json::{json, Value as Json};

const TIMEOUT: Duration = Duration::from_secs(20);

fn agent() -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_read(TIMEOUT)
        .timeout_write(TIMEOUT)
        .build()
}

/// Render the instruction prompt shared by all backends: schemas, worked
/// examples, then the query.
fn build_prompt(query: &OracleQuery) -> String {
    let task = query
        .task
        .clone()
        .unwrap_or_else(|| "Given the input, determine the output.".to_string());
    let input_schema =
        serde_json::to_string_pretty(&query.input_schema).unwrap_or_else(|_| "{}".to_string());
    let output_schema =
        serde_json::to_string_pretty(&query.output_schema).unwrap_or_else(|_| "{}".to_string());

    let mut prompt = format!(
        "You are a helpful assistant, and your task is to provide answers\n\
         respecting the format of the OUTPUT JSON SCHEMA.\n\n\
         INPUT JSON SCHEMA:\n\n{input_schema}\n\n\
         OUTPUT JSON SCHEMA:\n\n{output_schema}\n"
    );
    for example in &query.examples {
        prompt.push_str(&format!(
            "\nTASK:\n\n{task}\n\nINPUT:\n\n{}\n\nOUTPUT:\n\n{}\n",
            example.input,
            json!({ "result": example.output })
        ));
    }
    prompt.push_str(&format!(
        "\nTASK:\n\n{task}\n\nINPUT:\n\n{}\n\nOUTPUT:\n\n",
        query.input
    ));
    prompt
}

fn parse_reply(text: &str, origin: &str) -> Result<Json, String> {
    serde_json::from_str(text).map_err(|e| format!("JSON decode failure from {origin}: {e}"))
}

/// An OpenAI-compatible chat completion endpoint with JSON-schema
/// structured output.
pub struct OpenAi {
    pub url: String,
    pub model: String,
    pub api_key: String,
}

impl OpenAi {
    pub fn new(url: Option<String>, model: String) -> Result<Self, String> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| "the environment variable 'OPENAI_API_KEY' is not set".to_string())?;
        Ok(Self {
            url: url.unwrap_or_else(|| "https://api.openai.com".to_string()),
            model,
            api_key,
        })
    }
}

impl Backend for OpenAi {
    fn consult(&self, query: &OracleQuery) -> Result<Json, String> {
        let url = format!("{}/v1/chat/completions", self.url);
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": build_prompt(query) }],
            "response_format": {
                "type": "json_schema",
                "json_schema": { "name": "result", "schema": query.output_schema },
            },
        });
        let reply: Json = agent()
            .post(&url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(body)
            .map_err(|e| format!("request to {url} failed: {e}"))?
            .into_json()
            .map_err(|e| format!("unreadable reply from {url}: {e}"))?;
        let content = reply["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| format!("unexpected reply shape from {url}"))?;
        parse_reply(content, &url)
    }
}

/// An Ollama server.
pub struct Ollama {
    pub url: String,
    pub model: String,
}

impl Ollama {
    pub fn new(url: Option<String>, model: String) -> Self {
        Self {
            url: url.unwrap_or_else(|| "http://localhost:11434".to_string()),
            model,
        }
    }
}

impl Backend for Ollama {
    fn consult(&self, query: &OracleQuery) -> Result<Json, String> {
        let url = format!("{}/api/generate", self.url);
        let body = json!({
            "model": self.model,
            "prompt": build_prompt(query),
            "stream": false,
            "format": query.output_schema,
        });
        let reply: Json = agent()
            .post(&url)
            .send_json(body)
            .map_err(|e| format!("request to {url} failed: {e}"))?
            .into_json()
            .map_err(|e| format!("unreadable reply from {url}: {e}"))?;
        let content = reply["response"]
            .as_str()
            .ok_or_else(|| format!("unexpected reply shape from {url}"))?;
        parse_reply(content, &url)
    }
}

/// A llama.cpp server.
pub struct LlamaCpp {
    pub url: String,
}

impl LlamaCpp {
    pub fn new(url: Option<String>) -> Self {
        Self {
            url: url.unwrap_or_else(|| "http://localhost:8080".to_string()),
        }
    }
}

impl Backend for LlamaCpp {
    fn consult(&self, query: &OracleQuery) -> Result<Json, String> {
        let url = format!("{}/completion", self.url);
        let body = json!({
            "prompt": build_prompt(query),
            "json_schema": query.output_schema,
        });
        let reply: Json = agent()
            .post(&url)
            .send_json(body)
            .map_err(|e| format!("request to {url} failed: {e}"))?
            .into_json()
            .map_err(|e| format!("unreadable reply from {url}: {e}"))?;
        let content = reply["content"]
            .as_str()
            .ok_or_else(|| format!("unexpected reply shape from {url}"))?;
        parse_reply(content, &url)
    }
}
