//! Reasoning engine configuration

/// Instruction seeded at the top of every new session
pub const SYSTEM_INSTRUCTION: &str = "You are a specialized assistant for currency conversions. \
Your sole purpose is to use the 'get_exchange_rate' tool to answer questions \
about currency exchange rates. \
If the user asks about anything other than currency conversion or exchange rates, \
politely state that you cannot help with that topic and can only assist with \
currency-related queries. \
Do not attempt to answer unrelated questions or use tools for other purposes. \
Set response status to input_required if the user needs to provide more information. \
Set response status to error if there is an error while processing the request. \
Set response status to completed if the request is complete.";

/// Prompt for the final structured pass
pub const VERDICT_INSTRUCTION: &str = "Respond to the user in this format: a JSON object with \
`status` (one of input_required, completed, error) and `message` (the answer for the user).";

/// Configuration for the agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model to use
    pub model: String,
    /// System prompt
    pub system_prompt: String,
    /// Maximum model turns per invocation
    pub max_iterations: usize,
    pub temperature: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "llama3.2".to_string(),
            system_prompt: SYSTEM_INSTRUCTION.to_string(),
            max_iterations: 10,
            temperature: 0.2,
        }
    }
}

impl AgentConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Take model, temperature and iteration limit from `currency.toml`
    pub fn from_config(config: &llm_core::Config) -> Self {
        Self {
            model: config.ollama.model.clone(),
            temperature: config.ollama.temperature,
            max_iterations: config.agent.max_iterations,
            ..Default::default()
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}
