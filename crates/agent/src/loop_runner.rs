//! The agent reasoning loop implementation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use scout_config::AppConfig;
use scout_core::error::{Error, ToolError};
use scout_core::message::{Conversation, Message, MessageToolCall};
use scout_core::provider::{Provider, ProviderRequest, Usage};
use scout_core::tool::{ToolCall, ToolRegistry};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::stream_event::AgentEvent;

/// Where the loop is after the most recent append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    /// Waiting for the next model response.
    AwaitingModel,
    /// Running the tool calls of the latest assistant message.
    ExecutingTool,
    /// The model answered in plain text.
    Done,
}

/// The outcome of a successful run.
#[derive(Debug, Clone)]
pub struct AgentResult {
    /// Content of the final assistant message
    pub answer: String,

    /// The full message history, final answer included
    pub conversation: Conversation,

    /// Number of model calls made
    pub iterations: u32,

    /// Number of tool calls executed
    pub tool_calls_made: usize,

    /// Token usage summed over all model calls, when the provider reports it
    pub usage: Option<Usage>,
}

/// The core agent loop that orchestrates LLM calls and tool execution.
pub struct AgentLoop {
    /// The LLM provider to use
    provider: Arc<dyn Provider>,

    /// The model to use
    model: String,

    /// Temperature setting
    temperature: f32,

    /// Default max tokens per response
    max_tokens: Option<u32>,

    /// Tool registry
    tools: Arc<ToolRegistry>,

    /// Maximum model calls per run
    max_iterations: u32,

    /// Upper bound on a single tool execution
    tool_timeout: Duration,

    /// Optional system message placed before the query
    system_prompt: Option<String>,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens: None,
            tools,
            max_iterations: 10,
            tool_timeout: Duration::from_secs(30),
            system_prompt: None,
        }
    }

    /// Create an agent loop with every knob taken from the configuration.
    pub fn from_config(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        config: &AppConfig,
    ) -> Self {
        let mut agent = Self::new(provider, &config.model, config.temperature, tools)
            .with_max_iterations(config.agent.max_iterations)
            .with_tool_timeout(Duration::from_secs(config.agent.tool_timeout_secs));

        if let Some(max) = config.max_tokens {
            agent = agent.with_max_tokens(max);
        }
        if let Some(prompt) = &config.system_prompt {
            agent = agent.with_system_prompt(prompt);
        }
        agent
    }

    /// Set the maximum number of model calls per run.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set the default max tokens per LLM response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// The conversation a query starts from: optional system prompt, then the query.
    pub fn initial_conversation(&self, query: impl Into<String>) -> Conversation {
        let mut conversation = Conversation::new();
        if let Some(prompt) = &self.system_prompt {
            conversation.push(Message::system(prompt));
        }
        conversation.push(Message::user(query));
        conversation
    }

    /// Answer a query without observing intermediate states.
    pub async fn run(&self, query: &str) -> Result<AgentResult, Error> {
        let conversation = self.initial_conversation(query);
        self.execute(conversation, None, &CancellationToken::new())
            .await
    }

    /// Streaming variant of [`run`](Self::run).
    ///
    /// The loop runs on a background task; the receiver yields one
    /// `AgentEvent::Message` per appended message and ends with a single
    /// `Done` or `Error`.
    pub fn run_stream(
        self: &Arc<Self>,
        query: impl Into<String>,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<AgentEvent> {
        let (tx, rx) = mpsc::channel::<AgentEvent>(128);
        let agent = Arc::clone(self);
        let conversation = self.initial_conversation(query);

        tokio::spawn(async move {
            // The terminal event is sent by `execute` itself.
            let _ = agent.execute(conversation, Some(&tx), &cancel).await;
        });

        rx
    }

    /// Drive `conversation` to a final answer.
    ///
    /// Every message already in `conversation` is reported first, then one
    /// event per appended message, then the terminal event.
    pub async fn execute(
        &self,
        conversation: Conversation,
        events: Option<&mpsc::Sender<AgentEvent>>,
        cancel: &CancellationToken,
    ) -> Result<AgentResult, Error> {
        let outcome = self.drive(conversation, events, cancel).await;

        let terminal = match &outcome {
            Ok(result) => AgentEvent::Done {
                answer: result.answer.clone(),
                iterations: result.iterations,
                tool_calls_made: result.tool_calls_made,
                usage: result.usage,
            },
            Err(e) => AgentEvent::Error {
                message: e.to_string(),
            },
        };
        emit(events, terminal).await;

        outcome
    }

    async fn drive(
        &self,
        mut conversation: Conversation,
        events: Option<&mpsc::Sender<AgentEvent>>,
        cancel: &CancellationToken,
    ) -> Result<AgentResult, Error> {
        info!(
            conversation_id = %conversation.id,
            model = %self.model,
            provider = self.provider.name(),
            "Processing query"
        );

        for message in conversation.messages() {
            emit(
                events,
                AgentEvent::Message {
                    state: LoopState::AwaitingModel,
                    iteration: 0,
                    message: message.clone(),
                },
            )
            .await;
        }

        let tool_definitions = self.tools.definitions();
        let mut usage: Option<Usage> = None;
        let mut tool_calls_made = 0usize;
        let mut iteration = 0u32;

        loop {
            if iteration >= self.max_iterations {
                warn!(
                    conversation_id = %conversation.id,
                    max_iterations = self.max_iterations,
                    "Iteration cap reached without a final answer"
                );
                return Err(Error::IterationLimit {
                    max_iterations: self.max_iterations,
                });
            }
            iteration += 1;

            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            debug!(
                conversation_id = %conversation.id,
                iteration,
                messages = conversation.len(),
                "Calling model"
            );

            let request = ProviderRequest {
                model: self.model.clone(),
                messages: conversation.messages().to_vec(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: tool_definitions.clone(),
            };

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                response = self.provider.complete(request) => response?,
            };

            if let Some(u) = &response.usage {
                usage.get_or_insert_with(Usage::default).accumulate(u);
            }

            let message = response.message;

            if !message.requests_tools() {
                let answer = message.content.clone();
                conversation.push(message.clone());
                emit(
                    events,
                    AgentEvent::Message {
                        state: LoopState::Done,
                        iteration,
                        message,
                    },
                )
                .await;

                info!(
                    conversation_id = %conversation.id,
                    iterations = iteration,
                    tool_calls = tool_calls_made,
                    "Final answer produced"
                );

                return Ok(AgentResult {
                    answer,
                    conversation,
                    iterations: iteration,
                    tool_calls_made,
                    usage,
                });
            }

            // Every requested name must resolve before any adapter runs.
            let requested: Vec<&str> = message.tool_calls.iter().map(|c| c.name.as_str()).collect();
            if let Err(e) = self.tools.ensure_registered(&requested) {
                warn!(conversation_id = %conversation.id, error = %e, "Model requested an unknown tool");
                return Err(e);
            }

            debug!(tool_count = message.tool_calls.len(), "Executing tool calls");

            let calls = message.tool_calls.clone();
            conversation.push(message.clone());
            emit(
                events,
                AgentEvent::Message {
                    state: LoopState::ExecutingTool,
                    iteration,
                    message,
                },
            )
            .await;

            for (index, tc) in calls.iter().enumerate() {
                let output = self.run_tool(tc, cancel).await?;
                tool_calls_made += 1;

                let result = Message::tool_result(&tc.id, output);
                conversation.push(result.clone());

                let state = if index + 1 == calls.len() {
                    LoopState::AwaitingModel
                } else {
                    LoopState::ExecutingTool
                };
                emit(
                    events,
                    AgentEvent::Message {
                        state,
                        iteration,
                        message: result,
                    },
                )
                .await;
            }
        }
    }

    /// Execute one tool call and produce the text the model will see.
    ///
    /// Tool failures become `Error: ...` text; only cancellation is an `Err`.
    async fn run_tool(&self, tc: &MessageToolCall, cancel: &CancellationToken) -> Result<String, Error> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let arguments = match parse_arguments(&tc.arguments) {
            Ok(arguments) => arguments,
            Err(e) => {
                warn!(tool = %tc.name, error = %e, "Unparseable tool arguments");
                return Ok(format!("Error: {e}"));
            }
        };

        let call = ToolCall {
            id: tc.id.clone(),
            name: tc.name.clone(),
            arguments,
        };

        let start = Instant::now();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = tokio::time::timeout(self.tool_timeout, self.tools.execute(&call)) => {
                result.unwrap_or_else(|_| {
                    Err(ToolError::Timeout {
                        tool_name: tc.name.clone(),
                        timeout_secs: self.tool_timeout.as_secs(),
                    })
                })
            }
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(tool_result) => {
                debug!(
                    tool = %tc.name,
                    success = tool_result.success,
                    duration_ms,
                    "Tool executed"
                );
                Ok(tool_result.output)
            }
            Err(e) => {
                warn!(tool = %tc.name, error = %e, duration_ms, "Tool execution failed");
                // Report error to the LLM so it can recover
                Ok(format!("Error: {e}"))
            }
        }
    }
}

/// Decode the JSON argument string of a tool call. An empty string means no arguments.
fn parse_arguments(raw: &str) -> Result<serde_json::Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(Default::default()));
    }
    serde_json::from_str(raw).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

async fn emit(events: Option<&mpsc::Sender<AgentEvent>>, event: AgentEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is watching.
        let _ = tx.send(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core::error::ProviderError;
    use scout_core::message::Role;
    use scout_core::provider::ProviderResponse;
    use scout_core::tool::{Tool, ToolResult, required_str};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted assistant messages; repeats the last one when exhausted.
    struct ScriptedProvider {
        script: Mutex<VecDeque<Message>>,
        last: Mutex<Option<Message>>,
        requests: Mutex<Vec<ProviderRequest>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Message>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(None),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            self.requests.lock().unwrap().push(request);
            let next = self.script.lock().unwrap().pop_front();
            let message = match next {
                Some(m) => {
                    *self.last.lock().unwrap() = Some(m.clone());
                    m
                }
                None => self
                    .last
                    .lock()
                    .unwrap()
                    .clone()
                    .unwrap_or_else(|| Message::assistant("")),
            };
            Ok(ProviderResponse {
                message,
                usage: Some(Usage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                }),
                model: "mock-model".into(),
            })
        }
    }

    struct FailingProvider;

    #[async_trait::async_trait]
    impl Provider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::AuthenticationFailed("bad key".into()))
        }
    }

    /// Records every city it is asked about.
    struct RecordingTool {
        name: &'static str,
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait::async_trait]
    impl Tool for RecordingTool {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "Records its argument"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": { "location": { "type": "string" } },
                "required": ["location"]
            })
        }
        async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
            let location = required_str(&arguments, "location")?;
            self.seen.lock().unwrap().push(location.to_string());
            Ok(ToolResult::ok(format!("{} looked up {location}", self.name)))
        }
    }

    struct HangingTool;

    #[async_trait::async_trait]
    impl Tool for HangingTool {
        fn name(&self) -> &str {
            "hang"
        }
        fn description(&self) -> &str {
            "Never returns"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({ "type": "object" })
        }
        async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(ToolResult::ok("late"))
        }
    }

    fn call(id: &str, name: &str, arguments: &str) -> MessageToolCall {
        MessageToolCall {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    fn registry_with_recorder(name: &'static str) -> (Arc<ToolRegistry>, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(RecordingTool {
            name,
            seen: seen.clone(),
        }));
        (Arc::new(registry), seen)
    }

    async fn collect(mut rx: mpsc::Receiver<AgentEvent>) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn text_response_finishes_in_one_step() {
        let provider = Arc::new(ScriptedProvider::new(vec![Message::assistant("Bhopal.")]));
        let agent = AgentLoop::new(provider.clone(), "mock-model", 0.0, Arc::new(ToolRegistry::new()));

        let result = agent.run("What is the capital of Madhya Pradesh?").await.unwrap();
        assert_eq!(result.answer, "Bhopal.");
        assert_eq!(result.iterations, 1);
        assert_eq!(result.tool_calls_made, 0);
        // User + Assistant
        assert_eq!(result.conversation.len(), 2);
        assert_eq!(provider.calls(), 1);
        assert_eq!(result.usage.unwrap().total_tokens, 15);
    }

    #[tokio::test]
    async fn one_tool_call_then_answer() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Message::assistant_tool_calls("", vec![call("call_1", "weather", r#"{"location":"Bhopal"}"#)]),
            Message::assistant("It is hazy in Bhopal."),
        ]));
        let (tools, seen) = registry_with_recorder("weather");
        let agent = Arc::new(AgentLoop::new(provider.clone(), "mock-model", 0.0, tools));

        let events = collect(agent.run_stream("weather in Bhopal?", CancellationToken::new())).await;

        let executing = events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    AgentEvent::Message {
                        state: LoopState::ExecutingTool,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(executing, 1);
        assert_eq!(*seen.lock().unwrap(), vec!["Bhopal".to_string()]);
        assert_eq!(provider.calls(), 2);

        match events.last().unwrap() {
            AgentEvent::Done {
                answer,
                iterations,
                tool_calls_made,
                usage,
            } => {
                assert_eq!(answer, "It is hazy in Bhopal.");
                assert_eq!(*iterations, 2);
                assert_eq!(*tool_calls_made, 1);
                assert_eq!(usage.unwrap().total_tokens, 30);
            }
            other => panic!("expected Done, got {other:?}"),
        }

        // The second model call saw the tool result right after its request.
        let requests = provider.requests.lock().unwrap();
        let roles: Vec<Role> = requests[1].messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool]);
        assert_eq!(requests[1].messages[2].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(requests[1].messages[2].content, "weather looked up Bhopal");
    }

    #[tokio::test]
    async fn stream_starts_with_query_and_ends_with_terminal_event() {
        let provider = Arc::new(ScriptedProvider::new(vec![Message::assistant("done")]));
        let agent = Arc::new(AgentLoop::new(provider, "mock-model", 0.0, Arc::new(ToolRegistry::new())));

        let events = collect(agent.run_stream("hello", CancellationToken::new())).await;
        assert_eq!(events.len(), 3);

        match &events[0] {
            AgentEvent::Message {
                state,
                iteration,
                message,
            } => {
                assert_eq!(*state, LoopState::AwaitingModel);
                assert_eq!(*iteration, 0);
                assert_eq!(message.role, Role::User);
                assert_eq!(message.content, "hello");
            }
            other => panic!("expected user message, got {other:?}"),
        }
        assert!(matches!(
            &events[1],
            AgentEvent::Message {
                state: LoopState::Done,
                ..
            }
        ));
        assert!(events[2].is_terminal());
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    }

    #[tokio::test]
    async fn unregistered_tool_fails_before_any_adapter_runs() {
        let provider = Arc::new(ScriptedProvider::new(vec![Message::assistant_tool_calls(
            "",
            vec![
                call("call_1", "weather", r#"{"location":"Bhopal"}"#),
                call("call_2", "stock_quote", r#"{"ticker":"ACME"}"#),
            ],
        )]));
        let (tools, seen) = registry_with_recorder("weather");
        let agent = AgentLoop::new(provider.clone(), "mock-model", 0.0, tools);

        let err = agent.run("anything").await.unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("stock_quote"));
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn perpetual_tool_requests_hit_iteration_cap() {
        let provider = Arc::new(ScriptedProvider::new(vec![Message::assistant_tool_calls(
            "",
            vec![call("call_1", "weather", r#"{"location":"Bhopal"}"#)],
        )]));
        let (tools, seen) = registry_with_recorder("weather");
        let agent = Arc::new(
            AgentLoop::new(provider.clone(), "mock-model", 0.0, tools).with_max_iterations(3),
        );

        let events = collect(agent.run_stream("loop forever", CancellationToken::new())).await;

        assert_eq!(provider.calls(), 3);
        assert_eq!(seen.lock().unwrap().len(), 3);
        match events.last().unwrap() {
            AgentEvent::Error { message } => assert!(message.contains("3 model calls")),
            other => panic!("expected Error, got {other:?}"),
        }
        assert!(!events.iter().any(|e| matches!(e, AgentEvent::Done { .. })));
    }

    #[tokio::test]
    async fn iteration_cap_is_an_error_not_an_answer() {
        let provider = Arc::new(ScriptedProvider::new(vec![Message::assistant_tool_calls(
            "",
            vec![call("call_1", "weather", r#"{"location":"Bhopal"}"#)],
        )]));
        let (tools, _) = registry_with_recorder("weather");
        let agent = AgentLoop::new(provider, "mock-model", 0.0, tools).with_max_iterations(2);

        let err = agent.run("loop").await.unwrap_err();
        assert!(matches!(err, Error::IterationLimit { max_iterations: 2 }));
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_model_call() {
        let provider = Arc::new(ScriptedProvider::new(vec![Message::assistant("never")]));
        let agent = AgentLoop::new(provider.clone(), "mock-model", 0.0, Arc::new(ToolRegistry::new()));

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = agent
            .execute(agent.initial_conversation("hi"), None, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn sibling_calls_run_in_request_order() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Message::assistant_tool_calls(
                "",
                vec![
                    call("call_a", "weather", r#"{"location":"Bhopal"}"#),
                    call("call_b", "weather", r#"{"location":"Indore"}"#),
                    call("call_c", "weather", r#"{"location":"Gwalior"}"#),
                ],
            ),
            Message::assistant("All three looked up."),
        ]));
        let (tools, seen) = registry_with_recorder("weather");
        let agent = AgentLoop::new(provider, "mock-model", 0.0, tools);

        let result = agent.run("three cities").await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["Bhopal", "Indore", "Gwalior"]);
        assert_eq!(result.tool_calls_made, 3);

        let messages = result.conversation.messages();
        assert!(messages[1].requests_tools());
        let ids: Vec<&str> = messages[2..5]
            .iter()
            .map(|m| m.tool_call_id.as_deref().unwrap())
            .collect();
        assert_eq!(ids, vec!["call_a", "call_b", "call_c"]);
        assert_eq!(messages[5].content, "All three looked up.");
    }

    #[tokio::test]
    async fn tool_errors_are_reported_to_the_model() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Message::assistant_tool_calls(
                "",
                vec![
                    call("call_1", "weather", r#"{"city":"Bhopal"}"#),
                    call("call_2", "weather", "not json"),
                ],
            ),
            Message::assistant("Sorry, the lookup failed."),
        ]));
        let (tools, seen) = registry_with_recorder("weather");
        let agent = AgentLoop::new(provider, "mock-model", 0.0, tools);

        let result = agent.run("weather?").await.unwrap();
        let messages = result.conversation.messages();
        assert!(messages[2].content.starts_with("Error: Invalid tool arguments"));
        assert!(messages[3].content.starts_with("Error: Invalid tool arguments"));
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(result.answer, "Sorry, the lookup failed.");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_tool_times_out_and_loop_continues() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Message::assistant_tool_calls("", vec![call("call_1", "hang", "{}")]),
            Message::assistant("Gave up on the slow tool."),
        ]));
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(HangingTool));
        let agent = AgentLoop::new(provider, "mock-model", 0.0, Arc::new(registry))
            .with_tool_timeout(Duration::from_secs(5));

        let result = agent.run("slow").await.unwrap();
        let tool_msg = &result.conversation.messages()[2];
        assert_eq!(tool_msg.role, Role::Tool);
        assert!(tool_msg.content.contains("timed out"));
        assert_eq!(result.answer, "Gave up on the slow tool.");
    }

    #[tokio::test]
    async fn provider_errors_end_the_run() {
        let agent = AgentLoop::new(
            Arc::new(FailingProvider),
            "mock-model",
            0.0,
            Arc::new(ToolRegistry::new()),
        );
        let err = agent.run("hi").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Provider(ProviderError::AuthenticationFailed(_))
        ));
    }

    #[tokio::test]
    async fn system_prompt_precedes_query() {
        let provider = Arc::new(ScriptedProvider::new(vec![Message::assistant("ok")]));
        let agent = AgentLoop::new(provider.clone(), "mock-model", 0.0, Arc::new(ToolRegistry::new()))
            .with_system_prompt("Answer briefly.");

        agent.run("hi").await.unwrap();
        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[0].messages[0].role, Role::System);
        assert_eq!(requests[0].messages[1].content, "hi");
    }

    #[test]
    fn from_config_applies_agent_settings() {
        let mut config = AppConfig::default();
        config.agent.max_iterations = 4;
        config.agent.tool_timeout_secs = 7;
        config.max_tokens = Some(256);
        config.system_prompt = Some("Be terse.".into());

        let agent = AgentLoop::from_config(
            Arc::new(FailingProvider),
            Arc::new(ToolRegistry::new()),
            &config,
        );
        assert_eq!(agent.max_iterations, 4);
        assert_eq!(agent.tool_timeout, Duration::from_secs(7));
        assert_eq!(agent.max_tokens, Some(256));
        assert_eq!(agent.model, "gpt-4o");
        assert_eq!(agent.initial_conversation("q").len(), 2);
    }

    #[test]
    fn empty_arguments_parse_as_empty_object() {
        assert_eq!(parse_arguments("  ").unwrap(), serde_json::json!({}));
        assert!(parse_arguments("{").is_err());
    }
}
