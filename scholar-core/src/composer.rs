//! Response composition
//!
//! [`ResearchAssistant`] is the single entry point behind the front door: it
//! runs the retrieval answerer and the agent on the same query concurrently
//! and folds both results into one [`ResearchResponse`]. A failure in one
//! sub-flow never aborts the other.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::agent::{AgentExecutor, AgentOutcome, ReActPolicy};
use crate::config::{FailurePolicy, ScholarConfig};
use crate::conversation::SessionStore;
use crate::embeddings::{EmbeddingProvider, OpenAIEmbeddings};
use crate::error::{ErrorKind, Result, ScholarError};
use crate::llm::{LLMProvider, OpenAIProvider};
use crate::rag::{RagAnswer, RagAnswerer};
use crate::retrieval::IndexBuilder;
use crate::retry::CallPolicy;
use crate::sources::{ArxivClient, DuckDuckGoClient, PaperSource, WebSearch};
use crate::tools::{ArxivSearchTool, BoxedTool, ToolRegistry, WebSearchTool};

/// Which sub-flow produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subflow {
    Rag,
    Agent,
}

/// A sub-flow failure reported alongside the response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubflowError {
    pub source: Subflow,
    pub kind: ErrorKind,
    pub message: String,
}

impl SubflowError {
    fn new(source: Subflow, error: &ScholarError) -> Self {
        Self {
            source,
            kind: error.kind(),
            message: error.detail(),
        }
    }
}

/// Body returned for every non-empty query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchResponse {
    /// Retrieval answer, or an error marker
    pub rag: String,
    /// Agent answer, or an error marker
    pub agent: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<SubflowError>,
}

/// How many sub-flows succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Complete,
    Partial,
    Failed,
}

/// A composed response plus the status the front door maps to HTTP
#[derive(Debug, Clone)]
pub struct ComposedOutcome {
    pub response: ResearchResponse,
    status: OutcomeStatus,
    policy: FailurePolicy,
}

impl ComposedOutcome {
    /// Fold the two sub-flow results into one response
    pub fn compose(
        rag: Result<RagAnswer>,
        agent: Result<AgentOutcome>,
        policy: FailurePolicy,
    ) -> Self {
        let mut errors = Vec::new();

        let rag = match rag {
            Ok(answer) => answer.answer,
            Err(e) => {
                errors.push(SubflowError::new(Subflow::Rag, &e));
                e.marker()
            }
        };
        let agent = match agent {
            Ok(outcome) => outcome.answer,
            Err(e) => {
                errors.push(SubflowError::new(Subflow::Agent, &e));
                e.marker()
            }
        };

        let status = match errors.len() {
            0 => OutcomeStatus::Complete,
            1 => OutcomeStatus::Partial,
            _ => OutcomeStatus::Failed,
        };

        Self {
            response: ResearchResponse { rag, agent, errors },
            status,
            policy,
        }
    }

    pub fn status(&self) -> OutcomeStatus {
        self.status
    }

    /// Whether the failure policy counts this outcome as a success
    pub fn is_success(&self) -> bool {
        match (self.status, self.policy) {
            (OutcomeStatus::Complete, _) => true,
            (OutcomeStatus::Partial, FailurePolicy::Partial) => true,
            (OutcomeStatus::Partial, FailurePolicy::Strict) => false,
            (OutcomeStatus::Failed, _) => false,
        }
    }

    pub fn into_response(self) -> ResearchResponse {
        self.response
    }
}

/// Runs both sub-flows for a query
pub struct ResearchAssistant {
    rag: RagAnswerer,
    agent: AgentExecutor,
    sessions: SessionStore,
    failure_policy: FailurePolicy,
}

impl ResearchAssistant {
    pub fn new(
        rag: RagAnswerer,
        agent: AgentExecutor,
        sessions: SessionStore,
        failure_policy: FailurePolicy,
    ) -> Self {
        Self {
            rag,
            agent,
            sessions,
            failure_policy,
        }
    }

    /// Build with the hosted OpenAI, arXiv and DuckDuckGo clients.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when credentials are missing or the
    /// retrieval settings are invalid.
    pub fn from_config(config: &ScholarConfig) -> Result<Self> {
        let policy = CallPolicy::from_config(&config.resilience);

        let llm = Arc::new(OpenAIProvider::from_config(&config.llm, policy.clone())?);
        let model = llm.model().to_string();
        let embedder = Arc::new(OpenAIEmbeddings::from_config(
            &config.embeddings,
            policy.clone(),
        )?);
        let papers = Arc::new(ArxivClient::new(&config.sources.arxiv, policy.clone()));
        let web = Arc::new(DuckDuckGoClient::new(&config.sources.web, policy));

        tracing::info!(
            model = %model,
            embedding_model = %config.embeddings.model,
            failure_policy = ?config.composer.failure_policy,
            "Research assistant configured"
        );

        Self::from_parts(config, llm, embedder, papers, web)
    }

    /// Build from already-constructed clients.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the retrieval settings are invalid.
    pub fn from_parts(
        config: &ScholarConfig,
        llm: Arc<dyn LLMProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        papers: Arc<dyn PaperSource>,
        web: Arc<dyn WebSearch>,
    ) -> Result<Self> {
        let builder = IndexBuilder::new(papers.clone(), embedder, &config.retrieval)?;
        let rag = RagAnswerer::new(Arc::new(builder), llm.clone());

        let mut tools = ToolRegistry::new();
        tools
            .register_all(vec![
                Arc::new(ArxivSearchTool::new(papers, &config.sources)) as BoxedTool,
                Arc::new(WebSearchTool::new(web, &config.sources)) as BoxedTool,
            ])
            .map_err(|e| ScholarError::Configuration(e.to_string()))?;

        let agent = AgentExecutor::new(Arc::new(ReActPolicy::new(llm)), tools, &config.agent);

        Ok(Self::new(
            rag,
            agent,
            SessionStore::new(&config.conversation),
            config.composer.failure_policy,
        ))
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Answer `query` with both sub-flows.
    ///
    /// With a `session_id` the agent reads and extends that session's
    /// memory; without one it starts from an empty history.
    ///
    /// # Errors
    ///
    /// Only `InvalidQuery`; sub-flow failures are reported in the outcome.
    pub async fn ask(&self, query: &str, session_id: Option<&str>) -> Result<ComposedOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ScholarError::InvalidQuery("query must not be empty".to_string()));
        }

        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("research_query", request_id = %request_id);

        async move {
            let started = Instant::now();
            let (rag, agent) = tokio::join!(self.run_rag(query), self.run_agent(query, session_id));
            let outcome = ComposedOutcome::compose(rag, agent, self.failure_policy);

            tracing::info!(
                status = ?outcome.status(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Query answered"
            );
            Ok(outcome)
        }
        .instrument(span)
        .await
    }

    async fn run_rag(&self, query: &str) -> Result<RagAnswer> {
        let started = Instant::now();
        let result = self.rag.answer(query).await;
        log_subflow(Subflow::Rag, &result, started);
        result
    }

    async fn run_agent(&self, query: &str, session_id: Option<&str>) -> Result<AgentOutcome> {
        let started = Instant::now();
        let memory = self.sessions.resolve(session_id).await;
        let mut memory = memory.lock().await;
        let result = self.agent.run(query, &mut memory).await;
        log_subflow(Subflow::Agent, &result, started);
        result
    }
}

fn log_subflow<T>(subflow: Subflow, result: &Result<T>, started: Instant) {
    let elapsed_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(_) => tracing::debug!(subflow = ?subflow, elapsed_ms, "Sub-flow succeeded"),
        Err(e) => tracing::warn!(
            subflow = ?subflow,
            kind = %e.kind(),
            error = %e,
            elapsed_ms,
            "Sub-flow failed"
        ),
    }
}
