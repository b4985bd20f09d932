//! Plan → Execute → Review diagnosis pipeline.
//!
//! A pipeline run owns one [`Session`] from `Planning` to a terminal phase.
//! Phase order is strict: the plan precedes every step, steps run one at a
//! time in plan order, and review starts only after the last step recorded
//! its result. Step prompts embed the transcript of earlier steps, so this
//! ordering is load-bearing.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{error, info, info_span, warn, Instrument};

use super::agent::{self, Agent};
use super::prompts::PromptTemplates;
use super::sanitizer;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::config::PipelineConfig;
use crate::domain::models::{
    AlertEvent, Plan, Session, SessionOrigin, SessionPhase, StreamEventKind,
};
use crate::domain::ports::{ReasoningCapability, ToolRegistry};

/// Progress notifications emitted at phase and step boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineProgress {
    PlanReady { steps: usize },
    StepStarted { number: usize, total: usize, step: String },
    StepCompleted { number: usize, total: usize, result: String },
    ReviewStarted,
}

impl PipelineProgress {
    /// Human-readable line shown to interactive callers.
    pub fn message(&self) -> String {
        match self {
            Self::PlanReady { steps } => format!("Plan ready: {steps} steps."),
            Self::StepStarted { number, total, step } => {
                format!("Running step {number}/{total}: {step}")
            }
            Self::StepCompleted { result, .. } => format!("Result: {result}"),
            Self::ReviewStarted => {
                "All steps finished, generating the final report...".to_string()
            }
        }
    }

    /// Stream event kind this progress maps to.
    pub fn kind(&self) -> StreamEventKind {
        match self {
            Self::StepCompleted { .. } => StreamEventKind::Content,
            Self::PlanReady { .. } | Self::StepStarted { .. } | Self::ReviewStarted => {
                StreamEventKind::ToolLog
            }
        }
    }
}

/// Receives pipeline progress. Must not block.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: PipelineProgress);
}

/// Observer for background sessions: progress only goes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn on_progress(&self, progress: PipelineProgress) {
        info!(progress = %progress.message(), "pipeline progress");
    }
}

/// Forwards progress to a stream emitter. A closed receiver is ignored.
impl ProgressObserver for mpsc::UnboundedSender<PipelineProgress> {
    fn on_progress(&self, progress: PipelineProgress) {
        let _ = self.send(progress);
    }
}

/// The three reasoning roles plus the templates that drive them.
#[derive(Clone)]
pub struct DiagnosticPipeline {
    planner: Agent,
    executor: Agent,
    reviewer: Agent,
    prompts: Arc<PromptTemplates>,
}

impl DiagnosticPipeline {
    /// Build the pipeline. Only the executor is given the tool registry.
    pub fn new(
        reasoning: Arc<dyn ReasoningCapability>,
        tools: Arc<ToolRegistry>,
        prompts: PromptTemplates,
        config: &PipelineConfig,
    ) -> Self {
        let timeout = config.call_timeout();
        Self {
            planner: Agent::new(
                agent::PLANNER,
                prompts.planner_system.clone(),
                Arc::clone(&reasoning),
                timeout,
            ),
            executor: Agent::new(
                agent::EXECUTOR,
                prompts.executor_system.clone(),
                Arc::clone(&reasoning),
                timeout,
            )
            .with_tools(tools),
            reviewer: Agent::new(
                agent::REVIEWER,
                prompts.reviewer_system.clone(),
                reasoning,
                timeout,
            ),
            prompts: Arc::new(prompts),
        }
    }

    pub fn prompts(&self) -> &PromptTemplates {
        &self.prompts
    }

    /// New session for a firing alert.
    pub fn alert_session(&self, alert: &AlertEvent, trace_id: String) -> Session {
        let context = self.prompts.alert_context(&alert.context_vars());
        let conversation_id = Session::alert_conversation_id(&trace_id);
        Session::new(
            trace_id,
            conversation_id,
            SessionOrigin::Alert {
                alert: alert.clone(),
            },
            context,
        )
    }

    /// New session for an operator query.
    pub fn query_session(&self, query: &str, conversation_id: String, trace_id: String) -> Session {
        let context = self.prompts.query_context(query);
        Session::new(
            trace_id,
            conversation_id,
            SessionOrigin::Query {
                query: query.to_string(),
            },
            context,
        )
    }

    /// Run the session to a terminal phase and return the sanitized report.
    ///
    /// On error the session is left in `Failed` with the reason recorded.
    pub async fn run(
        &self,
        session: &mut Session,
        observer: &dyn ProgressObserver,
    ) -> DomainResult<String> {
        let span = info_span!(
            "diagnosis",
            trace_id = %session.trace_id,
            conversation_id = %session.conversation_id,
            origin = %session.origin.label(),
        );

        self.run_in_span(session, observer).instrument(span).await
    }

    async fn run_in_span(
        &self,
        session: &mut Session,
        observer: &dyn ProgressObserver,
    ) -> DomainResult<String> {
        let started = Instant::now();
        info!("diagnosis started");

        match self.run_phases(session, observer).await {
            Ok(report) => {
                session.advance(SessionPhase::Completed)?;
                info!(
                    steps = session.transcript.len(),
                    report_len = report.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "diagnosis completed"
                );
                Ok(report)
            }
            Err(err) => {
                error!(
                    phase = %session.phase(),
                    error = %err,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "diagnosis failed"
                );
                if let Err(state_err) = session.fail(err.to_string()) {
                    warn!(error = %state_err, "session already terminal");
                }
                Err(err)
            }
        }
    }

    async fn run_phases(
        &self,
        session: &mut Session,
        observer: &dyn ProgressObserver,
    ) -> DomainResult<String> {
        let plan = self.plan(session).await?;
        observer.on_progress(PipelineProgress::PlanReady { steps: plan.len() });
        session.plan = Some(plan.clone());
        session.advance(SessionPhase::Executing)?;

        self.execute(session, &plan, observer).await?;
        session.advance(SessionPhase::Reviewing)?;

        observer.on_progress(PipelineProgress::ReviewStarted);
        self.review(session).await
    }

    /// One planner call. An empty or unparsable answer is fatal.
    async fn plan(&self, session: &Session) -> DomainResult<Plan> {
        let prompt = self.prompts.plan_prompt(&session.context);
        let answer = self
            .planner
            .chat(prompt, &session.conversation_id)
            .await
            .map_err(DomainError::PlanFailed)?;

        let steps = sanitizer::parse_plan_steps(&answer);
        let plan = Plan::new(steps).ok_or(DomainError::PlanEmpty)?;
        info!(steps = plan.len(), "plan ready");
        Ok(plan)
    }

    /// Run every step in order. A failed step is recorded as text and the
    /// loop continues; only a plan where every step hit a transport-level
    /// fault fails the session.
    async fn execute(
        &self,
        session: &mut Session,
        plan: &Plan,
        observer: &dyn ProgressObserver,
    ) -> DomainResult<()> {
        let total = plan.len();
        let mut transport_failures = 0usize;

        for (index, step) in plan.steps().iter().enumerate() {
            let number = index + 1;
            observer.on_progress(PipelineProgress::StepStarted {
                number,
                total,
                step: step.clone(),
            });

            let prompt = self.prompts.execute_prompt(
                &session.context,
                &session.transcript.render(),
                step,
            );
            let result = match self.executor.chat(prompt, &session.conversation_id).await {
                Ok(text) => text,
                Err(err) => {
                    if err.is_transport() {
                        transport_failures += 1;
                    }
                    warn!(step = number, error = %err, "step failed; recording failure as result");
                    format!("Step could not be completed: {err}")
                }
            };

            session.transcript.append(step.clone(), result.clone());
            info!(step = number, total, "step recorded");
            observer.on_progress(PipelineProgress::StepCompleted {
                number,
                total,
                result,
            });
        }

        if transport_failures == total {
            return Err(DomainError::ExecutionUnavailable(total));
        }
        Ok(())
    }

    /// One reviewer call over the full transcript. Failure is fatal.
    async fn review(&self, session: &Session) -> DomainResult<String> {
        let prompt = self
            .prompts
            .review_prompt(&session.context, &session.transcript.render());
        let report = self
            .reviewer
            .chat(prompt, &session.conversation_id)
            .await
            .map_err(DomainError::ReviewFailed)?;
        Ok(sanitizer::strip(&report))
    }
}

impl std::fmt::Debug for DiagnosticPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticPipeline")
            .field("planner", &self.planner)
            .field("executor", &self.executor)
            .field("reviewer", &self.reviewer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_kinds() {
        assert_eq!(
            PipelineProgress::PlanReady { steps: 2 }.kind(),
            StreamEventKind::ToolLog
        );
        assert_eq!(
            PipelineProgress::StepCompleted {
                number: 1,
                total: 2,
                result: "ok".to_string()
            }
            .kind(),
            StreamEventKind::Content
        );
        assert_eq!(PipelineProgress::ReviewStarted.kind(), StreamEventKind::ToolLog);
    }

    #[test]
    fn test_progress_messages() {
        let started = PipelineProgress::StepStarted {
            number: 2,
            total: 3,
            step: "check logs".to_string(),
        };
        assert_eq!(started.message(), "Running step 2/3: check logs");
        assert_eq!(
            PipelineProgress::PlanReady { steps: 3 }.message(),
            "Plan ready: 3 steps."
        );
    }
}
