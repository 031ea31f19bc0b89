//! Request pipeline facade.
//!
//! Wires identity resolution and admission in front of classification,
//! routing, cost estimation and decision logging for a calling handler.

use crate::admission::{Admission, AdmissionController, QuotaName, SweeperHandle};
use crate::config::Config;
use crate::error::Result;
use caregate_abstraction::{Priority, RoutingLogSink, TaskCategory};
use caregate_orchestrator::{BackendRouter, DecisionLogger, RoutingContext, RoutingDecision};
use http::HeaderMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Payload fields the router needs from one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequest {
    /// Conversation the message belongs to.
    pub conversation_id: String,
    /// Message text.
    pub message: String,
    /// Task category.
    pub category: TaskCategory,
    /// Declared priority.
    pub priority: Option<Priority>,
    /// Caller role from the identity collaborator.
    pub caller_role: Option<String>,
    /// Whether this opens the conversation.
    pub first_message: bool,
}

impl RouteRequest {
    /// Creates a request without priority or role.
    pub fn new(conversation_id: impl Into<String>, message: impl Into<String>, category: TaskCategory) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            message: message.into(),
            category,
            priority: None,
            caller_role: None,
            first_message: false,
        }
    }

    /// Sets the declared priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets the caller role.
    #[must_use]
    pub fn with_caller_role(mut self, role: impl Into<String>) -> Self {
        self.caller_role = Some(role.into());
        self
    }

    /// Marks the request as the first of its conversation.
    #[must_use]
    pub fn first_message(mut self, first: bool) -> Self {
        self.first_message = first;
        self
    }

    fn context(&self) -> RoutingContext {
        let mut ctx = RoutingContext::new(self.category, &self.message).first_message(self.first_message);
        if let Some(priority) = self.priority {
            ctx = ctx.with_priority(priority);
        }
        if let Some(role) = &self.caller_role {
            ctx = ctx.with_caller_role(role.clone());
        }
        ctx
    }
}

/// Admission and routing for one process.
pub struct Gateway {
    admission: AdmissionController,
    router: BackendRouter,
    logger: DecisionLogger,
    sweeper: Option<SweeperHandle>,
}

impl Gateway {
    /// Assembles a gateway from parts.
    pub fn new(admission: AdmissionController, router: BackendRouter, logger: DecisionLogger) -> Self {
        Self { admission, router, logger, sweeper: None }
    }

    /// Builds a gateway from configuration, logging decisions to `sink`.
    ///
    /// Starts the counter sweeper. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the quota table or catalogue is invalid.
    pub fn from_config(config: &Config, sink: Arc<dyn RoutingLogSink>) -> Result<Self> {
        let admission = AdmissionController::new(config.quota_table()?);
        let router = config.router()?;
        let logger = DecisionLogger::with_capacity(sink, config.routing.log_channel_capacity);

        let mut gateway = Self::new(admission, router, logger);
        gateway.start_sweeper(config.sweep_interval());
        info!(
            backends = gateway.router.catalogue().profiles().len(),
            sweep_interval_secs = config.admission.sweep_interval_secs,
            "Gateway ready"
        );
        Ok(gateway)
    }

    /// Starts (or restarts) the background counter sweeper.
    pub fn start_sweeper(&mut self, interval: Duration) {
        self.sweeper = Some(self.admission.spawn_sweeper(interval));
    }

    /// Admission controller.
    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    /// Backend router.
    pub fn router(&self) -> &BackendRouter {
        &self.router
    }

    /// Resolves the caller and checks `quota`.
    pub fn admit(&self, headers: &HeaderMap, quota: QuotaName) -> Admission {
        self.admission.enforce(headers, quota)
    }

    /// Classifies, routes and prices a request, then queues the decision log.
    ///
    /// Never waits on the log write.
    pub fn route(&self, request: &RouteRequest) -> RoutingDecision {
        let (ctx, decision) = self.router.route(&request.message, request.context());
        self.logger.log_decision(&request.conversation_id, &decision.backend, &ctx, decision.estimated_cost);
        decision
    }

    /// Entries the logger could not queue.
    pub fn dropped_log_entries(&self) -> u64 {
        self.logger.dropped()
    }

    /// Stops the sweeper and flushes queued log entries.
    pub async fn shutdown(self) {
        let Self { logger, sweeper, .. } = self;
        if let Some(sweeper) = sweeper {
            sweeper.stop();
        }
        logger.shutdown().await;
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("admission", &self.admission)
            .field("logger", &self.logger)
            .field("sweeper_running", &self.sweeper.is_some())
            .finish_non_exhaustive()
    }
}
