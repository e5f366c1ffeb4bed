//! Intent-addressed runtime
//!
//! Agents exchange [`Message`]s routed by intent identifier. Each agent holds
//! its [`InterfaceModel`] and an intent → handler table; handlers are
//! registered through `&mut self` before agents are shared, so dispatch needs
//! no locking.
//!
//! ```text
//! caller.call_method(target, "op", args)
//!   └─ model lookup → positional payload → invoke_intent
//!        └─ stamp from/to/timestamp → target.receive(message)
//!             └─ intent table lookup → handler.handle(message).await
//! ```
//!
//! The core never spawns tasks; any executor can drive these futures.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::{InterfaceModel, OperationModel};
use crate::{Error, Result};

/// Named message arguments
pub type Payload = Map<String, Value>;

/// One intent delivery between agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub intent: String,
    pub proof: Option<String>,
    pub payload: Payload,
    pub timestamp: DateTime<Utc>,
}

/// Services one intent
#[async_trait]
pub trait IntentHandler: Send + Sync {
    async fn handle(&self, message: Message) -> Result<Value>;
}

#[async_trait]
impl<F, Fut> IntentHandler for F
where
    F: Fn(Message) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send,
{
    async fn handle(&self, message: Message) -> Result<Value> {
        (self)(message).await
    }
}

/// Map positional arguments onto the operation's parameter names.
///
/// Extra arguments are dropped; parameters without an argument are omitted.
pub fn positional_payload(operation: &OperationModel, args: Vec<Value>) -> Payload {
    operation
        .parameter_names()
        .zip(args)
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// An identity with an interface model and an intent table
pub struct Agent {
    id: String,
    model: InterfaceModel,
    intents: HashMap<String, Arc<dyn IntentHandler>>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut intents: Vec<&String> = self.intents.keys().collect();
        intents.sort();
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("interface", &self.model.name)
            .field("intents", &intents)
            .finish()
    }
}

impl Agent {
    pub fn new(id: impl Into<String>, model: InterfaceModel) -> Self {
        Agent {
            id: id.into(),
            model,
            intents: HashMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn model(&self) -> &InterfaceModel {
        &self.model
    }

    /// Insert or replace the handler for `intent` with an async closure
    pub fn register_intent<F, Fut>(&mut self, intent: impl Into<String>, handler: F)
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.register_handler(intent, handler);
    }

    /// Insert or replace the handler for `intent`
    pub fn register_handler(&mut self, intent: impl Into<String>, handler: impl IntentHandler + 'static) {
        let intent = intent.into();
        if self.intents.insert(intent.clone(), Arc::new(handler)).is_some() {
            tracing::debug!(agent = %self.id, %intent, "replaced intent handler");
        } else {
            tracing::debug!(agent = %self.id, %intent, "registered intent handler");
        }
    }

    /// Register a handler for a model operation, receiving its arguments
    /// positionally in parameter order followed by the message.
    ///
    /// Missing payload fields arrive as `Value::Null`.
    ///
    /// # Errors
    /// Returns `UnknownMethod` when the operation is not in this agent's model.
    pub fn register_operation<F, Fut>(&mut self, operation: &str, handler: F) -> Result<()>
    where
        F: Fn(Vec<Value>, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let op = self.model.operation(operation).ok_or_else(|| Error::UnknownMethod {
            method: operation.to_string(),
        })?;
        let names: Vec<String> = op.parameter_names().map(String::from).collect();
        let intent = op.intent.clone();

        self.register_intent(intent, move |message: Message| {
            let args = names
                .iter()
                .map(|name| message.payload.get(name).cloned().unwrap_or(Value::Null))
                .collect();
            handler(args, message)
        });
        Ok(())
    }

    pub fn handles(&self, intent: &str) -> bool {
        self.intents.contains_key(intent)
    }

    /// True once at least one intent is registered. Advisory only.
    pub fn is_ready(&self) -> bool {
        !self.intents.is_empty()
    }

    /// Dispatch a message to the handler registered for its intent.
    ///
    /// # Errors
    /// Returns `UnhandledIntent` when no handler is registered, or whatever
    /// the handler itself returns.
    pub async fn receive(&self, message: Message) -> Result<Value> {
        let handler = match self.intents.get(&message.intent) {
            Some(handler) => Arc::clone(handler),
            None => {
                tracing::warn!(agent = %self.id, intent = %message.intent, "unhandled intent");
                return Err(Error::UnhandledIntent {
                    agent: self.id.clone(),
                    intent: message.intent,
                });
            }
        };
        tracing::debug!(
            agent = %self.id,
            from = %message.from,
            intent = %message.intent,
            "dispatching intent"
        );
        handler.handle(message).await
    }

    /// Stamp and deliver an intent to `target`.
    pub async fn invoke_intent(
        &self,
        target: &Agent,
        intent: &str,
        payload: Payload,
        proof: Option<String>,
    ) -> Result<Value> {
        let message = Message {
            from: self.id.clone(),
            to: target.id.clone(),
            intent: intent.to_string(),
            proof,
            payload,
            timestamp: Utc::now(),
        };
        target.receive(message).await
    }

    /// Call a model operation on `target` with positional arguments.
    ///
    /// # Errors
    /// Returns `UnknownMethod` when `method` is not in this agent's model.
    pub async fn call_method(&self, target: &Agent, method: &str, args: Vec<Value>) -> Result<Value> {
        let op = self.model.operation(method).ok_or_else(|| Error::UnknownMethod {
            method: method.to_string(),
        })?;
        let payload = positional_payload(op, args);
        self.invoke_intent(target, &op.intent, payload, op.proof.clone())
            .await
    }
}

// ── Transport ─────────────────────────────────────────────

/// What a generated client hands to its transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub intent: String,
    pub proof: Option<String>,
    pub payload: Payload,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> Result<Value>;
}

/// Binds one caller/target pair: every send becomes `caller.invoke_intent(target, ..)`
#[derive(Debug, Clone)]
pub struct AgentTransport {
    caller: Arc<Agent>,
    target: Arc<Agent>,
}

impl AgentTransport {
    pub fn new(caller: Arc<Agent>, target: Arc<Agent>) -> Self {
        AgentTransport { caller, target }
    }
}

#[async_trait]
impl Transport for AgentTransport {
    async fn send(&self, message: OutboundMessage) -> Result<Value> {
        self.caller
            .invoke_intent(&self.target, &message.intent, message.payload, message.proof)
            .await
    }
}

/// Model-driven client, the in-process counterpart of a generated client
pub struct IntentClient<T: Transport> {
    model: InterfaceModel,
    transport: T,
}

impl<T: Transport> IntentClient<T> {
    pub fn new(model: InterfaceModel, transport: T) -> Self {
        IntentClient { model, transport }
    }

    /// Send `operation` with positional `args` through the transport.
    ///
    /// # Errors
    /// Returns `UnknownMethod` for operations outside the model.
    pub async fn call(&self, operation: &str, args: Vec<Value>) -> Result<Value> {
        let op = self.model.operation(operation).ok_or_else(|| Error::UnknownMethod {
            method: operation.to_string(),
        })?;
        let message = OutboundMessage {
            intent: op.intent.clone(),
            proof: op.proof.clone(),
            payload: positional_payload(op, args),
        };
        self.transport.send(message).await
    }
}
