//! Per-message command context.
//!
//! A [`CommandContext`] is created when a message enters the resolution
//! pipeline and accompanies it through every phase. It is a
//! copy-on-write value type: interceptors and the pipeline's own default
//! computations never mutate a context in place, they produce a
//! replacement with `with_*`/`without_*` methods and the pipeline always
//! continues with the most recently produced instance. Contexts are never
//! shared across messages, so concurrent pipelines never contend on
//! context state.

use std::{any::Any, collections::HashMap, fmt, sync::Arc};

use crate::command::Command;

/// Everything known about one in-flight message resolution.
///
/// `M` is the host's raw message type, opaque to the pipeline. The
/// optional fields fill in as phases run: prefix after prefix
/// computation, alias and parameter string after alias computation, the
/// resolved command after command computation. An interceptor may preset
/// any of them to fast-forward the pipeline.
///
/// The additional-data store carries host-defined values between
/// interceptors and the command; keys are strings, values are arbitrary
/// `Any` payloads behind `Arc`.
#[derive(Clone)]
pub struct CommandContext<M> {
    message: M,
    message_text: String,
    prefix: Option<String>,
    alias: Option<String>,
    parameter_string: Option<String>,
    command: Option<Arc<dyn Command<M>>>,
    additional: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl<M> CommandContext<M> {
    /// Creates the initial context for an incoming message.
    pub fn new(message: M, message_text: impl Into<String>) -> Self {
        CommandContext {
            message,
            message_text: message_text.into(),
            prefix: None,
            alias: None,
            parameter_string: None,
            command: None,
            additional: HashMap::new(),
        }
    }

    /// The raw message handle.
    pub fn message(&self) -> &M {
        &self.message
    }

    /// The message text the pipeline resolves against.
    pub fn message_text(&self) -> &str {
        &self.message_text
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn parameter_string(&self) -> Option<&str> {
        self.parameter_string.as_deref()
    }

    pub fn command(&self) -> Option<&Arc<dyn Command<M>>> {
        self.command.as_ref()
    }

    /// Returns a copy with the message text replaced.
    pub fn with_message_text(mut self, message_text: impl Into<String>) -> Self {
        self.message_text = message_text.into();
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn without_prefix(mut self) -> Self {
        self.prefix = None;
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn without_alias(mut self) -> Self {
        self.alias = None;
        self
    }

    pub fn with_parameter_string(mut self, parameter_string: impl Into<String>) -> Self {
        self.parameter_string = Some(parameter_string.into());
        self
    }

    pub fn without_parameter_string(mut self) -> Self {
        self.parameter_string = None;
        self
    }

    pub fn with_command(mut self, command: Arc<dyn Command<M>>) -> Self {
        self.command = Some(command);
        self
    }

    pub fn without_command(mut self) -> Self {
        self.command = None;
        self
    }

    /// Returns a copy with `value` stored under `key` in the
    /// additional-data store.
    pub fn with_additional_data(
        mut self,
        key: impl Into<String>,
        value: impl Any + Send + Sync,
    ) -> Self {
        self.additional.insert(key.into(), Arc::new(value));
        self
    }

    /// Returns a copy without the additional-data entry under `key`.
    pub fn without_additional_data(mut self, key: &str) -> Self {
        self.additional.remove(key);
        self
    }

    /// Reads a typed value from the additional-data store. `None` when
    /// the key is absent or holds a different type.
    pub fn additional_data<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.additional.get(key)?.downcast_ref()
    }
}

impl<M: fmt::Debug> fmt::Debug for CommandContext<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("message", &self.message)
            .field("message_text", &self.message_text)
            .field("prefix", &self.prefix)
            .field("alias", &self.alias)
            .field("parameter_string", &self.parameter_string)
            .field("command", &self.command.as_ref().map(|_| "<command>"))
            .field("additional_keys", &self.additional.keys().collect::<Vec<_>>())
            .finish()
    }
}
