pub mod binding;
pub mod context;
pub mod errors;
pub mod functions; // plugin model
pub mod value;
mod comparison;
mod engine;
mod expression;
mod parser;

use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

pub use binding::Binding;
pub use context::Context;
pub use errors::{EvalError, Result};
pub use functions::{Function, Registry};
pub use value::{GString, ScriptValue};

use engine::{Engine, Scope};

/// Something that can run a script against a binding.
pub trait Executor {
    fn execute(&self, script: &str, binding: &Binding) -> Result<Value>;
}

/// Runs scripts in the embedded expression language. Holds no per-call
/// state, so one instance can serve any number of threads.
#[derive(Clone)]
pub struct ScriptExecutor {
    ctx: Context,
    registry: Registry,
}

static SHARED: OnceLock<ScriptExecutor> = OnceLock::new();

impl ScriptExecutor {
    pub fn new(registry: Registry) -> Self {
        Self {
            ctx: Context::default(),
            registry,
        }
    }

    pub fn with_context(mut self, ctx: Context) -> Self {
        self.ctx = ctx;
        self
    }

    /// The process-wide executor with the built-in functions, created on
    /// first use. Concurrent first calls still build exactly one.
    pub fn instance() -> &'static ScriptExecutor {
        SHARED.get_or_init(|| {
            debug!("creating shared script executor");
            ScriptExecutor::new(Registry::with_builtins())
        })
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Runs `script` and returns its value without collapsing an
    /// interpolated string result.
    pub fn evaluate_raw(&self, script: &str, binding: &Binding) -> Result<ScriptValue> {
        let ast = expression::parse_script(script, self.ctx.max_depth)?;
        let mut scope = Scope::new(binding.environment(self.ctx.groovify_names));
        Engine::new(&self.registry).run(&ast, &mut scope)
    }
}

impl Default for ScriptExecutor {
    fn default() -> Self {
        Self::new(Registry::with_builtins())
    }
}

impl Executor for ScriptExecutor {
    fn execute(&self, script: &str, binding: &Binding) -> Result<Value> {
        debug!(script_len = script.len(), bindings = binding.len(), "execute");
        let raw = self.evaluate_raw(script, binding)?;
        debug!(kind = raw.kind(), "script finished");
        Ok(raw.into_plain())
    }
}

/// Convenience: run on the shared executor.
pub fn execute(script: &str, binding: &Binding) -> Result<Value> {
    ScriptExecutor::instance().execute(script, binding)
}
