// Initial context: static vars plus generated values

use crate::context::WorkflowContext;
use crate::error::{FlowError, FlowResult};
use crate::template::TemplateRenderer;
use crate::types::{Generator, WorkflowSpec};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Placeholder replaced by a unique token in `unique` generators
pub const UNIQUE_PLACEHOLDER: &str = "unique";

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Midnight UTC on the given date
    pub fn on(date: NaiveDate) -> Self {
        Self(date.and_time(chrono::NaiveTime::MIN).and_utc())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Produces tokens that make generated values unique per run
pub trait UniqueSource: Send + Sync {
    fn next_token(&self) -> String;
}

/// Random uuid v4 in simple (hyphen-free) form
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidSource;

impl UniqueSource for UuidSource {
    fn next_token(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

/// Milliseconds since the epoch, bumped so two calls never collide
pub struct TimestampSource {
    clock: Arc<dyn Clock>,
    last: AtomicU64,
}

impl TimestampSource {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last: AtomicU64::new(0),
        }
    }
}

impl UniqueSource for TimestampSource {
    fn next_token(&self) -> String {
        let now = self.clock.now().timestamp_millis().max(0) as u64;
        let mut previous = self.last.load(Ordering::SeqCst);
        loop {
            let next = now.max(previous + 1);
            match self
                .last
                .compare_exchange(previous, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return next.to_string(),
                Err(actual) => previous = actual,
            }
        }
    }
}

/// Always returns the same token
#[derive(Debug, Clone)]
pub struct FixedSource(pub String);

impl UniqueSource for FixedSource {
    fn next_token(&self) -> String {
        self.0.clone()
    }
}

/// Builds the starting context for a run
pub struct Seeder {
    clock: Arc<dyn Clock>,
    unique: Arc<dyn UniqueSource>,
}

impl Default for Seeder {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(UuidSource))
    }
}

impl Seeder {
    pub fn new(clock: Arc<dyn Clock>, unique: Arc<dyn UniqueSource>) -> Self {
        Self { clock, unique }
    }

    /// Seed a context from the workflow's vars and generators.
    ///
    /// `overrides` replace workflow vars of the same name and suppress
    /// generators for keys they already provide.
    pub fn seed(
        &self,
        workflow: &WorkflowSpec,
        overrides: &BTreeMap<String, Value>,
    ) -> FlowResult<WorkflowContext> {
        let mut vars = workflow.vars.clone();
        vars.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut ctx: WorkflowContext = vars.into_iter().collect();

        for generator in &workflow.generate {
            if overrides.contains_key(generator.key()) {
                tracing::debug!("Generator for {} suppressed by override", generator.key());
                continue;
            }

            let value = self.generate(generator, &ctx)?;
            tracing::debug!("Generated {} = {}", generator.key(), value);
            ctx.insert(generator.key(), value)?;
        }

        Ok(ctx)
    }

    fn generate(&self, generator: &Generator, ctx: &WorkflowContext) -> FlowResult<Value> {
        match generator {
            Generator::Unique { template, .. } => {
                let token = self.unique.next_token();
                let rendered = TemplateRenderer::render_with(template, |name| {
                    if name == UNIQUE_PLACEHOLDER {
                        Some(token.clone())
                    } else {
                        ctx.get_text(name)
                    }
                })?;
                Ok(Value::String(rendered))
            }
            Generator::Date {
                key,
                offset_days,
                format,
            } => {
                let today = self.clock.today();
                let date = TimeDelta::try_days(*offset_days)
                    .and_then(|delta| today.checked_add_signed(delta))
                    .ok_or_else(|| FlowError::Generator {
                        key: key.clone(),
                        message: format!("offset of {} days is out of range", offset_days),
                    })?;

                let mut formatted = String::new();
                write!(formatted, "{}", date.format(format)).map_err(|_| FlowError::Generator {
                    key: key.clone(),
                    message: format!("invalid date format '{}'", format),
                })?;
                Ok(Value::String(formatted))
            }
        }
    }
}
