//! Output filename evaluation and the lock shared with metadata updates.

use chrono::{DateTime, FixedOffset};
use parking_lot::Mutex;

use super::redactor::{Redact, Redactor};
use super::template::{Template, Token, Variable};
use super::timestamp::TimestampCodec;
use crate::models::call::{CallMetadata, DeviceContext};

const PHONE_NUMBER_LABEL: &str = "phone number";
const CALLER_NAME_LABEL: &str = "caller name";
const CONTACT_NAME_LABEL: &str = "contact name";

/// Characters that must never reach the storage layer inside a name.
const PATH_SEPARATORS: [char; 3] = ['/', '\\', '\0'];

/// Output of one filename evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub filename: String,
    pub redactor: Redactor,
    /// Problems to log once the naming lock is released.
    pub warnings: Vec<String>,
}

/// Evaluates a template against call metadata.
///
/// Holds the active date pattern, which survives across evaluations so an
/// invalid custom pattern falls back to the previous one.
#[derive(Debug, Clone, Default)]
pub struct FilenameEngine {
    codec: TimestampCodec,
}

impl FilenameEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec for the currently active date pattern.
    pub fn codec(&self) -> &TimestampCodec {
        &self.codec
    }

    pub fn evaluate(
        &mut self,
        template: &Template,
        call_timestamp: &DateTime<FixedOffset>,
        metadata: &CallMetadata,
        device: &DeviceContext,
    ) -> Evaluation {
        let mut cx = EvalContext {
            engine: self,
            call_timestamp,
            metadata,
            device,
            redactor: Redactor::new(),
            warnings: Vec::new(),
        };

        let (raw, _) = cx.eval_tokens(template.tokens());
        let mut filename = sanitize(&raw);
        if filename.is_empty() {
            cx.warnings
                .push("Template produced an empty filename; using timestamp".into());
            filename = sanitize(&cx.engine.codec.format(call_timestamp));
        }

        Evaluation {
            filename,
            redactor: cx.redactor,
            warnings: cx.warnings,
        }
    }
}

struct EvalContext<'a> {
    engine: &'a mut FilenameEngine,
    call_timestamp: &'a DateTime<FixedOffset>,
    metadata: &'a CallMetadata,
    device: &'a DeviceContext,
    redactor: Redactor,
    warnings: Vec<String>,
}

impl EvalContext<'_> {
    /// Returns the text and whether every variable resolved.
    fn eval_tokens(&mut self, tokens: &[Token]) -> (String, bool) {
        let mut out = String::new();
        let mut complete = true;

        for token in tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Variable(var) => match self.resolve(var) {
                    Some(value) => out.push_str(&value),
                    None => complete = false,
                },
                Token::Group(inner) => {
                    let (text, group_complete) = self.eval_tokens(inner);
                    if group_complete {
                        out.push_str(&text);
                    }
                }
            }
        }

        (out, complete)
    }

    fn resolve(&mut self, var: &Variable) -> Option<String> {
        match var {
            Variable::Date { pattern } => {
                match pattern {
                    Some(p) => match TimestampCodec::with_pattern(p) {
                        Some(codec) => self.engine.codec = codec,
                        None => self.warnings.push(format!(
                            "Invalid date pattern {:?}; keeping {:?}",
                            p,
                            self.engine.codec.custom_pattern().unwrap_or("default")
                        )),
                    },
                    None => self.engine.codec = TimestampCodec::default(),
                }
                Some(self.engine.codec.format(self.call_timestamp))
            }
            Variable::Direction => self.metadata.direction.map(|d| d.as_str().to_string()),
            Variable::SimSlot => {
                if self.device.active_subscriptions > 1 && self.device.can_read_phone_state {
                    self.metadata.sim_slot.map(|slot| (slot + 1).to_string())
                } else {
                    None
                }
            }
            Variable::PhoneNumber => {
                let value = non_empty(&self.metadata.phone_number)?.to_string();
                Some(self.sensitive(&value, PHONE_NUMBER_LABEL))
            }
            Variable::CallerName => {
                let value = non_empty(&self.metadata.caller_name)?.to_string();
                Some(self.sensitive(&value, CALLER_NAME_LABEL))
            }
            Variable::ContactName => {
                if !self.device.can_read_contacts {
                    return None;
                }
                let value = non_empty(&self.metadata.contact_name)?.to_string();
                Some(self.sensitive(&value, CONTACT_NAME_LABEL))
            }
        }
    }

    /// Register both the raw and sanitized forms before handing the value out.
    fn sensitive(&mut self, value: &str, label: &str) -> String {
        self.redactor.add(value, label);
        self.redactor.add(&sanitize(value), label);
        value.to_string()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Replace path separators and trim surrounding whitespace.
pub fn sanitize(name: &str) -> String {
    name.replace(PATH_SEPARATORS, "_").trim().to_string()
}

struct NamingState {
    template: Option<Template>,
    metadata: CallMetadata,
    device: DeviceContext,
    engine: FilenameEngine,
    filename: Option<String>,
    redactor: Redactor,
}

impl NamingState {
    fn recompute(&mut self, call_timestamp: &DateTime<FixedOffset>) -> Option<Evaluation> {
        let template = self.template.as_ref()?;
        let eval = self
            .engine
            .evaluate(template, call_timestamp, &self.metadata, &self.device);
        self.filename = Some(eval.filename.clone());
        // Earlier names may still be on disk or in flight; never forget a value.
        self.redactor.merge(&eval.redactor);
        Some(eval)
    }
}

/// Filename and redaction map guarded by a single lock.
///
/// Metadata changes that arrive before the template is loaded are buffered
/// (latest wins) and applied by [`OutputNaming::load_template`].
pub struct OutputNaming {
    call_timestamp: DateTime<FixedOffset>,
    state: Mutex<NamingState>,
}

impl OutputNaming {
    pub fn new(metadata: CallMetadata, device: DeviceContext) -> Self {
        Self {
            call_timestamp: metadata.timestamp,
            state: Mutex::new(NamingState {
                template: None,
                metadata,
                device,
                engine: FilenameEngine::new(),
                filename: None,
                redactor: Redactor::new(),
            }),
        }
    }

    /// Timestamp of the call, fixed when the session is created.
    pub fn call_timestamp(&self) -> DateTime<FixedOffset> {
        self.call_timestamp
    }

    /// Install the template and evaluate the latest metadata against it.
    pub fn load_template(&self, template: Template) -> String {
        let eval = {
            let mut state = self.state.lock();
            state.template = Some(template);
            state.recompute(&self.call_timestamp)
        };
        let filename = eval.map(|e| self.log_evaluation(e)).unwrap_or_default();
        log::debug!("Initial filename: {}", self.redact(&filename));
        filename
    }

    /// Apply a metadata change. Returns the new filename once the template
    /// has been loaded, or `None` while the change is only buffered.
    pub fn update(&self, metadata: CallMetadata, device: DeviceContext) -> Option<String> {
        let eval = {
            let mut state = self.state.lock();
            state.metadata = metadata;
            state.device = device;
            state.recompute(&self.call_timestamp)
        };
        eval.map(|e| self.log_evaluation(e))
    }

    pub fn current(&self) -> Option<String> {
        self.state.lock().filename.clone()
    }

    /// Latest metadata snapshot.
    pub fn metadata(&self) -> CallMetadata {
        self.state.lock().metadata.clone()
    }

    /// Codec for the date pattern the filename was last built with.
    pub fn timestamp_codec(&self) -> TimestampCodec {
        self.state.lock().engine.codec().clone()
    }

    fn log_evaluation(&self, eval: Evaluation) -> String {
        for warning in &eval.warnings {
            log::warn!("{}", self.redact(warning));
        }
        eval.filename
    }
}

impl Redact for OutputNaming {
    fn redact(&self, text: &str) -> String {
        self.state.lock().redactor.redact(text)
    }
}
