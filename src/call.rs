use crate::host::{ObjectHost, ObjectId};
use crate::registry::{MethodKey, MethodRegistry};
use crate::value::{ParamKind, ParamValue};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// One formal parameter of a configured call: the declared kind the overload
/// signature is matched against, and the stored value used when live
/// arguments are absent or mismatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistentParameter {
    pub kind: ParamKind,
    pub value: ParamValue,
}

impl PersistentParameter {
    /// A freshly declared slot, holding the kind's default value.
    pub fn new(kind: ParamKind) -> Self {
        let value = kind.default_value();
        Self { kind, value }
    }

    pub fn with_value(kind: ParamKind, value: ParamValue) -> Self {
        Self { kind, value }
    }

    /// The stored value coerced to the declared kind. When no conversion
    /// exists the raw value is passed through; the target method surfaces
    /// the mismatch as an invocation fault.
    pub fn runtime_value(&self) -> ParamValue {
        self.value.convert_to(&self.kind).unwrap_or_else(|| self.value.clone())
    }
}

/// Why an invocation did nothing. Skips are the expected steady state for
/// inert or half-configured calls and are never reported as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    UnresolvedTarget,
    UnresolvedMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Invoked,
    Skipped(SkipReason),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Disabled => write!(f, "disabled"),
            SkipReason::UnresolvedTarget => write!(f, "unresolved target"),
            SkipReason::UnresolvedMethod => write!(f, "unresolved method"),
        }
    }
}

/// A serializable description of a deferred method invocation: which object,
/// which method (by name plus exact parameter signature), and what arguments
/// to use. Configured ahead of time by an external surface, invoked later by
/// a [`PersistentEvent`](crate::event::PersistentEvent).
#[derive(Clone, Serialize, Deserialize)]
pub struct PersistentCall {
    #[serde(default)]
    parent: Option<ObjectId>,
    #[serde(default)]
    target: Option<ObjectId>,
    #[serde(default)]
    method_name: String,
    #[serde(default)]
    parameters: Vec<PersistentParameter>,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    #[serde(default = "default_true")]
    pub use_runtime_parameters: bool,
    #[serde(skip)]
    resolved: Option<MethodKey>,
}

fn default_true() -> bool {
    true
}

impl Default for PersistentCall {
    fn default() -> Self {
        Self {
            parent: None,
            target: None,
            method_name: String::new(),
            parameters: Vec::new(),
            is_enabled: true,
            use_runtime_parameters: true,
            resolved: None,
        }
    }
}

impl PersistentCall {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logical owner of the target, kept for the configuration surface to
    /// enumerate candidates. Never consulted during invocation.
    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn target(&self) -> Option<ObjectId> {
        self.target
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn parameters(&self) -> &[PersistentParameter] {
        &self.parameters
    }

    /// Re-parents the call. The target starts out as the parent itself until
    /// the configuration surface picks something narrower; the previous
    /// method and its parameters no longer apply and are discarded. The
    /// enabled and runtime-parameter flags survive re-wiring.
    pub fn set_parent(&mut self, parent: Option<ObjectId>) {
        self.parent = parent;
        self.target = parent;
        self.method_name.clear();
        self.parameters.clear();
        self.resolved = None;
    }

    /// Re-targets the call, discarding the method and parameters configured
    /// for the old target. Flags survive, as with [`Self::set_parent`].
    pub fn set_target(&mut self, target: Option<ObjectId>) {
        self.target = target;
        self.method_name.clear();
        self.parameters.clear();
        self.resolved = None;
    }

    pub fn set_method_name(&mut self, name: impl Into<String>) {
        self.method_name = name.into();
        self.resolved = None;
    }

    pub fn set_parameters(&mut self, parameters: Vec<PersistentParameter>) {
        self.parameters = parameters;
        self.resolved = None;
    }

    /// Edits a stored value in place. The declared kind is untouched, so the
    /// cached resolution stays valid.
    pub fn set_parameter_value(&mut self, index: usize, value: ParamValue) -> bool {
        match self.parameters.get_mut(index) {
            Some(parameter) => {
                parameter.value = value;
                true
            }
            None => false,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    /// Looks up the target method by exact signature, caching the result.
    /// Returns the cached key untouched on repeat calls until a mutation of
    /// target, method name, or declared parameter kinds invalidates it.
    pub fn resolve(&mut self, host: &ObjectHost, registry: &MethodRegistry) -> Option<&MethodKey> {
        self.ensure_resolved(host, registry);
        self.resolved.as_ref()
    }

    fn ensure_resolved(&mut self, host: &ObjectHost, registry: &MethodRegistry) {
        if let Some(key) = &self.resolved {
            let target_type = self.target.and_then(|id| host.type_name_of(id));
            let stale =
                registry.find(key).is_none() || target_type != Some(key.type_name.as_str());
            if stale {
                self.resolved = None;
            }
        }
        if self.resolved.is_none() {
            self.resolved = self.lookup(host, registry);
        }
    }

    fn lookup(&self, host: &ObjectHost, registry: &MethodRegistry) -> Option<MethodKey> {
        let target = self.target?;
        if self.method_name.is_empty() {
            return None;
        }
        let type_name = host.type_name_of(target)?;
        let kinds: SmallVec<[ParamKind; 4]> =
            self.parameters.iter().map(|parameter| parameter.kind.clone()).collect();
        registry.resolve(type_name, &self.method_name, &kinds)
    }

    /// Invokes the configured method, forwarding `live_args` when the policy
    /// allows it and their count and kinds equal the declared signature
    /// exactly, falling back to the stored parameter values otherwise.
    ///
    /// Disabled, unconfigured, and unresolvable calls skip without error;
    /// the only `Err` this returns is a fault raised by the target method
    /// itself.
    pub fn invoke(
        &mut self,
        host: &mut ObjectHost,
        registry: &MethodRegistry,
        live_args: Option<&[ParamValue]>,
    ) -> Result<CallOutcome> {
        if !self.is_enabled {
            return Ok(CallOutcome::Skipped(SkipReason::Disabled));
        }
        let Some(target) = self.target else {
            return Ok(CallOutcome::Skipped(SkipReason::UnresolvedTarget));
        };
        if !host.contains(target) {
            return Ok(CallOutcome::Skipped(SkipReason::UnresolvedTarget));
        }

        self.ensure_resolved(host, registry);
        let Some(key) = self.resolved.as_ref() else {
            return Ok(CallOutcome::Skipped(SkipReason::UnresolvedMethod));
        };
        let Some(def) = registry.find(key) else {
            return Ok(CallOutcome::Skipped(SkipReason::UnresolvedMethod));
        };
        let Some(object) = host.get_mut(target) else {
            return Ok(CallOutcome::Skipped(SkipReason::UnresolvedTarget));
        };

        let can_use_live = self.use_runtime_parameters
            && live_args.is_some_and(|args| {
                args.len() == self.parameters.len()
                    && args
                        .iter()
                        .zip(&self.parameters)
                        .all(|(arg, parameter)| arg.matches(&parameter.kind))
            });

        if can_use_live {
            def.invoke(object, live_args.unwrap_or(&[]))?;
        } else {
            let stored: SmallVec<[ParamValue; 4]> =
                self.parameters.iter().map(PersistentParameter::runtime_value).collect();
            def.invoke(object, &stored)?;
        }
        Ok(CallOutcome::Invoked)
    }
}

impl fmt::Display for PersistentCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let method = if self.method_name.is_empty() { "<unset>" } else { &self.method_name };
        write!(f, "{method}(")?;
        for (i, parameter) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", parameter.kind)?;
        }
        write!(f, ")")
    }
}
