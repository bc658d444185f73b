use crate::call::{CallOutcome, PersistentCall};
use crate::host::ObjectHost;
use crate::registry::MethodRegistry;
use crate::value::ParamValue;
use anyhow::{Context, Result};
use bincode::Options;
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};
use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::Path;

/// Handle to a runtime listener, returned by
/// [`PersistentEvent::add_listener`]. Stands in for delegate identity:
/// removing by id is how code-registered listeners unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A fault raised by one call's target method during a dispatch pass.
pub struct InvokeFault {
    pub index: usize,
    pub method: String,
    pub error: anyhow::Error,
}

impl fmt::Display for InvokeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let method = if self.method.is_empty() { "<unset>" } else { &self.method };
        write!(f, "call #{} {}: {:#}", self.index, method, self.error)
    }
}

/// Result of one dispatch pass over a call list. Faults are collected, never
/// thrown mid-pass, so one failing listener cannot block the rest.
#[derive(Default)]
pub struct DispatchReport {
    pub invoked: usize,
    pub skipped: usize,
    pub faults: Vec<InvokeFault>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }

    /// One diagnostic line per collected fault.
    pub fn log_faults(&self) {
        for fault in &self.faults {
            eprintln!("[event] persistent listener failed: {fault}");
        }
    }
}

/// An externally-configurable event: an ordered list of [`PersistentCall`]s
/// (insertion order is invocation order) plus runtime listeners registered
/// from code. Serialization covers the call list only; listeners are
/// re-registered by whoever owns the event.
#[derive(Default, Serialize, Deserialize)]
pub struct PersistentEvent {
    calls: Vec<PersistentCall>,
    #[serde(skip)]
    listeners: Vec<(ListenerId, Box<dyn FnMut(&[ParamValue])>)>,
    #[serde(skip)]
    next_listener: u64,
}

impl PersistentEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[PersistentCall] {
        &self.calls
    }

    pub fn call_mut(&mut self, index: usize) -> Option<&mut PersistentCall> {
        self.calls.get_mut(index)
    }

    pub fn add_call(&mut self, call: PersistentCall) {
        self.calls.push(call);
    }

    pub fn remove_call(&mut self, index: usize) -> Option<PersistentCall> {
        if index < self.calls.len() {
            Some(self.calls.remove(index))
        } else {
            None
        }
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn set_calls(&mut self, calls: Vec<PersistentCall>) {
        self.calls = calls;
    }

    /// Reorders the list, preserving the relative order of everything else.
    /// The data-side counterpart of drag-reordering in an editor.
    pub fn move_call(&mut self, from: usize, to: usize) -> bool {
        if from >= self.calls.len() || to >= self.calls.len() {
            return false;
        }
        let call = self.calls.remove(from);
        self.calls.insert(to, call);
        true
    }

    pub fn add_listener(&mut self, listener: impl FnMut(&[ParamValue]) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Fires the event: runtime listeners first, then every enabled call in
    /// list order. A fault in one call is collected and the pass continues;
    /// the batch is logged and returned after the full pass.
    pub fn fire(
        &mut self,
        host: &mut ObjectHost,
        registry: &MethodRegistry,
        live_args: Option<&[ParamValue]>,
    ) -> DispatchReport {
        let listener_args = live_args.unwrap_or(&[]);
        for (_, listener) in &mut self.listeners {
            listener(listener_args);
        }

        let mut report = DispatchReport::default();
        for (index, call) in self.calls.iter_mut().enumerate() {
            match call.invoke(host, registry, live_args) {
                Ok(CallOutcome::Invoked) => report.invoked += 1,
                Ok(CallOutcome::Skipped(_)) => report.skipped += 1,
                Err(error) => {
                    report.faults.push(InvokeFault {
                        index,
                        method: call.method_name().to_string(),
                        error,
                    });
                }
            }
        }
        report.log_faults();
        report
    }

    pub fn snapshot_bytes(&self, format: SnapshotFormat) -> Result<Vec<u8>> {
        match format {
            SnapshotFormat::Json => {
                Ok(serde_json::to_string_pretty(self).context("Encoding event snapshot")?.into_bytes())
            }
            SnapshotFormat::Binary => {
                bincode_options().serialize(self).context("Encoding event snapshot")
            }
        }
    }

    pub fn from_snapshot_bytes(bytes: &[u8], format: SnapshotFormat) -> Result<Self> {
        match format {
            SnapshotFormat::Json => {
                serde_json::from_slice(bytes).context("Parsing event snapshot")
            }
            SnapshotFormat::Binary => {
                bincode_options().deserialize(bytes).context("Parsing event snapshot")
            }
        }
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Creating snapshot directory {}", parent.display()))?;
            }
        }
        let bytes = self.snapshot_bytes(SnapshotFormat::for_path(path))?;
        fs::write(path, bytes)
            .with_context(|| format!("Writing event snapshot {}", path.display()))?;
        Ok(())
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("Reading event snapshot {}", path.display()))?;
        Self::from_snapshot_bytes(&bytes, SnapshotFormat::for_path(path))
            .with_context(|| format!("Parsing event snapshot {}", path.display()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Json,
    Binary,
}

impl SnapshotFormat {
    pub fn extension(self) -> &'static str {
        match self {
            SnapshotFormat::Json => "json",
            SnapshotFormat::Binary => "pev",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SnapshotFormat::Json => "JSON (.json)",
            SnapshotFormat::Binary => "Binary (.pev)",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "json" => Some(SnapshotFormat::Json),
            "pev" => Some(SnapshotFormat::Binary),
            _ => None,
        }
    }

    pub fn for_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .unwrap_or(SnapshotFormat::Json)
    }
}

fn bincode_options() -> impl bincode::Options {
    bincode::DefaultOptions::new().with_fixint_encoding()
}

/// Converts a tuple of live arguments into the shared value representation.
/// Implemented for arities 0 through 4, mirroring how many arguments a
/// designer-facing event realistically carries.
pub trait EventArgs {
    fn into_values(self) -> SmallVec<[ParamValue; 4]>;
}

impl EventArgs for () {
    fn into_values(self) -> SmallVec<[ParamValue; 4]> {
        SmallVec::new()
    }
}

impl<A: Into<ParamValue>> EventArgs for (A,) {
    fn into_values(self) -> SmallVec<[ParamValue; 4]> {
        smallvec![self.0.into()]
    }
}

impl<A: Into<ParamValue>, B: Into<ParamValue>> EventArgs for (A, B) {
    fn into_values(self) -> SmallVec<[ParamValue; 4]> {
        smallvec![self.0.into(), self.1.into()]
    }
}

impl<A: Into<ParamValue>, B: Into<ParamValue>, C: Into<ParamValue>> EventArgs for (A, B, C) {
    fn into_values(self) -> SmallVec<[ParamValue; 4]> {
        smallvec![self.0.into(), self.1.into(), self.2.into()]
    }
}

impl<A: Into<ParamValue>, B: Into<ParamValue>, C: Into<ParamValue>, D: Into<ParamValue>> EventArgs
    for (A, B, C, D)
{
    fn into_values(self) -> SmallVec<[ParamValue; 4]> {
        smallvec![self.0.into(), self.1.into(), self.2.into(), self.3.into()]
    }
}

/// Typed facade over [`PersistentEvent`] for events whose argument tuple is
/// known at compile time. Firing with `()` dispatches with no live
/// arguments, so every call falls back to its stored parameters.
#[derive(Serialize, Deserialize)]
#[serde(transparent, bound = "")]
pub struct TypedEvent<A> {
    event: PersistentEvent,
    #[serde(skip)]
    _args: PhantomData<fn(A)>,
}

impl<A> Default for TypedEvent<A> {
    fn default() -> Self {
        Self { event: PersistentEvent::new(), _args: PhantomData }
    }
}

impl<A: EventArgs> TypedEvent<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event(&self) -> &PersistentEvent {
        &self.event
    }

    pub fn event_mut(&mut self) -> &mut PersistentEvent {
        &mut self.event
    }

    pub fn add_listener(&mut self, listener: impl FnMut(&[ParamValue]) + 'static) -> ListenerId {
        self.event.add_listener(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.event.remove_listener(id)
    }

    pub fn fire(
        &mut self,
        host: &mut ObjectHost,
        registry: &MethodRegistry,
        args: A,
    ) -> DispatchReport {
        let values = args.into_values();
        let live_args = if values.is_empty() { None } else { Some(values.as_slice()) };
        self.event.fire(host, registry, live_args)
    }
}
