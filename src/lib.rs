pub mod call;
pub mod event;
pub mod host;
pub mod registry;
pub mod value;

pub use call::{CallOutcome, PersistentCall, PersistentParameter, SkipReason};
pub use event::{
    DispatchReport, EventArgs, InvokeFault, ListenerId, PersistentEvent, SnapshotFormat, TypedEvent,
};
pub use host::{HostObject, HostType, ObjectHost, ObjectId};
pub use registry::{MethodDef, MethodKey, MethodRegistry};
pub use value::{ParamKind, ParamValue};
