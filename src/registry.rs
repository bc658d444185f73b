use crate::host::{HostObject, HostType};
use crate::value::{ParamKind, ParamValue};
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::fmt;

type MethodFn = Box<dyn Fn(&mut dyn HostObject, &[ParamValue]) -> Result<()>>;

/// One registered method: name, formal parameter kinds, and the thunk that
/// downcasts the target and runs the handler.
pub struct MethodDef {
    pub name: String,
    pub params: Vec<ParamKind>,
    thunk: MethodFn,
}

impl MethodDef {
    pub fn invoke(&self, object: &mut dyn HostObject, args: &[ParamValue]) -> Result<()> {
        (self.thunk)(object, args)
    }
}

/// Identity of a resolved method. Calls cache this instead of a borrow so a
/// re-registration never dangles; the registry re-checks it on use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodKey {
    pub type_name: String,
    pub method: String,
    pub params: Vec<ParamKind>,
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}(", self.type_name, self.method)?;
        for (i, kind) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{kind}")?;
        }
        write!(f, ")")
    }
}

/// Maps `(type name, method name, parameter kinds)` to invocable thunks.
/// This is the binding surface a host populates once at startup, playing the
/// role reflection plays in engines that have it. Same-named overloads are
/// told apart by their exact parameter-kind sequence.
#[derive(Default)]
pub struct MethodRegistry {
    methods: HashMap<String, Vec<MethodDef>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a method on `T`. Re-registering the same name and signature
    /// replaces the previous handler.
    pub fn register<T: HostType>(
        &mut self,
        method: impl Into<String>,
        params: impl Into<Vec<ParamKind>>,
        handler: impl Fn(&mut T, &[ParamValue]) -> Result<()> + 'static,
    ) {
        let name = method.into();
        let params = params.into();
        let thunk: MethodFn = Box::new(move |object, args| {
            let object = object
                .as_any_mut()
                .downcast_mut::<T>()
                .ok_or_else(|| anyhow!("target is not a {}", T::TYPE_NAME))?;
            handler(object, args)
        });
        let defs = self.methods.entry(T::TYPE_NAME.to_string()).or_default();
        defs.retain(|def| !(def.name == name && def.params == params));
        defs.push(MethodDef { name, params, thunk });
    }

    /// Exact-signature lookup among same-named overloads. Zero matches means
    /// unresolved; the signature uniqueness enforced at registration makes
    /// more than one match impossible.
    pub fn resolve(&self, type_name: &str, method: &str, params: &[ParamKind]) -> Option<MethodKey> {
        let def = self
            .methods
            .get(type_name)?
            .iter()
            .find(|def| def.name == method && def.params == params)?;
        Some(MethodKey {
            type_name: type_name.to_string(),
            method: def.name.clone(),
            params: def.params.clone(),
        })
    }

    pub fn find(&self, key: &MethodKey) -> Option<&MethodDef> {
        self.methods
            .get(&key.type_name)?
            .iter()
            .find(|def| def.name == key.method && def.params == key.params)
    }

    /// All methods registered for a type, for the configuration surface to
    /// list as candidates.
    pub fn methods_of(&self, type_name: &str) -> &[MethodDef] {
        self.methods.get(type_name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Candidate methods of a type ranked by Levenshtein distance to the
    /// query, closest first. Ties keep registration order.
    pub fn search_methods(&self, type_name: &str, query: &str) -> Vec<&MethodDef> {
        let query = query.to_lowercase();
        let mut ranked: Vec<(usize, &MethodDef)> = self
            .methods_of(type_name)
            .iter()
            .map(|def| (strsim::levenshtein(&query, &def.name.to_lowercase()), def))
            .collect();
        ranked.sort_by_key(|(distance, _)| *distance);
        ranked.into_iter().map(|(_, def)| def).collect()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[derive(Default)]
    struct Counter {
        total: i64,
    }

    impl HostType for Counter {
        const TYPE_NAME: &'static str = "Counter";
    }

    fn registry() -> MethodRegistry {
        let mut registry = MethodRegistry::new();
        registry.register::<Counter>("add", [ParamKind::Int], |counter, args| {
            counter.total += args[0].as_int().context("add expects an int")?;
            Ok(())
        });
        registry.register::<Counter>("add", [ParamKind::Int, ParamKind::Int], |counter, args| {
            counter.total += args[0].as_int().context("add expects ints")?
                * args[1].as_int().context("add expects ints")?;
            Ok(())
        });
        registry
    }

    #[test]
    fn resolve_distinguishes_overloads_by_signature() {
        let registry = registry();
        let unary = registry.resolve("Counter", "add", &[ParamKind::Int]).expect("unary overload");
        assert_eq!(unary.params.len(), 1);

        let binary = registry
            .resolve("Counter", "add", &[ParamKind::Int, ParamKind::Int])
            .expect("binary overload");
        assert_eq!(binary.params.len(), 2);

        assert!(registry.resolve("Counter", "add", &[ParamKind::Float]).is_none());
        assert!(registry.resolve("Counter", "missing", &[ParamKind::Int]).is_none());
        assert!(registry.resolve("Elsewhere", "add", &[ParamKind::Int]).is_none());
    }

    #[test]
    fn reregistration_replaces_same_signature() {
        let mut registry = registry();
        registry.register::<Counter>("add", [ParamKind::Int], |counter, _| {
            counter.total = -1;
            Ok(())
        });
        assert_eq!(registry.methods_of("Counter").len(), 2);

        let key = registry.resolve("Counter", "add", &[ParamKind::Int]).expect("resolves");
        let mut counter = Counter::default();
        registry.find(&key).expect("found").invoke(&mut counter, &[ParamValue::Int(5)]).unwrap();
        assert_eq!(counter.total, -1);
    }

    #[test]
    fn search_ranks_by_edit_distance() {
        let mut registry = registry();
        registry.register::<Counter>("reset", [], |counter, _| {
            counter.total = 0;
            Ok(())
        });
        let ranked = registry.search_methods("Counter", "adds");
        assert_eq!(ranked[0].name, "add");
        assert_eq!(ranked.last().map(|def| def.name.as_str()), Some("reset"));
        assert!(registry.type_names().any(|name| name == "Counter"));
    }

    #[test]
    fn thunk_rejects_foreign_target() {
        struct Other;
        impl HostType for Other {
            const TYPE_NAME: &'static str = "Other";
        }

        let registry = registry();
        let key = registry.resolve("Counter", "add", &[ParamKind::Int]).expect("resolves");
        let mut other = Other;
        let err = registry.find(&key).expect("found").invoke(&mut other, &[ParamValue::Int(1)]);
        assert!(err.is_err());
    }
}
