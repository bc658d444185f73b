use anyhow::{anyhow, Context};
use persistent_events::{
    HostType, MethodRegistry, ObjectHost, ParamKind, ParamValue, PersistentCall,
    PersistentEvent, PersistentParameter, TypedEvent,
};
use std::cell::RefCell;
use std::rc::Rc;

type Trace = Rc<RefCell<Vec<String>>>;

struct Scoreboard {
    trace: Trace,
}

impl HostType for Scoreboard {
    const TYPE_NAME: &'static str = "Scoreboard";
}

fn registry() -> MethodRegistry {
    let mut registry = MethodRegistry::new();
    registry.register::<Scoreboard>("record", [ParamKind::Str], |board, args| {
        let entry = args[0].as_str().context("record expects a string")?;
        board.trace.borrow_mut().push(entry.to_string());
        Ok(())
    });
    registry.register::<Scoreboard>("explode", [], |_, _| Err(anyhow!("boom")));
    registry.register::<Scoreboard>(
        "score",
        [ParamKind::Str, ParamKind::Int, ParamKind::Float],
        |board, args| {
            let who = args[0].as_str().context("score expects a string")?;
            let points = args[1].as_int().context("score expects an int")?;
            let multiplier = args[2].as_float().context("score expects a float")?;
            board.trace.borrow_mut().push(format!("{who}:{}", points as f32 * multiplier));
            Ok(())
        },
    );
    registry
}

fn record_call(target: persistent_events::ObjectId, entry: &str) -> PersistentCall {
    let mut call = PersistentCall::new();
    call.set_target(Some(target));
    call.set_method_name("record");
    call.set_parameters(vec![PersistentParameter::with_value(
        ParamKind::Str,
        ParamValue::Str(entry.to_string()),
    )]);
    call.use_runtime_parameters = false;
    call
}

fn explode_call(target: persistent_events::ObjectId) -> PersistentCall {
    let mut call = PersistentCall::new();
    call.set_target(Some(target));
    call.set_method_name("explode");
    call
}

#[test]
fn fault_in_one_call_does_not_block_the_rest() {
    let registry = registry();
    let trace: Trace = Rc::new(RefCell::new(Vec::new()));
    let mut host = ObjectHost::new();
    let id = host.insert(Scoreboard { trace: trace.clone() });

    let mut event = PersistentEvent::new();
    event.add_call(record_call(id, "first"));
    event.add_call(explode_call(id));
    event.add_call(record_call(id, "third"));

    let report = event.fire(&mut host, &registry, None);
    assert_eq!(*trace.borrow(), vec!["first".to_string(), "third".to_string()]);
    assert_eq!(report.invoked, 2);
    assert_eq!(report.faults.len(), 1);
    assert_eq!(report.faults[0].index, 1);
    assert_eq!(report.faults[0].method, "explode");
}

#[test]
fn calls_run_in_list_order_and_reorder_with_move() {
    let registry = registry();
    let trace: Trace = Rc::new(RefCell::new(Vec::new()));
    let mut host = ObjectHost::new();
    let id = host.insert(Scoreboard { trace: trace.clone() });

    let mut event = PersistentEvent::new();
    event.add_call(record_call(id, "a"));
    event.add_call(record_call(id, "b"));
    event.add_call(record_call(id, "c"));

    event.fire(&mut host, &registry, None);
    assert_eq!(*trace.borrow(), vec!["a".to_string(), "b".to_string(), "c".to_string()]);

    trace.borrow_mut().clear();
    assert!(event.move_call(2, 0));
    event.fire(&mut host, &registry, None);
    assert_eq!(*trace.borrow(), vec!["c".to_string(), "a".to_string(), "b".to_string()]);

    assert!(!event.move_call(0, 9));
}

#[test]
fn listeners_fire_before_the_persistent_pass() {
    let registry = registry();
    let trace: Trace = Rc::new(RefCell::new(Vec::new()));
    let mut host = ObjectHost::new();
    let id = host.insert(Scoreboard { trace: trace.clone() });

    let mut event = PersistentEvent::new();
    event.add_call(record_call(id, "persistent"));
    let listener_trace = trace.clone();
    event.add_listener(move |_| listener_trace.borrow_mut().push("listener".to_string()));

    event.fire(&mut host, &registry, None);
    assert_eq!(*trace.borrow(), vec!["listener".to_string(), "persistent".to_string()]);
}

#[test]
fn removed_listeners_stop_receiving() {
    let registry = registry();
    let mut host = ObjectHost::new();

    let mut event = PersistentEvent::new();
    let hits: Trace = Rc::new(RefCell::new(Vec::new()));
    let listener_hits = hits.clone();
    let id = event.add_listener(move |_| listener_hits.borrow_mut().push("hit".to_string()));
    assert_eq!(event.listener_count(), 1);

    event.fire(&mut host, &registry, None);
    assert!(event.remove_listener(id));
    assert!(!event.remove_listener(id));
    event.fire(&mut host, &registry, None);
    assert_eq!(hits.borrow().len(), 1);
}

#[test]
fn listeners_receive_the_live_arguments() {
    let registry = registry();
    let mut host = ObjectHost::new();

    let mut event = PersistentEvent::new();
    let seen: Trace = Rc::new(RefCell::new(Vec::new()));
    let listener_seen = seen.clone();
    event.add_listener(move |args| {
        listener_seen.borrow_mut().push(format!("{} args", args.len()));
    });

    event.fire(&mut host, &registry, Some(&[ParamValue::Int(1), ParamValue::Bool(true)]));
    assert_eq!(*seen.borrow(), vec!["2 args".to_string()]);
}

#[test]
fn typed_event_forwards_tuple_arguments() {
    let registry = registry();
    let trace: Trace = Rc::new(RefCell::new(Vec::new()));
    let mut host = ObjectHost::new();
    let id = host.insert(Scoreboard { trace: trace.clone() });

    let mut call = record_call(id, "stored");
    call.use_runtime_parameters = true;
    let mut event: TypedEvent<(String,)> = TypedEvent::new();
    event.event_mut().add_call(call);

    event.fire(&mut host, &registry, ("live".to_string(),));
    assert_eq!(*trace.borrow(), vec!["live".to_string()]);
}

#[test]
fn unit_typed_event_dispatches_stored_parameters() {
    let registry = registry();
    let trace: Trace = Rc::new(RefCell::new(Vec::new()));
    let mut host = ObjectHost::new();
    let id = host.insert(Scoreboard { trace: trace.clone() });

    let mut event: TypedEvent<()> = TypedEvent::new();
    event.event_mut().add_call(record_call(id, "stored"));
    event.fire(&mut host, &registry, ());
    assert_eq!(*trace.borrow(), vec!["stored".to_string()]);
}

#[test]
fn disabled_calls_are_counted_as_skipped() {
    let registry = registry();
    let trace: Trace = Rc::new(RefCell::new(Vec::new()));
    let mut host = ObjectHost::new();
    let id = host.insert(Scoreboard { trace: trace.clone() });

    let mut event = PersistentEvent::new();
    event.add_call(record_call(id, "never"));
    event.add_call(record_call(id, "always"));
    event.call_mut(0).expect("first call").is_enabled = false;

    let report = event.fire(&mut host, &registry, None);
    assert_eq!(report.invoked, 1);
    assert_eq!(report.skipped, 1);
    assert!(report.is_clean());
    assert_eq!(*trace.borrow(), vec!["always".to_string()]);
}

#[test]
fn typed_event_spreads_multi_argument_tuples() {
    let registry = registry();
    let trace: Trace = Rc::new(RefCell::new(Vec::new()));
    let mut host = ObjectHost::new();
    let id = host.insert(Scoreboard { trace: trace.clone() });

    let mut call = PersistentCall::new();
    call.set_target(Some(id));
    call.set_method_name("score");
    call.set_parameters(vec![
        PersistentParameter::with_value(ParamKind::Str, ParamValue::Str("nobody".into())),
        PersistentParameter::with_value(ParamKind::Int, ParamValue::Int(0)),
        PersistentParameter::with_value(ParamKind::Float, ParamValue::Float(0.0)),
    ]);

    let mut event: TypedEvent<(String, i64, f32)> = TypedEvent::new();
    event.event_mut().add_call(call);
    assert_eq!(event.event().calls().len(), 1);

    event.fire(&mut host, &registry, ("ada".to_string(), 40, 2.5));
    assert_eq!(*trace.borrow(), vec!["ada:100".to_string()]);
}

#[test]
fn list_edits_shape_the_next_dispatch() {
    let registry = registry();
    let trace: Trace = Rc::new(RefCell::new(Vec::new()));
    let mut host = ObjectHost::new();
    let id = host.insert(Scoreboard { trace: trace.clone() });

    let mut event = PersistentEvent::new();
    event.add_call(record_call(id, "a"));
    event.add_call(record_call(id, "b"));

    let removed = event.remove_call(0).expect("removes in range");
    assert_eq!(removed.method_name(), "record");
    assert!(event.remove_call(5).is_none());
    event.fire(&mut host, &registry, None);
    assert_eq!(*trace.borrow(), vec!["b".to_string()]);

    trace.borrow_mut().clear();
    event.set_calls(vec![record_call(id, "x"), record_call(id, "y")]);
    event.fire(&mut host, &registry, None);
    assert_eq!(*trace.borrow(), vec!["x".to_string(), "y".to_string()]);

    trace.borrow_mut().clear();
    event.clear_calls();
    let report = event.fire(&mut host, &registry, None);
    assert_eq!(report.invoked, 0);
    assert!(trace.borrow().is_empty());
}
