//! End-to-end behaviour of the state store through its public API.

use std::cell::RefCell;
use std::rc::Rc;

use pathstate::{
    path, ActionOptions, Error, Observer, StateAction, StateChange, StateStore, StoreCommand,
    StoreOptions, Value,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pathstate=trace")),
        )
        .with_test_writer()
        .try_init();
}

fn user_store() -> StateStore {
    init_tracing();
    StateStore::with_options(
        StoreOptions::from_json(json!({
            "initStore": {"user": {"id": 51, "fName": "Ivan", "lName": "Ivanov"}}
        }))
        .unwrap(),
    )
}

/// Collects everything a subscription sees, including completion.
#[derive(Clone, Default)]
struct Log {
    events: Rc<RefCell<Vec<String>>>,
}

impl Log {
    fn entries(&self) -> Vec<String> {
        self.events.borrow().clone()
    }
}

impl Observer<Option<Value>> for Log {
    fn next(&self, item: &Option<Value>) {
        let text = match item {
            Some(value) => serde_json::Value::from(value.clone()).to_string(),
            None => "undefined".to_string(),
        };
        self.events.borrow_mut().push(text);
    }

    fn complete(&self) {
        self.events.borrow_mut().push("complete".to_string());
    }
}

#[test]
fn replace_then_read_back() {
    let store = StateStore::create();
    let cases = vec![
        (path!["a"], Value::from(1i64)),
        (path!["a", "b", "c"], Value::from("deep")),
        (path!["list"], Value::from(json!([1, 2, 3]))),
        (path!["list", 1], Value::from(true)),
        (path![4, 5], Value::Null),
    ];

    for (p, v) in cases {
        store.set_state(StateAction::new(p.clone(), v.clone())).unwrap();
        assert_eq!(store.get_state(&p), Some(v), "path {}", p);
    }
}

#[test]
fn sparse_array_write_reads_back() {
    init_tracing();
    let store = StateStore::with_options(StoreOptions::with_init_store(Value::from(
        json!({"list": [1, 2, 3]}),
    )));
    let log = Log::default();
    let _sub = store.select(&path!["list", 7], true, log.clone());

    store.set_state(StateAction::new(path!["list", 7], "x")).unwrap();
    assert_eq!(store.get_state(&path!["list", 7]), Some(Value::from("x")));
    assert_eq!(log.entries(), vec![r#""x""#]);

    let err = store
        .set_state(StateAction::new(path!["list", "name"], "x"))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));
    assert_eq!(store.get_state(&path!["list", "name"]), None);
    assert_eq!(log.entries(), vec![r#""x""#]);
}

#[test]
fn scenario_rename_user() {
    let store = user_store();
    store
        .set_state_json(&json!({"path": ["user", "fName"], "value": "Dima"}))
        .unwrap();

    assert_eq!(
        store.root(),
        Value::from(json!({"user": {"id": 51, "fName": "Dima", "lName": "Ivanov"}}))
    );
}

#[test]
fn signal_delivers_exactly_one_event() {
    let store = user_store();
    let log = Log::default();
    let _sub = store.select(&path!["session", "ping"], true, log.clone());

    store
        .set_state(StateAction::new(path!["session", "ping"], 1i64).signal())
        .unwrap();

    assert_eq!(log.entries(), vec!["1"]);
    assert_eq!(store.get_state(&path!["session", "ping"]), None);
    assert_eq!(store.get_state(&path!["session"]), None);
}

#[test]
fn merge_fan_out_scenario() {
    let store = user_store();
    let user = Log::default();
    let m_name = Log::default();
    let f_name = Log::default();
    let l_name = Log::default();
    let _subs = vec![
        store.select(&path!["user"], true, user.clone()),
        store.select(&path!["user", "mName"], true, m_name.clone()),
        store.select(&path!["user", "fName"], true, f_name.clone()),
        store.select(&path!["user", "lName"], true, l_name.clone()),
    ];

    store
        .set_state_json(&json!({
            "path": ["user"],
            "value": {"mName": "Vova"},
            "options": {"merge": true},
        }))
        .unwrap();

    assert_eq!(
        user.entries(),
        vec![r#"{"fName":"Ivan","id":51,"lName":"Ivanov","mName":"Vova"}"#]
    );
    assert_eq!(m_name.entries(), vec![r#""Vova""#]);
    assert!(f_name.entries().is_empty());
    assert!(l_name.entries().is_empty());
}

#[test]
fn select_snapshot_of_missing_path() {
    let store = user_store();
    let log = Log::default();
    let _sub = store.select(&path!["nothing", "here"], false, log.clone());
    assert_eq!(log.entries(), vec!["undefined"]);
}

#[test]
fn canonical_paths_share_a_channel() {
    let store = user_store();
    let log = Log::default();
    let _sub = store.select(&path!["user.fName"], true, log.clone());

    store
        .set_state(StateAction::new(path!["user", "fName"], "Dima"))
        .unwrap();

    assert_eq!(log.entries(), vec![r#""Dima""#]);
}

#[test]
fn set_states_fail_fast_stops_at_invalid_action() {
    let store = user_store();
    let result = store.set_states_json(&json!([
        42,
        {"path": ["user", "fName"], "value": "never"},
    ]));

    assert!(matches!(result, Err(Error::InvalidArgument { .. })));
    assert_eq!(
        store.get_state(&path!["user", "fName"]),
        Some(Value::from("Ivan"))
    );
}

#[test]
fn command_stream_sees_every_write_in_order() {
    let store = user_store();
    let commands: Rc<RefCell<Vec<StoreCommand>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&commands);
    let _sub = store.commands(move |c: &StoreCommand| sink.borrow_mut().push(c.clone()));

    store
        .set_states(vec![
            StateAction::new(path!["user", "id"], 1i64),
            StateAction::new(path!["user", "id"], 1i64).compare(),
            StateAction::new(path!["flags", "beta"], true).with_options(ActionOptions {
                signal: true,
                ..ActionOptions::default()
            }),
        ])
        .unwrap();

    let commands = commands.borrow();
    let paths: Vec<&str> = commands.iter().map(|c| c.path.as_str()).collect();
    assert_eq!(paths, vec!["user.id", "flags.beta"]);
    assert_eq!(commands[0].old_value, Some(Value::from(51i64)));
    assert_eq!(commands[1].old_value, None);
}

#[test]
fn unsubscribe_inside_callback() {
    let store = user_store();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let handle: Rc<RefCell<Option<pathstate::Subscription>>> = Rc::new(RefCell::new(None));

    let sink = Rc::clone(&seen);
    let own = Rc::clone(&handle);
    let sub = store.watch(&path!["counter"], move |c: &StateChange| {
        sink.borrow_mut().push(c.new_value.clone());
        if let Some(sub) = own.borrow_mut().as_mut() {
            sub.unsubscribe();
        }
    });
    *handle.borrow_mut() = Some(sub);

    store.set_state(StateAction::new(path!["counter"], 1i64)).unwrap();
    store.set_state(StateAction::new(path!["counter"], 2i64)).unwrap();

    assert_eq!(*seen.borrow(), vec![Value::from(1i64)]);
}

#[test]
fn nested_writes_complete_before_outer_returns() {
    let store = user_store();
    let writer = store.clone();
    let _mirror = store.select(&path!["user", "id"], true, move |v: &Option<Value>| {
        if let Some(v) = v {
            writer
                .set_state(StateAction::new(path!["mirror", "id"], v.clone()))
                .unwrap();
        }
    });
    let order = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&order);
    let _cmd = store.commands(move |c: &StoreCommand| sink.borrow_mut().push(c.path.clone()));

    store.set_state(StateAction::new(path!["user", "id"], 9i64)).unwrap();

    assert_eq!(store.get_state(&path!["mirror", "id"]), Some(Value::from(9i64)));
    assert_eq!(*order.borrow(), vec!["mirror.id", "user.id"]);
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Podium {
    title: String,
    speakers: Vec<String>,
}

#[test]
fn sub_stores_compose_modules() {
    let store = user_store();
    let podium = Podium {
        title: "Rust meetup".to_string(),
        speakers: vec!["Ivan".to_string()],
    };

    store.add_sub_store("podium", &podium).unwrap();
    let err = store.add_sub_store("podium", &podium).unwrap_err();
    assert!(matches!(err, Error::AlreadyExists { .. }));

    store
        .set_state(StateAction::new(path!["podium", "speakers", 1], "Vova"))
        .unwrap();

    let back: Option<Podium> = store.get_state_as(&path!["podium"]).unwrap();
    assert_eq!(
        back,
        Some(Podium {
            title: "Rust meetup".to_string(),
            speakers: vec!["Ivan".to_string(), "Vova".to_string()],
        })
    );
}

#[test]
fn destroy_ends_streams_then_store_is_reusable() {
    let store = user_store();
    let log = Log::default();
    let sub = store.select(&path!["user", "fName"], false, log.clone());

    store.destroy();
    store
        .set_state(StateAction::new(path!["user", "fName"], "after"))
        .unwrap();

    assert!(sub.is_closed());
    assert_eq!(log.entries(), vec![r#""Ivan""#, "complete"]);

    let fresh = Log::default();
    let _fresh_sub = store.select(&path!["user", "fName"], false, fresh.clone());
    assert_eq!(fresh.entries(), vec![r#""after""#]);
}
