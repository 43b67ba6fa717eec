use std::rc::Rc;

use restate_bind::prelude::*;

#[derive(Clone, Debug, PartialEq)]
struct CounterState {
    counter: i64,
}

impl Mergeable for CounterState {
    fn kind(&self) -> Kind {
        Kind::Map
    }
    fn merge(&self, patch: &Self) -> Self {
        patch.clone()
    }
}

impl CounterState {
    fn increment(store: &Store<Self>) {
        store.set_state_with(|s| CounterState {
            counter: s.counter + 1,
        });
    }

    fn decrement(store: &Store<Self>) {
        store.set_state_with(|s| CounterState {
            counter: s.counter - 1,
        });
    }

    fn increment_by(store: &Store<Self>, value: i64) {
        store.set_state_with(move |s| CounterState {
            counter: s.counter + value,
        });
    }

    fn reset(store: &Store<Self>) {
        store.set_state(CounterState { counter: 0 });
    }
}

const APP_STATE: &str = r#"{
    "user": { "name": "Ada", "email": "ada@example.com", "theme": "light" },
    "ui": { "notifications": [] }
}"#;

fn update_user_name(store: &Store<Value>, name: &str) {
    let Some(user) = store.get_state().get("user").and_then(Value::as_object).cloned() else {
        return;
    };
    let mut user = (*user).clone();
    user.insert("name".into(), Value::from(name));
    store.set_state(Value::object([("user", Value::from(user))]));
}

fn toggle_theme(store: &Store<Value>) {
    let state = store.get_state();
    let Some(user) = state.get("user").and_then(Value::as_object) else {
        return;
    };
    let mut user = (**user).clone();
    let next = match user.get("theme").and_then(Value::as_str) {
        Some("dark") => "light",
        _ => "dark",
    };
    user.insert("theme".into(), Value::from(next));
    store.set_state(Value::object([("user", Value::from(user))]));
}

fn add_notification(store: &Store<Value>, message: &str) {
    let state = store.get_state();
    let mut items: Vec<Value> = state
        .get("ui")
        .and_then(|ui| ui.get("notifications"))
        .and_then(Value::as_array)
        .map(|items| (**items).clone())
        .unwrap_or_default();
    items.push(Value::object([("message", message)]));
    let mut ui = state
        .get("ui")
        .and_then(Value::as_object)
        .map(|ui| (**ui).clone())
        .unwrap_or_default();
    ui.insert("notifications".into(), Value::from(items));
    store.set_state(Value::object([("ui", Value::from(ui))]));
}

fn notifications(state: &Rc<Value>) -> Option<Value> {
    state.get("ui").and_then(|ui| ui.get("notifications")).cloned()
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let use_counter = create_with_config(StoreConfig::new().name("counter"), |_| CounterState {
        counter: 0,
    });
    let use_app = try_create(|_| serde_json::from_str::<Value>(APP_STATE))?;

    let scheduler = Scheduler::new();
    let counter_view = scheduler.mount({
        let use_counter = use_counter.clone();
        move || format!("Count: {}", use_counter.select(|s| s.counter))
    });
    let parity_view = scheduler.mount({
        let use_counter = use_counter.clone();
        move || use_counter.select(|s| s.counter % 2 == 0)
    });
    let user_view = scheduler.mount({
        let use_app = use_app.clone();
        move || {
            let user = use_app.select(|s| s.get("user").cloned());
            let name = user
                .as_ref()
                .and_then(|u| u.get("name"))
                .and_then(Value::as_str)
                .unwrap_or("?")
                .to_string();
            let theme = user
                .as_ref()
                .and_then(|u| u.get("theme"))
                .and_then(Value::as_str)
                .unwrap_or("light")
                .to_string();
            format!("{name} ({theme})")
        }
    });
    let notification_view = scheduler.mount({
        let use_app = use_app.clone();
        move || {
            use_app
                .select(notifications)
                .and_then(|n| n.as_array().map(|a| a.len()))
                .unwrap_or(0)
        }
    });

    CounterState::increment(&use_counter);
    CounterState::increment(&use_counter);
    CounterState::increment_by(&use_counter, 5);
    CounterState::decrement(&use_counter);
    log::info!(
        "counter at {}, {} render(s) pending",
        use_counter.get_state().counter,
        scheduler.pending()
    );
    scheduler.flush();
    println!("{} (even: {})", counter_view.output(), parity_view.output());

    update_user_name(&use_app, "Grace");
    toggle_theme(&use_app);
    scheduler.flush();
    // The user slice changed; the notification list did not.
    println!(
        "user: {} / notifications: {} ({} render(s))",
        user_view.output(),
        notification_view.output(),
        notification_view.render_count()
    );

    add_notification(&use_app, "Profile updated");
    scheduler.flush();
    println!(
        "notifications: {} ({} render(s))",
        notification_view.output(),
        notification_view.render_count()
    );

    CounterState::reset(&use_counter);
    scheduler.flush();
    println!(
        "{} (initial: {})",
        counter_view.output(),
        use_counter.get_initial_state().counter
    );

    Ok(())
}
