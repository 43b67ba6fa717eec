#[cfg(test)]
mod tests {
    use crate::*;
    use restate_core::{Identical, Store, Value};
    use serde_json::json;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn app_store() -> UseStore<Value> {
        create(|_| Value::from(json!({"count": 0, "name": "x"})))
    }

    fn count(state: &Rc<Value>) -> Option<i64> {
        state.get("count").and_then(Value::as_i64)
    }

    fn increment(store: &Store<Value>) {
        let next = count(&store.get_state()).unwrap_or(0) + 1;
        store.set_state(Value::from(json!({ "count": next })));
    }

    #[test]
    fn test_use_store_returns_whole_state() {
        let use_app = app_store();
        let scheduler = Scheduler::new();
        let view = scheduler.mount({
            let use_app = use_app.clone();
            move || use_app.use_store()
        });

        assert!(Rc::ptr_eq(&view.output(), &use_app.get_state()));
        assert_eq!(view.output().to_string(), r#"{"count":0,"name":"x"}"#);
    }

    #[test]
    fn test_whole_state_consumer_rerenders_on_any_change() {
        let use_app = app_store();
        let scheduler = Scheduler::new();
        let view = scheduler.mount({
            let use_app = use_app.clone();
            move || use_app.use_store()
        });

        increment(&use_app);
        assert_eq!(scheduler.flush(), 1);
        assert_eq!(view.output().to_string(), r#"{"count":1,"name":"x"}"#);
        assert_eq!(view.render_count(), 2);
    }

    #[test]
    fn test_selector_isolation() {
        let use_app = app_store();
        let scheduler = Scheduler::new();
        let view = scheduler.mount({
            let use_app = use_app.clone();
            move || use_app.select(|s| s.get("name").cloned())
        });

        use_app.set_state(Value::from(json!({"count": 1})));
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.flush(), 0);
        assert_eq!(view.render_count(), 1);

        use_app.set_state(Value::from(json!({"name": "y"})));
        assert_eq!(scheduler.pending(), 1);
        scheduler.flush();
        assert_eq!(view.render_count(), 2);
        assert_eq!(view.output(), Some(Value::from("y")));
    }

    #[test]
    fn test_render_spy_only_counts_selected_changes() {
        let use_app = app_store();
        let scheduler = Scheduler::new();
        let renders = Rc::new(Cell::new(0));
        let view = scheduler.mount({
            let use_app = use_app.clone();
            let renders = renders.clone();
            move || {
                renders.set(renders.get() + 1);
                use_app.select(count)
            }
        });
        assert_eq!(renders.get(), 1);

        use_app.set_state(Value::from(json!({"name": "updated"})));
        scheduler.flush();
        assert_eq!(renders.get(), 1);

        use_app.set_state(Value::from(json!({"count": 1})));
        scheduler.flush();
        assert_eq!(renders.get(), 2);
        assert_eq!(view.output(), Some(1));
    }

    #[test]
    fn test_requests_coalesce_until_flush() {
        let use_app = app_store();
        let scheduler = Scheduler::new();
        let view = scheduler.mount({
            let use_app = use_app.clone();
            move || use_app.select(count)
        });

        for _ in 0..3 {
            increment(&use_app);
        }
        assert_eq!(use_app.get_state().get("count").and_then(Value::as_i64), Some(3));
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(scheduler.flush(), 1);
        assert_eq!(view.output(), Some(3));
    }

    #[test]
    fn test_change_and_revert_before_flush() {
        let use_app = app_store();
        let scheduler = Scheduler::new();
        let view = scheduler.mount({
            let use_app = use_app.clone();
            move || use_app.select(count)
        });

        use_app.set_state(Value::from(json!({"count": 5})));
        use_app.set_state(Value::from(json!({"count": 0})));
        scheduler.flush();

        assert_eq!(view.output(), Some(0));
        assert_eq!(view.render_count(), 2);
    }

    #[test]
    fn test_identical_selection_keeps_earlier_reference() {
        let use_app = create(|_| Value::from(json!({"user": {"id": 1}, "count": 0})));
        let scheduler = Scheduler::new();
        let view = scheduler.mount({
            let use_app = use_app.clone();
            move || use_app.select(|s| s.get("user").cloned())
        });
        let first = view.output();

        use_app.set_state(Value::from(json!({"count": 1})));
        assert_eq!(scheduler.pending(), 0);

        // Forced re-render through a different slice still hands back the same object.
        scheduler.request(view.id());
        scheduler.flush();
        assert!(view.output().identical(&first));
    }

    #[test]
    fn test_multiple_callsites_in_one_consumer() {
        let use_app = create(|_| Value::from(json!({"count": 10, "name": "test"})));
        let scheduler = Scheduler::new();
        let view = scheduler.mount({
            let use_app = use_app.clone();
            move || {
                let count = use_app.select(count);
                let name = use_app.select(|s| s.get("name").and_then(Value::as_str).map(String::from));
                (count, name)
            }
        });
        assert_eq!(view.output(), (Some(10), Some("test".to_string())));
        assert_eq!(use_app.listener_count(), 2);

        increment(&use_app);
        assert_eq!(scheduler.flush(), 1);
        assert_eq!(view.output(), (Some(11), Some("test".to_string())));
        // re-render did not subscribe again
        assert_eq!(use_app.listener_count(), 2);
    }

    #[test]
    fn test_unmount_releases_subscriptions() {
        let use_app = app_store();
        let scheduler = Scheduler::new();
        let view = scheduler.mount({
            let use_app = use_app.clone();
            move || use_app.select(count)
        });
        assert_eq!(use_app.listener_count(), 1);

        view.unmount();
        view.unmount();
        assert!(!view.is_mounted());
        assert_eq!(use_app.listener_count(), 0);
        assert_eq!(scheduler.mounted(), 0);

        increment(&use_app);
        assert_eq!(scheduler.flush(), 0);
        assert_eq!(view.render_count(), 1);
    }

    #[test]
    fn test_unmount_drops_pending_render() {
        let use_app = app_store();
        let scheduler = Scheduler::new();
        let view = scheduler.mount({
            let use_app = use_app.clone();
            move || use_app.select(count)
        });

        increment(&use_app);
        assert_eq!(scheduler.pending(), 1);
        view.unmount();
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_no_tearing_across_consumers() {
        let use_app = app_store();
        let scheduler = Scheduler::new();

        // Bumps once more whenever the count first reaches 1.
        use_app.subscribe({
            let store = use_app.store().clone();
            move |next, _| {
                if count(next) == Some(1) {
                    increment(&store);
                }
            }
        });

        let views: Vec<_> = (0..3)
            .map(|_| {
                let use_app = use_app.clone();
                scheduler.mount(move || use_app.select(count))
            })
            .collect();

        // Every consumer check reads the live state; record what they see.
        let observed = Rc::new(RefCell::new(Vec::new()));
        use_app.subscribe({
            let store = use_app.store().clone();
            let observed = observed.clone();
            move |_, _| observed.borrow_mut().push(count(&store.get_state()))
        });

        increment(&use_app);

        assert_eq!(count(&use_app.get_state()), Some(2));
        assert!(observed.borrow().iter().all(|c| *c == Some(2)));
        scheduler.flush();
        for view in &views {
            assert_eq!(view.output(), Some(2));
        }
    }

    #[test]
    fn test_consumers_mounted_later_see_current_state() {
        let use_app = app_store();
        let scheduler = Scheduler::new();
        increment(&use_app);
        increment(&use_app);

        let view = scheduler.mount({
            let use_app = use_app.clone();
            move || use_app.select(count)
        });
        assert_eq!(view.output(), Some(2));
    }

    #[test]
    fn test_initial_snapshot_is_distinct_from_live_path() {
        let use_app = app_store();
        increment(&use_app);

        assert_eq!(use_app.initial_snapshot(count), Some(0));
        assert_eq!(use_app.select(count), Some(1));
        assert_eq!(use_app.listener_count(), 0);

        let scheduler = Scheduler::new();
        let view = scheduler.mount({
            let use_app = use_app.clone();
            move || {
                let live = use_app.select(count);
                let initial = use_app.initial_snapshot(count);
                live != initial
            }
        });
        assert!(view.output());
    }

    #[test]
    fn test_hook_exposes_raw_store_api() {
        let use_app = create(|_| Value::from(json!({"count": 0})));
        let calls = Rc::new(Cell::new(0));
        let unsubscribe = use_app.subscribe({
            let calls = calls.clone();
            move |_, _| calls.set(calls.get() + 1)
        });

        use_app.set_state(Value::from(json!({"count": 1})));
        unsubscribe.call();
        use_app.set_state(Value::from(json!({"count": 2})));

        assert_eq!(calls.get(), 1);
        assert_eq!(count(&use_app.get_state()), Some(2));
        assert_eq!(count(&use_app.get_initial_state()), Some(0));
    }

    #[test]
    fn test_selector_sees_latest_closure() {
        let use_app = app_store();
        let scheduler = Scheduler::new();
        let field = Rc::new(RefCell::new("count"));
        let view = scheduler.mount({
            let use_app = use_app.clone();
            let field = field.clone();
            move || {
                let key = *field.borrow();
                use_app.select(move |s| s.get(key).cloned())
            }
        });
        assert_eq!(view.output(), Some(Value::from(0)));

        // Switch to watching `name`, then only `name` changes count as relevant.
        *field.borrow_mut() = "name";
        scheduler.request(view.id());
        scheduler.flush();
        assert_eq!(view.output(), Some(Value::from("x")));

        increment(&use_app);
        assert_eq!(scheduler.pending(), 0);
        use_app.set_state(Value::from(json!({"name": "z"})));
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn test_selector_panic_reaches_the_consumer() {
        let use_app = app_store();
        let scheduler = Scheduler::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            scheduler.mount({
                let use_app = use_app.clone();
                move || use_app.select(|_| -> i32 { panic!("bad selector") })
            })
        }));
        assert!(result.is_err());
        assert!(current_consumer().is_none());
        assert!(current_scope().is_none());
    }

    #[test]
    fn test_failed_first_render_leaves_nothing_mounted() {
        let use_app = app_store();
        let scheduler = Scheduler::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            scheduler.mount({
                let use_app = use_app.clone();
                move || {
                    let count = use_app.select(count);
                    if count == Some(0) {
                        panic!("render failed");
                    }
                    count
                }
            })
        }));
        assert!(result.is_err());
        assert_eq!(scheduler.mounted(), 0);
        assert_eq!(use_app.listener_count(), 0);

        increment(&use_app);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.flush(), 0);
    }

    #[test]
    fn test_remember_persists_across_renders() {
        let scheduler = Scheduler::new();
        let view = scheduler.mount(|| {
            let hits = remember(|| Cell::new(0));
            hits.set(hits.get() + 1);
            let keyed = remember_with_key("label", || "first".to_string());
            (hits.get(), (*keyed).clone())
        });
        assert_eq!(view.output(), (1, "first".to_string()));

        scheduler.request(view.id());
        scheduler.flush();
        assert_eq!(view.output(), (2, "first".to_string()));
    }

    #[test]
    fn test_scope_explicit_dispose() {
        let cleaned_up = Rc::new(Cell::new(false));
        let scope = Scope::new();
        scope.add_disposer({
            let cleaned_up = cleaned_up.clone();
            move || cleaned_up.set(true)
        });
        assert!(!cleaned_up.get());
        scope.dispose();
        assert!(cleaned_up.get());
    }

    #[test]
    fn test_scoped_effect_registers_on_current_scope() {
        let scope = Scope::new();
        scope.run(|| scoped_effect(|| Box::new(|| {})));
        assert_eq!(scope.disposer_count(), 1);
        assert!(current_scope().is_none());
    }
}
