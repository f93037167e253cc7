//! Props, state, computed properties and watchers of an instance.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::{Component, WatchHandler};
use crate::error::{handle_error, invariant, warn, BoxError, Error};
use crate::reactive::{
    self, define_reactive, observe, Getter, PropertyKey, ReactiveObject, Value, WatchCallback, Watcher, WatcherOptions,
};
use crate::util::{is_reserved_attribute, parse_path};

/// What `watch` observes.
#[derive(Clone)]
pub enum WatchSource {
    /// Dot-delimited path such as `"user.name"`.
    Path(String),
    Getter(Rc<dyn Fn(&Component) -> Result<Value, BoxError>>),
}

impl WatchSource {
    pub fn getter<F>(f: F) -> Self
    where
        F: Fn(&Component) -> Result<Value, BoxError> + 'static,
    {
        WatchSource::Getter(Rc::new(f))
    }
}

impl From<&str> for WatchSource {
    fn from(path: &str) -> Self {
        WatchSource::Path(path.to_owned())
    }
}

impl From<String> for WatchSource {
    fn from(path: String) -> Self {
        WatchSource::Path(path)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WatchOptions {
    /// Also fire on mutations nested anywhere inside the value.
    pub deep: bool,
    /// Call the handler once right away with `(value, Null)`.
    pub immediate: bool,
    /// Run on change instead of waiting for the next flush.
    pub sync: bool,
}

impl WatchOptions {
    pub fn deep() -> Self {
        Self {
            deep: true,
            ..Self::default()
        }
    }

    pub fn immediate() -> Self {
        Self {
            immediate: true,
            ..Self::default()
        }
    }
}

/// Returned by [`Component::watch`]; stops the watcher on `unwatch`.
pub struct WatchHandle(Watcher);

impl WatchHandle {
    pub fn unwatch(&self) {
        self.0.teardown();
    }

    pub fn watcher(&self) -> &Watcher {
        &self.0
    }
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WatchHandle").field(&self.0.id()).finish()
    }
}

impl Component {
    pub(super) fn init_props(&self, props_data: &IndexMap<String, Value>) {
        for spec in self.0.options.props() {
            if is_reserved_attribute(&spec.name) {
                warn(
                    format!("\"{}\" is a reserved attribute and cannot be used as component prop.", spec.name),
                    Some(self),
                );
                continue;
            }
            let value = match props_data.get(&spec.name) {
                Some(value) => {
                    self.0.provided_props.borrow_mut().push(spec.name.clone());
                    value.clone()
                }
                None => spec.default.as_ref().map(Value::deep_clone).unwrap_or_default(),
            };
            define_reactive(&self.0.props, &spec.name, Some(value));
        }
    }

    pub(super) fn init_state(&self) -> Result<(), Error> {
        for (key, initial) in self.0.options.state_defaults() {
            if self.0.props.has_own(key) {
                warn(
                    format!("The data property \"{key}\" is already declared as a prop. Use prop default value instead."),
                    Some(self),
                );
                continue;
            }
            self.0.state.set(key, initial.deep_clone())?;
        }
        observe(&Value::Object(self.0.state.clone()), true);
        Ok(())
    }

    pub(super) fn init_computed(&self) -> Result<(), Error> {
        for (name, spec) in self.0.options.computed_specs() {
            if self.0.props.has_own(name) {
                warn(format!("The computed property \"{name}\" is already defined as a prop."), Some(self));
                continue;
            }
            if self.0.state.has_own(name) {
                warn(format!("The computed property \"{name}\" is already defined in data."), Some(self));
                continue;
            }
            let watcher = Watcher::build(
                self.getter_source(spec.getter.clone()),
                format!("computed {name}"),
                None,
                WatcherOptions::computed(),
                Some(self.downgrade()),
                false,
            )?;
            self.0.computed.borrow_mut().insert(name.clone(), watcher);
        }
        Ok(())
    }

    pub(super) fn init_watch(&self) -> Result<(), Error> {
        for spec in self.0.options.watches() {
            let handler = spec.handler.clone();
            self.watch(spec.path.as_str(), move |vm, new, old| handler(vm, new, old), spec.options)?;
        }
        Ok(())
    }

    /// Read a prop, state key or computed property, tracked.
    pub fn get(&self, key: &str) -> Value {
        if self.0.props.has_own(key) {
            return self.0.props.get(key);
        }
        if self.0.state.has_own(key) {
            return self.0.state.get(key);
        }
        let computed = self.0.computed.borrow().get(key).cloned();
        if let Some(watcher) = computed {
            if let Err(err) = watcher.evaluate() {
                handle_error(&err, Some(self), &format!("computed property \"{key}\""));
            }
            watcher.depend();
            return watcher.value();
        }
        warn(
            format!("Property \"{key}\" is not defined on the instance but referenced during render."),
            Some(self),
        );
        Value::Null
    }

    /// Write a state key, a prop (with a warning) or a computed property
    /// with a setter. Unknown keys are an error: declare them in `state`.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<(), Error> {
        let value = value.into();
        if self.0.props.has_own(key) {
            warn(
                format!(
                    "Avoid mutating a prop directly since the value will be overwritten whenever the parent \
                     component re-renders. Prop being mutated: \"{key}\""
                ),
                Some(self),
            );
            return self.0.props.set(key, value);
        }
        if self.0.state.has_own(key) {
            return self.0.state.set(key, value);
        }
        if self.0.computed.borrow().contains_key(key) {
            match self.0.options.computed_specs().get(key).and_then(|s| s.setter.clone()) {
                Some(setter) => {
                    if let Err(err) = setter(self, value) {
                        handle_error(&*err, Some(self), &format!("setter of computed property \"{key}\""));
                    }
                }
                None => warn(
                    format!("Computed property \"{key}\" was assigned to but it has no setter."),
                    Some(self),
                ),
            }
            return Ok(());
        }
        invariant(Error::UndeclaredProperty(key.to_owned()))
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.0.props.has_own(key) || self.0.state.has_own(key) || self.0.computed.borrow().contains_key(key)
    }

    /// The root state object.
    pub fn state(&self) -> ReactiveObject {
        self.0.state.clone()
    }

    pub fn props(&self) -> ReactiveObject {
        self.0.props.clone()
    }

    /// Add a key to a nested reactive container so that it is reactive.
    ///
    /// Root state cannot grow this way; declare keys upfront instead.
    pub fn set_reactive(
        &self,
        target: &Value,
        key: impl Into<PropertyKey>,
        value: impl Into<Value>,
    ) -> Result<Value, Error> {
        reactive::set(target, key, value)
    }

    pub fn delete_reactive(&self, target: &Value, key: impl Into<PropertyKey>) -> Result<(), Error> {
        reactive::del(target, key)
    }

    /// Call `handler(vm, new, old)` whenever `source` changes.
    pub fn watch<F>(&self, source: impl Into<WatchSource>, handler: F, options: WatchOptions) -> Result<WatchHandle, Error>
    where
        F: Fn(&Component, &Value, &Value) -> Result<(), BoxError> + 'static,
    {
        let handler: WatchHandler = Rc::new(handler);
        let (expression, getter) = match source.into() {
            WatchSource::Getter(f) => ("<function>".to_owned(), self.getter_source(f)),
            WatchSource::Path(path) => match parse_path(&path) {
                Some(segments) => {
                    if !self.has_key(&segments[0]) {
                        invariant(Error::UnknownWatchPath(path.clone()))?;
                    }
                    let getter = self.path_source(segments);
                    (path, getter)
                }
                None => {
                    warn(
                        format!(
                            "Failed watching path: \"{path}\" Watcher only accepts simple dot-delimited paths. \
                             For full control, use a function instead."
                        ),
                        Some(self),
                    );
                    let noop: Getter = Rc::new(|| -> Result<Value, BoxError> { Ok(Value::Null) });
                    (path, noop)
                }
            },
        };

        let weak = self.downgrade();
        let callback_handler = handler.clone();
        let callback: WatchCallback = Rc::new(move |new: &Value, old: &Value| match weak.upgrade() {
            Some(vm) => callback_handler(&vm, new, old),
            None => Ok(()),
        });
        let watcher_options = WatcherOptions {
            deep: options.deep,
            user: true,
            sync: options.sync,
            ..WatcherOptions::default()
        };
        let watcher = Watcher::build(
            getter,
            expression.clone(),
            Some(callback),
            watcher_options,
            Some(self.downgrade()),
            false,
        )?;
        self.0.watchers.borrow_mut().push(watcher.clone());

        if options.immediate {
            if let Err(err) = handler(self, &watcher.value(), &Value::Null) {
                handle_error(&*err, Some(self), &format!("callback for immediate watcher \"{expression}\""));
            }
        }
        Ok(WatchHandle(watcher))
    }
}

impl Component {
    fn getter_source(&self, f: Rc<dyn Fn(&Component) -> Result<Value, BoxError>>) -> Getter {
        let weak = self.downgrade();
        Rc::new(move || -> Result<Value, BoxError> {
            match weak.upgrade() {
                Some(vm) => f(&vm),
                None => Ok(Value::Null),
            }
        })
    }

    fn path_source(&self, segments: Vec<String>) -> Getter {
        let weak = self.downgrade();
        Rc::new(move || -> Result<Value, BoxError> {
            let Some(vm) = weak.upgrade() else {
                return Ok(Value::Null);
            };
            let mut value = vm.get(&segments[0]);
            for segment in &segments[1..] {
                value = value.get_key(segment);
            }
            Ok(value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDom;
    use crate::instance::ComponentOptions;
    use crate::scheduler;
    use crate::vdom::Patcher;
    use std::cell::RefCell;

    fn instance(options: ComponentOptions) -> Component {
        let dom = Rc::new(MemoryDom::new());
        Component::new(&options.define(), Rc::new(Patcher::new(dom))).unwrap()
    }

    #[test]
    fn state_defaults_are_per_instance() {
        let options = ComponentOptions::new("counter").state("items", Value::array(Vec::<Value>::new()));
        let ctor = options.define();
        let dom = Rc::new(MemoryDom::new());
        let patcher = Rc::new(Patcher::new(dom));
        let a = Component::new(&ctor, patcher.clone()).unwrap();
        let b = Component::new(&ctor, patcher).unwrap();

        a.get("items").as_array().unwrap().push(1);
        assert_eq!(a.get("items").as_array().unwrap().len(), 1);
        assert_eq!(b.get("items").as_array().unwrap().len(), 0);
    }

    #[test]
    fn computed_reads_through_and_caches() {
        let calls = Rc::new(RefCell::new(0));
        let counted = calls.clone();
        let vm = instance(ComponentOptions::new("c").state("n", 2).computed("double", move |vm| {
            *counted.borrow_mut() += 1;
            Ok(Value::from(vm.get("n").as_f64().unwrap_or(0.0) * 2.0))
        }));
        assert_eq!(vm.get("double"), Value::from(4));
        assert_eq!(vm.get("double"), Value::from(4));
        assert_eq!(*calls.borrow(), 1);

        vm.set("n", 5).unwrap();
        assert_eq!(vm.get("double"), Value::from(10));
        assert_eq!(*calls.borrow(), 2);
    }

    #[test]
    fn computed_setter_writes_back() {
        let vm = instance(
            ComponentOptions::new("c")
                .state("first", "Ada")
                .computed_with_setter(
                    "name",
                    |vm| Ok(vm.get("first")),
                    |vm, value| {
                        vm.set("first", value)?;
                        Ok(())
                    },
                ),
        );
        vm.set("name", "Grace").unwrap();
        assert_eq!(vm.get("first"), Value::from("Grace"));
    }

    #[test]
    fn undeclared_key_is_rejected() {
        let vm = instance(ComponentOptions::new("c").state("a", 1));
        assert!(matches!(vm.set("b", 1), Err(Error::UndeclaredProperty(_))));
        assert!(matches!(
            vm.set_reactive(&Value::Object(vm.state()), "b", 1),
            Err(Error::RootStateAddition(_))
        ));
    }

    #[test]
    fn path_watcher_fires_after_flush() {
        let vm = instance(ComponentOptions::new("c").state("user", Value::object([("name", "a")])));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        vm.watch(
            "user.name",
            move |_, new, old| {
                log.borrow_mut().push((new.clone(), old.clone()));
                Ok(())
            },
            WatchOptions::default(),
        )
        .unwrap();

        vm.get("user").as_object().unwrap().set("name", "b").unwrap();
        assert!(seen.borrow().is_empty());
        scheduler::tick().unwrap();
        assert_eq!(*seen.borrow(), vec![(Value::from("b"), Value::from("a"))]);
    }

    #[test]
    fn immediate_and_unwatch() {
        let vm = instance(ComponentOptions::new("c").state("n", 1));
        let count = Rc::new(RefCell::new(0));
        let hits = count.clone();
        let handle = vm
            .watch(
                "n",
                move |_, _, _| {
                    *hits.borrow_mut() += 1;
                    Ok(())
                },
                WatchOptions {
                    immediate: true,
                    sync: true,
                    ..WatchOptions::default()
                },
            )
            .unwrap();
        assert_eq!(*count.borrow(), 1);
        vm.set("n", 2).unwrap();
        assert_eq!(*count.borrow(), 2);
        handle.unwatch();
        vm.set("n", 3).unwrap();
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn unknown_watch_path_is_an_error() {
        let vm = instance(ComponentOptions::new("c"));
        let result = vm.watch("missing", |_, _, _| Ok(()), WatchOptions::default());
        assert!(matches!(result, Err(Error::UnknownWatchPath(_))));
    }

    #[test]
    fn closure_source_sums_two_keys() {
        let vm = instance(ComponentOptions::new("c").state("a", 1).state("b", 2));
        let total = Rc::new(RefCell::new(Value::Null));
        let out = total.clone();
        vm.watch(
            WatchSource::getter(|vm| {
                let sum = vm.get("a").as_f64().unwrap_or(0.0) + vm.get("b").as_f64().unwrap_or(0.0);
                Ok(Value::from(sum))
            }),
            move |_, new, _| {
                *out.borrow_mut() = new.clone();
                Ok(())
            },
            WatchOptions::default(),
        )
        .unwrap();
        vm.set("a", 10).unwrap();
        vm.set("b", 20).unwrap();
        scheduler::tick().unwrap();
        assert_eq!(*total.borrow(), Value::from(30));
    }
}
