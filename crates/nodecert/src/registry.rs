//! Named services with lazily built defaults.
//!
//! A [`ServiceRegistry`] maps names to instances of one service type. An
//! entry starts as a factory and is resolved the first time it is asked
//! for; every later `get` returns the same instance. Tests swap in doubles
//! with [`ServiceRegistry::set`] and restore the defaults with
//! [`ServiceRegistry::reset`].
//!
//! [`Services`] is the context object built once per process and handed to
//! whatever needs a collaborator.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use nodecert_client::HttpCaTransport;
use nodecert_core::{CaTransport, CertError, Result};
use tracing::debug;

use crate::settings::Settings;

/// Name of the built-in HTTP transport.
pub const HTTP_TRANSPORT: &str = "http";

type Factory<T> = Arc<dyn Fn() -> Result<Arc<T>> + Send + Sync>;

struct Entry<T: ?Sized> {
    factory: Option<Factory<T>>,
    instance: Arc<Mutex<Option<Arc<T>>>>,
}

impl<T: ?Sized> Entry<T> {
    fn lazy(factory: Factory<T>) -> Self {
        Self {
            factory: Some(factory),
            instance: Arc::new(Mutex::new(None)),
        }
    }

    fn resolved(instance: Arc<T>) -> Self {
        Self {
            factory: None,
            instance: Arc::new(Mutex::new(Some(instance))),
        }
    }
}

/// Registry of named services of type `T`.
pub struct ServiceRegistry<T: ?Sized> {
    defaults: Vec<(String, Factory<T>)>,
    entries: RwLock<HashMap<String, Entry<T>>>,
}

impl<T: ?Sized + Send + Sync> Default for ServiceRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized + Send + Sync> ServiceRegistry<T> {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            defaults: Vec::new(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register a default factory. It is not called until the first `get`.
    #[must_use]
    pub fn with_default<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<T>> + Send + Sync + 'static,
    {
        let name = name.into();
        let factory: Factory<T> = Arc::new(factory);
        self.entries
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), Entry::lazy(Arc::clone(&factory)));
        self.defaults.push((name, factory));
        self
    }

    /// Resolve a service.
    ///
    /// The factory runs at most once per entry, even under concurrent
    /// callers. A factory error leaves the entry unresolved.
    pub fn get(&self, name: &str) -> Result<Arc<T>> {
        let (factory, slot) = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            let entry = entries
                .get(name)
                .ok_or_else(|| CertError::UnknownService(name.to_string()))?;
            (entry.factory.clone(), Arc::clone(&entry.instance))
        };

        let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(instance) = slot.as_ref() {
            return Ok(Arc::clone(instance));
        }

        let factory = factory.ok_or_else(|| CertError::UnknownService(name.to_string()))?;
        debug!(service = name, "resolving service");
        let instance = factory()?;
        *slot = Some(Arc::clone(&instance));
        Ok(instance)
    }

    /// Replace or add a service with an already built instance.
    pub fn set(&self, name: impl Into<String>, instance: Arc<T>) {
        let name = name.into();
        debug!(service = %name, "service replaced");
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, Entry::resolved(instance));
    }

    /// Drop every instance and custom entry, restoring the default factories.
    pub fn reset(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
        for (name, factory) in &self.defaults {
            entries.insert(name.clone(), Entry::lazy(Arc::clone(factory)));
        }
    }

    /// Whether a service is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl<T: ?Sized> std::fmt::Debug for ServiceRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("ServiceRegistry")
            .field("entries", &entries.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Collaborators shared by every action in one process.
#[derive(Debug)]
pub struct Services {
    pub transports: ServiceRegistry<dyn CaTransport>,
}

impl Services {
    /// Register the built-in transports for `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        let config = settings.transport_config();
        let transports = ServiceRegistry::new().with_default(HTTP_TRANSPORT, move || {
            let transport: Arc<dyn CaTransport> = Arc::new(HttpCaTransport::new(config.clone())?);
            Ok(transport)
        });
        Self { transports }
    }

    /// The transport registered as `name`.
    pub fn transport(&self, name: &str) -> Result<Arc<dyn CaTransport>> {
        self.transports.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodecert_core::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct Fixed(&'static str);

    impl Greeter for Fixed {
        fn greet(&self) -> String {
            self.0.to_string()
        }
    }

    fn registry(calls: &Arc<AtomicUsize>) -> ServiceRegistry<dyn Greeter> {
        let calls = Arc::clone(calls);
        ServiceRegistry::new().with_default("default", move || {
            calls.fetch_add(1, Ordering::SeqCst);
            let greeter: Arc<dyn Greeter> = Arc::new(Fixed("hello"));
            Ok(greeter)
        })
    }

    #[test]
    fn test_factory_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let reg = registry(&calls);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let a = reg.get("default").unwrap();
        let b = reg.get("default").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_get_resolves_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let reg = Arc::new(registry(&calls));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || reg.get("default").unwrap())
            })
            .collect();
        let instances: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(instances.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_unknown_service() {
        let reg: ServiceRegistry<dyn Greeter> = ServiceRegistry::new();
        let err = reg.get("nope").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::UnknownService);
    }

    #[test]
    fn test_set_then_reset() {
        let calls = Arc::new(AtomicUsize::new(0));
        let reg = registry(&calls);

        reg.set("default", Arc::new(Fixed("double")));
        reg.set("extra", Arc::new(Fixed("extra")));
        assert_eq!(reg.get("default").unwrap().greet(), "double");
        assert_eq!(reg.names(), vec!["default".to_string(), "extra".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        reg.reset();
        assert!(!reg.contains("extra"));
        assert_eq!(reg.get("default").unwrap().greet(), "hello");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_factory_can_retry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let reg: ServiceRegistry<dyn Greeter> = ServiceRegistry::new().with_default("flaky", move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(CertError::Configuration("not yet".into()));
            }
            let greeter: Arc<dyn Greeter> = Arc::new(Fixed("ok"));
            Ok(greeter)
        });

        assert!(reg.get("flaky").is_err());
        assert_eq!(reg.get("flaky").unwrap().greet(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_services_register_http() {
        let settings = Settings {
            ca_server: "ca.example.com".into(),
            ..Settings::default()
        };
        let services = Services::from_settings(&settings);
        assert!(services.transports.contains(HTTP_TRANSPORT));
        assert!(services.transport(HTTP_TRANSPORT).is_ok());
        assert_eq!(
            services.transport("ftp").err().unwrap().kind(),
            ErrorKind::UnknownService
        );
    }
}
