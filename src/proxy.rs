//! Host-pluggable action registry for cache and debug collaborators.
//!
//! The SDK never owns a cache backend or a log sink. The host application
//! registers a callback for each action it wants to service and the SDK
//! dispatches through this registry. The set of valid actions is closed:
//! cache `load`/`save` and debug `log`/`screen`.
//!
//! In strict mode (the default) dispatching an unregistered action is a
//! configuration error. [`ProxyRegistry::set_tolerant`] switches every
//! proxy kind to sentinel results instead: cache loads miss, cache saves
//! report not-stored, debug calls become no-ops.

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;

use crate::error::{Error, Result};
use crate::taxonomy::TaxonomyNode;

/// The closed set of actions a host can register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyAction {
    /// Cache `load(key)`.
    CacheLoad,
    /// Cache `save(key, value, expiry)`.
    CacheSave,
    /// Debug `log(message)`.
    DebugLog,
    /// Debug `screen(message)`.
    DebugScreen,
}

/// Proxy kinds grouping the registered actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyKind {
    /// External cache backend.
    Cache,
    /// Host-facing debug sink.
    Debug,
}

impl ProxyAction {
    /// Looks up an action by proxy kind and name.
    ///
    /// Returns `None` for names outside the closed action set, which
    /// callers treat as an invalid registration.
    #[must_use]
    pub fn from_name(kind: ProxyKind, name: &str) -> Option<Self> {
        match (kind, name) {
            (ProxyKind::Cache, "load") => Some(Self::CacheLoad),
            (ProxyKind::Cache, "save") => Some(Self::CacheSave),
            (ProxyKind::Debug, "log") => Some(Self::DebugLog),
            (ProxyKind::Debug, "screen") => Some(Self::DebugScreen),
            _ => None,
        }
    }

    /// The kind this action belongs to.
    #[must_use]
    pub fn kind(self) -> ProxyKind {
        match self {
            Self::CacheLoad | Self::CacheSave => ProxyKind::Cache,
            Self::DebugLog | Self::DebugScreen => ProxyKind::Debug,
        }
    }

    /// Qualified action name used in error messages.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::CacheLoad => "cache.load",
            Self::CacheSave => "cache.save",
            Self::DebugLog => "debug.log",
            Self::DebugScreen => "debug.screen",
        }
    }
}

/// A value held by the external cache.
///
/// The cache stores taxonomy nodes, taxonomy id lists, and opaque payloads
/// for peer subsystems (object-store records, group maps).
#[derive(Debug, Clone)]
pub enum CacheValue {
    /// A single taxonomy node.
    Node(TaxonomyNode),
    /// An ordered list of top-level taxonomy ids.
    IdList(Vec<String>),
    /// An opaque JSON payload owned by a peer subsystem.
    Payload(Value),
}

impl CacheValue {
    /// Returns the contained node, when this value is a node.
    #[must_use]
    pub fn as_node(&self) -> Option<&TaxonomyNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::IdList(_) | Self::Payload(_) => None,
        }
    }

    /// Returns the contained id list, when this value is an id list.
    #[must_use]
    pub fn as_id_list(&self) -> Option<&[String]> {
        match self {
            Self::IdList(ids) => Some(ids),
            Self::Node(_) | Self::Payload(_) => None,
        }
    }

    /// Returns the contained payload, when this value is a payload.
    #[must_use]
    pub fn as_payload(&self) -> Option<&Value> {
        match self {
            Self::Payload(value) => Some(value),
            Self::Node(_) | Self::IdList(_) => None,
        }
    }
}

/// Outcome of a cache load. Distinguishes "not found" from a found value
/// unambiguously; there is no sentinel value.
#[derive(Debug, Clone)]
pub enum CacheLookup {
    /// The key was present.
    Found(CacheValue),
    /// The key was absent.
    Missing,
}

/// Outcome of a cache save. A `NotStored` result makes the taxonomy engine
/// fall back to its in-process runtime cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheWrite {
    /// The backend accepted the write.
    Stored,
    /// The backend refused or failed the write.
    NotStored,
}

/// Cache load callback. `key` is the derived cache key.
pub type CacheLoadFn = dyn Fn(&str) -> CacheLookup + Send + Sync;

/// Cache save callback. `expiry_secs` of `Some(0)` means "never expire";
/// `None` leaves expiry to the backend's default policy.
pub type CacheSaveFn = dyn Fn(&str, CacheValue, Option<u64>) -> CacheWrite + Send + Sync;

/// Debug sink callback; fire-and-forget.
pub type DebugFn = dyn Fn(&str) + Send + Sync;

/// A callback paired with the action it implements, for name-based
/// registration.
pub enum ProxyCallback {
    /// Implements [`ProxyAction::CacheLoad`].
    CacheLoad(Box<CacheLoadFn>),
    /// Implements [`ProxyAction::CacheSave`].
    CacheSave(Box<CacheSaveFn>),
    /// Implements [`ProxyAction::DebugLog`].
    DebugLog(Box<DebugFn>),
    /// Implements [`ProxyAction::DebugScreen`].
    DebugScreen(Box<DebugFn>),
}

impl ProxyCallback {
    fn action(&self) -> ProxyAction {
        match self {
            Self::CacheLoad(_) => ProxyAction::CacheLoad,
            Self::CacheSave(_) => ProxyAction::CacheSave,
            Self::DebugLog(_) => ProxyAction::DebugLog,
            Self::DebugScreen(_) => ProxyAction::DebugScreen,
        }
    }
}

/// Registry of host-supplied cache and debug callbacks.
///
/// Each action may be registered exactly once; a second registration is a
/// configuration error. The registry is shared behind an `Arc` and lives
/// for the life of the host process.
#[derive(Default)]
pub struct ProxyRegistry {
    cache_load: RwLock<Option<Box<CacheLoadFn>>>,
    cache_save: RwLock<Option<Box<CacheSaveFn>>>,
    debug_log: RwLock<Option<Box<DebugFn>>>,
    debug_screen: RwLock<Option<Box<DebugFn>>>,
    tolerant: AtomicBool,
}

impl std::fmt::Debug for ProxyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyRegistry")
            .field("cache_load", &self.is_registered(ProxyAction::CacheLoad))
            .field("cache_save", &self.is_registered(ProxyAction::CacheSave))
            .field("debug_log", &self.is_registered(ProxyAction::DebugLog))
            .field("debug_screen", &self.is_registered(ProxyAction::DebugScreen))
            .field("tolerant", &self.tolerant.load(Ordering::Relaxed))
            .finish()
    }
}

impl ProxyRegistry {
    /// Creates an empty registry in strict mode.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggles tolerant mode for all proxy kinds.
    ///
    /// Tolerant mode replaces missing-callback errors with sentinel
    /// results (`Missing`, `NotStored`, debug no-op).
    pub fn set_tolerant(&self, tolerant: bool) {
        self.tolerant.store(tolerant, Ordering::Relaxed);
    }

    /// Returns true when a callback is registered for `action`.
    #[must_use]
    pub fn is_registered(&self, action: ProxyAction) -> bool {
        match action {
            ProxyAction::CacheLoad => Self::slot_filled(&self.cache_load),
            ProxyAction::CacheSave => Self::slot_filled(&self.cache_save),
            ProxyAction::DebugLog => Self::slot_filled(&self.debug_log),
            ProxyAction::DebugScreen => Self::slot_filled(&self.debug_screen),
        }
    }

    fn slot_filled<T: ?Sized>(slot: &RwLock<Option<Box<T>>>) -> bool {
        slot.read().map(|guard| guard.is_some()).unwrap_or(false)
    }

    /// Registers a callback by proxy kind and action name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when `name` is not a valid action
    /// for `kind`, when the callback does not implement the named action,
    /// or when the action is already registered.
    pub fn register(&self, kind: ProxyKind, name: &str, callback: ProxyCallback) -> Result<()> {
        let Some(action) = ProxyAction::from_name(kind, name) else {
            return Err(Error::configuration(format!(
                "'{name}' is not a valid {kind:?} proxy action"
            )));
        };
        if callback.action() != action {
            return Err(Error::configuration(format!(
                "callback does not implement action '{}'",
                action.name()
            )));
        }
        match callback {
            ProxyCallback::CacheLoad(f) => self.install(&self.cache_load, action, f),
            ProxyCallback::CacheSave(f) => self.install(&self.cache_save, action, f),
            ProxyCallback::DebugLog(f) => self.install(&self.debug_log, action, f),
            ProxyCallback::DebugScreen(f) => self.install(&self.debug_screen, action, f),
        }
    }

    /// Registers the cache `load` callback.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the action is already registered.
    pub fn register_cache_load<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(&str) -> CacheLookup + Send + Sync + 'static,
    {
        self.install(&self.cache_load, ProxyAction::CacheLoad, Box::new(callback))
    }

    /// Registers the cache `save` callback.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the action is already registered.
    pub fn register_cache_save<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(&str, CacheValue, Option<u64>) -> CacheWrite + Send + Sync + 'static,
    {
        self.install(&self.cache_save, ProxyAction::CacheSave, Box::new(callback))
    }

    /// Registers the debug `log` callback.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the action is already registered.
    pub fn register_debug_log<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.install(&self.debug_log, ProxyAction::DebugLog, Box::new(callback))
    }

    /// Registers the debug `screen` callback.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the action is already registered.
    pub fn register_debug_screen<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.install(&self.debug_screen, ProxyAction::DebugScreen, Box::new(callback))
    }

    fn install<T: ?Sized>(
        &self,
        slot: &RwLock<Option<Box<T>>>,
        action: ProxyAction,
        callback: Box<T>,
    ) -> Result<()> {
        let mut guard = slot
            .write()
            .map_err(|_| Error::configuration("proxy registry lock poisoned"))?;
        if guard.is_some() {
            return Err(Error::configuration(format!(
                "'{}' has already been registered",
                action.name()
            )));
        }
        *guard = Some(callback);
        Ok(())
    }

    fn missing(&self, action: ProxyAction) -> Error {
        Error::configuration(format!(
            "no proxy callback registered for '{}'",
            action.name()
        ))
    }

    fn is_tolerant(&self) -> bool {
        self.tolerant.load(Ordering::Relaxed)
    }

    /// Dispatches a cache load.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when no callback is registered and
    /// the registry is in strict mode.
    pub fn cache_load(&self, key: &str) -> Result<CacheLookup> {
        let guard = self
            .cache_load
            .read()
            .map_err(|_| Error::configuration("proxy registry lock poisoned"))?;
        match guard.as_ref() {
            Some(callback) => Ok(callback(key)),
            None if self.is_tolerant() => Ok(CacheLookup::Missing),
            None => Err(self.missing(ProxyAction::CacheLoad)),
        }
    }

    /// Dispatches a cache save.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when no callback is registered and
    /// the registry is in strict mode.
    pub fn cache_save(
        &self,
        key: &str,
        value: CacheValue,
        expiry_secs: Option<u64>,
    ) -> Result<CacheWrite> {
        let guard = self
            .cache_save
            .read()
            .map_err(|_| Error::configuration("proxy registry lock poisoned"))?;
        match guard.as_ref() {
            Some(callback) => Ok(callback(key, value, expiry_secs)),
            None if self.is_tolerant() => Ok(CacheWrite::NotStored),
            None => Err(self.missing(ProxyAction::CacheSave)),
        }
    }

    /// Dispatches a debug log message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when no callback is registered and
    /// the registry is in strict mode.
    pub fn debug_log(&self, message: &str) -> Result<()> {
        let guard = self
            .debug_log
            .read()
            .map_err(|_| Error::configuration("proxy registry lock poisoned"))?;
        match guard.as_ref() {
            Some(callback) => {
                callback(message);
                Ok(())
            }
            None if self.is_tolerant() => Ok(()),
            None => Err(self.missing(ProxyAction::DebugLog)),
        }
    }

    /// Dispatches a debug screen message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when no callback is registered and
    /// the registry is in strict mode.
    pub fn debug_screen(&self, message: &str) -> Result<()> {
        let guard = self
            .debug_screen
            .read()
            .map_err(|_| Error::configuration("proxy registry lock poisoned"))?;
        match guard.as_ref() {
            Some(callback) => {
                callback(message);
                Ok(())
            }
            None if self.is_tolerant() => Ok(()),
            None => Err(self.missing(ProxyAction::DebugScreen)),
        }
    }
}
