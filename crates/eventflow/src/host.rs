//! Attaching an emitter to a plain host value.
//!
//! [`Augmented`] pairs a host with an emitter so the host gains the emitter
//! and flow operations. Hosts that already name one of those members are
//! rejected when the pair is built.

use std::collections::{BTreeMap, HashMap};
use std::ops::Deref;

use events::Emitter;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{FlowError, Result};
use crate::ext::Emits;

/// Member names an augmented host gains.
pub const FLOW_SURFACE: &[&str] = &[
    "on",
    "once",
    "off",
    "listeners",
    "listener_count",
    "event_names",
    "remove_all_listeners",
    "emit",
    "series",
    "parallel",
    "waterfall",
    "invoke",
    "invoke_sync",
];

/// A value whose member names can be listed.
pub trait Surface {
    fn member_names(&self) -> Vec<String>;
}

impl Surface for Map<String, Value> {
    fn member_names(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }
}

impl<V> Surface for HashMap<String, V> {
    fn member_names(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }
}

impl<V> Surface for BTreeMap<String, V> {
    fn member_names(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }
}

/// A host value paired with an emitter.
#[derive(Debug)]
pub struct Augmented<H, T> {
    host: H,
    emitter: Emitter<T>,
}

impl<H: Surface, T> Augmented<H, T> {
    /// Attach a fresh emitter to `host`.
    pub fn new(host: H) -> Result<Self> {
        Self::with_emitter(host, Emitter::new())
    }

    /// Attach an existing emitter to `host`.
    pub fn with_emitter(host: H, emitter: Emitter<T>) -> Result<Self> {
        let mut names: Vec<String> = host
            .member_names()
            .into_iter()
            .filter(|name| FLOW_SURFACE.contains(&name.as_str()))
            .collect();
        if !names.is_empty() {
            names.sort();
            return Err(FlowError::CapabilityCollision { names });
        }

        debug!("Emitter attached to host");
        Ok(Self { host, emitter })
    }
}

impl<H, T> Augmented<H, T> {
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn into_parts(self) -> (H, Emitter<T>) {
        (self.host, self.emitter)
    }
}

impl<H, T> Deref for Augmented<H, T> {
    type Target = Emitter<T>;

    fn deref(&self) -> &Emitter<T> {
        &self.emitter
    }
}

impl<H: Send + Sync, T> Emits<T> for Augmented<H, T> {
    fn emitter(&self) -> &Emitter<T> {
        &self.emitter
    }
}
