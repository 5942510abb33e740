//! Property-change notification bus.

use crate::CssEngine;
use dom::NodeId;
use std::sync::Arc;

/// A property-change notification: the element and the indices of every
/// property whose computed value may have changed.
#[derive(Debug)]
pub struct CssEngineEvent<'a> {
    pub element: NodeId,
    pub properties: &'a [usize],
}

pub trait CssEngineListener {
    fn properties_changed(&self, event: &CssEngineEvent<'_>);
}

impl CssEngine {
    /// Register a listener. Listeners are notified in registration order.
    pub fn add_listener(&mut self, listener: Arc<dyn CssEngineListener>) {
        self.listeners.push(listener);
    }

    pub fn remove_listener(&mut self, listener: &Arc<dyn CssEngineListener>) {
        self.listeners
            .retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// Notify every listener. The list is snapshotted first so listeners may
    /// register or unregister during dispatch.
    pub(crate) fn fire_properties_changed(&self, element: NodeId, properties: &[usize]) {
        if self.listeners.is_empty() {
            return;
        }
        let snapshot: Vec<Arc<dyn CssEngineListener>> = self.listeners.clone();
        let event = CssEngineEvent {
            element,
            properties,
        };
        for listener in snapshot {
            listener.properties_changed(&event);
        }
    }
}
