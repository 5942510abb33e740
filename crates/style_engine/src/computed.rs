//! The computed-value resolver: lazy, per-slot resolution of cascaded
//! values into computed values.

use crate::property::ComputeContext;
use crate::style_map::SlotFlags;
use crate::{traversal, CssEngine};
use css::{CssError, Value};
use dom::{Document, NodeId};
use std::sync::Arc;

impl CssEngine {
    /// The computed value of one property on an element or pseudo-element.
    ///
    /// Builds the cascaded style map on first use, then resolves the slot:
    /// absent values fall back to the property default or inherit from the
    /// nearest stylable ancestor; everything else goes through the value
    /// manager. Results are cached in the slot until invalidated, so
    /// repeated queries return the same shared value.
    pub fn get_computed_style(
        &mut self,
        doc: &Document,
        element: NodeId,
        pseudo: Option<&str>,
        idx: usize,
    ) -> Result<Arc<Value>, CssError> {
        if self.computed_map(element, pseudo).is_none() {
            let map = self.get_cascaded_style_map(doc, element, pseudo)?;
            self.put_computed_map(element, pseudo, map);
        }

        let (cascaded, already_computed) = {
            let Some(sm) = self.computed_map(element, pseudo) else {
                return Err(CssError::parse("computed style map missing after cascade"));
            };
            (sm.value(idx), sm.is_computed(idx))
        };
        if already_computed {
            return cascaded.ok_or_else(|| CssError::parse("computed slot holds no value"));
        }

        let vm = self.value_managers[idx].clone();
        let parent = traversal::parent_stylable_element(doc, element);
        let mut parent_relative = false;
        let mut deps = SlotFlags::empty();

        let result: Arc<Value> = match (&cascaded, parent) {
            (None, None) => vm.default_value(),
            (None, Some(p)) => {
                if vm.is_inherited_property() {
                    // Inheritance never goes through the pseudo axis.
                    parent_relative = true;
                    self.get_computed_style(doc, p, None, idx)?
                } else {
                    vm.default_value()
                }
            }
            (Some(v), Some(p)) if v.is_inherit() => {
                parent_relative = true;
                self.get_computed_style(doc, p, None, idx)?
            }
            (Some(v), _) => {
                let mut cx = ComputeContext {
                    engine: self,
                    doc,
                    element,
                    pseudo: pseudo.map(str::to_string),
                    property: idx,
                    deps: SlotFlags::empty(),
                };
                let computed = vm.compute_value(&mut cx, v)?;
                deps = cx.deps;
                computed
            }
        };

        let Some(sm) = self.computed_map_mut(element, pseudo) else {
            return Err(CssError::parse("computed style map vanished during resolution"));
        };
        let returned = match cascaded {
            None => {
                sm.put_value(idx, result.clone());
                sm.put_null_cascaded(idx, true);
                result
            }
            Some(v) => {
                if Arc::ptr_eq(&result, &v) {
                    v
                } else {
                    let wrapper = Arc::new(Value::Computed {
                        cascaded: v,
                        computed: result,
                    });
                    sm.put_value(idx, wrapper.clone());
                    wrapper
                }
            }
        };
        if parent_relative {
            sm.put_parent_relative(idx, true);
        }
        sm.or_flags(idx, deps);
        sm.put_computed(idx, true);
        Ok(returned)
    }
}
