//! Dense per-element property storage with cascade metadata.

use bitflags::bitflags;
use css::Value;
use std::sync::Arc;

/// Cascade origin of a value. The ordering is authoritative: a later
/// variant outranks an earlier one at equal importance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Origin {
    #[default]
    UserAgent,
    User,
    NonCss,
    Author,
    InlineAuthor,
}

bitflags! {
    /// Per-slot state bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SlotFlags: u8 {
        const IMPORTANT            = 1 << 0;
        const COMPUTED             = 1 << 1;
        /// The cascaded value was absent; the stored value is a default or
        /// an inherited value filled in lazily.
        const NULL_CASCADED        = 1 << 2;
        /// The computed value came from the parent and must be re-resolved
        /// when the parent changes.
        const PARENT_RELATIVE      = 1 << 3;
        const FONT_SIZE_RELATIVE   = 1 << 4;
        const LINE_HEIGHT_RELATIVE = 1 << 5;
        const COLOR_RELATIVE       = 1 << 6;
    }
}

impl Default for SlotFlags {
    fn default() -> Self {
        SlotFlags::empty()
    }
}

#[derive(Debug, Clone, Default)]
struct Slot {
    value: Option<Arc<Value>>,
    origin: Origin,
    flags: SlotFlags,
}

/// Fixed-length vector of slots, one per property index.
#[derive(Debug, Clone)]
pub struct StyleMap {
    slots: Vec<Slot>,
    /// Set on maps installed wholesale from another engine; cascading must
    /// not be re-run over them.
    fixed_cascaded_style: bool,
}

impl StyleMap {
    pub fn new(len: usize) -> Self {
        Self {
            slots: vec![Slot::default(); len],
            fixed_cascaded_style: false,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn is_fixed_cascaded_style(&self) -> bool {
        self.fixed_cascaded_style
    }

    pub fn set_fixed_cascaded_style(&mut self, fixed: bool) {
        self.fixed_cascaded_style = fixed;
    }

    pub fn value(&self, idx: usize) -> Option<Arc<Value>> {
        self.slots[idx].value.clone()
    }

    pub fn put_value(&mut self, idx: usize, value: Arc<Value>) {
        self.slots[idx].value = Some(value);
    }

    pub fn clear_value(&mut self, idx: usize) {
        self.slots[idx].value = None;
    }

    pub fn origin(&self, idx: usize) -> Origin {
        self.slots[idx].origin
    }

    pub fn put_origin(&mut self, idx: usize, origin: Origin) {
        self.slots[idx].origin = origin;
    }

    #[inline]
    pub fn is_important(&self, idx: usize) -> bool {
        self.slots[idx].flags.contains(SlotFlags::IMPORTANT)
    }

    pub fn put_important(&mut self, idx: usize, important: bool) {
        self.slots[idx].flags.set(SlotFlags::IMPORTANT, important);
    }

    #[inline]
    pub fn is_computed(&self, idx: usize) -> bool {
        self.slots[idx].flags.contains(SlotFlags::COMPUTED)
    }

    pub fn put_computed(&mut self, idx: usize, computed: bool) {
        self.slots[idx].flags.set(SlotFlags::COMPUTED, computed);
    }

    #[inline]
    pub fn is_null_cascaded(&self, idx: usize) -> bool {
        self.slots[idx].flags.contains(SlotFlags::NULL_CASCADED)
    }

    pub fn put_null_cascaded(&mut self, idx: usize, on: bool) {
        self.slots[idx].flags.set(SlotFlags::NULL_CASCADED, on);
    }

    #[inline]
    pub fn is_parent_relative(&self, idx: usize) -> bool {
        self.slots[idx].flags.contains(SlotFlags::PARENT_RELATIVE)
    }

    pub fn put_parent_relative(&mut self, idx: usize, on: bool) {
        self.slots[idx].flags.set(SlotFlags::PARENT_RELATIVE, on);
    }

    #[inline]
    pub fn is_font_size_relative(&self, idx: usize) -> bool {
        self.slots[idx].flags.contains(SlotFlags::FONT_SIZE_RELATIVE)
    }

    #[inline]
    pub fn is_line_height_relative(&self, idx: usize) -> bool {
        self.slots[idx].flags.contains(SlotFlags::LINE_HEIGHT_RELATIVE)
    }

    #[inline]
    pub fn is_color_relative(&self, idx: usize) -> bool {
        self.slots[idx].flags.contains(SlotFlags::COLOR_RELATIVE)
    }

    pub fn or_flags(&mut self, idx: usize, flags: SlotFlags) {
        self.slots[idx].flags |= flags;
    }

    /// Reset a slot's flag word (and origin) before an overwrite.
    pub fn clear_flags(&mut self, idx: usize) {
        self.slots[idx].flags = SlotFlags::empty();
        self.slots[idx].origin = Origin::default();
    }

    /// Write a value unconditionally. Used for the user-agent and user
    /// origins, where specificity sorting already encodes precedence.
    pub fn put_sorted(&mut self, idx: usize, value: Arc<Value>, important: bool, origin: Origin) {
        let slot = &mut self.slots[idx];
        slot.value = Some(value);
        slot.flags.set(SlotFlags::IMPORTANT, important);
        slot.origin = origin;
    }

    /// Write an author-side value if the cascade lets it through:
    /// an incoming value replaces the slot iff the slot is empty, holds a
    /// user-agent value, holds a non-important user value, holds an author
    /// value that is non-important or is being overridden by an important
    /// one, or holds a non-CSS / inline value (last write wins there).
    pub fn put_author_property(
        &mut self,
        idx: usize,
        value: Arc<Value>,
        important: bool,
        origin: Origin,
    ) {
        let slot = &mut self.slots[idx];
        let cond = match &slot.value {
            None => true,
            Some(_) => match slot.origin {
                Origin::User => !slot.flags.contains(SlotFlags::IMPORTANT),
                Origin::Author => !slot.flags.contains(SlotFlags::IMPORTANT) || important,
                _ => true,
            },
        };
        if cond {
            slot.value = Some(value);
            slot.flags.set(SlotFlags::IMPORTANT, important);
            slot.origin = origin;
        }
    }

    /// Restore a slot to its cascaded form: null-cascaded slots empty out,
    /// `Computed` wrappers unwrap, and the computed bit clears.
    pub fn clear_computed_value(&mut self, idx: usize) {
        if self.is_null_cascaded(idx) {
            self.slots[idx].value = None;
        } else if let Some(v) = &self.slots[idx].value {
            let unwrapped = v.cascaded();
            self.slots[idx].value = Some(unwrapped);
        }
        self.put_computed(idx, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(n: f32) -> Arc<Value> {
        Arc::new(Value::Number(n))
    }

    #[test]
    fn author_overrides_user_agent() {
        let mut sm = StyleMap::new(1);
        sm.put_sorted(0, v(1.0), false, Origin::UserAgent);
        sm.put_author_property(0, v(2.0), false, Origin::Author);
        assert_eq!(sm.origin(0), Origin::Author);
        assert_eq!(sm.value(0).unwrap().as_number(), Some(2.0));
    }

    #[test]
    fn important_user_beats_important_author() {
        let mut sm = StyleMap::new(1);
        sm.put_sorted(0, v(1.0), true, Origin::User);
        sm.put_author_property(0, v(2.0), true, Origin::Author);
        assert_eq!(sm.origin(0), Origin::User);
        assert_eq!(sm.value(0).unwrap().as_number(), Some(1.0));
    }

    #[test]
    fn important_author_beats_plain_inline() {
        let mut sm = StyleMap::new(1);
        sm.put_author_property(0, v(1.0), true, Origin::Author);
        sm.put_author_property(0, v(2.0), false, Origin::InlineAuthor);
        assert_eq!(sm.origin(0), Origin::Author);
    }

    #[test]
    fn later_author_write_wins_at_same_importance() {
        let mut sm = StyleMap::new(1);
        sm.put_author_property(0, v(1.0), false, Origin::Author);
        sm.put_author_property(0, v(2.0), false, Origin::InlineAuthor);
        assert_eq!(sm.origin(0), Origin::InlineAuthor);
        sm.put_author_property(0, v(3.0), false, Origin::InlineAuthor);
        assert_eq!(sm.value(0).unwrap().as_number(), Some(3.0));
    }

    #[test]
    fn clear_computed_value_restores_cascaded_form() {
        let mut sm = StyleMap::new(2);

        // A slot whose cascaded value was absent goes back to empty.
        sm.put_value(0, v(16.0));
        sm.put_null_cascaded(0, true);
        sm.put_computed(0, true);
        sm.clear_computed_value(0);
        assert!(sm.value(0).is_none());
        assert!(!sm.is_computed(0));

        // A computed wrapper unwraps to its cascaded half.
        let cascaded = v(1.5);
        let wrapper = Arc::new(Value::Computed {
            cascaded: cascaded.clone(),
            computed: v(24.0),
        });
        sm.put_value(1, wrapper);
        sm.put_computed(1, true);
        sm.clear_computed_value(1);
        assert!(Arc::ptr_eq(&sm.value(1).unwrap(), &cascaded));
    }
}
