// ============================================================================
// ripple-store - Relation Context
// Per-owner membership set for a one-to-many index
// ============================================================================

use std::cell::RefCell;
use std::hash::Hash;
use std::rc::Rc;

use rustc_hash::FxHashSet;

/// The set of related entity keys held against one owner key.
///
/// A cheap `Clone` handle; clones share the same set, so a context handed
/// out by [`OneToManyIndex::context`] stays live as the index mutates it.
///
/// [`OneToManyIndex::context`]: crate::relationships::OneToManyIndex::context
pub struct RelationContext<P, K> {
    owner: P,
    related: Rc<RefCell<FxHashSet<K>>>,
}

impl<P: Clone, K> Clone for RelationContext<P, K> {
    fn clone(&self) -> Self {
        Self {
            owner: self.owner.clone(),
            related: Rc::clone(&self.related),
        }
    }
}

impl<P, K> RelationContext<P, K>
where
    P: Clone,
    K: Eq + Hash + Clone,
{
    pub fn new(owner: P) -> Self {
        Self {
            owner,
            related: Rc::new(RefCell::new(FxHashSet::default())),
        }
    }

    pub fn owner(&self) -> &P {
        &self.owner
    }

    /// Adds the key. Returns false when it was already a member.
    pub fn associate(&self, key: K) -> bool {
        self.related.borrow_mut().insert(key)
    }

    /// Removes the key. Returns false when it was not a member.
    pub fn disassociate(&self, key: &K) -> bool {
        self.related.borrow_mut().remove(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.related.borrow().contains(key)
    }

    pub fn keys(&self) -> Vec<K> {
        self.related.borrow().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.related.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.related.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.related.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_round_trip() {
        let ctx: RelationContext<i64, i64> = RelationContext::new(1);
        assert_eq!(*ctx.owner(), 1);
        assert!(ctx.is_empty());

        assert!(ctx.associate(10));
        assert!(!ctx.associate(10));
        assert!(ctx.contains(&10));
        assert_eq!(ctx.len(), 1);

        assert!(ctx.disassociate(&10));
        assert!(!ctx.disassociate(&10));
        assert!(ctx.is_empty());
    }

    #[test]
    fn clones_share_the_set() {
        let ctx: RelationContext<&'static str, i64> = RelationContext::new("a");
        let alias = ctx.clone();
        ctx.associate(1);
        assert!(alias.contains(&1));
    }
}
