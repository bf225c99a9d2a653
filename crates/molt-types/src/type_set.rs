//! Monotone sets of concrete types.
//!
//! A `TypeSet` only ever grows within a propagation round; the solver's
//! termination argument rests on that. The representation is a sorted small
//! vector, which keeps equality, hashing, and class iteration canonical
//! regardless of insertion order.

use crate::registry::ClassId;
use crate::ty::Ty;
use smallvec::SmallVec;

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TypeSet {
    tys: SmallVec<[Ty; 4]>,
}

impl TypeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(ty: Ty) -> Self {
        let mut set = Self::new();
        set.insert(ty);
        set
    }

    /// Insert a type; returns true if the set grew.
    pub fn insert(&mut self, ty: Ty) -> bool {
        match self.tys.binary_search(&ty) {
            Ok(_) => false,
            Err(pos) => {
                self.tys.insert(pos, ty);
                true
            }
        }
    }

    /// Union another set into this one; returns true if this set grew.
    pub fn union_with(&mut self, other: &TypeSet) -> bool {
        let mut grew = false;
        for &ty in &other.tys {
            grew |= self.insert(ty);
        }
        grew
    }

    #[inline]
    pub fn contains(&self, ty: Ty) -> bool {
        self.tys.binary_search(&ty).is_ok()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Ty> + '_ {
        self.tys.iter().copied()
    }

    /// Distinct classes in the set, in sorted order.
    pub fn classes(&self) -> impl Iterator<Item = ClassId> + '_ {
        let mut last: Option<ClassId> = None;
        self.tys.iter().filter_map(move |ty| {
            if last == Some(ty.class) {
                None
            } else {
                last = Some(ty.class);
                Some(ty.class)
            }
        })
    }

    pub fn class_count(&self) -> usize {
        self.classes().count()
    }

    /// The unique class of the set, if there is exactly one.
    pub fn single_class(&self) -> Option<ClassId> {
        let mut classes = self.classes();
        let first = classes.next()?;
        classes.next().is_none().then_some(first)
    }

    pub fn contains_class(&self, class: ClassId) -> bool {
        self.classes().any(|c| c == class)
    }
}

impl FromIterator<Ty> for TypeSet {
    fn from_iter<I: IntoIterator<Item = Ty>>(iter: I) -> Self {
        let mut set = TypeSet::new();
        for ty in iter {
            set.insert(ty);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::SiteId;

    fn ty(class: u32, site: u32) -> Ty {
        Ty::at(ClassId(class), SiteId(site))
    }

    #[test]
    fn insertion_is_order_independent() {
        let mut a = TypeSet::new();
        a.insert(ty(2, 0));
        a.insert(ty(1, 5));
        a.insert(ty(1, 3));

        let mut b = TypeSet::new();
        b.insert(ty(1, 3));
        b.insert(ty(2, 0));
        b.insert(ty(1, 5));

        assert_eq!(a, b);
    }

    #[test]
    fn union_reports_growth() {
        let mut a = TypeSet::single(ty(1, 0));
        let b = TypeSet::from_iter([ty(1, 0), ty(2, 0)]);
        assert!(a.union_with(&b));
        assert!(!a.union_with(&b));
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn classes_deduplicate_sites() {
        let set = TypeSet::from_iter([ty(1, 0), ty(1, 7), ty(3, 0)]);
        let classes: Vec<ClassId> = set.classes().collect();
        assert_eq!(classes, vec![ClassId(1), ClassId(3)]);
        assert_eq!(set.single_class(), None);
        assert_eq!(TypeSet::from_iter([ty(4, 0), ty(4, 1)]).single_class(), Some(ClassId(4)));
    }
}
