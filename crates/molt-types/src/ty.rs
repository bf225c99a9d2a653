//! Concrete types: a class paired with the allocation site that created it.

use crate::registry::ClassId;

/// Identity of an allocation site.
///
/// The site table itself lives in the graph crate; this crate only needs the
/// identity so a [`Ty`] can carry it. Scalars and other classes with no type
/// parameters share the designated [`SiteId::SCALAR`] identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteId(pub u32);

impl SiteId {
    /// The shared identity used by types that have no allocation site.
    pub const SCALAR: SiteId = SiteId(u32::MAX);

    #[inline]
    pub const fn is_scalar(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A concrete type: class identity plus allocation-site identity.
///
/// Equality is structural over the pair. Two sites of the same class are
/// distinct types; that distinction carries each site's element types through
/// the graph independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ty {
    pub class: ClassId,
    pub site: SiteId,
}

impl Ty {
    /// A type with no allocation site (scalars, plain instances of classes
    /// without type parameters are still site-tagged; see the graph crate).
    #[inline]
    pub const fn scalar(class: ClassId) -> Self {
        Ty {
            class,
            site: SiteId::SCALAR,
        }
    }

    #[inline]
    pub const fn at(class: ClassId, site: SiteId) -> Self {
        Ty { class, site }
    }
}
