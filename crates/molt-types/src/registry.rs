//! Class registry: built-in and user-defined class descriptors.
//!
//! Class identity is stable for the life of a compilation. Each descriptor
//! records the ordered base list, the linearized MRO (depth-first,
//! left-to-right, deduplicated), the type-parameter arity, and for built-ins
//! the [`Builtin`] tag the signature table is keyed by.

use crate::builtins::Builtin;
use molt_common::{Atom, Interner};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Index of a class in the [`ClassRegistry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

impl ClassId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Type-parameter arity of a class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    /// A fixed number of element slots: 0 for scalars and plain classes,
    /// 1 for list/set/frozenset/range/generator, 2 for dict.
    Fixed(u8),
    /// One slot per element of the literal that created the site (tuples).
    PerSite,
}

impl Arity {
    /// Slot count for sites of this class, given the creating literal's width.
    pub fn slots(self, literal_width: usize) -> usize {
        match self {
            Arity::Fixed(n) => n as usize,
            Arity::PerSite => literal_width,
        }
    }

    pub const fn is_container(self) -> bool {
        !matches!(self, Arity::Fixed(0))
    }
}

/// One class descriptor.
#[derive(Clone, Debug)]
pub struct ClassData {
    pub name: Atom,
    pub bases: SmallVec<[ClassId; 2]>,
    /// Linearized method resolution order, starting with the class itself.
    pub mro: Vec<ClassId>,
    pub arity: Arity,
    /// Set for built-in classes so the signature table can be consulted.
    pub builtin: Option<Builtin>,
}

/// Well-known class ids, filled in when the registry is created.
#[derive(Clone, Copy, Debug)]
pub struct BuiltinClasses {
    pub int_: ClassId,
    pub float_: ClassId,
    pub bool_: ClassId,
    pub str_: ClassId,
    pub bytes_: ClassId,
    pub none: ClassId,
    pub list: ClassId,
    pub tuple: ClassId,
    pub set: ClassId,
    pub frozenset: ClassId,
    pub dict: ClassId,
    pub range: ClassId,
    pub file: ClassId,
    pub generator: ClassId,
    pub base_exception: ClassId,
    pub exception: ClassId,
    pub stop_iteration: ClassId,
    pub value_error: ClassId,
    pub index_error: ClassId,
    pub key_error: ClassId,
    pub type_error: ClassId,
    pub os_error: ClassId,
    pub runtime_error: ClassId,
    pub zero_division_error: ClassId,
    pub assertion_error: ClassId,
}

/// Registry of every class in the compilation.
#[derive(Debug)]
pub struct ClassRegistry {
    classes: Vec<ClassData>,
    by_name: FxHashMap<Atom, ClassId>,
    pub builtins: BuiltinClasses,
}

impl ClassRegistry {
    /// Create a registry with the built-in classes installed.
    pub fn new(interner: &mut Interner) -> Self {
        let mut registry = ClassRegistry {
            classes: Vec::with_capacity(32),
            by_name: FxHashMap::default(),
            // Placeholder, replaced below once the built-ins exist.
            builtins: BuiltinClasses {
                int_: ClassId(0),
                float_: ClassId(0),
                bool_: ClassId(0),
                str_: ClassId(0),
                bytes_: ClassId(0),
                none: ClassId(0),
                list: ClassId(0),
                tuple: ClassId(0),
                set: ClassId(0),
                frozenset: ClassId(0),
                dict: ClassId(0),
                range: ClassId(0),
                file: ClassId(0),
                generator: ClassId(0),
                base_exception: ClassId(0),
                exception: ClassId(0),
                stop_iteration: ClassId(0),
                value_error: ClassId(0),
                index_error: ClassId(0),
                key_error: ClassId(0),
                type_error: ClassId(0),
                os_error: ClassId(0),
                runtime_error: ClassId(0),
                zero_division_error: ClassId(0),
                assertion_error: ClassId(0),
            },
        };

        let builtin = |registry: &mut Self,
                           interner: &mut Interner,
                           name: &str,
                           bases: &[ClassId],
                           arity: Arity,
                           tag: Builtin| {
            let atom = interner.intern(name);
            registry.register_tagged(atom, bases, arity, Some(tag))
        };

        let int_ = builtin(&mut registry, interner, "int", &[], Arity::Fixed(0), Builtin::Int);
        let float_ = builtin(&mut registry, interner, "float", &[], Arity::Fixed(0), Builtin::Float);
        // bool subclasses int, so integer arithmetic resolves on bools too.
        let bool_ = builtin(&mut registry, interner, "bool", &[int_], Arity::Fixed(0), Builtin::Bool);
        let str_ = builtin(&mut registry, interner, "str", &[], Arity::Fixed(0), Builtin::Str);
        let bytes_ = builtin(&mut registry, interner, "bytes", &[], Arity::Fixed(0), Builtin::Bytes);
        let none = builtin(&mut registry, interner, "NoneType", &[], Arity::Fixed(0), Builtin::NoneType);
        let list = builtin(&mut registry, interner, "list", &[], Arity::Fixed(1), Builtin::List);
        let tuple = builtin(&mut registry, interner, "tuple", &[], Arity::PerSite, Builtin::Tuple);
        let set = builtin(&mut registry, interner, "set", &[], Arity::Fixed(1), Builtin::Set);
        let frozenset = builtin(&mut registry, interner, "frozenset", &[], Arity::Fixed(1), Builtin::FrozenSet);
        let dict = builtin(&mut registry, interner, "dict", &[], Arity::Fixed(2), Builtin::Dict);
        let range = builtin(&mut registry, interner, "range", &[], Arity::Fixed(1), Builtin::Range);
        let file = builtin(&mut registry, interner, "file", &[], Arity::Fixed(0), Builtin::File);
        let generator = builtin(&mut registry, interner, "generator", &[], Arity::Fixed(1), Builtin::Generator);

        let base_exception = builtin(
            &mut registry, interner, "BaseException", &[], Arity::Fixed(0), Builtin::BaseException,
        );
        let exception = builtin(
            &mut registry, interner, "Exception", &[base_exception], Arity::Fixed(0), Builtin::Exception,
        );
        let exc = |registry: &mut Self, interner: &mut Interner, name: &str| {
            let atom = interner.intern(name);
            registry.register_tagged(atom, &[exception], Arity::Fixed(0), Some(Builtin::Exception))
        };
        let stop_iteration = exc(&mut registry, interner, "StopIteration");
        let value_error = exc(&mut registry, interner, "ValueError");
        let index_error = exc(&mut registry, interner, "IndexError");
        let key_error = exc(&mut registry, interner, "KeyError");
        let type_error = exc(&mut registry, interner, "TypeError");
        let os_error = exc(&mut registry, interner, "OSError");
        let runtime_error = exc(&mut registry, interner, "RuntimeError");
        let zero_division_error = exc(&mut registry, interner, "ZeroDivisionError");
        let assertion_error = exc(&mut registry, interner, "AssertionError");

        registry.builtins = BuiltinClasses {
            int_,
            float_,
            bool_,
            str_,
            bytes_,
            none,
            list,
            tuple,
            set,
            frozenset,
            dict,
            range,
            file,
            generator,
            base_exception,
            exception,
            stop_iteration,
            value_error,
            index_error,
            key_error,
            type_error,
            os_error,
            runtime_error,
            zero_division_error,
            assertion_error,
        };
        registry
    }

    /// Register a user-defined class.
    pub fn register(&mut self, name: Atom, bases: &[ClassId]) -> ClassId {
        self.register_tagged(name, bases, Arity::Fixed(0), None)
    }

    fn register_tagged(
        &mut self,
        name: Atom,
        bases: &[ClassId],
        arity: Arity,
        builtin: Option<Builtin>,
    ) -> ClassId {
        let id = ClassId(self.classes.len() as u32);
        let mro = self.linearize(id, bases);
        self.classes.push(ClassData {
            name,
            bases: bases.iter().copied().collect(),
            mro,
            arity,
            builtin,
        });
        self.by_name.insert(name, id);
        id
    }

    /// Depth-first, left-to-right, deduplicated linearization.
    fn linearize(&self, class: ClassId, bases: &[ClassId]) -> Vec<ClassId> {
        let mut mro = vec![class];
        for &base in bases {
            for &ancestor in &self.classes[base.index()].mro {
                if !mro.contains(&ancestor) {
                    mro.push(ancestor);
                }
            }
        }
        mro
    }

    #[inline]
    pub fn class(&self, id: ClassId) -> &ClassData {
        &self.classes[id.index()]
    }

    pub fn name<'a>(&self, interner: &'a Interner, id: ClassId) -> &'a str {
        interner.resolve(self.classes[id.index()].name)
    }

    pub fn lookup(&self, name: Atom) -> Option<ClassId> {
        self.by_name.get(&name).copied()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// `a` is `b` or inherits from `b`.
    pub fn is_subclass(&self, a: ClassId, b: ClassId) -> bool {
        a == b || self.classes[a.index()].mro.contains(&b)
    }

    pub fn is_numeric(&self, class: ClassId) -> bool {
        self.is_subclass(class, self.builtins.int_) || class == self.builtins.float_
    }

    /// Numeric widening: the widest numeric class among `classes`, or `None`
    /// if any of them is not numeric. Integers (and bools) promote to float
    /// when a float participates.
    pub fn widen_numeric(&self, classes: impl IntoIterator<Item = ClassId>) -> Option<ClassId> {
        let mut widest = self.builtins.int_;
        let mut any = false;
        for class in classes {
            if !self.is_numeric(class) {
                return None;
            }
            if class == self.builtins.float_ {
                widest = self.builtins.float_;
            }
            any = true;
        }
        any.then_some(widest)
    }

    /// Walk the MRO of `class`, starting at the class itself.
    pub fn mro(&self, class: ClassId) -> impl Iterator<Item = ClassId> + '_ {
        self.classes[class.index()].mro.iter().copied()
    }

    /// The topmost base of `class`: the first class in its MRO with no bases
    /// of its own. Call signatures abstract argument classes to their roots,
    /// so sibling subclasses share one instantiation.
    pub fn root(&self, class: ClassId) -> ClassId {
        self.mro(class)
            .find(|c| self.classes[c.index()].bases.is_empty())
            .unwrap_or(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (Interner, ClassRegistry) {
        let mut interner = Interner::new();
        let registry = ClassRegistry::new(&mut interner);
        (interner, registry)
    }

    #[test]
    fn bool_is_a_subclass_of_int() {
        let (_, reg) = registry();
        assert!(reg.is_subclass(reg.builtins.bool_, reg.builtins.int_));
        assert!(!reg.is_subclass(reg.builtins.int_, reg.builtins.bool_));
    }

    #[test]
    fn user_class_mro_is_depth_first_left_to_right() {
        let (mut interner, mut reg) = registry();
        let a = reg.register(interner.intern("A"), &[]);
        let b = reg.register(interner.intern("B"), &[a]);
        let c = reg.register(interner.intern("C"), &[a]);
        let d = reg.register(interner.intern("D"), &[b, c]);
        let mro: Vec<ClassId> = reg.mro(d).collect();
        assert_eq!(mro, vec![d, b, a, c]);
        assert!(reg.is_subclass(d, a));
        assert!(!reg.is_subclass(b, c));
    }

    #[test]
    fn widening_promotes_to_float() {
        let (_, reg) = registry();
        let b = reg.builtins;
        assert_eq!(reg.widen_numeric([b.int_, b.int_]), Some(b.int_));
        assert_eq!(reg.widen_numeric([b.int_, b.float_]), Some(b.float_));
        assert_eq!(reg.widen_numeric([b.bool_, b.int_]), Some(b.int_));
        assert_eq!(reg.widen_numeric([b.int_, b.str_]), None);
    }

    #[test]
    fn exceptions_inherit_from_base_exception() {
        let (_, reg) = registry();
        let b = reg.builtins;
        assert!(reg.is_subclass(b.value_error, b.exception));
        assert!(reg.is_subclass(b.value_error, b.base_exception));
        assert!(!reg.is_subclass(b.exception, b.value_error));
    }
}
