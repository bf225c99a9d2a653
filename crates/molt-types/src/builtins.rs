//! Built-in class and function signatures.
//!
//! The graph builder models operations on built-in receivers with this
//! table instead of parsed stub sources: each method signature names the
//! result type and the element-slot effects of the call (which arguments
//! flow into which element slots of the receiver's allocation site).
//!
//! Signatures are expressed in terms of the lattice, never as target-language
//! types; the emitter makes that mapping later.

/// Tag identifying a built-in class, used to key this table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    Int,
    Float,
    Bool,
    Str,
    Bytes,
    NoneType,
    List,
    Tuple,
    Set,
    FrozenSet,
    Dict,
    Range,
    File,
    Generator,
    BaseException,
    Exception,
}

/// Result type of a built-in method call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SigResult {
    None_,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    /// The receiver's own concrete type (site-preserving).
    Receiver,
    /// Element slot `k` of the receiver's allocation site.
    Elem(u8),
    /// A fresh list whose element type is slot `k` of the receiver's site.
    ListOfElem(u8),
    /// A fresh list of a scalar built-in class.
    ListOf(Builtin),
    /// Numeric widening over the receiver and argument classes.
    NumericWiden,
}

/// A data-flow effect of a built-in method call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Argument `arg` flows into element slot `slot` of the receiver site.
    ArgToElem { arg: u8, slot: u8 },
    /// Element `arg_slot` of container argument `arg` flows into `slot`.
    ArgElemToElem { arg: u8, arg_slot: u8, slot: u8 },
    /// Argument `arg` flows into the call result (e.g. `dict.get` defaults).
    ArgToResult { arg: u8 },
}

/// Signature of one built-in method.
#[derive(Clone, Copy, Debug)]
pub struct MethodSig {
    pub result: SigResult,
    pub effects: &'static [Effect],
}

const fn sig(result: SigResult) -> MethodSig {
    MethodSig {
        result,
        effects: &[],
    }
}

const fn sig_fx(result: SigResult, effects: &'static [Effect]) -> MethodSig {
    MethodSig { result, effects }
}

const STORE0: &[Effect] = &[Effect::ArgToElem { arg: 0, slot: 0 }];
const INSERT_VALUE: &[Effect] = &[Effect::ArgToElem { arg: 1, slot: 0 }];
const MERGE0: &[Effect] = &[Effect::ArgElemToElem {
    arg: 0,
    arg_slot: 0,
    slot: 0,
}];
const DICT_STORE: &[Effect] = &[
    Effect::ArgToElem { arg: 0, slot: 0 },
    Effect::ArgToElem { arg: 1, slot: 1 },
];
const DICT_MERGE: &[Effect] = &[
    Effect::ArgElemToElem {
        arg: 0,
        arg_slot: 0,
        slot: 0,
    },
    Effect::ArgElemToElem {
        arg: 0,
        arg_slot: 1,
        slot: 1,
    },
];
const GET_DEFAULT: &[Effect] = &[Effect::ArgToResult { arg: 1 }];
const SETDEFAULT: &[Effect] = &[
    Effect::ArgToElem { arg: 0, slot: 0 },
    Effect::ArgToElem { arg: 1, slot: 1 },
    Effect::ArgToResult { arg: 1 },
];

/// Look up the signature of `name` on built-in class `builtin`.
///
/// Returns `None` for methods the subset does not model; the caller reports
/// that as an inference failure at the call site.
pub fn method_sig(builtin: Builtin, name: &str) -> Option<MethodSig> {
    use SigResult::*;
    let s = match (builtin, name) {
        // --- numeric scalars -------------------------------------------------
        (Builtin::Int | Builtin::Bool | Builtin::Float, "__add__" | "__sub__" | "__mul__"
            | "__floordiv__" | "__mod__" | "__pow__" | "__neg__" | "__pos__" | "__abs__"
            | "__iadd__" | "__isub__" | "__imul__" | "__ifloordiv__" | "__imod__") => {
            sig(NumericWiden)
        }
        (Builtin::Int | Builtin::Bool | Builtin::Float, "__truediv__" | "__itruediv__") => {
            sig(Float)
        }
        (Builtin::Int | Builtin::Bool, "__and__" | "__or__" | "__xor__" | "__lshift__"
            | "__rshift__" | "__invert__" | "__iand__" | "__ior__" | "__ixor__") => sig(Int),

        // --- str -------------------------------------------------------------
        (Builtin::Str, "__add__" | "__mul__" | "__mod__" | "__getitem__" | "__iadd__") => sig(Str),
        (Builtin::Str, "upper" | "lower" | "strip" | "lstrip" | "rstrip" | "title"
            | "capitalize" | "replace" | "join" | "zfill" | "ljust" | "rjust") => sig(Str),
        (Builtin::Str, "split" | "rsplit" | "splitlines") => sig(ListOf(Builtin::Str)),
        (Builtin::Str, "startswith" | "endswith" | "isdigit" | "isalpha" | "isspace"
            | "islower" | "isupper" | "__contains__") => sig(Bool),
        (Builtin::Str, "find" | "rfind" | "index" | "count") => sig(Int),
        (Builtin::Str, "encode") => sig(Bytes),

        // --- bytes -----------------------------------------------------------
        (Builtin::Bytes, "__add__" | "__mul__" | "__iadd__") => sig(Bytes),
        (Builtin::Bytes, "__getitem__") => sig(Int),
        (Builtin::Bytes, "decode") => sig(Str),
        (Builtin::Bytes, "split") => sig(ListOf(Builtin::Bytes)),
        (Builtin::Bytes, "__contains__") => sig(Bool),

        // --- list ------------------------------------------------------------
        (Builtin::List, "append") => sig_fx(None_, STORE0),
        (Builtin::List, "insert") => sig_fx(None_, INSERT_VALUE),
        (Builtin::List, "extend" | "__iadd__") => sig_fx(Receiver, MERGE0),
        (Builtin::List, "__add__") => sig_fx(Receiver, MERGE0),
        (Builtin::List, "__mul__" | "__imul__" | "copy") => sig(Receiver),
        (Builtin::List, "pop" | "__getitem__") => sig(Elem(0)),
        (Builtin::List, "__setitem__") => sig_fx(None_, INSERT_VALUE),
        (Builtin::List, "remove" | "sort" | "reverse" | "clear") => sig(None_),
        (Builtin::List, "count" | "index") => sig(Int),
        (Builtin::List, "__contains__") => sig(Bool),

        // --- set / frozenset -------------------------------------------------
        (Builtin::Set, "add") => sig_fx(None_, STORE0),
        (Builtin::Set, "update" | "__ior__") => sig_fx(Receiver, MERGE0),
        (Builtin::Set | Builtin::FrozenSet, "union" | "intersection" | "difference"
            | "symmetric_difference" | "__or__" | "__and__" | "__sub__" | "__xor__") => {
            sig_fx(Receiver, MERGE0)
        }
        (Builtin::Set, "pop") => sig(Elem(0)),
        (Builtin::Set, "remove" | "discard" | "clear") => sig(None_),
        (Builtin::Set | Builtin::FrozenSet, "__contains__") => sig(Bool),
        (Builtin::Set | Builtin::FrozenSet, "copy") => sig(Receiver),

        // --- dict ------------------------------------------------------------
        (Builtin::Dict, "__getitem__" | "pop") => sig(Elem(1)),
        (Builtin::Dict, "__setitem__") => sig_fx(None_, DICT_STORE),
        (Builtin::Dict, "get") => sig_fx(Elem(1), GET_DEFAULT),
        (Builtin::Dict, "setdefault") => sig_fx(Elem(1), SETDEFAULT),
        (Builtin::Dict, "keys") => sig(ListOfElem(0)),
        (Builtin::Dict, "values") => sig(ListOfElem(1)),
        (Builtin::Dict, "update") => sig_fx(None_, DICT_MERGE),
        (Builtin::Dict, "__contains__") => sig(Bool),
        (Builtin::Dict, "clear") => sig(None_),
        (Builtin::Dict, "copy") => sig(Receiver),

        // --- range / generator ----------------------------------------------
        (Builtin::Range, "__getitem__") => sig(Elem(0)),
        (Builtin::Generator, "__next__") => sig(Elem(0)),

        // --- tuple -----------------------------------------------------------
        // Subscripts on tuples are slot-directed and handled by the builder;
        // only the slot-free operations appear here.
        (Builtin::Tuple, "__contains__") => sig(Bool),
        (Builtin::Tuple, "count" | "index") => sig(Int),

        // --- file ------------------------------------------------------------
        (Builtin::File, "read" | "readline") => sig(Str),
        (Builtin::File, "readlines") => sig(ListOf(Builtin::Str)),
        (Builtin::File, "write" | "writelines" | "close" | "flush" | "seek") => sig(None_),
        (Builtin::File, "tell") => sig(Int),

        _ => return None,
    };
    Some(s)
}

/// Built-in free functions the builder recognizes by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FreeFunc {
    Len,
    Range,
    Print,
    Open,
    Input,
    Str_,
    Repr,
    Int_,
    Float_,
    Bool_,
    Chr,
    Ord,
    Abs,
    Min,
    Max,
    Sum,
    Sorted,
    List_,
    Set_,
    Dict_,
    IsInstance,
}

pub fn free_func(name: &str) -> Option<FreeFunc> {
    let f = match name {
        "len" => FreeFunc::Len,
        "range" => FreeFunc::Range,
        "print" => FreeFunc::Print,
        "open" => FreeFunc::Open,
        "input" => FreeFunc::Input,
        "str" => FreeFunc::Str_,
        "repr" => FreeFunc::Repr,
        "int" => FreeFunc::Int_,
        "float" => FreeFunc::Float_,
        "bool" => FreeFunc::Bool_,
        "chr" => FreeFunc::Chr,
        "ord" => FreeFunc::Ord,
        "abs" => FreeFunc::Abs,
        "min" => FreeFunc::Min,
        "max" => FreeFunc::Max,
        "sum" => FreeFunc::Sum,
        "sorted" => FreeFunc::Sorted,
        "list" => FreeFunc::List_,
        "set" => FreeFunc::Set_,
        "dict" => FreeFunc::Dict_,
        "isinstance" => FreeFunc::IsInstance,
        _ => return None,
    };
    Some(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_append_stores_into_slot_zero() {
        let s = method_sig(Builtin::List, "append").unwrap();
        assert_eq!(s.result, SigResult::None_);
        assert_eq!(s.effects, &[Effect::ArgToElem { arg: 0, slot: 0 }]);
    }

    #[test]
    fn dict_setitem_stores_key_and_value() {
        let s = method_sig(Builtin::Dict, "__setitem__").unwrap();
        assert_eq!(s.effects.len(), 2);
        assert_eq!(s.effects[1], Effect::ArgToElem { arg: 1, slot: 1 });
    }

    #[test]
    fn unknown_methods_are_rejected() {
        assert!(method_sig(Builtin::List, "frobnicate").is_none());
        assert!(method_sig(Builtin::Int, "append").is_none());
    }

    #[test]
    fn int_division_widens_to_float() {
        let s = method_sig(Builtin::Int, "__truediv__").unwrap();
        assert_eq!(s.result, SigResult::Float);
        let s = method_sig(Builtin::Int, "__add__").unwrap();
        assert_eq!(s.result, SigResult::NumericWiden);
    }
}
