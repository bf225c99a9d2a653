//! Syntax tree nodes.
//!
//! Nodes live in a flat per-module [`AstArena`] and refer to each other by
//! [`NodeId`], so the tree is cycle-free and cheap to serialize. Statement
//! bodies are `Vec<NodeId>` in source order.

use molt_common::{Atom, Span};
use serde::{Deserialize, Serialize};

/// Index of a node in its module's [`AstArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Binary operators, spelled the way the builder resolves them: as dunder
/// method calls on the left operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitAnd,
    BitOr,
    BitXor,
}

impl BinaryOp {
    /// Name of the operator method.
    pub const fn dunder(self) -> &'static str {
        match self {
            BinaryOp::Add => "__add__",
            BinaryOp::Sub => "__sub__",
            BinaryOp::Mul => "__mul__",
            BinaryOp::Div => "__truediv__",
            BinaryOp::FloorDiv => "__floordiv__",
            BinaryOp::Mod => "__mod__",
            BinaryOp::Pow => "__pow__",
            BinaryOp::LShift => "__lshift__",
            BinaryOp::RShift => "__rshift__",
            BinaryOp::BitAnd => "__and__",
            BinaryOp::BitOr => "__or__",
            BinaryOp::BitXor => "__xor__",
        }
    }

    /// Name of the in-place variant used by augmented assignment.
    pub const fn inplace_dunder(self) -> &'static str {
        match self {
            BinaryOp::Add => "__iadd__",
            BinaryOp::Sub => "__isub__",
            BinaryOp::Mul => "__imul__",
            BinaryOp::Div => "__itruediv__",
            BinaryOp::FloorDiv => "__ifloordiv__",
            BinaryOp::Mod => "__imod__",
            BinaryOp::Pow => "__ipow__",
            BinaryOp::LShift => "__ilshift__",
            BinaryOp::RShift => "__irshift__",
            BinaryOp::BitAnd => "__iand__",
            BinaryOp::BitOr => "__ior__",
            BinaryOp::BitXor => "__ixor__",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Pos,
    Invert,
    Not,
}

impl UnaryOp {
    pub const fn dunder(self) -> Option<&'static str> {
        match self {
            UnaryOp::Neg => Some("__neg__"),
            UnaryOp::Pos => Some("__pos__"),
            UnaryOp::Invert => Some("__invert__"),
            // `not` always yields bool, no dispatch.
            UnaryOp::Not => None,
        }
    }
}

/// Comparison operators. Comparisons always type as bool; membership tests
/// additionally constrain the container operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoolOpKind {
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompKind {
    List,
    Set,
}

/// A formal parameter of a function definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: Atom,
    /// Default value expression, evaluated in the enclosing scope.
    pub default: Option<NodeId>,
    pub span: Span,
}

/// One `except` clause of a `try` statement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExceptHandler {
    /// Exception class name; `None` for a bare `except:`.
    pub class: Option<Atom>,
    /// Binding name (`except E as e`).
    pub name: Option<Atom>,
    pub body: Vec<NodeId>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    // ---- expressions ----
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(Atom),
    Bytes(Atom),
    NoneLit,
    Name(Atom),
    Attribute {
        value: NodeId,
        attr: Atom,
    },
    Subscript {
        value: NodeId,
        index: NodeId,
    },
    Call {
        func: NodeId,
        args: Vec<NodeId>,
    },
    Unary {
        op: UnaryOp,
        operand: NodeId,
    },
    Binary {
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    },
    BoolOp {
        op: BoolOpKind,
        values: Vec<NodeId>,
    },
    Compare {
        op: CompareOp,
        left: NodeId,
        right: NodeId,
    },
    Conditional {
        test: NodeId,
        then: NodeId,
        orelse: NodeId,
    },
    ListLit(Vec<NodeId>),
    TupleLit(Vec<NodeId>),
    SetLit(Vec<NodeId>),
    DictLit {
        keys: Vec<NodeId>,
        values: Vec<NodeId>,
    },
    Comp {
        kind: CompKind,
        elem: NodeId,
        target: Atom,
        iter: NodeId,
        conds: Vec<NodeId>,
    },
    DictComp {
        key: NodeId,
        value: NodeId,
        target: Atom,
        iter: NodeId,
        conds: Vec<NodeId>,
    },
    Yield(Option<NodeId>),

    // ---- statements ----
    ExprStmt(NodeId),
    Assign {
        target: NodeId,
        value: NodeId,
    },
    AugAssign {
        target: NodeId,
        op: BinaryOp,
        value: NodeId,
    },
    If {
        test: NodeId,
        body: Vec<NodeId>,
        orelse: Vec<NodeId>,
    },
    While {
        test: NodeId,
        body: Vec<NodeId>,
        orelse: Vec<NodeId>,
    },
    For {
        target: NodeId,
        iter: NodeId,
        body: Vec<NodeId>,
        orelse: Vec<NodeId>,
    },
    Return(Option<NodeId>),
    FunctionDef {
        name: Atom,
        params: Vec<Param>,
        body: Vec<NodeId>,
    },
    ClassDef {
        name: Atom,
        bases: Vec<Atom>,
        body: Vec<NodeId>,
    },
    Import {
        module: Atom,
    },
    Assert {
        test: NodeId,
        msg: Option<NodeId>,
    },
    Raise {
        exc: Option<NodeId>,
    },
    Try {
        body: Vec<NodeId>,
        handlers: Vec<ExceptHandler>,
        orelse: Vec<NodeId>,
        finalbody: Vec<NodeId>,
    },
    Pass,
    Break,
    Continue,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

/// Flat node storage for one module.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AstArena {
    nodes: Vec<Node>,
}

impl AstArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { kind, span });
        id
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    #[inline]
    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
