//! The syntax tree of a single source file.
//!
//! `Display` on every node is a canonical unparser: printing a tree and
//! parsing the result gives back the same tree, up to spans. Binary,
//! unary and assignment expressions are always parenthesized.

use std::fmt;

use crate::{errors::Span, lexer::token::escape};

#[derive(Clone, Debug, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }

    /// Names with a leading `_` are private to their module.
    pub fn is_private(&self) -> bool {
        self.name.starts_with('_')
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Writes `items` separated by `, `.
fn comma_separated<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }

        write!(f, "{}", item)?;
    }

    Ok(())
}

#[derive(Clone, Debug, PartialEq)]
pub struct Script {
    pub statements: Vec<Statement>,
    pub span: Span,
}

impl Script {
    pub const fn new() -> Self {
        Self {
            statements: Vec::new(),
            span: Span::empty(),
        }
    }
}

impl Default for Script {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for statement in &self.statements {
            writeln!(f, "{}", statement)?;
        }

        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{{")?;

        for statement in &self.statements {
            writeln!(f, "{}", statement)?;
        }

        write!(f, "}}")
    }
}

/// `import "path" as alias`
#[derive(Clone, Debug, PartialEq)]
pub struct Import {
    pub path: String,
    pub path_span: Span,
    pub alias: Ident,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    /// Parameters of function types may be left unnamed.
    pub name: Option<Ident>,
    pub kind: KindExpr,
    /// `..name: [..]T`, only allowed last.
    pub rest: bool,
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rest {
            write!(f, "..")?;
        }

        match &self.name {
            Some(name) => write!(f, "{}: {}", name, self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionSignature {
    pub params: Vec<Param>,
    /// `None` means the function returns nothing.
    pub ret: Option<Box<KindExpr>>,
    pub span: Span,
}

impl FunctionSignature {
    pub fn has_rest(&self) -> bool {
        self.params.last().map_or(false, |param| param.rest)
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        comma_separated(f, &self.params)?;
        write!(f, ")")?;

        match &self.ret {
            Some(ret) => write!(f, " -> {}", ret),
            None => Ok(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDecl {
    pub public: bool,
    /// The named type this function is a method of, for `fn Target name()`.
    pub target: Option<Ident>,
    pub name: Ident,
    pub signature: FunctionSignature,
    pub body: Block,
}

impl fmt::Display for FunctionDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.public {
            write!(f, "pub ")?;
        }

        write!(f, "fn ")?;

        if let Some(target) = &self.target {
            write!(f, "{} ", target)?;
        }

        write!(f, "{}{} {}", self.name, self.signature, self.body)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct VariableDecl {
    pub public: bool,
    pub constant: bool,
    pub name: Ident,
    pub kind: Option<KindExpr>,
    pub init: Option<Expression>,
}

impl fmt::Display for VariableDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.public {
            write!(f, "pub ")?;
        }

        let keyword = if self.constant { "const" } else { "let" };
        write!(f, "{} {}", keyword, self.name)?;

        if let Some(kind) = &self.kind {
            write!(f, ": {}", kind)?;
        }

        if let Some(init) = &self.init {
            write!(f, " = {}", init)?;
        }

        Ok(())
    }
}

/// `name: kind` inside a struct or interface body.
#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    pub name: Ident,
    pub kind: KindExpr,
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.kind)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeBody {
    /// `type T = K`
    Alias(KindExpr),
    /// `type E { A, B }`
    Enum(Vec<Ident>),
    /// `type S: I extends A, B { x: K }`
    Struct {
        implements: Option<KindExpr>,
        extends: Vec<KindExpr>,
        props: Vec<Property>,
    },
    /// `interface I extends J { f(x: K) -> K }`
    Interface {
        extends: Vec<KindExpr>,
        props: Vec<Property>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeDecl {
    pub public: bool,
    pub name: Ident,
    pub body: TypeBody,
}

impl fmt::Display for TypeDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.public {
            write!(f, "pub ")?;
        }

        match &self.body {
            TypeBody::Alias(kind) => write!(f, "type {} = {}", self.name, kind),

            TypeBody::Enum(choices) => {
                write!(f, "type {} {{", self.name)?;
                comma_separated(f, choices)?;
                write!(f, "}}")
            },

            TypeBody::Struct {
                implements,
                extends,
                props,
            } => {
                write!(f, "type {}", self.name)?;

                if let Some(implements) = implements {
                    write!(f, ": {}", implements)?;
                }

                if !extends.is_empty() {
                    write!(f, " extends ")?;
                    comma_separated(f, extends)?;
                }

                write!(f, " {{")?;
                comma_separated(f, props)?;
                write!(f, "}}")
            },

            TypeBody::Interface { extends, props } => {
                write!(f, "interface {}", self.name)?;

                if !extends.is_empty() {
                    write!(f, " extends ")?;
                    comma_separated(f, extends)?;
                }

                write!(f, " {{")?;
                comma_separated(f, props)?;
                write!(f, "}}")
            },
        }
    }
}

/// `impl Target { fn m() {} }`
#[derive(Clone, Debug, PartialEq)]
pub struct ImplBlock {
    pub target: Ident,
    pub methods: Vec<FunctionDecl>,
}

impl fmt::Display for ImplBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "impl {} {{", self.target)?;

        for method in &self.methods {
            writeln!(f, "{}", method)?;
        }

        write!(f, "}}")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct IfStatement {
    pub cond: Expression,
    pub then: Block,
    /// Either a block or another `if`.
    pub otherwise: Option<Box<Statement>>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ForKind {
    /// `for { ... }`
    Infinite,
    /// `for cond { ... }`
    While(Expression),
    /// `for init; cond; update { ... }`
    CStyle {
        init: Option<Box<Statement>>,
        cond: Option<Expression>,
        update: Option<Box<Statement>>,
    },
    /// `for element, index : target { ... }`
    Iterate {
        element: Ident,
        index: Option<Ident>,
        target: Expression,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ForStatement {
    pub label: Option<Ident>,
    pub kind: ForKind,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StatementKind {
    Import(Import),
    Function(FunctionDecl),
    Variable(VariableDecl),
    Type(TypeDecl),
    Impl(ImplBlock),
    Block(Block),
    Return(Option<Expression>),
    If(IfStatement),
    For(ForStatement),
    Break(Option<Ident>),
    Continue(Option<Ident>),
    Expression(Expression),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
}

impl Statement {
    pub const fn new(kind: StatementKind, span: Span) -> Self {
        Self { kind, span }
    }
}

impl From<Expression> for Statement {
    fn from(expression: Expression) -> Self {
        let span = expression.span;

        Self {
            kind: StatementKind::Expression(expression),
            span,
        }
    }
}

/// Prints an expression sitting right before the body of an `if` or `for`,
/// where a struct literal would be mistaken for the body.
struct HeaderExpr<'a>(&'a Expression);

impl fmt::Display for HeaderExpr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.leads_with_struct_literal() {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Prints the init or update statement of a C-style `for`, guarding its
/// expressions the same way.
struct HeaderStatement<'a>(&'a Statement);

impl fmt::Display for HeaderStatement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.kind {
            StatementKind::Variable(variable) => {
                let keyword = if variable.constant { "const" } else { "let" };
                write!(f, "{} {}", keyword, variable.name)?;

                if let Some(kind) = &variable.kind {
                    write!(f, ": {}", kind)?;
                }

                match &variable.init {
                    Some(init) => write!(f, " = {}", HeaderExpr(init)),
                    None => Ok(()),
                }
            },

            StatementKind::Expression(Expression {
                kind: ExpressionKind::Assign(lhs, rhs),
                ..
            }) => write!(f, "{} = {}", HeaderExpr(lhs), HeaderExpr(rhs)),

            StatementKind::Expression(expr) => write!(f, "{}", HeaderExpr(expr)),
            _ => write!(f, "{}", self.0),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StatementKind::Import(import) => {
                write!(f, "import \"{}\" as {}", escape(&import.path, '"'), import.alias)
            },

            StatementKind::Function(function) => write!(f, "{}", function),
            StatementKind::Variable(variable) => write!(f, "{}", variable),
            StatementKind::Type(decl) => write!(f, "{}", decl),
            StatementKind::Impl(block) => write!(f, "{}", block),
            StatementKind::Block(block) => write!(f, "{}", block),
            StatementKind::Return(None) => write!(f, "return"),
            StatementKind::Return(Some(expr)) => write!(f, "return {}", expr),

            StatementKind::If(IfStatement {
                cond,
                then,
                otherwise,
            }) => {
                write!(f, "if {} {}", HeaderExpr(cond), then)?;

                match otherwise {
                    Some(otherwise) => write!(f, " else {}", otherwise),
                    None => Ok(()),
                }
            },

            StatementKind::For(ForStatement { label, kind, body }) => {
                if let Some(label) = label {
                    write!(f, "{}: ", label)?;
                }

                match kind {
                    ForKind::Infinite => write!(f, "for {}", body),
                    ForKind::While(cond) => write!(f, "for {} {}", HeaderExpr(cond), body),

                    ForKind::CStyle { init, cond, update } => {
                        write!(f, "for ")?;

                        if let Some(init) = init {
                            write!(f, "{}", HeaderStatement(init))?;
                        }

                        write!(f, "; ")?;

                        if let Some(cond) = cond {
                            write!(f, "{}", HeaderExpr(cond))?;
                        }

                        write!(f, "; ")?;

                        if let Some(update) = update {
                            write!(f, "{} ", HeaderStatement(update))?;
                        }

                        write!(f, "{}", body)
                    },

                    ForKind::Iterate {
                        element,
                        index,
                        target,
                    } => {
                        write!(f, "for {}", element)?;

                        if let Some(index) = index {
                            write!(f, ", {}", index)?;
                        }

                        write!(f, " : {} {}", HeaderExpr(target), body)
                    },
                }
            },

            StatementKind::Break(None) => write!(f, "break"),
            StatementKind::Break(Some(label)) => write!(f, "break {}", label),
            StatementKind::Continue(None) => write!(f, "continue"),
            StatementKind::Continue(Some(label)) => write!(f, "continue {}", label),

            StatementKind::Expression(Expression {
                kind: ExpressionKind::Assign(lhs, rhs),
                ..
            }) => write!(f, "{} = {}", lhs, rhs),

            StatementKind::Expression(expr) => {
                let text = expr.to_string();

                // These would start a block or a function declaration
                if text.starts_with('{') || text.starts_with("fn") {
                    write!(f, "({})", text)
                } else {
                    write!(f, "{}", text)
                }
            },
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    BitAnd,
    BitXor,
    BitOr,
    BoolAnd,
    BoolOr,
}

impl BinaryOperator {
    pub const fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitXor => "^",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BoolAnd => "&&",
            BinaryOperator::BoolOr => "||",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum UnaryOperator {
    /// `!x`
    Not,
    /// `~x`
    BitNot,
    /// `-x`
    Negative,
    /// `+x`
    Positive,
    /// `&x`
    AddressOf,
    /// `*x`
    Deref,
    /// `++x`
    PreIncrement,
    /// `--x`
    PreDecrement,
    /// `x++`
    PostIncrement,
    /// `x--`
    PostDecrement,
}

impl UnaryOperator {
    pub const fn as_str(&self) -> &'static str {
        match self {
            UnaryOperator::Not => "!",
            UnaryOperator::BitNot => "~",
            UnaryOperator::Negative => "-",
            UnaryOperator::Positive => "+",
            UnaryOperator::AddressOf => "&",
            UnaryOperator::Deref => "*",
            UnaryOperator::PreIncrement | UnaryOperator::PostIncrement => "++",
            UnaryOperator::PreDecrement | UnaryOperator::PostDecrement => "--",
        }
    }

    pub const fn is_postfix(&self) -> bool {
        matches!(self, UnaryOperator::PostIncrement | UnaryOperator::PostDecrement)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Member {
    /// `a.b`
    Named(Ident),
    /// `a[b]`
    Computed(Box<Expression>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldInit {
    pub name: Ident,
    pub value: Expression,
}

impl fmt::Display for FieldInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExpressionKind {
    Call(Box<Expression>, Vec<Expression>),
    Member(Box<Expression>, Member),
    Binary(Box<Expression>, BinaryOperator, Box<Expression>),
    Unary(UnaryOperator, Box<Expression>),
    Assign(Box<Expression>, Box<Expression>),
    Function(FunctionSignature, Block),
    /// `Name{ a: 1 }`, or `{ a: 1 }` when the kind comes from context.
    Struct(Option<Ident>, Vec<FieldInit>),
    Array(Vec<Expression>),
    Identifier(String),
    Number(f64),
    Bool(bool),
    Null,
    SelfValue,
    String { value: String, raw: bool },
    Char(char),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub span: Span,
}

impl Expression {
    pub const fn new(kind: ExpressionKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns `true` if printing this expression starts with a struct
    /// literal that isn't wrapped in parentheses.
    pub fn leads_with_struct_literal(&self) -> bool {
        match &self.kind {
            ExpressionKind::Struct(..) => true,
            ExpressionKind::Call(callee, _) => callee.leads_with_struct_literal(),
            ExpressionKind::Member(object, _) => object.leads_with_struct_literal(),
            _ => false,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExpressionKind::Call(callee, args) => {
                write!(f, "{}(", callee)?;
                comma_separated(f, args)?;
                write!(f, ")")
            },

            ExpressionKind::Member(object, Member::Named(name)) => write!(f, "{}.{}", object, name),
            ExpressionKind::Member(object, Member::Computed(index)) => {
                write!(f, "{}[{}]", object, index)
            },

            ExpressionKind::Binary(lhs, op, rhs) => write!(f, "({} {} {})", lhs, op, rhs),

            ExpressionKind::Unary(op, expr) if op.is_postfix() => {
                write!(f, "({}{})", expr, op.as_str())
            },

            ExpressionKind::Unary(op, expr) => write!(f, "({}{})", op.as_str(), expr),
            ExpressionKind::Assign(lhs, rhs) => write!(f, "({} = {})", lhs, rhs),
            ExpressionKind::Function(signature, body) => write!(f, "fn{} {}", signature, body),

            ExpressionKind::Struct(name, fields) => {
                if let Some(name) = name {
                    write!(f, "{}", name)?;
                }

                write!(f, "{{")?;
                comma_separated(f, fields)?;
                write!(f, "}}")
            },

            ExpressionKind::Array(elements) => {
                write!(f, "[")?;
                comma_separated(f, elements)?;
                write!(f, "]")
            },

            ExpressionKind::Identifier(name) => write!(f, "{}", name),
            ExpressionKind::Number(n) => write!(f, "{}", n),
            ExpressionKind::Bool(b) => write!(f, "{}", b),
            ExpressionKind::Null => write!(f, "null"),
            ExpressionKind::SelfValue => write!(f, "self"),
            ExpressionKind::String { value, raw: true } => write!(f, "\"\"\"{}\"\"\"", value),
            ExpressionKind::String { value, raw: false } => {
                write!(f, "\"{}\"", escape(value, '"'))
            },
            ExpressionKind::Char(c) => write!(f, "'{}'", escape(&c.to_string(), '\'')),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PrimitiveKind {
    Number,
    Byte,
    Char,
    String,
    Bool,
    Any,
}

impl PrimitiveKind {
    pub fn from_str(s: impl AsRef<str>) -> Option<Self> {
        match s.as_ref() {
            "number" => Some(Self::Number),
            "byte" => Some(Self::Byte),
            "char" => Some(Self::Char),
            "string" => Some(Self::String),
            "bool" => Some(Self::Bool),
            "any" => Some(Self::Any),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::Number => "number",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Char => "char",
            PrimitiveKind::String => "string",
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Any => "any",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ArrayLength {
    /// `[N]T`
    Fixed(usize),
    /// `[..]T`
    Vector,
    /// `[]T`, taken from the initializer
    Inferred,
}

#[derive(Clone, Debug, PartialEq)]
pub enum KindExprKind {
    Primitive(PrimitiveKind),
    SelfKind,
    Array(Box<KindExpr>, ArrayLength),
    Identifier(String),
    /// `module.Kind`, possibly through several modules
    Member(Vec<Ident>),
    Function(FunctionSignature),
    Struct {
        extends: Vec<KindExpr>,
        props: Vec<Property>,
    },
}

/// Type syntax.
#[derive(Clone, Debug, PartialEq)]
pub struct KindExpr {
    pub kind: KindExprKind,
    pub span: Span,
}

impl KindExpr {
    pub const fn new(kind: KindExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

impl fmt::Display for KindExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            KindExprKind::Primitive(primitive) => write!(f, "{}", primitive.as_str()),
            KindExprKind::SelfKind => write!(f, "self"),
            KindExprKind::Array(element, ArrayLength::Fixed(n)) => write!(f, "[{}]{}", n, element),
            KindExprKind::Array(element, ArrayLength::Vector) => write!(f, "[..]{}", element),
            KindExprKind::Array(element, ArrayLength::Inferred) => write!(f, "[]{}", element),
            KindExprKind::Identifier(name) => write!(f, "{}", name),

            KindExprKind::Member(path) => {
                for (idx, segment) in path.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ".")?;
                    }

                    write!(f, "{}", segment)?;
                }

                Ok(())
            },

            KindExprKind::Function(signature) => write!(f, "fn{}", signature),

            KindExprKind::Struct { extends, props } => {
                write!(f, "struct")?;

                if !extends.is_empty() {
                    write!(f, "<-")?;
                    comma_separated(f, extends)?;
                }

                write!(f, " {{")?;
                comma_separated(f, props)?;
                write!(f, "}}")
            },
        }
    }
}
