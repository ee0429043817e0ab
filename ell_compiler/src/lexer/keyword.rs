use std::fmt;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Keyword {
    Fn,
    Let,
    Const,
    Type,
    Interface,
    Struct,
    Enum,
    If,
    Else,
    For,
    Return,
    Break,
    Continue,
    As,
    Is,
    Pub,
    Import,
    Impl,
}

impl Keyword {
    pub fn from_str(s: impl AsRef<str>) -> Option<Self> {
        match s.as_ref() {
            "fn" => Some(Self::Fn),
            "let" => Some(Self::Let),
            "const" => Some(Self::Const),
            "type" => Some(Self::Type),
            "interface" => Some(Self::Interface),
            "struct" => Some(Self::Struct),
            "enum" => Some(Self::Enum),
            "if" => Some(Self::If),
            "else" => Some(Self::Else),
            "for" => Some(Self::For),
            "return" => Some(Self::Return),
            "break" => Some(Self::Break),
            "continue" => Some(Self::Continue),
            "as" => Some(Self::As),
            "is" => Some(Self::Is),
            "pub" => Some(Self::Pub),
            "import" => Some(Self::Import),
            "impl" => Some(Self::Impl),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Keyword::Fn => "fn",
            Keyword::Let => "let",
            Keyword::Const => "const",
            Keyword::Type => "type",
            Keyword::Interface => "interface",
            Keyword::Struct => "struct",
            Keyword::Enum => "enum",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::For => "for",
            Keyword::Return => "return",
            Keyword::Break => "break",
            Keyword::Continue => "continue",
            Keyword::As => "as",
            Keyword::Is => "is",
            Keyword::Pub => "pub",
            Keyword::Import => "import",
            Keyword::Impl => "impl",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Built-in literal words.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Constant {
    True,
    False,
    Null,
    SelfValue,
}

impl Constant {
    pub fn from_str(s: impl AsRef<str>) -> Option<Self> {
        match s.as_ref() {
            "true" => Some(Self::True),
            "false" => Some(Self::False),
            "null" => Some(Self::Null),
            "self" => Some(Self::SelfValue),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Constant::True => "true",
            Constant::False => "false",
            Constant::Null => "null",
            Constant::SelfValue => "self",
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
