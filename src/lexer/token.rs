use crate::ast::Literal;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    ty: TokenType,
    lexeme: String,
    literal: Option<Literal>,
    line: usize,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?} '{}' (line {})", self.ty, self.lexeme, self.line)
    }
}

impl Token {
    pub fn new<S: Into<String>>(ty: TokenType, lexeme: S, literal: Option<Literal>, line: usize) -> Self {
        Self {
            ty,
            lexeme: lexeme.into(),
            literal,
            line,
        }
    }

    pub fn is(&self, ty: TokenType) -> bool {
        self.ty == ty
    }

    pub fn is_one_of(&self, ty: &[TokenType]) -> bool {
        ty.contains(&self.ty)
    }

    pub fn token_type(&self) -> TokenType {
        self.ty
    }

    pub fn lexeme(&self) -> &str {
        &self.lexeme
    }

    pub fn literal(&self) -> Option<&Literal> {
        self.literal.as_ref()
    }

    pub fn line(&self) -> usize {
        self.line
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TokenType {
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,

    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    Identifier,
    String,
    Number,

    And,
    Class,
    Else,
    False,
    Fun,
    For,
    If,
    Include,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    Eof,
}

impl TokenType {
    pub fn keyword(lexeme: &str) -> Option<Self> {
        match lexeme {
            "and" => Some(TokenType::And),
            "class" => Some(TokenType::Class),
            "else" => Some(TokenType::Else),
            "false" => Some(TokenType::False),
            "for" => Some(TokenType::For),
            "fun" => Some(TokenType::Fun),
            "if" => Some(TokenType::If),
            "include" => Some(TokenType::Include),
            "nil" => Some(TokenType::Nil),
            "or" => Some(TokenType::Or),
            "print" => Some(TokenType::Print),
            "return" => Some(TokenType::Return),
            "super" => Some(TokenType::Super),
            "this" => Some(TokenType::This),
            "true" => Some(TokenType::True),
            "var" => Some(TokenType::Var),
            "while" => Some(TokenType::While),
            _ => None,
        }
    }
}
