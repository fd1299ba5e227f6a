use std::{iter::Peekable, rc::Rc};

use crate::{
    errors,
    lexer::{Token, TokenType},
    TlpsError,
};

use super::{Expr, ExprId, FunDecl, Literal, Stmt};

const MAX_ARGS: usize = 255;

pub struct Parser<I: Iterator<Item = Token>> {
    tokens: Peekable<I>,
    eof: Token,
    errors: Vec<TlpsError>,
    /// An operand which has already been parsed and stands in for the next primary.
    seed: Option<Expr>,
}

// Macros which make it easier to implement certain common parts of the parser.
macro_rules! rd_matches {
    ($self:ident, $($token:ident)|+) => {
        if $self.peek().is_one_of(&[$(TokenType::$token),+]) {
            Some($self.advance())
        } else {
            None
        }
    };
}

macro_rules! rd_consume {
    ($self:ident, $($token:ident)|+, $msg:expr) => {
        match rd_matches!($self, $($token)|+) {
            Some(token) => token,
            None => return Err(errors::syntax($self.peek(), $msg)),
        }
    };
}

macro_rules! rd_term {
    ($name:ident := $operand:ident ( $($token:ident)|+ $operand2:ident )* => $node:ident) => {
        fn $name(&mut self) -> Result<Expr, TlpsError> {
            let mut left = self.$operand()?;

            while let Some(op) = rd_matches!(self, $($token)|+) {
                let right = self.$operand2()?;
                left = Expr::$node(Box::new(left), op, Box::new(right));
            }

            Ok(left)
        }
    };
}

impl<I: Iterator<Item = Token>> Parser<I> {
    pub fn new<T: IntoIterator<Item = Token, IntoIter = I>>(tokens: T) -> Self {
        Self {
            tokens: tokens.into_iter().peekable(),
            eof: Token::new(TokenType::Eof, "", None, 1),
            errors: Vec::new(),
            seed: None,
        }
    }

    /// Parses a whole program, recovering at statement boundaries so that every
    /// independent syntax error is reported rather than only the first.
    pub fn parse(mut self) -> (Vec<Stmt>, Vec<TlpsError>) {
        let mut stmts = Vec::new();

        while !self.check(TokenType::Eof) {
            if let Some(stmt) = self.declaration() {
                stmts.push(stmt);
            }
        }

        (stmts, self.errors)
    }

    pub fn parse_expr(mut self) -> Result<Expr, TlpsError> {
        let expr = self.expression()?;
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(expr),
        }
    }

    fn peek(&mut self) -> &Token {
        match self.tokens.peek() {
            Some(token) => token,
            None => &self.eof,
        }
    }

    fn check(&mut self, ty: TokenType) -> bool {
        self.peek().is(ty)
    }

    fn advance(&mut self) -> Token {
        if self.check(TokenType::Eof) {
            return self.peek().clone();
        }

        match self.tokens.next() {
            Some(token) => {
                self.eof = Token::new(TokenType::Eof, "", None, token.line());
                token
            }
            None => self.eof.clone(),
        }
    }

    fn declaration(&mut self) -> Option<Stmt> {
        let result = if rd_matches!(self, Class).is_some() {
            self.class_declaration()
        } else if rd_matches!(self, Fun).is_some() {
            self.function("function").map(Stmt::Fun)
        } else if rd_matches!(self, Var).is_some() {
            self.var_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => Some(stmt),
            Err(err) => {
                self.errors.push(err);
                self.synchronize();
                None
            }
        }
    }

    fn class_declaration(&mut self) -> Result<Stmt, TlpsError> {
        let name = rd_consume!(self, Identifier, "Expect class name.");

        let superclass = if rd_matches!(self, Less).is_some() {
            let superclass = rd_consume!(self, Identifier, "Expect superclass name.");
            Some(Expr::Var(ExprId::next(), superclass))
        } else {
            None
        };

        rd_consume!(self, LeftBrace, "Expect '{' before class body.");

        let mut methods = Vec::new();
        while !self.check(TokenType::RightBrace) && !self.check(TokenType::Eof) {
            methods.push(self.function("method")?);
        }

        rd_consume!(self, RightBrace, "Expect '}' after class body.");

        Ok(Stmt::Class(name, superclass, methods))
    }

    fn function(&mut self, kind: &str) -> Result<Rc<FunDecl>, TlpsError> {
        let name = rd_consume!(self, Identifier, format!("Expect {} name.", kind));
        rd_consume!(self, LeftParen, format!("Expect '(' after {} name.", kind));

        let mut params = Vec::new();
        if !self.check(TokenType::RightParen) {
            loop {
                if params.len() >= MAX_ARGS {
                    let err = errors::syntax(self.peek(), "Can't have more than 255 parameters.");
                    self.errors.push(err);
                }

                params.push(rd_consume!(self, Identifier, "Expect parameter name."));

                if rd_matches!(self, Comma).is_none() {
                    break;
                }
            }
        }

        rd_consume!(self, RightParen, "Expect ')' after parameters.");
        rd_consume!(self, LeftBrace, format!("Expect '{{' before {} body.", kind));

        let body = self.block()?;
        Ok(Rc::new(FunDecl { name, params, body }))
    }

    fn var_declaration(&mut self) -> Result<Stmt, TlpsError> {
        let name = rd_consume!(self, Identifier, "Expect variable name.");

        let init = if rd_matches!(self, Equal).is_some() {
            Some(self.expression()?)
        } else {
            None
        };

        rd_consume!(self, Semicolon, "Expect ';' after variable declaration.");
        Ok(Stmt::Var(name, init))
    }

    fn statement(&mut self) -> Result<Stmt, TlpsError> {
        if rd_matches!(self, For).is_some() {
            return self.for_statement();
        }

        if rd_matches!(self, If).is_some() {
            return self.if_statement();
        }

        if let Some(keyword) = rd_matches!(self, Include) {
            return self.include_statement(keyword);
        }

        if let Some(keyword) = rd_matches!(self, Print) {
            if self.check(TokenType::LeftParen) {
                return self.print_call_statement(keyword);
            }

            let value = self.expression()?;
            rd_consume!(self, Semicolon, "Expect ';' after value.");
            return Ok(Stmt::Print(value));
        }

        if let Some(keyword) = rd_matches!(self, Return) {
            let value = if self.check(TokenType::Semicolon) {
                None
            } else {
                Some(self.expression()?)
            };

            rd_consume!(self, Semicolon, "Expect ';' after return value.");
            return Ok(Stmt::Return(keyword, value));
        }

        if rd_matches!(self, While).is_some() {
            return self.while_statement();
        }

        if rd_matches!(self, LeftBrace).is_some() {
            return Ok(Stmt::Block(self.block()?));
        }

        let expr = self.expression()?;
        rd_consume!(self, Semicolon, "Expect ';' after expression.");
        Ok(Stmt::Expression(expr))
    }

    /// `print(a, b);` calls the native builtin, which accepts any number of
    /// arguments. When a single parenthesized argument is followed by more of an
    /// expression, as in `print (1 + 2) * 3;`, the parentheses were a grouping
    /// and the whole statement is a `print` of that expression.
    fn print_call_statement(&mut self, keyword: Token) -> Result<Stmt, TlpsError> {
        rd_consume!(self, LeftParen, "Expect '(' after 'print'.");
        let call = self.finish_call(Expr::Var(ExprId::next(), keyword))?;

        if rd_matches!(self, Semicolon).is_some() {
            return Ok(Stmt::Expression(call));
        }

        match call {
            Expr::Call(_, _, mut args) if args.len() == 1 => {
                let grouping = Expr::Grouping(Box::new(args.remove(0)));
                self.seed = Some(grouping);

                let value = self.expression()?;
                rd_consume!(self, Semicolon, "Expect ';' after value.");
                Ok(Stmt::Print(value))
            }
            call => {
                let expr = self.call_chain(call)?;
                rd_consume!(self, Semicolon, "Expect ';' after expression.");
                Ok(Stmt::Expression(expr))
            }
        }
    }

    fn if_statement(&mut self) -> Result<Stmt, TlpsError> {
        rd_consume!(self, LeftParen, "Expect '(' after 'if'.");
        let condition = self.expression()?;
        rd_consume!(self, RightParen, "Expect ')' after if condition.");

        let then_branch = self.statement()?;
        let else_branch = if rd_matches!(self, Else).is_some() {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If(condition, Box::new(then_branch), else_branch))
    }

    fn include_statement(&mut self, keyword: Token) -> Result<Stmt, TlpsError> {
        let path = match rd_matches!(self, String) {
            Some(path) => path,
            None => return Err(errors::syntax(&keyword, "Expect include path.")),
        };

        rd_consume!(self, Semicolon, "Expect ';' after include path.");
        Ok(Stmt::Include(path))
    }

    fn for_statement(&mut self) -> Result<Stmt, TlpsError> {
        rd_consume!(self, LeftParen, "Expect '(' after 'for'.");

        let init = if rd_matches!(self, Semicolon).is_some() {
            None
        } else if rd_matches!(self, Var).is_some() {
            Some(self.var_declaration()?)
        } else {
            let expr = self.expression()?;
            rd_consume!(self, Semicolon, "Expect ';' after expression.");
            Some(Stmt::Expression(expr))
        };

        let cond = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        rd_consume!(self, Semicolon, "Expect ';' after loop condition.");

        let incr = if self.check(TokenType::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        rd_consume!(self, RightParen, "Expect ')' after for clauses.");

        let mut body = self.statement()?;

        if let Some(incr) = incr {
            body = Stmt::Block(vec![body, Stmt::Expression(incr)]);
        }

        body = Stmt::While(cond.unwrap_or(Expr::Literal(Literal::Bool(true))), Box::new(body));

        if let Some(init) = init {
            body = Stmt::Block(vec![init, body]);
        }

        Ok(body)
    }

    fn while_statement(&mut self) -> Result<Stmt, TlpsError> {
        rd_consume!(self, LeftParen, "Expect '(' after 'while'.");
        let condition = self.expression()?;
        rd_consume!(self, RightParen, "Expect ')' after condition.");

        let body = self.statement()?;
        Ok(Stmt::While(condition, Box::new(body)))
    }

    fn block(&mut self) -> Result<Vec<Stmt>, TlpsError> {
        let mut stmts = Vec::new();

        while !self.check(TokenType::RightBrace) && !self.check(TokenType::Eof) {
            if let Some(stmt) = self.declaration() {
                stmts.push(stmt);
            }
        }

        rd_consume!(self, RightBrace, "Expect '}' after block.");
        Ok(stmts)
    }

    fn expression(&mut self) -> Result<Expr, TlpsError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, TlpsError> {
        let expr = self.or()?;

        if let Some(equals) = rd_matches!(self, Equal) {
            let value = self.assignment()?;

            return match expr {
                Expr::Var(_, name) => Ok(Expr::Assign(ExprId::next(), name, Box::new(value))),
                Expr::Get(obj, name) => Ok(Expr::Set(obj, name, Box::new(value))),
                expr => {
                    // Reported without unwinding: the parser is not confused.
                    self.errors.push(errors::syntax(&equals, "Invalid assignment target."));
                    Ok(expr)
                }
            };
        }

        Ok(expr)
    }

    rd_term!(or := and (Or and)* => Logical);

    rd_term!(and := equality (And equality)* => Logical);

    rd_term!(equality := comparison (BangEqual | EqualEqual comparison)* => Binary);

    rd_term!(comparison := term (Greater | GreaterEqual | Less | LessEqual term)* => Binary);

    rd_term!(term := factor (Minus | Plus factor)* => Binary);

    rd_term!(factor := unary (Star | Slash unary)* => Binary);

    fn unary(&mut self) -> Result<Expr, TlpsError> {
        // A seeded operand sits to the left of whatever comes next, so `-` here is binary.
        if self.seed.is_some() {
            return self.call();
        }

        if let Some(op) = rd_matches!(self, Bang | Minus) {
            let right = self.unary()?;
            return Ok(Expr::Unary(op, Box::new(right)));
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr, TlpsError> {
        let expr = self.primary()?;
        self.call_chain(expr)
    }

    fn call_chain(&mut self, mut expr: Expr) -> Result<Expr, TlpsError> {
        loop {
            if rd_matches!(self, LeftParen).is_some() {
                expr = self.finish_call(expr)?;
            } else if rd_matches!(self, Dot).is_some() {
                let name = rd_consume!(self, Identifier, "Expect property name after '.'.");
                expr = Expr::Get(Box::new(expr), name);
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr, TlpsError> {
        let mut args = Vec::new();

        if !self.check(TokenType::RightParen) {
            loop {
                if args.len() >= MAX_ARGS {
                    let err = errors::syntax(self.peek(), "Can't have more than 255 arguments.");
                    self.errors.push(err);
                }

                args.push(self.expression()?);

                if rd_matches!(self, Comma).is_none() {
                    break;
                }
            }
        }

        let paren = rd_consume!(self, RightParen, "Expect ')' after arguments.");
        Ok(Expr::Call(Box::new(callee), paren, args))
    }

    fn primary(&mut self) -> Result<Expr, TlpsError> {
        if let Some(expr) = self.seed.take() {
            return Ok(expr);
        }

        if let Some(token) = rd_matches!(self, False | True | Nil | Number | String) {
            return Ok(Expr::Literal(token.literal().cloned().unwrap_or(Literal::Nil)));
        }

        if let Some(keyword) = rd_matches!(self, Super) {
            rd_consume!(self, Dot, "Expect '.' after 'super'.");
            let method = rd_consume!(self, Identifier, "Expect superclass method name.");
            return Ok(Expr::Super(ExprId::next(), keyword, method));
        }

        if let Some(keyword) = rd_matches!(self, This) {
            return Ok(Expr::This(ExprId::next(), keyword));
        }

        // `print` in expression position names the native builtin.
        if let Some(name) = rd_matches!(self, Identifier | Print) {
            return Ok(Expr::Var(ExprId::next(), name));
        }

        if rd_matches!(self, LeftParen).is_some() {
            let expr = self.expression()?;
            rd_consume!(self, RightParen, "Expect ')' after expression.");
            return Ok(Expr::Grouping(Box::new(expr)));
        }

        Err(errors::syntax(self.peek(), "Expect expression."))
    }

    fn synchronize(&mut self) {
        while !self.check(TokenType::Eof) {
            let token = self.advance();

            // If we reach a semicolon, we can stop because the next token will be the start of a new statement
            if token.is(TokenType::Semicolon) {
                break;
            }

            // If the next token is the start of a new statement, we can stop
            if self.peek().is_one_of(&[
                TokenType::Class,
                TokenType::Fun,
                TokenType::Var,
                TokenType::For,
                TokenType::If,
                TokenType::Include,
                TokenType::While,
                TokenType::Print,
                TokenType::Return,
            ]) {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        ast::{printer::AstPrinter, ExprVisitor, StmtVisitor},
        lexer::Scanner,
    };

    use super::Parser;

    fn test_parse_expr(source: &str, expected: &str) {
        let lexer = Scanner::new(source);
        let expr = Parser::new(lexer.filter_map(|x| x.ok())).parse_expr().expect("no errors");
        assert_eq!(AstPrinter {}.visit_expr(&expr), expected, "the expression should be parsed correctly");
    }

    fn test_parse(source: &str, expected: &str) {
        let lexer = Scanner::new(source);
        let (tree, errs) = Parser::new(lexer.filter_map(|x| x.ok())).parse();
        assert!(errs.is_empty(), "no errors should be returned, got {:?}", errs);

        assert_eq!(
            AstPrinter {}.visit_stmt(tree.first().expect("a statement")),
            expected,
            "the statement should be parsed correctly"
        );
    }

    fn parse_errors(source: &str) -> Vec<String> {
        let lexer = Scanner::new(source);
        let (_, errs) = Parser::new(lexer.filter_map(|x| x.ok())).parse();
        errs.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn parse_basic_expression() {
        test_parse_expr("1 + 2", "(+ 1 2)");
        test_parse_expr("10 - 5 / (2 * 3)", "(- 10 (/ 5 (group (* 2 3))))");
        test_parse_expr("1 - 2 - 3", "(- (- 1 2) 3)");
        test_parse_expr("-!x", "(- (! x))");
    }

    #[test]
    fn parse_precedence() {
        test_parse_expr("a or b and c == d < e + f * g", "(or a (and b (== c (< d (+ e (* f g))))))");
        test_parse_expr("a = b = c", "(= a (= b c))");
        test_parse_expr("a = b or c", "(= a (or b c))");
    }

    #[test]
    fn parse_calls_and_properties() {
        test_parse_expr("f(1, 2)(3)", "(call (call f 1 2) 3)");
        test_parse_expr("a.b.c(1)", "(call a.b.c 1)");
        test_parse_expr("a.b = 3", "(set a.b 3)");
        test_parse_expr("super.greet()", "(call super.greet)");
        test_parse_expr("print(1)", "(call print 1)");
    }

    #[test]
    fn parse_block() {
        test_parse("{ 10; 20; 30; }", "(block (10) (20) (30))");
    }

    #[test]
    fn parse_var_def() {
        test_parse("var a = 10;", "(var a 10)");
        test_parse("var a;", "(var a)");
    }

    #[test]
    fn parse_if() {
        test_parse("if (x > 5) { 10; } else { 20; }", "(if (> x 5) (block (10)) (block (20)))");
    }

    #[test]
    fn parse_while() {
        test_parse("while (x > 5) { 10; }", "(while (> x 5) (block (10)))");
    }

    #[test]
    fn parse_for() {
        test_parse(
            "for (var i = 0; i < 10; i = i + 1) { 10; }",
            "(block (var i 0) (while (< i 10) (block (block (10)) ((= i (+ i 1))))))",
        );
        test_parse("for (;;) x;", "(while true (x))");
    }

    #[test]
    fn parse_functions_and_classes() {
        test_parse("fun add(a, b) { return a + b; }", "(fun add a b (block (return (+ a b))))");
        test_parse(
            "class B < A { init(x) { this.x = x; } get() { return this.x; } }",
            "(class B < A (fun init x (block ((set this.x x)))) (fun get (block (return this.x))))",
        );
    }

    #[test]
    fn parse_print_and_include() {
        test_parse("print 1 + 2;", "(print (+ 1 2))");
        test_parse("print(1, 2);", "((call print 1 2))");
        test_parse("print(x).y;", "(print (group x).y)");
        test_parse("print(a, b).y;", "((call print a b).y)");
        test_parse("print (1 + 2) * 3;", "(print (* (group (+ 1 2)) 3))");
        test_parse("print (1) == 1;", "(print (== (group 1) 1))");
        test_parse("print (1) - 2;", "(print (- (group 1) 2))");
        assert_eq!(
            parse_errors("print (a) = 1;"),
            vec!["[line 1] Error at '=': Invalid assignment target."]
        );
        test_parse("include \"lib/util.lox\";", "(include \"lib/util.lox\")");
    }

    #[test]
    fn reports_independent_syntax_errors() {
        let errs = parse_errors("var = 1;\nprint 2;\nvar x = (3;\nprint 4;");
        assert_eq!(
            errs,
            vec![
                "[line 1] Error at '=': Expect variable name.",
                "[line 3] Error at ';': Expect ')' after expression.",
            ]
        );
    }

    #[test]
    fn recovers_inside_blocks() {
        let errs = parse_errors("{ var 1; print 2; 3 + ; }");
        assert_eq!(
            errs,
            vec![
                "[line 1] Error at '1': Expect variable name.",
                "[line 1] Error at ';': Expect expression.",
            ]
        );
    }

    #[test]
    fn invalid_assignment_target() {
        let errs = parse_errors("1 + 2 = 3;");
        assert_eq!(errs, vec!["[line 1] Error at '=': Invalid assignment target."]);
    }

    #[test]
    fn missing_semicolon_at_end() {
        let errs = parse_errors("print 1");
        assert_eq!(errs, vec!["[line 1] Error at end: Expect ';' after value."]);
    }

    #[test]
    fn include_requires_a_string() {
        let errs = parse_errors("include util;");
        assert_eq!(errs, vec!["[line 1] Error at 'include': Expect include path."]);
    }
}
