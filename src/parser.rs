/*!
Recursive‑descent parser for ShravScript.

Time & Space Complexity
-----------------------
* **n** = number of tokens (including the sole EOF).

Every token is consumed once via `advance()`; the only look‑ahead beyond one
token is the bracket scan that tells a lambda `(a, b) => …` apart from a
parenthesised expression, bounded by the length of the parenthesised group.
Call‑stack depth grows with syntactic nesting.

### Logging Policy

| Location                     | Level  | Purpose                                   |
|------------------------------|--------|-------------------------------------------|
| `Parser::new`, `parse`       | `info` | Lifecycle milestones.                     |
| `statement`                  | `debug`| High‑level descent into grammar branches. |

Grammar (EBNF — condensed)
--------------------------

```text
program        → statement* EOF ;
statement      → letStmt | fnDecl | classDecl | ifStmt | switchStmt
               | whileStmt | forStmt | withStmt | "break" | "continue"
               | returnStmt | tryStmt | importStmt | printStmt | exprStmt ;
letStmt        → "let" IDENT ( "=" expression )? ";"? ;
fnDecl         → "fn" IDENT "(" parameters? ")" block ;
classDecl      → "class" IDENT "{" ( "fn" IDENT "(" parameters? ")" block )* "}" ;
ifStmt         → "if" expression block ( "elif" expression block )* ( "else" block )? ;
switchStmt     → "switch" expression "{" ( "case" expression block | "default" block )* "}" ;
whileStmt      → "while" expression block ;
forStmt        → "for" IDENT "in" expression ".." expression block ;
withStmt       → "with" expression "as" IDENT block ;
returnStmt     → "return" expression? ";"? ;
tryStmt        → "try" block "catch" "("? IDENT ")"? block ;
importStmt     → "import" ( IDENT | STRING ) ";"? ;
printStmt      → "print" expression ";"? ;
exprStmt       → expression ";"? ;
block          → "{" statement* "}" ;
expression     → assignment ;
assignment     → ( call "=" assignment ) | logic_or ;
logic_or       → logic_and ( "or" logic_and )* ;
logic_and      → equality ( "and" equality )* ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
term           → factor ( ( "-" | "+" ) factor )* ;
factor         → unary ( ( "/" | "*" | "%" ) unary )* ;
unary          → ( "-" | "not" | "!" ) unary | power ;
power          → call ( "**" unary )? ;
call           → primary ( "(" arguments? ")" | "[" expression "]" | "." name )* ;
primary        → INTEGER | FLOAT | STRING | "true" | "false" | "null" | "this"
               | IDENT | "(" expression ")" | list | dict | lambda ;
list           → "[" ( expression ( "," expression )* )? "]" ;
dict           → "{" ( key ":" expression ( "," key ":" expression )* )? "}" ;
lambda         → "(" parameters? ")" "=>" ( block | expression ) ;
```

Statement terminators are optional everywhere.  `break`/`continue` outside
a loop and `return` outside a function body are rejected here, which keeps
stray control signals out of the evaluator.
*/

use std::rc::Rc;

use crate::ast::{
    BinaryOp, Expr, FunctionDecl, LiteralValue, Program, Stmt, SwitchCase, UnaryOp,
};
use crate::error::{Result, ShravError};
use crate::scanner;
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenKind, TokenType};

use log::{debug, info};

/// Scan and parse a whole compilation unit.
pub fn parse_source(source: &str) -> Result<Program> {
    let tokens: Vec<Token<'_>> = scanner::tokenize(source)?;
    Parser::new(&tokens).parse()
}

/// Top‑level parser over an immutable slice of tokens.
pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    current: usize,
    loop_depth: usize,
    function_depth: usize,
}

impl<'a> Parser<'a> {
    /// Construct a new parser.  `tokens` must end with an `EOF` token, as
    /// produced by the scanner.
    pub fn new(tokens: &'a [Token<'a>]) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        Self {
            tokens,
            current: 0,
            loop_depth: 0,
            function_depth: 0,
        }
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program, stopping at the first error.
    pub fn parse(&mut self) -> Result<Program> {
        info!("Beginning parse phase");

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            statements.push(self.statement()?);
        }

        info!("Parsed {} top-level statements", statements.len());

        Ok(Program { statements })
    }

    // ───────────────────────── statement rules ────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        ensure_sufficient_stack(|| self.statement_rule())
    }

    fn statement_rule(&mut self) -> Result<Stmt> {
        debug!("Entering statement at {:?}", self.peek().token_type);

        if self.matches(TokenType::LET) {
            self.let_declaration()
        } else if self.matches(TokenType::FN) {
            let decl = self.function("function")?;
            Ok(Stmt::Function(decl))
        } else if self.matches(TokenType::CLASS) {
            self.class_declaration()
        } else if self.matches(TokenType::IF) {
            self.if_statement()
        } else if self.matches(TokenType::SWITCH) {
            self.switch_statement()
        } else if self.matches(TokenType::WHILE) {
            self.while_statement()
        } else if self.matches(TokenType::FOR) {
            self.for_statement()
        } else if self.matches(TokenType::WITH) {
            self.with_statement()
        } else if self.matches(TokenType::BREAK) {
            self.loop_control(Stmt::Break, "break")
        } else if self.matches(TokenType::CONTINUE) {
            self.loop_control(Stmt::Continue, "continue")
        } else if self.matches(TokenType::RETURN) {
            self.return_statement()
        } else if self.matches(TokenType::TRY) {
            self.try_statement()
        } else if self.matches(TokenType::IMPORT) {
            self.import_statement()
        } else if self.matches(TokenType::PRINT) {
            let value: Expr = self.expression()?;
            self.consume_optional(TokenType::SEMICOLON);
            Ok(Stmt::Print(value))
        } else {
            let expr: Expr = self.expression()?;
            self.consume_optional(TokenType::SEMICOLON);
            Ok(Stmt::Expression(expr))
        }
    }

    fn let_declaration(&mut self) -> Result<Stmt> {
        let name: String = self
            .consume(TokenType::IDENTIFIER, "Expected variable name after 'let'")?
            .lexeme
            .to_owned();

        let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume_optional(TokenType::SEMICOLON);

        Ok(Stmt::Let { name, initializer })
    }

    /// `IDENT "(" parameters? ")" block`, after the leading `fn`.
    fn function(&mut self, kind: &str) -> Result<Rc<FunctionDecl>> {
        let name: &Token<'_> =
            self.consume(TokenType::IDENTIFIER, &format!("Expected {} name", kind))?;

        self.consume(
            TokenType::LEFT_PAREN,
            &format!("Expected '(' after {} name", kind),
        )?;
        let params: Vec<String> = self.parameters()?;

        let body: Vec<Stmt> = self.function_body(&format!("Expected '{{' before {} body", kind))?;

        Ok(Rc::new(FunctionDecl {
            name: name.lexeme.to_owned(),
            params,
            body,
            line: name.line,
        }))
    }

    /// Parameter names up to and including the closing `)`.
    fn parameters(&mut self) -> Result<Vec<String>> {
        let mut params: Vec<String> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                let param = self.consume(TokenType::IDENTIFIER, "Expected parameter name")?;

                params.push(param.lexeme.to_owned());

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after parameters")?;

        Ok(params)
    }

    /// A block parsed as the body of a function, method or lambda: `return`
    /// becomes legal and enclosing loops no longer are.
    fn function_body(&mut self, message: &str) -> Result<Vec<Stmt>> {
        let enclosing_loops: usize = self.loop_depth;

        self.loop_depth = 0;
        self.function_depth += 1;

        let body = self.block(message);

        self.function_depth -= 1;
        self.loop_depth = enclosing_loops;

        body
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name: String = self
            .consume(TokenType::IDENTIFIER, "Expected class name")?
            .lexeme
            .to_owned();

        self.consume(TokenType::LEFT_BRACE, "Expected '{' after class name")?;

        let mut methods: Vec<Rc<FunctionDecl>> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            if !self.matches(TokenType::FN) {
                return Err(self.error_at(
                    self.peek(),
                    "Expected method declaration starting with 'fn'",
                ));
            }

            methods.push(self.function("method")?);
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after class body")?;

        Ok(Stmt::Class { name, methods })
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        let mut branches: Vec<(Expr, Vec<Stmt>)> = Vec::new();

        let condition: Expr = self.expression()?;
        let body: Vec<Stmt> = self.block("Expected '{' after if condition")?;
        branches.push((condition, body));

        while self.matches(TokenType::ELIF) {
            let condition: Expr = self.expression()?;
            let body: Vec<Stmt> = self.block("Expected '{' after elif condition")?;
            branches.push((condition, body));
        }

        let else_branch: Option<Vec<Stmt>> = if self.matches(TokenType::ELSE) {
            Some(self.block("Expected '{' after else")?)
        } else {
            None
        };

        Ok(Stmt::If {
            branches,
            else_branch,
        })
    }

    fn switch_statement(&mut self) -> Result<Stmt> {
        let subject: Expr = self.expression()?;

        self.consume(TokenType::LEFT_BRACE, "Expected '{' after switch expression")?;

        let mut cases: Vec<SwitchCase> = Vec::new();
        let mut default: Option<Vec<Stmt>> = None;

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            if self.matches(TokenType::CASE) {
                let value: Expr = self.expression()?;
                let body: Vec<Stmt> = self.block("Expected '{' after case value")?;

                cases.push(SwitchCase { value, body });
            } else if self.matches(TokenType::DEFAULT) {
                if default.is_some() {
                    return Err(self.error_at(
                        self.previous(),
                        "Expected at most one 'default' in switch statement",
                    ));
                }

                default = Some(self.block("Expected '{' after default")?);
            } else {
                return Err(self.error_at(
                    self.peek(),
                    "Expected 'case' or 'default' in switch statement",
                ));
            }
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after switch statement")?;

        Ok(Stmt::Switch {
            subject,
            cases,
            default,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        let condition: Expr = self.expression()?;
        let body: Vec<Stmt> = self.loop_body("Expected '{' after while condition")?;

        Ok(Stmt::While { condition, body })
    }

    fn for_statement(&mut self) -> Result<Stmt> {
        let variable: &Token<'_> =
            self.consume(TokenType::IDENTIFIER, "Expected variable name in for loop")?;

        self.consume(TokenType::IN, "Expected 'in' keyword in for loop")?;

        let start: Expr = self.expression()?;

        self.consume(TokenType::DOT_DOT, "Expected '..' operator in range")?;

        let end: Expr = self.expression()?;
        let body: Vec<Stmt> = self.loop_body("Expected '{' after for loop range")?;

        Ok(Stmt::For {
            variable: variable.lexeme.to_owned(),
            start,
            end,
            body,
            line: variable.line,
        })
    }

    fn loop_body(&mut self, message: &str) -> Result<Vec<Stmt>> {
        self.loop_depth += 1;
        let body = self.block(message);
        self.loop_depth -= 1;

        body
    }

    fn loop_control(&mut self, stmt: Stmt, keyword: &str) -> Result<Stmt> {
        if self.loop_depth == 0 {
            return Err(self.error_at(
                self.previous(),
                &format!("Expected '{}' to appear inside a loop", keyword),
            ));
        }

        self.consume_optional(TokenType::SEMICOLON);

        Ok(stmt)
    }

    fn with_statement(&mut self) -> Result<Stmt> {
        let resource: Expr = self.expression()?;

        self.consume(TokenType::AS, "Expected 'as' after with expression")?;

        let name: String = self
            .consume(TokenType::IDENTIFIER, "Expected variable name after 'as'")?
            .lexeme
            .to_owned();

        let body: Vec<Stmt> = self.block("Expected '{' after with statement")?;

        Ok(Stmt::With {
            resource,
            name,
            body,
        })
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword: &Token<'_> = self.previous();

        if self.function_depth == 0 {
            return Err(self.error_at(
                keyword,
                "Expected 'return' to appear inside a function body",
            ));
        }

        let value: Option<Expr> = if self.check(TokenType::SEMICOLON)
            || self.check(TokenType::RIGHT_BRACE)
            || self.is_at_end()
        {
            None
        } else {
            Some(self.expression()?)
        };

        self.consume_optional(TokenType::SEMICOLON);

        Ok(Stmt::Return {
            value,
            line: keyword.line,
        })
    }

    fn try_statement(&mut self) -> Result<Stmt> {
        let body: Vec<Stmt> = self.block("Expected '{' after try")?;

        self.consume(TokenType::CATCH, "Expected 'catch' after try block")?;

        let parenthesized: bool = self.matches(TokenType::LEFT_PAREN);

        let catch_name: String = self
            .consume(TokenType::IDENTIFIER, "Expected exception variable name")?
            .lexeme
            .to_owned();

        if parenthesized {
            self.consume(TokenType::RIGHT_PAREN, "Expected ')' after catch variable")?;
        }

        let handler: Vec<Stmt> = self.block("Expected '{' after catch")?;

        Ok(Stmt::Try {
            body,
            catch_name,
            handler,
        })
    }

    fn import_statement(&mut self) -> Result<Stmt> {
        let token: &Token<'_> = self.peek();

        let module: String = match &token.token_type {
            TokenType::IDENTIFIER => token.lexeme.to_owned(),
            TokenType::STRING(name) => name.clone(),
            _ => {
                return Err(self.error_at(
                    token,
                    "Expected module name as string or identifier",
                ))
            }
        };

        self.advance();
        self.consume_optional(TokenType::SEMICOLON);

        Ok(Stmt::Import {
            module,
            line: token.line,
        })
    }

    /// `"{" statement* "}"`; `message` reports a missing opening brace.
    fn block(&mut self, message: &str) -> Result<Vec<Stmt>> {
        self.consume(TokenType::LEFT_BRACE, message)?;

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            statements.push(self.statement()?);
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after block")?;

        Ok(statements)
    }

    // ─────────────────────── expression rules ─────────────────────

    fn expression(&mut self) -> Result<Expr> {
        ensure_sufficient_stack(|| self.assignment())
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr: Expr = self.logical_or()?;

        if self.matches(TokenType::EQUAL) {
            let equals: &Token<'_> = self.previous();
            let value: Expr = self.assignment()?;

            let assignable: bool = match &expr {
                Expr::Variable { name, .. } => name != "this",
                Expr::Property { .. } | Expr::Index { .. } => true,
                _ => false,
            };

            if !assignable {
                return Err(self.error_at(equals, "Invalid assignment target"));
            }

            return Ok(Expr::Assign {
                target: Box::new(expr),
                value: Box::new(value),
                line: equals.line,
            });
        }

        Ok(expr)
    }

    fn logical_or(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.logical_and()?;

        while self.matches(TokenType::OR) {
            let line: usize = self.previous().line;
            let right: Expr = self.logical_and()?;

            expr = binary(expr, BinaryOp::Or, right, line);
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.equality()?;

        while self.matches(TokenType::AND) {
            let line: usize = self.previous().line;
            let right: Expr = self.equality()?;

            expr = binary(expr, BinaryOp::And, right, line);
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.comparison()?;

        loop {
            let operator: BinaryOp = if self.matches(TokenType::EQUAL_EQUAL) {
                BinaryOp::Equal
            } else if self.matches(TokenType::BANG_EQUAL) {
                BinaryOp::NotEqual
            } else {
                break;
            };

            let line: usize = self.previous().line;
            let right: Expr = self.comparison()?;

            expr = binary(expr, operator, right, line);
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.term()?;

        loop {
            let operator: BinaryOp = if self.matches(TokenType::LESS) {
                BinaryOp::Less
            } else if self.matches(TokenType::GREATER) {
                BinaryOp::Greater
            } else if self.matches(TokenType::LESS_EQUAL) {
                BinaryOp::LessEqual
            } else if self.matches(TokenType::GREATER_EQUAL) {
                BinaryOp::GreaterEqual
            } else {
                break;
            };

            let line: usize = self.previous().line;
            let right: Expr = self.term()?;

            expr = binary(expr, operator, right, line);
        }

        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.factor()?;

        loop {
            let operator: BinaryOp = if self.matches(TokenType::PLUS) {
                BinaryOp::Add
            } else if self.matches(TokenType::MINUS) {
                BinaryOp::Subtract
            } else {
                break;
            };

            let line: usize = self.previous().line;
            let right: Expr = self.factor()?;

            expr = binary(expr, operator, right, line);
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.unary()?;

        loop {
            let operator: BinaryOp = if self.matches(TokenType::STAR) {
                BinaryOp::Multiply
            } else if self.matches(TokenType::SLASH) {
                BinaryOp::Divide
            } else if self.matches(TokenType::PERCENT) {
                BinaryOp::Modulo
            } else {
                break;
            };

            let line: usize = self.previous().line;
            let right: Expr = self.unary()?;

            expr = binary(expr, operator, right, line);
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        let operator: Option<UnaryOp> = if self.matches(TokenType::MINUS) {
            Some(UnaryOp::Negate)
        } else if self.matches(TokenType::NOT) || self.matches(TokenType::BANG) {
            Some(UnaryOp::Not)
        } else {
            None
        };

        if let Some(operator) = operator {
            let line: usize = self.previous().line;
            let operand: Expr = self.unary()?;

            return Ok(Expr::Unary {
                operator,
                operand: Box::new(operand),
                line,
            });
        }

        self.power()
    }

    /// `**` binds tighter than unary minus and is right‑associative: the
    /// exponent is itself a unary expression, so `2 ** -1` and
    /// `2 ** 3 ** 2` both parse.
    fn power(&mut self) -> Result<Expr> {
        let expr: Expr = self.call()?;

        if self.matches(TokenType::STAR_STAR) {
            let line: usize = self.previous().line;
            let exponent: Expr = self.unary()?;

            return Ok(binary(expr, BinaryOp::Power, exponent, line));
        }

        Ok(expr)
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.matches(TokenType::LEFT_PAREN) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenType::LEFT_BRACKET) {
                let line: usize = self.previous().line;
                let index: Expr = self.expression()?;

                self.consume(TokenType::RIGHT_BRACKET, "Expected ']' after index")?;

                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                    line,
                };
            } else if self.matches(TokenType::DOT) {
                // keywords are fine as member names: `file.default`
                let name: &Token<'_> = self.peek();

                if !matches!(name.kind(), TokenKind::Identifier | TokenKind::Keyword) {
                    return Err(self.error_at(name, "Expected property name after '.'"));
                }

                self.advance();

                expr = Expr::Property {
                    object: Box::new(expr),
                    name: name.lexeme.to_owned(),
                    line: name.line,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let line: usize = self.previous().line;
        let arguments: Vec<Expr> =
            self.expression_list(TokenType::RIGHT_PAREN, "Expected ')' after arguments")?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            arguments,
            line,
        })
    }

    /// Comma‑separated expressions up to and including `close`.
    fn expression_list(&mut self, close: TokenType, message: &str) -> Result<Vec<Expr>> {
        let mut items: Vec<Expr> = Vec::new();

        if !self.check(close.clone()) {
            loop {
                items.push(self.expression()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(close, message)?;

        Ok(items)
    }

    fn primary(&mut self) -> Result<Expr> {
        let token: &'a Token<'a> = self.peek();

        let literal: Option<LiteralValue> = match &token.token_type {
            TokenType::TRUE => Some(LiteralValue::Bool(true)),
            TokenType::FALSE => Some(LiteralValue::Bool(false)),
            TokenType::NULL => Some(LiteralValue::Null),
            TokenType::INTEGER(n) => Some(LiteralValue::Integer(*n)),
            TokenType::FLOAT(n) => Some(LiteralValue::Float(*n)),
            TokenType::STRING(s) => Some(LiteralValue::Str(s.clone())),
            _ => None,
        };

        if let Some(literal) = literal {
            self.advance();
            return Ok(Expr::Literal(literal));
        }

        if self.matches(TokenType::IDENTIFIER) || self.matches(TokenType::THIS) {
            return Ok(Expr::Variable {
                name: token.lexeme.to_owned(),
                line: token.line,
            });
        }

        if self.check(TokenType::LEFT_PAREN) && self.is_lambda_start() {
            self.advance();
            return self.lambda(token.line);
        }

        if self.matches(TokenType::LEFT_PAREN) {
            let expr: Expr = self.expression()?;

            self.consume(TokenType::RIGHT_PAREN, "Expected ')' after expression")?;

            return Ok(expr);
        }

        if self.matches(TokenType::LEFT_BRACKET) {
            let elements: Vec<Expr> =
                self.expression_list(TokenType::RIGHT_BRACKET, "Expected ']' after list elements")?;

            return Ok(Expr::List(elements));
        }

        if self.check(TokenType::LEFT_BRACE) && self.is_dict_start() {
            self.advance();
            return self.dict();
        }

        Err(self.error_at(token, "Expected expression"))
    }

    fn lambda(&mut self, line: usize) -> Result<Expr> {
        let params: Vec<String> = self.parameters()?;

        self.consume(TokenType::ARROW, "Expected '=>' in lambda expression")?;

        let body: Vec<Stmt> = if self.check(TokenType::LEFT_BRACE) {
            self.function_body("Expected '{' before lambda body")?
        } else {
            let value: Expr = self.expression()?;
            vec![Stmt::Return {
                value: Some(value),
                line,
            }]
        };

        Ok(Expr::Lambda(Rc::new(FunctionDecl {
            name: "<lambda>".to_owned(),
            params,
            body,
            line,
        })))
    }

    fn dict(&mut self) -> Result<Expr> {
        let mut entries: Vec<(String, Expr)> = Vec::new();

        if !self.check(TokenType::RIGHT_BRACE) {
            loop {
                let key: &Token<'_> = self.peek();

                let name: String = match &key.token_type {
                    TokenType::IDENTIFIER => key.lexeme.to_owned(),
                    TokenType::STRING(s) => s.clone(),
                    _ => return Err(self.error_at(key, "Expected property name")),
                };

                self.advance();
                self.consume(TokenType::COLON, "Expected ':' after property name")?;

                let value: Expr = self.expression()?;

                // a repeated key keeps its first position, like an insert
                match entries.iter_mut().find(|(k, _)| *k == name) {
                    Some(entry) => entry.1 = value,
                    None => entries.push((name, value)),
                }

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after object properties")?;

        Ok(Expr::Dict(entries))
    }

    // ────────────────────── look‑ahead helpers ────────────────────

    /// With `(` under the cursor: is its matching `)` followed by `=>`?
    fn is_lambda_start(&self) -> bool {
        let mut depth: usize = 0;

        for (offset, token) in self.tokens[self.current..].iter().enumerate() {
            match token.token_type {
                TokenType::LEFT_PAREN => depth += 1,
                TokenType::RIGHT_PAREN => {
                    depth -= 1;

                    if depth == 0 {
                        return matches!(
                            self.tokens.get(self.current + offset + 1),
                            Some(Token {
                                token_type: TokenType::ARROW,
                                ..
                            })
                        );
                    }
                }
                TokenType::EOF => return false,
                _ => {}
            }
        }

        false
    }

    /// With `{` under the cursor: `{}` or `{ key :` starts a dict literal.
    fn is_dict_start(&self) -> bool {
        let next = self.tokens.get(self.current + 1);
        let after = self.tokens.get(self.current + 2);

        match (next, after) {
            (Some(n), _) if n.token_type == TokenType::RIGHT_BRACE => true,
            (Some(n), Some(a)) => {
                matches!(n.kind(), TokenKind::Identifier | TokenKind::String)
                    && a.token_type == TokenType::COLON
            }
            _ => false,
        }
    }

    // ────────────────────── utility helpers ───────────────────────

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    #[inline(always)]
    fn consume_optional(&mut self, ttype: TokenType) {
        self.matches(ttype);
    }

    #[inline(always)]
    fn consume(&mut self, ttype: TokenType, message: &str) -> Result<&'a Token<'a>> {
        if self.check(ttype) {
            return Ok(self.advance());
        }

        debug!("consume failed at {:?}: {}", self.peek().token_type, message);

        Err(self.error_at(self.peek(), message))
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == ttype
    }

    #[inline(always)]
    fn advance(&mut self) -> &'a Token<'a> {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::EOF)
    }

    #[inline(always)]
    fn peek(&self) -> &'a Token<'a> {
        &self.tokens[self.current]
    }

    #[inline(always)]
    fn previous(&self) -> &'a Token<'a> {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn error_at(&self, token: &Token<'_>, message: &str) -> ShravError {
        ShravError::parse(token.line, token.column, token.text(), message)
    }
}

fn binary(left: Expr, operator: BinaryOp, right: Expr, line: usize) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        operator,
        right: Box::new(right),
        line,
    }
}
