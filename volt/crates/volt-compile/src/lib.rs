//! volt-compile - Single-pass bytecode compiler
//!
//! Turns source text straight into a chunk of bytecode, with no AST in
//! between. The parser is a Pratt parser: every token kind maps to an
//! optional prefix rule, an optional infix rule, and a precedence, and
//! `parse_precedence` drives the two against the scanner's token stream
//! while the emit helpers append instructions to the function currently
//! being compiled.
//!
//! Scope resolution happens inline. Each function under compilation keeps a
//! flat array of locals (at most 256); a local's position in that array is
//! its stack slot at runtime, so resolving a name is a backwards scan and no
//! separate symbol table exists. Globals compile to constant-pool references
//! to their interned names and are resolved by the VM at runtime.
//!
//! Error handling follows the panic-mode scheme: the first error in a
//! statement is reported to stderr, subsequent ones are suppressed until
//! `synchronize` skips to a statement boundary, and compilation keeps going
//! so one run can report several errors. Any error poisons the result.

mod emit;
mod expr;
mod stmt;

use thiserror::Error;
use tracing::debug;

use volt_core::{FunId, Heap, ObjFunction, StrId};
use volt_lex::{Scanner, Token, TokenKind};

/// Compilation failed; diagnostics already went to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("compilation failed")]
pub struct CompileError;

/// Hard limit on locals per function: slot operands are one byte, and
/// slot 0 is reserved for the function itself.
const MAX_LOCALS: usize = 256;

/// Compiles a whole program into a nameless arity-0 script function.
///
/// Identifier and string-literal constants are interned through `heap`, and
/// the finished function is allocated there too. On failure the partial
/// function is discarded; the interner keeps whatever it interned.
pub fn compile(source: &str, heap: &mut Heap) -> Result<FunId, CompileError> {
    debug!(bytes = source.len(), "compiling source");

    let mut parser = Parser::new(source, heap);
    parser.advance();
    while !parser.match_token(TokenKind::Eof) {
        parser.declaration();
    }
    parser.finish()
}

/// A local variable: its name and the scope depth it was declared at.
/// Depth -1 marks "declared but not yet initialized", which is how
/// `var x = x;` is caught.
struct Local<'src> {
    name: &'src str,
    depth: i32,
}

/// Per-function compilation state. Nested function declarations push a
/// fresh state and restore the enclosing one when the body ends.
struct CompilerState<'src> {
    function: ObjFunction,
    locals: Vec<Local<'src>>,
    scope_depth: i32,
}

impl<'src> CompilerState<'src> {
    fn new(name: Option<StrId>) -> Self {
        // Slot 0 belongs to the function object itself.
        let mut locals = Vec::with_capacity(8);
        locals.push(Local { name: "", depth: 0 });
        Self {
            function: ObjFunction::new(name),
            locals,
            scope_depth: 0,
        }
    }
}

pub(crate) struct Parser<'src> {
    scanner: Scanner<'src>,
    heap: &'src mut Heap,

    previous: Token<'src>,
    current: Token<'src>,
    had_error: bool,
    panic_mode: bool,

    compiler: CompilerState<'src>,
    enclosing: Vec<CompilerState<'src>>,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str, heap: &'src mut Heap) -> Self {
        Self {
            scanner: Scanner::new(source),
            heap,
            previous: Token::empty(),
            current: Token::empty(),
            had_error: false,
            panic_mode: false,
            compiler: CompilerState::new(None),
            enclosing: Vec::new(),
        }
    }

    fn finish(mut self) -> Result<FunId, CompileError> {
        self.emit_return();
        if self.had_error {
            return Err(CompileError);
        }
        let id = self.heap.alloc_function(self.compiler.function);
        debug!("compilation finished");
        Ok(id)
    }

    /* token navigation */

    /// Moves to the next real token, reporting and skipping any run of
    /// error tokens in a single call.
    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.scan_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            // An error token carries its message as the lexeme.
            let message = self.current.lexeme;
            self.error_at_current(message);
        }
    }

    #[inline]
    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
            return;
        }
        self.error_at_current(message);
    }

    /* error reporting */

    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;

        eprint!("[line {}] Syntax error", token.line);
        match token.kind {
            TokenKind::Eof => eprint!(" at end"),
            TokenKind::Error => {}
            _ => eprint!(" at '{}'", token.lexeme),
        }
        eprintln!(": {message}");

        self.had_error = true;
    }

    fn error(&mut self, message: &str) {
        self.error_at(self.previous, message);
    }

    fn error_at_current(&mut self, message: &str) {
        self.error_at(self.current, message);
    }

    /// Discards tokens until a statement boundary so one syntax error does
    /// not cascade into a wall of follow-on reports.
    fn synchronize(&mut self) {
        self.panic_mode = false;

        while self.current.kind != TokenKind::Eof {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            match self.current.kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => {}
            }
            self.advance();
        }
    }

    /* scopes and locals */

    fn begin_scope(&mut self) {
        self.compiler.scope_depth += 1;
    }

    /// Closes the innermost scope, popping its locals off the runtime stack
    /// with a single `Pop`, one `PopN`, or nothing at all.
    fn end_scope(&mut self) {
        self.compiler.scope_depth -= 1;

        let mut popped: u8 = 0;
        while self
            .compiler
            .locals
            .last()
            .is_some_and(|local| local.depth > self.compiler.scope_depth)
        {
            self.compiler.locals.pop();
            popped += 1;
        }

        match popped {
            0 => {}
            1 => self.emit_op(volt_core::Op::Pop),
            n => self.emit_op_byte(volt_core::Op::PopN, n),
        }
    }

    /// Scans locals innermost-outward for `name`. Finding a slot still at
    /// depth -1 means the initializer mentions the variable it defines.
    fn resolve_local(&mut self, name: &str) -> Option<u8> {
        let found = self
            .compiler
            .locals
            .iter()
            .rposition(|local| local.name == name)?;
        if self.compiler.locals[found].depth == -1 {
            self.error("Cannot access variable in its own initializer");
        }
        Some(found as u8)
    }

    /* nested functions */

    fn begin_function(&mut self, name: Option<StrId>) {
        let fresh = CompilerState::new(name);
        let parent = std::mem::replace(&mut self.compiler, fresh);
        self.enclosing.push(parent);
    }

    fn end_function(&mut self) -> Option<ObjFunction> {
        self.emit_return();
        let parent = self.enclosing.pop()?;
        let finished = std::mem::replace(&mut self.compiler, parent);
        Some(finished.function)
    }
}

#[cfg(test)]
mod tests;
