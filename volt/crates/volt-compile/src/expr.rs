//! Expression compilation: the Pratt table and its rules.
//!
//! Each token kind maps to `(prefix, infix, precedence)`. A prefix rule
//! compiles a token that can begin an expression; an infix rule compiles an
//! operator that continues one. `parse_precedence` alternates between the
//! two, consuming infix operators only while their precedence stays at or
//! above the requested minimum, which is the entire precedence-climbing
//! algorithm.
//!
//! Assignment is not an infix rule. Prefix rules dispatched at or below
//! assignment precedence receive `can_assign = true` and may consume a
//! following `=` themselves; a leftover `=` afterwards means the left side
//! was not a valid target.

use volt_core::{Obj, Op, Value};
use volt_lex::{Token, TokenKind};

use crate::Parser;

/// Precedence ranks, lowest to highest. Comparing two ranks is how the
/// parser decides whether an infix operator binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Precedence {
    None,
    Assignment, // =
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * /
    Unary,      // ! -
    Call,       // ()
    Primary,
}

impl Precedence {
    /// The next-tighter rank; used to make binary operators left-associative.
    fn next(self) -> Precedence {
        use Precedence::*;
        match self {
            None => Assignment,
            Assignment => Or,
            Or => And,
            And => Equality,
            Equality => Comparison,
            Comparison => Term,
            Term => Factor,
            Factor => Unary,
            Unary => Call,
            Call | Primary => Primary,
        }
    }
}

type ParseFn<'src> = fn(&mut Parser<'src>, bool);

pub(crate) struct ParseRule<'src> {
    prefix: Option<ParseFn<'src>>,
    infix: Option<ParseFn<'src>>,
    precedence: Precedence,
}

impl<'src> Parser<'src> {
    /// The Pratt table. Token kinds without rules fall through to
    /// `(None, None, Precedence::None)` and can never start or continue an
    /// expression.
    fn rule(kind: TokenKind) -> ParseRule<'src> {
        use TokenKind::*;

        let (prefix, infix, precedence): (
            Option<ParseFn<'src>>,
            Option<ParseFn<'src>>,
            Precedence,
        ) = match kind {
            LeftParen => (Some(Self::grouping), Some(Self::call), Precedence::Call),
            Minus => (Some(Self::unary), Some(Self::binary), Precedence::Term),
            Plus => (None, Some(Self::binary), Precedence::Term),
            Slash | Star => (None, Some(Self::binary), Precedence::Factor),
            Bang => (Some(Self::unary), None, Precedence::None),
            BangEqual | EqualEqual => (None, Some(Self::binary), Precedence::Equality),
            Greater | GreaterEqual | Less | LessEqual => {
                (None, Some(Self::binary), Precedence::Comparison)
            }
            Identifier => (Some(Self::variable), None, Precedence::None),
            String => (Some(Self::string), None, Precedence::None),
            Number => (Some(Self::number), None, Precedence::None),
            And => (None, Some(Self::logic_and), Precedence::And),
            Or => (None, Some(Self::logic_or), Precedence::Or),
            True | False | Nil => (Some(Self::literal), None, Precedence::None),
            _ => (None, None, Precedence::None),
        };

        ParseRule {
            prefix,
            infix,
            precedence,
        }
    }

    pub(crate) fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    /// The Pratt core: one prefix expression, then every infix operator
    /// whose precedence is at least `min_prec`.
    pub(crate) fn parse_precedence(&mut self, min_prec: Precedence) {
        self.advance();
        let Some(prefix) = Self::rule(self.previous.kind).prefix else {
            self.error("Expect expression.");
            return;
        };

        let can_assign = min_prec <= Precedence::Assignment;
        prefix(self, can_assign);

        while min_prec <= Self::rule(self.current.kind).precedence {
            self.advance();
            if let Some(infix) = Self::rule(self.previous.kind).infix {
                infix(self, can_assign);
            }
        }

        if can_assign && self.match_token(TokenKind::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    /* prefix rules */

    fn number(&mut self, _can_assign: bool) {
        let value: f64 = self.previous.lexeme.parse().unwrap_or(0.0);
        self.emit_const(Value::Number(value));
    }

    fn string(&mut self, _can_assign: bool) {
        // Strip the surrounding quotes.
        let lexeme = self.previous.lexeme;
        let id = self.heap.intern(&lexeme[1..lexeme.len() - 1]);
        self.emit_const(Value::Obj(Obj::Str(id)));
    }

    fn literal(&mut self, _can_assign: bool) {
        match self.previous.kind {
            TokenKind::True => self.emit_op(Op::True),
            TokenKind::False => self.emit_op(Op::False),
            TokenKind::Nil => self.emit_op(Op::Nil),
            _ => {}
        }
    }

    fn grouping(&mut self, _can_assign: bool) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expected closing ')'");
    }

    fn unary(&mut self, _can_assign: bool) {
        let operator = self.previous.kind;

        self.parse_precedence(Precedence::Unary);

        match operator {
            TokenKind::Minus => self.emit_op(Op::Negate),
            TokenKind::Bang => self.emit_op(Op::LogicNot),
            _ => {}
        }
    }

    fn variable(&mut self, can_assign: bool) {
        self.named_variable(self.previous, can_assign);
    }

    /* infix rules */

    fn binary(&mut self, _can_assign: bool) {
        let operator = self.previous.kind;

        let rule = Self::rule(operator);
        self.parse_precedence(rule.precedence.next());

        match operator {
            TokenKind::Plus => self.emit_op(Op::Add),
            TokenKind::Minus => self.emit_op(Op::Subtract),
            TokenKind::Star => self.emit_op(Op::Multiply),
            TokenKind::Slash => self.emit_op(Op::Divide),

            TokenKind::EqualEqual => self.emit_op(Op::LogicEqual),
            TokenKind::Greater => self.emit_op(Op::LogicGreater),
            TokenKind::Less => self.emit_op(Op::LogicLess),

            // The remaining comparisons are two-instruction sequences.
            TokenKind::BangEqual => self.emit_ops(Op::LogicEqual, Op::LogicNot),
            TokenKind::GreaterEqual => self.emit_ops(Op::LogicLess, Op::LogicNot),
            TokenKind::LessEqual => self.emit_ops(Op::LogicGreater, Op::LogicNot),
            _ => {}
        }
    }

    /// `and` short-circuits: a falsey left side jumps over the right side
    /// and stays on the stack as the result.
    fn logic_and(&mut self, _can_assign: bool) {
        let end_jump = self.emit_jump(Op::JumpIfFalse);
        self.emit_op(Op::Pop);
        self.parse_precedence(Precedence::And);
        self.patch_jump(end_jump);
    }

    fn logic_or(&mut self, _can_assign: bool) {
        let end_jump = self.emit_jump(Op::JumpIfTrue);
        self.emit_op(Op::Pop);
        self.parse_precedence(Precedence::Or);
        self.patch_jump(end_jump);
    }

    fn call(&mut self, _can_assign: bool) {
        let argc = self.argument_list();
        self.emit_op_byte(Op::Call, argc);
    }

    /* shared pieces */

    /// Compiles a variable reference or, when allowed and an `=` follows,
    /// an assignment. Locals resolve to slots; everything else is a global.
    fn named_variable(&mut self, name: Token<'src>, can_assign: bool) {
        let (get_op, set_op, arg) = match self.resolve_local(name.lexeme) {
            Some(slot) => (Op::GetLocal, Op::SetLocal, slot),
            None => {
                let index = self.identifier_constant(name.lexeme);
                (Op::GetGlobal, Op::SetGlobal, index)
            }
        };

        if can_assign && self.match_token(TokenKind::Equal) {
            self.expression();
            self.emit_op_byte(set_op, arg);
        } else {
            self.emit_op_byte(get_op, arg);
        }
    }

    fn argument_list(&mut self) -> u8 {
        let mut count: u8 = 0;
        if !self.check(TokenKind::RightParen) {
            loop {
                self.expression();
                if count == u8::MAX {
                    self.error("Cannot have more than 255 arguments.");
                } else {
                    count += 1;
                }
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after arguments.");
        count
    }
}
