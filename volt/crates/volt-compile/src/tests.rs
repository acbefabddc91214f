use volt_core::{FunId, Heap, Obj, Op, Value};

use crate::compile;

fn compile_ok(source: &str) -> (Heap, FunId) {
    let mut heap = Heap::new();
    let fun = compile(source, &mut heap).expect("program should compile");
    (heap, fun)
}

fn compile_err(source: &str) -> bool {
    let mut heap = Heap::new();
    compile(source, &mut heap).is_err()
}

fn op(o: Op) -> u8 {
    o.into()
}

#[test]
fn test_empty_program() {
    let (heap, fun) = compile_ok("");
    let function = heap.function(fun);
    assert_eq!(function.arity, 0);
    assert_eq!(function.name, None);
    assert_eq!(function.chunk.code, vec![op(Op::Nil), op(Op::Return)]);
}

#[test]
fn test_arithmetic_precedence() {
    // Multiplication binds tighter, so the product compiles first.
    let (heap, fun) = compile_ok("print 1 + 2 * 3;");
    assert_eq!(
        heap.function(fun).chunk.code,
        vec![
            op(Op::LoadConst),
            0,
            op(Op::LoadConst),
            1,
            op(Op::LoadConst),
            2,
            op(Op::Multiply),
            op(Op::Add),
            op(Op::Print),
            op(Op::Nil),
            op(Op::Return),
        ]
    );
    assert_eq!(
        heap.function(fun).chunk.constants,
        vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]
    );
}

#[test]
fn test_negative_comparisons_compile_to_pairs() {
    let (heap, fun) = compile_ok("print 1 != 2;");
    let code = &heap.function(fun).chunk.code;
    assert_eq!(
        &code[4..6],
        &[op(Op::LogicEqual), op(Op::LogicNot)],
        "!= is EQUAL then NOT"
    );

    let (heap, fun) = compile_ok("print 1 >= 2;");
    let code = &heap.function(fun).chunk.code;
    assert_eq!(&code[4..6], &[op(Op::LogicLess), op(Op::LogicNot)]);

    let (heap, fun) = compile_ok("print 1 <= 2;");
    let code = &heap.function(fun).chunk.code;
    assert_eq!(&code[4..6], &[op(Op::LogicGreater), op(Op::LogicNot)]);
}

#[test]
fn test_global_names_share_an_interned_string() {
    let (heap, fun) = compile_ok("var x = 42; print x;");
    let chunk = &heap.function(fun).chunk;
    assert_eq!(
        chunk.code,
        vec![
            op(Op::LoadConst),
            1,
            op(Op::DefineGlobal),
            0,
            op(Op::GetGlobal),
            2,
            op(Op::Print),
            op(Op::Nil),
            op(Op::Return),
        ]
    );
    // Two pool entries for "x", but one interned string behind them.
    assert_eq!(chunk.constants[0], chunk.constants[2]);
    match chunk.constants[0] {
        Value::Obj(Obj::Str(id)) => assert_eq!(heap.str_text(id), "x"),
        other => panic!("expected string constant, got {other:?}"),
    }
}

#[test]
fn test_local_slots_and_scope_pops() {
    let (heap, fun) = compile_ok("{ var a = 1; print a; }");
    assert_eq!(
        heap.function(fun).chunk.code,
        vec![
            op(Op::LoadConst),
            0,
            op(Op::GetLocal),
            1, // slot 0 is the function itself
            op(Op::Print),
            op(Op::Pop),
            op(Op::Nil),
            op(Op::Return),
        ]
    );
}

#[test]
fn test_multiple_locals_pop_with_popn() {
    let (heap, fun) = compile_ok("{ var a = 1; var b = 2; }");
    assert_eq!(
        heap.function(fun).chunk.code,
        vec![
            op(Op::LoadConst),
            0,
            op(Op::LoadConst),
            1,
            op(Op::PopN),
            2,
            op(Op::Nil),
            op(Op::Return),
        ]
    );
}

#[test]
fn test_var_without_initializer_defaults_nil() {
    let (heap, fun) = compile_ok("var a;");
    assert_eq!(
        heap.function(fun).chunk.code,
        vec![
            op(Op::Nil),
            op(Op::DefineGlobal),
            0,
            op(Op::Nil),
            op(Op::Return),
        ]
    );
}

#[test]
fn test_if_else_shape() {
    let (heap, fun) = compile_ok("if (true) print 1; else print 2;");
    assert_eq!(
        heap.function(fun).chunk.code,
        vec![
            op(Op::True),
            op(Op::JumpIfFalse),
            0,
            7, // over then-branch onto the else-side pop
            op(Op::Pop),
            op(Op::LoadConst),
            0,
            op(Op::Print),
            op(Op::Jump),
            0,
            4, // over the else branch
            op(Op::Pop),
            op(Op::LoadConst),
            1,
            op(Op::Print),
            op(Op::Nil),
            op(Op::Return),
        ]
    );
}

#[test]
fn test_and_short_circuit_shape() {
    let (heap, fun) = compile_ok("print true and false;");
    assert_eq!(
        heap.function(fun).chunk.code,
        vec![
            op(Op::True),
            op(Op::JumpIfFalse),
            0,
            2,
            op(Op::Pop),
            op(Op::False),
            op(Op::Print),
            op(Op::Nil),
            op(Op::Return),
        ]
    );
}

#[test]
fn test_or_uses_jump_if_true() {
    let (heap, fun) = compile_ok("print false or true;");
    let code = &heap.function(fun).chunk.code;
    assert_eq!(code[1], op(Op::JumpIfTrue));
}

#[test]
fn test_while_emits_backward_loop() {
    let (heap, fun) = compile_ok("while (false) print 1;");
    let code = &heap.function(fun).chunk.code;
    // False; JumpIfFalse over body and loop; Pop; body; Loop back; Pop.
    assert_eq!(
        code,
        &vec![
            op(Op::False),
            op(Op::JumpIfFalse),
            0,
            7,
            op(Op::Pop),
            op(Op::LoadConst),
            0,
            op(Op::Print),
            op(Op::Loop),
            0,
            11,
            op(Op::Pop),
            op(Op::Nil),
            op(Op::Return),
        ]
    );
}

#[test]
fn test_function_declaration() {
    let (heap, fun) = compile_ok("fun add(a, b) { return a + b; }");
    let script = &heap.function(fun).chunk;

    // constants: [0] the name "add", [1] the function object
    let Value::Obj(Obj::Fun(inner)) = script.constants[1] else {
        panic!("expected function constant");
    };
    let function = heap.function(inner);
    assert_eq!(function.arity, 2);
    assert_eq!(function.name.map(|n| heap.str_text(n)), Some("add"));

    // Parameters land in slots 1 and 2; the explicit return skips the
    // implicit nil-return tail but the tail is still emitted.
    assert_eq!(
        function.chunk.code,
        vec![
            op(Op::GetLocal),
            1,
            op(Op::GetLocal),
            2,
            op(Op::Add),
            op(Op::Return),
            op(Op::Nil),
            op(Op::Return),
        ]
    );

    assert_eq!(
        script.code,
        vec![
            op(Op::LoadConst),
            1,
            op(Op::DefineGlobal),
            0,
            op(Op::Nil),
            op(Op::Return),
        ]
    );
}

#[test]
fn test_call_with_arguments() {
    let (heap, fun) = compile_ok("f(1, 2, 3);");
    let code = &heap.function(fun).chunk.code;
    // GetGlobal f; three constants; Call 3; Pop.
    assert_eq!(code[code.len() - 5], op(Op::Call));
    assert_eq!(code[code.len() - 4], 3);
    assert_eq!(code[code.len() - 3], op(Op::Pop));
}

#[test]
fn test_compiling_twice_is_deterministic() {
    let source = "var a = 1; { var b = a; print b + 2; } fun f(x) { return x; }";
    let mut heap = Heap::new();
    let first = compile(source, &mut heap).expect("first compile");
    let second = compile(source, &mut heap).expect("second compile");

    let a = heap.function(first);
    let b = heap.function(second);
    assert_eq!(a.chunk.code, b.chunk.code);
    // Constant pools match except for the nested function handles, which
    // are fresh objects each time.
    assert_eq!(a.chunk.constants.len(), b.chunk.constants.len());
    for (x, y) in a.chunk.constants.iter().zip(&b.chunk.constants) {
        match (x, y) {
            (Value::Obj(Obj::Fun(_)), Value::Obj(Obj::Fun(_))) => {}
            _ => assert_eq!(x, y),
        }
    }
}

#[test]
fn test_line_numbers_follow_tokens() {
    let (heap, fun) = compile_ok("print\n  1;");
    let chunk = &heap.function(fun).chunk;
    // The constant load carries the number's line.
    assert_eq!(chunk.line_at(0), 2);
}

/* error cases */

#[test]
fn test_error_missing_semicolon() {
    assert!(compile_err("print 1"));
}

#[test]
fn test_error_expect_expression() {
    assert!(compile_err("print ;"));
    assert!(compile_err("var x = ;"));
}

#[test]
fn test_error_unterminated_string() {
    assert!(compile_err("print \"abc"));
}

#[test]
fn test_error_invalid_assignment_target() {
    assert!(compile_err("1 + 2 = 3;"));
    assert!(compile_err("a + b = c;"));
}

#[test]
fn test_error_own_initializer() {
    assert!(compile_err("{ var x = x; }"));
}

#[test]
fn test_error_redeclaration_in_same_scope() {
    assert!(compile_err("{ var a = 1; var a = 2; }"));
    // Shadowing in an inner scope is fine.
    assert!(!compile_err("{ var a = 1; { var a = 2; } }"));
}

#[test]
fn test_error_return_at_top_level() {
    assert!(compile_err("return 1;"));
    assert!(!compile_err("fun f() { return 1; }"));
}

#[test]
fn test_error_reserved_words_have_no_rules() {
    // class/super/this/for scan as keywords but have no grammar here.
    assert!(compile_err("class Foo {}"));
    assert!(compile_err("print this;"));
    assert!(compile_err("for (;;) print 1;"));
}

#[test]
fn test_error_too_many_constants() {
    let source: String = (0..=256).map(|i| format!("print {i};")).collect();
    assert!(compile_err(&source));
}

#[test]
fn test_error_too_many_locals() {
    let mut source = String::from("{");
    for i in 0..256 {
        source.push_str(&format!("var v{i} = 0;"));
    }
    source.push('}');
    assert!(compile_err(&source));

    // One fewer fits.
    let mut source = String::from("{");
    for i in 0..255 {
        source.push_str(&format!("var v{i} = 0;"));
    }
    source.push('}');
    assert!(!compile_err(&source));
}

#[test]
fn test_error_jump_too_long() {
    // "print true;" is two bytes of body; enough repetitions push the
    // while-exit jump past 16 bits.
    let body = "print true;".repeat(33000);
    let source = format!("while (true) {{ {body} }}");
    assert!(compile_err(&source));
}

#[test]
fn test_error_recovery_keeps_parsing() {
    // The error in the first statement must not prevent the second from
    // being parsed (it still poisons the result).
    assert!(compile_err("var = 1; print 2;"));
}
