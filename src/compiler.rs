// File: src/compiler.rs
//
// Single-pass Pratt parser + bytecode emitter: tokens go directly to
// bytecode, no AST in between. Grounded on
// `original_source/lox/src/compiler.c`; `ruff/src/compiler.rs`'s
// `emit`/`add_constant`/jump-patching method shapes are kept, but
// `ruff`'s compiler consumed an AST its own `parser.rs` built first --
// that stage is removed entirely here since spec.md requires a
// tree-less compiler.

use crate::chunk::{Chunk, OpCode};
use crate::debug;
use crate::errors::format_parse_error;
use crate::heap::{FunctionObj, Gc, Heap};
use crate::scanner::{Scanner, Token, TokenKind};
use crate::value::Value;
use ahash::AHashMap;

const MAX_LOCALS: usize = 256;
const MAX_UPVALUES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
enum Precedence {
    None,
    Assignment, // =
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * /
    Unary,      // ! -
    Call,       // . ()
    Primary,
}

impl Precedence {
    fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call => Precedence::Primary,
            Precedence::Primary => Precedence::Primary,
        }
    }
}

fn precedence_of(kind: TokenKind) -> Precedence {
    use TokenKind::*;
    match kind {
        Minus | Plus => Precedence::Term,
        Slash | Star => Precedence::Factor,
        BangEqual | EqualEqual => Precedence::Equality,
        Greater | GreaterEqual | Less | LessEqual => Precedence::Comparison,
        And => Precedence::And,
        Or => Precedence::Or,
        LeftParen | Dot => Precedence::Call,
        _ => Precedence::None,
    }
}

#[derive(Clone, Copy, PartialEq)]
enum FunctionType {
    Script,
    Function,
    Method,
    Initializer,
}

struct Local<'src> {
    name: Token<'src>,
    depth: i32, // -1 means "declared but not yet initialized"
    is_captured: bool,
}

struct UpvalueInfo {
    index: u8,
    is_local: bool,
}

struct FunctionScope<'src> {
    fn_type: FunctionType,
    name: Option<Gc>,
    arity: usize,
    chunk: Chunk,
    locals: Vec<Local<'src>>,
    upvalues: Vec<UpvalueInfo>,
    scope_depth: i32,
    /// Cache of already-pooled identifier constants, keyed by interned
    /// string handle, so a name referenced many times in one function
    /// (a global, property, or method name) gets a single constant-pool
    /// slot. Mirrors `original_source/lox/src/compiler.c`'s
    /// `make_string_constant`, which looks the string up in a table
    /// before adding a fresh constant.
    string_constants: AHashMap<Gc, u8>,
}

impl<'src> FunctionScope<'src> {
    fn new(fn_type: FunctionType, name: Option<Gc>) -> Self {
        let receiver_name = if fn_type == FunctionType::Function { "" } else { "this" };
        let slot0 = Local {
            name: Token { kind: TokenKind::Identifier, lexeme: receiver_name, line: 0 },
            depth: 0,
            is_captured: false,
        };
        FunctionScope {
            fn_type,
            name,
            arity: 0,
            chunk: Chunk::new(),
            locals: vec![slot0],
            upvalues: Vec::new(),
            scope_depth: 0,
            string_constants: AHashMap::new(),
        }
    }
}

struct ClassScope {
    has_superclass: bool,
}

/// Result of popping a finished `FunctionScope`: the allocated object
/// plus the upvalue capture list the enclosing scope needs to emit
/// alongside its `Closure` instruction.
struct FinishedFunction {
    handle: Gc,
    upvalues: Vec<UpvalueInfo>,
}

pub struct Compiler<'src, 'h> {
    scanner: Scanner<'src>,
    previous: Token<'src>,
    current: Token<'src>,
    had_error: bool,
    panic_mode: bool,
    heap: &'h mut Heap,
    functions: Vec<FunctionScope<'src>>,
    classes: Vec<ClassScope>,
}

impl<'src, 'h> Compiler<'src, 'h> {
    /// Compile `source` into a top-level script `Function` object.
    /// Returns `Err(())` (diagnostics already on stderr) if any parse
    /// error occurred, matching clox's sentinel-failure contract.
    pub fn compile(source: &'src str, heap: &'h mut Heap) -> Result<Gc, ()> {
        let mut scanner = Scanner::new(source);
        let first = scanner.next_token();
        let mut compiler = Compiler {
            scanner,
            previous: first.clone(),
            current: first,
            had_error: false,
            panic_mode: false,
            heap,
            functions: vec![FunctionScope::new(FunctionType::Script, None)],
            classes: Vec::new(),
        };

        while !compiler.check(TokenKind::Eof) {
            compiler.declaration();
        }
        compiler.consume(TokenKind::Eof, "Expect end of expression.");

        let finished = compiler.pop_finished_function();
        if compiler.had_error {
            Err(())
        } else {
            Ok(finished.handle)
        }
    }

    // ---- token stream plumbing -----------------------------------------

    fn advance(&mut self) {
        self.previous = self.current.clone();
        loop {
            self.current = self.scanner.next_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            self.error_at_current(self.current.lexeme);
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    fn error_at_current(&mut self, message: &str) {
        let token = self.current.clone();
        self.error_at(&token, message);
    }

    fn error(&mut self, message: &str) {
        let token = self.previous.clone();
        self.error_at(&token, message);
    }

    fn error_at(&mut self, token: &Token<'src>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        eprintln!("{}", format_parse_error(token, message));
        self.had_error = true;
    }

    /// Skip tokens until a statement boundary, so a single parse error
    /// doesn't cascade into dozens of spurious follow-on diagnostics.
    fn synchronize(&mut self) {
        self.panic_mode = false;
        while self.current.kind != TokenKind::Eof {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            use TokenKind::*;
            match self.current.kind {
                Class | Fun | Var | For | If | While | Print | Return => return,
                _ => {}
            }
            self.advance();
        }
    }

    // ---- emission --------------------------------------------------------

    fn chunk(&mut self) -> &mut Chunk {
        &mut self.functions.last_mut().unwrap().chunk
    }

    fn line(&self) -> u32 {
        self.previous.line
    }

    fn emit_op(&mut self, op: OpCode) {
        let line = self.line();
        self.chunk().write_op(op, line);
    }

    fn emit_byte(&mut self, byte: u8) {
        let line = self.line();
        self.chunk().write(byte, line);
    }

    fn emit_ops(&mut self, a: OpCode, b: u8) {
        self.emit_op(a);
        self.emit_byte(b);
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        match self.chunk().add_constant(value) {
            Some(ix) => ix,
            None => {
                self.error("Too many constants in one function.");
                0
            }
        }
    }

    fn emit_constant(&mut self, value: Value) {
        let ix = self.make_constant(value);
        self.emit_ops(OpCode::Constant, ix);
    }

    /// Everything reachable from the in-progress compile: every enclosing
    /// function scope's name and already-emitted constant pool. An object
    /// handle is only ever held outside the arena for the few statements
    /// between `heap.intern`/`heap.alloc_function` and the `make_constant`
    /// call that pools it, and no collection point runs inside that
    /// window (see `collect_if_needed`), so this root set is always
    /// complete at the points it's actually consulted.
    fn compiler_roots(&self) -> Vec<Value> {
        let mut roots = Vec::new();
        for scope in &self.functions {
            if let Some(name) = scope.name {
                roots.push(Value::Obj(name));
            }
            roots.extend(scope.chunk.constants.iter().copied());
        }
        roots
    }

    /// Give the allocator a chance to run a collection between
    /// statements. `spec.md` §4.5 names "the active compiler chain" as
    /// a GC root; this is that root, exercised the same way `vm.rs`'s
    /// `collect_if_needed` exercises the VM's.
    fn collect_if_needed(&mut self) {
        let roots = self.compiler_roots();
        self.heap.maybe_collect(&roots);
    }

    fn identifier_constant(&mut self, name: &str) -> u8 {
        let handle = self.heap.intern(name);
        if let Some(&ix) = self.functions.last().unwrap().string_constants.get(&handle) {
            return ix;
        }
        let ix = self.make_constant(Value::Obj(handle));
        self.functions.last_mut().unwrap().string_constants.insert(handle, ix);
        ix
    }

    fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit_op(op);
        let line = self.line();
        let offset = self.chunk().code.len();
        self.chunk().write_u16(0xffff, line);
        offset
    }

    fn patch_jump(&mut self, offset: usize) {
        let jump_len = self.chunk().code.len() - offset - 2;
        if jump_len > u16::MAX as usize {
            self.error("Too much code to jump over.");
        }
        self.chunk().patch_u16(offset, jump_len as u16);
    }

    fn emit_loop(&mut self, loop_start: usize) {
        self.emit_op(OpCode::Loop);
        let line = self.line();
        let offset = self.chunk().code.len() + 2 - loop_start;
        if offset > u16::MAX as usize {
            self.error("Loop body too large.");
        }
        self.chunk().write_u16(offset as u16, line);
    }

    /// Emit the implicit trailing return every function gets, whether
    /// or not the body ended in an explicit `return` (spec.md §9's
    /// "acceptable" dead-code tail; see DESIGN.md).
    fn emit_implicit_return(&mut self) {
        if self.functions.last().unwrap().fn_type == FunctionType::Initializer {
            self.emit_ops(OpCode::GetLocal, 0);
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.emit_op(OpCode::Return);
    }

    /// Pop the current (just-finished) function scope and allocate its
    /// `Function` object. Does not touch the enclosing scope; callers
    /// decide whether that means "the program is done" (top level) or
    /// "emit a `Closure` instruction" (`finish_function`).
    fn pop_finished_function(&mut self) -> FinishedFunction {
        self.emit_implicit_return();
        let scope = self.functions.pop().unwrap();
        let upvalues = scope.upvalues;
        let func = FunctionObj {
            name: scope.name,
            // Already diagnosed as an error above 255 params; clamp so a
            // malformed program can't smuggle a truncated/wrapped arity
            // into the stored Function.
            arity: scope.arity.min(255) as u8,
            upvalue_count: upvalues.len() as u8,
            chunk: scope.chunk,
        };
        let handle = self.heap.alloc_function(func);
        if debug::print_code_enabled() {
            let name = scope.name.map(|n| self.heap.as_str(n).to_string());
            match self.heap.get(handle) {
                crate::heap::ObjKind::Function(f) => {
                    let chunk = f.chunk.clone();
                    debug::disassemble_chunk(
                        &chunk,
                        name.as_deref().unwrap_or("<script>"),
                        self.heap,
                    );
                }
                _ => unreachable!(),
            }
        }
        FinishedFunction { handle, upvalues }
    }

    /// Finish a non-top-level function: pop its scope and emit the
    /// enclosing `Closure` instruction with one `(is_local, index)`
    /// operand pair per captured upvalue.
    fn finish_function(&mut self) {
        let finished = self.pop_finished_function();
        let const_ix = self.make_constant(Value::Obj(finished.handle));
        self.emit_ops(OpCode::Closure, const_ix);
        for up in &finished.upvalues {
            self.emit_byte(if up.is_local { 1 } else { 0 });
            self.emit_byte(up.index);
        }
    }

    // ---- declarations ------------------------------------------------

    fn declaration(&mut self) {
        self.collect_if_needed();
        if self.matches(TokenKind::Class) {
            self.class_declaration();
        } else if self.matches(TokenKind::Fun) {
            self.fun_declaration();
        } else if self.matches(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }

        if self.panic_mode {
            self.synchronize();
        }
    }

    fn var_declaration(&mut self) {
        let global = self.parse_variable("Expect variable name.");

        if self.matches(TokenKind::Equal) {
            self.expression();
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.");

        self.define_variable(global);
    }

    fn fun_declaration(&mut self) {
        let global = self.parse_variable("Expect function name.");
        self.mark_initialized();
        self.function(FunctionType::Function);
        self.define_variable(global);
    }

    fn class_declaration(&mut self) {
        self.consume(TokenKind::Identifier, "Expect class name.");
        let class_name = self.previous.clone();
        let name_constant = self.identifier_constant(class_name.lexeme);
        self.declare_variable();

        self.emit_ops(OpCode::Class, name_constant);
        self.define_variable(name_constant);

        self.classes.push(ClassScope { has_superclass: false });

        if self.matches(TokenKind::Less) {
            self.consume(TokenKind::Identifier, "Expect superclass name.");
            self.variable(false);
            if class_name.lexeme == self.previous.lexeme {
                self.error("A class can't inherit from itself.");
            }

            self.begin_scope();
            self.add_local(Token { kind: TokenKind::Identifier, lexeme: "super", line: 0 });
            self.define_variable(0);

            self.named_variable(&class_name, false);
            self.emit_op(OpCode::Inherit);
            self.classes.last_mut().unwrap().has_superclass = true;
        }

        self.named_variable(&class_name, false);
        self.consume(TokenKind::LeftBrace, "Expect '{' before class body.");
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.method();
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after class body.");
        self.emit_op(OpCode::Pop); // the class itself

        if self.classes.pop().unwrap().has_superclass {
            self.end_scope();
        }
    }

    fn method(&mut self) {
        self.consume(TokenKind::Identifier, "Expect method name.");
        let name_tok = self.previous.clone();
        let constant = self.identifier_constant(name_tok.lexeme);

        let fn_type =
            if name_tok.lexeme == "init" { FunctionType::Initializer } else { FunctionType::Method };
        self.function(fn_type);
        self.emit_ops(OpCode::Method, constant);
    }

    // ---- statements --------------------------------------------------

    fn statement(&mut self) {
        if self.matches(TokenKind::Print) {
            self.print_statement();
        } else if self.matches(TokenKind::If) {
            self.if_statement();
        } else if self.matches(TokenKind::Return) {
            self.return_statement();
        } else if self.matches(TokenKind::While) {
            self.while_statement();
        } else if self.matches(TokenKind::For) {
            self.for_statement();
        } else if self.matches(TokenKind::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after value.");
        self.emit_op(OpCode::Print);
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.");
        self.emit_op(OpCode::Pop);
    }

    fn return_statement(&mut self) {
        if self.functions.last().unwrap().fn_type == FunctionType::Script {
            self.error("Can't return from top-level code.");
        }
        if self.matches(TokenKind::Semicolon) {
            self.emit_implicit_return();
        } else {
            if self.functions.last().unwrap().fn_type == FunctionType::Initializer {
                self.error("Can't return a value from an initializer.");
            }
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after return value.");
            self.emit_op(OpCode::Return);
        }
    }

    fn if_statement(&mut self) {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let then_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();

        let else_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(then_jump);
        self.emit_op(OpCode::Pop);

        if self.matches(TokenKind::Else) {
            self.statement();
        }
        self.patch_jump(else_jump);
    }

    fn while_statement(&mut self) {
        let loop_start = self.chunk().code.len();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let exit_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();
        self.emit_loop(loop_start);

        self.patch_jump(exit_jump);
        self.emit_op(OpCode::Pop);
    }

    fn for_statement(&mut self) {
        self.begin_scope();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.");
        if self.matches(TokenKind::Semicolon) {
            // no initializer
        } else if self.matches(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.expression_statement();
        }

        let mut loop_start = self.chunk().code.len();
        let mut exit_jump: Option<usize> = None;
        if !self.matches(TokenKind::Semicolon) {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.");
            exit_jump = Some(self.emit_jump(OpCode::JumpIfFalse));
            self.emit_op(OpCode::Pop);
        }

        if !self.matches(TokenKind::RightParen) {
            let body_jump = self.emit_jump(OpCode::Jump);
            let increment_start = self.chunk().code.len();
            self.expression();
            self.emit_op(OpCode::Pop);
            self.consume(TokenKind::RightParen, "Expect ')' after for clauses.");

            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.patch_jump(body_jump);
        }

        self.statement();
        self.emit_loop(loop_start);

        if let Some(exit) = exit_jump {
            self.patch_jump(exit);
            self.emit_op(OpCode::Pop);
        }

        self.end_scope();
    }

    fn block(&mut self) {
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.declaration();
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.");
    }

    // ---- scope / variables --------------------------------------------

    fn begin_scope(&mut self) {
        self.functions.last_mut().unwrap().scope_depth += 1;
    }

    fn end_scope(&mut self) {
        let scope = self.functions.last_mut().unwrap();
        scope.scope_depth -= 1;
        let depth = scope.scope_depth;
        let mut to_emit: Vec<bool> = Vec::new(); // true = close, false = pop
        while let Some(local) = scope.locals.last() {
            if local.depth <= depth {
                break;
            }
            to_emit.push(local.is_captured);
            scope.locals.pop();
        }
        for captured in to_emit {
            if captured {
                self.emit_op(OpCode::CloseUpvalue);
            } else {
                self.emit_op(OpCode::Pop);
            }
        }
    }

    fn parse_variable(&mut self, message: &str) -> u8 {
        self.consume(TokenKind::Identifier, message);
        self.declare_variable();
        if self.functions.last().unwrap().scope_depth > 0 {
            return 0; // locals aren't looked up by constant index
        }
        let name = self.previous.lexeme;
        self.identifier_constant(name)
    }

    fn declare_variable(&mut self) {
        if self.functions.last().unwrap().scope_depth == 0 {
            return;
        }
        let name = self.previous.clone();
        let depth = self.functions.last().unwrap().scope_depth;
        let mut clash = false;
        for local in self.functions.last().unwrap().locals.iter().rev() {
            if local.depth != -1 && local.depth < depth {
                break;
            }
            if local.name.lexeme == name.lexeme {
                clash = true;
                break;
            }
        }
        if clash {
            self.error("Already a variable with this name in this scope.");
            return;
        }
        self.add_local(name);
    }

    fn add_local(&mut self, name: Token<'src>) {
        let scope = self.functions.last_mut().unwrap();
        if scope.locals.len() >= MAX_LOCALS {
            self.error("Too many local variables in function.");
            return;
        }
        scope.locals.push(Local { name, depth: -1, is_captured: false });
    }

    fn mark_initialized(&mut self) {
        let scope = self.functions.last_mut().unwrap();
        if scope.scope_depth == 0 {
            return;
        }
        let depth = scope.scope_depth;
        scope.locals.last_mut().unwrap().depth = depth;
    }

    fn define_variable(&mut self, global: u8) {
        if self.functions.last().unwrap().scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        self.emit_ops(OpCode::DefineGlobal, global);
    }

    fn resolve_local(&mut self, level: usize, name: &str) -> Option<u8> {
        let scope = &self.functions[level];
        let mut found: Option<(usize, bool)> = None;
        for (i, local) in scope.locals.iter().enumerate().rev() {
            if local.name.lexeme == name {
                found = Some((i, local.depth == -1));
                break;
            }
        }
        match found {
            Some((i, uninitialized)) => {
                if uninitialized {
                    self.error("Can't read local variable in its own initializer.");
                }
                Some(i as u8)
            }
            None => None,
        }
    }

    fn add_upvalue(&mut self, level: usize, index: u8, is_local: bool) -> u8 {
        let scope = &mut self.functions[level];
        for (i, up) in scope.upvalues.iter().enumerate() {
            if up.index == index && up.is_local == is_local {
                return i as u8;
            }
        }
        if scope.upvalues.len() >= MAX_UPVALUES {
            self.error("Too many closure variables in function.");
            return 0;
        }
        scope.upvalues.push(UpvalueInfo { index, is_local });
        (scope.upvalues.len() - 1) as u8
    }

    fn resolve_upvalue(&mut self, level: usize, name: &str) -> Option<u8> {
        if level == 0 {
            return None;
        }
        if let Some(local_idx) = self.resolve_local(level - 1, name) {
            self.functions[level - 1].locals[local_idx as usize].is_captured = true;
            return Some(self.add_upvalue(level, local_idx, true));
        }
        if let Some(up_idx) = self.resolve_upvalue(level - 1, name) {
            return Some(self.add_upvalue(level, up_idx, false));
        }
        None
    }

    // ---- functions -----------------------------------------------------

    fn function(&mut self, fn_type: FunctionType) {
        let name_tok = self.previous.clone();
        let name_handle = self.heap.intern(name_tok.lexeme);
        self.functions.push(FunctionScope::new(fn_type, Some(name_handle)));
        self.begin_scope();

        self.consume(TokenKind::LeftParen, "Expect '(' after function name.");
        if !self.check(TokenKind::RightParen) {
            loop {
                let too_many = {
                    let scope = self.functions.last_mut().unwrap();
                    scope.arity += 1;
                    scope.arity > 255
                };
                if too_many {
                    self.error_at_current("Can't have more than 255 parameters.");
                }
                let constant = self.parse_variable("Expect parameter name.");
                self.define_variable(constant);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.");
        self.consume(TokenKind::LeftBrace, "Expect '{' before function body.");
        self.block();

        self.finish_function();
    }

    // ---- expressions (Pratt parser) ------------------------------------

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let can_assign = precedence <= Precedence::Assignment;
        if !self.prefix(self.previous.kind, can_assign) {
            self.error("Expect expression.");
            return;
        }

        while precedence <= precedence_of(self.current.kind) {
            self.advance();
            self.infix(self.previous.kind, can_assign);
        }

        if can_assign && self.matches(TokenKind::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    fn prefix(&mut self, kind: TokenKind, can_assign: bool) -> bool {
        use TokenKind::*;
        match kind {
            LeftParen => self.grouping(),
            Minus | Bang => self.unary(),
            Number => self.number(),
            String => self.string(),
            Identifier => self.variable(can_assign),
            Nil | True | False => self.literal(),
            This => self.this_expr(),
            Super => self.super_expr(),
            _ => return false,
        }
        true
    }

    fn infix(&mut self, kind: TokenKind, can_assign: bool) {
        use TokenKind::*;
        match kind {
            Minus | Plus | Slash | Star | BangEqual | EqualEqual | Greater | GreaterEqual
            | Less | LessEqual => self.binary(),
            And => self.and(),
            Or => self.or(),
            LeftParen => self.call(),
            Dot => self.dot(can_assign),
            _ => {}
        }
    }

    fn grouping(&mut self) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    fn number(&mut self) {
        let n: f64 = self.previous.lexeme.parse().unwrap_or(0.0);
        self.emit_constant(Value::Number(n));
    }

    fn string(&mut self) {
        // Lexeme includes the surrounding quotes; clox copies the
        // inner bytes verbatim with no escape processing.
        let lexeme = self.previous.lexeme;
        let inner = &lexeme[1..lexeme.len() - 1];
        let handle = self.heap.intern(inner);
        self.emit_constant(Value::Obj(handle));
    }

    fn literal(&mut self) {
        match self.previous.kind {
            TokenKind::Nil => self.emit_op(OpCode::Nil),
            TokenKind::True => self.emit_op(OpCode::True),
            TokenKind::False => self.emit_op(OpCode::False),
            _ => unreachable!(),
        }
    }

    fn unary(&mut self) {
        let op_kind = self.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match op_kind {
            TokenKind::Minus => self.emit_op(OpCode::Negate),
            TokenKind::Bang => self.emit_op(OpCode::Not),
            _ => unreachable!(),
        }
    }

    fn binary(&mut self) {
        let op_kind = self.previous.kind;
        let prec = precedence_of(op_kind);
        self.parse_precedence(prec.next());
        match op_kind {
            TokenKind::Plus => self.emit_op(OpCode::Add),
            TokenKind::Minus => self.emit_op(OpCode::Subtract),
            TokenKind::Star => self.emit_op(OpCode::Multiply),
            TokenKind::Slash => self.emit_op(OpCode::Divide),
            TokenKind::BangEqual => {
                self.emit_op(OpCode::Equal);
                self.emit_op(OpCode::Not);
            }
            TokenKind::EqualEqual => self.emit_op(OpCode::Equal),
            TokenKind::Greater => self.emit_op(OpCode::Greater),
            TokenKind::GreaterEqual => {
                self.emit_op(OpCode::Less);
                self.emit_op(OpCode::Not);
            }
            TokenKind::Less => self.emit_op(OpCode::Less),
            TokenKind::LessEqual => {
                self.emit_op(OpCode::Greater);
                self.emit_op(OpCode::Not);
            }
            _ => unreachable!(),
        }
    }

    fn and(&mut self) {
        let end_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::And);
        self.patch_jump(end_jump);
    }

    fn or(&mut self) {
        let else_jump = self.emit_jump(OpCode::JumpIfFalse);
        let end_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(else_jump);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::Or);
        self.patch_jump(end_jump);
    }

    fn call(&mut self) {
        let argc = self.argument_list();
        self.emit_ops(OpCode::Call, argc);
    }

    fn argument_list(&mut self) -> u8 {
        let mut argc: u32 = 0;
        if !self.check(TokenKind::RightParen) {
            loop {
                self.expression();
                if argc == 255 {
                    self.error("Can't have more than 255 arguments.");
                }
                argc += 1;
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after arguments.");
        argc as u8
    }

    fn dot(&mut self, can_assign: bool) {
        self.consume(TokenKind::Identifier, "Expect property name after '.'.");
        let name = self.previous.lexeme;
        let constant = self.identifier_constant(name);

        if can_assign && self.matches(TokenKind::Equal) {
            self.expression();
            self.emit_ops(OpCode::SetProperty, constant);
        } else if self.matches(TokenKind::LeftParen) {
            let argc = self.argument_list();
            self.emit_ops(OpCode::Invoke, constant);
            self.emit_byte(argc);
        } else {
            self.emit_ops(OpCode::GetProperty, constant);
        }
    }

    fn variable(&mut self, can_assign: bool) {
        let name = self.previous.clone();
        self.named_variable(&name, can_assign);
    }

    fn named_variable(&mut self, name: &Token<'src>, can_assign: bool) {
        let level = self.functions.len() - 1;
        let (get_op, set_op, slot) = if let Some(idx) = self.resolve_local(level, name.lexeme) {
            (OpCode::GetLocal, OpCode::SetLocal, idx)
        } else if let Some(idx) = self.resolve_upvalue(level, name.lexeme) {
            (OpCode::GetUpvalue, OpCode::SetUpvalue, idx)
        } else {
            let idx = self.identifier_constant(name.lexeme);
            (OpCode::GetGlobal, OpCode::SetGlobal, idx)
        };

        if can_assign && self.matches(TokenKind::Equal) {
            self.expression();
            self.emit_ops(set_op, slot);
        } else {
            self.emit_ops(get_op, slot);
        }
    }

    fn this_expr(&mut self) {
        if self.classes.is_empty() {
            self.error("Can't use 'this' outside of a class.");
            return;
        }
        let tok = Token { kind: TokenKind::This, lexeme: "this", line: self.previous.line };
        self.named_variable(&tok, false);
    }

    fn super_expr(&mut self) {
        if self.classes.is_empty() {
            self.error("Can't use 'super' outside of a class.");
        } else if !self.classes.last().unwrap().has_superclass {
            self.error("Can't use 'super' in a class with no superclass.");
        }

        self.consume(TokenKind::Dot, "Expect '.' after 'super'.");
        self.consume(TokenKind::Identifier, "Expect superclass method name.");
        let name = self.previous.lexeme;
        let constant = self.identifier_constant(name);

        let this_tok = Token { kind: TokenKind::This, lexeme: "this", line: self.previous.line };
        let super_tok = Token { kind: TokenKind::Super, lexeme: "super", line: self.previous.line };

        self.named_variable(&this_tok, false);
        if self.matches(TokenKind::LeftParen) {
            let argc = self.argument_list();
            self.named_variable(&super_tok, false);
            self.emit_ops(OpCode::SuperInvoke, constant);
            self.emit_byte(argc);
        } else {
            self.named_variable(&super_tok, false);
            self.emit_ops(OpCode::GetSuper, constant);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::{Heap, ObjKind};

    #[test]
    fn compiles_trivial_script() {
        let mut heap = Heap::new();
        let result = Compiler::compile("print 1 + 2;", &mut heap);
        assert!(result.is_ok());
    }

    #[test]
    fn reports_parse_error_for_bad_syntax() {
        let mut heap = Heap::new();
        let result = Compiler::compile("var = ;", &mut heap);
        assert!(result.is_err());
    }

    #[test]
    fn function_body_captures_its_own_constant() {
        let mut heap = Heap::new();
        let script = Compiler::compile("fun f(a, b) { return a + b; } print f;", &mut heap).unwrap();
        match heap.get(script) {
            ObjKind::Function(func) => {
                let found_closure_const =
                    func.chunk.constants.iter().any(|v| matches!(v, Value::Obj(_)));
                assert!(found_closure_const);
            }
            _ => panic!("expected function"),
        }
    }

    #[test]
    fn invalid_assignment_target_is_an_error() {
        let mut heap = Heap::new();
        let result = Compiler::compile("1 + 2 = 3;", &mut heap);
        assert!(result.is_err());
    }

    #[test]
    fn class_with_self_inheritance_is_an_error() {
        let mut heap = Heap::new();
        let result = Compiler::compile("class Oops < Oops {}", &mut heap);
        assert!(result.is_err());
    }
}
