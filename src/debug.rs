// File: src/debug.rs
//
// Bytecode disassembler, gated by env vars the way `ruff/src/main.rs`
// gates its `DEBUG_AST` dump. `original_source/lox/src/debug.c` prints
// unconditionally whenever the caller asks for it; here the two knobs
// are `LOXIDE_PRINT_CODE` (dump a function's chunk once compiled) and
// `LOXIDE_TRACE_EXECUTION` (print the stack and the current
// instruction before each dispatch in the VM loop).

use crate::chunk::{Chunk, OpCode};
use crate::heap::Heap;
use crate::value::Value;

pub fn print_code_enabled() -> bool {
    std::env::var("LOXIDE_PRINT_CODE").is_ok()
}

pub fn trace_execution_enabled() -> bool {
    std::env::var("LOXIDE_TRACE_EXECUTION").is_ok()
}

/// Print every instruction in `chunk`, under a `== name ==` banner.
pub fn disassemble_chunk(chunk: &Chunk, name: &str, heap: &Heap) {
    eprintln!("== {} ==", name);
    let mut offset = 0;
    while offset < chunk.code.len() {
        offset = disassemble_instruction(chunk, offset, heap);
    }
}

/// Print one instruction at `offset`, returning the offset of the next one.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize, heap: &Heap) -> usize {
    eprint!("{:04} ", offset);
    let line = chunk.line_for_offset(offset);
    if offset > 0 && line == chunk.line_for_offset(offset - 1) {
        eprint!("   | ");
    } else {
        eprint!("{:4} ", line);
    }

    let op = OpCode::from_byte(chunk.code[offset]);
    match op {
        OpCode::Constant => constant_instruction("OP_CONSTANT", chunk, offset, heap),
        OpCode::GetGlobal => constant_instruction("OP_GET_GLOBAL", chunk, offset, heap),
        OpCode::DefineGlobal => constant_instruction("OP_DEFINE_GLOBAL", chunk, offset, heap),
        OpCode::SetGlobal => constant_instruction("OP_SET_GLOBAL", chunk, offset, heap),
        OpCode::GetProperty => constant_instruction("OP_GET_PROPERTY", chunk, offset, heap),
        OpCode::SetProperty => constant_instruction("OP_SET_PROPERTY", chunk, offset, heap),
        OpCode::GetSuper => constant_instruction("OP_GET_SUPER", chunk, offset, heap),
        OpCode::Class => constant_instruction("OP_CLASS", chunk, offset, heap),
        OpCode::Method => constant_instruction("OP_METHOD", chunk, offset, heap),
        OpCode::Nil => simple_instruction("OP_NIL", offset),
        OpCode::True => simple_instruction("OP_TRUE", offset),
        OpCode::False => simple_instruction("OP_FALSE", offset),
        OpCode::Pop => simple_instruction("OP_POP", offset),
        OpCode::Equal => simple_instruction("OP_EQUAL", offset),
        OpCode::Greater => simple_instruction("OP_GREATER", offset),
        OpCode::Less => simple_instruction("OP_LESS", offset),
        OpCode::Add => simple_instruction("OP_ADD", offset),
        OpCode::Subtract => simple_instruction("OP_SUBTRACT", offset),
        OpCode::Multiply => simple_instruction("OP_MULTIPLY", offset),
        OpCode::Divide => simple_instruction("OP_DIVIDE", offset),
        OpCode::Not => simple_instruction("OP_NOT", offset),
        OpCode::Negate => simple_instruction("OP_NEGATE", offset),
        OpCode::Print => simple_instruction("OP_PRINT", offset),
        OpCode::CloseUpvalue => simple_instruction("OP_CLOSE_UPVALUE", offset),
        OpCode::Return => simple_instruction("OP_RETURN", offset),
        OpCode::Inherit => simple_instruction("OP_INHERIT", offset),
        OpCode::GetLocal => byte_instruction("OP_GET_LOCAL", chunk, offset),
        OpCode::SetLocal => byte_instruction("OP_SET_LOCAL", chunk, offset),
        OpCode::GetUpvalue => byte_instruction("OP_GET_UPVALUE", chunk, offset),
        OpCode::SetUpvalue => byte_instruction("OP_SET_UPVALUE", chunk, offset),
        OpCode::Call => byte_instruction("OP_CALL", chunk, offset),
        OpCode::Jump => jump_instruction("OP_JUMP", 1, chunk, offset),
        OpCode::JumpIfFalse => jump_instruction("OP_JUMP_IF_FALSE", 1, chunk, offset),
        OpCode::Loop => jump_instruction("OP_LOOP", -1, chunk, offset),
        OpCode::Invoke => invoke_instruction("OP_INVOKE", chunk, offset, heap),
        OpCode::SuperInvoke => invoke_instruction("OP_SUPER_INVOKE", chunk, offset, heap),
        OpCode::Closure => closure_instruction(chunk, offset, heap),
    }
}

fn simple_instruction(name: &str, offset: usize) -> usize {
    eprintln!("{}", name);
    offset + 1
}

fn byte_instruction(name: &str, chunk: &Chunk, offset: usize) -> usize {
    let slot = chunk.code[offset + 1];
    eprintln!("{:-16} {:4}", name, slot);
    offset + 2
}

fn jump_instruction(name: &str, sign: i32, chunk: &Chunk, offset: usize) -> usize {
    let jump = chunk.read_u16(offset + 1) as i32;
    let target = offset as i32 + 3 + sign * jump;
    eprintln!("{:-16} {:4} -> {}", name, offset, target);
    offset + 3
}

fn constant_instruction(name: &str, chunk: &Chunk, offset: usize, heap: &Heap) -> usize {
    let ix = chunk.code[offset + 1];
    let value = chunk.constants[ix as usize];
    eprintln!("{:-16} {:4} '{}'", name, ix, heap.display(value));
    offset + 2
}

fn invoke_instruction(name: &str, chunk: &Chunk, offset: usize, heap: &Heap) -> usize {
    let ix = chunk.code[offset + 1];
    let argc = chunk.code[offset + 2];
    let value = chunk.constants[ix as usize];
    eprintln!("{:-16} ({} args) {:4} '{}'", name, argc, ix, heap.display(value));
    offset + 3
}

fn closure_instruction(chunk: &Chunk, offset: usize, heap: &Heap) -> usize {
    let mut offset = offset + 1;
    let ix = chunk.code[offset];
    offset += 1;
    let value = chunk.constants[ix as usize];
    eprintln!("{:-16} {:4} '{}'", "OP_CLOSURE", ix, heap.display(value));

    let upvalue_count = match value {
        Value::Obj(g) => match heap.get(g) {
            crate::heap::ObjKind::Function(f) => f.upvalue_count,
            _ => 0,
        },
        _ => 0,
    };
    for _ in 0..upvalue_count {
        let is_local = chunk.code[offset];
        let index = chunk.code[offset + 1];
        eprintln!(
            "{:04}      |                     {} {}",
            offset,
            if is_local != 0 { "local" } else { "upvalue" },
            index
        );
        offset += 2;
    }
    offset
}
