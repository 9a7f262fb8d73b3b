// File: src/vm.rs
//
// The bytecode VM: fetch/decode/execute loop, call frames, upvalue
// closing, class/instance dispatch. Mirrors
// `original_source/lox/src/vm.c`'s `run` function and its call-site
// helpers (`callValue`, `invoke`, `invokeFromClass`, `bindMethod`)
// closely; `ruff/src/vm.rs` contributed the overall `CallFrame`/
// dispatch-loop shape (a `Vec<CallFrame>` plus a flat value stack)
// since that's the idiomatic Rust rendering of clox's frame array.

use crate::chunk::OpCode;
use crate::compiler::Compiler;
use crate::debug;
use crate::errors::{format_runtime_error, FrameTrace};
use crate::heap::{
    BoundMethodObj, ClassObj, ClosureObj, Gc, Heap, InstanceObj, NativeObj, ObjKind, UpvalueState,
};
use crate::native;
use crate::table::Table;
use crate::value::{values_equal, Value};

const FRAMES_MAX: usize = 64;

#[derive(Debug, PartialEq, Eq)]
pub enum InterpretResult {
    Ok,
    CompileError,
    RuntimeError,
}

struct CallFrame {
    closure: Gc,
    ip: usize,
    base: usize,
}

pub struct Vm {
    heap: Heap,
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    globals: Table<Value>,
    init_string: Gc,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        let mut heap = Heap::new();
        let mut globals = Table::new();
        for &(name, arity, func) in native::builtins() {
            let name_handle = heap.intern(name);
            let native_handle =
                heap.alloc_native(NativeObj { name: name_handle, arity: Some(arity), func });
            globals.set(name_handle, Value::Obj(native_handle));
        }
        let init_string = heap.intern("init");
        Vm { heap, stack: Vec::new(), frames: Vec::new(), globals, init_string }
    }

    pub fn interpret(&mut self, source: &str) -> InterpretResult {
        let function = match Compiler::compile(source, &mut self.heap) {
            Ok(f) => f,
            Err(()) => return InterpretResult::CompileError,
        };
        let closure = self.heap.alloc_closure(ClosureObj { function, upvalues: Vec::new() });
        self.stack.push(Value::Obj(closure));
        if let Err(msg) = self.call_closure(closure, 0) {
            return self.runtime_error(&msg);
        }
        self.run()
    }

    // ---- stack helpers -------------------------------------------------

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().expect("stack underflow")
    }

    fn peek(&self, back: usize) -> Value {
        self.stack[self.stack.len() - 1 - back]
    }

    fn current_frame_closure(&self) -> Gc {
        self.frames.last().expect("no active frame").closure
    }

    fn current_frame_base(&self) -> usize {
        self.frames.last().expect("no active frame").base
    }

    fn read_byte(&mut self) -> u8 {
        let frame = self.frames.last_mut().expect("no active frame");
        let closure = frame.closure;
        let ip = frame.ip;
        frame.ip += 1;
        let function = match self.heap.get(closure) {
            ObjKind::Closure(c) => c.function,
            _ => unreachable!(),
        };
        match self.heap.get(function) {
            ObjKind::Function(f) => f.chunk.code[ip],
            _ => unreachable!(),
        }
    }

    fn read_u16(&mut self) -> u16 {
        let hi = self.read_byte() as u16;
        let lo = self.read_byte() as u16;
        (hi << 8) | lo
    }

    fn read_constant(&mut self, index: u8) -> Value {
        let closure = self.current_frame_closure();
        let function = match self.heap.get(closure) {
            ObjKind::Closure(c) => c.function,
            _ => unreachable!(),
        };
        match self.heap.get(function) {
            ObjKind::Function(f) => f.chunk.constants[index as usize],
            _ => unreachable!(),
        }
    }

    fn jump_forward(&mut self, offset: u16) {
        self.frames.last_mut().unwrap().ip += offset as usize;
    }

    fn jump_backward(&mut self, offset: u16) {
        self.frames.last_mut().unwrap().ip -= offset as usize;
    }

    fn is_string(&self, g: Gc) -> bool {
        matches!(self.heap.get(g), ObjKind::Str(_))
    }

    fn trace_if_enabled(&self) {
        if !debug::trace_execution_enabled() {
            return;
        }
        let stack: Vec<String> = self.stack.iter().map(|v| format!("[ {} ]", self.heap.display(*v))).collect();
        eprint!("          {}\n", stack.concat());
        let frame = self.frames.last().unwrap();
        match self.heap.get(frame.closure) {
            ObjKind::Closure(c) => match self.heap.get(c.function) {
                ObjKind::Function(f) => {
                    debug::disassemble_instruction(&f.chunk, frame.ip, &self.heap);
                }
                _ => unreachable!(),
            },
            _ => unreachable!(),
        }
    }

    // ---- allocation / GC ------------------------------------------------

    fn roots(&self) -> Vec<Value> {
        let mut roots = self.stack.clone();
        for (key, value) in self.globals.iter() {
            roots.push(Value::Obj(key));
            roots.push(*value);
        }
        for frame in &self.frames {
            roots.push(Value::Obj(frame.closure));
        }
        roots.push(Value::Obj(self.init_string));
        roots
    }

    fn collect_if_needed(&mut self) {
        let roots = self.roots();
        self.heap.maybe_collect(&roots);
    }

    // ---- errors -----------------------------------------------------

    fn runtime_error(&mut self, message: &str) -> InterpretResult {
        let mut trace = Vec::new();
        for frame in self.frames.iter().rev() {
            let function = match self.heap.get(frame.closure) {
                ObjKind::Closure(c) => c.function,
                _ => unreachable!(),
            };
            match self.heap.get(function) {
                ObjKind::Function(f) => {
                    let line = f.chunk.line_for_offset(frame.ip.saturating_sub(1));
                    let name = match f.name {
                        Some(n) => self.heap.as_str(n).to_string(),
                        None => "script".to_string(),
                    };
                    trace.push(FrameTrace { name, line });
                }
                _ => unreachable!(),
            }
        }
        eprintln!("{}", format_runtime_error(message, &trace));
        self.stack.clear();
        self.frames.clear();
        InterpretResult::RuntimeError
    }

    // ---- call dispatch ------------------------------------------------

    fn call_closure(&mut self, closure: Gc, argc: u8) -> Result<(), String> {
        let function = match self.heap.get(closure) {
            ObjKind::Closure(c) => c.function,
            _ => unreachable!(),
        };
        let arity = match self.heap.get(function) {
            ObjKind::Function(f) => f.arity,
            _ => unreachable!(),
        };
        if argc != arity {
            return Err(format!("Expected {} arguments but got {}.", arity, argc));
        }
        if self.frames.len() >= FRAMES_MAX {
            return Err("Stack overflow.".to_string());
        }
        let base = self.stack.len() - argc as usize - 1;
        self.frames.push(CallFrame { closure, ip: 0, base });
        Ok(())
    }

    fn call_native(&mut self, native: Gc, argc: u8) -> Result<(), String> {
        let (arity, func) = match self.heap.get(native) {
            ObjKind::Native(n) => (n.arity, n.func),
            _ => unreachable!(),
        };
        if let Some(expected) = arity {
            if expected != argc {
                return Err(format!("Expected {} arguments but got {}.", expected, argc));
            }
        }
        let start = self.stack.len() - argc as usize;
        let result = func(&self.stack[start..])?;
        self.stack.truncate(start - 1);
        self.push(result);
        Ok(())
    }

    fn construct(&mut self, class: Gc, argc: u8) -> Result<(), String> {
        let instance = self.heap.alloc_instance(InstanceObj { class, fields: Table::new() });
        let slot = self.stack.len() - argc as usize - 1;
        self.stack[slot] = Value::Obj(instance);
        self.collect_if_needed();

        let init = match self.heap.get(class) {
            ObjKind::Class(c) => c.methods.get(self.init_string),
            _ => unreachable!(),
        };
        match init {
            Some(Value::Obj(m)) => self.call_closure(m, argc),
            Some(_) => unreachable!("method table holds only closures"),
            None if argc == 0 => Ok(()),
            None => Err(format!("Expected 0 arguments but got {}.", argc)),
        }
    }

    fn bind_method(&mut self, class: Gc, name: Gc) -> Result<(), String> {
        let method = match self.heap.get(class) {
            ObjKind::Class(c) => c.methods.get(name),
            _ => unreachable!(),
        };
        let m = match method {
            Some(Value::Obj(m)) => m,
            _ => return Err(format!("Undefined property '{}'.", self.heap.as_str(name))),
        };
        let receiver = self.pop();
        let bound = self.heap.alloc_bound_method(BoundMethodObj { receiver, method: m });
        self.push(Value::Obj(bound));
        self.collect_if_needed();
        Ok(())
    }

    fn invoke_from_class(&mut self, class: Gc, name: Gc, argc: u8) -> Result<(), String> {
        let method = match self.heap.get(class) {
            ObjKind::Class(c) => c.methods.get(name),
            _ => unreachable!(),
        };
        match method {
            Some(Value::Obj(m)) => self.call_closure(m, argc),
            _ => Err(format!("Undefined property '{}'.", self.heap.as_str(name))),
        }
    }

    fn invoke(&mut self, name: Gc, argc: u8) -> Result<(), String> {
        let receiver = self.peek(argc as usize);
        let instance = match receiver {
            Value::Obj(g) if matches!(self.heap.get(g), ObjKind::Instance(_)) => g,
            _ => return Err("Only instances have methods.".to_string()),
        };
        let field = match self.heap.get(instance) {
            ObjKind::Instance(i) => i.fields.get(name),
            _ => unreachable!(),
        };
        if let Some(value) = field {
            let slot = self.stack.len() - argc as usize - 1;
            self.stack[slot] = value;
            return self.call_value(value, argc);
        }
        let class = match self.heap.get(instance) {
            ObjKind::Instance(i) => i.class,
            _ => unreachable!(),
        };
        self.invoke_from_class(class, name, argc)
    }

    fn call_value(&mut self, callee: Value, argc: u8) -> Result<(), String> {
        let g = match callee {
            Value::Obj(g) => g,
            _ => return Err("Can only call functions and classes.".to_string()),
        };
        match self.heap.get(g) {
            ObjKind::Closure(_) => self.call_closure(g, argc),
            ObjKind::Native(_) => self.call_native(g, argc),
            ObjKind::Class(_) => self.construct(g, argc),
            ObjKind::BoundMethod(b) => {
                let method = b.method;
                let receiver = b.receiver;
                let slot = self.stack.len() - argc as usize - 1;
                self.stack[slot] = receiver;
                self.call_closure(method, argc)
            }
            _ => Err("Can only call functions and classes.".to_string()),
        }
    }

    // ---- arithmetic helpers ---------------------------------------------

    fn numeric_binary(&mut self, f: impl Fn(f64, f64) -> f64) -> Result<(), String> {
        let b = self.peek(0);
        let a = self.peek(1);
        match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => {
                self.pop();
                self.pop();
                self.push(Value::Number(f(x, y)));
                Ok(())
            }
            _ => Err("Operands must be numbers.".to_string()),
        }
    }

    fn numeric_compare(&mut self, f: impl Fn(f64, f64) -> bool) -> Result<(), String> {
        let b = self.peek(0);
        let a = self.peek(1);
        match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => {
                self.pop();
                self.pop();
                self.push(Value::Bool(f(x, y)));
                Ok(())
            }
            _ => Err("Operands must be numbers.".to_string()),
        }
    }

    fn add(&mut self) -> Result<(), String> {
        let b = self.peek(0);
        let a = self.peek(1);
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => {
                self.pop();
                self.pop();
                self.push(Value::Number(x + y));
                Ok(())
            }
            (Value::Obj(ga), Value::Obj(gb)) if self.is_string(ga) && self.is_string(gb) => {
                let joined = format!("{}{}", self.heap.as_str(ga), self.heap.as_str(gb));
                self.pop();
                self.pop();
                let handle = self.heap.intern(&joined);
                self.push(Value::Obj(handle));
                self.collect_if_needed();
                Ok(())
            }
            _ => Err("Operands must be two numbers or two strings.".to_string()),
        }
    }

    // ---- main loop --------------------------------------------------------

    fn run(&mut self) -> InterpretResult {
        loop {
            self.trace_if_enabled();
            let op = OpCode::from_byte(self.read_byte());
            match op {
                OpCode::Constant => {
                    let ix = self.read_byte();
                    let v = self.read_constant(ix);
                    self.push(v);
                }
                OpCode::Nil => self.push(Value::Nil),
                OpCode::True => self.push(Value::Bool(true)),
                OpCode::False => self.push(Value::Bool(false)),
                OpCode::Pop => {
                    self.pop();
                }
                OpCode::GetLocal => {
                    let slot = self.read_byte() as usize;
                    let base = self.current_frame_base();
                    self.push(self.stack[base + slot]);
                }
                OpCode::SetLocal => {
                    let slot = self.read_byte() as usize;
                    let base = self.current_frame_base();
                    self.stack[base + slot] = self.peek(0);
                }
                OpCode::GetGlobal => {
                    let ix = self.read_byte();
                    let name = self.read_constant(ix).as_obj().unwrap();
                    match self.globals.get(name) {
                        Some(v) => self.push(v),
                        None => {
                            let msg = format!("Undefined variable '{}'.", self.heap.as_str(name));
                            return self.runtime_error(&msg);
                        }
                    }
                }
                OpCode::DefineGlobal => {
                    let ix = self.read_byte();
                    let name = self.read_constant(ix).as_obj().unwrap();
                    let value = self.pop();
                    self.globals.set(name, value);
                }
                OpCode::SetGlobal => {
                    let ix = self.read_byte();
                    let name = self.read_constant(ix).as_obj().unwrap();
                    let value = self.peek(0);
                    if self.globals.set(name, value) {
                        self.globals.delete(name);
                        let msg = format!("Undefined variable '{}'.", self.heap.as_str(name));
                        return self.runtime_error(&msg);
                    }
                }
                OpCode::GetUpvalue => {
                    let slot = self.read_byte() as usize;
                    let closure = self.current_frame_closure();
                    let upvalue = match self.heap.get(closure) {
                        ObjKind::Closure(c) => c.upvalues[slot],
                        _ => unreachable!(),
                    };
                    let value = match self.heap.get(upvalue) {
                        ObjKind::Upvalue(u) => match u.state {
                            UpvalueState::Open(stack_slot) => self.stack[stack_slot],
                            UpvalueState::Closed(v) => v,
                        },
                        _ => unreachable!(),
                    };
                    self.push(value);
                }
                OpCode::SetUpvalue => {
                    let slot = self.read_byte() as usize;
                    let closure = self.current_frame_closure();
                    let upvalue = match self.heap.get(closure) {
                        ObjKind::Closure(c) => c.upvalues[slot],
                        _ => unreachable!(),
                    };
                    let value = self.peek(0);
                    let state = match self.heap.get(upvalue) {
                        ObjKind::Upvalue(u) => u.state,
                        _ => unreachable!(),
                    };
                    match state {
                        UpvalueState::Open(stack_slot) => self.stack[stack_slot] = value,
                        UpvalueState::Closed(_) => {
                            if let ObjKind::Upvalue(u) = self.heap.get_mut(upvalue) {
                                u.state = UpvalueState::Closed(value);
                            }
                        }
                    }
                }
                OpCode::GetProperty => {
                    let ix = self.read_byte();
                    let name = self.read_constant(ix).as_obj().unwrap();
                    let receiver = self.peek(0);
                    let instance = match receiver {
                        Value::Obj(g) if matches!(self.heap.get(g), ObjKind::Instance(_)) => g,
                        _ => return self.runtime_error("Only instances have properties."),
                    };
                    let field = match self.heap.get(instance) {
                        ObjKind::Instance(i) => i.fields.get(name),
                        _ => unreachable!(),
                    };
                    match field {
                        Some(v) => {
                            self.pop();
                            self.push(v);
                        }
                        None => {
                            let class = match self.heap.get(instance) {
                                ObjKind::Instance(i) => i.class,
                                _ => unreachable!(),
                            };
                            if let Err(msg) = self.bind_method(class, name) {
                                return self.runtime_error(&msg);
                            }
                        }
                    }
                }
                OpCode::SetProperty => {
                    let ix = self.read_byte();
                    let name = self.read_constant(ix).as_obj().unwrap();
                    let receiver = self.peek(1);
                    let instance = match receiver {
                        Value::Obj(g) if matches!(self.heap.get(g), ObjKind::Instance(_)) => g,
                        _ => return self.runtime_error("Only instances have fields."),
                    };
                    let value = self.peek(0);
                    if let ObjKind::Instance(i) = self.heap.get_mut(instance) {
                        i.fields.set(name, value);
                    }
                    self.pop();
                    self.pop();
                    self.push(value);
                    self.collect_if_needed();
                }
                OpCode::GetSuper => {
                    let ix = self.read_byte();
                    let name = self.read_constant(ix).as_obj().unwrap();
                    let superclass = self.pop().as_obj().unwrap();
                    if let Err(msg) = self.bind_method(superclass, name) {
                        return self.runtime_error(&msg);
                    }
                }
                OpCode::Equal => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::Bool(values_equal(a, b)));
                }
                OpCode::Greater => {
                    if let Err(msg) = self.numeric_compare(|a, b| a > b) {
                        return self.runtime_error(&msg);
                    }
                }
                OpCode::Less => {
                    if let Err(msg) = self.numeric_compare(|a, b| a < b) {
                        return self.runtime_error(&msg);
                    }
                }
                OpCode::Add => {
                    if let Err(msg) = self.add() {
                        return self.runtime_error(&msg);
                    }
                }
                OpCode::Subtract => {
                    if let Err(msg) = self.numeric_binary(|a, b| a - b) {
                        return self.runtime_error(&msg);
                    }
                }
                OpCode::Multiply => {
                    if let Err(msg) = self.numeric_binary(|a, b| a * b) {
                        return self.runtime_error(&msg);
                    }
                }
                OpCode::Divide => {
                    if let Err(msg) = self.numeric_binary(|a, b| a / b) {
                        return self.runtime_error(&msg);
                    }
                }
                OpCode::Not => {
                    let v = self.pop();
                    self.push(Value::Bool(v.is_falsey()));
                }
                OpCode::Negate => {
                    let v = self.peek(0);
                    match v.as_number() {
                        Some(n) => {
                            self.pop();
                            self.push(Value::Number(-n));
                        }
                        None => return self.runtime_error("Operand must be a number."),
                    }
                }
                OpCode::Print => {
                    let v = self.pop();
                    println!("{}", self.heap.display(v));
                }
                OpCode::Jump => {
                    let offset = self.read_u16();
                    self.jump_forward(offset);
                }
                OpCode::JumpIfFalse => {
                    let offset = self.read_u16();
                    if self.peek(0).is_falsey() {
                        self.jump_forward(offset);
                    }
                }
                OpCode::Loop => {
                    let offset = self.read_u16();
                    self.jump_backward(offset);
                }
                OpCode::Call => {
                    let argc = self.read_byte();
                    let callee = self.peek(argc as usize);
                    if let Err(msg) = self.call_value(callee, argc) {
                        return self.runtime_error(&msg);
                    }
                }
                OpCode::Invoke => {
                    let ix = self.read_byte();
                    let name = self.read_constant(ix).as_obj().unwrap();
                    let argc = self.read_byte();
                    if let Err(msg) = self.invoke(name, argc) {
                        return self.runtime_error(&msg);
                    }
                }
                OpCode::SuperInvoke => {
                    let ix = self.read_byte();
                    let name = self.read_constant(ix).as_obj().unwrap();
                    let argc = self.read_byte();
                    let superclass = self.pop().as_obj().unwrap();
                    if let Err(msg) = self.invoke_from_class(superclass, name, argc) {
                        return self.runtime_error(&msg);
                    }
                }
                OpCode::Closure => {
                    let ix = self.read_byte();
                    let function = self.read_constant(ix).as_obj().unwrap();
                    let upvalue_count = match self.heap.get(function) {
                        ObjKind::Function(f) => f.upvalue_count,
                        _ => unreachable!(),
                    };
                    let mut upvalues = Vec::with_capacity(upvalue_count as usize);
                    for _ in 0..upvalue_count {
                        let is_local = self.read_byte() != 0;
                        let index = self.read_byte();
                        let handle = if is_local {
                            let base = self.current_frame_base();
                            self.heap.capture_upvalue(base + index as usize)
                        } else {
                            let closure = self.current_frame_closure();
                            match self.heap.get(closure) {
                                ObjKind::Closure(c) => c.upvalues[index as usize],
                                _ => unreachable!(),
                            }
                        };
                        upvalues.push(handle);
                    }
                    let closure = self.heap.alloc_closure(ClosureObj { function, upvalues });
                    self.push(Value::Obj(closure));
                    self.collect_if_needed();
                }
                OpCode::CloseUpvalue => {
                    let top = self.stack.len() - 1;
                    self.heap.close_upvalues(top, &self.stack);
                    self.pop();
                }
                OpCode::Return => {
                    let result = self.pop();
                    let base = self.frames.last().unwrap().base;
                    self.heap.close_upvalues(base, &self.stack);
                    self.frames.pop();
                    if self.frames.is_empty() {
                        self.pop();
                        return InterpretResult::Ok;
                    }
                    self.stack.truncate(base);
                    self.push(result);
                }
                OpCode::Class => {
                    let ix = self.read_byte();
                    let name = self.read_constant(ix).as_obj().unwrap();
                    let class = self.heap.alloc_class(ClassObj { name, methods: Table::new() });
                    self.push(Value::Obj(class));
                    self.collect_if_needed();
                }
                OpCode::Inherit => {
                    let superclass_val = self.peek(1);
                    let superclass = match superclass_val {
                        Value::Obj(g) if matches!(self.heap.get(g), ObjKind::Class(_)) => g,
                        _ => return self.runtime_error("Superclass must be a class."),
                    };
                    let subclass = self.peek(0).as_obj().unwrap();
                    let methods = match self.heap.get(superclass) {
                        ObjKind::Class(c) => c.methods.clone(),
                        _ => unreachable!(),
                    };
                    if let ObjKind::Class(sub) = self.heap.get_mut(subclass) {
                        sub.methods.copy_from(&methods);
                    }
                    self.pop();
                }
                OpCode::Method => {
                    let ix = self.read_byte();
                    let name = self.read_constant(ix).as_obj().unwrap();
                    let method = self.pop();
                    let class = self.peek(0).as_obj().unwrap();
                    if let ObjKind::Class(c) = self.heap.get_mut(class) {
                        c.methods.set(name, method);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str) -> InterpretResult {
        let mut vm = Vm::new();
        vm.interpret(src)
    }

    #[test]
    fn arithmetic_and_print() {
        assert_eq!(run("print 1 + 2 * 3;"), InterpretResult::Ok);
    }

    #[test]
    fn global_and_local_variables() {
        let src = r#"
            var a = 1;
            {
                var b = 2;
                print a + b;
            }
        "#;
        assert_eq!(run(src), InterpretResult::Ok);
    }

    #[test]
    fn closures_capture_upvalues() {
        let src = r#"
            fun makeCounter() {
                var count = 0;
                fun inc() {
                    count = count + 1;
                    return count;
                }
                return inc;
            }
            var counter = makeCounter();
            print counter();
            print counter();
        "#;
        assert_eq!(run(src), InterpretResult::Ok);
    }

    #[test]
    fn classes_methods_and_inheritance() {
        let src = r#"
            class Animal {
                speak() {
                    return "...";
                }
            }
            class Dog < Animal {
                init(name) {
                    this.name = name;
                }
                speak() {
                    return super.speak();
                }
            }
            var d = Dog("Rex");
            print d.speak();
        "#;
        assert_eq!(run(src), InterpretResult::Ok);
    }

    #[test]
    fn undefined_variable_is_a_runtime_error() {
        assert_eq!(run("print nope;"), InterpretResult::RuntimeError);
    }

    #[test]
    fn calling_a_non_function_is_a_runtime_error() {
        assert_eq!(run("var x = 1; x();"), InterpretResult::RuntimeError);
    }

    #[test]
    fn wrong_arity_is_a_runtime_error() {
        let src = r#"
            fun f(a, b) { return a + b; }
            f(1);
        "#;
        assert_eq!(run(src), InterpretResult::RuntimeError);
    }

    #[test]
    fn compile_error_is_reported() {
        assert_eq!(run("var ;"), InterpretResult::CompileError);
    }
}
