// File: src/gc.rs
//
// Tri-color mark-and-sweep over the object arena in `heap.rs`. The
// gray worklist is a plain `Vec<Gc>`; roots are supplied by the
// caller (the VM aggregates its stack/frames/globals, the compiler
// aggregates its in-progress chunk constants), since this crate
// threads an explicit `Heap` handle instead of relying on a global
// "current environment" pointer (see Design Note 9).

use crate::heap::{Gc, Heap, ObjKind, UpvalueState};
use crate::value::Value;

impl Heap {
    /// Run one full collection. `roots` should include everything
    /// reachable directly: VM stack slots, call-frame closures,
    /// globals table values, and (while compiling) the in-progress
    /// chunk constant pools. Open upvalues are always included since
    /// the heap owns that list itself.
    pub fn collect(&mut self, roots: &[Value]) {
        if self.gc_log {
            eprintln!("-- gc begin");
        }

        for idx in 0..self.slot_count() {
            if self.kind_at(idx).is_some() {
                self.set_marked(idx, false);
            }
        }

        let mut gray: Vec<Gc> = Vec::new();
        for v in roots {
            if let Value::Obj(g) = v {
                self.mark(*g, &mut gray);
            }
        }
        for g in self.open_upvalue_handles().to_vec() {
            self.mark(g, &mut gray);
        }

        while let Some(g) = gray.pop() {
            self.blacken(g, &mut gray);
        }

        // String-table cleanup: drop interning entries for strings
        // that didn't survive the mark phase, so they don't resurrect
        // an about-to-be-freed string on the next `intern` call.
        let marked: Vec<bool> = (0..self.slot_count()).map(|i| self.is_marked(i)).collect();
        let dead: Vec<Box<str>> = self
            .strings_table_mut()
            .iter()
            .filter(|(_, handle)| !marked[handle.index()])
            .map(|(content, _)| content.clone())
            .collect();
        for content in &dead {
            self.strings_table_mut().remove(content);
        }

        self.sweep();

        self.next_gc = self.bytes_allocated * 2;
        if self.next_gc < crate::heap::DEFAULT_NEXT_GC {
            self.next_gc = crate::heap::DEFAULT_NEXT_GC;
        }

        if self.gc_log {
            eprintln!(
                "-- gc end, {} bytes allocated, next at {}",
                self.bytes_allocated, self.next_gc
            );
        }
    }

    /// Collect if the running allocation total has crossed the
    /// threshold, or unconditionally in stress mode.
    pub fn maybe_collect(&mut self, roots: &[Value]) {
        if self.stress_gc || self.bytes_allocated > self.next_gc {
            self.collect(roots);
        }
    }

    fn mark(&mut self, handle: Gc, gray: &mut Vec<Gc>) {
        let idx = handle.index();
        if self.is_marked(idx) {
            return;
        }
        self.set_marked(idx, true);
        match self.kind_at(idx) {
            Some(ObjKind::Str(_)) | Some(ObjKind::Native(_)) | None => {}
            Some(_) => gray.push(handle),
        }
    }

    fn blacken(&mut self, handle: Gc, gray: &mut Vec<Gc>) {
        // Collect the handles to mark first so we don't hold a borrow
        // of `self` across the recursive `mark` calls.
        let mut children: Vec<Gc> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        match self.kind_at(handle.index()) {
            Some(ObjKind::Closure(c)) => {
                children.push(c.function);
                children.extend(c.upvalues.iter().copied());
            }
            Some(ObjKind::Function(f)) => {
                if let Some(name) = f.name {
                    children.push(name);
                }
                values.extend(f.chunk.constants.iter().copied());
            }
            Some(ObjKind::Upvalue(u)) => {
                if let UpvalueState::Closed(v) = u.state {
                    values.push(v);
                }
            }
            Some(ObjKind::Class(c)) => {
                children.push(c.name);
                for (k, v) in c.methods.iter() {
                    children.push(k);
                    values.push(*v);
                }
            }
            Some(ObjKind::Instance(i)) => {
                children.push(i.class);
                for (k, v) in i.fields.iter() {
                    children.push(k);
                    values.push(*v);
                }
            }
            Some(ObjKind::BoundMethod(b)) => {
                children.push(b.method);
                values.push(b.receiver);
            }
            Some(ObjKind::Str(_)) | Some(ObjKind::Native(_)) | None => {}
        }

        for c in children {
            self.mark(c, gray);
        }
        for v in values {
            if let Value::Obj(g) = v {
                self.mark(g, gray);
            }
        }
    }

    fn sweep(&mut self) {
        let mut to_free = Vec::new();
        for idx in 0..self.slot_count() {
            if self.kind_at(idx).is_some() {
                if self.is_marked(idx) {
                    self.set_marked(idx, false);
                } else {
                    to_free.push(idx);
                }
            }
        }
        for idx in &to_free {
            self.free_slot(*idx);
        }
        let freed: std::collections::HashSet<usize> = to_free.into_iter().collect();
        self.retain_open_upvalues(|idx| !freed.contains(&idx));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::{ClosureObj, FunctionObj};

    #[test]
    fn unreachable_string_is_collected() {
        let mut h = Heap::new();
        let s = h.intern("garbage");
        h.collect(&[]);
        assert!(h.kind_at(s.index()).is_none());
    }

    #[test]
    fn rooted_string_survives() {
        let mut h = Heap::new();
        let s = h.intern("kept");
        h.collect(&[Value::Obj(s)]);
        assert!(h.kind_at(s.index()).is_some());
    }

    #[test]
    fn closure_keeps_function_and_upvalues_alive() {
        let mut h = Heap::new();
        let name = h.intern("f");
        let func = h.alloc_function(FunctionObj {
            name: Some(name),
            arity: 0,
            upvalue_count: 0,
            chunk: crate::chunk::Chunk::new(),
        });
        let up = h.capture_upvalue(0);
        h.close_upvalues(0, &[Value::Number(1.0)]);
        let closure = h.alloc_closure(ClosureObj { function: func, upvalues: vec![up] });

        h.collect(&[Value::Obj(closure)]);

        assert!(h.kind_at(closure.index()).is_some());
        assert!(h.kind_at(func.index()).is_some());
        assert!(h.kind_at(up.index()).is_some());
    }
}
