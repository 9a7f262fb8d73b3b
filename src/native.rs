// File: src/native.rs
//
// Native (host-provided) functions. clox registers exactly one,
// `clock`, at VM startup (`original_source/lox/src/vm.c`); that's the
// only native this spec names a concrete calling convention for
// (spec.md §3's `Native` object, §4.3's call dispatch), so it's the
// only one implemented here.

use crate::value::Value;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds elapsed since the Unix epoch, as a `Number`. Arity 0.
pub fn clock(_args: &[Value]) -> Result<Value, String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| "System clock is before the Unix epoch.".to_string())?;
    Ok(Value::Number(now.as_secs_f64()))
}

/// `(name, arity, function)` triples the VM registers as globals at
/// startup.
pub fn builtins() -> &'static [(&'static str, u8, crate::heap::NativeFn)] {
    &[("clock", 0, clock)]
}
