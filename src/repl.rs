// File: src/repl.rs
//
// Interactive REPL. One persistent `Vm` runs every line entered, so
// globals, classes, and open upvalues survive between inputs --
// mirrors `original_source/lox/apps/main.c`'s `repl()` (a bare
// `printf("> ")` / `fgets` / `vm_interpret` loop), adapted to
// `rustyline` for history and line editing the way `ruff/src/repl.rs`
// already did.

use crate::vm::{InterpretResult, Vm};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

pub struct Repl {
    vm: Vm,
    editor: DefaultEditor,
}

impl Repl {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let editor = DefaultEditor::new()?;
        Ok(Repl { vm: Vm::new(), editor })
    }

    pub fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        println!("loxide {}", env!("CARGO_PKG_VERSION"));
        loop {
            match self.editor.readline("> ") {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let _ = self.editor.add_history_entry(line.as_str());
                    // Errors are already reported to stderr inside `interpret`;
                    // the REPL just keeps going on the next line.
                    let _: InterpretResult = self.vm.interpret(&line);
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("Readline error: {}", err);
                    break;
                }
            }
        }
        Ok(())
    }
}
