//! The object heap.
//!
//! Owns every heap object the interpreter ever allocates: the string arena,
//! the function arena, and the native-function arena, plus the intern table
//! that canonicalizes strings. Objects live until the heap drops; there is
//! no per-object reclamation and no garbage collector. Dropping the heap
//! releases everything at once, which is the teardown model this interpreter
//! is built around.

use crate::object::{hash_str, FunId, NativeFn, NativeId, ObjFunction, ObjNative, StrId};
use crate::strings::Strings;
use crate::table::Table;
use crate::value::{Obj, Value};

#[derive(Default)]
pub struct Heap {
    pub strings: Strings,
    functions: Vec<ObjFunction>,
    natives: Vec<ObjNative>,
    /// Intern set: keys are every live string, values are always `Nil`.
    interned: Table,
}

impl Heap {
    pub fn new() -> Self {
        Self {
            strings: Strings::new(),
            functions: Vec::new(),
            natives: Vec::new(),
            interned: Table::new(),
        }
    }

    /// Interns `text`, copying it into the arena unless an equal string is
    /// already registered. Idempotent: equal content always yields the same
    /// handle, so handle equality is content equality everywhere else.
    pub fn intern(&mut self, text: &str) -> StrId {
        let hash = hash_str(text);
        if let Some(existing) = self.interned.find_string(&self.strings, text, hash) {
            return existing;
        }
        let id = self.strings.push(Box::from(text), hash);
        self.interned.set(&self.strings, id, Value::Nil);
        id
    }

    /// Interns an owned buffer. When an equal string already exists the
    /// buffer is dropped and the existing handle returned; concatenation
    /// uses this so freshly built strings still canonicalize.
    pub fn intern_owned(&mut self, text: String) -> StrId {
        let hash = hash_str(&text);
        if let Some(existing) = self.interned.find_string(&self.strings, &text, hash) {
            return existing;
        }
        let id = self.strings.push(text.into_boxed_str(), hash);
        self.interned.set(&self.strings, id, Value::Nil);
        id
    }

    /// Builds the concatenation of two strings and interns the result.
    pub fn concatenate(&mut self, a: StrId, b: StrId) -> StrId {
        let mut text = String::with_capacity(
            self.strings.text(a).len() + self.strings.text(b).len(),
        );
        text.push_str(self.strings.text(a));
        text.push_str(self.strings.text(b));
        self.intern_owned(text)
    }

    pub fn alloc_function(&mut self, function: ObjFunction) -> FunId {
        let id = FunId(self.functions.len() as u32);
        self.functions.push(function);
        id
    }

    pub fn alloc_native(&mut self, fun: NativeFn) -> NativeId {
        let id = NativeId(self.natives.len() as u32);
        self.natives.push(ObjNative { fun });
        id
    }

    #[inline]
    pub fn str_text(&self, id: StrId) -> &str {
        self.strings.text(id)
    }

    #[inline]
    pub fn function(&self, id: FunId) -> &ObjFunction {
        &self.functions[id.0 as usize]
    }

    #[inline]
    pub fn native(&self, id: NativeId) -> &ObjNative {
        &self.natives[id.0 as usize]
    }

    /// Renders a value the way `print` shows it.
    pub fn format_value(&self, value: Value) -> String {
        match value {
            Value::Nil => "nil".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Obj(Obj::Str(id)) => self.strings.text(id).to_string(),
            Value::Obj(Obj::Fun(id)) => match self.function(id).name {
                Some(name) => format!("<fn {}>", self.strings.text(name)),
                None => "<main>".to_string(),
            },
            Value::Obj(Obj::Native(_)) => "<[native fn]>".to_string(),
        }
    }
}
