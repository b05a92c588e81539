//! The three surfaces the core exposes to a driver (§6 "To the driver"):
//! `compile_file`, `add_import`, `set_target_properties`, `get_diagnostics`,
//! plus the `TypedUnit` back-end hand-off (§6 "Back-end hand-off").
//!
//! This module owns nothing the resolver doesn't already own; it is a thin
//! sequencing layer (lex -> parse -> register -> resolve -> collect) that a
//! CLI binary or test harness drives, exactly as `mmcc`'s own top-level
//! `Compiler`/`elab` entry point sequences HIR building before MIR/VCode.

use crate::config::TargetProperties;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, SrcTokens};
use crate::lexer;
use crate::parser;
use crate::resolver::Resolver;
use crate::symbol::Symbol;
use crate::types::constant_value::ConstantValue;
use crate::types::decl::Decl;
use crate::types::expr::Stmt;
use crate::types::scope::ScopeId;
use crate::types::typespec::{Arg, CallingConvention, Typespec};
use hashbrown::HashMap;
use std::path::{Path, PathBuf};

/// One resolved global variable, ready for back-end emission (§6).
#[derive(Clone, Debug)]
pub struct Global {
    pub symbol_name: Symbol,
    pub ty: Typespec,
    pub init: Option<ConstantValue>,
}

/// One resolved function, consteval-folded where possible (§6).
#[derive(Clone, Debug)]
pub struct Function {
    pub symbol_name: Symbol,
    pub cc: CallingConvention,
    pub external_linkage: bool,
    pub params: Vec<Arg>,
    pub return_type: Typespec,
    /// `None` for an intrinsic function: the back-end supplies the body by
    /// dispatching on `intrinsic_kind` instead (§6 "Intrinsic functions are
    /// emitted as declarations tagged with their registry kind").
    pub body: Option<Vec<Stmt>>,
    pub intrinsic_kind: Option<&'static str>,
}

/// A resolved struct or enum, summarized for the back-end's type table.
#[derive(Clone, Debug)]
pub struct TypePrototype {
    pub name: Symbol,
    pub fields: Vec<(Symbol, Typespec)>,
}

/// `{ types, globals, functions }` (§6 Back-end hand-off). One `TypedUnit`
/// per compiled file; a driver compiling a whole program links several
/// together (imports are resolved by splicing scopes, not by merging
/// `TypedUnit`s, so each file's own unit stays self-describing).
#[derive(Clone, Debug, Default)]
pub struct TypedUnit {
    pub types: Vec<TypePrototype>,
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
}

/// Owns the one [`Resolver`] instance and diagnostic buffer for a whole
/// build (§5: "The comptime memory manager is local to one evaluation
/// request" but the resolver/arena are per-build, shared across files via
/// `import`).
pub struct Compiler {
    resolver: Resolver,
    sink: DiagnosticSink,
    next_file_id: u32,
    /// `add_import(name, path)` registrations (§6): a logical import name to
    /// a filesystem path, consulted when a `Decl::Import` names a module
    /// that isn't already a resolvable relative path.
    import_paths: HashMap<String, PathBuf>,
    /// Already-compiled files, keyed by canonicalized path, so a diamond of
    /// imports only lexes/parses/resolves each file once.
    compiled: HashMap<PathBuf, ScopeId>,
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler {
            resolver: Resolver::new(),
            sink: DiagnosticSink::new(),
            next_file_id: 0,
            import_paths: HashMap::new(),
            compiled: HashMap::new(),
        }
    }
}

impl Compiler {
    #[must_use]
    pub fn new() -> Self {
        Compiler::default()
    }

    /// `set_target_properties({pointer_size, endianness})` (§6): the memory
    /// manager and integer-literal typing both depend on this.
    pub fn set_target_properties(&mut self, target: TargetProperties) {
        self.resolver.set_target(target);
    }

    /// `add_import(name, path)` (§6): registers a logical module name as
    /// resolving to `path` the next time a `Decl::Import` references it.
    pub fn add_import(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        self.import_paths.insert(name.into(), path.into());
    }

    /// `get_diagnostics()` (§6): every diagnostic collected so far, across
    /// every file compiled by this instance.
    #[must_use]
    pub fn get_diagnostics(&self) -> &[Diagnostic] {
        self.sink.diagnostics()
    }

    /// `compile_file(path, global_ctx)` (§6). Lexes, parses, registers, and
    /// resolves every top-level declaration in `path`, splicing any
    /// `import`ed file's exports into its file scope first. Returns the
    /// file's own `TypedUnit` on success; on any error-bearing diagnostic,
    /// returns every diagnostic collected for this file instead (prior
    /// files' diagnostics remain available through `get_diagnostics`).
    pub fn compile_file(&mut self, path: impl AsRef<Path>) -> Result<TypedUnit, Vec<Diagnostic>> {
        let path = path.as_ref();
        let before = self.sink.diagnostics().len();
        let (_scope, ids) = match self.compile_and_register(path) {
            Ok(v) => v,
            Err(reason) => {
                let d = crate::diagnostics::Diagnostic::new(DiagnosticKind::Fatal { reason }, SrcTokens::point(0, 0));
                self.sink.report(d);
                return Err(self.sink.diagnostics()[before..].to_vec());
            }
        };

        let unit = self.collect_unit(&ids);
        let file_diags = &self.sink.diagnostics()[before..];
        if file_diags.iter().any(|d| d.severity != crate::diagnostics::Severity::Warning) {
            Err(file_diags.to_vec())
        } else {
            Ok(unit)
        }
    }

    /// Shared by `compile_file` and import resolution: lex + parse + register
    /// + splice imports + resolve every declaration of one file, without
    /// yet collecting a `TypedUnit` (imports only need the scope).
    fn compile_and_register(&mut self, path: &Path) -> Result<(ScopeId, Vec<crate::types::decl::DeclId>), String> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if let Some(&scope) = self.compiled.get(&canonical) {
            return Ok((scope, Vec::new()));
        }

        let source = std::fs::read_to_string(path).map_err(|e| format!("could not read '{}': {e}", path.display()))?;
        let file_id = self.next_file_id;
        self.next_file_id += 1;

        let (tokens, lex_sink) = lexer::lex(&source, file_id);
        for d in lex_sink.diagnostics() {
            self.sink.report(d.clone());
        }

        let mut parse_sink = DiagnosticSink::new();
        let decls = parser::parse_file(&tokens, file_id, &mut parse_sink);
        for d in parse_sink.diagnostics() {
            self.sink.report(d.clone());
        }

        let (scope, ids) = self.resolver.register_file(file_id, tokens, decls, &mut self.sink);
        self.compiled.insert(canonical, scope);

        // Splice imports before resolving bodies, so names they export are
        // visible to the rest of the file (§3 Scopes: "Imports splice
        // another file's export_decls into the current scope").
        for &id in &ids {
            let (name, import_path) = match self.resolver.arena.get(id) {
                Decl::Import { name, path } => (*name, path.clone()),
                _ => continue,
            };
            let target = self.import_paths.get(name.as_str()).cloned().unwrap_or_else(|| PathBuf::from(&import_path));
            let resolved = if target.is_relative() {
                path.parent().map_or_else(|| target.clone(), |base| base.join(&target))
            } else {
                target
            };
            match self.compile_and_register(&resolved) {
                Ok((imported_scope, _)) => self.resolver.scopes.get_mut(scope).imports.push(imported_scope),
                Err(reason) => self.sink.report(crate::diagnostics::Diagnostic::new(
                    DiagnosticKind::Fatal { reason: format!("import '{name}' failed: {reason}") },
                    SrcTokens::point(file_id, 0),
                )),
            }
        }

        for &id in &ids {
            if matches!(self.resolver.arena.get(id), Decl::Import { .. }) {
                continue;
            }
            self.resolver.resolve_all(id, scope, &mut self.sink);
        }

        // Every top-level declaration is exported (§9 open question: the
        // source's `export` marker is not tracked per-declaration by the
        // parser today, so we export everything at file scope rather than
        // silently dropping names a caller might need — see DESIGN.md).
        self.resolver.scopes.get_mut(scope).decls.export_decls = ids.clone();

        Ok((scope, ids))
    }

    fn collect_unit(&self, ids: &[crate::types::decl::DeclId]) -> TypedUnit {
        let mut unit = TypedUnit::default();
        for &id in ids {
            match self.resolver.arena.get(id) {
                Decl::Variable(v) => {
                    unit.globals.push(Global {
                        symbol_name: v.name,
                        ty: v.var_type.clone().unwrap_or_else(Typespec::void),
                        init: v.init_expr.as_ref().and_then(crate::types::expr::Expr::constant_value).cloned(),
                    });
                }
                Decl::Function(f) => unit.functions.push(function_from_body(f)),
                Decl::Operator { body, .. } => unit.functions.push(function_from_body(body)),
                Decl::Struct { name, info, .. } => {
                    unit.types.push(TypePrototype { name: *name, fields: info.fields.iter().map(|f| (f.name, f.ty.clone())).collect() });
                }
                Decl::Enum { name, variants, underlying, .. } => {
                    let fields = variants.iter().map(|v| (v.name, underlying.clone())).collect();
                    unit.types.push(TypePrototype { name: *name, fields });
                }
                Decl::FunctionAlias { .. } | Decl::TypeAlias { .. } | Decl::Import { .. } => {}
            }
        }
        unit
    }
}

fn function_from_body(f: &crate::types::decl::FunctionBody) -> Function {
    use crate::types::decl::FunctionFlags;
    Function {
        symbol_name: f.symbol_name,
        cc: f.cc,
        external_linkage: f.flags.contains(FunctionFlags::EXTERNAL_LINKAGE),
        params: f.params.clone(),
        return_type: f.return_type.clone(),
        body: f.body.clone(),
        intrinsic_kind: f.is_intrinsic().then(|| crate::types::entity::IntrinsicKind::from_symbol(f.symbol_name).map_or("unknown", intrinsic_name)),
    }
}

fn intrinsic_name(kind: crate::types::entity::IntrinsicKind) -> &'static str {
    kind.as_symbol().as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().expect("create temp file");
        f.write_all(contents.as_bytes()).expect("write temp file");
        f
    }

    #[test]
    fn compiles_a_trivial_file() {
        let file = write_temp("let x: i32 = 1 + 2;\n");
        let mut compiler = Compiler::new();
        let unit = compiler.compile_file(file.path()).expect("compiles cleanly");
        assert_eq!(unit.globals.len(), 1);
        assert_eq!(unit.globals[0].init, Some(ConstantValue::Sint(3)));
    }

    #[test]
    fn reports_diagnostics_without_panicking() {
        let file = write_temp("function f() -> void { return missing_name; }\n");
        let mut compiler = Compiler::new();
        let result = compiler.compile_file(file.path());
        assert!(result.is_err());
        assert!(!compiler.get_diagnostics().is_empty());
    }

    #[test]
    fn splices_an_imported_file_s_exports() {
        let dir = tempfile::tempdir().expect("tempdir");
        let lib_path = dir.path().join("lib.lang");
        std::fs::write(&lib_path, "function helper() -> i32 { return 42; }\n").expect("write lib");
        let main_path = dir.path().join("main.lang");
        std::fs::write(&main_path, "import \"lib.lang\";\nfunction main() -> i32 { return helper(); }\n").expect("write main");

        let mut compiler = Compiler::new();
        let unit = compiler.compile_file(&main_path).expect("compiles cleanly");
        assert_eq!(unit.functions.len(), 1);
        assert_eq!(unit.functions[0].symbol_name.as_str(), "main");
    }
}
