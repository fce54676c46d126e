//! Rhai-backed sessions

use std::cell::RefCell;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rhai::module_resolvers::{FileModuleResolver, ModuleResolversCollection};
use rhai::{AST, CallFnOptions, Dynamic, Engine, EvalAltResult, FnPtr, Module, NativeCallContext, ParseError, Scope};

use super::diagnostic::render_parse_snippet;
use super::{Binding, FailureKind, ScriptFailure, ScriptSession, SessionError, SessionFactory, host};

/// Creates [`RhaiSession`]s that resolve `import` against a module path.
#[derive(Debug, Clone, Default)]
pub struct RhaiSessionFactory {
    module_path: Vec<PathBuf>,
}

impl RhaiSessionFactory {
    pub fn new(module_path: Vec<PathBuf>) -> Self {
        Self { module_path }
    }
}

impl SessionFactory for RhaiSessionFactory {
    type Session = RhaiSession;

    fn create(&self, working_dir: &Path) -> Result<RhaiSession, SessionError> {
        let working_dir = fs::canonicalize(working_dir).map_err(|source| SessionError::WorkingDir {
            path: working_dir.to_path_buf(),
            source,
        })?;
        if !working_dir.is_dir() {
            return Err(SessionError::NotADirectory(working_dir));
        }

        // Engine::new() loads the standard packages.
        let mut engine = Engine::new();

        let mut resolvers = ModuleResolversCollection::new();
        for dir in &self.module_path {
            resolvers.push(FileModuleResolver::new_with_path(dir.clone()));
        }
        resolvers.push(FileModuleResolver::new_with_path(working_dir.clone()));
        engine.set_module_resolver(resolvers);

        host::register(&mut engine, &working_dir);

        let imports = Rc::new(RefCell::new(Vec::new()));
        let captured = Rc::clone(&imports);
        engine.register_fn(CAPTURE_IMPORTS, move |ctx: NativeCallContext| {
            // Newest first; an alias imported twice keeps its latest module.
            let mut captured = captured.borrow_mut();
            for (alias, module) in ctx.iter_imports() {
                if !alias.is_empty() && !captured.iter().any(|(seen, _): &(String, Module)| seen == alias) {
                    captured.push((alias.to_string(), module.clone()));
                }
            }
        });

        Ok(RhaiSession {
            engine,
            scope: Scope::new(),
            ast: AST::empty(),
            imports,
            working_dir,
        })
    }
}

/// Host function appended to every evaluated script to collect its top-level imports.
const CAPTURE_IMPORTS: &str = "__capture_imports";

/// One Rhai engine with its global scope and the functions defined so far.
///
/// Modules imported at the top level of an evaluated script stay visible to later calls:
/// they are registered on the engine as static modules once the script has run.
pub struct RhaiSession {
    engine: Engine,
    scope: Scope<'static>,
    ast: AST,
    imports: Rc<RefCell<Vec<(String, Module)>>>,
    working_dir: PathBuf,
}

impl RhaiSession {
    /// Parameter count of the script function a pointer targets, minus curried arguments.
    fn pointer_arity(&self, ptr: &FnPtr) -> Option<usize> {
        self.ast
            .iter_functions()
            .find(|f| f.name == ptr.fn_name())
            .map(|f| f.params.len().saturating_sub(ptr.curry().len()))
    }

    /// Drop the zero-argument script function `name`. Returns whether one existed.
    fn remove_function(&mut self, name: &str) -> bool {
        let before = self.ast.iter_functions().count();
        self.ast
            .retain_functions(|_, _, fn_name, params| !(fn_name == name && params == 0));
        self.ast.iter_functions().count() < before
    }

    /// Drop every scope entry named `name`, shadowed ones included. Returns whether one existed.
    fn remove_variable(&mut self, name: &str) -> Result<bool, SessionError> {
        let mut removed = false;
        while self.scope.contains(name) {
            if self.scope.remove::<Dynamic>(name).is_none() {
                return Err(SessionError::Cleanup {
                    name: name.to_string(),
                    reason: "variable could not be removed from scope".to_string(),
                });
            }
            removed = true;
        }
        Ok(removed)
    }

    fn register_imports(&mut self) {
        let captured = std::mem::take(&mut *self.imports.borrow_mut());
        // Oldest first, so a re-imported alias ends up bound to its latest module.
        for (alias, module) in captured.into_iter().rev() {
            tracing::debug!("Keeping module `{}` for later calls", alias);
            self.engine.register_static_module(alias, module.into());
        }
    }
}

impl ScriptSession for RhaiSession {
    fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn eval_file(&mut self, path: &Path) -> Result<(), ScriptFailure> {
        let source = fs::read_to_string(path).map_err(|e| ScriptFailure::io(path, &e))?;
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("<script>");
        self.eval_source(name, &source)
    }

    fn eval_source(&mut self, name: &str, source: &str) -> Result<(), ScriptFailure> {
        let mut ast = self
            .engine
            .compile_with_scope(&self.scope, source)
            .map_err(|e| parse_failure(name, source, &e))?;
        ast.set_source(name);
        let tail = self
            .engine
            .compile(format!("{CAPTURE_IMPORTS}();"))
            .map_err(|e| parse_failure(name, source, &e))?;

        // Earlier functions stay callable from this script's top level.
        let mut runnable = self.ast.merge(&ast).merge(&tail);
        runnable.set_source(name);

        // Functions are visible to the function-level units even when top-level code fails.
        self.ast.combine(ast.clone_functions_only());
        let result = self.engine.run_ast_with_scope(&mut self.scope, &runnable);
        self.register_imports();
        result.map_err(|e| eval_failure(&e))
    }

    fn bindings(&self) -> Vec<Binding> {
        let mut seen = HashSet::new();
        let mut bindings: Vec<Binding> = self
            .ast
            .iter_functions()
            .map(|f| Binding {
                name: f.name.to_string(),
                arity: Some(f.params.len()),
            })
            .collect();

        for (name, _, value) in self.scope.iter() {
            // Shadowed variables appear more than once; report each name once.
            if !seen.insert(name.to_string()) {
                continue;
            }
            let arity = value.try_cast::<FnPtr>().and_then(|ptr| self.pointer_arity(&ptr));
            bindings.push(Binding {
                name: name.to_string(),
                arity,
            });
        }
        bindings
    }

    fn call(&mut self, name: &str) -> Result<(), ScriptFailure> {
        if let Some(ptr) = self.scope.get_value::<FnPtr>(name) {
            return ptr
                .call::<Dynamic>(&self.engine, &self.ast, ())
                .map(drop)
                .map_err(|e| eval_failure(&e));
        }

        // Top-level statements already ran as the file-level unit; do not run them again.
        let options = CallFnOptions::new().eval_ast(false).rewind_scope(true);
        self.engine
            .call_fn_with_options::<Dynamic>(options, &mut self.scope, &self.ast, name, ())
            .map(drop)
            .map_err(|e| eval_failure(&e))
    }

    fn remove(&mut self, name: &str) -> Result<(), SessionError> {
        // A variable and a function may share the name; both go.
        let variable = self.remove_variable(name)?;
        let function = self.remove_function(name);
        if variable || function {
            Ok(())
        } else {
            Err(SessionError::Cleanup {
                name: name.to_string(),
                reason: "no zero-argument binding with that name".to_string(),
            })
        }
    }
}

fn parse_failure(name: &str, source: &str, error: &ParseError) -> ScriptFailure {
    let message = error.to_string();
    let position = error.position();
    let detail = match (position.line(), position.position()) {
        (Some(line), column) => {
            render_parse_snippet(name, source, &error.err_type().to_string(), line, column.unwrap_or(1))
        }
        _ => message.clone(),
    };
    ScriptFailure::new(FailureKind::Parse, message, detail)
}

fn eval_failure(error: &EvalAltResult) -> ScriptFailure {
    ScriptFailure::new(classify(error), error.to_string(), trace(error))
}

fn classify(error: &EvalAltResult) -> FailureKind {
    match error {
        EvalAltResult::ErrorParsing(..) => FailureKind::Parse,
        EvalAltResult::ErrorRuntime(..) => FailureKind::Eval,
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) | EvalAltResult::ErrorInModule(_, inner, _) => {
            classify(inner)
        }
        _ => FailureKind::Other,
    }
}

/// Error text followed by every nested cause, innermost last.
fn trace(error: &EvalAltResult) -> String {
    let mut out = error.to_string();
    let mut current = error;
    while let EvalAltResult::ErrorInFunctionCall(_, _, inner, _) | EvalAltResult::ErrorInModule(_, inner, _) = current {
        out.push_str("\n  caused by: ");
        out.push_str(&inner.to_string());
        current = inner.as_ref();
    }
    if let EvalAltResult::ErrorSystem(_, source) = current {
        out.push_str("\n  caused by: ");
        out.push_str(&source.to_string());
    }
    out
}
