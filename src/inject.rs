//! Instrumentation injection.
//!
//! Every discovered block becomes
//!
//! ```go
//! printfdebug.FuncStart()
//! defer printfdebug.FuncEnd()
//! <original statements>
//! ```
//!
//! The deferred exit call is registered before any original statement runs,
//! so it fires once on every way out of the body, panics included.

use std::collections::HashSet;

use crate::discover::Discovery;
use crate::syntax::{
    Block, BlockId, CallStmt, Callee, DeclKind, ImportSpec, SourceFile, Stmt, StmtKind, Verbatim,
    VisitMut, walk_block_mut,
};

pub const DEFAULT_IMPORT_PATH: &str = "github.com/yuuki0xff/printfdebug";
pub const DEFAULT_PACKAGE: &str = "printfdebug";

/// The tracing package the injected calls refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceTarget {
    pub import_path: String,
    /// Qualifier used in the calls: `<package>.FuncStart()`.
    pub package: String,
}

impl Default for TraceTarget {
    fn default() -> Self {
        Self {
            import_path: DEFAULT_IMPORT_PATH.to_string(),
            package: DEFAULT_PACKAGE.to_string(),
        }
    }
}

impl TraceTarget {
    pub fn entry_stmt(&self) -> Stmt {
        Stmt::new(StmtKind::Other(Verbatim::new(format!(
            "{}.FuncStart()",
            self.package
        ))))
    }

    pub fn exit_stmt(&self) -> Stmt {
        Stmt::new(StmtKind::Defer(CallStmt {
            callee: Callee::Expr(format!("{}.FuncEnd", self.package)),
            args: "()".to_string(),
        }))
    }

    /// Import specifier for the tracing package. Named only when the
    /// qualifier differs from the last path element.
    pub fn import_spec(&self) -> ImportSpec {
        let last = self.import_path.rsplit('/').next().unwrap_or(&self.import_path);
        let name = (last != self.package).then(|| self.package.clone());
        ImportSpec::new(name, &self.import_path)
    }
}

/// What injection did to one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Injection {
    pub blocks: usize,
    pub import_added: bool,
}

/// Rewrite every block named by `discovery` and, if any changed, append the
/// tracing import to the first import declaration.
///
/// A file with no import declaration is rewritten without an import, leaving
/// the injected calls referring to an unimported package.
pub fn inject(file: &mut SourceFile, discovery: &Discovery, target: &TraceTarget) -> Injection {
    if discovery.is_empty() {
        return Injection::default();
    }
    let mut injector = Injector {
        pending: discovery.bodies().collect(),
        target,
        rewritten: 0,
    };
    injector.visit_file_mut(file);

    let mut result = Injection {
        blocks: injector.rewritten,
        import_added: false,
    };
    if let Some(index) = discovery.import
        && let Some(decl) = file.decls.get_mut(index)
        && let DeclKind::Import(import) = &mut decl.kind
    {
        import.specs.push(target.import_spec());
        file.imports.push(target.import_spec());
        result.import_added = true;
    }
    result
}

struct Injector<'t> {
    /// Blocks still to rewrite; each id is removed once handled.
    pending: HashSet<BlockId>,
    target: &'t TraceTarget,
    rewritten: usize,
}

impl VisitMut for Injector<'_> {
    fn visit_block_mut(&mut self, block: &mut Block) {
        walk_block_mut(self, block);
        if self.pending.remove(&block.id) {
            let original = std::mem::take(&mut block.stmts);
            block.stmts.reserve(original.len() + 2);
            block.stmts.push(self.target.entry_stmt());
            block.stmts.push(self.target.exit_stmt());
            block.stmts.extend(original);
            self.rewritten += 1;
        }
    }
}
