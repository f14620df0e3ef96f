//! Function discovery: find every statement block that gets entry/exit calls.
//!
//! Top-level function and method bodies are always collected. Inside a body,
//! the walk descends through `if`/`for`/`switch`/type-switch blocks and picks
//! up function literals that are the direct callee of a `defer` or `go`
//! statement, recursing into their bodies too. Calls to named functions are
//! never followed, and a literal stored in a variable is not found.

use std::fmt;

use crate::syntax::{
    Block, BlockId, CallStmt, Callee, DeclKind, Else, FuncDecl, IfStmt, SourceFile, StmtKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Defer,
    Go,
}

impl fmt::Display for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatch::Defer => f.write_str("defer"),
            Dispatch::Go => f.write_str("go"),
        }
    }
}

/// A top-level function or method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSite {
    pub name: String,
    /// `None` for declarations without a body.
    pub body: Option<BlockId>,
}

/// A function literal launched by `defer` or `go`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralSite {
    pub dispatch: Dispatch,
    /// Display name of the enclosing top-level function.
    pub within: String,
    pub body: BlockId,
}

#[derive(Debug, Default)]
pub struct Discovery {
    pub functions: Vec<FunctionSite>,
    pub literals: Vec<LiteralSite>,
    /// Index in `SourceFile::decls` of the first import declaration.
    pub import: Option<usize>,
}

impl Discovery {
    /// Every block to instrument: function bodies first, then literals.
    pub fn bodies(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.functions
            .iter()
            .filter_map(|f| f.body)
            .chain(self.literals.iter().map(|l| l.body))
    }

    pub fn is_empty(&self) -> bool {
        self.bodies().next().is_none()
    }
}

pub fn discover(file: &SourceFile) -> Discovery {
    let mut walker = Walker {
        found: Discovery::default(),
        within: String::new(),
    };
    for (index, decl) in file.decls.iter().enumerate() {
        walker.decl(&decl.kind, Some(index));
    }
    walker.found
}

struct Walker {
    found: Discovery,
    within: String,
}

impl Walker {
    /// Shared by top-level declarations and local declaration statements.
    /// `index` is the position in the file, `None` for local declarations.
    fn decl(&mut self, decl: &DeclKind, index: Option<usize>) {
        match decl {
            DeclKind::Func(func) => self.func(func),
            DeclKind::Import(_) => {
                if self.found.import.is_none() {
                    self.found.import = index;
                }
            }
            DeclKind::Other(_) => {}
        }
    }

    fn func(&mut self, func: &FuncDecl) {
        self.within = func.display_name();
        self.found.functions.push(FunctionSite {
            name: self.within.clone(),
            body: func.body.as_ref().map(|b| b.id),
        });
        if let Some(body) = &func.body {
            self.block(body);
        }
    }

    fn block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            match &stmt.kind {
                StmtKind::Defer(call) => self.call(call, Dispatch::Defer),
                StmtKind::Go(call) => self.call(call, Dispatch::Go),
                StmtKind::If(if_stmt) => self.if_stmt(if_stmt),
                StmtKind::For(for_stmt) => self.block(&for_stmt.body),
                StmtKind::Switch(switch) | StmtKind::TypeSwitch(switch) => {
                    for clause in &switch.clauses {
                        self.block(&clause.body);
                    }
                }
                StmtKind::Decl(decl) => self.decl(decl, None),
                StmtKind::Labeled(_) | StmtKind::Other(_) => {}
            }
        }
    }

    fn call(&mut self, call: &CallStmt, dispatch: Dispatch) {
        if let Callee::Literal(lit) = &call.callee {
            self.found.literals.push(LiteralSite {
                dispatch,
                within: self.within.clone(),
                body: lit.body.id,
            });
            self.block(&lit.body);
        }
    }

    fn if_stmt(&mut self, if_stmt: &IfStmt) {
        self.block(&if_stmt.then);
        match &if_stmt.els {
            Some(Else::Block(block)) => self.block(block),
            Some(Else::If(nested)) => self.if_stmt(nested),
            None => {}
        }
    }
}
