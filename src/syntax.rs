//! Owned syntax model for one Go source file.
//!
//! Only the node kinds the instrumenter walks through are structural:
//! function declarations, import declarations, and the statements that can
//! hold a nested function body (`defer`, `go`, `if`, `for`, `switch`, type
//! switches and local declarations). Everything else is kept as a
//! [`Verbatim`] leaf carrying its original text, so rendering an untouched
//! tree reproduces the source modulo layout normalization.

use std::path::PathBuf;

/// Identity of a statement block within one file.
///
/// Assigned by the parser in source order. Discovery reports ids, injection
/// rewrites the blocks that own them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

/// Opaque source text, copied through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verbatim(pub String);

impl Verbatim {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Line layout around a declaration or statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    /// An empty line separated this node from the previous one.
    pub blank_before: bool,
    /// Comment sharing the node's last line, e.g. `x := 1 // why`.
    pub trailing_comment: Option<String>,
}

/// A parsed Go file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Name from the `package` clause.
    pub package: String,
    pub decls: Vec<Decl>,
    /// Every import specifier in the file, in source order.
    pub imports: Vec<ImportSpec>,
}

#[derive(Debug, Clone)]
pub struct Decl {
    pub kind: DeclKind,
    pub layout: Layout,
}

#[derive(Debug, Clone)]
pub enum DeclKind {
    Func(FuncDecl),
    Import(ImportDecl),
    /// Package clause, comments, `var`/`const`/`type` declarations.
    Other(Verbatim),
}

/// A function or method declaration.
#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub name: String,
    /// Receiver parameter list text for methods, e.g. `(s *Server)`.
    pub receiver: Option<String>,
    /// Everything before the body: `func (s *Server) Serve(l net.Listener) error`.
    pub header: String,
    /// `None` for body-less declarations (implemented in assembly).
    pub body: Option<Block>,
}

impl FuncDecl {
    /// Name as shown in diagnostics: `Serve` or `(s *Server).Serve`.
    pub fn display_name(&self) -> String {
        match &self.receiver {
            Some(recv) => format!("{recv}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImportDecl {
    pub specs: Vec<ImportSpec>,
    /// Written as `import ( ... )` in the source.
    pub grouped: bool,
    /// Comments after the last specifier inside the parentheses.
    pub trailing_comments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Comment lines directly above the specifier.
    pub doc: Vec<String>,
    /// Explicit package name: `f`, `.` or `_`.
    pub name: Option<String>,
    /// Quoted path literal, quotes included.
    pub path: String,
    pub comment: Option<String>,
}

impl ImportSpec {
    pub fn new(name: Option<String>, path: &str) -> Self {
        Self {
            doc: Vec::new(),
            name,
            path: format!("\"{path}\""),
            comment: None,
        }
    }

    /// The import path without quotes.
    pub fn unquoted_path(&self) -> &str {
        self.path.trim_matches(|c| c == '"' || c == '`')
    }
}

/// An ordered, mutable statement list: a function body or a nested scope.
#[derive(Debug, Clone)]
pub struct Block {
    pub id: BlockId,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub layout: Layout,
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Self {
            kind,
            layout: Layout::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    /// `defer <call>`: runs when the enclosing function returns.
    Defer(CallStmt),
    /// `go <call>`: runs as an independent goroutine.
    Go(CallStmt),
    If(IfStmt),
    For(ForStmt),
    Switch(SwitchStmt),
    TypeSwitch(SwitchStmt),
    /// Local `var`, `const` or `type` declaration.
    Decl(DeclKind),
    /// `label: stmt`, kept whole. Printed one level left of its siblings.
    Labeled(Verbatim),
    Other(Verbatim),
}

/// The call carried by a `defer` or `go` statement.
#[derive(Debug, Clone)]
pub struct CallStmt {
    pub callee: Callee,
    /// Argument list text, parentheses included.
    pub args: String,
}

#[derive(Debug, Clone)]
pub enum Callee {
    /// `func(...) { ... }` called in place.
    Literal(FuncLit),
    /// Any other callee: `wg.Done`, `f[int]`, `(func() {})`.
    Expr(String),
}

/// An anonymous function value.
#[derive(Debug, Clone)]
pub struct FuncLit {
    /// `func(x int) error`
    pub signature: String,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    /// `if v, ok := m[k]; ok`
    pub header: String,
    pub then: Block,
    pub els: Option<Else>,
}

#[derive(Debug, Clone)]
pub enum Else {
    Block(Block),
    If(Box<IfStmt>),
}

#[derive(Debug, Clone)]
pub struct ForStmt {
    /// `for`, `for cond`, `for i := 0; i < n; i++`, `for k, v := range m`
    pub header: String,
    pub body: Block,
}

/// An expression switch or a type switch.
#[derive(Debug, Clone)]
pub struct SwitchStmt {
    /// `switch x := v.(type)`
    pub header: String,
    pub clauses: Vec<CaseClause>,
    /// Comments after the last clause.
    pub trailing_comments: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CaseClause {
    pub leading_comments: Vec<String>,
    /// `case a, b:` or `default:`
    pub header: String,
    pub body: Block,
}

/// Mutable traversal over every structural block of a file.
///
/// Default methods walk the whole tree; implementors override the hooks they
/// care about and call the matching `walk_*` function to keep descending.
pub trait VisitMut {
    fn visit_file_mut(&mut self, file: &mut SourceFile) {
        walk_file_mut(self, file);
    }

    fn visit_block_mut(&mut self, block: &mut Block) {
        walk_block_mut(self, block);
    }

    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        walk_stmt_mut(self, stmt);
    }
}

pub fn walk_file_mut<V: VisitMut + ?Sized>(v: &mut V, file: &mut SourceFile) {
    for decl in &mut file.decls {
        if let DeclKind::Func(func) = &mut decl.kind
            && let Some(body) = &mut func.body
        {
            v.visit_block_mut(body);
        }
    }
}

pub fn walk_block_mut<V: VisitMut + ?Sized>(v: &mut V, block: &mut Block) {
    for stmt in &mut block.stmts {
        v.visit_stmt_mut(stmt);
    }
}

pub fn walk_stmt_mut<V: VisitMut + ?Sized>(v: &mut V, stmt: &mut Stmt) {
    match &mut stmt.kind {
        StmtKind::Defer(call) | StmtKind::Go(call) => {
            if let Callee::Literal(lit) = &mut call.callee {
                v.visit_block_mut(&mut lit.body);
            }
        }
        StmtKind::If(if_stmt) => walk_if_mut(v, if_stmt),
        StmtKind::For(for_stmt) => v.visit_block_mut(&mut for_stmt.body),
        StmtKind::Switch(switch) | StmtKind::TypeSwitch(switch) => {
            for clause in &mut switch.clauses {
                v.visit_block_mut(&mut clause.body);
            }
        }
        StmtKind::Decl(DeclKind::Func(func)) => {
            if let Some(body) = &mut func.body {
                v.visit_block_mut(body);
            }
        }
        StmtKind::Decl(_) | StmtKind::Labeled(_) | StmtKind::Other(_) => {}
    }
}

fn walk_if_mut<V: VisitMut + ?Sized>(v: &mut V, if_stmt: &mut IfStmt) {
    v.visit_block_mut(&mut if_stmt.then);
    match &mut if_stmt.els {
        Some(Else::Block(block)) => v.visit_block_mut(block),
        Some(Else::If(nested)) => walk_if_mut(v, nested),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unquoted_path_strips_both_quote_styles() {
        let spec = ImportSpec::new(None, "fmt");
        assert_eq!(spec.path, "\"fmt\"");
        assert_eq!(spec.unquoted_path(), "fmt");

        let raw = ImportSpec {
            path: "`os`".into(),
            ..spec
        };
        assert_eq!(raw.unquoted_path(), "os");
    }

    #[test]
    fn display_name_includes_receiver() {
        let method = FuncDecl {
            name: "Serve".into(),
            receiver: Some("(s *Server)".into()),
            header: "func (s *Server) Serve()".into(),
            body: None,
        };
        assert_eq!(method.display_name(), "(s *Server).Serve");
    }

    #[test]
    fn visitor_reaches_every_nested_block() {
        struct Counter(Vec<BlockId>);
        impl VisitMut for Counter {
            fn visit_block_mut(&mut self, block: &mut Block) {
                self.0.push(block.id);
                walk_block_mut(self, block);
            }
        }

        let block = |id, stmts| Block {
            id: BlockId(id),
            stmts,
        };
        let literal = Stmt::new(StmtKind::Go(CallStmt {
            callee: Callee::Literal(FuncLit {
                signature: "func()".into(),
                body: block(3, Vec::new()),
            }),
            args: "()".into(),
        }));
        let if_stmt = Stmt::new(StmtKind::If(IfStmt {
            header: "if ok".into(),
            then: block(1, vec![literal]),
            els: Some(Else::If(Box::new(IfStmt {
                header: "if other".into(),
                then: block(4, Vec::new()),
                els: Some(Else::Block(block(5, Vec::new()))),
            }))),
        }));
        let mut file = SourceFile {
            path: PathBuf::from("a.go"),
            package: "main".into(),
            decls: vec![Decl {
                kind: DeclKind::Func(FuncDecl {
                    name: "f".into(),
                    receiver: None,
                    header: "func f()".into(),
                    body: Some(block(0, vec![if_stmt])),
                }),
                layout: Layout::default(),
            }],
            imports: Vec::new(),
        };

        let mut counter = Counter(Vec::new());
        counter.visit_file_mut(&mut file);
        assert_eq!(
            counter.0,
            vec![BlockId(0), BlockId(1), BlockId(3), BlockId(4), BlockId(5)]
        );
    }
}
