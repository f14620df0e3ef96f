//! [`SourceFile`] → Go source text.
//!
//! Deterministic printer: tab indentation, one statement per line, `case`
//! labels aligned with their `switch`, at most one blank line kept between
//! statements or declarations. Verbatim leaves are copied as-is, so their
//! continuation lines keep the indentation they had in the input.

use crate::syntax::{
    Block, CallStmt, Callee, DeclKind, Else, IfStmt, ImportDecl, ImportSpec, Layout, SourceFile,
    Stmt, StmtKind, SwitchStmt,
};

pub fn render(file: &SourceFile) -> String {
    let mut printer = Printer::default();
    for (i, decl) in file.decls.iter().enumerate() {
        if i > 0 {
            printer.out.push('\n');
            if decl.layout.blank_before {
                printer.out.push('\n');
            }
        }
        printer.decl(&decl.kind);
        printer.trailing(&decl.layout);
    }
    if !printer.out.is_empty() {
        printer.out.push('\n');
    }
    printer.out
}

#[derive(Default)]
struct Printer {
    out: String,
    depth: usize,
}

impl Printer {
    fn indent(&mut self) {
        self.indent_to(self.depth);
    }

    fn indent_to(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push('\t');
        }
    }

    /// Write `text` on its own indented line.
    fn line(&mut self, text: &str) {
        self.indent();
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn trailing(&mut self, layout: &Layout) {
        if let Some(comment) = &layout.trailing_comment {
            self.out.push(' ');
            self.out.push_str(comment);
        }
    }

    fn decl(&mut self, decl: &DeclKind) {
        match decl {
            DeclKind::Func(func) => {
                self.out.push_str(&func.header);
                if let Some(body) = &func.body {
                    self.out.push(' ');
                    self.block(body);
                }
            }
            DeclKind::Import(import) => self.import(import),
            DeclKind::Other(text) => self.out.push_str(text.as_str()),
        }
    }

    fn import(&mut self, import: &ImportDecl) {
        if let [spec] = import.specs.as_slice()
            && !import.grouped
            && import.trailing_comments.is_empty()
        {
            self.out.push_str("import ");
            self.spec(spec);
            return;
        }

        self.out.push_str("import (\n");
        self.depth += 1;
        for spec in &import.specs {
            for doc in &spec.doc {
                self.line(doc);
            }
            self.indent();
            self.spec(spec);
            self.out.push('\n');
        }
        for comment in &import.trailing_comments {
            self.line(comment);
        }
        self.depth -= 1;
        self.indent();
        self.out.push(')');
    }

    fn spec(&mut self, spec: &ImportSpec) {
        if let Some(name) = &spec.name {
            self.out.push_str(name);
            self.out.push(' ');
        }
        self.out.push_str(&spec.path);
        if let Some(comment) = &spec.comment {
            self.out.push(' ');
            self.out.push_str(comment);
        }
    }

    fn block(&mut self, block: &Block) {
        if block.stmts.is_empty() {
            self.out.push_str("{}");
            return;
        }
        self.out.push_str("{\n");
        self.depth += 1;
        self.stmts(&block.stmts);
        self.depth -= 1;
        self.indent();
        self.out.push('}');
    }

    fn stmts(&mut self, stmts: &[Stmt]) {
        for (i, stmt) in stmts.iter().enumerate() {
            if i > 0 && stmt.layout.blank_before {
                self.out.push('\n');
            }
            if let StmtKind::Labeled(text) = &stmt.kind {
                self.indent_to(self.depth.saturating_sub(1));
                self.out.push_str(text.as_str());
            } else {
                self.indent();
                self.stmt(&stmt.kind);
            }
            self.trailing(&stmt.layout);
            self.out.push('\n');
        }
    }

    fn stmt(&mut self, stmt: &StmtKind) {
        match stmt {
            StmtKind::Defer(call) => {
                self.out.push_str("defer ");
                self.call(call);
            }
            StmtKind::Go(call) => {
                self.out.push_str("go ");
                self.call(call);
            }
            StmtKind::If(if_stmt) => self.if_stmt(if_stmt),
            StmtKind::For(for_stmt) => {
                self.out.push_str(&for_stmt.header);
                self.out.push(' ');
                self.block(&for_stmt.body);
            }
            StmtKind::Switch(switch) | StmtKind::TypeSwitch(switch) => self.switch(switch),
            StmtKind::Decl(decl) => self.decl(decl),
            StmtKind::Labeled(text) | StmtKind::Other(text) => self.out.push_str(text.as_str()),
        }
    }

    fn call(&mut self, call: &CallStmt) {
        match &call.callee {
            Callee::Literal(lit) => {
                self.out.push_str(&lit.signature);
                self.out.push(' ');
                self.block(&lit.body);
            }
            Callee::Expr(callee) => self.out.push_str(callee),
        }
        self.out.push_str(&call.args);
    }

    fn if_stmt(&mut self, if_stmt: &IfStmt) {
        self.out.push_str(&if_stmt.header);
        self.out.push(' ');
        self.block(&if_stmt.then);
        match &if_stmt.els {
            Some(Else::Block(block)) => {
                self.out.push_str(" else ");
                self.block(block);
            }
            Some(Else::If(nested)) => {
                self.out.push_str(" else ");
                self.if_stmt(nested);
            }
            None => {}
        }
    }

    fn switch(&mut self, switch: &SwitchStmt) {
        self.out.push_str(&switch.header);
        self.out.push_str(" {\n");
        for clause in &switch.clauses {
            for comment in &clause.leading_comments {
                self.line(comment);
            }
            self.line(&clause.header);
            self.depth += 1;
            self.stmts(&clause.body.stmts);
            self.depth -= 1;
        }
        for comment in &switch.trailing_comments {
            self.line(comment);
        }
        self.indent();
        self.out.push('}');
    }
}
