//! Go source → [`SourceFile`] lowering, backed by tree-sitter.
//!
//! The concrete syntax tree is walked once and lowered into the owned model
//! in [`crate::syntax`]. Nodes the instrumenter never looks inside are copied
//! as verbatim text slices of the original source.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tree_sitter::Node;

use crate::error::Error;
use crate::syntax::{
    Block, BlockId, CallStmt, Callee, CaseClause, Decl, DeclKind, Else, ForStmt, FuncDecl,
    FuncLit, IfStmt, ImportDecl, ImportSpec, Layout, SourceFile, Stmt, StmtKind, SwitchStmt,
    Verbatim,
};

/// The files of one Go package within a directory, keyed by path.
#[derive(Debug)]
pub struct Package {
    pub name: String,
    pub files: BTreeMap<PathBuf, SourceFile>,
}

pub struct GoParser {
    parser: tree_sitter::Parser,
}

impl GoParser {
    pub fn new() -> Result<Self, Error> {
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(&tree_sitter_go::LANGUAGE.into())?;
        Ok(Self { parser })
    }

    /// Parse every `*.go` file directly inside `dir`, grouped by package name.
    ///
    /// Stops at the first file that cannot be read or parsed.
    pub fn parse_dir(&mut self, dir: &Path) -> Result<BTreeMap<String, Package>, Error> {
        let mut packages: BTreeMap<String, Package> = BTreeMap::new();
        for path in go_files(dir)? {
            let source = std::fs::read_to_string(&path).map_err(|source| Error::ReadFile {
                path: path.clone(),
                source,
            })?;
            let file = self.parse_file(&path, &source)?;
            packages
                .entry(file.package.clone())
                .or_insert_with(|| Package {
                    name: file.package.clone(),
                    files: BTreeMap::new(),
                })
                .files
                .insert(path, file);
        }
        Ok(packages)
    }

    pub fn parse_file(&mut self, path: &Path, source: &str) -> Result<SourceFile, Error> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| Error::ParseError {
                path: path.to_path_buf(),
                line: 1,
                column: 1,
                reason: "parser produced no syntax tree".into(),
            })?;
        let root = tree.root_node();
        if root.has_error() {
            let node = first_error(root).unwrap_or(root);
            let pos = node.start_position();
            let reason = if node.is_missing() {
                format!("missing {}", node.kind())
            } else {
                let text = &source[node.byte_range()];
                let snippet: String = text.lines().next().unwrap_or("").chars().take(24).collect();
                format!("syntax error near {snippet:?}")
            };
            return Err(Error::ParseError {
                path: path.to_path_buf(),
                line: pos.row + 1,
                column: pos.column + 1,
                reason,
            });
        }

        Lowering::new(source).file(path, root)
    }
}

/// Sorted `*.go` files directly inside `dir`.
pub fn go_files(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let read_dir_err = |source| Error::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_dir_err)? {
        let path = entry.map_err(read_dir_err)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "go") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    children(node).into_iter().find_map(first_error)
}

fn children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Statement nodes may sit directly under their owner or inside a
/// `statement_list` wrapper depending on the grammar version.
fn flatten_into<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    if node.kind() == "statement_list" {
        out.extend(named_children(node));
    } else {
        out.push(node);
    }
}

fn attach_comment(layout: &mut Layout, comment: &str) {
    match &mut layout.trailing_comment {
        Some(existing) => {
            existing.push(' ');
            existing.push_str(comment);
        }
        None => layout.trailing_comment = Some(comment.to_string()),
    }
}

struct Lowering<'s> {
    source: &'s str,
    next_block: u32,
}

impl<'s> Lowering<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            next_block: 0,
        }
    }

    fn text(&self, node: Node<'_>) -> &'s str {
        &self.source[node.byte_range()]
    }

    /// Source text from the start of `node` up to (not including) `until`.
    fn header(&self, node: Node<'_>, until: Node<'_>) -> String {
        self.source[node.start_byte()..until.start_byte()]
            .trim_end()
            .to_string()
    }

    fn block_id(&mut self) -> BlockId {
        let id = BlockId(self.next_block);
        self.next_block += 1;
        id
    }

    fn file(&mut self, path: &Path, root: Node<'_>) -> Result<SourceFile, Error> {
        let mut package = None;
        let mut decls: Vec<Decl> = Vec::new();
        let mut prev_row: Option<usize> = None;

        for node in named_children(root) {
            let row = node.start_position().row;
            if node.kind() == "comment"
                && prev_row == Some(row)
                && let Some(last) = decls.last_mut()
            {
                attach_comment(&mut last.layout, self.text(node));
                continue;
            }
            if node.kind() == "package_clause" && package.is_none() {
                package = named_children(node)
                    .into_iter()
                    .find(|c| c.kind() != "comment")
                    .map(|ident| self.text(ident).to_string());
            }

            let layout = Layout {
                blank_before: prev_row.is_some_and(|prev| row > prev + 1),
                trailing_comment: None,
            };
            decls.push(Decl {
                kind: self.decl(node),
                layout,
            });
            prev_row = Some(node.end_position().row);
        }

        let package = package.ok_or_else(|| Error::MissingPackage(path.to_path_buf()))?;
        let imports = decls
            .iter()
            .filter_map(|decl| match &decl.kind {
                DeclKind::Import(import) => Some(import.specs.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect();

        Ok(SourceFile {
            path: path.to_path_buf(),
            package,
            decls,
            imports,
        })
    }

    fn decl(&mut self, node: Node<'_>) -> DeclKind {
        match node.kind() {
            "function_declaration" | "method_declaration" => DeclKind::Func(self.func_decl(node)),
            "import_declaration" => DeclKind::Import(self.import_decl(node)),
            _ => DeclKind::Other(Verbatim::new(self.text(node))),
        }
    }

    fn func_decl(&mut self, node: Node<'_>) -> FuncDecl {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let receiver = node
            .child_by_field_name("receiver")
            .map(|n| self.text(n).to_string());
        match node.child_by_field_name("body") {
            Some(body) => FuncDecl {
                name,
                receiver,
                header: self.header(node, body),
                body: Some(self.block(body)),
            },
            None => FuncDecl {
                name,
                receiver,
                header: self.text(node).to_string(),
                body: None,
            },
        }
    }

    fn import_decl(&mut self, node: Node<'_>) -> ImportDecl {
        let mut decl = ImportDecl::default();
        for child in named_children(node) {
            match child.kind() {
                "import_spec" => decl.specs.push(self.import_spec(child)),
                "import_spec_list" => {
                    decl.grouped = true;
                    self.import_list(child, &mut decl);
                }
                _ => {}
            }
        }
        decl
    }

    fn import_list(&mut self, list: Node<'_>, decl: &mut ImportDecl) {
        let mut doc = Vec::new();
        let mut prev_row = None;
        for child in named_children(list) {
            match child.kind() {
                "import_spec" => {
                    let mut spec = self.import_spec(child);
                    spec.doc = std::mem::take(&mut doc);
                    decl.specs.push(spec);
                    prev_row = Some(child.end_position().row);
                }
                "comment" => {
                    let text = self.text(child).to_string();
                    if prev_row == Some(child.start_position().row)
                        && let Some(last) = decl.specs.last_mut()
                        && last.comment.is_none()
                    {
                        last.comment = Some(text);
                    } else {
                        doc.push(text);
                    }
                }
                _ => {}
            }
        }
        decl.trailing_comments = doc;
    }

    fn import_spec(&self, node: Node<'_>) -> ImportSpec {
        ImportSpec {
            doc: Vec::new(),
            name: node
                .child_by_field_name("name")
                .map(|n| self.text(n).to_string()),
            path: node
                .child_by_field_name("path")
                .map(|n| self.text(n).to_string())
                .unwrap_or_default(),
            comment: None,
        }
    }

    fn block(&mut self, node: Node<'_>) -> Block {
        let id = self.block_id();
        let mut items = Vec::new();
        for child in named_children(node) {
            flatten_into(child, &mut items);
        }
        Block {
            id,
            stmts: self.stmts(items, node.start_position().row),
        }
    }

    /// Lower a statement sequence. `open_row` is the row of the opening
    /// brace (or case colon) so that comments on it are not treated as
    /// trailing comments of an earlier statement.
    fn stmts(&mut self, items: Vec<Node<'_>>, open_row: usize) -> Vec<Stmt> {
        let mut stmts: Vec<Stmt> = Vec::new();
        let mut prev_row = open_row;
        for node in items {
            if node.kind() == "empty_statement" {
                continue;
            }
            let row = node.start_position().row;
            if node.kind() == "comment"
                && row == prev_row
                && let Some(last) = stmts.last_mut()
            {
                attach_comment(&mut last.layout, self.text(node));
                continue;
            }
            let layout = Layout {
                blank_before: !stmts.is_empty() && row > prev_row + 1,
                trailing_comment: None,
            };
            stmts.push(Stmt {
                kind: self.stmt(node),
                layout,
            });
            prev_row = node.end_position().row;
        }
        stmts
    }

    fn stmt(&mut self, node: Node<'_>) -> StmtKind {
        let lowered = match node.kind() {
            "defer_statement" => self.call_stmt(node).map(StmtKind::Defer),
            "go_statement" => self.call_stmt(node).map(StmtKind::Go),
            "if_statement" => self.if_stmt(node).map(StmtKind::If),
            "for_statement" => node.child_by_field_name("body").map(|body| {
                StmtKind::For(ForStmt {
                    header: self.header(node, body),
                    body: self.block(body),
                })
            }),
            "expression_switch_statement" => self.switch(node).map(StmtKind::Switch),
            "type_switch_statement" => self.switch(node).map(StmtKind::TypeSwitch),
            "labeled_statement" => Some(StmtKind::Labeled(Verbatim::new(self.text(node)))),
            "var_declaration" | "const_declaration" | "type_declaration" => Some(
                StmtKind::Decl(DeclKind::Other(Verbatim::new(self.text(node)))),
            ),
            _ => None,
        };
        lowered.unwrap_or_else(|| StmtKind::Other(Verbatim::new(self.text(node))))
    }

    fn call_stmt(&mut self, node: Node<'_>) -> Option<CallStmt> {
        let call = named_children(node)
            .into_iter()
            .find(|c| c.kind() != "comment")?;
        if call.kind() != "call_expression" {
            return None;
        }
        let function = call.child_by_field_name("function")?;
        let arguments = call.child_by_field_name("arguments")?;

        let callee = if function.kind() == "func_literal"
            && let Some(body) = function.child_by_field_name("body")
        {
            Callee::Literal(FuncLit {
                signature: self.header(function, body),
                body: self.block(body),
            })
        } else {
            Callee::Expr(self.header(function, arguments))
        };
        Some(CallStmt {
            callee,
            args: self.text(arguments).to_string(),
        })
    }

    fn if_stmt(&mut self, node: Node<'_>) -> Option<IfStmt> {
        let consequence = node.child_by_field_name("consequence")?;
        let header = self.header(node, consequence);
        let then = self.block(consequence);
        let els = match node.child_by_field_name("alternative") {
            Some(alt) if alt.kind() == "if_statement" => {
                self.if_stmt(alt).map(|nested| Else::If(Box::new(nested)))
            }
            Some(alt) if alt.kind() == "block" => Some(Else::Block(self.block(alt))),
            _ => None,
        };
        Some(IfStmt { header, then, els })
    }

    fn switch(&mut self, node: Node<'_>) -> Option<SwitchStmt> {
        let all = children(node);
        let open = *all.iter().find(|c| c.kind() == "{")?;
        let header = self.header(node, open);

        let mut clauses: Vec<CaseClause> = Vec::new();
        let mut pending = Vec::new();
        for child in all
            .into_iter()
            .filter(|c| c.is_named() && c.start_byte() > open.start_byte())
        {
            match child.kind() {
                "expression_case" | "type_case" | "default_case" => {
                    if let Some(mut clause) = self.case_clause(child) {
                        clause.leading_comments = std::mem::take(&mut pending);
                        clauses.push(clause);
                    }
                }
                "comment" => pending.push(self.text(child).to_string()),
                _ => {}
            }
        }
        Some(SwitchStmt {
            header,
            clauses,
            trailing_comments: pending,
        })
    }

    fn case_clause(&mut self, node: Node<'_>) -> Option<CaseClause> {
        let all = children(node);
        let colon = all.iter().position(|c| c.kind() == ":")?;
        let header = self.source[node.start_byte()..all[colon].end_byte()].to_string();

        let mut items = Vec::new();
        for child in &all[colon + 1..] {
            if child.is_named() {
                flatten_into(*child, &mut items);
            }
        }
        let id = self.block_id();
        let stmts = self.stmts(items, all[colon].start_position().row);
        Some(CaseClause {
            leading_comments: Vec::new(),
            header,
            body: Block { id, stmts },
        })
    }
}
