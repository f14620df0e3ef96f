//! Per-directory driver: parse, discover, inject, render, persist.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::discover::{LiteralSite, discover};
use crate::error::Error;
use crate::inject::{TraceTarget, inject};
use crate::parse::{GoParser, Package, go_files};
use crate::render::render;
use crate::syntax::SourceFile;

#[derive(Debug, Clone, Default)]
pub struct Options {
    pub target: TraceTarget,
    /// Also process every sub-directory that holds Go files.
    pub recursive: bool,
    /// Print instrumented sources to stdout instead of replacing files.
    pub dry_run: bool,
    pub verbose: bool,
}

impl Options {
    /// Progress goes to stdout, or to stderr when stdout carries sources.
    fn progress(&self, message: std::fmt::Arguments<'_>) {
        if self.dry_run {
            anstream::eprintln!("{message}");
        } else {
            anstream::println!("{message}");
        }
    }
}

/// Totals over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub packages: usize,
    pub files: usize,
    pub functions: usize,
    pub literals: usize,
}

/// What instrumenting one file found and changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileReport {
    pub functions: Vec<String>,
    pub literals: Vec<LiteralSite>,
    pub blocks: usize,
    pub import_added: bool,
}

impl FileReport {
    /// Blocks were rewritten but there was no import declaration to patch.
    pub fn import_missing(&self) -> bool {
        self.blocks > 0 && !self.import_added
    }
}

/// Instrument every directory in order. The first error aborts the run;
/// files already persisted stay rewritten.
pub fn run(dirs: &[PathBuf], options: &Options) -> Result<Summary, Error> {
    let mut parser = GoParser::new()?;
    let mut summary = Summary::default();
    for root in dirs {
        let units = if options.recursive {
            source_dirs(root)?
        } else {
            vec![root.clone()]
        };
        for dir in units {
            process_dir(&mut parser, &dir, options, &mut summary)?;
        }
    }
    Ok(summary)
}

/// Parse all of `dir` first, then rewrite file by file.
pub fn process_dir(
    parser: &mut GoParser,
    dir: &Path,
    options: &Options,
    summary: &mut Summary,
) -> Result<(), Error> {
    let packages = parser.parse_dir(dir)?;
    for (name, package) in packages {
        options.progress(format_args!("{name}: {} file(s)", package.files.len()));
        process_package(package, options, summary)?;
        summary.packages += 1;
    }
    Ok(())
}

fn process_package(package: Package, options: &Options, summary: &mut Summary) -> Result<(), Error> {
    for (path, mut file) in package.files {
        let report = instrument(&mut file, &options.target);
        let text = render(&file);

        if report.import_missing() {
            anstream::eprintln!(
                "warning: {} has no import declaration; {} is not imported",
                path.display(),
                options.target.import_path
            );
        }
        if options.dry_run {
            anstream::print!("{text}");
        } else {
            persist(&path, &text)?;
        }

        options.progress(format_args!(
            "instrumented {}: {} function(s), {} literal(s)",
            path.display(),
            report.functions.len(),
            report.literals.len()
        ));
        if options.verbose {
            for name in &report.functions {
                options.progress(format_args!("  {name}"));
            }
            for site in &report.literals {
                options.progress(format_args!("  {} literal in {}", site.dispatch, site.within));
            }
        }
        summary.files += 1;
        summary.functions += report.functions.len();
        summary.literals += report.literals.len();
    }
    Ok(())
}

/// Discover and inject in place.
pub fn instrument(file: &mut SourceFile, target: &TraceTarget) -> FileReport {
    let found = discover(file);
    let injection = inject(file, &found, target);
    FileReport {
        functions: found.functions.into_iter().map(|f| f.name).collect(),
        literals: found.literals,
        blocks: injection.blocks,
        import_added: injection.import_added,
    }
}

/// Instrument a single source text without touching the filesystem.
pub fn instrument_source(path: &Path, source: &str, target: &TraceTarget) -> Result<String, Error> {
    let mut file = GoParser::new()?.parse_file(path, source)?;
    instrument(&mut file, target);
    Ok(render(&file))
}

/// Replace `path` with `text`: remove, create, write.
///
/// Not atomic. A failure after the remove leaves no file at `path`.
pub fn persist(path: &Path, text: &str) -> Result<(), Error> {
    std::fs::remove_file(path).map_err(|source| Error::Remove {
        path: path.to_path_buf(),
        source,
    })?;
    let mut out = File::create(path).map_err(|source| Error::Create {
        path: path.to_path_buf(),
        source,
    })?;
    out.write_all(text.as_bytes())
        .map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })
}

/// `root` and every directory below it that directly holds a `.go` file,
/// sorted. Honours `.gitignore`; skips `vendor`, `testdata`, and
/// directories starting with `_`.
pub fn source_dirs(root: &Path) -> Result<Vec<PathBuf>, Error> {
    let walker = WalkBuilder::new(root)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            entry.depth() == 0
                || !entry.file_type().is_some_and(|ft| ft.is_dir())
                || !(name == "vendor" || name == "testdata" || name.starts_with('_'))
        })
        .build();

    let mut dirs = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| Error::Walk {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;
        if entry.file_type().is_some_and(|ft| ft.is_dir()) && !go_files(entry.path())?.is_empty() {
            dirs.push(entry.into_path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn write(dir: &Path, name: &str, source: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, source).unwrap();
        path
    }

    fn run_on(dir: &Path) -> Result<Summary, Error> {
        run(&[dir.to_path_buf()], &Options::default())
    }

    #[test]
    fn single_return_function_is_wrapped() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            tmp.path(),
            "f.go",
            "package main\n\nimport \"fmt\"\n\nfunc f() {\n\treturn\n}\n",
        );

        let summary = run_on(tmp.path()).unwrap();
        assert_eq!(
            summary,
            Summary {
                packages: 1,
                files: 1,
                functions: 1,
                literals: 0
            }
        );

        let result = fs::read_to_string(&path).unwrap();
        let expected = "\
package main

import (
	\"fmt\"
	\"github.com/yuuki0xff/printfdebug\"
)

func f() {
	printfdebug.FuncStart()
	defer printfdebug.FuncEnd()
	return
}
";
        assert_eq!(result, expected, "Got:\n{result}");
    }

    #[test]
    fn go_literal_instrumented_named_defer_untouched() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            tmp.path(),
            "gh.go",
            "\
package main

import \"fmt\"

func g() {
	go func() {
		x()
	}()
}

func h() {
	defer x()
}

func x() { fmt.Println() }
",
        );

        let summary = run_on(tmp.path()).unwrap();
        assert_eq!(summary.functions, 3);
        assert_eq!(summary.literals, 1);

        let result = fs::read_to_string(&path).unwrap();
        assert!(
            result.contains(
                "\
func g() {
	printfdebug.FuncStart()
	defer printfdebug.FuncEnd()
	go func() {
		printfdebug.FuncStart()
		defer printfdebug.FuncEnd()
		x()
	}()
}"
            ),
            "Got:\n{result}"
        );
        assert!(
            result.contains(
                "\
func h() {
	printfdebug.FuncStart()
	defer printfdebug.FuncEnd()
	defer x()
}"
            ),
            "Got:\n{result}"
        );
    }

    #[test]
    fn empty_directory_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "README.md", "# not go\n");

        let summary = run_on(tmp.path()).unwrap();
        assert_eq!(summary, Summary::default());
        assert_eq!(
            fs::read_to_string(tmp.path().join("README.md")).unwrap(),
            "# not go\n"
        );
    }

    #[test]
    fn parse_error_aborts_before_any_write() {
        let tmp = TempDir::new().unwrap();
        let good_source = "package main\n\nfunc ok() {}\n";
        let good = write(tmp.path(), "a.go", good_source);
        write(tmp.path(), "b.go", "package main\n\nfunc broken( {\n");
        let other = TempDir::new().unwrap();
        let later = write(other.path(), "c.go", good_source);

        let err = run(
            &[tmp.path().to_path_buf(), other.path().to_path_buf()],
            &Options::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ParseError { .. }), "got {err}");
        assert!(err.to_string().contains("b.go"), "got {err}");
        assert_eq!(fs::read_to_string(good).unwrap(), good_source);
        assert_eq!(fs::read_to_string(later).unwrap(), good_source);
    }

    #[test]
    fn file_without_functions_is_rewritten_unchanged() {
        let tmp = TempDir::new().unwrap();
        let source = "package main\n\nimport \"fmt\"\n\nvar greeting = fmt.Sprint(\"hi\")\n";
        let path = write(tmp.path(), "vars.go", source);

        run_on(tmp.path()).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), source);
    }

    #[test]
    fn second_run_doubles_instrumentation() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            tmp.path(),
            "f.go",
            "package main\n\nimport \"fmt\"\n\nfunc f() {\n\tfmt.Println()\n}\n",
        );

        run_on(tmp.path()).unwrap();
        run_on(tmp.path()).unwrap();

        let result = fs::read_to_string(&path).unwrap();
        assert_eq!(
            result.matches("printfdebug.FuncStart()").count(),
            2,
            "Got:\n{result}"
        );
        assert_eq!(
            result.matches("defer printfdebug.FuncEnd()").count(),
            2,
            "Got:\n{result}"
        );
        assert_eq!(
            result.matches("\"github.com/yuuki0xff/printfdebug\"").count(),
            2,
            "Got:\n{result}"
        );
    }

    #[test]
    fn packages_in_one_directory_are_each_processed() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "lib.go", "package lib\n\nfunc A() {}\n");
        write(tmp.path(), "lib_test.go", "package lib_test\n\nfunc TestA() {}\n");

        let summary = run_on(tmp.path()).unwrap();
        assert_eq!(summary.packages, 2);
        assert_eq!(summary.files, 2);
        assert_eq!(summary.functions, 2);
    }

    #[test]
    fn dry_run_leaves_files_alone() {
        let tmp = TempDir::new().unwrap();
        let source = "package main\n\nfunc f() {}\n";
        let path = write(tmp.path(), "f.go", source);

        let options = Options {
            dry_run: true,
            ..Options::default()
        };
        let summary = run(&[tmp.path().to_path_buf()], &options).unwrap();
        assert_eq!(summary.functions, 1);
        assert_eq!(fs::read_to_string(path).unwrap(), source);
    }

    #[test]
    fn recursive_walk_skips_vendor_and_testdata() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "main.go", "package main\n\nfunc main() {}\n");
        write(root, "internal/util/util.go", "package util\n\nfunc U() {}\n");
        write(root, "internal/empty/notes.txt", "nothing\n");
        write(root, "vendor/dep/dep.go", "package dep\n\nfunc D() {}\n");
        write(root, "testdata/bad.go", "package broken(\n");

        let dirs = source_dirs(root).unwrap();
        assert_eq!(dirs, [root.to_path_buf(), root.join("internal/util")]);

        let options = Options {
            recursive: true,
            ..Options::default()
        };
        let summary = run(&[root.to_path_buf()], &options).unwrap();
        assert_eq!(summary.files, 2);
        assert_eq!(
            fs::read_to_string(root.join("vendor/dep/dep.go")).unwrap(),
            "package dep\n\nfunc D() {}\n"
        );
    }

    #[test]
    fn report_names_each_literal_and_its_function() {
        let mut file = GoParser::new()
            .unwrap()
            .parse_file(
                Path::new("g.go"),
                "package main\n\nfunc g() {\n\tgo func() {\n\t\tdefer func() {}()\n\t}()\n}\n",
            )
            .unwrap();
        let report = instrument(&mut file, &TraceTarget::default());

        assert_eq!(report.functions, ["g"]);
        let lines: Vec<String> = report
            .literals
            .iter()
            .map(|site| format!("{} literal in {}", site.dispatch, site.within))
            .collect();
        assert_eq!(lines, ["go literal in g", "defer literal in g"]);
        assert_eq!(report.blocks, 3);
    }

    #[test]
    fn persist_replaces_contents() {
        let tmp = TempDir::new().unwrap();
        let path = write(tmp.path(), "x.go", "old contents that are longer\n");
        persist(&path, "new\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
    }

    #[test]
    fn persist_missing_file_is_a_remove_error() {
        let tmp = TempDir::new().unwrap();
        let err = persist(&tmp.path().join("gone.go"), "x").unwrap_err();
        assert!(matches!(err, Error::Remove { .. }), "got {err}");
    }

    #[test]
    fn instrument_source_uses_custom_target() {
        let target = TraceTarget {
            import_path: "example.com/trace".into(),
            package: "tr".into(),
        };
        let result = instrument_source(
            Path::new("t.go"),
            "package t\n\nimport \"os\"\n\nfunc f() {\n\tos.Exit(0)\n}\n",
            &target,
        )
        .unwrap();
        assert!(
            result.contains("import (\n\t\"os\"\n\ttr \"example.com/trace\"\n)"),
            "Got:\n{result}"
        );
        assert!(
            result.contains("\ttr.FuncStart()\n\tdefer tr.FuncEnd()\n\tos.Exit(0)\n"),
            "Got:\n{result}"
        );
    }
}
