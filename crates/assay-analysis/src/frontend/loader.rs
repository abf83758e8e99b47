//! Package loading: source discovery, parsing, package grouping, and the
//! resolve and lower passes that turn sources into a `Program`.

use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info_span, warn};

use assay_core::errors::SourceError;
use assay_core::types::collections::FxHashMap;

use super::lower_dataflow::lower_program;
use super::lower_syntax::{count_errors, lower_file, parse_go};
use super::resolve::resolve_program;
use crate::model::dataflow::CallGraph;
use crate::model::position::FileSet;
use crate::model::program::{Package, Program};
use crate::model::syntax::SyntaxFile;

struct PendingFile {
    import_path: String,
    name: String,
    content: String,
}

/// Collects package sources and builds a `Program` from them.
#[derive(Default)]
pub struct ProgramBuilder {
    files: Vec<PendingFile>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one in-memory source file belonging to the package directory
    /// `import_path`.
    pub fn add_source(
        &mut self,
        import_path: &str,
        name: &str,
        content: impl Into<String>,
    ) -> &mut Self {
        self.files.push(PendingFile {
            import_path: import_path.to_string(),
            name: name.to_string(),
            content: content.into(),
        });
        self
    }

    /// Add every `.go` file directly inside `dir`.
    pub fn add_package_dir(&mut self, dir: &Path, import_path: &str) -> Result<&mut Self, SourceError> {
        let mut paths = Vec::new();
        let walker = ignore::WalkBuilder::new(dir)
            .max_depth(Some(1))
            .hidden(true)
            .build();
        for entry in walker {
            let entry = entry.map_err(|e| SourceError::Io {
                path: dir.display().to_string(),
                source: std::io::Error::other(e.to_string()),
            })?;
            let path = entry.path();
            let is_go = path.extension().is_some_and(|ext| ext == "go");
            if is_go && entry.file_type().is_some_and(|t| t.is_file()) {
                paths.push(path.to_path_buf());
            }
        }
        if paths.is_empty() {
            return Err(SourceError::NoGoFiles {
                path: dir.display().to_string(),
            });
        }
        paths.sort();

        for path in paths {
            let content = std::fs::read_to_string(&path).map_err(|source| SourceError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.add_source(import_path, &name, content);
        }
        Ok(self)
    }

    /// Parse, group, resolve, and lower everything added so far.
    pub fn build(self) -> Result<Program, SourceError> {
        let _span = info_span!("assay.load", files = self.files.len()).entered();

        let mut fileset = FileSet::new();
        let bases: Vec<u32> = self
            .files
            .iter()
            .map(|f| {
                let idx = fileset.add_file(&f.name, &f.content);
                fileset.file(idx).base
            })
            .collect();

        let files: Vec<SyntaxFile> = self
            .files
            .par_iter()
            .zip(bases.par_iter())
            .map(|(pending, base)| {
                let tree = parse_go(&pending.content).map_err(|message| SourceError::ParseFailed {
                    file: pending.name.clone(),
                    message,
                })?;
                let errors = count_errors(tree.root_node());
                if errors > 0 {
                    warn!(file = %pending.name, errors, "syntax errors; continuing with partial tree");
                }
                Ok(lower_file(&pending.name, &pending.content, &tree, *base))
            })
            .collect::<Result<_, SourceError>>()?;

        let packages = group_packages(&self.files, &files)?;
        let types = resolve_program(&files, &packages);
        let lowered = lower_program(&files, &packages, &types);
        let call_graph = CallGraph::build(&lowered.dataflow);

        debug!(
            packages = packages.len(),
            functions = lowered.dataflow.functions().len(),
            objects = types.len(),
            calls = call_graph.edge_count(),
            "program loaded"
        );

        Ok(Program {
            fileset,
            files,
            packages,
            types,
            dataflow: lowered.dataflow,
            call_graph,
            decls: lowered.decls,
            func_objects: lowered.func_objects,
        })
    }
}

/// Group files by directory and package clause. In a directory whose
/// package is `foo`, files declaring `foo_test` form `<path>_test`.
fn group_packages(pending: &[PendingFile], files: &[SyntaxFile]) -> Result<Vec<Package>, SourceError> {
    let mut dirs: FxHashMap<&str, Vec<usize>> = FxHashMap::default();
    for (idx, p) in pending.iter().enumerate() {
        dirs.entry(p.import_path.as_str()).or_default().push(idx);
    }

    let mut packages = Vec::new();
    for (dir, indices) in dirs {
        let mut base_name: Option<&str> = None;
        for &idx in &indices {
            let name = files[idx].package_name.as_str();
            if name.ends_with("_test") {
                continue;
            }
            match base_name {
                None => base_name = Some(name),
                Some(existing) if existing != name => {
                    return Err(SourceError::ConflictingPackages {
                        path: dir.to_string(),
                        first: existing.to_string(),
                        second: name.to_string(),
                    });
                }
                Some(_) => {}
            }
        }

        let mut primary = Vec::new();
        let mut external = Vec::new();
        let mut external_name: Option<&str> = None;
        for &idx in &indices {
            let name = files[idx].package_name.as_str();
            if Some(name) == base_name {
                primary.push(idx);
                continue;
            }
            let matches_base = base_name.map_or(true, |base| name == format!("{base}_test"));
            if !matches_base {
                return Err(SourceError::ConflictingPackages {
                    path: dir.to_string(),
                    first: base_name.unwrap_or_default().to_string(),
                    second: name.to_string(),
                });
            }
            external_name = Some(name);
            external.push(idx);
        }

        if let Some(name) = base_name {
            packages.push(Package {
                path: dir.to_string(),
                name: name.to_string(),
                files: primary,
            });
        }
        if let Some(name) = external_name {
            packages.push(Package {
                path: format!("{dir}_test"),
                name: name.to_string(),
                files: external,
            });
        }
    }
    packages.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(packages)
}

/// Load one package directory (plus its external test package).
pub fn load_package_dir(dir: &Path, import_path: &str) -> Result<Program, SourceError> {
    let mut builder = ProgramBuilder::new();
    builder.add_package_dir(dir, import_path)?;
    builder.build()
}

/// Load one package from in-memory `(file name, source)` pairs.
pub fn load_sources(import_path: &str, sources: &[(&str, &str)]) -> Result<Program, SourceError> {
    if sources.is_empty() {
        return Err(SourceError::NoGoFiles {
            path: import_path.to_string(),
        });
    }
    let mut builder = ProgramBuilder::new();
    for (name, content) in sources {
        builder.add_source(import_path, name, *content);
    }
    builder.build()
}
