//! Temp-script compilation.
//!
//! - A task's script reference is resolved under the script root; a missing
//!   reference compiles to `None` and the caller skips the task
//! - Directory references expand to their regular files, sorted by name
//! - The rendered script is written to the temp directory under a name built
//!   from the run's log name and a per-run sequence number

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use dbrun_types::{DatabaseBackend, ScriptTask};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::RunError;

pub mod render;

pub use render::{OracleRenderer, ScriptRenderer, SqlServerRenderer, procedure_name, render_script};

/// A generated temp script ready to hand to the database client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledScript {
    pub path: PathBuf,
    /// Files included by the script, in execution order.
    pub sources: Vec<PathBuf>,
}

/// Writes one temp script per task for a single run.
#[derive(Debug)]
pub struct ScriptCompiler {
    backend: DatabaseBackend,
    script_root: PathBuf,
    temp_dir: PathBuf,
    name_prefix: String,
    grantee: Option<String>,
    sequence: u32,
}

impl ScriptCompiler {
    pub fn new(
        backend: DatabaseBackend,
        script_root: impl Into<PathBuf>,
        temp_dir: impl Into<PathBuf>,
        name_prefix: impl Into<String>,
        grantee: Option<String>,
    ) -> Self {
        Self {
            backend,
            script_root: script_root.into(),
            temp_dir: temp_dir.into(),
            name_prefix: name_prefix.into(),
            grantee,
            sequence: 0,
        }
    }

    /// Compile `task` into a temp script. Returns `Ok(None)` when the
    /// reference does not exist under the script root.
    pub fn compile(&mut self, task: &ScriptTask) -> Result<Option<CompiledScript>, RunError> {
        if !stays_under_root(Path::new(&task.script)) {
            warn!(script = %task.script, root = %self.script_root.display(), "Script reference leaves the script root; skipping task");
            return Ok(None);
        }
        let full_path = self.script_root.join(&task.script);
        let sources = expand_reference(&full_path)
            .map_err(|error| RunError::io(format!("failed to read script reference {}", full_path.display()), error))?;
        let Some(sources) = sources else {
            warn!(script = %task.script, path = %full_path.display(), "Script not found; skipping task");
            return Ok(None);
        };
        if sources.is_empty() {
            warn!(script = %task.script, "Script directory is empty");
        }

        let content = render_script(self.backend, task.dialect, &sources, self.grantee.as_deref());
        let path = self.next_temp_path();
        fs::write(&path, content).map_err(|error| RunError::io(format!("failed to write temp script {}", path.display()), error))?;
        debug!(
            script = %task.script,
            dialect = %task.dialect,
            temp_script = %path.display(),
            files = sources.len(),
            "compiled temp script"
        );

        Ok(Some(CompiledScript { path, sources }))
    }

    fn next_temp_path(&mut self) -> PathBuf {
        self.sequence += 1;
        self.temp_dir.join(format!("{}_{:04}.sql", self.name_prefix, self.sequence))
    }
}

/// References must be relative and free of `..` so they resolve inside the
/// script root.
fn stays_under_root(reference: &Path) -> bool {
    reference
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

/// Expand a file or directory reference into the files it names.
///
/// Directories are not descended into; their regular files are returned in
/// lexicographic order of file name so runs are reproducible across platforms.
pub fn expand_reference(path: &Path) -> io::Result<Option<Vec<PathBuf>>> {
    if path.is_file() {
        return Ok(Some(vec![path.to_path_buf()]));
    }
    if !path.is_dir() {
        return Ok(None);
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort_by(|left, right| left.file_name().cmp(&right.file_name()));
    Ok(Some(files))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbrun_types::ScriptDialect;

    struct Fixture {
        _root: tempfile::TempDir,
        script_root: PathBuf,
        temp_dir: PathBuf,
    }

    fn fixture() -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let script_root = root.path().join("SQL");
        let temp_dir = root.path().join("Temp");
        fs::create_dir_all(script_root.join("Tables")).unwrap();
        fs::create_dir_all(script_root.join("Procedures")).unwrap();
        fs::create_dir_all(&temp_dir).unwrap();
        for name in ["Zones.sql", "Accounts.sql", "Decks.sql"] {
            fs::write(script_root.join("Tables").join(name), "CREATE TABLE x ( id NUMBER );\n").unwrap();
        }
        fs::create_dir_all(script_root.join("Tables").join("Archive")).unwrap();
        fs::write(script_root.join("Procedures").join("Foo.sql"), "CREATE PROCEDURE Foo AS BEGIN NULL; END;\n").unwrap();
        Fixture {
            _root: root,
            script_root,
            temp_dir,
        }
    }

    fn compiler(fixture: &Fixture, grantee: Option<&str>) -> ScriptCompiler {
        ScriptCompiler::new(
            DatabaseBackend::Oracle,
            &fixture.script_root,
            &fixture.temp_dir,
            "rebuild",
            grantee.map(str::to_string),
        )
    }

    #[test]
    fn directory_reference_includes_each_file_in_name_order() {
        let fixture = fixture();
        let compiled = compiler(&fixture, None)
            .compile(&ScriptTask::new("Tables", ScriptDialect::Plain))
            .unwrap()
            .expect("directory exists");

        let names: Vec<_> = compiled
            .sources
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["Accounts.sql", "Decks.sql", "Zones.sql"]);

        let script = fs::read_to_string(&compiled.path).unwrap();
        let includes: Vec<_> = script.lines().filter(|line| line.starts_with('@')).collect();
        assert_eq!(includes.len(), 3);
        assert!(includes[0].ends_with("Accounts.sql"));
        assert!(includes[2].ends_with("Zones.sql"));
    }

    #[test]
    fn file_reference_includes_exactly_one_file() {
        let fixture = fixture();
        let compiled = compiler(&fixture, None)
            .compile(&ScriptTask::new("Tables/Decks.sql", ScriptDialect::Plain))
            .unwrap()
            .expect("file exists");

        let script = fs::read_to_string(&compiled.path).unwrap();
        assert_eq!(script.lines().filter(|line| line.starts_with('@')).count(), 1);
    }

    #[test]
    fn missing_reference_compiles_to_none_without_writing() {
        let fixture = fixture();
        let result = compiler(&fixture, None)
            .compile(&ScriptTask::new("Views", ScriptDialect::Plain))
            .unwrap();
        assert!(result.is_none());
        assert_eq!(fs::read_dir(&fixture.temp_dir).unwrap().count(), 0);
    }

    #[test]
    fn references_outside_the_root_are_skipped() {
        let fixture = fixture();
        let outside = fixture._root.path().join("Outside.sql");
        fs::write(&outside, "DROP TABLE accounts;\n").unwrap();
        let mut compiler = compiler(&fixture, None);

        let absolute = compiler
            .compile(&ScriptTask::new(outside.to_string_lossy(), ScriptDialect::Plain))
            .unwrap();
        assert!(absolute.is_none());

        let parent = compiler
            .compile(&ScriptTask::new("../Outside.sql", ScriptDialect::Plain))
            .unwrap();
        assert!(parent.is_none());

        let nested_parent = compiler
            .compile(&ScriptTask::new("Tables/../../Outside.sql", ScriptDialect::Plain))
            .unwrap();
        assert!(nested_parent.is_none());
        assert_eq!(fs::read_dir(&fixture.temp_dir).unwrap().count(), 0);

        let current = compiler
            .compile(&ScriptTask::new("./Tables/Decks.sql", ScriptDialect::Plain))
            .unwrap();
        assert!(current.is_some());
    }

    #[test]
    fn temp_names_are_sequential_per_run() {
        let fixture = fixture();
        let mut compiler = compiler(&fixture, None);
        let first = compiler.compile(&ScriptTask::new("Tables", ScriptDialect::Plain)).unwrap().unwrap();
        let second = compiler.compile(&ScriptTask::new("Tables", ScriptDialect::Plain)).unwrap().unwrap();

        assert_eq!(first.path, fixture.temp_dir.join("rebuild_0001.sql"));
        assert_eq!(second.path, fixture.temp_dir.join("rebuild_0002.sql"));
    }

    #[test]
    fn procedure_task_carries_grantee() {
        let fixture = fixture();
        let compiled = compiler(&fixture, Some("ccg_app"))
            .compile(&ScriptTask::new("Procedures", ScriptDialect::Procedure))
            .unwrap()
            .unwrap();
        let script = fs::read_to_string(&compiled.path).unwrap();
        assert!(script.contains("UPPER( 'FOO' )"));
        assert!(script.contains("GRANT EXECUTE ON FOO TO ccg_app"));
    }
}
