//! Dialect rendering for each database client.
//!
//! A generated script is a list of include directives pointing at the real
//! SQL files, wrapped in whatever control syntax the client needs: block
//! terminators, post-install validation for procedures, and a quit directive.

use std::path::Path;

use dbrun_types::{DatabaseBackend, ScriptDialect};

/// Control syntax of one command-line client.
pub trait ScriptRenderer {
    /// Session settings written before the first include.
    fn preamble(&self, out: &mut String);

    /// Directive that executes `path` in place.
    fn include(&self, out: &mut String, path: &Path);

    /// Terminator that executes the pending block or batch.
    fn block_terminator(&self, out: &mut String);

    /// Checks that `procedure` exists and compiled cleanly, optionally granting
    /// execute rights to `grantee`. Failures must raise so the client exits non-zero.
    fn procedure_validation(&self, out: &mut String, procedure: &str, grantee: Option<&str>);

    fn quit(&self, out: &mut String);
}

/// SQL*Plus.
pub struct OracleRenderer;

/// sqlcmd.
pub struct SqlServerRenderer;

pub fn renderer_for(backend: DatabaseBackend) -> &'static dyn ScriptRenderer {
    match backend {
        DatabaseBackend::Oracle => &OracleRenderer,
        DatabaseBackend::SqlServer => &SqlServerRenderer,
    }
}

/// Render the full temp script for `files` in `dialect`.
pub fn render_script(backend: DatabaseBackend, dialect: ScriptDialect, files: &[impl AsRef<Path>], grantee: Option<&str>) -> String {
    let renderer = renderer_for(backend);
    let mut out = String::new();
    renderer.preamble(&mut out);

    match dialect {
        ScriptDialect::Plain => {
            for file in files {
                renderer.include(&mut out, file.as_ref());
            }
        }
        ScriptDialect::PlBlock => {
            for file in files {
                renderer.include(&mut out, file.as_ref());
            }
            renderer.block_terminator(&mut out);
        }
        ScriptDialect::Procedure => {
            for file in files {
                let file = file.as_ref();
                out.push('\n');
                renderer.include(&mut out, file);
                renderer.block_terminator(&mut out);
                renderer.procedure_validation(&mut out, &procedure_name(file), grantee);
            }
        }
    }

    renderer.quit(&mut out);
    out
}

/// Procedure installed by `file`: its stem, upper-cased.
pub fn procedure_name(file: &Path) -> String {
    file.file_stem()
        .map(|stem| stem.to_string_lossy().to_uppercase())
        .unwrap_or_default()
}

/// Escape text embedded in a single-quoted SQL literal.
fn sql_literal(text: &str) -> String {
    text.replace('\'', "''")
}

fn quoted_path(path: &Path) -> String {
    let display = path.display().to_string();
    if display.chars().any(char::is_whitespace) {
        format!("\"{display}\"")
    } else {
        display
    }
}

impl ScriptRenderer for OracleRenderer {
    fn preamble(&self, out: &mut String) {
        out.push_str("WHENEVER SQLERROR EXIT FAILURE\n");
        out.push_str("SET SERVEROUTPUT ON\n\n");
    }

    fn include(&self, out: &mut String, path: &Path) {
        out.push_str(&format!("@{}\n", quoted_path(path)));
    }

    fn block_terminator(&self, out: &mut String) {
        out.push_str("/\n");
    }

    fn procedure_validation(&self, out: &mut String, procedure: &str, grantee: Option<&str>) {
        let name = sql_literal(procedure);
        out.push('\n');
        out.push_str("DECLARE\n");
        out.push_str("\terror_count NUMBER(10);\n");
        out.push_str("\tproc_count NUMBER(10);\n");
        out.push_str("BEGIN\n");
        out.push_str(&format!(
            "\tSELECT COUNT( * ) INTO proc_count FROM user_procedures up WHERE up.OBJECT_NAME = UPPER( '{name}' );\n"
        ));
        out.push_str("\tIF proc_count <> 1 THEN\n");
        out.push_str(&format!("\t\tDBMS_OUTPUT.PUT_LINE( 'Unable to install procedure: {name}' );\n"));
        out.push_str(&format!("\t\tRAISE_APPLICATION_ERROR( -20000, 'Unable to install procedure: {name}' );\n"));
        out.push_str("\tEND IF;\n\n");
        out.push_str(&format!(
            "\tSELECT COUNT( * ) INTO error_count FROM user_errors ue WHERE ue.TYPE = 'PROCEDURE' AND ue.NAME = UPPER( '{name}' );\n"
        ));
        out.push_str("\tIF error_count <> 0 THEN\n");
        out.push_str(&format!("\t\tDBMS_OUTPUT.PUT_LINE( 'Error compiling procedure: {name}' );\n"));
        out.push_str(&format!("\t\tRAISE_APPLICATION_ERROR( -20001, 'Error compiling procedure: {name}' );\n"));
        out.push_str("\tEND IF;\n");
        if let Some(grantee) = grantee {
            let statement = sql_literal(&format!("GRANT EXECUTE ON {procedure} TO {grantee}"));
            out.push_str(&format!("\n\tEXECUTE IMMEDIATE '{statement}';\n"));
        }
        out.push_str("END;\n");
        out.push_str("/\n");
    }

    fn quit(&self, out: &mut String) {
        out.push_str("\nquit\n");
    }
}

impl ScriptRenderer for SqlServerRenderer {
    fn preamble(&self, out: &mut String) {
        out.push_str("SET NOCOUNT ON\n");
        out.push_str("GO\n\n");
    }

    fn include(&self, out: &mut String, path: &Path) {
        out.push_str(&format!(":r {}\n", quoted_path(path)));
    }

    fn block_terminator(&self, out: &mut String) {
        out.push_str("GO\n");
    }

    fn procedure_validation(&self, out: &mut String, procedure: &str, grantee: Option<&str>) {
        let name = sql_literal(procedure);
        out.push('\n');
        out.push_str(&format!("IF OBJECT_ID( N'{name}', N'P' ) IS NULL\n"));
        out.push_str("BEGIN\n");
        out.push_str(&format!("\tPRINT 'Unable to install procedure: {name}';\n"));
        out.push_str(&format!("\tRAISERROR( 'Unable to install procedure: {name}', 16, 1 );\n"));
        out.push_str("END\n");
        out.push_str("GO\n\n");
        out.push_str("BEGIN TRY\n");
        out.push_str(&format!("\tEXEC sys.sp_refreshsqlmodule N'{name}';\n"));
        out.push_str("END TRY\n");
        out.push_str("BEGIN CATCH\n");
        out.push_str(&format!("\tPRINT 'Error compiling procedure: {name}';\n"));
        out.push_str(&format!("\tRAISERROR( 'Error compiling procedure: {name}', 16, 1 );\n"));
        out.push_str("END CATCH\n");
        out.push_str("GO\n");
        if let Some(grantee) = grantee {
            out.push_str(&format!("\nGRANT EXECUTE ON {procedure} TO {grantee};\n"));
            out.push_str("GO\n");
        }
    }

    fn quit(&self, out: &mut String) {
        out.push_str("\nGO\n:QUIT\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn include_lines<'a>(script: &'a str, prefix: &str) -> Vec<&'a str> {
        script.lines().filter(|line| line.starts_with(prefix)).collect()
    }

    #[test]
    fn plain_oracle_script_includes_each_file_then_quits() {
        let files = [PathBuf::from("SQL/Tables/A.sql"), PathBuf::from("SQL/Tables/B.sql")];
        let script = render_script(DatabaseBackend::Oracle, ScriptDialect::Plain, &files, None);

        assert_eq!(include_lines(&script, "@"), vec!["@SQL/Tables/A.sql", "@SQL/Tables/B.sql"]);
        assert!(script.starts_with("WHENEVER SQLERROR EXIT FAILURE\n"));
        assert!(script.ends_with("\nquit\n"));
        assert!(!script.lines().any(|line| line == "/"));
    }

    #[test]
    fn pl_block_adds_terminator_before_quit() {
        let files = [PathBuf::from("SQL/Init.sql")];
        let script = render_script(DatabaseBackend::Oracle, ScriptDialect::PlBlock, &files, None);
        assert!(script.ends_with("@SQL/Init.sql\n/\n\nquit\n"), "unexpected script:\n{script}");
    }

    #[test]
    fn procedure_validation_uses_upper_cased_stem() {
        let files = [PathBuf::from("SQL/Procedures/Foo.sql")];
        let script = render_script(DatabaseBackend::Oracle, ScriptDialect::Procedure, &files, Some("ccg_app"));

        assert!(script.contains("\n@SQL/Procedures/Foo.sql\n/\n"));
        assert!(script.contains("up.OBJECT_NAME = UPPER( 'FOO' )"));
        assert!(script.contains("ue.NAME = UPPER( 'FOO' )"));
        assert!(script.contains("RAISE_APPLICATION_ERROR( -20000, 'Unable to install procedure: FOO' )"));
        assert!(script.contains("RAISE_APPLICATION_ERROR( -20001, 'Error compiling procedure: FOO' )"));
        assert!(script.contains("EXECUTE IMMEDIATE 'GRANT EXECUTE ON FOO TO ccg_app';"));
        assert!(script.ends_with("END;\n/\n\nquit\n"));
    }

    #[test]
    fn procedure_without_grantee_emits_no_grant() {
        let files = [PathBuf::from("SQL/Procedures/Foo.sql")];
        let oracle = render_script(DatabaseBackend::Oracle, ScriptDialect::Procedure, &files, None);
        let sql_server = render_script(DatabaseBackend::SqlServer, ScriptDialect::Procedure, &files, None);
        assert!(!oracle.contains("GRANT"));
        assert!(!sql_server.contains("GRANT"));
    }

    #[test]
    fn procedure_names_are_escaped_in_literals() {
        let files = [PathBuf::from("SQL/Procedures/O'Brien.sql")];
        let script = render_script(DatabaseBackend::Oracle, ScriptDialect::Procedure, &files, None);
        assert!(script.contains("UPPER( 'O''BRIEN' )"));
    }

    #[test]
    fn sql_server_uses_sqlcmd_directives() {
        let files = [PathBuf::from("SQL/Procedures/GetAccount.sql")];
        let script = render_script(DatabaseBackend::SqlServer, ScriptDialect::Procedure, &files, Some("ccg_app"));

        assert_eq!(include_lines(&script, ":r "), vec![":r SQL/Procedures/GetAccount.sql"]);
        assert!(script.contains("IF OBJECT_ID( N'GETACCOUNT', N'P' ) IS NULL"));
        assert!(script.contains("EXEC sys.sp_refreshsqlmodule N'GETACCOUNT';"));
        assert!(script.contains("GRANT EXECUTE ON GETACCOUNT TO ccg_app;"));
        assert!(script.ends_with("GO\n:QUIT\n"));
    }

    #[test]
    fn paths_with_spaces_are_quoted() {
        let files = [PathBuf::from("SQL/My Tables/A.sql")];
        let oracle = render_script(DatabaseBackend::Oracle, ScriptDialect::Plain, &files, None);
        let sql_server = render_script(DatabaseBackend::SqlServer, ScriptDialect::Plain, &files, None);
        assert!(oracle.contains("@\"SQL/My Tables/A.sql\"\n"));
        assert!(sql_server.contains(":r \"SQL/My Tables/A.sql\"\n"));
    }
}
