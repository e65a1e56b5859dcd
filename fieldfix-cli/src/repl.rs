//! Line-oriented interactive correction session.

use fieldfix_core::{CorrectionSession, FieldEdit, SaveOutcome, ToolError};
use fieldfix_render::{render_missing, render_progress, render_worklist_md};
use fieldfix_types::{ErrorKey, ErrorKind};
use std::io::{BufRead, Write};
use tracing::debug;

const HELP: &str = "\
Commands:
  list                                    show outstanding errors
  value <kind> <id> <variable> <n>        set the corrected value
  explain <kind> <id> <variable> <text>   set the explanation
  progress                                show how many corrections are complete
  save                                    save all corrections
  help                                    show this help
  quit                                    leave the session
<kind> is 'constraint' or 'logic'.
";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    List,
    Edit(ErrorKey, FieldEdit),
    Progress,
    Save,
    Help,
    Quit,
}

/// Split off the first whitespace-delimited word; the rest is trimmed.
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim()),
        None => (s, ""),
    }
}

fn parse_key(rest: &str) -> Result<(ErrorKey, &str), String> {
    let (kind, rest) = split_word(rest);
    let (id, rest) = split_word(rest);
    let (variable, rest) = split_word(rest);
    if variable.is_empty() {
        return Err("expected <kind> <id> <variable>".to_string());
    }
    let kind = ErrorKind::parse(kind)
        .ok_or_else(|| format!("unknown kind '{}' (expected constraint or logic)", kind))?;
    Ok((ErrorKey::new(kind, id, variable), rest))
}

fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let (word, rest) = split_word(line);
    let cmd = match word.to_ascii_lowercase().as_str() {
        "" => return Ok(None),
        "list" | "ls" => Command::List,
        "progress" => Command::Progress,
        "save" => Command::Save,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "value" => {
            let (key, value) = parse_key(rest)?;
            let edit = FieldEdit::parse("value", value).map_err(|e| e.to_string())?;
            Command::Edit(key, edit)
        }
        "explain" => {
            let (key, text) = parse_key(rest)?;
            Command::Edit(key, FieldEdit::Explanation(text.to_string()))
        }
        other => return Err(format!("unknown command '{}' (try 'help')", other)),
    };
    Ok(Some(cmd))
}

/// Drive `session` from `input` until `quit` or end of input.
///
/// Edit, validation and save failures are reported and the loop continues with the edits intact.
/// Configuration and auth failures end the session.
pub fn run_session<R: BufRead, W: Write>(
    session: &mut CorrectionSession<'_>,
    input: R,
    out: &mut W,
) -> Result<(), ToolError> {
    writeln!(out, "Session for {}. Type 'help' for commands.", session.enumerator())
        .map_err(anyhow::Error::from)?;

    for line in input.lines() {
        let line = line.map_err(anyhow::Error::from)?;
        let cmd = match parse_command(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(msg) => {
                writeln!(out, "error: {}", msg).map_err(anyhow::Error::from)?;
                continue;
            }
        };
        debug!(?cmd, "session command");
        if cmd == Command::Quit {
            break;
        }
        match step(session, cmd) {
            Ok(text) => out.write_all(text.as_bytes()).map_err(anyhow::Error::from)?,
            Err(e @ (ToolError::Configuration(_) | ToolError::AuthExpired { .. })) => return Err(e),
            Err(ToolError::Incomplete(c)) => {
                let text = format!(
                    "Cannot save yet.\n{}{}",
                    render_progress(&c),
                    render_missing(&c)
                );
                out.write_all(text.as_bytes()).map_err(anyhow::Error::from)?;
            }
            Err(e) => writeln!(out, "error: {}", e).map_err(anyhow::Error::from)?,
        }
    }

    if !session.state().pending().is_empty() {
        writeln!(
            out,
            "{} unsaved corrections were discarded.",
            session.state().pending().len()
        )
        .map_err(anyhow::Error::from)?;
    }
    Ok(())
}

fn step(session: &mut CorrectionSession<'_>, cmd: Command) -> Result<String, ToolError> {
    match cmd {
        Command::List => {
            let outstanding = session.outstanding()?;
            Ok(render_worklist_md(&outstanding, session.state()))
        }
        Command::Edit(key, edit) => {
            session.record_edit(&key, edit)?;
            Ok(format!("ok: {}\n", key.label()))
        }
        Command::Progress => Ok(render_progress(&session.progress()?)),
        Command::Save => match session.save()? {
            SaveOutcome::NothingToSave => Ok("No outstanding errors; nothing to save.\n".to_string()),
            SaveOutcome::Saved {
                records,
                rows_total,
            } => Ok(format!(
                "Saved {} corrections ({} rows in ledger).\n",
                records, rows_total
            )),
        },
        Command::Help => Ok(HELP.to_string()),
        Command::Quit => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fieldfix_core::FixedClock;
    use fieldfix_core::settings::SessionSettings;
    use fieldfix_core::ports::BlobStore;
    use fieldfix_ledger::{Blob, MemoryBlobStore, PutOutcome, StoreError, VersionToken};
    use fieldfix_types::tables;
    use pretty_assertions::assert_eq;

    const CONSTRAINTS: &str = "\
unique_id,variable,username,farmer_name,phone_no,value,constraint
101,plot_size,enum_01,Almaz,0911000000,600,max 500
";
    const LOGIC: &str = "\
unique_id,variable,username,farmer_name,phone_no,value,Troster Value
202,crop_area,enum_01,Bekele,0922000000,40,25
";

    fn store() -> MemoryBlobStore {
        MemoryBlobStore::new()
            .with_blob(tables::CONSTRAINTS, CONSTRAINTS)
            .with_blob(tables::LOGIC, LOGIC)
    }

    fn clock() -> FixedClock {
        FixedClock(
            NaiveDate::from_ymd_opt(2025, 3, 5)
                .and_then(|d| d.and_hms_opt(9, 30, 0))
                .expect("valid"),
        )
    }

    fn run(store: &MemoryBlobStore, script: &str) -> String {
        let clock = clock();
        let settings = SessionSettings {
            enumerator: "enum_01".into(),
            ..SessionSettings::default()
        };
        let mut session = CorrectionSession::start(store, &clock, settings).expect("start");
        let mut out = Vec::new();
        run_session(&mut session, script.as_bytes(), &mut out).expect("session");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command("   "), Ok(None));
        assert_eq!(parse_command("LIST"), Ok(Some(Command::List)));
        assert_eq!(
            parse_command("value constraint 101 plot_size 450"),
            Ok(Some(Command::Edit(
                ErrorKey::new(ErrorKind::Constraint, "101", "plot_size"),
                FieldEdit::CorrectedValue(450)
            )))
        );
        assert_eq!(
            parse_command("explain logic 202 crop_area  farmer  recounted "),
            Ok(Some(Command::Edit(
                ErrorKey::new(ErrorKind::Logic, "202", "crop_area"),
                FieldEdit::Explanation("farmer  recounted".into())
            )))
        );
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!(parse_command("value range 1 v 3").is_err());
        assert!(parse_command("value logic 1").is_err());
        assert!(parse_command("value logic 1 v 4.5").is_err());
        assert!(parse_command("frobnicate").is_err());
    }

    #[test]
    fn full_session_saves_and_clears_the_worklist() {
        let store = store();
        let out = run(
            &store,
            "list\n\
             value constraint 101 plot_size 450\n\
             save\n\
             explain constraint 101 plot_size re-measured\n\
             explain logic 202 crop_area system value outdated\n\
             progress\n\
             save\n\
             list\n\
             quit\n",
        );

        assert!(out.contains("- Farmers to call: 2"), "{}", out);
        assert!(out.contains("Cannot save yet.\nProgress: 0/2 corrections completed\n"));
        assert!(out.contains("• Constraint error for plot_size - Explanation required\n"));
        assert!(out.contains("• Logic error for crop_area - Explanation required\n"));
        assert!(out.contains("Progress: 2/2 corrections completed\n"));
        assert!(out.contains("Saved 2 corrections (2 rows in ledger).\n"));
        assert!(out.contains("_No errors to correct._"));
        assert!(!out.contains("unsaved corrections"));
        assert!(store.contents(tables::CORRECTIONS).is_some());
    }

    #[test]
    fn bad_edits_are_reported_and_the_loop_continues() {
        let out = run(
            &store(),
            "value logic 999 crop_area 3\nexplain logic 202 crop_area ok\n",
        );
        assert!(out.contains("error: logic_999_crop_area is not an outstanding error"));
        assert!(out.contains("ok: Logic error for crop_area"));
        assert!(out.contains("1 unsaved corrections were discarded."));
    }

    /// Reads from a memory store; every write is rejected for an expired token.
    struct RevokedWrites(MemoryBlobStore);

    impl BlobStore for RevokedWrites {
        fn name(&self) -> &'static str {
            "github"
        }
        fn check_access(&self) -> Result<(), StoreError> {
            Ok(())
        }
        fn get_blob(&self, path: &str) -> Result<Option<Blob>, StoreError> {
            self.0.get_blob(path)
        }
        fn put_blob(&self, _: &str, _: &[u8], _: Option<&VersionToken>) -> PutOutcome {
            PutOutcome::AuthExpired { backend: "github" }
        }
        fn list_blobs(&self) -> Result<Vec<String>, StoreError> {
            self.0.list_blobs()
        }
    }

    #[test]
    fn expired_token_during_save_ends_the_session() {
        let store = RevokedWrites(store());
        let clock = clock();
        let settings = SessionSettings {
            enumerator: "enum_01".into(),
            ..SessionSettings::default()
        };
        let mut session = CorrectionSession::start(&store, &clock, settings).expect("start");
        let mut out = Vec::new();
        let script = "explain constraint 101 plot_size ok
\
                      explain logic 202 crop_area ok
\
                      save
\
                      list
";

        let err = run_session(&mut session, script.as_bytes(), &mut out).expect_err("fatal");
        assert!(matches!(err, ToolError::AuthExpired { .. }));
        let out = String::from_utf8(out).expect("utf8");
        assert!(!out.contains("Farmers to call"), "{}", out);
    }
}
