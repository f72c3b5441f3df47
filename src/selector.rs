//! Pick a VM from a registry snapshot by its 1-based position.

use std::io::Write;

use thiserror::Error;

use crate::error::BoxerError;
use crate::prompt::Prompter;
use crate::registry::VmSnapshot;

const SELECT_PROMPT: &str = "Enter the number of the VM you want to select (or 'back' to return):";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Vm(String),
    Cancelled,
}

/// Rejected input; the user is asked again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Invalid input. Please enter a valid number.")]
    NotANumber,
    #[error("Please enter a number between 1 and {len}.")]
    OutOfRange { len: usize },
}

/// Interpret one line of input against `snapshot`.
pub fn parse_selection(snapshot: &VmSnapshot, input: &str) -> Result<Selection, SelectionError> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("back") {
        return Ok(Selection::Cancelled);
    }
    let index: i64 = input.parse().map_err(|_| SelectionError::NotANumber)?;
    usize::try_from(index)
        .ok()
        .and_then(|index| snapshot.get(index))
        .map(|entry| Selection::Vm(entry.name.clone()))
        .ok_or(SelectionError::OutOfRange {
            len: snapshot.len(),
        })
}

/// Prompt until the input names a VM in `snapshot` or the user backs out.
///
/// Never re-queries the registry: the answer always comes from `snapshot`.
pub fn select<P: Prompter, W: Write>(
    snapshot: &VmSnapshot,
    prompter: &mut P,
    out: &mut W,
) -> Result<Selection, BoxerError> {
    loop {
        let Some(input) = prompter.ask(SELECT_PROMPT)? else {
            return Ok(Selection::Cancelled);
        };
        match parse_selection(snapshot, &input) {
            Ok(selection) => return Ok(selection),
            Err(e) => writeln!(out, "{e}").map_err(|source| BoxerError::Io {
                context: "writing output".into(),
                source,
            })?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::LinePrompter;

    fn snapshot() -> VmSnapshot {
        VmSnapshot::parse("\"web-01\" {uuid}\n\"db-01\" {uuid}\n")
    }

    fn run(input: &str) -> (Selection, String) {
        let snap = snapshot();
        let mut prompter = LinePrompter::new(input.as_bytes(), std::io::sink());
        let mut out = Vec::new();
        let sel = select(&snap, &mut prompter, &mut out).unwrap();
        (sel, String::from_utf8(out).unwrap())
    }

    #[test]
    fn valid_index_returns_entry_at_position() {
        let snap = snapshot();
        for (i, name) in snap.names().enumerate() {
            assert_eq!(
                parse_selection(&snap, &(i + 1).to_string()),
                Ok(Selection::Vm(name.to_string()))
            );
        }
    }

    #[test]
    fn selects_second_vm() {
        let (sel, out) = run("2\n");
        assert_eq!(sel, Selection::Vm("db-01".into()));
        assert!(out.is_empty());
    }

    #[test]
    fn back_is_case_insensitive() {
        assert_eq!(run("BaCk\n").0, Selection::Cancelled);
        assert_eq!(run("  back \n").0, Selection::Cancelled);
    }

    #[test]
    fn out_of_range_reprompts() {
        let (sel, out) = run("0\n3\n1\n");
        assert_eq!(sel, Selection::Vm("web-01".into()));
        assert_eq!(out.matches("between 1 and 2").count(), 2);
    }

    #[test]
    fn non_numeric_reprompts() {
        let (sel, out) = run("two\n1.5\n2\n");
        assert_eq!(sel, Selection::Vm("db-01".into()));
        assert_eq!(out.matches("Invalid input").count(), 2);
    }

    #[test]
    fn negative_number_is_out_of_range() {
        let snap = snapshot();
        assert_eq!(
            parse_selection(&snap, "-1"),
            Err(SelectionError::OutOfRange { len: 2 })
        );
        let (sel, out) = run("-1\n1\n");
        assert_eq!(sel, Selection::Vm("web-01".into()));
        assert!(out.contains("Please enter a number between 1 and 2."));
        assert!(!out.contains("Invalid input"));
    }

    #[test]
    fn end_of_input_cancels() {
        assert_eq!(run("9\n").0, Selection::Cancelled);
        assert_eq!(run("").0, Selection::Cancelled);
    }

    #[test]
    fn selection_independent_of_later_registry_changes() {
        let snap = snapshot();
        let sel = parse_selection(&snap, "1").unwrap();
        let _fresh = VmSnapshot::parse("\"other\" {uuid}\n");
        assert_eq!(sel, Selection::Vm("web-01".into()));
        assert_eq!(parse_selection(&snap, "1").unwrap(), sel);
    }
}
