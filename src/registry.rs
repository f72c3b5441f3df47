//! VM registry snapshots parsed from `VBoxManage list vms`.
//!
//! Each line of the listing looks like `"web-01" {8f5c9a62-...}`. A snapshot
//! keeps the lines in the order VirtualBox printed them; that order is the
//! basis for 1-based selection and is only valid until the next lifecycle
//! change.

use crate::error::BoxerError;
use crate::invoker::{Invoker, argv};

/// One registered VM as listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmEntry {
    pub name: String,
    pub uuid: Option<String>,
    pub raw: String,
}

/// Ordered listing taken at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VmSnapshot {
    entries: Vec<VmEntry>,
}

impl VmSnapshot {
    /// Parse the stdout of `list vms`. Blank lines are skipped.
    pub fn parse(stdout: &str) -> Self {
        let entries = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(parse_line)
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[VmEntry] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Entry at 1-based `index`.
    pub fn get(&self, index: usize) -> Option<&VmEntry> {
        index.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_line(line: &str) -> VmEntry {
    let (name, rest) = match line.strip_prefix('"') {
        // Quoted names may contain spaces; take everything up to the closing quote.
        Some(after) => match after.find('"') {
            Some(end) => (&after[..end], &after[end + 1..]),
            None => split_first_token(line),
        },
        None => split_first_token(line),
    };

    let uuid = rest
        .trim()
        .strip_prefix('{')
        .and_then(|r| r.strip_suffix('}'))
        .map(str::to_string);

    VmEntry {
        name: name.trim_matches('"').to_string(),
        uuid,
        raw: line.to_string(),
    }
}

fn split_first_token(line: &str) -> (&str, &str) {
    line.split_once(char::is_whitespace).unwrap_or((line, ""))
}

/// Take a fresh snapshot of the registry.
pub async fn list_vms<I: Invoker>(invoker: &I) -> Result<VmSnapshot, BoxerError> {
    let args = argv(["list", "vms"]);
    let output = invoker.invoke(&args).await?.check(&args)?;
    let snapshot = VmSnapshot::parse(&output.stdout);
    tracing::debug!(count = snapshot.len(), "listed VMs");
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::stub::{StubInvoker, fail};

    const LISTING: &str = r#""web-01" {8f5c9a62-3c1e-4d4e-9d8f-1a2b3c4d5e6f}
"db-01" {0b1c2d3e-4f50-6172-8394-a5b6c7d8e9f0}
"kali template" {11111111-2222-3333-4444-555555555555}
"#;

    #[test]
    fn parses_names_in_listing_order() {
        let snap = VmSnapshot::parse(LISTING);
        let names: Vec<_> = snap.names().collect();
        assert_eq!(names, vec!["web-01", "db-01", "kali template"]);
    }

    #[test]
    fn keeps_uuid_and_raw_line() {
        let snap = VmSnapshot::parse(LISTING);
        let first = &snap.entries()[0];
        assert_eq!(
            first.uuid.as_deref(),
            Some("8f5c9a62-3c1e-4d4e-9d8f-1a2b3c4d5e6f")
        );
        assert_eq!(
            first.raw,
            "\"web-01\" {8f5c9a62-3c1e-4d4e-9d8f-1a2b3c4d5e6f}"
        );
    }

    #[test]
    fn unquoted_line_uses_first_token() {
        let snap = VmSnapshot::parse("plain-vm {abc}\n");
        assert_eq!(snap.entries()[0].name, "plain-vm");
        assert_eq!(snap.entries()[0].uuid.as_deref(), Some("abc"));
    }

    #[test]
    fn unterminated_quote_falls_back_to_first_token() {
        let snap = VmSnapshot::parse("\"broken {abc}\n");
        assert_eq!(snap.entries()[0].name, "broken");
    }

    #[test]
    fn blank_lines_skipped() {
        let snap = VmSnapshot::parse("\n\n\"a\" {1}\n   \n\"b\" {2}\n");
        assert_eq!(snap.len(), 2);
    }

    #[test]
    fn empty_output_is_empty_snapshot() {
        assert!(VmSnapshot::parse("").is_empty());
    }

    #[test]
    fn get_is_one_based() {
        let snap = VmSnapshot::parse(LISTING);
        assert_eq!(snap.get(1).unwrap().name, "web-01");
        assert_eq!(snap.get(3).unwrap().name, "kali template");
        assert!(snap.get(0).is_none());
        assert!(snap.get(4).is_none());
    }

    #[tokio::test]
    async fn list_vms_invokes_list_subcommand() {
        let stub = StubInvoker::new();
        stub.respond_ok(&["list", "vms"], LISTING);
        let snap = list_vms(&stub).await.unwrap();
        assert_eq!(snap.len(), 3);
        assert_eq!(stub.calls(), vec![argv(["list", "vms"])]);
    }

    #[tokio::test]
    async fn list_vms_empty_registry() {
        let stub = StubInvoker::new();
        let snap = list_vms(&stub).await.unwrap();
        assert!(snap.is_empty());
    }

    #[tokio::test]
    async fn list_vms_failure_surfaces_stderr() {
        let stub = StubInvoker::new();
        stub.respond(&["list"], fail(1, "VBoxManage: error: no VBoxSVC"));
        let err = list_vms(&stub).await.unwrap_err();
        assert!(err.to_string().contains("no VBoxSVC"));
    }
}
