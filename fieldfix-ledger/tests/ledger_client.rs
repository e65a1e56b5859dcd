//! Ledger client behaviour against the in-memory and directory backends.

use camino::Utf8PathBuf;
use fieldfix_ledger::{
    AppendOutcome, Blob, BlobStore, DirBlobStore, LedgerClient, MemoryBlobStore, PutOutcome,
    StoreError, VersionToken, decode_corrections,
};
use fieldfix_types::{CorrectionRecord, ErrorKind, LEDGER_COLUMNS};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;

const LEDGER: &str = "corrections.csv";

fn correction(unique_id: &str, variable: &str, value: i64) -> CorrectionRecord {
    CorrectionRecord {
        error_type: ErrorKind::Constraint,
        username: "enum_01".to_string(),
        supervisor: "sup_a".to_string(),
        woreda: "Adami Tulu".to_string(),
        kebele: "Bochessa".to_string(),
        farmer_name: "Almaz".to_string(),
        phone_no: "0911000000".to_string(),
        subdate: "2025-03-01".to_string(),
        unique_id: unique_id.to_string(),
        variable: variable.to_string(),
        original_value: "600".to_string(),
        reference_value: "max 500, min 0".to_string(),
        correct_value: value,
        explanation: "farmer re-measured, plot is smaller".to_string(),
        corrected_by: "enum_01".to_string(),
        correction_date: "05-Mar-25".to_string(),
        correction_timestamp: "2025-03-05T10:00:00.000000".to_string(),
    }
}

fn read_back(client: &LedgerClient<'_>) -> Vec<CorrectionRecord> {
    let table = client.read_table(LEDGER).expect("read").expect("ledger exists");
    assert_eq!(table.header, LEDGER_COLUMNS.to_vec());
    decode_corrections(&table, LEDGER).expect("decode")
}

#[test]
fn append_to_empty_ledger_round_trips_in_order() {
    let store = MemoryBlobStore::new();
    let client = LedgerClient::new(&store);
    let rows: Vec<_> = (0..5)
        .map(|i| correction(&format!("{}", 100 + i), "plot_size", i * 10))
        .collect();

    let outcome = client.append(LEDGER, &rows);
    assert_eq!(outcome, AppendOutcome::Written { rows_total: 5 });
    assert_eq!(read_back(&client), rows);
}

#[test]
fn append_keeps_existing_rows() {
    let store = MemoryBlobStore::new();
    let client = LedgerClient::new(&store);
    let first = vec![correction("101", "plot_size", 450)];
    let second = vec![correction("102", "yield", 12), correction("103", "yield", 9)];

    assert!(client.append(LEDGER, &first).is_success());
    assert_eq!(
        client.append(LEDGER, &second),
        AppendOutcome::Written { rows_total: 3 }
    );

    let all = read_back(&client);
    assert_eq!(all.len(), 3);
    assert_eq!(all[0], first[0]);
    assert_eq!(all[2], second[1]);
}

#[test]
fn legacy_ledger_gains_missing_columns_at_the_end() {
    // Older ledger written with a different column order and without supervisor.
    let legacy = "\
unique_id,error_type,variable,username,original_value,reference_value,correct_value,explanation,corrected_by,correction_date,correction_timestamp,woreda,kebele,farmer_name,phone_no,subdate
9,logic,crop_area,enum_02,40,25,30,typo,enum_02,01-Mar-25,2025-03-01T09:00:00,w,k,Bekele,0922,2025-02-20
";
    let store = MemoryBlobStore::new().with_blob(LEDGER, legacy);
    let client = LedgerClient::new(&store);

    assert!(client.append(LEDGER, &[correction("101", "plot_size", 450)]).is_success());

    let table = client.read_table(LEDGER).expect("read").expect("ledger exists");
    assert_eq!(table.header.first().map(String::as_str), Some("unique_id"));
    assert_eq!(table.header.last().map(String::as_str), Some("supervisor"));
    assert_eq!(table.header.len(), LEDGER_COLUMNS.len());
    assert_eq!(table.rows[0][0], "9");
    assert_eq!(table.rows[0].last().map(String::as_str), Some(""));

    let all = decode_corrections(&table, LEDGER).expect("decode");
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].unique_id, "9");
    assert_eq!(all[0].error_type, ErrorKind::Logic);
    assert_eq!(all[0].supervisor, "");
    assert_eq!(all[0].correct_value, 30);
    assert_eq!(all[1], correction("101", "plot_size", 450));
}

#[test]
fn extra_ledger_columns_are_kept_on_existing_rows() {
    let mut header = LEDGER_COLUMNS.join(",");
    header.push_str(",reviewed_by");
    let mut first = LEDGER_COLUMNS.iter().map(|_| "x").collect::<Vec<_>>();
    first[0] = "constraint";
    first[12] = "7";
    let seeded = format!("{}\n{},admin_ok\n", header, first.join(","));
    let store = MemoryBlobStore::new().with_blob(LEDGER, seeded.as_str());
    let client = LedgerClient::new(&store);

    assert_eq!(
        client.append(LEDGER, &[correction("101", "plot_size", 450)]),
        AppendOutcome::Written { rows_total: 2 }
    );

    let text = String::from_utf8(store.contents(LEDGER).expect("ledger")).expect("utf8");
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some(header.as_str()));
    assert_eq!(lines.next(), Some(format!("{},admin_ok", first.join(",")).as_str()));
    let appended = lines.next().expect("appended row");
    assert!(appended.starts_with("constraint,enum_01,"));
    assert!(appended.ends_with(','), "reviewed_by is empty for new rows: {}", appended);
    assert_eq!(lines.next(), None);
}

#[test]
fn unreadable_existing_ledger_fails_without_writing() {
    let store = MemoryBlobStore::new().with_blob(LEDGER, "a,b\n1,2,3\n");
    let client = LedgerClient::new(&store);

    let outcome = client.append(LEDGER, &[correction("101", "plot_size", 450)]);
    let AppendOutcome::Failed { reason } = outcome else {
        panic!("expected failure, got {:?}", outcome);
    };
    assert!(reason.contains("corrections.csv"));
    assert_eq!(store.contents(LEDGER), Some(b"a,b\n1,2,3\n".to_vec()));
}

/// Store whose first write loses a race against another writer.
struct RacingStore {
    inner: MemoryBlobStore,
    raced: AtomicBool,
}

impl BlobStore for RacingStore {
    fn name(&self) -> &'static str {
        "racing"
    }

    fn check_access(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn get_blob(&self, path: &str) -> Result<Option<Blob>, StoreError> {
        self.inner.get_blob(path)
    }

    fn put_blob(&self, path: &str, content: &[u8], version: Option<&VersionToken>) -> PutOutcome {
        if !self.raced.swap(true, Ordering::SeqCst) {
            self.inner.insert(path, "error_type\nconstraint\n");
        }
        self.inner.put_blob(path, content, version)
    }

    fn list_blobs(&self) -> Result<Vec<String>, StoreError> {
        self.inner.list_blobs()
    }
}

#[test]
fn concurrent_writer_surfaces_as_conflict() {
    let store = RacingStore {
        inner: MemoryBlobStore::new(),
        raced: AtomicBool::new(false),
    };
    let client = LedgerClient::new(&store);
    let rows = [correction("101", "plot_size", 450)];

    assert_eq!(client.append(LEDGER, &rows), AppendOutcome::Conflict);
    // A second attempt re-reads the fresh version and goes through.
    assert!(client.append(LEDGER, &rows).is_success());
}

#[test]
fn fetch_failure_is_folded_into_failed() {
    struct DownStore;
    impl BlobStore for DownStore {
        fn name(&self) -> &'static str {
            "down"
        }
        fn check_access(&self) -> Result<(), StoreError> {
            Ok(())
        }
        fn get_blob(&self, path: &str) -> Result<Option<Blob>, StoreError> {
            Err(StoreError::Transient {
                path: path.to_string(),
                message: "connection reset".to_string(),
            })
        }
        fn put_blob(&self, _: &str, _: &[u8], _: Option<&VersionToken>) -> PutOutcome {
            unreachable!("append must not write after a failed read")
        }
        fn list_blobs(&self) -> Result<Vec<String>, StoreError> {
            Ok(vec![])
        }
    }

    let outcome = LedgerClient::new(&DownStore).append(LEDGER, &[correction("1", "v", 1)]);
    assert!(!outcome.is_success());
    assert!(matches!(outcome, AppendOutcome::Failed { reason } if reason.contains("connection reset")));
}

#[test]
fn expired_token_is_not_folded_into_failed() {
    struct ExpiredStore {
        on_read: bool,
    }
    impl BlobStore for ExpiredStore {
        fn name(&self) -> &'static str {
            "expired"
        }
        fn check_access(&self) -> Result<(), StoreError> {
            Ok(())
        }
        fn get_blob(&self, _: &str) -> Result<Option<Blob>, StoreError> {
            if self.on_read {
                Err(StoreError::AuthExpired { backend: "expired" })
            } else {
                Ok(None)
            }
        }
        fn put_blob(&self, _: &str, _: &[u8], _: Option<&VersionToken>) -> PutOutcome {
            PutOutcome::AuthExpired { backend: "expired" }
        }
        fn list_blobs(&self) -> Result<Vec<String>, StoreError> {
            Ok(vec![])
        }
    }

    for on_read in [true, false] {
        let store = ExpiredStore { on_read };
        let outcome = LedgerClient::new(&store).append(LEDGER, &[correction("1", "v", 1)]);
        assert_eq!(outcome, AppendOutcome::AuthExpired { backend: "expired" });
    }
}

#[test]
fn directory_backend_round_trips() {
    let temp = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
    let store = DirBlobStore::new(root.clone());
    let client = LedgerClient::new(&store);
    let rows = vec![correction("101", "plot_size", 450), correction("102", "yield", 3)];

    assert!(client.append(LEDGER, &rows).is_success());
    assert_eq!(read_back(&client), rows);
    assert!(root.join(LEDGER).is_file());
}

#[test]
fn missing_table_reads_as_none() {
    let store = MemoryBlobStore::new();
    assert!(LedgerClient::new(&store).read_table("logic.csv").expect("read").is_none());
}
