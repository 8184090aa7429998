use crate::prelude::DB;
use std::{sync::Weak, thread::sleep, time::Duration};
use tempfile::TempDir;

/// Keeps a temporary DB directory alive and makes sure all DB references were released before
/// the directory is removed
#[derive(Default)]
pub struct DbLifetime {
    weak_db_ref: Weak<DB>,
    optional_tempdir: Option<TempDir>,
}

impl DbLifetime {
    pub fn new(tempdir: TempDir, weak_db_ref: Weak<DB>) -> Self {
        Self { optional_tempdir: Some(tempdir), weak_db_ref }
    }
}

impl Drop for DbLifetime {
    fn drop(&mut self) {
        for _ in 0..16 {
            if self.weak_db_ref.strong_count() > 0 {
                // Another thread may still be shutting down and releasing resources
                sleep(Duration::from_millis(1000));
            } else {
                break;
            }
        }
        assert_eq!(self.weak_db_ref.strong_count(), 0, "DB is expected to have no strong references when lifetime is dropped");
        if let Some(dir) = self.optional_tempdir.take() {
            let options = rocksdb::Options::default();
            let _ = DB::destroy(&options, dir.path());
        }
    }
}

pub fn get_omega_tempdir() -> std::io::Result<TempDir> {
    let omega_tempdir = std::env::temp_dir().join("omega");
    std::fs::create_dir_all(&omega_tempdir)?;
    tempfile::tempdir_in(omega_tempdir)
}

/// Creates a DB within a temp directory under `<OS SPECIFIC TEMP DIR>/omega`.
/// Callers must keep the returned `DbLifetime` alive for as long as the DB is used.
#[macro_export]
macro_rules! create_temp_db {
    ($conn_builder: expr) => {{
        let db_tempdir = $crate::utils::get_omega_tempdir().unwrap();
        let db_path = db_tempdir.path().to_owned();
        let db = $conn_builder.with_db_path(db_path).build().unwrap();
        ($crate::utils::DbLifetime::new(db_tempdir, std::sync::Arc::downgrade(&db)), db)
    }};
}
