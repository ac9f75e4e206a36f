use std::fs;

use lib_ruuvi::{GuardError, PidLock};

#[test]
fn second_instance_is_refused_until_release() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ruuvi-exporter.pid");

    let lock = PidLock::acquire(&path).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap().trim(), std::process::id().to_string());

    let err = PidLock::acquire(&path).unwrap_err();
    assert!(matches!(err, GuardError::AlreadyRunning(_)));
    assert_ne!(err.exit_code(), 0);

    lock.release();
    lock.release();
    assert!(!path.exists());

    let again = PidLock::acquire(&path).unwrap();
    again.release();
    assert!(!path.exists());
}

#[test]
fn leftover_lock_file_is_not_broken() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ruuvi-exporter.pid");
    fs::write(&path, "424242").unwrap();

    let err = PidLock::acquire(&path).unwrap_err();
    assert!(matches!(err, GuardError::AlreadyRunning(_)));
    assert_eq!(fs::read_to_string(&path).unwrap(), "424242");
}
