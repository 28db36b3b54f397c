//! Environment handed to the bootstrap and the privileged worker.

use super::BoxError;
use super::fs_utils::prepare_pg_worker;
use camino::Utf8PathBuf;
use pg_embedded_setup_unpriv::{ExecutionPrivileges, detect_execution_privileges};
use std::ffi::OsString;
use std::net::TcpListener;

const WORKER_ENV: &str = "PG_EMBEDDED_WORKER";

pub(super) fn env_vars_to_os(
    env_vars: &[(String, Option<String>)],
) -> Vec<(OsString, Option<OsString>)> {
    env_vars
        .iter()
        .map(|(key, value)| (OsString::from(key), value.as_ref().map(OsString::from)))
        .collect()
}

pub(super) fn worker_env_changes() -> Result<Vec<(OsString, Option<OsString>)>, BoxError> {
    let mut changes = Vec::new();
    if std::env::var_os("PG_PORT").is_none() {
        changes.push((OsString::from("PG_PORT"), Some(free_port()?)));
    }

    if matches!(detect_execution_privileges(), ExecutionPrivileges::Root)
        && std::env::var_os(WORKER_ENV).is_none()
    {
        let worker = locate_pg_worker().ok_or_else(|| {
            Box::new(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "PG_EMBEDDED_WORKER is not set and the pg_worker binary was not found",
            )) as BoxError
        })?;
        let prepared = prepare_pg_worker(&worker)?;
        changes.push((
            OsString::from(WORKER_ENV),
            Some(OsString::from(prepared.as_str())),
        ));
    }

    Ok(changes)
}

/// Cargo builds the package's binaries before its integration tests.
fn locate_pg_worker() -> Option<Utf8PathBuf> {
    option_env!("CARGO_BIN_EXE_pg_worker")
        .map(Utf8PathBuf::from)
        .filter(|path| path.is_file())
        .or_else(locate_pg_worker_near_target)
}

fn locate_pg_worker_near_target() -> Option<Utf8PathBuf> {
    let exe = Utf8PathBuf::try_from(std::env::current_exe().ok()?).ok()?;
    let target_dir = exe.parent()?.parent()?;
    let worker = target_dir.join("pg_worker");
    worker.is_file().then_some(worker)
}

fn free_port() -> Result<OsString, BoxError> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).map_err(|err| Box::new(err) as BoxError)?;
    let port = listener
        .local_addr()
        .map_err(|err| Box::new(err) as BoxError)?
        .port();
    Ok(OsString::from(port.to_string()))
}
