//! Runs embedded `PostgreSQL` lifecycle operations for the integration tests.
//!
//! ```text
//! pg_worker <setup|start|stop> <config-path>
//! ```
//!
//! The file at `config-path` holds a JSON [`WorkerPayload`] with the cluster
//! settings and environment overrides. `PostgreSQL` refuses to run as root, so
//! a root caller is re-executed as `nobody` through `runuser`; when `runuser`
//! is unavailable the process drops its own privileges instead.

#[cfg(unix)]
use camino::{Utf8Path, Utf8PathBuf};
#[cfg(unix)]
use nix::unistd::{Uid, User, initgroups, setgid, setuid};
#[cfg(unix)]
use pg_embedded_setup_unpriv::ambient_dir_and_path;
#[cfg(unix)]
use pg_embedded_setup_unpriv::worker::{PlainSecret, WorkerPayload};
#[cfg(unix)]
use postgresql_embedded::{PostgreSQL, Status};
#[cfg(unix)]
use std::env;
#[cfg(unix)]
use std::ffi::CString;
#[cfg(unix)]
use std::io::Read;
#[cfg(unix)]
use std::process::Command;
#[cfg(unix)]
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[cfg(unix)]
const REEXEC_ENV: &str = "PG_WORKER_REEXEC";
#[cfg(unix)]
const TRUSTED_PATH: &str = "/usr/sbin:/usr/bin:/sbin:/bin";
#[cfg(unix)]
const UNPRIVILEGED_USER: &str = "nobody";

#[cfg(unix)]
#[derive(Debug, Error)]
enum WorkerError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("failed to read worker config: {0}")]
    ConfigRead(#[source] BoxError),
    #[error("failed to parse worker config: {0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("settings conversion failed: {0}")]
    Settings(String),
    #[error("runtime init failed: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("failed to drop privileges: {0}")]
    PrivilegeDrop(String),
    #[error("postgres operation failed: {0}")]
    Postgres(String),
}

#[cfg(unix)]
#[derive(Debug, Clone, Copy)]
enum Operation {
    Setup,
    Start,
    Stop,
}

#[cfg(unix)]
impl TryFrom<&str> for Operation {
    type Error = WorkerError;

    fn try_from(value: &str) -> Result<Self, WorkerError> {
        match value {
            "setup" => Ok(Self::Setup),
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            other => Err(WorkerError::InvalidArgs(format!(
                "unknown operation '{other}'; expected setup, start, or stop"
            ))),
        }
    }
}

#[cfg(unix)]
fn main() -> Result<(), BoxError> {
    let args: Vec<String> = env::args().collect();
    reexec_unprivileged(&args)?;
    let (operation, config_path) = parse_args(&args)?;
    let payload = load_payload(&config_path)?;
    drop_privileges()?;
    run(operation, payload).map_err(Into::into)
}

#[cfg(unix)]
fn parse_args(args: &[String]) -> Result<(Operation, Utf8PathBuf), WorkerError> {
    match args {
        [_, operation, config_path] => Ok((
            Operation::try_from(operation.as_str())?,
            Utf8PathBuf::from(config_path),
        )),
        _ => Err(WorkerError::InvalidArgs(
            "expected exactly <operation> <config-path>".to_owned(),
        )),
    }
}

#[cfg(unix)]
fn load_payload(path: &Utf8Path) -> Result<WorkerPayload, WorkerError> {
    let read = || -> Result<Vec<u8>, BoxError> {
        let (dir, relative) = ambient_dir_and_path(path)?;
        let mut file = dir.open(relative.as_std_path())?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Ok(bytes)
    };
    let bytes = read().map_err(WorkerError::ConfigRead)?;
    serde_json::from_slice(&bytes).map_err(WorkerError::ConfigParse)
}

#[cfg(unix)]
fn run(operation: Operation, payload: WorkerPayload) -> Result<(), WorkerError> {
    let settings = payload
        .settings
        .into_settings()
        .map_err(|err| WorkerError::Settings(err.to_string()))?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(WorkerError::Runtime)?;
    apply_environment(&payload.environment);

    let mut postgres = PostgreSQL::new(settings);
    runtime.block_on(async {
        match operation {
            Operation::Setup => {
                postgres.setup().await.map_err(postgres_error)?;
                ensure_started(&mut postgres).await
            }
            Operation::Start => {
                ensure_started(&mut postgres).await?;
                // Dropping the handle would stop the server this worker started.
                let _running = std::mem::ManuallyDrop::new(postgres);
                Ok(())
            }
            Operation::Stop => postgres.stop().await.map_err(postgres_error),
        }
    })
}

#[cfg(unix)]
async fn ensure_started(postgres: &mut PostgreSQL) -> Result<(), WorkerError> {
    if matches!(postgres.status(), Status::Started) {
        return Ok(());
    }
    postgres.start().await.map_err(postgres_error)
}

#[cfg(unix)]
fn postgres_error(err: postgresql_embedded::Error) -> WorkerError {
    WorkerError::Postgres(err.to_string())
}

#[cfg(unix)]
fn reexec_unprivileged(args: &[String]) -> Result<(), WorkerError> {
    if !Uid::effective().is_root() || env::var_os(REEXEC_ENV).is_some() {
        return Ok(());
    }
    let exe = env::current_exe().map_err(WorkerError::Runtime)?;
    let outcome = Command::new("runuser")
        .arg("-u")
        .arg(UNPRIVILEGED_USER)
        .arg("--")
        .arg(exe)
        .args(args.iter().skip(1))
        .env(REEXEC_ENV, "1")
        .env("PATH", TRUSTED_PATH)
        .status();
    match outcome {
        Ok(status) => std::process::exit(status.code().unwrap_or(1)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(WorkerError::PrivilegeDrop(err.to_string())),
    }
}

#[cfg(unix)]
fn drop_privileges() -> Result<(), WorkerError> {
    if !Uid::effective().is_root() {
        return Ok(());
    }
    let privilege = |err: nix::Error| WorkerError::PrivilegeDrop(err.to_string());
    let user = User::from_name(UNPRIVILEGED_USER)
        .map_err(privilege)?
        .ok_or_else(|| {
            WorkerError::PrivilegeDrop(format!("user '{UNPRIVILEGED_USER}' not found"))
        })?;
    let name = CString::new(user.name.clone())
        .map_err(|err| WorkerError::PrivilegeDrop(err.to_string()))?;
    initgroups(&name, user.gid).map_err(privilege)?;
    setgid(user.gid).map_err(privilege)?;
    setuid(user.uid).map_err(privilege)?;

    // SAFETY: the worker is single-threaded until the runtime is built.
    unsafe {
        env::set_var("HOME", &user.dir);
        env::set_var("USER", &user.name);
        env::set_var("LOGNAME", &user.name);
    }
    Ok(())
}

#[cfg(unix)]
fn apply_environment(environment: &[(String, Option<PlainSecret>)]) {
    for (key, value) in environment {
        // SAFETY: the runtime is current-thread and no task has been spawned yet.
        unsafe {
            match value {
                Some(secret) => env::set_var(key, secret.expose()),
                None => env::remove_var(key),
            }
        }
    }
}

#[cfg(not(unix))]
fn main() -> Result<(), BoxError> {
    Err("pg_worker is only supported on Unix platforms".into())
}
