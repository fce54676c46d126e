//! Host library registered into every session
//!
//! Assertions raise ordinary Rhai runtime errors so they classify as `eval-error`. File
//! helpers resolve relative paths against the session's working directory, which keeps test
//! scripts independent of the directory the harness process was started from.

use std::fs;
use std::path::{Path, PathBuf};

use rhai::{Dynamic, Engine, EvalAltResult};

type HostResult<T> = Result<T, Box<EvalAltResult>>;

pub(super) fn register(engine: &mut Engine, working_dir: &Path) {
    engine
        .on_print(|text| tracing::info!("{text}"))
        .on_debug(|text, source, pos| match source {
            Some(source) => tracing::debug!("{source} @ {pos:?} | {text}"),
            None => tracing::debug!("{pos:?} | {text}"),
        });

    engine
        .register_fn("assert", |cond: bool| check(cond, "assertion failed"))
        .register_fn("assert", |cond: bool, message: &str| check(cond, message))
        .register_fn("assert_eq", assert_eq)
        .register_fn("fail", |message: &str| -> HostResult<()> { Err(message.into()) });

    let dir = working_dir.to_path_buf();
    engine.register_fn("working_dir", move || dir.display().to_string());

    let dir = working_dir.to_path_buf();
    engine.register_fn("file_exists", move |path: &str| resolve(&dir, path).exists());

    let dir = working_dir.to_path_buf();
    engine.register_fn("read_file", move |path: &str| -> HostResult<String> {
        let full = resolve(&dir, path);
        fs::read_to_string(&full).map_err(|e| io_error("read", &full, e))
    });

    let dir = working_dir.to_path_buf();
    engine.register_fn("write_file", move |path: &str, text: &str| -> HostResult<()> {
        let full = resolve(&dir, path);
        fs::write(&full, text).map_err(|e| io_error("write", &full, e))
    });
}

fn check(cond: bool, message: &str) -> HostResult<()> {
    if cond { Ok(()) } else { Err(message.into()) }
}

fn assert_eq(left: Dynamic, right: Dynamic) -> HostResult<()> {
    if left.type_name() == right.type_name() && left.to_string() == right.to_string() {
        return Ok(());
    }
    Err(format!("assertion failed: `{left:?}` != `{right:?}`").into())
}

fn resolve(working_dir: &Path, path: &str) -> PathBuf {
    working_dir.join(path)
}

fn io_error(action: &str, path: &Path, error: std::io::Error) -> Box<EvalAltResult> {
    EvalAltResult::ErrorSystem(format!("cannot {action} {}", path.display()), Box::new(error)).into()
}
