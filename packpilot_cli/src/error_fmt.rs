//! Human-readable error descriptions and stable exit codes.

use packpilot_core::{BuildError, CoreError};
use packpilot_hardware::HwError;

/// Map an eyre::Report to an explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(ce) = err.downcast_ref::<CoreError>() {
        return match ce {
            CoreError::Disconnected(msg) => format!(
                "What happened: The serial link to the pack died ({msg}).\nLikely causes: USB cable unplugged, telemetry board reset, or the port was taken by another process.\nHow to fix: Reconnect the board and start again. Sessions persisted before the failure are already on disk."
            ),
            CoreError::SessionBusy(msg) => format!(
                "What happened: A finished session could not be written ({msg}).\nLikely causes: The log directory is unwritable or the destination file is occupied.\nHow to fix: Free the destination or point --log-dir at a writable directory; the recorded rows are retained until a retry succeeds."
            ),
            CoreError::SessionIo(msg) => format!(
                "What happened: Session storage could not be prepared ({msg}).\nLikely causes: Missing permissions on the log directory or a full disk.\nHow to fix: Check the session.log_dir path in the config, then rerun."
            ),
        };
    }

    if let Some(he) = err.downcast_ref::<HwError>() {
        return match he {
            HwError::Open { port, .. } => format!(
                "What happened: Could not open serial port {port}.\nLikely causes: Wrong port path, board not plugged in, or missing permissions (dialout group).\nHow to fix: Check `serial.port` in the config or pass --port; verify the device node exists."
            ),
            HwError::Clone(e) => format!(
                "What happened: Could not split the serial port into reader and writer halves ({e}).\nLikely causes: Driver does not support cloning the handle.\nHow to fix: Try a different USB-serial adapter or driver."
            ),
            HwError::Read(e) | HwError::Write(e) => format!(
                "What happened: Serial I/O failed ({e}).\nLikely causes: Cable unplugged mid-run or a flaky adapter.\nHow to fix: Reconnect and rerun."
            ),
        };
    }

    if let Some(be) = err.downcast_ref::<BuildError>() {
        return format!(
            "What happened: Invalid control parameters ({be}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
        );
    }

    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 link lost, 4 port unusable, 1 everything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if matches!(err.downcast_ref::<CoreError>(), Some(CoreError::Disconnected(_))) {
        return 3;
    }
    if matches!(err.downcast_ref::<HwError>(), Some(HwError::Open { .. })) {
        return 4;
    }
    1
}
