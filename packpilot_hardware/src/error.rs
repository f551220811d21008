use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("cannot open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("cannot clone serial port handle: {0}")]
    Clone(#[source] serialport::Error),

    #[error("serial read failed: {0}")]
    Read(#[source] std::io::Error),

    #[error("serial write failed: {0}")]
    Write(#[source] std::io::Error),
}
