use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReliefError {
    #[error("operation cancelled")]
    Cancelled,

    #[error("raster too small: {rows}x{cols}")]
    TooSmall { rows: usize, cols: usize },

    #[error("peak outside raster bounds")]
    PeakOutOfBounds,

    #[error("no elevation data at peak")]
    PeakVoid,

    #[error("peaks are not connected within the search bounds")]
    NotConnected,
}
