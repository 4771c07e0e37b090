use thiserror::Error;

#[derive(Error, Debug)]
pub enum SrtmError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid tile id {0}")]
    TileId(String),

    #[error("invalid raster byte len {0}")]
    RasterLen(usize),

    #[error("void sample at interpolation corner")]
    VoidSample,

    #[error("interpolation point outside rectangle")]
    OutsideRect,

    #[error("degenerate interpolation rectangle")]
    DegenerateRect,
}
