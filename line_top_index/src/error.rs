use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Caller precondition failures. The index is left untouched when one is
/// returned.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("No block with id: {id}"))]
    UnknownBlock { id: String },

    #[snafu(display("Block already tracked: {id}"))]
    DuplicateBlock { id: String },

    #[snafu(display("Invalid block height: {height}"))]
    InvalidHeight { height: f64 },
}
