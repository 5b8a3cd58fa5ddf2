pub mod fresh;

pub use fresh::{FetchState, FreshCell, RequestTicket};
