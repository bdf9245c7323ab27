pub mod error;
pub mod request;
pub mod response;
pub mod traits;

pub use error::FunctionError;
pub use request::{Headers, IncomingRequest};
pub use response::{FunctionResponse, ResponseBody};
pub use traits::Function;
