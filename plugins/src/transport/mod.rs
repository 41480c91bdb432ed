mod echo;
mod http;

pub use echo::EchoTransport;
pub use http::{HttpTransport, SaveHttpError, SaveHttpErrorKind};
