pub mod google;
pub mod local;
pub mod password;
mod session;

pub use google::{GoogleConfig, GoogleOAuth};
pub use session::SessionStore;
