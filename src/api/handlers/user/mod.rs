//! Account pages: sign-in (password and OpenID), sign-up, profiles,
//! password changes and sign-out.

pub mod edit;
pub mod email;
pub mod forms;
pub mod openid;
pub mod password;
pub mod profile;
pub mod signin;
pub mod signout;
pub mod signup;
pub mod slug;
pub mod types;
pub mod utils;


pub use edit::{edit, update};
pub use email::editemail;
pub use password::edit_pass;
pub use profile::profile;
pub use signin::signin;
pub use signout::signout;
pub use signup::signup;

pub const SIGNED_IN: &str = "Signed in successfully";
pub const PROFILE_PATH: &str = "/profile/";
