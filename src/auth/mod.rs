pub mod approle;
pub mod kubernetes;
pub mod method;
pub mod token;
pub mod userpass;

pub use approle::AppRoleAuth;
pub use kubernetes::KubernetesAuth;
pub use method::{AuthMethod, AuthResult};
pub use token::TokenAuth;
pub use userpass::UserPassAuth;
