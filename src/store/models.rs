use std::fmt;

/// Extra profile fields kept in `user_info`, one row per user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserInfo {
    pub phone: Option<String>,
    /// Phone visibility: `0` private, `1` public.
    pub phone_status: i16,
    pub motoo: Option<String>,
    pub introduction: Option<String>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub nickname: String,
    pub slug: Option<String>,
    /// Argon2 PHC string.
    pub password: String,
    pub info: UserInfo,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("nickname", &self.nickname)
            .field("slug", &self.slug)
            .field("password", &"***")
            .field("info", &self.info)
            .finish()
    }
}

/// Account draft produced by a valid sign-up form.
#[derive(Clone)]
pub struct NewUser {
    pub email: String,
    pub nickname: String,
    pub password_hash: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("nickname", &self.nickname)
            .field("password_hash", &"***")
            .finish()
    }
}

#[derive(Debug)]
pub enum CreateUserOutcome {
    Created(i64),
    EmailTaken,
}

/// Profile fields accepted by the edit form. `slug: None` keeps the current slug.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub nickname: String,
    pub slug: Option<String>,
    pub info: UserInfo,
}

/// Stored session state. `data` is owned by the session layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionRecord {
    pub user_id: Option<i64>,
    pub remember: bool,
    pub data: serde_json::Value,
}

/// A live session row and how many seconds it has left.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredSession {
    pub record: SessionRecord,
    pub expires_in: i64,
}
