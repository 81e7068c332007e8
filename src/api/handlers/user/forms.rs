//! Form objects for the account pages.
//!
//! Each form deserializes from the query string (GET) or the urlencoded body
//! (POST) and validates into either typed values or [`FormErrors`].
//! `Debug` output masks every password field so attempts can be logged.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};
use utoipa::ToSchema;

use super::{
    slug::normalize_slug,
    utils::{hash_password_blocking, normalize_email, valid_email, verify_password_blocking},
};
use crate::store::{NewUser, ProfileUpdate, User, UserInfo, UserStore};

const MASK: &str = "<MASK>";
pub const NICKNAME_MAX_LEN: usize = 20;
pub const PASSWORD_MIN_LEN: usize = 6;
pub const PASSWORD_MAX_LEN: usize = 128;
pub const PHONE_MAX_LEN: usize = 20;
pub const MOTOO_MAX_LEN: usize = 100;
pub const INTRODUCTION_MAX_LEN: usize = 2000;

/// Field name to validation messages.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }

    fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

fn mask(value: &str) -> &str {
    if value.is_empty() {
        ""
    } else {
        MASK
    }
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn check_nickname(errors: &mut FormErrors, nickname: &str) {
    let len = char_len(nickname.trim());
    if len == 0 {
        errors.add("nickname", "Nickname is required");
    } else if len > NICKNAME_MAX_LEN {
        errors.add(
            "nickname",
            format!("Nickname must be at most {NICKNAME_MAX_LEN} characters"),
        );
    }
}

fn check_new_password(errors: &mut FormErrors, password: &str, confirm: &str) {
    let len = char_len(password);
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        errors.add(
            "password",
            format!("Password must be between {PASSWORD_MIN_LEN} and {PASSWORD_MAX_LEN} characters"),
        );
    }
    if password != confirm {
        errors.add("confirm", "Passwords must match");
    }
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct SigninForm {
    pub email: String,
    pub password: String,
    pub remember: Option<String>,
    pub openid_identifier: String,
    pub openid_provider: String,
    pub next: String,
}

impl fmt::Debug for SigninForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigninForm")
            .field("email", &self.email)
            .field("password", &mask(&self.password))
            .field("remember", &self.remember())
            .field("openid_identifier", &self.openid_identifier)
            .field("openid_provider", &self.openid_provider)
            .field("next", &self.next)
            .finish()
    }
}

impl SigninForm {
    /// Checkbox semantics: any value other than empty, `0` or `false`.
    #[must_use]
    pub fn remember(&self) -> bool {
        self.remember
            .as_deref()
            .is_some_and(|value| !matches!(value, "" | "0" | "false"))
    }

    #[must_use]
    pub fn wants_openid(&self) -> bool {
        !self.openid_identifier.trim().is_empty()
    }

    /// Resolve the account for the submitted credentials.
    ///
    /// # Errors
    /// Returns an error only when the store or the hashing task fails.
    pub async fn validate(&self, users: &dyn UserStore) -> Result<Result<User, FormErrors>> {
        let mut errors = FormErrors::default();
        let email = normalize_email(&self.email);

        if email.is_empty() {
            errors.add("email", "Email is required");
        } else if !valid_email(&email) {
            errors.add("email", "Invalid email address");
        }
        if self.password.is_empty() {
            errors.add("password", "Password is required");
        }
        if !errors.is_empty() {
            return Ok(Err(errors));
        }

        let verified = match users.find_user_by_email(&email).await? {
            Some(user) => verify_password_blocking(self.password.clone(), user.password.clone())
                .await?
                .then_some(user),
            None => None,
        };

        match verified {
            Some(user) => Ok(Ok(user)),
            None => {
                errors.add("password", "Invalid email or password");
                Ok(Err(errors))
            }
        }
    }
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignupForm {
    pub email: String,
    pub nickname: String,
    pub password: String,
    pub confirm: String,
    pub next: String,
}

impl fmt::Debug for SignupForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupForm")
            .field("email", &self.email)
            .field("nickname", &self.nickname)
            .field("password", &mask(&self.password))
            .field("confirm", &mask(&self.confirm))
            .field("next", &self.next)
            .finish()
    }
}

impl SignupForm {
    /// Validate and produce the account draft with its password hashed.
    ///
    /// # Errors
    /// Returns an error only when the store or the hashing task fails.
    pub async fn validate(&self, users: &dyn UserStore) -> Result<Result<NewUser, FormErrors>> {
        let mut errors = FormErrors::default();
        let email = normalize_email(&self.email);

        if email.is_empty() {
            errors.add("email", "Email is required");
        } else if !valid_email(&email) {
            errors.add("email", "Invalid email address");
        } else if users.find_user_by_email(&email).await?.is_some() {
            errors.add("email", "Email is already registered");
        }
        check_nickname(&mut errors, &self.nickname);
        check_new_password(&mut errors, &self.password, &self.confirm);

        if !errors.is_empty() {
            return Ok(Err(errors));
        }

        let password_hash = hash_password_blocking(self.password.clone()).await?;
        Ok(Ok(NewUser {
            email,
            nickname: self.nickname.trim().to_string(),
            password_hash,
        }))
    }
}

/// Profile fields accepted by `/userinfo/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct ProfileForm {
    pub nickname: String,
    /// Optional; normalized to `a-z0-9-`, kept unchanged when empty.
    pub slug: String,
    pub phone: String,
    /// `0` private, `1` public.
    pub phone_status: String,
    pub motoo: String,
    pub introduction: String,
}

impl ProfileForm {
    /// Pre-populate from the stored profile.
    #[must_use]
    pub fn from_user(user: &User) -> Self {
        Self {
            nickname: user.nickname.clone(),
            slug: user.slug.clone().unwrap_or_default(),
            phone: user.info.phone.clone().unwrap_or_default(),
            phone_status: user.info.phone_status.to_string(),
            motoo: user.info.motoo.clone().unwrap_or_default(),
            introduction: user.info.introduction.clone().unwrap_or_default(),
        }
    }

    /// # Errors
    /// Returns the field errors when any field is invalid.
    pub fn validate(&self) -> Result<ProfileUpdate, FormErrors> {
        let mut errors = FormErrors::default();
        check_nickname(&mut errors, &self.nickname);

        let slug = match optional(&self.slug) {
            Some(raw) => match normalize_slug(&raw) {
                Ok(slug) => Some(slug),
                Err(err) => {
                    errors.add("slug", err.message());
                    None
                }
            },
            None => None,
        };

        let phone = optional(&self.phone);
        if let Some(phone) = &phone {
            let allowed = phone
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-'));
            if !allowed || char_len(phone) > PHONE_MAX_LEN {
                errors.add(
                    "phone",
                    format!(
                        "Phone may hold up to {PHONE_MAX_LEN} digits, spaces, '+' or '-'"
                    ),
                );
            }
        }

        let phone_status = match self.phone_status.trim() {
            "" | "0" => 0,
            "1" => 1,
            _ => {
                errors.add("phone_status", "Not a valid choice");
                0
            }
        };

        let motoo = optional(&self.motoo);
        if motoo.as_deref().map_or(0, char_len) > MOTOO_MAX_LEN {
            errors.add(
                "motoo",
                format!("Motto must be at most {MOTOO_MAX_LEN} characters"),
            );
        }

        let introduction = optional(&self.introduction);
        if introduction.as_deref().map_or(0, char_len) > INTRODUCTION_MAX_LEN {
            errors.add(
                "introduction",
                format!("Introduction must be at most {INTRODUCTION_MAX_LEN} characters"),
            );
        }

        errors.into_result(ProfileUpdate {
            nickname: self.nickname.trim().to_string(),
            slug,
            info: UserInfo {
                phone,
                phone_status,
                motoo,
                introduction,
            },
        })
    }
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct EditPassForm {
    pub old_password: String,
    pub password: String,
    pub confirm: String,
    pub next: String,
}

impl fmt::Debug for EditPassForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditPassForm")
            .field("old_password", &mask(&self.old_password))
            .field("password", &mask(&self.password))
            .field("confirm", &mask(&self.confirm))
            .field("next", &self.next)
            .finish()
    }
}

impl EditPassForm {
    /// Check the form against `user` and return the new password hash.
    ///
    /// # Errors
    /// Returns an error only when a hashing task fails.
    pub async fn validate(&self, user: &User) -> Result<Result<String, FormErrors>> {
        let mut errors = FormErrors::default();

        if self.old_password.is_empty() {
            errors.add("old_password", "Current password is required");
        } else if !verify_password_blocking(self.old_password.clone(), user.password.clone())
            .await?
        {
            errors.add("old_password", "Current password is incorrect");
        }
        check_new_password(&mut errors, &self.password, &self.confirm);

        if !errors.is_empty() {
            return Ok(Err(errors));
        }
        Ok(Ok(hash_password_blocking(self.password.clone()).await?))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::handlers::user::utils::hash_password;

    fn user_with_password(password: &str) -> User {
        User {
            id: 1,
            email: "alice@example.com".to_string(),
            nickname: "alice".to_string(),
            slug: None,
            password: hash_password(password).unwrap(),
            info: UserInfo::default(),
        }
    }

    #[test]
    fn debug_masks_passwords() {
        let form = SigninForm {
            email: "alice@example.com".to_string(),
            password: "secret1".to_string(),
            ..SigninForm::default()
        };
        let logged = format!("{form:?}");
        assert!(logged.contains("<MASK>"));
        assert!(!logged.contains("secret1"));

        let form = EditPassForm {
            old_password: "old-secret".to_string(),
            password: "new-secret".to_string(),
            confirm: "new-secret".to_string(),
            next: String::new(),
        };
        let logged = format!("{form:?}");
        assert!(!logged.contains("secret"));
    }

    #[test]
    fn remember_checkbox_values() {
        let mut form = SigninForm::default();
        assert!(!form.remember());
        form.remember = Some("y".to_string());
        assert!(form.remember());
        form.remember = Some("false".to_string());
        assert!(!form.remember());
    }

    #[test]
    fn profile_form_normalizes_and_clears_blank_fields() {
        let form = ProfileForm {
            nickname: "  Li Lei ".to_string(),
            slug: "Li Lei".to_string(),
            phone: " +86 138-0000 ".to_string(),
            phone_status: "1".to_string(),
            motoo: String::new(),
            introduction: "Hello".to_string(),
        };
        let update = form.validate().unwrap();
        assert_eq!(update.nickname, "Li Lei");
        assert_eq!(update.slug.as_deref(), Some("li-lei"));
        assert_eq!(update.info.phone.as_deref(), Some("+86 138-0000"));
        assert_eq!(update.info.phone_status, 1);
        assert_eq!(update.info.motoo, None);
        assert_eq!(update.info.introduction.as_deref(), Some("Hello"));
    }

    #[test]
    fn profile_form_collects_field_errors() {
        let form = ProfileForm {
            nickname: String::new(),
            slug: "12345".to_string(),
            phone: "call me".to_string(),
            phone_status: "2".to_string(),
            motoo: "m".repeat(MOTOO_MAX_LEN + 1),
            introduction: "i".repeat(INTRODUCTION_MAX_LEN + 1),
        };
        let errors = form.validate().unwrap_err();
        for field in [
            "nickname",
            "slug",
            "phone",
            "phone_status",
            "motoo",
            "introduction",
        ] {
            assert!(!errors.get(field).is_empty(), "expected error on {field}");
        }
    }

    #[test]
    fn profile_form_counts_characters_not_bytes() {
        let form = ProfileForm {
            nickname: "脚本爱好者".repeat(4),
            ..ProfileForm::default()
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn profile_form_from_user_round_trips() {
        let mut user = user_with_password("secret1");
        user.slug = Some("alice".to_string());
        user.info.phone_status = 1;
        user.info.motoo = Some("Keep scripting".to_string());
        let update = ProfileForm::from_user(&user).validate().unwrap();
        assert_eq!(update.slug.as_deref(), Some("alice"));
        assert_eq!(update.info.phone_status, 1);
        assert_eq!(update.info.motoo.as_deref(), Some("Keep scripting"));
    }

    #[tokio::test]
    async fn edit_pass_form_requires_old_password() {
        let user = user_with_password("secret1");
        let form = EditPassForm {
            old_password: "wrong".to_string(),
            password: "secret2".to_string(),
            confirm: "secret3".to_string(),
            next: String::new(),
        };
        let errors = form.validate(&user).await.unwrap().unwrap_err();
        assert!(!errors.get("old_password").is_empty());
        assert!(!errors.get("confirm").is_empty());
        assert!(errors.get("password").is_empty());
    }

    #[tokio::test]
    async fn edit_pass_form_hashes_new_password() {
        let user = user_with_password("secret1");
        let form = EditPassForm {
            old_password: "secret1".to_string(),
            password: "secret2".to_string(),
            confirm: "secret2".to_string(),
            next: String::new(),
        };
        let hash = form.validate(&user).await.unwrap().unwrap();
        assert!(crate::api::handlers::user::utils::verify_password("secret2", &hash));
    }

    #[test]
    fn form_errors_serialize_as_map() {
        let mut errors = FormErrors::default();
        errors.add("slug", "taken");
        errors.add("slug", "too short");
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            serde_json::json!({"slug": ["taken", "too short"]})
        );
    }
}
